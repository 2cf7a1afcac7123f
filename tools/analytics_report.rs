use showtimes::app::api::{ApiError, HttpApi, ShowtimeApi};
use showtimes::app::types::VariationStats;
use showtimes::config::load_config;
use std::collections::BTreeMap;
use std::env;
use std::time::Duration;

/// Sent in place of a visitor id; the report only reads aggregates.
const REPORT_USER_ID: &str = "analytics-report";

fn report_client(base: &str, timeout: Duration) -> Result<HttpApi, ApiError> {
    HttpApi::new(base, REPORT_USER_ID.to_string(), timeout)
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    let cfg = load_config();
    let base = args
        .iter()
        .position(|a| a == "--base")
        .and_then(|i| args.get(i + 1).cloned())
        .unwrap_or_else(|| cfg.api_base_url.clone());
    let as_json = args.iter().any(|a| a == "--json");

    let api = match report_client(&base, Duration::from_secs(cfg.http_timeout_secs)) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Could not build HTTP client: {e}");
            std::process::exit(1);
        }
    };

    let results = match api.analytics_results() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to fetch analytics from {base}: {e}");
            std::process::exit(1);
        }
    };

    if as_json {
        match serde_json::to_string_pretty(&results) {
            Ok(txt) => println!("{txt}"),
            Err(e) => {
                eprintln!("Could not encode results: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!("Showtime ordering experiment — {base}");
    print!("{}", render_table(&results));
}

fn render_table(results: &BTreeMap<String, VariationStats>) -> String {
    let mut out = format!(
        "{:<14} {:>8} {:>8} {:>8}\n",
        "variation", "views", "clicks", "ctr %"
    );
    for (variation, stats) in results {
        out.push_str(&format!(
            "{:<14} {:>8} {:>8} {:>8.2}\n",
            variation, stats.views, stats.clicks, stats.ctr
        ));
    }
    let (views, clicks) = results
        .values()
        .fold((0u64, 0u64), |(v, c), s| (v + s.views, c + s.clicks));
    let ctr = if views > 0 {
        clicks as f64 / views as f64 * 100.0
    } else {
        0.0
    };
    out.push_str(&format!(
        "{:<14} {:>8} {:>8} {:>8.2}\n",
        "total", views, clicks, ctr
    ));
    out
}

fn print_usage() {
    println!(
        r#"Showtime ordering analytics report.

Usage:
  cargo run --bin analytics_report
      Print views, clicks and click-through rate per variation.

  cargo run --bin analytics_report -- --json
      Print the raw aggregate as JSON.

  cargo run --bin analytics_report -- --base <url>
      Query a different backend than config.json's `api_base_url`.
"#
    );
}
