use std::{env, fs, path::Path, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

pub const CONFIG_FILE: &str = "config.json";
pub const CONFIG_ENV: &str = "SHOWTIMES_CONFIG";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5003/api";
pub const DEFAULT_MOVIE_ID: &str = "237015";
pub const DEFAULT_THEATER_ID: &str = "amc-15";
pub const DEFAULT_FLAG_CLIENT_ID: &str = "your-client-side-sdk-key";
pub const DEFAULT_FLAG_BASE_URL: &str = "https://clientsdk.launchdarkly.com";
pub const DEFAULT_CACHE_DIR: &str = ".showtimes_cache";
pub const DEFAULT_SITE_TITLE: &str = "SHOWTIMES";

const DEFAULT_FLAG_POLL_SECS: u64 = 30;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub movie_id: String,
    pub theater_id: String,
    pub flag_client_id: String,
    pub flag_base_url: String,
    /// 0 disables change polling.
    pub flag_poll_secs: u64,
    pub http_timeout_secs: u64,
    pub cache_dir: PathBuf,
    pub analytics_enabled: bool,
    pub site_title: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            movie_id: DEFAULT_MOVIE_ID.to_string(),
            theater_id: DEFAULT_THEATER_ID.to_string(),
            flag_client_id: DEFAULT_FLAG_CLIENT_ID.to_string(),
            flag_base_url: DEFAULT_FLAG_BASE_URL.to_string(),
            flag_poll_secs: DEFAULT_FLAG_POLL_SECS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            analytics_enabled: false,
            site_title: DEFAULT_SITE_TITLE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(alias = "api_base")]
    api_base_url: Option<String>,
    movie_id: Option<String>,
    theater_id: Option<String>,
    #[serde(alias = "launchdarkly_client_id")]
    flag_client_id: Option<String>,
    flag_base_url: Option<String>,
    flag_poll_secs: Option<u64>,
    http_timeout_secs: Option<u64>,
    cache_dir: Option<String>,
    analytics_enabled: Option<bool>,
    site_title: Option<String>,
}

/// Config path: `$SHOWTIMES_CONFIG` if set, else `config.json` in the working dir.
pub fn config_path() -> PathBuf {
    env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}

pub fn load_config() -> AppConfig {
    load_config_from(&config_path())
}

pub fn load_config_from(cfg_path: &Path) -> AppConfig {
    match fs::read_to_string(cfg_path) {
        Ok(raw) => match serde_json::from_str::<RawConfig>(&raw) {
            Ok(parsed) => {
                let cfg = apply_raw(AppConfig::default(), parsed);
                info!("Loaded config from {}", cfg_path.display());
                cfg
            }
            Err(err) => {
                warn!(
                    "Failed to parse {} ({}). Using defaults.",
                    cfg_path.display(),
                    err
                );
                AppConfig::default()
            }
        },
        Err(_) => {
            info!("No {} found; using defaults", cfg_path.display());
            AppConfig::default()
        }
    }
}

fn apply_raw(mut cfg: AppConfig, parsed: RawConfig) -> AppConfig {
    if let Some(url) = non_blank(parsed.api_base_url) {
        cfg.api_base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(id) = non_blank(parsed.movie_id) {
        cfg.movie_id = id;
    }
    if let Some(id) = non_blank(parsed.theater_id) {
        cfg.theater_id = id;
    }
    if let Some(id) = non_blank(parsed.flag_client_id) {
        cfg.flag_client_id = id;
    }
    if let Some(url) = non_blank(parsed.flag_base_url) {
        cfg.flag_base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(secs) = parsed.flag_poll_secs {
        cfg.flag_poll_secs = secs;
    }
    match parsed.http_timeout_secs {
        Some(0) => warn!(
            "`http_timeout_secs` must be positive; keeping {}s.",
            cfg.http_timeout_secs
        ),
        Some(secs) => cfg.http_timeout_secs = secs,
        None => {}
    }
    if let Some(dir) = non_blank(parsed.cache_dir) {
        cfg.cache_dir = PathBuf::from(dir);
    }
    if let Some(enabled) = parsed.analytics_enabled {
        cfg.analytics_enabled = enabled;
    }
    if let Some(title) = non_blank(parsed.site_title) {
        cfg.site_title = title;
    }
    cfg
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
