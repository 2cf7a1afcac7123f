// src/app/utils.rs
use chrono::NaiveDate;
use itertools::Itertools;

use crate::app::types::Movie;

/// "2025-02-14" → "February 14, 2025". Anything unparseable is shown as-is.
pub(crate) fn format_release_date(raw: &str) -> String {
    let trimmed = raw.trim();
    // tolerate full timestamps like "2025-02-14T00:00:00Z"
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(d) => d.format("%B %-d, %Y").to_string(),
        Err(_) => trimmed.to_string(),
    }
}

/// "PG-13 • 2h 15min • Release Date: February 14, 2025", skipping blank parts.
pub(crate) fn movie_meta_line(movie: &Movie) -> String {
    let release = (!movie.release_date.trim().is_empty())
        .then(|| format!("Release Date: {}", format_release_date(&movie.release_date)));
    [
        Some(movie.rating.trim().to_string()),
        Some(movie.runtime.trim().to_string()),
        release,
    ]
    .into_iter()
    .flatten()
    .filter(|s| !s.is_empty())
    .join("  •  ")
}
