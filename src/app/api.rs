// src/app/api.rs — thin request/response mapping onto the showtimes backend
use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::app::types::{
    AnalyticsEvent, Movie, SelectionRequest, Showtime, ShowtimesResponse, Theater, VariationStats,
};

#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure or any non-404 error status.
    #[error("network error: {0}")]
    Network(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed response: {0}")]
    Decode(String),

    /// The page went away while the request was in flight.
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Backend operations used by the page. Implemented over HTTP by [`HttpApi`];
/// tests substitute in-memory fakes.
pub trait ShowtimeApi: Send + Sync {
    fn get_movie(&self, movie_id: &str) -> Result<Movie, ApiError>;
    fn get_theater(&self, theater_id: &str) -> Result<Theater, ApiError>;
    fn get_showtimes(&self, theater_id: &str, movie_id: &str)
        -> Result<ShowtimesResponse, ApiError>;
    fn select_showtime(
        &self,
        theater_id: &str,
        movie_id: &str,
        showtime: &Showtime,
    ) -> Result<(), ApiError>;
    fn track_event(&self, event: &AnalyticsEvent) -> Result<(), ApiError>;
    fn analytics_results(&self) -> Result<BTreeMap<String, VariationStats>, ApiError>;
}

/// Connection setup is capped separately from the whole-request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn connect_timeout(total: Duration) -> Duration {
    CONNECT_TIMEOUT.min(total)
}

pub struct HttpApi {
    client: Client,
    base_url: String,
    user_id: String,
}

impl HttpApi {
    pub fn new(base_url: &str, user_id: String, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(concat!("showtimes/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .connect_timeout(connect_timeout(timeout))
            .build()
            .map_err(|e| ApiError::Network(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn url(&self, segments: &[&str]) -> String {
        endpoint(&self.base_url, segments)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        debug!("GET {url}");
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| ApiError::Network(format!("GET {url}: {e}")))?;
        decode(check_status(resp, url)?, url)
    }

    fn post_json<B: serde::Serialize>(&self, url: &str, body: &B) -> Result<(), ApiError> {
        debug!("POST {url}");
        let payload =
            serde_json::to_vec(body).map_err(|e| ApiError::Decode(format!("encode body: {e}")))?;
        let resp = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .map_err(|e| ApiError::Network(format!("POST {url}: {e}")))?;
        check_status(resp, url).map(|_| ())
    }
}

impl ShowtimeApi for HttpApi {
    fn get_movie(&self, movie_id: &str) -> Result<Movie, ApiError> {
        self.get_json(&self.url(&["movie", movie_id]))
    }

    fn get_theater(&self, theater_id: &str) -> Result<Theater, ApiError> {
        self.get_json(&self.url(&["theater", theater_id]))
    }

    fn get_showtimes(
        &self,
        theater_id: &str,
        movie_id: &str,
    ) -> Result<ShowtimesResponse, ApiError> {
        let url = format!(
            "{}?userId={}",
            self.url(&["showtimes", theater_id, movie_id]),
            urlencoding::encode(&self.user_id)
        );
        self.get_json(&url)
    }

    fn select_showtime(
        &self,
        theater_id: &str,
        movie_id: &str,
        showtime: &Showtime,
    ) -> Result<(), ApiError> {
        let body = SelectionRequest {
            user_id: &self.user_id,
            theater_id,
            movie_id,
            showtime,
        };
        self.post_json(&self.url(&["showtimes", "select"]), &body)
    }

    fn track_event(&self, event: &AnalyticsEvent) -> Result<(), ApiError> {
        self.post_json(&self.url(&["analytics", "track"]), event)
    }

    fn analytics_results(&self) -> Result<BTreeMap<String, VariationStats>, ApiError> {
        self.get_json(&self.url(&["analytics", "results"]))
    }
}

/// Join `base` with percent-encoded path segments.
pub fn endpoint(base: &str, segments: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for seg in segments {
        url.push('/');
        url.push_str(&urlencoding::encode(seg));
    }
    url
}

fn check_status(resp: Response, url: &str) -> Result<Response, ApiError> {
    match resp.status() {
        s if s.is_success() => Ok(resp),
        StatusCode::NOT_FOUND => Err(ApiError::NotFound(url.to_string())),
        s => Err(ApiError::Network(format!("HTTP {s} for {url}"))),
    }
}

fn decode<T: DeserializeOwned>(resp: Response, url: &str) -> Result<T, ApiError> {
    let body = resp
        .bytes()
        .map_err(|e| ApiError::Network(format!("read body {url}: {e}")))?;
    serde_json::from_slice(&body).map_err(|e| ApiError::Decode(format!("{url}: {e}")))
}
