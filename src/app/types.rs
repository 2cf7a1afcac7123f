// src/app/types.rs
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ---- backend payloads ----
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub release_date: String,
    pub rating: String,
    pub runtime: String,
    pub description: String,
    pub poster: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theater {
    pub id: String,
    pub name: String,
    pub address: String,
}

/// One bookable slot. No identity: two equal entries are still two buttons.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Showtime {
    pub time: String,
    pub format: String,
    pub price: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowtimesResponse {
    pub showtimes: Vec<Showtime>,
    /// Opaque experiment tag; shown and tracked, never interpreted.
    pub variation: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRequest<'a> {
    pub user_id: &'a str,
    pub theater_id: &'a str,
    pub movie_id: &'a str,
    pub showtime: &'a Showtime,
}

// ---- analytics ----
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    View,
    Click,
}

impl EventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Click => "click",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub variation: String,
    pub user_id: String,
    pub movie_id: String,
    pub theater_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub showtime: Option<Showtime>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VariationStats {
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub clicks: u64,
    /// Click-through rate in percent, as computed by the backend.
    #[serde(default)]
    pub ctr: f64,
}

// ---- render state ----
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageData {
    pub movie: Movie,
    pub theater: Theater,
    pub showtimes: Vec<Showtime>,
    pub variation: String,
}

/// Page lifecycle. `Disposed` is terminal and entered only through teardown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageState {
    Idle,
    Loading,
    Ready(PageData),
    Error(String),
    Disposed,
}

impl PageState {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready(_) => "ready",
            Self::Error(_) => "error",
            Self::Disposed => "disposed",
        }
    }
}

// ---- cross-thread messages ----
pub enum LoadMsg {
    /// `original_poster` is the backend's poster, before flag resolution.
    Loaded {
        data: PageData,
        original_poster: String,
    },
    Failed(crate::app::api::ApiError),
    /// Flag re-resolution; `None` means the flag went away.
    PosterChanged(Option<String>),
}

pub enum SelectMsg {
    Confirmed(Showtime),
    Failed(Showtime, String),
}

pub struct PosterDone {
    pub url: String,
    pub result: Result<PathBuf, String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PosterState {
    Pending, // queued or downloading
    Cached,  // file present on disk (ready to upload)
    Ready,   // texture uploaded
    Failed,  // permanent failure for this url
}
