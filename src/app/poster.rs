// src/app/poster.rs — background poster download, latest-url-wins
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use eframe::egui::{self as eg, TextureHandle};
use tracing::{debug, warn};

use crate::app::cache::{url_to_cache_key, PosterCache};
use crate::app::page::Waker;
use crate::app::types::{PosterDone, PosterState};

pub struct PosterSlot {
    pub url: String,
    pub state: PosterState,
    pub path: Option<PathBuf>,
    pub tex: Option<TextureHandle>, // UI thread only
}

pub struct PosterLoader {
    work_tx: Option<Sender<String>>,
    done_rx: Option<Receiver<PosterDone>>,
    slot: Option<PosterSlot>,
}

impl PosterLoader {
    /// Loader that never fetches; every poster stays a placeholder.
    pub fn disabled() -> Self {
        Self {
            work_tx: None,
            done_rx: None,
            slot: None,
        }
    }

    pub fn spawn(cache: PosterCache, waker: Waker) -> Self {
        debug!("poster cache at {}", cache.dir().display());
        Self::spawn_with(move |url| cache.fetch(url), waker)
    }

    pub fn spawn_with<F>(fetch: F, waker: Waker) -> Self
    where
        F: Fn(&str) -> Result<PathBuf, String> + Send + 'static,
    {
        let (work_tx, work_rx) = mpsc::channel::<String>();
        let (done_tx, done_rx) = mpsc::channel::<PosterDone>();
        let spawned = std::thread::Builder::new()
            .name("poster-fetch".into())
            .spawn(move || {
                while let Ok(url) = work_rx.recv() {
                    let result = fetch(&url);
                    if done_tx.send(PosterDone { url, result }).is_err() {
                        break;
                    }
                    waker();
                }
            });
        match spawned {
            Ok(_) => Self {
                work_tx: Some(work_tx),
                done_rx: Some(done_rx),
                slot: None,
            },
            Err(e) => {
                warn!("poster worker not started ({e}); posters disabled");
                Self::disabled()
            }
        }
    }

    pub fn slot(&self) -> Option<&PosterSlot> {
        self.slot.as_ref()
    }

    /// Make `url` the poster to show. Re-requesting the current url is a no-op.
    pub fn request(&mut self, url: &str) {
        if self.slot.as_ref().is_some_and(|s| s.url == url) {
            return;
        }
        let mut slot = PosterSlot {
            url: url.to_string(),
            state: PosterState::Pending,
            path: None,
            tex: None,
        };
        let queued = self
            .work_tx
            .as_ref()
            .is_some_and(|tx| tx.send(url.to_string()).is_ok());
        if !queued {
            slot.state = PosterState::Failed;
        }
        self.slot = Some(slot);
    }

    /// Apply finished downloads. Results for superseded urls are dropped.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        loop {
            let Some(rx) = &self.done_rx else {
                break;
            };
            let done = match rx.try_recv() {
                Ok(done) => done,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            };
            let Some(slot) = self.slot.as_mut().filter(|s| s.url == done.url) else {
                continue;
            };
            match done.result {
                Ok(path) => {
                    slot.path = Some(path);
                    slot.state = PosterState::Cached; // uploaded lazily during paint
                }
                Err(e) => {
                    warn!("poster download failed for {}: {e}", done.url);
                    slot.state = PosterState::Failed;
                }
            }
            changed = true;
        }
        changed
    }

    /// Upload a cached poster to the GPU. (UI thread only)
    pub fn upload_if_cached(&mut self, ctx: &eg::Context) {
        let Some(slot) = self.slot.as_mut() else {
            return;
        };
        if slot.state != PosterState::Cached {
            return;
        }
        let Some(path) = slot.path.as_ref() else {
            slot.state = PosterState::Failed;
            return;
        };
        match crate::app::gfx::load_texture_from_path(ctx, path, &url_to_cache_key(&slot.url)) {
            Ok(tex) => {
                slot.tex = Some(tex);
                slot.state = PosterState::Ready;
            }
            Err(e) => {
                warn!("poster texture failed: {e}");
                slot.state = PosterState::Failed;
            }
        }
    }
}
