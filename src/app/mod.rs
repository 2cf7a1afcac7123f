// src/app/mod.rs — showtimes page: wiring + eframe loop

use std::sync::Arc;
use std::time::Duration;

use eframe::egui as eg;
use thiserror::Error;
use tracing::{info, warn};

pub mod api;
pub mod cache;
pub mod flags;
pub mod gfx;
pub mod identity;
pub mod page;
pub mod poster;
pub mod showtimes;
pub mod types;
pub mod ui;
pub(crate) mod utils;

use crate::app::api::{ApiError, HttpApi, ShowtimeApi};
use crate::app::cache::PosterCache;
use crate::app::flags::{FlagClient, FlagError, HttpFlagSource};
use crate::app::identity::IdentityProvider;
use crate::app::page::{PageController, Waker};
use crate::app::poster::PosterLoader;
use crate::app::types::{PageState, Showtime};
use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("backend client: {0}")]
    Api(#[from] ApiError),

    #[error("flag client: {0}")]
    Flags(#[from] FlagError),
}

pub struct ShowtimeApp {
    config: AppConfig,
    page: PageController,
    flags: FlagClient,
    poster: PosterLoader,
}

impl ShowtimeApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Result<Self, StartupError> {
        let ctx = cc.egui_ctx.clone();
        Self::with_waker(config, Arc::new(move || ctx.request_repaint()))
    }

    pub fn with_waker(config: AppConfig, waker: Waker) -> Result<Self, StartupError> {
        let timeout = Duration::from_secs(config.http_timeout_secs);

        let identity = IdentityProvider::open_in(&config.cache_dir);
        let user_id = identity.user_id();
        info!("user id {user_id}");

        let api: Arc<dyn ShowtimeApi> =
            Arc::new(HttpApi::new(&config.api_base_url, user_id.clone(), timeout)?);

        let source = HttpFlagSource::new(&config.flag_base_url, &config.flag_client_id, timeout)?;
        let poll_every =
            (config.flag_poll_secs > 0).then(|| Duration::from_secs(config.flag_poll_secs));
        let flags = FlagClient::new(Arc::new(source), poll_every);
        // initialize alongside the page fetches rather than after them
        flags.start();

        let poster = match PosterCache::open(&config.cache_dir, timeout) {
            Ok(cache) => PosterLoader::spawn(cache, Arc::clone(&waker)),
            Err(e) => {
                warn!("poster cache unavailable ({e}); showing placeholders");
                PosterLoader::disabled()
            }
        };

        let page = PageController::new(
            api,
            flags.clone(),
            user_id,
            &config.movie_id,
            &config.theater_id,
        )
        .with_analytics(config.analytics_enabled)
        .with_waker(waker);

        Ok(Self {
            config,
            page,
            flags,
            poster,
        })
    }
}

impl eframe::App for ShowtimeApp {
    fn update(&mut self, ctx: &eg::Context, _frame: &mut eframe::Frame) {
        // First frame mounts the page; the controller ignores repeats.
        self.page.start();
        self.page.poll();
        self.poster.poll();

        if let PageState::Ready(data) = self.page.state() {
            let url = data.movie.poster.clone();
            self.poster.request(&url);
        }
        self.poster.upload_if_cached(ctx);

        self.ui_render_header(ctx);

        let mut clicked: Option<Showtime> = None;
        match self.page.state() {
            PageState::Idle | PageState::Loading => self.ui_render_message(ctx, None),
            PageState::Error(msg) => self.ui_render_message(ctx, Some(msg)),
            PageState::Disposed => self.ui_render_message(ctx, Some("No data available")),
            PageState::Ready(data) => {
                self.ui_render_footer(ctx, &data.variation);
                self.ui_render_sidebar(ctx);
                clicked = self.ui_render_page(ctx, data);
            }
        }

        if let Some(showtime) = clicked {
            self.page.select_showtime(showtime);
        }
        if self.ui_render_confirmation(ctx) {
            self.page.dismiss_confirmation();
        }
    }
}

impl Drop for ShowtimeApp {
    fn drop(&mut self) {
        self.page.teardown();
        self.flags.close();
    }
}
