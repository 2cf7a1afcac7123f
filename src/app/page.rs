// src/app/page.rs — page lifecycle: Idle → Loading → Ready | Error, Disposed on teardown
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::app::api::{ApiError, ShowtimeApi};
use crate::app::flags::{FlagClient, FlagSubscription, MOVIE_IMAGE_FLAG};
use crate::app::types::{
    AnalyticsEvent, EventKind, LoadMsg, Movie, PageData, PageState, SelectMsg, Showtime,
    ShowtimesResponse, Theater,
};

pub const LOAD_ERROR_MESSAGE: &str = "Failed to load movie data. Please try again later.";

/// Called from worker threads after they post a message (e.g. request a repaint).
pub type Waker = Arc<dyn Fn() + Send + Sync>;

pub struct PageController {
    api: Arc<dyn ShowtimeApi>,
    flags: FlagClient,
    user_id: String,
    movie_id: String,
    theater_id: String,
    analytics: bool,
    waker: Waker,

    state: PageState,
    cancel: Arc<AtomicBool>,
    load_rx: Option<Receiver<LoadMsg>>,
    subscription: Option<FlagSubscription>,
    original_poster: Option<String>,
    pending_poster: Option<Option<String>>,

    select_tx: Sender<SelectMsg>,
    select_rx: Receiver<SelectMsg>,
    confirmation: Option<String>,
}

impl PageController {
    pub fn new(
        api: Arc<dyn ShowtimeApi>,
        flags: FlagClient,
        user_id: String,
        movie_id: &str,
        theater_id: &str,
    ) -> Self {
        let (select_tx, select_rx) = mpsc::channel();
        Self {
            api,
            flags,
            user_id,
            movie_id: movie_id.to_string(),
            theater_id: theater_id.to_string(),
            analytics: false,
            waker: Arc::new(|| {}),
            state: PageState::Idle,
            cancel: Arc::new(AtomicBool::new(false)),
            load_rx: None,
            subscription: None,
            original_poster: None,
            pending_poster: None,
            select_tx,
            select_rx,
            confirmation: None,
        }
    }

    pub fn with_analytics(mut self, enabled: bool) -> Self {
        self.analytics = enabled;
        self
    }

    pub fn with_waker(mut self, waker: Waker) -> Self {
        self.waker = waker;
        self
    }

    pub const fn state(&self) -> &PageState {
        &self.state
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn confirmation(&self) -> Option<&str> {
        self.confirmation.as_deref()
    }

    pub fn dismiss_confirmation(&mut self) {
        self.confirmation = None;
    }

    /// Enter `Loading`. Only acts from `Idle`, so a second mount is a no-op.
    pub fn start(&mut self) {
        if self.state != PageState::Idle {
            debug!("start ignored in state {}", self.state.label());
            return;
        }
        self.state = PageState::Loading;
        info!(
            "loading movie {} at theater {}",
            self.movie_id, self.theater_id
        );

        let (tx, rx) = mpsc::channel::<LoadMsg>();
        self.load_rx = Some(rx);

        let flag_tx = tx.clone();
        let waker = Arc::clone(&self.waker);
        self.subscription = Some(self.flags.on_change(MOVIE_IMAGE_FLAG, move |value| {
            let url = value.and_then(Value::as_str).map(str::to_string);
            if flag_tx.send(LoadMsg::PosterChanged(url)).is_ok() {
                waker();
            }
        }));

        let job = LoadJob {
            api: Arc::clone(&self.api),
            flags: self.flags.clone(),
            movie_id: self.movie_id.clone(),
            theater_id: self.theater_id.clone(),
            cancel: Arc::clone(&self.cancel),
        };
        let waker = Arc::clone(&self.waker);
        let spawned = thread::Builder::new()
            .name("page-loader".into())
            .spawn(move || {
                let msg = match job.run() {
                    Ok((data, original_poster)) => LoadMsg::Loaded {
                        data,
                        original_poster,
                    },
                    Err(e) => LoadMsg::Failed(e),
                };
                if tx.send(msg).is_ok() {
                    waker();
                }
            });
        if let Err(e) = spawned {
            error!("Error fetching data: could not spawn loader: {e}");
            self.state = PageState::Error(LOAD_ERROR_MESSAGE.to_string());
        }
    }

    /// Drain worker messages. Returns true when anything visible changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        loop {
            let Some(rx) = &self.load_rx else {
                break;
            };
            match rx.try_recv() {
                Ok(msg) => changed |= self.apply(msg),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        while let Ok(msg) = self.select_rx.try_recv() {
            match msg {
                SelectMsg::Confirmed(st) => {
                    info!("showtime selected: {} ({})", st.time, st.format);
                    self.confirmation =
                        Some(format!("Selected showtime: {} ({})", st.time, st.format));
                    changed = true;
                }
                SelectMsg::Failed(st, e) => {
                    error!("Error selecting showtime {} ({}): {e}", st.time, st.format);
                }
            }
        }
        changed
    }

    fn apply(&mut self, msg: LoadMsg) -> bool {
        match msg {
            LoadMsg::Loaded {
                mut data,
                original_poster,
            } => {
                if self.state != PageState::Loading {
                    return false;
                }
                if let Some(pending) = self.pending_poster.take() {
                    data.movie.poster = pending.unwrap_or_else(|| original_poster.clone());
                }
                self.original_poster = Some(original_poster);
                info!(
                    "page ready: {} showtimes, variation {}",
                    data.showtimes.len(),
                    data.variation
                );
                if self.analytics {
                    self.track(EventKind::View, &data.variation, None);
                }
                self.state = PageState::Ready(data);
                true
            }
            LoadMsg::Failed(e) => {
                if e.is_cancelled() {
                    debug!("load cancelled");
                    return false;
                }
                if self.state != PageState::Loading {
                    return false;
                }
                error!("Error fetching data: {e}");
                self.state = PageState::Error(LOAD_ERROR_MESSAGE.to_string());
                true
            }
            LoadMsg::PosterChanged(url) => match &mut self.state {
                PageState::Ready(data) => {
                    let next = url
                        .or_else(|| self.original_poster.clone())
                        .unwrap_or_else(|| data.movie.poster.clone());
                    if next == data.movie.poster {
                        return false;
                    }
                    info!("poster flag changed: {next}");
                    data.movie.poster = next;
                    true
                }
                PageState::Loading => {
                    self.pending_poster = Some(url);
                    false
                }
                _ => false,
            },
        }
    }

    /// Submit a selection. Independent of the lifecycle; Ready data is untouched.
    pub fn select_showtime(&self, showtime: Showtime) {
        if self.state == PageState::Disposed {
            return;
        }
        let variation = match &self.state {
            PageState::Ready(data) => Some(data.variation.clone()),
            _ => None,
        };
        if self.analytics {
            if let Some(v) = &variation {
                self.track(EventKind::Click, v, Some(showtime.clone()));
            }
        }

        let api = Arc::clone(&self.api);
        let tx = self.select_tx.clone();
        let waker = Arc::clone(&self.waker);
        let movie_id = self.movie_id.clone();
        let theater_id = self.theater_id.clone();
        let spawned = thread::Builder::new()
            .name("select-showtime".into())
            .spawn(move || {
                let msg = match api.select_showtime(&theater_id, &movie_id, &showtime) {
                    Ok(()) => SelectMsg::Confirmed(showtime),
                    Err(e) => SelectMsg::Failed(showtime, e.to_string()),
                };
                if tx.send(msg).is_ok() {
                    waker();
                }
            });
        if let Err(e) = spawned {
            error!("Error selecting showtime: could not spawn worker: {e}");
        }
    }

    fn track(&self, kind: EventKind, variation: &str, showtime: Option<Showtime>) {
        let event = AnalyticsEvent {
            kind,
            variation: variation.to_string(),
            user_id: self.user_id.clone(),
            movie_id: self.movie_id.clone(),
            theater_id: self.theater_id.clone(),
            showtime,
        };
        let api = Arc::clone(&self.api);
        let spawned = thread::Builder::new()
            .name("analytics".into())
            .spawn(move || {
                if let Err(e) = api.track_event(&event) {
                    warn!("analytics {} event not recorded: {e}", event.kind.as_str());
                }
            });
        if let Err(e) = spawned {
            warn!("analytics worker not started: {e}");
        }
    }

    /// Cancel in-flight work and release the flag subscription. Idempotent.
    pub fn teardown(&mut self) {
        if self.state == PageState::Disposed {
            return;
        }
        self.cancel.store(true, Ordering::SeqCst);
        if let Some(sub) = self.subscription.take() {
            sub.dispose();
        }
        self.load_rx = None;
        info!("page torn down from state {}", self.state.label());
        self.state = PageState::Disposed;
    }
}

impl Drop for PageController {
    fn drop(&mut self) {
        self.teardown();
    }
}

struct LoadJob {
    api: Arc<dyn ShowtimeApi>,
    flags: FlagClient,
    movie_id: String,
    theater_id: String,
    cancel: Arc<AtomicBool>,
}

enum Fetched {
    Movie(Result<Movie, ApiError>),
    Theater(Result<Theater, ApiError>),
    Showtimes(Result<ShowtimesResponse, ApiError>),
}

impl LoadJob {
    /// Fetch everything concurrently. All three fetches must succeed; the
    /// first failure to arrive ends the load without waiting for the rest.
    fn run(&self) -> Result<(PageData, String), ApiError> {
        // initialization overlaps the fetches; only the poster waits for it
        self.flags.start();

        let (tx, rx) = mpsc::channel::<Fetched>();
        let api = Arc::clone(&self.api);
        let movie_id = self.movie_id.clone();
        spawn_fetch("fetch-movie", &tx, move || {
            Fetched::Movie(api.get_movie(&movie_id))
        })?;
        let api = Arc::clone(&self.api);
        let theater_id = self.theater_id.clone();
        spawn_fetch("fetch-theater", &tx, move || {
            Fetched::Theater(api.get_theater(&theater_id))
        })?;
        let api = Arc::clone(&self.api);
        let (theater_id, movie_id) = (self.theater_id.clone(), self.movie_id.clone());
        spawn_fetch("fetch-showtimes", &tx, move || {
            Fetched::Showtimes(api.get_showtimes(&theater_id, &movie_id))
        })?;
        drop(tx);

        let (mut movie, mut theater, mut showtimes) = (None, None, None);
        while movie.is_none() || theater.is_none() || showtimes.is_none() {
            let fetched = rx
                .recv()
                .map_err(|_| ApiError::Network("fetch worker exited without a result".into()))?;
            self.check_cancelled()?;
            match fetched {
                Fetched::Movie(r) => movie = Some(r?),
                Fetched::Theater(r) => theater = Some(r?),
                Fetched::Showtimes(r) => showtimes = Some(r?),
            }
        }
        let (Some(mut movie), Some(theater), Some(showtimes)) = (movie, theater, showtimes) else {
            return Err(ApiError::Network("incomplete page data".into()));
        };

        self.flags.wait_for_initialization();
        self.check_cancelled()?;

        let original_poster = movie.poster.clone();
        movie.poster = self.flags.variation_str(MOVIE_IMAGE_FLAG, &original_poster);

        Ok((
            PageData {
                movie,
                theater,
                showtimes: showtimes.showtimes,
                variation: showtimes.variation,
            },
            original_poster,
        ))
    }

    fn check_cancelled(&self) -> Result<(), ApiError> {
        if self.cancel.load(Ordering::SeqCst) {
            return Err(ApiError::Cancelled);
        }
        Ok(())
    }
}

/// Runs `fetch` on a detached worker; a result sent after the load ended is dropped.
fn spawn_fetch<F>(name: &str, tx: &Sender<Fetched>, fetch: F) -> Result<(), ApiError>
where
    F: FnOnce() -> Fetched + Send + 'static,
{
    let tx = tx.clone();
    thread::Builder::new()
        .name(name.into())
        .spawn(move || {
            let _ = tx.send(fetch());
        })
        .map(|_| ())
        .map_err(|e| ApiError::Network(format!("could not spawn {name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::flags::tests::FakeFlags;
    use crate::app::types::{Movie, ShowtimesResponse, Theater, VariationStats};
    use std::collections::BTreeMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    #[derive(Clone, Copy)]
    enum Outcome {
        Ok,
        NotFound,
        Down,
    }

    impl Outcome {
        fn err(self, what: &str) -> Option<ApiError> {
            match self {
                Self::Ok => None,
                Self::NotFound => Some(ApiError::NotFound(what.into())),
                Self::Down => Some(ApiError::Network(what.into())),
            }
        }
    }

    struct FakeApi {
        movie: Outcome,
        theater: Outcome,
        select: Outcome,
        gate: Mutex<Option<Receiver<()>>>,
        theater_gate: Mutex<Option<Receiver<()>>>,
        movie_calls: AtomicUsize,
        selected: Mutex<Vec<Showtime>>,
        events: Mutex<Vec<AnalyticsEvent>>,
    }

    impl FakeApi {
        fn new() -> Self {
            Self {
                movie: Outcome::Ok,
                theater: Outcome::Ok,
                select: Outcome::Ok,
                gate: Mutex::new(None),
                theater_gate: Mutex::new(None),
                movie_calls: AtomicUsize::new(0),
                selected: Mutex::new(Vec::new()),
                events: Mutex::new(Vec::new()),
            }
        }

        /// Movie fetch blocks until the returned sender fires or drops.
        fn gated(mut self) -> (Self, Sender<()>) {
            let (tx, rx) = mpsc::channel();
            self.gate = Mutex::new(Some(rx));
            (self, tx)
        }

        /// Same, for the theater fetch.
        fn gated_theater(mut self) -> (Self, Sender<()>) {
            let (tx, rx) = mpsc::channel();
            self.theater_gate = Mutex::new(Some(rx));
            (self, tx)
        }
    }

    impl ShowtimeApi for FakeApi {
        fn get_movie(&self, movie_id: &str) -> Result<Movie, ApiError> {
            self.movie_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(rx) = self.gate.lock().unwrap().take() {
                let _ = rx.recv();
            }
            if let Some(e) = self.movie.err(movie_id) {
                return Err(e);
            }
            Ok(Movie {
                id: movie_id.into(),
                title: "Captain America: Brave New World".into(),
                release_date: "2025-02-14".into(),
                rating: "PG-13".into(),
                runtime: "2h 15min".into(),
                description: "Sam Wilson takes on the mantle.".into(),
                poster: "https://backend/poster.png".into(),
            })
        }

        fn get_theater(&self, theater_id: &str) -> Result<Theater, ApiError> {
            if let Some(rx) = self.theater_gate.lock().unwrap().take() {
                let _ = rx.recv();
            }
            if let Some(e) = self.theater.err(theater_id) {
                return Err(e);
            }
            Ok(Theater {
                id: theater_id.into(),
                name: "AMC Century City 15".into(),
                address: "10250 Santa Monica Blvd.".into(),
            })
        }

        fn get_showtimes(
            &self,
            _theater_id: &str,
            _movie_id: &str,
        ) -> Result<ShowtimesResponse, ApiError> {
            Ok(ShowtimesResponse {
                showtimes: vec![
                    Showtime {
                        time: "7:00 PM".into(),
                        format: "IMAX".into(),
                        price: "$15".into(),
                    },
                    Showtime {
                        time: "9:30 PM".into(),
                        format: "Standard".into(),
                        price: "$12".into(),
                    },
                ],
                variation: "variation_2".into(),
            })
        }

        fn select_showtime(
            &self,
            _theater_id: &str,
            _movie_id: &str,
            showtime: &Showtime,
        ) -> Result<(), ApiError> {
            if let Some(e) = self.select.err("select") {
                return Err(e);
            }
            self.selected.lock().unwrap().push(showtime.clone());
            Ok(())
        }

        fn track_event(&self, event: &AnalyticsEvent) -> Result<(), ApiError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }

        fn analytics_results(&self) -> Result<BTreeMap<String, VariationStats>, ApiError> {
            Ok(BTreeMap::new())
        }
    }

    fn flags_with_poster(url: &str) -> (FlagClient, Arc<FakeFlags>) {
        let source = FakeFlags::with(&[(MOVIE_IMAGE_FLAG, Value::from(url))]);
        (FlagClient::new(source.clone(), None), source)
    }

    fn controller(api: Arc<FakeApi>, flags: FlagClient) -> PageController {
        PageController::new(api, flags, "user-1".into(), "237015", "amc-15")
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn settle(ctrl: &mut PageController) {
        assert!(wait_until(|| {
            ctrl.poll();
            *ctrl.state() != PageState::Loading
        }));
    }

    fn ready(ctrl: &PageController) -> &PageData {
        match ctrl.state() {
            PageState::Ready(data) => data,
            other => panic!("expected ready, got {}", other.label()),
        }
    }

    #[test]
    fn loads_page_and_resolves_poster_from_flag() {
        let (flags, _) = flags_with_poster("https://cdn/flagged.png");
        let mut ctrl = controller(Arc::new(FakeApi::new()), flags);
        assert_eq!(*ctrl.state(), PageState::Idle);
        ctrl.start();
        assert_eq!(*ctrl.state(), PageState::Loading);
        settle(&mut ctrl);

        let data = ready(&ctrl);
        assert_eq!(data.movie.poster, "https://cdn/flagged.png");
        assert_eq!(data.theater.id, "amc-15");
        assert_eq!(data.showtimes.len(), 2);
        assert_eq!(data.variation, "variation_2");
    }

    #[test]
    fn failed_flags_keep_backend_poster() {
        let flags = FlagClient::new(FakeFlags::failing(), None);
        let mut ctrl = controller(Arc::new(FakeApi::new()), flags);
        ctrl.start();
        settle(&mut ctrl);
        assert_eq!(ready(&ctrl).movie.poster, "https://backend/poster.png");
    }

    #[test]
    fn one_failed_fetch_yields_single_error_state() {
        let mut api = FakeApi::new();
        api.movie = Outcome::NotFound;
        let (flags, _) = flags_with_poster("x");
        let mut ctrl = controller(Arc::new(api), flags);
        ctrl.start();
        settle(&mut ctrl);
        assert_eq!(
            *ctrl.state(),
            PageState::Error(LOAD_ERROR_MESSAGE.to_string())
        );
        // nothing further arrives
        assert!(!ctrl.poll());
    }

    #[test]
    fn fast_failure_does_not_wait_for_slow_fetch() {
        let (mut api, release) = FakeApi::new().gated_theater();
        api.movie = Outcome::NotFound;
        let (flags, _) = flags_with_poster("x");
        let mut ctrl = controller(Arc::new(api), flags);
        ctrl.start();
        // theater stays blocked for the whole wait
        settle(&mut ctrl);
        assert_eq!(
            *ctrl.state(),
            PageState::Error(LOAD_ERROR_MESSAGE.to_string())
        );
        drop(release);
        thread::sleep(Duration::from_millis(20));
        assert!(!ctrl.poll());
    }

    #[test]
    fn theater_outage_is_an_error_too() {
        let mut api = FakeApi::new();
        api.theater = Outcome::Down;
        let (flags, _) = flags_with_poster("x");
        let mut ctrl = controller(Arc::new(api), flags);
        ctrl.start();
        settle(&mut ctrl);
        assert!(matches!(ctrl.state(), PageState::Error(_)));
    }

    #[test]
    fn start_runs_once_per_mount() {
        let api = Arc::new(FakeApi::new());
        let (flags, _) = flags_with_poster("x");
        let mut ctrl = controller(Arc::clone(&api), flags);
        ctrl.start();
        ctrl.start();
        settle(&mut ctrl);
        ctrl.start();
        assert_eq!(api.movie_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(ctrl.state(), PageState::Ready(_)));
    }

    #[test]
    fn teardown_while_loading_never_errors() {
        let (mut api, release) = FakeApi::new().gated();
        api.theater = Outcome::Down;
        let api = Arc::new(api);
        let (flags, _) = flags_with_poster("x");
        let mut ctrl = controller(Arc::clone(&api), flags.clone());
        ctrl.start();
        assert!(wait_until(|| api.movie_calls.load(Ordering::SeqCst) == 1));

        ctrl.teardown();
        assert_eq!(flags.subscriber_count(), 0);
        drop(release);
        thread::sleep(Duration::from_millis(50));

        assert!(!ctrl.poll());
        assert_eq!(*ctrl.state(), PageState::Disposed);
        ctrl.start();
        assert_eq!(*ctrl.state(), PageState::Disposed);
    }

    #[test]
    fn cancellation_is_filtered_before_error_transition() {
        let (api, release) = FakeApi::new().gated();
        let (flags, _) = flags_with_poster("x");
        let mut ctrl = controller(Arc::new(api), flags);
        ctrl.start();
        assert!(!ctrl.apply(LoadMsg::Failed(ApiError::Cancelled)));
        assert_eq!(*ctrl.state(), PageState::Loading);
        assert!(ctrl.apply(LoadMsg::Failed(ApiError::Network("boom".into()))));
        assert!(matches!(ctrl.state(), PageState::Error(_)));
        drop(release);
    }

    #[test]
    fn flag_change_updates_poster_while_ready() {
        let (flags, source) = flags_with_poster("https://cdn/a.png");
        let mut ctrl = controller(Arc::new(FakeApi::new()), flags.clone());
        ctrl.start();
        settle(&mut ctrl);

        source.set(MOVIE_IMAGE_FLAG, Value::from("https://cdn/b.png"));
        flags.refresh();
        assert!(ctrl.poll());
        assert_eq!(ready(&ctrl).movie.poster, "https://cdn/b.png");

        source.remove(MOVIE_IMAGE_FLAG);
        flags.refresh();
        assert!(ctrl.poll());
        assert_eq!(ready(&ctrl).movie.poster, "https://backend/poster.png");
    }

    #[test]
    fn poster_change_during_loading_is_applied_on_ready() {
        let (api, release) = FakeApi::new().gated();
        let (flags, _) = flags_with_poster("https://cdn/a.png");
        let mut ctrl = controller(Arc::new(api), flags);
        ctrl.start();
        ctrl.apply(LoadMsg::PosterChanged(Some("https://cdn/late.png".into())));
        drop(release);
        settle(&mut ctrl);
        assert_eq!(ready(&ctrl).movie.poster, "https://cdn/late.png");
    }

    #[test]
    fn selection_confirms_without_touching_page_data() {
        let api = Arc::new(FakeApi::new());
        let (flags, _) = flags_with_poster("x");
        let mut ctrl = controller(Arc::clone(&api), flags);
        ctrl.start();
        settle(&mut ctrl);
        let before = ready(&ctrl).clone();

        let pick = before.showtimes[0].clone();
        ctrl.select_showtime(pick.clone());
        assert!(wait_until(|| {
            ctrl.poll();
            ctrl.confirmation().is_some()
        }));
        assert_eq!(
            ctrl.confirmation(),
            Some("Selected showtime: 7:00 PM (IMAX)")
        );
        assert_eq!(*api.selected.lock().unwrap(), vec![pick]);
        assert_eq!(ready(&ctrl), &before);

        ctrl.dismiss_confirmation();
        assert!(ctrl.confirmation().is_none());
    }

    #[test]
    fn failed_selection_is_logged_only() {
        let mut api = FakeApi::new();
        api.select = Outcome::Down;
        let (flags, _) = flags_with_poster("x");
        let mut ctrl = controller(Arc::new(api), flags);
        ctrl.start();
        settle(&mut ctrl);
        ctrl.select_showtime(ready(&ctrl).showtimes[1].clone());
        thread::sleep(Duration::from_millis(50));
        ctrl.poll();
        assert!(ctrl.confirmation().is_none());
        assert!(matches!(ctrl.state(), PageState::Ready(_)));
    }

    #[test]
    fn analytics_tracks_view_and_click_when_enabled() {
        let api = Arc::new(FakeApi::new());
        let (flags, _) = flags_with_poster("x");
        let mut ctrl = controller(Arc::clone(&api), flags).with_analytics(true);
        ctrl.start();
        settle(&mut ctrl);
        ctrl.select_showtime(ready(&ctrl).showtimes[0].clone());

        assert!(wait_until(|| api.events.lock().unwrap().len() == 2));
        let events = api.events.lock().unwrap();
        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&EventKind::View));
        assert!(kinds.contains(&EventKind::Click));
        assert!(events.iter().all(|e| e.variation == "variation_2"));
        assert!(events.iter().all(|e| e.user_id == "user-1"));
    }

    #[test]
    fn analytics_disabled_sends_nothing() {
        let api = Arc::new(FakeApi::new());
        let (flags, _) = flags_with_poster("x");
        let mut ctrl = controller(Arc::clone(&api), flags);
        ctrl.start();
        settle(&mut ctrl);
        thread::sleep(Duration::from_millis(20));
        assert!(api.events.lock().unwrap().is_empty());
    }

    #[test]
    fn waker_fires_when_data_arrives() {
        let woken = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&woken);
        let (flags, _) = flags_with_poster("x");
        let mut ctrl = controller(Arc::new(FakeApi::new()), flags).with_waker(Arc::new(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        ));
        ctrl.start();
        settle(&mut ctrl);
        assert!(woken.load(Ordering::SeqCst) >= 1);
    }
}
