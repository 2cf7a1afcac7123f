// src/app/flags.rs — feature-flag client with explicit lifecycle and disposable subscriptions
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Flag that carries the poster URL shown on the page.
pub const MOVIE_IMAGE_FLAG: &str = "movie-image-flag";

const ANONYMOUS_CONTEXT: &str = r#"{"kind":"user","key":"anonymous","anonymous":true}"#;
static ENCODED_CONTEXT: Lazy<String> = Lazy::new(|| URL_SAFE_NO_PAD.encode(ANONYMOUS_CONTEXT));

pub type FlagValues = HashMap<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagStatus {
    Uninitialized,
    Initializing,
    Ready,
    /// Initialization failed; every lookup answers with its default.
    Failed,
}

impl FlagStatus {
    const fn is_settled(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

#[derive(Debug, Error)]
pub enum FlagError {
    #[error("flag service unreachable: {0}")]
    Transport(String),

    #[error("malformed flag payload: {0}")]
    Payload(String),

    #[error("flags not ready ({0:?})")]
    NotReady(FlagStatus),

    #[error("flag `{0}` is not set")]
    Unset(String),

    #[error("flag `{0}` is not a string")]
    WrongType(String),
}

/// Where flag values come from. One call returns every flag for the context.
pub trait FlagSource: Send + Sync {
    fn fetch(&self) -> Result<FlagValues, FlagError>;
}

// ---------- HTTP source ----------

/// Client-side evaluation endpoint (LaunchDarkly `evalx` shape).
pub struct HttpFlagSource {
    client: Client,
    url: String,
}

impl HttpFlagSource {
    pub fn new(base_url: &str, client_id: &str, timeout: Duration) -> Result<Self, FlagError> {
        let client = Client::builder()
            .user_agent(concat!("showtimes/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .connect_timeout(crate::app::api::connect_timeout(timeout))
            .build()
            .map_err(|e| FlagError::Transport(format!("http client: {e}")))?;
        Ok(Self {
            client,
            url: evaluation_url(base_url, client_id),
        })
    }
}

impl FlagSource for HttpFlagSource {
    fn fetch(&self) -> Result<FlagValues, FlagError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| FlagError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(FlagError::Transport(format!("HTTP {}", resp.status())));
        }
        let body = resp
            .bytes()
            .map_err(|e| FlagError::Transport(format!("read body: {e}")))?;
        parse_evaluations(&body)
    }
}

pub fn evaluation_url(base_url: &str, client_id: &str) -> String {
    format!(
        "{}/sdk/evalx/{}/contexts/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(client_id),
        ENCODED_CONTEXT.as_str()
    )
}

/// `{ "<flag>": { "value": <json>, ... }, ... }` → flag → value.
pub fn parse_evaluations(body: &[u8]) -> Result<FlagValues, FlagError> {
    let raw: HashMap<String, Value> =
        serde_json::from_slice(body).map_err(|e| FlagError::Payload(e.to_string()))?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, detail)| match detail {
            Value::Object(mut obj) => obj.remove("value").map(|v| (key, v)),
            _ => None,
        })
        .collect())
}

// ---------- client ----------

type Callback = Arc<dyn Fn(Option<&Value>) + Send + Sync>;

struct Subscriber {
    id: u64,
    key: String,
    callback: Callback,
}

struct Inner {
    status: FlagStatus,
    values: FlagValues,
    closed: bool,
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

struct Shared {
    source: Arc<dyn FlagSource>,
    poll_every: Option<Duration>,
    inner: Mutex<Inner>,
    cond: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn initialize(&self) {
        let fetched = self.source.fetch();
        let mut inner = self.lock();
        match fetched {
            Ok(values) => {
                info!("flags ready ({} values)", values.len());
                inner.values = values;
                inner.status = FlagStatus::Ready;
            }
            Err(e) => {
                warn!("flag initialization failed ({e}); serving defaults");
                inner.status = FlagStatus::Failed;
            }
        }
        self.cond.notify_all();
    }

    fn refresh(&self) {
        let fetched = match self.source.fetch() {
            Ok(v) => v,
            Err(e) => {
                debug!("flag refresh failed: {e}");
                return;
            }
        };

        let notify: Vec<(Callback, Option<Value>)> = {
            let mut inner = self.lock();
            if inner.closed {
                return;
            }
            let changed: HashSet<&String> = inner
                .values
                .keys()
                .chain(fetched.keys())
                .filter(|k| inner.values.get(*k) != fetched.get(*k))
                .collect();
            let notify = inner
                .subscribers
                .iter()
                .filter(|s| changed.contains(&s.key))
                .map(|s| (Arc::clone(&s.callback), fetched.get(&s.key).cloned()))
                .collect();
            inner.values = fetched;
            if inner.status == FlagStatus::Failed {
                info!("flags recovered after failed initialization");
            }
            inner.status = FlagStatus::Ready;
            self.cond.notify_all();
            notify
        };

        // Outside the lock: callbacks may read flags themselves.
        for (callback, value) in notify {
            callback(value.as_ref());
        }
    }

    fn poll_loop(&self, every: Duration) {
        loop {
            {
                let inner = self.lock();
                let (inner, _timeout) = self
                    .cond
                    .wait_timeout_while(inner, every, |i| !i.closed)
                    .unwrap_or_else(|p| p.into_inner());
                if inner.closed {
                    break;
                }
            }
            self.refresh();
        }
        debug!("flag poller stopped");
    }
}

/// Cheap handle; clones share one connection and one set of subscribers.
#[derive(Clone)]
pub struct FlagClient {
    shared: Arc<Shared>,
}

impl FlagClient {
    /// `poll_every = None` disables change detection after initialization.
    pub fn new(source: Arc<dyn FlagSource>, poll_every: Option<Duration>) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                poll_every,
                inner: Mutex::new(Inner {
                    status: FlagStatus::Uninitialized,
                    values: FlagValues::new(),
                    closed: false,
                    next_id: 0,
                    subscribers: Vec::new(),
                }),
                cond: Condvar::new(),
            }),
        }
    }

    pub fn status(&self) -> FlagStatus {
        self.shared.lock().status
    }

    /// Begin initialization in the background. Later calls are no-ops.
    pub fn start(&self) {
        {
            let mut inner = self.shared.lock();
            if inner.closed || inner.status != FlagStatus::Uninitialized {
                return;
            }
            inner.status = FlagStatus::Initializing;
        }
        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name("flag-client".into())
            .spawn(move || {
                shared.initialize();
                if let Some(every) = shared.poll_every {
                    shared.poll_loop(every);
                }
            });
        if let Err(e) = spawned {
            warn!("failed to spawn flag thread ({e}); serving defaults");
            let mut inner = self.shared.lock();
            inner.status = FlagStatus::Failed;
            self.shared.cond.notify_all();
        }
    }

    /// Block until initialization settles (Ready or Failed).
    pub fn wait_for_initialization(&self) {
        self.start();
        let inner = self.shared.lock();
        let _settled = self
            .shared
            .cond
            .wait_while(inner, |i| !i.status.is_settled() && !i.closed)
            .unwrap_or_else(|p| p.into_inner());
    }

    /// Re-fetch now and notify subscribers of changed flags.
    pub fn refresh(&self) {
        self.shared.refresh();
    }

    /// String variation of `flag_key`, or `default` on any evaluation problem.
    pub fn variation_str(&self, flag_key: &str, default: &str) -> String {
        match self.evaluate_str(flag_key) {
            Ok(value) => value,
            Err(e) => {
                debug!("flag `{flag_key}` fell back to default: {e}");
                default.to_string()
            }
        }
    }

    fn evaluate_str(&self, flag_key: &str) -> Result<String, FlagError> {
        let inner = self.shared.lock();
        if inner.status != FlagStatus::Ready {
            return Err(FlagError::NotReady(inner.status));
        }
        match inner.values.get(flag_key) {
            None | Some(Value::Null) => Err(FlagError::Unset(flag_key.to_string())),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(FlagError::WrongType(flag_key.to_string())),
        }
    }

    /// Call `callback` whenever `flag_key` changes. Dropping the returned
    /// handle unregisters it.
    pub fn on_change<F>(&self, flag_key: &str, callback: F) -> FlagSubscription
    where
        F: Fn(Option<&Value>) + Send + Sync + 'static,
    {
        let mut inner = self.shared.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        if !inner.closed {
            inner.subscribers.push(Subscriber {
                id,
                key: flag_key.to_string(),
                callback: Arc::new(callback),
            });
        }
        FlagSubscription {
            shared: Arc::downgrade(&self.shared),
            id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().subscribers.len()
    }

    /// Stop polling and drop every callback. Idempotent.
    pub fn close(&self) {
        let mut inner = self.shared.lock();
        if !inner.closed {
            inner.closed = true;
            inner.subscribers.clear();
            info!("flag client closed");
        }
        self.shared.cond.notify_all();
    }
}

#[must_use = "dropping the subscription unregisters the callback"]
pub struct FlagSubscription {
    shared: Weak<Shared>,
    id: u64,
}

impl FlagSubscription {
    pub fn dispose(self) {}
}

impl Drop for FlagSubscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.lock().subscribers.retain(|s| s.id != self.id);
        }
    }
}
