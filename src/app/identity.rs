// src/app/identity.rs — persisted pseudo-random user id
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, warn};

pub const USER_ID_KEY: &str = "showtimes.userId";
pub const STORAGE_FILE: &str = "local_storage.db";

const SQL_CREATE_KV: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
  key   TEXT PRIMARY KEY,
  value TEXT NOT NULL
)
"#;

/// Correlation key sent to the backend. Not a security token.
///
/// The persisted row is the source of truth: every `user_id` call reads it, so
/// a row cleared by another process or connection is noticed on the next call.
pub struct IdentityProvider {
    conn: Option<Mutex<Connection>>,
    session: Mutex<Option<String>>,
}

impl IdentityProvider {
    /// Open (or create) the key-value store at `path`. Never fails: an
    /// unusable store degrades to a per-session token.
    pub fn open(path: &Path) -> Self {
        let conn = match open_store(path) {
            Ok(c) => Some(Mutex::new(c)),
            Err(e) => {
                warn!(
                    "identity store {} unavailable ({e}); using a per-session id",
                    path.display()
                );
                None
            }
        };
        Self {
            conn,
            session: Mutex::new(None),
        }
    }

    pub fn open_in(dir: &Path) -> Self {
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!("failed to create {}: {e}", dir.display());
        }
        Self::open(&dir.join(STORAGE_FILE))
    }

    /// Storage-less provider; the id lives only as long as this value.
    pub fn in_memory() -> Self {
        Self {
            conn: None,
            session: Mutex::new(None),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.conn.is_some()
    }

    pub fn user_id(&self) -> String {
        match self.load_or_create() {
            Ok(id) => id,
            Err(e) => {
                warn!("identity store read/write failed ({e}); using a per-session id");
                self.session_id()
            }
        }
    }

    /// Drop the stored id (persisted and per-session); the next `user_id`
    /// call mints a new one.
    pub fn forget(&self) {
        *self.session_lock() = None;
        if let Some(conn) = &self.conn {
            let conn = conn.lock().unwrap_or_else(|p| p.into_inner());
            if let Err(e) = conn.execute("DELETE FROM kv WHERE key = ?1", params![USER_ID_KEY]) {
                warn!("failed to clear stored user id: {e}");
            }
        }
    }

    fn session_lock(&self) -> MutexGuard<'_, Option<String>> {
        self.session.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn session_id(&self) -> String {
        self.session_lock().get_or_insert_with(new_token).clone()
    }

    fn load_or_create(&self) -> rusqlite::Result<String> {
        let Some(conn) = &self.conn else {
            return Ok(self.session_id());
        };
        let conn = conn.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(existing) = read_value(&conn, USER_ID_KEY)? {
            return Ok(existing);
        }
        // Check-then-set: a concurrent writer wins and we adopt its value.
        conn.execute(
            "INSERT OR IGNORE INTO kv (key, value) VALUES (?1, ?2)",
            params![USER_ID_KEY, new_token()],
        )?;
        let id = read_value(&conn, USER_ID_KEY)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        info!("minted user id {id}");
        Ok(id)
    }
}

fn open_store(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch(SQL_CREATE_KV)?;
    Ok(conn)
}

fn read_value(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
        row.get::<_, String>(0)
    })
    .optional()
}

fn new_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
