//! AnchorService: request-level entry points
//!
//! Each request checks a session out of the store (restoring it, or creating
//! it from the seed registered under the session id), runs one engine
//! operation and writes the snapshot back. Requests for the same id are
//! serialized; different ids run concurrently. A session's lock entry lives
//! only while some request holds or waits on it.

use crate::store::SessionStore;
use anchor_core::{Error, Result, SessionKey};
use anchor_engine::{Anchor, Deltas, DiagnosticSnapshot, Response, Session, SnapshotRecord};
use dashmap::DashMap;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

/// Gated engine output for one request.
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub session_id: String,
    #[serde(flatten)]
    pub response: Response,
    /// Attached when the caller asks for the full state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_state: Option<DiagnosticSnapshot>,
}

/// Held for the duration of one request; drops the lock entry on release
/// when no other request is waiting on it.
struct SessionGuard<'a> {
    locks: &'a DashMap<SessionKey, Arc<Mutex<()>>>,
    key: SessionKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks.remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

pub struct AnchorService {
    anchor: Arc<Anchor>,
    store: Arc<dyn SessionStore>,
    locks: DashMap<SessionKey, Arc<Mutex<()>>>,
}

impl AnchorService {
    pub fn new(anchor: Arc<Anchor>, store: Arc<dyn SessionStore>) -> Self {
        Self { anchor, store, locks: DashMap::new() }
    }

    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    /// Number of sessions with a request in flight.
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }

    async fn lock(&self, key: &SessionKey) -> SessionGuard<'_> {
        let lock = self.locks.entry(key.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone();
        let guard = lock.lock_owned().await;
        SessionGuard { locks: &self.locks, key: key.clone(), guard: Some(guard) }
    }

    /// Restore `key` from the store, or create it seeded by its own id.
    async fn checkout(&self, key: &SessionKey) -> Result<Session> {
        match self.store.load(key).await? {
            Some(record) => {
                debug!("Restored session {}", key);
                Ok(self.anchor.import_snapshot(record))
            }
            None => {
                info!("Creating session {}", key);
                Ok(self.anchor.create_session(Some(key.as_str())))
            }
        }
    }

    async fn checkin(&self, key: &SessionKey, session: &Session) -> Result<()> {
        self.store.save(key, &self.anchor.export_snapshot(session)).await
    }

    /// Run `op` on the session for `key` under its lock, then persist.
    async fn with_session<T>(&self, key: &SessionKey, op: impl FnOnce(&Anchor, &mut Session) -> T) -> Result<T> {
        let _guard = self.lock(key).await;
        let mut session = self.checkout(key).await?;
        let out = op(&self.anchor, &mut session);
        self.checkin(key, &session).await?;
        Ok(out)
    }

    /// Feed free text through the cue parser and one tick.
    pub async fn send_input(&self, key: &SessionKey, text: &str, show_full_state: bool) -> Result<Reply> {
        let (response, full_state) = self
            .with_session(key, |anchor, session| {
                let response = anchor.apply_text(session, text);
                let full = show_full_state.then(|| anchor.full_state(session));
                (response, full)
            })
            .await?;
        Ok(Reply { session_id: key.to_string(), response, full_state })
    }

    /// One tick with explicit deltas.
    pub async fn run_tick(&self, key: &SessionKey, deltas: Option<Deltas>, positive: bool) -> Result<Reply> {
        let response = self
            .with_session(key, |anchor, session| anchor.apply_tick(session, deltas, positive))
            .await?;
        Ok(Reply { session_id: key.to_string(), response, full_state: None })
    }

    /// Full diagnostic snapshot; creates the session if it does not exist.
    pub async fn full_state(&self, key: &SessionKey) -> Result<DiagnosticSnapshot> {
        self.with_session(key, |anchor, session| anchor.full_state(session)).await
    }

    /// Replace the session's memory orbit from a node list file.
    pub async fn load_memory(&self, key: &SessionKey, path: &Path) -> Result<usize> {
        self.with_session(key, |anchor, session| anchor.load_memory(session, path))
            .await?
    }

    /// Stored snapshot for an existing session.
    pub async fn export(&self, key: &SessionKey) -> Result<SnapshotRecord> {
        let _guard = self.lock(key).await;
        self.store
            .load(key)
            .await?
            .ok_or_else(|| Error::SessionNotFound(key.to_string()))
    }

    /// Overwrite the stored session with `record`.
    pub async fn import(&self, key: &SessionKey, record: SnapshotRecord) -> Result<()> {
        let _guard = self.lock(key).await;
        let session = self.anchor.import_snapshot(record);
        self.checkin(key, &session).await
    }

    /// Forget a session. Returns whether it existed.
    pub async fn reset(&self, key: &SessionKey) -> Result<bool> {
        let _guard = self.lock(key).await;
        let removed = self.store.remove(key).await?;
        if removed {
            info!("Reset session {}", key);
        }
        Ok(removed)
    }
}
