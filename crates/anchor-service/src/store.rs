//! Session stores: where snapshot records live between requests
//!
//! Both stores wrap each record in an envelope with save and expiry times.
//! Expired records read as absent and are dropped on access.

use anchor_core::{Result, SessionKey};
use anchor_engine::SnapshotRecord;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Upper bound accepted for a TTL (100 years).
const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

fn ttl_from_secs(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_TTL_SECS) as i64)
}

/// Pluggable snapshot persistence, keyed by session id.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// The live record for `key`, if any.
    async fn load(&self, key: &SessionKey) -> Result<Option<SnapshotRecord>>;

    /// Store `record`, resetting its expiry.
    async fn save(&self, key: &SessionKey, record: &SnapshotRecord) -> Result<()>;

    /// Drop the record. Returns whether one existed.
    async fn remove(&self, key: &SessionKey) -> Result<bool>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    pub saved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub snapshot: SnapshotRecord,
}

impl StoredSnapshot {
    fn new(record: &SnapshotRecord, ttl: Duration) -> Self {
        let saved_at = Utc::now();
        Self { saved_at, expires_at: saved_at + ttl, snapshot: record.clone() }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// ============================================================
// In-memory
// ============================================================

pub struct InMemoryStore {
    entries: DashMap<SessionKey, StoredSnapshot>,
    ttl: Duration,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(anchor_engine::config::StoreConfig::default().ttl_secs)
    }
}

impl InMemoryStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self { entries: DashMap::new(), ttl: ttl_from_secs(ttl_secs) }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired record. Returns how many went.
    pub fn evict_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, stored| !stored.is_expired(now));
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            info!("Evicted {} expired sessions", evicted);
        }
        evicted
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemoryStore {
    async fn load(&self, key: &SessionKey) -> Result<Option<SnapshotRecord>> {
        let now = Utc::now();
        match self.entries.get(key) {
            None => return Ok(None),
            Some(stored) if !stored.is_expired(now) => return Ok(Some(stored.snapshot.clone())),
            Some(_) => {}
        }
        self.entries.remove_if(key, |_, stored| stored.is_expired(now));
        debug!("Session {} expired", key);
        Ok(None)
    }

    async fn save(&self, key: &SessionKey, record: &SnapshotRecord) -> Result<()> {
        self.entries.insert(key.clone(), StoredSnapshot::new(record, self.ttl));
        Ok(())
    }

    async fn remove(&self, key: &SessionKey) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }
}

// ============================================================
// File-backed
// ============================================================

/// One `<dir>/<key>.json` envelope per session, written atomically.
pub struct FileStore {
    dir: PathBuf,
    ttl: Duration,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>, ttl_secs: u64) -> Self {
        Self { dir: dir.as_ref().to_path_buf(), ttl: ttl_from_secs(ttl_secs) }
    }

    pub fn from_config(config: &anchor_engine::config::StoreConfig) -> Self {
        Self::new(&config.snapshot_dir, config.ttl_secs)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Session ids made only of `[A-Za-z0-9_-]` are used as the file name.
    /// Any other id is sanitized and suffixed with `.<hash>`; plain ids never
    /// contain `.`, so distinct ids never share a file.
    pub fn session_path(&self, key: &SessionKey) -> PathBuf {
        let id = key.as_str();
        let is_plain = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
        if !id.is_empty() && id.chars().all(is_plain) {
            return self.dir.join(format!("{}.json", id));
        }
        let sanitized: String = id.chars().map(|c| if is_plain(c) { c } else { '_' }).collect();
        let digest = Sha256::digest(id.as_bytes());
        self.dir.join(format!("{}.{}.json", sanitized, hex::encode(&digest[..16])))
    }
}

#[async_trait::async_trait]
impl SessionStore for FileStore {
    async fn load(&self, key: &SessionKey) -> Result<Option<SnapshotRecord>> {
        let path = self.session_path(key);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredSnapshot = match serde_json::from_str(&content) {
            Ok(s) => s,
            Err(e) => {
                warn!("Unreadable snapshot {}: {} - starting fresh", path.display(), e);
                return Ok(None);
            }
        };
        if stored.is_expired(Utc::now()) {
            debug!("Session {} expired", key);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                debug!("Could not remove {}: {}", path.display(), e);
            }
            return Ok(None);
        }
        Ok(Some(stored.snapshot))
    }

    async fn save(&self, key: &SessionKey, record: &SnapshotRecord) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.session_path(key);
        let json = serde_json::to_string_pretty(&StoredSnapshot::new(record, self.ttl))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!("Saved session {} to {}", key, path.display());
        Ok(())
    }

    async fn remove(&self, key: &SessionKey) -> Result<bool> {
        match tokio::fs::remove_file(self.session_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_session_ids_map_to_their_own_name() {
        let store = FileStore::new("/tmp/s", 10);
        assert_eq!(store.session_path(&SessionKey::new("abc-1_x")), Path::new("/tmp/s/abc-1_x.json"));
    }

    #[test]
    fn other_session_ids_get_distinct_hashed_names() {
        let store = FileStore::new("/tmp/s", 10);
        let ids = ["alice.bob", "alice_bob", "alice/bob", "a/b", "a_b", "../../etc", ""];
        let paths: std::collections::HashSet<PathBuf> =
            ids.iter().map(|id| store.session_path(&SessionKey::new(*id))).collect();
        assert_eq!(paths.len(), ids.len());

        let escaped = store.session_path(&SessionKey::new("../../etc"));
        assert_eq!(escaped.parent(), Some(Path::new("/tmp/s")));
        let name = escaped.file_name().and_then(|n| n.to_str()).unwrap();
        assert!(name.starts_with("______etc."));
        assert!(name.ends_with(".json"));
        assert_eq!(store.session_path(&SessionKey::new("alice.bob")), store.session_path(&SessionKey::new("alice.bob")));
    }

    #[test]
    fn huge_ttl_is_capped() {
        assert_eq!(ttl_from_secs(u64::MAX), Duration::seconds(MAX_TTL_SECS as i64));
    }
}
