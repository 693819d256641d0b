//! MemoryOrbit: ordered, id-unique memory nodes that bias drift
//!
//! Active nodes add their sparse per-dimension bias to the state every tick.
//! Nodes missing from the orbit are resolved lazily from external cluster
//! files; the first two characters of an id pick the cluster. Lookups are
//! cached per identifier (hits and misses alike) and coalesced, so a given
//! identifier triggers at most one cluster load per session.

use anchor_core::{Dimension, Error, Result};
use dashmap::DashMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Dormant,
    Active,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryNode {
    pub id: String,
    /// Sparse: absent dimensions contribute zero.
    #[serde(default, deserialize_with = "deserialize_bias")]
    pub bias: BTreeMap<Dimension, f64>,
    #[serde(default)]
    pub tier: Tier,
    /// Psychological remoteness, never negative.
    #[serde(default, deserialize_with = "deserialize_orbit")]
    pub orbit: f64,
}

impl MemoryNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), bias: BTreeMap::new(), tier: Tier::Dormant, orbit: 0.0 }
    }

    pub fn with_bias(mut self, dim: Dimension, bias: f64) -> Self {
        self.bias.insert(dim, bias);
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_orbit(mut self, orbit: f64) -> Self {
        self.orbit = orbit.max(0.0);
        self
    }

    pub fn bias(&self, dim: Dimension) -> f64 {
        self.bias.get(&dim).copied().unwrap_or(0.0)
    }

    pub fn is_active(&self) -> bool {
        self.tier == Tier::Active
    }

    /// Parse one cluster entry. Shape mismatches become `MalformedEntry`.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::malformed(format!("memory node: {}", e)))
    }
}

/// Bias keys may use canonical names or display aliases; unknown keys are dropped.
fn deserialize_bias<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<Dimension, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: HashMap<String, f64> = HashMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter(|(_, v)| v.is_finite())
        .filter_map(|(k, v)| Dimension::from_key(&k).map(|d| (d, v)))
        .collect())
}

fn deserialize_orbit<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(if raw.is_finite() { raw.max(0.0) } else { 0.0 })
}

/// Parse a list of cluster entries, skipping malformed ones.
pub fn parse_nodes(entries: Vec<serde_json::Value>) -> Vec<MemoryNode> {
    entries
        .into_iter()
        .filter_map(|entry| match MemoryNode::from_value(entry) {
            Ok(node) => Some(node),
            Err(e) => {
                debug!("Skipping {}", e);
                None
            }
        })
        .collect()
}

// ============================================================
// Cluster source
// ============================================================

/// External collaborator that serves memory cluster resources.
pub trait ClusterSource: Send + Sync {
    /// Raw entries of the cluster named `key`. A missing cluster is
    /// `Error::ResourceNotFound`.
    fn load_cluster(&self, key: &str) -> Result<Vec<serde_json::Value>>;
}

/// Cluster resource key for a node id: its first two characters, lower-cased.
pub fn cluster_key(node_id: &str) -> String {
    node_id.chars().take(2).collect::<String>().to_lowercase()
}

/// Reads `<dir>/<key>.json` files.
#[derive(Debug, Clone)]
pub struct FsClusterSource {
    dir: PathBuf,
}

impl FsClusterSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn cluster_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl ClusterSource for FsClusterSource {
    fn load_cluster(&self, key: &str) -> Result<Vec<serde_json::Value>> {
        let path = self.cluster_path(key);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::not_found("memory cluster", path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<serde_json::Value>(&content)? {
            serde_json::Value::Array(entries) => Ok(entries),
            _ => Err(Error::malformed(format!("{} is not a list", path.display()))),
        }
    }
}

/// Source with no clusters at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClusters;

impl ClusterSource for NoClusters {
    fn load_cluster(&self, key: &str) -> Result<Vec<serde_json::Value>> {
        Err(Error::not_found("memory cluster", key))
    }
}

// ============================================================
// Orbit
// ============================================================

type NodeCell = Arc<OnceLock<Option<Arc<MemoryNode>>>>;

#[derive(Debug, Clone, Default)]
pub struct MemoryOrbit {
    nodes: Vec<MemoryNode>,
    cache: DashMap<String, NodeCell>,
}

impl MemoryOrbit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[MemoryNode] {
        &self.nodes
    }

    pub fn get(&self, id: &str) -> Option<&MemoryNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Append `node` unless its id is already present. Returns whether it was added.
    pub fn insert(&mut self, node: MemoryNode) -> bool {
        if self.contains(&node.id) {
            debug!("Memory node {} already in orbit", node.id);
            return false;
        }
        self.nodes.push(node);
        true
    }

    /// Replace all nodes, keeping the first occurrence of each id.
    pub fn replace(&mut self, nodes: Vec<MemoryNode>) {
        self.nodes.clear();
        for node in nodes {
            self.insert(node);
        }
    }

    pub fn active(&self) -> impl Iterator<Item = &MemoryNode> {
        self.nodes.iter().filter(|n| n.is_active())
    }

    /// Promote every node matching `memory_id`: pull its orbit in by `step`
    /// (floored at 0) and make it active. Returns the promoted nodes.
    pub fn trigger(&mut self, memory_id: &str, step: f64) -> Vec<MemoryNode> {
        let mut triggered = Vec::new();
        for node in self.nodes.iter_mut().filter(|n| n.id == memory_id) {
            node.orbit = (node.orbit - step).max(0.0);
            node.tier = Tier::Active;
            triggered.push(node.clone());
        }
        triggered
    }

    /// Look up a node in its external cluster, through the per-session cache.
    /// Missing or unreadable clusters resolve to `None`.
    pub fn resolve(&self, node_id: &str, source: &dyn ClusterSource) -> Option<Arc<MemoryNode>> {
        let cell: NodeCell = self
            .cache
            .entry(node_id.to_string())
            .or_insert_with(|| Arc::new(OnceLock::new()))
            .clone();
        cell.get_or_init(|| load_from_cluster(node_id, source)).clone()
    }

    pub fn cached_ids(&self) -> Vec<String> {
        self.cache.iter().map(|e| e.key().clone()).collect()
    }

    /// Load an orbit from a JSON list of nodes.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::not_found("memory file", path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let entries = match serde_json::from_str::<serde_json::Value>(&content)? {
            serde_json::Value::Array(entries) => entries,
            _ => return Err(Error::malformed(format!("{} is not a list", path.display()))),
        };
        let mut orbit = Self::new();
        orbit.replace(parse_nodes(entries));
        Ok(orbit)
    }
}

fn load_from_cluster(node_id: &str, source: &dyn ClusterSource) -> Option<Arc<MemoryNode>> {
    let key = cluster_key(node_id);
    let entries = match source.load_cluster(&key) {
        Ok(entries) => entries,
        Err(e) if e.is_not_found() => {
            debug!("Memory {} unresolved: {}", node_id, e);
            return None;
        }
        Err(e) => {
            warn!("Memory cluster {} unreadable: {}", key, e);
            return None;
        }
    };
    parse_nodes(entries)
        .into_iter()
        .find(|n| n.id == node_id)
        .map(Arc::new)
}

impl Serialize for MemoryOrbit {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.nodes.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MemoryOrbit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let entries = Vec::<serde_json::Value>::deserialize(deserializer)?;
        let mut orbit = Self::new();
        orbit.replace(parse_nodes(entries));
        Ok(orbit)
    }
}

impl PartialEq for MemoryOrbit {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_key_uses_first_two_chars() {
        assert_eq!(cluster_key("The Cave"), "th");
        assert_eq!(cluster_key("x"), "x");
        assert_eq!(cluster_key("Ærø"), "ær");
    }

    #[test]
    fn orbit_floor_on_parse() {
        let node = MemoryNode::from_value(serde_json::json!({"id": "a", "orbit": -2.0})).unwrap();
        assert_eq!(node.orbit, 0.0);
        assert_eq!(node.tier, Tier::Dormant);
    }
}
