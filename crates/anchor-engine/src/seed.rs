//! SeedLoader: initialize or restore a session from a named profile
//!
//! A profile seeds the state vector, copies display metadata, replays its
//! historical collapse events into the behavior log and attaches an optional
//! drift lexicon. Nothing here fails the caller: a missing profile leaves the
//! session untouched, a missing lexicon attaches an empty one.
//!
//! Vector keys may use display aliases (Instability/Stability) or canonical
//! names. Aliases are applied first, canonical keys second, so canonical keys
//! win when a profile carries both.

use crate::session::{DriftLexicon, Session};
use crate::vector::AnchorVector;
use anchor_core::{Dimension, Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// On-disk seed profile. Absent, null or mistyped fields keep the session's
/// prior values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedProfile {
    pub last_known_vector: Map<String, Value>,
    pub goal_vector: Option<Map<String, Value>>,
    pub persona_style: Option<String>,
    pub anchor_weights: Option<Value>,
    pub feature_flags: Option<Value>,
    pub collapse_events: Vec<Value>,
    pub consequence_drift_lexicon: Option<String>,
    pub consequence_drift_path: Option<String>,
}

impl SeedProfile {
    /// Only text that is not a JSON object fails; each field is read on its
    /// own so one mistyped field does not discard the rest.
    pub fn parse(content: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(content).map_err(|e| Error::malformed(format!("seed profile: {}", e)))?;
        let Value::Object(fields) = value else {
            return Err(Error::malformed("seed profile is not an object"));
        };
        Ok(Self {
            last_known_vector: field(&fields, "last_known_vector").unwrap_or_default(),
            goal_vector: field(&fields, "goal_vector"),
            persona_style: field(&fields, "persona_style"),
            anchor_weights: field(&fields, "anchor_weights"),
            feature_flags: field(&fields, "feature_flags"),
            collapse_events: field(&fields, "collapse_events").unwrap_or_default(),
            consequence_drift_lexicon: field(&fields, "consequence_drift_lexicon"),
            consequence_drift_path: field(&fields, "consequence_drift_path"),
        })
    }

    /// Lexicon named by the profile, under either key.
    pub fn lexicon_name(&self) -> Option<&str> {
        self.consequence_drift_lexicon
            .as_deref()
            .or(self.consequence_drift_path.as_deref())
    }
}

fn field<T: DeserializeOwned>(fields: &Map<String, Value>, name: &str) -> Option<T> {
    let value = fields.get(name).filter(|v| !v.is_null())?;
    match T::deserialize(value) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Skipping malformed seed field {}: {}", name, e);
            None
        }
    }
}

/// External collaborator serving seed profiles, lexicons and the alias registry.
pub trait SeedSource: Send + Sync {
    fn load_profile(&self, seed_id: &str) -> Result<SeedProfile>;
    fn load_lexicon(&self, name: &str) -> Result<DriftLexicon>;
    /// Alias → seed id. A missing registry is `ResourceNotFound`.
    fn load_registry(&self) -> Result<HashMap<String, String>>;
}

/// `<seeds_dir>/<id>.json`, `<lexicon_dir>/<name>`, `<seeds_dir>/<registry_file>`.
#[derive(Debug, Clone)]
pub struct FsSeedSource {
    seeds_dir: PathBuf,
    lexicon_dir: PathBuf,
    registry_file: String,
}

impl FsSeedSource {
    pub fn new(seeds_dir: impl AsRef<Path>, lexicon_dir: impl AsRef<Path>, registry_file: impl Into<String>) -> Self {
        Self {
            seeds_dir: seeds_dir.as_ref().to_path_buf(),
            lexicon_dir: lexicon_dir.as_ref().to_path_buf(),
            registry_file: registry_file.into(),
        }
    }

    pub fn from_config(config: &crate::config::SeedConfig) -> Self {
        Self::new(&config.seeds_dir, &config.lexicon_dir, config.registry_file.clone())
    }
}

/// Ids and names become file names; anything path-like cannot resolve.
fn safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
}

fn read_resource(kind: &str, path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(c) => Ok(c),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::not_found(kind, path.display().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

impl SeedSource for FsSeedSource {
    fn load_profile(&self, seed_id: &str) -> Result<SeedProfile> {
        if !safe_name(seed_id) {
            return Err(Error::not_found("seed profile", seed_id));
        }
        let path = self.seeds_dir.join(format!("{}.json", seed_id));
        SeedProfile::parse(&read_resource("seed profile", &path)?)
    }

    fn load_lexicon(&self, name: &str) -> Result<DriftLexicon> {
        if !safe_name(name) {
            return Err(Error::not_found("drift lexicon", name));
        }
        let path = self.lexicon_dir.join(name);
        match serde_json::from_str::<Value>(&read_resource("drift lexicon", &path)?)? {
            Value::Object(map) => Ok(map),
            _ => Err(Error::malformed(format!("{} is not an object", path.display()))),
        }
    }

    fn load_registry(&self) -> Result<HashMap<String, String>> {
        let path = self.seeds_dir.join(&self.registry_file);
        Ok(serde_json::from_str(&read_resource("seed registry", &path)?)?)
    }
}

/// Result of `SeedLoader::apply`.
#[derive(Debug, Clone, PartialEq)]
pub enum SeedOutcome {
    Applied(SeedSummary),
    NotApplied,
}

impl SeedOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, SeedOutcome::Applied(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeedSummary {
    pub seed_id: String,
    pub dimensions_set: Vec<Dimension>,
    pub events_replayed: usize,
    pub lexicon: String,
    pub lexicon_loaded: bool,
}

pub struct SeedLoader {
    source: Arc<dyn SeedSource>,
    default_lexicon: String,
    registry: OnceLock<HashMap<String, String>>,
}

impl SeedLoader {
    pub fn new(source: Arc<dyn SeedSource>, default_lexicon: impl Into<String>) -> Self {
        Self { source, default_lexicon: default_lexicon.into(), registry: OnceLock::new() }
    }

    /// Canonical seed id for `alias` (case-insensitive), if registered.
    /// The registry is read once per loader.
    pub fn resolve_alias(&self, alias: &str) -> Option<String> {
        self.registry
            .get_or_init(|| match self.source.load_registry() {
                Ok(map) => map.into_iter().map(|(k, v)| (k.to_lowercase(), v)).collect(),
                Err(e) => {
                    debug!("No seed registry: {}", e);
                    HashMap::new()
                }
            })
            .get(&alias.to_lowercase())
            .cloned()
    }

    pub fn apply(&self, session: &mut Session, seed_id: &str) -> SeedOutcome {
        let profile = match self.source.load_profile(seed_id) {
            Ok(p) => p,
            Err(e) if e.is_not_found() => {
                debug!("Seed {} not found", seed_id);
                return SeedOutcome::NotApplied;
            }
            Err(e) => {
                warn!("Seed {} unusable: {}", seed_id, e);
                return SeedOutcome::NotApplied;
            }
        };

        let dimensions_set = apply_vector(&mut session.state, &profile.last_known_vector);
        if let Some(goal) = &profile.goal_vector {
            apply_vector(&mut session.goal, goal);
        }

        if let Some(style) = &profile.persona_style {
            session.persona_style = style.clone();
        }
        if let Some(weights) = &profile.anchor_weights {
            session.anchor_weights = Some(weights.clone());
        }
        if let Some(flags) = &profile.feature_flags {
            session.feature_flags = Some(flags.clone());
        }

        let mut events_replayed = 0;
        for event in &profile.collapse_events {
            match render_collapse_event(event) {
                Some(line) => {
                    session.log(line);
                    events_replayed += 1;
                }
                None => debug!("Skipping malformed collapse event in {}", seed_id),
            }
        }

        let lexicon = profile.lexicon_name().unwrap_or(self.default_lexicon.as_str()).to_string();
        let lexicon_loaded = match self.source.load_lexicon(&lexicon) {
            Ok(map) => {
                session.drift_lexicon = map;
                session.log(format!("Loaded drift lexicon: {}", lexicon));
                true
            }
            Err(e) => {
                debug!("Drift lexicon {}: {}", lexicon, e);
                session.drift_lexicon = DriftLexicon::new();
                if e.is_not_found() {
                    session.log(format!("Drift lexicon {} not found. Loaded empty map.", lexicon));
                } else {
                    session.log(format!("Drift lexicon {} unreadable. Loaded empty map.", lexicon));
                }
                false
            }
        };

        info!(
            "Applied seed {} ({} dimensions, {} events, lexicon {})",
            seed_id,
            dimensions_set.len(),
            events_replayed,
            if lexicon_loaded { "loaded" } else { "empty" }
        );

        SeedOutcome::Applied(SeedSummary {
            seed_id: seed_id.to_string(),
            dimensions_set,
            events_replayed,
            lexicon,
            lexicon_loaded,
        })
    }
}

/// Copy numeric entries into `vector`: aliases first, canonical keys second.
fn apply_vector(vector: &mut AnchorVector, values: &Map<String, Value>) -> Vec<Dimension> {
    let mut set = Vec::new();
    let aliases = values.iter().filter_map(|(k, v)| Dimension::from_alias(k).map(|d| (d, v)));
    let canonical = values.iter().filter_map(|(k, v)| Dimension::from_canonical(k).map(|d| (d, v)));
    for (dim, value) in aliases.chain(canonical) {
        match value.as_f64() {
            Some(v) => {
                vector.set(dim, v);
                if !set.contains(&dim) {
                    set.push(dim);
                }
            }
            None => debug!("Skipping non-numeric seed value for {}", dim),
        }
    }
    set
}

fn render_collapse_event(event: &Value) -> Option<String> {
    let obj = event.as_object()?;
    let trigger = obj.get("trigger")?.as_str()?;
    let tick = match obj.get("tick") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "?".to_string(),
    };
    Some(format!("[Seed Event @ {}] {}", tick, trigger))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_name_rejects_paths() {
        assert!(safe_name("Therapist_Seed_v2"));
        assert!(!safe_name("../etc/passwd"));
        assert!(!safe_name("a/b"));
        assert!(!safe_name(""));
    }

    #[test]
    fn collapse_event_rendering() {
        let line = render_collapse_event(&serde_json::json!({"tick": 12, "trigger": "loss"}));
        assert_eq!(line.as_deref(), Some("[Seed Event @ 12] loss"));
        assert!(render_collapse_event(&serde_json::json!("loss")).is_none());
        assert!(render_collapse_event(&serde_json::json!({"tick": 3})).is_none());
    }

    #[test]
    fn mistyped_fields_are_dropped_individually() {
        let profile = SeedProfile::parse(
            r#"{"persona_style": 3, "last_known_vector": {"Fear": 0.7}, "collapse_events": "oops",
                "goal_vector": null, "consequence_drift_lexicon": "lex.json"}"#,
        )
        .unwrap();
        assert_eq!(profile.persona_style, None);
        assert_eq!(profile.last_known_vector.get("Fear"), Some(&serde_json::json!(0.7)));
        assert!(profile.collapse_events.is_empty());
        assert!(profile.goal_vector.is_none());
        assert_eq!(profile.lexicon_name(), Some("lex.json"));

        assert!(SeedProfile::parse("[1, 2]").is_err());
        assert!(SeedProfile::parse("{not json").is_err());
    }

    #[test]
    fn lexicon_name_accepts_either_key() {
        let mut p = SeedProfile::default();
        assert_eq!(p.lexicon_name(), None);
        p.consequence_drift_path = Some("b.json".into());
        assert_eq!(p.lexicon_name(), Some("b.json"));
        p.consequence_drift_lexicon = Some("a.json".into());
        assert_eq!(p.lexicon_name(), Some("a.json"));
    }
}
