//! Engine configuration
//!
//! All tunable parameters in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists.

use anchor_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tick pipeline constants.
    pub drift: DriftConfig,
    /// Priority weights per dimension category.
    pub weights: PriorityWeights,
    /// Chaos and coherence thresholds.
    pub chaos: ChaosConfig,
    /// Diagnostics gate keywords and stable reply.
    pub diagnostics: DiagnosticsConfig,
    /// Memory orbit parameters.
    pub memory: MemoryConfig,
    /// Seed profile locations.
    pub seeds: SeedConfig,
    /// Snapshot store parameters.
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Trust moves by this much per tick, up or down with valence.
    pub trust_variance: f64,
    /// Added to `1 - trust_level` when recomputing distrust.
    pub distrust_decay: f64,
    /// Exploration noise amplitude is `curiosity * exploration_gain`.
    pub exploration_gain: f64,
    /// Purpose above this pulls toward the goal vector.
    pub purpose_threshold: f64,
    pub purpose_gain: f64,
    /// Base shift applied to the most deviant dimension each tick.
    pub recalibration_step: f64,
    pub soft_reset_high: f64,
    pub soft_reset_low: f64,
    pub soft_reset_step: f64,
    /// Soft reset amount grows by this fraction per elapsed tick.
    pub soft_reset_growth: f64,
    /// Max entries retained in efficiency and chaos history.
    pub history_cap: usize,
}

/// Priority weights (environment: Fear/Safety, state: Time, self: Choice).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityWeights {
    pub environment: f64,
    pub state: f64,
    #[serde(rename = "self")]
    pub self_image: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaosConfig {
    /// Sum of absolute deviations above this marks chaos.
    pub threshold: f64,
    /// Coherence below this writes an identity warning.
    pub coherence_warning: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Case-insensitive substrings that force a full snapshot.
    pub trigger_keywords: Vec<String>,
    /// Subset of triggers that also attach the personality narrative.
    pub personality_keywords: Vec<String>,
    /// Text of the minimized reply.
    pub stable_reply: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Orbit distance removed per trigger (floored at 0).
    pub trigger_step: f64,
    /// Directory holding `<key>.json` memory cluster files.
    pub cluster_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub seeds_dir: PathBuf,
    pub lexicon_dir: PathBuf,
    /// Lexicon file used when a profile names none.
    pub default_lexicon: String,
    /// Alias registry, relative to `seeds_dir`.
    pub registry_file: String,
    /// Seed alias used when a session is created without one.
    pub default_seed: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Snapshot time-to-live in seconds.
    pub ttl_secs: u64,
    /// Directory for the file-backed store.
    pub snapshot_dir: PathBuf,
}

// ============================================================
// Defaults
// ============================================================

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            drift: DriftConfig::default(),
            weights: PriorityWeights::default(),
            chaos: ChaosConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            memory: MemoryConfig::default(),
            seeds: SeedConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            trust_variance: 0.1,
            distrust_decay: 0.01,
            exploration_gain: 0.05,
            purpose_threshold: 0.7,
            purpose_gain: 0.05,
            recalibration_step: 0.05,
            soft_reset_high: 0.9,
            soft_reset_low: 0.1,
            soft_reset_step: 0.05,
            soft_reset_growth: 0.01,
            history_cap: 256,
        }
    }
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self { environment: 0.4, state: 0.6, self_image: 0.8 }
    }
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self { threshold: 1.2, coherence_warning: 0.4 }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            trigger_keywords: vec![
                "diagnose".into(),
                "reveal state".into(),
                "personality vector".into(),
                "persona vector".into(),
            ],
            personality_keywords: vec!["personality vector".into(), "persona vector".into()],
            stable_reply: "Holding steady.".into(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { trigger_step: 0.3, cluster_dir: PathBuf::from("memory_clusters") }
    }
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            seeds_dir: PathBuf::from("seeds"),
            lexicon_dir: PathBuf::from("drift_lexicons"),
            default_lexicon: "nrc_consequence_drift.json".into(),
            registry_file: "seed_registry.json".into(),
            default_seed: "therapist".into(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { ttl_secs: 60 * 60 * 24, snapshot_dir: PathBuf::from("sessions") }
    }
}

// ============================================================
// Loading
// ============================================================

impl EngineConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::parse(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {} - using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {} - using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Parse TOML config text. Unset keys take their defaults.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Resolve every relative resource path against `root`.
    pub fn rooted_at(mut self, root: &Path) -> Self {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        };
        rebase(&mut self.memory.cluster_dir);
        rebase(&mut self.seeds.seeds_dir);
        rebase(&mut self.seeds.lexicon_dir);
        rebase(&mut self.store.snapshot_dir);
        self
    }
}

impl PriorityWeights {
    pub fn for_category(&self, category: anchor_core::WeightCategory) -> f64 {
        use anchor_core::WeightCategory;
        match category {
            WeightCategory::Environment => self.environment,
            WeightCategory::State => self.state,
            WeightCategory::SelfImage => self.self_image,
        }
    }
}
