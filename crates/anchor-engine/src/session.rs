//! Session: the single owner of one persona's anchor state
//!
//! Mutated only by the drift pipeline and the memory/seed subsystems.
//! No internal locking: callers serialize access per session id.

use crate::config::{EngineConfig, PriorityWeights};
use crate::memory::MemoryOrbit;
use crate::vector::{clamp01, AnchorVector};
use anchor_core::Dimension;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

/// Auxiliary drift lexicon attached by a seed (opaque to the engine).
pub type DriftLexicon = serde_json::Map<String, Value>;

#[derive(Debug, Clone)]
pub struct Session {
    pub state: AnchorVector,
    pub goal: AnchorVector,
    pub orbit: MemoryOrbit,
    /// Append-only audit trail.
    behavior_log: Vec<String>,
    /// Transient amplifiers: tag → magnitude.
    pub ripple_tags: BTreeMap<String, f64>,

    pub trust_level: f64,
    pub trust_variance: f64,
    pub distrust_decay: f64,
    pub distrust: f64,
    pub curiosity: f64,
    pub purpose: f64,
    pub ego_resistance: f64,
    pub identity_coherence: f64,
    pub goal_confidence: f64,
    pub priority_weights: PriorityWeights,

    pub(crate) efficiency_history: VecDeque<f64>,
    pub(crate) chaos_history: VecDeque<f64>,
    history_cap: usize,

    pub(crate) ticks: u64,
    pub environment_driven: u64,
    pub memory_driven: u64,

    /// Display-only label.
    pub persona_style: String,
    pub anchor_weights: Option<Value>,
    pub feature_flags: Option<Value>,
    pub drift_lexicon: DriftLexicon,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl Session {
    /// Fresh session at the hard-coded defaults.
    pub fn new(config: &EngineConfig) -> Self {
        let trust_level = 0.5;
        Self {
            state: AnchorVector::default(),
            goal: AnchorVector::default_goal(),
            orbit: MemoryOrbit::new(),
            behavior_log: Vec::new(),
            ripple_tags: BTreeMap::new(),
            trust_level,
            trust_variance: config.drift.trust_variance,
            distrust_decay: config.drift.distrust_decay,
            distrust: 1.0 - trust_level,
            curiosity: 0.5,
            purpose: 0.5,
            ego_resistance: 0.5,
            identity_coherence: 1.0,
            goal_confidence: 0.0,
            priority_weights: config.weights,
            efficiency_history: VecDeque::new(),
            chaos_history: VecDeque::new(),
            history_cap: config.drift.history_cap.max(1),
            ticks: 0,
            environment_driven: 0,
            memory_driven: 0,
            persona_style: "Observer".into(),
            anchor_weights: None,
            feature_flags: None,
            drift_lexicon: DriftLexicon::new(),
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn behavior_log(&self) -> &[String] {
        &self.behavior_log
    }

    pub fn last_behavior(&self) -> Option<&str> {
        self.behavior_log.last().map(String::as_str)
    }

    pub fn log(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        debug!(tick = self.ticks, "{}", entry);
        self.behavior_log.push(entry);
    }

    pub fn efficiency_history(&self) -> impl Iterator<Item = f64> + '_ {
        self.efficiency_history.iter().copied()
    }

    pub fn chaos_history(&self) -> impl Iterator<Item = f64> + '_ {
        self.chaos_history.iter().copied()
    }

    pub(crate) fn push_efficiency(&mut self, value: f64) {
        push_bounded(&mut self.efficiency_history, value, self.history_cap);
    }

    pub(crate) fn push_chaos(&mut self, value: f64) {
        push_bounded(&mut self.chaos_history, value, self.history_cap);
    }

    /// Presentation alias for Fear.
    pub fn instability(&self) -> f64 {
        self.state.get(Dimension::Fear)
    }

    /// Presentation alias for Safety.
    pub fn stability(&self) -> f64 {
        self.state.get(Dimension::Safety)
    }

    /// Move trust with valence, then derive distrust from it.
    pub fn update_trust(&mut self, positive: bool) {
        let delta = if positive { self.trust_variance } else { -self.trust_variance };
        self.trust_level = clamp01(self.trust_level + delta);
        self.distrust = clamp01(1.0 - self.trust_level + self.distrust_decay);
    }

    /// `(safety - fear) * (1 - time urgency)`, clamped.
    pub fn update_curiosity(&mut self) {
        let fear = self.state.get(Dimension::Fear);
        let safety = self.state.get(Dimension::Safety);
        let urgency = self.state.get(Dimension::Time);
        self.curiosity = clamp01((safety - fear) * (1.0 - urgency));
    }

    pub fn update_goal_confidence(&mut self) {
        self.goal_confidence = self.state.cosine_similarity(&self.goal);
    }

    /// 1 − mean absolute deviation from goal.
    pub fn update_identity_coherence(&mut self) -> f64 {
        self.identity_coherence = clamp01(1.0 - self.state.mean_abs_deviation(&self.goal));
        self.identity_coherence
    }

    pub(crate) fn replace_behavior_log(&mut self, log: Vec<String>) {
        self.behavior_log = log;
    }

    pub(crate) fn set_ticks(&mut self, ticks: u64) {
        self.ticks = ticks;
    }

    pub(crate) fn replace_histories(&mut self, efficiency: Vec<f64>, chaos: Vec<f64>) {
        self.efficiency_history.clear();
        self.chaos_history.clear();
        for v in efficiency {
            self.push_efficiency(v);
        }
        for v in chaos {
            self.push_chaos(v);
        }
    }
}

fn push_bounded(history: &mut VecDeque<f64>, value: f64, cap: usize) {
    history.push_back(value);
    while history.len() > cap {
        history.pop_front();
    }
}
