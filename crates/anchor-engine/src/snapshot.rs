//! SnapshotRecord: the persisted form of a session
//!
//! State vector, goal vector, tick count, coherence, goal confidence, memory
//! orbit and behavior log round-trip losslessly. The persona block carries
//! the remaining scalars; snapshots written without it restore defaults.

use crate::config::EngineConfig;
use crate::memory::MemoryOrbit;
use crate::session::{DriftLexicon, Session};
use crate::vector::AnchorVector;
use anchor_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotRecord {
    #[serde(rename = "core")]
    pub state: AnchorVector,
    pub goal_vector: AnchorVector,
    pub ticks: u64,
    pub identity_coherence: f64,
    pub goal_confidence: f64,
    pub memory_orbit: MemoryOrbit,
    pub behavior_log: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<PersonaState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaState {
    pub persona_style: String,
    pub trust_level: f64,
    pub distrust: f64,
    pub curiosity: f64,
    pub purpose: f64,
    pub ego_resistance: f64,
    #[serde(default)]
    pub ripple_tags: BTreeMap<String, f64>,
    #[serde(default)]
    pub efficiency_history: Vec<f64>,
    #[serde(default)]
    pub chaos_history: Vec<f64>,
    #[serde(default)]
    pub environment_driven: u64,
    #[serde(default)]
    pub memory_driven: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_weights: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_flags: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub drift_lexicon: DriftLexicon,
}

impl Default for SnapshotRecord {
    fn default() -> Self {
        let mut record = Session::default().export_snapshot();
        record.persona = None;
        record
    }
}

impl SnapshotRecord {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Session {
    pub fn export_snapshot(&self) -> SnapshotRecord {
        SnapshotRecord {
            state: self.state,
            goal_vector: self.goal,
            ticks: self.ticks,
            identity_coherence: self.identity_coherence,
            goal_confidence: self.goal_confidence,
            memory_orbit: self.orbit.clone(),
            behavior_log: self.behavior_log().to_vec(),
            persona: Some(PersonaState {
                persona_style: self.persona_style.clone(),
                trust_level: self.trust_level,
                distrust: self.distrust,
                curiosity: self.curiosity,
                purpose: self.purpose,
                ego_resistance: self.ego_resistance,
                ripple_tags: self.ripple_tags.clone(),
                efficiency_history: self.efficiency_history().collect(),
                chaos_history: self.chaos_history().collect(),
                environment_driven: self.environment_driven,
                memory_driven: self.memory_driven,
                anchor_weights: self.anchor_weights.clone(),
                feature_flags: self.feature_flags.clone(),
                drift_lexicon: self.drift_lexicon.clone(),
            }),
        }
    }

    /// Rebuild a session. The memory-resolution cache starts empty.
    pub fn import_snapshot(record: SnapshotRecord, config: &EngineConfig) -> Session {
        let mut session = Session::new(config);
        session.state = record.state;
        session.goal = record.goal_vector;
        session.set_ticks(record.ticks);
        session.identity_coherence = record.identity_coherence.clamp(0.0, 1.0);
        session.goal_confidence = record.goal_confidence.clamp(0.0, 1.0);
        session.orbit = record.memory_orbit;
        session.replace_behavior_log(record.behavior_log);

        if let Some(persona) = record.persona {
            session.persona_style = persona.persona_style;
            session.trust_level = persona.trust_level.clamp(0.0, 1.0);
            session.distrust = persona.distrust.clamp(0.0, 1.0);
            session.curiosity = persona.curiosity.clamp(0.0, 1.0);
            session.purpose = persona.purpose;
            session.ego_resistance = persona.ego_resistance;
            session.ripple_tags = persona.ripple_tags;
            session.replace_histories(persona.efficiency_history, persona.chaos_history);
            session.environment_driven = persona.environment_driven;
            session.memory_driven = persona.memory_driven;
            session.anchor_weights = persona.anchor_weights;
            session.feature_flags = persona.feature_flags;
            session.drift_lexicon = persona.drift_lexicon;
        }
        session
    }
}
