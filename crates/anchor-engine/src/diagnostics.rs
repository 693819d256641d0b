//! DiagnosticsGate: what a caller is allowed to see
//!
//! Per interaction the gate is either Stable (a minimized reply, no internal
//! values) or Diagnostic (a full snapshot with narratives). Diagnostic is
//! entered on chaos or when the inbound text contains a trigger keyword,
//! matched case-insensitively as a substring. The mode is not persisted.

use crate::chaos::{ChaosMonitor, CollapseVector};
use crate::config::{ChaosConfig, DiagnosticsConfig};
use crate::memory::MemoryNode;
use crate::session::Session;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    Stable,
    Diagnostic { personality: bool },
}

/// Qualitative bucket for a [0,1] level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl Level {
    pub fn of(value: f64) -> Self {
        if value < 0.2 {
            Level::VeryLow
        } else if value < 0.4 {
            Level::Low
        } else if value < 0.6 {
            Level::Moderate
        } else if value < 0.8 {
            Level::High
        } else {
            Level::VeryHigh
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Level::VeryLow => "very low",
            Level::Low => "low",
            Level::Moderate => "moderate",
            Level::High => "high",
            Level::VeryHigh => "very high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StableReply {
    pub status: &'static str,
    pub tick: u64,
    pub reply: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticSnapshot {
    pub id: String,
    pub tick: u64,
    /// Presentation names (Instability/Stability).
    pub anchor_vector: BTreeMap<String, f64>,
    pub curiosity_level: f64,
    pub identity_coherence: f64,
    pub goal_confidence: f64,
    pub persona_style: String,
    pub collapse_vector: CollapseVector,
    pub in_chaos: bool,
    pub last_behavior: Option<String>,
    pub memory_nodes: Vec<MemoryNode>,
    pub narrative: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personality_narrative: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Stable(StableReply),
    Diagnostic(Box<DiagnosticSnapshot>),
}

impl Response {
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Response::Diagnostic(_))
    }

    pub fn tick(&self) -> u64 {
        match self {
            Response::Stable(r) => r.tick,
            Response::Diagnostic(s) => s.tick,
        }
    }

    pub fn snapshot(&self) -> Option<&DiagnosticSnapshot> {
        match self {
            Response::Diagnostic(s) => Some(s),
            Response::Stable(_) => None,
        }
    }
}

pub struct DiagnosticsGate {
    triggers: Vec<String>,
    personality_triggers: Vec<String>,
    stable_reply: String,
    chaos: ChaosMonitor,
}

impl Default for DiagnosticsGate {
    fn default() -> Self {
        Self::new(&DiagnosticsConfig::default(), &ChaosConfig::default())
    }
}

impl DiagnosticsGate {
    pub fn new(config: &DiagnosticsConfig, chaos: &ChaosConfig) -> Self {
        Self {
            triggers: lowered(&config.trigger_keywords),
            personality_triggers: lowered(&config.personality_keywords),
            stable_reply: config.stable_reply.clone(),
            chaos: ChaosMonitor::new(chaos),
        }
    }

    pub fn mode(&self, session: &Session, text: &str) -> GateMode {
        let lower = text.to_lowercase();
        let keyword = self.triggers.iter().any(|k| lower.contains(k.as_str()));
        if keyword || self.chaos.is_in_chaos(session) {
            let personality = self.personality_triggers.iter().any(|k| lower.contains(k.as_str()));
            GateMode::Diagnostic { personality }
        } else {
            GateMode::Stable
        }
    }

    pub fn respond(&self, session: &Session, text: &str) -> Response {
        match self.mode(session, text) {
            GateMode::Stable => Response::Stable(self.stable(session)),
            GateMode::Diagnostic { personality } => Response::Diagnostic(Box::new(self.snapshot(session, personality))),
        }
    }

    pub fn stable(&self, session: &Session) -> StableReply {
        StableReply { status: "stable", tick: session.ticks(), reply: self.stable_reply.clone() }
    }

    /// Full internal view, each call with a fresh id.
    pub fn snapshot(&self, session: &Session, personality: bool) -> DiagnosticSnapshot {
        let collapse = self.chaos.classify_collapse(session);
        DiagnosticSnapshot {
            id: uuid::Uuid::new_v4().to_string(),
            tick: session.ticks(),
            anchor_vector: session.state.presentation(),
            curiosity_level: session.curiosity,
            identity_coherence: session.identity_coherence,
            goal_confidence: session.goal_confidence,
            persona_style: session.persona_style.clone(),
            collapse_vector: collapse,
            in_chaos: self.chaos.is_in_chaos(session),
            last_behavior: session.last_behavior().map(String::from),
            memory_nodes: session.orbit.nodes().to_vec(),
            narrative: dimension_narrative(session),
            personality_narrative: personality.then(|| personality_narrative(session, collapse)),
        }
    }
}

fn lowered(keywords: &[String]) -> Vec<String> {
    keywords.iter().map(|k| k.to_lowercase()).filter(|k| !k.is_empty()).collect()
}

/// One sentence per dimension, keyed by presentation name.
pub fn dimension_narrative(session: &Session) -> BTreeMap<String, String> {
    session
        .state
        .iter()
        .map(|(dim, v)| {
            let name = dim.display_name();
            (name.to_string(), format!("{} is {} ({:.2})", name, Level::of(v).label(), v))
        })
        .collect()
}

pub fn personality_narrative(session: &Session, collapse: CollapseVector) -> String {
    format!(
        "Persona '{}' reads as {}. Coherence is {}, goal confidence {}, curiosity {}, trust {}.",
        session.persona_style,
        collapse.label(),
        Level::of(session.identity_coherence).label(),
        Level::of(session.goal_confidence).label(),
        Level::of(session.curiosity).label(),
        Level::of(session.trust_level).label(),
    )
}
