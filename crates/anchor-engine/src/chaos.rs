//! ChaosMonitor: derived classification of state against goal
//!
//! Nothing here is cached: every call recomputes from the current vectors.

use crate::config::ChaosConfig;
use crate::session::Session;
use anchor_core::Dimension;
use serde::{Serialize, Serializer};

/// Collapse-vector label, in rule priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseVector {
    Reflective,
    InstabilityHigh,
    ImpactReady,
    Neutral,
}

impl CollapseVector {
    pub fn label(self) -> &'static str {
        match self {
            CollapseVector::Reflective => "Reflective – perception coherent",
            CollapseVector::InstabilityHigh => "Instability high – caution advised",
            CollapseVector::ImpactReady => "Impact ready – decision imminent",
            CollapseVector::Neutral => "Neutral – drifting",
        }
    }
}

impl std::fmt::Display for CollapseVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for CollapseVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct ChaosMonitor {
    threshold: f64,
}

impl Default for ChaosMonitor {
    fn default() -> Self {
        Self::new(&ChaosConfig::default())
    }
}

impl ChaosMonitor {
    pub fn new(config: &ChaosConfig) -> Self {
        Self { threshold: config.threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Σ |state[d] − goal[d]|
    pub fn chaos_sum(&self, session: &Session) -> f64 {
        session.state.l1_distance(&session.goal)
    }

    pub fn is_in_chaos(&self, session: &Session) -> bool {
        self.chaos_sum(session) > self.threshold
    }

    /// First matching rule wins.
    pub fn classify_collapse(&self, session: &Session) -> CollapseVector {
        if session.curiosity > 0.7 && session.identity_coherence > 0.5 {
            CollapseVector::Reflective
        } else if session.state.get(Dimension::Fear) > 0.8 {
            CollapseVector::InstabilityHigh
        } else if session.state.get(Dimension::Choice) > 0.7 {
            CollapseVector::ImpactReady
        } else {
            CollapseVector::Neutral
        }
    }
}
