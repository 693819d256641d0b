//! Core types for Anchor

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session identifier - cheaply cloneable
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct SessionKey(Arc<str>);

impl SessionKey {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionKey {
    fn default() -> Self {
        Self::new("default")
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SessionKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One of the fixed anchor dimensions.
///
/// Internal computation always uses the canonical names. `Fear` and `Safety`
/// are presented to external consumers as `Instability` and `Stability`.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Dimension {
    Fear,
    Safety,
    Time,
    Choice,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Fear,
        Dimension::Safety,
        Dimension::Time,
        Dimension::Choice,
    ];

    pub fn index(self) -> usize {
        match self {
            Dimension::Fear => 0,
            Dimension::Safety => 1,
            Dimension::Time => 2,
            Dimension::Choice => 3,
        }
    }

    pub fn canonical_name(self) -> &'static str {
        match self {
            Dimension::Fear => "Fear",
            Dimension::Safety => "Safety",
            Dimension::Time => "Time",
            Dimension::Choice => "Choice",
        }
    }

    /// Name shown to external consumers.
    pub fn display_name(self) -> &'static str {
        match self {
            Dimension::Fear => "Instability",
            Dimension::Safety => "Stability",
            other => other.canonical_name(),
        }
    }

    /// Parse a canonical key only (`Fear`, `Safety`, `Time`, `Choice`).
    pub fn from_canonical(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.canonical_name() == key)
    }

    /// Parse a display alias only (`Instability`, `Stability`).
    pub fn from_alias(key: &str) -> Option<Self> {
        match key {
            "Instability" => Some(Dimension::Fear),
            "Stability" => Some(Dimension::Safety),
            _ => None,
        }
    }

    /// Parse either form.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::from_canonical(key).or_else(|| Self::from_alias(key))
    }

    /// Priority-weight category used by the drift pipeline.
    pub fn category(self) -> WeightCategory {
        match self {
            Dimension::Fear | Dimension::Safety => WeightCategory::Environment,
            Dimension::Time => WeightCategory::State,
            Dimension::Choice => WeightCategory::SelfImage,
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// Grouping of dimensions for priority weighting.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum WeightCategory {
    Environment,
    State,
    SelfImage,
}
