//! AnchorVector: the clamped [0,1] state over the fixed dimension set
//!
//! Every write goes through `clamp01`, so no operation can leave a
//! dimension outside [0,1]. Serialized as a map of canonical names;
//! `presentation()` renames Fear/Safety for external consumers.

use anchor_core::Dimension;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Value reported for a dimension that was never written.
pub const DEFAULT_LEVEL: f64 = 0.5;

/// Guards cosine similarity against zero-magnitude vectors.
pub const MAGNITUDE_EPSILON: f64 = 1e-6;

pub fn clamp01(v: f64) -> f64 {
    if v.is_nan() {
        return DEFAULT_LEVEL;
    }
    v.clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct AnchorVector {
    values: [f64; 4],
}

impl Default for AnchorVector {
    fn default() -> Self {
        Self::uniform(DEFAULT_LEVEL)
    }
}

impl AnchorVector {
    pub fn uniform(v: f64) -> Self {
        Self { values: [clamp01(v); 4] }
    }

    /// Build from values in canonical order: Fear, Safety, Time, Choice.
    pub fn new(fear: f64, safety: f64, time: f64, choice: f64) -> Self {
        Self { values: [clamp01(fear), clamp01(safety), clamp01(time), clamp01(choice)] }
    }

    /// Hard-coded goal the persona is pulled toward.
    pub fn default_goal() -> Self {
        Self::new(0.2, 0.8, 0.4, 0.6)
    }

    pub fn get(&self, dim: Dimension) -> f64 {
        self.values[dim.index()]
    }

    pub fn set(&mut self, dim: Dimension, value: f64) {
        self.values[dim.index()] = clamp01(value);
    }

    /// Add `delta` and clamp.
    pub fn nudge(&mut self, dim: Dimension, delta: f64) {
        let next = self.get(dim) + delta;
        self.set(dim, next);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        Dimension::ALL.into_iter().map(move |d| (d, self.get(d)))
    }

    /// Sum of absolute per-dimension deviations.
    pub fn l1_distance(&self, other: &AnchorVector) -> f64 {
        self.iter().map(|(d, v)| (v - other.get(d)).abs()).sum()
    }

    pub fn mean_abs_deviation(&self, other: &AnchorVector) -> f64 {
        self.l1_distance(other) / Dimension::ALL.len() as f64
    }

    pub fn magnitude(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Cosine similarity with an epsilon floor in the denominator.
    /// Both vectors are non-negative, so the result stays in [0,1].
    pub fn cosine_similarity(&self, other: &AnchorVector) -> f64 {
        let dot: f64 = self.iter().map(|(d, v)| v * other.get(d)).sum();
        let mag = self.magnitude() * other.magnitude();
        clamp01(dot / mag.max(MAGNITUDE_EPSILON))
    }

    /// Dimension with the greatest absolute deviation from `goal`.
    /// Ties resolve to the earlier dimension in canonical order.
    pub fn most_deviant(&self, goal: &AnchorVector) -> Dimension {
        let mut best = Dimension::Fear;
        let mut best_dev = f64::NEG_INFINITY;
        for (d, v) in self.iter() {
            let dev = (v - goal.get(d)).abs();
            if dev > best_dev {
                best = d;
                best_dev = dev;
            }
        }
        best
    }

    /// External view: Fear→Instability, Safety→Stability, others unchanged.
    pub fn presentation(&self) -> BTreeMap<String, f64> {
        self.iter().map(|(d, v)| (d.display_name().to_string(), v)).collect()
    }
}

impl From<BTreeMap<String, f64>> for AnchorVector {
    /// Unknown keys are ignored; missing dimensions default to 0.5.
    fn from(map: BTreeMap<String, f64>) -> Self {
        let mut vector = Self::default();
        for (key, value) in &map {
            if let Some(dim) = Dimension::from_canonical(key) {
                vector.set(dim, *value);
            }
        }
        vector
    }
}

impl From<AnchorVector> for BTreeMap<String, f64> {
    fn from(vector: AnchorVector) -> Self {
        vector.iter().map(|(d, v)| (d.canonical_name().to_string(), v)).collect()
    }
}

/// Per-dimension update deltas. Missing dimensions are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct Deltas {
    values: [f64; 4],
}

impl Deltas {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn get(&self, dim: Dimension) -> f64 {
        self.values[dim.index()]
    }

    pub fn set(&mut self, dim: Dimension, value: f64) {
        self.values[dim.index()] = value;
    }

    pub fn add(&mut self, dim: Dimension, delta: f64) {
        self.values[dim.index()] += delta;
    }

    pub fn scale(&mut self, dim: Dimension, factor: f64) {
        self.values[dim.index()] *= factor;
    }

    pub fn scale_all(&mut self, factor: f64) {
        for v in &mut self.values {
            *v *= factor;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        Dimension::ALL.into_iter().map(move |d| (d, self.get(d)))
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }

    pub fn with(mut self, dim: Dimension, value: f64) -> Self {
        self.set(dim, value);
        self
    }
}

impl From<HashMap<String, f64>> for Deltas {
    /// Accepts canonical names and display aliases; unknown keys are dropped.
    fn from(map: HashMap<String, f64>) -> Self {
        let mut deltas = Self::zero();
        for (key, value) in map {
            if let Some(dim) = Dimension::from_key(&key) {
                if value.is_finite() {
                    deltas.add(dim, value);
                }
            }
        }
        deltas
    }
}

impl From<Deltas> for BTreeMap<String, f64> {
    fn from(deltas: Deltas) -> Self {
        deltas.iter().map(|(d, v)| (d.canonical_name().to_string(), v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp01_handles_nan() {
        assert_eq!(clamp01(f64::NAN), DEFAULT_LEVEL);
        assert_eq!(clamp01(-3.0), 0.0);
        assert_eq!(clamp01(7.0), 1.0);
    }

    #[test]
    fn most_deviant_picks_largest_gap() {
        let state = AnchorVector::new(0.2, 0.8, 0.4, 0.0);
        assert_eq!(state.most_deviant(&AnchorVector::default_goal()), Dimension::Choice);
    }

    #[test]
    fn most_deviant_tie_keeps_first_dimension() {
        // |1 - 0.2| == |0 - 0.8|
        let state = AnchorVector::new(1.0, 0.0, 1.0, 0.3);
        assert_eq!(state.most_deviant(&AnchorVector::default_goal()), Dimension::Fear);
    }

    #[test]
    fn deserialize_ignores_unknown_keys() {
        let v: AnchorVector = serde_json::from_str(r#"{"Fear":0.9,"Mood":0.1}"#).unwrap();
        assert_eq!(v.get(Dimension::Fear), 0.9);
        assert_eq!(v.get(Dimension::Time), DEFAULT_LEVEL);
    }
}
