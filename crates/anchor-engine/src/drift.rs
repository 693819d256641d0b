//! DriftEngine: the per-tick update pipeline
//!
//! The steps run strictly in order; each reads the state the previous step
//! left behind. A tick has no suspension points and must not interleave with
//! another tick on the same session.
//!
//!  1. trust            8. adaptive correction factor
//!  2. curiosity        9. apply updates
//!  3. goal confidence 10. memory drift
//!  4. exploration     11. soft reset
//!  5. purpose pull    12. tick counter
//!  6. recalibration   13. coherence
//!  7. priority weights 14. chaos test

use crate::chaos::ChaosMonitor;
use crate::config::EngineConfig;
use crate::session::Session;
use crate::vector::Deltas;
use anchor_core::Dimension;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    /// Dimension pushed down by chaos recalibration.
    pub recalibrated: Dimension,
    /// Adaptive correction factor used when applying updates.
    pub correction: f64,
    /// Updates after noise, purpose pull and weighting, before application.
    pub applied: Deltas,
    pub identity_coherence: f64,
    pub goal_confidence: f64,
    pub chaos_sum: f64,
    pub in_chaos: bool,
}

pub struct DriftEngine {
    config: EngineConfig,
    chaos: ChaosMonitor,
    rng: Mutex<StdRng>,
}

impl DriftEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic exploration noise.
    pub fn with_seed(config: &EngineConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &EngineConfig, rng: StdRng) -> Self {
        Self { config: config.clone(), chaos: ChaosMonitor::new(&config.chaos), rng: Mutex::new(rng) }
    }

    pub fn chaos_monitor(&self) -> &ChaosMonitor {
        &self.chaos
    }

    /// Run one full tick. Missing updates default to zero deltas.
    pub fn tick(&self, session: &mut Session, updates: Option<Deltas>, positive: bool) -> TickReport {
        let drift = &self.config.drift;
        let mut updates = updates.unwrap_or_default();

        // 1-3: derived scalars from the incoming state
        session.update_trust(positive);
        session.update_curiosity();
        session.update_goal_confidence();

        // 4: exploration
        if session.curiosity > 0.0 {
            let g = session.curiosity * drift.exploration_gain;
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            for dim in Dimension::ALL {
                updates.add(dim, rng.gen_range(-g..=g));
            }
        }

        // 5: purpose-driven pull toward goal
        if session.purpose > drift.purpose_threshold {
            for dim in Dimension::ALL {
                let pull = (session.goal.get(dim) - session.state.get(dim)) * drift.purpose_gain * session.purpose;
                updates.add(dim, pull);
            }
        }

        // 6: chaos recalibration
        let recalibrated = self.recalibrate(session);

        // 7: priority weighting
        for dim in Dimension::ALL {
            updates.scale(dim, session.priority_weights.for_category(dim.category()));
        }

        // 8-9: apply, inverted and damped when not aligned with the goal
        let correction = adaptive_correction(session);
        let aligned = session.goal_confidence > 0.5;
        for (dim, delta) in updates.iter() {
            if delta == 0.0 {
                continue;
            }
            let direction = if aligned { delta } else { -correction * delta };
            session.state.nudge(dim, direction);
        }

        // 10: memory-driven drift
        for node in session.orbit.active() {
            for dim in Dimension::ALL {
                session.state.nudge(dim, node.bias(dim));
            }
        }

        // 11-12
        self.soft_reset(session);
        session.ticks += 1;

        // 13: coherence
        let coherence = session.update_identity_coherence();
        if coherence < self.config.chaos.coherence_warning {
            session.log("[Identity Warning] Coherence below threshold");
        }
        session.push_efficiency(coherence);

        // 14: chaos test
        let chaos_sum = self.chaos.chaos_sum(session);
        let in_chaos = chaos_sum > self.chaos.threshold();
        if in_chaos {
            session.log("[Chaos] Drift threshold exceeded. Collapse imminent.");
        }

        debug!(
            tick = session.ticks,
            coherence,
            goal_confidence = session.goal_confidence,
            chaos_sum,
            "tick complete"
        );

        TickReport {
            tick: session.ticks,
            recalibrated,
            correction,
            applied: updates,
            identity_coherence: coherence,
            goal_confidence: session.goal_confidence,
            chaos_sum,
            in_chaos,
        }
    }

    /// Push the most goal-deviant dimension toward 0 (not toward its goal).
    fn recalibrate(&self, session: &mut Session) -> Dimension {
        let history: Vec<f64> = session.chaos_history().collect();
        let mean = if history.is_empty() { 0.0 } else { history.iter().sum::<f64>() / history.len() as f64 };
        let dominant = session.state.most_deviant(&session.goal);
        let shift = self.config.drift.recalibration_step * (1.0 + mean * 0.1);
        session.state.nudge(dominant, -shift);
        session.log(format!("[Chaos] Recalibration on {}", dominant));
        session.push_chaos(mean);
        dominant
    }

    /// Homeostatic pull away from saturation; grows with tick count.
    fn soft_reset(&self, session: &mut Session) {
        let drift = &self.config.drift;
        let amount = drift.soft_reset_step * (1.0 + session.ticks as f64 * drift.soft_reset_growth);
        for dim in Dimension::ALL {
            let v = session.state.get(dim);
            if v >= drift.soft_reset_high {
                session.state.set(dim, v - amount);
            } else if v <= drift.soft_reset_low {
                session.state.set(dim, v + amount);
            }
        }
    }
}

/// Correction factor `c` in [0.3, 0.7], blended from ego resistance and
/// recent efficiency. Uses the last min(50, N) entries once more than 20
/// exist, otherwise all of them.
pub fn adaptive_correction(session: &Session) -> f64 {
    let n = session.efficiency_history.len();
    let window = if n > 20 { n.min(50) } else { n };
    let sum: f64 = session.efficiency_history.iter().rev().take(window).sum();
    let avg = sum / window.max(1) as f64;
    let base = 0.5 + (session.ego_resistance - 0.5) * 0.2;
    (base + (avg - 0.5) * 0.3).clamp(0.3, 0.7)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adaptive_correction_empty_history() {
        let session = Session::default();
        // base 0.5, avg 0 → 0.5 - 0.15
        assert!((adaptive_correction(&session) - 0.35).abs() < 1e-12);
    }

    #[test]
    fn adaptive_correction_windows_last_fifty() {
        let mut session = Session::default();
        for _ in 0..100 {
            session.push_efficiency(0.0);
        }
        for _ in 0..50 {
            session.push_efficiency(1.0);
        }
        // last 50 are all 1.0 → 0.5 + 0.15
        assert!((adaptive_correction(&session) - 0.65).abs() < 1e-12);
    }

    #[test]
    fn adaptive_correction_is_clamped() {
        let mut session = Session::default();
        session.ego_resistance = 10.0;
        for _ in 0..30 {
            session.push_efficiency(1.0);
        }
        assert_eq!(adaptive_correction(&session), 0.7);
        session.ego_resistance = -10.0;
        assert_eq!(adaptive_correction(&session), 0.3);
    }
}
