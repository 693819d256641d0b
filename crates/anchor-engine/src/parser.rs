//! Text cues → dimension deltas, memory trigger, ripple tags
//!
//! The parser is a collaborator of the engine: anything implementing
//! `InputParser` can stand in. `CueParser` recognizes explicit nudges
//! ("instability +0.2", "stability -0.1") and a few semantic events.

use crate::vector::Deltas;
use anchor_core::Dimension;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedInput {
    pub deltas: Deltas,
    pub memory_trigger: Option<String>,
    pub ripple_tags: BTreeMap<String, f64>,
    /// Human-readable description of each recognized cue.
    pub log: Vec<String>,
}

impl ParsedInput {
    /// Valence handed to the tick: safety gained at least as much as fear.
    pub fn positive(&self) -> bool {
        self.deltas.get(Dimension::Safety) - self.deltas.get(Dimension::Fear) >= 0.0
    }
}

pub trait InputParser: Send + Sync {
    fn parse(&self, text: &str) -> ParsedInput;
}

static INSTABILITY_CUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\binstability *([+\-]\d*\.?\d+)").expect("instability cue pattern"));
// word-bounded so "instability +x" is not read twice
static STABILITY_CUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bstability *([+\-]\d*\.?\d+)").expect("stability cue pattern"));

#[derive(Debug, Clone, Copy, Default)]
pub struct CueParser;

impl CueParser {
    pub fn new() -> Self {
        Self
    }
}

fn numeric_cues(re: &Regex, text: &str) -> Vec<f64> {
    re.captures_iter(text)
        .filter_map(|c| c.get(1))
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

impl InputParser for CueParser {
    fn parse(&self, text: &str) -> ParsedInput {
        let mut parsed = ParsedInput::default();
        let lower = text.to_lowercase();

        for delta in numeric_cues(&INSTABILITY_CUE, &lower) {
            parsed.deltas.add(Dimension::Fear, delta);
            parsed.log.push(format!("Instability cue: Fear {:+}", delta));
        }
        for delta in numeric_cues(&STABILITY_CUE, &lower) {
            parsed.deltas.add(Dimension::Safety, delta);
            parsed.log.push(format!("Stability cue: Safety {:+}", delta));
        }

        if lower.contains("loud noise") {
            parsed.deltas.add(Dimension::Fear, 0.2);
            parsed.deltas.add(Dimension::Safety, -0.1);
            parsed.log.push("External event: Loud noise".into());
            parsed.ripple_tags.insert("loud_noise".into(), 0.2);
        } else if lower.contains("encouragement") {
            parsed.deltas.add(Dimension::Safety, 0.2);
            parsed.deltas.add(Dimension::Fear, -0.1);
            parsed.log.push("Social ripple: Encouragement".into());
            parsed.ripple_tags.insert("encouragement".into(), 0.2);
        } else if lower.contains("the cave") {
            parsed.memory_trigger = Some("The Cave".into());
            parsed.log.push("Memory trigger: The Cave".into());
            parsed.ripple_tags.insert("memory_cave".into(), 0.3);
        }

        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cue_patterns_compile_and_stay_apart() {
        assert!(INSTABILITY_CUE.is_match("instability +0.1"));
        assert!(!STABILITY_CUE.is_match("instability +0.1"));
        assert!(STABILITY_CUE.is_match("stability -.5"));
        assert_eq!(numeric_cues(&STABILITY_CUE, "stability -.5, stability +1"), vec![-0.5, 1.0]);
    }
}
