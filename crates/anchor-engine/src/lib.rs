//! Anchor engine: bounded four-dimension persona state with drift, chaos
//! detection, memory bias, seed profiles and a gated diagnostics surface.
//!
//! `Anchor` is the entry point; everything else is usable on its own.

pub mod chaos;
pub mod config;
pub mod diagnostics;
pub mod drift;
pub mod engine;
pub mod memory;
pub mod observer;
pub mod parser;
pub mod seed;
pub mod session;
pub mod snapshot;
pub mod vector;

pub use chaos::{ChaosMonitor, CollapseVector};
pub use config::EngineConfig;
pub use diagnostics::{DiagnosticSnapshot, DiagnosticsGate, GateMode, Response, StableReply};
pub use drift::{DriftEngine, TickReport};
pub use engine::{Anchor, AnchorBuilder};
pub use memory::{ClusterSource, FsClusterSource, MemoryNode, MemoryOrbit, Tier};
pub use observer::{MiniScheduler, TickObserver};
pub use parser::{CueParser, InputParser, ParsedInput};
pub use seed::{FsSeedSource, SeedLoader, SeedOutcome, SeedProfile, SeedSource};
pub use session::Session;
pub use snapshot::SnapshotRecord;
pub use vector::{AnchorVector, Deltas};
