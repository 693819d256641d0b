//! Anchor: the engine facade
//!
//! Owns the drift pipeline, seed loader, diagnostics gate, cue parser, memory
//! cluster source and tick observers, and exposes the session-level
//! operations. Sessions are passed in by `&mut`; the facade itself is shared
//! (`&self`) and holds no per-session state.

use crate::config::EngineConfig;
use crate::diagnostics::{DiagnosticSnapshot, DiagnosticsGate, Response};
use crate::drift::{DriftEngine, TickReport};
use crate::memory::{ClusterSource, FsClusterSource, MemoryOrbit};
use crate::observer::TickObserver;
use crate::parser::{CueParser, InputParser};
use crate::seed::{FsSeedSource, SeedLoader, SeedOutcome, SeedSource};
use crate::session::Session;
use crate::snapshot::SnapshotRecord;
use crate::vector::Deltas;
use anchor_core::Result;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Gate text used for direct tick requests; matches no trigger keyword.
const TICK_TEXT: &str = "[tick]";

pub struct Anchor {
    config: EngineConfig,
    drift: DriftEngine,
    seeds: SeedLoader,
    gate: DiagnosticsGate,
    parser: Box<dyn InputParser>,
    clusters: Arc<dyn ClusterSource>,
    observers: Mutex<Vec<Box<dyn TickObserver>>>,
}

/// Builder for [`Anchor`]. Unset collaborators default to the filesystem
/// sources named by the config and the built-in [`CueParser`].
pub struct AnchorBuilder {
    config: EngineConfig,
    rng_seed: Option<u64>,
    parser: Option<Box<dyn InputParser>>,
    clusters: Option<Arc<dyn ClusterSource>>,
    seed_source: Option<Arc<dyn SeedSource>>,
    observers: Vec<Box<dyn TickObserver>>,
}

impl AnchorBuilder {
    /// Deterministic exploration noise.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn parser(mut self, parser: impl InputParser + 'static) -> Self {
        self.parser = Some(Box::new(parser));
        self
    }

    pub fn clusters(mut self, source: Arc<dyn ClusterSource>) -> Self {
        self.clusters = Some(source);
        self
    }

    pub fn seed_source(mut self, source: Arc<dyn SeedSource>) -> Self {
        self.seed_source = Some(source);
        self
    }

    pub fn observer(mut self, observer: impl TickObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn build(self) -> Anchor {
        let config = self.config;
        let drift = match self.rng_seed {
            Some(seed) => DriftEngine::with_seed(&config, seed),
            None => DriftEngine::new(&config),
        };
        let seed_source = self
            .seed_source
            .unwrap_or_else(|| Arc::new(FsSeedSource::from_config(&config.seeds)));
        let clusters = self
            .clusters
            .unwrap_or_else(|| Arc::new(FsClusterSource::new(&config.memory.cluster_dir)));

        Anchor {
            seeds: SeedLoader::new(seed_source, config.seeds.default_lexicon.clone()),
            gate: DiagnosticsGate::new(&config.diagnostics, &config.chaos),
            parser: self.parser.unwrap_or_else(|| Box::new(CueParser::new())),
            clusters,
            observers: Mutex::new(self.observers),
            drift,
            config,
        }
    }
}

impl Anchor {
    /// Engine with filesystem collaborators taken from `config`.
    pub fn new(config: EngineConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: EngineConfig) -> AnchorBuilder {
        AnchorBuilder {
            config,
            rng_seed: None,
            parser: None,
            clusters: None,
            seed_source: None,
            observers: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn gate(&self) -> &DiagnosticsGate {
        &self.gate
    }

    pub fn seeds(&self) -> &SeedLoader {
        &self.seeds
    }

    /// Register an observer after construction.
    pub fn add_observer(&self, observer: impl TickObserver + 'static) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(observer));
    }

    /// New session, seeded from `seed_id` (alias or raw id) or the configured
    /// default seed. A missing seed leaves the hard-coded defaults.
    pub fn create_session(&self, seed_id: Option<&str>) -> Session {
        let requested = seed_id.unwrap_or(self.config.seeds.default_seed.as_str());
        let resolved = self
            .seeds
            .resolve_alias(requested)
            .unwrap_or_else(|| requested.to_string());

        let mut session = Session::new(&self.config);
        match self.seeds.apply(&mut session, &resolved) {
            SeedOutcome::Applied(_) => session.log(format!("[Startup] Seed '{}' applied.", resolved)),
            SeedOutcome::NotApplied => {
                info!("Seed '{}' not found, starting from defaults", resolved);
                session.log(format!("[Startup] Seed '{}' not found.", resolved));
            }
        }
        session
    }

    /// Parse `text`, apply its cues and run one tick, then gate the reply.
    pub fn apply_text(&self, session: &mut Session, text: &str) -> Response {
        let parsed = self.parser.parse(text);
        let positive = parsed.positive();

        if parsed.memory_trigger.is_some() {
            session.memory_driven += 1;
        } else {
            session.environment_driven += 1;
        }

        let mut deltas = parsed.deltas;
        for (tag, magnitude) in &parsed.ripple_tags {
            session.ripple_tags.insert(tag.clone(), *magnitude);
            deltas.scale_all(1.0 + magnitude);
        }
        for (dim, delta) in deltas.iter() {
            session.state.nudge(dim, delta);
        }

        let mut triggered = Vec::new();
        if let Some(memory_id) = &parsed.memory_trigger {
            self.ensure_in_orbit(session, memory_id);
            triggered = session.orbit.trigger(memory_id, self.config.memory.trigger_step);
        }

        self.tick(session, Some(deltas), positive);

        let cues = if parsed.log.is_empty() { "no cues".to_string() } else { parsed.log.join("; ") };
        let mut entry = format!("[Bridge] Input: {} -> {}", text, cues);
        if !triggered.is_empty() {
            let ids: Vec<&str> = triggered.iter().map(|n| n.id.as_str()).collect();
            entry.push_str(&format!(" | Memory: {}", ids.join(", ")));
        }
        session.log(entry);

        self.gate.respond(session, text)
    }

    /// Run one tick with explicit deltas, then gate the reply.
    pub fn apply_tick(&self, session: &mut Session, deltas: Option<Deltas>, positive: bool) -> Response {
        self.tick(session, deltas, positive);
        self.gate.respond(session, TICK_TEXT)
    }

    /// One pipeline tick followed by the registered observers.
    pub fn tick(&self, session: &mut Session, deltas: Option<Deltas>, positive: bool) -> TickReport {
        let report = self.drift.tick(session, deltas, positive);
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        for observer in observers.iter_mut() {
            for line in observer.on_tick(session) {
                session.log(line);
            }
        }
        report
    }

    /// Full diagnostic snapshot regardless of gate mode.
    pub fn full_state(&self, session: &Session) -> DiagnosticSnapshot {
        self.gate.snapshot(session, false)
    }

    pub fn export_snapshot(&self, session: &Session) -> SnapshotRecord {
        session.export_snapshot()
    }

    pub fn import_snapshot(&self, record: SnapshotRecord) -> Session {
        Session::import_snapshot(record, &self.config)
    }

    /// Replace the session's orbit from a JSON node list. The session is
    /// untouched when the file is missing or not a list.
    pub fn load_memory(&self, session: &mut Session, path: &Path) -> Result<usize> {
        let orbit = MemoryOrbit::load_file(path)?;
        let count = orbit.len();
        session.orbit = orbit;
        info!("Loaded {} memory nodes from {}", count, path.display());
        Ok(count)
    }

    /// Pull a triggered memory into the orbit from its cluster if it is not
    /// already there.
    fn ensure_in_orbit(&self, session: &mut Session, memory_id: &str) {
        if session.orbit.contains(memory_id) {
            return;
        }
        match session.orbit.resolve(memory_id, self.clusters.as_ref()) {
            Some(node) => {
                session.orbit.insert(node.as_ref().clone());
            }
            None => debug!("Memory trigger {} has no node", memory_id),
        }
    }
}
