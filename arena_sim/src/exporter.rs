//! JSON exporter for rendering collaborators.
//!
//! Exports observation snapshots frame by frame so an external renderer can
//! replay a run. The engine never reads anything back from this output.

use crate::error::SimError;
use arena_core::{ArenaConfig, EngineStats, WorldSnapshot};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use uuid::Uuid;

/// Derives the run id from what makes a run reproducible.
pub fn run_id(scenario: &str, seed: u64) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("arena-sim/{}/{}", scenario, seed).as_bytes())
}

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Simulation time in seconds
    pub time_sec: f64,

    /// Agents as the renderer sees them
    pub snapshot: WorldSnapshot,

    /// Events (fights, retirements, ignored responses)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub events: Vec<SimEvent>,
}

/// Simulation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEvent {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl SimEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: None,
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: Some("warn".to_string()),
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Name-based id of the run; the same scenario and seed give the same id
    pub run_id: Uuid,

    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    pub config: ArenaConfig,

    /// Duration in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<EngineStats>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64, config: ArenaConfig) -> Self {
        Self {
            run_id: run_id(scenario, seed),
            scenario: scenario.to_string(),
            seed,
            config,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            stats: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, stats: EngineStats) {
        self.passed = passed;
        self.stats = Some(stats);
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
