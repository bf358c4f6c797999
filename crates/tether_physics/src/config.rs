//! Solver configuration.
//!
//! Every field has a default, so a JSON document only needs the values it
//! overrides:
//!
//! ```json
//! { "sub_steps": 8, "broad_phase": { "SpatialHash": { "cell_size": 1.0 } } }
//! ```

use crate::broad_phase::{BroadPhase, BruteForce};
use crate::error::ConfigError;
use crate::spatial_hash::{SpatialHash, DEFAULT_CELL_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tether_core::math::Vec3;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BroadPhaseConfig {
    SpatialHash { cell_size: f32 },
    BruteForce,
}

impl BroadPhaseConfig {
    pub fn build(&self) -> Box<dyn BroadPhase> {
        match *self {
            BroadPhaseConfig::SpatialHash { cell_size } => Box::new(SpatialHash::new(cell_size)),
            BroadPhaseConfig::BruteForce => Box::new(BruteForce::new()),
        }
    }
}

impl Default for BroadPhaseConfig {
    fn default() -> Self {
        BroadPhaseConfig::SpatialHash {
            cell_size: DEFAULT_CELL_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub gravity: Vec3,
    /// Substeps per frame; values below 1 are treated as 1.
    pub sub_steps: i32,
    /// Gauss-Seidel sweeps per substep; values below 1 are treated as 1.
    pub solver_iterations: i32,
    /// Speed under which a particle counts as resting.
    pub sleep_threshold: f32,
    /// Seconds a particle must rest before it sleeps.
    pub sleep_time: f32,
    pub enable_sleeping: bool,
    /// Keep constraint multipliers across substeps and frames instead of
    /// zeroing them before every substep. Compliant constraints accumulate
    /// a bias while this is on.
    pub enable_warm_starting: bool,
    /// Shapes closer than this get a contact before they touch, which keeps
    /// resting contacts from flickering between substeps.
    pub contact_margin: f32,
    pub broad_phase: BroadPhaseConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            sub_steps: 4,
            solver_iterations: 10,
            sleep_threshold: 0.01,
            sleep_time: 0.5,
            enable_sleeping: true,
            enable_warm_starting: false,
            contact_margin: 0.02,
            broad_phase: BroadPhaseConfig::default(),
        }
    }
}

impl SolverConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn effective_sub_steps(&self) -> u32 {
        clamp_count("sub_steps", self.sub_steps)
    }

    pub fn effective_iterations(&self) -> u32 {
        clamp_count("solver_iterations", self.solver_iterations)
    }
}

fn clamp_count(field: &'static str, value: i32) -> u32 {
    if value < 1 {
        warn!(field, value, "clamping solver setting to 1");
        1
    } else {
        value as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SolverConfig::from_json(r#"{ "sub_steps": 8 }"#).expect("valid json");
        assert_eq!(config.sub_steps, 8);
        assert_eq!(config.solver_iterations, 10);
        assert_eq!(config.gravity, Vec3::new(0.0, -9.81, 0.0));
        assert_eq!(config.broad_phase, BroadPhaseConfig::default());
        assert_eq!(config.contact_margin, 0.02);
    }

    #[test]
    fn broad_phase_variant_from_json() {
        let config = SolverConfig::from_json(r#"{ "broad_phase": "BruteForce" }"#).expect("valid json");
        assert_eq!(config.broad_phase, BroadPhaseConfig::BruteForce);
        assert_eq!(config.broad_phase.build().name(), "brute_force");

        let config =
            SolverConfig::from_json(r#"{ "broad_phase": { "SpatialHash": { "cell_size": 0.5 } } }"#)
                .expect("valid json");
        assert_eq!(config.broad_phase.build().name(), "spatial_hash");
    }

    #[test]
    fn invalid_counts_clamp_to_one() {
        let config = SolverConfig {
            sub_steps: 0,
            solver_iterations: -3,
            ..SolverConfig::default()
        };
        assert_eq!(config.effective_sub_steps(), 1);
        assert_eq!(config.effective_iterations(), 1);
        assert_eq!(SolverConfig::default().effective_sub_steps(), 4);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = SolverConfig::from_json("{ sub_steps: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = SolverConfig::load("/nonexistent/tether/solver.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn json_round_trip_preserves_config() {
        let config = SolverConfig {
            enable_sleeping: false,
            ..SolverConfig::default()
        };
        let json = config.to_json().expect("serializable");
        assert_eq!(SolverConfig::from_json(&json).expect("valid json"), config);
    }
}
