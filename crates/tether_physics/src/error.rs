use std::path::PathBuf;
use tether_core::ecs::Entity;
use thiserror::Error;

/// Errors raised by [`Scene`](crate::Scene) mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("entity {entity:?} is not alive")]
    DeadEntity { entity: Entity },

    #[error("entity {entity:?} has no particle")]
    MissingParticle { entity: Entity },
}

/// Errors raised while loading a [`SolverConfig`](crate::SolverConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read solver config '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid solver config: {0}")]
    Parse(#[from] serde_json::Error),
}
