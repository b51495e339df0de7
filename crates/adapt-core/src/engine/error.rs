use super::config::ConfigError;
use super::surrogate::SurrogateError;
use crate::core::geometry::GeometryError;
use crate::core::io::persistence::PersistenceError;
use crate::core::models::grid::{GridError, GridPoint};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Insufficient samples for {method}: found {found}, need at least {required}")]
    InsufficientSamples {
        method: &'static str,
        found: usize,
        required: usize,
    },

    #[error("Geometry classification failed: {source}")]
    Geometry {
        #[from]
        source: GeometryError,
    },

    #[error("Duplicate work requested for grid point {point}")]
    DuplicateWorkRequested { point: GridPoint },

    #[error("Evaluation cache corrupted at {point}: holds {stored}, offered {offered}")]
    CacheCorruption {
        point: GridPoint,
        stored: f64,
        offered: f64,
    },

    #[error("Upstream artifact unavailable for {work}: {reason}")]
    UpstreamArtifactUnavailable { work: String, reason: String },

    #[error("Record persistence failed: {source}")]
    Persistence {
        #[from]
        source: PersistenceError,
    },

    #[error("Parameter grid error: {source}")]
    Grid {
        #[from]
        source: GridError,
    },

    #[error("Surrogate model error: {source}")]
    Surrogate {
        #[from]
        source: SurrogateError,
    },

    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Task graph error: {0}")]
    Graph(String),

    #[error("Cannot {action} while the campaign is {phase}")]
    InvalidTransition { action: &'static str, phase: String },

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Fatal errors are invariant violations; the campaign must abort.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::DuplicateWorkRequested { .. } | EngineError::CacheCorruption { .. }
        )
    }
}
