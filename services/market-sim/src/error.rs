//! Engine-level error type

use services_common::{ConfigError, GenerationError};
use thiserror::Error;

/// Errors surfaced by [`crate::MarketEngine`] and [`crate::EngineController`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Configuration was rejected before any state changed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A tick was abandoned
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Loop could not be spawned
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// New configuration was applied but the loop did not come back
    #[error("Configuration applied, loop not restarted: {0}")]
    Restart(String),
}

/// Result alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
