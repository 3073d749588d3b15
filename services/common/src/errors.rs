//! Common error types for the simulation services

use thiserror::Error;

/// Invalid engine configuration. Raised before any state is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Depth ladder needs at least one rung per side
    #[error("Invalid depth levels: {0} (must be at least 1)")]
    InvalidDepthLevels(usize),

    /// Timer interval must be positive
    #[error("Invalid update interval: {0}ms (must be positive)")]
    InvalidInterval(u64),

    /// Candle bucket width must be positive
    #[error("Invalid candle duration: {0}ms (must be positive)")]
    InvalidCandleDuration(i64),

    /// Tick size must be positive and finite
    #[error("Invalid tick size: {0}")]
    InvalidTickSize(f64),

    /// Starting price must be positive and finite
    #[error("Invalid initial price: {0}")]
    InvalidInitialPrice(f64),

    /// A bounded buffer was given no room
    #[error("Invalid capacity for {name}: {value}")]
    InvalidCapacity {
        /// Which buffer
        name: &'static str,
        /// Rejected value
        value: usize,
    },

    /// A probability fell outside [0, 1]
    #[error("Invalid probability for {name}: {value}")]
    InvalidProbability {
        /// Which knob
        name: &'static str,
        /// Rejected value
        value: f64,
    },

    /// A numeric range was empty or inverted
    #[error("Invalid range for {name}: {min}..={max}")]
    InvalidRange {
        /// Which range
        name: &'static str,
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },

    /// A size knob exceeds what the engine will allocate
    #[error("{name} too large: {value} (at most {max})")]
    LimitExceeded {
        /// Which knob
        name: &'static str,
        /// Rejected value
        value: usize,
        /// Largest accepted value
        max: usize,
    },

    /// Configuration source could not be read or parsed
    #[error("Failed to load configuration: {0}")]
    Load(String),
}

/// Failure inside one tick's generators. The tick is abandoned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    /// A generated value was NaN or infinite
    #[error("Non-finite {what}: {value}")]
    NonFinite {
        /// Which value
        what: &'static str,
        /// Offending value
        value: f64,
    },

    /// Random source produced a draw outside [0, 1)
    #[error("Random draw out of range: {0}")]
    DrawOutOfRange(f64),

    /// Tick requested before initialize or after dispose
    #[error("Engine is not initialized")]
    NotInitialized,
}

impl GenerationError {
    /// Reject a non-finite value, passing finite ones through
    pub fn check_finite(what: &'static str, value: f64) -> Result<f64, Self> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Self::NonFinite { what, value })
        }
    }
}
