use thiserror::Error;

/// Main error type for cache operations
///
/// A miss is never an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Invalid capacity for level '{0}': capacity must be greater than 0")]
    InvalidCapacity(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Level '{level}' unavailable: {reason}")]
    LevelUnavailable { level: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CacheError {
    /// Shorthand used by fallible tiers
    pub fn unavailable(level: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LevelUnavailable {
            level: level.into(),
            reason: reason.into(),
        }
    }

    /// True for errors raised while building a cache rather than operating one
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidCapacity(_) | Self::InvalidConfig(_) | Self::Config(_)
        )
    }
}

impl From<serde_yaml::Error> for CacheError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
