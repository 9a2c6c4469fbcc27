//! Errors for the filter strategy subsystem.

use thiserror::Error;

/// Errors raised by filter strategy configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FilterError {
    /// The filter strategy parameters are invalid (e.g., oversample < 1.0).
    #[error("invalid filter strategy: {0}")]
    InvalidStrategy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_reason() {
        let err = FilterError::InvalidStrategy("oversample must be >= 1.0".to_string());
        assert_eq!(
            err.to_string(),
            "invalid filter strategy: oversample must be >= 1.0"
        );
    }
}
