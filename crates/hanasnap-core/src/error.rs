//! Error types for the core data model.

use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the data model itself.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A backup marker was asked to move to a state it cannot reach.
    #[error("invalid marker transition for backup {backup_id}: {from} -> {to}")]
    InvalidMarkerTransition {
        /// The backup id of the marker.
        backup_id: String,
        /// The current state.
        from: String,
        /// The requested state.
        to: String,
    },
}

impl CoreError {
    /// Creates an invalid marker transition error.
    pub fn invalid_marker_transition(
        backup_id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::InvalidMarkerTransition {
            backup_id: backup_id.into(),
            from: from.into(),
            to: to.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::invalid_marker_transition("42", "confirmed", "abandoned");
        assert_eq!(
            err.to_string(),
            "invalid marker transition for backup 42: confirmed -> abandoned"
        );
    }
}
