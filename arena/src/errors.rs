//! Engine error types.

use std::time::Duration;
use thiserror::Error;

/// Errors raised while ranking squads or advancing rounds
#[derive(Debug, Error)]
pub enum ArenaError {
    /// Referenced tournament, round, squad or prize does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Round created out of order, created twice, or substituted before it exists
    #[error("Invalid round sequence: {0}")]
    InvalidRoundSequence(String),

    /// A tiebreak produced vectors of different lengths within one standings table
    #[error("Inconsistent tiebreak shape for '{prize}': expected {expected} keys, found {found}")]
    InconsistentTiebreakShape {
        prize: String,
        expected: usize,
        found: usize,
    },

    /// Required data could not be read
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// A persistence or directory call exceeded its deadline
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// One or more competitors of a prize could not be scored
    #[error("Standings for '{prize}' failed with {} error(s): {}", .errors.len(), summarize(.errors))]
    Standings {
        prize: String,
        errors: Vec<ArenaError>,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ArenaError {
    /// Whether the caller may retry the failed operation unchanged.
    ///
    /// Timeouts and unavailable data are transient; an aggregated standings
    /// failure is retryable only when every branch failure is.
    pub fn is_retryable(&self) -> bool {
        match self {
            ArenaError::DataUnavailable(_) | ArenaError::Timeout(_) | ArenaError::Database(_) => {
                true
            }
            ArenaError::Standings { errors, .. } => errors.iter().all(ArenaError::is_retryable),
            _ => false,
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            // Sanitize database errors - don't expose SQL details
            ArenaError::Database(_) => "Internal server error".to_string(),
            ArenaError::Serialization(_) => "Internal server error".to_string(),
            ArenaError::Timeout(_) => "Data unavailable, try again later".to_string(),
            ArenaError::Standings { prize, errors } => {
                format!("Standings for '{}' failed ({} errors)", prize, errors.len())
            }
            _ => self.to_string(),
        }
    }
}

fn summarize(errors: &[ArenaError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for engine operations
pub type ArenaResult<T> = Result<T, ArenaError>;
