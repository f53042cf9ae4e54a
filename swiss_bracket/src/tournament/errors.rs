//! Tournament error types.

use std::time::Duration;

use thiserror::Error;

use super::models::{MatchId, TeamId, TournamentId};

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("Team not found: {0}")]
    TeamNotFound(TeamId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    /// The request is well-formed but not allowed in the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Nobody could be paired without a rematch
    #[error("No rematch-free pairing left for round {0}")]
    PairingExhausted(u32),

    /// Storage error, passed through unchanged
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),
}

impl TournamentError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        TournamentError::InvalidOperation(message.into())
    }

    /// Whether the error reports a missing tournament, team or match
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TournamentError::TournamentNotFound(_)
                | TournamentError::TeamNotFound(_)
                | TournamentError::MatchNotFound(_)
        )
    }

    /// Get a client-safe error message
    ///
    /// Storage and serialization errors are replaced by a generic message so
    /// SQL details never reach the caller's users.
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Storage(_) | TournamentError::Serialization(_) => {
                "Internal server error".to_string()
            }
            TournamentError::Timeout(_) => "Request timed out".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(TournamentError::MatchNotFound(3).is_not_found());
        assert!(TournamentError::TeamNotFound(3).is_not_found());
        assert!(!TournamentError::invalid("bye").is_not_found());
    }

    #[test]
    fn test_pairing_exhausted_reaches_clients() {
        let err = TournamentError::PairingExhausted(3);
        assert_eq!(err.client_message(), "No rematch-free pairing left for round 3");
    }

    #[test]
    fn test_client_message_hides_storage_details() {
        let err = TournamentError::Storage(sqlx::Error::RowNotFound);
        assert_eq!(err.client_message(), "Internal server error");

        let err = TournamentError::invalid("cannot update a bye match");
        assert_eq!(
            err.client_message(),
            "Invalid operation: cannot update a bye match"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = TournamentError::Timeout(Duration::from_secs(5));
        assert!(err.to_string().contains("timed out"));
        assert!(err.to_string().contains("5s"));
    }
}
