//! Error types shared by all game engines.
//!
//! Every rejection carries a machine-readable reason code so clients can
//! distinguish validation failures, phase errors, and fund errors without
//! string matching.

use crate::multiplier::Multiplier;

/// Rejection reasons for game operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum GameError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("operation not allowed in current phase: {reason}")]
    Phase { reason: &'static str },

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("account is banned")]
    Banned,

    #[error("fairness violation: {0}")]
    Fairness(String),
}

impl GameError {
    /// Phase rejection with a short reason (`"betting_closed"`, `"too_late"`, ...).
    pub fn phase(reason: &'static str) -> Self {
        GameError::Phase { reason }
    }

    /// Stable machine-readable code for the error category.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::Validation(_) => "validation",
            GameError::Phase { .. } => "phase",
            GameError::InsufficientFunds => "insufficient_funds",
            GameError::NotFound(_) => "not_found",
            GameError::Banned => "banned",
            GameError::Fairness(_) => "fairness_violation",
        }
    }

    /// The phase reason, when this is a phase error.
    pub fn phase_reason(&self) -> Option<&'static str> {
        match self {
            GameError::Phase { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Result of a crash cashout, reported back to the requesting client.
#[derive(Debug, Clone, PartialEq)]
pub struct CashoutReceipt {
    pub round_id: String,
    pub multiplier: Multiplier,
    pub payout: u64,
}

pub type GameResult<T> = Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(GameError::Validation("bad".into()).code(), "validation");
        assert_eq!(GameError::phase("too_late").code(), "phase");
        assert_eq!(GameError::InsufficientFunds.code(), "insufficient_funds");
        assert_eq!(GameError::NotFound("x".into()).code(), "not_found");
        assert_eq!(GameError::Fairness("hash".into()).code(), "fairness_violation");
    }

    #[test]
    fn test_phase_reason() {
        let err = GameError::phase("betting_closed");
        assert_eq!(err.phase_reason(), Some("betting_closed"));
        assert!(err.to_string().contains("betting_closed"));
        assert_eq!(GameError::Banned.phase_reason(), None);
    }
}
