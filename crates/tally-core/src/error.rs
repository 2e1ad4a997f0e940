//! Error types for optimistic reconciliation

use thiserror::Error;

use crate::MoveId;

/// Reconciliation errors
///
/// Authority rejections of value-identified moves are reported through the
/// rejection callback, not through this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Pending limit reached: {limit} moves awaiting confirmation")]
    PendingLimitReached { limit: usize },

    #[error("Unknown move: {0} is not pending")]
    UnknownMove(MoveId),
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ReconcileError::PendingLimitReached { limit: 4 };
        assert_eq!(
            err.to_string(),
            "Pending limit reached: 4 moves awaiting confirmation"
        );

        let err = ReconcileError::UnknownMove(MoveId::new(9));
        assert_eq!(err.to_string(), "Unknown move: #9 is not pending");
    }
}
