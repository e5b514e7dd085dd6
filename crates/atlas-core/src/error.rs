//! # Error Types
//!
//! Validation errors for atlas-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  atlas-core errors (this file)                                          │
//! │  └── ValidationError  - Input validation failures (4xx-equivalent)      │
//! │                                                                         │
//! │  atlas-db errors (separate crate)                                       │
//! │  ├── DbError        - Storage failures (busy, unique violation, ...)    │
//! │  ├── SessionError   - Caller-facing session manager taxonomy            │
//! │  └── TransferError  - Caller-facing transfer taxonomy                   │
//! │                                                                         │
//! │  atlas-jobs errors (separate crate)                                     │
//! │  └── QueueError     - Enqueue/worker failures                           │
//! │                                                                         │
//! │  Flow: ValidationError → SessionError/TransferError/QueueError → caller │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field, bounds, ids)
//! 3. Errors are enum variants, never String
//! 4. Validation errors are never retried; callers map them to 4xx

use thiserror::Error;

use crate::quantity::Quantity;

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements. Used for early
/// validation before any lock is taken or any row is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Quantity is outside the accepted transfer bounds.
    #[error("{field} must be between {min} and {max}")]
    QuantityOutOfRange {
        field: String,
        min: Quantity,
        max: Quantity,
    },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., non-finite number, bad identifier charset).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Two fields that must differ are equal.
    #[error("{first} and {second} must differ")]
    MustDiffer { first: String, second: String },
}

/// Convenience type alias for Results with ValidationError.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ValidationError::Required {
            field: "register_id".to_string(),
        };
        assert_eq!(err.to_string(), "register_id is required");

        let err = ValidationError::MustDiffer {
            first: "from_location_id".to_string(),
            second: "to_location_id".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "from_location_id and to_location_id must differ"
        );
    }

    #[test]
    fn test_quantity_bounds_message() {
        let err = ValidationError::QuantityOutOfRange {
            field: "quantity".to_string(),
            min: Quantity::from_hundredths(1),
            max: Quantity::from_hundredths(99_999_900),
        };
        assert_eq!(err.to_string(), "quantity must be between 0.01 and 999999.00");
    }
}
