//! # Validation Module
//!
//! Input validation for the concurrency core.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (route handler, external)                              │
//! │  └── Request shaping, auth, immediate feedback                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  └── Identifier/quantity/cash rules, BEFORE any lock is taken           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── CHECK (quantity_hundredths >= 0)                                   │
//! │  ├── Partial unique index (one open session per register)               │
//! │  └── Foreign key constraints                                            │
//! │                                                                         │
//! │  Defense in depth: nothing past layer 2 should ever fail validation     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::quantity::{Quantity, MAX_TRANSFER, MIN_TRANSFER};
use crate::MAX_IDENTIFIER_LEN;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a caller-supplied identifier (register, location, tenant, ...).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 64 characters
/// - Alphanumeric plus hyphen/underscore (covers UUIDs and slugs)
///
/// ## Example
/// ```rust
/// use atlas_core::validation::validate_identifier;
///
/// assert!(validate_identifier("register_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_identifier("register_id", "").is_err());
/// ```
pub fn validate_identifier(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_IDENTIFIER_LEN,
        });
    }

    if !value
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Session Validators
// =============================================================================

/// Validates an opening cash amount.
///
/// ## Rules
/// - Must be non-negative (an empty drawer is a legitimate shift start)
pub fn validate_opening_cash_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "opening_cash_cents".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Transfer Validators
// =============================================================================

/// Validates that a transfer source and destination differ.
pub fn validate_transfer_locations(from: &str, to: &str) -> ValidationResult<()> {
    validate_identifier("from_location_id", from)?;
    validate_identifier("to_location_id", to)?;

    if from.trim() == to.trim() {
        return Err(ValidationError::MustDiffer {
            first: "from_location_id".to_string(),
            second: "to_location_id".to_string(),
        });
    }

    Ok(())
}

/// Validates and rounds a transfer quantity.
///
/// ## Rules
/// - Rounded to 2 decimal places (see [`Quantity::try_from_f64`])
/// - Within `0.01 ..= 999999.00` after rounding
///
/// ## Returns
/// The rounded [`Quantity`] that should actually move.
pub fn validate_transfer_quantity(value: f64) -> ValidationResult<Quantity> {
    let quantity = Quantity::try_from_f64(value)?;

    if quantity < MIN_TRANSFER || quantity > MAX_TRANSFER {
        return Err(ValidationError::QuantityOutOfRange {
            field: "quantity".to_string(),
            min: MIN_TRANSFER,
            max: MAX_TRANSFER,
        });
    }

    Ok(quantity)
}

// =============================================================================
// Job Validators
// =============================================================================

/// Validates a job type tag.
///
/// ## Rules
/// - Must not be empty
/// - At most 100 characters
pub fn validate_job_type(job_type: &str) -> ValidationResult<()> {
    let job_type = job_type.trim();

    if job_type.is_empty() {
        return Err(ValidationError::Required {
            field: "job_type".to_string(),
        });
    }

    if job_type.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "job_type".to_string(),
            max: 100,
        });
    }

    Ok(())
}

/// Validates a job priority (0 = most urgent, 9 = least).
pub fn validate_priority(priority: i64) -> ValidationResult<()> {
    if !(0..=9).contains(&priority) {
        return Err(ValidationError::OutOfRange {
            field: "priority".to_string(),
            min: 0,
            max: 9,
        });
    }

    Ok(())
}

/// Validates a max-attempts bound.
pub fn validate_max_attempts(max_attempts: i64) -> ValidationResult<()> {
    if !(1..=10).contains(&max_attempts) {
        return Err(ValidationError::OutOfRange {
            field: "max_attempts".to_string(),
            min: 1,
            max: 10,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_identifier("id", "reg_01").is_ok());

        assert!(validate_identifier("id", "").is_err());
        assert!(validate_identifier("id", "   ").is_err());
        assert!(validate_identifier("id", "has space").is_err());
        assert!(validate_identifier("id", &"a".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_opening_cash() {
        assert!(validate_opening_cash_cents(0).is_ok());
        assert!(validate_opening_cash_cents(10_000).is_ok());
        assert!(validate_opening_cash_cents(-1).is_err());
    }

    #[test]
    fn test_validate_transfer_locations() {
        assert!(validate_transfer_locations("loc-a", "loc-b").is_ok());
        assert!(validate_transfer_locations("loc-a", "loc-a").is_err());
        assert!(validate_transfer_locations("", "loc-b").is_err());
    }

    #[test]
    fn test_validate_transfer_quantity() {
        assert_eq!(
            validate_transfer_quantity(10.0).unwrap(),
            Quantity::from_hundredths(1000)
        );
        assert_eq!(
            validate_transfer_quantity(10.005).unwrap(),
            Quantity::from_hundredths(1001)
        );

        // Below minimum after rounding.
        assert!(validate_transfer_quantity(0.0).is_err());
        assert!(validate_transfer_quantity(0.004).is_err());
        // Above maximum.
        assert!(validate_transfer_quantity(1_000_000.0).is_err());
        // Not a number.
        assert!(validate_transfer_quantity(f64::NAN).is_err());
        assert!(validate_transfer_quantity(-5.0).is_err());
    }

    #[test]
    fn test_validate_job_fields() {
        assert!(validate_job_type("send-email").is_ok());
        assert!(validate_job_type("").is_err());
        assert!(validate_job_type(&"x".repeat(200)).is_err());

        assert!(validate_priority(0).is_ok());
        assert!(validate_priority(9).is_ok());
        assert!(validate_priority(10).is_err());
        assert!(validate_priority(-1).is_err());

        assert!(validate_max_attempts(1).is_ok());
        assert!(validate_max_attempts(10).is_ok());
        assert!(validate_max_attempts(0).is_err());
        assert!(validate_max_attempts(11).is_err());
    }
}
