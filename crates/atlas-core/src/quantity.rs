//! # Quantity Module
//!
//! Provides the `Quantity` type for stock levels and transfer amounts.
//!
//! ## Why Integer Hundredths?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  In an inventory ledger that drift becomes phantom stock:              │
//! │    transfer 0.1 kg three times and the totals stop reconciling         │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Hundredths                                       │
//! │    10.01 units = 1001 hundredths, all arithmetic is exact              │
//! │    Callers hand us f64 once at the boundary; we round ONCE,            │
//! │    by a documented rule, and never touch floats again                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding Rule
//! Caller input is rounded to 2 decimal places in two stages: first to the
//! nearest thousandth (absorbing binary representation noise, so an input of
//! `10.005` is seen as `10.005` and not `10.00499999...`), then half-up to
//! the nearest hundredth. `10.005 → 10.01`, `10.004 → 10.00`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// A stock quantity in integer hundredths of a unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: arithmetic intermediates may need the sign, but every
///   persisted quantity is non-negative (enforced by validation and schema)
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **sqlx transparent**: stored as the raw integer column
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Quantity(i64);

/// Smallest transferable quantity: 0.01 units.
pub const MIN_TRANSFER: Quantity = Quantity(1);

/// Largest transferable quantity: 999,999.00 units.
pub const MAX_TRANSFER: Quantity = Quantity(99_999_900);

impl Quantity {
    /// Zero quantity.
    pub const ZERO: Quantity = Quantity(0);

    /// Creates a Quantity from integer hundredths.
    ///
    /// ## Example
    /// ```rust
    /// use atlas_core::quantity::Quantity;
    ///
    /// let q = Quantity::from_hundredths(1001); // 10.01 units
    /// assert_eq!(q.hundredths(), 1001);
    /// ```
    #[inline]
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Quantity(hundredths)
    }

    /// Returns the value in hundredths.
    #[inline]
    pub const fn hundredths(&self) -> i64 {
        self.0
    }

    /// Converts a caller-supplied float into a Quantity.
    ///
    /// ## Rounding
    /// Two-stage: nearest thousandth first, then half-up to the nearest
    /// hundredth (see module docs). `10.005` becomes `10.01`.
    ///
    /// ## Errors
    /// - `InvalidFormat` for NaN/infinite input or values too large to scale
    /// - `MustBePositive` for negative input (zero is allowed here; transfer
    ///   bounds are enforced separately by validation)
    pub fn try_from_f64(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::InvalidFormat {
                field: "quantity".to_string(),
                reason: "must be a finite number".to_string(),
            });
        }

        if value < 0.0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            });
        }

        let scaled = value * 1000.0;
        if scaled > i64::MAX as f64 / 2.0 {
            return Err(ValidationError::InvalidFormat {
                field: "quantity".to_string(),
                reason: "too large".to_string(),
            });
        }

        let thousandths = scaled.round() as i64;
        // Half-up from thousandths to hundredths; input is non-negative here.
        let hundredths = (thousandths + 5) / 10;

        Ok(Quantity(hundredths))
    }

    /// Checked addition.
    #[inline]
    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).map(Quantity)
    }

    /// Checked subtraction.
    #[inline]
    pub fn checked_sub(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_sub(other.0).map(Quantity)
    }

    /// True if this quantity is zero or negative.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Quantity {
    /// Renders as a fixed 2-decimal value: `1001` → `"10.01"`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_f64_exact_values() {
        assert_eq!(Quantity::try_from_f64(10.0).unwrap().hundredths(), 1000);
        assert_eq!(Quantity::try_from_f64(10.01).unwrap().hundredths(), 1001);
        assert_eq!(Quantity::try_from_f64(0.01).unwrap().hundredths(), 1);
        assert_eq!(Quantity::try_from_f64(0.0).unwrap().hundredths(), 0);
    }

    #[test]
    fn test_from_f64_rounds_half_up() {
        // The documented rule: 10.005 rounds up to 10.01 even though its
        // binary representation sits just below the midpoint.
        assert_eq!(Quantity::try_from_f64(10.005).unwrap().hundredths(), 1001);
        assert_eq!(Quantity::try_from_f64(10.004).unwrap().hundredths(), 1000);
        assert_eq!(Quantity::try_from_f64(10.006).unwrap().hundredths(), 1001);
        assert_eq!(Quantity::try_from_f64(2.675).unwrap().hundredths(), 268);
    }

    #[test]
    fn test_from_f64_rejects_bad_input() {
        assert!(Quantity::try_from_f64(f64::NAN).is_err());
        assert!(Quantity::try_from_f64(f64::INFINITY).is_err());
        assert!(Quantity::try_from_f64(-1.0).is_err());
    }

    #[test]
    fn test_checked_arithmetic() {
        let a = Quantity::from_hundredths(1000);
        let b = Quantity::from_hundredths(250);
        assert_eq!(a.checked_sub(b), Some(Quantity::from_hundredths(750)));
        assert_eq!(a.checked_add(b), Some(Quantity::from_hundredths(1250)));
        assert_eq!(
            Quantity::from_hundredths(i64::MAX).checked_add(Quantity::from_hundredths(1)),
            None
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Quantity::from_hundredths(1001).to_string(), "10.01");
        assert_eq!(Quantity::from_hundredths(5).to_string(), "0.05");
        assert_eq!(Quantity::from_hundredths(0).to_string(), "0.00");
        assert_eq!(MAX_TRANSFER.to_string(), "999999.00");
    }
}
