//! Integer-cent money arithmetic
//!
//! Balances, prices and fees are always whole cents (`i64`), never floating
//! currency. Floats only appear as configuration percentages and are
//! converted to basis points before any amount is derived from them.

use crate::error::{LedgerError, Result};

/// Amount in whole cents.
pub type Cents = i64;

/// Checked addition; overflow is a hard error, never a wrap.
pub fn checked_add(a: Cents, b: Cents) -> Result<Cents> {
    a.checked_add(b).ok_or(LedgerError::Overflow)
}

/// Rejects negative amounts where only non-negative money makes sense
/// (gross revenue, prices, top-ups).
pub fn require_non_negative(amount: Cents, what: &str) -> Result<Cents> {
    if amount < 0 {
        return Err(LedgerError::Validation(format!(
            "{what} must be non-negative, got {amount}"
        )));
    }
    Ok(amount)
}

/// Rejects zero or negative amounts where a positive amount is required
/// (debits, payout requests).
pub fn require_positive(amount: Cents, what: &str) -> Result<Cents> {
    if amount <= 0 {
        return Err(LedgerError::Validation(format!(
            "{what} must be positive, got {amount}"
        )));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_add_detects_overflow() {
        assert!(matches!(
            checked_add(i64::MAX, 1),
            Err(LedgerError::Overflow)
        ));
        assert_eq!(checked_add(100, 250).unwrap(), 350);
    }

    #[test]
    fn sign_guards() {
        assert!(require_non_negative(0, "gross").is_ok());
        assert!(require_non_negative(-1, "gross").is_err());
        assert!(require_positive(1, "amount").is_ok());
        assert!(require_positive(0, "amount").is_err());
    }
}
