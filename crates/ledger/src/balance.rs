//! Wallet balance deltas and transaction kinds
//!
//! The persistent half of the ledger (compare-and-swap write plus the
//! transaction-log append) lives in the server's query layer; this module
//! owns the arithmetic rules it must obey.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::money::{self, Cents};

/// Kind of a ledger transaction row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Credit,
    Debit,
    TicketPurchase,
    VendorSpend,
    Fee,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Credit => "credit",
            TransactionKind::Debit => "debit",
            TransactionKind::TicketPurchase => "ticket_purchase",
            TransactionKind::VendorSpend => "vendor_spend",
            TransactionKind::Fee => "fee",
        }
    }

    /// Fee rows are revenue accounting: they record a category's cut of a
    /// gross amount and leave the wallet balance untouched. Every other
    /// kind is a balance mutation with `balance_after = balance_before +
    /// delta`.
    pub fn mutates_balance(&self) -> bool {
        !matches!(self, TransactionKind::Fee)
    }
}

impl From<&str> for TransactionKind {
    fn from(s: &str) -> Self {
        match s {
            "credit" => TransactionKind::Credit,
            "ticket_purchase" => TransactionKind::TicketPurchase,
            "vendor_spend" => TransactionKind::VendorSpend,
            "fee" => TransactionKind::Fee,
            _ => TransactionKind::Debit,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Applies a signed delta to a balance.
///
/// Rejects debits that exceed the balance before anything is written, so a
/// failed debit leaves no trace. The returned balance is always >= 0.
pub fn apply_delta(balance_cents: Cents, delta_cents: Cents) -> Result<Cents> {
    money::require_non_negative(balance_cents, "wallet balance")?;

    if delta_cents < 0 {
        let requested = delta_cents.checked_neg().ok_or(LedgerError::Overflow)?;
        if requested > balance_cents {
            return Err(LedgerError::InsufficientBalance {
                balance_cents,
                requested_cents: requested,
            });
        }
    }

    money::checked_add(balance_cents, delta_cents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_and_debit_round_trip() {
        let after_credit = apply_delta(0, 2_500).unwrap();
        assert_eq!(after_credit, 2_500);
        let after_debit = apply_delta(after_credit, -1_500).unwrap();
        assert_eq!(after_debit, 1_000);
    }

    #[test]
    fn over_debit_is_rejected_without_effect() {
        // 1000-cent wallet, 1500-cent debit: InsufficientBalance, balance
        // untouched by construction (nothing is returned to persist).
        let err = apply_delta(1_000, -1_500).unwrap_err();
        match err {
            LedgerError::InsufficientBalance {
                balance_cents,
                requested_cents,
            } => {
                assert_eq!(balance_cents, 1_000);
                assert_eq!(requested_cents, 1_500);
            }
            other => panic!("expected InsufficientBalance, got {other:?}"),
        }
    }

    #[test]
    fn exact_drain_to_zero_is_allowed() {
        assert_eq!(apply_delta(600, -600).unwrap(), 0);
    }

    #[test]
    fn balance_stays_non_negative_across_sequences() {
        let mut balance = 0;
        let mut applied = 0i64;
        for delta in [500, -200, 1_000, -1_300, 250, -250] {
            balance = apply_delta(balance, delta).unwrap();
            applied += delta;
            assert!(balance >= 0);
            assert_eq!(balance, applied);
        }
    }

    #[test]
    fn overflow_is_an_error() {
        assert!(matches!(
            apply_delta(i64::MAX, 1),
            Err(LedgerError::Overflow)
        ));
        assert!(matches!(
            apply_delta(0, i64::MIN),
            Err(LedgerError::Overflow)
        ));
    }

    #[test]
    fn negative_stored_balance_is_invalid() {
        assert!(matches!(
            apply_delta(-1, 100),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn kind_round_trips_and_fee_is_not_a_mutation() {
        for kind in [
            TransactionKind::Credit,
            TransactionKind::Debit,
            TransactionKind::TicketPurchase,
            TransactionKind::VendorSpend,
            TransactionKind::Fee,
        ] {
            assert_eq!(TransactionKind::from(kind.as_str()), kind);
        }
        assert!(!TransactionKind::Fee.mutates_balance());
        assert!(TransactionKind::TicketPurchase.mutates_balance());
    }
}
