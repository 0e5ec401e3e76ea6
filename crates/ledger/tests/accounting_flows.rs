//! End-to-end accounting flows over the pure ledger core.
//!
//! These walk the same sequences the server drives against PostgreSQL:
//! top-up, pass purchase with a revenue split, concession spend, and a
//! double scan, verifying the money and admission invariants hold across
//! whole flows rather than single calls.

use ghostpass_ledger::{
    apply_delta, check_admission, compute_split, AdmissionDecision, DenialReason, EventView,
    LedgerError, PassStatus, PassView, RevenueShares, ShareCategory,
};

fn house_shares() -> RevenueShares {
    RevenueShares {
        valid_pct: 40.0,
        vendor_pct: 30.0,
        pool_pct: 20.0,
        promoter_pct: 10.0,
        executive_pct: 0.0,
        residual: ShareCategory::Vendor,
    }
}

#[test]
fn top_up_purchase_and_spend_conserve_money() {
    // Webhook credit lands first.
    let mut balance = apply_delta(0, 10_000).unwrap();
    assert_eq!(balance, 10_000);

    // Pass purchase: debit the ticket price, split it into fee records.
    let ticket_price = 6_400;
    let split = compute_split(ticket_price, &house_shares()).unwrap();
    balance = apply_delta(balance, -ticket_price).unwrap();
    assert_eq!(balance, 3_600);
    assert_eq!(split.total(), ticket_price);

    // Concession spend against the same profile.
    let spend = 1_250;
    let concession = compute_split(spend, &house_shares()).unwrap();
    balance = apply_delta(balance, -spend).unwrap();
    assert_eq!(balance, 2_350);
    assert_eq!(concession.total(), spend);

    // The fee records across both sales account for every gross cent.
    let fee_total: i64 = split.iter().map(|(_, c)| c).sum::<i64>()
        + concession.iter().map(|(_, c)| c).sum::<i64>();
    assert_eq!(fee_total, ticket_price + spend);
}

#[test]
fn failed_debit_leaves_no_partial_state() {
    let balance = 1_000;

    // The split would have been fine, but the debit fails first at the
    // ledger, so nothing downstream of it may be recorded.
    let price = 1_500;
    assert!(compute_split(price, &house_shares()).is_ok());
    let err = apply_delta(balance, -price).unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { .. }));

    // Balance is untouched and still spendable.
    assert_eq!(apply_delta(balance, -1_000).unwrap(), 0);
}

#[test]
fn purchase_then_double_scan_admits_once() {
    let event = EventView {
        id: "event-1".to_string(),
        venue_id: "venue-1".to_string(),
        is_active: true,
    };

    let mut pass = PassView {
        status: PassStatus::Active,
        event_id: event.id.clone(),
        valid_from: 100,
        valid_until: 10_000,
        entry_count: 0,
        allows_reentry: false,
    };

    // First scan admits and the grant increments the entry count.
    assert!(check_admission(&pass, &event, "venue-1", 500).is_allowed());
    pass.entry_count += 1;

    // Second scan at another gateway sees the consumed pass.
    assert_eq!(
        check_admission(&pass, &event, "venue-1", 600),
        AdmissionDecision::Denied(DenialReason::AlreadyConsumed)
    );
}

#[test]
fn revoked_pass_never_readmits_even_with_reentry() {
    let event = EventView {
        id: "event-1".to_string(),
        venue_id: "venue-1".to_string(),
        is_active: true,
    };
    let pass = PassView {
        status: PassStatus::Revoked,
        event_id: event.id.clone(),
        valid_from: 100,
        valid_until: 10_000,
        entry_count: 2,
        allows_reentry: true,
    };
    assert_eq!(
        check_admission(&pass, &event, "venue-1", 500),
        AdmissionDecision::Denied(DenialReason::PassNotActive)
    );
}

#[test]
fn splits_stay_exact_for_awkward_prices() {
    // Odd prices with fractional shares are where floor truncation bites.
    let shares = RevenueShares {
        valid_pct: 12.5,
        vendor_pct: 37.5,
        pool_pct: 33.33,
        promoter_pct: 16.67,
        executive_pct: 0.0,
        residual: ShareCategory::Pool,
    };
    for price in [1, 7, 99, 101, 997, 12_345, 67_891] {
        let split = compute_split(price, &shares).unwrap();
        assert_eq!(split.total(), price, "price={price}");
        for (category, cents) in split.iter() {
            assert!(cents >= 0, "negative allocation for {category}");
        }
    }
}
