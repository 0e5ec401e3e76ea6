//! Revenue-split calculator
//!
//! Distributes a gross amount across typed share categories. All amounts are
//! computed with integer basis-point arithmetic so results are deterministic
//! across platforms: each category gets `floor(gross * pct / 100)` and the
//! floor-truncation remainder goes to the profile's designated residual
//! category, so the outputs always sum back to the gross exactly.
//!
//! Categories are a first-class enum. Recipient identity is never inferred
//! from vendor-name strings; a transaction records the category it was
//! allocated to and reporting aggregates over that column.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::money::{self, Cents};

/// Share percentages may be off from 100 by at most this much.
pub const SHARE_SUM_TOLERANCE_PCT: f64 = 0.01;

const BASIS_POINTS_PER_PERCENT: f64 = 100.0;
const TOTAL_BASIS_POINTS: i128 = 10_000;

/// Revenue recipient category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareCategory {
    Valid,
    Vendor,
    Pool,
    Promoter,
    Executive,
}

impl ShareCategory {
    pub const ALL: [ShareCategory; 5] = [
        ShareCategory::Valid,
        ShareCategory::Vendor,
        ShareCategory::Pool,
        ShareCategory::Promoter,
        ShareCategory::Executive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShareCategory::Valid => "valid",
            ShareCategory::Vendor => "vendor",
            ShareCategory::Pool => "pool",
            ShareCategory::Promoter => "promoter",
            ShareCategory::Executive => "executive",
        }
    }
}

impl From<&str> for ShareCategory {
    fn from(s: &str) -> Self {
        match s {
            "valid" => ShareCategory::Valid,
            "pool" => ShareCategory::Pool,
            "promoter" => ShareCategory::Promoter,
            "executive" => ShareCategory::Executive,
            _ => ShareCategory::Vendor,
        }
    }
}

impl std::fmt::Display for ShareCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentage shares of a revenue profile.
///
/// Percentages are fractional numbers summing to 100 (within
/// [`SHARE_SUM_TOLERANCE_PCT`]). `residual` names the category that absorbs
/// the floor-truncation remainder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueShares {
    pub valid_pct: f64,
    pub vendor_pct: f64,
    pub pool_pct: f64,
    pub promoter_pct: f64,
    pub executive_pct: f64,
    pub residual: ShareCategory,
}

impl RevenueShares {
    pub fn pct(&self, category: ShareCategory) -> f64 {
        match category {
            ShareCategory::Valid => self.valid_pct,
            ShareCategory::Vendor => self.vendor_pct,
            ShareCategory::Pool => self.pool_pct,
            ShareCategory::Promoter => self.promoter_pct,
            ShareCategory::Executive => self.executive_pct,
        }
    }

    pub fn total_pct(&self) -> f64 {
        ShareCategory::ALL.iter().map(|c| self.pct(*c)).sum()
    }

    /// Validates the share set before any amount is derived from it.
    pub fn validate(&self) -> Result<()> {
        for category in ShareCategory::ALL {
            let pct = self.pct(category);
            if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
                return Err(LedgerError::Validation(format!(
                    "{category} share must be within [0, 100], got {pct}"
                )));
            }
        }

        let total = self.total_pct();
        if (total - 100.0).abs() > SHARE_SUM_TOLERANCE_PCT {
            return Err(LedgerError::Validation(format!(
                "share percentages must sum to 100, got {total}"
            )));
        }

        if self.pct(self.residual) <= 0.0 {
            return Err(LedgerError::Validation(format!(
                "residual category {} carries no share",
                self.residual
            )));
        }

        Ok(())
    }
}

/// Per-category allocation of a gross amount, in cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SplitBreakdown {
    pub valid_cents: Cents,
    pub vendor_cents: Cents,
    pub pool_cents: Cents,
    pub promoter_cents: Cents,
    pub executive_cents: Cents,
}

impl SplitBreakdown {
    pub fn get(&self, category: ShareCategory) -> Cents {
        match category {
            ShareCategory::Valid => self.valid_cents,
            ShareCategory::Vendor => self.vendor_cents,
            ShareCategory::Pool => self.pool_cents,
            ShareCategory::Promoter => self.promoter_cents,
            ShareCategory::Executive => self.executive_cents,
        }
    }

    fn get_mut(&mut self, category: ShareCategory) -> &mut Cents {
        match category {
            ShareCategory::Valid => &mut self.valid_cents,
            ShareCategory::Vendor => &mut self.vendor_cents,
            ShareCategory::Pool => &mut self.pool_cents,
            ShareCategory::Promoter => &mut self.promoter_cents,
            ShareCategory::Executive => &mut self.executive_cents,
        }
    }

    pub fn total(&self) -> Cents {
        ShareCategory::ALL.iter().map(|c| self.get(*c)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShareCategory, Cents)> + '_ {
        ShareCategory::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}

/// Splits `gross_cents` across the share categories.
///
/// The exactness invariant `breakdown.total() == gross_cents` holds for
/// every valid input; callers persist the breakdown without re-deriving it.
pub fn compute_split(gross_cents: Cents, shares: &RevenueShares) -> Result<SplitBreakdown> {
    money::require_non_negative(gross_cents, "gross amount")?;
    shares.validate()?;

    let mut breakdown = SplitBreakdown::default();
    let mut allocated: i128 = 0;

    for category in ShareCategory::ALL {
        // Round the fractional percentage to whole basis points once, then
        // stay in integer arithmetic.
        let bp = (shares.pct(category) * BASIS_POINTS_PER_PERCENT).round() as i128;
        let cents = (gross_cents as i128 * bp / TOTAL_BASIS_POINTS) as Cents;
        *breakdown.get_mut(category) = cents;
        allocated += cents as i128;
    }

    // The remainder is signed: a share sum just under 100 leaves cents
    // behind, a sum just over 100 over-allocates by at most a few cents.
    let remainder = gross_cents as i128 - allocated;
    let residual = breakdown.get_mut(shares.residual);
    let adjusted = *residual as i128 + remainder;
    if adjusted < 0 {
        return Err(LedgerError::Validation(format!(
            "residual category {} cannot absorb remainder of {remainder} cents",
            shares.residual
        )));
    }
    *residual = adjusted as Cents;

    debug_assert_eq!(breakdown.total(), gross_cents);
    Ok(breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shares(valid: f64, vendor: f64, pool: f64, promoter: f64, executive: f64) -> RevenueShares {
        RevenueShares {
            valid_pct: valid,
            vendor_pct: vendor,
            pool_pct: pool,
            promoter_pct: promoter,
            executive_pct: executive,
            residual: ShareCategory::Vendor,
        }
    }

    #[test]
    fn splits_even_percentages_exactly() {
        let breakdown = compute_split(10_000, &shares(40.0, 30.0, 20.0, 10.0, 0.0)).unwrap();
        assert_eq!(breakdown.valid_cents, 4_000);
        assert_eq!(breakdown.vendor_cents, 3_000);
        assert_eq!(breakdown.pool_cents, 2_000);
        assert_eq!(breakdown.promoter_cents, 1_000);
        assert_eq!(breakdown.executive_cents, 0);
        assert_eq!(breakdown.total(), 10_000);
    }

    #[test]
    fn residual_category_absorbs_truncation() {
        // 33.33/33.33/33.34 over 100 cents floors to 33+33+33, vendor
        // picks up the lost cent.
        let breakdown = compute_split(100, &shares(33.33, 33.33, 33.34, 0.0, 0.0)).unwrap();
        assert_eq!(breakdown.valid_cents, 33);
        assert_eq!(breakdown.pool_cents, 33);
        assert_eq!(breakdown.vendor_cents, 34);
        assert_eq!(breakdown.total(), 100);
    }

    #[test]
    fn exactness_holds_across_grosses_and_share_sets() {
        let sets = [
            shares(40.0, 30.0, 20.0, 10.0, 0.0),
            shares(25.0, 25.0, 25.0, 12.5, 12.5),
            shares(33.33, 33.33, 33.34, 0.0, 0.0),
            shares(99.99, 0.01, 0.0, 0.0, 0.0),
            RevenueShares {
                residual: ShareCategory::Pool,
                ..shares(10.0, 15.0, 55.0, 15.0, 5.0)
            },
        ];
        for set in &sets {
            for gross in [0, 1, 3, 7, 99, 100, 101, 12_345, 1_000_000, 999_999_999] {
                let breakdown = compute_split(gross, set).unwrap();
                assert_eq!(breakdown.total(), gross, "gross={gross} shares={set:?}");
            }
        }
    }

    #[test]
    fn tolerated_drift_still_sums_to_gross() {
        // Sum is 100.01, inside tolerance; the residual is adjusted down.
        let over = shares(40.01, 30.0, 20.0, 10.0, 0.0);
        let breakdown = compute_split(1_000_000, &over).unwrap();
        assert_eq!(breakdown.total(), 1_000_000);

        // Sum is 99.99, also inside tolerance.
        let under = shares(39.99, 30.0, 20.0, 10.0, 0.0);
        let breakdown = compute_split(1_000_000, &under).unwrap();
        assert_eq!(breakdown.total(), 1_000_000);
    }

    #[test]
    fn rejects_share_sum_outside_tolerance() {
        let err = compute_split(10_000, &shares(40.0, 30.0, 20.0, 10.5, 0.0)).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let err = compute_split(10_000, &shares(40.0, 30.0, 20.0, 9.5, 0.0)).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn rejects_out_of_range_percentages() {
        assert!(compute_split(100, &shares(-1.0, 51.0, 20.0, 30.0, 0.0)).is_err());
        assert!(compute_split(100, &shares(101.0, -1.0, 0.0, 0.0, 0.0)).is_err());
        assert!(compute_split(100, &shares(f64::NAN, 60.0, 20.0, 20.0, 0.0)).is_err());
    }

    #[test]
    fn rejects_negative_gross() {
        assert!(compute_split(-1, &shares(40.0, 30.0, 20.0, 10.0, 0.0)).is_err());
    }

    #[test]
    fn rejects_zero_share_residual() {
        let set = RevenueShares {
            residual: ShareCategory::Executive,
            ..shares(40.0, 30.0, 20.0, 10.0, 0.0)
        };
        let err = compute_split(10_000, &set).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn zero_gross_allocates_nothing() {
        let breakdown = compute_split(0, &shares(40.0, 30.0, 20.0, 10.0, 0.0)).unwrap();
        assert_eq!(breakdown.total(), 0);
        for (_, cents) in breakdown.iter() {
            assert_eq!(cents, 0);
        }
    }

    #[test]
    fn category_round_trips_through_text() {
        for category in ShareCategory::ALL {
            assert_eq!(ShareCategory::from(category.as_str()), category);
        }
    }

    #[test]
    fn category_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ShareCategory::Promoter).unwrap(),
            "\"promoter\""
        );
        let parsed: ShareCategory = serde_json::from_str("\"executive\"").unwrap();
        assert_eq!(parsed, ShareCategory::Executive);
    }
}
