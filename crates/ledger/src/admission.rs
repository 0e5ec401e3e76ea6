//! Pass admission predicate
//!
//! Stateless decision over a snapshot of a pass and its event. The server
//! makes the grant itself (the `entry_count` increment) atomic with a
//! guarded update; this module only ranks the checks and names the denial.
//!
//! Status machine: `active → expired | revoked`, both terminal. A
//! non-reentry pass with `entry_count > 0` is consumed and never re-admits,
//! but stays `active` in storage so the denial can be reported distinctly
//! from a revocation or expiry.

use serde::{Deserialize, Serialize};

/// Stored pass status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStatus {
    Active,
    Expired,
    Revoked,
}

impl PassStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassStatus::Active => "active",
            PassStatus::Expired => "expired",
            PassStatus::Revoked => "revoked",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PassStatus::Active)
    }
}

impl From<&str> for PassStatus {
    fn from(s: &str) -> Self {
        match s {
            "expired" => PassStatus::Expired,
            "revoked" => PassStatus::Revoked,
            _ => PassStatus::Active,
        }
    }
}

/// Snapshot of the pass fields the admission decision reads.
#[derive(Debug, Clone)]
pub struct PassView {
    pub status: PassStatus,
    pub event_id: String,
    /// Validity window, epoch seconds.
    pub valid_from: i64,
    pub valid_until: i64,
    pub entry_count: i32,
    pub allows_reentry: bool,
}

/// Snapshot of the event fields the admission decision reads.
#[derive(Debug, Clone)]
pub struct EventView {
    pub id: String,
    pub venue_id: String,
    pub is_active: bool,
}

/// Why a scan was denied. Ordered: the first failing check wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    PassNotFound,
    PassNotActive,
    VenueMismatch,
    EventInactive,
    NotYetValid,
    ValidityElapsed,
    AlreadyConsumed,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::PassNotFound => "pass_not_found",
            DenialReason::PassNotActive => "pass_not_active",
            DenialReason::VenueMismatch => "venue_mismatch",
            DenialReason::EventInactive => "event_inactive",
            DenialReason::NotYetValid => "not_yet_valid",
            DenialReason::ValidityElapsed => "validity_elapsed",
            DenialReason::AlreadyConsumed => "already_consumed",
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Allowed,
    Denied(DenialReason),
}

impl AdmissionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AdmissionDecision::Allowed)
    }

    pub fn denial(&self) -> Option<DenialReason> {
        match self {
            AdmissionDecision::Allowed => None,
            AdmissionDecision::Denied(reason) => Some(*reason),
        }
    }
}

/// Evaluates whether a presented pass grants entry at `venue_id` at `now`
/// (epoch seconds).
pub fn check_admission(
    pass: &PassView,
    event: &EventView,
    venue_id: &str,
    now: i64,
) -> AdmissionDecision {
    if pass.status.is_terminal() {
        return AdmissionDecision::Denied(DenialReason::PassNotActive);
    }
    if pass.event_id != event.id || event.venue_id != venue_id {
        return AdmissionDecision::Denied(DenialReason::VenueMismatch);
    }
    if !event.is_active {
        return AdmissionDecision::Denied(DenialReason::EventInactive);
    }
    if now < pass.valid_from {
        return AdmissionDecision::Denied(DenialReason::NotYetValid);
    }
    if now > pass.valid_until {
        return AdmissionDecision::Denied(DenialReason::ValidityElapsed);
    }
    if pass.entry_count > 0 && !pass.allows_reentry {
        return AdmissionDecision::Denied(DenialReason::AlreadyConsumed);
    }
    AdmissionDecision::Allowed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass() -> PassView {
        PassView {
            status: PassStatus::Active,
            event_id: "event-1".to_string(),
            valid_from: 1_000,
            valid_until: 2_000,
            entry_count: 0,
            allows_reentry: false,
        }
    }

    fn event() -> EventView {
        EventView {
            id: "event-1".to_string(),
            venue_id: "venue-1".to_string(),
            is_active: true,
        }
    }

    #[test]
    fn active_pass_in_window_is_allowed() {
        assert!(check_admission(&pass(), &event(), "venue-1", 1_500).is_allowed());
    }

    #[test]
    fn terminal_status_wins_over_everything() {
        for status in [PassStatus::Expired, PassStatus::Revoked] {
            let p = PassView {
                status,
                entry_count: 5,
                ..pass()
            };
            // Even with a venue mismatch and an elapsed window, the status
            // check is reported first.
            assert_eq!(
                check_admission(&p, &event(), "venue-9", 9_999),
                AdmissionDecision::Denied(DenialReason::PassNotActive)
            );
        }
    }

    #[test]
    fn wrong_venue_is_denied() {
        assert_eq!(
            check_admission(&pass(), &event(), "venue-2", 1_500),
            AdmissionDecision::Denied(DenialReason::VenueMismatch)
        );

        let p = PassView {
            event_id: "event-2".to_string(),
            ..pass()
        };
        assert_eq!(
            check_admission(&p, &event(), "venue-1", 1_500),
            AdmissionDecision::Denied(DenialReason::VenueMismatch)
        );
    }

    #[test]
    fn inactive_event_is_denied() {
        let e = EventView {
            is_active: false,
            ..event()
        };
        assert_eq!(
            check_admission(&pass(), &e, "venue-1", 1_500),
            AdmissionDecision::Denied(DenialReason::EventInactive)
        );
    }

    #[test]
    fn window_bounds_are_inclusive() {
        assert!(check_admission(&pass(), &event(), "venue-1", 1_000).is_allowed());
        assert!(check_admission(&pass(), &event(), "venue-1", 2_000).is_allowed());
        assert_eq!(
            check_admission(&pass(), &event(), "venue-1", 999),
            AdmissionDecision::Denied(DenialReason::NotYetValid)
        );
        assert_eq!(
            check_admission(&pass(), &event(), "venue-1", 2_001),
            AdmissionDecision::Denied(DenialReason::ValidityElapsed)
        );
    }

    #[test]
    fn out_of_window_scan_is_denied_even_when_consumed() {
        // The window checks outrank the consumption check.
        let p = PassView {
            entry_count: 1,
            ..pass()
        };
        assert_eq!(
            check_admission(&p, &event(), "venue-1", 2_500),
            AdmissionDecision::Denied(DenialReason::ValidityElapsed)
        );
    }

    #[test]
    fn non_reentry_pass_admits_once() {
        let first = PassView {
            entry_count: 0,
            ..pass()
        };
        assert!(check_admission(&first, &event(), "venue-1", 1_500).is_allowed());

        let second = PassView {
            entry_count: 1,
            ..pass()
        };
        assert_eq!(
            check_admission(&second, &event(), "venue-1", 1_500),
            AdmissionDecision::Denied(DenialReason::AlreadyConsumed)
        );
    }

    #[test]
    fn reentry_pass_admits_repeatedly() {
        let p = PassView {
            entry_count: 7,
            allows_reentry: true,
            ..pass()
        };
        assert!(check_admission(&p, &event(), "venue-1", 1_500).is_allowed());
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [PassStatus::Active, PassStatus::Expired, PassStatus::Revoked] {
            assert_eq!(PassStatus::from(status.as_str()), status);
        }
    }
}
