//! Data models for the Ghost Pass server

use ghostpass_ledger::{DenialReason, PassStatus, ShareCategory, TransactionKind};
use serde::{Deserialize, Serialize};

// ============================================================================
// WALLET
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub binding_id: String,
    /// Null for anonymous wallets.
    pub owning_user_id: Option<String>,
    pub device_fingerprint: String,
    pub balance_cents: i64,
    pub is_active: bool,
    pub verification_id: Option<String>,
    pub verification_status: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterWalletRequest {
    pub device_fingerprint: String,
    pub owning_user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterWalletResponse {
    pub success: bool,
    pub wallet: Option<Wallet>,
    /// False when the fingerprint already had a wallet.
    pub created: bool,
    pub error: Option<String>,
}

// ============================================================================
// LEDGER TRANSACTIONS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: String,
    pub wallet_binding_id: String,
    pub kind: TransactionKind,
    pub amount_cents: i64,
    pub balance_before_cents: i64,
    pub balance_after_cents: i64,
    pub share_category: Option<ShareCategory>,
    pub external_ref: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: i64,
}

// ============================================================================
// REVENUE PROFILES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueProfile {
    pub id: String,
    pub name: String,
    pub valid_pct: f64,
    pub vendor_pct: f64,
    pub pool_pct: f64,
    pub promoter_pct: f64,
    pub executive_pct: f64,
    pub residual: ShareCategory,
    pub updated_at: i64,
    pub updated_by: Option<String>,
}

impl RevenueProfile {
    pub fn shares(&self) -> ghostpass_ledger::RevenueShares {
        ghostpass_ledger::RevenueShares {
            valid_pct: self.valid_pct,
            vendor_pct: self.vendor_pct,
            pool_pct: self.pool_pct,
            promoter_pct: self.promoter_pct,
            executive_pct: self.executive_pct,
            residual: self.residual,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpsertProfileRequest {
    pub name: String,
    pub valid_pct: f64,
    pub vendor_pct: f64,
    pub pool_pct: f64,
    pub promoter_pct: f64,
    #[serde(default)]
    pub executive_pct: f64,
    pub residual: Option<ShareCategory>,
}

impl UpsertProfileRequest {
    pub fn shares(&self) -> ghostpass_ledger::RevenueShares {
        ghostpass_ledger::RevenueShares {
            valid_pct: self.valid_pct,
            vendor_pct: self.vendor_pct,
            pool_pct: self.pool_pct,
            promoter_pct: self.promoter_pct,
            executive_pct: self.executive_pct,
            residual: self.residual.unwrap_or(ShareCategory::Vendor),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub profile: Option<RevenueProfile>,
    pub error: Option<String>,
}

// ============================================================================
// EVENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Active,
    Ended,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Active => "active",
            EventStatus::Ended => "ended",
            EventStatus::Cancelled => "cancelled",
        }
    }
}

impl From<&str> for EventStatus {
    fn from(s: &str) -> Self {
        match s {
            "ended" => EventStatus::Ended,
            "cancelled" => EventStatus::Cancelled,
            _ => EventStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub venue_id: String,
    pub name: String,
    pub status: EventStatus,
    pub ticket_price_cents: i64,
    pub revenue_profile_id: String,
    pub starts_at: i64,
    pub ends_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventRequest {
    pub venue_id: String,
    pub name: String,
    pub ticket_price_cents: i64,
    pub revenue_profile_id: String,
    pub starts_at: i64,
    pub ends_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventResponse {
    pub success: bool,
    pub event: Option<EventRecord>,
    pub error: Option<String>,
}

// ============================================================================
// GHOST PASSES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GhostPass {
    pub id: String,
    pub wallet_binding_id: String,
    pub event_id: String,
    pub status: PassStatus,
    pub valid_from: i64,
    pub valid_until: i64,
    pub allows_reentry: bool,
    pub entry_count: i32,
    pub last_entry_at: Option<i64>,
    pub last_gateway_id: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PurchasePassRequest {
    pub wallet_binding_id: String,
    pub event_id: String,
    #[serde(default)]
    pub allows_reentry: bool,
    /// Client-supplied token; re-delivery with the same token returns the
    /// original purchase instead of charging again.
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchasePassResponse {
    pub success: bool,
    pub pass: Option<GhostPass>,
    pub new_balance_cents: Option<i64>,
    pub transaction_id: Option<String>,
    pub duplicate: bool,
    pub error: Option<String>,
}

// ============================================================================
// GATEWAY SCANS
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ScanRequest {
    pub pass_id: String,
    pub venue_id: String,
    /// Physical scan point (entry door, vendor terminal).
    pub gateway_id: String,
}

/// Always returned with HTTP 200: a denial is an answer, not a transport
/// failure, so gates can distinguish "denied" from "unknown".
#[derive(Debug, Clone, Serialize)]
pub struct ScanResponse {
    pub allowed: bool,
    pub reason: Option<DenialReason>,
    pub entry_count: Option<i32>,
}

// ============================================================================
// VENDOR SPEND
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct VendorSpendRequest {
    pub wallet_binding_id: String,
    pub vendor_id: String,
    pub event_id: String,
    pub amount_cents: i64,
    /// Vendor-terminal reference, used as the idempotency key.
    pub terminal_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VendorSpendResponse {
    pub success: bool,
    pub new_balance_cents: Option<i64>,
    pub transaction_id: Option<String>,
    pub duplicate: bool,
    pub error: Option<String>,
}

// ============================================================================
// TOP-UPS (payment provider)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TopUpCheckoutRequest {
    pub wallet_binding_id: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopUpCheckoutResponse {
    pub success: bool,
    pub session_id: Option<String>,
    pub checkout_url: Option<String>,
    pub error: Option<String>,
}

/// Webhook payload from the payment provider.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentWebhookEvent {
    pub event_type: String,
    pub session_id: String,
    pub amount_total: i64,
    pub metadata: PaymentWebhookMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentWebhookMetadata {
    pub wallet_binding_id: String,
}

// ============================================================================
// PAYOUTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Approved,
    Rejected,
    Processed,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Approved => "approved",
            PayoutStatus::Rejected => "rejected",
            PayoutStatus::Processed => "processed",
        }
    }
}

impl From<&str> for PayoutStatus {
    fn from(s: &str) -> Self {
        match s {
            "approved" => PayoutStatus::Approved,
            "rejected" => PayoutStatus::Rejected,
            "processed" => PayoutStatus::Processed,
            _ => PayoutStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub id: String,
    pub vendor_id: String,
    pub amount_cents: i64,
    pub status: PayoutStatus,
    pub requested_at: i64,
    pub processed_at: Option<i64>,
    pub processed_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePayoutRequest {
    pub vendor_id: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewPayoutRequest {
    pub approve: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayoutResponse {
    pub success: bool,
    pub payout: Option<PayoutRequest>,
    pub error: Option<String>,
}

// ============================================================================
// REPORTING
// ============================================================================

#[derive(Debug, Clone, Default, Serialize)]
pub struct FeeBreakdown {
    pub valid_cents: i64,
    pub vendor_cents: i64,
    pub pool_cents: i64,
    pub promoter_cents: i64,
    pub executive_cents: i64,
    pub total_cents: i64,
}

// ============================================================================
// IDENTITY VERIFICATION
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationStartRequest {
    pub wallet_binding_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationResponse {
    pub success: bool,
    pub verification_id: Option<String>,
    pub status: Option<String>,
    pub requires_manual_review: Option<bool>,
    pub error: Option<String>,
}

// ============================================================================
// ADMIN SESSIONS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSession {
    pub label: String,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminLoginRequest {
    pub token: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminLoginResponse {
    pub success: bool,
    pub session: Option<String>,
    pub expires_at: Option<i64>,
    pub error: Option<String>,
}

// ============================================================================
// WEBSOCKET EVENTS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WsEvent {
    WalletCredited(WalletCreditedEvent),
    PassPurchased(PassPurchasedEvent),
    EntryScanned(EntryScannedEvent),
    PayoutUpdated(PayoutUpdatedEvent),
    ProfileUpdated(ProfileUpdatedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletCreditedEvent {
    pub wallet_binding_id: String,
    pub amount_cents: i64,
    pub new_balance_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassPurchasedEvent {
    pub pass_id: String,
    pub event_id: String,
    pub wallet_binding_id: String,
    pub price_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryScannedEvent {
    pub pass_id: String,
    pub gateway_id: String,
    pub allowed: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutUpdatedEvent {
    pub payout_id: String,
    pub vendor_id: String,
    pub status: PayoutStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileUpdatedEvent {
    pub profile_id: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payout_status_round_trips() {
        for status in [
            PayoutStatus::Pending,
            PayoutStatus::Approved,
            PayoutStatus::Rejected,
            PayoutStatus::Processed,
        ] {
            assert_eq!(PayoutStatus::from(status.as_str()), status);
        }
    }

    #[test]
    fn event_status_round_trips() {
        for status in [EventStatus::Active, EventStatus::Ended, EventStatus::Cancelled] {
            assert_eq!(EventStatus::from(status.as_str()), status);
        }
    }

    #[test]
    fn ws_events_serialize_tagged() {
        let event = WsEvent::EntryScanned(EntryScannedEvent {
            pass_id: "p1".to_string(),
            gateway_id: "gate-2".to_string(),
            allowed: false,
            reason: Some("already_consumed".to_string()),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "entry_scanned");
        assert_eq!(json["data"]["gateway_id"], "gate-2");
        assert_eq!(json["data"]["allowed"], false);
    }

    #[test]
    fn scan_response_reason_is_snake_case() {
        let resp = ScanResponse {
            allowed: false,
            reason: Some(DenialReason::AlreadyConsumed),
            entry_count: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["reason"], "already_consumed");
    }
}
