//! Database schema and migrations

use anyhow::Result;
use deadpool_postgres::Object;
use tracing::info;

pub async fn run_migrations(client: &Object) -> Result<()> {
    client.batch_execute(SCHEMA_SQL).await?;
    info!("Database migrations applied");
    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Ghost Pass Server Database Schema

-- Device-bound wallets. Created on first use by a device, never deleted,
-- only deactivated. The version column guards every balance write.
CREATE TABLE IF NOT EXISTS wallets (
    binding_id VARCHAR(64) PRIMARY KEY,
    owning_user_id VARCHAR(128),
    device_fingerprint VARCHAR(128) NOT NULL UNIQUE,
    balance_cents BIGINT NOT NULL DEFAULT 0 CHECK (balance_cents >= 0),
    version BIGINT NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    verification_id VARCHAR(128),
    verification_status VARCHAR(32),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Append-only ledger. One row per balance mutation; fee rows record
-- revenue allocations and leave the balance columns equal.
CREATE TABLE IF NOT EXISTS transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    wallet_binding_id VARCHAR(64) NOT NULL REFERENCES wallets(binding_id),
    kind VARCHAR(32) NOT NULL,
    amount_cents BIGINT NOT NULL,
    balance_before_cents BIGINT NOT NULL,
    balance_after_cents BIGINT NOT NULL,
    share_category VARCHAR(32),
    external_ref VARCHAR(128),
    metadata JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Idempotency: one ledger mutation per external reference
CREATE UNIQUE INDEX IF NOT EXISTS idx_transactions_external_ref
    ON transactions (external_ref) WHERE external_ref IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_transactions_wallet
    ON transactions (wallet_binding_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_transactions_fee_category
    ON transactions (share_category) WHERE kind = 'fee';

-- Named percentage-split configuration (admin-managed)
CREATE TABLE IF NOT EXISTS revenue_profiles (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(128) NOT NULL UNIQUE,
    valid_pct DOUBLE PRECISION NOT NULL,
    vendor_pct DOUBLE PRECISION NOT NULL,
    pool_pct DOUBLE PRECISION NOT NULL,
    promoter_pct DOUBLE PRECISION NOT NULL,
    executive_pct DOUBLE PRECISION NOT NULL DEFAULT 0,
    -- Category that absorbs floor-truncation remainders
    residual VARCHAR(32) NOT NULL DEFAULT 'vendor',
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_by VARCHAR(128)
);

-- Events hosted at venues
CREATE TABLE IF NOT EXISTS events (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    venue_id VARCHAR(64) NOT NULL,
    name VARCHAR(255) NOT NULL,
    status VARCHAR(32) NOT NULL DEFAULT 'active',
    ticket_price_cents BIGINT NOT NULL CHECK (ticket_price_cents >= 0),
    revenue_profile_id UUID NOT NULL REFERENCES revenue_profiles(id),
    starts_at TIMESTAMPTZ NOT NULL,
    ends_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_events_venue ON events (venue_id);

-- Admission credentials (Ghost Passes)
CREATE TABLE IF NOT EXISTS event_tickets (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    wallet_binding_id VARCHAR(64) NOT NULL REFERENCES wallets(binding_id),
    event_id UUID NOT NULL REFERENCES events(id),
    status VARCHAR(32) NOT NULL DEFAULT 'active',
    valid_from TIMESTAMPTZ NOT NULL,
    valid_until TIMESTAMPTZ NOT NULL,
    allows_reentry BOOLEAN NOT NULL DEFAULT FALSE,
    entry_count INTEGER NOT NULL DEFAULT 0,
    last_entry_at TIMESTAMPTZ,
    last_gateway_id VARCHAR(64),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_event_tickets_event ON event_tickets (event_id);
CREATE INDEX IF NOT EXISTS idx_event_tickets_wallet ON event_tickets (wallet_binding_id);

-- One row per scan, granted or denied
CREATE TABLE IF NOT EXISTS entry_logs (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    ticket_id UUID,
    gateway_id VARCHAR(64) NOT NULL,
    allowed BOOLEAN NOT NULL,
    reason VARCHAR(64),
    scanned_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_entry_logs_ticket ON entry_logs (ticket_id);

-- Vendor payout requests; status is a one-way progression from pending
CREATE TABLE IF NOT EXISTS payout_requests (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    vendor_id VARCHAR(64) NOT NULL,
    amount_cents BIGINT NOT NULL CHECK (amount_cents > 0),
    status VARCHAR(32) NOT NULL DEFAULT 'pending',
    requested_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    processed_at TIMESTAMPTZ,
    processed_by VARCHAR(128)
);
CREATE INDEX IF NOT EXISTS idx_payout_requests_status ON payout_requests (status);

-- Structured audit trail
CREATE TABLE IF NOT EXISTS audit_logs (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    event_type VARCHAR(64) NOT NULL,
    entity_type VARCHAR(64),
    entity_id VARCHAR(128),
    payload JSONB,
    actor VARCHAR(128),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_audit_logs_type ON audit_logs (event_type, created_at DESC);
"#;
