//! Database queries for the Ghost Pass server (PostgreSQL)
//!
//! Plain CRUD reads/writes return `anyhow::Result`. The ledger entry points
//! (`apply_wallet_mutation`, `purchase_pass`, `vendor_spend`) return
//! [`LedgerError`] so handlers can map the taxonomy onto HTTP statuses.
//!
//! Every balance write is a compare-and-swap on the wallet's version column
//! and shares one SQL transaction with its ledger-row append: a version race
//! surfaces as `Conflict` and is retried a bounded number of times, and a
//! partially-applied mutation cannot be observed.

use crate::models::{
    EventRecord, EventStatus, FeeBreakdown, GhostPass, LedgerTransaction, PayoutRequest,
    PayoutStatus, RevenueProfile, Wallet,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use ghostpass_ledger::{
    balance, compute_split, LedgerError, PassStatus, RevenueShares, ShareCategory, SplitBreakdown,
    TransactionKind,
};
use tokio_postgres::error::SqlState;
use tokio_postgres::{Row, Transaction};
use tracing::warn;
use uuid::Uuid;

/// Attempts per ledger mutation before a version race is surfaced.
const MUTATION_ATTEMPTS: u32 = 4;

fn storage<E: std::fmt::Display>(err: E) -> LedgerError {
    LedgerError::Storage(err.to_string())
}

fn is_unique_violation(err: &tokio_postgres::Error) -> bool {
    err.code() == Some(&SqlState::UNIQUE_VIOLATION)
}

// ============================================================================
// WALLETS
// ============================================================================

fn wallet_from_row(row: &Row) -> Wallet {
    Wallet {
        binding_id: row.get(0),
        owning_user_id: row.get(1),
        device_fingerprint: row.get(2),
        balance_cents: row.get(3),
        is_active: row.get(4),
        verification_id: row.get(5),
        verification_status: row.get(6),
        created_at: row.get::<_, DateTime<Utc>>(7).timestamp(),
    }
}

const WALLET_COLUMNS: &str = "binding_id, owning_user_id, device_fingerprint, balance_cents, \
     is_active, verification_id, verification_status, created_at";

/// Register the wallet bound to a device fingerprint, or return the existing
/// one. Wallets are created exactly once per device and never deleted.
pub async fn register_wallet(
    pool: &Pool,
    device_fingerprint: &str,
    owning_user_id: Option<&str>,
) -> Result<(Wallet, bool)> {
    let client = pool.get().await?;
    let binding_id = format!("wb_{}", Uuid::new_v4().simple());

    let inserted = client
        .query_opt(
            &format!(
                "INSERT INTO wallets (binding_id, owning_user_id, device_fingerprint)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (device_fingerprint) DO NOTHING
                 RETURNING {WALLET_COLUMNS}"
            ),
            &[&binding_id, &owning_user_id, &device_fingerprint],
        )
        .await?;

    if let Some(row) = inserted {
        return Ok((wallet_from_row(&row), true));
    }

    let row = client
        .query_one(
            &format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE device_fingerprint = $1"),
            &[&device_fingerprint],
        )
        .await?;
    Ok((wallet_from_row(&row), false))
}

pub async fn get_wallet(pool: &Pool, binding_id: &str) -> Result<Option<Wallet>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE binding_id = $1"),
            &[&binding_id],
        )
        .await?;
    Ok(row.map(|row| wallet_from_row(&row)))
}

pub async fn deactivate_wallet(pool: &Pool, binding_id: &str) -> Result<bool> {
    let client = pool.get().await?;
    let updated = client
        .execute(
            "UPDATE wallets SET is_active = FALSE WHERE binding_id = $1",
            &[&binding_id],
        )
        .await?;
    Ok(updated > 0)
}

pub async fn set_wallet_verification(
    pool: &Pool,
    binding_id: &str,
    verification_id: &str,
    status: &str,
) -> Result<bool> {
    let client = pool.get().await?;
    let updated = client
        .execute(
            "UPDATE wallets SET verification_id = $2, verification_status = $3
             WHERE binding_id = $1",
            &[&binding_id, &verification_id, &status],
        )
        .await?;
    Ok(updated > 0)
}

// ============================================================================
// LEDGER
// ============================================================================

fn transaction_from_row(row: &Row) -> LedgerTransaction {
    LedgerTransaction {
        id: row.get::<_, Uuid>(0).to_string(),
        wallet_binding_id: row.get(1),
        kind: TransactionKind::from(row.get::<_, String>(2).as_str()),
        amount_cents: row.get(3),
        balance_before_cents: row.get(4),
        balance_after_cents: row.get(5),
        share_category: row
            .get::<_, Option<String>>(6)
            .map(|s| ShareCategory::from(s.as_str())),
        external_ref: row.get(7),
        metadata: row.get(8),
        created_at: row.get::<_, DateTime<Utc>>(9).timestamp(),
    }
}

const TRANSACTION_COLUMNS: &str = "id, wallet_binding_id, kind, amount_cents, \
     balance_before_cents, balance_after_cents, share_category, external_ref, metadata, created_at";

pub async fn get_wallet_transactions(
    pool: &Pool,
    binding_id: &str,
    limit: i64,
) -> Result<Vec<LedgerTransaction>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            &format!(
                "SELECT {TRANSACTION_COLUMNS} FROM transactions
                 WHERE wallet_binding_id = $1 ORDER BY created_at DESC LIMIT $2"
            ),
            &[&binding_id, &limit],
        )
        .await?;
    Ok(rows.iter().map(transaction_from_row).collect())
}

/// A requested ledger mutation against one wallet.
#[derive(Debug)]
pub struct WalletMutation<'a> {
    pub wallet_binding_id: &'a str,
    pub delta_cents: i64,
    pub kind: TransactionKind,
    pub external_ref: Option<&'a str>,
    pub metadata: Option<serde_json::Value>,
}

/// What a ledger mutation produced.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub transaction_id: Uuid,
    pub new_balance_cents: i64,
    /// True when the external reference had already been applied; the
    /// original outcome is returned and no second mutation happens.
    pub duplicate: bool,
}

/// Looks up a previously applied mutation by its external reference.
async fn existing_mutation(
    client: &Transaction<'_>,
    external_ref: &str,
) -> std::result::Result<Option<(Uuid, i64, Option<serde_json::Value>)>, tokio_postgres::Error> {
    let row = client
        .query_opt(
            "SELECT id, balance_after_cents, metadata FROM transactions WHERE external_ref = $1",
            &[&external_ref],
        )
        .await?;
    Ok(row.map(|row| (row.get(0), row.get(1), row.get(2))))
}

/// Loads the wallet, applies the delta, and performs the guarded balance
/// write. Returns `(balance_before, balance_after)`.
async fn cas_wallet_update(
    client: &Transaction<'_>,
    binding_id: &str,
    delta_cents: i64,
) -> std::result::Result<(i64, i64), LedgerError> {
    let row = client
        .query_opt(
            "SELECT balance_cents, version, is_active FROM wallets WHERE binding_id = $1",
            &[&binding_id],
        )
        .await
        .map_err(storage)?
        .ok_or_else(|| LedgerError::NotFound(format!("wallet {binding_id}")))?;

    let balance_before: i64 = row.get(0);
    let version: i64 = row.get(1);
    let is_active: bool = row.get(2);
    if !is_active {
        return Err(LedgerError::Validation(format!(
            "wallet {binding_id} is deactivated"
        )));
    }

    let balance_after = balance::apply_delta(balance_before, delta_cents)?;

    let updated = client
        .execute(
            "UPDATE wallets SET balance_cents = $1, version = version + 1
             WHERE binding_id = $2 AND version = $3",
            &[&balance_after, &binding_id, &version],
        )
        .await
        .map_err(storage)?;
    if updated == 0 {
        return Err(LedgerError::Conflict(format!(
            "wallet {binding_id} version moved during mutation"
        )));
    }

    Ok((balance_before, balance_after))
}

#[allow(clippy::too_many_arguments)]
async fn insert_ledger_row(
    client: &Transaction<'_>,
    wallet_binding_id: &str,
    kind: TransactionKind,
    amount_cents: i64,
    balance_before_cents: i64,
    balance_after_cents: i64,
    share_category: Option<ShareCategory>,
    external_ref: Option<&str>,
    metadata: Option<&serde_json::Value>,
) -> std::result::Result<Uuid, LedgerError> {
    let result = client
        .query_one(
            "INSERT INTO transactions
                 (wallet_binding_id, kind, amount_cents, balance_before_cents,
                  balance_after_cents, share_category, external_ref, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
            &[
                &wallet_binding_id,
                &kind.as_str(),
                &amount_cents,
                &balance_before_cents,
                &balance_after_cents,
                &share_category.map(|c| c.as_str()),
                &external_ref,
                &metadata,
            ],
        )
        .await;

    match result {
        Ok(row) => Ok(row.get(0)),
        // A concurrent delivery of the same external reference beat this
        // transaction to the insert; the retry loop re-reads it as a
        // duplicate.
        Err(e) if is_unique_violation(&e) => Err(LedgerError::Conflict(
            "external reference already recorded".to_string(),
        )),
        Err(e) => Err(storage(e)),
    }
}

/// Applies a single balance mutation and appends its ledger row atomically.
///
/// Re-delivery with the same `external_ref` short-circuits to the original
/// outcome without touching the balance.
pub async fn apply_wallet_mutation(
    pool: &Pool,
    mutation: &WalletMutation<'_>,
) -> std::result::Result<MutationOutcome, LedgerError> {
    let mut attempt = 0;
    loop {
        match try_apply_mutation(pool, mutation).await {
            Err(LedgerError::Conflict(reason)) if attempt + 1 < MUTATION_ATTEMPTS => {
                attempt += 1;
                warn!(
                    wallet = mutation.wallet_binding_id,
                    attempt, %reason,
                    "ledger mutation conflict, retrying"
                );
            }
            other => return other,
        }
    }
}

async fn try_apply_mutation(
    pool: &Pool,
    mutation: &WalletMutation<'_>,
) -> std::result::Result<MutationOutcome, LedgerError> {
    let mut client = pool.get().await.map_err(storage)?;
    let tx = client.transaction().await.map_err(storage)?;

    if let Some(external_ref) = mutation.external_ref {
        if let Some((id, balance_after, _)) = existing_mutation(&tx, external_ref)
            .await
            .map_err(storage)?
        {
            return Ok(MutationOutcome {
                transaction_id: id,
                new_balance_cents: balance_after,
                duplicate: true,
            });
        }
    }

    let (balance_before, balance_after) =
        cas_wallet_update(&tx, mutation.wallet_binding_id, mutation.delta_cents).await?;

    let transaction_id = insert_ledger_row(
        &tx,
        mutation.wallet_binding_id,
        mutation.kind,
        mutation.delta_cents,
        balance_before,
        balance_after,
        None,
        mutation.external_ref,
        mutation.metadata.as_ref(),
    )
    .await?;

    tx.commit().await.map_err(storage)?;
    Ok(MutationOutcome {
        transaction_id,
        new_balance_cents: balance_after,
        duplicate: false,
    })
}

/// Debits a wallet and appends one fee row per allocated share category,
/// all inside the caller's transaction.
async fn spend_with_split(
    client: &Transaction<'_>,
    wallet_binding_id: &str,
    gross_cents: i64,
    kind: TransactionKind,
    shares: &RevenueShares,
    external_ref: Option<&str>,
    metadata: serde_json::Value,
) -> std::result::Result<(MutationOutcome, SplitBreakdown), LedgerError> {
    let split = compute_split(gross_cents, shares)?;

    let (balance_before, balance_after) =
        cas_wallet_update(client, wallet_binding_id, -gross_cents).await?;

    let transaction_id = insert_ledger_row(
        client,
        wallet_binding_id,
        kind,
        -gross_cents,
        balance_before,
        balance_after,
        None,
        external_ref,
        Some(&metadata),
    )
    .await?;

    for (category, cents) in split.iter() {
        if cents == 0 {
            continue;
        }
        insert_ledger_row(
            client,
            wallet_binding_id,
            TransactionKind::Fee,
            cents,
            balance_after,
            balance_after,
            Some(category),
            None,
            Some(&metadata),
        )
        .await?;
    }

    Ok((
        MutationOutcome {
            transaction_id,
            new_balance_cents: balance_after,
            duplicate: false,
        },
        split,
    ))
}

// ============================================================================
// REVENUE PROFILES
// ============================================================================

fn profile_from_row(row: &Row) -> RevenueProfile {
    RevenueProfile {
        id: row.get::<_, Uuid>(0).to_string(),
        name: row.get(1),
        valid_pct: row.get(2),
        vendor_pct: row.get(3),
        pool_pct: row.get(4),
        promoter_pct: row.get(5),
        executive_pct: row.get(6),
        residual: ShareCategory::from(row.get::<_, String>(7).as_str()),
        updated_at: row.get::<_, DateTime<Utc>>(8).timestamp(),
        updated_by: row.get(9),
    }
}

const PROFILE_COLUMNS: &str = "id, name, valid_pct, vendor_pct, pool_pct, promoter_pct, \
     executive_pct, residual, updated_at, updated_by";

pub async fn create_profile(
    pool: &Pool,
    name: &str,
    shares: &RevenueShares,
    updated_by: Option<&str>,
) -> Result<RevenueProfile> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            &format!(
                "INSERT INTO revenue_profiles
                     (name, valid_pct, vendor_pct, pool_pct, promoter_pct, executive_pct,
                      residual, updated_by)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 RETURNING {PROFILE_COLUMNS}"
            ),
            &[
                &name,
                &shares.valid_pct,
                &shares.vendor_pct,
                &shares.pool_pct,
                &shares.promoter_pct,
                &shares.executive_pct,
                &shares.residual.as_str(),
                &updated_by,
            ],
        )
        .await?;
    Ok(profile_from_row(&row))
}

pub async fn update_profile(
    pool: &Pool,
    id: Uuid,
    shares: &RevenueShares,
    updated_by: Option<&str>,
) -> Result<Option<RevenueProfile>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!(
                "UPDATE revenue_profiles SET
                     valid_pct = $2, vendor_pct = $3, pool_pct = $4, promoter_pct = $5,
                     executive_pct = $6, residual = $7, updated_at = NOW(), updated_by = $8
                 WHERE id = $1
                 RETURNING {PROFILE_COLUMNS}"
            ),
            &[
                &id,
                &shares.valid_pct,
                &shares.vendor_pct,
                &shares.pool_pct,
                &shares.promoter_pct,
                &shares.executive_pct,
                &shares.residual.as_str(),
                &updated_by,
            ],
        )
        .await?;
    Ok(row.map(|row| profile_from_row(&row)))
}

pub async fn get_profile(pool: &Pool, id: Uuid) -> Result<Option<RevenueProfile>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!("SELECT {PROFILE_COLUMNS} FROM revenue_profiles WHERE id = $1"),
            &[&id],
        )
        .await?;
    Ok(row.map(|row| profile_from_row(&row)))
}

pub async fn list_profiles(pool: &Pool) -> Result<Vec<RevenueProfile>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            &format!("SELECT {PROFILE_COLUMNS} FROM revenue_profiles ORDER BY name"),
            &[],
        )
        .await?;
    Ok(rows.iter().map(profile_from_row).collect())
}

// ============================================================================
// EVENTS
// ============================================================================

fn event_from_row(row: &Row) -> EventRecord {
    EventRecord {
        id: row.get::<_, Uuid>(0).to_string(),
        venue_id: row.get(1),
        name: row.get(2),
        status: EventStatus::from(row.get::<_, String>(3).as_str()),
        ticket_price_cents: row.get(4),
        revenue_profile_id: row.get::<_, Uuid>(5).to_string(),
        starts_at: row.get::<_, DateTime<Utc>>(6).timestamp(),
        ends_at: row.get::<_, DateTime<Utc>>(7).timestamp(),
        created_at: row.get::<_, DateTime<Utc>>(8).timestamp(),
    }
}

const EVENT_COLUMNS: &str =
    "id, venue_id, name, status, ticket_price_cents, revenue_profile_id, starts_at, ends_at, created_at";

pub async fn create_event(
    pool: &Pool,
    venue_id: &str,
    name: &str,
    ticket_price_cents: i64,
    revenue_profile_id: Uuid,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> Result<EventRecord> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            &format!(
                "INSERT INTO events
                     (venue_id, name, ticket_price_cents, revenue_profile_id, starts_at, ends_at)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING {EVENT_COLUMNS}"
            ),
            &[
                &venue_id,
                &name,
                &ticket_price_cents,
                &revenue_profile_id,
                &starts_at,
                &ends_at,
            ],
        )
        .await?;
    Ok(event_from_row(&row))
}

pub async fn get_event(pool: &Pool, id: Uuid) -> Result<Option<EventRecord>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"),
            &[&id],
        )
        .await?;
    Ok(row.map(|row| event_from_row(&row)))
}

pub async fn list_events(pool: &Pool, limit: i64) -> Result<Vec<EventRecord>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            &format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY starts_at DESC LIMIT $1"),
            &[&limit],
        )
        .await?;
    Ok(rows.iter().map(event_from_row).collect())
}

pub async fn set_event_status(pool: &Pool, id: Uuid, status: EventStatus) -> Result<bool> {
    let client = pool.get().await?;
    let updated = client
        .execute(
            "UPDATE events SET status = $2 WHERE id = $1",
            &[&id, &status.as_str()],
        )
        .await?;
    Ok(updated > 0)
}

// ============================================================================
// GHOST PASSES
// ============================================================================

fn pass_from_row(row: &Row) -> GhostPass {
    GhostPass {
        id: row.get::<_, Uuid>(0).to_string(),
        wallet_binding_id: row.get(1),
        event_id: row.get::<_, Uuid>(2).to_string(),
        status: PassStatus::from(row.get::<_, String>(3).as_str()),
        valid_from: row.get::<_, DateTime<Utc>>(4).timestamp(),
        valid_until: row.get::<_, DateTime<Utc>>(5).timestamp(),
        allows_reentry: row.get(6),
        entry_count: row.get(7),
        last_entry_at: row
            .get::<_, Option<DateTime<Utc>>>(8)
            .map(|dt| dt.timestamp()),
        last_gateway_id: row.get(9),
        created_at: row.get::<_, DateTime<Utc>>(10).timestamp(),
    }
}

const PASS_COLUMNS: &str = "id, wallet_binding_id, event_id, status, valid_from, valid_until, \
     allows_reentry, entry_count, last_entry_at, last_gateway_id, created_at";

/// What a pass purchase produced.
#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    pub pass: GhostPass,
    pub price_cents: i64,
    pub new_balance_cents: i64,
    pub transaction_id: Uuid,
    pub duplicate: bool,
}

/// Purchases a Ghost Pass: debits the wallet for the ticket price, records
/// the revenue split as fee rows, and creates the pass, all in one SQL
/// transaction. Re-delivery with the same idempotency key returns the
/// original pass without a second charge.
pub async fn purchase_pass(
    pool: &Pool,
    wallet_binding_id: &str,
    event_id: Uuid,
    allows_reentry: bool,
    idempotency_key: Option<&str>,
) -> std::result::Result<PurchaseOutcome, LedgerError> {
    let mut attempt = 0;
    loop {
        match try_purchase_pass(pool, wallet_binding_id, event_id, allows_reentry, idempotency_key)
            .await
        {
            Err(LedgerError::Conflict(reason)) if attempt + 1 < MUTATION_ATTEMPTS => {
                attempt += 1;
                warn!(
                    wallet = wallet_binding_id,
                    attempt, %reason,
                    "pass purchase conflict, retrying"
                );
            }
            other => return other,
        }
    }
}

async fn try_purchase_pass(
    pool: &Pool,
    wallet_binding_id: &str,
    event_id: Uuid,
    allows_reentry: bool,
    idempotency_key: Option<&str>,
) -> std::result::Result<PurchaseOutcome, LedgerError> {
    let mut client = pool.get().await.map_err(storage)?;
    let tx = client.transaction().await.map_err(storage)?;

    if let Some(key) = idempotency_key {
        if let Some((id, balance_after, metadata)) =
            existing_mutation(&tx, key).await.map_err(storage)?
        {
            let pass_id = metadata
                .as_ref()
                .and_then(|m| m.get("pass_id"))
                .and_then(|v| v.as_str())
                .and_then(|s| Uuid::parse_str(s).ok())
                .ok_or_else(|| {
                    LedgerError::Storage(format!(
                        "purchase transaction {id} has no pass reference"
                    ))
                })?;
            let row = tx
                .query_one(
                    &format!("SELECT {PASS_COLUMNS} FROM event_tickets WHERE id = $1"),
                    &[&pass_id],
                )
                .await
                .map_err(storage)?;
            let price_cents = metadata
                .as_ref()
                .and_then(|m| m.get("gross_cents"))
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            return Ok(PurchaseOutcome {
                pass: pass_from_row(&row),
                price_cents,
                new_balance_cents: balance_after,
                transaction_id: id,
                duplicate: true,
            });
        }
    }

    let event_row = tx
        .query_opt(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"),
            &[&event_id],
        )
        .await
        .map_err(storage)?
        .ok_or_else(|| LedgerError::NotFound(format!("event {event_id}")))?;
    let event = event_from_row(&event_row);
    if event.status != EventStatus::Active {
        return Err(LedgerError::Validation(format!(
            "event {event_id} is not active"
        )));
    }

    let profile_id = Uuid::parse_str(&event.revenue_profile_id)
        .map_err(|_| LedgerError::Storage("event has malformed profile id".to_string()))?;
    let profile_row = tx
        .query_opt(
            &format!("SELECT {PROFILE_COLUMNS} FROM revenue_profiles WHERE id = $1"),
            &[&profile_id],
        )
        .await
        .map_err(storage)?
        .ok_or_else(|| LedgerError::NotFound(format!("revenue profile {profile_id}")))?;
    let shares = profile_from_row(&profile_row).shares();

    let pass_id = Uuid::new_v4();
    let metadata = serde_json::json!({
        "pass_id": pass_id.to_string(),
        "event_id": event_id.to_string(),
        "gross_cents": event.ticket_price_cents,
    });

    let (outcome, _split) = spend_with_split(
        &tx,
        wallet_binding_id,
        event.ticket_price_cents,
        TransactionKind::TicketPurchase,
        &shares,
        idempotency_key,
        metadata,
    )
    .await?;

    let pass_row = tx
        .query_one(
            &format!(
                "INSERT INTO event_tickets
                     (id, wallet_binding_id, event_id, valid_from, valid_until, allows_reentry)
                 SELECT $1, $2, id, starts_at, ends_at, $3 FROM events WHERE id = $4
                 RETURNING {PASS_COLUMNS}"
            ),
            &[&pass_id, &wallet_binding_id, &allows_reentry, &event_id],
        )
        .await
        .map_err(storage)?;
    let pass = pass_from_row(&pass_row);

    tx.commit().await.map_err(storage)?;
    Ok(PurchaseOutcome {
        pass,
        price_cents: event.ticket_price_cents,
        new_balance_cents: outcome.new_balance_cents,
        transaction_id: outcome.transaction_id,
        duplicate: false,
    })
}

pub async fn get_pass(pool: &Pool, id: Uuid) -> Result<Option<GhostPass>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!("SELECT {PASS_COLUMNS} FROM event_tickets WHERE id = $1"),
            &[&id],
        )
        .await?;
    Ok(row.map(|row| pass_from_row(&row)))
}

pub async fn list_event_passes(pool: &Pool, event_id: Uuid, limit: i64) -> Result<Vec<GhostPass>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            &format!(
                "SELECT {PASS_COLUMNS} FROM event_tickets
                 WHERE event_id = $1 ORDER BY created_at DESC LIMIT $2"
            ),
            &[&event_id, &limit],
        )
        .await?;
    Ok(rows.iter().map(pass_from_row).collect())
}

pub async fn revoke_pass(pool: &Pool, id: Uuid) -> Result<Option<GhostPass>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!(
                "UPDATE event_tickets SET status = 'revoked'
                 WHERE id = $1 AND status = 'active'
                 RETURNING {PASS_COLUMNS}"
            ),
            &[&id],
        )
        .await?;
    Ok(row.map(|row| pass_from_row(&row)))
}

pub async fn load_pass_and_event(
    pool: &Pool,
    pass_id: Uuid,
) -> Result<Option<(GhostPass, EventRecord)>> {
    let client = pool.get().await?;
    let pass_row = client
        .query_opt(
            &format!("SELECT {PASS_COLUMNS} FROM event_tickets WHERE id = $1"),
            &[&pass_id],
        )
        .await?;
    let Some(pass_row) = pass_row else {
        return Ok(None);
    };
    let pass = pass_from_row(&pass_row);

    let event_id = Uuid::parse_str(&pass.event_id)?;
    let event_row = client
        .query_opt(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"),
            &[&event_id],
        )
        .await?;
    let Some(event_row) = event_row else {
        return Ok(None);
    };
    Ok(Some((pass, event_from_row(&event_row))))
}

/// Grants entry if and only if the pass is still admittable at `now`.
///
/// The admission decision and the `entry_count` increment are one guarded
/// update, so two gateways scanning the same non-reentry pass concurrently
/// produce exactly one grant. Returns the new entry count, or `None` when
/// the guard failed and the caller should re-read the pass for the reason.
pub async fn grant_entry(
    pool: &Pool,
    pass_id: Uuid,
    gateway_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<i32>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            "UPDATE event_tickets
             SET entry_count = entry_count + 1, last_entry_at = $2, last_gateway_id = $3
             WHERE id = $1
               AND status = 'active'
               AND valid_from <= $2 AND valid_until >= $2
               AND (allows_reentry OR entry_count = 0)
             RETURNING entry_count",
            &[&pass_id, &now, &gateway_id],
        )
        .await?;
    Ok(row.map(|row| row.get(0)))
}

pub async fn insert_entry_log(
    pool: &Pool,
    pass_id: Option<Uuid>,
    gateway_id: &str,
    allowed: bool,
    reason: Option<&str>,
) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "INSERT INTO entry_logs (ticket_id, gateway_id, allowed, reason)
             VALUES ($1, $2, $3, $4)",
            &[&pass_id, &gateway_id, &allowed, &reason],
        )
        .await?;
    Ok(())
}

// ============================================================================
// VENDOR SPEND
// ============================================================================

/// Concession purchase: debits the wallet and records the fee split against
/// the event's revenue profile. Idempotent per terminal reference.
pub async fn vendor_spend(
    pool: &Pool,
    wallet_binding_id: &str,
    vendor_id: &str,
    event_id: Uuid,
    amount_cents: i64,
    terminal_ref: Option<&str>,
) -> std::result::Result<MutationOutcome, LedgerError> {
    let mut attempt = 0;
    loop {
        match try_vendor_spend(
            pool,
            wallet_binding_id,
            vendor_id,
            event_id,
            amount_cents,
            terminal_ref,
        )
        .await
        {
            Err(LedgerError::Conflict(reason)) if attempt + 1 < MUTATION_ATTEMPTS => {
                attempt += 1;
                warn!(
                    wallet = wallet_binding_id,
                    attempt, %reason,
                    "vendor spend conflict, retrying"
                );
            }
            other => return other,
        }
    }
}

async fn try_vendor_spend(
    pool: &Pool,
    wallet_binding_id: &str,
    vendor_id: &str,
    event_id: Uuid,
    amount_cents: i64,
    terminal_ref: Option<&str>,
) -> std::result::Result<MutationOutcome, LedgerError> {
    let mut client = pool.get().await.map_err(storage)?;
    let tx = client.transaction().await.map_err(storage)?;

    if let Some(key) = terminal_ref {
        if let Some((id, balance_after, _)) = existing_mutation(&tx, key).await.map_err(storage)? {
            return Ok(MutationOutcome {
                transaction_id: id,
                new_balance_cents: balance_after,
                duplicate: true,
            });
        }
    }

    let event_row = tx
        .query_opt(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"),
            &[&event_id],
        )
        .await
        .map_err(storage)?
        .ok_or_else(|| LedgerError::NotFound(format!("event {event_id}")))?;
    let event = event_from_row(&event_row);
    if event.status != EventStatus::Active {
        return Err(LedgerError::Validation(format!(
            "event {event_id} is not active"
        )));
    }

    let profile_id = Uuid::parse_str(&event.revenue_profile_id)
        .map_err(|_| LedgerError::Storage("event has malformed profile id".to_string()))?;
    let profile_row = tx
        .query_opt(
            &format!("SELECT {PROFILE_COLUMNS} FROM revenue_profiles WHERE id = $1"),
            &[&profile_id],
        )
        .await
        .map_err(storage)?
        .ok_or_else(|| LedgerError::NotFound(format!("revenue profile {profile_id}")))?;
    let shares = profile_from_row(&profile_row).shares();

    let metadata = serde_json::json!({
        "vendor_id": vendor_id,
        "event_id": event_id.to_string(),
        "gross_cents": amount_cents,
    });

    let (outcome, _split) = spend_with_split(
        &tx,
        wallet_binding_id,
        amount_cents,
        TransactionKind::VendorSpend,
        &shares,
        terminal_ref,
        metadata,
    )
    .await?;

    tx.commit().await.map_err(storage)?;
    Ok(outcome)
}

// ============================================================================
// PAYOUTS
// ============================================================================

fn payout_from_row(row: &Row) -> PayoutRequest {
    PayoutRequest {
        id: row.get::<_, Uuid>(0).to_string(),
        vendor_id: row.get(1),
        amount_cents: row.get(2),
        status: PayoutStatus::from(row.get::<_, String>(3).as_str()),
        requested_at: row.get::<_, DateTime<Utc>>(4).timestamp(),
        processed_at: row
            .get::<_, Option<DateTime<Utc>>>(5)
            .map(|dt| dt.timestamp()),
        processed_by: row.get(6),
    }
}

const PAYOUT_COLUMNS: &str =
    "id, vendor_id, amount_cents, status, requested_at, processed_at, processed_by";

pub async fn create_payout(
    pool: &Pool,
    vendor_id: &str,
    amount_cents: i64,
) -> Result<PayoutRequest> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            &format!(
                "INSERT INTO payout_requests (vendor_id, amount_cents)
                 VALUES ($1, $2)
                 RETURNING {PAYOUT_COLUMNS}"
            ),
            &[&vendor_id, &amount_cents],
        )
        .await?;
    Ok(payout_from_row(&row))
}

pub async fn get_payout(pool: &Pool, id: Uuid) -> Result<Option<PayoutRequest>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!("SELECT {PAYOUT_COLUMNS} FROM payout_requests WHERE id = $1"),
            &[&id],
        )
        .await?;
    Ok(row.map(|row| payout_from_row(&row)))
}

pub async fn list_payouts(
    pool: &Pool,
    status: Option<PayoutStatus>,
    limit: i64,
) -> Result<Vec<PayoutRequest>> {
    let client = pool.get().await?;
    let rows = match status {
        Some(status) => {
            client
                .query(
                    &format!(
                        "SELECT {PAYOUT_COLUMNS} FROM payout_requests
                         WHERE status = $1 ORDER BY requested_at DESC LIMIT $2"
                    ),
                    &[&status.as_str(), &limit],
                )
                .await?
        }
        None => {
            client
                .query(
                    &format!(
                        "SELECT {PAYOUT_COLUMNS} FROM payout_requests
                         ORDER BY requested_at DESC LIMIT $1"
                    ),
                    &[&limit],
                )
                .await?
        }
    };
    Ok(rows.iter().map(payout_from_row).collect())
}

/// Moves a pending payout to approved or rejected. The guard on the current
/// status makes the progression one-way; a payout that already left pending
/// returns `None`.
pub async fn review_payout(
    pool: &Pool,
    id: Uuid,
    approve: bool,
    actor: &str,
) -> Result<Option<PayoutRequest>> {
    let next = if approve {
        PayoutStatus::Approved
    } else {
        PayoutStatus::Rejected
    };
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!(
                "UPDATE payout_requests
                 SET status = $2, processed_at = NOW(), processed_by = $3
                 WHERE id = $1 AND status = 'pending'
                 RETURNING {PAYOUT_COLUMNS}"
            ),
            &[&id, &next.as_str(), &actor],
        )
        .await?;
    Ok(row.map(|row| payout_from_row(&row)))
}

/// Marks an approved payout as processed (funds sent).
pub async fn process_payout(pool: &Pool, id: Uuid, actor: &str) -> Result<Option<PayoutRequest>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!(
                "UPDATE payout_requests
                 SET status = 'processed', processed_at = NOW(), processed_by = $2
                 WHERE id = $1 AND status = 'approved'
                 RETURNING {PAYOUT_COLUMNS}"
            ),
            &[&id, &actor],
        )
        .await?;
    Ok(row.map(|row| payout_from_row(&row)))
}

// ============================================================================
// REPORTING
// ============================================================================

/// Aggregates committed fee transactions by share category. Reflects
/// whatever is committed at query time; this is a reporting read, not part
/// of any mutation path.
pub async fn fee_breakdown(pool: &Pool, event_id: Option<Uuid>) -> Result<FeeBreakdown> {
    let client = pool.get().await?;
    let rows = match event_id {
        Some(event_id) => {
            client
                .query(
                    "SELECT share_category, COALESCE(SUM(amount_cents), 0)::BIGINT
                     FROM transactions
                     WHERE kind = 'fee' AND share_category IS NOT NULL
                       AND metadata->>'event_id' = $1
                     GROUP BY share_category",
                    &[&event_id.to_string()],
                )
                .await?
        }
        None => {
            client
                .query(
                    "SELECT share_category, COALESCE(SUM(amount_cents), 0)::BIGINT
                     FROM transactions
                     WHERE kind = 'fee' AND share_category IS NOT NULL
                     GROUP BY share_category",
                    &[],
                )
                .await?
        }
    };

    let mut breakdown = FeeBreakdown::default();
    for row in &rows {
        let cents: i64 = row.get(1);
        match ShareCategory::from(row.get::<_, String>(0).as_str()) {
            ShareCategory::Valid => breakdown.valid_cents = cents,
            ShareCategory::Vendor => breakdown.vendor_cents = cents,
            ShareCategory::Pool => breakdown.pool_cents = cents,
            ShareCategory::Promoter => breakdown.promoter_cents = cents,
            ShareCategory::Executive => breakdown.executive_cents = cents,
        }
        breakdown.total_cents += cents;
    }
    Ok(breakdown)
}

// ============================================================================
// AUDIT LOG
// ============================================================================

pub async fn log_audit(
    pool: &Pool,
    event_type: &str,
    entity_type: Option<&str>,
    entity_id: Option<&str>,
    payload: Option<&serde_json::Value>,
    actor: Option<&str>,
) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "INSERT INTO audit_logs (event_type, entity_type, entity_id, payload, actor)
             VALUES ($1, $2, $3, $4, $5)",
            &[&event_type, &entity_type, &entity_id, &payload, &actor],
        )
        .await?;
    Ok(())
}
