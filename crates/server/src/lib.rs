//! Ghost Pass Server - Venue Access and Payments API
//!
//! This is the single source of truth for wallets, passes, and revenue
//! accounting.
//!
//! Architecture:
//! - Wallet ledger: device-bound balances with an append-only transaction log
//! - Revenue accounting: typed share categories, one fee row per allocation
//! - Admission: gateway scans with atomic check-then-increment grants
//! - Payouts: one-way vendor payout lifecycle
//! - WebSocket: real-time events to venue dashboards
//!
//! Key invariants:
//! - Every balance write is a version-guarded compare-and-swap sharing one
//!   SQL transaction with its ledger-row append
//! - Revenue splits sum back to the gross exactly; remainders go to the
//!   profile's residual category
//! - A non-reentry pass admits exactly once, even under concurrent scans
//! - External providers confirm before the ledger moves; credits are keyed
//!   by session id and applied at most once

pub mod api;
pub mod db;
pub mod models;
pub mod observability;
pub mod providers;
pub mod state;
pub mod websocket;

pub use db::DbPool;
pub use observability::{init_sentry, AuditEventType, AuditLogger};
pub use state::AppState;
