//! Ghost Pass wallet-ledger core.
//!
//! Pure accounting and admission logic shared by the server:
//!
//! - [`money`]: integer-cent arithmetic
//! - [`split`]: revenue-split calculator over typed share categories
//! - [`balance`]: wallet balance deltas and transaction kinds
//! - [`admission`]: pass admission predicate and denial reasons
//!
//! Everything in this crate is side-effect free. Persistence, concurrency
//! control, and HTTP mapping live in the server crate; this crate only
//! decides what a correct mutation or admission outcome looks like.
//!
//! Key invariants:
//! - A split of a non-negative gross always sums back to the gross exactly
//! - A balance never goes negative; an over-debit is rejected before any write
//! - Admission denial reasons are ordered and deterministic

pub mod admission;
pub mod balance;
pub mod error;
pub mod money;
pub mod split;

pub use admission::{check_admission, AdmissionDecision, DenialReason, EventView, PassStatus, PassView};
pub use balance::{apply_delta, TransactionKind};
pub use error::{LedgerError, Result};
pub use money::Cents;
pub use split::{compute_split, RevenueShares, ShareCategory, SplitBreakdown};
