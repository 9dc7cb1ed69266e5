//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods.
//! Ledger queries take `&mut PgConnection` so they can run inside the
//! orchestration transaction; lock queries take `&PgPool` and manage their
//! own short transactions.

pub mod ledger_repo;
pub mod lock_repo;

pub use ledger_repo::LedgerRepo;
pub use lock_repo::LockRepo;
