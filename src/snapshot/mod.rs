//! The wealth snapshot ledger: point-in-time net worth records with a
//! per-account breakdown, maintained incrementally as transactions post.

mod core;
mod ledger;
mod list_endpoint;

pub use core::{
    SnapshotId, SnapshotQuery, WealthSnapshot, create_wealth_snapshot_table, insert_snapshot,
    latest_snapshot, list_snapshots, next_snapshot_after,
};
pub use ledger::{AccountDelta, LiquidityEntry, SnapshotState, TransactionEffect};
pub use list_endpoint::list_snapshots_endpoint;
