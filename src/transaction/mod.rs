//! Transactions: the model, database queries, the posting routine that keeps
//! balances and snapshots consistent, and the JSON endpoints.

mod core;
mod create_endpoint;
mod list_endpoint;
mod posting;

pub use core::{
    NewTransaction, Transaction, TransactionFilter, TransactionId, TransactionKind,
    create_transaction_table, insert_transaction, list_transactions,
};
pub use create_endpoint::create_transaction_endpoint;
pub use list_endpoint::list_transactions_endpoint;
pub use posting::{PostingInput, PostingRates, post_transaction};
