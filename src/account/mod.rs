//! Accounts: the model, database queries and JSON endpoints.

mod core;
mod endpoints;

pub use core::{
    Account, AccountId, apply_balance_delta, create_account, create_account_table, get_account,
    list_accounts,
};
pub use endpoints::{create_account_endpoint, list_accounts_endpoint};
