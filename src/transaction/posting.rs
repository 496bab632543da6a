//! Posting: the routine that writes a transaction and keeps account
//! balances and the snapshot ledger consistent with it.
//!
//! Exchange rates are resolved up front, before the SQLite transaction is
//! opened, so no network or rate lookup happens while the database is held.
//! Everything after that point commits or rolls back as one unit: the
//! transaction row, the balance updates and the new snapshot.

use rusqlite::Connection;
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    account::{Account, apply_balance_delta},
    auth::UserContext,
    category::CategoryId,
    currency::RateCache,
    snapshot::{SnapshotState, TransactionEffect, insert_snapshot, latest_snapshot, next_snapshot_after},
};

use super::core::{NewTransaction, Transaction, TransactionKind, insert_transaction};

/// The exchange rates a posting needs, resolved for the transaction date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostingRates {
    /// Source account currency to the user's primary currency.
    pub source_to_primary: f64,
    /// Source to destination account currency. Present for transfers.
    pub source_to_destination: Option<f64>,
    /// Destination account currency to the primary currency. Present for
    /// transfers.
    pub destination_to_primary: Option<f64>,
}

impl PostingRates {
    /// Resolve every rate `post_transaction` will need.
    ///
    /// # Errors
    /// Returns [Error::MissingCurrency] if an involved account has a blank
    /// currency code, or the rate source's error if a rate cannot be found.
    pub async fn resolve(
        cache: &mut RateCache,
        kind: TransactionKind,
        source: &Account,
        destination: Option<&Account>,
        primary_currency: &str,
        on: Date,
    ) -> Result<Self, Error> {
        let source_to_primary = cache.rate_for_account(source, primary_currency, on).await?;

        if kind != TransactionKind::Transfer {
            return Ok(Self {
                source_to_primary,
                source_to_destination: None,
                destination_to_primary: None,
            });
        }

        let destination = destination.ok_or(Error::MissingDestinationAccount)?;
        let source_to_destination = cache
            .rate_for_account(source, &destination.currency, on)
            .await?;
        let destination_to_primary = cache
            .rate_for_account(destination, primary_currency, on)
            .await?;

        Ok(Self {
            source_to_primary,
            source_to_destination: Some(source_to_destination),
            destination_to_primary: Some(destination_to_primary),
        })
    }
}

/// A validated transaction ready to be posted.
///
/// The accounts have already been loaded and ownership-checked; the amount
/// is positive and the category (if any) matches the kind.
#[derive(Debug, Clone, PartialEq)]
pub struct PostingInput {
    /// When the transaction happened.
    pub date: OffsetDateTime,
    /// A text description of the transaction.
    pub description: String,
    /// The amount in the source account's currency.
    pub amount: f64,
    /// The kind of transaction.
    pub kind: TransactionKind,
    /// The category, for income and expenses.
    pub category_id: Option<CategoryId>,
    /// The account the money leaves (or arrives in, for income).
    pub source: Account,
    /// The receiving account, for transfers.
    pub destination: Option<Account>,
}

fn effect_of(input: &PostingInput, rates: &PostingRates) -> Result<TransactionEffect, Error> {
    match input.kind {
        TransactionKind::Expense => Ok(TransactionEffect::expense(
            input.source.id,
            input.amount,
            rates.source_to_primary,
        )),
        TransactionKind::Income => Ok(TransactionEffect::income(
            input.source.id,
            input.amount,
            rates.source_to_primary,
        )),
        TransactionKind::Transfer => {
            let destination = input
                .destination
                .as_ref()
                .ok_or(Error::MissingDestinationAccount)?;
            let source_to_destination = rates
                .source_to_destination
                .ok_or(Error::MissingDestinationAccount)?;
            let destination_to_primary = rates
                .destination_to_primary
                .ok_or(Error::MissingDestinationAccount)?;

            Ok(TransactionEffect::transfer(
                input.source.id,
                destination.id,
                input.amount,
                rates.source_to_primary,
                source_to_destination,
                destination_to_primary,
            ))
        }
    }
}

/// Post a transaction: insert the row, adjust balances and record a wealth
/// snapshot dated at the transaction, all atomically.
///
/// Transactions at or after the latest snapshot extend the ledger forward
/// from that snapshot (or from an empty baseline for a first transaction).
/// Back-dated transactions reconstruct the state at their date by reversing
/// their own effect out of the earliest later snapshot.
///
/// # Errors
/// Returns [Error::MissingNextSnapshot] if a back-dated transaction finds no
/// later snapshot to reconstruct from. Nothing is written in that case.
pub fn post_transaction(
    ctx: &UserContext,
    input: &PostingInput,
    rates: &PostingRates,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let effect = effect_of(input, rates)?;
    let date = input.date.to_offset(time::UtcOffset::UTC);

    let sql_transaction = connection.unchecked_transaction()?;

    // What the destination receives, in its own currency. The persisted
    // converted amount is that value expressed in the primary currency,
    // like converted_source_amount.
    let destination_amount = rates
        .source_to_destination
        .map(|rate| input.amount * rate);
    let converted_destination_amount = destination_amount
        .zip(rates.destination_to_primary)
        .map(|(received, rate)| received * rate);

    let transaction = insert_transaction(
        ctx.user_id,
        &NewTransaction {
            date,
            description: input.description.clone(),
            amount: input.amount,
            kind: input.kind,
            converted_source_amount: input.amount * rates.source_to_primary,
            converted_destination_amount,
            category_id: input.category_id,
            source_account_id: input.source.id,
            destination_account_id: input.destination.as_ref().map(|account| account.id),
        },
        &sql_transaction,
    )?;

    match input.kind {
        TransactionKind::Expense => {
            apply_balance_delta(input.source.id, -input.amount, &sql_transaction)?;
        }
        TransactionKind::Income => {
            apply_balance_delta(input.source.id, input.amount, &sql_transaction)?;
        }
        TransactionKind::Transfer => {
            let destination = input
                .destination
                .as_ref()
                .ok_or(Error::MissingDestinationAccount)?;
            let received = destination_amount.ok_or(Error::MissingDestinationAccount)?;

            apply_balance_delta(input.source.id, -input.amount, &sql_transaction)?;
            apply_balance_delta(destination.id, received, &sql_transaction)?;
        }
    }

    let latest = latest_snapshot(ctx.user_id, &sql_transaction)?;
    let snapshot_state = match latest {
        Some(last) if date < last.timestamp => {
            // Back-dated: rebuild the state at the transaction date from the
            // earliest snapshot that comes after it.
            let next = next_snapshot_after(ctx.user_id, date, &sql_transaction)?
                .ok_or(Error::MissingNextSnapshot)?;
            next.state().apply(&effect.reversed())
        }
        Some(last) => last.state().apply(&effect),
        None => SnapshotState::baseline().apply(&effect),
    };
    insert_snapshot(ctx.user_id, date, &snapshot_state, &sql_transaction)?;

    sql_transaction.commit()?;

    Ok(transaction)
}
