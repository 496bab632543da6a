//! The pure arithmetic of the snapshot ledger.
//!
//! A [SnapshotState] is the value part of a wealth snapshot: the net worth
//! total in the user's primary currency plus a per-account breakdown. A
//! [TransactionEffect] is the change one transaction makes to that state.
//! Applying an effect produces a new state; the back-dated branch of posting
//! applies the reversed effect to the nearest later snapshot to reconstruct
//! the state before the transaction.

use serde::{Deserialize, Serialize};

use crate::account::AccountId;

/// One account's contribution to a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityEntry {
    /// The ID of the account.
    pub account_id: AccountId,
    /// The account balance in its own currency at the snapshot instant.
    pub value: f64,
    /// The same balance converted to the user's primary currency.
    pub converted_value: f64,
}

/// The value part of a wealth snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotState {
    /// Net worth in the user's primary currency.
    pub total_value: f64,
    /// The per-account breakdown.
    pub entries: Vec<LiquidityEntry>,
}

/// A signed change to one account: native currency and primary currency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccountDelta {
    /// The account the change applies to.
    pub account_id: AccountId,
    /// The change in the account's own currency.
    pub value: f64,
    /// The change converted to the user's primary currency.
    pub converted_value: f64,
}

/// The change a transaction makes to a snapshot state.
///
/// Income and expenses touch one account; transfers touch two. The total
/// net-worth change is the sum of the per-account converted deltas.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionEffect {
    deltas: Vec<AccountDelta>,
}

impl TransactionEffect {
    /// The effect of an expense of `amount` from `source`.
    ///
    /// `rate_source_to_primary` converts the source account's currency to
    /// the user's primary currency as of the transaction date.
    pub fn expense(source: AccountId, amount: f64, rate_source_to_primary: f64) -> Self {
        Self {
            deltas: vec![AccountDelta {
                account_id: source,
                value: -amount,
                converted_value: -amount * rate_source_to_primary,
            }],
        }
    }

    /// The effect of an income of `amount` into `source`.
    pub fn income(source: AccountId, amount: f64, rate_source_to_primary: f64) -> Self {
        Self {
            deltas: vec![AccountDelta {
                account_id: source,
                value: amount,
                converted_value: amount * rate_source_to_primary,
            }],
        }
    }

    /// The effect of transferring `amount` (in the source currency) from
    /// `source` to `destination`.
    ///
    /// The destination receives `amount × rate_source_to_destination` in its
    /// own currency; that received amount is then converted to the primary
    /// currency with `rate_destination_to_primary`. The net-worth change is
    /// the difference between the two converted legs, which is zero when the
    /// rates are mutually consistent.
    pub fn transfer(
        source: AccountId,
        destination: AccountId,
        amount: f64,
        rate_source_to_primary: f64,
        rate_source_to_destination: f64,
        rate_destination_to_primary: f64,
    ) -> Self {
        let destination_amount = amount * rate_source_to_destination;

        Self {
            deltas: vec![
                AccountDelta {
                    account_id: source,
                    value: -amount,
                    converted_value: -amount * rate_source_to_primary,
                },
                AccountDelta {
                    account_id: destination,
                    value: destination_amount,
                    converted_value: destination_amount * rate_destination_to_primary,
                },
            ],
        }
    }

    /// The inverse effect, used to reconstruct the state before a
    /// back-dated transaction from the nearest later snapshot.
    pub fn reversed(&self) -> Self {
        Self {
            deltas: self
                .deltas
                .iter()
                .map(|delta| AccountDelta {
                    account_id: delta.account_id,
                    value: -delta.value,
                    converted_value: -delta.converted_value,
                })
                .collect(),
        }
    }

    /// The change to the net-worth total, in the primary currency.
    pub fn total_delta(&self) -> f64 {
        self.deltas.iter().map(|delta| delta.converted_value).sum()
    }

    /// The per-account changes.
    pub fn deltas(&self) -> &[AccountDelta] {
        &self.deltas
    }
}

impl SnapshotState {
    /// The state used when a user has no snapshots yet: zero net worth and
    /// no accounts.
    pub fn baseline() -> Self {
        Self {
            total_value: 0.0,
            entries: Vec::new(),
        }
    }

    /// Produce the state after `effect`.
    ///
    /// Accounts already in the breakdown get their values adjusted; accounts
    /// not yet present are appended holding the signed delta alone, which
    /// assumes the account contributed nothing to earlier snapshots.
    pub fn apply(&self, effect: &TransactionEffect) -> SnapshotState {
        let mut entries = self.entries.clone();

        for delta in effect.deltas() {
            match entries
                .iter()
                .position(|entry| entry.account_id == delta.account_id)
            {
                Some(index) => {
                    let entry = &entries[index];
                    entries[index] = LiquidityEntry {
                        account_id: entry.account_id,
                        value: entry.value + delta.value,
                        converted_value: entry.converted_value + delta.converted_value,
                    };
                }
                None => entries.push(LiquidityEntry {
                    account_id: delta.account_id,
                    value: delta.value,
                    converted_value: delta.converted_value,
                }),
            }
        }

        SnapshotState {
            total_value: self.total_value + effect.total_delta(),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LiquidityEntry, SnapshotState, TransactionEffect};

    const CHECKING: i64 = 1;
    const SAVINGS: i64 = 2;

    fn state_with_checking(total: f64, value: f64, converted: f64) -> SnapshotState {
        SnapshotState {
            total_value: total,
            entries: vec![LiquidityEntry {
                account_id: CHECKING,
                value,
                converted_value: converted,
            }],
        }
    }

    fn assert_close(got: f64, want: f64) {
        assert!(
            (got - want).abs() < 1e-9,
            "got {got}, want {want}"
        );
    }

    #[test]
    fn expense_decreases_total_and_account_entry() {
        let state = state_with_checking(1000.0, 1000.0, 1000.0);
        let effect = TransactionEffect::expense(CHECKING, 50.0, 1.0);

        let next = state.apply(&effect);

        assert_close(next.total_value, 950.0);
        assert_close(next.entries[0].value, 950.0);
        assert_close(next.entries[0].converted_value, 950.0);
    }

    #[test]
    fn income_increases_total_and_account_entry() {
        let state = state_with_checking(1000.0, 1000.0, 1000.0);
        let effect = TransactionEffect::income(CHECKING, 200.0, 1.0);

        let next = state.apply(&effect);

        assert_close(next.total_value, 1200.0);
        assert_close(next.entries[0].value, 1200.0);
    }

    #[test]
    fn expense_in_foreign_currency_converts_the_total_change() {
        // Checking holds EUR; primary currency is USD at EUR->USD = 1.1.
        let state = state_with_checking(1100.0, 1000.0, 1100.0);
        let effect = TransactionEffect::expense(CHECKING, 100.0, 1.1);

        let next = state.apply(&effect);

        assert_close(next.total_value, 990.0);
        assert_close(next.entries[0].value, 900.0);
        assert_close(next.entries[0].converted_value, 990.0);
    }

    #[test]
    fn unknown_account_is_appended_with_the_signed_delta() {
        let state = SnapshotState::baseline();
        let effect = TransactionEffect::expense(CHECKING, 50.0, 1.0);

        let next = state.apply(&effect);

        assert_eq!(next.entries.len(), 1);
        assert_close(next.entries[0].value, -50.0);
        assert_close(next.total_value, -50.0);
    }

    #[test]
    fn apply_leaves_the_original_state_untouched() {
        let state = state_with_checking(1000.0, 1000.0, 1000.0);
        let effect = TransactionEffect::expense(CHECKING, 50.0, 1.0);

        let _ = state.apply(&effect);

        assert_close(state.total_value, 1000.0);
        assert_close(state.entries[0].value, 1000.0);
    }

    #[test]
    fn transfer_moves_value_between_entries() {
        // USD checking to EUR savings, primary USD, USD->EUR = 0.9,
        // EUR->USD = 1/0.9.
        let rate_usd_eur = 0.9;
        let rate_eur_usd = 1.0 / rate_usd_eur;
        let state = state_with_checking(1000.0, 1000.0, 1000.0);
        let effect =
            TransactionEffect::transfer(CHECKING, SAVINGS, 100.0, 1.0, rate_usd_eur, rate_eur_usd);

        let next = state.apply(&effect);

        // Consistent rates: net worth is unchanged.
        assert_close(next.total_value, 1000.0);
        assert_close(next.entries[0].value, 900.0);
        assert_close(next.entries[1].value, 90.0);
        assert_close(next.entries[1].converted_value, 100.0);
    }

    #[test]
    fn transfer_total_delta_is_the_difference_of_the_converted_legs() {
        // Skewed rates: the destination leg is worth less in primary terms.
        let effect = TransactionEffect::transfer(CHECKING, SAVINGS, 100.0, 1.0, 0.9, 1.0);

        assert_close(effect.total_delta(), -10.0);
    }

    #[test]
    fn reversed_effect_undoes_the_original() {
        let state = state_with_checking(1000.0, 1000.0, 1000.0);
        let effect = TransactionEffect::transfer(CHECKING, SAVINGS, 100.0, 1.0, 0.9, 1.0 / 0.9);

        let round_trip = state.apply(&effect).apply(&effect.reversed());

        assert_close(round_trip.total_value, state.total_value);
        assert_close(round_trip.entries[0].value, 1000.0);
        assert_close(round_trip.entries[0].converted_value, 1000.0);
        // The savings entry was created by the forward application and nets
        // back to zero.
        assert_close(round_trip.entries[1].value, 0.0);
        assert_close(round_trip.entries[1].converted_value, 0.0);
    }

    #[test]
    fn reversing_an_expense_restores_the_earlier_state() {
        // The state after some later snapshot; undoing a 50 expense should
        // put the 50 back.
        let later = state_with_checking(950.0, 950.0, 950.0);
        let effect = TransactionEffect::expense(CHECKING, 50.0, 1.0);

        let before = later.apply(&effect.reversed());

        assert_close(before.total_value, 1000.0);
        assert_close(before.entries[0].value, 1000.0);
    }
}
