//! Creation of the application's database schema.

use rusqlite::Connection;

use crate::{
    account::create_account_table,
    category::create_category_table,
    currency::create_exchange_rate_table,
    snapshot::create_wealth_snapshot_table,
    transaction::create_transaction_table,
    user::create_user_table,
};

/// Create the application's tables if they do not exist yet.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    let transaction = connection.unchecked_transaction()?;

    create_user_table(&transaction)?;
    create_account_table(&transaction)?;
    create_category_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_wealth_snapshot_table(&transaction)?;
    create_exchange_rate_table(&transaction)?;

    transaction.commit()
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn initialize_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();
        initialize(&connection).unwrap();
    }
}
