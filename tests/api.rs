//! End-to-end tests driving the JSON API through the full router,
//! session cookie included.

use axum_test::TestServer;
use rusqlite::Connection;
use serde_json::{Value, json};
use time::macros::date;

use buddyledger::{AppState, build_router, currency::upsert_rate};

fn new_test_server() -> (TestServer, AppState) {
    let state = AppState::new(
        Connection::open_in_memory().expect("Could not open in-memory SQLite database"),
        "42",
    )
    .expect("Could not create app state");

    let mut server = TestServer::new(build_router(state.clone()));
    server.save_cookies();

    (server, state)
}

async fn register_and_log_in(server: &TestServer, email: &str, primary_currency: &str) {
    let response = server
        .post("/api/users")
        .json(&json!({
            "email": email,
            "password": "hunter2",
            "primaryCurrency": primary_currency,
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let response = server
        .post("/api/log_in")
        .json(&json!({ "email": email, "password": "hunter2" }))
        .await;
    response.assert_status_ok();
}

async fn create_account(server: &TestServer, name: &str, currency: &str, balance: f64) -> i64 {
    let response = server
        .post("/api/accounts")
        .json(&json!({ "name": name, "currency": currency, "balance": balance }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()["id"].as_i64().unwrap()
}

async fn create_category(server: &TestServer, name: &str, kind: &str) -> i64 {
    let response = server
        .post("/api/categories")
        .json(&json!({ "name": name, "type": kind }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()["id"].as_i64().unwrap()
}

async fn account_balance(server: &TestServer, id: i64) -> f64 {
    let accounts = server.get("/api/accounts").await.json::<Value>();
    accounts
        .as_array()
        .unwrap()
        .iter()
        .find(|account| account["id"].as_i64() == Some(id))
        .expect("account not in list")["balance"]
        .as_f64()
        .unwrap()
}

#[track_caller]
fn assert_close(got: f64, want: f64) {
    assert!((got - want).abs() < 1e-6, "got {got}, want {want}");
}

#[tokio::test]
async fn posting_transactions_updates_balances_and_snapshots() {
    let (server, state) = new_test_server();
    register_and_log_in(&server, "test@test.com", "USD").await;

    let checking = create_account(&server, "Checking", "USD", 1000.0).await;
    let savings = create_account(&server, "Savings", "EUR", 500.0).await;
    let groceries = create_category(&server, "Groceries", "expense").await;

    // Seed the exchange rate the cross-currency transfer will need.
    {
        let connection = state.db_connection.lock().unwrap();
        upsert_rate("USD", "EUR", date!(2024 - 01 - 01), 0.9, &connection).unwrap();
    }

    // An expense in the primary currency.
    let response = server
        .post("/api/transactions")
        .json(&json!({
            "date": "2024-03-05",
            "description": "Weekly shop",
            "amount": 50,
            "type": "expense",
            "categoryId": groceries,
            "sourceAccountId": checking,
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    assert_close(account_balance(&server, checking).await, 950.0);

    let snapshots = server.get("/api/wealth-snapshots").await.json::<Value>();
    let snapshots = snapshots.as_array().unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_close(snapshots[0]["totalValue"].as_f64().unwrap(), -50.0);

    // A cross-currency transfer. The destination receives 100 * 0.9 EUR and
    // the EUR->USD leg is derived from the inverse pair, so net worth is
    // unchanged.
    let response = server
        .post("/api/transactions")
        .json(&json!({
            "date": "2024-03-10",
            "description": "Savings top-up",
            "amount": 100,
            "type": "transfer",
            "sourceAccountId": checking,
            "destinationAccountId": savings,
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    // Reported in the primary currency: the 90 EUR received are worth the
    // full 100 USD at the inverse rate.
    assert_close(
        response.json::<Value>()["convertedDestinationAmount"]
            .as_f64()
            .unwrap(),
        100.0,
    );

    assert_close(account_balance(&server, checking).await, 850.0);
    assert_close(account_balance(&server, savings).await, 590.0);

    let snapshots = server.get("/api/wealth-snapshots").await.json::<Value>();
    let snapshots = snapshots.as_array().unwrap();
    assert_eq!(snapshots.len(), 2);
    assert_close(snapshots[1]["totalValue"].as_f64().unwrap(), -50.0);
}

#[tokio::test]
async fn back_dated_transactions_leave_later_snapshots_untouched() {
    let (server, _state) = new_test_server();
    register_and_log_in(&server, "test@test.com", "USD").await;

    let checking = create_account(&server, "Checking", "USD", 1000.0).await;
    let groceries = create_category(&server, "Groceries", "expense").await;

    for (day, amount) in [("2024-03-05", 50), ("2024-03-10", 30)] {
        let response = server
            .post("/api/transactions")
            .json(&json!({
                "date": day,
                "description": "Shop",
                "amount": amount,
                "type": "expense",
                "categoryId": groceries,
                "sourceAccountId": checking,
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
    }

    // Earlier than both existing snapshots.
    let response = server
        .post("/api/transactions")
        .json(&json!({
            "date": "2024-03-01",
            "description": "Forgotten receipt",
            "amount": 20,
            "type": "expense",
            "categoryId": groceries,
            "sourceAccountId": checking,
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let snapshots = server.get("/api/wealth-snapshots").await.json::<Value>();
    let snapshots = snapshots.as_array().unwrap();
    assert_eq!(snapshots.len(), 3);

    // The back-dated snapshot reconstructs the state at its date from the
    // next one: -50 with the 20 put back.
    assert!(snapshots[0]["timestamp"].as_str().unwrap().starts_with("2024-03-01"));
    assert_close(snapshots[0]["totalValue"].as_f64().unwrap(), -30.0);

    // Later snapshots keep their values.
    assert_close(snapshots[1]["totalValue"].as_f64().unwrap(), -50.0);
    assert_close(snapshots[2]["totalValue"].as_f64().unwrap(), -80.0);

    // The balance reflects all three expenses.
    assert_close(account_balance(&server, checking).await, 900.0);
}

#[tokio::test]
async fn transactions_are_listed_grouped_by_day() {
    let (server, _state) = new_test_server();
    register_and_log_in(&server, "test@test.com", "USD").await;

    let checking = create_account(&server, "Checking", "USD", 1000.0).await;
    let groceries = create_category(&server, "Groceries", "expense").await;

    for day in ["2024-03-01", "2024-03-01", "2024-03-02", "2024-03-03"] {
        server
            .post("/api/transactions")
            .json(&json!({
                "date": day,
                "description": "Shop",
                "amount": 10,
                "type": "expense",
                "categoryId": groceries,
                "sourceAccountId": checking,
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);
    }

    let body = server
        .get("/api/transactions")
        .add_query_param("daysPerPage", 2)
        .await
        .json::<Value>();

    assert_eq!(body["totalDays"], json!(3));
    assert_eq!(body["totalPages"], json!(2));
    assert_eq!(body["currentPage"], json!(1));
    assert_eq!(body["daysOnThisPage"], json!(2));

    let groups = body["groupedTransactions"].as_array().unwrap();
    assert_eq!(groups[0]["date"], json!("2024-03-03"));
    assert_eq!(groups[1]["date"], json!("2024-03-02"));

    let page_two = server
        .get("/api/transactions")
        .add_query_param("daysPerPage", 2)
        .add_query_param("page", 2)
        .await
        .json::<Value>();
    let groups = page_two["groupedTransactions"].as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["date"], json!("2024-03-01"));
    assert_eq!(groups[0]["transactionList"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn validation_errors_surface_through_the_router() {
    let (server, _state) = new_test_server();
    register_and_log_in(&server, "test@test.com", "USD").await;

    let response = server
        .post("/api/transactions")
        .json(&json!({
            "date": "2024-03-01",
            "description": "No amount to speak of",
            "amount": 0,
            "type": "expense",
            "categoryId": 1,
            "sourceAccountId": 1,
        }))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"],
        json!("Amount must be a positive number")
    );
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let (server, _state) = new_test_server();

    for route in [
        "/api/accounts",
        "/api/categories",
        "/api/transactions",
        "/api/wealth-snapshots",
    ] {
        let response = server.get(route).await;

        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["error"], json!("Unauthorized"));
    }
}

#[tokio::test]
async fn sessions_are_scoped_to_their_user() {
    let (server, _state) = new_test_server();

    register_and_log_in(&server, "first@test.com", "USD").await;
    let first_account = create_account(&server, "Checking", "USD", 1000.0).await;

    // Logging in as a second user replaces the saved session cookie.
    register_and_log_in(&server, "second@test.com", "EUR").await;
    let accounts = server.get("/api/accounts").await.json::<Value>();
    assert!(accounts.as_array().unwrap().is_empty());

    // The second user cannot spend from the first user's account.
    let category = create_category(&server, "Groceries", "expense").await;
    let response = server
        .post("/api/transactions")
        .json(&json!({
            "date": "2024-03-01",
            "description": "Sneaky",
            "amount": 10,
            "type": "expense",
            "categoryId": category,
            "sourceAccountId": first_account,
        }))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"],
        json!("Invalid source account")
    );
}

#[tokio::test]
async fn log_in_rejects_bad_credentials() {
    let (server, _state) = new_test_server();
    register_and_log_in(&server, "test@test.com", "USD").await;

    let response = server
        .post("/api/log_in")
        .json(&json!({ "email": "test@test.com", "password": "wrong" }))
        .await;

    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.json::<Value>()["error"],
        json!("Invalid credentials")
    );
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let (server, _state) = new_test_server();
    register_and_log_in(&server, "test@test.com", "USD").await;

    let response = server
        .post("/api/users")
        .json(&json!({
            "email": "test@test.com",
            "password": "other",
            "primaryCurrency": "EUR",
        }))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"],
        json!("Email already registered")
    );
}

#[tokio::test]
async fn unknown_routes_return_json_not_found() {
    let (server, _state) = new_test_server();

    let response = server.get("/api/nope").await;

    response.assert_status(axum::http::StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], json!("Not found"));
}
