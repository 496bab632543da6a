//! Cookie based authentication: the log-in endpoint and the request context
//! extractor.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts, State},
    http::request::Parts,
    response::IntoResponse,
};
use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, Key, SameSite},
};
use serde::Deserialize;

use crate::{
    AppState, Error,
    user::{UserId, UserResponse, get_user_by_email, get_user_by_id},
};

/// The name of the private cookie holding the logged-in user's ID.
pub const SESSION_COOKIE: &str = "buddyledger_session";

/// The request body for logging in.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// The email address the user registered with.
    pub email: String,
    /// The plain-text password.
    pub password: String,
}

/// A route handler that verifies credentials and sets the session cookie.
pub async fn log_in_endpoint(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(credentials): Json<Credentials>,
) -> Result<impl IntoResponse, Error> {
    let user = {
        let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

        get_user_by_email(credentials.email.trim(), &connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidCredentials,
            error => error,
        })?
    };

    let password_matches = bcrypt::verify(&credentials.password, &user.password_hash)
        .map_err(|error| Error::HashingError(error.to_string()))?;

    if !password_matches {
        return Err(Error::InvalidCredentials);
    }

    let cookie = Cookie::build((SESSION_COOKIE, user.id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build();

    Ok((jar.add(cookie), Json(UserResponse::from(user))))
}

/// The authenticated caller of a request.
///
/// Handlers take this as an argument instead of reading ambient session
/// state; everything the posting logic needs to know about the user travels
/// in this struct.
#[derive(Debug, Clone, PartialEq)]
pub struct UserContext {
    /// The ID of the logged-in user.
    pub user_id: UserId,
    /// The currency in which the user's net worth is reported.
    pub primary_currency: String,
}

impl FromRequestParts<AppState> for UserContext {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // The key type must be spelled out: both AppState and Key satisfy
        // the jar's FromRef bound.
        let jar = PrivateCookieJar::<Key>::from_request_parts(parts, state)
            .await
            .map_err(|_| Error::Unauthorized)?;

        let cookie = jar.get(SESSION_COOKIE).ok_or(Error::Unauthorized)?;
        let user_id: UserId = cookie.value().parse().map_err(|_| Error::Unauthorized)?;

        let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
        let user = get_user_by_id(user_id, &connection).map_err(|_| Error::Unauthorized)?;

        Ok(UserContext {
            user_id,
            primary_currency: user.primary_currency,
        })
    }
}

// The jar needs the cookie key from the app state.
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
