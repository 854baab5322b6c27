//! Login, registration, and logout
//!
//! Login and register are ordinary unauthenticated calls; a successful
//! login installs the session. Logout is deliberately one-way: the server
//! call is best effort, the local teardown is not.

use serde_json::json;
use tracing::{debug, warn};

use rental_auth::{LOGIN_ROUTE, LOGOUT_ROUTE, REGISTER_ROUTE, UserSummary};

use crate::api::payload;
use crate::client::ApiClient;
use crate::error::{ApiError, Result};
use crate::types::LoginData;

/// Create an account. Does not log the new user in.
pub async fn register(
    client: &ApiClient,
    name: &str,
    email: &str,
    password: &str,
) -> Result<UserSummary> {
    let value = client
        .post(
            REGISTER_ROUTE,
            json!({ "name": name, "email": email, "password": password }),
        )
        .await?;
    payload(value, REGISTER_ROUTE)
}

/// Log in and install the session. The token pair and the user summary are
/// persisted together, so a restart comes back authenticated.
pub async fn login(client: &ApiClient, email: &str, password: &str) -> Result<UserSummary> {
    let value = client
        .post(LOGIN_ROUTE, json!({ "email": email, "password": password }))
        .await?;
    let data: LoginData = payload(value, LOGIN_ROUTE)?;
    let (tokens, user) = data.into_parts();
    client
        .session()
        .install(tokens, user.clone())
        .await
        .map_err(|e| ApiError::Transport(format!("persisting session after login: {e}")))?;
    Ok(user)
}

/// End the session.
///
/// The server is told best-effort; local credentials are dropped no matter
/// what, and calling this while already logged out is a no-op.
pub async fn logout(client: &ApiClient) {
    match client.session().refresh_token().await {
        Some(refresh_token) => {
            if let Err(e) = client
                .post(LOGOUT_ROUTE, json!({ "refresh_token": refresh_token }))
                .await
            {
                debug!(error = %e, "server logout failed, clearing locally anyway");
            }
        }
        None => debug!("no stored refresh token, logout is local only"),
    }
    if let Err(e) = client.session().clear().await {
        warn!(error = %e, "failed to clear session storage");
    }
}

/// The signed-in user's cached summary, if any.
pub async fn current_user(client: &ApiClient) -> Option<UserSummary> {
    client.session().user().await
}
