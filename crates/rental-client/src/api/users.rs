//! User endpoints (profile and admin surface)

use rental_auth::USERS_ROUTE;

use crate::api::payload;
use crate::client::ApiClient;
use crate::error::{ApiError, Result};
use crate::types::{User, UserPatch};

/// All accounts (admin).
pub async fn list(client: &ApiClient) -> Result<Vec<User>> {
    let value = client.get(USERS_ROUTE).await?;
    payload(value, USERS_ROUTE)
}

/// One account by id.
pub async fn get(client: &ApiClient, id: &str) -> Result<User> {
    let route = format!("{USERS_ROUTE}/{id}");
    let value = client.get(&route).await?;
    payload(value, &route)
}

/// Update profile fields; absent fields stay unchanged.
pub async fn update(client: &ApiClient, id: &str, patch: &UserPatch) -> Result<User> {
    let route = format!("{USERS_ROUTE}/{id}");
    let body = serde_json::to_value(patch)
        .map_err(|e| ApiError::Transport(format!("encoding profile update: {e}")))?;
    let value = client.put(&route, body).await?;
    payload(value, &route)
}

/// Delete an account (admin).
pub async fn remove(client: &ApiClient, id: &str) -> Result<()> {
    let route = format!("{USERS_ROUTE}/{id}");
    client.delete(&route).await?;
    Ok(())
}
