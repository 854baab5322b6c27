//! Book endpoints
//!
//! Visibility is server-side: any authenticated user can list and fetch any
//! book, per-owner listings come from the dedicated user-books route, and
//! mutation rights are enforced by the backend.

use serde_json::json;

use rental_auth::{BOOKS_ROUTE, USER_BOOKS_ROUTE};

use crate::api::payload;
use crate::client::ApiClient;
use crate::error::{ApiError, Result};
use crate::types::{Book, BookPatch, NewBook};

/// Every visible book.
pub async fn list(client: &ApiClient) -> Result<Vec<Book>> {
    let value = client.get(BOOKS_ROUTE).await?;
    payload(value, BOOKS_ROUTE)
}

/// Books owned by one user, filtered server-side.
pub async fn owned_by(client: &ApiClient, user_id: &str) -> Result<Vec<Book>> {
    let route = format!("{USER_BOOKS_ROUTE}/{user_id}");
    let value = client.get(&route).await?;
    payload(value, &route)
}

/// One book by id.
pub async fn get(client: &ApiClient, id: &str) -> Result<Book> {
    let route = format!("{BOOKS_ROUTE}/{id}");
    let value = client.get(&route).await?;
    payload(value, &route)
}

/// Add a book; the backend records the caller as owner.
pub async fn create(client: &ApiClient, book: &NewBook) -> Result<Book> {
    let body = serde_json::to_value(book)
        .map_err(|e| ApiError::Transport(format!("encoding book: {e}")))?;
    let value = client.post(BOOKS_ROUTE, body).await?;
    payload(value, BOOKS_ROUTE)
}

/// Update fields on an owned book.
pub async fn update(client: &ApiClient, id: &str, patch: &BookPatch) -> Result<Book> {
    let route = format!("{BOOKS_ROUTE}/{id}");
    let body = serde_json::to_value(patch)
        .map_err(|e| ApiError::Transport(format!("encoding book update: {e}")))?;
    let value = client.put(&route, body).await?;
    payload(value, &route)
}

/// Delete an owned book.
pub async fn remove(client: &ApiClient, id: &str) -> Result<()> {
    let route = format!("{BOOKS_ROUTE}/{id}");
    client.delete(&route).await?;
    Ok(())
}

/// Hand an owned book to another user.
pub async fn transfer(client: &ApiClient, id: &str, to_user_id: &str) -> Result<Book> {
    let route = format!("{BOOKS_ROUTE}/{id}/transfer");
    let value = client
        .post(&route, json!({ "to_user_id": to_user_id }))
        .await?;
    payload(value, &route)
}
