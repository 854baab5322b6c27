//! Authenticated request client for the book-rental backend
//!
//! One logical `request()` hides the whole credential dance from callers:
//! bearer injection, 401 detection, a single transparent refresh through the
//! session's single-flight gate, and one retry with the fresh token. On top
//! of that sits a typed surface for every backend endpoint (auth, books,
//! users), which passes payloads through without business rules.
//!
//! The session and its storage live in `rental-auth`; this crate decides
//! when to refresh, the session decides how.

pub mod api;
pub mod client;
pub mod error;
pub mod types;

#[cfg(test)]
pub mod testutil;

pub use client::{ApiClient, DEFAULT_TIMEOUT, RequestOptions};
pub use error::{ApiError, Result};
pub use types::{Book, BookPatch, LoginData, NewBook, User, UserPatch};
