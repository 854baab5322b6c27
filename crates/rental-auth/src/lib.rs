//! Session and token management for the book-rental client
//!
//! Owns the client side of the credential lifecycle. This crate is a
//! standalone library with no dependency on the request client or the CLI,
//! so it can be tested and used independently.
//!
//! Credential flow:
//! 1. Login installs a token pair + user summary via `Session::install()`
//! 2. The pair and user are persisted as one document by a `SessionStore`
//! 3. On restart, `Session::restore()` rehydrates from the store
//! 4. A 401 sends the request client through
//!    `Session::refresh_after_unauthorized()` (single-flight)
//! 5. A successful refresh swaps both tokens via `Session::rotate()`
//! 6. Logout or a failed refresh tears everything down via `Session::clear()`

pub mod constants;
pub mod error;
pub mod session;
pub mod store;
pub mod token;

pub use constants::*;
pub use error::{Error, Result};
pub use session::{AuthState, RefreshOutcome, Session, TokenPair, UserSummary};
pub use store::{FileStore, MemoryStore, PersistedSession, SessionStore};
pub use token::refresh;
