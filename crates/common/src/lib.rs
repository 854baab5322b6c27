//! Shared types for the book-rental workspace

mod secret;
mod error;

pub use secret::Secret;
pub use error::{Error, Result};
