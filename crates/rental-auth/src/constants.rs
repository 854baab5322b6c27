//! Backend route constants
//!
//! The backend exposes everything under a versioned base path. Routes here
//! are relative to that base; the configured base URL (default below) is
//! prepended at request time. None of these values are secrets; the actual
//! secrets (access/refresh tokens) live in the session store.

/// Default backend base URL, overridable via configuration
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api/v1";

/// Account creation
pub const REGISTER_ROUTE: &str = "/register";

/// Password login; returns a token pair plus the user summary
pub const LOGIN_ROUTE: &str = "/login";

/// Server-side session teardown (best effort from the client's view)
pub const LOGOUT_ROUTE: &str = "/logout";

/// Dedicated refresh endpoint; accepts the refresh token, returns a fresh pair
pub const REFRESH_ROUTE: &str = "/refresh-token";

/// User records (admin surface for list/delete)
pub const USERS_ROUTE: &str = "/users";

/// Book records
pub const BOOKS_ROUTE: &str = "/books";

/// Per-owner book listing, filtered server-side
pub const USER_BOOKS_ROUTE: &str = "/user-books";

/// Default file name for the persisted session document
pub const DEFAULT_SESSION_FILE: &str = "session.json";
