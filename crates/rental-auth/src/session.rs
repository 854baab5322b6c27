//! Session state and the single-flight refresh path
//!
//! The `Session` owns the credential pair and the signed-in user's summary as
//! a single unit: both present (authenticated) or both absent (anonymous).
//! Partial states cannot be represented. Each transition (install, rotate,
//! clear) is mirrored to the injected [`SessionStore`] and published on a
//! watch channel so a front end can react to session end without polling.
//!
//! Refresh is single-flight: concurrent requests that were all rejected with
//! 401 queue on one gate, the first performs the wire refresh, and the rest
//! observe its outcome instead of spending their own refresh tokens.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::store::{PersistedSession, SessionStore};
use crate::token;

/// Access and refresh credentials.
///
/// Always created and replaced as a unit: a refresh response issues a fresh
/// pair, and the old refresh token is not reusable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPair {
    /// Bearer token attached to each authenticated request
    pub access_token: String,
    /// Longer-lived token exchanged for a new pair when access expires
    pub refresh_token: String,
}

/// The signed-in user's identity as returned by login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Present for privileged accounts ("admin")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Session view published on the watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Authenticated { user_id: String },
    Anonymous,
}

/// Outcome of [`Session::refresh_after_unauthorized`].
#[derive(Debug)]
pub enum RefreshOutcome {
    /// A usable access token is available, refreshed here or by a caller
    /// that got through the gate first. Retry the original request with it.
    Rotated(String),
    /// The refresh failed (here or in a concurrent caller) and the
    /// credentials are gone.
    SessionEnded,
}

struct Authenticated {
    tokens: TokenPair,
    user: UserSummary,
}

/// Single-owner session state, shared by reference with the request client.
pub struct Session {
    store: Arc<dyn SessionStore>,
    state: Mutex<Option<Authenticated>>,
    // Held across the whole wire refresh; concurrent 401 handlers queue here.
    refresh_gate: Mutex<()>,
    state_tx: watch::Sender<AuthState>,
}

impl Session {
    /// Restore the session from the store.
    ///
    /// A missing or unreadable document yields a clean anonymous session;
    /// storage I/O failures propagate.
    pub async fn restore(store: Arc<dyn SessionStore>) -> Result<Self> {
        let state = store.load().await?.map(|doc| Authenticated {
            tokens: TokenPair {
                access_token: doc.access_token,
                refresh_token: doc.refresh_token,
            },
            user: doc.user,
        });
        let initial = match &state {
            Some(auth) => AuthState::Authenticated {
                user_id: auth.user.id.clone(),
            },
            None => AuthState::Anonymous,
        };
        let (state_tx, _) = watch::channel(initial);
        Ok(Self {
            store,
            state: Mutex::new(state),
            refresh_gate: Mutex::new(()),
            state_tx,
        })
    }

    /// Current access token, if authenticated.
    pub async fn access_token(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.as_ref().map(|auth| auth.tokens.access_token.clone())
    }

    /// Current refresh token, if authenticated.
    pub async fn refresh_token(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.as_ref().map(|auth| auth.tokens.refresh_token.clone())
    }

    /// The signed-in user's summary, if authenticated.
    pub async fn user(&self) -> Option<UserSummary> {
        let state = self.state.lock().await;
        state.as_ref().map(|auth| auth.user.clone())
    }

    /// Whether a credential pair is currently held.
    pub async fn is_authenticated(&self) -> bool {
        let state = self.state.lock().await;
        state.is_some()
    }

    /// Subscribe to session transitions (login, rotation is silent, logout).
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    /// Snapshot of the published session view.
    pub fn state(&self) -> AuthState {
        self.state_tx.borrow().clone()
    }

    /// Install a fresh pair and user after a successful login, and persist.
    pub async fn install(&self, tokens: TokenPair, user: UserSummary) -> Result<()> {
        let mut state = self.state.lock().await;
        let user_id = user.id.clone();
        *state = Some(Authenticated {
            tokens: tokens.clone(),
            user: user.clone(),
        });
        self.store
            .save(PersistedSession {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
                user,
            })
            .await?;
        info!(user_id = %user_id, "session installed");
        self.state_tx
            .send_replace(AuthState::Authenticated { user_id });
        Ok(())
    }

    /// Replace both tokens after a successful refresh, keeping the user.
    ///
    /// The store is updated with the fresh pair; if persistence fails the
    /// in-memory pair stays live and the failure is logged, so the running
    /// process keeps working until restart.
    pub async fn rotate(&self, tokens: TokenPair) -> Result<()> {
        let mut state = self.state.lock().await;
        let auth = state.as_mut().ok_or(Error::Anonymous)?;
        auth.tokens = tokens;
        debug!(user_id = %auth.user.id, "rotated token pair");
        let doc = PersistedSession {
            access_token: auth.tokens.access_token.clone(),
            refresh_token: auth.tokens.refresh_token.clone(),
            user: auth.user.clone(),
        };
        if let Err(e) = self.store.save(doc).await {
            warn!(error = %e, "failed to persist rotated tokens");
        }
        Ok(())
    }

    /// Drop the credentials and remove the stored document.
    ///
    /// Safe to call when already anonymous.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        *state = None;
        self.store.clear().await?;
        self.state_tx.send_replace(AuthState::Anonymous);
        info!("session cleared");
        Ok(())
    }

    /// Single-flight refresh after a request came back 401.
    ///
    /// `stale_token` is the access token the rejected request carried. The
    /// first caller through the gate performs the wire refresh; callers that
    /// queued behind it observe the updated session instead of refreshing
    /// again, so one rejected batch spends one refresh token.
    pub async fn refresh_after_unauthorized(
        &self,
        http: &reqwest::Client,
        base_url: &str,
        stale_token: &str,
    ) -> RefreshOutcome {
        let _flight = self.refresh_gate.lock().await;

        // Re-read under the gate: a concurrent caller may have rotated the
        // pair or torn the session down while we waited.
        let current = {
            let state = self.state.lock().await;
            state.as_ref().map(|auth| auth.tokens.clone())
        };
        let tokens = match current {
            None => return RefreshOutcome::SessionEnded,
            Some(pair) if pair.access_token != stale_token => {
                debug!("token already rotated by a concurrent caller");
                return RefreshOutcome::Rotated(pair.access_token);
            }
            Some(pair) => pair,
        };

        match token::refresh(http, base_url, &tokens.refresh_token).await {
            Ok(pair) => {
                let fresh = pair.access_token.clone();
                match self.rotate(pair).await {
                    Ok(()) => RefreshOutcome::Rotated(fresh),
                    Err(e) => {
                        // Session was torn down between the wire call and
                        // the swap (e.g. a concurrent logout).
                        warn!(error = %e, "refresh completed but session was gone");
                        RefreshOutcome::SessionEnded
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, ending session");
                if let Err(clear_err) = self.clear().await {
                    warn!(error = %clear_err, "failed to clear session storage");
                }
                RefreshOutcome::SessionEnded
            }
        }
    }
}
