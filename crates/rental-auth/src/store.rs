//! Persistent session storage
//!
//! The session document bundles the token pair and the user summary into one
//! JSON file; the values cannot be persisted separately, so a half-written
//! session cannot exist on disk. All writes use atomic temp-file
//! + rename to prevent corruption on crash. A tokio Mutex serializes
//! concurrent writes from login and request-time refresh.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::session::UserSummary;

/// The stored session document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserSummary,
}

/// Storage seam for the session document.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn SessionStore>`).
pub trait SessionStore: Send + Sync {
    /// Read the stored session, if any.
    fn load(&self)
    -> Pin<Box<dyn Future<Output = Result<Option<PersistedSession>>> + Send + '_>>;

    /// Replace the stored session.
    fn save(
        &self,
        session: PersistedSession,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Remove the stored session. Removing an absent session is not an error.
    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// File-backed session store.
///
/// An unreadable document is treated as logged out rather than an error: a
/// corrupt cache must not lock the user out of the client.
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the session document.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileStore {
    fn load(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PersistedSession>>> + Send + '_>> {
        Box::pin(async move {
            if !self.path.exists() {
                debug!(path = %self.path.display(), "no session file, starting anonymous");
                return Ok(None);
            }
            let contents = tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|e| Error::Io(format!("reading session file: {e}")))?;
            match serde_json::from_str::<PersistedSession>(&contents) {
                Ok(doc) => {
                    info!(path = %self.path.display(), user_id = %doc.user.id, "restored session");
                    Ok(Some(doc))
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "session file unreadable, treating as logged out");
                    Ok(None)
                }
            }
        })
    }

    fn save(
        &self,
        session: PersistedSession,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let _guard = self.write_lock.lock().await;
            write_atomic(&self.path, &session).await
        })
    }

    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let _guard = self.write_lock.lock().await;
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => {
                    debug!(path = %self.path.display(), "removed session file");
                    Ok(())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(Error::Io(format!("removing session file: {e}"))),
            }
        })
    }
}

/// In-memory session store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<Option<PersistedSession>>,
}

impl SessionStore for MemoryStore {
    fn load(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PersistedSession>>> + Send + '_>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state.clone())
        })
    }

    fn save(
        &self,
        session: PersistedSession,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            *state = Some(session);
            Ok(())
        })
    }

    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            *state = None;
            Ok(())
        })
    }
}

/// Write the session document to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. This prevents corruption if the process crashes mid-write.
/// Sets file permissions to 0600 (owner read/write only) since the file
/// contains live tokens.
async fn write_atomic(path: &Path, session: &PersistedSession) -> Result<()> {
    let json = serde_json::to_string_pretty(session)
        .map_err(|e| Error::Parse(format!("serializing session: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("session path has no parent directory".into()))?;
    if !dir.as_os_str().is_empty() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::Io(format!("creating session directory: {e}")))?;
    }

    let tmp_path = dir.join(format!(".session.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp session file: {e}")))?;

    // Set 0600 permissions (unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting session file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp session file: {e}")))?;

    debug!(path = %path.display(), "persisted session");
    Ok(())
}
