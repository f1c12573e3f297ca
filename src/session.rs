use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::warn;

use crate::backend::Session;
use crate::error::{Error, Result};

/// Holds the signed-in session in memory and persists it as TOML so later
/// invocations stay signed in.
pub struct SessionStore {
    path: Option<PathBuf>,
    current: Mutex<Option<Session>>,
}

impl SessionStore {
    /// File-backed store; loads whatever session the file holds.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = load(&path);
        Self {
            path: Some(path),
            current: Mutex::new(current),
        }
    }

    /// Store that never touches disk.
    pub fn in_memory(session: Option<Session>) -> Self {
        Self {
            path: None,
            current: Mutex::new(session),
        }
    }

    pub fn get(&self) -> Option<Session> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.get().map(|s| s.access_token)
    }

    pub fn set(&self, session: Session) -> Result<()> {
        if let Some(ref path) = self.path {
            save(path, &session)?;
        }
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(session);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = None;
        if let Some(ref path) = self.path
            && path.exists()
        {
            std::fs::remove_file(path)
                .map_err(|e| Error::Session(format!("failed to remove session file: {e}")))?;
        }
        Ok(())
    }
}

/// Load a session from disk. Missing or corrupted files mean "signed out".
fn load(path: &Path) -> Option<Session> {
    if !path.exists() {
        return None;
    }
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str::<Session>(&content) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("corrupted session file {}: {e}, ignoring", path.display());
                None
            }
        },
        Err(e) => {
            warn!("failed to read session file {}: {e}, ignoring", path.display());
            None
        }
    }
}

fn save(path: &Path, session: &Session) -> Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::Session(format!("failed to create session dir: {e}")))?;
    }
    let content = toml::to_string_pretty(session)
        .map_err(|e| Error::Session(format!("failed to serialize session: {e}")))?;
    std::fs::write(path, content)
        .map_err(|e| Error::Session(format!("failed to write session file: {e}")))?;
    Ok(())
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
