use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::store::atomic_write;

/// Opaque per-installation identifier used as a self-asserted ownership
/// tag. It authenticates nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands out this installation's token, minting and persisting it on
/// first use.
pub struct SessionTokenProvider {
    path: PathBuf,
}

impl SessionTokenProvider {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored token, generating one if the file is missing or
    /// blank.
    pub fn get_or_create_token(&self) -> Result<SessionToken> {
        match fs::read_to_string(&self.path) {
            Ok(stored) if !stored.trim().is_empty() => {
                return Ok(SessionToken(stored.trim().to_string()));
            }
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read {}", self.path.display()));
            }
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let token = Uuid::new_v4().to_string();
        atomic_write(&self.path, token.as_bytes())?;
        tracing::info!(path = %self.path.display(), "created new session token");
        Ok(SessionToken(token))
    }
}
