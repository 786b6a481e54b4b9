//! Per-guestbook settings loaded from `.guestbook/config.toml`.
//!
//! The file is optional and every field has a default, so an empty or
//! missing file yields [`Config::default`].

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use jiff::tz::TimeZone;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::store::atomic_write;

pub const CONFIG_FILE: &str = "config.toml";

/// Which persistence backend the service runs on.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    AsRefStr,
    EnumString,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Backend {
    /// A single JSON array file.
    #[default]
    File,
    /// A document-per-comment collection with a change feed.
    Realtime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    /// JSON file used by the file backend, relative to the guestbook dir.
    pub comments_file: PathBuf,
    /// Directory used by the realtime backend, relative to the guestbook dir.
    pub collection_dir: PathBuf,
    /// Where the session token lives. Defaults to the user data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_file: Option<PathBuf>,
    /// IANA zone for display stamps. Defaults to the system zone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::File,
            comments_file: PathBuf::from("comments.json"),
            collection_dir: PathBuf::from("comments"),
            session_file: None,
            time_zone: None,
        }
    }
}

impl Config {
    /// Load `config.toml` from `dir`, falling back to defaults when absent.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn write(&self, dir: &Path) -> Result<()> {
        let content = toml::to_string(self).context("Failed to serialize config")?;
        atomic_write(&dir.join(CONFIG_FILE), content.as_bytes())
    }

    pub fn comments_path(&self, base: &Path) -> PathBuf {
        base.join(&self.comments_file)
    }

    pub fn collection_path(&self, base: &Path) -> PathBuf {
        base.join(&self.collection_dir)
    }

    /// The session token file: the configured one, or
    /// `<data_local_dir>/guestbook/session`.
    pub fn session_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.session_file {
            return Ok(path.clone());
        }
        dirs::data_local_dir()
            .map(|d| d.join("guestbook").join("session"))
            .ok_or_else(|| anyhow!("Could not determine a data directory for the session token"))
    }

    pub fn time_zone(&self) -> Result<TimeZone> {
        match &self.time_zone {
            Some(name) if name.eq_ignore_ascii_case("utc") => Ok(TimeZone::UTC),
            Some(name) => {
                TimeZone::get(name).with_context(|| format!("Unknown time zone: {name}"))
            }
            None => Ok(TimeZone::system()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;
    use tempfile::TempDir;

    #[rstest]
    fn load_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), Config::default());
    }

    // Only the keys present override defaults.
    #[rstest]
    fn load_partial_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "backend = \"realtime\"\ntime_zone = \"UTC\"\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.backend, Backend::Realtime);
        assert_eq!(config.comments_file, PathBuf::from("comments.json"));
        assert_eq!(config.time_zone.as_deref(), Some("UTC"));
    }

    #[rstest]
    fn load_rejects_unknown_backend() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "backend = \"firebase\"\n").unwrap();
        assert!(Config::load(dir.path()).is_err());
    }

    #[rstest]
    fn write_then_load() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            backend: Backend::Realtime,
            session_file: Some(dir.path().join("session")),
            ..Config::default()
        };
        config.write(dir.path()).unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), config);
    }

    #[rstest]
    fn paths_resolve_against_base() {
        let config = Config::default();
        let base = Path::new("/srv/party/.guestbook");
        assert_eq!(
            config.comments_path(base),
            PathBuf::from("/srv/party/.guestbook/comments.json")
        );
        assert_eq!(
            config.collection_path(base),
            PathBuf::from("/srv/party/.guestbook/comments")
        );
    }

    #[rstest]
    fn explicit_session_file_wins() {
        let config = Config {
            session_file: Some(PathBuf::from("/tmp/tok")),
            ..Config::default()
        };
        assert_eq!(config.session_path().unwrap(), PathBuf::from("/tmp/tok"));
    }

    #[rstest]
    #[case::utc(Some("UTC"), true)]
    #[case::bogus(Some("Mars/Olympus_Mons"), false)]
    #[case::system(None, true)]
    fn time_zone_resolution(#[case] name: Option<&str>, #[case] ok: bool) {
        let config = Config {
            time_zone: name.map(str::to_string),
            ..Config::default()
        };
        assert_eq!(config.time_zone().is_ok(), ok);
    }

    #[rstest]
    #[case::file("file", Backend::File)]
    #[case::realtime("realtime", Backend::Realtime)]
    fn backend_from_str(#[case] raw: &str, #[case] expected: Backend) {
        assert_eq!(Backend::from_str(raw).unwrap(), expected);
        assert_eq!(expected.as_ref(), raw);
    }
}
