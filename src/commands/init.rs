use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::GUESTBOOK_DIR;
use crate::config::{Backend, Config};
use crate::store::open_store;

/// Creates `.guestbook/` with a default config and an empty store.
pub fn run(backend: Option<Backend>) -> Result<()> {
    let guestbook_dir = PathBuf::from(GUESTBOOK_DIR);

    if guestbook_dir.exists() {
        println!("Guestbook already initialized in {}", guestbook_dir.display());
        return Ok(());
    }

    fs::create_dir_all(&guestbook_dir).context("Failed to create .guestbook directory")?;

    let config = Config {
        backend: backend.unwrap_or_default(),
        ..Config::default()
    };
    config.write(&guestbook_dir)?;
    open_store(&config, &guestbook_dir)?;

    println!(
        "Initialized guestbook in {} (backend: {})",
        guestbook_dir.display(),
        config.backend.as_ref()
    );
    Ok(())
}
