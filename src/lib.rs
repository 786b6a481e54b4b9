#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod guard;
pub mod id;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod output;
pub mod projection;
pub mod service;
pub mod store;
pub mod timefmt;
pub mod token;

use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;
use std::time::Duration;

use cli::{Cli, Commands};
use config::Config;
use error::ServiceError;
use output::Output;
use service::CommentService;
use store::open_store;
use token::SessionTokenProvider;

pub const GUESTBOOK_DIR: &str = ".guestbook";

/// Finds the `.guestbook/` directory by walking up from the current directory.
/// Returns `None` if no `.guestbook/` directory is found.
pub fn find_guestbook_dir() -> Option<PathBuf> {
    let current_dir = std::env::current_dir().ok()?;
    let mut dir = current_dir.as_path();

    loop {
        let guestbook_path = dir.join(GUESTBOOK_DIR);
        if guestbook_path.is_dir() {
            return Some(guestbook_path);
        }

        dir = dir.parent()?;
    }
}

/// The guestbook in use and its effective configuration.
struct Workspace {
    dir: PathBuf,
    config: Config,
}

fn ensure_initialized(cli: &Cli) -> Result<Workspace> {
    let dir = find_guestbook_dir()
        .ok_or_else(|| anyhow!("Guestbook not initialized. Run 'gb init' first."))?;

    let mut config = Config::load(&dir)?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(session_file) = &cli.session_file {
        config.session_file = Some(session_file.clone());
    }

    Ok(Workspace { dir, config })
}

fn open_service(ws: &Workspace) -> Result<CommentService> {
    let store = open_store(&ws.config, &ws.dir).context("Failed to open comment store")?;
    Ok(CommentService::new(store, ws.config.time_zone()?))
}

/// The caller's session token: `--token` if given, otherwise this
/// installation's stored token.
fn session_token(cli: &Cli, config: &Config) -> Result<String> {
    if let Some(token) = &cli.token {
        return Ok(token.clone());
    }
    let provider = SessionTokenProvider::new(config.session_path()?);
    Ok(provider.get_or_create_token()?.as_str().to_owned())
}

pub fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Init => commands::init::run(cli.backend),
        Commands::List { json } => {
            let ws = ensure_initialized(&cli)?;
            let service = open_service(&ws)?;
            let token = session_token(&cli, &ws.config)?;
            let comments = service.list(Some(token.as_str()))?;
            Output::new(*json).comment_list(&comments)
        }
        Commands::Post { name, text, json } => {
            let ws = ensure_initialized(&cli)?;
            let service = open_service(&ws)?;
            let token = session_token(&cli, &ws.config)?;
            let comment = service.create(Some(token.as_str()), name, text)?;
            Output::new(*json).comment_posted(&comment)
        }
        Commands::Edit {
            id,
            name,
            text,
            json,
        } => {
            let ws = ensure_initialized(&cli)?;
            let service = open_service(&ws)?;
            let token = session_token(&cli, &ws.config)?;
            let comment = service.update(Some(token.as_str()), id, name, text)?;
            Output::new(*json).comment_updated(&comment)
        }
        Commands::Delete { id } => {
            let ws = ensure_initialized(&cli)?;
            let service = open_service(&ws)?;
            let token = session_token(&cli, &ws.config)?;
            service.delete(Some(token.as_str()), id)?;
            Output::new(false).comment_deleted(id)
        }
        Commands::Watch {
            interval_ms,
            once,
            json,
        } => {
            let ws = ensure_initialized(&cli)?;
            let service = open_service(&ws)?;
            let token = session_token(&cli, &ws.config)?;
            commands::watch::run(
                &service,
                Some(token),
                Duration::from_millis(*interval_ms),
                *once,
                &Output::new(*json),
            )
        }
        Commands::Migrate { from, json } => {
            let ws = ensure_initialized(&cli)?;
            let migrated = commands::migrate::run(&ws.dir, &ws.config, from.clone())?;
            Output::new(*json).migrated(&migrated)
        }
        Commands::Token => {
            let ws = ensure_initialized(&cli)?;
            let provider = SessionTokenProvider::new(ws.config.session_path()?);
            Output::new(false).token(&provider.get_or_create_token()?)
        }
    }
}

/// Text to show the user for a failed command.
pub fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ServiceError>() {
        Some(service_err) => service_err.user_message(),
        None => format!("{err:#}"),
    }
}

/// Process exit code for a failed command; service failures get one code
/// per kind.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<ServiceError>()
        .map_or(1, |service_err| service_err.kind().exit_code())
}
