use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Backend;

#[derive(Parser)]
#[command(name = "gb")]
#[command(about = "Event guestbook where only the author can edit a dedication", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Storage backend to use (overrides config.toml)
    #[arg(long, global = true, env = "GUESTBOOK_BACKEND", value_enum)]
    pub backend: Option<Backend>,

    /// Act with this session token instead of the stored one
    #[arg(long, global = true, env = "GUESTBOOK_TOKEN")]
    pub token: Option<String>,

    /// Session token file (overrides config.toml)
    #[arg(long, global = true, env = "GUESTBOOK_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a guestbook in the current directory
    Init,

    /// Show all dedications, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Leave a dedication
    Post {
        /// Display name
        name: String,

        /// The message
        text: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rewrite one of your own dedications
    Edit {
        /// The comment ID to edit
        id: String,

        /// New display name
        name: String,

        /// New message
        text: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove one of your own dedications
    Delete {
        /// The comment ID to delete
        id: String,
    },

    /// Follow the guestbook live
    Watch {
        /// How often to check for writes from other processes, in milliseconds
        #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: u64,

        /// Render the current guestbook once and exit
        #[arg(long)]
        once: bool,

        /// Output each update as JSON
        #[arg(long)]
        json: bool,
    },

    /// Copy comments from the JSON file into the realtime collection
    Migrate {
        /// JSON file to read (defaults to the configured comments file)
        #[arg(long)]
        from: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print this installation's session token
    Token,
}
