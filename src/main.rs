use clap::Parser;
use console::style;

use guestbook::cli::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(err) = guestbook::logging::init_logging(cli.log_json) {
        eprintln!("{} {err:#}", style("Warning:").yellow());
    }

    if let Err(err) = guestbook::run(cli) {
        tracing::debug!(error = %format!("{err:#}"), "command failed");
        eprintln!("{} {}", style("Error:").red().bold(), guestbook::describe_error(&err));
        std::process::exit(guestbook::exit_code(&err));
    }
}
