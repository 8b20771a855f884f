use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "areg", about = "Apps registry: editors, spaces and the HTTP server", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file.
    #[arg(short, long, global = true, default_value = "areg.toml")]
    pub config: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate the configuration, prepare stores and serve HTTP
    Serve(ServeArgs),
    /// Create an editor, or rotate its secret if it exists
    AddEditor(EditorArgs),
    /// Issue a token for an editor
    GenToken(GenTokenArgs),
    /// Validate the configuration and print a summary
    CheckConfig,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Overrides `server.bind_addr`.
    #[arg(long)]
    pub bind: Option<std::net::SocketAddr>,
}

#[derive(Args)]
pub struct EditorArgs {
    pub name: String,
}

#[derive(Args)]
pub struct GenTokenArgs {
    pub name: String,
    /// Token lifetime, e.g. `24h`. Omit for a token that never expires.
    #[arg(long, value_parser = humantime::parse_duration)]
    pub max_age: Option<Duration>,
}
