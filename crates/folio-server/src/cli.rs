use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "folio-server", about = "Folio portfolio server", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Set the administrator credential (reads the password from stdin)
    SetAdmin(SetAdminArgs),
    /// Compare photo entries against stored files
    Reconcile(ReconcileArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Override the configured bind address
    #[arg(long)]
    pub bind: Option<std::net::SocketAddr>,
}

#[derive(Args)]
pub struct SetAdminArgs {
    /// Administrator username
    #[arg(long, default_value = "admin")]
    pub username: String,
}

#[derive(Args)]
pub struct ReconcileArgs {
    /// Delete orphan files after reporting them
    #[arg(long)]
    pub prune: bool,
}
