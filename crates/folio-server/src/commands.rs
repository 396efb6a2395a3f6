use std::io::BufRead;

use anyhow::Context;
use colored::Colorize;
use folio_server::{AppState, FolioServer, ServerConfig};

use crate::cli::{Cli, Command, ReconcileArgs, ServeArgs, SetAdminArgs};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = ServerConfig::load(cli.config.as_deref()).context("loading configuration")?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args),
        Command::SetAdmin(args) => cmd_set_admin(config, args),
        Command::Reconcile(args) => cmd_reconcile(config, args),
    }
}

fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    let server = FolioServer::new(config).context("opening server state")?;
    let runtime = tokio::runtime::Runtime::new().context("starting runtime")?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_set_admin(config: ServerConfig, args: SetAdminArgs) -> anyhow::Result<()> {
    eprintln!("Enter the new password for {} and press enter:", args.username.bold());
    let mut password = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut password)
        .context("reading password from stdin")?;
    let password = password.trim_end_matches(['\r', '\n']);

    let state = AppState::open(&config).context("opening server state")?;
    state.auth.set_credential(&args.username, password)?;
    println!("{} administrator set to {}", "✓".green().bold(), args.username.bold());
    if config.admin_password_override.is_some() {
        println!(
            "{} FOLIO_ADMIN_PASSWORD is set and takes precedence over the stored credential",
            "!".yellow().bold()
        );
    }
    Ok(())
}

fn cmd_reconcile(config: ServerConfig, args: ReconcileArgs) -> anyhow::Result<()> {
    let state = AppState::open(&config).context("opening server state")?;
    let report = state.reconciler.scan()?;
    if report.is_clean() {
        println!("{} photo entries and files agree", "✓".green().bold());
        return Ok(());
    }
    for file in &report.orphan_files {
        println!("  {} {}", "orphan:".yellow(), file);
    }
    for missing in &report.missing_files {
        println!(
            "  {} {} (album {}, photo {})",
            "missing:".red(),
            missing.file,
            missing.album,
            missing.photo
        );
    }
    if args.prune {
        let removed = state.reconciler.prune_orphans()?;
        println!("{} pruned {} orphan file(s)", "✓".green().bold(), removed.len());
    }
    Ok(())
}
