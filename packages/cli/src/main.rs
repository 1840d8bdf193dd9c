mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{hash, inspect, migrate, types, HashArgs, InspectArgs, MigrateArgs, TypesArgs};
use config::Config;
use tracing_subscriber::EnvFilter;

/// Invitation CLI - inspect and convert invitation page payloads
#[derive(Parser, Debug)]
#[command(name = "invitation")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered content types
    Types(TypesArgs),

    /// Show mode, items, unknown types and hash of a payload
    Inspect(InspectArgs),

    /// Convert a payload between linear and free representations
    Migrate(MigrateArgs),

    /// Print the content hash of a payload
    Hash(HashArgs),
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = Config::load(&cwd)?;

    match cli.command {
        Command::Types(args) => types(args, &config),
        Command::Inspect(args) => inspect(args, &config),
        Command::Migrate(args) => migrate(args, &config),
        Command::Hash(args) => hash(args),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
