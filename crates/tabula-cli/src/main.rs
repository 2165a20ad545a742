mod cli;
mod commands;
mod display;

use anyhow::{Context, Result};
use clap::Parser;
use tabula_client::ApiClient;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    tracing::debug!("tabula v{}", env!("CARGO_PKG_VERSION"));

    let open_store = || commands::open_store(cli.db.as_deref());

    match cli.command {
        Commands::Project(cmd) => commands::project(&open_store()?, cmd),
        Commands::Schema(cmd) => commands::schema(&open_store()?, cmd),
        Commands::Document(cmd) => commands::document(&open_store()?, cmd),
        Commands::Extract(cmd) => commands::extract(&mut open_store()?, cmd),
        Commands::Records(args) => commands::records(&open_store()?, args),
        Commands::Review(cmd) => commands::review(&open_store()?, cmd),
        // A records file needs no store.
        Commands::Evaluate(args) if args.input.is_some() => commands::evaluate_cmd(None, args),
        Commands::Evaluate(args) => commands::evaluate_cmd(Some(&open_store()?), args),
        Commands::Sql(args) => commands::sql(&open_store()?, args),
        Commands::Remote(cmd) => {
            let client = ApiClient::new(cli.api_url);
            let runtime =
                tokio::runtime::Runtime::new().context("failed to start async runtime")?;
            runtime.block_on(commands::remote(&client, cmd))
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
