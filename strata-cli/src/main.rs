//! Strata CLI - changelog-driven schema migrations.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use strata_cli::cli::{Cli, Command};
use strata_cli::commands;
use strata_cli::error::CliResult;
use strata_cli::output;

#[tokio::main]
async fn main() {
    // Diagnostics go to stderr so report output stays pipeable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Update(args) => commands::update::run(&cli.db, args).await,
        Command::Rollback(args) => commands::rollback::run(&cli.db, args).await,
        Command::Status => commands::status::run(&cli.db).await,
        Command::History => commands::history::run(&cli.db).await,
        Command::Tag(args) => commands::tag::run(&cli.db, args).await,
        Command::Validate => commands::validate::run(&cli.db).await,
        Command::Clear(args) => commands::clear::run(&cli.db, args).await,
        Command::Generate(args) => commands::generate::run(args).await,
    }
}
