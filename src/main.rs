use anyhow::Context;
use clap::Parser;
use rapport::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    match Cli::parse().command {
        Commands::Serve(args) => cli::serve::execute(&args).await.context("serve failed")?,
        Commands::Migrate(args) => cli::migrate::execute(&args).context("migration failed")?,
        Commands::SessionId(args) => cli::session::execute(&args),
    }
    Ok(())
}
