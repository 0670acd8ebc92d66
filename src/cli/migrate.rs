//! Handler for the `migrate` command.

use tracing::info;

use crate::cli::ConfigPathArg;
use crate::error::Result;
use crate::infrastructure::bootstrap::open_database;

/// Bring the configured database up to the latest schema.
pub fn execute(args: &ConfigPathArg) -> Result<()> {
    let config = args.load()?;
    config.init_logging();

    open_database(&config.database)?;
    info!(path = %config.database.path, "Migrations applied");
    println!("Database {} is up to date", config.database.path);
    Ok(())
}
