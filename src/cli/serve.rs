//! Handler for the `serve` command.

use crate::cli::ServeArgs;
use crate::error::Result;
use crate::infrastructure::bootstrap;

/// Execute the serve command.
pub async fn execute(args: &ServeArgs) -> Result<()> {
    let mut config = args.config.load()?;
    args.apply_overrides(&mut config);
    config.init_logging();

    bootstrap::serve(config).await
}
