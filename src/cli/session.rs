//! Handler for the `session-id` command.

use crate::cli::SessionIdArgs;
use crate::domain::session::derive_session_id;

/// Print the derived identifier. Unknown kinds print an empty line.
pub fn execute(args: &SessionIdArgs) {
    println!("{}", derive_session_id(args.kind, args.a, args.b));
}
