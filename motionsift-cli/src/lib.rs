// motionsift-cli/src/lib.rs
//
// Library portion of the motionsift CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod terminal;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands, ExtractArgs, InspectArgs};
pub use commands::extract::run_extract;
pub use commands::inspect::run_inspect;
