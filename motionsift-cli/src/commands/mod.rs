//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command.

/// Full pipeline: locate, repair, sample, classify and persist frames.
pub mod extract;

/// Locator-only report of where the embedded video sits.
pub mod inspect;
