//! Command-line surface shared by the headless and desktop binaries.

pub mod cli;
