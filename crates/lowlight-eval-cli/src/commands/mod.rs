//! Subcommand implementations.

pub mod enhance;
pub mod evaluate;
pub mod pairs;
