//! CLI subcommands

pub mod families;
pub mod render;
pub mod snapshot;
