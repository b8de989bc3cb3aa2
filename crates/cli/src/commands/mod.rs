//! CLI subcommand implementations

pub mod health;
pub mod model;
pub mod predict;
