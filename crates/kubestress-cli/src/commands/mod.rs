//! CLI commands

pub mod cleanup;
pub mod load;
