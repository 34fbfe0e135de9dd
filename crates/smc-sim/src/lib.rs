//! Library half of the `smc-sim` binary: model descriptions and subcommands.

pub mod commands;
pub mod model;
