//! Command-line interface for kilncast.

pub mod cli;
pub mod commands;
pub mod sink;
