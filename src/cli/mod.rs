//! CLI module for the deploy tool.
//!
//! This module provides the command-line interface for creating and
//! deleting GPU instances and CPU deployments.

mod commands;
mod output;

pub use commands::{
    Cli, Commands, CpuCommands, CpuCreateArgs, GpuCommands, GpuCreateArgs, LogFormat,
    OutputFormat,
};
pub use output::OutputFormatter;
