//! CLI command implementations
//!
//! This module contains implementations of the commands supported by
//! the CLI application using the Command pattern.

pub mod command_traits;
pub mod analyze_command;
pub mod split_command;

pub use command_traits::{Command, CommandFactory};
pub use analyze_command::AnalyzeCommand;
pub use split_command::SplitCommand;

use clap::ArgMatches;
use crate::tiff::errors::{TiffError, TiffResult};

/// Factory for creating command instances based on CLI arguments
///
/// This factory looks at the subcommand and creates the matching
/// command instance for execution.
#[derive(Debug, Default)]
pub struct SlideSplitCommandFactory;

impl SlideSplitCommandFactory {
    /// Create a new factory instance
    pub fn new() -> Self {
        SlideSplitCommandFactory
    }
}

impl CommandFactory for SlideSplitCommandFactory {
    fn create_command(&self, args: &ArgMatches) -> TiffResult<Box<dyn Command>> {
        match args.subcommand() {
            Some(("split", sub)) => Ok(Box::new(SplitCommand::new(sub)?)),
            Some(("analyze", sub)) => Ok(Box::new(AnalyzeCommand::new(sub)?)),
            Some((other, _)) => Err(TiffError::GenericError(format!("Unknown command '{}'", other))),
            None => Err(TiffError::GenericError("No command given, try 'split' or 'analyze'".to_string())),
        }
    }
}
