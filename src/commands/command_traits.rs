//! Command and factory traits behind the CLI subcommands

use clap::ArgMatches;

use crate::tiff::errors::TiffResult;

/// One parsed subcommand, ready to run
pub trait Command {
    /// Subcommand name, used in error reports
    fn name(&self) -> &'static str;

    /// Runs the command to completion
    ///
    /// Recoverable per-raster failures are logged inside; an error here
    /// means the run as a whole failed.
    fn execute(&self) -> TiffResult<()>;
}

/// Builds the command selected by the parsed arguments
pub trait CommandFactory {
    fn create_command(&self, args: &ArgMatches) -> TiffResult<Box<dyn Command>>;
}
