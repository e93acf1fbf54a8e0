//! TIFF structure analysis command
//!
//! Lists the directories of a container with their dimensions, layout,
//! compression and sample format, so a directory can be picked for
//! splitting.

use clap::ArgMatches;
use log::{debug, info};

use crate::api::SlideSplitter;
use crate::commands::command_traits::Command;
use crate::config::SplitConfig;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::raster::SourceRaster;
use crate::utils::tag_utils::get_tag_name;

/// Command for analyzing TIFF file structure
pub struct AnalyzeCommand {
    /// Path to the input file
    input_file: String,
    /// Whether to list every tag of every directory
    verbose: bool,
}

impl AnalyzeCommand {
    /// Create a new analyze command
    ///
    /// # Arguments
    /// * `args` - Matches of the `analyze` subcommand
    ///
    /// # Returns
    /// A new AnalyzeCommand instance or an error
    pub fn new(args: &ArgMatches) -> TiffResult<Self> {
        let input_file = args.get_one::<String>("input")
            .ok_or_else(|| TiffError::GenericError("Missing input file".to_string()))?
            .clone();

        Ok(AnalyzeCommand {
            input_file,
            verbose: args.get_flag("tags"),
        })
    }

    /// Display every tag of one directory
    ///
    /// # Arguments
    /// * `index` - Directory to list
    fn display_tags(&self, index: usize) -> TiffResult<()> {
        let raster = SourceRaster::open(&self.input_file, index)?;
        for entry in &raster.ifd().entries {
            println!("    {} ({}): type {}, count {}, value/offset {}",
                     entry.tag, get_tag_name(entry.tag), entry.field_type, entry.count, entry.value_offset);
        }
        Ok(())
    }
}

impl Command for AnalyzeCommand {
    fn name(&self) -> &'static str {
        "analyze"
    }

    fn execute(&self) -> TiffResult<()> {
        info!("Analyzing file: {}", self.input_file);

        let splitter = SlideSplitter::new(SplitConfig::default());
        let summaries = splitter.analyze(&self.input_file)?;

        println!("{}: {} directories", self.input_file, summaries.len());
        for summary in &summaries {
            println!("  {}", summary);
            if self.verbose {
                self.display_tags(summary.index)?;
            }
        }

        debug!("Analysis completed successfully");
        Ok(())
    }
}
