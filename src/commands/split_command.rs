//! Crop and mosaic command
//!
//! Builds a [`SplitConfig`] from an optional TOML file and the command
//! line flags (flags win), then crops one directory, every directory or a
//! list of regions, running the mosaic on each crop when one is enabled.

use std::path::PathBuf;

use clap::ArgMatches;
use log::{info, warn};

use crate::api::{SlideSplitter, SplitReport};
use crate::commands::command_traits::Command;
use crate::compression::Compression;
use crate::config::{MosaicConfig, MosaicFormat, MosaicMode, Overlap, SplitConfig};
use crate::extractor::CropRectangle;
use crate::mosaic::MosaicOutcome;
use crate::mosaic::naming::piece_stem;
use crate::tiff::errors::{TiffError, TiffResult};

/// What part of the input to split
#[derive(Debug, Clone, PartialEq)]
enum Selection {
    Directory(usize),
    AllDirectories,
}

/// Command for cropping rasters and splitting them into pieces
pub struct SplitCommand {
    input_file: PathBuf,
    output_file: PathBuf,
    selection: Selection,
    crops: Vec<CropRectangle>,
    config: SplitConfig,
}

impl SplitCommand {
    /// Create a new split command
    ///
    /// # Arguments
    /// * `args` - Matches of the `split` subcommand
    ///
    /// # Returns
    /// A new SplitCommand instance or an error
    pub fn new(args: &ArgMatches) -> TiffResult<Self> {
        let input_file = PathBuf::from(args.get_one::<String>("input")
            .ok_or_else(|| TiffError::GenericError("Missing input file".to_string()))?);

        let output_file = match args.get_one::<String>("output") {
            Some(output) => PathBuf::from(output),
            None => {
                let mut name = piece_stem(&input_file).into_os_string();
                name.push("_split.tif");
                PathBuf::from(name)
            }
        };

        let selection = if args.get_flag("all") {
            Selection::AllDirectories
        } else {
            Selection::Directory(args.get_one::<usize>("directory").copied().unwrap_or(0))
        };

        let crops = match args.get_many::<String>("crop") {
            Some(values) => values.map(|v| v.parse()).collect::<TiffResult<Vec<CropRectangle>>>()?,
            None => Vec::new(),
        };

        let config = Self::build_config(args)?;
        Ok(SplitCommand { input_file, output_file, selection, crops, config })
    }

    /// Merges the configuration file with the flags
    fn build_config(args: &ArgMatches) -> TiffResult<SplitConfig> {
        let mut config = match args.get_one::<String>("config") {
            Some(path) => SplitConfig::from_toml_file(path)?,
            None => SplitConfig::default(),
        };

        if let Some(name) = args.get_one::<String>("compression") {
            config.crop_compression = name.parse()?;
        }
        if let Some(&quality) = args.get_one::<u8>("quality") {
            config.jpeg_quality = Some(quality);
        }

        let mosaic_flags = ["mosaic", "mosaic-always", "memory", "piece-width", "piece-length",
                            "overlap", "mosaic-compression", "jpeg-file"];
        let wants_mosaic = mosaic_flags.iter().any(|id| match args.value_source(id) {
            Some(source) => source == clap::parser::ValueSource::CommandLine,
            None => false,
        });
        if !wants_mosaic {
            return Ok(config);
        }

        let mut mosaic = config.mosaic.take().unwrap_or_else(MosaicConfig::default);
        if args.get_flag("mosaic-always") {
            mosaic.mode = MosaicMode::Always;
        } else if args.get_flag("mosaic") {
            mosaic.mode = MosaicMode::IfNeeded;
        }
        if let Some(&mib) = args.get_one::<u64>("memory") {
            mosaic.memory_limit = mib * 1024 * 1024;
        }
        if let Some(&width) = args.get_one::<u32>("piece-width") {
            mosaic.piece_width = width;
        }
        if let Some(&length) = args.get_one::<u32>("piece-length") {
            mosaic.piece_length = length;
        }
        if let Some(overlap) = args.get_one::<String>("overlap") {
            mosaic.overlap = overlap.parse::<Overlap>()?;
        }
        if let Some(name) = args.get_one::<String>("mosaic-compression") {
            mosaic.compression = name.parse::<Compression>()?;
        }
        if args.get_flag("jpeg-file") {
            mosaic.output = MosaicFormat::JpegFile;
        }
        if mosaic.jpeg_quality.is_none() {
            mosaic.jpeg_quality = config.jpeg_quality;
        }

        config.mosaic = Some(mosaic);
        Ok(config)
    }

    fn log_report(report: &SplitReport) {
        info!("Directory {}: crop written to {}", report.directory, report.crop.display());
        match &report.mosaic {
            Some(MosaicOutcome::Done(mosaic)) => {
                info!("  {} pieces written ({})", mosaic.written.len(), mosaic.geometry);
                for (path, error) in &mosaic.failed {
                    warn!("  piece {} failed: {}", path.display(), error);
                }
            }
            Some(MosaicOutcome::Skipped) => info!("  no mosaic needed"),
            None => {}
        }
    }
}

impl Command for SplitCommand {
    fn name(&self) -> &'static str {
        "split"
    }

    fn execute(&self) -> TiffResult<()> {
        info!("Splitting {} into {}", self.input_file.display(), self.output_file.display());
        let splitter = SlideSplitter::new(self.config.clone());

        let reports = match (&self.selection, self.crops.as_slice()) {
            (Selection::AllDirectories, crops) => {
                if crops.len() > 1 {
                    return Err(TiffError::GenericError("--all takes at most one --crop".to_string()));
                }
                let crop = crops.first().copied().unwrap_or_else(CropRectangle::no_crop);
                splitter.split_all(&self.input_file, crop, &self.output_file)?
            }
            (Selection::Directory(directory), []) => {
                vec![splitter.split_directory(&self.input_file, *directory, CropRectangle::no_crop(), &self.output_file)?]
            }
            (Selection::Directory(directory), [crop]) => {
                vec![splitter.split_directory(&self.input_file, *directory, *crop, &self.output_file)?]
            }
            (Selection::Directory(directory), crops) => {
                splitter.split_regions(&self.input_file, *directory, crops, &self.output_file)?
            }
        };

        for report in &reports {
            Self::log_report(report);
        }
        let failed: usize = reports.iter().map(|r| match &r.mosaic {
            Some(MosaicOutcome::Done(mosaic)) => mosaic.failed.len(),
            _ => 0,
        }).sum();

        if failed > 0 {
            return Err(TiffError::GenericError(format!("{} mosaic pieces failed", failed)));
        }
        Ok(())
    }
}
