use clap::{value_parser, Arg, ArgAction, Command as ClapCommand};
use std::process;
use log::error;

use slidesplit::utils::logger::Logger;
use slidesplit::commands::{CommandFactory, SlideSplitCommandFactory};

fn main() {
    let matches = ClapCommand::new("slidesplit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Crop, retile and mosaic large multi-resolution TIFF slide scans")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("More output, repeat for debug and trace")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .help("Only report errors")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Also append log messages to this file")
                .value_name("FILE")
                .global(true),
        )
        .subcommand(
            ClapCommand::new("split")
                .about("Crop a directory and optionally split it into mosaic pieces")
                .arg(
                    Arg::new("input")
                        .help("Input TIFF file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Output TIFF file")
                        .value_name("FILE"),
                )
                .arg(
                    Arg::new("directory")
                        .short('d')
                        .long("directory")
                        .help("Directory index to crop")
                        .value_name("INDEX")
                        .value_parser(value_parser!(usize))
                        .conflicts_with("all"),
                )
                .arg(
                    Arg::new("all")
                        .long("all")
                        .help("Crop every directory")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("crop")
                        .long("crop")
                        .help("Crop rectangle as x,y,width,height; repeat for several regions")
                        .value_name("X,Y,W,H")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("compression")
                        .short('c')
                        .long("compression")
                        .help("Crop compression (same, none, lzw, jpeg, deflate, zstd)")
                        .value_name("NAME"),
                )
                .arg(
                    Arg::new("quality")
                        .short('q')
                        .long("quality")
                        .help("JPEG quality")
                        .value_name("1-100")
                        .value_parser(value_parser!(u8).range(1..=100)),
                )
                .arg(
                    Arg::new("mosaic")
                        .short('m')
                        .long("mosaic")
                        .help("Split crops into pieces when they exceed the limits")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("mosaic-always"),
                )
                .arg(
                    Arg::new("mosaic-always")
                        .short('M')
                        .long("mosaic-always")
                        .help("Always split crops into pieces")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("memory")
                        .short('s')
                        .long("memory")
                        .help("Memory ceiling per piece in MiB, 0 for unlimited")
                        .value_name("MIB")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("piece-width")
                        .long("piece-width")
                        .help("Piece width, 0 for automatic")
                        .value_name("PIXELS")
                        .value_parser(value_parser!(u32)),
                )
                .arg(
                    Arg::new("piece-length")
                        .long("piece-length")
                        .help("Piece length, 0 for automatic")
                        .value_name("PIXELS")
                        .value_parser(value_parser!(u32)),
                )
                .arg(
                    Arg::new("overlap")
                        .long("overlap")
                        .help("Overlap between pieces in pixels, or a percentage such as 5%")
                        .value_name("OVERLAP"),
                )
                .arg(
                    Arg::new("mosaic-compression")
                        .long("mosaic-compression")
                        .help("Piece compression (same, none, lzw, jpeg, deflate, zstd)")
                        .value_name("NAME"),
                )
                .arg(
                    Arg::new("jpeg-file")
                        .long("jpeg-file")
                        .help("Write pieces as standalone JPEG files")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .help("TOML file with split and mosaic settings")
                        .value_name("FILE"),
                ),
        )
        .subcommand(
            ClapCommand::new("analyze")
                .about("List the directories of a TIFF file")
                .arg(
                    Arg::new("input")
                        .help("Input TIFF file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("tags")
                        .long("tags")
                        .help("List every tag of every directory")
                        .action(ArgAction::SetTrue),
                ),
        )
        .get_matches();

    let level = Logger::level_for(matches.get_count("verbose"), matches.get_flag("quiet"));
    let logger = match matches.get_one::<String>("log-file") {
        Some(path) => match Logger::with_file(path, level) {
            Ok(logger) => logger,
            Err(e) => {
                eprintln!("Error opening log file {}: {}", path, e);
                process::exit(1);
            }
        },
        None => Logger::console(level),
    };
    Logger::init_global_logger(logger);

    let factory = SlideSplitCommandFactory::new();

    match factory.create_command(&matches) {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("{} failed: {}", command.name(), e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
}
