//! Split DICOM series by tag and write them as NRRD volumes.
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dicom_nrrd::{
    ConvertConfig, DicomReader, NrrdWriter, SelectConfig, convert,
    enums::{MatchMode, Transfer},
    select,
};
use tracing::{Level, error, info};

#[derive(Debug, Parser)]
#[command(version, about = "Split DICOM series by tag")]
struct App {
    /// Print debug information
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Group DICOM files by tags and write one NRRD volume per group
    Convert {
        /// DICOM tags (e.g. "0020,000E"), followed by the source directory
        /// and the destination directory
        #[arg(value_name = "TAG... SRC_DIR DST_DIR", num_args = 3.., required = true)]
        args: Vec<String>,

        /// Search the source directory recursively
        #[arg(short = 'r')]
        recursive: bool,
    },
    /// Copy or move DICOM files whose attributes match the given values
    Select {
        /// Tag and value pairs (e.g. "0020,0011=3"), followed by the source
        /// directory and the destination directory
        #[arg(value_name = "TAG=VALUE... SRC_DIR DST_DIR", num_args = 3.., required = true)]
        args: Vec<String>,

        /// Search the source directory recursively
        #[arg(short = 'r')]
        recursive: bool,

        /// Attributes must exactly match
        #[arg(short = 'm')]
        exact: bool,

        /// Move files instead of copying
        #[arg(short = 'M')]
        move_files: bool,
    },
}

/// Split trailing `SRC_DIR DST_DIR` off the positional arguments.
fn split_directories(args: &[String]) -> Option<(&[String], PathBuf, PathBuf)> {
    let [tags @ .., source, destination] = args else {
        return None;
    };
    if tags.is_empty() {
        return None;
    }
    Some((tags, PathBuf::from(source), PathBuf::from(destination)))
}

fn main() {
    let App { verbose, command } = App::parse();

    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
            .finish(),
    )
    .unwrap_or_else(|e| {
        eprintln!("[ERROR] Could not set up global logging subscriber: {e}");
    });

    match command {
        Command::Convert { args, recursive } => {
            let Some((tags, source, destination)) = split_directories(&args) else {
                error!("Expected at least one TAG, SRC_DIR and DST_DIR");
                std::process::exit(-1);
            };
            let config = ConvertConfig::new(tags, source, destination, recursive)
                .unwrap_or_else(|e| {
                    error!("{e}");
                    std::process::exit(-1);
                });
            let report = convert::run(&config, &DicomReader, &NrrdWriter).unwrap_or_else(|e| {
                error!("{e}");
                std::process::exit(-2);
            });
            info!(
                "{} files indexed, {} unreadable, {} volumes written, {} groups skipped",
                report.indexed,
                report.unreadable,
                report.written.len(),
                report.failed.len()
            );
        }
        Command::Select {
            args,
            recursive,
            exact,
            move_files,
        } => {
            let Some((filters, source, destination)) = split_directories(&args) else {
                error!("Expected at least one TAG=VALUE, SRC_DIR and DST_DIR");
                std::process::exit(-1);
            };
            let mut config = SelectConfig::new(filters, source, destination).unwrap_or_else(|e| {
                error!("{e}");
                std::process::exit(-1);
            });
            config.recursive = recursive;
            config.mode = if exact {
                MatchMode::Exact
            } else {
                MatchMode::Contains
            };
            config.transfer = if move_files {
                Transfer::Move
            } else {
                Transfer::Copy
            };
            let report = select::run(&config, &DicomReader).unwrap_or_else(|e| {
                error!("{e}");
                std::process::exit(-2);
            });
            info!(
                "{} files scanned, {} unreadable, {} selected, {} failed",
                report.scanned,
                report.unreadable,
                report.selected.len(),
                report.failed
            );
        }
    }
}
