//! The `convert` run: index, group, reconstruct, write.

use std::fs;
use std::path::PathBuf;

use dicom::core::Tag;
use thiserror::Error;
use tracing::{info, warn};
use web_time::Instant;

use crate::grouper::{Grouper, SeriesGroup};
use crate::index::{IndexError, SeriesIndex};
use crate::naming::OutputNamer;
use crate::reader::ImageReader;
use crate::tag::{TagParseError, parse_tags};
use crate::volume::VolumeWriter;
use crate::volume_loader::VolumeLoader;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("could not create destination {}: {source}", .path.display())]
    CreateDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertConfig {
    /// Grouping tags, outermost first.
    pub tags: Vec<Tag>,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub recursive: bool,
}

impl ConvertConfig {
    /// Validate tag syntax before anything touches the file system.
    pub fn new<S: AsRef<str>>(
        tags: &[S],
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        recursive: bool,
    ) -> Result<Self, TagParseError> {
        Ok(Self {
            tags: parse_tags(tags)?,
            source: source.into(),
            destination: destination.into(),
            recursive,
        })
    }
}

/// A group that produced no volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedGroup {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ConvertReport {
    pub indexed: usize,
    pub unreadable: usize,
    pub written: Vec<PathBuf>,
    pub failed: Vec<FailedGroup>,
}

/// Convert every non-empty group of `config.source` into one volume file.
///
/// Unreadable files and failing groups are logged and reported; only an
/// unusable source or destination aborts the run.
pub fn run<R, W>(
    config: &ConvertConfig,
    reader: &R,
    writer: &W,
) -> Result<ConvertReport, ConvertError>
where
    R: ImageReader,
    W: VolumeWriter,
{
    let started = Instant::now();
    let index = SeriesIndex::build(reader, &config.source, &config.tags, config.recursive)?;

    fs::create_dir_all(&config.destination).map_err(|source| ConvertError::CreateDestination {
        path: config.destination.clone(),
        source,
    })?;

    let mut report = ConvertReport {
        indexed: index.len(),
        unreadable: index.unreadable(),
        ..ConvertReport::default()
    };
    let mut namer = OutputNamer::in_run();
    Grouper::new(&index).for_each_group(&config.tags, |group| {
        match export_group(config, reader, writer, &mut namer, &group) {
            Ok(path) => report.written.push(path),
            Err(reason) => {
                warn!(group = %group.name, "Skipping group: {reason}");
                report.failed.push(FailedGroup {
                    name: group.name,
                    reason,
                });
            }
        }
    })?;

    info!(
        "Wrote {} volumes, {} groups failed in {:.2?}",
        report.written.len(),
        report.failed.len(),
        started.elapsed()
    );
    Ok(report)
}

fn export_group<R, W>(
    config: &ConvertConfig,
    reader: &R,
    writer: &W,
    namer: &mut OutputNamer,
    group: &SeriesGroup,
) -> Result<PathBuf, String>
where
    R: ImageReader,
    W: VolumeWriter,
{
    let volume =
        VolumeLoader::load_from_file_paths(reader, &group.files).map_err(|e| e.to_string())?;
    let name = if group.name.is_empty() {
        volume.default_name()
    } else {
        group.name.clone()
    };
    let path = namer
        .claim(
            &config.destination,
            &format!("{name}.{}", writer.extension()),
        )
        .map_err(|e| e.to_string())?;

    info!("Writing {} ({} slices)", path.display(), group.files.len());
    writer.write(&path, &volume).map_err(|e| e.to_string())?;
    Ok(path)
}
