//! The `select` run: copy or move files whose attributes match filters.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use dicom::core::Tag;
use thiserror::Error;
use tracing::{info, warn};

use crate::enums::{MatchMode, Transfer};
use crate::index::{IndexError, scan_directory};
use crate::naming::OutputNamer;
use crate::reader::{AttributeMap, ImageReader};
use crate::tag::{TagFilter, TagParseError};

#[derive(Debug, Error)]
pub enum SelectError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("could not create destination {}: {source}", .path.display())]
    CreateDestination {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectConfig {
    pub filters: Vec<TagFilter>,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub recursive: bool,
    pub mode: MatchMode,
    pub transfer: Transfer,
}

impl SelectConfig {
    /// Validate filter syntax before anything touches the file system.
    pub fn new<S: AsRef<str>>(
        filters: &[S],
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
    ) -> Result<Self, TagParseError> {
        Ok(Self {
            filters: filters
                .iter()
                .map(|f| TagFilter::parse(f.as_ref()))
                .collect::<Result<_, _>>()?,
            source: source.into(),
            destination: destination.into(),
            recursive: false,
            mode: MatchMode::default(),
            transfer: Transfer::default(),
        })
    }

    /// Distinct filter tags, in order of first appearance.
    fn tags(&self) -> Vec<Tag> {
        let mut tags: Vec<Tag> = Vec::with_capacity(self.filters.len());
        for filter in &self.filters {
            if !tags.contains(&filter.tag) {
                tags.push(filter.tag);
            }
        }
        tags
    }
}

/// True when any filter matches the attribute of its tag.
///
/// Empty attributes count as absent and never match.
pub fn matches(attributes: &AttributeMap, filters: &[TagFilter], mode: MatchMode) -> bool {
    filters.iter().any(|filter| {
        attributes
            .get(&filter.tag)
            .filter(|value| !value.is_empty())
            .is_some_and(|value| mode.matches(value, &filter.value))
    })
}

#[derive(Debug, Default)]
pub struct SelectReport {
    pub scanned: usize,
    pub unreadable: usize,
    pub selected: Vec<PathBuf>,
    pub failed: usize,
}

pub fn run<R: ImageReader>(config: &SelectConfig, reader: &R) -> Result<SelectReport, SelectError> {
    fs::create_dir_all(&config.destination).map_err(|source| SelectError::CreateDestination {
        path: config.destination.clone(),
        source,
    })?;
    let paths = scan_directory(&config.source, config.recursive)?;
    let tags = config.tags();

    let mut report = SelectReport {
        scanned: paths.len(),
        ..SelectReport::default()
    };
    let mut namer = OutputNamer::on_disk();
    for path in paths {
        let attributes = match reader.read_header(&path, &tags) {
            Ok(attributes) => attributes,
            Err(e) => {
                warn!("Skipping file: {e}");
                report.unreadable += 1;
                continue;
            }
        };
        if !matches(&attributes, &config.filters, config.mode) {
            continue;
        }
        match transfer_file(&path, config, &mut namer) {
            Ok(destination) => report.selected.push(destination),
            Err(e) => {
                warn!("Could not transfer {}: {e}", path.display());
                report.failed += 1;
            }
        }
    }

    info!(
        "Selected {} of {} files",
        report.selected.len(),
        report.scanned
    );
    Ok(report)
}

fn transfer_file(
    path: &Path,
    config: &SelectConfig,
    namer: &mut OutputNamer,
) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let destination = namer.claim(&config.destination, &file_name)?;
    match config.transfer {
        Transfer::Copy => {
            info!("Copying: {}", path.display());
            fs::copy(path, &destination)?;
        }
        Transfer::Move => {
            info!("Moving: {}", path.display());
            // rename fails across file systems
            if fs::rename(path, &destination).is_err() {
                fs::copy(path, &destination)?;
                fs::remove_file(path)?;
            }
        }
    }
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeReader;

    const SERIES: Tag = Tag(0x0020, 0x0011);
    const DESCRIPTION: Tag = Tag(0x0008, 0x103E);

    fn attributes(pairs: &[(Tag, &str)]) -> AttributeMap {
        pairs.iter().map(|(t, v)| (*t, v.to_string())).collect()
    }

    fn filter(tag: Tag, value: &str) -> TagFilter {
        TagFilter {
            tag,
            value: value.to_string(),
        }
    }

    #[test]
    fn contains_mode_matches_substrings() {
        let attrs = attributes(&[(DESCRIPTION, "T1 MPRAGE")]);
        assert!(matches(&attrs, &[filter(DESCRIPTION, "MPRAGE")], MatchMode::Contains));
        assert!(!matches(&attrs, &[filter(DESCRIPTION, "MPRAGE")], MatchMode::Exact));
        assert!(matches(&attrs, &[filter(DESCRIPTION, "T1 MPRAGE")], MatchMode::Exact));
    }

    #[test]
    fn any_filter_is_enough() {
        let attrs = attributes(&[(SERIES, "3"), (DESCRIPTION, "AX")]);
        let filters = [filter(SERIES, "9"), filter(SERIES, "3")];
        assert!(matches(&attrs, &filters, MatchMode::Exact));
        let filters = [filter(SERIES, "9"), filter(DESCRIPTION, "COR")];
        assert!(!matches(&attrs, &filters, MatchMode::Exact));
    }

    #[test]
    fn absent_attributes_never_match() {
        let attrs = attributes(&[(SERIES, "")]);
        assert!(!matches(&attrs, &[filter(SERIES, "")], MatchMode::Contains));
        assert!(!matches(&attrs, &[filter(DESCRIPTION, "")], MatchMode::Contains));
    }

    #[test]
    fn config_parses_filters() {
        let config = SelectConfig::new(&["0020,0011=3", "0020,0011=4"], "src", "dst").unwrap();
        assert_eq!(config.tags(), vec![SERIES]);
        assert_eq!(config.mode, MatchMode::Contains);
        assert_eq!(config.transfer, Transfer::Copy);
        assert!(SelectConfig::new(&["0020,0011"], "src", "dst").is_err());
    }

    fn setup(names: &[(&str, &str)]) -> (tempfile::TempDir, FakeReader) {
        let src = tempfile::tempdir().unwrap();
        let mut reader = FakeReader::default();
        for (name, series) in names {
            let path = src.path().join(name);
            std::fs::write(&path, name.as_bytes()).unwrap();
            reader.add_header(&path, &[(SERIES, *series)]);
        }
        (src, reader)
    }

    #[test]
    fn copies_matching_files_with_collision_suffix() {
        let (src, reader) = setup(&[("a.dcm", "3"), ("b.dcm", "4"), ("c.dcm", "33")]);
        let dst = tempfile::tempdir().unwrap();
        std::fs::write(dst.path().join("a.dcm"), b"old").unwrap();

        let mut config = SelectConfig::new(&["0020,0011=3"], src.path(), dst.path()).unwrap();
        config.mode = MatchMode::Exact;
        let report = run(&config, &reader).unwrap();

        assert_eq!(report.scanned, 3);
        assert_eq!(report.selected, vec![dst.path().join("a_0000.dcm")]);
        assert_eq!(std::fs::read(dst.path().join("a_0000.dcm")).unwrap(), b"a.dcm");
        assert_eq!(std::fs::read(dst.path().join("a.dcm")).unwrap(), b"old");
        assert!(src.path().join("a.dcm").exists());
    }

    #[test]
    fn move_removes_the_source() {
        let (src, reader) = setup(&[("a.dcm", "3"), ("c.dcm", "33")]);
        let dst = tempfile::tempdir().unwrap();

        let mut config = SelectConfig::new(&["0020,0011=3"], src.path(), dst.path()).unwrap();
        config.transfer = Transfer::Move;
        let report = run(&config, &reader).unwrap();

        // contains mode: "33" contains "3"
        assert_eq!(report.selected.len(), 2);
        assert!(!src.path().join("a.dcm").exists());
        assert!(!src.path().join("c.dcm").exists());
        assert!(dst.path().join("c.dcm").exists());
    }

    #[test]
    fn unreadable_files_are_counted() {
        let (src, reader) = setup(&[("a.dcm", "3")]);
        std::fs::write(src.path().join("junk.bin"), b"junk").unwrap();
        let dst = tempfile::tempdir().unwrap();

        let config = SelectConfig::new(&["0020,0011=3"], src.path(), dst.path()).unwrap();
        let report = run(&config, &reader).unwrap();
        assert_eq!(report.unreadable, 1);
        assert_eq!(report.selected.len(), 1);
    }
}
