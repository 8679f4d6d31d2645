//! In-memory index of slice attributes.
//!
//! The index holds one row per readable file with one column per requested
//! tag. Each column keeps an ordered map from value to the rows holding it,
//! which serves both distinct-value enumeration and conjunctive filtering.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dicom::core::Tag;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::reader::ImageReader;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("tag {0} is not a column of the series index")]
    UnknownTag(Tag),

    #[error("source {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
}

/// One `tag == value` constraint.
pub type Constraint = (Tag, String);

/// One indexed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceRecord {
    /// Attribute values, in column order. Missing attributes are empty.
    pub values: Vec<String>,
    pub path: PathBuf,
}

#[derive(Debug, Default)]
pub struct SeriesIndex {
    columns: Vec<Tag>,
    records: Vec<SliceRecord>,
    postings: Vec<BTreeMap<String, Vec<usize>>>,
    unreadable: usize,
}

/// List the files of `source`, one level deep unless `recursive` is set.
///
/// Entries are sorted by file name so that repeated runs see the same order.
/// Symbolic links are followed, so linked slices are listed like regular
/// files.
pub fn scan_directory(source: &Path, recursive: bool) -> Result<Vec<PathBuf>, IndexError> {
    if !source.is_dir() {
        return Err(IndexError::NotADirectory(source.to_path_buf()));
    }
    let mut walker = WalkDir::new(source).follow_links(true).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable directory entry: {e}"),
        }
    }
    Ok(files)
}

impl SeriesIndex {
    /// Scan `source` and index every readable file by `tags`.
    ///
    /// Files the reader rejects are logged, counted and left out.
    pub fn build<R: ImageReader>(
        reader: &R,
        source: &Path,
        tags: &[Tag],
        recursive: bool,
    ) -> Result<Self, IndexError> {
        let paths = scan_directory(source, recursive)?;
        info!("Processing directory {} ({} files)", source.display(), paths.len());

        let extracted: Vec<_> = paths
            .into_par_iter()
            .map(|path| {
                let attributes = reader.read_header(&path, tags);
                (path, attributes)
            })
            .collect();

        let mut records = Vec::with_capacity(extracted.len());
        let mut unreadable = 0;
        for (path, attributes) in extracted {
            match attributes {
                Ok(mut attributes) => {
                    let values = tags
                        .iter()
                        .map(|tag| attributes.remove(tag).unwrap_or_default())
                        .collect();
                    records.push(SliceRecord { values, path });
                }
                Err(e) => {
                    warn!("Could not obtain attributes: {e}");
                    unreadable += 1;
                }
            }
        }

        let mut index = Self::from_records(tags.to_vec(), records);
        index.unreadable = unreadable;
        info!(
            "Indexed {} files, {} unreadable",
            index.len(),
            index.unreadable
        );
        Ok(index)
    }

    /// Build an index from ready-made records.
    ///
    /// Every record must hold one value per column.
    pub fn from_records(columns: Vec<Tag>, records: Vec<SliceRecord>) -> Self {
        let mut postings = vec![BTreeMap::<String, Vec<usize>>::new(); columns.len()];
        for (row, record) in records.iter().enumerate() {
            debug_assert_eq!(record.values.len(), columns.len());
            for (column, value) in postings.iter_mut().zip(&record.values) {
                column.entry(value.clone()).or_default().push(row);
            }
        }
        debug!(columns = columns.len(), rows = records.len(), "Built series index");
        Self {
            columns,
            records,
            postings,
            unreadable: 0,
        }
    }

    pub fn columns(&self) -> &[Tag] {
        &self.columns
    }

    pub fn records(&self) -> &[SliceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of files that could not be read while building.
    pub fn unreadable(&self) -> usize {
        self.unreadable
    }

    fn column(&self, tag: Tag) -> Result<usize, IndexError> {
        self.columns
            .iter()
            .position(|&t| t == tag)
            .ok_or(IndexError::UnknownTag(tag))
    }

    /// Fail unless every tag is a column of this index.
    pub fn ensure_columns(&self, tags: &[Tag]) -> Result<(), IndexError> {
        tags.iter().try_for_each(|&tag| self.column(tag).map(|_| ()))
    }

    /// All distinct values of one column, in ascending order.
    pub fn distinct_values(&self, tag: Tag) -> Result<Vec<&str>, IndexError> {
        let column = self.column(tag)?;
        Ok(self.postings[column].keys().map(String::as_str).collect())
    }

    /// Paths of all records matching every constraint, in index order.
    ///
    /// An empty constraint list matches everything.
    pub fn filter(&self, constraints: &[Constraint]) -> Result<Vec<&Path>, IndexError> {
        let mut candidates: Option<&[usize]> = None;
        let mut resolved = Vec::with_capacity(constraints.len());
        for (tag, value) in constraints {
            let column = self.column(*tag)?;
            let Some(rows) = self.postings[column].get(value) else {
                return Ok(Vec::new());
            };
            if candidates.is_none_or(|c| rows.len() < c.len()) {
                candidates = Some(rows.as_slice());
            }
            resolved.push((column, value));
        }

        let matches = |row: &usize| {
            let record = &self.records[*row];
            resolved
                .iter()
                .all(|(column, value)| record.values[*column] == **value)
        };
        let paths = match candidates {
            Some(rows) => rows
                .iter()
                .filter(|&row| matches(row))
                .map(|&row| self.records[row].path.as_path())
                .collect(),
            None => self.records.iter().map(|r| r.path.as_path()).collect(),
        };
        Ok(paths)
    }
}
