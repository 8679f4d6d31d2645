//! Output naming: path-safe composition of attribute values and collision
//! suffixes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Separator placed between the values that make up a composed name.
pub const SEPARATOR: char = '-';

/// Largest numeric suffix that fits the zero-padded 4-digit format.
const MAX_POSTFIX: u32 = 9999;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("no free name left for `{name}` in {}", .directory.display())]
pub struct NamingError {
    pub directory: PathBuf,
    pub name: String,
}

/// Make an attribute value usable inside a file name.
///
/// Path separators become `.`. DICOM joins multiple values with a
/// backslash, so `\` is treated like `/`.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|&c| c != '\0')
        .map(|c| if c == '/' || c == '\\' { '.' } else { c })
        .collect()
}

/// Extend `prefix` by one attribute value.
pub fn compose(prefix: Option<&str>, value: &str) -> String {
    let value = sanitize(value);
    match prefix {
        Some(prefix) => format!("{prefix}{SEPARATOR}{value}"),
        None => value,
    }
}

/// Insert `_NNNN` before the extension of `file_name`.
fn with_postfix(file_name: &str, postfix: u32) -> String {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match path.extension() {
        Some(ext) => format!("{stem}_{postfix:04}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{postfix:04}"),
    }
}

/// Hands out unique destination paths.
///
/// Names are unique among the paths this namer has handed out; with
/// [`OutputNamer::on_disk`] files that already exist in the destination are
/// avoided as well. On a collision a run-wide counter is appended as a
/// zero-padded suffix.
#[derive(Debug, Default)]
pub struct OutputNamer {
    claimed: HashSet<PathBuf>,
    postfix: u32,
    check_disk: bool,
}

impl OutputNamer {
    /// Avoid only names claimed during this run; existing files are
    /// overwritten.
    pub fn in_run() -> Self {
        Self::default()
    }

    /// Avoid claimed names and files already present on disk.
    pub fn on_disk() -> Self {
        Self {
            check_disk: true,
            ..Self::default()
        }
    }

    fn is_taken(&self, path: &Path) -> bool {
        self.claimed.contains(path) || (self.check_disk && path.exists())
    }

    pub fn claim(&mut self, directory: &Path, file_name: &str) -> Result<PathBuf, NamingError> {
        let mut candidate = directory.join(file_name);
        while self.is_taken(&candidate) {
            if self.postfix > MAX_POSTFIX {
                return Err(NamingError {
                    directory: directory.to_path_buf(),
                    name: file_name.to_string(),
                });
            }
            candidate = directory.join(with_postfix(file_name, self.postfix));
            self.postfix += 1;
        }
        self.claimed.insert(candidate.clone());
        Ok(candidate)
    }
}
