//! # DICOM-NRRD library
//!
//! This crate groups single-slice DICOM files into series by an arbitrary
//! combination of attribute tags and reconstructs every series into an
//! oriented, spaced and calibrated 3D volume written as NRRD.

//!
//! A run goes through three stages:
//!  - A [`SeriesIndex`] is built over a source directory, holding the value
//!    of every requested tag for every readable file. Headers are read in
//!    parallel using rayon.
//!  - The [`Grouper`] walks the tags depth-first and partitions the index by
//!    the tags' distinct values. Every non-empty combination becomes one
//!    series, named after its values (`3-AX` for SeriesNumber 3 and
//!    SeriesDescription AX).
//!  - The [`VolumeLoader`] sorts the slices of one series by SliceLocation,
//!    applies the rescale slope and intercept and stacks them into a volume
//!    whose header maps voxel indices to patient coordinates
//!    (left-posterior-superior).
//!
//! DICOM files are assumed to have the following attributes:
//!  - No multiframe (always the first frame is used)
//!  - ImagePositionPatient, ImageOrientationPatient, PixelSpacing,
//!    SliceThickness, SliceLocation, Rows, Columns, BitsAllocated and
//!    InstanceNumber on every slice; a series with a slice missing any of
//!    them is skipped
//!
//! A second tool, [`select`], copies or moves files whose attributes match
//! `tag=value` filters.
//!
//! # Examples
//!
//! ## Converting a directory
//!
//! Group all files of `dicom/` by SeriesNumber and write one volume per
//! series to `nrrd/`.
//!
//! ```no_run
//! # use dicom_nrrd::{ConvertConfig, DicomReader, NrrdWriter, convert};
//! let config = ConvertConfig::new(&["0020,0011"], "dicom", "nrrd", false)
//!     .expect("tag syntax should be valid");
//! let report = convert::run(&config, &DicomReader, &NrrdWriter)
//!     .expect("source directory should be readable");
//! println!("wrote {} volumes", report.written.len());
//! ```
//!
//! ## Loading one series
//!
//! ```no_run
//! # use dicom_nrrd::{DicomReader, VolumeLoader};
//! # use std::path::PathBuf;
//! let paths = vec![PathBuf::from("dicom/1.dcm"), PathBuf::from("dicom/2.dcm")];
//! let volume = VolumeLoader::load_from_file_paths(&DicomReader, &paths)
//!     .expect("should have loaded the series");
//! println!("{:?} voxels, spacing {:?}", volume.dim(), volume.spacing);
//! ```

pub mod convert;
pub mod enums;
pub mod grouper;
pub mod index;
pub mod naming;
pub mod nrrd;
pub mod reader;
pub mod select;
pub mod slice;
pub mod tag;
pub mod volume;
pub mod volume_loader;

#[cfg(test)]
mod testing;

pub use convert::ConvertConfig;
pub use grouper::{Grouper, SeriesGroup};
pub use index::SeriesIndex;
pub use nrrd::NrrdWriter;
pub use reader::{DicomReader, ImageReader};
pub use select::SelectConfig;
pub use volume::{Volume, VolumeWriter};
pub use volume_loader::VolumeLoader;
