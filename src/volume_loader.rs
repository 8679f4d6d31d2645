use crate::{
    enums::SampleType,
    reader::{ImageReader, ReadError},
    slice::SliceGeometry,
    volume::{SpaceHeader, Volume, VoxelData},
};

use ndarray::{Array3, ShapeBuilder, s};
use rayon::prelude::*;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions: {0}")]
    InconsistentDimensions(String),

    #[error(transparent)]
    Read(#[from] ReadError),
}

impl VolumeLoaderError {
    /// True when a slice lacked a required geometric attribute.
    pub fn is_incomplete_geometry(&self) -> bool {
        matches!(
            self,
            VolumeLoaderError::Read(ReadError::IncompleteGeometry { .. })
        )
    }
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Load a volume from file paths
    ///
    /// All slices are read before anything is assembled; a single slice
    /// with missing geometry fails the whole volume.
    ///
    /// # Errors
    ///
    /// Returns error if no paths are given, a slice cannot be read, or the
    /// slices differ in size
    pub fn load_from_file_paths<R: ImageReader>(
        reader: &R,
        paths: &[PathBuf],
    ) -> Result<Volume, VolumeLoaderError> {
        if paths.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        let slices = paths
            .par_iter()
            .map(|path| reader.read_geometry(path))
            .collect::<Result<Vec<_>, _>>()?;

        Self::load_from_slices(slices)
    }

    /// Load a volume from slices already in memory
    pub fn load_from_slices(mut slices: Vec<SliceGeometry>) -> Result<Volume, VolumeLoaderError> {
        let Some(last) = slices.last() else {
            return Err(VolumeLoaderError::NoValidImages);
        };
        let series_number = last.series_number.clone();

        Self::sort_slices(&mut slices);
        Self::validate_dimensions(&slices)?;

        let sample_type = Self::get_sample_type(&slices);
        let volume_array = Self::build_volume_array(&slices);
        let spacing = Self::get_spacing(&slices);

        let first = &slices[0];
        let header = SpaceHeader::from_cosines(
            first.position,
            first.row_cosines(),
            first.column_cosines(),
            spacing,
        );
        debug!(
            slices = slices.len(),
            ?spacing,
            ?sample_type,
            "Assembled volume"
        );

        Ok(Volume::new(
            VoxelData::from_calibrated(volume_array, sample_type),
            spacing,
            header,
            series_number,
        ))
    }

    /// Ascending SliceLocation; ties keep their input order.
    fn sort_slices(slices: &mut [SliceGeometry]) {
        slices.sort_by(|a, b| {
            a.slice_location
                .partial_cmp(&b.slice_location)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    fn validate_dimensions(slices: &[SliceGeometry]) -> Result<(), VolumeLoaderError> {
        let first_dim = slices[0].pixels.dim();
        for slice in slices {
            let declared = (slice.rows as usize, slice.columns as usize);
            if slice.pixels.dim() != first_dim || declared != first_dim {
                return Err(VolumeLoaderError::InconsistentDimensions(format!(
                    "{} is {}x{}, expected {}x{}",
                    slice.path.display(),
                    declared.0,
                    declared.1,
                    first_dim.0,
                    first_dim.1
                )));
            }
        }
        Ok(())
    }

    /// Common calibrated representation of all slices; mixed groups fall
    /// back to double precision.
    fn get_sample_type(slices: &[SliceGeometry]) -> SampleType {
        let first = slices[0].calibrated_type();
        if slices.iter().all(|s| s.calibrated_type() == first) {
            first
        } else {
            SampleType::F64
        }
    }

    /// Stack the transposed, calibrated slices along the third axis.
    ///
    /// The array is column-major so that the first axis is contiguous.
    fn build_volume_array(slices: &[SliceGeometry]) -> Array3<f64> {
        let (height, width) = slices[0].pixels.dim();
        let depth = slices.len();
        let mut volume = Array3::<f64>::zeros((width, height, depth).f());

        for (i, slice) in slices.iter().enumerate() {
            volume
                .slice_mut(s![.., .., i])
                .assign(&slice.calibrated().t());
        }

        volume
    }

    /// In-plane spacing of the first slice, then the slice spacing: the
    /// thickness for a single slice, otherwise the signed distance between
    /// the first two slice locations.
    fn get_spacing(slices: &[SliceGeometry]) -> [f64; 3] {
        let first = &slices[0];
        let slice_spacing = match slices {
            [first, second, ..] => second.slice_location - first.slice_location,
            _ => first.slice_thickness,
        };
        [
            first.pixel_spacing[0],
            first.pixel_spacing[1],
            slice_spacing,
        ]
    }
}
