//! In-memory reader used by unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use dicom::core::Tag;
use ndarray::Array2;

use crate::reader::{AttributeMap, ImageReader, ReadError};
use crate::slice::{Rescale, SliceGeometry};

#[derive(Debug, Default)]
pub(crate) struct FakeReader {
    headers: HashMap<PathBuf, HashMap<Tag, String>>,
    geometries: HashMap<PathBuf, SliceGeometry>,
}

impl FakeReader {
    pub(crate) fn add_header(&mut self, path: &Path, attributes: &[(Tag, &str)]) {
        self.headers.insert(
            path.to_path_buf(),
            attributes
                .iter()
                .map(|(tag, value)| (*tag, value.to_string()))
                .collect(),
        );
    }

    pub(crate) fn add_geometry(&mut self, slice: SliceGeometry) {
        self.geometries.insert(slice.path.clone(), slice);
    }
}

impl ImageReader for FakeReader {
    fn read_header(&self, path: &Path, tags: &[Tag]) -> Result<AttributeMap, ReadError> {
        let attributes = self
            .headers
            .get(path)
            .ok_or_else(|| ReadError::invalid_format(path, "not a DICOM file"))?;
        Ok(tags
            .iter()
            .map(|tag| (*tag, attributes.get(tag).cloned().unwrap_or_default()))
            .collect())
    }

    fn read_geometry(&self, path: &Path) -> Result<SliceGeometry, ReadError> {
        self.geometries
            .get(path)
            .cloned()
            .ok_or_else(|| ReadError::IncompleteGeometry {
                path: path.to_path_buf(),
                attribute: "ImagePositionPatient",
            })
    }
}

/// An unsigned 16-bit axial slice at `location` with 0.5 mm pixels.
pub(crate) fn axial_slice(path: &str, location: f64, pixels: Array2<f64>) -> SliceGeometry {
    let (rows, columns) = pixels.dim();
    SliceGeometry {
        path: PathBuf::from(path),
        position: [0.0, 0.0, location],
        orientation: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        pixel_spacing: [0.5, 0.5],
        slice_thickness: 1.0,
        slice_location: location,
        rows: rows as u32,
        columns: columns as u32,
        bits_allocated: 16,
        signed: false,
        instance_number: 1,
        rescale: Rescale::IDENTITY,
        series_number: "1".to_string(),
        pixels,
    }
}
