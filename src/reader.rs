//! Reading attributes and slice geometry from single-slice image files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use dicom::core::Tag;
use dicom::object::{DefaultDicomObject, OpenFileOptions, open_file};
use dicom::pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder, VoiLutOption};
use dicom_dictionary_std::tags;
use ndarray::s;
use thiserror::Error;

use crate::slice::{Rescale, SliceGeometry};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Attribute values of one file, keyed by tag.
///
/// Attributes absent from the file map to an empty string.
pub type AttributeMap = HashMap<Tag, String>;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("invalid DICOM file {}: {source}", .path.display())]
    InvalidFormat {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("missing geometric information in {}: {attribute}", .path.display())]
    IncompleteGeometry {
        path: PathBuf,
        attribute: &'static str,
    },

    #[error("could not decode pixel data of {}: {source}", .path.display())]
    PixelData {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

impl ReadError {
    pub fn invalid_format(path: &Path, source: impl Into<BoxError>) -> Self {
        ReadError::InvalidFormat {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }

    fn incomplete(path: &Path, attribute: &'static str) -> Self {
        ReadError::IncompleteGeometry {
            path: path.to_path_buf(),
            attribute,
        }
    }
}

/// Access to single-slice image files.
///
/// Implementations are shared between worker threads while a directory is
/// being indexed.
pub trait ImageReader: Sync {
    /// Read the requested attributes without touching pixel data.
    ///
    /// A tag that is absent from the file yields an empty string, never an
    /// error.
    fn read_header(&self, path: &Path, tags: &[Tag]) -> Result<AttributeMap, ReadError>;

    /// Read geometry, calibration and pixel values of one slice.
    fn read_geometry(&self, path: &Path) -> Result<SliceGeometry, ReadError>;
}

/// [`ImageReader`] backed by dicom-rs.
#[derive(Clone, Copy, Debug, Default)]
pub struct DicomReader;

impl ImageReader for DicomReader {
    fn read_header(&self, path: &Path, requested: &[Tag]) -> Result<AttributeMap, ReadError> {
        let dicom_object = OpenFileOptions::new()
            .read_until(tags::PIXEL_DATA)
            .open_file(path)
            .map_err(|e| ReadError::invalid_format(path, e))?;

        Ok(requested
            .iter()
            .map(|&tag| (tag, attribute_string(&dicom_object, tag)))
            .collect())
    }

    fn read_geometry(&self, path: &Path) -> Result<SliceGeometry, ReadError> {
        let dicom_object = open_file(path).map_err(|e| ReadError::invalid_format(path, e))?;
        let obj = &dicom_object;

        let position = required_floats::<3>(
            obj,
            path,
            tags::IMAGE_POSITION_PATIENT,
            "ImagePositionPatient",
        )?;
        let orientation = required_floats::<6>(
            obj,
            path,
            tags::IMAGE_ORIENTATION_PATIENT,
            "ImageOrientationPatient",
        )?;
        let pixel_spacing = required_floats::<2>(obj, path, tags::PIXEL_SPACING, "PixelSpacing")?;
        let slice_thickness = required_float(obj, path, tags::SLICE_THICKNESS, "SliceThickness")?;
        let rows = required_int::<u32>(obj, path, tags::ROWS, "Rows")?;
        let columns = required_int::<u32>(obj, path, tags::COLUMNS, "Columns")?;
        let slice_location = required_float(obj, path, tags::SLICE_LOCATION, "SliceLocation")?;
        let bits_allocated =
            required_int::<u16>(obj, path, tags::BITS_ALLOCATED, "BitsAllocated")?;
        let instance_number =
            required_int::<i32>(obj, path, tags::INSTANCE_NUMBER, "InstanceNumber")?;

        // Slope and intercept only count as a pair.
        let rescale = match (
            optional_float(obj, tags::RESCALE_SLOPE),
            optional_float(obj, tags::RESCALE_INTERCEPT),
        ) {
            (Some(slope), Some(intercept)) => Rescale { slope, intercept },
            _ => Rescale::IDENTITY,
        };
        let signed = obj
            .element_opt(tags::PIXEL_REPRESENTATION)
            .ok()
            .flatten()
            .and_then(|e| e.to_int::<u16>().ok())
            .is_some_and(|representation| representation == 1);

        let pixels = decode_first_frame(&dicom_object, path)?;

        Ok(SliceGeometry {
            path: path.to_path_buf(),
            position,
            orientation,
            pixel_spacing,
            slice_thickness,
            slice_location,
            rows,
            columns,
            bits_allocated,
            signed,
            instance_number,
            rescale,
            series_number: attribute_string(obj, tags::SERIES_NUMBER),
            pixels,
        })
    }
}

/// Render an attribute as text, or an empty string if it is absent or has
/// no textual form.
pub fn attribute_string(dicom_object: &DefaultDicomObject, tag: Tag) -> String {
    dicom_object
        .element_opt(tag)
        .ok()
        .flatten()
        .and_then(|element| element.to_str().ok())
        .map(|text| text.trim_matches(|c: char| c == ' ' || c == '\0').to_string())
        .unwrap_or_default()
}

fn decode_first_frame(
    dicom_object: &DefaultDicomObject,
    path: &Path,
) -> Result<ndarray::Array2<f64>, ReadError> {
    let pixel_error = |e: dicom::pixeldata::Error| ReadError::PixelData {
        path: path.to_path_buf(),
        source: Box::new(e),
    };
    let pixel_data = dicom_object.decode_pixel_data().map_err(pixel_error)?;
    // Rescale is applied by the volume loader, so stored values are kept raw.
    let options = ConvertOptions::new()
        .with_modality_lut(ModalityLutOption::None)
        .with_voi_lut(VoiLutOption::Identity);
    let frames = pixel_data
        .to_ndarray_with_options::<f64>(&options)
        .map_err(pixel_error)?;
    Ok(frames.slice_move(s![0, .., .., 0]))
}

fn required_float(
    obj: &DefaultDicomObject,
    path: &Path,
    tag: Tag,
    attribute: &'static str,
) -> Result<f64, ReadError> {
    obj.element_opt(tag)
        .ok()
        .flatten()
        .and_then(|e| e.to_float64().ok())
        .ok_or_else(|| ReadError::incomplete(path, attribute))
}

fn optional_float(obj: &DefaultDicomObject, tag: Tag) -> Option<f64> {
    obj.element_opt(tag).ok().flatten()?.to_float64().ok()
}

fn required_floats<const N: usize>(
    obj: &DefaultDicomObject,
    path: &Path,
    tag: Tag,
    attribute: &'static str,
) -> Result<[f64; N], ReadError> {
    obj.element_opt(tag)
        .ok()
        .flatten()
        .and_then(|e| e.to_multi_float64().ok())
        .and_then(|values| <[f64; N]>::try_from(values.get(..N)?).ok())
        .ok_or_else(|| ReadError::incomplete(path, attribute))
}

fn required_int<T: TryFrom<i64>>(
    obj: &DefaultDicomObject,
    path: &Path,
    tag: Tag,
    attribute: &'static str,
) -> Result<T, ReadError> {
    obj.element_opt(tag)
        .ok()
        .flatten()
        .and_then(|e| e.to_int::<i64>().ok())
        .and_then(|value| T::try_from(value).ok())
        .ok_or_else(|| ReadError::incomplete(path, attribute))
}
