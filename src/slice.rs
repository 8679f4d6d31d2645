//! Per-slice geometry and intensity calibration.

use std::path::PathBuf;

use ndarray::Array2;

use crate::enums::SampleType;

/// Linear calibration `calibrated = raw * slope + intercept`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rescale {
    pub slope: f64,
    pub intercept: f64,
}

impl Rescale {
    pub const IDENTITY: Rescale = Rescale {
        slope: 1.0,
        intercept: 0.0,
    };

    /// Representation the calibrated values of a slice are kept in.
    ///
    /// A negative intercept always narrows to signed 16 bits so that values
    /// such as Hounsfield units keep their sign. Otherwise the stored
    /// representation is kept, unless the calibration is fractional, in which
    /// case values stay in double precision.
    pub fn output_type(&self, native: SampleType) -> SampleType {
        if self.intercept < 0.0 {
            SampleType::I16
        } else if self.slope.fract() == 0.0 && self.intercept.fract() == 0.0 {
            native
        } else {
            SampleType::F64
        }
    }

    pub fn apply(&self, raw: f64) -> f64 {
        raw * self.slope + self.intercept
    }
}

impl Default for Rescale {
    fn default() -> Self {
        Rescale::IDENTITY
    }
}

/// Everything needed to place one slice in a volume.
///
/// Only lives while its group is being reconstructed.
#[derive(Clone, Debug)]
pub struct SliceGeometry {
    pub path: PathBuf,
    /// ImagePositionPatient: physical position of the first voxel.
    pub position: [f64; 3],
    /// ImageOrientationPatient: row direction cosines followed by column
    /// direction cosines.
    pub orientation: [f64; 6],
    pub pixel_spacing: [f64; 2],
    pub slice_thickness: f64,
    pub slice_location: f64,
    pub rows: u32,
    pub columns: u32,
    pub bits_allocated: u16,
    pub signed: bool,
    pub instance_number: i32,
    pub rescale: Rescale,
    pub series_number: String,
    /// Stored pixel values, indexed as `[row, column]`.
    pub pixels: Array2<f64>,
}

impl SliceGeometry {
    pub fn row_cosines(&self) -> [f64; 3] {
        [self.orientation[0], self.orientation[1], self.orientation[2]]
    }

    pub fn column_cosines(&self) -> [f64; 3] {
        [self.orientation[3], self.orientation[4], self.orientation[5]]
    }

    pub fn native_type(&self) -> SampleType {
        SampleType::native(self.bits_allocated, self.signed)
    }

    /// Representation of the calibrated values of this slice.
    ///
    /// When the policy keeps the stored representation but the calibrated
    /// values leave its range, the smallest integer type holding them is
    /// used instead, or double precision if none does.
    pub fn calibrated_type(&self) -> SampleType {
        let native = self.native_type();
        let sample_type = self.rescale.output_type(native);
        if sample_type != native || self.rescale.intercept < 0.0 {
            return sample_type;
        }
        let (min, max) = self.calibrated_range();
        [native, SampleType::I16, SampleType::I32, SampleType::U32]
            .into_iter()
            .find(|t| t.holds(min, max))
            .unwrap_or(SampleType::F64)
    }

    /// Smallest and largest calibrated value.
    pub fn calibrated_range(&self) -> (f64, f64) {
        let (lo, hi) = self
            .pixels
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if lo > hi {
            return (0.0, 0.0);
        }
        let (a, b) = (self.rescale.apply(lo), self.rescale.apply(hi));
        (a.min(b), a.max(b))
    }

    /// Pixel values with the rescale applied, still `[row, column]`.
    pub fn calibrated(&self) -> Array2<f64> {
        if self.rescale == Rescale::IDENTITY {
            return self.pixels.clone();
        }
        let rescale = self.rescale;
        let mut values = self.pixels.clone();
        values.par_mapv_inplace(|v| rescale.apply(v));
        values
    }
}
