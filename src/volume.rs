use std::path::{Path, PathBuf};

use ndarray::{Array3, Zip};
use thiserror::Error;

use crate::enums::SampleType;

/// Physical space all volumes are expressed in.
pub const SPACE: &str = "left-posterior-superior";

/// Voxel values in the representation chosen by the calibration policy.
///
/// Arrays are indexed as `[column, row, slice]`.
#[derive(Clone, Debug, PartialEq)]
pub enum VoxelData {
    I8(Array3<i8>),
    U8(Array3<u8>),
    I16(Array3<i16>),
    U16(Array3<u16>),
    I32(Array3<i32>),
    U32(Array3<u32>),
    F64(Array3<f64>),
}

macro_rules! cast_to {
    ($values:expr, $t:ty) => {
        Zip::from(&$values).par_map_collect(|&v| v as $t)
    };
}

impl VoxelData {
    /// Convert calibrated values into `sample_type`.
    ///
    /// Float to integer conversion truncates toward zero and saturates at
    /// the bounds of the target type. Only a negative intercept forces a
    /// type that may not hold every calibrated value.
    pub fn from_calibrated(values: Array3<f64>, sample_type: SampleType) -> Self {
        match sample_type {
            SampleType::I8 => VoxelData::I8(cast_to!(values, i8)),
            SampleType::U8 => VoxelData::U8(cast_to!(values, u8)),
            SampleType::I16 => VoxelData::I16(cast_to!(values, i16)),
            SampleType::U16 => VoxelData::U16(cast_to!(values, u16)),
            SampleType::I32 => VoxelData::I32(cast_to!(values, i32)),
            SampleType::U32 => VoxelData::U32(cast_to!(values, u32)),
            SampleType::F64 => VoxelData::F64(values),
        }
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            VoxelData::I8(_) => SampleType::I8,
            VoxelData::U8(_) => SampleType::U8,
            VoxelData::I16(_) => SampleType::I16,
            VoxelData::U16(_) => SampleType::U16,
            VoxelData::I32(_) => SampleType::I32,
            VoxelData::U32(_) => SampleType::U32,
            VoxelData::F64(_) => SampleType::F64,
        }
    }

    /// Get the dimensions of the volume (columns, rows, slices)
    pub fn dim(&self) -> (usize, usize, usize) {
        match self {
            VoxelData::I8(a) => a.dim(),
            VoxelData::U8(a) => a.dim(),
            VoxelData::I16(a) => a.dim(),
            VoxelData::U16(a) => a.dim(),
            VoxelData::I32(a) => a.dim(),
            VoxelData::U32(a) => a.dim(),
            VoxelData::F64(a) => a.dim(),
        }
    }

    /// Value at `[column, row, slice]` widened to `f64`.
    pub fn get(&self, index: [usize; 3]) -> Option<f64> {
        match self {
            VoxelData::I8(a) => a.get(index).map(|&v| f64::from(v)),
            VoxelData::U8(a) => a.get(index).map(|&v| f64::from(v)),
            VoxelData::I16(a) => a.get(index).map(|&v| f64::from(v)),
            VoxelData::U16(a) => a.get(index).map(|&v| f64::from(v)),
            VoxelData::I32(a) => a.get(index).map(|&v| f64::from(v)),
            VoxelData::U32(a) => a.get(index).map(|&v| f64::from(v)),
            VoxelData::F64(a) => a.get(index).copied(),
        }
    }
}

/// Mapping from array indices to physical coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct SpaceHeader {
    /// Position of voxel `[0, 0, 0]`.
    pub origin: [f64; 3],
    /// One vector per array axis: the axis direction scaled by its spacing.
    pub directions: [[f64; 3]; 3],
    pub space: &'static str,
}

impl SpaceHeader {
    /// Header of a volume whose slices have the given row and column
    /// direction cosines.
    ///
    /// The third axis is their cross product. Each axis direction is scaled
    /// by the matching entry of `spacing`, sign included.
    pub fn from_cosines(
        origin: [f64; 3],
        row_cosines: [f64; 3],
        column_cosines: [f64; 3],
        spacing: [f64; 3],
    ) -> Self {
        let normal = cross(row_cosines, column_cosines);
        let axes = [row_cosines, column_cosines, normal];
        let directions = std::array::from_fn(|axis| axes[axis].map(|c| c * spacing[axis]));
        Self {
            origin,
            directions,
            space: SPACE,
        }
    }
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[derive(Clone, Debug)]
pub struct Volume {
    pub data: VoxelData,
    /// In-plane spacing followed by the signed slice spacing.
    pub spacing: [f64; 3],
    pub header: SpaceHeader,
    /// SeriesNumber of the last slice read, used for default names.
    pub series_number: String,
}

impl Volume {
    pub fn new(
        data: VoxelData,
        spacing: [f64; 3],
        header: SpaceHeader,
        series_number: String,
    ) -> Self {
        Self {
            data,
            spacing,
            header,
            series_number,
        }
    }

    /// Get the dimensions of the volume (columns, rows, slices)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &VoxelData {
        &self.data
    }

    /// Name used when the caller has no composed name: `output<SeriesNumber>`.
    pub fn default_name(&self) -> String {
        format!("output{}", self.series_number)
    }
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("could not write volume {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Serializes volumes to disk.
pub trait VolumeWriter {
    /// File extension of the produced files, without the dot.
    fn extension(&self) -> &str;

    fn write(&self, path: &Path, volume: &Volume) -> Result<(), WriteError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn axial_header_scales_each_axis() {
        let header = SpaceHeader::from_cosines(
            [-100.0, -120.0, 30.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.5, 0.75, 2.5],
        );
        assert_eq!(
            header.directions,
            [[0.5, 0.0, 0.0], [0.0, 0.75, 0.0], [0.0, 0.0, 2.5]]
        );
        assert_eq!(header.origin, [-100.0, -120.0, 30.0]);
        assert_eq!(header.space, SPACE);
    }

    #[test]
    fn coronal_normal_follows_cross_product() {
        let header = SpaceHeader::from_cosines(
            [0.0; 3],
            [1.0, 0.0, 0.0],
            [0.0, 0.0, -1.0],
            [1.0, 1.0, 3.0],
        );
        assert_eq!(header.directions[2], [0.0, 3.0, 0.0]);
    }

    #[test]
    fn negative_spacing_flips_the_slice_axis() {
        let header =
            SpaceHeader::from_cosines([0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, -2.0]);
        assert_eq!(header.directions[2], [0.0, 0.0, -2.0]);
    }

    #[test]
    fn calibrated_values_are_cast() {
        let values = array![[[-1024.7, 12.2]], [[70000.0, 3.9]]];
        let data = VoxelData::from_calibrated(values.clone(), SampleType::I16);
        assert_eq!(data.sample_type(), SampleType::I16);
        assert_eq!(data.dim(), (2, 1, 2));
        assert_eq!(data.get([0, 0, 0]), Some(-1024.0));
        assert_eq!(data.get([1, 0, 0]), Some(f64::from(i16::MAX)));
        assert_eq!(data.get([2, 0, 0]), None);

        let data = VoxelData::from_calibrated(values, SampleType::F64);
        assert_eq!(data.get([1, 0, 1]), Some(3.9));
    }
}
