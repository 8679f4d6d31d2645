//! NRRD volume writer.
//!
//! Produces attached-header `NRRD0004` files with raw encoding.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use bytemuck::Pod;
use ndarray::Array3;

use crate::volume::{Volume, VolumeWriter, VoxelData, WriteError};

#[derive(Clone, Copy, Debug, Default)]
pub struct NrrdWriter;

impl VolumeWriter for NrrdWriter {
    fn extension(&self) -> &str {
        "nrrd"
    }

    fn write(&self, path: &Path, volume: &Volume) -> Result<(), WriteError> {
        let io_error = |source| WriteError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_error)?;
        let mut out = BufWriter::new(file);
        write_nrrd(&mut out, volume).map_err(io_error)?;
        out.flush().map_err(io_error)
    }
}

/// Write header and payload of `volume` to `out`.
pub fn write_nrrd<W: Write>(out: &mut W, volume: &Volume) -> io::Result<()> {
    out.write_all(header(volume).as_bytes())?;
    match &volume.data {
        VoxelData::I8(a) => write_payload(out, a),
        VoxelData::U8(a) => write_payload(out, a),
        VoxelData::I16(a) => write_payload(out, a),
        VoxelData::U16(a) => write_payload(out, a),
        VoxelData::I32(a) => write_payload(out, a),
        VoxelData::U32(a) => write_payload(out, a),
        VoxelData::F64(a) => write_payload(out, a),
    }
}

/// Text header, including the blank line that ends it.
pub fn header(volume: &Volume) -> String {
    let (columns, rows, slices) = volume.dim();
    let endian = if cfg!(target_endian = "big") {
        "big"
    } else {
        "little"
    };
    let directions: Vec<String> = volume
        .header
        .directions
        .iter()
        .map(vector)
        .collect();

    let mut text = String::from("NRRD0004\n");
    text.push_str("# Complete NRRD file format specification at:\n");
    text.push_str("# http://teem.sourceforge.net/nrrd/format.html\n");
    text.push_str(&format!("type: {}\n", volume.data.sample_type().nrrd_name()));
    text.push_str("dimension: 3\n");
    text.push_str(&format!("space: {}\n", volume.header.space));
    text.push_str(&format!("sizes: {columns} {rows} {slices}\n"));
    text.push_str(&format!("space directions: {}\n", directions.join(" ")));
    text.push_str("kinds: domain domain domain\n");
    text.push_str(&format!("endian: {endian}\n"));
    text.push_str("encoding: raw\n");
    text.push_str(&format!("space origin: {}\n", vector(&volume.header.origin)));
    text.push('\n');
    text
}

fn vector(values: &[f64; 3]) -> String {
    // keep -0 from printing as "-0"
    let [x, y, z] = (*values).map(|v| if v == 0.0 { 0.0 } else { v });
    format!("({x},{y},{z})")
}

/// Raw samples in native byte order, first axis varying fastest.
fn write_payload<T: Pod, W: Write>(out: &mut W, data: &Array3<T>) -> io::Result<()> {
    let fastest_first = data.t();
    if let Some(values) = fastest_first.to_slice() {
        return out.write_all(bytemuck::cast_slice(values));
    }
    let values: Vec<T> = fastest_first.iter().copied().collect();
    out.write_all(bytemuck::cast_slice(&values))
}
