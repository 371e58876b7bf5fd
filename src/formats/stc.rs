//! STC slice time courses.
//!
//! The binary companion of an FMR header: a raw element block with no
//! header of its own. Dimensions and element type come from the FMR file,
//! which is why every entry point takes them as parameters. The on-disk
//! loop order is slice, volume, row, column.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::axis;
use crate::error::{Error, Result};
use crate::formats::{self, VolumeData};

/// Payload geometry taken from the owning FMR or DMR header.
#[derive(Debug, Clone, Copy)]
pub struct SliceDims {
    pub nr_slices: usize,
    pub nr_volumes: usize,
    pub res_x: usize,
    pub res_y: usize,
}

impl SliceDims {
    fn native(self) -> [usize; 4] {
        [self.nr_slices, self.nr_volumes, self.res_x, self.res_y]
    }
}

/// Read an STC (or DWI) payload, returning it in canonical axis order.
/// `data_type` is the FMR `DataType` entry: 1 = unsigned short, 2 = float.
pub fn read_from<R: Read>(reader: &mut R, dims: SliceDims, data_type: i64) -> Result<VolumeData> {
    let native = dims.native();
    match data_type {
        1 => Ok(VolumeData::U16(
            axis::SLICE_TIMECOURSE.to_canonical(formats::read_u16_volume(reader, &native)?),
        )),
        2 => Ok(VolumeData::F32(
            axis::SLICE_TIMECOURSE.to_canonical(formats::read_f32_volume(reader, &native)?),
        )),
        other => Err(Error::UnsupportedDataType(other)),
    }
}

pub fn read<P: AsRef<Path>>(path: P, dims: SliceDims, data_type: i64) -> Result<VolumeData> {
    let mut reader = BufReader::new(File::open(path)?);
    read_from(&mut reader, dims, data_type)
}

pub fn write_to<W: Write>(writer: &mut W, dims: SliceDims, data: &VolumeData) -> Result<()> {
    let native_dims = dims.native();
    match data {
        VolumeData::U16(volume) => {
            let native = axis::SLICE_TIMECOURSE.to_native(volume.clone());
            formats::expect_shape(native.shape(), &native_dims)?;
            formats::write_u16_volume(writer, &native)
        }
        VolumeData::F32(volume) => {
            let native = axis::SLICE_TIMECOURSE.to_native(volume.clone());
            formats::expect_shape(native.shape(), &native_dims)?;
            formats::write_f32_volume(writer, &native)
        }
        other => Err(Error::UnsupportedDataType(other.type_code())),
    }
}

pub fn write<P: AsRef<Path>>(path: P, dims: SliceDims, data: &VolumeData) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_to(&mut writer, dims, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};
    use std::io::Cursor;

    const DIMS: SliceDims = SliceDims {
        nr_slices: 3,
        nr_volumes: 4,
        res_x: 2,
        res_y: 5,
    };

    #[test]
    fn float_roundtrip() {
        // Canonical shape (res_y, res_x, slices, volumes).
        let mut volume: ArrayD<f32> = ArrayD::zeros(IxDyn(&[5, 2, 3, 4]));
        volume[[4, 1, 2, 3]] = 0.25;
        let data = VolumeData::F32(volume);

        let mut bytes = Vec::new();
        write_to(&mut bytes, DIMS, &data).unwrap();
        assert_eq!(bytes.len(), 4 * 120);
        let back = read_from(&mut Cursor::new(&bytes), DIMS, 2).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn short_roundtrip() {
        let mut volume: ArrayD<u16> = ArrayD::zeros(IxDyn(&[5, 2, 3, 4]));
        volume[[0, 0, 0, 0]] = 900;
        let data = VolumeData::U16(volume);

        let mut bytes = Vec::new();
        write_to(&mut bytes, DIMS, &data).unwrap();
        let back = read_from(&mut Cursor::new(&bytes), DIMS, 1).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn truncated_payload_is_reported() {
        let bytes = vec![0u8; 100];
        assert!(matches!(
            read_from(&mut Cursor::new(&bytes), DIMS, 2),
            Err(Error::TruncatedInput)
        ));
    }
}
