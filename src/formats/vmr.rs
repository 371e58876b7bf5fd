//! VMR anatomical volumes (1 byte per voxel).
//!
//! A VMR is a small pre-data header, the voxel block, then an extensive
//! post-data header holding scan position information and the history of
//! spatial transformations applied to the data set. File versions 1 and 2
//! lack the offset entries, version 3 added them, and version 4 added the
//! reference-space field.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::ArrayD;

use crate::axis;
use crate::error::Result;
use crate::formats;
use crate::header::Header;
use crate::schema::{self, Count, Presence, ScalarKind, Step};

const PRE_HEADER: &[Step] = &[
    Step::scalar("FileVersion", ScalarKind::U16),
    Step::scalar("DimX", ScalarKind::U16),
    Step::scalar("DimY", ScalarKind::U16),
    Step::scalar("DimZ", ScalarKind::U16),
];

const POST_HEADER: &[Step] = &[
    // Offsets and framing cube were added in file version 3.
    Step::scalar_if("OffsetX", ScalarKind::I16, Presence::MinVersion(3)),
    Step::scalar_if("OffsetY", ScalarKind::I16, Presence::MinVersion(3)),
    Step::scalar_if("OffsetZ", ScalarKind::I16, Presence::MinVersion(3)),
    Step::scalar_if("FramingCubeDim", ScalarKind::I16, Presence::MinVersion(3)),
    Step::scalar("PosInfosVerified", ScalarKind::I32),
    Step::scalar("CoordinateSystem", ScalarKind::I32),
    Step::scalar("Slice1CenterX", ScalarKind::F32),
    Step::scalar("Slice1CenterY", ScalarKind::F32),
    Step::scalar("Slice1CenterZ", ScalarKind::F32),
    Step::scalar("SliceNCenterX", ScalarKind::F32),
    Step::scalar("SliceNCenterY", ScalarKind::F32),
    Step::scalar("SliceNCenterZ", ScalarKind::F32),
    Step::scalar("RowDirX", ScalarKind::F32),
    Step::scalar("RowDirY", ScalarKind::F32),
    Step::scalar("RowDirZ", ScalarKind::F32),
    Step::scalar("ColDirX", ScalarKind::F32),
    Step::scalar("ColDirY", ScalarKind::F32),
    Step::scalar("ColDirZ", ScalarKind::F32),
    Step::scalar("NRows", ScalarKind::I32),
    Step::scalar("NCols", ScalarKind::I32),
    Step::scalar("FoVRows", ScalarKind::F32),
    Step::scalar("FoVCols", ScalarKind::F32),
    Step::scalar("SliceThickness", ScalarKind::F32),
    Step::scalar("GapThickness", ScalarKind::F32),
    Step::scalar("NrOfPastSpatialTransformations", ScalarKind::I32),
    Step::Repeat {
        name: "PastTransformation",
        count: Count::LocalField("NrOfPastSpatialTransformations"),
        steps: &[
            Step::scalar("Name", ScalarKind::CString),
            Step::scalar("Type", ScalarKind::I32),
            Step::scalar("SourceFileName", ScalarKind::CString),
            Step::scalar("NrOfValues", ScalarKind::I32),
            Step::F32Array {
                name: "Values",
                count: Count::LocalField("NrOfValues"),
                presence: Presence::Always,
            },
        ],
    },
    Step::scalar("LeftRightConvention", ScalarKind::U8),
    Step::scalar_if("ReferenceSpaceVMR", ScalarKind::U8, Presence::MinVersion(4)),
    Step::scalar("VoxelSizeX", ScalarKind::F32),
    Step::scalar("VoxelSizeY", ScalarKind::F32),
    Step::scalar("VoxelSizeZ", ScalarKind::F32),
    Step::scalar("VoxelResolutionVerified", ScalarKind::U8),
    Step::scalar("VoxelResolutionInTALmm", ScalarKind::U8),
    Step::scalar("VMROrigV16MinValue", ScalarKind::I32),
    Step::scalar("VMROrigV16MeanValue", ScalarKind::I32),
    Step::scalar("VMROrigV16MaxValue", ScalarKind::I32),
];

fn native_dims(header: &Header) -> Result<Vec<usize>> {
    Ok(vec![
        crate::layout::positive_dim(header, "DimZ")?,
        crate::layout::positive_dim(header, "DimY")?,
        crate::layout::positive_dim(header, "DimX")?,
    ])
}

/// Decode a VMR from a stream. The returned volume is in canonical axis
/// order; the voxel block on disk runs Z, Y, X.
pub fn read_from<R: Read>(reader: &mut R) -> Result<(Header, ArrayD<u8>)> {
    let mut header = schema::decode(reader, PRE_HEADER)?;
    let volume = formats::read_u8_volume(reader, &native_dims(&header)?)?;
    schema::decode_append(reader, POST_HEADER, &mut header)?;
    Ok((header, axis::VOLUME_3D.to_canonical(volume)))
}

pub fn read<P: AsRef<Path>>(path: P) -> Result<(Header, ArrayD<u8>)> {
    let mut reader = BufReader::new(File::open(path)?);
    read_from(&mut reader)
}

pub fn write_to<W: Write>(writer: &mut W, header: &Header, volume: &ArrayD<u8>) -> Result<()> {
    let dims = native_dims(header)?;
    let native = axis::VOLUME_3D.to_native(volume.clone());
    formats::expect_shape(native.shape(), &dims)?;
    schema::encode(writer, PRE_HEADER, header)?;
    formats::write_u8_volume(writer, &native)?;
    schema::encode(writer, POST_HEADER, header)
}

pub fn write<P: AsRef<Path>>(path: P, header: &Header, volume: &ArrayD<u8>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_to(&mut writer, header, volume)
}

/// A complete version 4 header for a new volume of the given dimensions,
/// with neutral position information.
pub fn default_header(dim_x: u16, dim_y: u16, dim_z: u16) -> Header {
    let mut header = Header::new();
    header.set_int("FileVersion", 4);
    header.set_int("DimX", i64::from(dim_x));
    header.set_int("DimY", i64::from(dim_y));
    header.set_int("DimZ", i64::from(dim_z));
    header.set_int("OffsetX", 0);
    header.set_int("OffsetY", 0);
    header.set_int("OffsetZ", 0);
    header.set_int(
        "FramingCubeDim",
        i64::from(dim_x.max(dim_y).max(dim_z)),
    );
    header.set_int("PosInfosVerified", 0);
    header.set_int("CoordinateSystem", 1);
    header.set_float("Slice1CenterX", 127.5);
    header.set_float("Slice1CenterY", 0.0);
    header.set_float("Slice1CenterZ", 0.0);
    header.set_float("SliceNCenterX", -127.5);
    header.set_float("SliceNCenterY", 0.0);
    header.set_float("SliceNCenterZ", 0.0);
    header.set_float("RowDirX", 0.0);
    header.set_float("RowDirY", 1.0);
    header.set_float("RowDirZ", 0.0);
    header.set_float("ColDirX", 0.0);
    header.set_float("ColDirY", 0.0);
    header.set_float("ColDirZ", -1.0);
    header.set_int("NRows", i64::from(dim_y));
    header.set_int("NCols", i64::from(dim_x));
    header.set_float("FoVRows", f64::from(dim_y));
    header.set_float("FoVCols", f64::from(dim_x));
    header.set_float("SliceThickness", 1.0);
    header.set_float("GapThickness", 0.0);
    header.set_int("NrOfPastSpatialTransformations", 0);
    header.set(
        "PastTransformation",
        crate::header::FieldValue::Blocks(Vec::new()),
    );
    header.set_int("LeftRightConvention", 1);
    header.set_int("ReferenceSpaceVMR", 0);
    header.set_float("VoxelSizeX", 1.0);
    header.set_float("VoxelSizeY", 1.0);
    header.set_float("VoxelSizeZ", 1.0);
    header.set_int("VoxelResolutionVerified", 1);
    header.set_int("VoxelResolutionInTALmm", 0);
    header.set_int("VMROrigV16MinValue", 0);
    header.set_int("VMROrigV16MeanValue", 0);
    header.set_int("VMROrigV16MaxValue", 0);
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;
    use std::io::Cursor;

    fn roundtrip(header: &Header, volume: &ArrayD<u8>) -> (Header, ArrayD<u8>) {
        let mut bytes = Vec::new();
        write_to(&mut bytes, header, volume).unwrap();
        let (back_header, back_volume) = read_from(&mut Cursor::new(&bytes)).unwrap();
        // Re-encoding the decoded pair reproduces the stream.
        let mut again = Vec::new();
        write_to(&mut again, &back_header, &back_volume).unwrap();
        assert_eq!(again, bytes);
        (back_header, back_volume)
    }

    #[test]
    fn zero_volume_roundtrip_v4() {
        let header = default_header(4, 4, 4);
        let volume = ArrayD::zeros(IxDyn(&[4, 4, 4]));
        let (back_header, back_volume) = roundtrip(&header, &volume);

        assert_eq!(back_volume.shape(), &[4, 4, 4]);
        assert!(back_volume.iter().all(|&v| v == 0));
        assert_eq!(back_header.get_int("VMROrigV16MinValue"), Some(0));
        assert_eq!(back_header.get_int("VMROrigV16MeanValue"), Some(0));
        assert_eq!(back_header.get_int("VMROrigV16MaxValue"), Some(0));
    }

    #[test]
    fn version_2_lacks_offset_and_reference_space() {
        let mut header = default_header(2, 2, 2);
        header.set_int("FileVersion", 2);
        let volume = ArrayD::zeros(IxDyn(&[2, 2, 2]));
        let (back_header, _) = roundtrip(&header, &volume);
        assert!(!back_header.contains("OffsetX"));
        assert!(!back_header.contains("FramingCubeDim"));
        assert!(!back_header.contains("ReferenceSpaceVMR"));
        assert!(back_header.contains("LeftRightConvention"));
    }

    #[test]
    fn past_transformations_roundtrip() {
        let mut header = default_header(2, 3, 4);
        header.set_int("NrOfPastSpatialTransformations", 1);
        let mut transform = Header::new();
        transform.set_str("Name", "ACPC transformation");
        transform.set_int("Type", 2);
        transform.set_str("SourceFileName", "sub-01.vmr");
        transform.set_int("NrOfValues", 16);
        let mut values = vec![0.0f32; 16];
        for i in 0..4 {
            values[i * 4 + i] = 1.0;
        }
        transform.set(
            "Values",
            crate::header::FieldValue::FloatList(values.clone()),
        );
        header.set(
            "PastTransformation",
            crate::header::FieldValue::Blocks(vec![transform]),
        );

        // Canonical shape for (DimZ, DimX, DimY) = (4, 2, 3).
        let volume = ArrayD::zeros(IxDyn(&[4, 2, 3]));
        let (back_header, _) = roundtrip(&header, &volume);
        let blocks = back_header.require_blocks("PastTransformation").unwrap();
        assert_eq!(blocks[0].get_str("Name"), Some("ACPC transformation"));
        assert_eq!(
            blocks[0].require_float_list("Values").unwrap(),
            values.as_slice()
        );
    }

    #[test]
    fn voxel_values_survive_axis_reordering() {
        let header = default_header(3, 4, 5);
        // Canonical shape for a (Z, Y, X) = (5, 4, 3) native volume.
        let mut volume: ArrayD<u8> = ArrayD::zeros(IxDyn(&[5, 3, 4]));
        volume[[0, 0, 0]] = 7;
        volume[[4, 2, 3]] = 9;
        let (_, back_volume) = roundtrip(&header, &volume);
        assert_eq!(back_volume, volume);
    }
}
