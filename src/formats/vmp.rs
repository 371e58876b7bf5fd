//! NR-VMP volume maps.
//!
//! Statistical overlay maps in VTC space. The file opens with the NR-VMP
//! signature; a mismatch aborts before any field is decoded. Each sub-map
//! carries its own thresholds, colors, an optional cross-correlation lag
//! block (map type 3) and an FDR table of three floats per row. Component
//! (ICA) documents additionally store per-map time courses and named
//! component parameters. The payload is one f32 volume per sub-map.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::ArrayD;

use crate::axis;
use crate::codec::primitive;
use crate::error::{Error, Result};
use crate::formats;
use crate::header::Header;
use crate::layout;
use crate::schema::{self, Count, Presence, ScalarKind, Scope, Step};

/// NR-VMP file signature.
pub const NR_VMP_IDENTIFIER: i32 = -1_582_119_980;

fn lag_map(scope: &Scope) -> bool {
    scope.local_int("TypeOfMap") == 3
}

fn has_time_points(scope: &Scope) -> bool {
    scope.root_int("NrOfTimePoints") > 0
}

const MAP_STEPS: &[Step] = &[
    Step::scalar("TypeOfMap", ScalarKind::I32),
    Step::scalar("MapThreshold", ScalarKind::F32),
    Step::scalar("UpperThreshold", ScalarKind::F32),
    Step::scalar("MapName", ScalarKind::CString),
    Step::scalar("RgbPositiveMin", ScalarKind::Rgb),
    Step::scalar("RgbPositiveMax", ScalarKind::Rgb),
    Step::scalar("RgbNegativeMin", ScalarKind::Rgb),
    Step::scalar("RgbNegativeMax", ScalarKind::Rgb),
    Step::scalar("UseVMPColor", ScalarKind::U8),
    Step::scalar("LUTFileName", ScalarKind::CString),
    Step::scalar("TransparentColorFactor", ScalarKind::F32),
    Step::scalar_if("NrOfLags", ScalarKind::I32, Presence::If(lag_map)),
    Step::scalar_if("DisplayMinLag", ScalarKind::I32, Presence::If(lag_map)),
    Step::scalar_if("DisplayMaxLag", ScalarKind::I32, Presence::If(lag_map)),
    Step::scalar_if("ShowCorrelationOrLag", ScalarKind::I32, Presence::If(lag_map)),
    Step::scalar("ClusterSizeThreshold", ScalarKind::I32),
    Step::scalar("EnableClusterSizeThreshold", ScalarKind::I8),
    Step::scalar("ShowValuesAboveUpperThreshold", ScalarKind::I32),
    Step::scalar("DF1", ScalarKind::I32),
    Step::scalar("DF2", ScalarKind::I32),
    Step::scalar("ShowPosNegValues", ScalarKind::I8),
    Step::scalar("NrOfUsedVoxels", ScalarKind::I32),
    Step::scalar("SizeOfFDRTable", ScalarKind::I32),
    // Rows of (q, crit standard, crit conservative).
    Step::F32Array {
        name: "FDRTableInfo",
        count: Count::LocalFieldTimes("SizeOfFDRTable", 3),
        presence: Presence::Always,
    },
    Step::scalar("UseFDRTableIndex", ScalarKind::I32),
    Step::F32Array {
        name: "ComponentTimeCourse",
        count: Count::RootField("NrOfTimePoints"),
        presence: Presence::If(has_time_points),
    },
];

const HEADER: &[Step] = &[
    Step::scalar("VersionNumber", ScalarKind::I16),
    Step::scalar("DocumentType", ScalarKind::I16),
    Step::scalar("NrOfSubMaps", ScalarKind::I32),
    Step::scalar("NrOfTimePoints", ScalarKind::I32),
    Step::scalar("NrOfComponentParams", ScalarKind::I32),
    Step::scalar("ShowParamsRangeFrom", ScalarKind::I32),
    Step::scalar("ShowParamsRangeTo", ScalarKind::I32),
    Step::scalar("UseForFingerprintParamsRangeFrom", ScalarKind::I32),
    Step::scalar("UseForFingerprintParamsRangeTo", ScalarKind::I32),
    Step::scalar("XStart", ScalarKind::I32),
    Step::scalar("XEnd", ScalarKind::I32),
    Step::scalar("YStart", ScalarKind::I32),
    Step::scalar("YEnd", ScalarKind::I32),
    Step::scalar("ZStart", ScalarKind::I32),
    Step::scalar("ZEnd", ScalarKind::I32),
    Step::scalar("Resolution", ScalarKind::I32),
    Step::scalar("DimX", ScalarKind::I32),
    Step::scalar("DimY", ScalarKind::I32),
    Step::scalar("DimZ", ScalarKind::I32),
    Step::scalar("NameOfVTCFile", ScalarKind::CString),
    Step::scalar("NameOfProtocolFile", ScalarKind::CString),
    Step::scalar("NameOfVOIFile", ScalarKind::CString),
    Step::Repeat {
        name: "Map",
        count: Count::LocalField("NrOfSubMaps"),
        steps: MAP_STEPS,
    },
    Step::Repeat {
        name: "ComponentParams",
        count: Count::LocalField("NrOfComponentParams"),
        steps: &[
            Step::scalar("Name", ScalarKind::CString),
            Step::F32Array {
                name: "Values",
                count: Count::RootField("NrOfSubMaps"),
                presence: Presence::Always,
            },
        ],
    },
];

/// Native (N, Z, Y, X) payload shape derived from the bounding box.
fn native_dims(header: &Header) -> Result<Vec<usize>> {
    let resolution = header.require_int("Resolution")?;
    Ok(vec![
        layout::positive_dim(header, "NrOfSubMaps")?,
        layout::scaled_dim(
            header.require_int("ZStart")?,
            header.require_int("ZEnd")?,
            resolution,
        )?,
        layout::scaled_dim(
            header.require_int("YStart")?,
            header.require_int("YEnd")?,
            resolution,
        )?,
        layout::scaled_dim(
            header.require_int("XStart")?,
            header.require_int("XEnd")?,
            resolution,
        )?,
    ])
}

/// Decode a VMP. The payload comes back as a canonical 4D array with the
/// sub-map index last, also for single-map files.
pub fn read_from<R: Read>(reader: &mut R) -> Result<(Header, ArrayD<f32>)> {
    let found = primitive::read_i32(reader)?;
    if found != NR_VMP_IDENTIFIER {
        return Err(Error::MagicMismatch {
            expected: NR_VMP_IDENTIFIER as u32,
            found: found as u32,
        });
    }
    let header = schema::decode(reader, HEADER)?;
    let volume = formats::read_f32_volume(reader, &native_dims(&header)?)?;
    Ok((header, axis::VOLUME_MAPS.to_canonical(volume)))
}

pub fn read<P: AsRef<Path>>(path: P) -> Result<(Header, ArrayD<f32>)> {
    let mut reader = BufReader::new(File::open(path)?);
    read_from(&mut reader)
}

pub fn write_to<W: Write>(writer: &mut W, header: &Header, data: &ArrayD<f32>) -> Result<()> {
    let dims = native_dims(header)?;
    let native = axis::VOLUME_MAPS.to_native(data.clone());
    formats::expect_shape(native.shape(), &dims)?;
    primitive::write_i32(writer, NR_VMP_IDENTIFIER)?;
    schema::encode(writer, HEADER, header)?;
    formats::write_f32_volume(writer, &native)
}

pub fn write<P: AsRef<Path>>(path: P, header: &Header, data: &ArrayD<f32>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_to(&mut writer, header, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::FieldValue;
    use ndarray::IxDyn;
    use std::io::Cursor;

    fn map_block(name: &str, type_of_map: i64) -> Header {
        let mut map = Header::new();
        map.set_int("TypeOfMap", type_of_map);
        map.set_float("MapThreshold", 2.5);
        map.set_float("UpperThreshold", 8.0);
        map.set_str("MapName", name);
        map.set("RgbPositiveMin", FieldValue::Rgb([255, 0, 0]));
        map.set("RgbPositiveMax", FieldValue::Rgb([255, 255, 0]));
        map.set("RgbNegativeMin", FieldValue::Rgb([255, 0, 255]));
        map.set("RgbNegativeMax", FieldValue::Rgb([0, 0, 255]));
        map.set_int("UseVMPColor", 0);
        map.set_str("LUTFileName", "<default>");
        map.set_float("TransparentColorFactor", 1.0);
        if type_of_map == 3 {
            map.set_int("NrOfLags", 8);
            map.set_int("DisplayMinLag", 0);
            map.set_int("DisplayMaxLag", 7);
            map.set_int("ShowCorrelationOrLag", 0);
        }
        map.set_int("ClusterSizeThreshold", 4);
        map.set_int("EnableClusterSizeThreshold", 0);
        map.set_int("ShowValuesAboveUpperThreshold", 1);
        map.set_int("DF1", 249);
        map.set_int("DF2", 0);
        map.set_int("ShowPosNegValues", 3);
        map.set_int("NrOfUsedVoxels", 24);
        map.set_int("SizeOfFDRTable", 2);
        map.set(
            "FDRTableInfo",
            FieldValue::FloatList(vec![0.01, 3.1, 3.9, 0.05, 2.2, 2.8]),
        );
        map.set_int("UseFDRTableIndex", 1);
        map
    }

    fn vmp_header(nr_maps: i64, lag_first: bool) -> Header {
        let mut header = Header::new();
        header.set_int("VersionNumber", 6);
        header.set_int("DocumentType", 1);
        header.set_int("NrOfSubMaps", nr_maps);
        header.set_int("NrOfTimePoints", 0);
        header.set_int("NrOfComponentParams", 0);
        header.set_int("ShowParamsRangeFrom", 0);
        header.set_int("ShowParamsRangeTo", 0);
        header.set_int("UseForFingerprintParamsRangeFrom", 0);
        header.set_int("UseForFingerprintParamsRangeTo", 0);
        header.set_int("XStart", 60);
        header.set_int("XEnd", 66);
        header.set_int("YStart", 40);
        header.set_int("YEnd", 44);
        header.set_int("ZStart", 50);
        header.set_int("ZEnd", 54);
        header.set_int("Resolution", 2);
        header.set_int("DimX", 256);
        header.set_int("DimY", 256);
        header.set_int("DimZ", 256);
        header.set_str("NameOfVTCFile", "sub-01.vtc");
        header.set_str("NameOfProtocolFile", "");
        header.set_str("NameOfVOIFile", "");
        let maps: Vec<Header> = (0..nr_maps)
            .map(|i| map_block(&format!("map {i}"), if lag_first && i == 0 { 3 } else { 1 }))
            .collect();
        header.set("Map", FieldValue::Blocks(maps));
        header.set("ComponentParams", FieldValue::Blocks(Vec::new()));
        header
    }

    fn canonical_data(nr_maps: usize) -> ArrayD<f32> {
        // Canonical (Z, X, Y, N) for native (N, 2, 2, 3).
        let shape = [2, 3, 2, nr_maps];
        let len: usize = shape.iter().product();
        ArrayD::from_shape_vec(IxDyn(&shape), (0..len).map(|i| i as f32 * 0.5).collect()).unwrap()
    }

    #[test]
    fn roundtrip_two_maps() {
        let header = vmp_header(2, false);
        let data = canonical_data(2);
        let mut bytes = Vec::new();
        write_to(&mut bytes, &header, &data).unwrap();
        assert_eq!(&bytes[..4], &NR_VMP_IDENTIFIER.to_le_bytes());

        let (back_header, back_data) = read_from(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(back_header, header);
        assert_eq!(back_data, data);
    }

    #[test]
    fn lag_fields_only_for_correlation_maps() {
        let header = vmp_header(2, true);
        let data = canonical_data(2);
        let mut bytes = Vec::new();
        write_to(&mut bytes, &header, &data).unwrap();
        let (back_header, _) = read_from(&mut Cursor::new(&bytes)).unwrap();
        let maps = back_header.require_blocks("Map").unwrap();
        assert_eq!(maps[0].get_int("NrOfLags"), Some(8));
        assert!(!maps[1].contains("NrOfLags"));
    }

    #[test]
    fn wrong_identifier_aborts_before_fields() {
        let mut bytes = Vec::new();
        primitive::write_i32(&mut bytes, 7).unwrap();
        primitive::write_i32(&mut bytes, 0).unwrap();
        match read_from(&mut Cursor::new(&bytes)) {
            Err(Error::MagicMismatch { expected, .. }) => {
                assert_eq!(expected, NR_VMP_IDENTIFIER as u32);
            }
            other => panic!("expected magic mismatch, got {other:?}"),
        }
    }

    #[test]
    fn component_time_courses_follow_each_map() {
        let mut header = vmp_header(2, false);
        header.set_int("NrOfTimePoints", 3);
        let mut maps = header.require_blocks("Map").unwrap().to_vec();
        for (i, map) in maps.iter_mut().enumerate() {
            map.set(
                "ComponentTimeCourse",
                FieldValue::FloatList(vec![i as f32; 3]),
            );
        }
        header.set("Map", FieldValue::Blocks(maps));
        let mut param = Header::new();
        param.set_str("Name", "kurtosis");
        param.set("Values", FieldValue::FloatList(vec![0.5, 0.7]));
        header.set_int("NrOfComponentParams", 1);
        header.set("ComponentParams", FieldValue::Blocks(vec![param]));

        let data = canonical_data(2);
        let mut bytes = Vec::new();
        write_to(&mut bytes, &header, &data).unwrap();
        let (back_header, _) = read_from(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(back_header, header);
        let params = back_header.require_blocks("ComponentParams").unwrap();
        assert_eq!(params[0].get_str("Name"), Some("kurtosis"));
    }
}
