//! FMR functional projects (text header + STC payload).
//!
//! The FMR file is a colon-delimited text header naming a binary STC file
//! (`Prefix` + ".stc" in the same directory) that holds the voxel data.
//! The header has four sections: the main key block, scan position
//! information, past spatial transformations (each with a 4x4 matrix spread
//! over continuation lines) and the multiband block. Keys outside the known
//! set are dropped on read.
//!
//! Note the resolution swap when sizing the payload: the STC row length is
//! `ResolutionY` and the column length `ResolutionX`.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::Array2;

use crate::codec::text::{self, TextDocument};
use crate::error::{Error, Result};
use crate::formats::stc::{self, SliceDims};
use crate::formats::VolumeData;
use crate::header::{FieldValue, Header};

/// Main-section keys, in the order the file writes them.
const MAIN_KEYS: &[&str] = &[
    "FileVersion",
    "NrOfVolumes",
    "NrOfSlices",
    "NrOfSkippedVolumes",
    "Prefix",
    "DataStorageFormat",
    "DataType",
    "TR",
    "InterSliceTime",
    "TimeResolutionVerified",
    "TE",
    "SliceAcquisitionOrder",
    "SliceAcquisitionOrderVerified",
    "ResolutionX",
    "ResolutionY",
    "LoadAMRFile",
    "ShowAMRFile",
    "ImageIndex",
    "LayoutNColumns",
    "LayoutNRows",
    "LayoutZoomLevel",
    "SegmentSize",
    "SegmentOffset",
    "NrOfLinkedProtocols",
    "ProtocolFile",
    "InplaneResolutionX",
    "InplaneResolutionY",
    "SliceThickness",
    "SliceGap",
    "VoxelResolutionVerified",
];

/// Keys parsed as integers; everything else round-trips as its raw token.
const INT_KEYS: &[&str] = &[
    "NrOfVolumes",
    "NrOfSlices",
    "DataStorageFormat",
    "DataType",
    "ResolutionX",
    "ResolutionY",
];

/// Keys whose values are written inside double quotes.
const QUOTED_KEYS: &[&str] = &["Prefix", "LoadAMRFile", "ProtocolFile"];

const POSITION_KEYS: &[&str] = &[
    "PosInfosVerified",
    "CoordinateSystem",
    "Slice1CenterX",
    "Slice1CenterY",
    "Slice1CenterZ",
    "SliceNCenterX",
    "SliceNCenterY",
    "SliceNCenterZ",
    "RowDirX",
    "RowDirY",
    "RowDirZ",
    "ColDirX",
    "ColDirY",
    "ColDirZ",
    "NRows",
    "NCols",
    "FoVRows",
    "FoVCols",
    "SliceThickness",
    "GapThickness",
];

fn store_main(header: &mut Header, key: &str, value: &str) {
    if INT_KEYS.contains(&key) {
        if let Ok(v) = text::parse_int(value) {
            header.set_int(key, v);
            return;
        }
    }
    let value = if QUOTED_KEYS.contains(&key) {
        text::unquote(value)
    } else {
        value
    };
    header.set_str(key, value);
}

/// Collect `count` floats from continuation lines starting at `index`.
/// Returns the values and the number of lines consumed.
pub(crate) fn read_continuation_values(
    doc: &TextDocument,
    index: usize,
    count: usize,
) -> Result<(Vec<f32>, usize)> {
    let mut values = Vec::with_capacity(count);
    let mut consumed = 0;
    while values.len() < count {
        let line = doc.line(index + consumed)?;
        values.extend(text::parse_f32_list(line)?);
        consumed += 1;
    }
    if values.len() != count {
        return Err(Error::Decode(format!(
            "continuation block holds {} values, expected {count}",
            values.len()
        )));
    }
    Ok((values, consumed))
}

/// Parse an FMR text header. This covers the shared FMR/DMR grammar; the
/// DMR adapter layers its gradient section on top.
pub fn parse_header(content: &str) -> Result<Header> {
    let doc = TextDocument::from_str_content(content);
    let mut header = Header::new();
    let mut position = Header::new();
    let mut transformations: Vec<Header> = Vec::new();
    let mut multiband = Header::new();

    let mut i = 0;
    while i < doc.len() {
        let line = doc.line(i)?;
        // Bare numeric rows belong to a table consumed by its announcing
        // key; anything left over is skipped here.
        if text::is_numeric_row(line) {
            i += 1;
            continue;
        }
        let Some((key, value)) = text::split_key_value(line) else {
            i += 1;
            continue;
        };
        match key {
            "PositionInformationFromImageHeaders" => {}
            // Appears once in the main section and once under position
            // information; the first occurrence wins the main slot.
            "SliceThickness" => {
                if header.contains("SliceThickness") {
                    position.set_str(key, value);
                } else {
                    header.set_str(key, value);
                }
            }
            "NrOfColumns" => store_main(&mut header, "ResolutionX", value),
            "NrOfRows" => store_main(&mut header, "ResolutionY", value),
            "LeftRightConvention" => header.set_str(key, value),
            "NrOfPastSpatialTransformations" => {}
            "NameOfSpatialTransformation" => {
                let mut block = Header::new();
                block.set_str("NameOfSpatialTransformation", value);
                transformations.push(block);
            }
            "TypeOfSpatialTransformation" | "AppliedToFileName" => {
                if let Some(block) = transformations.last_mut() {
                    block.set_str(key, value);
                }
            }
            "NrOfTransformationValues" => {
                let count = text::parse_int(value)?;
                if count != 16 {
                    return Err(Error::Decode(format!(
                        "spatial transformation with {count} values, only 4x4 matrices supported"
                    )));
                }
                let (values, consumed) = read_continuation_values(&doc, i + 1, 16)?;
                if let Some(block) = transformations.last_mut() {
                    block.set_int("NrOfTransformationValues", count);
                    block.set(
                        "TransformationMatrix",
                        FieldValue::Matrix(
                            Array2::from_shape_vec((4, 4), values)
                                .map_err(|e| Error::Decode(e.to_string()))?,
                        ),
                    );
                }
                i += consumed;
            }
            "FirstDataSourceFile" | "MultibandSequence" | "MultibandFactor" | "AcqusitionTime" => {
                multiband.set_str(key, value);
            }
            "SliceTimingTableSize" => {
                let count = text::parse_int(value)?;
                let count = usize::try_from(count)
                    .map_err(|_| Error::Decode(format!("negative timing table size {count}")))?;
                multiband.set_int("SliceTimingTableSize", count as i64);
                let (values, consumed) = read_continuation_values(&doc, i + 1, count)?;
                multiband.set("SliceTimings", FieldValue::FloatList(values));
                i += consumed;
            }
            k if MAIN_KEYS.contains(&k) => store_main(&mut header, k, value),
            k if POSITION_KEYS.contains(&k) => position.set_str(k, value),
            _ => {} // unknown keys are dropped
        }
        i += 1;
    }

    header.set("PositionInformation", FieldValue::Record(position));
    let mut section = Header::new();
    section.set_int(
        "NrOfPastSpatialTransformations",
        transformations.len() as i64,
    );
    section.set("PastTransformation", FieldValue::Blocks(transformations));
    header.set("Transformation", FieldValue::Record(section));
    header.set("MultibandInformation", FieldValue::Record(multiband));
    Ok(header)
}

pub(crate) fn main_value(header: &Header, key: &str) -> Result<String> {
    if let Some(v) = header.get_str(key) {
        return Ok(v.to_owned());
    }
    if let Some(v) = header.get_int(key) {
        return Ok(v.to_string());
    }
    // These two may be absent; they are written as empty quoted strings.
    if key == "LoadAMRFile" || key == "ProtocolFile" {
        return Ok(String::new());
    }
    Err(Error::MissingField(key.to_owned()))
}

pub(crate) fn write_transformation_block<W: Write>(writer: &mut W, block: &Header) -> Result<()> {
    writeln!(
        writer,
        "NameOfSpatialTransformation: {}",
        block.require_str("NameOfSpatialTransformation")?
    )?;
    writeln!(
        writer,
        "TypeOfSpatialTransformation: {}",
        block.require_str("TypeOfSpatialTransformation")?
    )?;
    writeln!(
        writer,
        "AppliedToFileName:           {}",
        block.require_str("AppliedToFileName")?
    )?;
    writeln!(
        writer,
        "NrOfTransformationValues:    {}",
        block.require_int("NrOfTransformationValues")?
    )?;
    let matrix = block.require_matrix("TransformationMatrix")?;
    for row in matrix.rows() {
        for &v in row {
            write!(writer, " {v:8.5}  ")?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

pub(crate) fn write_main_section<W: Write>(
    writer: &mut W,
    header: &Header,
    keys: &[&str],
) -> Result<()> {
    writeln!(writer)?;
    for key in keys {
        let value = main_value(header, key)?;
        let label = format!("{key}:");
        if QUOTED_KEYS.contains(key) {
            writeln!(writer, "{label:<31}\"{value}\"")?;
        } else {
            writeln!(writer, "{label:<31}{value}")?;
        }
    }
    writeln!(writer)
        .map_err(Into::into)
}

pub(crate) fn write_position_section<W: Write>(writer: &mut W, header: &Header) -> Result<()> {
    let position = header.require_record("PositionInformation")?;
    writeln!(writer)?;
    writeln!(writer, "PositionInformationFromImageHeaders")?;
    writeln!(writer)?;
    for key in POSITION_KEYS {
        let label = format!("{key}:");
        writeln!(writer, "{label:<18}{}", position.require_str(key)?)?;
    }
    writeln!(writer).map_err(Into::into)
}

pub(crate) fn write_transformations_section<W: Write>(
    writer: &mut W,
    header: &Header,
) -> Result<()> {
    let section = header.require_record("Transformation")?;
    let blocks = section.require_blocks("PastTransformation")?;
    if blocks.is_empty() {
        return Ok(());
    }
    writeln!(writer)?;
    writeln!(writer, "NrOfPastSpatialTransformations: {}", blocks.len())?;
    for block in blocks {
        writeln!(writer)?;
        write_transformation_block(writer, block)?;
    }
    writeln!(writer).map_err(Into::into)
}

pub(crate) fn write_convention_section<W: Write>(writer: &mut W, header: &Header) -> Result<()> {
    writeln!(writer)?;
    writeln!(
        writer,
        "LeftRightConvention: {}",
        header.require_str("LeftRightConvention")?
    )?;
    writeln!(writer).map_err(Into::into)
}

pub(crate) fn write_multiband_section<W: Write>(writer: &mut W, header: &Header) -> Result<()> {
    let multiband = header.require_record("MultibandInformation")?;
    if multiband.is_empty() {
        return Ok(());
    }
    writeln!(writer)?;
    if let Some(v) = multiband.get_str("FirstDataSourceFile") {
        writeln!(writer, "FirstDataSourceFile: {v}")?;
    }
    if let Some(v) = multiband.get_str("MultibandSequence") {
        writeln!(writer, "MultibandSequence: {v}")?;
    }
    if let Some(v) = multiband.get_str("MultibandFactor") {
        writeln!(writer, "MultibandFactor:   {v}")?;
    }
    if let Some(size) = multiband.get_int("SliceTimingTableSize") {
        writeln!(writer, "SliceTimingTableSize: {size}")?;
        for &t in multiband.require_float_list("SliceTimings")? {
            writeln!(writer, "{t}")?;
        }
    }
    if let Some(v) = multiband.get_str("AcqusitionTime") {
        writeln!(writer)?;
        writeln!(writer, "AcqusitionTime: {v}")?;
        writeln!(writer)?;
    }
    Ok(())
}

/// Write the FMR text header.
pub fn write_header_to<W: Write>(writer: &mut W, header: &Header) -> Result<()> {
    write_main_section(writer, header, MAIN_KEYS)?;
    write_position_section(writer, header)?;
    write_transformations_section(writer, header)?;
    write_convention_section(writer, header)?;
    write_multiband_section(writer, header)
}

/// STC payload geometry from a parsed FMR header. Row length is
/// `ResolutionY`, column length `ResolutionX`.
pub(crate) fn slice_dims(header: &Header) -> Result<SliceDims> {
    Ok(SliceDims {
        nr_slices: crate::layout::positive_dim(header, "NrOfSlices")?,
        nr_volumes: crate::layout::positive_dim(header, "NrOfVolumes")?,
        res_x: crate::layout::positive_dim(header, "ResolutionY")?,
        res_y: crate::layout::positive_dim(header, "ResolutionX")?,
    })
}

fn companion_path(path: &Path, header: &Header, extension: &str) -> Result<std::path::PathBuf> {
    let prefix = header.require_str("Prefix")?;
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(dir.join(format!("{prefix}{extension}")))
}

/// Read an FMR header and its companion STC payload.
pub fn read<P: AsRef<Path>>(path: P) -> Result<(Header, VolumeData)> {
    let path = path.as_ref();
    let header = parse_header(&fs::read_to_string(path)?)?;
    let data = stc::read(
        companion_path(path, &header, ".stc")?,
        slice_dims(&header)?,
        header.require_int("DataType")?,
    )?;
    Ok((header, data))
}

/// Write an FMR header and its companion STC payload.
pub fn write<P: AsRef<Path>>(path: P, header: &Header, data: &VolumeData) -> Result<()> {
    let path = path.as_ref();
    {
        let mut writer = BufWriter::new(File::create(path)?);
        write_header_to(&mut writer, header)?;
    }
    stc::write(
        companion_path(path, header, ".stc")?,
        slice_dims(header)?,
        data,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        let text = "\
FileVersion:                   7
NrOfVolumes:                   4
NrOfSlices:                    3
NrOfSkippedVolumes:            0
Prefix:                        \"sub-01_run-01\"
DataStorageFormat:             2
DataType:                      2
TR:                            2000
InterSliceTime:                31
TimeResolutionVerified:        1
TE:                            30
SliceAcquisitionOrder:         5
SliceAcquisitionOrderVerified: 1
ResolutionX:                   2
ResolutionY:                   5
LoadAMRFile:                   \"\"
ShowAMRFile:                   1
ImageIndex:                    0
LayoutNColumns:                2
LayoutNRows:                   2
LayoutZoomLevel:               1
SegmentSize:                   10
SegmentOffset:                 0
NrOfLinkedProtocols:           0
ProtocolFile:                  \"\"
InplaneResolutionX:            2
InplaneResolutionY:            2
SliceThickness:                2
SliceGap:                      0
VoxelResolutionVerified:       1

PositionInformationFromImageHeaders

PosInfosVerified: 0
CoordinateSystem: 1
Slice1CenterX:    0
Slice1CenterY:    0
Slice1CenterZ:    -33
SliceNCenterX:    0
SliceNCenterY:    0
SliceNCenterZ:    33
RowDirX:          1
RowDirY:          0
RowDirZ:          0
ColDirX:          0
ColDirY:          1
ColDirZ:          0
NRows:            5
NCols:            2
FoVRows:          192
FoVCols:          192
SliceThickness:   2
GapThickness:     0

NrOfPastSpatialTransformations: 1

NameOfSpatialTransformation: MC
TypeOfSpatialTransformation: 14
AppliedToFileName:           sub-01_run-01.fmr
NrOfTransformationValues:    16
 1.00000   0.00000   0.00000   0.00000
 0.00000   1.00000   0.00000   0.00000
 0.00000   0.00000   1.00000   0.00000
 0.00000   0.00000   0.00000   1.00000

LeftRightConvention: 1

FirstDataSourceFile: ep2d_bold.dcm
SliceTimingTableSize: 3
0
1000
2000
";
        parse_header(text).unwrap()
    }

    #[test]
    fn sections_are_parsed() {
        let header = sample_header();
        assert_eq!(header.get_str("FileVersion"), Some("7"));
        assert_eq!(header.get_int("NrOfVolumes"), Some(4));
        assert_eq!(header.get_str("Prefix"), Some("sub-01_run-01"));
        assert_eq!(header.get_str("SliceThickness"), Some("2"));

        let position = header.require_record("PositionInformation").unwrap();
        assert_eq!(position.get_str("SliceThickness"), Some("2"));
        assert_eq!(position.get_str("SliceNCenterZ"), Some("33"));

        let section = header.require_record("Transformation").unwrap();
        let blocks = section.require_blocks("PastTransformation").unwrap();
        assert_eq!(blocks.len(), 1);
        let matrix = blocks[0].require_matrix("TransformationMatrix").unwrap();
        assert_eq!(matrix[[2, 2]], 1.0);

        let multiband = header.require_record("MultibandInformation").unwrap();
        assert_eq!(
            multiband.require_float_list("SliceTimings").unwrap(),
            &[0.0, 1000.0, 2000.0]
        );
    }

    #[test]
    fn unknown_keys_are_dropped() {
        let header = parse_header("SomeFutureKey: 3\nNrOfVolumes: 2\n").unwrap();
        assert!(!header.contains("SomeFutureKey"));
        assert_eq!(header.get_int("NrOfVolumes"), Some(2));
    }

    #[test]
    fn nr_of_rows_and_columns_alias_resolutions() {
        let header = parse_header("NrOfColumns: 64\nNrOfRows: 48\n").unwrap();
        assert_eq!(header.get_int("ResolutionX"), Some(64));
        assert_eq!(header.get_int("ResolutionY"), Some(48));
    }

    #[test]
    fn header_text_roundtrip() {
        let header = sample_header();
        let mut text = Vec::new();
        write_header_to(&mut text, &header).unwrap();
        let reparsed = parse_header(std::str::from_utf8(&text).unwrap()).unwrap();
        assert_eq!(reparsed, header);
    }

    #[test]
    fn slice_dims_swap_resolutions() {
        let dims = slice_dims(&sample_header()).unwrap();
        assert_eq!(dims.nr_slices, 3);
        assert_eq!(dims.nr_volumes, 4);
        assert_eq!(dims.res_x, 5); // ResolutionY
        assert_eq!(dims.res_y, 2); // ResolutionX
    }
}
