//! DMR diffusion projects (text header + DWI payload).
//!
//! A DMR is the FMR grammar with a gradient section layered on top:
//! `NrOfVolumes` counts diffusion directions, and when gradient information
//! is available a table of one `x y z b` row per direction follows the
//! `GradientInformationAvailable` key. The voxel payload lives in a DWI
//! file (`Prefix` + ".dwi") with the same slice-time-course layout as STC,
//! sized without the FMR resolution swap.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::Array2;

use crate::codec::text::{self, TextDocument};
use crate::error::{Error, Result};
use crate::formats::fmr;
use crate::formats::stc::{self, SliceDims};
use crate::formats::VolumeData;
use crate::header::{FieldValue, Header};

/// Main-section keys in write order: the FMR set plus `DisplayVolume`.
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
    "DisplayVolume",
    "NrOfLinkedProtocols",
    "ProtocolFile",
    "InplaneResolutionX",
    "InplaneResolutionY",
    "SliceThickness",
    "SliceGap",
    "VoxelResolutionVerified",
];

const GRADIENT_KEYS: &[&str] = &[
    "GradientDirectionsVerified",
    "GradientXDirInterpretation",
    "GradientYDirInterpretation",
    "GradientZDirInterpretation",
];

/// Parse a DMR text header: the shared FMR sections plus the gradient
/// block and the `DisplayVolume` key.
pub fn parse_header(content: &str) -> Result<Header> {
    let mut header = fmr::parse_header(content)?;

    let doc = TextDocument::from_str_content(content);
    let mut gradients = Header::new();
    let mut i = 0;
    while i < doc.len() {
        let Some((key, value)) = text::split_key_value(doc.line(i)?) else {
            i += 1;
            continue;
        };
        match key {
            "DisplayVolume" => header.set_str(key, value),
            k if GRADIENT_KEYS.contains(&k) => gradients.set_str(k, value),
            "GradientInformationAvailable" => {
                gradients.set_str(key, value);
                if value == "YES" {
                    let directions = crate::layout::positive_dim(&header, "NrOfVolumes")?;
                    let (values, consumed) =
                        fmr::read_continuation_values(&doc, i + 1, directions * 4)?;
                    gradients.set(
                        "Gradients",
                        FieldValue::Matrix(
                            Array2::from_shape_vec((directions, 4), values)
                                .map_err(|e| Error::Decode(e.to_string()))?,
                        ),
                    );
                    i += consumed;
                }
            }
            _ => {}
        }
        i += 1;
    }
    header.set("GradientInformation", FieldValue::Record(gradients));
    Ok(header)
}

fn write_gradient_section<W: Write>(writer: &mut W, header: &Header) -> Result<()> {
    let gradients = header.require_record("GradientInformation")?;
    if gradients.is_empty() {
        return Ok(());
    }
    writeln!(writer)?;
    for key in GRADIENT_KEYS {
        if let Some(v) = gradients.get_str(key) {
            writeln!(writer, "{key}: {v}")?;
        }
    }
    if let Some(available) = gradients.get_str("GradientInformationAvailable") {
        writeln!(writer, "GradientInformationAvailable: {available}")?;
        if available == "YES" {
            let table = gradients.require_matrix("Gradients")?;
            for row in table.rows() {
                for &v in row {
                    write!(writer, " {v:8.5}  ")?;
                }
                writeln!(writer)?;
            }
        }
    }
    writeln!(writer).map_err(Into::into)
}

/// Write the DMR text header.
pub fn write_header_to<W: Write>(writer: &mut W, header: &Header) -> Result<()> {
    fmr::write_main_section(writer, header, MAIN_KEYS)?;
    fmr::write_position_section(writer, header)?;
    fmr::write_transformations_section(writer, header)?;
    write_gradient_section(writer, header)?;
    fmr::write_convention_section(writer, header)?;
    fmr::write_multiband_section(writer, header)
}

/// DWI payload geometry. Unlike the FMR/STC pairing, the row length is
/// `ResolutionX` and the column length `ResolutionY`.
fn slice_dims(header: &Header) -> Result<SliceDims> {
    Ok(SliceDims {
        nr_slices: crate::layout::positive_dim(header, "NrOfSlices")?,
        nr_volumes: crate::layout::positive_dim(header, "NrOfVolumes")?,
        res_x: crate::layout::positive_dim(header, "ResolutionX")?,
        res_y: crate::layout::positive_dim(header, "ResolutionY")?,
    })
}

fn companion_path(path: &Path, header: &Header) -> Result<std::path::PathBuf> {
    let prefix = header.require_str("Prefix")?;
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(dir.join(format!("{prefix}.dwi")))
}

/// Read a DMR header and its companion DWI payload.
pub fn read<P: AsRef<Path>>(path: P) -> Result<(Header, VolumeData)> {
    let path = path.as_ref();
    let header = parse_header(&fs::read_to_string(path)?)?;
    let data = stc::read(
        companion_path(path, &header)?,
        slice_dims(&header)?,
        header.require_int("DataType")?,
    )?;
    Ok((header, data))
}

/// Write a DMR header and its companion DWI payload.
pub fn write<P: AsRef<Path>>(path: P, header: &Header, data: &VolumeData) -> Result<()> {
    let path = path.as_ref();
    {
        let mut writer = BufWriter::new(File::create(path)?);
        write_header_to(&mut writer, header)?;
    }
    stc::write(companion_path(path, header)?, slice_dims(header)?, data)
}
