//! TRF spatial transformation files (text).
//!
//! A 4x4 affine matrix with key/value metadata around it. The matrix rows
//! follow the `DataFormat: Matrix` line; coregistration files
//! (`TransformationType: 1`) may carry a second 4x4 block after a positive
//! `ExtraVMRTransf` flag, and MNI files store per-axis scale pairs.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::Array2;

use crate::codec::text::{self, TextDocument};
use crate::error::{Error, Result};
use crate::header::{FieldValue, Header};

/// The transformation payload, separate from the scalar metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    pub matrix: Array2<f32>,
    /// Present when the header's `ExtraVMRTransf` flag is positive.
    pub extra_vmr_transf: Option<Array2<f32>>,
}

/// Keys written after the matrix block, in file order.
const TAIL_KEYS: &[&str] = &[
    "TransformationType",
    "CoordinateSystem",
    "NSlicesFMRVMR",
    "SlThickFMRVMR",
    "SlGapFMRVMR",
    "CreateFMR3DMethod",
    "AlignmentStep",
    "ExtraVMRTransf",
    "ToVMRFramingCube",
    "ToVMRVoxelRes",
    "xScalesMNI",
    "yScalesMNI",
    "zScalesMNI",
    "SourceFile",
    "TargetFile",
    "ACPCVMRFramingCube",
    "ACPCVMRVoxelRes",
];

const SCALE_KEYS: &[&str] = &["xScalesMNI", "yScalesMNI", "zScalesMNI"];

fn read_matrix_rows(doc: &TextDocument, start: usize) -> Result<Array2<f32>> {
    let mut values = Vec::with_capacity(16);
    for r in 0..4 {
        let row = text::parse_f32_list(doc.line(start + r)?)?;
        if row.len() != 4 {
            return Err(Error::Decode(format!(
                "matrix row has {} values, expected 4",
                row.len()
            )));
        }
        values.extend(row);
    }
    Array2::from_shape_vec((4, 4), values).map_err(|e| Error::Decode(e.to_string()))
}

/// Parse a TRF document.
pub fn parse(content: &str) -> Result<(Header, Transformation)> {
    let doc = TextDocument::from_str_content(content);
    let mut header = Header::new();
    let mut matrix = None;
    let mut extra = None;

    let mut i = 0;
    while i < doc.len() {
        let line = doc.line(i)?;
        let Some((key, value)) = text::split_key_value(line) else {
            i += 1;
            continue;
        };
        match key {
            "DataFormat" if value == "Matrix" => {
                header.set_str(key, value);
                matrix = Some(read_matrix_rows(&doc, i + 1)?);
                i += 4;
            }
            "ExtraVMRTransf" => {
                let flag = text::parse_int(value)?;
                header.set_int(key, flag);
                if flag > 0 {
                    extra = Some(read_matrix_rows(&doc, i + 1)?);
                    i += 4;
                }
            }
            k if SCALE_KEYS.contains(&k) => {
                header.set(k, FieldValue::FloatList(text::parse_f32_list(value)?));
            }
            _ => match text::parse_int(value) {
                Ok(n) => header.set_int(key, n),
                Err(_) => header.set_str(key, value),
            },
        }
        i += 1;
    }

    let matrix = matrix.ok_or_else(|| Error::MissingField("DataFormat: Matrix".into()))?;
    Ok((
        header,
        Transformation {
            matrix,
            extra_vmr_transf: extra,
        },
    ))
}

pub fn read<P: AsRef<Path>>(path: P) -> Result<(Header, Transformation)> {
    parse(&fs::read_to_string(path)?)
}

fn write_matrix_rows<W: Write>(writer: &mut W, matrix: &Array2<f32>) -> Result<()> {
    for row in matrix.rows() {
        for v in row {
            write!(writer, " {v:>20.16}")?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Serialize a TRF document.
pub fn write_content<W: Write>(
    writer: &mut W,
    header: &Header,
    transformation: &Transformation,
) -> Result<()> {
    let extra_flag = header.get_int("ExtraVMRTransf").unwrap_or(0);
    if extra_flag > 0 && transformation.extra_vmr_transf.is_none() {
        return Err(Error::MissingField("ExtraVMRTransf matrix".into()));
    }

    writeln!(writer, "\nFileVersion:\t{}\n", header.require_int("FileVersion")?)?;
    writeln!(writer, "DataFormat: \tMatrix\n")?;
    write_matrix_rows(writer, &transformation.matrix)?;
    writeln!(writer)?;

    for key in TAIL_KEYS {
        match header.get(key) {
            Some(FieldValue::Int(n)) => {
                writeln!(writer, "{key}:\t{n}")?;
                if *key == "ExtraVMRTransf" && *n > 0 {
                    if let Some(extra) = &transformation.extra_vmr_transf {
                        write_matrix_rows(writer, extra)?;
                        writeln!(writer)?;
                    }
                }
            }
            Some(FieldValue::Str(s)) => writeln!(writer, "{key}:\t{s}")?,
            Some(FieldValue::FloatList(scales)) => {
                let row: Vec<String> = scales.iter().map(|v| format!("{v:>10.5}")).collect();
                writeln!(writer, "{key}:\t{}", row.join("\t"))?;
            }
            Some(other) => {
                return Err(Error::Decode(format!(
                    "field value {other:?} has no text form"
                )))
            }
            None => {}
        }
    }
    writeln!(writer)?;
    Ok(())
}

pub fn write<P: AsRef<Path>>(
    path: P,
    header: &Header,
    transformation: &Transformation,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_content(&mut writer, header, transformation)
}
