//! GLM result containers.
//!
//! The most conditional of the binary headers: the random-effects flag
//! gates the subject fields and the design matrices, the study count gates
//! the confound array, and the project type selects between FMR-STC
//! dimensions, a VMR-VTC bounding box, and an SRF-MTC vertex count. The
//! per-voxel value count is derived in [`crate::layout`]; a fixed-effects
//! GLM additionally stores the design matrix and the inverted X'X matrix
//! before the payload.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::{ArrayD, IxDyn};

use crate::axis;
use crate::codec::matrix;
use crate::error::{Error, Result};
use crate::formats;
use crate::header::{FieldValue, Header};
use crate::layout;
use crate::schema::{self, Count, Presence, ScalarKind, Scope, Step};

fn rfx(scope: &Scope) -> bool {
    scope.root_int("RfxGlm") == 1
}

fn multi_study(scope: &Scope) -> bool {
    scope.root_int("NrStudies") > 1
}

fn type_fmr(scope: &Scope) -> bool {
    scope.root_int("ProjectType") == 0
}

fn type_vtc(scope: &Scope) -> bool {
    scope.root_int("ProjectType") == 1
}

fn type_mtc(scope: &Scope) -> bool {
    scope.root_int("ProjectType") == 2
}

const HEADER: &[Step] = &[
    Step::scalar("FileVersion", ScalarKind::I16),
    Step::scalar("ProjectType", ScalarKind::U8),
    Step::scalar("RfxGlm", ScalarKind::U8),
    Step::scalar_if("NrSubjects", ScalarKind::I32, Presence::If(rfx)),
    Step::scalar_if("NrPredictorsPerSubject", ScalarKind::I32, Presence::If(rfx)),
    Step::scalar("NrTimePoints", ScalarKind::I32),
    Step::scalar("NrAllPredictors", ScalarKind::I32),
    Step::scalar("NrConfoundPredictors", ScalarKind::I32),
    Step::scalar("NrStudies", ScalarKind::I32),
    // Absent entirely (not zero-length) for single-study files.
    Step::scalar_if(
        "NrStudiesWithConfoundInfo",
        ScalarKind::I32,
        Presence::If(multi_study),
    ),
    Step::I32Array {
        name: "NrConfoundsPerStudy",
        count: Count::LocalField("NrStudiesWithConfoundInfo"),
        presence: Presence::If(multi_study),
    },
    Step::scalar("SeparatePredictors", ScalarKind::U8),
    Step::scalar("TimeCourseNormalization", ScalarKind::U8),
    Step::scalar("ResolutionMultiplier", ScalarKind::I16),
    Step::scalar("SerialCorrelation", ScalarKind::U8),
    Step::scalar("MeanSerialCorrelationBefore", ScalarKind::F32),
    Step::scalar("MeanSerialCorrelationAfter", ScalarKind::F32),
    Step::scalar_if("DimX", ScalarKind::I16, Presence::If(type_fmr)),
    Step::scalar_if("DimY", ScalarKind::I16, Presence::If(type_fmr)),
    Step::scalar_if("DimZ", ScalarKind::I16, Presence::If(type_fmr)),
    Step::scalar_if("XStart", ScalarKind::I16, Presence::If(type_vtc)),
    Step::scalar_if("XEnd", ScalarKind::I16, Presence::If(type_vtc)),
    Step::scalar_if("YStart", ScalarKind::I16, Presence::If(type_vtc)),
    Step::scalar_if("YEnd", ScalarKind::I16, Presence::If(type_vtc)),
    Step::scalar_if("ZStart", ScalarKind::I16, Presence::If(type_vtc)),
    Step::scalar_if("ZEnd", ScalarKind::I16, Presence::If(type_vtc)),
    Step::scalar_if("NrVertices", ScalarKind::I32, Presence::If(type_mtc)),
    Step::scalar("CortexBasedMask", ScalarKind::U8),
    Step::scalar("NrVoxelsInMask", ScalarKind::I32),
    Step::scalar("CortexBasedMaskName", ScalarKind::CString),
    Step::Repeat {
        name: "StudyInfo",
        count: Count::LocalField("NrStudies"),
        steps: &[
            Step::scalar("NrTimePointsInStudy", ScalarKind::I32),
            Step::scalar("NameOfStudyData", ScalarKind::CString),
            Step::scalar_if("NameOfSsm", ScalarKind::CString, Presence::If(type_mtc)),
            Step::scalar("NameOfSdm", ScalarKind::CString),
        ],
    },
    Step::Repeat {
        name: "PredictorInfo",
        count: Count::LocalField("NrAllPredictors"),
        steps: &[
            Step::scalar("NameInternal", ScalarKind::CString),
            Step::scalar("NameCustom", ScalarKind::CString),
            Step::scalar("Color", ScalarKind::Rgb),
            Step::Bytes {
                name: "Reserved",
                len: 9,
            },
        ],
    },
];

fn is_rfx(header: &Header) -> Result<bool> {
    Ok(header.require_int("RfxGlm")? == 1)
}

fn to_canonical(header: &Header, native: ArrayD<f32>) -> Result<ArrayD<f32>> {
    if header.require_int("ProjectType")? == 2 {
        // Vertex data: (value, vertex) on disk, (vertex, value) in memory.
        Ok(native
            .permuted_axes(IxDyn(&[1, 0]))
            .as_standard_layout()
            .to_owned())
    } else {
        Ok(axis::VOLUME_MAPS.to_canonical(native))
    }
}

fn to_native(header: &Header, canonical: ArrayD<f32>) -> Result<ArrayD<f32>> {
    if header.require_int("ProjectType")? == 2 {
        Ok(canonical
            .permuted_axes(IxDyn(&[1, 0]))
            .as_standard_layout()
            .to_owned())
    } else {
        Ok(axis::VOLUME_MAPS.to_native(canonical))
    }
}

pub fn read_from<R: Read>(reader: &mut R) -> Result<(Header, ArrayD<f32>)> {
    let mut header = schema::decode(reader, HEADER)?;
    if !is_rfx(&header)? {
        let time_points = layout::positive_dim(&header, "NrTimePoints")?;
        let predictors = layout::positive_dim(&header, "NrAllPredictors")?;
        let design = matrix::read_f32_matrix(reader, time_points, predictors)?;
        let inverted = matrix::read_f32_matrix(reader, predictors, predictors)?;
        header.set("DesignMatrix", FieldValue::Matrix(design));
        header.set("InvertedXtX", FieldValue::Matrix(inverted));
    }
    let dims = layout::glm_native_dims(&header)?;
    let data = formats::read_f32_volume(reader, &dims)?;
    let data = to_canonical(&header, data)?;
    Ok((header, data))
}

pub fn read<P: AsRef<Path>>(path: P) -> Result<(Header, ArrayD<f32>)> {
    let mut reader = BufReader::new(File::open(path)?);
    read_from(&mut reader)
}

pub fn write_to<W: Write>(writer: &mut W, header: &Header, data: &ArrayD<f32>) -> Result<()> {
    let dims = layout::glm_native_dims(header)?;
    let native = to_native(header, data.clone())?;
    formats::expect_shape(native.shape(), &dims)?;

    schema::encode(writer, HEADER, header)?;
    if !is_rfx(header)? {
        let time_points = layout::positive_dim(header, "NrTimePoints")?;
        let predictors = layout::positive_dim(header, "NrAllPredictors")?;
        let design = header.require_matrix("DesignMatrix")?;
        formats::expect_shape(design.shape(), &[time_points, predictors])?;
        let inverted = header.require_matrix("InvertedXtX")?;
        formats::expect_shape(inverted.shape(), &[predictors, predictors])?;
        matrix::write_f32_matrix(writer, design)?;
        matrix::write_f32_matrix(writer, inverted)?;
    }
    formats::write_f32_volume(writer, &native)
}

pub fn write<P: AsRef<Path>>(path: P, header: &Header, data: &ArrayD<f32>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_to(&mut writer, header, data)
}

/// Stored values per voxel/vertex, re-exported here because callers
/// interpreting the canonical value axis need it.
pub fn values_per_voxel(header: &Header) -> Result<usize> {
    layout::glm_values_per_voxel(header)
}
