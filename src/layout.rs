//! Trailing-data layout resolution.
//!
//! Several formats size their payload from fields decoded earlier in the
//! header. The helpers here derive those sizes once, up front, and validate
//! them, so adapters read the payload with one block read instead of ad hoc
//! counting. A wrong size here either truncates the read or silently
//! misaligns every later field, which is why each derivation checks its
//! inputs and reports [`Error::Layout`] instead of clamping.

use crate::error::{Error, Result};
use crate::header::Header;

/// Derive one payload dimension from a bounding-box extent and a resolution
/// divisor, as VTC and VMR-VTC GLM files store them.
pub fn scaled_dim(start: i64, end: i64, resolution: i64) -> Result<usize> {
    if resolution <= 0 {
        return Err(Error::Layout(format!("non-positive resolution {resolution}")));
    }
    let extent = end - start;
    if extent <= 0 {
        return Err(Error::Layout(format!(
            "bounding box extent {start}..{end} yields non-positive dimension"
        )));
    }
    Ok((extent / resolution) as usize)
}

/// Validate a header dimension field as a positive element count.
pub fn positive_dim(header: &Header, name: &str) -> Result<usize> {
    let raw = header.require_int(name)?;
    if raw <= 0 {
        return Err(Error::Layout(format!("dimension '{name}' is {raw}")));
    }
    Ok(raw as usize)
}

/// Overflow-checked product of payload dimensions.
pub fn element_count(dims: &[usize]) -> Result<usize> {
    dims.iter().try_fold(1usize, |acc, &d| {
        acc.checked_mul(d)
            .ok_or_else(|| Error::Layout(format!("payload dimensions {dims:?} overflow")))
    })
}

/// Number of stored values per voxel (equivalently, trailing volume maps)
/// in a GLM file.
///
/// Random-effects GLMs store one unexplained-variance value plus one beta
/// per subject and predictor. Fixed-effects GLMs store R, SS_total, one
/// beta and one SS_XiY per predictor, the mean time-course value, and one
/// autocorrelation term per order of the serial-correlation model.
pub fn glm_values_per_voxel(header: &Header) -> Result<usize> {
    if header.require_int("RfxGlm")? == 1 {
        let subjects = positive_dim(header, "NrSubjects")?;
        let per_subject = positive_dim(header, "NrPredictorsPerSubject")?;
        return Ok(1 + subjects * per_subject);
    }
    let predictors = positive_dim(header, "NrAllPredictors")?;
    let ar_order = match header.require_int("SerialCorrelation")? {
        order @ 0..=2 => order as usize,
        other => {
            return Err(Error::Layout(format!(
                "unknown serial correlation model {other}"
            )))
        }
    };
    Ok(2 + 2 * predictors + 1 + ar_order)
}

/// Number of voxels or vertices a GLM file stores values for, derived from
/// the project-type discriminator.
pub fn glm_data_points(header: &Header) -> Result<usize> {
    match header.require_int("ProjectType")? {
        0 => element_count(&[
            positive_dim(header, "DimX")?,
            positive_dim(header, "DimY")?,
            positive_dim(header, "DimZ")?,
        ]),
        1 => {
            let resolution = header.require_int("ResolutionMultiplier")?;
            element_count(&[
                scaled_dim(
                    header.require_int("XStart")?,
                    header.require_int("XEnd")?,
                    resolution,
                )?,
                scaled_dim(
                    header.require_int("YStart")?,
                    header.require_int("YEnd")?,
                    resolution,
                )?,
                scaled_dim(
                    header.require_int("ZStart")?,
                    header.require_int("ZEnd")?,
                    resolution,
                )?,
            ])
        }
        2 => positive_dim(header, "NrVertices"),
        other => Err(Error::Layout(format!("unknown GLM project type {other}"))),
    }
}

/// Native on-disk shape of the GLM payload: the value index is the slowest
/// axis, followed by the spatial (or vertex) axes.
pub fn glm_native_dims(header: &Header) -> Result<Vec<usize>> {
    let values = glm_values_per_voxel(header)?;
    match header.require_int("ProjectType")? {
        0 => Ok(vec![
            values,
            positive_dim(header, "DimZ")?,
            positive_dim(header, "DimY")?,
            positive_dim(header, "DimX")?,
        ]),
        1 => {
            let resolution = header.require_int("ResolutionMultiplier")?;
            Ok(vec![
                values,
                scaled_dim(
                    header.require_int("ZStart")?,
                    header.require_int("ZEnd")?,
                    resolution,
                )?,
                scaled_dim(
                    header.require_int("YStart")?,
                    header.require_int("YEnd")?,
                    resolution,
                )?,
                scaled_dim(
                    header.require_int("XStart")?,
                    header.require_int("XEnd")?,
                    resolution,
                )?,
            ])
        }
        2 => Ok(vec![values, positive_dim(header, "NrVertices")?]),
        other => Err(Error::Layout(format!("unknown GLM project type {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glm_header(rfx: i64, serial_correlation: i64) -> Header {
        let mut header = Header::new();
        header.set_int("RfxGlm", rfx);
        header.set_int("SerialCorrelation", serial_correlation);
        header.set_int("NrAllPredictors", 5);
        header.set_int("NrSubjects", 12);
        header.set_int("NrPredictorsPerSubject", 3);
        header
    }

    #[test]
    fn values_per_voxel_cross_product() {
        // (rfx, serial correlation) -> expected stored values per voxel.
        let expected = [
            ((0, 0), 13), // 2 + 2*5 + 1
            ((0, 1), 14),
            ((0, 2), 15),
            ((1, 0), 37), // 1 + 12*3, AR order ignored under RFX
            ((1, 1), 37),
            ((1, 2), 37),
        ];
        for ((rfx, sc), want) in expected {
            let header = glm_header(rfx, sc);
            assert_eq!(glm_values_per_voxel(&header).unwrap(), want);
        }
    }

    #[test]
    fn unknown_serial_correlation_is_layout_error() {
        let header = glm_header(0, 3);
        assert!(matches!(
            glm_values_per_voxel(&header),
            Err(Error::Layout(_))
        ));
    }

    #[test]
    fn bounding_box_data_points_use_resolution() {
        let mut header = glm_header(0, 0);
        header.set_int("ProjectType", 1);
        header.set_int("ResolutionMultiplier", 3);
        for (name, value) in [
            ("XStart", 57),
            ("XEnd", 231),
            ("YStart", 52),
            ("YEnd", 172),
            ("ZStart", 59),
            ("ZEnd", 197),
        ] {
            header.set_int(name, value);
        }
        // (174/3) * (120/3) * (138/3)
        assert_eq!(glm_data_points(&header).unwrap(), 58 * 40 * 46);
        assert_eq!(glm_native_dims(&header).unwrap(), vec![13, 46, 40, 58]);
    }

    #[test]
    fn vertex_glm_is_two_dimensional() {
        let mut header = glm_header(1, 0);
        header.set_int("ProjectType", 2);
        header.set_int("NrVertices", 40962);
        assert_eq!(glm_native_dims(&header).unwrap(), vec![37, 40962]);
    }

    #[test]
    fn degenerate_extent_is_layout_error() {
        assert!(matches!(scaled_dim(100, 100, 1), Err(Error::Layout(_))));
        assert!(matches!(scaled_dim(0, 10, 0), Err(Error::Layout(_))));
    }
}
