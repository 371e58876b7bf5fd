//! SDM single-subject design matrices (text).
//!
//! Five header keys, then one row of RGB triplets (one per predictor), one
//! row of double-quoted predictor names, and `NrOfDataPoints` rows of
//! predictor values. Motion estimate files (`*_3DMC.sdm`) use the same
//! grammar. Columns in old files can touch when a negative value fills the
//! field width, so value rows are split on minus signs as well as spaces,
//! taking care not to break scientific notation.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::codec::text::{self, TextDocument};
use crate::error::{Error, Result};
use crate::header::Header;

/// One design matrix column.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictor {
    pub name: String,
    pub color: [u8; 3],
    pub values: Vec<f32>,
}

const HEADER_KEYS: &[&str] = &[
    "FileVersion",
    "NrOfPredictors",
    "NrOfDataPoints",
    "IncludesConstant",
    "FirstConfoundPredictor",
];

/// Split a value row into float tokens, inserting a break before each minus
/// sign that starts a new column while keeping `e-` exponents intact.
fn parse_value_row(line: &str) -> Result<Vec<f32>> {
    let guarded = line.replace("e-", "\u{1}").replace('-', " -").replace('\u{1}', "e-");
    guarded.split_whitespace().map(text::parse_f32).collect()
}

/// Parse an SDM document into its header and predictor columns.
pub fn parse(content: &str) -> Result<(Header, Vec<Predictor>)> {
    let doc = TextDocument::from_str_content(content);
    let mut header = Header::new();
    for (i, key) in HEADER_KEYS.iter().enumerate() {
        let Some((found, value)) = text::split_key_value(doc.line(i)?) else {
            return Err(Error::Decode(format!("expected '{key}:' line")));
        };
        if found != *key {
            return Err(Error::Decode(format!("expected '{key}:', found '{found}:'")));
        }
        header.set_int(*key, text::parse_int(value)?);
    }

    let nr_predictors = crate::layout::positive_dim(&header, "NrOfPredictors")?;
    let nr_rows = crate::layout::positive_dim(&header, "NrOfDataPoints")?;

    let colors_row = text::parse_int_list(doc.line(HEADER_KEYS.len())?)?;
    if colors_row.len() != nr_predictors * 3 {
        return Err(Error::Decode(format!(
            "expected {} color values, found {}",
            nr_predictors * 3,
            colors_row.len()
        )));
    }
    let names_row = doc.line(HEADER_KEYS.len() + 1)?;
    let names: Vec<&str> = names_row
        .split('"')
        .filter(|s| !s.trim().is_empty())
        .collect();
    if names.len() != nr_predictors {
        return Err(Error::Decode(format!(
            "expected {nr_predictors} predictor names, found {}",
            names.len()
        )));
    }

    let mut columns = vec![Vec::with_capacity(nr_rows); nr_predictors];
    for r in 0..nr_rows {
        let values = parse_value_row(doc.line(HEADER_KEYS.len() + 2 + r)?)?;
        if values.len() != nr_predictors {
            return Err(Error::Decode(format!(
                "value row {r} has {} entries, expected {nr_predictors}",
                values.len()
            )));
        }
        for (column, value) in columns.iter_mut().zip(values) {
            column.push(value);
        }
    }

    let predictors = names
        .into_iter()
        .zip(colors_row.chunks_exact(3))
        .zip(columns)
        .map(|((name, rgb), values)| Predictor {
            name: name.to_owned(),
            color: [rgb[0] as u8, rgb[1] as u8, rgb[2] as u8],
            values,
        })
        .collect();
    Ok((header, predictors))
}

pub fn read<P: AsRef<Path>>(path: P) -> Result<(Header, Vec<Predictor>)> {
    parse(&fs::read_to_string(path)?)
}

/// Serialize an SDM document.
pub fn write_content<W: Write>(
    writer: &mut W,
    header: &Header,
    predictors: &[Predictor],
) -> Result<()> {
    let nr_predictors = crate::layout::positive_dim(header, "NrOfPredictors")?;
    let nr_rows = crate::layout::positive_dim(header, "NrOfDataPoints")?;
    if predictors.len() != nr_predictors {
        return Err(Error::Layout(format!(
            "header promises {nr_predictors} predictors, got {}",
            predictors.len()
        )));
    }
    for predictor in predictors {
        if predictor.values.len() != nr_rows {
            return Err(Error::Layout(format!(
                "predictor {} has {} values, header promises {nr_rows}",
                predictor.name,
                predictor.values.len()
            )));
        }
    }

    writeln!(writer, "{:<31}{}", "FileVersion:", header.require_int("FileVersion")?)?;
    writeln!(writer)?;
    for key in &HEADER_KEYS[1..] {
        writeln!(writer, "{:<31}{}", format!("{key}:"), header.require_int(key)?)?;
    }
    writeln!(writer)?;

    let colors: Vec<String> = predictors
        .iter()
        .map(|p| format!("{} {} {}", p.color[0], p.color[1], p.color[2]))
        .collect();
    writeln!(writer, "{}", colors.join("   "))?;

    let names: Vec<String> = predictors.iter().map(|p| format!("\"{}\"", p.name)).collect();
    writeln!(writer, "{}", names.join(" "))?;

    for r in 0..nr_rows {
        let row: Vec<String> = predictors
            .iter()
            .map(|p| format!("{:>12.9}", p.values[r]))
            .collect();
        writeln!(writer, "{}", row.join(" "))?;
    }
    Ok(())
}

pub fn write<P: AsRef<Path>>(path: P, header: &Header, predictors: &[Predictor]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_content(&mut writer, header, predictors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Header, Vec<Predictor>) {
        let mut header = Header::new();
        header.set_int("FileVersion", 1);
        header.set_int("NrOfPredictors", 2);
        header.set_int("NrOfDataPoints", 3);
        header.set_int("IncludesConstant", 1);
        header.set_int("FirstConfoundPredictor", 2);
        let predictors = vec![
            Predictor {
                name: "Task".to_owned(),
                color: [255, 0, 0],
                values: vec![0.0, 1.0, -0.5],
            },
            Predictor {
                name: "Constant".to_owned(),
                color: [128, 128, 128],
                values: vec![1.0, 1.0, 1.0],
            },
        ];
        (header, predictors)
    }

    #[test]
    fn roundtrip_with_quoted_names_and_colors() {
        let (header, predictors) = sample();
        let mut out = Vec::new();
        write_content(&mut out, &header, &predictors).unwrap();
        let (back_header, back_predictors) = parse(std::str::from_utf8(&out).unwrap()).unwrap();
        assert_eq!(back_header, header);
        assert_eq!(back_predictors, predictors);
    }

    #[test]
    fn touching_negative_columns_are_split() {
        let values = parse_value_row("0.123456789-0.500000000 1.5e-3").unwrap();
        assert_eq!(values, vec![0.123_456_789, -0.5, 1.5e-3]);
    }

    #[test]
    fn name_count_mismatch_is_reported() {
        let (header, predictors) = sample();
        let mut out = Vec::new();
        write_content(&mut out, &header, &predictors).unwrap();
        let text = std::str::from_utf8(&out).unwrap().replace("\"Constant\"", "");
        assert!(matches!(parse(&text), Err(Error::Decode(_))));
    }

    #[test]
    fn short_value_row_is_reported() {
        let (header, predictors) = sample();
        let mut out = Vec::new();
        write_content(&mut out, &header, &predictors).unwrap();
        let text = std::str::from_utf8(&out)
            .unwrap()
            .replace(" 1.000000000 1.000000000", " 1.000000000");
        assert!(matches!(parse(&text), Err(Error::Decode(_))));
    }
}
