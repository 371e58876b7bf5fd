//! PRT stimulation protocols (text).
//!
//! A protocol lists experiment conditions and when each one was on. Every
//! condition block is a name line, an occurrence count, one timing row per
//! occurrence and a `Color:` line. When the header carries
//! `ParametricWeights` with a positive value, each timing row has a third
//! column holding the occurrence's parametric weight.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::codec::text::{self, TextDocument};
use crate::error::{Error, Result};
use crate::header::Header;

/// One stimulus presentation interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub start: i64,
    pub stop: i64,
    /// Present only in protocols with parametric weights.
    pub weight: Option<f32>,
}

/// One experiment condition and its presentation intervals.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Condition name as written in the file, quotes included.
    pub name: String,
    pub occurrences: Vec<Occurrence>,
    pub color: [u8; 3],
}

fn set_scalar(header: &mut Header, key: &str, value: &str) {
    match text::parse_int(value) {
        Ok(n) => header.set_int(key, n),
        Err(_) => header.set_str(key, value),
    }
}

fn parse_occurrence(line: &str, parametric: bool) -> Result<Occurrence> {
    let mut tokens = line.split_whitespace();
    let start = text::parse_int(tokens.next().ok_or(Error::TruncatedInput)?)?;
    let stop = text::parse_int(tokens.next().ok_or(Error::TruncatedInput)?)?;
    let weight = if parametric {
        Some(text::parse_f32(tokens.next().ok_or_else(|| {
            Error::Decode(format!("timing row '{line}' lacks a parametric weight"))
        })?)?)
    } else {
        None
    };
    Ok(Occurrence {
        start,
        stop,
        weight,
    })
}

/// Parse a PRT document into its header and condition list.
pub fn parse(content: &str) -> Result<(Header, Vec<Condition>)> {
    let doc = TextDocument::from_str_content(content);
    let mut header = Header::new();
    let mut i = 0;
    while i < doc.len() {
        let Some((key, value)) = text::split_key_value(doc.line(i)?) else {
            break;
        };
        set_scalar(&mut header, key, value);
        i += 1;
        if key == "NrOfConditions" {
            break;
        }
    }

    let parametric = header.get_int("ParametricWeights").unwrap_or(0) > 0;
    let mut conditions = Vec::new();
    while i < doc.len() {
        let name = doc.line(i)?.to_owned();
        let count = text::parse_int(doc.line(i + 1)?)?;
        if count < 0 {
            return Err(Error::Decode(format!(
                "negative occurrence count for condition {name}"
            )));
        }
        let count = count as usize;
        let mut occurrences = Vec::with_capacity(count);
        for j in 0..count {
            occurrences.push(parse_occurrence(doc.line(i + 2 + j)?, parametric)?);
        }
        let color_line = doc.line(i + 2 + count)?;
        let Some(("Color", value)) = text::split_key_value(color_line) else {
            return Err(Error::Decode(format!(
                "expected Color line after condition {name}, got '{color_line}'"
            )));
        };
        let values = text::parse_int_list(value)?;
        let [r, g, b] = values[..] else {
            return Err(Error::Decode(format!(
                "expected 3 color values, got '{value}'"
            )));
        };
        conditions.push(Condition {
            name,
            occurrences,
            color: [r as u8, g as u8, b as u8],
        });
        i += count + 3;
    }
    Ok((header, conditions))
}

pub fn read<P: AsRef<Path>>(path: P) -> Result<(Header, Vec<Condition>)> {
    parse(&fs::read_to_string(path)?)
}

/// Serialize a PRT document.
pub fn write_content<W: Write>(
    writer: &mut W,
    header: &Header,
    conditions: &[Condition],
) -> Result<()> {
    let parametric = header.get_int("ParametricWeights").unwrap_or(0) > 0;
    writeln!(writer)?;
    for (key, value) in header.iter() {
        match value {
            crate::header::FieldValue::Int(n) => {
                writeln!(writer, "{:<20}{n}", format!("{key}:"))?;
            }
            crate::header::FieldValue::Str(s) => {
                writeln!(writer, "{:<20}{s}", format!("{key}:"))?;
            }
            other => {
                return Err(Error::Decode(format!(
                    "field value {other:?} has no text form"
                )))
            }
        }
        writeln!(writer)?;
    }

    for condition in conditions {
        writeln!(writer, "{}", condition.name)?;
        writeln!(writer, "{}", condition.occurrences.len())?;
        for occurrence in &condition.occurrences {
            match (parametric, occurrence.weight) {
                (true, Some(weight)) => {
                    writeln!(writer, "{:>4} {:>4} {weight}", occurrence.start, occurrence.stop)?;
                }
                (true, None) => {
                    return Err(Error::MissingField(format!(
                        "parametric weight in condition {}",
                        condition.name
                    )))
                }
                (false, _) => {
                    writeln!(writer, "{:>4} {:>4}", occurrence.start, occurrence.stop)?;
                }
            }
        }
        let [r, g, b] = condition.color;
        writeln!(writer, "Color: {r} {g} {b}")?;
        writeln!(writer)?;
    }
    Ok(())
}

pub fn write<P: AsRef<Path>>(path: P, header: &Header, conditions: &[Condition]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_content(&mut writer, header, conditions)
}
