//! Decoded header representation.
//!
//! Every format adapter decodes its header into the same structure: an
//! insertion-ordered list of named fields. Order matters because encoding
//! walks the same schema that produced the fields, and because the text
//! formats must reproduce unknown keys in their original position.

use ndarray::Array2;

use crate::error::{Error, Result};

/// A single decoded header value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Any integer scalar, widened from its on-disk width.
    Int(i64),
    /// Any float scalar, widened from its on-disk width.
    Float(f64),
    /// Variable-length string (null-terminated on disk for binary formats).
    Str(String),
    /// An RGB color triplet.
    Rgb([u8; 3]),
    /// Raw reserved bytes, carried through a round trip untouched.
    Bytes(Vec<u8>),
    /// A counted i32 array.
    IntList(Vec<i32>),
    /// A counted f32 array.
    FloatList(Vec<f32>),
    /// A dense row-major f32 matrix.
    Matrix(Array2<f32>),
    /// A single named sub-section (position information, gradient
    /// information, ... in the text headers).
    Record(Header),
    /// Repeated sub-records (studies, predictors, maps, regions, ...).
    Blocks(Vec<Header>),
}

/// An ordered collection of named header fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    fields: Vec<(String, FieldValue)>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, replacing an existing field of the same name in place.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    pub fn set_int(&mut self, name: impl Into<String>, value: i64) {
        self.set(name, FieldValue::Int(value));
    }

    pub fn set_float(&mut self, name: impl Into<String>, value: f64) {
        self.set(name, FieldValue::Float(value));
    }

    pub fn set_str(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.set(name, FieldValue::Str(value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(FieldValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(FieldValue::Float(v)) => Some(*v),
            Some(FieldValue::Int(v)) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(FieldValue::Str(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn require_int(&self, name: &str) -> Result<i64> {
        self.get_int(name)
            .ok_or_else(|| Error::MissingField(name.to_owned()))
    }

    pub fn require_float(&self, name: &str) -> Result<f64> {
        self.get_float(name)
            .ok_or_else(|| Error::MissingField(name.to_owned()))
    }

    pub fn require_str(&self, name: &str) -> Result<&str> {
        self.get_str(name)
            .ok_or_else(|| Error::MissingField(name.to_owned()))
    }

    pub fn require_rgb(&self, name: &str) -> Result<[u8; 3]> {
        match self.get(name) {
            Some(FieldValue::Rgb(v)) => Ok(*v),
            _ => Err(Error::MissingField(name.to_owned())),
        }
    }

    pub fn require_bytes(&self, name: &str) -> Result<&[u8]> {
        match self.get(name) {
            Some(FieldValue::Bytes(v)) => Ok(v.as_slice()),
            _ => Err(Error::MissingField(name.to_owned())),
        }
    }

    pub fn require_int_list(&self, name: &str) -> Result<&[i32]> {
        match self.get(name) {
            Some(FieldValue::IntList(v)) => Ok(v.as_slice()),
            _ => Err(Error::MissingField(name.to_owned())),
        }
    }

    pub fn require_float_list(&self, name: &str) -> Result<&[f32]> {
        match self.get(name) {
            Some(FieldValue::FloatList(v)) => Ok(v.as_slice()),
            _ => Err(Error::MissingField(name.to_owned())),
        }
    }

    pub fn require_matrix(&self, name: &str) -> Result<&Array2<f32>> {
        match self.get(name) {
            Some(FieldValue::Matrix(v)) => Ok(v),
            _ => Err(Error::MissingField(name.to_owned())),
        }
    }

    pub fn require_record(&self, name: &str) -> Result<&Header> {
        match self.get(name) {
            Some(FieldValue::Record(v)) => Ok(v),
            _ => Err(Error::MissingField(name.to_owned())),
        }
    }

    pub fn require_blocks(&self, name: &str) -> Result<&[Header]> {
        match self.get(name) {
            Some(FieldValue::Blocks(v)) => Ok(v.as_slice()),
            _ => Err(Error::MissingField(name.to_owned())),
        }
    }
}

impl FromIterator<(String, FieldValue)> for Header {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_preserves_insertion_order_and_replaces_in_place() {
        let mut header = Header::new();
        header.set_int("FileVersion", 4);
        header.set_int("DimX", 256);
        header.set_int("FileVersion", 3);

        let names: Vec<&str> = header.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["FileVersion", "DimX"]);
        assert_eq!(header.get_int("FileVersion"), Some(3));
    }

    #[test]
    fn require_reports_missing_field_by_name() {
        let header = Header::new();
        let err = header.require_int("NrOfTimePoints").unwrap_err();
        assert!(err.to_string().contains("NrOfTimePoints"));
    }

    #[test]
    fn get_float_widens_integers() {
        let mut header = Header::new();
        header.set_int("TR", 2000);
        assert_eq!(header.get_float("TR"), Some(2000.0));
    }

    #[test]
    fn type_mismatch_is_missing_field() {
        let mut header = Header::new();
        header.set_str("Prefix", "run1");
        assert!(header.require_int("Prefix").is_err());
    }
}
