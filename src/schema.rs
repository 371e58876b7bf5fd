//! Declarative binary header schemas.
//!
//! A format's header is described as an ordered list of [`Step`]s instead of
//! a hand-written read function per field. Decoding walks the steps in
//! order, evaluating each step's presence predicate against the fields
//! decoded so far; encoding walks the same steps and writes the matching
//! fields back, so a header decoded under a schema re-encodes byte-for-byte
//! under the same schema. Version-gated fields and discriminator-dependent
//! blocks are presence rules on the step, not control flow in the adapter.

use std::io::{Read, Write};

use crate::codec::primitive;
use crate::error::{Error, Result};
use crate::header::{FieldValue, Header};

/// On-disk width and interpretation of a scalar step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    U8,
    I8,
    I16,
    U16,
    I32,
    F32,
    /// Null-terminated variable-length string.
    CString,
    /// Three-byte RGB triplet.
    Rgb,
}

/// Fields visible to a presence predicate: the top-level header decoded so
/// far plus the current repeated block (identical at top level).
pub struct Scope<'a> {
    root: &'a Header,
    local: &'a Header,
}

impl Scope<'_> {
    /// Integer field from the top-level header, `0` when absent.
    pub fn root_int(&self, name: &str) -> i64 {
        self.root.get_int(name).unwrap_or(0)
    }

    /// Integer field from the current block, `0` when absent.
    pub fn local_int(&self, name: &str) -> i64 {
        self.local.get_int(name).unwrap_or(0)
    }
}

/// Decides whether a step's field exists in a given file.
#[derive(Clone, Copy)]
pub enum Presence {
    Always,
    /// Present when the top-level `FileVersion` field is at least this value.
    MinVersion(i64),
    /// Present when the predicate holds over the already-decoded fields.
    If(fn(&Scope) -> bool),
}

/// Where a repeated or counted step finds its element count.
#[derive(Debug, Clone, Copy)]
pub enum Count {
    Fixed(usize),
    /// Named integer field of the top-level header.
    RootField(&'static str),
    /// Named integer field of the current block.
    LocalField(&'static str),
    /// A field of the current block scaled by a fixed factor (used for
    /// tables with a fixed number of columns).
    LocalFieldTimes(&'static str, usize),
}

/// One entry of a header schema.
pub enum Step {
    /// A single scalar field.
    Scalar {
        name: &'static str,
        kind: ScalarKind,
        presence: Presence,
    },
    /// A fixed-length raw byte region carried through round trips untouched.
    Bytes { name: &'static str, len: usize },
    /// A counted array of i32 values.
    I32Array {
        name: &'static str,
        count: Count,
        presence: Presence,
    },
    /// A counted array of f32 values.
    F32Array {
        name: &'static str,
        count: Count,
        presence: Presence,
    },
    /// A repeated block of sub-steps, decoded into [`FieldValue::Blocks`].
    Repeat {
        name: &'static str,
        count: Count,
        steps: &'static [Step],
    },
}

/// Shorthand constructors keeping schema tables compact.
impl Step {
    pub const fn scalar(name: &'static str, kind: ScalarKind) -> Self {
        Step::Scalar {
            name,
            kind,
            presence: Presence::Always,
        }
    }

    pub const fn scalar_if(name: &'static str, kind: ScalarKind, presence: Presence) -> Self {
        Step::Scalar {
            name,
            kind,
            presence,
        }
    }
}

fn is_present(presence: Presence, root: &Header, local: &Header) -> bool {
    match presence {
        Presence::Always => true,
        Presence::MinVersion(min) => root.get_int("FileVersion").unwrap_or(0) >= min,
        Presence::If(pred) => pred(&Scope { root, local }),
    }
}

fn resolve_count(count: Count, root: &Header, local: &Header) -> Result<usize> {
    let (raw, factor) = match count {
        Count::Fixed(n) => return Ok(n),
        Count::RootField(name) => (root.require_int(name)?, 1),
        Count::LocalField(name) => (local.require_int(name)?, 1),
        Count::LocalFieldTimes(name, factor) => (local.require_int(name)?, factor),
    };
    let n = usize::try_from(raw)
        .map_err(|_| Error::Layout(format!("negative element count {raw}")))?;
    Ok(n * factor)
}

/// Decode a header by walking `steps` in order.
pub fn decode<R: Read>(reader: &mut R, steps: &[Step]) -> Result<Header> {
    let mut header = Header::new();
    decode_steps(reader, steps, None, &mut header)?;
    Ok(header)
}

/// Decode steps into an existing header. Fields decoded earlier (for
/// instance a pre-data header read before the payload) stay visible to
/// presence predicates and count fields.
pub fn decode_append<R: Read>(reader: &mut R, steps: &[Step], header: &mut Header) -> Result<()> {
    decode_steps(reader, steps, None, header)
}

fn decode_steps<R: Read>(
    reader: &mut R,
    steps: &[Step],
    root: Option<&Header>,
    out: &mut Header,
) -> Result<()> {
    for step in steps {
        match step {
            Step::Scalar {
                name,
                kind,
                presence,
            } => {
                if !is_present(*presence, root.unwrap_or(out), out) {
                    continue;
                }
                let value = match kind {
                    ScalarKind::U8 => FieldValue::Int(i64::from(primitive::read_u8(reader)?)),
                    ScalarKind::I8 => FieldValue::Int(i64::from(primitive::read_i8(reader)?)),
                    ScalarKind::I16 => FieldValue::Int(i64::from(primitive::read_i16(reader)?)),
                    ScalarKind::U16 => FieldValue::Int(i64::from(primitive::read_u16(reader)?)),
                    ScalarKind::I32 => FieldValue::Int(i64::from(primitive::read_i32(reader)?)),
                    ScalarKind::F32 => FieldValue::Float(f64::from(primitive::read_f32(reader)?)),
                    ScalarKind::CString => FieldValue::Str(primitive::read_cstring(reader)?),
                    ScalarKind::Rgb => FieldValue::Rgb(primitive::read_rgb(reader)?),
                };
                out.set(*name, value);
            }
            Step::Bytes { name, len } => {
                out.set(*name, FieldValue::Bytes(primitive::read_bytes(reader, *len)?));
            }
            Step::I32Array {
                name,
                count,
                presence,
            } => {
                if !is_present(*presence, root.unwrap_or(out), out) {
                    continue;
                }
                let n = resolve_count(*count, root.unwrap_or(out), out)?;
                out.set(*name, FieldValue::IntList(primitive::read_i32_array(reader, n)?));
            }
            Step::F32Array {
                name,
                count,
                presence,
            } => {
                if !is_present(*presence, root.unwrap_or(out), out) {
                    continue;
                }
                let n = resolve_count(*count, root.unwrap_or(out), out)?;
                out.set(*name, FieldValue::FloatList(primitive::read_f32_array(reader, n)?));
            }
            Step::Repeat { name, count, steps } => {
                let n = resolve_count(*count, root.unwrap_or(out), out)?;
                let mut blocks = Vec::with_capacity(n);
                let root_view: &Header = root.unwrap_or(out);
                for _ in 0..n {
                    let mut block = Header::new();
                    decode_steps(reader, steps, Some(root_view), &mut block)?;
                    blocks.push(block);
                }
                out.set(*name, FieldValue::Blocks(blocks));
            }
        }
    }
    Ok(())
}

/// Encode a header by walking `steps` in order. Any field a presence rule
/// requires but the header lacks yields [`Error::MissingField`].
pub fn encode<W: Write>(writer: &mut W, steps: &[Step], header: &Header) -> Result<()> {
    encode_steps(writer, steps, None, header)
}

fn encode_steps<W: Write>(
    writer: &mut W,
    steps: &[Step],
    root: Option<&Header>,
    local: &Header,
) -> Result<()> {
    for step in steps {
        match step {
            Step::Scalar {
                name,
                kind,
                presence,
            } => {
                if !is_present(*presence, root.unwrap_or(local), local) {
                    continue;
                }
                match kind {
                    ScalarKind::U8 => {
                        primitive::write_u8(writer, local.require_int(name)? as u8)?;
                    }
                    ScalarKind::I8 => {
                        primitive::write_i8(writer, local.require_int(name)? as i8)?;
                    }
                    ScalarKind::I16 => {
                        primitive::write_i16(writer, local.require_int(name)? as i16)?;
                    }
                    ScalarKind::U16 => {
                        primitive::write_u16(writer, local.require_int(name)? as u16)?;
                    }
                    ScalarKind::I32 => {
                        primitive::write_i32(writer, local.require_int(name)? as i32)?;
                    }
                    ScalarKind::F32 => {
                        primitive::write_f32(writer, local.require_float(name)? as f32)?;
                    }
                    ScalarKind::CString => {
                        primitive::write_cstring(writer, local.require_str(name)?)?;
                    }
                    ScalarKind::Rgb => {
                        primitive::write_rgb(writer, local.require_rgb(name)?)?;
                    }
                }
            }
            Step::Bytes { name, len } => {
                let bytes = local.require_bytes(name)?;
                if bytes.len() != *len {
                    return Err(Error::Layout(format!(
                        "reserved field '{name}' holds {} bytes, format requires {len}",
                        bytes.len()
                    )));
                }
                writer.write_all(bytes)?;
            }
            Step::I32Array {
                name,
                count,
                presence,
            } => {
                if !is_present(*presence, root.unwrap_or(local), local) {
                    continue;
                }
                let n = resolve_count(*count, root.unwrap_or(local), local)?;
                let values = local.require_int_list(name)?;
                if values.len() != n {
                    return Err(Error::Layout(format!(
                        "field '{name}' holds {} values, count field says {n}",
                        values.len()
                    )));
                }
                primitive::write_i32_array(writer, values)?;
            }
            Step::F32Array {
                name,
                count,
                presence,
            } => {
                if !is_present(*presence, root.unwrap_or(local), local) {
                    continue;
                }
                let n = resolve_count(*count, root.unwrap_or(local), local)?;
                let values = local.require_float_list(name)?;
                if values.len() != n {
                    return Err(Error::Layout(format!(
                        "field '{name}' holds {} values, count field says {n}",
                        values.len()
                    )));
                }
                primitive::write_f32_array(writer, values)?;
            }
            Step::Repeat { name, count, steps } => {
                let n = resolve_count(*count, root.unwrap_or(local), local)?;
                let blocks = local.require_blocks(name)?;
                if blocks.len() != n {
                    return Err(Error::Layout(format!(
                        "field '{name}' holds {} blocks, count field says {n}",
                        blocks.len()
                    )));
                }
                let root_view: &Header = root.unwrap_or(local);
                for block in blocks {
                    encode_steps(writer, steps, Some(root_view), block)?;
                }
            }
        }
    }
    Ok(())
}
