//! Shared low-level codecs used by every format adapter.

pub mod matrix;
pub mod primitive;
pub mod text;
