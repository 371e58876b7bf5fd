//! Read and write BrainVoyager neuroimaging file formats.
//!
//! BrainVoyager stores anatomical volumes (VMR/V16), functional time series
//! (FMR/STC, VTC), diffusion data (DMR/DWI), statistical results (GLM, VMP,
//! SMP), surface meshes (SRF) and a family of smaller text records (VOI,
//! POI, PRT, SDM, ROI, TRF, FBR). All binary formats share one header
//! dialect: little-endian scalars, null-terminated strings, RGB triplets,
//! and conditional fields gated by the file version or by earlier fields.
//!
//! The crate is split along that shared structure:
//!
//! - [`codec`] reads and writes the primitive field types,
//! - [`schema`] drives version-dependent header grammars from declarative
//!   step tables,
//! - [`layout`] derives payload dimensions from decoded headers,
//! - [`axis`] moves payload arrays between on-disk and canonical axis
//!   order,
//! - [`formats`] combines these into one read/write pair per file type.
//!
//! Decoded headers come back as an ordered [`header::Header`] map, payloads
//! as [`ndarray`] arrays in a canonical right-handed axis order.
//!
//! ```no_run
//! let (header, volume) = bvio::formats::vmr::read("sub-01.vmr")?;
//! println!("{} voxels", volume.len());
//! bvio::formats::vmr::write("copy.vmr", &header, &volume)?;
//! # Ok::<(), bvio::Error>(())
//! ```

pub mod axis;
pub mod codec;
pub mod error;
pub mod formats;
pub mod header;
pub mod layout;
pub mod schema;

pub use error::{Error, Result};
pub use header::{FieldValue, Header};
