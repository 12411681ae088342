//! roiset - ROI geometry interchange
//!
//! Regions of interest drawn on microscopy images, kept in one in-memory
//! [`Registry`] and converted to and from two external forms: the
//! SVG-flavoured `roiset` XML document and the transfer objects exchanged
//! with an image server.
//!
//! ```rust,ignore
//! use roiset::{RoiIo, SelectionMode, ImageRef};
//!
//! let mut io = RoiIo::new();
//! io.read_from_file(Path::new("cells.xml"))?;
//! let rois = io.write_to_server(ImageRef::new(42), SelectionMode::Editable, 7)?;
//! ```

pub mod attributes;
pub mod cli;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod model;

pub use codec::server::{ImageRef, SelectionMode, TransferRoi};
pub use codec::{RoiCodec, ServerTransferCodec, XmlRoiCodec};
pub use config::EngineConfig;
pub use error::RoiError;
pub use io::RoiIo;
pub use model::{Coord3D, Figure, Geometry, Registry, Roi, RoiShape};
