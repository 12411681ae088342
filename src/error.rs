//! Error types for ROI model and codec operations.

use std::fmt;

use thiserror::Error;

use crate::codec::server::TransferRoi;
use crate::model::{Coord3D, RoiId};

/// Errors that can occur while building the ROI model or converting it.
#[derive(Error, Debug)]
pub enum RoiError {
    /// I/O error while opening, reading or writing a stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed markup reported by the XML tokenizer
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// JSON parsing or serialization error (configuration, transfer dumps)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Mask bitmap encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Document does not follow the expected structure
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the structural problem
        message: String,
    },

    /// Referenced ROI is not in the registry
    #[error("No such ROI: {id}")]
    NoSuchRoi {
        /// The missing ROI id
        id: RoiId,
    },

    /// ROI has no shape at the requested coordinate
    #[error("ROI {roi} has no shape at {coord}")]
    NoSuchShape {
        /// Owning ROI id
        roi: RoiId,
        /// Requested coordinate
        coord: Coord3D,
    },

    /// ROI already has a shape at the coordinate
    #[error("ROI {roi} already has a shape at {coord}")]
    DuplicateCoordinate {
        /// Owning ROI id
        roi: RoiId,
        /// Occupied coordinate
        coord: Coord3D,
    },

    /// A ROI with this id is already registered
    #[error("ROI {id} already exists")]
    DuplicateRoi {
        /// The clashing ROI id
        id: RoiId,
    },

    /// One or more shapes have no counterpart in the target representation
    #[error("{0}")]
    UnsupportedVariant(Box<UnsupportedShapes>),

    /// Geometry violates a construction invariant
    #[error("Invalid geometry: {message}")]
    InvalidGeometry {
        /// Description of the violated invariant
        message: String,
    },

    /// Transform cannot be inverted
    #[error("Degenerate transform (determinant {determinant})")]
    DegenerateTransform {
        /// Determinant of the rejected matrix
        determinant: f64,
    },

    /// Configuration file is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },
}

impl RoiError {
    /// Create a parse error with a message.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create an invalid geometry error.
    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// A shape that could not be converted.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsupportedShape {
    /// Owning ROI id
    pub roi: RoiId,
    /// Coordinate of the shape within the ROI
    pub coord: Coord3D,
    /// Name of the figure variant
    pub variant: &'static str,
}

/// Aggregate of every shape an export could not map.
///
/// The ROIs that did convert are kept in `exported` so a caller can still
/// send them.
#[derive(Debug, Clone)]
pub struct UnsupportedShapes {
    /// Shapes that were left out
    pub shapes: Vec<UnsupportedShape>,
    /// Transfer ROIs built from everything else
    pub exported: Vec<TransferRoi>,
}

impl fmt::Display for UnsupportedShapes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} shape(s) cannot be mapped to server shapes:",
            self.shapes.len()
        )?;
        for shape in &self.shapes {
            write!(f, " {} in ROI {} at {};", shape.variant, shape.roi, shape.coord)?;
        }
        Ok(())
    }
}
