//! Figures: geometry plus caption, transform, style and capabilities.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_TEXT;
use crate::model::geometry::Geometry;
use crate::model::style::FigureStyle;
use crate::model::transform::AffineTransform;

/// What the current user may do with a figure.
///
/// Neither external form stores these; both readers derive them from the
/// owning ROI's capabilities and the shape's server id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FigureFlags {
    pub editable: bool,
    pub deletable: bool,
    pub annotatable: bool,
    pub read_only: bool,
    /// Not yet assigned a server identity
    pub client_only: bool,
}

impl Default for FigureFlags {
    fn default() -> Self {
        Self {
            editable: true,
            deletable: true,
            annotatable: true,
            read_only: false,
            client_only: true,
        }
    }
}

/// Physical pixel sizes supplied by the image viewer.
///
/// Carried on figures for measurement display; never interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementUnits {
    pub pixel_size_x: f64,
    pub pixel_size_y: f64,
    #[serde(default)]
    pub pixel_size_z: f64,
    /// Whether measurements are shown in microns rather than pixels
    #[serde(default)]
    pub in_microns: bool,
}

/// A drawable figure.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    geometry: Geometry,
    caption: Option<String>,
    pub transform: AffineTransform,
    pub style: FigureStyle,
    pub flags: FigureFlags,
    pub units: Option<MeasurementUnits>,
}

impl Figure {
    /// Create a figure with the default style and an identity transform.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            caption: None,
            transform: AffineTransform::IDENTITY,
            style: FigureStyle::default(),
            flags: FigureFlags::default(),
            units: None,
        }
    }

    /// Set the caption (see [`Figure::set_caption`]).
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.set_caption(Some(caption.into()));
        self
    }

    pub fn with_transform(mut self, transform: AffineTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_style(mut self, style: FigureStyle) -> Self {
        self.style = style;
        self
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut Geometry {
        &mut self.geometry
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    /// Set the caption. Empty text and the drawing-tool placeholder
    /// ([`DEFAULT_TEXT`]) mean "no caption".
    pub fn set_caption(&mut self, caption: Option<String>) {
        self.caption = caption.filter(|text| !text.is_empty() && text != DEFAULT_TEXT);
    }

    /// Name of the geometry variant.
    pub fn kind(&self) -> &'static str {
        self.geometry.kind()
    }
}
