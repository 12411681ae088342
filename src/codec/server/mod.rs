//! Transfer objects exchanged with an image server.
//!
//! The server speaks in flat shapes: Bézier nodes collapse to their anchor
//! points, styles become a [`ShapeSettings`] record and every ROI carries
//! the image it belongs to. Transfer objects serialise with serde so they
//! can be dumped as JSON.

mod reader;
mod writer;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::RoiCodec;
use crate::codec::annotation::EncodedAnnotation;
use crate::error::RoiError;
use crate::model::{MeasurementUnits, Registry, Roi, RoiId, ShapeId, UserId};

/// The image a set of ROIs is drawn on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ImageRef {
    pub fn new(id: i64) -> Self {
        Self { id, name: None }
    }
}

/// Which ROIs an export includes, judged by capability and owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    Annotatable,
    Editable,
    Deletable,
    /// Deletable, and owned by the acting user or by nobody
    DeletableOwned,
    /// Deletable, and owned by somebody else
    DeletableByOthers,
    #[default]
    All,
}

impl SelectionMode {
    /// Whether `roi` is selected for `user`.
    pub fn selects(&self, roi: &Roi, user: UserId) -> bool {
        match self {
            SelectionMode::Annotatable => roi.can_annotate,
            SelectionMode::Editable => roi.can_edit,
            SelectionMode::Deletable => roi.can_delete,
            SelectionMode::DeletableOwned => {
                roi.can_delete && (roi.is_unowned() || roi.is_owned_by(user))
            }
            SelectionMode::DeletableByOthers => {
                roi.can_delete && !roi.is_unowned() && !roi.is_owned_by(user)
            }
            SelectionMode::All => true,
        }
    }
}

/// A named annotation in wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferAnnotation {
    pub name: String,
    pub value: EncodedAnnotation,
}

/// One ROI as the server sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRoi {
    /// Client UUID, used to match ROIs the server has not numbered yet
    pub correlation_id: Uuid,
    pub client_side: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<RoiId>,
    pub image: ImageRef,
    pub owner_id: UserId,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_annotate: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub folders: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<TransferAnnotation>,
    #[serde(default)]
    pub shapes: Vec<TransferShape>,
}

/// One shape of a transfer ROI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferShape {
    /// Server shape id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ShapeId>,
    pub z: u32,
    pub t: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c: Option<u32>,
    #[serde(default)]
    pub dirty: bool,
    pub geometry: TransferGeometry,
    /// Row-major affine matrix; absent means identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<[f64; 6]>,
    /// Caption
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub settings: ShapeSettings,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<TransferAnnotation>,
}

/// Server shape types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransferGeometry {
    Rectangle {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Ellipse {
        x: f64,
        y: f64,
        radius_x: f64,
        radius_y: f64,
    },
    Point {
        x: f64,
        y: f64,
    },
    Line {
        points: Vec<[f64; 2]>,
    },
    Polyline {
        points: Vec<[f64; 2]>,
    },
    Polygon {
        points: Vec<[f64; 2]>,
    },
    /// Row-major 8-bit pixels, `columns * rows` bytes
    Mask {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        columns: u32,
        rows: u32,
        bytes: Vec<u8>,
    },
    Text {
        x: f64,
        y: f64,
        value: String,
    },
}

impl TransferGeometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            TransferGeometry::Rectangle { .. } => "rectangle",
            TransferGeometry::Ellipse { .. } => "ellipse",
            TransferGeometry::Point { .. } => "point",
            TransferGeometry::Line { .. } => "line",
            TransferGeometry::Polyline { .. } => "polyline",
            TransferGeometry::Polygon { .. } => "polygon",
            TransferGeometry::Mask { .. } => "mask",
            TransferGeometry::Text { .. } => "text",
        }
    }
}

/// An RGBA colour; alpha carries the opacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Unit of a [`Length`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    Pixel,
    Point,
}

impl LengthUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            LengthUnit::Pixel => "px",
            LengthUnit::Point => "pt",
        }
    }
}

/// A length with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Length {
    pub value: f64,
    pub unit: LengthUnit,
}

impl Length {
    pub fn pixels(value: f64) -> Self {
        Self {
            value,
            unit: LengthUnit::Pixel,
        }
    }

    pub fn points(value: f64) -> Self {
        Self {
            value,
            unit: LengthUnit::Point,
        }
    }
}

/// Font style as the server names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontStyle {
    #[default]
    Normal,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    pub fn from_flags(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => FontStyle::Normal,
            (true, false) => FontStyle::Bold,
            (false, true) => FontStyle::Italic,
            (true, true) => FontStyle::BoldItalic,
        }
    }

    pub fn is_bold(&self) -> bool {
        matches!(self, FontStyle::Bold | FontStyle::BoldItalic)
    }

    pub fn is_italic(&self) -> bool {
        matches!(self, FontStyle::Italic | FontStyle::BoldItalic)
    }
}

/// Display settings of a transfer shape. An absent colour means no paint;
/// other absent fields take the default style.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<TransferColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<Length>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<TransferColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<Length>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_style: Option<FontStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_end: Option<String>,
}

/// Server name of the arrow line decoration.
pub const ARROW_MARKER: &str = "Arrow";

/// Inputs of an export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub image: ImageRef,
    pub mode: SelectionMode,
    /// Acting user, for the owner-based modes
    pub user_id: UserId,
}

/// Inputs of an import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRequest {
    /// Acting user; ROIs owned by others are not editable
    pub user_id: UserId,
    /// Attached to every figure read
    pub units: Option<MeasurementUnits>,
}

impl ImportRequest {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            units: None,
        }
    }
}

/// Converts between the registry and server transfer objects.
#[derive(Debug, Default)]
pub struct ServerTransferCodec;

impl ServerTransferCodec {
    pub fn new() -> Self {
        Self
    }

    /// Build transfer ROIs for every ROI `request.mode` selects.
    ///
    /// Shapes with no server counterpart (masks) fail the export with one
    /// [`RoiError::UnsupportedVariant`] listing all of them; the ROIs built
    /// from the rest travel inside the error.
    pub fn export(
        &self,
        registry: &Registry,
        request: &ExportRequest,
    ) -> Result<Vec<TransferRoi>, RoiError> {
        writer::export(registry, request)
    }

    /// Merge transfer ROIs into `registry`, returning the ids touched.
    pub fn import(
        &self,
        rois: &[TransferRoi],
        registry: &mut Registry,
        request: &ImportRequest,
    ) -> Result<Vec<RoiId>, RoiError> {
        reader::import(rois, registry, request)
    }

    /// Like [`import`](Self::import), returning the touched ROIs themselves.
    pub fn import_rois<'r>(
        &self,
        rois: &[TransferRoi],
        registry: &'r mut Registry,
        request: &ImportRequest,
    ) -> Result<Vec<&'r Roi>, RoiError> {
        let ids = self.import(rois, registry, request)?;
        let registry: &'r Registry = registry;
        Ok(ids.iter().filter_map(|id| registry.roi(*id)).collect())
    }
}

impl RoiCodec for ServerTransferCodec {
    type Input<'a> = &'a [TransferRoi];
    type Output = Vec<TransferRoi>;
    type ReadContext = ImportRequest;
    type WriteContext = ExportRequest;

    fn id(&self) -> &'static str {
        "server"
    }

    fn read(
        &mut self,
        input: &[TransferRoi],
        registry: &mut Registry,
        context: &ImportRequest,
    ) -> Result<Vec<RoiId>, RoiError> {
        self.import(input, registry, context)
    }

    fn write(
        &self,
        registry: &Registry,
        context: &ExportRequest,
    ) -> Result<Vec<TransferRoi>, RoiError> {
        self.export(registry, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RoiOptions;

    #[test]
    fn test_selection_modes() {
        let mut registry = Registry::new();
        let mine = registry
            .create_roi(RoiOptions::default().with_id(1).owner(7))
            .unwrap()
            .id();
        let theirs = registry
            .create_roi(RoiOptions::default().with_id(2).owner(8))
            .unwrap()
            .id();
        let unowned = registry
            .create_roi(RoiOptions::default().with_id(3))
            .unwrap()
            .id();
        let locked = registry
            .create_roi(
                RoiOptions::default()
                    .with_id(4)
                    .owner(7)
                    .capabilities(false, false, false),
            )
            .unwrap()
            .id();

        let selected = |mode: SelectionMode| -> Vec<RoiId> {
            registry
                .rois()
                .filter(|roi| mode.selects(roi, 7))
                .map(Roi::id)
                .collect()
        };

        assert_eq!(selected(SelectionMode::All), vec![mine, theirs, unowned, locked]);
        assert_eq!(selected(SelectionMode::Editable), vec![mine, theirs, unowned]);
        assert_eq!(selected(SelectionMode::DeletableOwned), vec![mine, unowned]);
        assert_eq!(selected(SelectionMode::DeletableByOthers), vec![theirs]);
        assert_eq!(selected(SelectionMode::Annotatable), vec![mine, theirs, unowned]);
    }

    #[test]
    fn test_selection_mode_names() {
        let mode: SelectionMode = serde_json::from_str("\"deletable-by-others\"").unwrap();
        assert_eq!(mode, SelectionMode::DeletableByOthers);
        assert_eq!(
            serde_json::to_string(&SelectionMode::DeletableOwned).unwrap(),
            "\"deletable-owned\""
        );
    }

    #[test]
    fn test_font_style_flags() {
        let style = FontStyle::from_flags(true, true);
        assert_eq!(style, FontStyle::BoldItalic);
        assert!(style.is_bold() && style.is_italic());
        assert!(!FontStyle::Normal.is_bold());
    }

    #[test]
    fn test_geometry_json_tag() {
        let geometry = TransferGeometry::Point { x: 1.0, y: 2.0 };
        let json = serde_json::to_value(&geometry).unwrap();
        assert_eq!(json["type"], "point");
        assert_eq!(geometry.type_name(), "point");
    }
}
