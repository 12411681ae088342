//! Global constants for the ROI interchange engine

use crate::model::Color;

/// Namespace of the `roiset` root element.
pub const ROISET_NAMESPACE: &str = "https://www.openmicroscopy.org";

/// Version written on the `roiset` root element.
pub const ROISET_VERSION: &str = "1.0";

/// Namespace of the per-shape `svg` element.
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Namespace bound to the `xlink` prefix on the `svg` element.
pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";

/// Version written on the per-shape `svg` element.
pub const SVG_VERSION: &str = "1.2";

/// Placeholder caption shown by the drawing tools; never persisted.
pub const DEFAULT_TEXT: &str = "Text";

/// Channel value meaning "no channel".
pub const UNSET_CHANNEL: i32 = -1;

/// Owner value meaning "not owned by anybody".
pub const NO_OWNER: i64 = -1;

/// Minimum number of nodes of a polygon.
pub const MIN_POLYGON_NODES: usize = 3;

/// Minimum number of nodes of a line or polyline.
pub const MIN_LINE_NODES: usize = 2;

/// Diameter given to point markers when none is known.
pub const DEFAULT_POINT_SIZE: f64 = 6.0;

// Default style table

/// Default fill colour.
pub const DEFAULT_FILL_COLOR: Color = Color::new(255, 255, 255);

/// Default fill opacity (transparent interior).
pub const DEFAULT_FILL_OPACITY: f64 = 0.0;

/// Default stroke colour.
pub const DEFAULT_STROKE_COLOR: Color = Color::new(196, 196, 196);

/// Default stroke opacity.
pub const DEFAULT_STROKE_OPACITY: f64 = 1.0;

/// Default stroke width in pixels.
pub const DEFAULT_STROKE_WIDTH: f64 = 1.0;

/// Default miter limit (SVG default).
pub const DEFAULT_MITER_LIMIT: f64 = 4.0;

/// Default font family.
pub const DEFAULT_FONT_FAMILY: &str = "sans-serif";

/// Default font size in points.
pub const DEFAULT_FONT_SIZE: f64 = 12.0;
