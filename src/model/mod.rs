//! Data models for ROIs, their shapes and the registry holding them.

mod annotation;
mod coord;
mod figure;
mod geometry;
mod registry;
mod roi;
mod style;
mod transform;

pub use annotation::{AnnotationType, AnnotationValue, Annotations};
pub use coord::{Coord3D, Plane};
pub use figure::{Figure, FigureFlags, MeasurementUnits};
pub use geometry::{
    BezierNode, Ellipse, FigureRef, Geometry, LineConnection, MaskShape, NodePath, Point2D,
    PointMarker, Rectangle, TextShape,
};
pub use registry::{Registry, RoiLookup};
pub use roi::{Roi, RoiOptions, RoiShape};
pub use style::{
    Color, FigureStyle, Gradient, GradientKind, LineCap, LineDecoration, LineJoin, Paint,
};
pub use transform::AffineTransform;

/// Identity of a ROI. Negative ids belong to ROIs not yet saved on a server.
pub type RoiId = i64;

/// Server identity of a single shape.
pub type ShapeId = i64;

/// Identity of a user (experimenter).
pub type UserId = i64;
