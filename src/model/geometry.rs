//! Geometry variants of a figure.

use image::GrayImage;

use crate::constants::{MIN_LINE_NODES, MIN_POLYGON_NODES};
use crate::error::RoiError;
use crate::model::registry::RoiLookup;
use crate::model::RoiId;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rectangle {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Centre of the rectangle.
    pub fn center(&self) -> Point2D {
        Point2D::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Smallest rectangle enclosing all points, `None` when empty.
    pub fn enclosing(points: impl IntoIterator<Item = Point2D>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }
}

/// An axis-aligned ellipse.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Ellipse {
    pub center_x: f64,
    pub center_y: f64,
    pub radius_x: f64,
    pub radius_y: f64,
}

impl Ellipse {
    pub const fn new(center_x: f64, center_y: f64, radius_x: f64, radius_y: f64) -> Self {
        Self {
            center_x,
            center_y,
            radius_x,
            radius_y,
        }
    }

    pub fn bounds(&self) -> Rectangle {
        Rectangle::new(
            self.center_x - self.radius_x,
            self.center_y - self.radius_y,
            2.0 * self.radius_x,
            2.0 * self.radius_y,
        )
    }
}

/// A point marker drawn with a fixed diameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointMarker {
    pub center_x: f64,
    pub center_y: f64,
    /// Marker diameter
    pub size: f64,
}

/// A binary mask placed on the image.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskShape {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Mask pixels; non-zero means set
    pub bitmap: GrayImage,
}

impl MaskShape {
    /// Whether the bitmap has no pixels.
    pub fn is_empty(&self) -> bool {
        self.bitmap.width() == 0 || self.bitmap.height() == 0
    }
}

/// A free-standing text label.
#[derive(Debug, Clone, PartialEq)]
pub struct TextShape {
    pub x: f64,
    pub y: f64,
    pub content: String,
}

/// A Bézier path node: an anchor and two control handles.
///
/// `mask` selects the active handles ([`BezierNode::C1_MASK`],
/// [`BezierNode::C2_MASK`]); inactive handles sit on the anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BezierNode {
    pub point: Point2D,
    pub control1: Point2D,
    pub control2: Point2D,
    pub mask: u8,
}

impl BezierNode {
    pub const C0_MASK: u8 = 0;
    pub const C1_MASK: u8 = 1;
    pub const C2_MASK: u8 = 2;
    pub const C1C2_MASK: u8 = 3;

    /// A corner node without active handles.
    pub const fn new(x: f64, y: f64) -> Self {
        let point = Point2D::new(x, y);
        Self {
            point,
            control1: point,
            control2: point,
            mask: Self::C0_MASK,
        }
    }

    /// A node with explicit handles.
    pub fn with_controls(point: Point2D, control1: Point2D, control2: Point2D, mask: u8) -> Self {
        Self {
            point,
            control1,
            control2,
            mask: mask & Self::C1C2_MASK,
        }
    }
}

impl From<Point2D> for BezierNode {
    fn from(p: Point2D) -> Self {
        Self::new(p.x, p.y)
    }
}

/// An ordered list of nodes; the node count and closure are fixed at
/// construction so the variant invariants cannot be broken later.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePath {
    nodes: Vec<BezierNode>,
    closed: bool,
}

impl NodePath {
    fn checked(
        nodes: Vec<BezierNode>,
        closed: bool,
        min: usize,
        what: &str,
    ) -> Result<Self, RoiError> {
        if nodes.len() < min {
            return Err(RoiError::invalid_geometry(format!(
                "{} needs at least {} nodes, got {}",
                what,
                min,
                nodes.len()
            )));
        }
        let finite = nodes.iter().all(|n| {
            [n.point, n.control1, n.control2]
                .iter()
                .all(|p| p.x.is_finite() && p.y.is_finite())
        });
        if !finite {
            return Err(RoiError::invalid_geometry(format!(
                "{} has non-finite coordinates",
                what
            )));
        }
        Ok(Self { nodes, closed })
    }

    pub fn nodes(&self) -> &[BezierNode] {
        &self.nodes
    }

    /// Anchor points, control handles dropped.
    pub fn points(&self) -> Vec<Point2D> {
        self.nodes.iter().map(|n| n.point).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Replace the node at `index`; the node count never changes.
    pub fn set_node(&mut self, index: usize, node: BezierNode) -> Result<(), RoiError> {
        let len = self.nodes.len();
        let slot = self.nodes.get_mut(index).ok_or_else(|| {
            RoiError::invalid_geometry(format!("node index {} out of range ({})", index, len))
        })?;
        *slot = node;
        Ok(())
    }

    pub fn bounds(&self) -> Rectangle {
        Rectangle::enclosing(self.nodes.iter().map(|n| n.point)).unwrap_or_default()
    }
}

/// Reference to the figure a connection is attached to.
///
/// The figure is the shape of ROI `roi_id` on the connection's own plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FigureRef {
    pub roi_id: RoiId,
}

impl FigureRef {
    pub const fn new(roi_id: RoiId) -> Self {
        Self { roi_id }
    }
}

/// A line joining two figures.
#[derive(Debug, Clone, PartialEq)]
pub struct LineConnection {
    start: FigureRef,
    end: FigureRef,
    path: NodePath,
}

impl LineConnection {
    pub fn start(&self) -> FigureRef {
        self.start
    }

    pub fn end(&self) -> FigureRef {
        self.end
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }
}

/// The closed set of figure geometries.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Rectangle(Rectangle),
    Ellipse(Ellipse),
    Point(PointMarker),
    Line(NodePath),
    Polyline(NodePath),
    Polygon(NodePath),
    Mask(MaskShape),
    Text(TextShape),
    Connection(LineConnection),
}

impl Geometry {
    /// A straight or curved line, at least two nodes.
    pub fn line(nodes: impl Into<Vec<BezierNode>>) -> Result<Self, RoiError> {
        NodePath::checked(nodes.into(), false, MIN_LINE_NODES, "line").map(Geometry::Line)
    }

    /// An open polyline, at least two nodes.
    pub fn polyline(nodes: impl Into<Vec<BezierNode>>) -> Result<Self, RoiError> {
        NodePath::checked(nodes.into(), false, MIN_LINE_NODES, "polyline").map(Geometry::Polyline)
    }

    /// A closed polygon, at least three nodes.
    pub fn polygon(nodes: impl Into<Vec<BezierNode>>) -> Result<Self, RoiError> {
        NodePath::checked(nodes.into(), true, MIN_POLYGON_NODES, "polygon").map(Geometry::Polygon)
    }

    /// A connection between figures of two (possibly equal) ROIs.
    ///
    /// Fails with [`RoiError::NoSuchRoi`] when either ROI is unknown to `rois`.
    pub fn connection(
        start: FigureRef,
        end: FigureRef,
        nodes: impl Into<Vec<BezierNode>>,
        rois: &impl RoiLookup,
    ) -> Result<Self, RoiError> {
        for endpoint in [start, end] {
            if !rois.contains_roi(endpoint.roi_id) {
                return Err(RoiError::NoSuchRoi {
                    id: endpoint.roi_id,
                });
            }
        }
        let path = NodePath::checked(nodes.into(), false, MIN_LINE_NODES, "connection")?;
        Ok(Geometry::Connection(LineConnection { start, end, path }))
    }

    /// Name of the variant (for logs and error messages).
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Rectangle(_) => "rectangle",
            Geometry::Ellipse(_) => "ellipse",
            Geometry::Point(_) => "point",
            Geometry::Line(_) => "line",
            Geometry::Polyline(_) => "polyline",
            Geometry::Polygon(_) => "polygon",
            Geometry::Mask(_) => "mask",
            Geometry::Text(_) => "text",
            Geometry::Connection(_) => "connection",
        }
    }

    /// Node path of the path-based variants.
    pub fn path(&self) -> Option<&NodePath> {
        match self {
            Geometry::Line(path) | Geometry::Polyline(path) | Geometry::Polygon(path) => Some(path),
            Geometry::Connection(connection) => Some(&connection.path),
            _ => None,
        }
    }

    /// Untransformed axis-aligned bounds.
    pub fn bounds(&self) -> Rectangle {
        match self {
            Geometry::Rectangle(rect) => *rect,
            Geometry::Ellipse(ellipse) => ellipse.bounds(),
            Geometry::Point(point) => Ellipse::new(
                point.center_x,
                point.center_y,
                point.size / 2.0,
                point.size / 2.0,
            )
            .bounds(),
            Geometry::Line(path) | Geometry::Polyline(path) | Geometry::Polygon(path) => {
                path.bounds()
            }
            Geometry::Connection(connection) => connection.path.bounds(),
            Geometry::Mask(mask) => Rectangle::new(mask.x, mask.y, mask.width, mask.height),
            Geometry::Text(text) => Rectangle::new(text.x, text.y, 0.0, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::model::{Registry, RoiOptions};

    fn square() -> Vec<BezierNode> {
        vec![
            BezierNode::new(0.0, 0.0),
            BezierNode::new(10.0, 0.0),
            BezierNode::new(10.0, 10.0),
            BezierNode::new(0.0, 10.0),
        ]
    }

    #[test]
    fn test_polygon_is_closed() {
        let polygon = Geometry::polygon(square()).unwrap();
        assert!(polygon.path().unwrap().is_closed());

        let polyline = Geometry::polyline(square()).unwrap();
        assert!(!polyline.path().unwrap().is_closed());
    }

    #[test]
    fn test_node_minimums() {
        let two = vec![BezierNode::new(0.0, 0.0), BezierNode::new(1.0, 1.0)];
        assert!(Geometry::line(two.clone()).is_ok());
        assert_matches!(
            Geometry::polygon(two),
            Err(RoiError::InvalidGeometry { .. })
        );
        assert_matches!(
            Geometry::line(vec![BezierNode::new(0.0, 0.0)]),
            Err(RoiError::InvalidGeometry { .. })
        );
    }

    #[test]
    fn test_set_node_keeps_count() {
        let Geometry::Polygon(mut path) = Geometry::polygon(square()).unwrap() else {
            panic!("expected polygon");
        };
        path.set_node(1, BezierNode::new(20.0, 0.0)).unwrap();
        assert_eq!(path.len(), 4);
        assert!(path.set_node(4, BezierNode::new(0.0, 0.0)).is_err());
    }

    #[test]
    fn test_connection_requires_rois() {
        let mut registry = Registry::new();
        registry
            .create_roi(RoiOptions::default().with_id(1))
            .unwrap();
        let nodes = vec![BezierNode::new(0.0, 0.0), BezierNode::new(5.0, 5.0)];

        assert!(
            Geometry::connection(FigureRef::new(1), FigureRef::new(1), nodes.clone(), &registry)
                .is_ok()
        );
        assert_matches!(
            Geometry::connection(FigureRef::new(1), FigureRef::new(2), nodes, &registry),
            Err(RoiError::NoSuchRoi { id: 2 })
        );
    }

    #[test]
    fn test_bounds() {
        let ellipse = Geometry::Ellipse(Ellipse::new(10.0, 10.0, 5.0, 2.0));
        assert_eq!(ellipse.bounds(), Rectangle::new(5.0, 8.0, 10.0, 4.0));

        let polygon = Geometry::polygon(square()).unwrap();
        assert_eq!(polygon.bounds().center(), Point2D::new(5.0, 5.0));
    }
}
