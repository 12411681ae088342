//! Typed annotation values attached to ROIs and shapes.

use std::collections::BTreeMap;

use crate::model::coord::Coord3D;
use crate::model::geometry::{Ellipse, Point2D, Rectangle};

/// Annotations keyed by name.
pub type Annotations = BTreeMap<String, AnnotationValue>;

/// A typed annotation value.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    String(String),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Point(Point2D),
    Rectangle(Rectangle),
    Ellipse(Ellipse),
    Coord(Coord3D),
    List(Vec<AnnotationValue>),
}

impl AnnotationValue {
    pub fn annotation_type(&self) -> AnnotationType {
        match self {
            AnnotationValue::String(_) => AnnotationType::String,
            AnnotationValue::Integer(_) => AnnotationType::Integer,
            AnnotationValue::Long(_) => AnnotationType::Long,
            AnnotationValue::Float(_) => AnnotationType::Float,
            AnnotationValue::Double(_) => AnnotationType::Double,
            AnnotationValue::Boolean(_) => AnnotationType::Boolean,
            AnnotationValue::Point(_) => AnnotationType::Point,
            AnnotationValue::Rectangle(_) => AnnotationType::Rectangle,
            AnnotationValue::Ellipse(_) => AnnotationType::Ellipse,
            AnnotationValue::Coord(_) => AnnotationType::Coord,
            AnnotationValue::List(_) => AnnotationType::List,
        }
    }
}

impl From<&str> for AnnotationValue {
    fn from(value: &str) -> Self {
        AnnotationValue::String(value.to_string())
    }
}

impl From<String> for AnnotationValue {
    fn from(value: String) -> Self {
        AnnotationValue::String(value)
    }
}

impl From<i32> for AnnotationValue {
    fn from(value: i32) -> Self {
        AnnotationValue::Integer(value)
    }
}

impl From<i64> for AnnotationValue {
    fn from(value: i64) -> Self {
        AnnotationValue::Long(value)
    }
}

impl From<f64> for AnnotationValue {
    fn from(value: f64) -> Self {
        AnnotationValue::Double(value)
    }
}

impl From<bool> for AnnotationValue {
    fn from(value: bool) -> Self {
        AnnotationValue::Boolean(value)
    }
}

/// Type of an annotation value, carried next to it on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationType {
    String,
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    Point,
    Rectangle,
    Ellipse,
    Coord,
    List,
}

impl AnnotationType {
    /// Wire tag of the type.
    pub fn tag(&self) -> &'static str {
        match self {
            AnnotationType::String => "String",
            AnnotationType::Integer => "Integer",
            AnnotationType::Long => "Long",
            AnnotationType::Float => "Float",
            AnnotationType::Double => "Double",
            AnnotationType::Boolean => "Boolean",
            AnnotationType::Point => "Point2D",
            AnnotationType::Rectangle => "Rectangle",
            AnnotationType::Ellipse => "Ellipse",
            AnnotationType::Coord => "Coord3D",
            AnnotationType::List => "List",
        }
    }

    /// Type for a wire tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::all().iter().copied().find(|t| t.tag() == tag)
    }

    /// All annotation types.
    pub fn all() -> &'static [AnnotationType] {
        &[
            AnnotationType::String,
            AnnotationType::Integer,
            AnnotationType::Long,
            AnnotationType::Float,
            AnnotationType::Double,
            AnnotationType::Boolean,
            AnnotationType::Point,
            AnnotationType::Rectangle,
            AnnotationType::Ellipse,
            AnnotationType::Coord,
            AnnotationType::List,
        ]
    }

    /// The value substituted when decoding fails.
    pub fn zero_value(&self) -> AnnotationValue {
        match self {
            AnnotationType::String => AnnotationValue::String(String::new()),
            AnnotationType::Integer => AnnotationValue::Integer(0),
            AnnotationType::Long => AnnotationValue::Long(0),
            AnnotationType::Float => AnnotationValue::Float(0.0),
            AnnotationType::Double => AnnotationValue::Double(0.0),
            AnnotationType::Boolean => AnnotationValue::Boolean(false),
            AnnotationType::Point => AnnotationValue::Point(Point2D::default()),
            AnnotationType::Rectangle => AnnotationValue::Rectangle(Rectangle::default()),
            AnnotationType::Ellipse => AnnotationValue::Ellipse(Ellipse::default()),
            AnnotationType::Coord => AnnotationValue::Coord(Coord3D::default()),
            AnnotationType::List => AnnotationValue::List(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_roundtrip() {
        for ty in AnnotationType::all() {
            assert_eq!(AnnotationType::from_tag(ty.tag()), Some(*ty));
            assert_eq!(ty.zero_value().annotation_type(), *ty);
        }
        assert_eq!(AnnotationType::from_tag("Quaternion"), None);
    }
}
