//! Typed annotation values in their wire form.
//!
//! Both the XML file format and the server transfer objects carry an
//! annotation as a type tag, a set of named text fields and, for lists, the
//! encoded elements.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AnnotationType, AnnotationValue, Coord3D, Ellipse, Point2D, Rectangle};

/// Errors from decoding an annotation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Unknown annotation type '{type_tag}'")]
    UnknownType { type_tag: String },

    #[error("{type_tag} annotation is missing field '{field}'")]
    MissingField { type_tag: String, field: &'static str },

    #[error("Malformed value '{value}' for field '{field}'")]
    Malformed { field: &'static str, value: String },
}

/// Wire form of one annotation value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EncodedAnnotation {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<EncodedAnnotation>,
}

impl EncodedAnnotation {
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, name: &str, value: impl ToString) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    fn field(&self, name: &'static str) -> Result<&str, DecodeError> {
        self.fields
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| DecodeError::MissingField {
                type_tag: self.type_tag.clone(),
                field: name,
            })
    }

    fn parsed<T: std::str::FromStr>(&self, name: &'static str) -> Result<T, DecodeError> {
        let text = self.field(name)?;
        text.trim().parse().map_err(|_| DecodeError::Malformed {
            field: name,
            value: text.to_string(),
        })
    }
}

/// Encode a value.
pub fn encode(value: &AnnotationValue) -> EncodedAnnotation {
    let encoded = EncodedAnnotation::new(value.annotation_type().tag());
    match value {
        AnnotationValue::String(s) => encoded.with_field("value", s),
        AnnotationValue::Integer(v) => encoded.with_field("value", v),
        AnnotationValue::Long(v) => encoded.with_field("value", v),
        AnnotationValue::Float(v) => encoded.with_field("value", v),
        AnnotationValue::Double(v) => encoded.with_field("value", v),
        AnnotationValue::Boolean(v) => encoded.with_field("value", v),
        AnnotationValue::Point(p) => encoded.with_field("x", p.x).with_field("y", p.y),
        AnnotationValue::Rectangle(r) => encoded
            .with_field("x", r.x)
            .with_field("y", r.y)
            .with_field("width", r.width)
            .with_field("height", r.height),
        AnnotationValue::Ellipse(e) => encoded
            .with_field("cx", e.center_x)
            .with_field("cy", e.center_y)
            .with_field("rx", e.radius_x)
            .with_field("ry", e.radius_y),
        AnnotationValue::Coord(c) => encoded
            .with_field("z", c.z)
            .with_field("t", c.t)
            .with_field("c", c.c),
        AnnotationValue::List(items) => EncodedAnnotation {
            elements: items.iter().map(encode).collect(),
            ..encoded
        },
    }
}

/// Decode a value, failing on an unknown tag or a missing or malformed
/// field. List elements are decoded with [`decode_or_default`].
pub fn decode(encoded: &EncodedAnnotation) -> Result<AnnotationValue, DecodeError> {
    let ty = AnnotationType::from_tag(&encoded.type_tag).ok_or_else(|| {
        DecodeError::UnknownType {
            type_tag: encoded.type_tag.clone(),
        }
    })?;

    let value = match ty {
        AnnotationType::String => AnnotationValue::String(encoded.field("value")?.to_string()),
        AnnotationType::Integer => AnnotationValue::Integer(encoded.parsed("value")?),
        AnnotationType::Long => AnnotationValue::Long(encoded.parsed("value")?),
        AnnotationType::Float => AnnotationValue::Float(encoded.parsed("value")?),
        AnnotationType::Double => AnnotationValue::Double(encoded.parsed("value")?),
        AnnotationType::Boolean => AnnotationValue::Boolean(encoded.parsed("value")?),
        AnnotationType::Point => {
            AnnotationValue::Point(Point2D::new(encoded.parsed("x")?, encoded.parsed("y")?))
        }
        AnnotationType::Rectangle => AnnotationValue::Rectangle(Rectangle::new(
            encoded.parsed("x")?,
            encoded.parsed("y")?,
            encoded.parsed("width")?,
            encoded.parsed("height")?,
        )),
        AnnotationType::Ellipse => AnnotationValue::Ellipse(Ellipse::new(
            encoded.parsed("cx")?,
            encoded.parsed("cy")?,
            encoded.parsed("rx")?,
            encoded.parsed("ry")?,
        )),
        AnnotationType::Coord => {
            let coord = Coord3D::new(encoded.parsed("z")?, encoded.parsed("t")?);
            let c = match encoded.fields.get("c") {
                Some(_) => encoded.parsed("c")?,
                None => coord.c,
            };
            AnnotationValue::Coord(coord.with_channel(c))
        }
        AnnotationType::List => AnnotationValue::List(
            encoded
                .elements
                .iter()
                .filter_map(decode_or_default)
                .collect(),
        ),
    };
    Ok(value)
}

/// Decode a value, substituting the type's zero value when it is malformed.
///
/// Returns `None` only for an unknown type tag, which has no zero value.
pub fn decode_or_default(encoded: &EncodedAnnotation) -> Option<AnnotationValue> {
    match decode(encoded) {
        Ok(value) => Some(value),
        Err(e @ DecodeError::UnknownType { .. }) => {
            log::warn!("Dropping annotation: {}", e);
            None
        }
        Err(e) => {
            log::warn!("Using default value: {}", e);
            AnnotationType::from_tag(&encoded.type_tag).map(|ty| ty.zero_value())
        }
    }
}
