//! The `roiset` XML file format.
//!
//! A document holds one `roi` element per ROI; each `roishape` wraps an
//! `svg` element with one geometry element and an optional caption:
//!
//! ```xml
//! <roiset xmlns="https://www.openmicroscopy.org" version="1.0">
//!   <defs/>
//!   <roi id="1">
//!     <annotation/>
//!     <roishape t="0" z="0">
//!       <annotation/>
//!       <svg xmlns="http://www.w3.org/2000/svg" version="1.2">
//!         <rect x="10" y="20" width="30" height="40" stroke="#ff0000"/>
//!         <text x="25" y="40">nucleus</text>
//!       </svg>
//!     </roishape>
//!   </roi>
//! </roiset>
//! ```

mod dom;
mod paths;
mod reader;
mod writer;

use serde::{Deserialize, Serialize};

use crate::attributes::AttributeRegistry;
use crate::codec::RoiCodec;
use crate::error::RoiError;
use crate::model::{MeasurementUnits, Registry, RoiId};

pub use dom::{XmlNode, parse_document};
pub use paths::{NodeArrays, format_nodes, parse_nodes, parse_points};

/// Style attributes written on every geometry element.
pub const SHAPE_ATTRIBUTES: &[&str] = &[
    "fill",
    "fill-opacity",
    "stroke",
    "stroke-opacity",
    "stroke-width",
    "stroke-linecap",
    "stroke-linejoin",
    "stroke-miterlimit",
    "stroke-dasharray",
    "stroke-dashoffset",
    "font-family",
    "font-size",
    "font-style",
    "font-weight",
    "marker-start",
    "marker-end",
    "show-measurement",
    "show-text",
    "transform",
];

/// Attributes written on caption `text` elements.
pub const FONT_ATTRIBUTES: &[&str] = &["font-family", "font-size", "font-style", "font-weight"];

/// How `from`/`to` references of line connections are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionPolicy {
    /// The referenced ROI must already be in the registry or appear
    /// earlier in the document than the connection
    #[default]
    Strict,
    /// Any ROI in the registry or anywhere in the document resolves
    Deferred,
}

/// Options of the XML codec.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlOptions {
    /// Spaces per indentation level on write
    pub indent: usize,
    pub connection_policy: ConnectionPolicy,
    /// Attached to every figure read
    pub units: Option<MeasurementUnits>,
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            connection_policy: ConnectionPolicy::default(),
            units: None,
        }
    }
}

/// Reads and writes `roiset` documents.
pub struct XmlRoiCodec {
    attributes: AttributeRegistry,
    options: XmlOptions,
    /// ROI whose header was read last; a following header with the same id
    /// continues it instead of being applied again
    current_roi: Option<RoiId>,
}

impl XmlRoiCodec {
    pub fn new() -> Self {
        Self::with_options(XmlOptions::default())
    }

    pub fn with_options(options: XmlOptions) -> Self {
        Self {
            attributes: AttributeRegistry::new(),
            options,
            current_roi: None,
        }
    }

    pub fn options(&self) -> &XmlOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut XmlOptions {
        &mut self.options
    }

    pub fn attributes(&self) -> &AttributeRegistry {
        &self.attributes
    }

    /// Attribute registry, for registering extra attributes.
    pub fn attributes_mut(&mut self) -> &mut AttributeRegistry {
        &mut self.attributes
    }

    /// ROI currently continued by consecutive headers.
    pub fn current_roi(&self) -> Option<RoiId> {
        self.current_roi
    }

    /// Read a document into `registry`.
    pub fn read_str(
        &mut self,
        text: &str,
        registry: &mut Registry,
    ) -> Result<Vec<RoiId>, RoiError> {
        let root = parse_document(text)?;
        let outcome = reader::read_document(
            &root,
            registry,
            &self.attributes,
            &self.options,
            self.current_roi,
        )?;
        self.current_roi = outcome.last_roi.or(self.current_roi);
        Ok(outcome.touched)
    }

    /// Write `registry` as a document.
    pub fn write_string(&self, registry: &Registry) -> Result<String, RoiError> {
        writer::write_document(registry, &self.attributes, self.options.indent)
    }
}

impl Default for XmlRoiCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl RoiCodec for XmlRoiCodec {
    type Input<'a> = &'a str;
    type Output = String;
    type ReadContext = ();
    type WriteContext = ();

    fn id(&self) -> &'static str {
        "xml"
    }

    fn read(
        &mut self,
        input: &str,
        registry: &mut Registry,
        _context: &(),
    ) -> Result<Vec<RoiId>, RoiError> {
        self.read_str(input, registry)
    }

    fn write(&self, registry: &Registry, _context: &()) -> Result<String, RoiError> {
        self.write_string(registry)
    }

    fn reset(&mut self) {
        self.current_roi = None;
    }
}
