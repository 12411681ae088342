//! Registry of named style attributes.
//!
//! Every presentation attribute of a shape element (`fill`, `stroke-width`,
//! `transform`, ...) has one [`AttributeParser`] that reads its text into a
//! [`Figure`] and renders it back. The XML codec routes every attribute that
//! is not part of the basic geometry through [`AttributeRegistry`].

pub mod color;
mod parsers;
pub mod transform;

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::model::{AffineTransform, Figure, FigureStyle, Gradient};

/// Errors from parsing a single attribute value. Always recoverable: the
/// attribute keeps its previous value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttributeError {
    #[error("Invalid {kind} value '{value}'")]
    InvalidValue { kind: &'static str, value: String },

    #[error("Unknown gradient reference '#{id}'")]
    UnknownGradient { id: String },

    #[error("Degenerate transform (determinant {determinant})")]
    DegenerateTransform { determinant: f64 },
}

impl AttributeError {
    pub fn invalid(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            kind,
            value: value.into(),
        }
    }
}

/// Result of parsing one attribute.
pub type ParseResult = Result<(), AttributeError>;

/// Parses attribute text into a figure.
pub type ParseFn = fn(&str, &mut Figure, &GradientTable) -> ParseResult;

/// Renders an attribute of a style and transform.
pub type RenderFn = fn(&AttributeSource<'_>, &GradientTable) -> String;

/// The values an attribute is rendered from.
#[derive(Debug, Clone, Copy)]
pub struct AttributeSource<'a> {
    pub style: &'a FigureStyle,
    pub transform: &'a AffineTransform,
}

impl<'a> AttributeSource<'a> {
    pub fn of(figure: &'a Figure) -> Self {
        Self {
            style: &figure.style,
            transform: &figure.transform,
        }
    }

    /// A default style with no transform.
    pub fn defaults(style: &'a FigureStyle) -> Self {
        Self {
            style,
            transform: &AffineTransform::IDENTITY,
        }
    }
}

/// A named attribute with its parse and render functions.
#[derive(Clone, Copy)]
pub struct AttributeParser {
    name: &'static str,
    parse: ParseFn,
    render: RenderFn,
}

impl AttributeParser {
    pub fn new(name: &'static str, parse: ParseFn, render: RenderFn) -> Self {
        Self {
            name,
            parse,
            render,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Gradient definitions of one document.
///
/// Readers fill it from `defs` and resolve `url(#id)` references against
/// it. Writers register every gradient a figure points at; gradients are
/// deduplicated by identity (`Arc::ptr_eq`) and numbered `gradient0`,
/// `gradient1`, ...
#[derive(Debug, Clone, Default)]
pub struct GradientTable {
    entries: Vec<(String, Arc<Gradient>)>,
}

impl GradientTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a gradient read from a document under its own id.
    pub fn insert(&mut self, id: impl Into<String>, gradient: Arc<Gradient>) {
        let id = id.into();
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.push((id, gradient));
    }

    /// The gradient defined as `id`.
    pub fn resolve(&self, id: &str) -> Option<Arc<Gradient>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, gradient)| gradient.clone())
    }

    /// Register a gradient for writing, returning its id.
    pub fn register(&mut self, gradient: &Arc<Gradient>) -> String {
        if let Some(id) = self.id_of(gradient) {
            return id.to_string();
        }
        let id = format!("gradient{}", self.entries.len());
        self.entries.push((id.clone(), gradient.clone()));
        id
    }

    /// Id of a registered gradient, compared by identity.
    pub fn id_of(&self, gradient: &Arc<Gradient>) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, existing)| Arc::ptr_eq(existing, gradient))
            .map(|(id, _)| id.as_str())
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Gradient>)> {
        self.entries.iter().map(|(id, gradient)| (id.as_str(), gradient))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Attribute parsers keyed by attribute name.
pub struct AttributeRegistry {
    parsers: HashMap<&'static str, AttributeParser>,
}

impl AttributeRegistry {
    /// Create a registry with all built-in attributes registered.
    pub fn new() -> Self {
        let mut registry = Self {
            parsers: HashMap::new(),
        };
        for parser in parsers::builtin() {
            registry.register(parser);
        }
        registry
    }

    /// Register (or replace) an attribute parser.
    pub fn register(&mut self, parser: AttributeParser) {
        self.parsers.insert(parser.name, parser);
    }

    pub fn get(&self, name: &str) -> Option<&AttributeParser> {
        self.parsers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parsers.contains_key(name)
    }

    /// Registered attribute names.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.parsers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Parse `text` into the attribute `name` of `figure`.
    ///
    /// Returns `Ok(false)` for names without a parser. On error the figure
    /// is left unchanged.
    pub fn try_parse(
        &self,
        name: &str,
        text: &str,
        figure: &mut Figure,
        gradients: &GradientTable,
    ) -> Result<bool, AttributeError> {
        let Some(parser) = self.parsers.get(name) else {
            return Ok(false);
        };
        (parser.parse)(text, figure, gradients)?;
        Ok(true)
    }

    /// Like [`AttributeRegistry::try_parse`], logging malformed values and
    /// keeping the previous value instead of failing.
    pub fn parse(
        &self,
        name: &str,
        text: &str,
        figure: &mut Figure,
        gradients: &GradientTable,
    ) -> bool {
        match self.try_parse(name, text, figure, gradients) {
            Ok(known) => {
                if !known {
                    log::debug!("Ignoring unknown attribute '{}'", name);
                }
                known
            }
            Err(e) => {
                log::warn!("Keeping previous value of '{}': {}", name, e);
                true
            }
        }
    }

    /// Render attribute `name` of `figure`, `None` when it equals the value
    /// rendered from `defaults` (or the name is unknown).
    pub fn write(
        &self,
        name: &str,
        figure: &Figure,
        defaults: &FigureStyle,
        gradients: &GradientTable,
    ) -> Option<String> {
        let parser = self.parsers.get(name)?;
        let current = (parser.render)(&AttributeSource::of(figure), gradients);
        let default = (parser.render)(&AttributeSource::defaults(defaults), gradients);
        (current != default).then_some(current)
    }
}

impl Default for AttributeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
