//! Visual style carried by every figure.

use std::sync::Arc;

use crate::constants::{
    DEFAULT_FILL_COLOR, DEFAULT_FILL_OPACITY, DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE,
    DEFAULT_MITER_LIMIT, DEFAULT_STROKE_COLOR, DEFAULT_STROKE_OPACITY, DEFAULT_STROKE_WIDTH,
};

/// An opaque RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 128, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);
    pub const YELLOW: Color = Color::new(255, 255, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Gradient element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientKind {
    Linear,
    Radial,
}

impl GradientKind {
    /// SVG element name.
    pub fn element_name(&self) -> &'static str {
        match self {
            GradientKind::Linear => "linearGradient",
            GradientKind::Radial => "radialGradient",
        }
    }

    /// Kind for an SVG element name.
    pub fn from_element_name(name: &str) -> Option<Self> {
        match name {
            "linearGradient" => Some(GradientKind::Linear),
            "radialGradient" => Some(GradientKind::Radial),
            _ => None,
        }
    }
}

/// A gradient paint server.
///
/// The engine never interprets gradients: attributes and stops are kept
/// verbatim and written back as they were read.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    pub kind: GradientKind,
    /// Attributes of the gradient element, excluding its id
    pub attributes: Vec<(String, String)>,
    /// Attributes of each `stop` child, in order
    pub stops: Vec<Vec<(String, String)>>,
}

/// How a fill or stroke is painted.
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    None,
    Color(Color),
    /// Shared gradient; figures pointing at the same `Arc` share one definition on write
    Gradient(Arc<Gradient>),
}

impl Paint {
    /// The flat colour, if this is one.
    pub fn color(&self) -> Option<Color> {
        match self {
            Paint::Color(color) => Some(*color),
            _ => None,
        }
    }
}

/// Shape used at the ends of open strokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

/// Shape used at stroke corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

/// Decoration drawn at the start or end of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineDecoration {
    #[default]
    None,
    Arrow,
}

/// Complete style of a figure. Every attribute always has a value; the
/// [`Default`] impl is the fixed default table used when reading documents.
#[derive(Debug, Clone, PartialEq)]
pub struct FigureStyle {
    pub fill: Paint,
    pub fill_opacity: f64,
    pub stroke: Paint,
    pub stroke_opacity: f64,
    pub stroke_width: f64,
    pub stroke_cap: LineCap,
    pub stroke_join: LineJoin,
    pub stroke_miter_limit: f64,
    /// Dash lengths; empty means a solid line
    pub stroke_dash_array: Vec<f64>,
    pub stroke_dash_offset: f64,
    pub font_family: String,
    pub font_size: f64,
    pub font_bold: bool,
    pub font_italic: bool,
    pub start_decoration: LineDecoration,
    pub end_decoration: LineDecoration,
    pub show_measurement: bool,
    pub show_text: bool,
}

impl Default for FigureStyle {
    fn default() -> Self {
        Self {
            fill: Paint::Color(DEFAULT_FILL_COLOR),
            fill_opacity: DEFAULT_FILL_OPACITY,
            stroke: Paint::Color(DEFAULT_STROKE_COLOR),
            stroke_opacity: DEFAULT_STROKE_OPACITY,
            stroke_width: DEFAULT_STROKE_WIDTH,
            stroke_cap: LineCap::default(),
            stroke_join: LineJoin::default(),
            stroke_miter_limit: DEFAULT_MITER_LIMIT,
            stroke_dash_array: Vec::new(),
            stroke_dash_offset: 0.0,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            font_bold: false,
            font_italic: false,
            start_decoration: LineDecoration::None,
            end_decoration: LineDecoration::None,
            show_measurement: false,
            show_text: true,
        }
    }
}

impl FigureStyle {
    /// Set the stroke colour.
    pub fn with_stroke(mut self, color: Color) -> Self {
        self.stroke = Paint::Color(color);
        self
    }

    /// Set the stroke width.
    pub fn with_stroke_width(mut self, width: f64) -> Self {
        self.stroke_width = width;
        self
    }

    /// Set the fill colour and opacity.
    pub fn with_fill(mut self, color: Color, opacity: f64) -> Self {
        self.fill = Paint::Color(color);
        self.fill_opacity = opacity;
        self
    }

    /// Gradients referenced by fill or stroke.
    pub fn gradients(&self) -> impl Iterator<Item = &Arc<Gradient>> {
        [&self.fill, &self.stroke]
            .into_iter()
            .filter_map(|paint| match paint {
                Paint::Gradient(gradient) => Some(gradient),
                _ => None,
            })
    }
}
