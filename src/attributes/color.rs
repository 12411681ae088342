//! Paint values: colours, `none` and gradient references.

use crate::attributes::{AttributeError, GradientTable};
use crate::model::{Color, Paint};

/// Named colours accepted on input.
const NAMED_COLORS: &[(&str, Color)] = &[
    ("black", Color::BLACK),
    ("white", Color::WHITE),
    ("red", Color::RED),
    ("green", Color::GREEN),
    ("blue", Color::BLUE),
    ("yellow", Color::YELLOW),
    ("cyan", Color::new(0, 255, 255)),
    ("magenta", Color::new(255, 0, 255)),
    ("gray", Color::new(128, 128, 128)),
    ("grey", Color::new(128, 128, 128)),
    ("orange", Color::new(255, 165, 0)),
];

/// Parse a paint value.
pub fn parse_paint(text: &str, gradients: &GradientTable) -> Result<Paint, AttributeError> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("none") {
        return Ok(Paint::None);
    }
    if let Some(reference) = text.strip_prefix("url(") {
        let id = reference
            .strip_suffix(')')
            .map(|r| r.trim().trim_start_matches('#'))
            .ok_or_else(|| AttributeError::invalid("paint", text))?;
        return gradients
            .resolve(id)
            .map(Paint::Gradient)
            .ok_or_else(|| AttributeError::UnknownGradient { id: id.to_string() });
    }
    parse_color(text).map(Paint::Color)
}

/// Render a paint value. Gradients not in the table render as `none`.
pub fn format_paint(paint: &Paint, gradients: &GradientTable) -> String {
    match paint {
        Paint::None => "none".to_string(),
        Paint::Color(color) => format_color(*color),
        Paint::Gradient(gradient) => match gradients.id_of(gradient) {
            Some(id) => format!("url(#{})", id),
            None => {
                log::warn!("Gradient missing from definitions, writing 'none'");
                "none".to_string()
            }
        },
    }
}

/// Parse `#rrggbb`, `#rgb`, `rgb(r, g, b)` or a named colour.
pub fn parse_color(text: &str) -> Result<Color, AttributeError> {
    let text = text.trim();
    let invalid = || AttributeError::invalid("color", text);

    if let Some(hex) = text.strip_prefix('#') {
        let digit = |i: usize| {
            hex.get(i..i + 1)
                .and_then(|d| u8::from_str_radix(d, 16).ok())
                .ok_or_else(invalid)
        };
        let pair = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|d| u8::from_str_radix(d, 16).ok())
                .ok_or_else(invalid)
        };
        return match hex.len() {
            6 => Ok(Color::new(pair(0)?, pair(2)?, pair(4)?)),
            3 => Ok(Color::new(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)),
            _ => Err(invalid()),
        };
    }

    if let Some(args) = text.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
        let channels: Vec<u8> = args
            .split(',')
            .map(|c| c.trim().parse::<u8>().map_err(|_| invalid()))
            .collect::<Result<_, _>>()?;
        return match channels.as_slice() {
            [r, g, b] => Ok(Color::new(*r, *g, *b)),
            _ => Err(invalid()),
        };
    }

    NAMED_COLORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(text))
        .map(|(_, color)| *color)
        .ok_or_else(invalid)
}

/// Render a colour as `#rrggbb`.
pub fn format_color(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::{Gradient, GradientKind};

    #[test]
    fn test_color_forms() {
        assert_eq!(parse_color("#ff8000").unwrap(), Color::new(255, 128, 0));
        assert_eq!(parse_color("#F80").unwrap(), Color::new(255, 136, 0));
        assert_eq!(parse_color("rgb(1, 2, 3)").unwrap(), Color::new(1, 2, 3));
        assert_eq!(parse_color("Red").unwrap(), Color::RED);
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("rgb(300, 0, 0)").is_err());
        assert!(parse_color("chartreuse").is_err());
    }

    #[test]
    fn test_format_color() {
        assert_eq!(format_color(Color::new(196, 196, 196)), "#c4c4c4");
    }

    #[test]
    fn test_paint_references() {
        let mut gradients = GradientTable::new();
        let gradient = Arc::new(Gradient {
            kind: GradientKind::Linear,
            attributes: Vec::new(),
            stops: Vec::new(),
        });
        gradients.insert("g1", gradient.clone());

        let paint = parse_paint("url(#g1)", &gradients).unwrap();
        assert_eq!(paint, Paint::Gradient(gradient));
        assert_eq!(format_paint(&paint, &gradients), "url(#g1)");
        assert_eq!(parse_paint("none", &gradients).unwrap(), Paint::None);
        assert!(matches!(
            parse_paint("url(#missing)", &gradients),
            Err(AttributeError::UnknownGradient { .. })
        ));
    }
}
