//! Parse and render functions for the built-in style attributes.

use crate::attributes::color::{format_paint, parse_paint};
use crate::attributes::transform::{format_transform, parse_transform};
use crate::attributes::{
    AttributeError, AttributeParser, AttributeSource, GradientTable, ParseResult,
};
use crate::model::{Figure, LineCap, LineDecoration, LineJoin};

/// All built-in attribute parsers.
pub fn builtin() -> Vec<AttributeParser> {
    vec![
        AttributeParser::new("fill", parse_fill, render_fill),
        AttributeParser::new("fill-opacity", parse_fill_opacity, |s, _| {
            number(s.style.fill_opacity)
        }),
        AttributeParser::new("stroke", parse_stroke, render_stroke),
        AttributeParser::new("stroke-opacity", parse_stroke_opacity, |s, _| {
            number(s.style.stroke_opacity)
        }),
        AttributeParser::new("stroke-width", parse_stroke_width, |s, _| {
            number(s.style.stroke_width)
        }),
        AttributeParser::new("stroke-linecap", parse_linecap, |s, _| {
            String::from(match s.style.stroke_cap {
                LineCap::Butt => "butt",
                LineCap::Round => "round",
                LineCap::Square => "square",
            })
        }),
        AttributeParser::new("stroke-linejoin", parse_linejoin, |s, _| {
            String::from(match s.style.stroke_join {
                LineJoin::Miter => "miter",
                LineJoin::Round => "round",
                LineJoin::Bevel => "bevel",
            })
        }),
        AttributeParser::new("stroke-miterlimit", parse_miterlimit, |s, _| {
            number(s.style.stroke_miter_limit)
        }),
        AttributeParser::new("stroke-dasharray", parse_dasharray, render_dasharray),
        AttributeParser::new("stroke-dashoffset", parse_dashoffset, |s, _| {
            number(s.style.stroke_dash_offset)
        }),
        AttributeParser::new("font-family", parse_font_family, |s, _| {
            s.style.font_family.clone()
        }),
        AttributeParser::new("font-size", parse_font_size, |s, _| {
            number(s.style.font_size)
        }),
        AttributeParser::new("font-style", parse_font_style, |s, _| {
            String::from(if s.style.font_italic { "italic" } else { "normal" })
        }),
        AttributeParser::new("font-weight", parse_font_weight, |s, _| {
            String::from(if s.style.font_bold { "bold" } else { "normal" })
        }),
        AttributeParser::new("marker-start", parse_marker_start, |s, _| {
            decoration(s.style.start_decoration)
        }),
        AttributeParser::new("marker-end", parse_marker_end, |s, _| {
            decoration(s.style.end_decoration)
        }),
        AttributeParser::new("show-measurement", parse_show_measurement, |s, _| {
            s.style.show_measurement.to_string()
        }),
        AttributeParser::new("show-text", parse_show_text, |s, _| {
            s.style.show_text.to_string()
        }),
        AttributeParser::new("transform", parse_transform_attr, |s, _| {
            format_transform(s.transform)
        }),
    ]
}

fn number(value: f64) -> String {
    format!("{}", value)
}

fn parse_number(kind: &'static str, text: &str) -> Result<f64, AttributeError> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_suffix("px")
        .or_else(|| trimmed.strip_suffix("pt"))
        .unwrap_or(trimmed);
    digits
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AttributeError::invalid(kind, text))
}

fn parse_non_negative(kind: &'static str, text: &str) -> Result<f64, AttributeError> {
    let value = parse_number(kind, text)?;
    if value < 0.0 {
        return Err(AttributeError::invalid(kind, text));
    }
    Ok(value)
}

fn parse_opacity(kind: &'static str, text: &str) -> Result<f64, AttributeError> {
    let value = parse_number(kind, text)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(AttributeError::invalid(kind, text));
    }
    Ok(value)
}

fn parse_bool(kind: &'static str, text: &str) -> Result<bool, AttributeError> {
    match text.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(AttributeError::invalid(kind, text)),
    }
}

fn parse_decoration(text: &str) -> Result<LineDecoration, AttributeError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "none" => Ok(LineDecoration::None),
        "arrow" => Ok(LineDecoration::Arrow),
        _ => Err(AttributeError::invalid("marker", text)),
    }
}

fn decoration(decoration: LineDecoration) -> String {
    String::from(match decoration {
        LineDecoration::None => "none",
        LineDecoration::Arrow => "arrow",
    })
}

fn parse_fill(text: &str, figure: &mut Figure, gradients: &GradientTable) -> ParseResult {
    figure.style.fill = parse_paint(text, gradients)?;
    Ok(())
}

fn render_fill(source: &AttributeSource<'_>, gradients: &GradientTable) -> String {
    format_paint(&source.style.fill, gradients)
}

fn parse_stroke(text: &str, figure: &mut Figure, gradients: &GradientTable) -> ParseResult {
    figure.style.stroke = parse_paint(text, gradients)?;
    Ok(())
}

fn render_stroke(source: &AttributeSource<'_>, gradients: &GradientTable) -> String {
    format_paint(&source.style.stroke, gradients)
}

fn parse_fill_opacity(text: &str, figure: &mut Figure, _: &GradientTable) -> ParseResult {
    figure.style.fill_opacity = parse_opacity("fill-opacity", text)?;
    Ok(())
}

fn parse_stroke_opacity(text: &str, figure: &mut Figure, _: &GradientTable) -> ParseResult {
    figure.style.stroke_opacity = parse_opacity("stroke-opacity", text)?;
    Ok(())
}

fn parse_stroke_width(text: &str, figure: &mut Figure, _: &GradientTable) -> ParseResult {
    figure.style.stroke_width = parse_non_negative("stroke-width", text)?;
    Ok(())
}

fn parse_linecap(text: &str, figure: &mut Figure, _: &GradientTable) -> ParseResult {
    figure.style.stroke_cap = match text.trim() {
        "butt" => LineCap::Butt,
        "round" => LineCap::Round,
        "square" => LineCap::Square,
        _ => return Err(AttributeError::invalid("stroke-linecap", text)),
    };
    Ok(())
}

fn parse_linejoin(text: &str, figure: &mut Figure, _: &GradientTable) -> ParseResult {
    figure.style.stroke_join = match text.trim() {
        "miter" => LineJoin::Miter,
        "round" => LineJoin::Round,
        "bevel" => LineJoin::Bevel,
        _ => return Err(AttributeError::invalid("stroke-linejoin", text)),
    };
    Ok(())
}

fn parse_miterlimit(text: &str, figure: &mut Figure, _: &GradientTable) -> ParseResult {
    let value = parse_number("stroke-miterlimit", text)?;
    if value < 1.0 {
        return Err(AttributeError::invalid("stroke-miterlimit", text));
    }
    figure.style.stroke_miter_limit = value;
    Ok(())
}

fn parse_dasharray(text: &str, figure: &mut Figure, _: &GradientTable) -> ParseResult {
    let trimmed = text.trim();
    if trimmed == "none" || trimmed.is_empty() {
        figure.style.stroke_dash_array.clear();
        return Ok(());
    }
    figure.style.stroke_dash_array = trimmed
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| parse_non_negative("stroke-dasharray", s))
        .collect::<Result<_, _>>()?;
    Ok(())
}

fn render_dasharray(source: &AttributeSource<'_>, _: &GradientTable) -> String {
    if source.style.stroke_dash_array.is_empty() {
        return "none".to_string();
    }
    source
        .style
        .stroke_dash_array
        .iter()
        .map(|v| number(*v))
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_dashoffset(text: &str, figure: &mut Figure, _: &GradientTable) -> ParseResult {
    figure.style.stroke_dash_offset = parse_number("stroke-dashoffset", text)?;
    Ok(())
}

fn parse_font_family(text: &str, figure: &mut Figure, _: &GradientTable) -> ParseResult {
    let family = text.trim();
    if family.is_empty() {
        return Err(AttributeError::invalid("font-family", text));
    }
    figure.style.font_family = family.to_string();
    Ok(())
}

fn parse_font_size(text: &str, figure: &mut Figure, _: &GradientTable) -> ParseResult {
    let size = parse_number("font-size", text)?;
    if size <= 0.0 {
        return Err(AttributeError::invalid("font-size", text));
    }
    figure.style.font_size = size;
    Ok(())
}

fn parse_font_style(text: &str, figure: &mut Figure, _: &GradientTable) -> ParseResult {
    figure.style.font_italic = match text.trim() {
        "normal" => false,
        "italic" | "oblique" => true,
        _ => return Err(AttributeError::invalid("font-style", text)),
    };
    Ok(())
}

fn parse_font_weight(text: &str, figure: &mut Figure, _: &GradientTable) -> ParseResult {
    let text = text.trim();
    figure.style.font_bold = match text {
        "normal" | "lighter" => false,
        "bold" | "bolder" => true,
        numeric => match numeric.parse::<u16>() {
            Ok(weight) => weight >= 600,
            Err(_) => return Err(AttributeError::invalid("font-weight", text)),
        },
    };
    Ok(())
}

fn parse_marker_start(text: &str, figure: &mut Figure, _: &GradientTable) -> ParseResult {
    figure.style.start_decoration = parse_decoration(text)?;
    Ok(())
}

fn parse_marker_end(text: &str, figure: &mut Figure, _: &GradientTable) -> ParseResult {
    figure.style.end_decoration = parse_decoration(text)?;
    Ok(())
}

fn parse_show_measurement(text: &str, figure: &mut Figure, _: &GradientTable) -> ParseResult {
    figure.style.show_measurement = parse_bool("show-measurement", text)?;
    Ok(())
}

fn parse_show_text(text: &str, figure: &mut Figure, _: &GradientTable) -> ParseResult {
    figure.style.show_text = parse_bool("show-text", text)?;
    Ok(())
}

fn parse_transform_attr(text: &str, figure: &mut Figure, _: &GradientTable) -> ParseResult {
    figure.transform = parse_transform(text)?;
    Ok(())
}
