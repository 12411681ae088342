//! The `transform` attribute grammar.

use crate::attributes::AttributeError;
use crate::error::RoiError;
use crate::model::AffineTransform;

/// Parse a transform list such as `translate(4 2) scale(2)`.
///
/// Accepts `none`, `translate`, `scale`, `rotate` and row-major `matrix`.
/// Transforms in a list compose left to right: the rightmost one applies to
/// the geometry first.
pub fn parse_transform(text: &str) -> Result<AffineTransform, AttributeError> {
    let text = text.trim();
    if text.is_empty() || text == "none" {
        return Ok(AffineTransform::IDENTITY);
    }

    let invalid = || AttributeError::invalid("transform", text);
    let mut result = AffineTransform::IDENTITY;
    let mut rest = text;

    while !rest.is_empty() {
        let open = rest.find('(').ok_or_else(invalid)?;
        let close = rest.find(')').ok_or_else(invalid)?;
        if close < open {
            return Err(invalid());
        }
        let name = rest[..open].trim();
        let args = parse_args(&rest[open + 1..close]).ok_or_else(invalid)?;

        let next = match (name, args.as_slice()) {
            ("translate", [tx]) => AffineTransform::translation(*tx, 0.0),
            ("translate", [tx, ty]) => AffineTransform::translation(*tx, *ty),
            ("scale", [s]) => AffineTransform::scale(*s, *s),
            ("scale", [sx, sy]) => AffineTransform::scale(*sx, *sy),
            ("rotate", [deg]) => AffineTransform::rotation(*deg),
            ("matrix", [a, b, c, d, e, f]) => AffineTransform::new(*a, *b, *c, *d, *e, *f),
            _ => return Err(invalid()),
        };
        result = next
            .and_then(|next| result.multiply(&next))
            .map_err(AttributeError::from)?;

        rest = rest[close + 1..].trim_start_matches(|c: char| c == ',' || c.is_whitespace());
    }

    Ok(result)
}

/// Render the simplest exact form of a transform.
pub fn format_transform(transform: &AffineTransform) -> String {
    if transform.is_identity() {
        return "none".to_string();
    }
    if transform.is_translation() {
        let (tx, ty) = transform.translation_part();
        return if ty == 0.0 {
            format!("translate({})", tx)
        } else {
            format!("translate({} {})", tx, ty)
        };
    }
    if transform.is_scale() {
        let (sx, sy) = transform.scale_part();
        return if sx == sy {
            format!("scale({})", sx)
        } else {
            format!("scale({} {})", sx, sy)
        };
    }
    let [a, b, c, d, e, f] = transform.to_row_major();
    format!("matrix({} {} {} {} {} {})", a, b, c, d, e, f)
}

fn parse_args(args: &str) -> Option<Vec<f64>> {
    args.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect()
}

impl From<RoiError> for AttributeError {
    fn from(error: RoiError) -> Self {
        match error {
            RoiError::DegenerateTransform { determinant } => {
                AttributeError::DegenerateTransform { determinant }
            }
            other => AttributeError::invalid("transform", other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_forms() {
        let cases = [
            ("none", "none"),
            ("translate(5)", "translate(5)"),
            ("translate(5, 0)", "translate(5)"),
            ("translate(5 7)", "translate(5 7)"),
            ("scale(2)", "scale(2)"),
            ("scale(2 2)", "scale(2)"),
            ("scale(2, 3)", "scale(2 3)"),
            ("matrix(1 0 0 0 1 0)", "none"),
            ("matrix(1 0.5 3 0 1 4)", "matrix(1 0.5 3 0 1 4)"),
            ("matrix(2 0 5 0 2 0)", "matrix(2 0 5 0 2 0)"),
        ];
        for (input, expected) in cases {
            let transform = parse_transform(input).unwrap();
            assert_eq!(format_transform(&transform), expected, "input {}", input);
        }
    }

    #[test]
    fn test_transform_list_composes() {
        let transform = parse_transform("translate(10 0) scale(2)").unwrap();
        assert_eq!(transform.apply(1.0, 1.0), (12.0, 2.0));
        assert_eq!(format_transform(&transform), "matrix(2 0 10 0 2 0)");
    }

    #[test]
    fn test_rotate() {
        let transform = parse_transform("rotate(90)").unwrap();
        let (x, y) = transform.apply(1.0, 0.0);
        assert!(x.abs() < 1e-12);
        assert!((y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            parse_transform("scale(0)"),
            Err(AttributeError::DegenerateTransform { .. })
        ));
        assert!(parse_transform("skewX(30)").is_err());
        assert!(parse_transform("translate(a b)").is_err());
        assert!(parse_transform("translate(1").is_err());
    }
}
