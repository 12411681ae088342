//! Node arrays of path elements.
//!
//! A path is written as four parallel attributes with one comma-separated
//! entry per node: `points` (anchors, `x y`), `points1` and `points2`
//! (control handles) and `mask` (active handles).

use crate::model::{BezierNode, Point2D};

/// The four node attributes of a path element.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeArrays {
    pub points: String,
    pub points1: String,
    pub points2: String,
    pub mask: String,
}

/// Render nodes as node arrays.
pub fn format_nodes(nodes: &[BezierNode]) -> NodeArrays {
    NodeArrays {
        points: join(nodes, |n| format_point(n.point)),
        points1: join(nodes, |n| format_point(n.control1)),
        points2: join(nodes, |n| format_point(n.control2)),
        mask: join(nodes, |n| n.mask.to_string()),
    }
}

fn join(nodes: &[BezierNode], entry: impl Fn(&BezierNode) -> String) -> String {
    nodes.iter().map(entry).collect::<Vec<_>>().join(",")
}

fn format_point(p: Point2D) -> String {
    format!("{} {}", p.x, p.y)
}

/// Parse node arrays. `points1`, `points2` and `mask` are optional; when
/// present they must have one entry per anchor.
pub fn parse_nodes(
    points: &str,
    points1: Option<&str>,
    points2: Option<&str>,
    mask: Option<&str>,
) -> Result<Vec<BezierNode>, String> {
    let anchors = parse_points(points)?;
    let controls = |text: Option<&str>, what: &str| -> Result<Vec<Point2D>, String> {
        match text {
            Some(text) => {
                let parsed = parse_points(text)?;
                if parsed.len() != anchors.len() {
                    return Err(format!(
                        "{} has {} entries for {} points",
                        what,
                        parsed.len(),
                        anchors.len()
                    ));
                }
                Ok(parsed)
            }
            None => Ok(anchors.clone()),
        }
    };
    let control1 = controls(points1, "points1")?;
    let control2 = controls(points2, "points2")?;
    let masks = match mask {
        Some(text) => {
            let masks = tokens(text)
                .map(|t| t.parse::<u8>().map_err(|_| format!("bad mask entry '{}'", t)))
                .collect::<Result<Vec<_>, _>>()?;
            if masks.len() != anchors.len() {
                return Err(format!(
                    "mask has {} entries for {} points",
                    masks.len(),
                    anchors.len()
                ));
            }
            masks
        }
        None => vec![BezierNode::C0_MASK; anchors.len()],
    };

    Ok(anchors
        .into_iter()
        .zip(control1)
        .zip(control2)
        .zip(masks)
        .map(|(((point, c1), c2), mask)| BezierNode::with_controls(point, c1, c2, mask))
        .collect())
}

/// Parse `x y,x y,...`. Commas and whitespace are interchangeable
/// separators; coordinates pair up in order.
pub fn parse_points(text: &str) -> Result<Vec<Point2D>, String> {
    let values = tokens(text)
        .map(|t| {
            t.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("bad coordinate '{}'", t))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() % 2 != 0 {
        return Err(format!("odd number of coordinates in '{}'", text));
    }
    Ok(values
        .chunks_exact(2)
        .map(|pair| Point2D::new(pair[0], pair[1]))
        .collect())
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
}
