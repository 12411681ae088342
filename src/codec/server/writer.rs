//! Registry to transfer objects.

use crate::codec::annotation::encode;
use crate::codec::server::{
    ARROW_MARKER, ExportRequest, FontStyle, Length, ShapeSettings, TransferAnnotation,
    TransferColor, TransferGeometry, TransferRoi, TransferShape,
};
use crate::error::{RoiError, UnsupportedShape, UnsupportedShapes};
use crate::model::{
    Annotations, Figure, Geometry, LineDecoration, NodePath, Paint, Registry, Roi, RoiShape,
};

pub(super) fn export(
    registry: &Registry,
    request: &ExportRequest,
) -> Result<Vec<TransferRoi>, RoiError> {
    let mut exported = Vec::new();
    let mut unsupported = Vec::new();

    for roi in registry
        .rois()
        .filter(|roi| request.mode.selects(roi, request.user_id))
    {
        let mut transfer = transfer_roi(roi, request);
        for shape in roi.shapes() {
            match transfer_shape(shape) {
                Some(converted) => transfer.shapes.push(converted),
                None => unsupported.push(UnsupportedShape {
                    roi: roi.id(),
                    coord: shape.coord(),
                    variant: shape.figure().kind(),
                }),
            }
        }
        exported.push(transfer);
    }

    if !unsupported.is_empty() {
        log::warn!(
            "{} shape(s) cannot be exported to the server",
            unsupported.len()
        );
        return Err(RoiError::UnsupportedVariant(Box::new(UnsupportedShapes {
            shapes: unsupported,
            exported,
        })));
    }

    log::info!(
        "Exported {} ROIs for image {} ({:?})",
        exported.len(),
        request.image.id,
        request.mode
    );
    Ok(exported)
}

fn transfer_roi(roi: &Roi, request: &ExportRequest) -> TransferRoi {
    TransferRoi {
        correlation_id: roi.uuid(),
        client_side: roi.is_client_side(),
        server_id: roi.server_id(),
        image: request.image.clone(),
        owner_id: roi.owner_id,
        can_edit: roi.can_edit,
        can_delete: roi.can_delete,
        can_annotate: roi.can_annotate,
        folders: roi.folders.iter().copied().collect(),
        annotations: transfer_annotations(&roi.annotations),
        shapes: Vec::new(),
    }
}

fn transfer_annotations(annotations: &Annotations) -> Vec<TransferAnnotation> {
    annotations
        .iter()
        .map(|(name, value)| TransferAnnotation {
            name: name.clone(),
            value: encode(value),
        })
        .collect()
}

/// `None` when the figure has no server counterpart.
fn transfer_shape(shape: &RoiShape) -> Option<TransferShape> {
    let figure = shape.figure();
    let coord = shape.coord();
    Some(TransferShape {
        id: shape.server_id(),
        z: coord.z,
        t: coord.t,
        c: coord.channel(),
        dirty: shape.is_dirty(),
        geometry: transfer_geometry(figure.geometry())?,
        transform: (!figure.transform.is_identity()).then(|| figure.transform.to_row_major()),
        text: figure.caption().map(str::to_string),
        settings: settings(figure),
        annotations: transfer_annotations(shape.annotations()),
    })
}

fn transfer_geometry(geometry: &Geometry) -> Option<TransferGeometry> {
    let converted = match geometry {
        Geometry::Rectangle(rect) => TransferGeometry::Rectangle {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        },
        Geometry::Ellipse(ellipse) => TransferGeometry::Ellipse {
            x: ellipse.center_x,
            y: ellipse.center_y,
            radius_x: ellipse.radius_x,
            radius_y: ellipse.radius_y,
        },
        Geometry::Point(point) => TransferGeometry::Point {
            x: point.center_x,
            y: point.center_y,
        },
        Geometry::Line(path) => TransferGeometry::Line {
            points: anchors(path),
        },
        Geometry::Connection(connection) => TransferGeometry::Line {
            points: anchors(connection.path()),
        },
        Geometry::Polyline(path) => TransferGeometry::Polyline {
            points: anchors(path),
        },
        Geometry::Polygon(path) => TransferGeometry::Polygon {
            points: anchors(path),
        },
        Geometry::Text(text) => TransferGeometry::Text {
            x: text.x,
            y: text.y,
            value: text.content.clone(),
        },
        Geometry::Mask(_) => return None,
    };
    Some(converted)
}

fn anchors(path: &NodePath) -> Vec<[f64; 2]> {
    path.nodes()
        .iter()
        .map(|node| [node.point.x, node.point.y])
        .collect()
}

fn settings(figure: &Figure) -> ShapeSettings {
    let style = &figure.style;
    ShapeSettings {
        stroke_color: transfer_color(&style.stroke, style.stroke_opacity),
        stroke_width: Some(Length::pixels(style.stroke_width)),
        fill_color: transfer_color(&style.fill, style.fill_opacity),
        font_family: Some(style.font_family.clone()),
        font_size: Some(Length::points(style.font_size)),
        font_style: Some(FontStyle::from_flags(style.font_bold, style.font_italic)),
        marker_start: marker(style.start_decoration),
        marker_end: marker(style.end_decoration),
    }
}

/// Gradients have no server form and travel as no colour.
fn transfer_color(paint: &Paint, opacity: f64) -> Option<TransferColor> {
    let color = paint.color()?;
    Some(TransferColor {
        r: color.r,
        g: color.g,
        b: color.b,
        a: (opacity.clamp(0.0, 1.0) * 255.0).round() as u8,
    })
}

fn marker(decoration: LineDecoration) -> Option<String> {
    match decoration {
        LineDecoration::Arrow => Some(ARROW_MARKER.to_string()),
        LineDecoration::None => None,
    }
}
