//! Transfer objects to registry.
//!
//! ROIs are matched by server id, then by correlation UUID. A client-side
//! ROI that comes back with a server id is renumbered. Shapes whose
//! coordinate is already taken are left alone, so importing the same
//! transfer twice changes nothing.

use std::collections::BTreeMap;

use image::GrayImage;

use crate::codec::annotation::decode_or_default;
use crate::codec::server::{
    ARROW_MARKER, ImportRequest, ShapeSettings, TransferAnnotation, TransferColor,
    TransferGeometry, TransferRoi, TransferShape,
};
use crate::constants::{DEFAULT_POINT_SIZE, UNSET_CHANNEL};
use crate::error::RoiError;
use crate::model::{
    AffineTransform, Annotations, BezierNode, Color, Coord3D, Ellipse, Figure, FigureFlags,
    FigureStyle, Geometry, LineDecoration, MaskShape, Paint, PointMarker, Rectangle, Registry,
    Roi, RoiId, RoiOptions, RoiShape, TextShape,
};

pub(super) fn import(
    rois: &[TransferRoi],
    registry: &mut Registry,
    request: &ImportRequest,
) -> Result<Vec<RoiId>, RoiError> {
    let mut staged: BTreeMap<RoiId, Roi> = BTreeMap::new();
    let mut retired: Vec<RoiId> = Vec::new();
    let mut touched: Vec<RoiId> = Vec::new();
    let mut added = 0usize;
    let mut existing = 0usize;
    let mut skipped = 0usize;

    for transfer in rois {
        let mut roi = stage_roi(transfer, registry, &mut staged, &mut retired);
        touched.retain(|id| !retired.contains(id));
        apply_header(&mut roi, transfer, request);

        for shape in &transfer.shapes {
            let coord = coordinate(shape);
            if roi.contains(coord) {
                existing += 1;
                continue;
            }
            match build_shape(shape, &roi, request) {
                Ok(built) => {
                    roi.insert_shape(built)?;
                    added += 1;
                }
                Err(message) => {
                    log::warn!(
                        "Skipping {} shape of ROI {}: {}",
                        shape.geometry.type_name(),
                        roi.id(),
                        message
                    );
                    skipped += 1;
                }
            }
        }

        if !touched.contains(&roi.id()) {
            touched.push(roi.id());
        }
        staged.insert(roi.id(), roi);
    }

    log::info!(
        "Imported {} ROIs: {} shapes added, {} already present, {} skipped",
        touched.len(),
        added,
        existing,
        skipped
    );
    for id in retired {
        registry.remove_roi(id)?;
    }
    registry.commit(staged.into_values());
    Ok(touched)
}

/// The ROI a transfer updates, taken out of the staging set or copied from
/// the registry, or a new one.
fn stage_roi(
    transfer: &TransferRoi,
    registry: &mut Registry,
    staged: &mut BTreeMap<RoiId, Roi>,
    retired: &mut Vec<RoiId>,
) -> Roi {
    if let Some(id) = transfer.server_id {
        if let Some(roi) = staged.remove(&id) {
            return roi;
        }
        if let Some(roi) = registry.roi(id) {
            return roi.clone();
        }
    }

    let staged_match = staged
        .values()
        .find(|roi| roi.uuid() == transfer.correlation_id)
        .map(Roi::id);
    let matched = match staged_match {
        Some(id) => staged.remove(&id),
        None => registry.roi_by_uuid(transfer.correlation_id).cloned(),
    };
    if let Some(roi) = matched {
        return match transfer.server_id {
            Some(server_id) if roi.is_client_side() => {
                log::debug!("ROI {} saved as {}", roi.id(), server_id);
                if registry.contains(roi.id()) {
                    retired.push(roi.id());
                }
                roi.into_server(server_id)
            }
            _ => roi,
        };
    }

    let options = RoiOptions::default().uuid(transfer.correlation_id);
    match transfer.server_id {
        Some(id) => Roi::new(id, &options.with_id(id)),
        None => {
            let id = registry.next_client_id();
            Roi::new(id, &options.with_id(id))
        }
    }
}

fn apply_header(roi: &mut Roi, transfer: &TransferRoi, request: &ImportRequest) {
    roi.owner_id = transfer.owner_id;
    roi.can_edit = transfer.can_edit && transfer.owner_id == request.user_id;
    roi.can_delete = transfer.can_delete;
    roi.can_annotate = transfer.can_annotate;
    roi.folders = transfer.folders.iter().copied().collect();
    roi.annotations.extend(annotations(&transfer.annotations));
}

fn annotations(transferred: &[TransferAnnotation]) -> Annotations {
    transferred
        .iter()
        .filter_map(|a| decode_or_default(&a.value).map(|value| (a.name.clone(), value)))
        .collect()
}

fn coordinate(shape: &TransferShape) -> Coord3D {
    let channel = shape
        .c
        .and_then(|c| i32::try_from(c).ok())
        .unwrap_or(UNSET_CHANNEL);
    Coord3D::new(shape.z, shape.t).with_channel(channel)
}

fn build_shape(
    shape: &TransferShape,
    roi: &Roi,
    request: &ImportRequest,
) -> Result<RoiShape, String> {
    let mut figure = Figure::new(geometry(&shape.geometry)?);
    figure.style = style(&shape.settings);
    figure.transform = match shape.transform {
        Some(m) => AffineTransform::from_row_major(m).unwrap_or_else(|e| {
            log::warn!("Replacing transform of ROI {} with identity: {}", roi.id(), e);
            AffineTransform::IDENTITY
        }),
        None => AffineTransform::IDENTITY,
    };
    figure.set_caption(shape.text.clone());
    figure.flags = FigureFlags {
        editable: roi.can_edit,
        deletable: roi.can_delete,
        annotatable: roi.can_annotate,
        read_only: !roi.can_edit,
        client_only: shape.id.is_none(),
    };
    figure.units = request.units.clone();

    let mut built = RoiShape::new(roi.id(), coordinate(shape), figure)
        .with_annotations(annotations(&shape.annotations));
    if let Some(id) = shape.id {
        built = built.with_server_id(id);
    }
    if !shape.dirty {
        built.mark_clean();
    }
    Ok(built)
}

fn nodes(points: &[[f64; 2]]) -> Vec<BezierNode> {
    points.iter().map(|[x, y]| BezierNode::new(*x, *y)).collect()
}

fn geometry(transferred: &TransferGeometry) -> Result<Geometry, String> {
    let geometry = match transferred {
        TransferGeometry::Rectangle {
            x,
            y,
            width,
            height,
        } => Geometry::Rectangle(Rectangle::new(*x, *y, *width, *height)),
        TransferGeometry::Ellipse {
            x,
            y,
            radius_x,
            radius_y,
        } => Geometry::Ellipse(Ellipse::new(*x, *y, *radius_x, *radius_y)),
        TransferGeometry::Point { x, y } => Geometry::Point(PointMarker {
            center_x: *x,
            center_y: *y,
            size: DEFAULT_POINT_SIZE,
        }),
        TransferGeometry::Line { points } => {
            Geometry::line(nodes(points)).map_err(|e| e.to_string())?
        }
        TransferGeometry::Polyline { points } => {
            Geometry::polyline(nodes(points)).map_err(|e| e.to_string())?
        }
        TransferGeometry::Polygon { points } => {
            Geometry::polygon(nodes(points)).map_err(|e| e.to_string())?
        }
        TransferGeometry::Mask {
            x,
            y,
            width,
            height,
            columns,
            rows,
            bytes,
        } => {
            if *columns == 0 || *rows == 0 {
                return Err(format!("empty {}x{} mask", columns, rows));
            }
            let bitmap = GrayImage::from_raw(*columns, *rows, bytes.clone()).ok_or_else(|| {
                format!("{} mask bytes for {}x{} pixels", bytes.len(), columns, rows)
            })?;
            Geometry::Mask(MaskShape {
                x: *x,
                y: *y,
                width: *width,
                height: *height,
                bitmap,
            })
        }
        TransferGeometry::Text { x, y, value } => Geometry::Text(TextShape {
            x: *x,
            y: *y,
            content: value.clone(),
        }),
    };
    Ok(geometry)
}

fn paint(color: Option<TransferColor>) -> (Paint, Option<f64>) {
    match color {
        Some(c) => (
            Paint::Color(Color::new(c.r, c.g, c.b)),
            Some(f64::from(c.a) / 255.0),
        ),
        None => (Paint::None, None),
    }
}

fn style(settings: &ShapeSettings) -> FigureStyle {
    let mut style = FigureStyle::default();

    let (stroke, opacity) = paint(settings.stroke_color);
    style.stroke = stroke;
    style.stroke_opacity = opacity.unwrap_or(style.stroke_opacity);
    let (fill, opacity) = paint(settings.fill_color);
    style.fill = fill;
    style.fill_opacity = opacity.unwrap_or(style.fill_opacity);

    if let Some(width) = settings.stroke_width {
        style.stroke_width = width.value;
    }
    if let Some(family) = &settings.font_family {
        style.font_family = family.clone();
    }
    if let Some(size) = settings.font_size {
        style.font_size = size.value;
    }
    if let Some(font_style) = settings.font_style {
        style.font_bold = font_style.is_bold();
        style.font_italic = font_style.is_italic();
    }
    style.start_decoration = decoration(settings.marker_start.as_deref());
    style.end_decoration = decoration(settings.marker_end.as_deref());
    style
}

fn decoration(marker: Option<&str>) -> LineDecoration {
    match marker {
        Some(name) if name.eq_ignore_ascii_case(ARROW_MARKER) => LineDecoration::Arrow,
        _ => LineDecoration::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::server::{FontStyle, ImageRef, Length};
    use uuid::Uuid;

    fn transfer(server_id: Option<RoiId>, owner: i64) -> TransferRoi {
        TransferRoi {
            correlation_id: Uuid::new_v4(),
            client_side: server_id.is_none(),
            server_id,
            image: ImageRef::new(1),
            owner_id: owner,
            can_edit: true,
            can_delete: true,
            can_annotate: true,
            folders: Vec::new(),
            annotations: Vec::new(),
            shapes: vec![TransferShape {
                id: Some(100),
                z: 1,
                t: 2,
                c: Some(0),
                dirty: false,
                geometry: TransferGeometry::Point { x: 3.0, y: 4.0 },
                transform: None,
                text: Some("spot".to_string()),
                settings: ShapeSettings::default(),
                annotations: Vec::new(),
            }],
        }
    }

    #[test]
    fn test_point_gets_default_size() {
        let mut registry = Registry::new();
        let ids = import(&[transfer(Some(5), 7)], &mut registry, &ImportRequest::new(7)).unwrap();
        assert_eq!(ids, vec![5]);
        let shape = registry
            .get_shape(5, Coord3D::new(1, 2).with_channel(0))
            .unwrap();
        assert_eq!(shape.server_id(), Some(100));
        assert!(!shape.is_dirty());
        assert_eq!(shape.figure().caption(), Some("spot"));
        match shape.figure().geometry() {
            Geometry::Point(point) => assert_eq!(point.size, DEFAULT_POINT_SIZE),
            other => panic!("expected a point, got {}", other.kind()),
        }
    }

    #[test]
    fn test_edit_downgraded_for_other_owner() {
        let mut registry = Registry::new();
        import(&[transfer(Some(5), 8)], &mut registry, &ImportRequest::new(7)).unwrap();
        let roi = registry.get_roi(5).unwrap();
        assert!(!roi.can_edit);
        assert!(roi.can_delete);
        assert!(roi.shapes().all(|s| s.figure().flags.read_only));
    }

    #[test]
    fn test_client_roi_renumbered_by_uuid() {
        let mut registry = Registry::new();
        let mut first = transfer(None, 7);
        let ids = import(&[first.clone()], &mut registry, &ImportRequest::new(7)).unwrap();
        assert_eq!(ids.len(), 1);
        let client_id = ids[0];
        assert!(client_id < 0);

        first.server_id = Some(50);
        first.client_side = false;
        let ids = import(&[first.clone()], &mut registry, &ImportRequest::new(7)).unwrap();
        assert_eq!(ids, vec![50]);
        assert!(!registry.contains(client_id));
        let roi = registry.get_roi(50).unwrap();
        assert_eq!(roi.uuid(), first.correlation_id);
        assert!(!roi.is_client_side());
        assert!(roi.shapes().all(|s| s.roi_id() == 50));
    }

    #[test]
    fn test_degenerate_transform_replaced() {
        let mut registry = Registry::new();
        let mut roi = transfer(Some(5), 7);
        roi.shapes[0].transform = Some([0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        import(&[roi], &mut registry, &ImportRequest::new(7)).unwrap();
        let shape = registry.get_shape(5, Coord3D::new(1, 2)).unwrap();
        assert!(shape.figure().transform.is_identity());
    }

    #[test]
    fn test_bad_shapes_are_skipped() {
        let mut registry = Registry::new();
        let mut roi = transfer(Some(5), 7);
        let base = roi.shapes[0].clone();
        roi.shapes.push(TransferShape {
            z: 3,
            geometry: TransferGeometry::Polygon {
                points: vec![[0.0, 0.0], [1.0, 1.0]],
            },
            ..base.clone()
        });
        roi.shapes.push(TransferShape {
            z: 4,
            geometry: TransferGeometry::Mask {
                x: 0.0,
                y: 0.0,
                width: 2.0,
                height: 2.0,
                columns: 2,
                rows: 2,
                bytes: vec![0, 255, 255],
            },
            ..base.clone()
        });
        import(&[roi], &mut registry, &ImportRequest::new(7)).unwrap();
        assert_eq!(registry.get_roi(5).unwrap().shape_count(), 1);
    }

    #[test]
    fn test_empty_mask_rejected() {
        let mut registry = Registry::new();
        let mut roi = transfer(Some(5), 7);
        let base = roi.shapes[0].clone();
        roi.shapes.push(TransferShape {
            z: 3,
            geometry: TransferGeometry::Mask {
                x: 0.0,
                y: 0.0,
                width: 0.0,
                height: 0.0,
                columns: 0,
                rows: 0,
                bytes: Vec::new(),
            },
            ..base
        });
        import(&[roi], &mut registry, &ImportRequest::new(7)).unwrap();
        let roi = registry.get_roi(5).unwrap();
        assert_eq!(roi.shape_count(), 1);
        assert!(roi.shape(Coord3D::new(3, 2)).is_none());
    }

    #[test]
    fn test_settings_to_style() {
        let settings = ShapeSettings {
            stroke_color: Some(TransferColor {
                r: 0,
                g: 0,
                b: 255,
                a: 255,
            }),
            stroke_width: Some(Length::pixels(3.0)),
            fill_color: None,
            font_family: Some("serif".to_string()),
            font_size: Some(Length::points(9.0)),
            font_style: Some(FontStyle::Italic),
            marker_start: None,
            marker_end: Some("arrow".to_string()),
        };
        let style = style(&settings);
        assert_eq!(style.stroke, Paint::Color(Color::BLUE));
        assert_eq!(style.stroke_opacity, 1.0);
        assert_eq!(style.stroke_width, 3.0);
        assert_eq!(style.fill, Paint::None);
        assert_eq!(style.font_family, "serif");
        assert_eq!(style.font_size, 9.0);
        assert!(style.font_italic && !style.font_bold);
        assert_eq!(style.start_decoration, LineDecoration::None);
        assert_eq!(style.end_decoration, LineDecoration::Arrow);
    }
}
