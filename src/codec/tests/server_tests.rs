//! Tests for the server transfer codec.

use assert_matches::assert_matches;

use crate::codec::server::{
    ImageRef, LengthUnit, SelectionMode, TransferGeometry, TransferRoi,
};
use crate::codec::{ExportRequest, ImportRequest, RoiCodec, ServerTransferCodec};
use crate::error::RoiError;
use crate::model::{
    AffineTransform, AnnotationValue, BezierNode, Color, Coord3D, Figure, FigureStyle, Geometry,
    MaskShape, Rectangle, Registry, Roi, RoiOptions,
};

fn export_request(mode: SelectionMode, user_id: i64) -> ExportRequest {
    ExportRequest {
        image: ImageRef::new(11),
        mode,
        user_id,
    }
}

fn rectangle() -> Geometry {
    Geometry::Rectangle(Rectangle::new(10.0, 20.0, 30.0, 40.0))
}

/// Three ROIs: owned by 7, owned by 8 and unowned; only the first is deletable.
fn create_mixed_registry() -> Registry {
    let mut registry = Registry::new();
    for (id, owner, deletable) in [(1, 7, true), (2, 8, true), (3, -1, false)] {
        let roi = registry
            .create_roi(
                RoiOptions::default()
                    .with_id(id)
                    .owner(owner)
                    .capabilities(true, deletable, true),
            )
            .unwrap();
        roi.add_shape(Coord3D::new(0, 0), Figure::new(rectangle()))
            .unwrap();
    }
    registry
}

fn exported_ids(rois: &[TransferRoi]) -> Vec<i64> {
    rois.iter().filter_map(|roi| roi.server_id).collect()
}

#[test]
fn test_server_codec_metadata() {
    assert_eq!(ServerTransferCodec::new().id(), "server");
}

#[test]
fn test_owner_rectangle_scenario() {
    let mut registry = Registry::new();
    let roi = registry
        .create_roi(RoiOptions::default().with_id(1).owner(7))
        .unwrap();
    let style = FigureStyle::default()
        .with_stroke(Color::RED)
        .with_stroke_width(2.0);
    roi.add_shape(
        Coord3D::new(0, 0),
        Figure::new(rectangle()).with_style(style),
    )
    .unwrap();

    let codec = ServerTransferCodec::new();
    let rois = codec
        .write(&registry, &export_request(SelectionMode::All, 7))
        .unwrap();
    assert_eq!(rois.len(), 1);
    assert_eq!(rois[0].owner_id, 7);
    let width = rois[0].shapes[0].settings.stroke_width.unwrap();
    assert_eq!(width.value, 2.0);
    assert_eq!(width.unit, LengthUnit::Pixel);
    assert_eq!(width.unit.symbol(), "px");

    let json = serde_json::to_string(&rois).unwrap();
    let received: Vec<TransferRoi> = serde_json::from_str(&json).unwrap();

    let mut reimported = Registry::new();
    let mut codec = ServerTransferCodec::new();
    let ids = codec
        .read(&received, &mut reimported, &ImportRequest::new(7))
        .unwrap();
    assert_eq!(ids, vec![1]);

    let roi = reimported.get_roi(1).unwrap();
    assert!(roi.can_edit);
    let shape = roi.shape(Coord3D::new(0, 0)).unwrap();
    assert_eq!(shape.figure().geometry(), &rectangle());
    assert_eq!(shape.figure().style.stroke, crate::model::Paint::Color(Color::RED));
    assert_eq!(shape.figure().style.stroke_width, 2.0);
}

#[test]
fn test_import_is_idempotent() {
    let source = create_mixed_registry();
    let rois = ServerTransferCodec::new()
        .export(&source, &export_request(SelectionMode::All, 7))
        .unwrap();

    let codec = ServerTransferCodec::new();
    let request = ImportRequest::new(7);
    let mut registry = Registry::new();
    let first = codec.import(&rois, &mut registry, &request).unwrap();
    let snapshot: Vec<Roi> = registry.rois().cloned().collect();

    let second = codec.import(&rois, &mut registry, &request).unwrap();
    assert_eq!(first, second);
    assert_eq!(registry.rois().cloned().collect::<Vec<_>>(), snapshot);
    assert_eq!(registry.shape_count(), 3);
}

#[test]
fn test_capability_filtering() {
    let registry = create_mixed_registry();
    let codec = ServerTransferCodec::new();
    let export = |mode| {
        codec
            .export(&registry, &export_request(mode, 7))
            .unwrap()
    };

    assert_eq!(exported_ids(&export(SelectionMode::All)), vec![1, 2, 3]);
    assert_eq!(exported_ids(&export(SelectionMode::Deletable)), vec![1, 2]);
    assert_eq!(exported_ids(&export(SelectionMode::DeletableOwned)), vec![1]);
    assert_eq!(exported_ids(&export(SelectionMode::DeletableByOthers)), vec![2]);
    assert_eq!(exported_ids(&export(SelectionMode::Editable)), vec![1, 2, 3]);
}

#[test]
fn test_editable_downgraded_for_other_users() {
    let registry = create_mixed_registry();
    let codec = ServerTransferCodec::new();
    let rois = codec
        .export(&registry, &export_request(SelectionMode::All, 7))
        .unwrap();

    let mut imported = Registry::new();
    let touched = codec
        .import_rois(&rois, &mut imported, &ImportRequest::new(8))
        .unwrap();
    let editable: Vec<i64> = touched
        .iter()
        .filter(|roi| roi.can_edit)
        .map(|roi| roi.id())
        .collect();
    assert_eq!(editable, vec![2]);
}

#[test]
fn test_mask_export_is_unsupported() {
    let mut registry = create_mixed_registry();
    let mask = Geometry::Mask(MaskShape {
        x: 0.0,
        y: 0.0,
        width: 4.0,
        height: 4.0,
        bitmap: image::GrayImage::new(4, 4),
    });
    registry
        .add_shape(2, Coord3D::new(5, 0), Figure::new(mask))
        .unwrap();

    let result = ServerTransferCodec::new()
        .export(&registry, &export_request(SelectionMode::All, 7));
    assert_matches!(result, Err(RoiError::UnsupportedVariant(aggregate)) => {
        assert_eq!(aggregate.shapes.len(), 1);
        assert_eq!(aggregate.shapes[0].roi, 2);
        assert_eq!(aggregate.shapes[0].coord, Coord3D::new(5, 0));
        assert_eq!(exported_ids(&aggregate.exported), vec![1, 2, 3]);
        assert!(aggregate.to_string().contains("mask in ROI 2"));
    });
}

#[test]
fn test_annotations_and_transform_travel() {
    let mut registry = Registry::new();
    let roi = registry
        .create_roi(RoiOptions::default().with_id(4).folders([9]))
        .unwrap();
    roi.annotations
        .insert("label".to_string(), AnnotationValue::from("mito"));
    let transform = AffineTransform::translation(3.0, 4.0).unwrap();
    let shape = roi
        .add_shape(
            Coord3D::new(1, 1).with_channel(2),
            Figure::new(rectangle())
                .with_transform(transform)
                .with_caption("outline"),
        )
        .unwrap();
    shape.set_annotation("count", 3i32);

    let codec = ServerTransferCodec::new();
    let rois = codec
        .export(&registry, &export_request(SelectionMode::All, 7))
        .unwrap();
    let transferred = &rois[0].shapes[0];
    assert_eq!(transferred.c, Some(2));
    assert_eq!(transferred.transform, Some([1.0, 0.0, 3.0, 0.0, 1.0, 4.0]));
    assert_eq!(transferred.text.as_deref(), Some("outline"));
    assert!(transferred.dirty);

    let mut imported = Registry::new();
    codec
        .import(&rois, &mut imported, &ImportRequest::new(7))
        .unwrap();
    let roi = imported.get_roi(4).unwrap();
    assert!(roi.folders.contains(&9));
    assert_eq!(roi.annotations.get("label"), Some(&AnnotationValue::from("mito")));
    let shape = roi.shape(Coord3D::new(1, 1)).unwrap();
    assert_eq!(shape.coord().channel(), Some(2));
    assert_eq!(shape.figure().transform, transform);
    assert_eq!(shape.figure().caption(), Some("outline"));
    assert_eq!(shape.annotations().get("count"), Some(&AnnotationValue::Integer(3)));
    assert!(shape.is_dirty());
}

#[test]
fn test_curves_collapse_on_export() {
    let mut registry = Registry::new();
    let curve = Geometry::polygon(vec![
        BezierNode::new(0.0, 0.0),
        BezierNode::with_controls(
            crate::model::Point2D::new(10.0, 0.0),
            crate::model::Point2D::new(8.0, -2.0),
            crate::model::Point2D::new(12.0, 2.0),
            BezierNode::C1C2_MASK,
        ),
        BezierNode::new(10.0, 10.0),
    ])
    .unwrap();
    registry
        .create_roi(RoiOptions::default().with_id(1))
        .unwrap()
        .add_shape(Coord3D::new(0, 0), Figure::new(curve))
        .unwrap();

    let codec = ServerTransferCodec::new();
    let rois = codec
        .export(&registry, &export_request(SelectionMode::All, 7))
        .unwrap();
    assert_eq!(
        rois[0].shapes[0].geometry,
        TransferGeometry::Polygon {
            points: vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]]
        }
    );

    let mut imported = Registry::new();
    codec
        .import(&rois, &mut imported, &ImportRequest::new(7))
        .unwrap();
    let shape = imported.get_shape(1, Coord3D::new(0, 0)).unwrap();
    let path = shape.figure().geometry().path().unwrap();
    assert!(path.is_closed());
    assert_eq!(path.nodes()[1], BezierNode::new(10.0, 0.0));
}

#[test]
fn test_client_side_rois_keep_uuid() {
    let mut registry = Registry::new();
    let roi = registry.create_roi(RoiOptions::default()).unwrap();
    let uuid = roi.uuid();
    roi.add_shape(Coord3D::new(0, 0), Figure::new(rectangle()))
        .unwrap();

    let codec = ServerTransferCodec::new();
    let rois = codec
        .export(&registry, &export_request(SelectionMode::All, 7))
        .unwrap();
    assert!(rois[0].client_side);
    assert_eq!(rois[0].server_id, None);
    assert_eq!(rois[0].correlation_id, uuid);

    let mut imported = Registry::new();
    let ids = codec
        .import(&rois, &mut imported, &ImportRequest::new(7))
        .unwrap();
    assert_eq!(ids.len(), 1);
    assert!(ids[0] < 0);
    assert_eq!(imported.get_roi(ids[0]).unwrap().uuid(), uuid);
}
