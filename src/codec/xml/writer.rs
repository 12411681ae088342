//! Writing a registry as a `roiset` document.

use std::collections::{BTreeSet, HashSet};
use std::fmt::Display;
use std::io::{Cursor, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use image::ImageFormat;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::attributes::{AttributeRegistry, GradientTable};
use crate::codec::annotation::{EncodedAnnotation, encode};
use crate::codec::xml::paths::format_nodes;
use crate::codec::xml::{FONT_ATTRIBUTES, SHAPE_ATTRIBUTES};
use crate::constants::{
    ROISET_NAMESPACE, ROISET_VERSION, SVG_NAMESPACE, SVG_VERSION, XLINK_NAMESPACE,
};
use crate::error::RoiError;
use crate::model::{
    Annotations, Figure, FigureStyle, Geometry, NodePath, Registry, Roi, RoiId, RoiShape,
};

pub(super) fn write_document(
    registry: &Registry,
    attributes: &AttributeRegistry,
    indent: usize,
) -> Result<String, RoiError> {
    let mut gradients = GradientTable::new();
    for shape in registry.rois().flat_map(Roi::shapes) {
        for gradient in shape.figure().style.gradients() {
            gradients.register(gradient);
        }
    }

    let mut doc = DocumentWriter {
        writer: Writer::new_with_indent(Vec::new(), b' ', indent),
        attributes,
        gradients: &gradients,
        defaults: FigureStyle::default(),
    };

    doc.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut root = BytesStart::new("roiset");
    root.push_attribute(("xmlns", ROISET_NAMESPACE));
    root.push_attribute(("version", ROISET_VERSION));
    doc.emit(Event::Start(root))?;
    doc.write_defs()?;
    for roi in document_order(registry) {
        doc.write_roi(roi)?;
    }
    doc.emit(Event::End(BytesEnd::new("roiset")))?;

    log::info!(
        "Wrote {} ROIs with {} shapes ({} gradients)",
        registry.len(),
        registry.shape_count(),
        gradients.len()
    );

    String::from_utf8(doc.writer.into_inner())
        .map_err(|_| RoiError::parse("Invalid UTF-8 in XML output"))
}

/// ROIs in id order, except that the ROIs a line connection points at come
/// before the ROI holding it. Cycles keep id order from where they are entered.
fn document_order(registry: &Registry) -> Vec<&Roi> {
    let mut order = Vec::with_capacity(registry.len());
    let mut placed = HashSet::new();
    for roi in registry.rois() {
        place(roi, registry, &mut placed, &mut order);
    }
    order
}

fn place<'r>(
    roi: &'r Roi,
    registry: &'r Registry,
    placed: &mut HashSet<RoiId>,
    order: &mut Vec<&'r Roi>,
) {
    if !placed.insert(roi.id()) {
        return;
    }
    for target in connection_targets(roi) {
        if let Some(target) = registry.roi(target) {
            place(target, registry, placed, order);
        }
    }
    order.push(roi);
}

fn connection_targets(roi: &Roi) -> BTreeSet<RoiId> {
    roi.shapes()
        .filter_map(|shape| match shape.figure().geometry() {
            Geometry::Connection(connection) => {
                Some([connection.start().roi_id, connection.end().roi_id])
            }
            _ => None,
        })
        .flatten()
        .filter(|&id| id != roi.id())
        .collect()
}

fn push<T: Display>(element: &mut BytesStart<'_>, name: &str, value: T) {
    element.push_attribute((name, value.to_string().as_str()));
}

struct DocumentWriter<'a, W: Write> {
    writer: Writer<W>,
    attributes: &'a AttributeRegistry,
    gradients: &'a GradientTable,
    defaults: FigureStyle,
}

impl<W: Write> DocumentWriter<'_, W> {
    fn emit(&mut self, event: Event<'_>) -> Result<(), RoiError> {
        self.writer
            .write_event(event)
            .map_err(|e| RoiError::Xml(e.into()))
    }

    fn write_defs(&mut self) -> Result<(), RoiError> {
        if self.gradients.is_empty() {
            return self.emit(Event::Empty(BytesStart::new("defs")));
        }
        self.emit(Event::Start(BytesStart::new("defs")))?;
        let gradients = self.gradients;
        for (id, gradient) in gradients.iter() {
            let name = gradient.kind.element_name();
            let mut element = BytesStart::new(name);
            element.push_attribute(("id", id));
            for (key, value) in &gradient.attributes {
                element.push_attribute((key.as_str(), value.as_str()));
            }
            if gradient.stops.is_empty() {
                self.emit(Event::Empty(element))?;
                continue;
            }
            self.emit(Event::Start(element))?;
            for stop in &gradient.stops {
                let mut element = BytesStart::new("stop");
                for (key, value) in stop {
                    element.push_attribute((key.as_str(), value.as_str()));
                }
                self.emit(Event::Empty(element))?;
            }
            self.emit(Event::End(BytesEnd::new(name)))?;
        }
        self.emit(Event::End(BytesEnd::new("defs")))
    }

    fn write_roi(&mut self, roi: &Roi) -> Result<(), RoiError> {
        let mut element = BytesStart::new("roi");
        push(&mut element, "id", roi.id());
        push(&mut element, "uuid", roi.uuid());
        if !roi.is_unowned() {
            push(&mut element, "owner", roi.owner_id);
        }
        if !roi.folders.is_empty() {
            let folders: Vec<String> = roi.folders.iter().map(|f| f.to_string()).collect();
            push(&mut element, "folders", folders.join(","));
        }
        for (name, allowed) in [
            ("editable", roi.can_edit),
            ("deletable", roi.can_delete),
            ("annotatable", roi.can_annotate),
        ] {
            if !allowed {
                push(&mut element, name, false);
            }
        }

        self.emit(Event::Start(element))?;
        self.write_annotations(&roi.annotations)?;
        for shape in roi.shapes() {
            if let Geometry::Mask(mask) = shape.figure().geometry() {
                if mask.is_empty() {
                    log::warn!("Skipping empty mask of ROI {} at {}", roi.id(), shape.coord());
                    continue;
                }
            }
            self.write_shape(shape)?;
        }
        self.emit(Event::End(BytesEnd::new("roi")))
    }

    fn write_annotations(&mut self, annotations: &Annotations) -> Result<(), RoiError> {
        if annotations.is_empty() {
            return self.emit(Event::Empty(BytesStart::new("annotation")));
        }
        self.emit(Event::Start(BytesStart::new("annotation")))?;
        for (key, value) in annotations {
            self.write_entry(Some(key), &encode(value))?;
        }
        self.emit(Event::End(BytesEnd::new("annotation")))
    }

    fn write_entry(
        &mut self,
        key: Option<&str>,
        encoded: &EncodedAnnotation,
    ) -> Result<(), RoiError> {
        let mut element = BytesStart::new("entry");
        if let Some(key) = key {
            element.push_attribute(("key", key));
        }
        element.push_attribute(("type", encoded.type_tag.as_str()));
        for (name, value) in &encoded.fields {
            element.push_attribute((name.as_str(), value.as_str()));
        }
        if encoded.elements.is_empty() {
            return self.emit(Event::Empty(element));
        }
        self.emit(Event::Start(element))?;
        for child in &encoded.elements {
            self.write_entry(None, child)?;
        }
        self.emit(Event::End(BytesEnd::new("entry")))
    }

    fn write_shape(&mut self, shape: &RoiShape) -> Result<(), RoiError> {
        let coord = shape.coord();
        let mut element = BytesStart::new("roishape");
        push(&mut element, "t", coord.t);
        push(&mut element, "z", coord.z);
        if let Some(c) = coord.channel() {
            push(&mut element, "c", c);
        }
        if let Some(id) = shape.server_id() {
            push(&mut element, "id", id);
        }
        // Only written when it differs from what the reader assumes.
        if shape.is_dirty() == shape.server_id().is_some() {
            push(&mut element, "dirty", shape.is_dirty());
        }
        self.emit(Event::Start(element))?;
        self.write_annotations(shape.annotations())?;

        let mut svg = BytesStart::new("svg");
        svg.push_attribute(("xmlns", SVG_NAMESPACE));
        svg.push_attribute(("xmlns:xlink", XLINK_NAMESPACE));
        svg.push_attribute(("version", SVG_VERSION));
        self.emit(Event::Start(svg))?;
        self.write_figure(shape.figure())?;
        self.emit(Event::End(BytesEnd::new("svg")))?;

        self.emit(Event::End(BytesEnd::new("roishape")))
    }

    fn write_figure(&mut self, figure: &Figure) -> Result<(), RoiError> {
        let mut element = geometry_element(figure.geometry())?;
        for name in SHAPE_ATTRIBUTES {
            let value = self
                .attributes
                .write(name, figure, &self.defaults, self.gradients);
            if let Some(value) = value {
                element.push_attribute((*name, value.as_str()));
            }
        }

        if let Geometry::Text(text) = figure.geometry() {
            return self.write_text(element, &text.content);
        }
        self.emit(Event::Empty(element))?;

        if let Some(caption) = figure.caption() {
            let center = figure.geometry().bounds().center();
            let mut element = BytesStart::new("text");
            push(&mut element, "x", center.x);
            push(&mut element, "y", center.y);
            for name in FONT_ATTRIBUTES {
                let value = self
                    .attributes
                    .write(name, figure, &self.defaults, self.gradients);
                if let Some(value) = value {
                    element.push_attribute((*name, value.as_str()));
                }
            }
            self.write_text(element, caption)?;
        }
        Ok(())
    }

    fn write_text(&mut self, element: BytesStart<'_>, content: &str) -> Result<(), RoiError> {
        self.emit(Event::Start(element))?;
        self.emit(Event::Text(BytesText::new(content)))?;
        self.emit(Event::End(BytesEnd::new("text")))
    }
}

/// The geometry element with its basic attributes.
fn geometry_element(geometry: &Geometry) -> Result<BytesStart<'static>, RoiError> {
    let element = match geometry {
        Geometry::Rectangle(rect) => {
            let mut element = BytesStart::new("rect");
            push(&mut element, "x", rect.x);
            push(&mut element, "y", rect.y);
            push(&mut element, "width", rect.width);
            push(&mut element, "height", rect.height);
            element
        }
        Geometry::Ellipse(ellipse) => {
            let mut element = BytesStart::new("ellipse");
            push(&mut element, "cx", ellipse.center_x);
            push(&mut element, "cy", ellipse.center_y);
            push(&mut element, "rx", ellipse.radius_x);
            push(&mut element, "ry", ellipse.radius_y);
            element
        }
        Geometry::Point(point) => {
            let mut element = BytesStart::new("point");
            push(&mut element, "cx", point.center_x);
            push(&mut element, "cy", point.center_y);
            push(&mut element, "r", point.size / 2.0);
            element
        }
        Geometry::Line(path) => path_element("line", path),
        Geometry::Polyline(path) => path_element("polyline", path),
        Geometry::Polygon(path) => path_element("polygon", path),
        Geometry::Connection(connection) => {
            let mut element = path_element("line", connection.path());
            push(&mut element, "from", connection.start().roi_id);
            push(&mut element, "to", connection.end().roi_id);
            element
        }
        Geometry::Mask(mask) => {
            let mut png = Vec::new();
            mask.bitmap
                .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
            let mut element = BytesStart::new("mask");
            push(&mut element, "x", mask.x);
            push(&mut element, "y", mask.y);
            push(&mut element, "width", mask.width);
            push(&mut element, "height", mask.height);
            push(
                &mut element,
                "xlink:href",
                format!("data:image/png;base64,{}", BASE64_STANDARD.encode(&png)),
            );
            element
        }
        Geometry::Text(text) => {
            let mut element = BytesStart::new("text");
            push(&mut element, "x", text.x);
            push(&mut element, "y", text.y);
            element
        }
    };
    Ok(element)
}

fn path_element(name: &'static str, path: &NodePath) -> BytesStart<'static> {
    let arrays = format_nodes(path.nodes());
    let mut element = BytesStart::new(name);
    element.push_attribute(("points", arrays.points.as_str()));
    element.push_attribute(("points1", arrays.points1.as_str()));
    element.push_attribute(("points2", arrays.points2.as_str()));
    element.push_attribute(("mask", arrays.mask.as_str()));
    element
}
