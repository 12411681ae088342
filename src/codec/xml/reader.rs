//! Reading `roiset` documents into a registry.
//!
//! ROIs are read into a staging set (copies of existing ROIs plus new ones)
//! and committed only when the whole document has been read. Line
//! connections are resolved in a second pass once every ROI header is known.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use image::ImageFormat;
use uuid::Uuid;

use crate::attributes::{AttributeRegistry, GradientTable};
use crate::codec::annotation::{EncodedAnnotation, decode_or_default};
use crate::codec::xml::dom::XmlNode;
use crate::codec::xml::paths::parse_nodes;
use crate::codec::xml::{ConnectionPolicy, FONT_ATTRIBUTES, XmlOptions};
use crate::constants::{DEFAULT_POINT_SIZE, NO_OWNER, ROISET_VERSION, UNSET_CHANNEL};
use crate::error::RoiError;
use crate::model::{
    Annotations, BezierNode, Coord3D, Ellipse, Figure, FigureFlags, FigureRef, Geometry, Gradient,
    GradientKind, MaskShape, PointMarker, Rectangle, Registry, Roi, RoiId, RoiLookup, RoiOptions,
    RoiShape, ShapeId, TextShape,
};

/// Result of a successful read.
pub(super) struct ReadOutcome {
    /// ROIs touched, in document order
    pub touched: Vec<RoiId>,
    /// Id of the last ROI header read
    pub last_roi: Option<RoiId>,
}

/// Everything read from a `roishape` element.
struct ShapeParts {
    coord: Coord3D,
    figure: Figure,
    server_id: Option<ShapeId>,
    /// Explicit `dirty` attribute
    dirty: Option<bool>,
    annotations: Annotations,
    /// Endpoints of a line connection, resolved in the second pass
    connection: Option<(FigureRef, FigureRef, Vec<BezierNode>)>,
}

/// A connection waiting for its endpoints to be resolved.
struct PendingConnection {
    roi_id: RoiId,
    /// Position of the owning `roi` element in the document
    position: usize,
    parts: ShapeParts,
}

/// ROI ids visible to a connection: the registry plus the document's ROIs,
/// optionally only those whose header comes no later than `limit`.
struct StagingLookup<'a> {
    registry: &'a Registry,
    first_seen: &'a HashMap<RoiId, usize>,
    limit: Option<usize>,
}

impl RoiLookup for StagingLookup<'_> {
    fn contains_roi(&self, id: RoiId) -> bool {
        self.registry.contains(id)
            || self
                .first_seen
                .get(&id)
                .is_some_and(|&seen| self.limit.is_none_or(|limit| seen <= limit))
    }
}

pub(super) fn read_document(
    root: &XmlNode,
    registry: &mut Registry,
    attributes: &AttributeRegistry,
    options: &XmlOptions,
    current_roi: Option<RoiId>,
) -> Result<ReadOutcome, RoiError> {
    if root.name != "roiset" {
        return Err(RoiError::parse(format!(
            "expected root element 'roiset', found '{}'",
            root.name
        )));
    }
    if let Some(version) = root.attr("version") {
        if version != ROISET_VERSION {
            log::warn!("Reading roiset version {} as {}", version, ROISET_VERSION);
        }
    }

    let gradients = read_gradients(root);
    let mut staged: BTreeMap<RoiId, Roi> = BTreeMap::new();
    let mut first_seen: HashMap<RoiId, usize> = HashMap::new();
    let mut touched = Vec::new();
    let mut pending = Vec::new();
    let mut previous = current_roi;
    let mut shapes_read = 0usize;
    let mut skipped = 0usize;

    for (position, roi_node) in root.children_named("roi").enumerate() {
        let id = required_attr::<RoiId>(roi_node, "id")?;
        first_seen.entry(id).or_insert(position);
        if !touched.contains(&id) {
            touched.push(id);
        }
        let continues = previous == Some(id);
        previous = Some(id);

        let roi = match staged.entry(id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let roi = match registry.roi(id) {
                    Some(existing) => existing.clone(),
                    None => Roi::new(id, &roi_options(roi_node, id)?),
                };
                entry.insert(roi)
            }
        };
        if !continues {
            for wrapper in roi_node.children_named("annotation") {
                roi.annotations.extend(read_annotations(wrapper));
            }
        }

        for shape_node in roi_node.children_named("roishape") {
            let parts = match read_shape(shape_node, roi, attributes, &gradients, options) {
                Ok(parts) => parts,
                Err(message) => {
                    log::warn!("Skipping shape of ROI {}: {}", id, message);
                    skipped += 1;
                    continue;
                }
            };
            if parts.connection.is_some() {
                pending.push(PendingConnection {
                    roi_id: id,
                    position,
                    parts,
                });
                continue;
            }
            match roi.insert_shape(build_shape(id, parts)) {
                Ok(_) => shapes_read += 1,
                Err(e) => {
                    log::warn!("Skipping shape: {}", e);
                    skipped += 1;
                }
            }
        }
    }

    for PendingConnection {
        roi_id,
        position,
        mut parts,
    } in pending
    {
        let lookup = StagingLookup {
            registry,
            first_seen: &first_seen,
            limit: match options.connection_policy {
                ConnectionPolicy::Strict => Some(position),
                ConnectionPolicy::Deferred => None,
            },
        };
        if let Some((start, end, nodes)) = parts.connection.take() {
            *parts.figure.geometry_mut() = Geometry::connection(start, end, nodes, &lookup)?;
        }
        let Some(roi) = staged.get_mut(&roi_id) else {
            continue;
        };
        match roi.insert_shape(build_shape(roi_id, parts)) {
            Ok(_) => shapes_read += 1,
            Err(e) => {
                log::warn!("Skipping connection: {}", e);
                skipped += 1;
            }
        }
    }

    log::info!(
        "Read {} ROIs with {} shapes ({} skipped)",
        touched.len(),
        shapes_read,
        skipped
    );
    registry.commit(staged.into_values());

    Ok(ReadOutcome {
        last_roi: touched.last().and(previous),
        touched,
    })
}

/// Shapes with a server id are clean unless the document says otherwise.
fn build_shape(roi_id: RoiId, parts: ShapeParts) -> RoiShape {
    let mut shape =
        RoiShape::new(roi_id, parts.coord, parts.figure).with_annotations(parts.annotations);
    if let Some(id) = parts.server_id {
        shape = shape.with_server_id(id);
    }
    if !parts.dirty.unwrap_or(parts.server_id.is_none()) {
        shape.mark_clean();
    }
    shape
}

fn roi_options(node: &XmlNode, id: RoiId) -> Result<RoiOptions, RoiError> {
    let mut options = RoiOptions::default()
        .with_id(id)
        .owner(optional_attr(node, "owner")?.unwrap_or(NO_OWNER))
        .capabilities(
            optional_attr(node, "editable")?.unwrap_or(true),
            optional_attr(node, "deletable")?.unwrap_or(true),
            optional_attr(node, "annotatable")?.unwrap_or(true),
        );
    if let Some(folders) = node.attr("folders") {
        let folders = folders
            .split(',')
            .filter(|f| !f.trim().is_empty())
            .map(|f| f.trim().parse::<i64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| RoiError::parse(format!("ROI {}: bad folders '{}'", id, folders)))?;
        options = options.folders(folders);
    }
    if let Some(uuid) = node.attr("uuid") {
        match Uuid::parse_str(uuid) {
            Ok(uuid) => options = options.uuid(uuid),
            Err(e) => log::warn!("ROI {}: ignoring uuid '{}': {}", id, uuid, e),
        }
    }
    Ok(options)
}

fn optional_attr<T: FromStr>(node: &XmlNode, name: &str) -> Result<Option<T>, RoiError> {
    node.attr(name)
        .map(|text| {
            text.trim().parse::<T>().map_err(|_| {
                RoiError::parse(format!("bad '{}' value '{}' on {}", name, text, node.name))
            })
        })
        .transpose()
}

fn required_attr<T: FromStr>(node: &XmlNode, name: &str) -> Result<T, RoiError> {
    optional_attr(node, name)?
        .ok_or_else(|| RoiError::parse(format!("{} element without '{}'", node.name, name)))
}

fn read_gradients(root: &XmlNode) -> GradientTable {
    let mut table = GradientTable::new();
    for node in root.children_named("defs").flat_map(|defs| defs.children.iter()) {
        let Some(kind) = GradientKind::from_element_name(&node.name) else {
            continue;
        };
        let Some(id) = node.attr("id") else {
            log::warn!("Ignoring {} without id", node.name);
            continue;
        };
        let gradient = Gradient {
            kind,
            attributes: node
                .attributes
                .iter()
                .filter(|(key, _)| key != "id")
                .cloned()
                .collect(),
            stops: node
                .children_named("stop")
                .map(|stop| stop.attributes.clone())
                .collect(),
        };
        table.insert(id, Arc::new(gradient));
    }
    table
}

fn read_annotations(wrapper: &XmlNode) -> Annotations {
    let mut annotations = Annotations::new();
    for entry in wrapper.children_named("entry") {
        let Some(key) = entry.attr("key") else {
            log::warn!("Ignoring annotation entry without key");
            continue;
        };
        if let Some(value) = decode_or_default(&encoded_entry(entry)) {
            annotations.insert(key.to_string(), value);
        }
    }
    annotations
}

fn encoded_entry(entry: &XmlNode) -> EncodedAnnotation {
    EncodedAnnotation {
        type_tag: entry.attr("type").unwrap_or_default().to_string(),
        fields: entry
            .attributes
            .iter()
            .filter(|(key, _)| key != "key" && key != "type")
            .cloned()
            .collect(),
        elements: entry.children_named("entry").map(encoded_entry).collect(),
    }
}

/// Shape-level failures skip the shape, so they are plain messages.
type ShapeResult<T> = Result<T, String>;

fn shape_attr<T: FromStr>(node: &XmlNode, name: &str) -> ShapeResult<Option<T>> {
    optional_attr(node, name).map_err(|e| e.to_string())
}

fn number(node: &XmlNode, name: &str) -> ShapeResult<f64> {
    shape_attr::<f64>(node, name)?
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("{} needs a numeric '{}'", node.name, name))
}

fn read_shape(
    node: &XmlNode,
    roi: &Roi,
    attributes: &AttributeRegistry,
    gradients: &GradientTable,
    options: &XmlOptions,
) -> ShapeResult<ShapeParts> {
    let coord = Coord3D::new(
        shape_attr(node, "z")?.unwrap_or(0),
        shape_attr(node, "t")?.unwrap_or(0),
    )
    .with_channel(shape_attr(node, "c")?.unwrap_or(UNSET_CHANNEL));
    let server_id = shape_attr::<ShapeId>(node, "id")?;
    let dirty = shape_attr::<bool>(node, "dirty")?;
    let mut annotations = Annotations::new();
    for wrapper in node.children_named("annotation") {
        annotations.extend(read_annotations(wrapper));
    }

    let svg = node.child("svg").ok_or("missing svg element")?;
    let mut elements = svg.children.iter();
    let element = elements.next().ok_or("empty svg element")?;
    let (geometry, connection) = read_geometry(element)?;

    let mut figure = Figure::new(geometry);
    for (name, value) in &element.attributes {
        if !is_geometry_attribute(&element.name, name) {
            attributes.parse(name, value, &mut figure, gradients);
        }
    }
    if element.name != "text" {
        if let Some(caption) = elements.find(|e| e.name == "text") {
            for name in FONT_ATTRIBUTES {
                if let Some(value) = caption.attr(name) {
                    attributes.parse(name, value, &mut figure, gradients);
                }
            }
            figure.set_caption(Some(caption.text.clone()));
        }
    }
    figure.flags = FigureFlags {
        editable: roi.can_edit,
        deletable: roi.can_delete,
        annotatable: roi.can_annotate,
        read_only: !roi.can_edit,
        client_only: server_id.is_none(),
    };
    figure.units = options.units.clone();

    Ok(ShapeParts {
        coord,
        figure,
        server_id,
        dirty,
        annotations,
        connection,
    })
}

type ReadGeometry = (Geometry, Option<(FigureRef, FigureRef, Vec<BezierNode>)>);

fn read_geometry(node: &XmlNode) -> ShapeResult<ReadGeometry> {
    let geometry = match node.name.as_str() {
        "rect" => Geometry::Rectangle(Rectangle::new(
            number(node, "x")?,
            number(node, "y")?,
            number(node, "width")?,
            number(node, "height")?,
        )),
        "ellipse" => Geometry::Ellipse(Ellipse::new(
            number(node, "cx")?,
            number(node, "cy")?,
            number(node, "rx")?,
            number(node, "ry")?,
        )),
        "point" => Geometry::Point(PointMarker {
            center_x: number(node, "cx")?,
            center_y: number(node, "cy")?,
            size: match node.attr("r") {
                Some(_) => 2.0 * number(node, "r")?,
                None => DEFAULT_POINT_SIZE,
            },
        }),
        "line" => {
            let nodes = read_nodes(node)?;
            let (from, to) = (node.attr("from"), node.attr("to"));
            if from.is_some() || to.is_some() {
                let start = FigureRef::new(required_ref(node, "from")?);
                let end = FigureRef::new(required_ref(node, "to")?);
                let placeholder = Geometry::line(nodes.clone()).map_err(|e| e.to_string())?;
                return Ok((placeholder, Some((start, end, nodes))));
            }
            Geometry::line(nodes).map_err(|e| e.to_string())?
        }
        "polyline" => Geometry::polyline(read_nodes(node)?).map_err(|e| e.to_string())?,
        "polygon" => Geometry::polygon(read_nodes(node)?).map_err(|e| e.to_string())?,
        "mask" => Geometry::Mask(read_mask(node)?),
        "text" => Geometry::Text(TextShape {
            x: number(node, "x")?,
            y: number(node, "y")?,
            content: node.text.clone(),
        }),
        other => return Err(format!("unknown shape element '{}'", other)),
    };
    Ok((geometry, None))
}

fn required_ref(node: &XmlNode, name: &str) -> ShapeResult<RoiId> {
    shape_attr::<RoiId>(node, name)?.ok_or_else(|| format!("connection without '{}'", name))
}

fn read_nodes(node: &XmlNode) -> ShapeResult<Vec<BezierNode>> {
    match node.attr("points") {
        Some(points) => parse_nodes(
            points,
            node.attr("points1"),
            node.attr("points2"),
            node.attr("mask"),
        ),
        None if node.name == "line" => Ok(vec![
            BezierNode::new(number(node, "x1")?, number(node, "y1")?),
            BezierNode::new(number(node, "x2")?, number(node, "y2")?),
        ]),
        None => Err(format!("{} without points", node.name)),
    }
}

fn read_mask(node: &XmlNode) -> ShapeResult<MaskShape> {
    let href = node.attr("href").ok_or("mask without image data")?;
    let data = href
        .strip_prefix("data:image/png;base64,")
        .ok_or("mask image is not an inline PNG")?;
    let bytes = BASE64_STANDARD
        .decode(data.trim())
        .map_err(|e| format!("mask data: {}", e))?;
    let bitmap = image::load_from_memory_with_format(&bytes, ImageFormat::Png)
        .map_err(|e| format!("mask image: {}", e))?
        .to_luma8();
    Ok(MaskShape {
        x: number(node, "x")?,
        y: number(node, "y")?,
        width: shape_attr(node, "width")?.unwrap_or(f64::from(bitmap.width())),
        height: shape_attr(node, "height")?.unwrap_or(f64::from(bitmap.height())),
        bitmap,
    })
}

/// Attributes that carry geometry rather than style.
fn is_geometry_attribute(element: &str, name: &str) -> bool {
    if name.starts_with("xmlns") {
        return true;
    }
    let basic: &[&str] = match element {
        "rect" | "mask" => &["x", "y", "width", "height", "href", "xlink:href"],
        "ellipse" => &["cx", "cy", "rx", "ry"],
        "point" => &["cx", "cy", "r"],
        "line" | "polyline" | "polygon" => &[
            "points", "points1", "points2", "mask", "from", "to", "x1", "y1", "x2", "y2",
        ],
        "text" => &["x", "y"],
        _ => &[],
    };
    basic.contains(&name)
}
