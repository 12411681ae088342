//! ROIs and the shapes they own.

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use crate::constants::NO_OWNER;
use crate::error::RoiError;
use crate::model::annotation::{AnnotationValue, Annotations};
use crate::model::coord::{Coord3D, Plane};
use crate::model::figure::Figure;
use crate::model::{RoiId, ShapeId, UserId};

/// One figure bound to one coordinate of a ROI.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiShape {
    roi_id: RoiId,
    coord: Coord3D,
    figure: Figure,
    annotations: Annotations,
    server_id: Option<ShapeId>,
    dirty: bool,
}

impl RoiShape {
    /// Create a new, dirty, client-only shape.
    pub fn new(roi_id: RoiId, coord: Coord3D, mut figure: Figure) -> Self {
        figure.flags.client_only = true;
        Self {
            roi_id,
            coord,
            figure,
            annotations: Annotations::new(),
            server_id: None,
            dirty: true,
        }
    }

    /// Attach a server identity; the figure stops being client-only.
    pub fn with_server_id(mut self, id: ShapeId) -> Self {
        self.server_id = Some(id);
        self.figure.flags.client_only = false;
        self
    }

    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }

    /// Owning ROI.
    pub fn roi_id(&self) -> RoiId {
        self.roi_id
    }

    pub fn coord(&self) -> Coord3D {
        self.coord
    }

    pub fn figure(&self) -> &Figure {
        &self.figure
    }

    /// Mutable figure access; marks the shape dirty.
    pub fn figure_mut(&mut self) -> &mut Figure {
        self.dirty = true;
        &mut self.figure
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Set an annotation; marks the shape dirty.
    pub fn set_annotation(&mut self, name: impl Into<String>, value: impl Into<AnnotationValue>) {
        self.dirty = true;
        self.annotations.insert(name.into(), value.into());
    }

    /// Remove an annotation; marks the shape dirty when one was removed.
    pub fn remove_annotation(&mut self, name: &str) -> Option<AnnotationValue> {
        let removed = self.annotations.remove(name);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    pub fn server_id(&self) -> Option<ShapeId> {
        self.server_id
    }

    /// Whether the shape changed since it was last synchronised.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

/// Parameters for creating a ROI.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiOptions {
    /// Explicit id; `None` draws a fresh negative client-side id
    pub id: Option<RoiId>,
    pub client_side: bool,
    pub owner_id: UserId,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_annotate: bool,
    pub folders: BTreeSet<i64>,
    /// Correlation id; `None` generates one
    pub uuid: Option<Uuid>,
}

impl Default for RoiOptions {
    fn default() -> Self {
        Self {
            id: None,
            client_side: true,
            owner_id: NO_OWNER,
            can_edit: true,
            can_delete: true,
            can_annotate: true,
            folders: BTreeSet::new(),
            uuid: None,
        }
    }
}

impl RoiOptions {
    /// Options for a ROI with an explicit id.
    pub fn with_id(mut self, id: RoiId) -> Self {
        self.id = Some(id);
        self.client_side = id < 0;
        self
    }

    pub fn client_side(mut self, client_side: bool) -> Self {
        self.client_side = client_side;
        self
    }

    pub fn owner(mut self, owner_id: UserId) -> Self {
        self.owner_id = owner_id;
        self
    }

    pub fn capabilities(mut self, can_edit: bool, can_delete: bool, can_annotate: bool) -> Self {
        self.can_edit = can_edit;
        self.can_delete = can_delete;
        self.can_annotate = can_annotate;
        self
    }

    pub fn folders(mut self, folders: impl IntoIterator<Item = i64>) -> Self {
        self.folders = folders.into_iter().collect();
        self
    }

    pub fn uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }
}

/// A region of interest: an owned set of per-plane shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct Roi {
    id: RoiId,
    uuid: Uuid,
    client_side: bool,
    pub owner_id: UserId,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_annotate: bool,
    pub folders: BTreeSet<i64>,
    pub annotations: Annotations,
    shapes: BTreeMap<Plane, RoiShape>,
}

impl Roi {
    /// Create an empty ROI. The registry normally does this; codecs use it
    /// to stage ROIs before committing them.
    pub fn new(id: RoiId, options: &RoiOptions) -> Self {
        Self {
            id,
            uuid: options.uuid.unwrap_or_else(Uuid::new_v4),
            client_side: options.client_side || id < 0,
            owner_id: options.owner_id,
            can_edit: options.can_edit,
            can_delete: options.can_delete,
            can_annotate: options.can_annotate,
            folders: options.folders.clone(),
            annotations: Annotations::new(),
            shapes: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> RoiId {
        self.id
    }

    /// Client correlation id, stable for the lifetime of the ROI.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Whether the ROI has not been saved on a server yet.
    pub fn is_client_side(&self) -> bool {
        self.client_side
    }

    /// Server identity, if the ROI is persisted.
    pub fn server_id(&self) -> Option<RoiId> {
        (!self.client_side).then_some(self.id)
    }

    pub fn is_unowned(&self) -> bool {
        self.owner_id < 0
    }

    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner_id >= 0 && self.owner_id == user
    }

    /// Shapes in coordinate order.
    pub fn shapes(&self) -> impl Iterator<Item = &RoiShape> {
        self.shapes.values()
    }

    pub fn shapes_mut(&mut self) -> impl Iterator<Item = &mut RoiShape> {
        self.shapes.values_mut()
    }

    pub fn shape(&self, coord: Coord3D) -> Option<&RoiShape> {
        self.shapes.get(&coord.plane())
    }

    pub fn shape_mut(&mut self, coord: Coord3D) -> Option<&mut RoiShape> {
        self.shapes.get_mut(&coord.plane())
    }

    pub fn contains(&self, coord: Coord3D) -> bool {
        self.shapes.contains_key(&coord.plane())
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Add a figure at `coord`.
    pub fn add_shape(&mut self, coord: Coord3D, figure: Figure) -> Result<&mut RoiShape, RoiError> {
        self.insert_shape(RoiShape::new(self.id, coord, figure))
    }

    /// Insert a prepared shape, rebinding it to this ROI.
    pub fn insert_shape(&mut self, mut shape: RoiShape) -> Result<&mut RoiShape, RoiError> {
        let coord = shape.coord;
        if self.contains(coord) {
            return Err(RoiError::DuplicateCoordinate {
                roi: self.id,
                coord,
            });
        }
        shape.roi_id = self.id;
        Ok(self.shapes.entry(coord.plane()).or_insert(shape))
    }

    /// Take on a server id, keeping the uuid and every shape.
    pub(crate) fn into_server(mut self, id: RoiId) -> Self {
        self.id = id;
        self.client_side = false;
        for shape in self.shapes.values_mut() {
            shape.roi_id = id;
        }
        self
    }

    /// Remove and return the shape at `coord`.
    pub fn remove_shape(&mut self, coord: Coord3D) -> Result<RoiShape, RoiError> {
        self.shapes
            .remove(&coord.plane())
            .ok_or(RoiError::NoSuchShape {
                roi: self.id,
                coord,
            })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::model::{Geometry, Rectangle};

    fn rect() -> Figure {
        Figure::new(Geometry::Rectangle(Rectangle::new(0.0, 0.0, 5.0, 5.0)))
    }

    #[test]
    fn test_duplicate_coordinate_ignores_channel() {
        let mut roi = Roi::new(1, &RoiOptions::default().with_id(1));
        roi.add_shape(Coord3D::new(0, 0).with_channel(1), rect())
            .unwrap();
        assert_matches!(
            roi.add_shape(Coord3D::new(0, 0).with_channel(2), rect()),
            Err(RoiError::DuplicateCoordinate { roi: 1, .. })
        );
        roi.add_shape(Coord3D::new(0, 1), rect()).unwrap();
        assert_eq!(roi.shape_count(), 2);
    }

    #[test]
    fn test_mutation_marks_dirty() {
        let mut roi = Roi::new(3, &RoiOptions::default().with_id(3));
        let shape = roi.add_shape(Coord3D::new(1, 1), rect()).unwrap();
        assert!(shape.is_dirty());
        assert_eq!(shape.roi_id(), 3);

        shape.mark_clean();
        shape.set_annotation("area", 25.0);
        assert!(shape.is_dirty());

        shape.mark_clean();
        assert_eq!(shape.remove_annotation("missing"), None);
        assert!(!shape.is_dirty());
        shape.figure_mut().style.stroke_width = 3.0;
        assert!(shape.is_dirty());
    }

    #[test]
    fn test_server_identity() {
        let local = Roi::new(-4, &RoiOptions::default());
        assert!(local.is_client_side());
        assert_eq!(local.server_id(), None);

        let saved = Roi::new(9, &RoiOptions::default().with_id(9).owner(7));
        assert_eq!(saved.server_id(), Some(9));
        assert!(saved.is_owned_by(7));
        assert!(!saved.is_unowned());
    }

    #[test]
    fn test_remove_shape() {
        let mut roi = Roi::new(1, &RoiOptions::default());
        roi.add_shape(Coord3D::new(2, 0), rect()).unwrap();
        assert!(roi.remove_shape(Coord3D::new(2, 0)).is_ok());
        assert_matches!(
            roi.remove_shape(Coord3D::new(2, 0)),
            Err(RoiError::NoSuchShape { .. })
        );
    }
}
