//! The registry: the authoritative working set of ROIs.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::error::RoiError;
use crate::model::coord::{Coord3D, Plane};
use crate::model::figure::Figure;
use crate::model::roi::{Roi, RoiOptions, RoiShape};
use crate::model::RoiId;

/// Anything that can answer whether a ROI id resolves.
///
/// Implemented by [`Registry`] and by the staging index readers build while
/// parsing a document.
pub trait RoiLookup {
    fn contains_roi(&self, id: RoiId) -> bool;
}

/// Mutable map of ROI id to ROI.
///
/// Not internally synchronised; callers serialise access.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    rois: BTreeMap<RoiId, Roi>,
    last_client_id: RoiId,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ROI. Without an explicit id a fresh negative client-side id
    /// is drawn.
    pub fn create_roi(&mut self, options: RoiOptions) -> Result<&mut Roi, RoiError> {
        let id = match options.id {
            Some(id) if self.rois.contains_key(&id) => return Err(RoiError::DuplicateRoi { id }),
            Some(id) => id,
            None => self.next_client_id(),
        };
        log::debug!("Created ROI {}", id);
        Ok(self.rois.entry(id).or_insert_with(|| Roi::new(id, &options)))
    }

    /// Draw an unused negative id.
    pub fn next_client_id(&mut self) -> RoiId {
        loop {
            self.last_client_id -= 1;
            if !self.rois.contains_key(&self.last_client_id) {
                return self.last_client_id;
            }
        }
    }

    pub fn roi(&self, id: RoiId) -> Option<&Roi> {
        self.rois.get(&id)
    }

    pub fn roi_mut(&mut self, id: RoiId) -> Option<&mut Roi> {
        self.rois.get_mut(&id)
    }

    /// The ROI with `id`, or [`RoiError::NoSuchRoi`].
    pub fn get_roi(&self, id: RoiId) -> Result<&Roi, RoiError> {
        self.rois.get(&id).ok_or(RoiError::NoSuchRoi { id })
    }

    pub fn get_roi_mut(&mut self, id: RoiId) -> Result<&mut Roi, RoiError> {
        self.rois.get_mut(&id).ok_or(RoiError::NoSuchRoi { id })
    }

    /// Find a ROI by its correlation id.
    pub fn roi_by_uuid(&self, uuid: Uuid) -> Option<&Roi> {
        self.rois.values().find(|roi| roi.uuid() == uuid)
    }

    pub fn contains(&self, id: RoiId) -> bool {
        self.rois.contains_key(&id)
    }

    /// Add a figure to ROI `roi_id` at `coord`.
    pub fn add_shape(
        &mut self,
        roi_id: RoiId,
        coord: Coord3D,
        figure: Figure,
    ) -> Result<&mut RoiShape, RoiError> {
        self.get_roi_mut(roi_id)?.add_shape(coord, figure)
    }

    /// The shape of ROI `roi_id` at `coord`.
    pub fn get_shape(&self, roi_id: RoiId, coord: Coord3D) -> Result<&RoiShape, RoiError> {
        self.get_roi(roi_id)?
            .shape(coord)
            .ok_or(RoiError::NoSuchShape { roi: roi_id, coord })
    }

    pub fn get_shape_mut(
        &mut self,
        roi_id: RoiId,
        coord: Coord3D,
    ) -> Result<&mut RoiShape, RoiError> {
        self.get_roi_mut(roi_id)?
            .shape_mut(coord)
            .ok_or(RoiError::NoSuchShape { roi: roi_id, coord })
    }

    /// Like [`Registry::get_shape`], `None` when either lookup misses.
    pub fn find_shape(&self, roi_id: RoiId, coord: Coord3D) -> Option<&RoiShape> {
        self.rois.get(&roi_id)?.shape(coord)
    }

    pub fn remove_shape(&mut self, roi_id: RoiId, coord: Coord3D) -> Result<RoiShape, RoiError> {
        self.get_roi_mut(roi_id)?.remove_shape(coord)
    }

    /// Remove a ROI together with its shapes.
    pub fn remove_roi(&mut self, id: RoiId) -> Result<Roi, RoiError> {
        self.rois.remove(&id).ok_or(RoiError::NoSuchRoi { id })
    }

    /// ROIs in id order.
    pub fn rois(&self) -> impl Iterator<Item = &Roi> {
        self.rois.values()
    }

    pub fn ids(&self) -> Vec<RoiId> {
        self.rois.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.rois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }

    /// Total number of shapes across all ROIs.
    pub fn shape_count(&self) -> usize {
        self.rois.values().map(Roi::shape_count).sum()
    }

    pub fn clear(&mut self) {
        self.rois.clear();
        self.last_client_id = 0;
    }

    /// Shapes on plane (z, t) across all ROIs, in ROI id order.
    pub fn shapes_on_plane(&self, z: u32, t: u32) -> Vec<&RoiShape> {
        let coord = Coord3D::new(z, t);
        self.rois
            .values()
            .filter_map(|roi| roi.shape(coord))
            .collect()
    }

    /// Shapes changed since they were last synchronised.
    pub fn dirty_shapes(&self) -> Vec<&RoiShape> {
        self.rois
            .values()
            .flat_map(Roi::shapes)
            .filter(|shape| shape.is_dirty())
            .collect()
    }

    /// Replace or insert staged ROIs in one step.
    pub(crate) fn commit(&mut self, staged: impl IntoIterator<Item = Roi>) {
        for roi in staged {
            self.rois.insert(roi.id(), roi);
        }
    }

    /// Number of distinct planes holding at least one shape.
    pub fn plane_count(&self) -> usize {
        let mut planes: Vec<Plane> = self
            .rois
            .values()
            .flat_map(|roi| roi.shapes().map(|s| s.coord().plane()))
            .collect();
        planes.sort();
        planes.dedup();
        planes.len()
    }
}

impl RoiLookup for Registry {
    fn contains_roi(&self, id: RoiId) -> bool {
        self.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::model::{Ellipse, Geometry, Rectangle};

    fn rect() -> Figure {
        Figure::new(Geometry::Rectangle(Rectangle::new(1.0, 2.0, 3.0, 4.0)))
    }

    #[test]
    fn test_generated_ids_are_negative_and_unique() {
        let mut registry = Registry::new();
        let a = registry.create_roi(RoiOptions::default()).unwrap().id();
        let b = registry.create_roi(RoiOptions::default()).unwrap().id();
        assert!(a < 0 && b < 0);
        assert_ne!(a, b);
        assert!(registry.roi(a).unwrap().is_client_side());
    }

    #[test]
    fn test_generated_ids_skip_taken() {
        let mut registry = Registry::new();
        registry
            .create_roi(RoiOptions::default().with_id(-1))
            .unwrap();
        let id = registry.create_roi(RoiOptions::default()).unwrap().id();
        assert_eq!(id, -2);
    }

    #[test]
    fn test_duplicate_roi() {
        let mut registry = Registry::new();
        registry.create_roi(RoiOptions::default().with_id(5)).unwrap();
        assert_matches!(
            registry.create_roi(RoiOptions::default().with_id(5)),
            Err(RoiError::DuplicateRoi { id: 5 })
        );
    }

    #[test]
    fn test_shape_lookup_errors() {
        let mut registry = Registry::new();
        registry.create_roi(RoiOptions::default().with_id(1)).unwrap();
        registry.add_shape(1, Coord3D::new(0, 0), rect()).unwrap();

        assert!(registry.get_shape(1, Coord3D::new(0, 0)).is_ok());
        assert_matches!(
            registry.get_shape(2, Coord3D::new(0, 0)),
            Err(RoiError::NoSuchRoi { id: 2 })
        );
        assert_matches!(
            registry.get_shape(1, Coord3D::new(3, 0)),
            Err(RoiError::NoSuchShape { roi: 1, .. })
        );
        assert_matches!(
            registry.add_shape(9, Coord3D::new(0, 0), rect()),
            Err(RoiError::NoSuchRoi { id: 9 })
        );
        assert!(registry.find_shape(2, Coord3D::new(0, 0)).is_none());
        assert!(registry.find_shape(1, Coord3D::new(0, 0)).is_some());
    }

    #[test]
    fn test_plane_queries() {
        let mut registry = Registry::new();
        registry.create_roi(RoiOptions::default().with_id(1)).unwrap();
        registry.create_roi(RoiOptions::default().with_id(2)).unwrap();
        registry.add_shape(1, Coord3D::new(0, 0), rect()).unwrap();
        registry.add_shape(1, Coord3D::new(1, 0), rect()).unwrap();
        let ellipse = Figure::new(Geometry::Ellipse(Ellipse::new(5.0, 5.0, 2.0, 2.0)));
        registry
            .add_shape(2, Coord3D::new(0, 0), ellipse)
            .unwrap()
            .mark_clean();

        assert_eq!(registry.shapes_on_plane(0, 0).len(), 2);
        assert_eq!(registry.shapes_on_plane(1, 0).len(), 1);
        assert_eq!(registry.dirty_shapes().len(), 2);
        assert_eq!(registry.shape_count(), 3);
        assert_eq!(registry.plane_count(), 2);

        registry.remove_roi(1).unwrap();
        assert_eq!(registry.ids(), vec![2]);
        registry.clear();
        assert!(registry.is_empty());
    }
}
