//! Façade over the two codecs and the registry they share.

use std::io::{Read, Write};
use std::path::Path;

use crate::codec::server::{ImageRef, SelectionMode, TransferRoi};
use crate::codec::{ExportRequest, ImportRequest, RoiCodec, ServerTransferCodec, XmlRoiCodec};
use crate::config::EngineConfig;
use crate::error::RoiError;
use crate::model::{MeasurementUnits, Registry, Roi, RoiId};

/// Owns the registry and routes reads and writes to the file or server codec.
pub struct RoiIo {
    registry: Registry,
    xml: XmlRoiCodec,
    server: ServerTransferCodec,
    units: Option<MeasurementUnits>,
}

impl RoiIo {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    /// Build from configuration; measurement units apply to both codecs.
    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            registry: Registry::new(),
            xml: XmlRoiCodec::with_options(config.xml_options()),
            server: ServerTransferCodec::new(),
            units: config.units.clone(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }

    /// Read a `roiset` document from disk.
    pub fn read_from_file(&mut self, path: &Path) -> Result<Vec<RoiId>, RoiError> {
        let text = std::fs::read_to_string(path)?;
        let ids = self.xml.read(text.as_str(), &mut self.registry, &())?;
        log::info!("Read {} ROIs from {:?}", ids.len(), path);
        Ok(ids)
    }

    pub fn read_from_reader(&mut self, mut reader: impl Read) -> Result<Vec<RoiId>, RoiError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.xml.read(text.as_str(), &mut self.registry, &())
    }

    /// Write the whole registry as a `roiset` document.
    pub fn write_to_file(&self, path: &Path) -> Result<(), RoiError> {
        let text = self.xml.write(&self.registry, &())?;
        std::fs::write(path, text)?;
        log::info!("Wrote {} ROIs to {:?}", self.registry.len(), path);
        Ok(())
    }

    pub fn write_to_writer(&self, mut writer: impl Write) -> Result<(), RoiError> {
        let text = self.xml.write(&self.registry, &())?;
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Merge transfer objects received from the server, acting as `user_id`.
    pub fn read_from_server(
        &mut self,
        rois: &[TransferRoi],
        user_id: i64,
    ) -> Result<Vec<&Roi>, RoiError> {
        let request = ImportRequest {
            user_id,
            units: self.units.clone(),
        };
        self.server.import_rois(rois, &mut self.registry, &request)
    }

    /// Transfer objects for the ROIs selected by `mode`.
    pub fn write_to_server(
        &self,
        image: ImageRef,
        mode: SelectionMode,
        user_id: i64,
    ) -> Result<Vec<TransferRoi>, RoiError> {
        let request = ExportRequest {
            image,
            mode,
            user_id,
        };
        self.server.write(&self.registry, &request)
    }

    /// Forget the ROI header guard before an unrelated file read.
    pub fn reset(&mut self) {
        self.xml.reset();
        self.server.reset();
    }
}

impl Default for RoiIo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use assert_matches::assert_matches;

    use super::*;
    use crate::codec::server::{TransferGeometry, TransferShape};
    use crate::model::{Coord3D, Figure, Geometry, Rectangle, RoiOptions};

    fn temp_path(ext: &str) -> PathBuf {
        std::env::temp_dir().join(format!("roiset-io-{}.{}", uuid::Uuid::new_v4(), ext))
    }

    fn populated() -> RoiIo {
        let mut io = RoiIo::new();
        io.registry_mut()
            .create_roi(RoiOptions::default().with_id(5).owner(7))
            .unwrap()
            .add_shape(
                Coord3D::new(0, 0),
                Figure::new(Geometry::Rectangle(Rectangle::new(1.0, 2.0, 3.0, 4.0))),
            )
            .unwrap();
        io
    }

    #[test]
    fn test_file_roundtrip() {
        let path = temp_path("xml");
        let io = populated();
        io.write_to_file(&path).unwrap();

        let mut restored = RoiIo::new();
        let ids = restored.read_from_file(&path).unwrap();
        assert_eq!(ids, vec![5]);
        assert_eq!(restored.registry().shape_count(), 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let mut io = RoiIo::new();
        let result = io.read_from_file(&temp_path("xml"));
        assert_matches!(result, Err(RoiError::Io(_)));
        assert!(io.registry().is_empty());
    }

    #[test]
    fn test_stream_roundtrip() {
        let io = populated();
        let mut buffer = Vec::new();
        io.write_to_writer(&mut buffer).unwrap();

        let mut restored = RoiIo::new();
        restored.read_from_reader(buffer.as_slice()).unwrap();
        assert_eq!(restored.registry().ids(), vec![5]);
    }

    #[test]
    fn test_server_roundtrip() {
        let io = populated();
        let rois = io
            .write_to_server(ImageRef::new(3), SelectionMode::All, 7)
            .unwrap();
        assert_eq!(rois.len(), 1);
        assert_eq!(rois[0].image.id, 3);

        let mut restored = RoiIo::new();
        let touched = restored.read_from_server(&rois, 7).unwrap();
        assert_eq!(touched.len(), 1);
        assert!(touched[0].can_edit);
    }

    #[test]
    fn test_config_units_reach_figures() {
        let mut config = EngineConfig::default();
        config.units = Some(MeasurementUnits {
            pixel_size_x: 0.25,
            pixel_size_y: 0.25,
            pixel_size_z: 0.0,
            in_microns: true,
        });
        let rois = populated()
            .write_to_server(ImageRef::new(1), SelectionMode::All, 7)
            .unwrap();

        let mut io = RoiIo::with_config(&config);
        io.read_from_server(&rois, 7).unwrap();
        let shape = io.registry().get_shape(5, Coord3D::new(0, 0)).unwrap();
        assert_eq!(shape.figure().units, config.units);
    }

    #[test]
    fn test_server_mask_does_not_block_file_write() {
        let mut rois = populated()
            .write_to_server(ImageRef::new(1), SelectionMode::All, 7)
            .unwrap();
        let base = rois[0].shapes[0].clone();
        rois[0].shapes.push(TransferShape {
            z: 1,
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

        let mut io = RoiIo::new();
        io.read_from_server(&rois, 7).unwrap();
        let mut buffer = Vec::new();
        io.write_to_writer(&mut buffer).unwrap();
        assert_eq!(io.registry().shape_count(), 1);
    }

    #[test]
    fn test_reset_clears_header_guard() {
        let mut io = populated();
        let mut buffer = Vec::new();
        io.write_to_writer(&mut buffer).unwrap();
        io.read_from_reader(buffer.as_slice()).unwrap();
        assert_eq!(io.xml.current_roi(), Some(5));

        io.reset();
        assert_eq!(io.xml.current_roi(), None);
    }
}
