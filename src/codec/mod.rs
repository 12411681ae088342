//! Conversions between the ROI model and its external representations.
//!
//! - [`xml`]: the SVG-flavoured `roiset` file format
//! - [`server`]: transfer objects exchanged with an image server
//! - [`annotation`]: the typed annotation encoding shared by both

pub mod annotation;
pub mod server;
pub mod xml;

#[cfg(test)]
mod tests;

use crate::error::RoiError;
use crate::model::{Registry, RoiId};

pub use server::{ExportRequest, ImportRequest, ServerTransferCodec};
pub use xml::{ConnectionPolicy, XmlOptions, XmlRoiCodec};

/// Trait for ROI codecs.
///
/// A codec reads an external representation into a [`Registry`] and writes
/// the registry back out. Reads are all-or-nothing: a failed read leaves
/// the registry as it was.
pub trait RoiCodec {
    /// What a read consumes.
    type Input<'a>;

    /// What a write produces.
    type Output;

    /// Extra inputs a read needs (e.g. the acting user).
    type ReadContext;

    /// Extra inputs a write needs (e.g. a selection mode).
    type WriteContext;

    /// Unique identifier of the codec (e.g. "xml", "server").
    fn id(&self) -> &'static str;

    /// Read `input` into `registry`, returning the ids of the ROIs touched.
    fn read(
        &mut self,
        input: Self::Input<'_>,
        registry: &mut Registry,
        context: &Self::ReadContext,
    ) -> Result<Vec<RoiId>, RoiError>;

    /// Write the registry.
    fn write(
        &self,
        registry: &Registry,
        context: &Self::WriteContext,
    ) -> Result<Self::Output, RoiError>;

    /// Clear session state kept between reads.
    fn reset(&mut self) {}
}
