//! Tests for the ROI codecs.
//!
//! These tests exercise whole documents and transfer batches: reading,
//! writing and round trips between the file format, the registry and the
//! server form.

mod server_tests;
