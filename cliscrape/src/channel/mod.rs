//! Channel layer: output accumulation and marker detection.
//!
//! Devices signal completion only by printing a prompt, so everything the
//! session engine knows about "done" comes from searching the bytes
//! accumulated here for literal markers.

mod buffer;
mod patterns;

pub use buffer::CaptureBuffer;
pub use patterns::{MarkerMatch, MarkerScanner, describe_markers, find_first_marker};
