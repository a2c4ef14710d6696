//! Vector operations on polygon layers
//!
//! - Repair: self-intersection removal equivalent to a zero-distance buffer
//! - Reproject: coordinate transforms between supported CRSs
//! - Overlay: intersection of deforestation polygons with municipalities
//! - Area: planar and equal-area measurement
//! - Bounding box: candidate prefilter for overlay

mod measurements;
mod overlay;
mod repair;
mod reproject;
mod spatial;

pub use measurements::{area, EqualAreaMeter};
pub use overlay::{overlay, Overlay, OverlayInput, OverlayParams};
pub use repair::{repair, repair_polygon};
pub use reproject::Reprojector;
pub use spatial::{bounding_box, BoundingBox};
