//! Camera module - placement, projection and frustum extraction.
//!
//! Cameras are plain values: the view copies the caller's camera at
//! `define()` time and builds extra cameras per shadow split.

mod camera;

pub use camera::{Camera, MAX_FOV, MIN_NEAR_CLIP};
