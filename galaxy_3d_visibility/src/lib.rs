/*!
# Galaxy 3D Visibility

Scene visibility and draw-batch preparation for the Galaxy 3D engine.

This crate sits between a scene and a graphics backend: it answers "what
must be drawn, with which lights and shadows, in which order" and hands the
result to a backend through the `DrawSubmitter` trait. It never touches GPU
resources itself.

## Architecture

- **Octree**: Loose octree owning the drawables, with threaded updates and
  spatial queries (point, sphere, box, frustum, occlusion, ray)
- **OcclusionBuffer**: Software depth rasterizer for occluder-based culling
- **View**: Per-camera frame processing: visibility, light queries, shadow
  cameras, batch queues and render path execution
- **BatchQueue**: State-sorted and distance-sorted draw calls with
  automatic instancing
- **WorkQueue**: Fan-out/fan-in thread pool used by the octree and the view
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod math;
pub mod camera;
pub mod work_queue;
pub mod resource;
pub mod scene;
pub mod occlusion;
pub mod render_path;
pub mod batch;
pub mod shadow;
pub mod view;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Geometry primitives
    pub mod math {
        pub use crate::math::*;
    }

    pub mod camera {
        pub use crate::camera::*;
    }

    // Thread pool abstraction
    pub mod work_queue {
        pub use crate::work_queue::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }

    pub mod occlusion {
        pub use crate::occlusion::*;
    }

    pub mod render_path {
        pub use crate::render_path::*;
    }

    pub mod batch {
        pub use crate::batch::*;
    }

    pub mod shadow {
        pub use crate::shadow::*;
    }

    // View sub-module: per-camera frame processing and draw submission
    pub mod view {
        pub use crate::view::*;
    }
}

// Re-export math library at crate root
pub use glam;
