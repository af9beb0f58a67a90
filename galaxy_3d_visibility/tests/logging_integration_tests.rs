//! Integration tests for Engine logging system
//!
//! Custom loggers, severities and the entries emitted by the worker pool
//! and by failed view rendering.
//!
//! Run with: cargo test --test logging_integration_tests

use galaxy_3d_visibility::galaxy3d::{Engine, Error, Result};
use galaxy_3d_visibility::galaxy3d::batch::{Batch, BatchGroup};
use galaxy_3d_visibility::galaxy3d::camera::Camera;
use galaxy_3d_visibility::galaxy3d::log::{Logger, LogEntry, LogSeverity};
use galaxy_3d_visibility::galaxy3d::math::IntRect;
use galaxy_3d_visibility::galaxy3d::render_path::{ClearFlags, RenderPath, RenderPathCommand};
use galaxy_3d_visibility::galaxy3d::resource::{
    Geometry, GeometryDesc, GeometryId, Material, MaterialDesc, PassDesc, PassRegistry, Technique, TechniqueDesc,
};
use galaxy_3d_visibility::galaxy3d::scene::{FrameInfo, ModelPart, Octree, OctreeDesc, StaticModel};
use galaxy_3d_visibility::galaxy3d::shadow::ShadowMapHandle;
use galaxy_3d_visibility::galaxy3d::view::{DrawContext, DrawSubmitter, View, ViewSettings};
use galaxy_3d_visibility::galaxy3d::work_queue::{RayonWorkQueue, SerialWorkQueue};
use galaxy_3d_visibility::glam::{Mat4, UVec2, Vec3, Vec4};
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// LOGGER INSTALLATION
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    Engine::log(LogSeverity::Info, "galaxy3d::Octree", "Resized to 2000 units".to_string());
    Engine::log(LogSeverity::Warn, "galaxy3d::View", "Occluder budget exhausted".to_string());
    Engine::log(LogSeverity::Error, "galaxy3d::View", "Shadow map rendering failed".to_string());

    Engine::reset_logger();

    let captured = entries.lock().unwrap();
    let summary: Vec<(LogSeverity, &str, &str)> = captured
        .iter()
        .map(|entry| (entry.severity, entry.source.as_str(), entry.message.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (LogSeverity::Info, "galaxy3d::Octree", "Resized to 2000 units"),
            (LogSeverity::Warn, "galaxy3d::View", "Occluder budget exhausted"),
            (LogSeverity::Error, "galaxy3d::View", "Shadow map rendering failed"),
        ]
    );
    assert!(captured.iter().all(|entry| entry.file.is_none() && entry.line.is_none()));
}

#[test]
#[serial]
fn test_integration_detailed_entry_keeps_location() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    Engine::log_detailed(
        LogSeverity::Error,
        "galaxy3d::Octree",
        "Drawable escaped its octant".to_string(),
        "octree.rs",
        497,
    );

    Engine::reset_logger();

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].source, "galaxy3d::Octree");
    assert_eq!(captured[0].file, Some("octree.rs"));
    assert_eq!(captured[0].line, Some(497));
}

#[test]
#[serial]
fn test_integration_logger_reset() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);
    Engine::log(LogSeverity::Debug, "galaxy3d::View", "frame 1".to_string());

    Engine::reset_logger();

    // Goes to the default console logger
    Engine::log(LogSeverity::Debug, "galaxy3d::View", "frame 2".to_string());
    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].message, "frame 1");
}

#[test]
#[serial]
fn test_integration_all_severities_reach_custom_logger() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    let severities = [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ];
    for severity in severities {
        Engine::log(severity, "galaxy3d::Test", severity.label().trim().to_string());
    }

    Engine::reset_logger();

    let captured = entries.lock().unwrap();
    let received: Vec<LogSeverity> = captured.iter().map(|entry| entry.severity).collect();
    assert_eq!(received, severities);
    assert_eq!(captured[3].message, "WARN");
}

// ============================================================================
// ENGINE SOURCES
// ============================================================================

/// Submitter whose every draw fails
struct FailingSubmitter;

impl DrawSubmitter for FailingSubmitter {
    fn set_render_targets(&mut self, _outputs: &[String]) -> Result<()> {
        Ok(())
    }

    fn clear(&mut self, _flags: ClearFlags, _color: Vec4, _depth: f32, _stencil: u32) -> Result<()> {
        Ok(())
    }

    fn begin_shadow_map(&mut self, _shadow_map: &ShadowMapHandle) -> Result<()> {
        Ok(())
    }

    fn set_shadow_split(&mut self, _viewport: IntRect, _camera: &Camera) -> Result<()> {
        Ok(())
    }

    fn draw_batch(&mut self, _batch: &Batch, _transforms: &[Mat4], _context: &DrawContext<'_>) -> Result<()> {
        Err(Error::BackendError("device lost".to_string()))
    }

    fn draw_batch_group(&mut self, _group: &BatchGroup, _context: &DrawContext<'_>) -> Result<()> {
        Err(Error::BackendError("device lost".to_string()))
    }

    fn draw_fullscreen_quad(&mut self, _command: &RenderPathCommand) -> Result<()> {
        Ok(())
    }
}

#[test]
#[serial]
fn test_integration_worker_pool_logs_creation() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    let pool = RayonWorkQueue::new(2).unwrap();
    drop(pool);

    {
        let captured = entries.lock().unwrap();
        let entry = captured
            .iter()
            .find(|entry| entry.source == "galaxy3d::WorkQueue")
            .expect("worker pool creation was not logged");
        assert_eq!(entry.severity, LogSeverity::Info);
        assert_eq!(entry.message, "Worker pool created with 2 threads");
    }

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_render_failure_is_logged() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    let h = 1.0;
    let positions = vec![
        Vec3::new(-h, -h, -h), Vec3::new(h, -h, -h), Vec3::new(h, h, -h), Vec3::new(-h, h, -h),
        Vec3::new(-h, -h, h), Vec3::new(h, -h, h), Vec3::new(h, h, h), Vec3::new(-h, h, h),
    ];
    let indices = vec![0, 1, 2, 0, 2, 3, 4, 6, 5, 4, 7, 6];
    let geometry = Arc::new(
        Geometry::from_desc(GeometryDesc { id: GeometryId(1), positions, indices, lod_distance: 0.0 }).unwrap(),
    );

    let mut registry = PassRegistry::new();
    let desc = TechniqueDesc {
        name: "Unlit".to_string(),
        vertex_shader: "Unlit".to_string(),
        pixel_shader: "Unlit".to_string(),
        passes: vec![PassDesc::new("base")],
        ..Default::default()
    };
    let technique = Arc::new(Technique::from_desc(desc, &mut registry).unwrap());
    let material = Arc::new(Material::from_desc(MaterialDesc::new("Unlit", technique)).unwrap());

    let mut octree = Octree::new(OctreeDesc::default(), Arc::new(SerialWorkQueue));
    octree.insert(StaticModel::new(
        vec![ModelPart::new(geometry, Some(material))],
        Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0)),
    ));

    let settings = ViewSettings { threaded: false, max_occluder_triangles: 0, ..Default::default() };
    let mut view = View::new(Arc::new(SerialWorkQueue), registry, settings);
    let camera = Camera::looking_at(Vec3::ZERO, Vec3::NEG_Z, 60.0, 0.1, 100.0);
    assert!(view.define(&camera, UVec2::new(640, 480), &RenderPath::forward()));
    view.update(&octree, &FrameInfo { frame_number: 1, time_step: 1.0 / 60.0 });

    let result = view.render(&mut FailingSubmitter);

    Engine::reset_logger();

    assert!(matches!(result, Err(Error::BackendError(_))));
    let captured = entries.lock().unwrap();
    let entry = captured
        .iter()
        .find(|entry| entry.severity == LogSeverity::Error)
        .expect("render failure was not logged");
    assert_eq!(entry.source, "galaxy3d::View");
    assert!(entry.message.contains("device lost"));
    assert!(entry.file.is_some());
    assert!(entry.line.is_some());
}
