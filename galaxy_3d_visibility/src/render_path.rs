/// Render path - the declarative list of commands a view executes.
///
/// The view reads the path once per `define()` to learn which scene passes
/// need batch queues, which pass receives forward lights and whether shadow
/// maps are needed at all; `render()` then walks the commands in order.

use bitflags::bitflags;
use glam::Vec4;

bitflags! {
    /// Buffers touched by a clear command
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u8 {
        const COLOR = 0x1;
        const DEPTH = 0x2;
        const STENCIL = 0x4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderCommandKind {
    /// Clear the bound render targets
    Clear,
    /// Draw one scene pass from its batch queue
    ScenePass,
    /// Draw per-pixel lit batches light by light
    ForwardLights,
    /// Render all shadow maps up front
    ShadowMaps,
    /// Full-screen quad with custom shaders
    Quad,
}

/// Batch ordering of a scene pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortMode {
    /// State-sorted, near to far within equal state
    FrontToBack,
    /// Strictly far to near for blending
    BackToFront,
}

/// Render target name of the view's own output
pub const VIEWPORT_OUTPUT: &str = "viewport";

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPathCommand {
    pub tag: String,
    pub kind: RenderCommandKind,
    pub enabled: bool,
    /// Scene pass or forward light pass name
    pub pass: String,
    pub sort_mode: SortMode,
    pub outputs: Vec<String>,
    pub clear_flags: ClearFlags,
    pub clear_color: Vec4,
    pub clear_depth: f32,
    pub clear_stencil: u32,
    /// Mark drawn pixels in the stencil buffer (lighting mask)
    pub mark_to_stencil: bool,
    /// Accumulate per-vertex lights for this scene pass
    pub vertex_lights: bool,
    /// Combine the first light with ambient in the lit base pass
    pub use_lit_base: bool,
    /// Free-form label, e.g. "base" or "alpha"
    pub metadata: String,
    pub vertex_shader: String,
    pub pixel_shader: String,
    /// Extra shader defines appended to every batch of the command
    pub vertex_defines: String,
    pub pixel_defines: String,
}

impl RenderPathCommand {
    fn new(kind: RenderCommandKind) -> Self {
        Self {
            tag: String::new(),
            kind,
            enabled: true,
            pass: String::new(),
            sort_mode: SortMode::FrontToBack,
            outputs: vec![VIEWPORT_OUTPUT.to_string()],
            clear_flags: ClearFlags::empty(),
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            clear_depth: 1.0,
            clear_stencil: 0,
            mark_to_stencil: false,
            vertex_lights: false,
            use_lit_base: true,
            metadata: String::new(),
            vertex_shader: String::new(),
            pixel_shader: String::new(),
            vertex_defines: String::new(),
            pixel_defines: String::new(),
        }
    }

    pub fn clear(flags: ClearFlags, color: Vec4, depth: f32, stencil: u32) -> Self {
        let mut command = Self::new(RenderCommandKind::Clear);
        command.clear_flags = flags;
        command.clear_color = color;
        command.clear_depth = depth;
        command.clear_stencil = stencil;
        command
    }

    pub fn scene_pass(pass: &str, sort_mode: SortMode) -> Self {
        let mut command = Self::new(RenderCommandKind::ScenePass);
        command.pass = pass.to_string();
        command.sort_mode = sort_mode;
        command
    }

    pub fn forward_lights(pass: &str) -> Self {
        let mut command = Self::new(RenderCommandKind::ForwardLights);
        command.pass = pass.to_string();
        command
    }

    pub fn shadow_maps() -> Self {
        Self::new(RenderCommandKind::ShadowMaps)
    }

    pub fn quad(vertex_shader: &str, pixel_shader: &str) -> Self {
        let mut command = Self::new(RenderCommandKind::Quad);
        command.vertex_shader = vertex_shader.to_string();
        command.pixel_shader = pixel_shader.to_string();
        command
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = tag.to_string();
        self
    }

    pub fn with_vertex_lights(mut self, enable: bool) -> Self {
        self.vertex_lights = enable;
        self
    }

    pub fn with_use_lit_base(mut self, enable: bool) -> Self {
        self.use_lit_base = enable;
        self
    }

    pub fn with_mark_to_stencil(mut self, enable: bool) -> Self {
        self.mark_to_stencil = enable;
        self
    }

    pub fn with_metadata(mut self, metadata: &str) -> Self {
        self.metadata = metadata.to_string();
        self
    }

    pub fn with_outputs(mut self, outputs: &[&str]) -> Self {
        self.outputs = outputs.iter().map(|output| output.to_string()).collect();
        self
    }

    pub fn with_defines(mut self, vertex_defines: &str, pixel_defines: &str) -> Self {
        self.vertex_defines = vertex_defines.to_string();
        self.pixel_defines = pixel_defines.to_string();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderPath {
    commands: Vec<RenderPathCommand>,
}

impl RenderPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard forward rendering: clear, opaque base, per-pixel lights,
    /// post-opaque, alpha and post-alpha
    pub fn forward() -> Self {
        let mut path = Self::new();
        path.add_command(RenderPathCommand::clear(
            ClearFlags::COLOR | ClearFlags::DEPTH | ClearFlags::STENCIL,
            Vec4::new(0.0, 0.0, 0.0, 1.0),
            1.0,
            0,
        ));
        path.add_command(
            RenderPathCommand::scene_pass("base", SortMode::FrontToBack)
                .with_vertex_lights(true)
                .with_metadata("base"),
        );
        path.add_command(RenderPathCommand::forward_lights("light"));
        path.add_command(RenderPathCommand::scene_pass("postopaque", SortMode::FrontToBack));
        path.add_command(
            RenderPathCommand::scene_pass("alpha", SortMode::BackToFront)
                .with_vertex_lights(true)
                .with_metadata("alpha"),
        );
        path.add_command(RenderPathCommand::scene_pass("postalpha", SortMode::BackToFront));
        path
    }

    pub fn add_command(&mut self, command: RenderPathCommand) {
        self.commands.push(command);
    }

    pub fn insert_command(&mut self, index: usize, command: RenderPathCommand) {
        let index = index.min(self.commands.len());
        self.commands.insert(index, command);
    }

    pub fn remove_command(&mut self, index: usize) -> Option<RenderPathCommand> {
        (index < self.commands.len()).then(|| self.commands.remove(index))
    }

    /// Enable or disable every command carrying `tag`
    pub fn set_enabled(&mut self, tag: &str, enabled: bool) {
        for command in self.commands.iter_mut().filter(|command| command.tag.eq_ignore_ascii_case(tag)) {
            command.enabled = enabled;
        }
    }

    pub fn commands(&self) -> &[RenderPathCommand] {
        &self.commands
    }

    pub fn enabled_commands(&self) -> impl Iterator<Item = &RenderPathCommand> {
        self.commands.iter().filter(|command| command.enabled)
    }
}

#[cfg(test)]
#[path = "render_path_tests.rs"]
mod tests;
