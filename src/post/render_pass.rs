//! Base scene render

use super::{FrameContext, Pass};
use crate::rasterizer::{render_scene, Framebuffer};

/// Source pass: rasterizes the scene into the write buffer
#[derive(Debug, Default)]
pub struct RenderPass;

impl Pass for RenderPass {
    fn name(&self) -> &str {
        "RenderPass"
    }

    fn reads_input(&self) -> bool {
        false
    }

    fn render(&mut self, ctx: &mut FrameContext, _read: &Framebuffer, write: &mut Framebuffer) {
        ctx.stats = render_scene(write, ctx.scene);
    }
}
