//! Post-processing pipeline
//!
//! An ordered list of full-screen passes, fixed at construction. Each pass
//! reads the previous pass's output and writes its own into the other half of
//! a ping-pong framebuffer pair. The first pass must be a source pass (one
//! that produces an image without reading its input), normally [`RenderPass`].

mod render_pass;
mod rgb_shift;

pub use render_pass::RenderPass;
pub use rgb_shift::RgbShiftPass;

use thiserror::Error;

use crate::rasterizer::{Framebuffer, RenderStats};
use crate::scene::Scene;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PipelineError {
    #[error("pass list is empty")]
    Empty,
    #[error("first pass '{0}' reads its input; the pipeline must start with a source pass")]
    MissingSourcePass(String),
}

/// Per-frame inputs and counters shared by the passes
pub struct FrameContext<'a> {
    pub scene: &'a Scene,
    pub stats: RenderStats,
}

impl<'a> FrameContext<'a> {
    pub fn new(scene: &'a Scene) -> Self {
        Self { scene, stats: RenderStats::default() }
    }
}

pub trait Pass {
    fn name(&self) -> &str;

    /// False for source passes that ignore `read`
    fn reads_input(&self) -> bool;

    /// Called when the pipeline's buffers change size
    fn set_size(&mut self, _width: usize, _height: usize) {}

    /// Fill `write`, which has the same size as `read`
    fn render(&mut self, ctx: &mut FrameContext, read: &Framebuffer, write: &mut Framebuffer);
}

pub struct PostPipeline {
    passes: Vec<Box<dyn Pass>>,
    read: Framebuffer,
    write: Framebuffer,
}

impl PostPipeline {
    pub fn new(width: usize, height: usize, passes: Vec<Box<dyn Pass>>) -> Result<Self, PipelineError> {
        let first = passes.first().ok_or(PipelineError::Empty)?;
        if first.reads_input() {
            return Err(PipelineError::MissingSourcePass(first.name().to_string()));
        }

        let mut pipeline = Self {
            passes,
            read: Framebuffer::new(width, height),
            write: Framebuffer::new(width, height),
        };
        for pass in &mut pipeline.passes {
            pass.set_size(width, height);
        }
        Ok(pipeline)
    }

    /// Run every pass in order and return the final image
    pub fn render(&mut self, ctx: &mut FrameContext) -> &Framebuffer {
        for pass in &mut self.passes {
            pass.render(ctx, &self.read, &mut self.write);
            std::mem::swap(&mut self.read, &mut self.write);
        }
        &self.read
    }

    pub fn set_size(&mut self, width: usize, height: usize) {
        self.read.resize(width, height);
        self.write.resize(width, height);
        for pass in &mut self.passes {
            pass.set_size(width, height);
        }
    }

    pub fn size(&self) -> (usize, usize) {
        (self.read.width, self.read.height)
    }

    /// Output of the most recent `render`
    pub fn output(&self) -> &Framebuffer {
        &self.read
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::{Camera, Color};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Fills with a color (source) or copies input and adds to red (filter),
    /// recording its name when run
    struct Probe {
        name: &'static str,
        source: bool,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Pass for Probe {
        fn name(&self) -> &str {
            self.name
        }
        fn reads_input(&self) -> bool {
            !self.source
        }
        fn render(&mut self, _ctx: &mut FrameContext, read: &Framebuffer, write: &mut Framebuffer) {
            self.log.borrow_mut().push(self.name);
            if self.source {
                write.clear(Color::new(10, 0, 0));
            } else {
                write.pixels.copy_from_slice(&read.pixels);
                for px in write.pixels.chunks_exact_mut(4) {
                    px[0] += 10;
                }
            }
        }
    }

    fn probe(name: &'static str, source: bool, log: &Rc<RefCell<Vec<&'static str>>>) -> Box<dyn Pass> {
        Box::new(Probe { name, source, log: Rc::clone(log) })
    }

    #[test]
    fn test_empty_pipeline_rejected() {
        assert_eq!(PostPipeline::new(4, 4, Vec::new()).err(), Some(PipelineError::Empty));
    }

    #[test]
    fn test_first_pass_must_be_source() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let result = PostPipeline::new(4, 4, vec![probe("filter", false, &log)]);
        assert_eq!(result.err(), Some(PipelineError::MissingSourcePass("filter".into())));
    }

    #[test]
    fn test_passes_run_in_order_and_chain() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut pipeline = PostPipeline::new(
            3,
            2,
            vec![probe("base", true, &log), probe("a", false, &log), probe("b", false, &log)],
        )
        .unwrap();
        assert_eq!(pipeline.pass_names(), vec!["base", "a", "b"]);

        let scene = Scene::new(Camera::default());
        let out = pipeline.render(&mut FrameContext::new(&scene));
        assert_eq!(out.get_pixel(2, 1), Some(Color::new(30, 0, 0)));
        assert_eq!(*log.borrow(), vec!["base", "a", "b"]);

        // Running again starts over from the source pass
        let out = pipeline.render(&mut FrameContext::new(&scene));
        assert_eq!(out.get_pixel(0, 0), Some(Color::new(30, 0, 0)));
    }

    #[test]
    fn test_set_size_resizes_buffers() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut pipeline = PostPipeline::new(3, 2, vec![probe("base", true, &log), probe("a", false, &log)]).unwrap();
        pipeline.set_size(8, 5);
        assert_eq!(pipeline.size(), (8, 5));
        let scene = Scene::new(Camera::default());
        let out = pipeline.render(&mut FrameContext::new(&scene));
        assert_eq!(out.pixels.len(), 8 * 5 * 4);
    }
}
