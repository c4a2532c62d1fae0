//! Viewer state and the per-frame update
//!
//! `Viewer` owns everything the render loop touches. `frame` is independent
//! of macroquad: the loop in `main` gathers window size, pointer position and
//! frame time into a [`FrameInput`] and presents the framebuffer it returns.

use crate::asset::{
    load_environment, load_model, AssetSource, EnvironmentMap, PendingLoad, ProgressTracker,
};
use crate::config::{AssetConfig, ViewerConfig};
use crate::controller::OrientationController;
use crate::input::PointerTracker;
use crate::post::{FrameContext, Pass, PipelineError, PostPipeline, RenderPass, RgbShiftPass};
use crate::rasterizer::{Camera, Framebuffer, RenderStats};
use crate::scene::{Background, ModelNode, Scene};
use crate::viewport::{RenderSurface, Viewport};

/// Everything one frame needs from the outside world
#[derive(Debug, Clone, Copy)]
pub struct FrameInput {
    pub viewport: Viewport,
    /// Pointer position in window units, if known
    pub pointer: Option<(f32, f32)>,
    /// Seconds since the previous frame
    pub dt: f32,
}

pub struct Viewer {
    pub scene: Scene,
    pipeline: PostPipeline,
    controller: OrientationController,
    tracker: PointerTracker,
    surface: RenderSurface,
    viewport: Viewport,
    model_load: Option<PendingLoad<ModelNode>>,
    environment_load: Option<PendingLoad<EnvironmentMap>>,
    stats: RenderStats,
}

impl Viewer {
    pub fn new(config: &ViewerConfig, viewport: Viewport) -> Result<Self, PipelineError> {
        let cam = &config.camera;
        let camera = Camera::perspective(cam.fov_y, viewport.aspect(), cam.near, cam.far)
            .looking_down_neg_z(cam.distance);

        let render = &config.render;
        let mut scene = Scene::new(camera);
        scene.ambient = render.ambient;
        scene.tone_mapping = render.tone_mapping;
        scene.environment_intensity = render.environment_intensity;
        scene.background = if render.environment_background {
            Background::Environment { fallback: render.clear_color }
        } else {
            Background::Clear(render.clear_color)
        };

        let surface = RenderSurface::new(&viewport, render.render_scale);
        let (width, height) = surface.buffer_size();
        let passes: Vec<Box<dyn Pass>> = vec![
            Box::new(RenderPass),
            Box::new(RgbShiftPass::new(config.rgb_shift.amount, config.rgb_shift.angle)),
        ];
        let pipeline = PostPipeline::new(width, height, passes)?;

        let ctrl = &config.controller;
        Ok(Self {
            scene,
            pipeline,
            controller: OrientationController::new(ctrl.tilt_range, ctrl.duration, ctrl.ease),
            tracker: PointerTracker::new(ctrl.interactive_region),
            surface,
            viewport,
            model_load: None,
            environment_load: None,
            stats: RenderStats::default(),
        })
    }

    /// Kick off the model and environment loads. They complete independently,
    /// in either order, while frames keep rendering.
    pub fn start_loads<S: AssetSource + Clone + 'static>(&mut self, source: S, assets: &AssetConfig) {
        let progress = ProgressTracker::new();
        let (src, path, tracker) = (source.clone(), assets.model_path.clone(), progress.clone());
        self.model_load = Some(PendingLoad::spawn(assets.model_path.clone(), progress, async move {
            load_model(&src, &path, &tracker).await
        }));

        let progress = ProgressTracker::new();
        let (path, tracker) = (assets.environment_path.clone(), progress.clone());
        self.environment_load = Some(PendingLoad::spawn(
            assets.environment_path.clone(),
            progress,
            async move { load_environment(&source, &path, &tracker).await },
        ));
    }

    pub fn is_loading(&self) -> bool {
        self.model_load.is_some() || self.environment_load.is_some()
    }

    /// Apply a new viewport: camera aspect, then surface, then pipeline buffers.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.scene.camera.set_aspect(viewport.aspect());
        self.surface.set_size(viewport.width, viewport.height);
        self.surface.set_pixel_ratio(viewport.pixel_ratio);
        let (width, height) = self.surface.buffer_size();
        self.pipeline.set_size(width, height);
        self.tracker.reset();
        log::debug!(
            "resized to {}x{} @{}x, buffer {}x{}",
            viewport.width,
            viewport.height,
            viewport.pixel_ratio,
            width,
            height
        );
    }

    fn poll_loads(&mut self) {
        if let Some(load) = self.model_load.as_mut() {
            if load.is_complete() {
                match load.take() {
                    Some(Ok(model)) => {
                        self.scene.attach_model(model);
                    }
                    Some(Err(e)) => log::error!("failed to load model {}: {}", load.label, e),
                    None => {}
                }
                self.model_load = None;
            }
        }

        if let Some(load) = self.environment_load.as_mut() {
            if load.is_complete() {
                match load.take() {
                    Some(Ok(env)) => self.scene.set_environment(env),
                    Some(Err(e)) => log::error!("failed to load environment {}: {}", load.label, e),
                    None => {}
                }
                self.environment_load = None;
            }
        }
    }

    /// Advance one frame and render it
    pub fn frame(&mut self, input: FrameInput) -> &Framebuffer {
        if input.viewport != self.viewport {
            self.resize(input.viewport);
        }

        self.poll_loads();

        if let Some((x, y)) = input.pointer {
            if let Some(event) = self.tracker.sample(x, y, &self.viewport) {
                self.controller.handle(event, &self.viewport, self.scene.model());
            }
        }
        self.controller.update(input.dt, self.scene.model_mut());

        let mut ctx = FrameContext::new(&self.scene);
        let output = self.pipeline.render(&mut ctx);
        self.stats = ctx.stats;
        output
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    #[cfg(test)]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[cfg(test)]
    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    pub fn pipeline(&self) -> &PostPipeline {
        &self.pipeline
    }

    #[cfg(test)]
    pub fn controller(&self) -> &OrientationController {
        &self.controller
    }
}
