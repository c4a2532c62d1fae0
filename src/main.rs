//! tiltview: a glTF viewer that tilts toward the pointer
//!
//! Loads a glTF model and an HDR environment, renders them with a software
//! rasterizer followed by an RGB-shift post pass, and eases the model's
//! rotation toward the mouse. Runs natively and in the browser.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod app;
mod asset;
mod config;
mod controller;
mod input;
mod logging;
mod post;
mod rasterizer;
mod scene;
mod tween;
mod viewport;

use macroquad::prelude::*;
use app::{FrameInput, Viewer};
use asset::FileSource;
use config::{ViewerConfig, CONFIG_PATH};
use viewport::Viewport;

fn window_conf() -> Conf {
    Conf {
        window_title: format!("tiltview v{}", VERSION),
        window_width: 1280,
        window_height: 720,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

fn current_viewport(max_pixel_ratio: f32) -> Viewport {
    Viewport::new(screen_width(), screen_height(), screen_dpi_scale(), max_pixel_ratio)
}

/// Upload the framebuffer into the persistent texture (recreated when the size
/// changes) and stretch it over the window
fn present(texture: &mut Option<Texture2D>, fb: &rasterizer::Framebuffer) {
    let same_size = texture
        .as_ref()
        .is_some_and(|t| t.width() as usize == fb.width && t.height() as usize == fb.height);

    match texture {
        Some(tex) if same_size => tex.update_from_bytes(fb.width as u32, fb.height as u32, &fb.pixels),
        _ => {
            let tex = Texture2D::from_rgba8(fb.width as u16, fb.height as u16, &fb.pixels);
            tex.set_filter(FilterMode::Linear);
            *texture = Some(tex);
        }
    }

    if let Some(tex) = texture {
        draw_texture_ex(
            tex,
            0.0,
            0.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(Vec2::new(screen_width(), screen_height())),
                ..Default::default()
            },
        );
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    // Initialize crash logging FIRST (before any other code)
    #[cfg(not(target_arch = "wasm32"))]
    crashlog::setup!(crashlog::cargo_metadata!().capitalized(), false);

    logging::init_logging();
    log::info!("tiltview v{}", VERSION);

    let config = ViewerConfig::load(CONFIG_PATH).await;
    let max_pixel_ratio = config.render.max_pixel_ratio;

    let mut viewer = match Viewer::new(&config, current_viewport(max_pixel_ratio)) {
        Ok(viewer) => viewer,
        Err(e) => {
            log::error!("cannot build render pipeline: {}", e);
            return;
        }
    };
    viewer.start_loads(FileSource, &config.assets);

    let mut texture: Option<Texture2D> = None;

    loop {
        let (mouse_x, mouse_y) = mouse_position();
        let input = FrameInput {
            viewport: current_viewport(max_pixel_ratio),
            pointer: Some((mouse_x, mouse_y)),
            dt: get_frame_time(),
        };

        let was_loading = viewer.is_loading();
        viewer.frame(input);
        if was_loading && !viewer.is_loading() {
            let stats = viewer.stats();
            log::info!(
                "loads finished: {} triangles drawn, {} culled",
                stats.triangles_drawn,
                stats.triangles_culled
            );
        }

        clear_background(BLACK);
        present(&mut texture, viewer.pipeline().output());

        next_frame().await;
    }
}
