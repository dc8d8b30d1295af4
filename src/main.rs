//! Scanline Viewer: interactive front end for the software rasterizer
//!
//! - Left drag orbits (Shift locks to the dominant axis)
//! - Middle drag pans, wheel zooms
//! - 1-5 shading mode, B bloom, R reset camera, T reset pan target
//! - +/- camera speed, O open an OBJ

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crossbeam_channel::Receiver;
use macroquad::prelude::*;
use scanline::config::{load_config, RenderConfig};
use scanline::logging::{init_logging, LoggingConfig};
use scanline::mesh::{load_model, Model};
use scanline::rasterizer::{self as raster, create_test_cube, radians_to_degrees, Pivot, ShadingMode};
use scanline::scene::{Frame, FrameEvent, FrameScheduler};
use scanline::VERSION;

/// Read from the working directory unless a path is given as the second argument
const DEFAULT_CONFIG: &str = "scanline.ron";

static CONFIG: OnceLock<RenderConfig> = OnceLock::new();

fn config() -> &'static RenderConfig {
    CONFIG.get_or_init(|| {
        init_logging(LoggingConfig::default());

        let explicit = std::env::args().nth(2).map(PathBuf::from);
        let path = explicit.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
        if explicit.is_none() && !path.exists() {
            return RenderConfig::default();
        }

        match load_config(&path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Failed to load config {}: {}, using defaults", path.display(), e);
                RenderConfig::default()
            }
        }
    })
}

fn window_conf() -> Conf {
    let viewport = config().viewport;
    Conf {
        window_title: format!("Scanline Viewer v{}", VERSION),
        window_width: viewport.width as i32,
        window_height: viewport.height as i32,
        window_resizable: true,
        ..Default::default()
    }
}

struct Viewer {
    scheduler: FrameScheduler,
    events: Receiver<FrameEvent>,
    last_event: Option<FrameEvent>,
    drag_origin: Option<raster::Vec2>,
    shown: Option<(Arc<Frame>, Texture2D)>,
}

impl Viewer {
    fn new(scheduler: FrameScheduler) -> Self {
        let events = scheduler.subscribe();
        Self {
            scheduler,
            events,
            last_event: None,
            drag_origin: None,
            shown: None,
        }
    }

    fn open_model(&mut self, path: &Path) {
        match load_model(path) {
            Ok(model) => self.scheduler.set_model(Arc::new(model)),
            // The previous model stays on screen
            Err(e) => log::warn!("Failed to load {}: {}", path.display(), e),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn prompt_open(&mut self) {
        let dialog = rfd::FileDialog::new().add_filter("Wavefront OBJ", &["obj"]);
        if let Some(path) = dialog.pick_file() {
            self.open_model(&path);
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn prompt_open(&mut self) {
        log::warn!("Open not available in browser");
    }

    fn sync_viewport(&self) {
        let width = (screen_width() as u32).max(1);
        let height = (screen_height() as u32).max(1);
        if self.scheduler.viewport() != (width, height) {
            self.scheduler.set_viewport(width, height);
        }
    }

    fn handle_mouse(&mut self) {
        let (mx, my) = mouse_position();
        let mouse = raster::Vec2::new(mx, my);

        if is_mouse_button_pressed(MouseButton::Left) || is_mouse_button_pressed(MouseButton::Middle) {
            self.drag_origin = Some(mouse);
        }

        let left = is_mouse_button_down(MouseButton::Left);
        let middle = is_mouse_button_down(MouseButton::Middle);
        match self.drag_origin {
            Some(start) if left && start != mouse => {
                let shift = is_key_down(KeyCode::LeftShift) || is_key_down(KeyCode::RightShift);
                let end = if shift { dominant_axis(start, mouse) } else { mouse };
                self.scheduler.update_camera(|cam| cam.rotate(start, end));
                self.drag_origin = Some(mouse);
            }
            Some(start) if middle && start != mouse => {
                self.scheduler.update_camera(|cam| cam.move_target(start, mouse));
                self.drag_origin = Some(mouse);
            }
            _ if !left && !middle => self.drag_origin = None,
            _ => {}
        }

        let (_, wheel) = mouse_wheel();
        if wheel > 0.0 {
            self.scheduler.update_camera(|cam| cam.change_distance(-1.0));
        } else if wheel < 0.0 {
            self.scheduler.update_camera(|cam| cam.change_distance(1.0));
        }
    }

    fn handle_keys(&mut self) {
        let mode_keys = [KeyCode::Key1, KeyCode::Key2, KeyCode::Key3, KeyCode::Key4, KeyCode::Key5];
        for (key, mode) in mode_keys.into_iter().zip(ShadingMode::ALL) {
            if is_key_pressed(key) {
                self.scheduler.set_shading_mode(mode);
            }
        }

        if is_key_pressed(KeyCode::B) {
            let bloom = !self.scheduler.settings().bloom;
            self.scheduler.set_bloom(bloom);
        }
        if is_key_pressed(KeyCode::R) {
            self.scheduler.update_camera(|cam| cam.reset());
        }
        if is_key_pressed(KeyCode::T) {
            self.scheduler.update_camera(|cam| cam.set_target(raster::Vec3::ZERO));
        }
        if is_key_pressed(KeyCode::Equal) || is_key_pressed(KeyCode::KpAdd) {
            self.scheduler.update_camera(|cam| cam.set_speed(cam.speed() + 1.0));
        }
        if is_key_pressed(KeyCode::Minus) || is_key_pressed(KeyCode::KpSubtract) {
            self.scheduler.update_camera(|cam| cam.set_speed(cam.speed() - 1.0));
        }
        if is_key_pressed(KeyCode::O) {
            self.prompt_open();
        }
    }

    fn present(&mut self) {
        if let Some(event) = self.events.try_iter().last() {
            self.last_event = Some(event);
        }

        if let Some(frame) = self.scheduler.latest_frame() {
            let stale = self
                .shown
                .as_ref()
                .map_or(true, |(shown, _)| !Arc::ptr_eq(shown, &frame));
            if stale {
                let texture = Texture2D::from_rgba8(frame.width as u16, frame.height as u16, &frame.to_rgba());
                texture.set_filter(FilterMode::Nearest);
                self.shown = Some((frame, texture));
            }
        }

        if let Some((_, texture)) = &self.shown {
            draw_texture_ex(
                texture,
                0.0,
                0.0,
                WHITE,
                DrawTextureParams {
                    dest_size: Some(vec2(screen_width(), screen_height())),
                    ..Default::default()
                },
            );
        }

        let text_color = Color::from_rgba(220, 220, 220, 255);
        draw_text(&self.camera_status(), 8.0, 20.0, 18.0, text_color);
        draw_text(&self.render_status(), 8.0, 40.0, 18.0, text_color);
    }

    fn camera_status(&self) -> String {
        let cam = self.scheduler.camera_snapshot();
        format!(
            "Polar: {:.1}°  Azimuthal: {:.1}°  Eye: ({:.1}, {:.1}, {:.1})  Distance: {:.1}  Target: ({:.1}, {:.1}, {:.1})",
            radians_to_degrees(cam.polar_angle),
            radians_to_degrees(cam.azimuthal_angle),
            cam.eye.x,
            cam.eye.y,
            cam.eye.z,
            cam.distance,
            cam.target.x,
            cam.target.y,
            cam.target.z,
        )
    }

    fn render_status(&self) -> String {
        let settings = self.scheduler.settings();
        let speed = self.scheduler.camera_snapshot().speed;
        let model = self
            .scheduler
            .model()
            .map(|m| m.name.clone())
            .unwrap_or_else(|| "-".to_string());
        let pass = match &self.last_event {
            Some(e) => format!("{:.1}ms  {} px", e.elapsed.as_secs_f64() * 1000.0, e.pixels_written),
            None => "-".to_string(),
        };
        format!(
            "Model: {}  Shading: {}  Bloom: {}  Speed: {:.0}  Pass: {}",
            model,
            settings.shading.label(),
            if settings.bloom { "on" } else { "off" },
            speed,
            pass,
        )
    }
}

/// Keep only the larger of the two drag components
fn dominant_axis(start: raster::Vec2, end: raster::Vec2) -> raster::Vec2 {
    let d = end - start;
    if d.x.abs() > d.y.abs() {
        raster::Vec2::new(end.x, start.y)
    } else {
        raster::Vec2::new(start.x, end.y)
    }
}

fn startup_model() -> Option<Model> {
    if let Some(path) = std::env::args().nth(1) {
        match load_model(&path) {
            Ok(model) => return Some(model),
            Err(e) => log::warn!("Failed to load {}: {}", path, e),
        }
    }
    Model::new(create_test_cube(10.0), Pivot::default())
        .map(|model| model.with_name("cube"))
        .ok()
}

#[macroquad::main(window_conf)]
async fn main() {
    let config = config().clone();
    log::info!("=== Scanline Viewer v{} ===", VERSION);

    let mut viewer = Viewer::new(FrameScheduler::new(config));
    viewer.sync_viewport();
    match startup_model() {
        Some(model) => viewer.scheduler.set_model(Arc::new(model)),
        None => viewer.scheduler.request_render(),
    }

    loop {
        clear_background(BLACK);

        viewer.sync_viewport();
        viewer.handle_mouse();
        viewer.handle_keys();
        viewer.present();

        next_frame().await;
    }
}
