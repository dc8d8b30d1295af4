//! Dirty-flag frame scheduler
//!
//! Input handlers mutate the scene through the scheduler and call
//! [`FrameScheduler::request_render`]. A single control thread owns the color
//! and depth buffers and runs passes back to back while the dirty flag keeps
//! getting set, so at most one pass is ever in flight, bursts of requests
//! collapse into one follow-up pass, and the latest state is always rendered
//! eventually. Each pass fans out over rayon.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use super::frame::{Frame, FrameEvent};
use super::postprocess::{apply_bloom, tone_map_into};
use crate::config::RenderConfig;
use crate::events::Observers;
use crate::mesh::Model;
use crate::rasterizer::{
    render_model, Camera, CameraEvent, Color, FrameTarget, Projector, RasterSettings, RasterStats,
    ShadingMode, Vec3,
};

/// Everything one pass reads, captured at the pass boundary
#[derive(Debug, Clone)]
pub struct SceneSnapshot {
    pub model: Option<Arc<Model>>,
    pub projector: Projector,
    pub settings: RasterSettings,
}

/// Buffers reused from pass to pass
pub struct FrameBuffers {
    target: FrameTarget,
    colors: Vec<Color>,
}

impl FrameBuffers {
    pub fn new() -> Self {
        Self {
            target: FrameTarget::new(0, 0),
            colors: Vec::new(),
        }
    }
}

impl Default for FrameBuffers {
    fn default() -> Self {
        Self::new()
    }
}

/// One complete pass: clear, rasterize, bloom, tone map
pub fn render_scene(snapshot: &SceneSnapshot, buffers: &mut FrameBuffers) -> Frame {
    let width = snapshot.projector.width;
    let height = snapshot.projector.height;
    let (w, h) = (width as usize, height as usize);

    buffers.target.resize(w, h);

    let stats = match &snapshot.model {
        Some(model) => render_model(model, &snapshot.projector, &snapshot.settings, &buffers.target),
        None => RasterStats::default(),
    };

    buffers.target.snapshot_colors(&mut buffers.colors);
    if snapshot.settings.bloom {
        apply_bloom(&mut buffers.colors, w, h);
    }

    let mut frame = Frame::black(width, height);
    tone_map_into(&buffers.colors, &mut frame.pixels);
    frame.stats = stats;
    frame
}

struct SceneState {
    camera: Camera,
    model: Option<Arc<Model>>,
    settings: RasterSettings,
}

struct Shared {
    scene: RwLock<SceneState>,
    dirty: AtomicBool,
    active: AtomicBool,
    running: AtomicBool,
    latest: Mutex<Option<Arc<Frame>>>,
    observers: Mutex<Observers<FrameEvent>>,
}

impl Shared {
    fn scene(&self) -> RwLockReadGuard<'_, SceneState> {
        self.scene.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn scene_mut(&self) -> RwLockWriteGuard<'_, SceneState> {
        self.scene.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn latest(&self) -> MutexGuard<'_, Option<Arc<Frame>>> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observers(&self) -> MutexGuard<'_, Observers<FrameEvent>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> SceneSnapshot {
        let scene = self.scene();
        SceneSnapshot {
            model: scene.model.clone(),
            projector: scene.camera.projector(),
            settings: scene.settings.clone(),
        }
    }
}

/// Owns the scene and the render thread
pub struct FrameScheduler {
    shared: Arc<Shared>,
    wake: Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FrameScheduler {
    /// Build the scene from `config` and start the control thread.
    ///
    /// Nothing is rendered until the first [`request_render`](Self::request_render).
    pub fn new(config: RenderConfig) -> Self {
        let camera = Camera::new(
            config.camera.clone(),
            config.viewport.width,
            config.viewport.height,
        );
        let shared = Arc::new(Shared {
            scene: RwLock::new(SceneState {
                camera,
                model: None,
                settings: config.raster_settings(),
            }),
            dirty: AtomicBool::new(false),
            active: AtomicBool::new(false),
            running: AtomicBool::new(true),
            latest: Mutex::new(None),
            observers: Mutex::new(Observers::new()),
        });

        let (wake, wake_rx) = crossbeam_channel::bounded(1);
        let interval = Duration::from_millis(config.frame_interval_ms);
        let thread_shared = Arc::clone(&shared);
        let handle = thread::spawn(move || render_loop(thread_shared, wake_rx, interval));

        Self {
            shared,
            wake,
            handle: Some(handle),
        }
    }

    /// Mark the scene dirty; starts a pass unless one is already running
    pub fn request_render(&self) {
        self.shared.dirty.store(true, Ordering::SeqCst);
        self.shared.active.store(true, Ordering::SeqCst);
        // A full channel already holds a pending wake-up
        let _ = self.wake.try_send(());
    }

    /// Whether a pass is running or about to
    pub fn is_rendering(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Applied at the next pass boundary; zero dimensions become 1
    pub fn set_viewport(&self, width: u32, height: u32) {
        self.shared.scene_mut().camera.set_viewport(width, height);
        self.request_render();
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.shared.scene().camera.viewport()
    }

    /// Swap in a new model and put the camera back to its start position
    pub fn set_model(&self, model: Arc<Model>) {
        {
            let mut scene = self.shared.scene_mut();
            log::info!("Scene model set to '{}'", model.name);
            scene.model = Some(model);
            scene.camera.reset();
        }
        self.request_render();
    }

    pub fn clear_model(&self) {
        self.shared.scene_mut().model = None;
        self.request_render();
    }

    pub fn model(&self) -> Option<Arc<Model>> {
        self.shared.scene().model.clone()
    }

    pub fn set_shading_mode(&self, mode: ShadingMode) {
        self.update_settings(|s| s.shading = mode);
    }

    pub fn set_bloom(&self, enabled: bool) {
        self.update_settings(|s| s.bloom = enabled);
    }

    pub fn set_light_direction(&self, direction: Vec3) {
        if direction.is_finite() && direction != Vec3::ZERO {
            self.update_settings(|s| s.light_dir = direction);
        }
    }

    pub fn settings(&self) -> RasterSettings {
        self.shared.scene().settings.clone()
    }

    fn update_settings(&self, f: impl FnOnce(&mut RasterSettings)) {
        let changed = {
            let mut scene = self.shared.scene_mut();
            let before = scene.settings.clone();
            f(&mut scene.settings);
            scene.settings != before
        };
        if changed {
            self.request_render();
        }
    }

    /// Mutate the camera; a render is requested only if it actually moved
    pub fn update_camera<R>(&self, f: impl FnOnce(&mut Camera) -> R) -> R {
        let (result, changed) = {
            let mut scene = self.shared.scene_mut();
            let revision = scene.camera.revision();
            let result = f(&mut scene.camera);
            (result, scene.camera.revision() != revision)
        };
        if changed {
            self.request_render();
        }
        result
    }

    pub fn camera_snapshot(&self) -> CameraEvent {
        self.shared.scene().camera.snapshot()
    }

    /// Most recently completed frame
    pub fn latest_frame(&self) -> Option<Arc<Frame>> {
        self.shared.latest().clone()
    }

    /// Receive a [`FrameEvent`] after every completed pass
    pub fn subscribe(&self) -> Receiver<FrameEvent> {
        self.shared.observers().subscribe()
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        let _ = self.wake.try_send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Render thread panicked");
            }
        }
    }
}

fn render_loop(shared: Arc<Shared>, wake: Receiver<()>, interval: Duration) {
    let mut buffers = FrameBuffers::new();
    let mut index = 0u64;
    let mut last_pass: Option<Instant> = None;

    log::info!("Render thread started.");

    while wake.recv().is_ok() {
        if !shared.running.load(Ordering::SeqCst) {
            break;
        }

        loop {
            while shared.dirty.swap(false, Ordering::SeqCst) {
                if let Some(last) = last_pass {
                    let since = last.elapsed();
                    if since < interval {
                        thread::sleep(interval - since);
                    }
                }
                if !shared.running.load(Ordering::SeqCst) {
                    break;
                }

                let snapshot = shared.snapshot();
                let start = Instant::now();
                let frame = render_scene(&snapshot, &mut buffers);
                let elapsed = start.elapsed();
                last_pass = Some(Instant::now());
                index += 1;

                let event = FrameEvent {
                    index,
                    width: frame.width,
                    height: frame.height,
                    elapsed,
                    pixels_written: frame.stats.pixels_written,
                };
                log::debug!(
                    "Pass {}: {}x{} in {:.2}ms, {} polygons drawn, {} culled, {} rejected, {} pixels",
                    index,
                    frame.width,
                    frame.height,
                    elapsed.as_secs_f64() * 1000.0,
                    frame.stats.drawn,
                    frame.stats.culled,
                    frame.stats.rejected,
                    frame.stats.pixels_written
                );

                // Publish before notifying so listeners always find this frame
                *shared.latest() = Some(Arc::new(frame));
                shared.observers().notify(event);
            }

            shared.active.store(false, Ordering::SeqCst);
            // A request that raced the last swap still gets its pass
            if !shared.dirty.load(Ordering::SeqCst) || !shared.running.load(Ordering::SeqCst) {
                break;
            }
            shared.active.store(true, Ordering::SeqCst);
        }

        if !shared.running.load(Ordering::SeqCst) {
            break;
        }
    }

    shared.active.store(false, Ordering::SeqCst);
    log::info!("Render thread stopped.");
}
