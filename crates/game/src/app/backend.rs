//! The winit + pixels rendering/input backend.
//!
//! The window's event loop is pumped once per input sample rather than run
//! as a callback loop, so the engine stays in control of frame pacing. The
//! framebuffer is persistent across frames; incremental strategies only
//! overdraw the regions they report as touched.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use engine::{
    ActionStates, Backend, BackendError, DisplayOptions, InputAction, InputSnapshot, Rect, RectSet,
    SpriteCache, Vec2,
};
use pixels::{Pixels, SurfaceTexture};
use tracing::{debug, info, warn};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::EventLoopExtPumpEvents;
use winit::window::{Fullscreen, Window, WindowBuilder};

const PLACEHOLDER_SIZE: u32 = 16;
const PLACEHOLDER_COLOR: [u8; 4] = [0xff, 0x00, 0xff, 0xff];

pub(crate) struct SpriteImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

fn load_sprite(asset_root: &Path, pose: &str) -> Option<SpriteImage> {
    let path = asset_root.join(format!("{pose}.png"));
    match image::open(&path) {
        Ok(decoded) => {
            let rgba = decoded.to_rgba8();
            let (width, height) = rgba.dimensions();
            info!(pose, path = %path.display(), width, height, "sprite_loaded");
            Some(SpriteImage {
                width,
                height,
                rgba: rgba.into_raw(),
            })
        }
        Err(error) => {
            // Reported once; the miss is cached and a placeholder is drawn.
            warn!(pose, path = %path.display(), error = %error, "sprite_load_failed");
            None
        }
    }
}

/// Maps a world-space anchor (bottom-left corner of a sprite, y-up) to the
/// sprite's top-left corner in frame coordinates (y-down, origin at the
/// viewport's top-left).
fn world_to_frame(position: Vec2, viewport: &Rect, sprite_height: u32) -> (i32, i32) {
    let sx = (position.x - viewport.x).round() as i32;
    let sy = (viewport.y + viewport.h - position.y - sprite_height as f32).round() as i32;
    (sx, sy)
}

/// Copies a sprite into the frame at `(dest_x, dest_y)` (top-left, frame
/// coordinates), clipping at the frame edges and skipping fully transparent
/// pixels.
fn blit_rgba(
    frame: &mut [u8],
    frame_width: u32,
    frame_height: u32,
    sprite: &SpriteImage,
    dest_x: i32,
    dest_y: i32,
) {
    for row in 0..sprite.height as i32 {
        let fy = dest_y + row;
        if fy < 0 || fy >= frame_height as i32 {
            continue;
        }
        for col in 0..sprite.width as i32 {
            let fx = dest_x + col;
            if fx < 0 || fx >= frame_width as i32 {
                continue;
            }
            let src = ((row * sprite.width as i32 + col) * 4) as usize;
            if sprite.rgba[src + 3] == 0 {
                continue;
            }
            let dst = ((fy * frame_width as i32 + fx) * 4) as usize;
            frame[dst..dst + 4].copy_from_slice(&sprite.rgba[src..src + 4]);
        }
    }
}

fn fill_rect(
    frame: &mut [u8],
    frame_width: u32,
    frame_height: u32,
    dest_x: i32,
    dest_y: i32,
    width: u32,
    height: u32,
    color: [u8; 4],
) {
    for row in 0..height as i32 {
        let fy = dest_y + row;
        if fy < 0 || fy >= frame_height as i32 {
            continue;
        }
        for col in 0..width as i32 {
            let fx = dest_x + col;
            if fx < 0 || fx >= frame_width as i32 {
                continue;
            }
            let dst = ((fy * frame_width as i32 + fx) * 4) as usize;
            frame[dst..dst + 4].copy_from_slice(&color);
        }
    }
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    jump_is_down: bool,
    jump_pressed_edge: bool,
    actions: ActionStates,
}

impl InputCollector {
    fn handle_key(&mut self, key_event: &KeyEvent) {
        let is_pressed = key_event.state == ElementState::Pressed;
        match key_event.physical_key {
            PhysicalKey::Code(KeyCode::ArrowLeft) | PhysicalKey::Code(KeyCode::KeyA) => {
                self.actions.set(InputAction::MoveLeft, is_pressed);
            }
            PhysicalKey::Code(KeyCode::ArrowRight) | PhysicalKey::Code(KeyCode::KeyD) => {
                self.actions.set(InputAction::MoveRight, is_pressed);
            }
            PhysicalKey::Code(KeyCode::Space)
            | PhysicalKey::Code(KeyCode::ArrowUp)
            | PhysicalKey::Code(KeyCode::KeyW) => {
                self.handle_jump_state(is_pressed);
            }
            PhysicalKey::Code(KeyCode::Escape) => {
                self.actions.set(InputAction::Quit, is_pressed);
                if is_pressed {
                    self.quit_requested = true;
                }
            }
            _ => {}
        }
    }

    fn handle_jump_state(&mut self, is_pressed: bool) {
        if is_pressed && !self.jump_is_down {
            self.jump_pressed_edge = true;
        }
        self.jump_is_down = is_pressed;
        self.actions.set(InputAction::Jump, is_pressed);
    }

    /// Edges are consumed by exactly one snapshot; held keys persist.
    fn snapshot_for_step(&mut self) -> InputSnapshot {
        let snapshot =
            InputSnapshot::new(self.quit_requested, self.jump_pressed_edge, self.actions);
        self.jump_pressed_edge = false;
        snapshot
    }
}

/// Deferred window configuration: `set_*` records intent, `confirm` applies
/// it to the live window.
pub(crate) struct WindowOptions {
    window: Arc<Window>,
    fullscreen: bool,
    resolution: (u32, u32),
    pending_fullscreen: Option<bool>,
    pending_resolution: Option<(u32, u32)>,
    screen_changed: bool,
}

impl WindowOptions {
    fn new(window: Arc<Window>, fullscreen: bool, resolution: (u32, u32)) -> Self {
        Self {
            window,
            fullscreen,
            resolution,
            pending_fullscreen: None,
            pending_resolution: None,
            screen_changed: false,
        }
    }

    fn note_resized(&mut self, width: u32, height: u32) {
        self.resolution = (width, height);
        self.screen_changed = true;
    }
}

impl DisplayOptions for WindowOptions {
    fn fullscreen(&self) -> bool {
        self.pending_fullscreen.unwrap_or(self.fullscreen)
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.pending_fullscreen = Some(fullscreen);
    }

    fn resolution(&self) -> (u32, u32) {
        self.pending_resolution.unwrap_or(self.resolution)
    }

    fn set_resolution(&mut self, width: u32, height: u32) {
        self.pending_resolution = Some((width, height));
    }

    fn confirm(&mut self) {
        if let Some(fullscreen) = self.pending_fullscreen.take() {
            self.window
                .set_fullscreen(fullscreen.then(|| Fullscreen::Borderless(None)));
            self.fullscreen = fullscreen;
            self.screen_changed = true;
            info!(fullscreen, "fullscreen_applied");
        }
        if let Some((width, height)) = self.pending_resolution.take() {
            // The framebuffer follows via the Resized event.
            let _ = self
                .window
                .request_inner_size(LogicalSize::new(width, height));
            info!(width, height, "resolution_requested");
        }
    }

    fn cancel(&mut self) {
        self.pending_fullscreen = None;
        self.pending_resolution = None;
    }

    fn take_screen_changed(&mut self) -> bool {
        std::mem::take(&mut self.screen_changed)
    }
}

/// [`Backend`] implementation over a winit window and a pixels framebuffer.
pub(crate) struct PixelsBackend {
    event_loop: EventLoop<()>,
    window: Arc<Window>,
    pixels: Pixels<'static>,
    size: (u32, u32),
    sprites: SpriteCache<Option<SpriteImage>>,
    asset_root: PathBuf,
    collector: InputCollector,
    options: WindowOptions,
    last_update: Instant,
}

impl PixelsBackend {
    pub(crate) fn new(
        title: &str,
        width: u32,
        height: u32,
        fullscreen: bool,
        asset_root: PathBuf,
    ) -> Result<Self, BackendError> {
        let event_loop = EventLoop::new()
            .map_err(|error| BackendError::new("create_event_loop", error.to_string()))?;
        let window = Arc::new(
            WindowBuilder::new()
                .with_title(title)
                .with_inner_size(LogicalSize::new(width as f64, height as f64))
                .build(&event_loop)
                .map_err(|error| BackendError::new("create_window", error.to_string()))?,
        );
        if fullscreen {
            window.set_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let surface_size = window.inner_size();
        let surface = SurfaceTexture::new(
            surface_size.width.max(1),
            surface_size.height.max(1),
            Arc::clone(&window),
        );
        let pixels = Pixels::new(width, height, surface)
            .map_err(|error| BackendError::new("create_framebuffer", error.to_string()))?;

        info!(
            title,
            width,
            height,
            fullscreen,
            asset_root = %asset_root.display(),
            "backend_created"
        );

        Ok(Self {
            options: WindowOptions::new(Arc::clone(&window), fullscreen, (width, height)),
            event_loop,
            window,
            pixels,
            size: (width, height),
            sprites: SpriteCache::new(),
            asset_root,
            collector: InputCollector::default(),
            last_update: Instant::now(),
        })
    }

    fn apply_resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let Err(error) = self.pixels.resize_surface(width, height) {
            warn!(error = %error, "surface_resize_failed");
            return;
        }
        if let Err(error) = self.pixels.resize_buffer(width, height) {
            warn!(error = %error, "buffer_resize_failed");
            return;
        }
        self.size = (width, height);
        self.options.note_resized(width, height);
        debug!(width, height, "framebuffer_resized");
    }
}

impl Backend for PixelsBackend {
    fn input(&mut self) -> Option<InputSnapshot> {
        let collector = &mut self.collector;
        let window_id = self.window.id();
        let mut resized = None;

        let _ = self
            .event_loop
            .pump_events(Some(Duration::ZERO), |event, _| {
                if let Event::WindowEvent { window_id: id, event } = event {
                    if id != window_id {
                        return;
                    }
                    match event {
                        WindowEvent::CloseRequested => collector.quit_requested = true,
                        WindowEvent::Resized(new_size) => {
                            resized = Some((new_size.width, new_size.height));
                        }
                        WindowEvent::KeyboardInput { event, .. } => collector.handle_key(&event),
                        _ => {}
                    }
                }
            });

        if let Some((width, height)) = resized {
            self.apply_resize(width, height);
        }
        Some(self.collector.snapshot_for_step())
    }

    fn dt(&mut self) -> Duration {
        self.last_update.elapsed()
    }

    fn draw(&mut self, position: Vec2, pose: &str, viewport: &Rect) -> Result<(), BackendError> {
        let (frame_width, frame_height) = self.size;
        let asset_root = self.asset_root.as_path();
        let sprite = self
            .sprites
            .get_or_load(pose, |name| load_sprite(asset_root, name));
        let frame = self.pixels.frame_mut();

        match sprite {
            Some(image) => {
                let (sx, sy) = world_to_frame(position, viewport, image.height);
                blit_rgba(frame, frame_width, frame_height, image, sx, sy);
            }
            None => {
                let (sx, sy) = world_to_frame(position, viewport, PLACEHOLDER_SIZE);
                fill_rect(
                    frame,
                    frame_width,
                    frame_height,
                    sx,
                    sy,
                    PLACEHOLDER_SIZE,
                    PLACEHOLDER_SIZE,
                    PLACEHOLDER_COLOR,
                );
            }
        }
        Ok(())
    }

    /// Presents the whole frame; the touched set only bounded the CPU-side
    /// blits that led here.
    fn present(&mut self, touched: &RectSet) -> Result<(), BackendError> {
        debug!(touched = touched.len(), "present");
        self.pixels
            .render()
            .map_err(|error| BackendError::new("present", error.to_string()))
    }

    fn update(&mut self) -> Result<(), BackendError> {
        self.last_update = Instant::now();
        Ok(())
    }

    fn options(&mut self) -> &mut dyn DisplayOptions {
        &mut self.options
    }

    fn screen_size(&self) -> (u32, u32) {
        self.size
    }
}
