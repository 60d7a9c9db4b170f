//! Contracts for the rendering/input collaborator. The engine core never
//! talks to a windowing library directly; a backend implements these traits
//! and the loop drives it.

use std::time::Duration;

use thiserror::Error;

use crate::geometry::{Rect, RectSet, Vec2};

/// A failure reported by the backend while drawing or presenting.
#[derive(Debug, Error)]
#[error("backend {operation} failed: {message}")]
pub struct BackendError {
    pub operation: &'static str,
    pub message: String,
}

impl BackendError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveLeft,
    MoveRight,
    Jump,
    Quit,
}

const ACTION_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, Default)]
pub struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveLeft => 0,
            InputAction::MoveRight => 1,
            InputAction::Jump => 2,
            InputAction::Quit => 3,
        }
    }
}

/// One step's worth of sampled input. Held keys are level-triggered through
/// [`ActionStates`]; `jump_pressed` and `quit_requested` are edges valid for
/// exactly one simulation step.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    jump_pressed: bool,
    actions: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(quit_requested: bool, jump_pressed: bool, actions: ActionStates) -> Self {
        Self {
            quit_requested,
            jump_pressed,
            actions,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn jump_pressed(&self) -> bool {
        self.jump_pressed
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_jump_pressed(mut self, jump_pressed: bool) -> Self {
        self.jump_pressed = jump_pressed;
        self
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }
}

/// Deferred display configuration. `set_*` calls only record intent;
/// `confirm` applies everything pending and `cancel` forgets it.
///
/// `take_screen_changed` is edge-triggered: it reports whether the screen
/// surface changed since the last call (a confirmed option change or a window
/// resize) and resets the flag, so the loop can force one full redraw.
pub trait DisplayOptions {
    fn fullscreen(&self) -> bool;
    fn set_fullscreen(&mut self, fullscreen: bool);
    fn resolution(&self) -> (u32, u32);
    fn set_resolution(&mut self, width: u32, height: u32);
    fn confirm(&mut self);
    fn cancel(&mut self);
    fn take_screen_changed(&mut self) -> bool;
}

/// The rendering/input backend consumed by the loop and the drawing
/// strategies.
pub trait Backend {
    /// Sample pending input, or `None` when the platform produced nothing.
    fn input(&mut self) -> Option<InputSnapshot>;

    /// Wall-clock time elapsed since the last [`Backend::update`] call.
    fn dt(&mut self) -> Duration;

    /// Blit the sprite selected by `pose` with its bottom-left corner at
    /// `position` (world coordinates), mapped through `viewport`.
    fn draw(&mut self, position: Vec2, pose: &str, viewport: &Rect) -> Result<(), BackendError>;

    /// Flip/present, given the world-space regions touched this pass. A
    /// backend may use the set to bound its present cost or ignore it.
    fn present(&mut self, touched: &RectSet) -> Result<(), BackendError>;

    /// End-of-frame hook, called once per loop iteration after physics
    /// catch-up. Restarts the [`Backend::dt`] clock.
    fn update(&mut self) -> Result<(), BackendError>;

    fn options(&mut self) -> &mut dyn DisplayOptions;

    fn screen_size(&self) -> (u32, u32);
}
