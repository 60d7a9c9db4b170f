//! A small 2D engine built around three ideas: incremental redraw (only
//! repaint what changed), triple-buffered object state (behaviors read the
//! past and present, write only the future), and a fixed-timestep loop
//! (simulation steps are deterministic regardless of frame rate).
//!
//! The crate is backend-agnostic; a game supplies a [`Backend`] for its
//! window, input and blitting, and drives everything through [`Game::run`].

pub mod assets;
pub mod backend;
pub mod geometry;
pub mod loop_runner;
mod metrics;
pub mod object;
pub mod redraw;
pub mod scene;
pub mod stage;

pub use assets::SpriteCache;
pub use backend::{
    ActionStates, Backend, BackendError, DisplayOptions, InputAction, InputSnapshot,
};
pub use geometry::{Rect, RectSet, Vec2};
pub use loop_runner::{Game, GameError, LoopConfig};
pub use metrics::LoopMetricsSnapshot;
pub use object::{Behavior, Object, ObjectId, ObjectState, StepContext};
pub use redraw::{DeathLedger, DirtyTracking, DrawingStrategy, Everyone, RedrawReport};
pub use scene::{Director, Level, LevelCommand};
pub use stage::{
    DeathNotice, DeathObserver, SnapshotEntry, Stage, StageError, StageId, StageSnapshot,
};
