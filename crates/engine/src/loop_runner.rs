//! The fixed-timestep game loop.
//!
//! Rendering happens once per frame; simulation advances in fixed steps
//! paid for out of an accumulator fed by wall-clock time. When a frame
//! cannot afford all owed steps the cap bounds the work and the unpaid
//! backlog stays in the accumulator for later frames.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::backend::{Backend, BackendError};
use crate::metrics::MetricsAccumulator;
use crate::redraw::DrawingStrategy;
use crate::scene::{Level, LevelCommand};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub timestep: Duration,
    pub max_steps_per_frame: u32,
    pub max_frame_delta: Duration,
    pub metrics_log_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            timestep: Duration::from_secs_f64(1.0 / 60.0),
            max_steps_per_frame: 5,
            max_frame_delta: Duration::from_millis(250),
            metrics_log_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Owns the backend, the drawing strategy and the level stack, and runs
/// them until the stack is empty.
pub struct Game {
    backend: Box<dyn Backend>,
    strategy: Box<dyn DrawingStrategy>,
    levels: Vec<Level>,
    config: LoopConfig,
}

impl Game {
    pub fn new(
        backend: Box<dyn Backend>,
        strategy: Box<dyn DrawingStrategy>,
        initial_level: Level,
        config: LoopConfig,
    ) -> Self {
        Self {
            backend,
            strategy,
            levels: vec![initial_level],
            config,
        }
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn run(&mut self) -> Result<(), GameError> {
        let timestep = normalize_non_zero_duration(
            self.config.timestep,
            Duration::from_secs_f64(1.0 / 60.0),
        );
        let timestep_seconds = timestep.as_secs_f32();
        let max_steps_per_frame = self.config.max_steps_per_frame.max(1);
        let max_frame_delta =
            normalize_non_zero_duration(self.config.max_frame_delta, Duration::from_millis(250));
        let metrics_log_interval =
            normalize_non_zero_duration(self.config.metrics_log_interval, Duration::from_secs(1));

        info!(
            timestep_ms = timestep.as_millis() as u64,
            max_steps_per_frame,
            max_frame_delta_ms = max_frame_delta.as_millis() as u64,
            metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
            "loop_config"
        );

        let mut accumulator = Duration::ZERO;
        let mut metrics = MetricsAccumulator::new(metrics_log_interval);

        while !self.levels.is_empty() {
            if self.backend.options().take_screen_changed() {
                self.strategy.force_all();
            }

            if let Some(level) = self.levels.last_mut() {
                level.render(self.strategy.as_mut(), self.backend.as_mut())?;
            }

            let frame_dt = self.backend.dt().min(max_frame_delta);
            accumulator = accumulator.saturating_add(frame_dt);

            let plan = plan_sim_steps(accumulator, timestep, max_steps_per_frame);
            let mut executed = 0u32;
            for _ in 0..plan.steps {
                let input = self.backend.input().unwrap_or_default();
                let command = match self.levels.last_mut() {
                    Some(level) => level.step(timestep_seconds, &input, self.backend.options()),
                    None => break,
                };
                executed += 1;
                metrics.record_step();
                if self.apply_command(command) {
                    // Remaining steps this frame would run against a level
                    // that was not rendered yet.
                    break;
                }
            }
            // A cut-short batch keeps its unspent budget owed, so the new
            // top of the stack inherits the skipped steps.
            accumulator = if executed == plan.steps {
                plan.remaining
            } else {
                accumulator.saturating_sub(timestep.saturating_mul(executed))
            };

            if plan.capped {
                warn!(
                    backlog_ms = plan.remaining.as_millis() as u64,
                    max_steps_per_frame, "step_cap_hit"
                );
            }

            self.backend.update()?;
            metrics.record_frame(frame_dt);

            if let Some(snapshot) = metrics.maybe_snapshot(Instant::now()) {
                info!(
                    fps = snapshot.fps,
                    sps = snapshot.sps,
                    frame_time_ms = snapshot.frame_time_ms,
                    worst_frame_ms = snapshot.worst_frame_ms,
                    level_count = self.levels.len(),
                    "loop_metrics"
                );
            }
        }

        info!("loop_finished");
        Ok(())
    }

    /// Applies a stack command; true means the top of the stack changed.
    fn apply_command(&mut self, command: LevelCommand) -> bool {
        match command {
            LevelCommand::Continue => false,
            LevelCommand::Push(level) => {
                self.levels.push(*level);
                info!(depth = self.levels.len(), "level_pushed");
                true
            }
            LevelCommand::Pop => {
                self.levels.pop();
                info!(depth = self.levels.len(), "level_popped");
                true
            }
            LevelCommand::ResetTo(level) => {
                self.levels.pop();
                self.levels.push(*level);
                info!(depth = self.levels.len(), "level_reset");
                true
            }
            LevelCommand::Clear => {
                self.levels.clear();
                info!("level_stack_cleared");
                true
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    steps: u32,
    /// Whatever the frame could not pay for, including backlog past the
    /// cap; it stays owed.
    remaining: Duration,
    capped: bool,
}

fn plan_sim_steps(accumulator: Duration, timestep: Duration, max_steps_per_frame: u32) -> StepPlan {
    let mut remaining = accumulator;
    let mut steps = 0u32;
    while remaining >= timestep && steps < max_steps_per_frame {
        remaining = remaining.saturating_sub(timestep);
        steps = steps.saturating_add(1);
    }
    StepPlan {
        steps,
        remaining,
        capped: remaining >= timestep,
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
