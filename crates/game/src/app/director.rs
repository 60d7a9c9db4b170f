//! The demo's level-wide logic: quit handling, the win condition, and the
//! restart flow.

use engine::{
    Director, DisplayOptions, InputAction, InputSnapshot, LevelCommand, Object, ObjectId, Rect,
    Stage, Vec2,
};
use tracing::{info, warn};

use super::behaviors::DoNothing;
use super::layout;

pub(crate) const OVERLAY_LAYER: &str = "overlay";

/// Watches the star: when it gets collected the win banner appears, and the
/// next jump press restarts the level from its layout.
pub(crate) struct DemoDirector {
    viewport: Rect,
    star: Option<ObjectId>,
    star_collected: bool,
}

impl DemoDirector {
    pub(crate) fn new(viewport: Rect, star: Option<ObjectId>) -> Self {
        Self {
            viewport,
            star,
            star_collected: false,
        }
    }

    fn star_is_gone(&self, stage: &Stage) -> bool {
        match self.star {
            Some(id) => stage.iter().all(|object| object.id() != id),
            None => false,
        }
    }
}

impl Director for DemoDirector {
    fn orchestrate(
        &mut self,
        _dt_seconds: f32,
        input: &InputSnapshot,
        stage: &mut Stage,
        _options: &mut dyn DisplayOptions,
    ) -> LevelCommand {
        if input.quit_requested() || input.is_down(InputAction::Quit) {
            info!("quit_requested");
            return LevelCommand::Clear;
        }

        if !self.star_collected && self.star_is_gone(stage) {
            self.star_collected = true;
            self.star = None;
            info!("star_collected");

            let (width, height) = stage.size();
            let banner = Object::new(
                "win_banner",
                Vec2::new(width / 2.0 - 120.0, height / 2.0 - 30.0),
                (240.0, 60.0),
                (240.0, 60.0),
                "win_banner",
                Box::new(DoNothing),
            );
            if let Err(error) = stage.add_spawn(banner, Some(OVERLAY_LAYER)) {
                warn!(error = %error, "banner_spawn_failed");
            }
        }

        if self.star_collected && input.jump_pressed() {
            match layout::demo_level() {
                Ok(level) => {
                    info!("level_restarted");
                    return LevelCommand::ResetTo(Box::new(level));
                }
                Err(error) => warn!(error = %error, "level_restart_failed"),
            }
        }

        LevelCommand::Continue
    }

    fn viewport(&self, _stage: &Stage) -> Rect {
        self.viewport
    }
}
