//! Levels and the directors that run them.
//!
//! A level owns a stage and a director. The director is the only place
//! where game-wide decisions live: it hands per-object hints to behaviors,
//! reacts to the stage after each step, and asks for level-stack changes
//! through [`LevelCommand`] rather than mutating the stack itself.

use std::any::Any;

use tracing::debug;

use crate::backend::{Backend, BackendError, DisplayOptions, InputSnapshot};
use crate::geometry::Rect;
use crate::object::{Object, StepContext};
use crate::redraw::{DrawingStrategy, RedrawReport};
use crate::stage::Stage;

/// Requested change to the level stack, applied by the loop after the step
/// completes.
pub enum LevelCommand {
    Continue,
    /// Suspend the current level and run the given one on top of it.
    Push(Box<Level>),
    /// End the current level, resuming the one below if any.
    Pop,
    /// Replace the current level.
    ResetTo(Box<Level>),
    /// End the whole run.
    Clear,
}

/// Level-wide logic: per-object hints before each step, orchestration after
/// it, and the camera.
pub trait Director {
    /// Opaque data for one object's behavior this step. The default is no
    /// hint; behaviors must cope with that.
    fn hint_for(&self, _object: &Object) -> Option<Box<dyn Any>> {
        None
    }

    /// Runs after decide/commit/harvest/spawn, with the stage in its
    /// post-step shape. May queue spawns and adjust display options.
    fn orchestrate(
        &mut self,
        dt_seconds: f32,
        input: &InputSnapshot,
        stage: &mut Stage,
        options: &mut dyn DisplayOptions,
    ) -> LevelCommand;

    /// World region currently shown on screen.
    fn viewport(&self, stage: &Stage) -> Rect;
}

/// One stage plus the director running it.
pub struct Level {
    director: Box<dyn Director>,
    stage: Stage,
}

impl std::fmt::Debug for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Level").finish_non_exhaustive()
    }
}

impl Level {
    pub fn new(director: Box<dyn Director>, stage: Stage) -> Self {
        Self { director, stage }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    /// Advances the simulation by one fixed step.
    ///
    /// Order is deliberate: every object decides against the same pre-step
    /// snapshot, all commits happen before any removal, deaths are harvested
    /// before spawns join, and the director sees the settled stage last.
    pub fn step(
        &mut self,
        dt_seconds: f32,
        input: &InputSnapshot,
        options: &mut dyn DisplayOptions,
    ) -> LevelCommand {
        let snapshot = self.stage.snapshot();

        let director = &*self.director;
        for object in self.stage.objects_mut() {
            let hint = director.hint_for(object);
            let ctx = StepContext {
                dt_seconds,
                input,
                stage: &snapshot,
                hint: hint.as_deref(),
            };
            object.decide(&ctx);
        }
        for object in self.stage.objects_mut() {
            object.commit();
        }

        self.stage.harvest_dead();
        self.stage.spawn();

        let command = self
            .director
            .orchestrate(dt_seconds, input, &mut self.stage, options);
        if !matches!(command, LevelCommand::Continue) {
            debug!(command = command_name(&command), "level_command_issued");
        }
        command
    }

    /// Repaints via the given strategy, framed by the director's viewport.
    pub fn render(
        &mut self,
        strategy: &mut dyn DrawingStrategy,
        backend: &mut dyn Backend,
    ) -> Result<RedrawReport, BackendError> {
        let viewport = self.director.viewport(&self.stage);
        strategy.render(&mut self.stage, backend, viewport)
    }
}

fn command_name(command: &LevelCommand) -> &'static str {
    match command {
        LevelCommand::Continue => "continue",
        LevelCommand::Push(_) => "push",
        LevelCommand::Pop => "pop",
        LevelCommand::ResetTo(_) => "reset_to",
        LevelCommand::Clear => "clear",
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::backend::InputAction;
    use crate::geometry::Vec2;
    use crate::object::{Behavior, ObjectState};

    #[derive(Debug, Default)]
    struct TestOptions {
        fullscreen: bool,
        resolution: (u32, u32),
        screen_changed: bool,
    }

    impl DisplayOptions for TestOptions {
        fn fullscreen(&self) -> bool {
            self.fullscreen
        }
        fn set_fullscreen(&mut self, fullscreen: bool) {
            self.fullscreen = fullscreen;
        }
        fn resolution(&self) -> (u32, u32) {
            self.resolution
        }
        fn set_resolution(&mut self, width: u32, height: u32) {
            self.resolution = (width, height);
        }
        fn confirm(&mut self) {
            self.screen_changed = true;
        }
        fn cancel(&mut self) {}
        fn take_screen_changed(&mut self) -> bool {
            std::mem::take(&mut self.screen_changed)
        }
    }

    struct Still;

    impl Behavior for Still {
        fn decide(
            &mut self,
            _ctx: &StepContext<'_>,
            _prev: &ObjectState,
            _curr: &ObjectState,
            _next: &mut ObjectState,
        ) {
        }
    }

    /// Writes the downcast hint into the pose, or "no-hint".
    struct HintEcho;

    impl Behavior for HintEcho {
        fn decide(
            &mut self,
            ctx: &StepContext<'_>,
            _prev: &ObjectState,
            _curr: &ObjectState,
            next: &mut ObjectState,
        ) {
            next.pose = match ctx.hint.and_then(|hint| hint.downcast_ref::<i32>()) {
                Some(value) => format!("hint-{value}"),
                None => "no-hint".to_string(),
            };
        }
    }

    struct DieNow;

    impl Behavior for DieNow {
        fn decide(
            &mut self,
            _ctx: &StepContext<'_>,
            _prev: &ObjectState,
            _curr: &ObjectState,
            next: &mut ObjectState,
        ) {
            next.dead = true;
        }
    }

    /// Records what it observed after each step and replays scripted
    /// commands.
    struct ScriptedDirector {
        observed_counts: Rc<RefCell<Vec<usize>>>,
        quit_on_request: bool,
    }

    impl Director for ScriptedDirector {
        fn hint_for(&self, object: &Object) -> Option<Box<dyn Any>> {
            (object.label() == "hinted").then(|| Box::new(7i32) as Box<dyn Any>)
        }

        fn orchestrate(
            &mut self,
            _dt_seconds: f32,
            input: &InputSnapshot,
            stage: &mut Stage,
            _options: &mut dyn DisplayOptions,
        ) -> LevelCommand {
            self.observed_counts.borrow_mut().push(stage.object_count());
            if self.quit_on_request && input.quit_requested() {
                return LevelCommand::Clear;
            }
            LevelCommand::Continue
        }

        fn viewport(&self, stage: &Stage) -> Rect {
            let (width, height) = stage.size();
            Rect::new(0.0, 0.0, width, height)
        }
    }

    fn test_stage() -> Stage {
        Stage::new((100.0, 100.0), vec!["main".to_string()], "main").expect("stage")
    }

    fn object(label: &'static str, behavior: Box<dyn Behavior>) -> Object {
        Object::new(label, Vec2::new(0.0, 0.0), (5.0, 5.0), (5.0, 5.0), "idle", behavior)
    }

    #[test]
    fn hints_reach_only_the_objects_the_director_selects() {
        let mut stage = test_stage();
        stage.add_spawn(object("hinted", Box::new(HintEcho)), None).expect("spawn");
        stage.add_spawn(object("plain", Box::new(HintEcho)), None).expect("spawn");
        stage.spawn();

        let mut level = Level::new(
            Box::new(ScriptedDirector {
                observed_counts: Rc::default(),
                quit_on_request: false,
            }),
            stage,
        );
        let mut options = TestOptions::default();
        level.step(1.0 / 60.0, &InputSnapshot::empty(), &mut options);

        let poses: Vec<String> = level
            .stage()
            .iter()
            .map(|object| object.present().pose.clone())
            .collect();
        assert_eq!(poses, ["hint-7", "no-hint"]);
    }

    #[test]
    fn director_observes_the_stage_after_harvest_and_spawn() {
        let mut stage = test_stage();
        stage.add_spawn(object("doomed", Box::new(DieNow)), None).expect("spawn");
        stage.add_spawn(object("rock", Box::new(Still)), None).expect("spawn");
        stage.spawn();

        let observed = Rc::new(RefCell::new(Vec::new()));
        let mut level = Level::new(
            Box::new(ScriptedDirector {
                observed_counts: Rc::clone(&observed),
                quit_on_request: false,
            }),
            stage,
        );
        let mut options = TestOptions::default();

        level.step(1.0 / 60.0, &InputSnapshot::empty(), &mut options);
        // "doomed" dies on its first committed step; the director must see
        // the count with the corpse already gone.
        assert_eq!(observed.borrow().as_slice(), &[1]);
    }

    #[test]
    fn quit_request_surfaces_as_a_clear_command() {
        let mut level = Level::new(
            Box::new(ScriptedDirector {
                observed_counts: Rc::default(),
                quit_on_request: true,
            }),
            test_stage(),
        );
        let mut options = TestOptions::default();

        let quiet = level.step(1.0 / 60.0, &InputSnapshot::empty(), &mut options);
        assert!(matches!(quiet, LevelCommand::Continue));

        let input = InputSnapshot::empty().with_quit_requested(true);
        let command = level.step(1.0 / 60.0, &input, &mut options);
        assert!(matches!(command, LevelCommand::Clear));
    }

    #[test]
    fn input_actions_are_visible_to_the_step() {
        // Behaviors read held actions through the snapshot; make sure the
        // level threads it through unchanged.
        struct ActionEcho;

        impl Behavior for ActionEcho {
            fn decide(
                &mut self,
                ctx: &StepContext<'_>,
                _prev: &ObjectState,
                _curr: &ObjectState,
                next: &mut ObjectState,
            ) {
                if ctx.input.is_down(InputAction::MoveRight) {
                    next.pose = "running".to_string();
                }
            }
        }

        let mut stage = test_stage();
        stage.add_spawn(object("runner", Box::new(ActionEcho)), None).expect("spawn");
        stage.spawn();

        let mut level = Level::new(
            Box::new(ScriptedDirector {
                observed_counts: Rc::default(),
                quit_on_request: false,
            }),
            stage,
        );
        let mut options = TestOptions::default();
        let input = InputSnapshot::empty().with_action_down(InputAction::MoveRight, true);
        level.step(1.0 / 60.0, &input, &mut options);

        let runner = level.stage().iter().next().expect("runner");
        assert_eq!(runner.present().pose, "running");
    }
}
