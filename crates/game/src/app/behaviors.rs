//! Object behaviors for the demo game.
//!
//! Behaviors read the snapshot and the previous/current slices and write
//! only the next slice; the engine rotates the buffers after every object
//! has decided.

use engine::{Behavior, InputAction, ObjectState, StepContext, Vec2};

const ARRIVAL_EPSILON: f32 = 0.5;

/// Static scenery: present, drawn, and entirely passive.
pub struct DoNothing;

impl Behavior for DoNothing {
    fn decide(
        &mut self,
        _ctx: &StepContext<'_>,
        _prev: &ObjectState,
        _curr: &ObjectState,
        _next: &mut ObjectState,
    ) {
    }
}

/// Dies as soon as an object with the collector's label touches it.
pub struct GetCollected {
    pub collector_label: &'static str,
}

impl Behavior for GetCollected {
    fn decide(
        &mut self,
        ctx: &StepContext<'_>,
        _prev: &ObjectState,
        _curr: &ObjectState,
        next: &mut ObjectState,
    ) {
        let touched = next.neighbors.iter().any(|id| {
            ctx.stage
                .find(*id)
                .is_some_and(|entry| entry.label() == self.collector_label)
        });
        if touched {
            next.dead = true;
        }
    }
}

/// Walks a closed loop of waypoints at constant speed, optionally expiring
/// after a fixed number of steps.
pub struct MoveOverPath {
    speed: f32,
    points: Vec<Vec2>,
    heading_to: usize,
    steps_left: Option<u32>,
}

impl MoveOverPath {
    pub fn new(speed: f32, points: Vec<Vec2>, steps_left: Option<u32>) -> Self {
        Self {
            speed,
            points,
            heading_to: 0,
            steps_left,
        }
    }
}

impl Behavior for MoveOverPath {
    fn decide(
        &mut self,
        ctx: &StepContext<'_>,
        _prev: &ObjectState,
        curr: &ObjectState,
        next: &mut ObjectState,
    ) {
        if let Some(steps) = self.steps_left.as_mut() {
            if *steps == 0 {
                next.dead = true;
                return;
            }
            *steps -= 1;
        }
        if self.points.is_empty() {
            return;
        }

        let target = self.points[self.heading_to];
        let max_step = self.speed * ctx.dt_seconds;
        let dx = (target.x - curr.bounding_box.x).clamp(-max_step, max_step);
        let dy = (target.y - curr.bounding_box.y).clamp(-max_step, max_step);
        next.bounding_box.move_by(dx, dy);
        next.render_box.move_by(dx, dy);
        next.velocity = Vec2::new(dx / ctx.dt_seconds, dy / ctx.dt_seconds);

        let arrived = (target.x - next.bounding_box.x).abs() <= ARRIVAL_EPSILON
            && (target.y - next.bounding_box.y).abs() <= ARRIVAL_EPSILON;
        if arrived {
            self.heading_to = (self.heading_to + 1) % self.points.len();
        }
    }
}

/// Run-and-jump platformer movement with gravity and collision against
/// solid objects. Assumes its owner is itself not solid.
pub struct JumpAndRun {
    gravity: f32,
    run_accel: f32,
    air_accel: f32,
    max_run_speed: f32,
    ground_friction: f32,
    air_drag: f32,
    jump_speed: f32,
    on_ground: bool,
}

impl Default for JumpAndRun {
    fn default() -> Self {
        Self {
            gravity: 600.0,
            run_accel: 900.0,
            air_accel: 350.0,
            max_run_speed: 160.0,
            ground_friction: 0.80,
            air_drag: 0.98,
            jump_speed: 260.0,
            on_ground: false,
        }
    }
}

impl JumpAndRun {
    fn steering(&self, ctx: &StepContext<'_>) -> f32 {
        let mut direction = 0.0;
        if ctx.input.is_down(InputAction::MoveRight) {
            direction += 1.0;
        }
        if ctx.input.is_down(InputAction::MoveLeft) {
            direction -= 1.0;
        }
        direction
    }
}

impl Behavior for JumpAndRun {
    fn decide(
        &mut self,
        ctx: &StepContext<'_>,
        _prev: &ObjectState,
        curr: &ObjectState,
        next: &mut ObjectState,
    ) {
        let dt = ctx.dt_seconds;
        let mut velocity = curr.velocity;

        let accel = if self.on_ground {
            self.run_accel
        } else {
            self.air_accel
        };
        velocity.x += self.steering(ctx) * accel * dt;
        velocity.x = velocity.x.clamp(-self.max_run_speed, self.max_run_speed);
        velocity.x *= if self.on_ground {
            self.ground_friction
        } else {
            self.air_drag
        };

        if ctx.input.jump_pressed() && self.on_ground {
            velocity.y = self.jump_speed;
            self.on_ground = false;
        }
        velocity.y -= self.gravity * dt;

        let mut moved = curr.bounding_box;
        moved.move_by(velocity.x * dt, velocity.y * dt);

        // Resolve against every solid body, axis by axis, judging each hit
        // by where we came from this step.
        self.on_ground = false;
        for entry in ctx.stage.iter() {
            if !entry.solid() {
                continue;
            }
            let wall = entry.state().bounding_box;
            if !moved.overlaps(&wall) {
                continue;
            }

            let came_from_above = curr.bounding_box.y >= wall.top();
            let came_from_below = curr.bounding_box.top() <= wall.y;
            if velocity.y < 0.0 && came_from_above {
                moved.move_to(moved.x, wall.top());
                velocity.y = 0.0;
                self.on_ground = true;
            } else if velocity.y > 0.0 && came_from_below {
                moved.move_to(moved.x, wall.y - moved.h);
                velocity.y = 0.0;
            } else if velocity.x > 0.0 && curr.bounding_box.right() <= wall.x {
                moved.move_to(wall.x - moved.w, moved.y);
                velocity.x = 0.0;
            } else if velocity.x < 0.0 && curr.bounding_box.x >= wall.right() {
                moved.move_to(wall.right(), moved.y);
                velocity.x = 0.0;
            }
        }

        // Standing on a surface counts as grounded even while motionless.
        if !self.on_ground {
            let mut feeler = moved;
            feeler.move_by(0.0, -ARRIVAL_EPSILON);
            self.on_ground = ctx.stage.iter().any(|entry| {
                entry.solid() && feeler.overlaps(&entry.state().bounding_box)
            });
        }

        let dx = moved.x - curr.bounding_box.x;
        let dy = moved.y - curr.bounding_box.y;
        next.bounding_box = moved;
        next.render_box.move_by(dx, dy);
        next.velocity = velocity;
        next.pose = match (self.on_ground, velocity.x) {
            (false, _) => "player_air",
            (true, vx) if vx.abs() > 1.0 => "player_run",
            _ => "player_idle",
        }
        .to_string();
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use engine::{
        Director, DisplayOptions, InputSnapshot, Level, LevelCommand, Object, Rect, Stage,
    };

    use super::*;

    #[derive(Debug, Default)]
    struct TestOptions;

    impl DisplayOptions for TestOptions {
        fn fullscreen(&self) -> bool {
            false
        }
        fn set_fullscreen(&mut self, _fullscreen: bool) {}
        fn resolution(&self) -> (u32, u32) {
            (800, 600)
        }
        fn set_resolution(&mut self, _width: u32, _height: u32) {}
        fn confirm(&mut self) {}
        fn cancel(&mut self) {}
        fn take_screen_changed(&mut self) -> bool {
            false
        }
    }

    struct PassiveDirector;

    impl Director for PassiveDirector {
        fn hint_for(&self, _object: &Object) -> Option<Box<dyn Any>> {
            None
        }

        fn orchestrate(
            &mut self,
            _dt_seconds: f32,
            _input: &InputSnapshot,
            _stage: &mut Stage,
            _options: &mut dyn DisplayOptions,
        ) -> LevelCommand {
            LevelCommand::Continue
        }

        fn viewport(&self, stage: &Stage) -> Rect {
            let (width, height) = stage.size();
            Rect::new(0.0, 0.0, width, height)
        }
    }

    const DT: f32 = 1.0 / 60.0;

    fn level_with(objects: Vec<Object>) -> Level {
        let mut stage =
            Stage::new((800.0, 600.0), vec!["main".to_string()], "main").expect("stage");
        for object in objects {
            stage.add_spawn(object, None).expect("spawn");
        }
        stage.spawn();
        Level::new(Box::new(PassiveDirector), stage)
    }

    fn step(level: &mut Level, input: &InputSnapshot) {
        let mut options = TestOptions;
        level.step(DT, input, &mut options);
    }

    fn steps(level: &mut Level, input: &InputSnapshot, count: u32) {
        for _ in 0..count {
            step(level, input);
        }
    }

    fn find_state(level: &Level, label: &str) -> Option<ObjectState> {
        level
            .stage()
            .iter()
            .find(|object| object.label() == label)
            .map(|object| object.present().clone())
    }

    fn floor() -> Object {
        Object::new(
            "floor",
            Vec2::new(0.0, 0.0),
            (800.0, 30.0),
            (800.0, 30.0),
            "bar",
            Box::new(DoNothing),
        )
        .with_solid(true)
    }

    fn player_at(x: f32, y: f32) -> Object {
        Object::new(
            "player",
            Vec2::new(x, y),
            (40.0, 50.0),
            (40.0, 50.0),
            "player_idle",
            Box::new(JumpAndRun::default()),
        )
    }

    #[test]
    fn star_dies_only_when_the_player_touches_it() {
        let star = Object::new(
            "star",
            Vec2::new(100.0, 100.0),
            (60.0, 60.0),
            (60.0, 60.0),
            "star",
            Box::new(GetCollected {
                collector_label: "player",
            }),
        );
        let bystander = Object::new(
            "bystander",
            Vec2::new(130.0, 130.0),
            (10.0, 10.0),
            (10.0, 10.0),
            "bar",
            Box::new(DoNothing),
        );
        let mut level = level_with(vec![star, bystander]);

        steps(&mut level, &InputSnapshot::empty(), 3);
        assert!(find_state(&level, "star").is_some());

        let player = player_at(110.0, 110.0);
        level
            .stage_mut()
            .add_spawn(player, None)
            .expect("spawn player");
        level.stage_mut().spawn();

        steps(&mut level, &InputSnapshot::empty(), 3);
        assert!(find_state(&level, "star").is_none());
    }

    #[test]
    fn patroller_advances_toward_its_waypoint() {
        let patroller = Object::new(
            "patroller",
            Vec2::new(0.0, 0.0),
            (10.0, 10.0),
            (10.0, 10.0),
            "walker",
            Box::new(MoveOverPath::new(
                60.0,
                vec![Vec2::new(100.0, 0.0), Vec2::new(0.0, 0.0)],
                None,
            )),
        );
        let mut level = level_with(vec![patroller]);

        steps(&mut level, &InputSnapshot::empty(), 60);
        let state = find_state(&level, "patroller").expect("patroller");
        // One second at 60 px/s, heading straight for x=100.
        assert!((state.bounding_box.x - 60.0).abs() < 1.0);
        assert_eq!(state.bounding_box.y, 0.0);
    }

    #[test]
    fn patroller_wraps_around_its_path() {
        let patroller = Object::new(
            "patroller",
            Vec2::new(0.0, 0.0),
            (10.0, 10.0),
            (10.0, 10.0),
            "walker",
            Box::new(MoveOverPath::new(
                600.0,
                vec![Vec2::new(50.0, 0.0), Vec2::new(0.0, 0.0)],
                None,
            )),
        );
        let mut level = level_with(vec![patroller]);

        // Fast enough to bounce between both waypoints several times.
        steps(&mut level, &InputSnapshot::empty(), 40);
        let state = find_state(&level, "patroller").expect("patroller");
        assert!(state.bounding_box.x >= -1.0 && state.bounding_box.x <= 51.0);
    }

    #[test]
    fn patroller_with_countdown_expires() {
        let patroller = Object::new(
            "patroller",
            Vec2::new(0.0, 0.0),
            (10.0, 10.0),
            (10.0, 10.0),
            "walker",
            Box::new(MoveOverPath::new(10.0, vec![Vec2::new(100.0, 0.0)], Some(5))),
        );
        let mut level = level_with(vec![patroller]);

        steps(&mut level, &InputSnapshot::empty(), 5);
        assert!(find_state(&level, "patroller").is_some());

        steps(&mut level, &InputSnapshot::empty(), 2);
        assert!(find_state(&level, "patroller").is_none());
    }

    #[test]
    fn falling_player_lands_on_the_floor() {
        let mut level = level_with(vec![floor(), player_at(100.0, 200.0)]);

        steps(&mut level, &InputSnapshot::empty(), 180);
        let state = find_state(&level, "player").expect("player");
        assert!((state.bounding_box.y - 30.0).abs() < 0.001);
        assert_eq!(state.velocity.y, 0.0);
    }

    #[test]
    fn grounded_player_jumps_and_comes_back_down() {
        let mut level = level_with(vec![floor(), player_at(100.0, 31.0)]);
        steps(&mut level, &InputSnapshot::empty(), 60);

        let jump = InputSnapshot::empty().with_jump_pressed(true);
        step(&mut level, &jump);
        steps(&mut level, &InputSnapshot::empty(), 5);
        let airborne = find_state(&level, "player").expect("player");
        assert!(airborne.bounding_box.y > 30.0);

        steps(&mut level, &InputSnapshot::empty(), 300);
        let landed = find_state(&level, "player").expect("player");
        assert!((landed.bounding_box.y - 30.0).abs() < 0.001);
    }

    #[test]
    fn jump_in_midair_is_ignored() {
        let mut level = level_with(vec![floor(), player_at(100.0, 300.0)]);

        let jump = InputSnapshot::empty().with_jump_pressed(true);
        step(&mut level, &jump);
        let state = find_state(&level, "player").expect("player");
        assert!(state.velocity.y <= 0.0);
    }

    #[test]
    fn running_player_stops_at_a_wall() {
        let wall = Object::new(
            "wall",
            Vec2::new(300.0, 30.0),
            (40.0, 200.0),
            (40.0, 200.0),
            "bar",
            Box::new(DoNothing),
        )
        .with_solid(true);
        let mut level = level_with(vec![floor(), wall, player_at(100.0, 31.0)]);

        let run = InputSnapshot::empty().with_action_down(InputAction::MoveRight, true);
        steps(&mut level, &run, 600);

        let state = find_state(&level, "player").expect("player");
        assert!((state.bounding_box.right() - 300.0).abs() < 0.001);
        assert_eq!(state.velocity.x, 0.0);
    }

    #[test]
    fn pose_reflects_motion() {
        let mut level = level_with(vec![floor(), player_at(100.0, 31.0)]);
        steps(&mut level, &InputSnapshot::empty(), 120);
        let idle = find_state(&level, "player").expect("player");
        assert_eq!(idle.pose, "player_idle");

        let run = InputSnapshot::empty().with_action_down(InputAction::MoveRight, true);
        steps(&mut level, &run, 10);
        let running = find_state(&level, "player").expect("player");
        assert_eq!(running.pose, "player_run");
    }
}
