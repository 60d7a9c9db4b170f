//! Game objects and their triple-buffered state.
//!
//! Every object carries three slices of the same fixed-schema state:
//! `previous`, `current` and `next`. During a simulation step a behavior
//! reads `previous` and `current` and writes only `next`; `commit` then
//! rotates the slices, keeping one full step of lookback without
//! reallocating.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::backend::InputSnapshot;
use crate::geometry::{Rect, Vec2};
use crate::stage::StageSnapshot;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identity of an [`Object`]. Ids are never reused, so an
/// object that died and one spawned later are always distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    fn allocate() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// One time-slice of an object's state.
///
/// `bounding_box` is the physics extent, `render_box` the visual extent;
/// `pose` selects the sprite. `neighbors` lists the objects whose bounding
/// boxes overlapped this one's during the step that wrote the slice; the
/// engine fills it in before the behavior runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectState {
    pub dead: bool,
    pub pose: String,
    pub bounding_box: Rect,
    pub render_box: Rect,
    pub velocity: Vec2,
    pub neighbors: Vec<ObjectId>,
}

impl ObjectState {
    fn initial(pose: &str, bounding_box: Rect, render_box: Rect) -> Self {
        Self {
            dead: false,
            pose: pose.to_string(),
            bounding_box,
            render_box,
            velocity: Vec2::default(),
            neighbors: Vec::new(),
        }
    }
}

/// Everything a behavior may read while deciding one step. The stage
/// snapshot is immutable for the whole step, so every object observes the
/// same consistent view regardless of decide order.
pub struct StepContext<'a> {
    pub dt_seconds: f32,
    pub input: &'a InputSnapshot,
    pub stage: &'a StageSnapshot,
    /// Opaque per-object data handed down by the director.
    pub hint: Option<&'a dyn Any>,
}

/// The decision logic driving an object. Behaviors may keep private state of
/// their own; the shared, observable state lives in the slices.
pub trait Behavior {
    /// Called once at construction on each of the three slices.
    fn prepare(&mut self, _state: &mut ObjectState) {}

    /// Decide the coming step. `next` starts out as a copy of `curr` with a
    /// fresh neighbor list; write only the fields that change.
    fn decide(
        &mut self,
        ctx: &StepContext<'_>,
        prev: &ObjectState,
        curr: &ObjectState,
        next: &mut ObjectState,
    );
}

/// Identity wrapping a behavior and the state triple.
pub struct Object {
    id: ObjectId,
    label: &'static str,
    solid: bool,
    behavior: Box<dyn Behavior>,
    prev: ObjectState,
    curr: ObjectState,
    next: ObjectState,
}

impl Object {
    /// Creates an object at `position` with the given physics and render
    /// extents, both anchored at `position`.
    pub fn new(
        label: &'static str,
        position: Vec2,
        bounding_size: (f32, f32),
        render_size: (f32, f32),
        pose: &str,
        mut behavior: Box<dyn Behavior>,
    ) -> Self {
        let bounding_box = Rect::new(position.x, position.y, bounding_size.0, bounding_size.1);
        let render_box = Rect::new(position.x, position.y, render_size.0, render_size.1);

        let mut prev = ObjectState::initial(pose, bounding_box, render_box);
        let mut curr = prev.clone();
        let mut next = prev.clone();
        behavior.prepare(&mut prev);
        behavior.prepare(&mut curr);
        behavior.prepare(&mut next);

        let id = ObjectId::allocate();
        debug!(id = id.raw(), label, "object_created");

        Self {
            id,
            label,
            solid: false,
            behavior,
            prev,
            curr,
            next,
        }
    }

    /// Marks the object as an obstacle for collision-handling behaviors.
    pub fn with_solid(mut self, solid: bool) -> Self {
        self.solid = solid;
        self
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn is_solid(&self) -> bool {
        self.solid
    }

    /// Read-only view of the current slice.
    pub fn present(&self) -> &ObjectState {
        &self.curr
    }

    /// Read-only view of the previous slice.
    pub fn past(&self) -> &ObjectState {
        &self.prev
    }

    /// Runs the behavior for one step. `next` is reset to the current slice
    /// first (the rotated-in buffer holds two-step-old contents) and the
    /// step's neighbor set is recorded before the behavior sees it.
    pub fn decide(&mut self, ctx: &StepContext<'_>) {
        self.next.clone_from(&self.curr);
        self.next.neighbors = ctx.stage.neighbors_of(self.id).to_vec();
        self.behavior
            .decide(ctx, &self.prev, &self.curr, &mut self.next);
    }

    /// Rotates the slices: `previous ← current`, `current ← next`, with the
    /// old `previous` storage becoming the next write buffer. Only valid
    /// after every object's `decide` for the step has run.
    pub fn commit(&mut self) {
        std::mem::swap(&mut self.prev, &mut self.curr);
        std::mem::swap(&mut self.curr, &mut self.next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writes a running counter into the pose each step.
    struct CountingPose {
        step: u32,
    }

    impl Behavior for CountingPose {
        fn decide(
            &mut self,
            _ctx: &StepContext<'_>,
            _prev: &ObjectState,
            _curr: &ObjectState,
            next: &mut ObjectState,
        ) {
            next.pose = format!("step-{}", self.step);
            self.step += 1;
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

    fn counting_object() -> Object {
        Object::new(
            "counter",
            Vec2::new(0.0, 0.0),
            (10.0, 10.0),
            (10.0, 10.0),
            "step-initial",
            Box::new(CountingPose { step: 0 }),
        )
    }

    fn step(object: &mut Object) {
        let input = InputSnapshot::empty();
        let stage = StageSnapshot::default();
        let ctx = StepContext {
            dt_seconds: 1.0 / 60.0,
            input: &input,
            stage: &stage,
            hint: None,
        };
        object.decide(&ctx);
        object.commit();
    }

    #[test]
    fn commit_rotation_keeps_one_step_of_lookback() {
        let mut object = counting_object();

        step(&mut object);
        assert_eq!(object.present().pose, "step-0");
        assert_eq!(object.past().pose, "step-initial");

        step(&mut object);
        assert_eq!(object.present().pose, "step-1");
        assert_eq!(object.past().pose, "step-0");

        step(&mut object);
        assert_eq!(object.present().pose, "step-2");
        assert_eq!(object.past().pose, "step-1");
    }

    #[test]
    fn decide_leaves_current_and_previous_untouched() {
        let mut object = counting_object();
        step(&mut object);

        let current_before = object.present().clone();
        let previous_before = object.past().clone();

        let input = InputSnapshot::empty();
        let stage = StageSnapshot::default();
        let ctx = StepContext {
            dt_seconds: 1.0 / 60.0,
            input: &input,
            stage: &stage,
            hint: None,
        };
        object.decide(&ctx);

        assert_eq!(object.present(), &current_before);
        assert_eq!(object.past(), &previous_before);
    }

    #[test]
    fn next_slice_starts_as_copy_of_current() {
        // A behavior writing nothing must not surface two-step-old state.
        let mut object = Object::new(
            "still",
            Vec2::new(3.0, 4.0),
            (5.0, 5.0),
            (5.0, 5.0),
            "idle",
            Box::new(Still),
        );

        step(&mut object);
        let first = object.present().clone();
        step(&mut object);
        step(&mut object);

        assert_eq!(object.present(), &first);
        assert_eq!(object.past(), &first);
    }

    #[test]
    fn object_ids_are_unique() {
        let a = counting_object();
        let b = counting_object();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn solid_flag_defaults_off() {
        let object = counting_object();
        assert!(!object.is_solid());
        let solid = counting_object().with_solid(true);
        assert!(solid.is_solid());
    }
}
