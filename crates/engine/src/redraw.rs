//! Drawing strategies: how much of the stage gets repainted each frame.
//!
//! [`Everyone`] is the brute-force baseline. [`DirtyTracking`] repaints only
//! objects whose appearance changed, plus every object whose footprint
//! overlaps a repainted region, found by fixpoint propagation. Both report
//! what they touched so the backend can bound its present cost.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, info};

use crate::backend::{Backend, BackendError};
use crate::geometry::{Rect, RectSet, Vec2};
use crate::object::ObjectId;
use crate::stage::{DeathNotice, DeathObserver, Stage, StageId};

/// What a render pass did: how many objects were repainted and the
/// viewport-clipped world regions affected.
#[derive(Debug, Clone, Default)]
pub struct RedrawReport {
    pub drawn: usize,
    pub touched: RectSet,
}

/// Decides which objects to repaint each frame and drives the backend.
pub trait DrawingStrategy {
    /// Request that the next render repaints everything, footprint checks
    /// notwithstanding. Used after the screen surface changed.
    fn force_all(&mut self);

    fn render(
        &mut self,
        stage: &mut Stage,
        backend: &mut dyn Backend,
        viewport: Rect,
    ) -> Result<RedrawReport, BackendError>;
}

/// Repaints every visible object every frame. Simple, correct, and the
/// reference other strategies are judged against.
#[derive(Debug, Default)]
pub struct Everyone;

impl DrawingStrategy for Everyone {
    fn force_all(&mut self) {}

    fn render(
        &mut self,
        stage: &mut Stage,
        backend: &mut dyn Backend,
        viewport: Rect,
    ) -> Result<RedrawReport, BackendError> {
        let mut drawn = 0usize;
        for object in stage.iter() {
            let state = object.present();
            if !state.render_box.overlaps(&viewport) {
                continue;
            }
            let anchor = Vec2::new(state.render_box.x, state.render_box.y);
            backend.draw(anchor, &state.pose, &viewport)?;
            drawn += 1;
        }

        let touched = RectSet::from(vec![viewport]);
        backend.present(&touched)?;
        Ok(RedrawReport { drawn, touched })
    }
}

/// Cloneable handle collecting [`DeathNotice`]s from a stage so a strategy
/// can invalidate the footprints of objects that no longer exist.
#[derive(Debug, Clone, Default)]
pub struct DeathLedger {
    notices: Rc<RefCell<Vec<DeathNotice>>>,
}

impl DeathLedger {
    fn drain(&self) -> Vec<DeathNotice> {
        self.notices.borrow_mut().drain(..).collect()
    }
}

impl DeathObserver for DeathLedger {
    fn object_died(&mut self, notice: &DeathNotice) {
        self.notices.borrow_mut().push(notice.clone());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    /// Invisible on both frames; cannot affect the screen.
    Skip,
    /// Unchanged itself, but may sit in a repainted region.
    Maybe,
    Dirty,
}

/// One participant in the propagation pass. Dead objects join as phantoms:
/// never drawn, but their vacated footprints seed repaints.
#[derive(Debug)]
struct Probe {
    id: ObjectId,
    live: bool,
    pose: String,
    curr: Rect,
    past: Rect,
    verdict: Verdict,
}

/// Incremental strategy: repaint an object only when its own appearance
/// changed or a repaint happens underneath or on top of it.
///
/// The second condition is transitive, so dirtiness is propagated to a
/// fixpoint over current-frame and previous-frame footprints before any
/// drawing happens.
#[derive(Debug, Default)]
pub struct DirtyTracking {
    ledger: DeathLedger,
    attached_stage: Option<StageId>,
    drawn: HashSet<ObjectId>,
    force_all: bool,
}

impl DirtyTracking {
    pub fn new() -> Self {
        Self::default()
    }

    fn attach(&mut self, stage: &mut Stage) {
        if self.attached_stage == Some(stage.id()) {
            return;
        }
        stage.add_death_observer(Box::new(self.ledger.clone()));
        // Notices queued by a previous stage are meaningless here.
        self.ledger.drain();
        self.drawn.clear();
        self.force_all = true;
        self.attached_stage = Some(stage.id());
        info!(stage = stage.id().raw(), "dirty_tracking_attached");
    }

    fn local_verdict(
        &self,
        probe_live: bool,
        id: ObjectId,
        curr: &Rect,
        past: &Rect,
        pose_changed: bool,
        viewport: &Rect,
    ) -> Verdict {
        let curr_visible = curr.overlaps(viewport);
        let past_visible = past.overlaps(viewport);
        if !curr_visible && !past_visible {
            return Verdict::Skip;
        }
        if !probe_live {
            // A visible corpse always leaves a hole to repaint.
            return Verdict::Dirty;
        }
        if self.force_all
            || !self.drawn.contains(&id)
            || curr_visible != past_visible
            || pose_changed
            || curr != past
        {
            return Verdict::Dirty;
        }
        Verdict::Maybe
    }
}

impl DrawingStrategy for DirtyTracking {
    fn force_all(&mut self) {
        self.force_all = true;
    }

    fn render(
        &mut self,
        stage: &mut Stage,
        backend: &mut dyn Backend,
        viewport: Rect,
    ) -> Result<RedrawReport, BackendError> {
        self.attach(stage);

        let deaths = self.ledger.drain();

        // Probes are built in stage order so the draw pass below preserves
        // layer ordering.
        let mut probes: Vec<Probe> = stage
            .iter()
            .map(|object| {
                let curr = object.present();
                let past = object.past();
                let verdict = self.local_verdict(
                    true,
                    object.id(),
                    &curr.render_box,
                    &past.render_box,
                    curr.pose != past.pose,
                    &viewport,
                );
                Probe {
                    id: object.id(),
                    live: true,
                    pose: curr.pose.clone(),
                    curr: curr.render_box,
                    past: past.render_box,
                    verdict,
                }
            })
            .collect();

        for notice in &deaths {
            let verdict = self.local_verdict(
                false,
                notice.id,
                &notice.render_box,
                &notice.past_render_box,
                false,
                &viewport,
            );
            probes.push(Probe {
                id: notice.id,
                live: false,
                pose: String::new(),
                curr: notice.render_box,
                past: notice.past_render_box,
                verdict,
            });
        }

        propagate_to_fixpoint(&mut probes);

        let mut drawn = 0usize;
        let mut touched = RectSet::new();
        for probe in &probes {
            if probe.verdict != Verdict::Dirty {
                continue;
            }
            if probe.live {
                let anchor = Vec2::new(probe.curr.x, probe.curr.y);
                backend.draw(anchor, &probe.pose, &viewport)?;
                drawn += 1;
                self.drawn.insert(probe.id);
            }
            if let Some(clip) = probe.curr.intersect(&viewport) {
                touched.push(clip);
            }
            if probe.past != probe.curr {
                if let Some(clip) = probe.past.intersect(&viewport) {
                    touched.push(clip);
                }
            }
        }

        for notice in &deaths {
            self.drawn.remove(&notice.id);
        }
        self.force_all = false;

        backend.present(&touched)?;
        debug!(drawn, touched = touched.len(), "incremental_render");
        Ok(RedrawReport { drawn, touched })
    }
}

/// Upgrades `Maybe` probes overlapping any `Dirty` probe to `Dirty`, in
/// either the current or the previous frame, until nothing changes. Each
/// round confirms at least one probe, so this terminates.
fn propagate_to_fixpoint(probes: &mut [Probe]) {
    loop {
        let mut changed = false;
        for index in 0..probes.len() {
            if probes[index].verdict != Verdict::Maybe {
                continue;
            }
            let infected = probes.iter().enumerate().any(|(other, probe)| {
                other != index
                    && probe.verdict == Verdict::Dirty
                    && (probes[index].curr.overlaps(&probe.curr)
                        || probes[index].past.overlaps(&probe.past))
            });
            if infected {
                probes[index].verdict = Verdict::Dirty;
                changed = true;
            }
        }
        if !changed {
            return;
        }
    }
}
