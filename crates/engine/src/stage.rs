//! The layered object container and the per-step snapshot it hands to
//! behaviors.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::{debug, info};

use crate::geometry::Rect;
use crate::object::{Object, ObjectId, ObjectState};

static NEXT_STAGE_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identity of a [`Stage`], used by drawing strategies to
/// detect that they are rendering a different stage than before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageId(u64);

impl StageId {
    fn allocate() -> Self {
        Self(NEXT_STAGE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("unknown layer name: {layer}")]
    UnknownLayer { layer: String },
}

/// What a death observer learns about a removed object. The render boxes are
/// kept so redraw invalidation can clear the vacated footprint.
#[derive(Debug, Clone)]
pub struct DeathNotice {
    pub id: ObjectId,
    pub render_box: Rect,
    pub past_render_box: Rect,
}

/// Collaborator told about every object removed by [`Stage::harvest_dead`],
/// exactly once per removal.
pub trait DeathObserver {
    fn object_died(&mut self, notice: &DeathNotice);
}

/// Ordered-by-layer collection of live objects with a pending-spawn queue
/// per layer.
///
/// Iteration yields layer order, then insertion order within a layer; that
/// order is authoritative for both logic and rendering.
pub struct Stage {
    id: StageId,
    size: (f32, f32),
    layer_names: Vec<String>,
    default_layer: usize,
    layers: Vec<Vec<Object>>,
    spawns: Vec<Vec<Object>>,
    observers: Vec<Box<dyn DeathObserver>>,
}

impl Stage {
    pub fn new(
        size: (f32, f32),
        layer_names: Vec<String>,
        default_layer: &str,
    ) -> Result<Self, StageError> {
        let default_index = layer_names
            .iter()
            .position(|name| name == default_layer)
            .ok_or_else(|| StageError::UnknownLayer {
                layer: default_layer.to_string(),
            })?;

        let layer_count = layer_names.len();
        info!(
            width = size.0,
            height = size.1,
            layers = ?layer_names,
            default_layer,
            "stage_created"
        );

        Ok(Self {
            id: StageId::allocate(),
            size,
            layer_names,
            default_layer: default_index,
            layers: (0..layer_count).map(|_| Vec::new()).collect(),
            spawns: (0..layer_count).map(|_| Vec::new()).collect(),
            observers: Vec::new(),
        })
    }

    pub fn id(&self) -> StageId {
        self.id
    }

    pub fn size(&self) -> (f32, f32) {
        self.size
    }

    /// Live objects in authoritative order.
    pub fn iter(&self) -> impl Iterator<Item = &Object> {
        self.layers.iter().flat_map(|layer| layer.iter())
    }

    pub(crate) fn objects_mut(&mut self) -> impl Iterator<Item = &mut Object> {
        self.layers.iter_mut().flat_map(|layer| layer.iter_mut())
    }

    pub fn object_count(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    /// Queues `object` for the next [`Stage::spawn`]. Fails fast when the
    /// layer name is not configured.
    pub fn add_spawn(&mut self, object: Object, layer: Option<&str>) -> Result<ObjectId, StageError> {
        let index = match layer {
            None => self.default_layer,
            Some(name) => self
                .layer_names
                .iter()
                .position(|candidate| candidate == name)
                .ok_or_else(|| StageError::UnknownLayer {
                    layer: name.to_string(),
                })?,
        };

        let id = object.id();
        debug!(
            id = id.raw(),
            label = object.label(),
            layer = self.layer_names[index].as_str(),
            "spawn_queued"
        );
        self.spawns[index].push(object);
        Ok(id)
    }

    /// Moves every layer's pending queue into the live sequence, preserving
    /// queue order. Call once per step, after [`Stage::harvest_dead`].
    pub fn spawn(&mut self) {
        for (layer, queue) in self.layers.iter_mut().zip(self.spawns.iter_mut()) {
            layer.append(queue);
        }
    }

    /// Removes every object whose current slice is dead and notifies each
    /// registered observer once per corpse. Survivor order is preserved.
    pub fn harvest_dead(&mut self) {
        let mut harvested = 0usize;
        for layer in &mut self.layers {
            // Remove by descending index so earlier removals cannot shift
            // the indices still to be visited.
            let mut index = layer.len();
            while index > 0 {
                index -= 1;
                if !layer[index].present().dead {
                    continue;
                }
                let corpse = layer.remove(index);
                let notice = DeathNotice {
                    id: corpse.id(),
                    render_box: corpse.present().render_box,
                    past_render_box: corpse.past().render_box,
                };
                debug!(id = notice.id.raw(), label = corpse.label(), "object_harvested");
                for observer in &mut self.observers {
                    observer.object_died(&notice);
                }
                harvested += 1;
            }
        }
        if harvested > 0 {
            debug!(harvested, "dead_harvested");
        }
    }

    pub fn add_death_observer(&mut self, observer: Box<dyn DeathObserver>) {
        self.observers.push(observer);
    }

    /// Builds the immutable view of every live object's current slice that
    /// all behaviors read during one step, including freshly computed
    /// bounding-box neighbor lists.
    pub fn snapshot(&self) -> StageSnapshot {
        let mut entries: Vec<SnapshotEntry> = self
            .iter()
            .map(|object| SnapshotEntry {
                id: object.id(),
                label: object.label(),
                solid: object.is_solid(),
                state: object.present().clone(),
                neighbors: Vec::new(),
            })
            .collect();

        for first in 0..entries.len() {
            for second in (first + 1)..entries.len() {
                let overlapping = entries[first]
                    .state
                    .bounding_box
                    .overlaps(&entries[second].state.bounding_box);
                if overlapping {
                    let second_id = entries[second].id;
                    let first_id = entries[first].id;
                    entries[first].neighbors.push(second_id);
                    entries[second].neighbors.push(first_id);
                }
            }
        }

        StageSnapshot { entries }
    }
}

/// One object as seen by everyone else during a step.
#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    id: ObjectId,
    label: &'static str,
    solid: bool,
    state: ObjectState,
    neighbors: Vec<ObjectId>,
}

impl SnapshotEntry {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn solid(&self) -> bool {
        self.solid
    }

    pub fn state(&self) -> &ObjectState {
        &self.state
    }

    /// Objects whose bounding boxes overlap this one's, as of the snapshot.
    pub fn neighbors(&self) -> &[ObjectId] {
        &self.neighbors
    }
}

/// The immutable-for-the-step view of a [`Stage`].
#[derive(Debug, Clone, Default)]
pub struct StageSnapshot {
    entries: Vec<SnapshotEntry>,
}

impl StageSnapshot {
    pub fn iter(&self) -> impl Iterator<Item = &SnapshotEntry> {
        self.entries.iter()
    }

    pub fn find(&self, id: ObjectId) -> Option<&SnapshotEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn neighbors_of(&self, id: ObjectId) -> &[ObjectId] {
        self.find(id).map(SnapshotEntry::neighbors).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
