use std::sync::{Arc, PoisonError, RwLock};

use nalgebra::Vector2;

use crate::body::{Body, BodyId};

/// Position and mass of one live body at the time of a snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyState {
    pub id: BodyId,
    pub position: Vector2<f32>,
    pub mass: f32,
}

impl From<&Body> for BodyState {
    fn from(body: &Body) -> Self {
        Self {
            id: body.id(),
            position: body.position(),
            mass: body.mass(),
        }
    }
}

/// Immutable view of all live bodies after a completed step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    step: u64,
    bodies: Vec<BodyState>,
}

impl Snapshot {
    /// `bodies` has to be sorted by id.
    pub(crate) fn new(step: u64, bodies: Vec<BodyState>) -> Self {
        debug_assert!(bodies.windows(2).all(|w| w[0].id < w[1].id));
        Self { step, bodies }
    }

    /// Number of steps completed when the snapshot was taken.
    #[must_use]
    pub fn step(&self) -> u64 {
        self.step
    }

    #[must_use]
    pub fn bodies(&self) -> &[BodyState] {
        &self.bodies
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: BodyId) -> Option<&BodyState> {
        self.bodies
            .binary_search_by_key(&id, |state| state.id)
            .ok()
            .map(|i| &self.bodies[i])
    }

    #[must_use]
    pub fn position(&self, id: BodyId) -> Option<Vector2<f32>> {
        self.get(id).map(|state| state.position)
    }

    /// Whether the body was still part of the simulation.
    ///
    /// Evicted bodies are inactive and should no longer be drawn.
    #[must_use]
    pub fn is_active(&self, id: BodyId) -> bool {
        self.get(id).is_some()
    }
}

type Shared = Arc<RwLock<Arc<Snapshot>>>;

/// Read side of the published snapshots. Cheap to clone and share between threads.
#[derive(Clone, Debug)]
pub struct SnapshotReader {
    shared: Shared,
}

impl SnapshotReader {
    /// The most recently published snapshot.
    ///
    /// Holding on to it does not block the stepping thread.
    #[must_use]
    pub fn latest(&self) -> Arc<Snapshot> {
        // a panic cannot leave the swapped `Arc` half written
        Arc::clone(&self.shared.read().unwrap_or_else(PoisonError::into_inner))
    }
}

#[derive(Debug, Default)]
pub(crate) struct SnapshotPublisher {
    shared: Shared,
}

impl SnapshotPublisher {
    pub(crate) fn publish(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        *self.shared.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    pub(crate) fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            shared: Arc::clone(&self.shared),
        }
    }
}
