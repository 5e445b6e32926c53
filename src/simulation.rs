use log::{debug, trace};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::{
    aabb::Aabb,
    barnes_hut::BarnesHutTree,
    body::{Body, BodyId},
    gravity::Parameters,
    snapshot::{BodyState, Snapshot, SnapshotPublisher, SnapshotReader},
    Execution,
};

/// Live set of bodies and the tree built from their positions.
///
/// The simulated region is fixed at construction. Bodies leaving it are
/// removed for good.
#[derive(Debug)]
pub struct Simulation {
    boundary: Aabb,
    parameters: Parameters,
    bodies: Vec<Body>,
    tree: BarnesHutTree,
    next_id: u32,
    steps: u64,
    execution: Execution,
    publisher: SnapshotPublisher,
}

impl Simulation {
    #[must_use]
    pub fn new(boundary: Aabb, parameters: Parameters) -> Self {
        Self {
            boundary,
            parameters,
            bodies: Vec::new(),
            tree: BarnesHutTree::new(boundary),
            next_id: 0,
            steps: 0,
            execution: Execution::SingleThreaded,
            publisher: SnapshotPublisher::default(),
        }
    }

    /// Simulate the region of a `width` x `height` display with default parameters.
    #[must_use]
    pub fn from_visual_area(width: f32, height: f32) -> Self {
        Self::new(Aabb::from_visual_area(width, height), Parameters::default())
    }

    /// Use Rayon to calculate the forces with multiple threads.
    ///
    /// All threads calculate the forces from the shared tree, splitting the bodies.
    #[cfg(feature = "rayon")]
    #[must_use]
    pub fn rayon_iter(mut self) -> Self {
        self.execution = Execution::RayonIter;
        self
    }

    /// Add a body to the live set and assign it a fresh id.
    ///
    /// The body takes part in the next step. Readers only see it once a
    /// snapshot is published, see [`publish`](Self::publish).
    ///
    /// # Panics
    /// If the body lies outside the simulated region.
    pub fn add_body(&mut self, body: Body) -> BodyId {
        assert!(
            self.boundary.contains_point(&body.position()),
            "body at {:?} lies outside the simulated region {:?}",
            body.position(),
            self.boundary
        );

        let id = BodyId(self.next_id);
        self.next_id += 1;

        let body = body.with_id(id);
        self.tree.insert(&body);
        self.bodies.push(body);

        id
    }

    /// Replace the live set and publish a snapshot of it.
    ///
    /// # Panics
    /// If any body lies outside the simulated region.
    pub fn set_bodies(&mut self, bodies: impl IntoIterator<Item = Body>) -> Vec<BodyId> {
        self.bodies.clear();
        self.tree = BarnesHutTree::new(self.boundary);

        let ids = bodies.into_iter().map(|body| self.add_body(body)).collect::<Vec<_>>();
        debug!("seeded simulation with {} bodies", ids.len());

        self.publish();
        ids
    }

    /// Advance every body by `dt`.
    ///
    /// All forces are computed from the positions of the previous step
    /// before any body moves. Bodies outside the region afterwards are removed,
    /// then the tree is rebuilt and a new snapshot is published.
    pub fn step(&mut self, dt: f32) {
        let tree = &self.tree;
        let parameters = &self.parameters;

        match self.execution {
            Execution::SingleThreaded => {
                self.bodies
                    .iter_mut()
                    .for_each(|body| tree.compute_force(body, parameters));
            }
            #[cfg(feature = "rayon")]
            Execution::RayonIter => {
                self.bodies
                    .par_iter_mut()
                    .for_each(|body| tree.compute_force(body, parameters));
            }
        }

        for body in &mut self.bodies {
            body.integrate(dt);
        }

        let boundary = self.boundary;
        self.bodies.retain(|body| {
            let inside = boundary.contains_point(&body.position());
            if !inside {
                debug!("body {} left the simulated region at {:?}", body.id(), body.position());
            }
            inside
        });

        self.tree = BarnesHutTree::from_bodies(self.boundary, &self.bodies);
        self.steps += 1;
        trace!("step {} with dt = {dt}: {} bodies", self.steps, self.bodies.len());

        self.publish();
    }

    /// Publish the current state of all bodies to the readers.
    pub fn publish(&self) {
        self.publisher.publish(Snapshot::new(
            self.steps,
            self.bodies.iter().map(BodyState::from).collect(),
        ));
    }

    /// A handle for reading snapshots from other threads.
    #[must_use]
    pub fn reader(&self) -> SnapshotReader {
        self.publisher.reader()
    }

    #[must_use]
    pub fn bodies(&self) -> &[Body] {
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
    pub fn tree(&self) -> &BarnesHutTree {
        &self.tree
    }

    #[must_use]
    pub fn boundary(&self) -> &Aabb {
        &self.boundary
    }

    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Number of completed steps.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }
}
