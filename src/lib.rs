pub mod aabb;
pub mod barnes_hut;
pub mod body;
#[cfg(feature = "randomization")]
pub mod creator;
pub mod direct_summation;
pub mod gravity;
pub mod quadtree;
pub mod scheduler;
pub mod simulation;
pub mod snapshot;

pub use aabb::Aabb;
pub use barnes_hut::BarnesHutTree;
pub use body::{Body, BodyId};
pub use gravity::Parameters;
pub use quadtree::Quadtree;
pub use scheduler::Scheduler;
pub use simulation::Simulation;
pub use snapshot::{BodyState, Snapshot, SnapshotReader};

/// How the forces of a step are calculated.
#[derive(Clone, Copy, Debug, Default)]
pub enum Execution {
    #[default]
    SingleThreaded,
    #[cfg(feature = "rayon")]
    RayonIter,
}
