use std::fmt;

use nalgebra::Vector2;

/// Stable handle of a body inside one simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyId(pub u32);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A point mass with an accumulating force buffer.
///
/// Bodies are owned by the stepping thread. Other threads read them through
/// [`Snapshot`](crate::snapshot::Snapshot)s published after every step.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    id: BodyId,
    position: Vector2<f32>,
    velocity: Vector2<f32>,
    force: Vector2<f32>,
    mass: f32,
}

impl Body {
    /// Create a body with an empty force buffer.
    ///
    /// # Panics
    /// If `mass` is not a finite positive number.
    #[must_use]
    pub fn new(position: Vector2<f32>, velocity: Vector2<f32>, mass: f32) -> Self {
        assert!(
            mass.is_finite() && mass > 0.,
            "body mass has to be positive, got {mass}"
        );

        Self {
            id: BodyId::default(),
            position,
            velocity,
            force: Vector2::zeros(),
            mass,
        }
    }

    /// Label the body with `id`.
    ///
    /// [`Simulation`](crate::simulation::Simulation) assigns its own ids when
    /// bodies are added. When using a tree directly, ids only tell bodies apart
    /// in [`query_range`](crate::barnes_hut::BarnesHutTree::query_range).
    #[must_use]
    pub fn with_id(mut self, id: BodyId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn id(&self) -> BodyId {
        self.id
    }

    #[must_use]
    pub fn position(&self) -> Vector2<f32> {
        self.position
    }

    #[must_use]
    pub fn velocity(&self) -> Vector2<f32> {
        self.velocity
    }

    /// Force accumulated since the last integration.
    #[must_use]
    pub fn force(&self) -> Vector2<f32> {
        self.force
    }

    #[must_use]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn add_force(&mut self, force: Vector2<f32>) {
        self.force += force;
    }

    /// Advance the body by `dt` using the accumulated force, then clear it.
    ///
    /// The position is moved with the velocity from before this step's
    /// acceleration is applied.
    pub fn integrate(&mut self, dt: f32) {
        let acceleration = self.force / self.mass;
        self.position += self.velocity * dt;
        self.velocity += acceleration * dt;
        self.force = Vector2::zeros();
    }
}
