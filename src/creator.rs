//! Random initial conditions for simulations.

use nalgebra::Vector2;
use rand::Rng;
use rand_distr::{Distribution, Uniform, UnitDisc};

use crate::{body::Body, gravity::G};

pub trait BodyCreator {
    fn create_body(&mut self) -> Body;

    fn create_bodies(&mut self, n: usize) -> Vec<Body> {
        (0..n).map(|_| self.create_body()).collect()
    }
}

/// Bodies spread uniformly over a disk filling the height of a visual area.
#[derive(Clone, Debug)]
pub struct DiskBodyCreator<R: Rng> {
    rng: R,
    center: Vector2<f32>,
    radius: f32,
    velocity_distr: Uniform<f32>,
    mass_distr: Uniform<f32>,
}

impl<R: Rng> DiskBodyCreator<R> {
    /// Disk of radius `height / 2` around the center of a `width` x `height` area.
    ///
    /// Velocity components are drawn from `[-10, 10)`, masses from `[10, 100)`.
    pub fn new(rng: R, width: f32, height: f32) -> Self {
        Self {
            rng,
            center: Vector2::new(width, height) / 2.,
            radius: height / 2.,
            velocity_distr: Uniform::new(-10., 10.),
            mass_distr: Uniform::new(10., 100.),
        }
    }

    #[must_use]
    pub fn with_velocity_range(mut self, low: f32, high: f32) -> Self {
        self.velocity_distr = Uniform::new(low, high);
        self
    }

    #[must_use]
    pub fn with_mass_range(mut self, low: f32, high: f32) -> Self {
        self.mass_distr = Uniform::new(low, high);
        self
    }
}

impl<R: Rng> BodyCreator for DiskBodyCreator<R> {
    fn create_body(&mut self) -> Body {
        let rng = &mut self.rng;

        let [x, y]: [f32; 2] = UnitDisc.sample(rng);
        let position = self.center + Vector2::new(x, y) * self.radius;
        let velocity = Vector2::new(
            self.velocity_distr.sample(rng),
            self.velocity_distr.sample(rng),
        );

        Body::new(position, velocity, self.mass_distr.sample(rng))
    }
}

/// A heavy body at rest followed by light bodies on circular orbits around it.
#[derive(Clone, Debug)]
pub struct CentralBodyCreator<R, MD, RD>
where
    R: Rng,
    MD: Distribution<f32>,
    RD: Distribution<f32>,
{
    rng: R,
    center: Vector2<f32>,
    central_mass: f32,
    mass_distr: MD,
    radial_distr: RD,
    first_body: bool,
}

impl<R, MD, RD> CentralBodyCreator<R, MD, RD>
where
    R: Rng,
    MD: Distribution<f32>,
    RD: Distribution<f32>,
{
    pub fn new(
        rng: R,
        center: Vector2<f32>,
        central_mass: f32,
        mass_distr: MD,
        radial_distr: RD,
    ) -> Self {
        Self {
            rng,
            center,
            central_mass,
            mass_distr,
            radial_distr,
            first_body: true,
        }
    }
}

impl<R, MD, RD> BodyCreator for CentralBodyCreator<R, MD, RD>
where
    R: Rng,
    MD: Distribution<f32>,
    RD: Distribution<f32>,
{
    fn create_body(&mut self) -> Body {
        if self.first_body {
            self.first_body = false;

            return Body::new(self.center, Vector2::zeros(), self.central_mass);
        }

        let rng = &mut self.rng;

        let r = self.radial_distr.sample(rng);
        let phi = rng.gen_range(0.0..std::f32::consts::TAU);
        let position = self.center + Vector2::new(phi.cos(), phi.sin()) * r;

        let mut velocity = Vector2::new(-phi.sin(), phi.cos());
        velocity *= (G * self.central_mass / r).sqrt();

        Body::new(position, velocity, self.mass_distr.sample(rng))
    }
}
