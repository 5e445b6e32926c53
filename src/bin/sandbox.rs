use std::{thread, time::Duration};

use barnes_hut_2d::{
    creator::{BodyCreator, DiskBodyCreator},
    Body, Scheduler, Simulation,
};
use nalgebra::Vector2;
use rand::{rngs::StdRng, SeedableRng};

const WIDTH: f32 = 1010.;
const HEIGHT: f32 = 660.;
const NUM_BODIES: usize = 10_000;
const FRAMES: usize = 300;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let mut creator = DiskBodyCreator::new(StdRng::seed_from_u64(0), WIDTH, HEIGHT);
    let mut bodies = creator.create_bodies(NUM_BODIES);

    // a couple of heavy bodies
    let center = Vector2::new(WIDTH, HEIGHT) / 2.;
    bodies.push(Body::new(center + Vector2::new(100., 100.), Vector2::zeros(), 1e4));
    bodies.push(Body::new(center, Vector2::zeros(), 1e5));

    let simulation = Simulation::from_visual_area(WIDTH, HEIGHT);
    #[cfg(feature = "rayon")]
    let simulation = simulation.rayon_iter();
    let mut simulation = simulation;
    simulation.set_bodies(bodies);

    let mut scheduler = Scheduler::new(simulation);
    let reader = scheduler.reader();
    scheduler.start(0.01)?;

    for frame in 0..FRAMES {
        let snapshot = reader.latest();
        if frame % 60 == 0 {
            let total_mass: f32 = snapshot.bodies().iter().map(|body| body.mass).sum();
            println!(
                "step {}: {} bodies, total mass {total_mass:.0}",
                snapshot.step(),
                snapshot.len()
            );
        }
        thread::sleep(Duration::from_secs_f64(1. / 60.));
    }

    scheduler.stop();
    Ok(())
}
