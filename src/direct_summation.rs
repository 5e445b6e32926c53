//! Exact O(N²) force summation, used as a reference for the tree.

use nalgebra::Vector2;

use crate::{
    body::Body,
    gravity::{direct_force, Parameters},
};

/// Add the pairwise force of every other body to each body in `bodies`.
///
/// Uses the same pairwise formula as the leaves of
/// [`BarnesHutTree`](crate::barnes_hut::BarnesHutTree),
/// so with `theta = 0` both agree up to summation order.
pub fn accumulate_forces(bodies: &mut [Body], parameters: &Parameters) {
    let sources: Vec<(Vector2<f32>, f32)> = bodies
        .iter()
        .map(|body| (body.position(), body.mass()))
        .collect();

    for (i, body) in bodies.iter_mut().enumerate() {
        for (j, &(position, mass)) in sources.iter().enumerate() {
            if i == j {
                continue;
            }
            if let Some(force) =
                direct_force(body.position(), body.mass(), position, mass, parameters)
            {
                body.add_force(force);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_net_force_vanishes() {
        let mut bodies = vec![
            Body::new(Vector2::new(1., 2.), Vector2::zeros(), 3.),
            Body::new(Vector2::new(-4., 0.5), Vector2::zeros(), 1.),
            Body::new(Vector2::new(0., -3.), Vector2::zeros(), 7.),
        ];

        accumulate_forces(&mut bodies, &Parameters::default());

        let net: Vector2<f32> = bodies.iter().map(Body::force).sum();
        assert_abs_diff_eq!(net, Vector2::zeros(), epsilon = 1e-5);
    }

    #[test]
    fn test_coincident_bodies_ignore_each_other() {
        let mut bodies = vec![
            Body::new(Vector2::new(1., 1.), Vector2::zeros(), 3.),
            Body::new(Vector2::new(1., 1.), Vector2::zeros(), 5.),
        ];

        accumulate_forces(&mut bodies, &Parameters::default());

        assert_eq!(bodies[0].force(), Vector2::zeros());
        assert_eq!(bodies[1].force(), Vector2::zeros());
    }
}
