use nalgebra::Vector2;

/// Gravitational constant in simulation units.
pub const G: f32 = 1.0;

/// Barnes-Hut opening angle.
///
/// A node of width `s` at distance `d` from the target is approximated
/// as a single point mass when `s / d < THETA`.
pub const THETA: f32 = 1.0;

/// Softening added under the square root of the normalising distance.
pub const SOFTENING: f32 = 0.5;

/// Margin added around a visual area when deriving the simulated region.
pub const AREA_PADDING: f32 = 10.0;

/// Constants of one simulation instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Parameters {
    pub g: f32,
    pub theta: f32,
    pub softening: f32,
}

impl Parameters {
    #[must_use]
    pub fn new(g: f32, theta: f32, softening: f32) -> Self {
        Self {
            g,
            theta,
            softening,
        }
    }

    #[must_use]
    pub fn with_g(mut self, g: f32) -> Self {
        self.g = g;
        self
    }

    #[must_use]
    pub fn with_theta(mut self, theta: f32) -> Self {
        self.theta = theta;
        self
    }

    #[must_use]
    pub fn with_softening(mut self, softening: f32) -> Self {
        self.softening = softening;
        self
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self::new(G, THETA, SOFTENING)
    }
}

/// Force exerted by a single source body on a target body.
///
/// The softening only enters the distance used to normalise `r`,
/// the inverse-square magnitude uses the plain squared distance.
/// Returns `None` for coincident positions.
pub fn direct_force(
    target_position: Vector2<f32>,
    target_mass: f32,
    source_position: Vector2<f32>,
    source_mass: f32,
    parameters: &Parameters,
) -> Option<Vector2<f32>> {
    let r = source_position - target_position;
    let distance_sq = r.norm_squared();
    if distance_sq == 0. {
        return None;
    }

    let distance = (distance_sq + parameters.softening).sqrt();
    let magnitude = parameters.g * target_mass * source_mass / distance_sq;
    Some(r * (magnitude / distance))
}

/// Force exerted by an aggregate mass located at `center_of_mass`.
///
/// `distance` is the plain distance between the target and the center of
/// mass, already computed by the caller for the opening-angle test.
pub fn approximate_force(
    target_position: Vector2<f32>,
    target_mass: f32,
    center_of_mass: Vector2<f32>,
    total_mass: f32,
    distance: f32,
    parameters: &Parameters,
) -> Vector2<f32> {
    let r = center_of_mass - target_position;
    let magnitude = parameters.g * target_mass * total_mass / (distance * distance);
    r * (magnitude / distance)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_direct_force_attracts() {
        let parameters = Parameters::default().with_softening(0.);
        let f = direct_force(
            Vector2::new(1., 0.),
            1.,
            Vector2::new(-1., 0.),
            1.,
            &parameters,
        )
        .unwrap();

        assert!(f.x < 0.);
        assert_abs_diff_eq!(f.x, -0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(f.y, 0.);
    }

    #[test]
    fn test_coincident_points() {
        let f = direct_force(
            Vector2::new(3., 3.),
            1.,
            Vector2::new(3., 3.),
            5.,
            &Parameters::default(),
        );

        assert!(f.is_none());
    }

    #[test]
    fn test_softening_only_in_normalisation() {
        let parameters = Parameters::default().with_softening(0.5);
        let f = direct_force(
            Vector2::zeros(),
            2.,
            Vector2::new(0., 2.),
            3.,
            &parameters,
        )
        .unwrap();

        // magnitude 1 * 2 * 3 / 4, direction scaled by 2 / sqrt(4.5)
        let expected = 1.5 * 2. / 4.5f32.sqrt();
        assert_abs_diff_eq!(f.y, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_approximate_matches_unsoftened_direct() {
        let parameters = Parameters::default().with_softening(0.);
        let target = Vector2::new(0., 0.);
        let source = Vector2::new(3., 4.);

        let direct = direct_force(target, 2., source, 7., &parameters).unwrap();
        let approx = approximate_force(target, 2., source, 7., 5., &parameters);

        assert_abs_diff_eq!(direct, approx, epsilon = 1e-6);
    }
}
