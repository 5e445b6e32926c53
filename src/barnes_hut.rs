use log::{debug, warn};
use nalgebra::Vector2;

use crate::{
    aabb::Aabb,
    body::{Body, BodyId},
    gravity::{approximate_force, direct_force, Parameters},
    quadtree::{Aggregate, Inserted, Node, Quadtree},
};

/// What the tree stores per body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Source {
    pub id: BodyId,
    pub mass: f32,
}

/// Total mass and center of mass of a subtree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MassAggregate {
    pub total_mass: f32,
    pub center_of_mass: Vector2<f32>,
}

impl Default for MassAggregate {
    fn default() -> Self {
        Self {
            total_mass: 0.,
            center_of_mass: Vector2::zeros(),
        }
    }
}

impl Aggregate<Source> for MassAggregate {
    fn absorb(&mut self, point: &Vector2<f32>, source: &Source) {
        if self.total_mass == 0. {
            self.total_mass = source.mass;
            self.center_of_mass = *point;
        } else {
            let total_mass = self.total_mass + source.mass;
            self.center_of_mass =
                (self.center_of_mass * self.total_mass + *point * source.mass) / total_mass;
            self.total_mass = total_mass;
        }
    }
}

pub type BarnesHutNode = Node<Source, MassAggregate>;

/// Quadtree over bodies that tracks mass aggregates and approximates gravity.
#[derive(Clone, Debug)]
pub struct BarnesHutTree {
    tree: Quadtree<Source, MassAggregate>,
}

impl BarnesHutTree {
    #[must_use]
    pub fn new(boundary: Aabb) -> Self {
        Self {
            tree: Quadtree::new(boundary),
        }
    }

    /// Build a fresh tree holding every body inside `boundary`.
    #[must_use]
    pub fn from_bodies<'a>(boundary: Aabb, bodies: impl IntoIterator<Item = &'a Body>) -> Self {
        let mut tree = Self::new(boundary);
        for body in bodies {
            if !tree.insert(body) {
                warn!(
                    "body {} at {:?} lies outside the tree and exerts no force",
                    body.id(),
                    body.position()
                );
            }
        }
        tree
    }

    /// Insert a body at its current position.
    ///
    /// A body that cannot be separated from an already stored one adds its
    /// mass to that body's leaf. Returns `false` if the body lies outside the tree.
    pub fn insert(&mut self, body: &Body) -> bool {
        let source = Source {
            id: body.id(),
            mass: body.mass(),
        };
        let merge = |existing: &mut Source, incoming: &Source| existing.mass += incoming.mass;

        match self.tree.insert_or_merge(body.position(), source, merge) {
            Some(Inserted::Stored) => true,
            Some(Inserted::Merged) => {
                debug!(
                    "body {} at {:?} merged into a coincident body",
                    body.id(),
                    body.position()
                );
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn boundary(&self) -> &Aabb {
        self.tree.boundary()
    }

    #[must_use]
    pub fn root(&self) -> &BarnesHutNode {
        self.tree.root()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Ids of all bodies in `range`.
    #[must_use]
    pub fn query_range(&self, range: &Aabb) -> Vec<BodyId> {
        self.tree
            .query_range(range)
            .into_iter()
            .map(|source| source.id)
            .collect()
    }

    /// Add the approximate gravitational force of all bodies in the tree to `target`.
    ///
    /// The target never contributes to its own force: a leaf at the target's
    /// position is skipped, whatever ids the bodies carry.
    ///
    /// Unlike the plain Barnes-Hut criterion, which tests every internal node,
    /// nodes on the path the target was inserted along are always opened, since
    /// their aggregate includes the target's own mass. The remaining nodes are
    /// replaced by their aggregate once `width / distance < theta`.
    pub fn compute_force(&self, target: &mut Body, parameters: &Parameters) {
        let on_path = self.boundary().contains_point(&target.position());
        Self::accumulate_force(self.root(), target, on_path, parameters);
    }

    fn accumulate_force(
        node: &BarnesHutNode,
        target: &mut Body,
        on_path: bool,
        parameters: &Parameters,
    ) {
        let Some(children) = node.children() else {
            if let Some((position, source)) = node.item() {
                // the target's own leaf, or bodies merged into it
                if *position == target.position() {
                    return;
                }
                if let Some(force) = direct_force(
                    target.position(),
                    target.mass(),
                    *position,
                    source.mass,
                    parameters,
                ) {
                    target.add_force(force);
                }
            }
            return;
        };

        if !on_path {
            let aggregate = node.aggregate();
            let distance = (aggregate.center_of_mass - target.position()).norm();

            if node.boundary().width() / distance < parameters.theta {
                // node is far enough away
                if aggregate.total_mass > 0. {
                    target.add_force(approximate_force(
                        target.position(),
                        target.mass(),
                        aggregate.center_of_mass,
                        aggregate.total_mass,
                        distance,
                        parameters,
                    ));
                }
                return;
            }
        }

        // near field forces, go deeper into tree
        let path_child = on_path.then(|| node.boundary().choose_quadrant(&target.position()));
        for (i, child) in children.iter().enumerate() {
            Self::accumulate_force(child, target, path_child == Some(i), parameters);
        }
    }
}
