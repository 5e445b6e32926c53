use log::warn;
use nalgebra::Vector2;

use crate::aabb::{Aabb, NORTH_EAST, NORTH_WEST, SOUTH_EAST, SOUTH_WEST};

/// Deepest level a node may be subdivided to.
///
/// Coincident points can never be separated, so an insertion that would
/// need to subdivide below this level is rejected or merged instead.
pub const MAX_DEPTH: usize = 32;

/// Summary of all items stored beneath a node.
///
/// [`absorb`](Aggregate::absorb) is called on every node along the
/// insertion path, so it has to be incremental:
/// absorbing items one after another must give the same summary as
/// absorbing them in any other order.
pub trait Aggregate<T>: Default {
    fn absorb(&mut self, point: &Vector2<f32>, payload: &T);
}

impl<T> Aggregate<T> for () {
    fn absorb(&mut self, _point: &Vector2<f32>, _payload: &T) {}
}

type Subnodes<T, A> = [Node<T, A>; 4];

type Merge<'m, T> = &'m dyn Fn(&mut T, &T);

/// How [`Quadtree::insert_or_merge`] placed a payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Inserted {
    /// In a leaf of its own.
    Stored,
    /// Folded into the payload of a coincident point.
    Merged,
}

/// Where a payload ended up, handed back up the insertion path for the aggregates.
enum Placed<'a, T> {
    Stored(&'a T),
    Merged(T),
}

impl<T> Placed<'_, T> {
    fn payload(&self) -> &T {
        match self {
            Placed::Stored(payload) => payload,
            Placed::Merged(payload) => payload,
        }
    }
}

/// A point quadtree holding at most one item per leaf.
#[derive(Clone, Debug)]
pub struct Quadtree<T, A = ()> {
    root: Node<T, A>,
    len: usize,
}

impl<T, A: Aggregate<T>> Quadtree<T, A> {
    #[must_use]
    pub fn new(boundary: Aabb) -> Self {
        Self {
            root: Node::new(boundary),
            len: 0,
        }
    }

    #[must_use]
    pub fn boundary(&self) -> &Aabb {
        &self.root.boundary
    }

    #[must_use]
    pub fn root(&self) -> &Node<T, A> {
        &self.root
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert `payload` at `point`.
    ///
    /// Returns `false` if the point lies outside the tree's boundary, or if it
    /// coincides with a stored point so closely that [`MAX_DEPTH`] is reached.
    /// In both cases the payload is dropped.
    pub fn insert(&mut self, point: Vector2<f32>, payload: T) -> bool {
        if !self.root.boundary.contains_point(&point) {
            return false;
        }

        match self.root.insert(point, payload, 0, None) {
            Ok(_) => {
                self.len += 1;
                true
            }
            Err(_) => {
                warn!("dropped point {point:?}: quadtree depth limit of {MAX_DEPTH} reached");
                false
            }
        }
    }

    /// Insert `payload` at `point`, folding it into the stored payload with
    /// `merge` if the two points cannot be separated within [`MAX_DEPTH`].
    ///
    /// A merged payload still reaches the aggregates of every node on its path,
    /// but is not counted by [`len`](Self::len).
    /// Returns `None` if the point lies outside the tree's boundary.
    pub fn insert_or_merge(
        &mut self,
        point: Vector2<f32>,
        payload: T,
        merge: impl Fn(&mut T, &T),
    ) -> Option<Inserted> {
        if !self.root.boundary.contains_point(&point) {
            return None;
        }

        let merge: Merge<'_, T> = &merge;
        match self.root.insert(point, payload, 0, Some(merge)) {
            Ok(Placed::Stored(_)) => {
                self.len += 1;
                Some(Inserted::Stored)
            }
            Ok(Placed::Merged(_)) => Some(Inserted::Merged),
            // only fails at the depth limit, where merging takes over
            Err(_) => unreachable!(),
        }
    }

    /// Remove the item stored exactly at `point`.
    pub fn remove(&mut self, point: &Vector2<f32>) -> Option<T> {
        let removed = self.root.remove(point)?;
        self.len -= 1;
        Some(removed)
    }

    /// All payloads whose point lies within `range`.
    #[must_use]
    pub fn query_range(&self, range: &Aabb) -> Vec<&T> {
        let mut found = Vec::new();
        self.root.query_range(range, &mut found);
        found
    }
}

#[derive(Clone, Debug)]
pub struct Node<T, A> {
    boundary: Aabb,
    item: Option<(Vector2<f32>, T)>,
    subnodes: Option<Box<Subnodes<T, A>>>,
    aggregate: A,
}

impl<T, A> Node<T, A> {
    #[must_use]
    pub fn boundary(&self) -> &Aabb {
        &self.boundary
    }

    #[must_use]
    pub fn aggregate(&self) -> &A {
        &self.aggregate
    }

    /// The item of a leaf, `None` for empty leaves and internal nodes.
    #[must_use]
    pub fn item(&self) -> Option<(&Vector2<f32>, &T)> {
        self.item.as_ref().map(|(point, payload)| (point, payload))
    }

    /// Children in NW, NE, SW, SE order.
    #[must_use]
    pub fn children(&self) -> Option<&Subnodes<T, A>> {
        self.subnodes.as_deref()
    }

    #[must_use]
    pub fn is_divided(&self) -> bool {
        self.subnodes.is_some()
    }

    fn for_each_item(&self, f: &mut impl FnMut(&Vector2<f32>, &T)) {
        if let Some((point, payload)) = &self.item {
            f(point, payload);
        }
        if let Some(subnodes) = &self.subnodes {
            for node in subnodes.iter() {
                node.for_each_item(f);
            }
        }
    }

    fn into_items(self, items: &mut Vec<(Vector2<f32>, T)>) {
        if let Some(item) = self.item {
            items.push(item);
        }
        if let Some(subnodes) = self.subnodes {
            for node in *subnodes {
                node.into_items(items);
            }
        }
    }

    fn query_range<'a>(&'a self, range: &Aabb, found: &mut Vec<&'a T>) {
        if !self.boundary.intersects(range) {
            return;
        }

        if let Some((point, payload)) = &self.item {
            if range.contains_point(point) {
                found.push(payload);
            }
        }

        if let Some(subnodes) = &self.subnodes {
            for node in subnodes.iter() {
                node.query_range(range, found);
            }
        }
    }
}

impl<T, A: Aggregate<T>> Node<T, A> {
    fn new(boundary: Aabb) -> Self {
        Self {
            boundary,
            item: None,
            subnodes: None,
            aggregate: A::default(),
        }
    }

    /// Insert below this node, updating the aggregates on the way back up.
    ///
    /// The caller guarantees that `point` lies within the boundary.
    fn insert(
        &mut self,
        point: Vector2<f32>,
        payload: T,
        depth: usize,
        merge: Option<Merge<'_, T>>,
    ) -> Result<Placed<'_, T>, T> {
        if self.subnodes.is_none() {
            match self.item.take() {
                // Self is an empty leaf
                None => {
                    self.aggregate.absorb(&point, &payload);
                    let (_, payload) = self.item.insert((point, payload));
                    return Ok(Placed::Stored(&*payload));
                }

                // Self holds an item that cannot be separated any further
                Some(mut previous) if depth >= MAX_DEPTH => {
                    let Some(merge) = merge else {
                        self.item = Some(previous);
                        return Err(payload);
                    };
                    merge(&mut previous.1, &payload);
                    self.item = Some(previous);
                    self.aggregate.absorb(&point, &payload);
                    return Ok(Placed::Merged(payload));
                }

                // Self holds an item, push it down one level
                Some(previous) => self.subdivide(previous),
            }
        }

        let index = self.boundary.choose_quadrant(&point);
        let Some(subnodes) = self.subnodes.as_mut() else {
            unreachable!("node was subdivided above");
        };
        let placed = subnodes[index].insert(point, payload, depth + 1, merge)?;
        self.aggregate.absorb(&point, placed.payload());

        Ok(placed)
    }

    fn subdivide(&mut self, previous: (Vector2<f32>, T)) {
        let boundary = self.boundary;
        let mut subnodes: Box<Subnodes<T, A>> = Box::new(
            [NORTH_WEST, NORTH_EAST, SOUTH_WEST, SOUTH_EAST].map(|i| Node::new(boundary.quadrant(i))),
        );

        // the aggregate of self already contains the previous item
        let (point, payload) = previous;
        let node = &mut subnodes[boundary.choose_quadrant(&point)];
        node.aggregate.absorb(&point, &payload);
        node.item = Some((point, payload));

        self.subnodes = Some(subnodes);
    }

    fn remove(&mut self, point: &Vector2<f32>) -> Option<T> {
        match &mut self.subnodes {
            None => {
                if self.item.as_ref().is_some_and(|(p, _)| p == point) {
                    self.aggregate = A::default();
                    self.item.take().map(|(_, payload)| payload)
                } else {
                    None
                }
            }
            Some(subnodes) => {
                let removed = subnodes[self.boundary.choose_quadrant(point)].remove(point)?;
                self.collapse_and_reaggregate();
                Some(removed)
            }
        }
    }

    fn collapse_and_reaggregate(&mut self) {
        let mut count = 0;
        self.for_each_item(&mut |_, _| count += 1);

        if count <= 1 {
            if let Some(subnodes) = self.subnodes.take() {
                let mut items = Vec::with_capacity(1);
                for node in *subnodes {
                    node.into_items(&mut items);
                }
                self.item = items.pop();
            }
        }

        let mut aggregate = A::default();
        self.for_each_item(&mut |point, payload| aggregate.absorb(point, payload));
        self.aggregate = aggregate;
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Count(usize);

    impl<T> Aggregate<T> for Count {
        fn absorb(&mut self, _point: &Vector2<f32>, _payload: &T) {
            self.0 += 1;
        }
    }

    fn random_points(n: usize, half_dimension: f32) -> Vec<Vector2<f32>> {
        let mut rng = StdRng::seed_from_u64(0);
        (0..n)
            .map(|_| {
                Vector2::new(
                    rng.gen_range(-half_dimension..half_dimension),
                    rng.gen_range(-half_dimension..half_dimension),
                )
            })
            .collect()
    }

    /// Check the structural invariants and return the number of items below `node`.
    fn check_node<T, A>(node: &Node<T, A>) -> usize {
        match node.children() {
            None => {
                if let Some((point, _)) = node.item() {
                    assert!(node.boundary().contains_point(point));
                    1
                } else {
                    0
                }
            }
            Some(children) => {
                assert!(node.item().is_none(), "internal node holds an item");

                let parent = node.boundary();
                for (i, child) in children.iter().enumerate() {
                    assert_eq!(child.boundary(), &parent.quadrant(i));
                    assert_eq!(child.boundary().half_dimension, parent.half_dimension / 2.);
                }
                assert_eq!(children[NORTH_WEST].boundary().min_x(), parent.min_x());
                assert_eq!(children[NORTH_WEST].boundary().max_x(), children[NORTH_EAST].boundary().min_x());
                assert_eq!(children[NORTH_EAST].boundary().max_x(), parent.max_x());
                assert_eq!(children[SOUTH_WEST].boundary().min_y(), parent.min_y());
                assert_eq!(children[SOUTH_WEST].boundary().max_y(), children[NORTH_WEST].boundary().min_y());
                assert_eq!(children[NORTH_WEST].boundary().max_y(), parent.max_y());

                children.iter().map(check_node).sum()
            }
        }
    }

    fn check_counts<T>(node: &Node<T, Count>) -> usize {
        let count = match node.children() {
            None => usize::from(node.item().is_some()),
            Some(children) => children.iter().map(check_counts).sum(),
        };
        assert_eq!(node.aggregate().0, count);
        count
    }

    #[test]
    fn test_tree_invariants() {
        let mut tree: Quadtree<usize, Count> = Quadtree::new(Aabb::new(Vector2::zeros(), 64.));
        let points = random_points(500, 64.);

        for (i, point) in points.iter().enumerate() {
            assert!(tree.insert(*point, i));
        }

        assert_eq!(tree.len(), points.len());
        assert_eq!(check_node(tree.root()), points.len());
        assert_eq!(check_counts(tree.root()), points.len());
    }

    #[test]
    fn test_single_item_stays_in_root() {
        let mut tree: Quadtree<&str> = Quadtree::new(Aabb::new(Vector2::zeros(), 1.));
        assert!(tree.insert(Vector2::new(0.5, 0.5), "a"));

        assert!(!tree.root().is_divided());
        assert_eq!(tree.root().item(), Some((&Vector2::new(0.5, 0.5), &"a")));
    }

    #[test]
    fn test_subdivide_moves_previous_item() {
        let mut tree: Quadtree<&str> = Quadtree::new(Aabb::new(Vector2::zeros(), 1.));
        assert!(tree.insert(Vector2::new(0.5, 0.5), "ne"));
        assert!(tree.insert(Vector2::new(-0.5, -0.5), "sw"));

        let children = tree.root().children().unwrap();
        assert!(tree.root().item().is_none());
        assert_eq!(children[NORTH_EAST].item().map(|(_, p)| *p), Some("ne"));
        assert_eq!(children[SOUTH_WEST].item().map(|(_, p)| *p), Some("sw"));
        assert!(children[NORTH_WEST].item().is_none());
        assert!(children[SOUTH_EAST].item().is_none());
    }

    #[test]
    fn test_insert_outside() {
        let mut tree: Quadtree<u8> = Quadtree::new(Aabb::new(Vector2::zeros(), 1.));

        assert!(!tree.insert(Vector2::new(1.5, 0.), 0));
        assert!(tree.insert(Vector2::new(1., -1.), 1));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_coincident_points_rejected() {
        let mut tree: Quadtree<u8, Count> = Quadtree::new(Aabb::new(Vector2::zeros(), 1.));

        assert!(tree.insert(Vector2::new(0.3, 0.3), 0));
        assert!(!tree.insert(Vector2::new(0.3, 0.3), 1));
        assert!(tree.insert(Vector2::new(-0.3, 0.3), 2));

        assert_eq!(tree.len(), 2);
        assert_eq!(check_counts(tree.root()), 2);
        assert_eq!(tree.query_range(tree.boundary()).len(), 2);
    }

    #[test]
    fn test_coincident_points_merged() {
        let mut tree: Quadtree<u32, Count> = Quadtree::new(Aabb::new(Vector2::zeros(), 1.));
        let add = |existing: &mut u32, incoming: &u32| *existing += incoming;

        assert_eq!(tree.insert_or_merge(Vector2::new(0.3, 0.3), 5, add), Some(Inserted::Stored));
        assert_eq!(tree.insert_or_merge(Vector2::new(0.3, 0.3), 7, add), Some(Inserted::Merged));
        assert_eq!(tree.insert_or_merge(Vector2::new(-0.3, 0.3), 1, add), Some(Inserted::Stored));
        assert_eq!(tree.insert_or_merge(Vector2::new(2., 0.), 1, add), None);

        assert_eq!(tree.len(), 2);
        // every payload reached the aggregates, merged or not
        assert_eq!(tree.root().aggregate(), &Count(3));

        let mut found: Vec<u32> = tree.query_range(tree.boundary()).into_iter().copied().collect();
        found.sort_unstable();
        assert_eq!(found, vec![1, 12]);
    }

    #[test]
    fn test_query_range() {
        let mut tree: Quadtree<usize> = Quadtree::new(Aabb::new(Vector2::zeros(), 32.));
        let points = random_points(300, 32.);
        for (i, point) in points.iter().enumerate() {
            assert!(tree.insert(*point, i));
        }

        for range in [
            Aabb::new(Vector2::new(5., -3.), 4.),
            Aabb::new(Vector2::new(-30., 30.), 10.),
            Aabb::new(Vector2::zeros(), 100.),
            Aabb::new(Vector2::new(200., 0.), 1.),
        ] {
            let mut found: Vec<usize> = tree.query_range(&range).into_iter().copied().collect();
            found.sort_unstable();

            let expected: Vec<usize> = points
                .iter()
                .enumerate()
                .filter(|(_, p)| range.contains_point(p))
                .map(|(i, _)| i)
                .collect();

            assert_eq!(found, expected);
        }
    }

    #[test]
    fn test_remove() {
        let mut tree: Quadtree<usize, Count> = Quadtree::new(Aabb::new(Vector2::zeros(), 16.));
        let points = random_points(100, 16.);
        for (i, point) in points.iter().enumerate() {
            assert!(tree.insert(*point, i));
        }

        for (i, point) in points.iter().enumerate().step_by(2) {
            assert_eq!(tree.remove(point), Some(i));
        }
        assert_eq!(tree.remove(&points[0]), None);
        assert_eq!(tree.remove(&Vector2::new(100., 100.)), None);

        assert_eq!(tree.len(), 50);
        assert_eq!(check_node(tree.root()), 50);
        assert_eq!(check_counts(tree.root()), 50);

        let all = tree.query_range(tree.boundary());
        assert!(all.iter().all(|&&i| i % 2 == 1));
    }

    #[test]
    fn test_remove_collapses() {
        let mut tree: Quadtree<u8, Count> = Quadtree::new(Aabb::new(Vector2::zeros(), 1.));
        assert!(tree.insert(Vector2::new(0.5, 0.5), 0));
        assert!(tree.insert(Vector2::new(0.6, 0.6), 1));
        assert!(tree.root().is_divided());

        assert_eq!(tree.remove(&Vector2::new(0.5, 0.5)), Some(0));

        assert!(!tree.root().is_divided());
        assert_eq!(tree.root().item(), Some((&Vector2::new(0.6, 0.6), &1)));
        assert_eq!(tree.root().aggregate(), &Count(1));
    }
}
