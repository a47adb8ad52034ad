//! Balanced kd-tree over photon positions.
//!
//! Built once from a snapshot of photons with the presorting method: three
//! index permutations, each ordered by a cyclic super-key (XYZ, YZX, ZXY),
//! are split at the median of the current axis and partitioned stably for
//! the children. Every level is linear, so the build is O(n log n) with no
//! per-level sorting.
//!
//! Nodes live in an arena and refer to their children by index. The tree is
//! read-only after construction and can be shared across threads.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use lux_math::Vec3;

use crate::photon::Photon;

/// Split axis of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Axis used one level further down.
    pub fn next(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::Z,
            Axis::Z => Axis::X,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KdNode {
    pub photon: Photon,
    pub axis: Axis,
    pub left: Option<u32>,
    pub right: Option<u32>,
}

impl KdNode {
    /// The node's coordinate along its split axis.
    #[inline]
    pub fn split(&self) -> f32 {
        self.photon.position[self.axis.index()]
    }
}

#[derive(Debug, Clone, Default)]
pub struct PhotonKdTree {
    nodes: Vec<KdNode>,
    root: Option<u32>,
    duplicates_removed: usize,
}

/// Compare two positions by the super-key starting at `axis`.
fn super_key_cmp(a: Vec3, b: Vec3, axis: usize) -> Ordering {
    for k in 0..3 {
        let i = (axis + k) % 3;
        match a[i].total_cmp(&b[i]) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    Ordering::Equal
}

fn nearly_equal(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() <= f32::EPSILON
}

/// Stable top-down merge sort of `indices`, using `scratch` as the buffer.
fn merge_sort<F>(indices: &mut [u32], scratch: &mut [u32], cmp: &F)
where
    F: Fn(u32, u32) -> Ordering,
{
    let n = indices.len();
    if n <= 1 {
        return;
    }
    let mid = n / 2;
    {
        let (left, right) = indices.split_at_mut(mid);
        let (left_scratch, right_scratch) = scratch.split_at_mut(mid);
        merge_sort(left, left_scratch, cmp);
        merge_sort(right, right_scratch, cmp);
    }

    let (mut i, mut j, mut k) = (0, mid, 0);
    while i < mid && j < n {
        // Take from the left run on ties to keep the sort stable
        if cmp(indices[j], indices[i]) == Ordering::Less {
            scratch[k] = indices[j];
            j += 1;
        } else {
            scratch[k] = indices[i];
            i += 1;
        }
        k += 1;
    }
    scratch[k..k + (mid - i)].copy_from_slice(&indices[i..mid]);
    k += mid - i;
    scratch[k..k + (n - j)].copy_from_slice(&indices[j..n]);
    indices.copy_from_slice(&scratch[..n]);
}

fn sorted_by_super_key(photons: &[Photon], axis: usize, scratch: &mut [u32]) -> Vec<u32> {
    let mut indices: Vec<u32> = (0..photons.len() as u32).collect();
    let cmp = |a: u32, b: u32| {
        super_key_cmp(photons[a as usize].position, photons[b as usize].position, axis)
    };
    merge_sort(&mut indices, scratch, &cmp);
    indices
}

/// Drop photons whose position matches an earlier photon within epsilon.
/// The survivor keeps its own power. Input order is preserved.
fn remove_duplicates(photons: Vec<Photon>) -> (Vec<Photon>, usize) {
    if photons.len() < 2 {
        return (photons, 0);
    }

    let mut scratch = vec![0u32; photons.len()];
    let order = sorted_by_super_key(&photons, 0, &mut scratch);

    let mut keep = vec![true; photons.len()];
    let mut last = order[0] as usize;
    for &idx in &order[1..] {
        let idx = idx as usize;
        if nearly_equal(photons[idx].position, photons[last].position) {
            // Stable sort: the earlier input index always comes first
            keep[idx] = false;
        } else {
            last = idx;
        }
    }

    let before = photons.len();
    let unique: Vec<Photon> = photons
        .into_iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(p))
        .collect();
    let removed = before - unique.len();
    (unique, removed)
}

/// Mutable state threaded through the recursive build.
struct Builder<'a> {
    photons: &'a [Photon],
    perms: [Vec<u32>; 3],
    rank: Vec<u32>,
    scratch: Vec<u32>,
    nodes: Vec<KdNode>,
}

impl Builder<'_> {
    fn build(&mut self, begin: usize, end: usize, axis: Axis) -> Option<u32> {
        if begin >= end {
            return None;
        }

        let a = axis.index();
        let mid = (begin + end) / 2;
        let median = self.perms[a][mid];

        // Partition the other two permutations around the median, keeping
        // each side in super-key order.
        for i in begin..end {
            self.rank[self.perms[a][i] as usize] = i as u32;
        }
        for other in [(a + 1) % 3, (a + 2) % 3] {
            let (mut lo, mut hi) = (begin, mid + 1);
            for i in begin..end {
                let idx = self.perms[other][i];
                let r = self.rank[idx as usize] as usize;
                match r.cmp(&mid) {
                    Ordering::Less => {
                        self.scratch[lo] = idx;
                        lo += 1;
                    }
                    Ordering::Greater => {
                        self.scratch[hi] = idx;
                        hi += 1;
                    }
                    Ordering::Equal => {}
                }
            }
            self.scratch[mid] = median;
            self.perms[other][begin..end].copy_from_slice(&self.scratch[begin..end]);
        }

        let node = self.nodes.len() as u32;
        self.nodes.push(KdNode {
            photon: self.photons[median as usize],
            axis,
            left: None,
            right: None,
        });

        let left = self.build(begin, mid, axis.next());
        let right = self.build(mid + 1, end, axis.next());
        let n = &mut self.nodes[node as usize];
        n.left = left;
        n.right = right;
        Some(node)
    }
}

/// Max-heap entry ordered by squared distance.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    dist2: f32,
    node: u32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist2
            .total_cmp(&other.dist2)
            .then(self.node.cmp(&other.node))
    }
}

struct NearestSearch<'a> {
    nodes: &'a [KdNode],
    position: Vec3,
    normal: Vec3,
    max_count: usize,
    radius2: f32,
    heap: BinaryHeap<Candidate>,
}

impl NearestSearch<'_> {
    fn visit(&mut self, node: u32) {
        let n = &self.nodes[node as usize];
        let delta = self.position[n.axis.index()] - n.split();

        let (near, far) = if delta < 0.0 {
            (n.left, n.right)
        } else {
            (n.right, n.left)
        };
        if let Some(child) = near {
            self.visit(child);
        }
        if delta * delta <= self.radius2 {
            if let Some(child) = far {
                self.visit(child);
            }
        }

        let dist2 = (n.photon.position - self.position).length_squared();
        if dist2 <= self.radius2 && n.photon.arrives_from(self.normal) {
            self.heap.push(Candidate { dist2, node });
            if self.heap.len() > self.max_count {
                self.heap.pop();
            }
            if self.heap.len() == self.max_count {
                if let Some(farthest) = self.heap.peek() {
                    self.radius2 = farthest.dist2;
                }
            }
        }
    }
}

impl PhotonKdTree {
    /// Build a balanced tree. Photons at (nearly) the same position collapse
    /// to the first one; their power is not merged.
    pub fn build(photons: Vec<Photon>) -> Self {
        let (photons, duplicates_removed) = remove_duplicates(photons);
        if duplicates_removed > 0 {
            log::debug!("Removed {} duplicate photons", duplicates_removed);
        }

        let n = photons.len();
        if n == 0 {
            return Self {
                nodes: Vec::new(),
                root: None,
                duplicates_removed,
            };
        }

        let mut scratch = vec![0u32; n];
        let perms = [
            sorted_by_super_key(&photons, 0, &mut scratch),
            sorted_by_super_key(&photons, 1, &mut scratch),
            sorted_by_super_key(&photons, 2, &mut scratch),
        ];

        let mut builder = Builder {
            photons: &photons,
            perms,
            rank: vec![0; n],
            scratch,
            nodes: Vec::with_capacity(n),
        };
        let root = builder.build(0, n, Axis::X);

        Self {
            nodes: builder.nodes,
            root,
            duplicates_removed,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<u32> {
        self.root
    }

    pub fn nodes(&self) -> &[KdNode] {
        &self.nodes
    }

    /// Number of photons dropped as duplicates during the build.
    pub fn duplicates_removed(&self) -> usize {
        self.duplicates_removed
    }

    /// All photons inside the axis-aligned box `[min, max]` (inclusive).
    pub fn range_query(&self, min: Vec3, max: Vec3) -> Vec<Photon> {
        let mut found = Vec::new();
        let mut stack: Vec<u32> = self.root.into_iter().collect();

        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx as usize];
            let p = node.photon.position;
            if p.cmpge(min).all() && p.cmple(max).all() {
                found.push(node.photon);
            }

            let a = node.axis.index();
            let split = node.split();
            if split >= min[a] {
                stack.extend(node.left);
            }
            if split <= max[a] {
                stack.extend(node.right);
            }
        }

        found
    }

    /// Up to `max_count` photons closest to `position` within `max_radius`
    /// that arrived on the side `normal` faces, with their squared
    /// distances, nearest first.
    pub fn nearest(
        &self,
        position: Vec3,
        normal: Vec3,
        max_radius: f32,
        max_count: usize,
    ) -> Vec<(Photon, f32)> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        if max_count == 0 || max_radius <= 0.0 {
            return Vec::new();
        }

        let mut search = NearestSearch {
            nodes: &self.nodes,
            position,
            normal,
            max_count,
            radius2: max_radius * max_radius,
            heap: BinaryHeap::with_capacity(max_count + 1),
        };
        search.visit(root);

        search
            .heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| (self.nodes[c.node as usize].photon, c.dist2))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lux_math::Color;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_photons(n: usize, seed: u64) -> Vec<Photon> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let p = Vec3::new(rng.gen(), rng.gen(), rng.gen()) * 10.0 - 5.0;
                Photon::new(p, Vec3::NEG_Y, Color::ONE, 1.0)
            })
            .collect()
    }

    /// Every descendant of a node lies on the correct side of its split.
    fn check_invariant(tree: &PhotonKdTree) {
        fn collect(tree: &PhotonKdTree, idx: Option<u32>, out: &mut Vec<Vec3>) {
            if let Some(i) = idx {
                let n = &tree.nodes()[i as usize];
                out.push(n.photon.position);
                collect(tree, n.left, out);
                collect(tree, n.right, out);
            }
        }

        for node in tree.nodes() {
            let a = node.axis.index();
            let mut left = Vec::new();
            let mut right = Vec::new();
            collect(tree, node.left, &mut left);
            collect(tree, node.right, &mut right);
            for p in left {
                assert!(p[a] <= node.split());
            }
            for p in right {
                assert!(p[a] >= node.split());
            }
        }
    }

    fn brute_force_range(photons: &[Photon], min: Vec3, max: Vec3) -> usize {
        photons
            .iter()
            .filter(|p| p.position.cmpge(min).all() && p.position.cmple(max).all())
            .count()
    }

    #[test]
    fn test_empty_tree() {
        let tree = PhotonKdTree::build(Vec::new());
        assert!(tree.is_empty());
        assert!(tree.root().is_none());
        assert!(tree.range_query(Vec3::splat(-1.0), Vec3::splat(1.0)).is_empty());
        assert!(tree.nearest(Vec3::ZERO, Vec3::Y, 1.0, 10).is_empty());
    }

    #[test]
    fn test_small_trees() {
        for n in 1..=3 {
            let tree = PhotonKdTree::build(random_photons(n, 7));
            assert_eq!(tree.len(), n);
            check_invariant(&tree);
            let all = tree.range_query(Vec3::splat(-10.0), Vec3::splat(10.0));
            assert_eq!(all.len(), n);
        }
    }

    #[test]
    fn test_axis_cycles_with_depth() {
        let tree = PhotonKdTree::build(random_photons(64, 3));
        let root = &tree.nodes()[tree.root().unwrap() as usize];
        assert_eq!(root.axis, Axis::X);
        let child = &tree.nodes()[root.left.unwrap() as usize];
        assert_eq!(child.axis, Axis::Y);
        let grandchild = &tree.nodes()[child.left.unwrap() as usize];
        assert_eq!(grandchild.axis, Axis::Z);
        let next = &tree.nodes()[grandchild.left.unwrap() as usize];
        assert_eq!(next.axis, Axis::X);
    }

    #[test]
    fn test_split_reads_node_axis() {
        let photon = Photon::new(Vec3::new(1.0, 2.0, 3.0), Vec3::NEG_Y, Color::ONE, 1.0);
        let node = |axis| KdNode {
            photon,
            axis,
            left: None,
            right: None,
        };
        assert_eq!(node(Axis::X).split(), 1.0);
        assert_eq!(node(Axis::Y).split(), 2.0);
        assert_eq!(node(Axis::Z).split(), 3.0);
        assert_eq!(super_key_cmp(Vec3::new(1.0, 2.0, 0.0), Vec3::new(1.0, 1.0, 9.0), 0), Ordering::Greater);
        assert_eq!(super_key_cmp(Vec3::new(1.0, 2.0, 0.0), Vec3::new(1.0, 1.0, 9.0), 2), Ordering::Less);
    }

    #[test]
    fn test_kd_invariant() {
        for n in [10, 1000] {
            let tree = PhotonKdTree::build(random_photons(n, n as u64));
            check_invariant(&tree);
        }
    }

    #[test]
    fn test_range_query_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(99);
        for n in [10, 1_000, 100_000] {
            let photons = random_photons(n, n as u64 + 1);
            let tree = PhotonKdTree::build(photons.clone());
            assert_eq!(tree.len(), n);

            for _ in 0..20 {
                let a = Vec3::new(rng.gen(), rng.gen(), rng.gen()) * 10.0 - 5.0;
                let b = Vec3::new(rng.gen(), rng.gen(), rng.gen()) * 10.0 - 5.0;
                let (min, max) = (a.min(b), a.max(b));
                let found = tree.range_query(min, max);
                assert_eq!(found.len(), brute_force_range(&photons, min, max));
                for p in found {
                    assert!(p.position.cmpge(min).all() && p.position.cmple(max).all());
                }
            }
        }
    }

    #[test]
    fn test_range_query_inclusive_bounds() {
        let photons = vec![
            Photon::new(Vec3::new(1.0, 1.0, 1.0), Vec3::NEG_Y, Color::ONE, 1.0),
            Photon::new(Vec3::new(2.0, 2.0, 2.0), Vec3::NEG_Y, Color::ONE, 1.0),
        ];
        let tree = PhotonKdTree::build(photons);
        let found = tree.range_query(Vec3::splat(1.0), Vec3::splat(2.0));
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_duplicates_collapse_without_merging_power() {
        let p = Vec3::new(0.5, 0.5, 0.5);
        let photons = vec![
            Photon::new(p, Vec3::NEG_Y, Color::new(1.0, 0.0, 0.0), 1.0),
            Photon::new(Vec3::new(3.0, 0.0, 0.0), Vec3::NEG_Y, Color::ONE, 1.0),
            Photon::new(p, Vec3::NEG_Y, Color::new(0.0, 1.0, 0.0), 1.0),
        ];
        let tree = PhotonKdTree::build(photons);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree.duplicates_removed(), 1);

        let found = tree.range_query(p, p);
        assert_eq!(found.len(), 1);
        // The first photon wins and keeps only its own power
        assert_eq!(found[0].power(), Color::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let photons = random_photons(2_000, 11);
        let tree = PhotonKdTree::build(photons.clone());
        let query = Vec3::new(0.3, -0.2, 1.1);

        let found = tree.nearest(query, Vec3::Y, 2.0, 25);
        assert_eq!(found.len(), 25);

        let mut expected: Vec<f32> = photons
            .iter()
            .map(|p| (p.position - query).length_squared())
            .filter(|d| *d <= 4.0)
            .collect();
        expected.sort_by(|a, b| a.total_cmp(b));

        for (i, (_, d)) in found.iter().enumerate() {
            assert_eq!(*d, expected[i]);
        }
    }

    #[test]
    fn test_nearest_respects_radius_and_normal() {
        let photons = vec![
            Photon::new(Vec3::new(0.1, 0.0, 0.0), Vec3::NEG_Y, Color::ONE, 1.0),
            Photon::new(Vec3::new(-0.1, 0.0, 0.0), Vec3::Y, Color::ONE, 1.0),
            Photon::new(Vec3::new(5.0, 0.0, 0.0), Vec3::NEG_Y, Color::ONE, 1.0),
        ];
        let tree = PhotonKdTree::build(photons);

        let found = tree.nearest(Vec3::ZERO, Vec3::Y, 1.0, 10);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0.position, Vec3::new(0.1, 0.0, 0.0));
        assert!((found[0].1 - 0.01).abs() < 1e-6);

        // From below only the upward-travelling photon is visible
        let below = tree.nearest(Vec3::ZERO, Vec3::NEG_Y, 1.0, 10);
        assert_eq!(below.len(), 1);
        assert_eq!(below[0].0.position, Vec3::new(-0.1, 0.0, 0.0));
    }

    #[test]
    fn test_merge_sort_is_stable() {
        let keys = [3, 1, 2, 1, 3, 0];
        let mut indices: Vec<u32> = (0..keys.len() as u32).collect();
        let mut scratch = vec![0; keys.len()];
        merge_sort(&mut indices, &mut scratch, &|a: u32, b: u32| {
            keys[a as usize].cmp(&keys[b as usize])
        });
        assert_eq!(indices, vec![5, 1, 3, 2, 0, 4]);
    }
}
