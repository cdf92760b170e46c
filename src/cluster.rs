//! Disjoint-set forest with a per-root payload, shared by the classical
//! and quantum cluster updates.
//!
//! Every sweep rebuilds the forest from scratch, so the buffers are
//! owned here and recycled through [`ClusterSet::reset`] instead of
//! reallocating. A node's payload is a running `f64` aggregate (cluster
//! spin sum, projected weight, ...) reduced into the surviving root on
//! every merge; the reduction is supplied by the model as a closure and
//! monomorphizes away.
//!
//! `find` uses path halving, `unify` union-by-size, giving the usual
//! O(α(n)) amortized cost. After [`ClusterSet::clusterize`] every node
//! points at its root directly, each root owns a dense 0-based cluster
//! id, and every cluster has drawn an independent ±1 flip.

use num_traits::Zero;
use rand::Rng;

#[derive(Debug, Clone, Default)]
pub struct ClusterSet {
    parent: Vec<u32>,
    size: Vec<u32>,
    weight: Vec<f64>,
    /// Root node → dense cluster id; valid after `clusterize`.
    cluster_of_root: Vec<u32>,
    cluster_size: Vec<u32>,
    cluster_weight: Vec<f64>,
    cluster_flip: Vec<i8>,
}

impl ClusterSet {
    pub fn new() -> ClusterSet {
        ClusterSet::default()
    }

    /// Forget all nodes, keeping capacity, and pre-add `n` singletons
    /// with zero payload.
    pub fn reset(&mut self, n: usize) {
        self.parent.clear();
        self.size.clear();
        self.weight.clear();
        self.cluster_of_root.clear();
        self.cluster_size.clear();
        self.cluster_weight.clear();
        self.cluster_flip.clear();
        self.parent.extend(0..n as u32);
        self.size.resize(n, 1);
        self.weight.resize(n, Zero::zero());
    }

    pub fn num_nodes(&self) -> usize {
        self.parent.len()
    }

    /// Append a singleton node carrying `weight`, returning its index.
    pub fn add_node(&mut self, weight: f64) -> usize {
        let id = self.parent.len() as u32;
        self.parent.push(id);
        self.size.push(1);
        self.weight.push(weight);
        id as usize
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        let mut p = self.parent[x];
        while p as usize != x {
            let gp = self.parent[p as usize];
            self.parent[x] = gp;
            x = p as usize;
            p = gp;
        }
        x
    }

    /// Merge the clusters of `a` and `b`, reducing the root payloads
    /// with `reduce`. No-op when already joined. Returns the surviving
    /// root.
    pub fn unify_by<F>(&mut self, a: usize, b: usize, reduce: F) -> usize
    where
        F: FnOnce(f64, f64) -> f64,
    {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return ra;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small] = big as u32;
        self.size[big] += self.size[small];
        self.weight[big] = reduce(self.weight[big], self.weight[small]);
        big
    }

    /// `unify_by` with the additive reduction used by every model here.
    pub fn unify(&mut self, a: usize, b: usize) -> usize {
        self.unify_by(a, b, |x, y| x + y)
    }

    /// Compress every node onto its root, hand out dense cluster ids and
    /// draw one independent ±1 flip per cluster. Returns the number of
    /// clusters. Idempotent in the ids it assigns.
    pub fn clusterize<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let n = self.parent.len();
        self.cluster_of_root.clear();
        self.cluster_of_root.resize(n, u32::MAX);
        self.cluster_size.clear();
        self.cluster_weight.clear();
        self.cluster_flip.clear();
        let mut nc = 0u32;
        for x in 0..n {
            let r = self.find(x);
            self.parent[x] = r as u32;
            if x == r {
                self.cluster_of_root[r] = nc;
                self.cluster_size.push(self.size[r]);
                self.cluster_weight.push(self.weight[r]);
                nc += 1;
            }
        }
        for _ in 0..nc {
            self.cluster_flip.push(if rng.gen::<bool>() { 1 } else { -1 });
        }
        nc as usize
    }

    pub fn num_clusters(&self) -> usize {
        self.cluster_size.len()
    }

    pub fn cluster_id(&self, x: usize) -> usize {
        let id = self.cluster_of_root[self.parent[x] as usize];
        debug_assert!(id != u32::MAX, "cluster_id before clusterize");
        id as usize
    }

    pub fn cluster_size(&self, c: usize) -> usize {
        self.cluster_size[c] as usize
    }

    pub fn cluster_weight(&self, c: usize) -> f64 {
        self.cluster_weight[c]
    }

    pub fn cluster_flip(&self, c: usize) -> i8 {
        self.cluster_flip[c]
    }

    pub fn cluster_sizes(&self) -> &[u32] {
        &self.cluster_size
    }

    pub fn cluster_weights(&self) -> &[f64] {
        &self.cluster_weight
    }

    pub fn cluster_flips(&self) -> &[i8] {
        &self.cluster_flip
    }
}
