//! Cluster updates and their per-sweep byproducts.

pub mod loops;
pub mod sw;

/// Byproduct of a classical cluster sweep, consumed by the improved
/// estimators.
#[derive(Debug, Clone, Default)]
pub struct SwInfo {
    /// Activated-bond count per bond type.
    pub activated: Vec<usize>,
    /// Per-cluster site count.
    pub cluster_size: Vec<u32>,
    /// Per-cluster payload: Σ of projected site amplitudes (Ising:
    /// spins, Clock/XY: axis projections, Potts: site count).
    pub cluster_weight: Vec<f64>,
    /// Per-cluster drawn magnetization factor (±1 flip, or δ − 1/q for
    /// Potts).
    pub cluster_mag: Vec<f64>,
    /// Wolff grows a single cluster and leaves no usable aggregate
    /// statistics; the driver falls back to the direct estimator.
    pub improved_ok: bool,
}

impl SwInfo {
    pub fn num_clusters(&self) -> usize {
        self.cluster_size.len()
    }

    pub(crate) fn reset(&mut self, num_bond_types: usize, improved_ok: bool) {
        self.activated.clear();
        self.activated.resize(num_bond_types, 0);
        self.cluster_size.clear();
        self.cluster_weight.clear();
        self.cluster_mag.clear();
        self.improved_ok = improved_ok;
    }
}

/// Byproduct of a quantum loop sweep.
#[derive(Debug, Clone, Default)]
pub struct LoopInfo {
    /// Operators in the string after the sweep.
    pub num_ops: usize,
    /// Per-loop Σ of τ=0 sub-spins, after the flip.
    pub cluster_weight: Vec<f64>,
    pub num_clusters: usize,
}

#[derive(Debug, Clone)]
pub enum SweepInfo {
    Sw(SwInfo),
    Loop(LoopInfo),
}
