//! The loop update for the spin-S XXZ / transverse-field Ising engine.
//!
//! One sweep runs three phases over the operator string:
//!
//! 1. Diagonal update. The string is walked in τ order while the τ=0
//!    sub-spin state is propagated through the off-diagonal operators.
//!    Every diagonal operator is dropped and regenerated from a Poisson
//!    process of intensity β·w per local term and graph kind, each
//!    candidate accepted only when the propagated state is compatible
//!    with the kind (an AFLink requires anti-parallel legs, a Vertex
//!    the alignment favored by Jz, a Cross parallel legs, a Cut
//!    anything). Off-diagonal operators persist at their τ; only their
//!    graph dressing is re-drawn among the kinds supporting the same
//!    transition.
//! 2. Graph decomposition. Fresh union-find nodes: one per sub-spin
//!    (seeded with the τ=0 sub-spin as payload) and two per operator.
//!    The per-leg active node walks upward in τ, fused through each
//!    operator by its kind's fixed connectivity, and the trailing
//!    actives close onto the τ=0 nodes across the periodic boundary.
//! 3. Flip. `clusterize` draws one ±1 per loop; τ=0 sub-spins multiply
//!    by their loop's flip and an operator's diagonal flag toggles
//!    exactly when the loops at its two ends drew different flips (a
//!    Vertex owns both ends, so it never toggles; a flipped Cut is a
//!    local spin flip).

use rand::Rng;
use rand_distr::Exp1;

use crate::cluster::ClusterSet;
use crate::lattice::Lattice;
use crate::model::quantum::{LocalOperator, LoopKind, QuantumState, Space, TermClass};
use crate::rng::Rng64;
use crate::update::LoopInfo;

/// Reused per-sweep buffers; capacity is stable after warmup.
#[derive(Debug, Default)]
pub struct LoopScratch {
    pub uf: ClusterSet,
    currents: Vec<u32>,
    merged: Vec<LocalOperator>,
    propagated: Vec<i8>,
}

fn kind_compatible(kind: LoopKind, vertex_parallel: bool, su: i8, sv: i8) -> bool {
    match kind {
        LoopKind::Cut => true,
        LoopKind::AfLink => su != sv,
        LoopKind::FmLink | LoopKind::Cross => su == sv,
        LoopKind::Vertex => (su == sv) == vertex_parallel,
    }
}

/// Draw a candidate diagonal operator for the propagated state, or
/// `None` when the thinning rejects it.
fn draw_candidate(
    lattice: &Lattice,
    state: &QuantumState,
    propagated: &[i8],
    time: f64,
    rng: &mut Rng64,
) -> Option<LocalOperator> {
    let two_s = state.two_s;
    let x = rng.gen::<f64>() * state.total_intensity();
    let class = state
        .term_cumulative
        .iter()
        .find(|&&(cum, _)| x < cum)
        .map(|(_, class)| class)?;
    match class {
        TermClass::SiteType(st) => {
            let sites = &state.sites_by_type[*st];
            let site = sites[rng.gen_range(0..sites.len())] as usize;
            let u = (site * two_s + rng.gen_range(0..two_s)) as u32;
            Some(LocalOperator::diagonal_at(LoopKind::Cut, time, Space::Site(u)))
        }
        TermClass::BondType(bt) => {
            let bonds = &state.bonds_by_type[*bt];
            let b = bonds[rng.gen_range(0..bonds.len())] as usize;
            let (i, j) = lattice.bond(b);
            let u = (i * two_s + rng.gen_range(0..two_s)) as u32;
            let v = (j * two_s + rng.gen_range(0..two_s)) as u32;
            let w = &state.bond_weights[*bt];
            let y = rng.gen::<f64>() * w.total();
            let kind = if y < w.af_link {
                LoopKind::AfLink
            } else if y < w.af_link + w.cross {
                LoopKind::Cross
            } else {
                LoopKind::Vertex
            };
            if kind_compatible(kind, w.vertex_parallel, propagated[u as usize], propagated[v as usize]) {
                Some(LocalOperator::diagonal_at(kind, time, Space::Bond(u, v)))
            } else {
                None
            }
        }
    }
}

/// Phase 1: drop and regenerate the diagonal operators, keep the
/// off-diagonal ones, maintain τ order by merging.
fn diagonal_update(
    lattice: &Lattice,
    state: &mut QuantumState,
    beta: f64,
    scratch: &mut LoopScratch,
    rng: &mut Rng64,
) {
    let intensity = beta * state.total_intensity();
    scratch.propagated.clear();
    scratch.propagated.extend_from_slice(&state.subspins);
    scratch.merged.clear();

    let mut next_candidate = if intensity > 0.0 {
        rng.sample::<f64, _>(Exp1) / intensity
    } else {
        f64::INFINITY
    };
    let mut old = 0usize;
    loop {
        let next_old = state.ops.get(old).map_or(f64::INFINITY, |op| op.time);
        if next_old <= next_candidate {
            if next_old == f64::INFINITY {
                break;
            }
            let mut op = state.ops[old];
            old += 1;
            if op.diagonal {
                continue;
            }
            match op.space {
                Space::Site(u) => {
                    scratch.propagated[u as usize] = -scratch.propagated[u as usize];
                }
                Space::Bond(u, v) => {
                    // Re-draw the graph dressing among the kinds that
                    // carry this off-diagonal transition.
                    if op.kind == LoopKind::AfLink || op.kind == LoopKind::Cross {
                        let w = match lattice_bond_type(lattice, state, u, v) {
                            Some(bt) => &state.bond_weights[bt],
                            None => unreachable!("operator on unknown bond"),
                        };
                        let y = rng.gen::<f64>() * (w.af_link + w.cross);
                        op.kind = if y < w.af_link { LoopKind::AfLink } else { LoopKind::Cross };
                    }
                    scratch.propagated[u as usize] = -scratch.propagated[u as usize];
                    scratch.propagated[v as usize] = -scratch.propagated[v as usize];
                }
            }
            scratch.merged.push(op);
        } else {
            if next_candidate >= 1.0 {
                // Flush remaining old operators on the next iterations.
                next_candidate = f64::INFINITY;
                if next_old == f64::INFINITY {
                    break;
                }
                continue;
            }
            if let Some(op) = draw_candidate(lattice, state, &scratch.propagated, next_candidate, rng) {
                scratch.merged.push(op);
            }
            next_candidate += rng.sample::<f64, _>(Exp1) / intensity;
        }
    }
    std::mem::swap(&mut state.ops, &mut scratch.merged);
}

/// Recover the bond type of a sub-spin pair from its sites.
fn lattice_bond_type(lattice: &Lattice, state: &QuantumState, u: u32, v: u32) -> Option<usize> {
    let (i, j) = (u as usize / state.two_s, v as usize / state.two_s);
    lattice
        .neighbors_with_type(i)
        .find(|&(nb, _)| nb == j)
        .map(|(_, t)| t)
}

/// Phase 2: rebuild the union-find over loops.
fn decompose(state: &mut QuantumState, scratch: &mut LoopScratch) {
    let nss = state.num_subspins();
    scratch.uf.reset(0);
    for &s in &state.subspins {
        scratch.uf.add_node(s as f64);
    }
    scratch.currents.clear();
    scratch.currents.extend(0..nss as u32);

    for op in state.ops.iter_mut() {
        debug_assert!((0.0..1.0).contains(&op.time), "operator time out of [0,1)");
        let bottom = scratch.uf.add_node(0.0) as u32;
        let top = scratch.uf.add_node(0.0) as u32;
        op.bottom_id = bottom;
        op.top_id = top;
        match (op.kind, op.space) {
            (LoopKind::Cut, Space::Site(u)) => {
                scratch.uf.unify(bottom as usize, scratch.currents[u as usize] as usize);
                scratch.currents[u as usize] = top;
            }
            (LoopKind::FmLink, Space::Bond(u, v)) | (LoopKind::AfLink, Space::Bond(u, v)) => {
                scratch.uf.unify(bottom as usize, scratch.currents[u as usize] as usize);
                scratch.uf.unify(bottom as usize, scratch.currents[v as usize] as usize);
                scratch.currents[u as usize] = top;
                scratch.currents[v as usize] = top;
            }
            (LoopKind::Vertex, Space::Bond(u, v)) => {
                debug_assert!(op.diagonal, "off-diagonal Vertex operator");
                scratch.uf.unify(bottom as usize, scratch.currents[u as usize] as usize);
                scratch.uf.unify(bottom as usize, scratch.currents[v as usize] as usize);
                scratch.uf.unify(bottom as usize, top as usize);
                scratch.currents[u as usize] = top;
                scratch.currents[v as usize] = top;
            }
            (LoopKind::Cross, Space::Bond(u, v)) => {
                scratch.uf.unify(bottom as usize, scratch.currents[u as usize] as usize);
                scratch.uf.unify(top as usize, scratch.currents[v as usize] as usize);
                scratch.currents[u as usize] = top;
                scratch.currents[v as usize] = bottom;
            }
            _ => unreachable!("operator kind inconsistent with its support"),
        }
    }
    // Close the loops across the periodic τ boundary.
    for ss in 0..nss {
        scratch.uf.unify(scratch.currents[ss] as usize, ss);
    }
}

/// Phase 3: draw the flips, write them back, fix the diagonal flags.
fn flip(state: &mut QuantumState, scratch: &mut LoopScratch, info: &mut LoopInfo, rng: &mut Rng64) {
    let nc = scratch.uf.clusterize(rng);
    for (ss, s) in state.subspins.iter_mut().enumerate() {
        if scratch.uf.cluster_flip(scratch.uf.cluster_id(ss)) < 0 {
            *s = -*s;
        }
    }
    for op in state.ops.iter_mut() {
        let fb = scratch.uf.cluster_flip(scratch.uf.cluster_id(op.bottom_id as usize));
        let ft = scratch.uf.cluster_flip(scratch.uf.cluster_id(op.top_id as usize));
        if fb != ft {
            op.diagonal = !op.diagonal;
        }
    }
    info.num_ops = state.ops.len();
    info.num_clusters = nc;
    info.cluster_weight.clear();
    info.cluster_weight.extend(
        itertools::zip_eq(scratch.uf.cluster_weights(), scratch.uf.cluster_flips())
            .map(|(&w, &f)| w * f as f64),
    );
}

pub fn loop_update(
    lattice: &Lattice,
    state: &mut QuantumState,
    t: f64,
    scratch: &mut LoopScratch,
    info: &mut LoopInfo,
    rng: &mut Rng64,
) {
    let beta = 1.0 / t;
    diagonal_update(lattice, state, beta, scratch, rng);
    decompose(state, scratch);
    flip(state, scratch, info, rng);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded;

    fn sweep_n(state: &mut QuantumState, lattice: &Lattice, t: f64, n: usize, rng: &mut Rng64) -> LoopInfo {
        let mut scratch = LoopScratch::default();
        let mut info = LoopInfo::default();
        for _ in 0..n {
            loop_update(lattice, state, t, &mut scratch, &mut info, rng);
        }
        info
    }

    /// Walking the string from the τ=0 state must return to the τ=0
    /// state: off-diagonal flips along a period cancel.
    fn string_is_consistent(state: &QuantumState) -> bool {
        let mut prop = state.subspins.clone();
        let mut last_t = -1.0;
        for op in &state.ops {
            if op.time <= last_t || !(0.0..1.0).contains(&op.time) {
                return false;
            }
            last_t = op.time;
            if !op.diagonal {
                match op.space {
                    Space::Site(u) => prop[u as usize] = -prop[u as usize],
                    Space::Bond(u, v) => {
                        prop[u as usize] = -prop[u as usize];
                        prop[v as usize] = -prop[v as usize];
                    }
                }
            }
        }
        prop == state.subspins
    }

    #[test]
    fn heisenberg_string_stays_consistent() {
        let lattice = Lattice::chain(6);
        let mut rng = seeded(21);
        let mut state = QuantumState::xxz(&lattice, 1, &[1.0], &[1.0], &[0.0], 1.0, &mut rng);
        for _ in 0..200 {
            let mut scratch = LoopScratch::default();
            let mut info = LoopInfo::default();
            loop_update(&lattice, &mut state, 0.5, &mut scratch, &mut info, &mut rng);
            assert!(string_is_consistent(&state));
        }
    }

    #[test]
    fn tfi_string_stays_consistent() {
        let lattice = Lattice::chain(8);
        let mut rng = seeded(22);
        let mut state = QuantumState::tf_ising(&lattice, &[1.0], &[1.0], &mut rng);
        for _ in 0..200 {
            let mut scratch = LoopScratch::default();
            let mut info = LoopInfo::default();
            loop_update(&lattice, &mut state, 0.5, &mut scratch, &mut info, &mut rng);
            assert!(string_is_consistent(&state));
        }
    }

    #[test]
    fn operator_count_grows_with_beta() {
        let lattice = Lattice::chain(8);
        let mut rng = seeded(23);
        let mut hot = QuantumState::xxz(&lattice, 1, &[1.0], &[1.0], &[0.0], 1.0, &mut rng);
        let mut cold = hot.clone();
        let hot_info = sweep_n(&mut hot, &lattice, 4.0, 50, &mut rng);
        let cold_info = sweep_n(&mut cold, &lattice, 0.25, 50, &mut rng);
        assert!(cold_info.num_ops > hot_info.num_ops);
    }

    #[test]
    fn free_spins_decorrelate_in_one_sweep() {
        // No couplings: every sub-spin is its own loop and flips freely.
        let lattice = Lattice::chain(16);
        let mut rng = seeded(24);
        let mut state = QuantumState::xxz(&lattice, 1, &[0.0], &[0.0], &[0.0], 1.0, &mut rng);
        let info = sweep_n(&mut state, &lattice, 1.0, 1, &mut rng);
        assert_eq!(info.num_ops, 0);
        assert_eq!(info.num_clusters, 16);
    }
}
