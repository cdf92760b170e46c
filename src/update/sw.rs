//! Swendsen-Wang and Wolff updates for the classical models.
//!
//! All four models run through the same embedded-Ising machinery: each
//! site carries a projected amplitude u_i (the spin itself for Ising,
//! the half-shifted sine of the state against a random reflection axis
//! for Clock, the cosine against a random axis for XY), a bond is
//! activated with probability 1 - exp(-2β J u_i u_j) when the exponent
//! is positive, and a flipped cluster reflects every member about the
//! axis. Potts keeps its δ-function activation and per-cluster state
//! redraw. Ferromagnetic and antiferromagnetic couplings differ only
//! through the sign of the exponent.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use crate::cluster::ClusterSet;
use crate::lattice::Lattice;
use crate::model::classical::{ClockState, IsingState, PottsState, XyState};
use crate::rng::Rng64;
use crate::update::SwInfo;
use rand::Rng;

/// Reused per-sweep buffers.
#[derive(Debug, Default)]
pub struct SwScratch {
    pub uf: ClusterSet,
    proj: Vec<f64>,
    visited: Vec<bool>,
    queue: VecDeque<usize>,
    cluster: Vec<usize>,
    new_state: Vec<u8>,
}

static DEGENERATE_WARNED: AtomicBool = AtomicBool::new(false);

/// 1 - exp(-x) for x ≥ 0, clamped into [0,1]. Degenerate couplings
/// (x = NaN or ∞ from a divergent β) are clamped and reported once.
fn activation_probability(x: f64, bond_type: usize) -> f64 {
    let p = -(-x).exp_m1();
    if p.is_nan() || p > 1.0 {
        if !DEGENERATE_WARNED.swap(true, Ordering::Relaxed) {
            let err = crate::error::Error::NumericalDegenerate { bond_type, p };
            warn!(%err, "clamping activation probability");
        }
        if p.is_nan() {
            return 0.0;
        }
        return 1.0;
    }
    p.max(0.0)
}

/// Activate every bond of the lattice against `exponent(i, j, t)`,
/// unifying endpoints and counting activations per bond type.
fn activate_bonds<Fx>(lattice: &Lattice, uf: &mut ClusterSet, info: &mut SwInfo, exponent: Fx, rng: &mut Rng64)
where
    Fx: Fn(usize, usize, usize) -> f64,
{
    for b in 0..lattice.num_bonds() {
        let (i, j) = lattice.bond(b);
        let t = lattice.bond_type(b);
        let x = exponent(i, j, t);
        if x <= 0.0 {
            continue;
        }
        if rng.gen::<f64>() < activation_probability(x, t) {
            uf.unify(i, j);
            info.activated[t] += 1;
        }
    }
}

fn seed_nodes(uf: &mut ClusterSet, proj: &[f64]) {
    uf.reset(0);
    for &u in proj {
        uf.add_node(u);
    }
}

fn fill_info(uf: &ClusterSet, info: &mut SwInfo) {
    info.cluster_size.extend_from_slice(uf.cluster_sizes());
    info.cluster_weight.extend_from_slice(uf.cluster_weights());
    info.cluster_mag
        .extend(uf.cluster_flips().iter().map(|&f| f as f64));
}

pub fn sw_ising(
    lattice: &Lattice,
    state: &mut IsingState,
    js: &[f64],
    t: f64,
    scratch: &mut SwScratch,
    info: &mut SwInfo,
    rng: &mut Rng64,
) {
    let beta = 1.0 / t;
    info.reset(lattice.num_bond_types(), true);
    scratch.proj.clear();
    scratch.proj.extend(state.spins.iter().map(|&s| s as f64));
    seed_nodes(&mut scratch.uf, &scratch.proj);

    let proj = &scratch.proj;
    activate_bonds(
        lattice,
        &mut scratch.uf,
        info,
        |i, j, t| 2.0 * beta * js[t] * proj[i] * proj[j],
        rng,
    );
    scratch.uf.clusterize(rng);
    for (i, s) in state.spins.iter_mut().enumerate() {
        *s *= scratch.uf.cluster_flip(scratch.uf.cluster_id(i));
    }
    fill_info(&scratch.uf, info);
}

pub fn sw_potts(
    lattice: &Lattice,
    state: &mut PottsState,
    js: &[f64],
    t: f64,
    scratch: &mut SwScratch,
    info: &mut SwInfo,
    rng: &mut Rng64,
) {
    let beta = 1.0 / t;
    let q = state.q;
    info.reset(lattice.num_bond_types(), true);
    scratch.proj.clear();
    scratch.proj.resize(state.spins.len(), 1.0);
    seed_nodes(&mut scratch.uf, &scratch.proj);

    let spins = &state.spins;
    activate_bonds(
        lattice,
        &mut scratch.uf,
        info,
        |i, j, t| if spins[i] == spins[j] { beta * js[t] } else { 0.0 },
        rng,
    );
    let nc = scratch.uf.clusterize(rng);
    scratch.new_state.clear();
    for _ in 0..nc {
        scratch.new_state.push(rng.gen_range(0..q));
    }
    for (i, s) in state.spins.iter_mut().enumerate() {
        *s = scratch.new_state[scratch.uf.cluster_id(i)];
    }
    fill_info(&scratch.uf, info);
    // The drawn factor for Potts is the cluster's order-parameter value.
    let inv_q = 1.0 / q as f64;
    for (mag, &ns) in info.cluster_mag.iter_mut().zip(scratch.new_state.iter()) {
        *mag = if ns == 0 { 1.0 - inv_q } else { -inv_q };
    }
}

/// Clock reflection about the half-integer axis r: k → (2r + 1 - k) mod q.
fn clock_reflect(k: u8, r: usize, q: usize) -> u8 {
    (2 * r as isize + 1 - k as isize).rem_euclid(q as isize) as u8
}

pub fn sw_clock(
    lattice: &Lattice,
    state: &mut ClockState,
    js: &[f64],
    t: f64,
    scratch: &mut SwScratch,
    info: &mut SwInfo,
    rng: &mut Rng64,
) {
    let beta = 1.0 / t;
    let q = state.q;
    let r = rng.gen_range(0..q);
    info.reset(lattice.num_bond_types(), true);
    scratch.proj.clear();
    scratch
        .proj
        .extend(state.spins.iter().map(|&s| state.half_sines[(s as usize + q - r) % q]));
    seed_nodes(&mut scratch.uf, &scratch.proj);

    let proj = &scratch.proj;
    activate_bonds(
        lattice,
        &mut scratch.uf,
        info,
        |i, j, t| 2.0 * beta * js[t] * proj[i] * proj[j],
        rng,
    );
    scratch.uf.clusterize(rng);
    for (i, s) in state.spins.iter_mut().enumerate() {
        if scratch.uf.cluster_flip(scratch.uf.cluster_id(i)) < 0 {
            *s = clock_reflect(*s, r, q);
        }
    }
    fill_info(&scratch.uf, info);
}

pub fn sw_xy(
    lattice: &Lattice,
    state: &mut XyState,
    js: &[f64],
    t: f64,
    scratch: &mut SwScratch,
    info: &mut SwInfo,
    rng: &mut Rng64,
) {
    use std::f64::consts::PI;
    let beta = 1.0 / t;
    let axis = rng.gen::<f64>();
    info.reset(lattice.num_bond_types(), true);
    scratch.proj.clear();
    scratch
        .proj
        .extend(state.spins.iter().map(|&s| (2.0 * PI * (s - axis)).cos()));
    seed_nodes(&mut scratch.uf, &scratch.proj);

    let proj = &scratch.proj;
    activate_bonds(
        lattice,
        &mut scratch.uf,
        info,
        |i, j, t| 2.0 * beta * js[t] * proj[i] * proj[j],
        rng,
    );
    scratch.uf.clusterize(rng);
    for (i, s) in state.spins.iter_mut().enumerate() {
        if scratch.uf.cluster_flip(scratch.uf.cluster_id(i)) < 0 {
            *s = (2.0 * axis + 0.5 - *s).rem_euclid(1.0);
        }
    }
    fill_info(&scratch.uf, info);
}

/// Grow one cluster from `seed`, accepting each edge with the
/// activation probability of its exponent.
fn grow_cluster<Fx>(
    lattice: &Lattice,
    seed: usize,
    exponent: Fx,
    scratch: &mut SwScratch,
    rng: &mut Rng64,
) where
    Fx: Fn(usize, usize, usize) -> f64,
{
    scratch.visited.clear();
    scratch.visited.resize(lattice.num_sites(), false);
    scratch.queue.clear();
    scratch.cluster.clear();
    scratch.visited[seed] = true;
    scratch.queue.push_back(seed);
    while let Some(site) = scratch.queue.pop_front() {
        scratch.cluster.push(site);
        for (nb, t) in lattice.neighbors_with_type(site) {
            if scratch.visited[nb] {
                continue;
            }
            let x = exponent(site, nb, t);
            if x <= 0.0 {
                continue;
            }
            if rng.gen::<f64>() < activation_probability(x, t) {
                scratch.visited[nb] = true;
                scratch.queue.push_back(nb);
            }
        }
    }
}

pub fn wolff_ising(
    lattice: &Lattice,
    state: &mut IsingState,
    js: &[f64],
    t: f64,
    scratch: &mut SwScratch,
    info: &mut SwInfo,
    rng: &mut Rng64,
) {
    let beta = 1.0 / t;
    info.reset(lattice.num_bond_types(), false);
    let seed = rng.gen_range(0..lattice.num_sites());
    let spins = &state.spins;
    grow_cluster(
        lattice,
        seed,
        |i, j, t| 2.0 * beta * js[t] * (spins[i] * spins[j]) as f64,
        scratch,
        rng,
    );
    for &i in &scratch.cluster {
        state.spins[i] = -state.spins[i];
    }
}

pub fn wolff_potts(
    lattice: &Lattice,
    state: &mut PottsState,
    js: &[f64],
    t: f64,
    scratch: &mut SwScratch,
    info: &mut SwInfo,
    rng: &mut Rng64,
) {
    let beta = 1.0 / t;
    info.reset(lattice.num_bond_types(), false);
    let seed = rng.gen_range(0..lattice.num_sites());
    let spins = &state.spins;
    grow_cluster(
        lattice,
        seed,
        |i, j, t| if spins[i] == spins[j] { beta * js[t] } else { 0.0 },
        scratch,
        rng,
    );
    let new_state = rng.gen_range(0..state.q);
    for &i in &scratch.cluster {
        state.spins[i] = new_state;
    }
}

pub fn wolff_clock(
    lattice: &Lattice,
    state: &mut ClockState,
    js: &[f64],
    t: f64,
    scratch: &mut SwScratch,
    info: &mut SwInfo,
    rng: &mut Rng64,
) {
    let beta = 1.0 / t;
    let q = state.q;
    let r = rng.gen_range(0..q);
    info.reset(lattice.num_bond_types(), false);
    let seed = rng.gen_range(0..lattice.num_sites());
    scratch.proj.clear();
    scratch
        .proj
        .extend(state.spins.iter().map(|&s| state.half_sines[(s as usize + q - r) % q]));
    let proj = std::mem::take(&mut scratch.proj);
    grow_cluster(
        lattice,
        seed,
        |i, j, t| 2.0 * beta * js[t] * proj[i] * proj[j],
        scratch,
        rng,
    );
    scratch.proj = proj;
    for &i in &scratch.cluster {
        state.spins[i] = clock_reflect(state.spins[i], r, q);
    }
}

pub fn wolff_xy(
    lattice: &Lattice,
    state: &mut XyState,
    js: &[f64],
    t: f64,
    scratch: &mut SwScratch,
    info: &mut SwInfo,
    rng: &mut Rng64,
) {
    use std::f64::consts::PI;
    let beta = 1.0 / t;
    let axis = rng.gen::<f64>();
    info.reset(lattice.num_bond_types(), false);
    let seed = rng.gen_range(0..lattice.num_sites());
    scratch.proj.clear();
    scratch
        .proj
        .extend(state.spins.iter().map(|&s| (2.0 * PI * (s - axis)).cos()));
    let proj = std::mem::take(&mut scratch.proj);
    grow_cluster(
        lattice,
        seed,
        |i, j, t| 2.0 * beta * js[t] * proj[i] * proj[j],
        scratch,
        rng,
    );
    scratch.proj = proj;
    for &i in &scratch.cluster {
        state.spins[i] = (2.0 * axis + 0.5 - state.spins[i]).rem_euclid(1.0);
    }
}
