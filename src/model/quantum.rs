//! State and weight tables for the spin-S XXZ / transverse-field Ising
//! loop algorithm.
//!
//! A spin-S site is split into `2S` spin-1/2 sub-spins (sub-spin
//! `(site, k)` lives at `site·2S + k`); the stored basis state is the
//! τ=0 sub-spin array. The operator string is a τ-ordered dense buffer
//! of local loop operators, grown and compacted in place every sweep.
//!
//! Sign conventions:
//!
//!   XXZ:      H =  Σ_b [Jz Sz Sz + (Jxy/2)(S⁺S⁻ + S⁻S⁺)] − Σ_i Γ Sx
//!   TFIsing:  H = −Σ_b J σz σz − Σ_i Γ σx          (Pauli operators)
//!
//! so positive XXZ couplings are antiferromagnetic, and TFIsing lowers
//! onto the sub-spin engine with jz = −4J, γ = 2Γ, S = 1/2 and a
//! magnetization unit of 2. Antiferromagnetic Jxy relies on the sign
//! cancellation of τ-periodic worldlines and is restricted to bipartite
//! lattices by `build_model`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::lattice::Lattice;
use crate::rng::Rng64;

/// The closed set of graph fragments a local operator can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopKind {
    /// Single-site break: the τ sides of the world line are independent
    /// loops. Carries the transverse field.
    Cut,
    /// Horizontal pairing, parallel legs (the gauged-basis partner of
    /// `AfLink`; the XXZ/TFI insertion tables never emit it).
    FmLink,
    /// Horizontal pairing, anti-parallel legs.
    AfLink,
    /// All four legs fused into one loop (Ising freezing).
    Vertex,
    /// Upper legs swapped onto the opposite lower legs.
    Cross,
}

/// Where an operator acts, in sub-spin indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Space {
    Site(u32),
    Bond(u32, u32),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocalOperator {
    pub kind: LoopKind,
    pub diagonal: bool,
    /// Imaginary time in [0, 1).
    pub time: f64,
    pub space: Space,
    /// Union-find node for the loop ends below the operator; rebuilt
    /// every sweep by the graph decomposition.
    pub bottom_id: u32,
    /// Union-find node for the loop ends above.
    pub top_id: u32,
}

impl LocalOperator {
    pub fn diagonal_at(kind: LoopKind, time: f64, space: Space) -> LocalOperator {
        LocalOperator {
            kind,
            diagonal: true,
            time,
            space,
            bottom_id: u32::MAX,
            top_id: u32::MAX,
        }
    }
}

/// Per-sub-spin-pair graph rates for one bond type, from the exact
/// decomposition of −H_pair + C over the graph indicator matrices.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BondWeights {
    pub af_link: f64,
    pub cross: f64,
    pub vertex: f64,
    /// Alignment the freezing graph requires: parallel legs in the
    /// FM-Ising regime, anti-parallel in the AFM-Ising regime.
    pub vertex_parallel: bool,
    /// C_b, the constant absorbed into the energy offset.
    pub offset: f64,
}

impl BondWeights {
    pub fn from_couplings(jz: f64, jxy: f64) -> BondWeights {
        let axy = jxy.abs();
        if jz > axy {
            // AFM-Ising like
            BondWeights {
                af_link: 0.5 * axy,
                cross: 0.0,
                vertex: 0.5 * (jz - axy),
                vertex_parallel: false,
                offset: 0.25 * jz,
            }
        } else if jz < -axy {
            // FM-Ising like
            BondWeights {
                af_link: 0.0,
                cross: 0.5 * axy,
                vertex: 0.5 * (-jz - axy),
                vertex_parallel: true,
                offset: 0.25 * -jz,
            }
        } else {
            // XY like
            BondWeights {
                af_link: 0.25 * (axy + jz),
                cross: 0.25 * (axy - jz),
                vertex: 0.0,
                vertex_parallel: false,
                offset: 0.25 * axy,
            }
        }
    }

    pub fn total(&self) -> f64 {
        self.af_link + self.cross + self.vertex
    }
}

/// One segment of the candidate-term distribution for the diagonal
/// update: a class of equivalent local terms and its total intensity.
#[derive(Debug, Clone)]
pub enum TermClass {
    BondType(usize),
    SiteType(usize),
}

#[derive(Debug, Clone)]
pub struct QuantumState {
    pub two_s: usize,
    /// τ=0 basis state, `num_sites · 2S` entries of ±1.
    pub subspins: Vec<i8>,
    pub ops: Vec<LocalOperator>,
    /// Reported magnetization per unit Sz: 1 for XXZ, 2 for TFIsing.
    pub mag_unit: f64,
    pub bond_weights: Vec<BondWeights>,
    /// Sub-spin transverse field γ per site type.
    pub gammas: Vec<f64>,
    /// E₀ = Σ_b (2S)² C_b + Σ_i 2S γ/2, extensive.
    pub energy_offset: f64,
    /// Candidate-term distribution: cumulative intensity per class.
    pub term_cumulative: Vec<(f64, TermClass)>,
    pub bonds_by_type: Vec<Vec<u32>>,
    pub sites_by_type: Vec<Vec<u32>>,
}

impl QuantumState {
    pub fn xxz(
        lattice: &Lattice,
        two_s: usize,
        jzs: &[f64],
        jxys: &[f64],
        gammas: &[f64],
        mag_unit: f64,
        rng: &mut Rng64,
    ) -> QuantumState {
        let n = lattice.num_sites();
        let subspins = (0..n * two_s)
            .map(|_| if rng.gen::<bool>() { 1 } else { -1 })
            .collect();
        let bond_weights: Vec<BondWeights> = jzs
            .iter()
            .zip(jxys.iter())
            .map(|(&jz, &jxy)| BondWeights::from_couplings(jz, jxy))
            .collect();

        // A scalar transverse field broadcasts over the site types.
        let num_site_types = lattice.num_site_types();
        let gammas: Vec<f64> = if gammas.len() == num_site_types {
            gammas.to_vec()
        } else {
            assert_eq!(gammas.len(), 1, "one transverse field per site type");
            vec![gammas[0]; num_site_types]
        };
        let mut bonds_by_type = vec![Vec::new(); bond_weights.len()];
        for b in 0..lattice.num_bonds() {
            bonds_by_type[lattice.bond_type(b)].push(b as u32);
        }
        let mut sites_by_type = vec![Vec::new(); num_site_types];
        for s in 0..n {
            sites_by_type[lattice.site_type(s)].push(s as u32);
        }

        let pairs = (two_s * two_s) as f64;
        let mut energy_offset = 0.0;
        let mut term_cumulative = Vec::new();
        let mut cum = 0.0;
        for (t, w) in bond_weights.iter().enumerate() {
            let nb = bonds_by_type[t].len() as f64;
            energy_offset += nb * pairs * w.offset;
            let intensity = nb * pairs * w.total();
            if intensity > 0.0 {
                cum += intensity;
                term_cumulative.push((cum, TermClass::BondType(t)));
            }
        }
        for (st, &g) in gammas.iter().enumerate() {
            let intensity = sites_by_type[st].len() as f64 * two_s as f64 * 0.5 * g;
            energy_offset += intensity;
            if intensity > 0.0 {
                cum += intensity;
                term_cumulative.push((cum, TermClass::SiteType(st)));
            }
        }

        QuantumState {
            two_s,
            subspins,
            ops: Vec::new(),
            mag_unit,
            bond_weights,
            gammas,
            energy_offset,
            term_cumulative,
            bonds_by_type,
            sites_by_type,
        }
    }

    /// Transverse-field Ising in Pauli convention, lowered onto the
    /// sub-spin engine.
    pub fn tf_ising(
        lattice: &Lattice,
        js: &[f64],
        gammas: &[f64],
        rng: &mut Rng64,
    ) -> QuantumState {
        let jzs: Vec<f64> = js.iter().map(|&j| -4.0 * j).collect();
        let jxys = vec![0.0; js.len()];
        let gs: Vec<f64> = gammas.iter().map(|&g| 2.0 * g).collect();
        QuantumState::xxz(lattice, 1, &jzs, &jxys, &gs, 2.0, rng)
    }

    pub fn num_subspins(&self) -> usize {
        self.subspins.len()
    }

    /// Total Poisson intensity of diagonal-operator candidates (before
    /// the β factor).
    pub fn total_intensity(&self) -> f64 {
        self.term_cumulative.last().map_or(0.0, |&(c, _)| c)
    }

    /// Sz magnetization density of the τ=0 state, in reporting units.
    pub fn magnetization(&self) -> f64 {
        let sz: f64 = self.subspins.iter().map(|&s| 0.5 * s as f64).sum();
        self.mag_unit * sz * self.two_s as f64 / self.subspins.len() as f64
    }
}
