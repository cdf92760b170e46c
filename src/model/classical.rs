//! Spin arrays and direct observables for the classical models.
//!
//! Each state owns only its configuration; lattice, couplings and the
//! random stream live on [`Model`](crate::model::Model). The Clock
//! state precomputes its cosine/sine tables together with the
//! half-shifted sines read by the Swendsen-Wang projection.

use std::f64::consts::PI;

use nalgebra::Vector2;
use rand::Rng;

use crate::lattice::Lattice;
use crate::rng::Rng64;

#[derive(Debug, Clone)]
pub struct IsingState {
    pub spins: Vec<i8>,
}

impl IsingState {
    pub fn random(n: usize, rng: &mut Rng64) -> IsingState {
        IsingState {
            spins: (0..n).map(|_| if rng.gen::<bool>() { 1 } else { -1 }).collect(),
        }
    }

    /// Total energy density, -1/N Σ_b J_t s_i s_j.
    pub fn energy_density(&self, lattice: &Lattice, js: &[f64]) -> f64 {
        let mut e = 0.0;
        for b in 0..lattice.num_bonds() {
            let (i, j) = lattice.bond(b);
            e -= js[lattice.bond_type(b)] * (self.spins[i] * self.spins[j]) as f64;
        }
        e / lattice.num_sites() as f64
    }

    pub fn magnetization(&self) -> f64 {
        self.spins.iter().map(|&s| s as f64).sum::<f64>() / self.spins.len() as f64
    }
}

#[derive(Debug, Clone)]
pub struct PottsState {
    pub q: u8,
    pub spins: Vec<u8>,
}

impl PottsState {
    pub fn random(q: u8, n: usize, rng: &mut Rng64) -> PottsState {
        PottsState {
            q,
            spins: (0..n).map(|_| rng.gen_range(0..q)).collect(),
        }
    }

    /// -1/N Σ_b J_t δ(s_i, s_j).
    pub fn energy_density(&self, lattice: &Lattice, js: &[f64]) -> f64 {
        let mut e = 0.0;
        for b in 0..lattice.num_bonds() {
            let (i, j) = lattice.bond(b);
            if self.spins[i] == self.spins[j] {
                e -= js[lattice.bond_type(b)];
            }
        }
        e / lattice.num_sites() as f64
    }

    /// Order parameter density Σ_i (δ(s_i, 0) - 1/q) / N.
    pub fn magnetization(&self) -> f64 {
        let q = self.q as f64;
        let hits = self.spins.iter().filter(|&&s| s == 0).count() as f64;
        (hits - self.spins.len() as f64 / q) / self.spins.len() as f64
    }
}

#[derive(Debug, Clone)]
pub struct ClockState {
    pub q: usize,
    pub spins: Vec<u8>,
    pub cosines: Vec<f64>,
    pub sines: Vec<f64>,
    /// sin(2πj/q - π/q): projection amplitudes for the half-integer
    /// reflection axes. For even q no state lands on an axis; for odd q
    /// a state on the axis projects to zero and the reflection fixes it.
    pub half_sines: Vec<f64>,
}

impl ClockState {
    pub fn random(q: usize, n: usize, rng: &mut Rng64) -> ClockState {
        let cosines = (0..q).map(|k| (2.0 * PI * k as f64 / q as f64).cos()).collect();
        let sines = (0..q).map(|k| (2.0 * PI * k as f64 / q as f64).sin()).collect();
        let half_sines = (0..q)
            .map(|j| (2.0 * PI * j as f64 / q as f64 - PI / q as f64).sin())
            .collect();
        ClockState {
            q,
            spins: (0..n).map(|_| rng.gen_range(0..q) as u8).collect(),
            cosines,
            sines,
            half_sines,
        }
    }

    /// -1/N Σ_b J_t cos(θ_i - θ_j) from the precomputed tables.
    pub fn energy_density(&self, lattice: &Lattice, js: &[f64]) -> f64 {
        let mut e = 0.0;
        for b in 0..lattice.num_bonds() {
            let (i, j) = lattice.bond(b);
            let (si, sj) = (self.spins[i] as usize, self.spins[j] as usize);
            let cosine = self.cosines[si] * self.cosines[sj] + self.sines[si] * self.sines[sj];
            e -= js[lattice.bond_type(b)] * cosine;
        }
        e / lattice.num_sites() as f64
    }

    /// (M_x, M_y) density.
    pub fn magnetization(&self) -> Vector2<f64> {
        let inv = 1.0 / self.spins.len() as f64;
        let mx: f64 = self.spins.iter().map(|&s| self.cosines[s as usize]).sum();
        let my: f64 = self.spins.iter().map(|&s| self.sines[s as usize]).sum();
        Vector2::new(mx, my) * inv
    }
}

#[derive(Debug, Clone)]
pub struct XyState {
    /// Angles divided by 2π, in [0, 1).
    pub spins: Vec<f64>,
}

impl XyState {
    pub fn random(n: usize, rng: &mut Rng64) -> XyState {
        XyState {
            spins: (0..n).map(|_| rng.gen::<f64>()).collect(),
        }
    }

    pub fn energy_density(&self, lattice: &Lattice, js: &[f64]) -> f64 {
        let mut e = 0.0;
        for b in 0..lattice.num_bonds() {
            let (i, j) = lattice.bond(b);
            let cosine = (2.0 * PI * (self.spins[i] - self.spins[j])).cos();
            e -= js[lattice.bond_type(b)] * cosine;
        }
        e / lattice.num_sites() as f64
    }

    pub fn magnetization(&self) -> Vector2<f64> {
        let inv = 1.0 / self.spins.len() as f64;
        let mx: f64 = self.spins.iter().map(|&s| (2.0 * PI * s).cos()).sum();
        let my: f64 = self.spins.iter().map(|&s| (2.0 * PI * s).sin()).sum();
        Vector2::new(mx, my) * inv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded;

    #[test]
    fn ising_ground_state_energy() {
        let lat = Lattice::square(4, 4);
        let mut rng = seeded(0);
        let mut st = IsingState::random(lat.num_sites(), &mut rng);
        st.spins.iter_mut().for_each(|s| *s = 1);
        assert!((st.energy_density(&lat, &[1.0, 1.0]) - (-2.0)).abs() < 1e-12);
        assert!((st.magnetization() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn clock_tables_match_angles() {
        let mut rng = seeded(1);
        let st = ClockState::random(6, 4, &mut rng);
        for k in 0..6 {
            let th = 2.0 * PI * k as f64 / 6.0;
            assert!((st.cosines[k] - th.cos()).abs() < 1e-12);
            assert!((st.sines[k] - th.sin()).abs() < 1e-12);
            // even q: no clock state sits on a half-integer axis
            assert!(st.half_sines[k].abs() > 1e-12);
        }
    }

    #[test]
    fn potts_magnetization_range() {
        let mut rng = seeded(2);
        let st = PottsState::random(3, 27, &mut rng);
        let m = st.magnetization();
        assert!(m >= -1.0 / 3.0 - 1e-12 && m <= 2.0 / 3.0 + 1e-12);
    }
}
