//! The closed set of models and the sweep/estimator dispatch.
//!
//! Models are a tagged sum dispatched once per sweep; the per-variant
//! update and estimator bodies are concrete functions, so the hot inner
//! loops monomorphize. A model owns its lattice, couplings, seeded
//! random stream and the per-sweep scratch buffers.

pub mod classical;
pub mod quantum;

use tracing::debug;

use crate::error::{Error, Result};
use crate::estimator::{self, Estimate};
use crate::lattice::Lattice;
use crate::params::Parameter;
use crate::rng::{seeded, Rng64};
use crate::update::loops::{loop_update, LoopScratch};
use crate::update::sw::{
    sw_clock, sw_ising, sw_potts, sw_xy, wolff_clock, wolff_ising, wolff_potts, wolff_xy, SwScratch,
};
use crate::update::{LoopInfo, SwInfo, SweepInfo};

use classical::{ClockState, IsingState, PottsState, XyState};
use quantum::QuantumState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMethod {
    SwendsenWang,
    Wolff,
    Loop,
}

#[derive(Debug, Clone)]
pub enum State {
    Ising(IsingState),
    Potts(PottsState),
    Clock(ClockState),
    Xy(XyState),
    Quantum(QuantumState),
}

#[derive(Debug, Default)]
struct Scratch {
    sw: SwScratch,
    lp: LoopScratch,
}

#[derive(Debug)]
pub struct Model {
    pub lattice: Lattice,
    pub js: Vec<f64>,
    pub update: UpdateMethod,
    pub state: State,
    pub rng: Rng64,
    info: SweepInfo,
    scratch: Scratch,
}

fn update_method(params: &Parameter, quantum: bool) -> Result<UpdateMethod> {
    if !params.contains("UpdateMethod") {
        return Ok(if quantum { UpdateMethod::Loop } else { UpdateMethod::SwendsenWang });
    }
    match params.tag("UpdateMethod")? {
        "SW" | "SwendsenWang" => Ok(UpdateMethod::SwendsenWang),
        "Wolff" => Ok(UpdateMethod::Wolff),
        "Loop" => Ok(UpdateMethod::Loop),
        other => Err(Error::invalid(format!("unknown update method \"{}\"", other))),
    }
}

fn potts_q(params: &Parameter) -> Result<u8> {
    let q = params.int("Q")?;
    if !(2..=255).contains(&q) {
        return Err(Error::invalid(format!("\"Q\" must be at least 2, got {}", q)));
    }
    Ok(q as u8)
}

/// Build a model from the parameter map.
pub fn build_model(params: &Parameter) -> Result<Model> {
    let lattice = Lattice::from_params(params)?;
    let ntypes = lattice.num_bond_types();
    let mut rng = seeded(params.int_or("Seed", 0)? as u64);
    let tag = params.tag("Model")?;
    let quantum = matches!(tag, "QuantumXXZ" | "TFIsing");
    let update = update_method(params, quantum)?;
    if quantum != (update == UpdateMethod::Loop) {
        return Err(Error::invalid(format!(
            "update method {:?} does not apply to model \"{}\"",
            update, tag
        )));
    }

    let n = lattice.num_sites();
    let (state, js) = match tag {
        "Ising" => {
            let js = params.couplings("J", "Js", ntypes)?;
            (State::Ising(IsingState::random(n, &mut rng)), js)
        }
        "Potts" => {
            let js = params.couplings("J", "Js", ntypes)?;
            if js.iter().any(|&j| j < 0.0) {
                return Err(Error::invalid("Potts couplings must be non-negative"));
            }
            let q = potts_q(params)?;
            (State::Potts(PottsState::random(q, n, &mut rng)), js)
        }
        "Clock" => {
            let js = params.couplings("J", "Js", ntypes)?;
            let q = params.int("Q")?;
            if q < 2 {
                return Err(Error::invalid(format!("\"Q\" must be at least 2, got {}", q)));
            }
            (State::Clock(ClockState::random(q as usize, n, &mut rng)), js)
        }
        "XY" => {
            let js = params.couplings("J", "Js", ntypes)?;
            (State::Xy(XyState::random(n, &mut rng)), js)
        }
        "QuantumXXZ" => {
            let two_s = if params.contains("S") { params.two_s("S")? } else { 1 };
            let jzs = if params.contains("Jz") || params.contains("Jzs") {
                params.couplings("Jz", "Jzs", ntypes)?
            } else {
                params.couplings("J", "Js", ntypes)?
            };
            let jxys = if params.contains("Jxy") || params.contains("Jxys") {
                params.couplings("Jxy", "Jxys", ntypes)?
            } else {
                vec![0.0; ntypes]
            };
            if jxys.iter().any(|&j| j > 0.0) && !lattice.is_bipartite() {
                return Err(Error::invalid(
                    "antiferromagnetic Jxy on a non-bipartite lattice has a sign problem",
                ));
            }
            let gammas = if params.contains("G") || params.contains("Gs") {
                params.couplings("G", "Gs", lattice.num_site_types())?
            } else {
                vec![0.0; lattice.num_site_types()]
            };
            if gammas.iter().any(|&g| g < 0.0) {
                return Err(Error::invalid("transverse fields must be non-negative"));
            }
            let st = QuantumState::xxz(&lattice, two_s, &jzs, &jxys, &gammas, 1.0, &mut rng);
            (State::Quantum(st), jzs)
        }
        "TFIsing" => {
            let js = params.couplings("J", "Js", ntypes)?;
            let gammas = if params.contains("G") || params.contains("Gs") {
                params.couplings("G", "Gs", lattice.num_site_types())?
            } else {
                vec![0.0; lattice.num_site_types()]
            };
            if gammas.iter().any(|&g| g < 0.0) {
                return Err(Error::invalid("transverse fields must be non-negative"));
            }
            let st = QuantumState::tf_ising(&lattice, &js, &gammas, &mut rng);
            (State::Quantum(st), js)
        }
        other => return Err(Error::invalid(format!("unknown model \"{}\"", other))),
    };

    let info = if quantum {
        SweepInfo::Loop(LoopInfo::default())
    } else {
        SweepInfo::Sw(SwInfo::default())
    };
    debug!(model = tag, sites = n, bonds = lattice.num_bonds(), "model built");
    Ok(Model {
        lattice,
        js,
        update,
        state,
        rng,
        info,
        scratch: Scratch::default(),
    })
}

impl Model {
    pub fn num_sites(&self) -> usize {
        self.lattice.num_sites()
    }

    /// One Monte Carlo sweep at temperature `t`. The per-sweep
    /// byproducts are kept on the model for the estimators.
    pub fn sweep(&mut self, t: f64) -> &SweepInfo {
        let lattice = &self.lattice;
        let js = &self.js;
        let rng = &mut self.rng;
        match (&mut self.state, &mut self.info) {
            (State::Ising(st), SweepInfo::Sw(info)) => match self.update {
                UpdateMethod::Wolff => wolff_ising(lattice, st, js, t, &mut self.scratch.sw, info, rng),
                _ => sw_ising(lattice, st, js, t, &mut self.scratch.sw, info, rng),
            },
            (State::Potts(st), SweepInfo::Sw(info)) => match self.update {
                UpdateMethod::Wolff => wolff_potts(lattice, st, js, t, &mut self.scratch.sw, info, rng),
                _ => sw_potts(lattice, st, js, t, &mut self.scratch.sw, info, rng),
            },
            (State::Clock(st), SweepInfo::Sw(info)) => match self.update {
                UpdateMethod::Wolff => wolff_clock(lattice, st, js, t, &mut self.scratch.sw, info, rng),
                _ => sw_clock(lattice, st, js, t, &mut self.scratch.sw, info, rng),
            },
            (State::Xy(st), SweepInfo::Sw(info)) => match self.update {
                UpdateMethod::Wolff => wolff_xy(lattice, st, js, t, &mut self.scratch.sw, info, rng),
                _ => sw_xy(lattice, st, js, t, &mut self.scratch.sw, info, rng),
            },
            (State::Quantum(st), SweepInfo::Loop(info)) => {
                loop_update(lattice, st, t, &mut self.scratch.lp, info, rng);
            }
            _ => unreachable!("sweep info variant inconsistent with model state"),
        }
        &self.info
    }

    /// Improved (M, M², M⁴, E, E²) densities for the last sweep, or the
    /// direct estimate where the sweep left no usable cluster
    /// aggregates (Wolff).
    pub fn improved_estimate(&self, t: f64) -> Estimate {
        match (&self.state, &self.info) {
            (State::Ising(_), SweepInfo::Sw(info)) if info.improved_ok => {
                estimator::ising_improved(&self.lattice, &self.js, t, info)
            }
            (State::Potts(st), SweepInfo::Sw(info)) if info.improved_ok => {
                estimator::potts_improved(&self.lattice, &self.js, t, st.q, info)
            }
            (State::Clock(st), SweepInfo::Sw(info)) if info.improved_ok => {
                let (m2, m4) = estimator::planar_improved_moments(info, self.num_sites());
                let e = st.energy_density(&self.lattice, &self.js);
                Estimate { m: st.magnetization().norm(), m2, m4, e, e2: e * e }
            }
            (State::Xy(st), SweepInfo::Sw(info)) if info.improved_ok => {
                let (m2, m4) = estimator::planar_improved_moments(info, self.num_sites());
                let e = st.energy_density(&self.lattice, &self.js);
                Estimate { m: st.magnetization().norm(), m2, m4, e, e2: e * e }
            }
            (State::Quantum(st), SweepInfo::Loop(info)) => {
                let (m, m2, m4) = estimator::quantum_moments(info, self.num_sites(), st.mag_unit);
                let (e, e2) = estimator::quantum_energy(st.energy_offset, info.num_ops, t, self.num_sites());
                Estimate { m, m2, m4, e, e2 }
            }
            _ => self.direct_estimate(t),
        }
    }

    /// Plug-in estimate from the current configuration. The temperature
    /// only enters the quantum branch, whose energy estimator reads the
    /// operator count.
    pub fn direct_estimate(&self, t: f64) -> Estimate {
        match &self.state {
            State::Ising(st) => {
                let m = st.magnetization();
                let e = st.energy_density(&self.lattice, &self.js);
                Estimate { m, m2: m * m, m4: m.powi(4), e, e2: e * e }
            }
            State::Potts(st) => {
                let m = st.magnetization();
                let e = st.energy_density(&self.lattice, &self.js);
                Estimate { m, m2: m * m, m4: m.powi(4), e, e2: e * e }
            }
            State::Clock(st) => {
                let m2 = st.magnetization().norm_squared();
                let e = st.energy_density(&self.lattice, &self.js);
                Estimate { m: m2.sqrt(), m2, m4: m2 * m2, e, e2: e * e }
            }
            State::Xy(st) => {
                let m2 = st.magnetization().norm_squared();
                let e = st.energy_density(&self.lattice, &self.js);
                Estimate { m: m2.sqrt(), m2, m4: m2 * m2, e, e2: e * e }
            }
            State::Quantum(st) => {
                let m = st.magnetization();
                match &self.info {
                    SweepInfo::Loop(info) => {
                        let (e, e2) =
                            estimator::quantum_energy(st.energy_offset, info.num_ops, t, self.num_sites());
                        Estimate { m, m2: m * m, m4: m.powi(4), e, e2 }
                    }
                    _ => unreachable!(),
                }
            }
        }
    }

    pub fn last_sweep(&self) -> &SweepInfo {
        &self.info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ising_params() -> Parameter {
        Parameter::new()
            .set("Model", "Ising")
            .set("Lattice", "square")
            .set("L", 8)
            .set("J", 1.0)
            .set("Seed", 42)
    }

    #[test]
    fn build_ising() {
        let model = build_model(&ising_params()).unwrap();
        assert_eq!(model.num_sites(), 64);
        assert_eq!(model.update, UpdateMethod::SwendsenWang);
    }

    #[test]
    fn loop_update_rejected_for_classical() {
        let p = ising_params().set("UpdateMethod", "Loop");
        assert!(build_model(&p).is_err());
    }

    #[test]
    fn negative_potts_coupling_rejected() {
        let p = Parameter::new()
            .set("Model", "Potts")
            .set("Lattice", "square")
            .set("L", 4)
            .set("Q", 3)
            .set("J", -1.0);
        assert!(build_model(&p).is_err());
    }

    #[test]
    fn frustrated_afm_xy_rejected() {
        let p = Parameter::new()
            .set("Model", "QuantumXXZ")
            .set("Lattice", "triangular")
            .set("L", 4)
            .set("Jz", 1.0)
            .set("Jxy", 1.0)
            .set("S", 0.5);
        assert!(build_model(&p).is_err());
    }

    #[test]
    fn reproducible_sweeps() {
        let mut a = build_model(&ising_params()).unwrap();
        let mut b = build_model(&ising_params()).unwrap();
        for _ in 0..16 {
            a.sweep(2.5);
            b.sweep(2.5);
            assert_eq!(a.improved_estimate(2.5), b.improved_estimate(2.5));
        }
    }

    #[test]
    fn wolff_falls_back_to_direct_estimate() {
        let p = ising_params().set("UpdateMethod", "Wolff");
        let mut model = build_model(&p).unwrap();
        model.sweep(2.0);
        let est = model.improved_estimate(2.0);
        let direct = model.direct_estimate(2.0);
        assert_eq!(est, direct);
    }
}
