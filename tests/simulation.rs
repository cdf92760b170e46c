//! End-to-end runs against known physics: the 2D Ising critical point,
//! ordered/disordered phases, the AFM Heisenberg chain, the critical
//! transverse-field Ising chain, and the statistical identities every
//! estimator must satisfy.

use spin_cluster_mc::params::Parameter;
use spin_cluster_mc::run::run;
use spin_cluster_mc::{build_model, SweepInfo};

const TC_2D: f64 = 2.269185314213022; // 2 / ln(1 + √2)

fn init_tracing() {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();
}

fn ising_square(l: i64, t: f64, mcs: i64, therm: i64, seed: i64) -> Parameter {
    Parameter::new()
        .set("Model", "Ising")
        .set("Lattice", "square")
        .set("L", l)
        .set("J", 1.0)
        .set("T", t)
        .set("MCS", mcs)
        .set("Thermalization", therm)
        .set("Seed", seed)
}

#[test]
fn specific_heat_at_the_critical_point() {
    init_tracing();
    let res = run(&ising_square(16, TC_2D, 8192, 1024, 0)).unwrap();
    let c = res.specific_heat();
    // Finite-size peak of the 16×16 lattice sits near 1.5.
    assert!(c > 1.2 && c < 1.8, "C = {}", c);
}

#[test]
fn ordered_and_disordered_magnetization() {
    let cold = run(&ising_square(16, 2.0, 2048, 512, 1)).unwrap();
    assert!(cold.mean("|Magnetization|") > 0.85);
    let hot = run(&ising_square(16, 3.0, 2048, 512, 2)).unwrap();
    assert!(hot.mean("|Magnetization|") < 0.2);
}

#[test]
fn potts_triangular_orders_at_low_temperature() {
    let p = Parameter::new()
        .set("Model", "Potts")
        .set("Lattice", "triangular")
        .set("L", 12)
        .set("Q", 3)
        .set("J", 1.0)
        .set("T", 0.5)
        .set("MCS", 2048)
        .set("Thermalization", 512)
        .set("Seed", 3);
    let res = run(&p).unwrap();
    // Fully ordered q=3 gives ⟨M²⟩ = (q-1)/q² = 2/9 for the
    // δ(s,0) - 1/q order parameter.
    let m2 = res.mean("Magnetization^2");
    assert!(m2 > 0.19, "M² = {}", m2);
}

#[test]
fn heisenberg_chain_energy_matches_exact_diagonalization() {
    let p = Parameter::new()
        .set("Model", "QuantumXXZ")
        .set("Lattice", "chain")
        .set("L", 8)
        .set("Jz", 1.0)
        .set("Jxy", 1.0)
        .set("S", 0.5)
        .set("T", 0.5)
        .set("MCS", 4096)
        .set("Thermalization", 512)
        .set("Seed", 4);
    let res = run(&p).unwrap();
    let e = res.mean("Energy");
    let sigma = res.stderr("Energy");
    let exact = -0.4432;
    assert!(
        (e - exact).abs() < 3.0 * sigma + 0.03,
        "E = {} ± {}, exact {}",
        e,
        sigma,
        exact
    );
}

#[test]
fn critical_transverse_field_chain() {
    let p = Parameter::new()
        .set("Model", "TFIsing")
        .set("Lattice", "chain")
        .set("L", 16)
        .set("J", 1.0)
        .set("G", 1.0)
        .set("T", 0.05)
        .set("MCS", 1024)
        .set("Thermalization", 256)
        .set("Seed", 5);
    let res = run(&p).unwrap();
    // At Γ = J the chain is critical: the squared order parameter sits
    // well between the disordered O(1/N) floor and the ordered value 1.
    let m2 = res.mean("Magnetization^2");
    assert!(m2 > 0.1 && m2 < 0.8, "M² = {}", m2);
}

#[test]
fn detailed_balance_on_the_two_site_chain() {
    // L=2 chain: two bonds between the two sites. The SW chain must
    // reproduce the Boltzmann weight of the aligned sector,
    // P(aligned) = 1 / (1 + exp(-4β)) at J = 1.
    let p = Parameter::new()
        .set("Model", "Ising")
        .set("Lattice", "chain")
        .set("L", 2)
        .set("J", 1.0)
        .set("Seed", 6);
    let mut model = build_model(&p).unwrap();
    let sweeps = 200_000;
    let mut aligned = 0usize;
    for _ in 0..sweeps {
        model.sweep(1.0);
        if let SweepInfo::Sw(_) = model.last_sweep() {
            let est = model.direct_estimate(1.0);
            if est.m.abs() > 0.5 {
                aligned += 1;
            }
        }
    }
    let frac = aligned as f64 / sweeps as f64;
    let expect = 1.0 / (1.0 + (-4.0f64).exp());
    let sigma = (expect * (1.0 - expect) / sweeps as f64).sqrt();
    assert!(
        (frac - expect).abs() < 5.0 * sigma + 0.003,
        "frac = {}, expect = {}",
        frac,
        expect
    );
}

#[test]
fn magnetization_symmetry_without_field() {
    let res = run(&ising_square(8, 2.5, 4096, 512, 7)).unwrap();
    let m = res.mean("Magnetization");
    let sigma = res.stderr("Magnetization");
    assert!(m.abs() < 4.0 * sigma + 0.01, "⟨M⟩ = {} ± {}", m, sigma);
    assert!(res.mean("Magnetization^2") > 0.0);
}

#[test]
fn improved_energy_matches_direct_energy() {
    let p = ising_square(8, 2.5, 4096, 512, 8);
    let mut model = build_model(&p).unwrap();
    for _ in 0..512 {
        model.sweep(2.5);
    }
    let mut imp = spin_cluster_mc::Accumulator::new();
    let mut dir = spin_cluster_mc::Accumulator::new();
    for _ in 0..4096 {
        model.sweep(2.5);
        imp.push(model.improved_estimate(2.5).e);
        dir.push(model.direct_estimate(2.5).e);
    }
    let sigma = (imp.stderr().powi(2) + dir.stderr().powi(2)).sqrt();
    assert!(
        (imp.mean() - dir.mean()).abs() < 3.0 * sigma + 0.01,
        "improved {} vs direct {}",
        imp.mean(),
        dir.mean()
    );
}

#[test]
fn moment_consistency_across_models() {
    let runs = vec![
        ising_square(8, 2.269, 1024, 256, 9),
        Parameter::new()
            .set("Model", "XY")
            .set("Lattice", "square")
            .set("L", 8)
            .set("J", 1.0)
            .set("T", 1.0)
            .set("MCS", 1024)
            .set("Thermalization", 256)
            .set("Seed", 10),
        Parameter::new()
            .set("Model", "Clock")
            .set("Lattice", "square")
            .set("L", 8)
            .set("Q", 6)
            .set("J", 1.0)
            .set("T", 1.0)
            .set("MCS", 1024)
            .set("Thermalization", 256)
            .set("Seed", 11),
        Parameter::new()
            .set("Model", "QuantumXXZ")
            .set("Lattice", "chain")
            .set("L", 8)
            .set("Jz", 1.0)
            .set("Jxy", 1.0)
            .set("S", 0.5)
            .set("T", 1.0)
            .set("MCS", 1024)
            .set("Thermalization", 256)
            .set("Seed", 12),
    ];
    for p in runs {
        let res = run(&p).unwrap();
        let m = res.mean("Magnetization");
        let m2 = res.mean("Magnetization^2");
        let m4 = res.mean("Magnetization^4");
        assert!(m2 >= m * m - 1e-9, "{:?}", p);
        assert!(m4 >= m2 * m2 - 3.0 * res.stderr("Magnetization^4") - 1e-9, "{:?}", p);
    }
}

#[test]
fn wolff_and_sw_agree_on_the_energy() {
    let sw = run(&ising_square(8, 2.5, 4096, 512, 13)).unwrap();
    let wolff = run(&ising_square(8, 2.5, 16384, 2048, 14).set("UpdateMethod", "Wolff")).unwrap();
    let sigma = (sw.stderr("Energy").powi(2) + wolff.stderr("Energy").powi(2)).sqrt();
    assert!(
        (sw.mean("Energy") - wolff.mean("Energy")).abs() < 4.0 * sigma + 0.02,
        "SW {} vs Wolff {}",
        sw.mean("Energy"),
        wolff.mean("Energy")
    );
}
