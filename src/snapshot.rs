//! Flat snapshot of a run: parameter map + configuration, behind a
//! magic/version header. The format is not bit-critical across
//! versions; loading rejects anything but the current version.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::quantum::LocalOperator;
use crate::model::{build_model, Model, State};
use crate::params::Parameter;

const MAGIC: &[u8; 4] = b"SCMC";
const VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
enum StateSnapshot {
    Ising(Vec<i8>),
    Potts(Vec<u8>),
    Clock(Vec<u8>),
    Xy(Vec<f64>),
    Quantum {
        subspins: Vec<i8>,
        ops: Vec<LocalOperator>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotBody {
    params: Parameter,
    state: StateSnapshot,
}

fn capture(model: &Model) -> StateSnapshot {
    match &model.state {
        State::Ising(st) => StateSnapshot::Ising(st.spins.clone()),
        State::Potts(st) => StateSnapshot::Potts(st.spins.clone()),
        State::Clock(st) => StateSnapshot::Clock(st.spins.clone()),
        State::Xy(st) => StateSnapshot::Xy(st.spins.clone()),
        State::Quantum(st) => StateSnapshot::Quantum {
            subspins: st.subspins.clone(),
            ops: st.ops.clone(),
        },
    }
}

pub fn save<P: AsRef<Path>>(path: P, model: &Model, params: &Parameter) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(MAGIC)?;
    w.write_all(&VERSION.to_le_bytes())?;
    let body = SnapshotBody {
        params: params.clone(),
        state: capture(model),
    };
    bincode::serialize_into(&mut w, &body).map_err(|e| Error::Snapshot(e.to_string()))?;
    Ok(())
}

/// Rebuild a model from a snapshot. The configuration is restored
/// verbatim; per-sweep ids inside the operator string are rebuilt on
/// the next sweep.
pub fn load<P: AsRef<Path>>(path: P) -> Result<(Parameter, Model)> {
    let mut r = BufReader::new(File::open(path)?);
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(Error::Snapshot("bad magic".into()));
    }
    let mut ver = [0u8; 4];
    r.read_exact(&mut ver)?;
    let version = u32::from_le_bytes(ver);
    if version != VERSION {
        return Err(Error::Snapshot(format!("unsupported version {}", version)));
    }
    let body: SnapshotBody =
        bincode::deserialize_from(&mut r).map_err(|e| Error::Snapshot(e.to_string()))?;
    let mut model = build_model(&body.params)?;
    restore(&mut model, body.state)?;
    Ok((body.params, model))
}

fn restore(model: &mut Model, snap: StateSnapshot) -> Result<()> {
    let mismatch = || Error::Snapshot("configuration does not match parameters".into());
    match (&mut model.state, snap) {
        (State::Ising(st), StateSnapshot::Ising(spins)) if spins.len() == st.spins.len() => {
            st.spins = spins;
        }
        (State::Potts(st), StateSnapshot::Potts(spins)) if spins.len() == st.spins.len() => {
            if spins.iter().any(|&s| s >= st.q) {
                return Err(mismatch());
            }
            st.spins = spins;
        }
        (State::Clock(st), StateSnapshot::Clock(spins)) if spins.len() == st.spins.len() => {
            if spins.iter().any(|&s| s as usize >= st.q) {
                return Err(mismatch());
            }
            st.spins = spins;
        }
        (State::Xy(st), StateSnapshot::Xy(spins)) if spins.len() == st.spins.len() => {
            st.spins = spins;
        }
        (State::Quantum(st), StateSnapshot::Quantum { subspins, ops })
            if subspins.len() == st.subspins.len() =>
        {
            if ops.iter().any(|op| !(0.0..1.0).contains(&op.time)) {
                return Err(mismatch());
            }
            st.subspins = subspins;
            st.ops = ops;
        }
        _ => return Err(mismatch()),
    }
    Ok(())
}
