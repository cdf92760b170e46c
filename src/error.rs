use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed entry in the parameter map. Fatal to the run.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A coupling/temperature combination produced an activation
    /// probability outside [0,1]. The caller clamps and continues.
    #[error("degenerate activation probability {p} for bond type {bond_type}")]
    NumericalDegenerate { bond_type: usize, p: f64 },

    #[error("snapshot format error: {0}")]
    Snapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid<S: Into<String>>(msg: S) -> Error {
        Error::InvalidParameter(msg.into())
    }
}
