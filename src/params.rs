//! The name→value parameter map consumed by [`build_model`] and the
//! simulation driver.
//!
//! Recognized keys: `"Model"`, `"Lattice"`, `"L"`, `"W"`, `"H"`, `"T"`,
//! `"J"`/`"Js"`, `"Q"`, `"S"`, `"Gs"`, `"Jxys"`, `"UpdateMethod"`,
//! `"MCS"`, `"Thermalization"`, `"Seed"`.
//!
//! [`build_model`]: crate::model::build_model

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Floats(Vec<f64>),
}

impl From<i64> for Value {
    fn from(v: i64) -> Value {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Str(v.to_owned())
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Value {
        Value::Floats(v)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Parameter {
    entries: HashMap<String, Value>,
}

impl Parameter {
    pub fn new() -> Parameter {
        Parameter::default()
    }

    pub fn set<V: Into<Value>>(mut self, key: &str, value: V) -> Parameter {
        self.entries.insert(key.to_owned(), value.into());
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn get(&self, key: &str) -> Result<&Value> {
        self.entries
            .get(key)
            .ok_or_else(|| Error::invalid(format!("missing key \"{}\"", key)))
    }

    pub fn tag(&self, key: &str) -> Result<&str> {
        match self.get(key)? {
            Value::Str(s) => Ok(s),
            other => Err(Error::invalid(format!(
                "\"{}\" must be a tag, got {:?}",
                key, other
            ))),
        }
    }

    pub fn int(&self, key: &str) -> Result<i64> {
        match self.get(key)? {
            Value::Int(v) => Ok(*v),
            Value::Float(v) if v.fract() == 0.0 => Ok(*v as i64),
            other => Err(Error::invalid(format!(
                "\"{}\" must be an integer, got {:?}",
                key, other
            ))),
        }
    }

    pub fn int_or(&self, key: &str, default: i64) -> Result<i64> {
        if self.contains(key) {
            self.int(key)
        } else {
            Ok(default)
        }
    }

    pub fn extent(&self, key: &str) -> Result<usize> {
        let v = self.int(key)?;
        if v < 1 {
            return Err(Error::invalid(format!("\"{}\" must be positive, got {}", key, v)));
        }
        Ok(v as usize)
    }

    pub fn float(&self, key: &str) -> Result<f64> {
        match self.get(key)? {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            other => Err(Error::invalid(format!(
                "\"{}\" must be a number, got {:?}",
                key, other
            ))),
        }
    }

    pub fn float_or(&self, key: &str, default: f64) -> Result<f64> {
        if self.contains(key) {
            self.float(key)
        } else {
            Ok(default)
        }
    }

    /// Per-bond-type (or per-site-type) coupling vector. A scalar under
    /// `scalar_key` broadcasts to every type; a vector under `vec_key`
    /// must carry exactly `ntypes` entries.
    pub fn couplings(&self, scalar_key: &str, vec_key: &str, ntypes: usize) -> Result<Vec<f64>> {
        if self.contains(vec_key) {
            match self.get(vec_key)? {
                Value::Floats(v) if v.len() == ntypes => Ok(v.clone()),
                Value::Floats(v) => Err(Error::invalid(format!(
                    "\"{}\" must have {} entries, got {}",
                    vec_key,
                    ntypes,
                    v.len()
                ))),
                Value::Float(v) => Ok(vec![*v; ntypes]),
                Value::Int(v) => Ok(vec![*v as f64; ntypes]),
                other => Err(Error::invalid(format!(
                    "\"{}\" must be numeric, got {:?}",
                    vec_key, other
                ))),
            }
        } else {
            Ok(vec![self.float(scalar_key)?; ntypes])
        }
    }

    /// Spin length `S` as the sub-spin multiplicity `2S`. `S` must be a
    /// positive integer or half-integer.
    pub fn two_s(&self, key: &str) -> Result<usize> {
        let s = self.float(key)?;
        let two_s = 2.0 * s;
        if two_s < 1.0 || (two_s - two_s.round()).abs() > 1e-12 {
            return Err(Error::invalid(format!(
                "\"{}\" must be a positive integer or half-integer, got {}",
                key, s
            )));
        }
        Ok(two_s.round() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters() {
        let p = Parameter::new()
            .set("Model", "Ising")
            .set("L", 8)
            .set("T", 2.269)
            .set("Js", vec![1.0, 0.5]);
        assert_eq!(p.tag("Model").unwrap(), "Ising");
        assert_eq!(p.extent("L").unwrap(), 8);
        assert!((p.float("T").unwrap() - 2.269).abs() < 1e-15);
        assert_eq!(p.couplings("J", "Js", 2).unwrap(), vec![1.0, 0.5]);
    }

    #[test]
    fn scalar_coupling_broadcasts() {
        let p = Parameter::new().set("J", 1.0);
        assert_eq!(p.couplings("J", "Js", 3).unwrap(), vec![1.0; 3]);
    }

    #[test]
    fn missing_key_is_invalid_parameter() {
        let p = Parameter::new();
        assert!(matches!(p.float("T"), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn half_integer_spin() {
        let p = Parameter::new().set("S", 1.5).set("Sbad", 0.3);
        assert_eq!(p.two_s("S").unwrap(), 3);
        assert!(p.two_s("Sbad").is_err());
    }
}
