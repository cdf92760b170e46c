//! Running statistics for the measurement stream.

use std::collections::BTreeMap;

use num_traits::Zero;

/// Welford mean / standard-error accumulator.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    count: u64,
    mean: f64,
    m2: f64,
}

impl Accumulator {
    pub fn new() -> Accumulator {
        Accumulator::default()
    }

    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            return Zero::zero();
        }
        self.m2 / (self.count - 1) as f64
    }

    /// Standard error of the mean, assuming independent samples.
    pub fn stderr(&self) -> f64 {
        (self.variance() / self.count.max(1) as f64).sqrt()
    }
}

/// A keyed set of accumulators, one per observable name.
#[derive(Debug, Clone, Default)]
pub struct Observer {
    series: BTreeMap<String, Accumulator>,
}

impl Observer {
    pub fn new() -> Observer {
        Observer::default()
    }

    pub fn push(&mut self, name: &str, x: f64) {
        if let Some(acc) = self.series.get_mut(name) {
            acc.push(x);
        } else {
            self.series.entry(name.to_owned()).or_default().push(x);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Accumulator> {
        self.series.get(name)
    }

    pub fn mean(&self, name: &str) -> f64 {
        self.series.get(name).map_or(f64::NAN, Accumulator::mean)
    }

    pub fn stderr(&self, name: &str) -> f64 {
        self.series.get(name).map_or(f64::NAN, Accumulator::stderr)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_stderr_of_constant_series() {
        let mut acc = Accumulator::new();
        for _ in 0..100 {
            acc.push(3.5);
        }
        assert!((acc.mean() - 3.5).abs() < 1e-12);
        assert!(acc.stderr() < 1e-12);
    }

    #[test]
    fn stderr_shrinks_with_samples() {
        let mut small = Accumulator::new();
        let mut large = Accumulator::new();
        for i in 0..1000 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            if i < 10 {
                small.push(x);
            }
            large.push(x);
        }
        assert!(large.stderr() < small.stderr());
    }
}
