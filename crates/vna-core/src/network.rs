//! Measured S-parameter networks
//!
//! An [`SNetwork`] is the atomic result of one scan or one whole-network
//! calibration: a frequency sweep, a reference impedance, and one complex
//! trace per measured parameter. Parameters that were not requested have
//! no trace. A network is validated at construction and immutable
//! afterwards.

use std::collections::BTreeMap;

use ndarray::Array1;
use num_complex::Complex64;
use thiserror::Error;

use crate::params::{ParamSet, SParam};

/// Network construction errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("frequency sequence is empty")]
    EmptyFrequencies,

    #[error("reference impedance must be positive, got {0}")]
    NonPositiveZ0(f64),

    #[error("trace for {param} has {got} samples, expected {expected}")]
    LengthMismatch {
        param: SParam,
        got: usize,
        expected: usize,
    },
}

/// Frequency-indexed set of measured S-parameter traces.
#[derive(Debug, Clone, PartialEq)]
pub struct SNetwork {
    frequencies: Vec<u64>,
    z0: f64,
    traces: BTreeMap<SParam, Array1<Complex64>>,
}

impl SNetwork {
    /// Assemble a network from its parts.
    ///
    /// Fails if the frequency sequence is empty, z0 is not positive, or
    /// any trace length differs from the number of frequency points.
    pub fn new(
        frequencies: Vec<u64>,
        z0: f64,
        traces: BTreeMap<SParam, Array1<Complex64>>,
    ) -> Result<Self, NetworkError> {
        if frequencies.is_empty() {
            return Err(NetworkError::EmptyFrequencies);
        }
        if !(z0 > 0.0) {
            return Err(NetworkError::NonPositiveZ0(z0));
        }
        for (&param, trace) in &traces {
            if trace.len() != frequencies.len() {
                return Err(NetworkError::LengthMismatch {
                    param,
                    got: trace.len(),
                    expected: frequencies.len(),
                });
            }
        }
        Ok(Self {
            frequencies,
            z0,
            traces,
        })
    }

    /// Frequency sweep in hertz.
    #[inline]
    pub fn frequencies(&self) -> &[u64] {
        &self.frequencies
    }

    /// Reference impedance.
    #[inline]
    pub fn z0(&self) -> f64 {
        self.z0
    }

    /// Number of frequency points.
    #[inline]
    pub fn npoints(&self) -> usize {
        self.frequencies.len()
    }

    /// Trace for `param`, if it was measured.
    pub fn get(&self, param: SParam) -> Option<&Array1<Complex64>> {
        self.traces.get(&param)
    }

    /// Set of parameters that have a trace.
    pub fn params(&self) -> ParamSet {
        self.traces.keys().copied().collect()
    }
}
