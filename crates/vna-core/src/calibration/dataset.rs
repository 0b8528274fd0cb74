//! Calibration dataset
//!
//! Per-standard, per-parameter traces collected against the SOLT
//! standards, plus the sweep they were taken over. Only ten
//! (standard, parameter) combinations exist: short/open/load against the
//! reflection parameters S11 and S22, open/through against the
//! transmission parameters S21 and S12.

use std::fmt;

use ndarray::Array1;
use num_complex::Complex64;
use thiserror::Error;

use crate::params::{ParamSet, SParam};

/// Physical calibration standard fitted to a port during collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalStandard {
    Short,
    Open,
    Load,
    Through,
}

impl CalStandard {
    pub fn name(self) -> &'static str {
        match self {
            CalStandard::Short => "short",
            CalStandard::Open => "open",
            CalStandard::Load => "load",
            CalStandard::Through => "through",
        }
    }
}

impl fmt::Display for CalStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the ten valid (standard, parameter) combinations.
///
/// Listed in the order the dump format serializes them. Constructing a
/// slot from a pair is the single validation point for the combination;
/// there is no lookup that can fail later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalSlot {
    ShortS11,
    OpenS11,
    LoadS11,
    ShortS22,
    OpenS22,
    LoadS22,
    OpenS21,
    ThruS21,
    OpenS12,
    ThruS12,
}

impl CalSlot {
    /// All slots in dump order.
    pub const ALL: [CalSlot; 10] = [
        CalSlot::ShortS11,
        CalSlot::OpenS11,
        CalSlot::LoadS11,
        CalSlot::ShortS22,
        CalSlot::OpenS22,
        CalSlot::LoadS22,
        CalSlot::OpenS21,
        CalSlot::ThruS21,
        CalSlot::OpenS12,
        CalSlot::ThruS12,
    ];

    /// Map a (standard, parameter) pair onto its slot.
    pub fn for_pair(standard: CalStandard, param: SParam) -> Option<CalSlot> {
        match (standard, param) {
            (CalStandard::Short, SParam::S11) => Some(CalSlot::ShortS11),
            (CalStandard::Open, SParam::S11) => Some(CalSlot::OpenS11),
            (CalStandard::Load, SParam::S11) => Some(CalSlot::LoadS11),
            (CalStandard::Short, SParam::S22) => Some(CalSlot::ShortS22),
            (CalStandard::Open, SParam::S22) => Some(CalSlot::OpenS22),
            (CalStandard::Load, SParam::S22) => Some(CalSlot::LoadS22),
            (CalStandard::Open, SParam::S21) => Some(CalSlot::OpenS21),
            (CalStandard::Through, SParam::S21) => Some(CalSlot::ThruS21),
            (CalStandard::Open, SParam::S12) => Some(CalSlot::OpenS12),
            (CalStandard::Through, SParam::S12) => Some(CalSlot::ThruS12),
            _ => None,
        }
    }

    /// Standard half of the pair.
    pub fn standard(self) -> CalStandard {
        match self {
            CalSlot::ShortS11 | CalSlot::ShortS22 => CalStandard::Short,
            CalSlot::OpenS11 | CalSlot::OpenS22 | CalSlot::OpenS21 | CalSlot::OpenS12 => {
                CalStandard::Open
            }
            CalSlot::LoadS11 | CalSlot::LoadS22 => CalStandard::Load,
            CalSlot::ThruS21 | CalSlot::ThruS12 => CalStandard::Through,
        }
    }

    /// Parameter half of the pair.
    pub fn param(self) -> SParam {
        match self {
            CalSlot::ShortS11 | CalSlot::OpenS11 | CalSlot::LoadS11 => SParam::S11,
            CalSlot::ShortS22 | CalSlot::OpenS22 | CalSlot::LoadS22 => SParam::S22,
            CalSlot::OpenS21 | CalSlot::ThruS21 => SParam::S21,
            CalSlot::OpenS12 | CalSlot::ThruS12 => SParam::S12,
        }
    }

    fn index(self) -> usize {
        match self {
            CalSlot::ShortS11 => 0,
            CalSlot::OpenS11 => 1,
            CalSlot::LoadS11 => 2,
            CalSlot::ShortS22 => 3,
            CalSlot::OpenS22 => 4,
            CalSlot::LoadS22 => 5,
            CalSlot::OpenS21 => 6,
            CalSlot::ThruS21 => 7,
            CalSlot::OpenS12 => 8,
            CalSlot::ThruS12 => 9,
        }
    }
}

/// Dataset mutation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("no calibration slot for the {standard} standard on {param}")]
    InvalidPair {
        standard: CalStandard,
        param: SParam,
    },
}

/// Calibration traces for the ten SOLT slots.
///
/// Built up incrementally by the collection workflow: traces land first,
/// the shared sweep and reference impedance are stamped when collection
/// completes. Persisted and restored by [`crate::calibration::dump`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CalibrationSet {
    slots: [Option<Array1<Complex64>>; 10],
    frequencies: Vec<u64>,
    z0: f64,
    supported: ParamSet,
}

impl CalibrationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `trace` for the (standard, parameter) pair.
    ///
    /// Fails without mutating if the pair is not one of the ten valid
    /// combinations.
    pub fn set(
        &mut self,
        standard: CalStandard,
        param: SParam,
        trace: Array1<Complex64>,
    ) -> Result<(), CalibrationError> {
        let slot = CalSlot::for_pair(standard, param)
            .ok_or(CalibrationError::InvalidPair { standard, param })?;
        self.slots[slot.index()] = Some(trace);
        Ok(())
    }

    /// Trace stored in `slot`, if any.
    pub fn slot(&self, slot: CalSlot) -> Option<&Array1<Complex64>> {
        self.slots[slot.index()].as_ref()
    }

    pub(crate) fn put(&mut self, slot: CalSlot, trace: Array1<Complex64>) {
        self.slots[slot.index()] = Some(trace);
    }

    /// Stamp the sweep and reference impedance the traces were taken over.
    pub fn set_sweep(&mut self, frequencies: Vec<u64>, z0: f64) {
        self.frequencies = frequencies;
        self.z0 = z0;
    }

    /// Record the parameter set the source device reported as supported.
    pub fn set_supported(&mut self, supported: ParamSet) {
        self.supported = supported;
    }

    #[inline]
    pub fn frequencies(&self) -> &[u64] {
        &self.frequencies
    }

    #[inline]
    pub fn z0(&self) -> f64 {
        self.z0
    }

    #[inline]
    pub fn supported(&self) -> ParamSet {
        self.supported
    }

    fn has(&self, slot: CalSlot) -> bool {
        self.slot(slot).is_some()
    }

    /// Whether enough traces are present to correct `param`.
    ///
    /// Reflection parameters need their three reflection standards.
    /// S21 additionally requires S11 readiness, and S12 requires S21
    /// readiness (hence, transitively, S11): the transmission chain
    /// reuses the reflection calibration of the driving port as a
    /// prerequisite flag. That coupling is inherited behavior, kept
    /// as-is pending product clarification.
    pub fn ready_for(&self, param: SParam) -> bool {
        match param {
            SParam::S11 => {
                self.has(CalSlot::ShortS11) && self.has(CalSlot::OpenS11) && self.has(CalSlot::LoadS11)
            }
            SParam::S22 => {
                self.has(CalSlot::ShortS22) && self.has(CalSlot::OpenS22) && self.has(CalSlot::LoadS22)
            }
            SParam::S21 => {
                self.has(CalSlot::OpenS21)
                    && self.has(CalSlot::ThruS21)
                    && self.ready_for(SParam::S11)
            }
            SParam::S12 => {
                self.has(CalSlot::OpenS12)
                    && self.has(CalSlot::ThruS12)
                    && self.ready_for(SParam::S21)
            }
            _ => false,
        }
    }
}
