//! Error-correction algorithm
//!
//! Removes systematic measurement error from a raw scan using the traces
//! in a [`CalibrationSet`]. Reflection parameters (S11/S22) use a
//! three-standard short/open/load de-embedding; transmission parameters
//! (S21/S12) use a two-standard open/through ratio. Both are applied
//! independently, per frequency point.

use std::collections::BTreeMap;

use ndarray::Array1;
use num_complex::Complex64;
use thiserror::Error;

use crate::calibration::dataset::{CalSlot, CalibrationSet};
use crate::constants::{NEAR_ZERO, Z0_REL_TOL};
use crate::network::{NetworkError, SNetwork};
use crate::params::SParam;

/// Correction failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorrectionError {
    #[error("frequency sequences of calibration data and measurement differ")]
    FrequencyMismatch,

    #[error("reference impedance mismatch: calibration {cal}, measurement {raw}")]
    ImpedanceMismatch { cal: f64, raw: f64 },

    #[error("trace length mismatch: expected {expected} samples, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("degenerate standards at frequency index {index}")]
    Degenerate { index: usize },

    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Impedance seen by a reflection coefficient against `z0`:
/// `Z = z0 * (1 + gamma) / (1 - gamma)`.
pub fn gamma_to_z(gamma: Complex64, z0: f64) -> Complex64 {
    z0 * (1.0 + gamma) / (1.0 - gamma)
}

/// Reflection coefficient of an impedance against `z0`:
/// `gamma = (Z - z0) / (Z + z0)`.
pub fn z_to_gamma(z: Complex64, z0: f64) -> Complex64 {
    (z - z0) / (z + z0)
}

/// Three-standard reflection de-embedding for one frequency point.
///
/// The short/open/load correction is the impedance-domain quotient
///
/// ```text
/// Z_dut = z0 * (Z_open - Z_load)(Z_raw - Z_short)
///              ---------------------------------
///              (Z_load - Z_short)(Z_open - Z_raw)
/// ```
///
/// mapped back through `Z -> gamma`. The quotient is a multi-ratio of
/// impedance differences, invariant under the bilinear gamma <-> Z map,
/// so it is evaluated directly over reflection coefficients: the
/// reference impedance cancels and an ideal open (gamma = 1, infinite
/// impedance) stays finite.
///
/// Returns `None` when the inputs are degenerate: load and short
/// coincide, open and raw coincide, or the corrected impedance sits at
/// the pole of the inverse map.
pub fn reflection_point(
    raw: Complex64,
    short: Complex64,
    open: Complex64,
    load: Complex64,
) -> Option<Complex64> {
    let load_short = load - short;
    let open_raw = open - raw;
    if load_short.norm() < NEAR_ZERO || open_raw.norm() < NEAR_ZERO {
        return None;
    }
    let ratio = ((open - load) * (raw - short)) / (load_short * open_raw);
    let denom = ratio + 1.0;
    if denom.norm() < NEAR_ZERO {
        return None;
    }
    Some((ratio - 1.0) / denom)
}

/// Two-standard transmission de-embedding for one frequency point:
/// `S_dut = (S_raw - S_open) / (S_thru - S_open)`.
///
/// Returns `None` when through and open coincide.
pub fn transmission_point(raw: Complex64, open: Complex64, thru: Complex64) -> Option<Complex64> {
    let denom = thru - open;
    if denom.norm() < NEAR_ZERO {
        return None;
    }
    Some((raw - open) / denom)
}

/// Reflection de-embedding over whole traces.
pub fn calibrate_reflection(
    raw: &Array1<Complex64>,
    short: &Array1<Complex64>,
    open: &Array1<Complex64>,
    load: &Array1<Complex64>,
) -> Result<Array1<Complex64>, CorrectionError> {
    for other in [short, open, load] {
        check_len(raw.len(), other.len())?;
    }
    let mut out = Array1::zeros(raw.len());
    for i in 0..raw.len() {
        out[i] = reflection_point(raw[i], short[i], open[i], load[i])
            .ok_or(CorrectionError::Degenerate { index: i })?;
    }
    Ok(out)
}

/// Transmission de-embedding over whole traces.
pub fn calibrate_transmission(
    raw: &Array1<Complex64>,
    open: &Array1<Complex64>,
    thru: &Array1<Complex64>,
) -> Result<Array1<Complex64>, CorrectionError> {
    for other in [open, thru] {
        check_len(raw.len(), other.len())?;
    }
    let mut out = Array1::zeros(raw.len());
    for i in 0..raw.len() {
        out[i] = transmission_point(raw[i], open[i], thru[i])
            .ok_or(CorrectionError::Degenerate { index: i })?;
    }
    Ok(out)
}

fn check_len(expected: usize, got: usize) -> Result<(), CorrectionError> {
    if expected != got {
        return Err(CorrectionError::LengthMismatch { expected, got });
    }
    Ok(())
}

fn slot_trace<'a>(
    cal: &'a CalibrationSet,
    slot: CalSlot,
    npoints: usize,
) -> Result<&'a Array1<Complex64>, CorrectionError> {
    // ready_for has already established presence
    let trace = cal
        .slot(slot)
        .ok_or(CorrectionError::LengthMismatch {
            expected: npoints,
            got: 0,
        })?;
    check_len(npoints, trace.len())?;
    Ok(trace)
}

/// Apply a calibration dataset to a raw measurement.
///
/// Preconditions are checked before any per-point math: the frequency
/// sequences must be identical and the reference impedances equal within
/// a small relative tolerance. Each parameter that is both ready in the
/// dataset and present in the raw network is corrected; the result
/// carries exactly those traces, over the same sweep and z0.
pub fn apply(cal: &CalibrationSet, raw: &SNetwork) -> Result<SNetwork, CorrectionError> {
    if cal.frequencies() != raw.frequencies() {
        return Err(CorrectionError::FrequencyMismatch);
    }
    if (cal.z0() - raw.z0()).abs() > raw.z0() * Z0_REL_TOL {
        return Err(CorrectionError::ImpedanceMismatch {
            cal: cal.z0(),
            raw: raw.z0(),
        });
    }

    let n = raw.npoints();
    let mut corrected = BTreeMap::new();

    for (param, standards) in [
        (
            SParam::S11,
            (CalSlot::ShortS11, CalSlot::OpenS11, CalSlot::LoadS11),
        ),
        (
            SParam::S22,
            (CalSlot::ShortS22, CalSlot::OpenS22, CalSlot::LoadS22),
        ),
    ] {
        if let (true, Some(trace)) = (cal.ready_for(param), raw.get(param)) {
            let (short, open, load) = standards;
            let out = calibrate_reflection(
                trace,
                slot_trace(cal, short, n)?,
                slot_trace(cal, open, n)?,
                slot_trace(cal, load, n)?,
            )?;
            corrected.insert(param, out);
        }
    }

    for (param, standards) in [
        (SParam::S21, (CalSlot::OpenS21, CalSlot::ThruS21)),
        (SParam::S12, (CalSlot::OpenS12, CalSlot::ThruS12)),
    ] {
        if let (true, Some(trace)) = (cal.ready_for(param), raw.get(param)) {
            let (open, thru) = standards;
            let out = calibrate_transmission(
                trace,
                slot_trace(cal, open, n)?,
                slot_trace(cal, thru, n)?,
            )?;
            corrected.insert(param, out);
        }
    }

    Ok(SNetwork::new(
        raw.frequencies().to_vec(),
        raw.z0(),
        corrected,
    )?)
}
