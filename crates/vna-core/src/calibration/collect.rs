//! Calibration collection workflow
//!
//! Walks the operator through fitting SOLT standards and takes one scan
//! per task. Tasks run strictly in order; any scan failure aborts the
//! whole run and no partial dataset escapes. Which tasks run depends on
//! the calibration kit at hand: a single-port kit calibrates one port at
//! a time, a two-port kit fits matched standards to both ports at once.

use log::debug;
use thiserror::Error;

use crate::calibration::dataset::{CalStandard, CalibrationError, CalibrationSet};
use crate::device::{DeviceError, ProgressFn, Session, Transport};
use crate::params::{ParamSet, SParam};

/// Calibration-kit inventory the operator has at hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalKit {
    /// One short/open/load set, fitted to one port at a time.
    SinglePort,
    /// Matched short/open/load pairs for both ports at once.
    TwoPort,
}

/// One step of the collection sequence: a prompt for the operator, the
/// standard being fitted, and the parameters to scan while it is fitted.
#[derive(Debug, Clone)]
pub struct CalTask {
    pub prompt: &'static str,
    pub standard: CalStandard,
    pub params: ParamSet,
}

impl CalTask {
    fn new(prompt: &'static str, standard: CalStandard, params: &[SParam]) -> Self {
        Self {
            prompt,
            standard,
            params: ParamSet::of(params),
        }
    }
}

/// Operator confirmation hook, polled before each task's scan.
pub trait Confirmer {
    /// Present `prompt` and block until the operator confirms (true) or
    /// declines (false).
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirmer for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Collection failures
#[derive(Error, Debug)]
pub enum CollectError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("operator declined: {0}")]
    Declined(&'static str),

    #[error("scan returned no trace for {0}")]
    MissingTrace(SParam),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}

/// Ordered task list for `kit`.
pub fn tasks_for(kit: CalKit) -> Vec<CalTask> {
    use CalStandard::{Load, Open, Short, Through};
    use SParam::{S11, S12, S21, S22};

    match kit {
        CalKit::SinglePort => vec![
            CalTask::new("Connect SHORT to Port-1, then confirm to take short S11", Short, &[S11]),
            CalTask::new("Connect OPEN to Port-1, then confirm to take open S11", Open, &[S11]),
            CalTask::new("Connect LOAD to Port-1, then confirm to take load S11", Load, &[S11]),
            CalTask::new("Connect SHORT to Port-2, then confirm to take short S22", Short, &[S22]),
            CalTask::new("Connect OPEN to Port-2, then confirm to take open S22", Open, &[S22]),
            CalTask::new("Connect LOAD to Port-2, then confirm to take load S22", Load, &[S22]),
            CalTask::new(
                "Leave Port-1 and Port-2 open, then confirm to take the transmission open",
                Open,
                &[S21, S12],
            ),
            CalTask::new(
                "Connect Port-1 and Port-2 with a coaxial cable, then confirm to take the thru",
                Through,
                &[S21, S12],
            ),
        ],
        CalKit::TwoPort => vec![
            CalTask::new(
                "Connect SHORT to Port-1 and to Port-2, then confirm to take the shorts",
                Short,
                &[S11, S22],
            ),
            CalTask::new(
                "Connect OPEN to Port-1 and to Port-2, then confirm to take the opens",
                Open,
                &[S11, S22],
            ),
            CalTask::new(
                "Connect LOAD to Port-1 and to Port-2, then confirm to take the loads",
                Load,
                &[S11, S22],
            ),
            CalTask::new(
                "Leave Port-1 and Port-2 open, then confirm to take the transmission open",
                Open,
                &[S21, S12],
            ),
            CalTask::new(
                "Connect Port-1 and Port-2 with a coaxial cable, then confirm to take the thru",
                Through,
                &[S21, S12],
            ),
        ],
    }
}

/// Run the collection sequence for `kit` over `session`.
///
/// Each task asks `confirmer` for the go-ahead, scans its parameter set
/// across `frequencies` with `on_progress`, and distributes the
/// resulting traces into the dataset. The first failure (device gone,
/// transport error, operator decline) aborts the run. On success the
/// dataset carries the sweep, the session's reference impedance and the
/// device's supported-parameter set.
pub fn collect<T: Transport>(
    session: &mut Session<T>,
    frequencies: &[u64],
    average: u16,
    kit: CalKit,
    confirmer: &mut dyn Confirmer,
    on_progress: &mut ProgressFn<'_>,
) -> Result<CalibrationSet, CollectError> {
    let mut taken = CalibrationSet::new();
    taken.set_supported(session.supported());

    for task in tasks_for(kit) {
        if !confirmer.confirm(task.prompt) {
            return Err(CollectError::Declined(task.prompt));
        }
        debug!(
            "collect: scanning {} standard over {}",
            task.standard, task.params
        );
        let net = session.scan(frequencies, average, task.params, on_progress)?;
        for param in task.params.iter() {
            let trace = net
                .get(param)
                .cloned()
                .ok_or(CollectError::MissingTrace(param))?;
            taken.set(task.standard, param, trace)?;
        }
    }

    taken.set_sweep(frequencies.to_vec(), session.z0());
    debug!("collect: calibration data taken over {} points", frequencies.len());
    Ok(taken)
}
