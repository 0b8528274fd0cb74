//! Simulated transport
//!
//! Deterministic in-memory [`Transport`] implementation: traces come
//! from a caller-supplied sample function, the progress callback is
//! invoked per frequency point exactly like the real driver, and
//! failures can be scripted per scan. Used by the test suite and for
//! offline development without hardware.

use std::cell::Cell;
use std::rc::Rc;

use num_complex::Complex64;

use crate::device::{
    DeviceDescriptor, Driver, InterfaceCode, ProgressFn, Properties, ResultCode, ScanTraces,
    Transport, Verdict,
};
use crate::params::{ParamSet, SParam};
use crate::sweep::FrequencyRange;

/// In-memory stand-in for a real device handle.
pub struct SimTransport {
    properties: Properties,
    sample: Box<dyn FnMut(SParam, u64) -> Complex64>,
    fail_on: Option<(usize, ResultCode)>,
    scans: usize,
    released: Rc<Cell<bool>>,
}

impl SimTransport {
    /// Simulator with explicit properties; `sample(param, hz)` supplies
    /// each measured point.
    pub fn new(
        properties: Properties,
        sample: impl FnMut(SParam, u64) -> Complex64 + 'static,
    ) -> Self {
        Self {
            properties,
            sample: Box::new(sample),
            fail_on: None,
            scans: 0,
            released: Rc::new(Cell::new(false)),
        }
    }

    /// Two-port simulator: supports S11/S21/S12/S22 at the given z0,
    /// with plausible frequency ranges.
    pub fn two_port(z0: f64, sample: impl FnMut(SParam, u64) -> Complex64 + 'static) -> Self {
        Self::new(
            Properties {
                z0,
                supported: ParamSet::of(&[SParam::S11, SParam::S21, SParam::S12, SParam::S22]),
                valid_range: FrequencyRange::new(1_000, 6_000_000_000),
                reasonable_range: FrequencyRange::new(500_000, 4_000_000_000),
            },
            sample,
        )
    }

    /// Script the `nth` scan (1-based) to fail with `code` instead of
    /// producing data.
    pub fn fail_scan(mut self, nth: usize, code: ResultCode) -> Self {
        self.fail_on = Some((nth, code));
        self
    }

    /// Shared flag that flips to true when the handle is released.
    pub fn released_flag(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.released)
    }

    /// Enumeration entry the simulator would appear under.
    pub fn descriptor() -> DeviceDescriptor {
        DeviceDescriptor {
            serial_number: "SIMULATOR".to_string(),
            manufacturer: "vna-core".to_string(),
            product: "simulated two-port analyzer".to_string(),
            release_number: 0x100,
            vid: 0x100,
            pid: 0x100,
            interface: InterfaceCode::Hid,
        }
    }
}

impl std::fmt::Debug for SimTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimTransport")
            .field("properties", &self.properties)
            .field("fail_on", &self.fail_on)
            .field("scans", &self.scans)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl Transport for SimTransport {
    fn properties(&mut self) -> Result<Properties, ResultCode> {
        if self.released.get() {
            return Err(ResultCode::InvalidHandle);
        }
        Ok(self.properties)
    }

    fn scan(
        &mut self,
        frequencies: &[u64],
        _average: u16,
        params: ParamSet,
        on_progress: &mut ProgressFn<'_>,
    ) -> Result<ScanTraces, ResultCode> {
        if self.released.get() {
            return Err(ResultCode::InvalidHandle);
        }
        self.scans += 1;
        if let Some((nth, code)) = self.fail_on {
            if self.scans == nth {
                return Err(code);
            }
        }

        let total = frequencies.len();
        let mut traces: ScanTraces = params
            .iter()
            .map(|p| (p, ndarray::Array1::zeros(total)))
            .collect();
        for (i, &hz) in frequencies.iter().enumerate() {
            for p in params.iter() {
                if let Some(trace) = traces.get_mut(&p) {
                    trace[i] = (self.sample)(p, hz);
                }
            }
            if on_progress(total, i) == Verdict::Cancel {
                return Err(ResultCode::ScanCanceled);
            }
        }
        Ok(traces)
    }

    fn close(&mut self) {
        self.released.set(true);
    }
}

/// Driver that enumerates exactly one simulated device.
pub struct SimDriver;

impl Driver for SimDriver {
    type Transport = SimTransport;

    fn list(&mut self) -> Result<Vec<DeviceDescriptor>, ResultCode> {
        Ok(vec![SimTransport::descriptor()])
    }

    fn open(&mut self, descriptor: &DeviceDescriptor) -> Result<Option<SimTransport>, ResultCode> {
        if *descriptor != SimTransport::descriptor() {
            return Err(ResultCode::BadDescriptor);
        }
        // a freshly opened simulator measures a matched, lossless setup
        Ok(Some(SimTransport::two_port(50.0, |_, _| {
            Complex64::new(0.0, 0.0)
        })))
    }
}
