//! Device boundary
//!
//! The physical driver (USB-HID transport, native library) lives outside
//! this crate; what lives here is the boundary it is driven through: the
//! [`Transport`] trait, the result-code space it reports failures in, the
//! typed error taxonomy the rest of the crate consumes, and the
//! [`Session`] wrapper that owns one opened handle.

mod session;
mod simulator;

use std::collections::BTreeMap;
use std::fmt;

use ndarray::Array1;
use num_complex::Complex64;
use thiserror::Error;

use crate::network::NetworkError;
use crate::params::{ParamSet, SParam};
use crate::sweep::FrequencyRange;

pub use session::Session;
pub use simulator::{SimDriver, SimTransport};

/// Verdict returned by a progress callback after each frequency point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Cancel,
}

/// Progress callback: `(total_points, current_index) -> verdict`.
///
/// Invoked synchronously on the scanning thread between unit steps of
/// the sweep; it must return promptly.
pub type ProgressFn<'a> = dyn FnMut(usize, usize) -> Verdict + 'a;

/// Result codes of the native driver (the subset the core reacts to or
/// surfaces).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Ok,
    NoDevice,
    BadDescriptor,
    DeviceLocked,
    NoAccess,
    FailedToOpen,
    InvalidHandle,
    BadTransmission,
    UnsupportedTransmission,
    BadFrequency,
    DataReadFailure,
    EmptyResponse,
    IncompleteResponse,
    FailedToWriteRequest,
    BadResponse,
    ScanCanceled,
    NoData,
    Timeout,
    BadArgument,
}

impl ResultCode {
    /// Human-readable description of the code.
    pub fn describe(self) -> &'static str {
        match self {
            ResultCode::Ok => "success",
            ResultCode::NoDevice => "no device",
            ResultCode::BadDescriptor => "bad device descriptor",
            ResultCode::DeviceLocked => "device is used by another program",
            ResultCode::NoAccess => "access denied",
            ResultCode::FailedToOpen => "failed to open device",
            ResultCode::InvalidHandle => "invalid device handle",
            ResultCode::BadTransmission => "bad transmission parameter",
            ResultCode::UnsupportedTransmission => "transmission parameter is not supported",
            ResultCode::BadFrequency => "frequency out of range",
            ResultCode::DataReadFailure => "failed to read data",
            ResultCode::EmptyResponse => "empty response",
            ResultCode::IncompleteResponse => "incomplete response",
            ResultCode::FailedToWriteRequest => "failed to write request",
            ResultCode::BadResponse => "bad response",
            ResultCode::ScanCanceled => "scan is canceled",
            ResultCode::NoData => "no data",
            ResultCode::Timeout => "timeout",
            ResultCode::BadArgument => "bad argument",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.describe(), self)
    }
}

/// Device/transport error taxonomy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    /// Handle lost. Terminal for the session that observed it.
    #[error("device is disconnected (or handle is corrupted)")]
    DeviceGone,

    /// Cooperative abort via a progress callback; not a fault.
    #[error("scan is canceled")]
    ScanCanceled,

    /// Any other non-success transport result.
    #[error("{context}: {code}")]
    Operation {
        context: &'static str,
        code: ResultCode,
    },

    /// Rejected before the transport was touched.
    #[error("invalid scan request: {0}")]
    InvalidRequest(&'static str),

    /// The transport produced malformed sweep data.
    #[error("transport returned malformed data: {0}")]
    BadData(#[from] NetworkError),
}

/// Connection interface a device is reachable over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceCode {
    /// Works by default, no driver installation required.
    Hid,
    /// Requires a dedicated USB driver on some platforms.
    Vci,
}

/// Enumeration entry describing a connectable device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub serial_number: String,
    pub manufacturer: String,
    pub product: String,
    pub release_number: u16,
    pub vid: u16,
    pub pid: u16,
    pub interface: InterfaceCode,
}

/// Immutable device properties, fetched once when a session opens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Properties {
    pub z0: f64,
    pub supported: ParamSet,
    pub valid_range: FrequencyRange,
    pub reasonable_range: FrequencyRange,
}

/// Raw per-parameter traces produced by one transport query.
pub type ScanTraces = BTreeMap<SParam, Array1<Complex64>>;

/// External driver boundary.
///
/// One blocking frequency-swept query per [`scan`](Transport::scan)
/// call; the implementation invokes `on_progress` after each point and
/// honors a [`Verdict::Cancel`] by aborting with
/// [`ResultCode::ScanCanceled`]. Failures are reported as non-success
/// result codes and mapped to [`DeviceError`] by the session.
pub trait Transport {
    /// Query the device's immutable properties.
    fn properties(&mut self) -> Result<Properties, ResultCode>;

    /// One multi-parameter sweep query over `frequencies`.
    fn scan(
        &mut self,
        frequencies: &[u64],
        average: u16,
        params: ParamSet,
        on_progress: &mut ProgressFn<'_>,
    ) -> Result<ScanTraces, ResultCode>;

    /// Release the underlying handle.
    fn close(&mut self);
}

/// Enumeration/opening boundary, implemented by the physical driver.
pub trait Driver {
    type Transport: Transport;

    /// Enumerate connectable devices.
    fn list(&mut self) -> Result<Vec<DeviceDescriptor>, ResultCode>;

    /// Open a device; `Ok(None)` when the device cannot be opened but
    /// the failure is not exceptional (mirrors the driver's null return).
    fn open(&mut self, descriptor: &DeviceDescriptor) -> Result<Option<Self::Transport>, ResultCode>;
}
