//! Scan session
//!
//! Owns one opened transport for its whole lifetime. Properties are
//! fetched once at open and cached; handle loss flips the session into a
//! terminal invalid state from which every further operation is refused.
//! The transport is released deterministically on every exit path,
//! including errors and drop.

use log::debug;

use crate::device::{
    DeviceError, ProgressFn, Properties, ResultCode, Transport,
};
use crate::network::SNetwork;
use crate::params::ParamSet;

/// One exclusive device session.
///
/// State machine: `Open` -> `Invalidated` on handle loss or close; no
/// transition back. At most one scan is in flight at a time (methods
/// take `&mut self`).
pub struct Session<T: Transport> {
    transport: Option<T>,
    properties: Properties,
}

impl<T: Transport> Session<T> {
    /// Open a session over `transport`, caching the device properties.
    ///
    /// On failure the transport is released before the error is
    /// returned.
    pub fn open(mut transport: T) -> Result<Self, DeviceError> {
        match transport.properties() {
            Ok(properties) => {
                debug!(
                    "session open: z0={}, supported={}, reasonable={}",
                    properties.z0, properties.supported, properties.reasonable_range
                );
                Ok(Self {
                    transport: Some(transport),
                    properties,
                })
            }
            Err(code) => {
                transport.close();
                Err(map_code(code, "failed to query device properties"))
            }
        }
    }

    /// Cached device properties.
    #[inline]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Cached characteristic impedance.
    #[inline]
    pub fn z0(&self) -> f64 {
        self.properties.z0
    }

    /// Cached supported-parameter set.
    #[inline]
    pub fn supported(&self) -> ParamSet {
        self.properties.supported
    }

    /// Whether the session still holds a usable handle.
    pub fn is_valid(&self) -> bool {
        self.transport.is_some()
    }

    /// One frequency-swept query over `params`.
    ///
    /// `on_progress` is polled after every point; returning
    /// [`Verdict::Cancel`](crate::device::Verdict::Cancel) aborts the
    /// sweep, discards all points and surfaces
    /// [`DeviceError::ScanCanceled`]. An `InvalidHandle` result
    /// invalidates the session permanently before the error propagates.
    pub fn scan(
        &mut self,
        frequencies: &[u64],
        average: u16,
        params: ParamSet,
        on_progress: &mut ProgressFn<'_>,
    ) -> Result<SNetwork, DeviceError> {
        if frequencies.is_empty() {
            return Err(DeviceError::InvalidRequest("frequency sweep is empty"));
        }
        if params.is_empty() {
            return Err(DeviceError::InvalidRequest("parameter set is empty"));
        }
        let transport = self.transport.as_mut().ok_or(DeviceError::DeviceGone)?;

        debug!("scan: {} points, params {}", frequencies.len(), params);
        match transport.scan(frequencies, average, params, on_progress) {
            Ok(traces) => {
                let net = SNetwork::new(frequencies.to_vec(), self.properties.z0, traces)?;
                Ok(net)
            }
            Err(ResultCode::InvalidHandle) => {
                debug!("scan: handle lost, invalidating session");
                self.invalidate();
                Err(DeviceError::DeviceGone)
            }
            Err(ResultCode::ScanCanceled) => Err(DeviceError::ScanCanceled),
            Err(code) => Err(DeviceError::Operation {
                context: "failed scan",
                code,
            }),
        }
    }

    /// Scan every parameter the device reported as supported.
    pub fn scan_all_supported(
        &mut self,
        frequencies: &[u64],
        average: u16,
        on_progress: &mut ProgressFn<'_>,
    ) -> Result<SNetwork, DeviceError> {
        let supported = self.properties.supported;
        self.scan(frequencies, average, supported, on_progress)
    }

    /// Release the handle; the session refuses all further scans.
    pub fn close(&mut self) {
        self.invalidate();
    }

    fn invalidate(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        self.invalidate();
    }
}

fn map_code(code: ResultCode, context: &'static str) -> DeviceError {
    match code {
        ResultCode::InvalidHandle => DeviceError::DeviceGone,
        ResultCode::ScanCanceled => DeviceError::ScanCanceled,
        code => DeviceError::Operation { context, code },
    }
}
