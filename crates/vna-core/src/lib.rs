//! vna-core: scan and SOLT calibration core for a two-port USB vector
//! network analyzer.
//!
//! ## Modules
//!
//! - `params` - Scattering-parameter tags and request sets
//! - `sweep` - Frequency sweep helpers
//! - `network` - Measured S-parameter networks
//! - `calibration` - Dataset, collection workflow, persistence, correction
//! - `device` - Transport boundary, scan session, simulator

pub mod calibration;
pub mod constants;
pub mod device;
pub mod network;
pub mod params;
pub mod sweep;

pub use network::SNetwork;
pub use params::{ParamSet, SParam};
