//! SOLT calibration
//!
//! Everything between a bare device and a corrected measurement: the
//! per-standard dataset, the guided collection workflow, the binary dump
//! format, and the de-embedding math that applies the dataset to a raw
//! scan.

pub mod collect;
pub mod correction;
pub mod dataset;
pub mod dump;

pub use collect::{collect, tasks_for, CalKit, CalTask, CollectError, Confirmer};
pub use correction::{apply, CorrectionError};
pub use dataset::{CalSlot, CalStandard, CalibrationError, CalibrationSet};
pub use dump::DumpError;
