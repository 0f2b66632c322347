//! Region-of-interest temperature monitoring for dual-plane
//! YUYV thermal cameras.
//!
//! The camera delivers one frame holding two stacked images:
//! raw sensor readings on top and a visual rendering below.
//! This crate provides:
//!
//! 1. [Decoding](frame::decode) of such frames into a
//! [`ThermalPlane`] and an [`ImagingPlane`], trimming the
//! blanking band the firmware pads both halves with.
//!
//! 2. Conversion of the raw two-byte readings to degrees
//! through a linear [`CalibrationProfile`].
//!
//! 3. Up to one circular region per slot, kept in a
//! thread-safe, persisted [`RegionStore`], and the mean
//! temperature inside every region per frame.
//!
//! 4. Translation of pointer drags and key presses into
//! region updates ([`gesture`]).
//!
//! # Usage
//!
//! ```rust
//! # fn test_compile() -> anyhow::Result<()> {
//! use std::sync::Arc;
//! use thermal_roi::{CalibrationProfile, Point, RawFrame, RegionStore, ThermalMonitor};
//!
//! let store = Arc::new(RegionStore::open("thermal_regions.json", "1"));
//! let _ = store.set_region("1", Point::new(120, 80), 14);
//!
//! let mut monitor = ThermalMonitor::new(store, CalibrationProfile::TEFLON);
//! let raw = RawFrame::from_bytes(256, 392, std::fs::read("frame.yuyv")?)?;
//! let report = monitor.process(&raw)?;
//! println!("{}", report.status.to_json()?);
//! # Ok(())
//! # }
//! ```

pub mod error;

pub mod frame;
pub mod temperature;

pub mod mask;
pub mod region;
pub mod aggregate;

pub mod gesture;
pub mod pipeline;
pub mod status;
pub mod overlay;

pub mod cli;
pub mod config;

#[cfg(test)]
pub(crate) mod test_util;

pub use crate::error::{Error, Result};
pub use crate::frame::{ImagingPlane, RawFrame, ThermalPlane};
pub use crate::pipeline::{CycleReport, FrameMailbox, ThermalMonitor};
pub use crate::region::{Point, Region, RegionStore};
pub use crate::temperature::CalibrationProfile;
