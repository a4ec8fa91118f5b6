//! `relieftrack` - donation-logistics tracking toolkit
//!
//! This library issues scannable identifier codes for supply kits and
//! collection points, registers item lists against them, follows truck and
//! tag positions through a polled map model, and records receipt
//! confirmations. All persistence is delegated to a hosted tabular data API
//! spoken through [`relieftrack_store`].

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod codes;
pub mod config;
pub mod error;
pub mod geo;
pub mod geolocate;
pub mod intake;
pub mod kits;
pub mod logging;
pub mod map;
pub mod telemetry;
pub mod tracking;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
