//! Serial telemetry protocol used between the vehicle controller and the dashboard.
//!
//! The controller writes short frames over a USB-serial line. Every frame is a list of byte
//! tokens separated by `0xFF`, the first token being the tag which selects the telemetry field
//! carried in the remaining tokens. [`frame`] turns received chunks into updates of a
//! [`telemetry::TelemetryState`], [`session`] owns the connection and the state for the lifetime
//! of one serial session.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

#[macro_use]
mod fmt;

pub mod frame;
pub mod telemetry;

#[cfg(feature = "std")]
pub mod session;

// include defmt::Format implementations
// we don't want them derive()d in the modules unless defmt-impl feature is set
#[cfg(feature = "defmt-impl")]
pub mod defmt;

// reexport heapless
pub use heapless;

pub use frame::{decode, TelemetryDecoder};
pub use telemetry::TelemetryState;
