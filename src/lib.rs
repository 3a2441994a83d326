#![no_std]

//! A decoder for the memory images (FRAM) of continuous glucose monitor
//! sensors.
//!
//! Lancet validates the checksummed regions of an image, deciphers images
//! from families that encipher them, and extracts time-stamped glucose
//! records, factory calibration and sensor identity.
//!
//! Most users should begin with [`scan`], which runs a complete decoding pass.
//! The [`fram`] module exposes each stage for applications needing finer
//! control, such as reprocessing archived images.
//!
//! Decoding is pure: it performs no I/O, reads no clock, and holds no shared
//! state, so independent images may be decoded in parallel.
//!
//! ## Cargo Features
//!
//! The following crate feature flags are available:
//!
//! - `std`: enable the [`glucose`] module (default).
//! - `serde`: derive `Serialize` for every decoded type.

extern crate alloc;

pub mod decrypt;
pub mod fram;
#[cfg(feature = "std")]
pub mod glucose;
pub mod scan;
pub mod sensor;

pub use scan::{Scan, scan};
