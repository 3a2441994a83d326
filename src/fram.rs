//! The raw memory image read from a sensor.
//!
//! An image is split into three independently checksummed regions, plus a
//! command region on sensors that expose one:
//!
//! | Bytes        | Region   | Checksum at  |
//! |--------------|----------|--------------|
//! | `2..24`      | header   | `0..2`       |
//! | `26..320`    | body     | `24..26`     |
//! | `322..344`   | footer   | `320..322`   |
//! | `346..1904`  | commands | `344..346`   |
//!
//! A [`MemoryImage`] validates every buffer it receives. Nothing is decoded
//! from an image whose header, body or footer fails its check.

use alloc::vec::Vec;
use core::ops::Range;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use thiserror::Error;
use zerocopy::FromBytes;

use crate::{decrypt::DecryptionFailed, sensor::SensorState};

pub mod bits;
pub mod calibration;
pub mod check;
pub mod record;

use calibration::CalibrationInfo;
use check::{Region, ValidationReport};
use record::{GlucoseRecord, Ring};

/// Length of a fully read image, excluding any command region.
pub const FRAM_LEN: usize = 344;

/// Errors halting the decoding of an image.
///
/// None of these are fatal: each means only that this read produced no usable
/// readings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Error {
    /// The image is too short to hold every region.
    #[error("Memory image read incomplete ({len} of {} bytes).", FRAM_LEN)]
    IncompleteBuffer { len: usize },
    /// Calculated and stored CRC values of a region do not match.
    #[error("Calculated ({computed:#06X}) and stored ({stored:#06X}) {region} CRC values do not match.")]
    ChecksumMismatch {
        region: Region,
        stored: u16,
        computed: u16,
    },
    /// Record timestamps reconstructed from the read instant fall outside the
    /// range of representable dates.
    #[error("Record timestamps out of range.")]
    TimestampOutOfRange,
    /// The image was enciphered and could not be recovered.
    #[error("Could not decrypt memory image: {0}")]
    DecryptionFailed(#[from] DecryptionFailed),
}

#[repr(C, packed)]
#[derive(Debug, FromBytes)]
struct Header {
    _crc: [u8; 2],
    _calibration: [u8; 2],
    state: u8,
    _reserved0: u8,
    failure_code: u8,
    failure_age: [u8; 2],
    _reserved1: [u8; 15],
}

#[repr(C, packed)]
#[derive(Debug, FromBytes)]
struct Body {
    _crc: [u8; 2],
    trend_index: u8,
    history_index: u8,
    _trend: [u8; 16 * 6],
    _history: [u8; 32 * 6],
    age: [u8; 2],
    _reserved: [u8; 2],
}

#[repr(C, packed)]
#[derive(Debug, FromBytes)]
struct Footer {
    _crc: [u8; 2],
    _reserved0: [u8; 4],
    max_life: [u8; 2],
    _reserved1: [u8; 16],
}

/// Read a fixed layout spanning the stored checksum and covered bytes of a
/// region.
fn layout<T: FromBytes>(r: &[u8], region: Region) -> Result<T, Error> {
    let Range { start, .. } = region.stored();
    let Range { end, .. } = region.covered();

    r.get(start..end)
        .and_then(|r| T::read_from_bytes(r).ok())
        .ok_or(Error::IncompleteBuffer { len: r.len() })
}

/// Details reported by a sensor in the failure state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Failure {
    pub code: u8,
    /// Sensor age at failure, if recorded.
    pub age_minutes: Option<u16>,
}

/// Everything decoded from a validated image.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Readings {
    pub state: SensorState,
    pub age_minutes: u16,
    pub max_life_minutes: u16,
    /// Minute-cadence records, newest first.
    pub trend: Vec<GlucoseRecord>,
    /// Fifteen-minute-cadence records, newest first.
    pub history: Vec<GlucoseRecord>,
    pub calibration: CalibrationInfo,
    pub failure: Option<Failure>,
}

/// A memory image and the outcome of validating it.
#[derive(Debug, Clone)]
pub struct MemoryImage {
    fram: Vec<u8>,
    encrypted: Option<Vec<u8>>,
    report: Result<ValidationReport, Error>,
}

impl MemoryImage {
    pub fn new(fram: Vec<u8>) -> Self {
        let report = check::validate(&fram);

        if let Err(err) = &report {
            warn!("{err}");
        }

        Self {
            fram,
            encrypted: None,
            report,
        }
    }

    /// Replace the whole image with a fresh read, validating it again.
    pub fn replace(&mut self, fram: Vec<u8>) {
        *self = Self::new(fram);
    }

    /// Replace an enciphered image with its plaintext, keeping the ciphertext.
    pub(crate) fn decipher(&mut self, plaintext: Vec<u8>) {
        let ciphertext = core::mem::replace(self, Self::new(plaintext)).fram;
        self.encrypted = Some(ciphertext);
    }

    pub fn bytes(&self) -> &[u8] {
        &self.fram
    }

    /// The image as read, if it had to be deciphered.
    pub fn encrypted_image(&self) -> Option<&[u8]> {
        self.encrypted.as_deref()
    }

    /// The validation report, unless the image was too short to check.
    pub fn report(&self) -> Option<&ValidationReport> {
        self.report.as_ref().ok()
    }

    /// Fail unless the header, body and footer all passed their checks.
    pub fn verify(&self) -> Result<&ValidationReport, Error> {
        let report = self.report.as_ref().map_err(Clone::clone)?;
        report.ensure()?;
        Ok(report)
    }

    /// The bytes covered by a region's checksum, if that check passed.
    pub fn region(&self, region: Region) -> Option<&[u8]> {
        let report = self.report()?;
        let check = match region {
            Region::Header => Some(&report.header),
            Region::Body => Some(&report.body),
            Region::Footer => Some(&report.footer),
            Region::Commands => report.commands.as_ref(),
        }?;

        check
            .passed()
            .then(|| self.fram.get(region.covered()))
            .flatten()
    }

    /// The sensor state, or [`SensorState::Unknown`] for an image that did not
    /// validate.
    pub fn state(&self) -> SensorState {
        match (self.verify(), layout::<Header>(&self.fram, Region::Header)) {
            (Ok(_), Ok(Header { state, .. })) => SensorState::from(state),
            _ => SensorState::Unknown,
        }
    }

    /// Decode the records and metadata of a validated image.
    ///
    /// `last_reading` is the instant the image was read; record timestamps are
    /// reconstructed backwards from it.
    pub fn readings(&self, last_reading: DateTime<Utc>) -> Result<Readings, Error> {
        self.verify()?;

        let r = self.fram.as_slice();

        let Header {
            state,
            failure_code,
            failure_age,
            ..
        } = layout(r, Region::Header)?;
        let Body {
            trend_index,
            history_index,
            age,
            ..
        } = layout(r, Region::Body)?;
        let Footer { max_life, .. } = layout(r, Region::Footer)?;

        let state = SensorState::from(state);
        let age = u16::from_le_bytes(age);

        let failure = (state == SensorState::Failure).then(|| {
            let age = u16::from_le_bytes(failure_age);
            Failure {
                code: failure_code,
                age_minutes: (age != 0).then_some(age),
            }
        });

        if let Some(Failure { code, .. }) = failure {
            warn!("Sensor failure 0x{code:02X} reported.");
        }

        let readings = Readings {
            state,
            age_minutes: age,
            max_life_minutes: u16::from_le_bytes(max_life),
            trend: record::walk(r, Ring::Trend, trend_index, age, last_reading)?.collect(),
            history: record::walk(r, Ring::History, history_index, age, last_reading)?.collect(),
            calibration: CalibrationInfo::extract(r),
            failure,
        };

        debug!(
            "Decoded {} trend and {} history records, state {state}, age {age} minutes.",
            readings.trend.len(),
            readings.history.len(),
        );

        Ok(readings)
    }
}
