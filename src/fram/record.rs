//! Glucose records held in the trend and history rings.
//!
//! # Layout
//!
//! Each ring slot is a six-byte, bit-packed record:
//!
//! | Bit    | Width | Field                                   |
//! |--------|-------|-----------------------------------------|
//! | `0x00` | 14    | raw glucose value                       |
//! | `0x0E` | 11    | error code (low 9 bits), quality flags  |
//! | `0x19` | 1     | error flag                              |
//! | `0x1A` | 12    | raw temperature, `<< 2`                 |
//! | `0x26` | 9     | temperature adjustment magnitude, `<< 2`|
//! | `0x2F` | 1     | temperature adjustment sign             |
//!
//! Rings are walked backwards from the slot before the most recently written
//! one, so every sequence produced here is ordered newest first.

use chrono::{DateTime, TimeDelta, Utc};
use either::Either::{Left, Right};

use super::{Error, bits::read_bits};

/// Minutes after which a history record is committed past its due time.
pub const HISTORY_COMMIT_DELAY: i32 = 3;

/// One of the two circular buffers of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Ring {
    /// Sixteen minute-cadence records.
    Trend,
    /// Thirty-two fifteen-minute-cadence records.
    History,
}

impl Ring {
    pub const fn slots(self) -> usize {
        match self {
            Self::Trend => 16,
            Self::History => 32,
        }
    }

    /// Minutes between consecutive records.
    pub const fn cadence(self) -> i32 {
        match self {
            Self::Trend => 1,
            Self::History => 15,
        }
    }

    /// Byte offset of the first slot.
    pub const fn offset(self) -> usize {
        match self {
            Self::Trend => 28,
            Self::History => 28 + 16 * 6,
        }
    }

    /// Byte offset of a slot, wrapping `slot` into the ring.
    pub fn slot_offset(self, slot: i32) -> usize {
        self.offset() + slot.rem_euclid(self.slots() as i32) as usize * 6
    }
}

/// A single decoded record.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GlucoseRecord {
    pub raw_value: u16,
    pub raw_temperature: u16,
    pub temperature_adjustment: i16,
    /// Minutes since sensor start at which the record was taken. Negative for
    /// history slots that have not been written yet.
    pub slot_index: i32,
    pub timestamp: DateTime<Utc>,
    pub has_error: bool,
    pub error_code: u16,
    pub quality_flags: u8,
    /// Calibrated glucose, once [`factory_glucose`](crate::glucose::factory_glucose)
    /// has been applied.
    pub value: Option<i32>,
    /// Sensor temperature in degrees Celsius, alongside `value`.
    pub temperature: Option<f64>,
}

impl GlucoseRecord {
    /// Decode the record stored at a byte offset.
    pub fn read(r: &[u8], offset: usize, slot_index: i32, timestamp: DateTime<Utc>) -> Self {
        let field = |bit, count| read_bits(r, offset as isize, bit, count);

        let error = field(0xE, 0xB);
        let adjustment = (field(0x26, 0x9) << 2) as i16;

        Self {
            raw_value: field(0, 0xE) as u16,
            raw_temperature: (field(0x1A, 0xC) << 2) as u16,
            temperature_adjustment: if field(0x2F, 1) != 0 {
                -adjustment
            } else {
                adjustment
            },
            slot_index,
            timestamp,
            has_error: field(0x19, 1) != 0,
            error_code: (error & 0x1FF) as u16,
            quality_flags: ((error & 0x600) >> 9) as u8,
            value: None,
            temperature: None,
        }
    }
}

/// Where the history ring sits in time.
///
/// The sensor commits each history record [`HISTORY_COMMIT_DELAY`] minutes
/// after it falls due, so the most recent history slot trails the sensor age
/// by between three and seventeen minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryAnchor {
    /// Slot the most recent record should occupy given the sensor age alone.
    pub precise_index: i32,
    /// Minutes between the most recent record and the read.
    pub delay: i32,
    /// Timestamp of the most recent history record.
    pub anchor: DateTime<Utc>,
}

impl HistoryAnchor {
    /// Fails if the anchor falls outside the range of representable dates.
    pub fn new(age: u16, history_index: u8, last_reading: DateTime<Utc>) -> Result<Self, Error> {
        let age = i32::from(age);
        let slots = Ring::History.slots() as i32;
        let cadence = Ring::History.cadence();

        let precise_index = ((age - HISTORY_COMMIT_DELAY) / cadence) % slots;
        let delay = (age - HISTORY_COMMIT_DELAY) % cadence + HISTORY_COMMIT_DELAY;

        // Any other reported index means the record due this cycle has not
        // been committed yet.
        let behind = if precise_index == i32::from(history_index) {
            delay
        } else {
            delay - cadence
        };

        Ok(Self {
            precise_index,
            delay,
            anchor: before(last_reading, behind)?,
        })
    }
}

/// Walk a ring, newest record first.
///
/// `head` is the slot the sensor will write next, `age` the sensor age in
/// minutes and `last_reading` the instant the image was read. Fails if any
/// record timestamp would fall outside the range of representable dates.
pub fn walk(
    r: &[u8],
    ring: Ring,
    head: u8,
    age: u16,
    last_reading: DateTime<Utc>,
) -> Result<impl Iterator<Item = GlucoseRecord> + '_, Error> {
    let start = before(last_reading, age.into())?;
    let newest = i32::from(head) - 1;
    let slots = 0..ring.slots() as i32;

    // Timestamps lie between the oldest and newest of the ring's bounds, so
    // checking the bounds once covers every record.
    Ok(match ring {
        Ring::Trend => {
            before(last_reading, ring.slots() as i32 - 1)?;

            Left(slots.map(move |i| {
                let id = i32::from(age) - i;
                GlucoseRecord::read(r, ring.slot_offset(newest - i), id, last_reading - minutes(i))
            }))
        }
        Ring::History => {
            let HistoryAnchor { delay, anchor, .. } = HistoryAnchor::new(age, head, last_reading)?;

            Right(slots.map(move |i| {
                let id = i32::from(age) - delay - ring.cadence() * i;
                let timestamp = if id >= 0 {
                    anchor - minutes(ring.cadence() * i)
                } else {
                    start
                };
                GlucoseRecord::read(r, ring.slot_offset(newest - i), id, timestamp)
            }))
        }
    })
}

/// The instant `n` minutes before `t`.
fn before(t: DateTime<Utc>, n: i32) -> Result<DateTime<Utc>, Error> {
    t.checked_sub_signed(minutes(n))
        .ok_or(Error::TimestampOutOfRange)
}

fn minutes(n: i32) -> TimeDelta {
    TimeDelta::minutes(n.into())
}
