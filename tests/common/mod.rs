#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use lancet::fram::{
    FRAM_LEN,
    bits::write_bits,
    calibration::CalibrationInfo,
    check::write_checksums,
    record::Ring,
};

pub const ACTIVE: u8 = 0x03;
pub const FAILURE: u8 = 0x06;

pub const TREND_BASE: u32 = 1000;
pub const HISTORY_BASE: u32 = 2000;

pub const LIBRE_1_PATCH_INFO: [u8; 6] = [0xDF, 0x00, 0x00, 0x01, 0x01, 0x02];
pub const LIBRE_2_PATCH_INFO: [u8; 6] = [0x9D, 0x08, 0x30, 0x01, 0x76, 0x25];
pub const UID: [u8; 8] = [0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6, 0x07, 0x18];

pub fn last_reading() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// Fields of a ring slot, before bit packing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Slot {
    pub raw_value: u32,
    pub error: u32,
    pub has_error: bool,
    pub raw_temperature: u32,
    pub temperature_adjustment: i32,
}

/// Builder for synthetic memory images with valid checksums.
pub struct Image {
    fram: Vec<u8>,
}

impl Image {
    /// An image of the given length with every ring slot populated.
    ///
    /// Trend slot `s` holds raw value `TREND_BASE + s`, history slot `s` holds
    /// `HISTORY_BASE + s`.
    pub fn with_len(len: usize) -> Self {
        let mut image = Self { fram: vec![0; len] };

        for (ring, base) in [(Ring::Trend, TREND_BASE), (Ring::History, HISTORY_BASE)] {
            for s in 0..ring.slots() {
                image = image.slot(
                    ring,
                    s,
                    Slot {
                        raw_value: base + s as u32,
                        raw_temperature: 7000,
                        ..Default::default()
                    },
                );
            }
        }

        image.state(ACTIVE).max_life(20160)
    }

    pub fn new() -> Self {
        Self::with_len(FRAM_LEN)
    }

    pub fn state(mut self, state: u8) -> Self {
        self.fram[4] = state;
        self
    }

    pub fn failure(mut self, code: u8, age: u16) -> Self {
        self.fram[6] = code;
        self.fram[7..9].copy_from_slice(&age.to_le_bytes());
        self
    }

    pub fn indexes(mut self, trend: u8, history: u8) -> Self {
        self.fram[26] = trend;
        self.fram[27] = history;
        self
    }

    pub fn age(mut self, age: u16) -> Self {
        self.fram[316..318].copy_from_slice(&age.to_le_bytes());
        self
    }

    pub fn max_life(mut self, minutes: u16) -> Self {
        self.fram[326..328].copy_from_slice(&minutes.to_le_bytes());
        self
    }

    pub fn slot(mut self, ring: Ring, slot: usize, fields: Slot) -> Self {
        let r = &mut self.fram;
        let offset = ring.slot_offset(slot as i32) as isize;

        write_bits(r, offset, 0, 0xE, fields.raw_value);
        write_bits(r, offset, 0xE, 0xB, fields.error);
        write_bits(r, offset, 0x19, 1, fields.has_error as u32);
        write_bits(r, offset, 0x1A, 0xC, fields.raw_temperature >> 2);
        write_bits(r, offset, 0x26, 9, fields.temperature_adjustment.unsigned_abs() >> 2);
        write_bits(r, offset, 0x2F, 1, (fields.temperature_adjustment < 0) as u32);

        self
    }

    pub fn calibration(mut self, c: CalibrationInfo) -> Self {
        let r = &mut self.fram;

        write_bits(r, 2, 0, 3, c.i1 as u32);
        write_bits(r, 2, 3, 0xA, c.i2 as u32);
        write_bits(r, 0x150, 0, 8, c.i3.unsigned_abs());
        write_bits(r, 0x150, 0x21, 1, (c.i3 < 0) as u32);
        write_bits(r, 0x150, 8, 0xE, c.i4 as u32);
        write_bits(r, 0x150, 0x28, 0xC, (c.i5 >> 2) as u32);
        write_bits(r, 0x150, 0x34, 0xC, (c.i6 >> 2) as u32);

        self
    }

    /// Stamp every checksum and return the image.
    pub fn build(mut self) -> Vec<u8> {
        write_checksums(&mut self.fram);
        self.fram
    }

    /// Return the image without stamping checksums.
    pub fn build_unchecked(self) -> Vec<u8> {
        self.fram
    }
}
