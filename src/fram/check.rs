//! Helpers for computing and verifying the cyclic redundancy checks guarding
//! each region of a memory image.

use core::{fmt, ops::Range};

use log::{debug, warn};

use super::{Error, FRAM_LEN};

/// Substitution table for the reflected CCITT polynomial (`0x8408`).
const CRC_TABLE: [u16; 256] = {
    let mut table = [0; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;

        while bit < 8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0x8408 } else { crc >> 1 };
            bit += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
};

/// Compute the cyclic redundancy check of a slice of bytes, as reported by
/// the sensor.
///
/// The register starts at all-ones and is bit-reversed once every byte has
/// been consumed.
pub fn compute_crc(r: &[u8]) -> u16 {
    r.iter().fold(0xFFFF, |acc, b| crc_byte(acc, *b)).reverse_bits()
}

/// Accumulate a single byte into a cyclic redundancy check value.
fn crc_byte(crc: u16, b: u8) -> u16 {
    (crc >> 8) ^ CRC_TABLE[((crc ^ b as u16) & 0xFF) as usize]
}

/// Offset one past the end of the command region.
pub const COMMANDS_END: usize = FRAM_LEN + 195 * 8;

/// An independently checksummed range of a memory image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Region {
    Header,
    Body,
    Footer,
    Commands,
}

impl Region {
    /// Location of the stored little-endian checksum.
    pub const fn stored(self) -> Range<usize> {
        match self {
            Self::Header => 0..2,
            Self::Body => 24..26,
            Self::Footer => 320..322,
            Self::Commands => 344..346,
        }
    }

    /// Bytes covered by the checksum.
    pub const fn covered(self) -> Range<usize> {
        match self {
            Self::Header => 2..24,
            Self::Body => 26..320,
            Self::Footer => 322..344,
            Self::Commands => 346..COMMANDS_END,
        }
    }

    /// Check this region of an image, if the image is long enough to hold it.
    pub fn check(self, r: &[u8]) -> Option<RegionCheck> {
        let stored = r.get(self.stored())?;
        let covered = r.get(self.covered())?;

        Some(RegionCheck {
            region: self,
            stored: u16::from_le_bytes([stored[0], stored[1]]),
            computed: compute_crc(covered),
        })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Header => "header",
            Self::Body => "body",
            Self::Footer => "footer",
            Self::Commands => "commands",
        })
    }
}

/// Stored and computed checksums of one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RegionCheck {
    pub region: Region,
    pub stored: u16,
    pub computed: u16,
}

impl RegionCheck {
    pub fn passed(&self) -> bool {
        self.stored == self.computed
    }
}

impl fmt::Display for RegionCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} CRC16: stored 0x{:04X}, computed 0x{:04X} ({})",
            self.region,
            self.stored,
            self.computed,
            if self.passed() { "ok" } else { "FAIL" }
        )
    }
}

/// Outcome of checking every region of a memory image.
///
/// This is the only validation result the rest of the decoder acts upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ValidationReport {
    pub header: RegionCheck,
    pub body: RegionCheck,
    pub footer: RegionCheck,
    /// Present only for images long enough to include the command region.
    pub commands: Option<RegionCheck>,
}

impl ValidationReport {
    /// Whether the header, body and footer all passed.
    ///
    /// The command region is reported but holds no readings, so it does not
    /// take part.
    pub fn passed(&self) -> bool {
        self.ensure().is_ok()
    }

    /// Fail with the first of the header, body and footer that did not pass.
    pub fn ensure(&self) -> Result<(), Error> {
        match [self.header, self.body, self.footer]
            .into_iter()
            .find(|c| !c.passed())
        {
            Some(RegionCheck {
                region,
                stored,
                computed,
            }) => Err(Error::ChecksumMismatch {
                region,
                stored,
                computed,
            }),
            None => Ok(()),
        }
    }

    /// Iterate over every region that was checked.
    pub fn checks(&self) -> impl Iterator<Item = &RegionCheck> {
        [&self.header, &self.body, &self.footer]
            .into_iter()
            .chain(self.commands.as_ref())
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, check) in self.checks().enumerate() {
            if n != 0 {
                f.write_str("\n")?;
            }
            write!(f, "{check}")?;
        }
        Ok(())
    }
}

/// Check every region of a memory image.
pub fn validate(r: &[u8]) -> Result<ValidationReport, Error> {
    let incomplete = || Error::IncompleteBuffer { len: r.len() };

    let report = ValidationReport {
        header: Region::Header.check(r).ok_or_else(incomplete)?,
        body: Region::Body.check(r).ok_or_else(incomplete)?,
        footer: Region::Footer.check(r).ok_or_else(incomplete)?,
        commands: Region::Commands.check(r),
    };

    for check in report.checks() {
        if check.passed() {
            debug!("{check}");
        } else {
            warn!("{check}");
        }
    }

    Ok(report)
}

/// Recompute and stamp the checksum of every region present in an image.
///
/// Intended for building synthetic images; decoding never rewrites a buffer.
pub fn write_checksums(r: &mut [u8]) {
    for region in [Region::Header, Region::Body, Region::Footer, Region::Commands] {
        let Some(covered) = r.get(region.covered()) else {
            continue;
        };

        let crc = compute_crc(covered).to_le_bytes();
        r[region.stored()].copy_from_slice(&crc);
    }
}
