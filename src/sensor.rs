//! Sensor identity, derived from the factory UID and patch info.
//!
//! Every classification here is total: hardware newer than this crate maps to
//! an `Unknown` variant (or the base [`Family`]) rather than an error.

use alloc::{string::String, vec::Vec};
use core::fmt;

use log::debug;
use tartan_bitfield::bitfield;

pub mod serial;

bitfield! {
    /// The third patch info byte.
    struct PatchVariant(u8) {
        [0..4] generation: u8,
        [4..8] family: u8,
    }
}

/// A known sensor variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SensorType {
    Libre1,
    LibreUs14Day,
    LibreProH,
    Libre2,
    Libre2Us,
    Libre2Ca,
    LibreSense,
    Libre3,
    Unknown,
}

impl SensorType {
    /// Classify a sensor from its patch info.
    pub fn classify(patch_info: &[u8]) -> Self {
        let byte = |i: usize| patch_info.get(i).copied();

        match byte(0) {
            Some(0xDF | 0xA2) => Self::Libre1,
            Some(0xE5 | 0xE6) => Self::LibreUs14Day,
            Some(0x70) => Self::LibreProH,
            Some(0x9D | 0xC5 | 0xC6) => Self::Libre2,
            Some(0x76) => match (byte(3), byte(2).map(PatchVariant)) {
                (Some(0x02), _) => Self::Libre2Us,
                (Some(0x04), _) => Self::Libre2Ca,
                (_, Some(v)) if v.family() == 7 => Self::LibreSense,
                _ => Self::Unknown,
            },
            Some(_) if patch_info.len() == 24 => Self::Libre3,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Libre1 => "Libre 1",
            Self::LibreUs14Day => "Libre US 14d",
            Self::LibreProH => "Libre Pro/H",
            Self::Libre2 => "Libre 2",
            Self::Libre2Us => "Libre 2 US",
            Self::Libre2Ca => "Libre 2 CA",
            Self::LibreSense => "Libre Sense",
            Self::Libre3 => "Libre 3",
            Self::Unknown => "Unknown",
        })
    }
}

/// A product line, with its numeric tag as found in patch info and serials.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum Family {
    #[default]
    Libre1 = 0,
    LibrePro = 1,
    Libre2 = 3,
    LibreSense = 7,
}

impl Family {
    /// Derive the family from the third patch info byte, falling back to
    /// [`Family::Libre1`].
    pub fn derive(patch_info_byte2: u8) -> Self {
        match PatchVariant(patch_info_byte2).family() {
            1 => Self::LibrePro,
            3 => Self::Libre2,
            7 => Self::LibreSense,
            _ => Self::Libre1,
        }
    }

    pub const fn tag(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Libre1 => "Libre 1",
            Self::LibrePro => "Libre Pro",
            Self::Libre2 => "Libre 2",
            Self::LibreSense => "Libre Sense",
        })
    }
}

/// Market a sensor was made for.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum Region {
    #[default]
    Unknown = 0,
    European = 1,
    Usa = 2,
    AustralianCanadian = 4,
    EasternRow = 8,
}

impl Region {
    pub fn derive(patch_info_byte3: u8) -> Self {
        match patch_info_byte3 {
            1 => Self::European,
            2 => Self::Usa,
            4 => Self::AustralianCanadian,
            8 => Self::EasternRow,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown",
            Self::European => "European",
            Self::Usa => "USA",
            Self::AustralianCanadian => "Australian / Canadian",
            Self::EasternRow => "Eastern / Rest of World",
        })
    }
}

/// Cipher and key derivation variant used by enciphered families.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SecurityGeneration {
    #[default]
    First = 1,
    Second = 2,
}

impl SecurityGeneration {
    /// Derive the generation from the low nibble of the third patch info byte.
    ///
    /// Only meaningful for [`Family::Libre2`] and [`Family::LibreSense`]; every
    /// other family reports [`SecurityGeneration::First`].
    pub fn derive(family: Family, patch_info_byte2: u8) -> Self {
        let threshold = match family {
            Family::Libre2 => 9,
            Family::LibreSense => 4,
            _ => return Self::First,
        };

        if PatchVariant(patch_info_byte2).generation() >= threshold {
            Self::Second
        } else {
            Self::First
        }
    }
}

/// Lifecycle state as reported by the sensor.
///
/// This is decoded from a single byte; the decoder never advances it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SensorState {
    #[default]
    Unknown,
    NotActivated,
    WarmingUp,
    Active,
    Expired,
    Shutdown,
    Failure,
}

impl From<u8> for SensorState {
    fn from(r: u8) -> Self {
        match r {
            0x01 => Self::NotActivated,
            0x02 => Self::WarmingUp,
            0x03 => Self::Active,
            0x04 => Self::Expired,
            0x05 => Self::Shutdown,
            0x06 => Self::Failure,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for SensorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown",
            Self::NotActivated => "not activated",
            Self::WarmingUp => "warming up",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Shutdown => "shut down",
            Self::Failure => "failure",
        })
    }
}

/// Everything known about a sensor before its memory is read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Session {
    /// Factory unique identifier, as read (least significant byte first).
    pub uid: Vec<u8>,
    pub patch_info: Vec<u8>,
}

impl Session {
    pub fn new(uid: impl Into<Vec<u8>>, patch_info: impl Into<Vec<u8>>) -> Self {
        Self {
            uid: uid.into(),
            patch_info: patch_info.into(),
        }
    }

    pub fn identity(&self) -> Identity {
        Identity::derive(&self.uid, &self.patch_info)
    }
}

/// Derived sensor metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Identity {
    pub sensor_type: SensorType,
    pub family: Family,
    pub region: Region,
    /// Empty if the UID was malformed.
    pub serial_number: String,
    pub security_generation: SecurityGeneration,
}

impl Identity {
    pub fn derive(uid: &[u8], patch_info: &[u8]) -> Self {
        let sensor_type = SensorType::classify(patch_info);
        let byte2 = patch_info.get(2).copied();

        let family = byte2.map(Family::derive).unwrap_or_default();
        let region = patch_info.get(3).copied().map(Region::derive).unwrap_or_default();
        let security_generation = byte2
            .map(|b| SecurityGeneration::derive(family, b))
            .unwrap_or_default();

        let identity = Self {
            sensor_type,
            family,
            region,
            serial_number: serial::serial_number(uid, family.tag()),
            security_generation,
        };

        debug!(
            "{} ({}), serial {:?}, region {}, security generation {}.",
            identity.sensor_type,
            identity.family,
            identity.serial_number,
            identity.region,
            identity.security_generation as u8,
        );

        identity
    }

    /// Whether this sensor ships enciphered memory images.
    pub fn is_enciphered(&self) -> bool {
        self.family == Family::Libre2 || self.sensor_type == SensorType::LibreUs14Day
    }
}
