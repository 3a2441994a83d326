//! Printed serial numbers.

use alloc::{format, string::String};

use log::warn;
use thiserror::Error;

/// Symbols used for each five-bit group, omitting easily confused glyphs.
const ALPHABET: &[u8; 32] = b"0123456789ACDEFGHJKLMNPQRTUVWXYZ";

/// A factory UID of the wrong length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Factory UID is {len} bytes long, expected 8.")]
pub struct MalformedIdentity {
    pub len: usize,
}

/// Derive the serial number printed on a sensor.
///
/// The UID is reversed, its last six bytes split into ten five-bit groups,
/// and each group mapped to a symbol. The family tag is prefixed.
pub fn derive(uid: &[u8], family_tag: u8) -> Result<String, MalformedIdentity> {
    let uid: &[u8; 8] = uid
        .try_into()
        .map_err(|_| MalformedIdentity { len: uid.len() })?;

    // Last six bytes of the reversed UID.
    let &[b5, b4, b3, b2, b1, b0, _, _] = uid;

    let groups = [
        b0 >> 3,
        b0 << 2 | b1 >> 6,
        b1 >> 1,
        b1 << 4 | b2 >> 4,
        b2 << 1 | b3 >> 7,
        b3 >> 2,
        b3 << 3 | b4 >> 5,
        b4,
        b5 >> 3,
        b5 << 2,
    ];

    let mut serial = format!("{family_tag}");
    serial.extend(groups.iter().map(|g| ALPHABET[(g & 0x1F) as usize] as char));

    Ok(serial)
}

/// Derive the serial number printed on a sensor, or an empty string for a
/// malformed UID.
pub fn serial_number(uid: &[u8], family_tag: u8) -> String {
    derive(uid, family_tag).unwrap_or_else(|err| {
        warn!("{err}");
        String::new()
    })
}
