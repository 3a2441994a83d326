//! A complete decoding pass over a freshly read memory image.

use alloc::vec::Vec;

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::{
    decrypt::{self, Decrypt},
    fram::{Error, MemoryImage, Readings, check::ValidationReport},
    sensor::{Identity, SensorState, Session},
};

/// Everything produced by one decoding pass.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Scan {
    pub identity: Identity,
    /// Unknown whenever `readings` is an error.
    pub state: SensorState,
    /// The final validation report, unless the image was incomplete.
    pub report: Option<ValidationReport>,
    /// The image as read, if it had to be deciphered.
    pub encrypted_image: Option<Vec<u8>>,
    pub readings: Result<Readings, Error>,
}

/// Decode a memory image read at `last_reading` from the sensor of `session`.
///
/// Enciphered images are passed to `decryptor` first. A pass never fails as a
/// whole: an image that cannot be decoded yields a [`Scan`] whose `readings`
/// hold the reason.
pub fn scan(
    fram: Vec<u8>,
    session: &Session,
    last_reading: DateTime<Utc>,
    decryptor: &dyn Decrypt,
) -> Scan {
    let identity = session.identity();
    let mut image = MemoryImage::new(fram);

    let readings = decrypt::open(&mut image, session, &identity, decryptor)
        .and_then(|()| image.readings(last_reading));

    let state = match &readings {
        Ok(readings) => readings.state,
        Err(err) => {
            info!("No usable readings this pass: {err}");
            SensorState::Unknown
        }
    };

    debug!("{} {} scanned, state {state}.", identity.sensor_type, identity.serial_number);

    Scan {
        state,
        report: image.report().copied(),
        encrypted_image: image.encrypted_image().map(<[u8]>::to_vec),
        identity,
        readings,
    }
}
