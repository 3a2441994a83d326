//! Detection and recovery of enciphered memory images.
//!
//! The cipher itself is not part of this crate. Callers supply it through the
//! [`Decrypt`] capability; [`NoDecryption`] stands in when none is available.

use alloc::vec::Vec;

use log::{info, warn};
use thiserror::Error;

use crate::{
    fram::{Error, FRAM_LEN, MemoryImage},
    sensor::{Identity, SensorType, Session},
};

/// The decryption capability could not recover a plaintext image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[error("Decryption failed.")]
pub struct DecryptionFailed;

/// Recover the plaintext of an enciphered memory image.
pub trait Decrypt {
    fn decrypt(
        &self,
        sensor_type: SensorType,
        uid: &[u8],
        patch_info: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, DecryptionFailed>;
}

impl<F> Decrypt for F
where
    F: Fn(SensorType, &[u8], &[u8], &[u8]) -> Result<Vec<u8>, DecryptionFailed>,
{
    fn decrypt(
        &self,
        sensor_type: SensorType,
        uid: &[u8],
        patch_info: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, DecryptionFailed> {
        self(sensor_type, uid, patch_info, ciphertext)
    }
}

/// A capability that never decrypts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDecryption;

impl Decrypt for NoDecryption {
    fn decrypt(
        &self,
        _sensor_type: SensorType,
        _uid: &[u8],
        _patch_info: &[u8],
        _ciphertext: &[u8],
    ) -> Result<Vec<u8>, DecryptionFailed> {
        Err(DecryptionFailed)
    }
}

/// Whether an image looks enciphered.
///
/// Only families known to encipher their images are considered. For those, a
/// complete image whose header fails its check is taken to be ciphertext.
pub fn is_enciphered(image: &MemoryImage, identity: &Identity) -> bool {
    identity.is_enciphered()
        && image.bytes().len() >= FRAM_LEN
        && image.report().is_some_and(|r| !r.header.passed())
}

/// Decipher an image in place if it looks enciphered.
///
/// A deciphered image is validated again, once. On failure the ciphertext is
/// left in place, still failing validation.
pub fn open(
    image: &mut MemoryImage,
    session: &Session,
    identity: &Identity,
    decryptor: &dyn Decrypt,
) -> Result<(), Error> {
    if !is_enciphered(image, identity) {
        return Ok(());
    }

    info!("{} memory image is enciphered.", identity.sensor_type);

    let plaintext = decryptor
        .decrypt(
            identity.sensor_type,
            &session.uid,
            &session.patch_info,
            image.bytes(),
        )
        .inspect_err(|err| warn!("{err}"))?;

    image.decipher(plaintext);

    Ok(())
}
