//! Arbitrary-width integer fields packed at arbitrary bit offsets.
//!
//! Bits are numbered least-significant first within each byte, and a field
//! is read as a little-endian bit stream beginning `byte_offset * 8 +
//! bit_offset` bits into the buffer. Bit 0 of the field is the first bit read.
//!
//! Positions before the start of the buffer read as zero and are never
//! written. Positions past its end behave the same way.
//!
//! Fields are at most 32 bits wide. A wider `bit_count` is clamped to 32.

/// Read a field of up to 32 bits.
pub fn read_bits(r: &[u8], byte_offset: isize, bit_offset: isize, bit_count: u32) -> u32 {
    (0..bit_count.min(u32::BITS)).fold(0, |acc, i| {
        let position = byte_offset * 8 + bit_offset + i as isize;

        match locate(r.len(), position) {
            Some((byte, bit)) if (r[byte] >> bit) & 1 == 1 => acc | 1 << i,
            _ => acc,
        }
    })
}

/// Write the low `bit_count` bits of `value` into a field.
pub fn write_bits(r: &mut [u8], byte_offset: isize, bit_offset: isize, bit_count: u32, value: u32) {
    for i in 0..bit_count.min(u32::BITS) {
        let position = byte_offset * 8 + bit_offset + i as isize;

        if let Some((byte, bit)) = locate(r.len(), position) {
            let set = ((value >> i) & 1) as u8;
            r[byte] = (r[byte] & !(1 << bit)) | (set << bit);
        }
    }
}

/// Resolve a bit position to a byte index and a bit within that byte.
fn locate(len: usize, position: isize) -> Option<(usize, u32)> {
    // TODO: no known layout reaches a negative position; drop this leniency
    // once the history ring walk is confirmed never to produce one.
    let position = usize::try_from(position).ok()?;
    let byte = position / 8;

    (byte < len).then_some((byte, (position % 8) as u32))
}
