//! 10-bit sample packing.
//!
//! Four consecutive big-endian 10-bit samples occupy five bytes. Sample `k`
//! of a group is taken from the 16-bit word starting at byte `k` of the
//! group, masked and shifted right.

use crate::types::{SeviriError, SeviriResult};

pub const MASKS: [u16; 4] = [0xFFC0, 0x3FF0, 0x0FFC, 0x03FF];
pub const SHIFTS: [u32; 4] = [6, 4, 2, 0];

/// Samples per packed group
pub const GROUP_SAMPLES: usize = 4;

/// Bytes per packed group
pub const GROUP_BYTES: usize = 5;

/// Number of bytes holding `n_samples` packed samples. Only whole groups
/// are stored, so trailing samples of an incomplete group are dropped.
pub fn packed_len(n_samples: usize) -> usize {
    n_samples / GROUP_SAMPLES * GROUP_BYTES
}

#[inline]
fn word(packed: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([packed[at], packed[at + 1]])
}

/// Decode every whole group of `packed` into `out`.
///
/// `out` must hold at least `packed.len() / 5 * 4` samples.
pub fn unpack_10bit(packed: &[u8], out: &mut [u16]) -> SeviriResult<()> {
    let n_groups = packed.len() / GROUP_BYTES;
    if out.len() < n_groups * GROUP_SAMPLES {
        return Err(SeviriError::Processing(format!(
            "unpack buffer too small: {} samples for {} groups",
            out.len(),
            n_groups
        )));
    }

    for (group, samples) in packed
        .chunks_exact(GROUP_BYTES)
        .zip(out.chunks_exact_mut(GROUP_SAMPLES))
    {
        for k in 0..GROUP_SAMPLES {
            samples[k] = (word(group, k) & MASKS[k]) >> SHIFTS[k];
        }
    }

    Ok(())
}

/// Convenience wrapper returning a freshly allocated sample vector
pub fn unpack_line(packed: &[u8]) -> SeviriResult<Vec<u16>> {
    let mut out = vec![0u16; packed.len() / GROUP_BYTES * GROUP_SAMPLES];
    unpack_10bit(packed, &mut out)?;
    Ok(out)
}

/// Inverse of [`unpack_10bit`]. Samples are truncated to 10 bits and only
/// whole groups of four are written.
pub fn pack_10bit(samples: &[u16], packed: &mut [u8]) -> SeviriResult<()> {
    let n_groups = samples.len() / GROUP_SAMPLES;
    if packed.len() < n_groups * GROUP_BYTES {
        return Err(SeviriError::Processing(format!(
            "pack buffer too small: {} bytes for {} groups",
            packed.len(),
            n_groups
        )));
    }

    for (group, values) in packed
        .chunks_exact_mut(GROUP_BYTES)
        .zip(samples.chunks_exact(GROUP_SAMPLES))
    {
        group.fill(0);
        for k in 0..GROUP_SAMPLES {
            let bits = ((values[k] & 0x03FF) << SHIFTS[k]).to_be_bytes();
            group[k] |= bits[0];
            group[k + 1] |= bits[1];
        }
    }

    Ok(())
}
