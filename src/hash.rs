//! Key hashing (component C1).
//!
//! Keys shorter than 16 bytes are zero-padded into a 16-byte scratch buffer
//! and hashed through the same path as a native 16-byte key, so hashing
//! never observes uninitialized padding in the caller's buffer. Keys longer
//! than 16 bytes are folded in 8-byte chunks.

use once_cell::sync::OnceCell;

const SEED32: u32 = 0x9E37_7989;
const GOLDEN64: u64 = 0x9E37_79B9_7F4A_7C15;

static HAS_HW_CRC32: OnceCell<bool> = OnceCell::new();

/// Detects (once per process) whether the host CPU has hardware CRC32
/// support, caching the result in process-wide state.
fn has_hw_crc32() -> bool {
    *HAS_HW_CRC32.get_or_init(|| {
        #[cfg(target_arch = "x86_64")]
        {
            std::is_x86_feature_detected!("sse4.2")
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            false
        }
    })
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.2")]
unsafe fn crc_hash16(v0: u64, v1: u64) -> u32 {
    use std::arch::x86_64::_mm_crc32_u64;
    let h = _mm_crc32_u64(SEED32 as u64, v0);
    let h = _mm_crc32_u64(h, v1);
    h as u32
}

#[inline]
fn mix(h: u64) -> u32 {
    let mut h = h.wrapping_mul(GOLDEN64);
    h ^= h >> 32;
    h ^= h >> 16;
    h as u32
}

/// Hashes a key that is already exactly 16 bytes (zero-padded if the real
/// key was shorter).
fn hash16(key16: &[u8; 16]) -> u32 {
    let v0 = u64::from_le_bytes(key16[0..8].try_into().unwrap());
    let v1 = u64::from_le_bytes(key16[8..16].try_into().unwrap());

    #[cfg(target_arch = "x86_64")]
    {
        if has_hw_crc32() {
            return unsafe { crc_hash16(v0, v1) };
        }
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        let _ = has_hw_crc32();
    }

    mix(v0 ^ v1.wrapping_add(GOLDEN64))
}

/// Hashes a key longer than 16 bytes, 8 bytes at a time.
fn hash_arbitrary(key: &[u8]) -> u32 {
    let mut h = GOLDEN64.wrapping_add(key.len() as u64);

    let mut chunks = key.chunks_exact(8);
    for chunk in &mut chunks {
        let word = u64::from_le_bytes(chunk.try_into().unwrap());
        h = (h ^ word).wrapping_mul(GOLDEN64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut buf = [0u8; 8];
        buf[..tail.len()].copy_from_slice(tail);
        let word = u64::from_le_bytes(buf);
        h = (h ^ word).wrapping_mul(GOLDEN64);
    }

    h ^= h >> 32;
    h ^= h >> 16;
    h as u32
}

/// Hashes a key of any length, dispatching to the fast 16-byte path or the
/// arbitrary-length chunked path.
pub(crate) fn hash_key(key: &[u8]) -> u32 {
    if key.len() > 16 {
        hash_arbitrary(key)
    } else {
        let mut scratch = [0u8; 16];
        scratch[..key.len()].copy_from_slice(key);
        hash16(&scratch)
    }
}
