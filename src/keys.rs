//! Content key generation and seeded UUID derivation.
//!
//! Keys are 32 ASCII bytes over `[a-z A-Z 0-9]`. The on-the-fly pipeline
//! derives both the pack key and the manifest UUIDs from the pack hash, so a
//! rebuild of identical content publishes under identical identifiers.

use rand::Rng;
use uuid::Uuid;

const KEY_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length in bytes of every pack and per-file content key.
pub const KEY_LEN: usize = 32;

/// A fresh random 32-byte key from the thread-local CSPRNG.
pub fn generate_key() -> String {
    let mut rng = rand::thread_rng();
    (0..KEY_LEN)
        .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
        .collect()
}

/// A deterministic 32-byte key: byte `i` is `alphabet[seed[i % len] % 62]`.
///
/// # Panics
///
/// Panics if `seed` is empty.
pub fn generate_key_from_seed(seed: &[u8]) -> String {
    assert!(!seed.is_empty(), "key seed must not be empty");
    (0..KEY_LEN)
        .map(|i| KEY_ALPHABET[seed[i % seed.len()] as usize % KEY_ALPHABET.len()] as char)
        .collect()
}

/// Derive a canonical v4-shaped UUID string from a seed.
///
/// The first 16 seed bytes become the UUID (zero-padded if shorter). The
/// last four bytes are treated as a big-endian u32 and incremented by
/// `counter` (wrapping), which is how one seed yields distinct UUIDs for the
/// pack header and each manifest module. Version and variant bits are forced
/// afterwards, so the result always reads as a valid random UUID.
pub fn uuid_from_seed(seed: &[u8], counter: u32) -> String {
    let mut bytes = [0u8; 16];
    let n = seed.len().min(16);
    bytes[..n].copy_from_slice(&seed[..n]);

    let tail = u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
    bytes[12..16].copy_from_slice(&tail.wrapping_add(counter).to_be_bytes());

    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes).to_string()
}
