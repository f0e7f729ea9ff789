//! The AES-CFB8 stream cipher used on every file of an encrypted pack.
//!
//! This is not the textbook CFB construction with a random IV: the shift
//! register is seeded with the first 16 bytes of the key itself, which is
//! what the Bedrock client expects. Feedback happens one byte at a time, so
//! ciphertext length always equals plaintext length and no padding is
//! involved.

use aes::cipher::KeyIvInit;
use aes::{Aes128, Aes192, Aes256};
use cfb8::cipher::AsyncStreamCipher;

use crate::{PackError, Result};

type Aes128Cfb8Enc = cfb8::Encryptor<Aes128>;
type Aes192Cfb8Enc = cfb8::Encryptor<Aes192>;
type Aes256Cfb8Enc = cfb8::Encryptor<Aes256>;
type Aes128Cfb8Dec = cfb8::Decryptor<Aes128>;
type Aes192Cfb8Dec = cfb8::Decryptor<Aes192>;
type Aes256Cfb8Dec = cfb8::Decryptor<Aes256>;

/// Validate a key without touching any data. Keys must be 16, 24 or 32
/// bytes; anything else fails AES initialisation.
pub fn check_key(key: &[u8]) -> Result<()> {
    match key.len() {
        16 | 24 | 32 => Ok(()),
        n => Err(PackError::Cipher(format!(
            "key must be 16, 24 or 32 bytes, got {n}"
        ))),
    }
}

/// Encrypt `data` in place with `key`, IV = first 16 key bytes.
pub fn encrypt_in_place(data: &mut [u8], key: &[u8]) -> Result<()> {
    check_key(key)?;
    let iv = &key[..16];
    match key.len() {
        16 => Aes128Cfb8Enc::new_from_slices(key, iv)
            .map_err(|e| PackError::Cipher(e.to_string()))?
            .encrypt(data),
        24 => Aes192Cfb8Enc::new_from_slices(key, iv)
            .map_err(|e| PackError::Cipher(e.to_string()))?
            .encrypt(data),
        _ => Aes256Cfb8Enc::new_from_slices(key, iv)
            .map_err(|e| PackError::Cipher(e.to_string()))?
            .encrypt(data),
    }
    Ok(())
}

/// Decrypt `data` in place with `key`, IV = first 16 key bytes.
pub fn decrypt_in_place(data: &mut [u8], key: &[u8]) -> Result<()> {
    check_key(key)?;
    let iv = &key[..16];
    match key.len() {
        16 => Aes128Cfb8Dec::new_from_slices(key, iv)
            .map_err(|e| PackError::Cipher(e.to_string()))?
            .decrypt(data),
        24 => Aes192Cfb8Dec::new_from_slices(key, iv)
            .map_err(|e| PackError::Cipher(e.to_string()))?
            .decrypt(data),
        _ => Aes256Cfb8Dec::new_from_slices(key, iv)
            .map_err(|e| PackError::Cipher(e.to_string()))?
            .decrypt(data),
    }
    Ok(())
}
