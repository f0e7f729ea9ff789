//! bedrockpack — Bedrock-edition resource pack tooling.
//!
//! A resource pack is a zip archive carrying a `manifest.json`, textures and
//! data files. Encrypted packs additionally carry a `contents.json`: a
//! 256-byte header followed by an AES-CFB8-encrypted index mapping each file
//! to its own 32-byte content key. This crate loads packs into memory,
//! encrypts and decrypts them, and can keep an encrypted pack continuously
//! rebuilt from a GitHub repository (the "on-the-fly" pipeline in [`otf`]).
//!
//! Security note: the cipher runs in a non-standard CFB-8 configuration where
//! the IV is the first 16 bytes of the key itself, so a key must never be
//! reused across different plaintexts. [`ResourcePack::encrypt`] generates a
//! fresh random key per file; only `contents.json` is encrypted with the pack
//! key directly.

use thiserror::Error;

pub mod cipher;
mod contents;
pub mod github;
pub mod keys;
pub mod listener;
mod optimize;
pub mod otf;
mod pack;

pub use contents::{ContentEntry, ContentIndex, CONTENTS_NAME};
pub use pack::ResourcePack;

pub mod prelude {
    pub use crate::listener::{PackListener, ServedPack};
    pub use crate::otf::{Otf, OtfConfig};
    pub use crate::{PackError, ResourcePack};
}

/// Errors produced by the pack codec, the model and the on-the-fly loop.
#[derive(Error, Debug)]
pub enum PackError {
    /// The byte buffer is not a readable zip archive, or `contents.json` is
    /// too short to carry its fixed header.
    #[error("malformed archive: {0}")]
    MalformedArchive(String),
    #[error("manifest.json not found")]
    MissingManifest,
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
    /// An operation was invoked in the wrong pack state, e.g. encrypting a
    /// pack that is already encrypted.
    #[error("{0}")]
    StateViolation(String),
    #[error("cipher init failed: {0}")]
    Cipher(String),
    #[error("serialize failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("image codec failed: {0}")]
    Image(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
    /// The remote API answered with a non-200 status or an empty commit list.
    #[error("remote api: {0}")]
    RemoteApi(String),
}

pub type Result<T> = std::result::Result<T, PackError>;
