//! The `contents.json` envelope and the encrypt/decrypt pipeline.
//!
//! An encrypted pack stores its per-file key table inside `contents.json`: a
//! fixed 256-byte header (version, magic, separator, pack UUID as ASCII,
//! zero padding) followed by the CFB8-encrypted JSON index. Entries with an
//! empty key mark files that ship unencrypted — the client must be able to
//! read `manifest.json` and `pack_icon.png` before it has any key.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cipher;
use crate::keys;
use crate::pack::ResourcePack;
use crate::{PackError, Result};

/// Name of the key-table entry that marks a pack as encrypted.
pub const CONTENTS_NAME: &str = "contents.json";

const CONTENT_MAGIC: [u8; 4] = [0xfc, 0xb9, 0xcf, 0x9b];
const CONTENT_SEPARATOR: u8 = 0x24;
const CONTENT_HEADER_LEN: usize = 256;

/// Files stored without encryption inside an encrypted pack.
const EXEMPT_FILES: [&str; 2] = ["manifest.json", "pack_icon.png"];

/// The decrypted body of `contents.json`.
#[derive(Serialize, Deserialize, Debug)]
pub struct ContentIndex {
    pub content: Vec<ContentEntry>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ContentEntry {
    pub path: String,
    /// Per-file content key; empty for files stored in plaintext.
    #[serde(default)]
    pub key: String,
}

fn build_envelope(uuid: &str, body: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(CONTENT_HEADER_LEN + body.len());
    out.extend_from_slice(&[0u8; 4]); // version
    out.extend_from_slice(&CONTENT_MAGIC);
    out.extend_from_slice(&[0u8; 8]); // padding
    out.push(CONTENT_SEPARATOR);
    out.extend_from_slice(uuid.as_bytes());
    if out.len() > CONTENT_HEADER_LEN {
        return Err(PackError::InvalidManifest(
            "pack uuid does not fit the contents.json header".into(),
        ));
    }
    out.resize(CONTENT_HEADER_LEN, 0);
    out.extend_from_slice(body);
    Ok(out)
}

impl ResourcePack {
    /// Encrypt the pack in place with `key`.
    ///
    /// Every file except `manifest.json` and `pack_icon.png` is encrypted
    /// with its own fresh random 32-byte key; the key table goes into the
    /// `contents.json` envelope, whose JSON body is encrypted with the pack
    /// `key`. All results are staged and swapped in at once, so a failure
    /// leaves the pack unchanged.
    pub fn encrypt(&mut self, key: &[u8]) -> Result<()> {
        if self.encrypted {
            return Err(PackError::StateViolation(
                "pack is already encrypted".into(),
            ));
        }
        cipher::check_key(key)?;

        let mut staged: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        let mut entries = Vec::with_capacity(self.files.len());

        for (name, content) in &self.files {
            if EXEMPT_FILES.contains(&name.as_str()) {
                entries.push(ContentEntry {
                    path: name.clone(),
                    key: String::new(),
                });
                staged.insert(name.clone(), content.clone());
                continue;
            }

            let file_key = keys::generate_key();
            let mut encrypted = content.clone();
            cipher::encrypt_in_place(&mut encrypted, file_key.as_bytes())?;
            staged.insert(name.clone(), encrypted);
            entries.push(ContentEntry {
                path: name.clone(),
                key: file_key,
            });
        }

        let index = ContentIndex { content: entries };
        let mut body = serde_json::to_vec(&index)?;
        cipher::encrypt_in_place(&mut body, key)?;
        staged.insert(CONTENTS_NAME.into(), build_envelope(&self.uuid, &body)?);

        self.files = staged;
        self.encrypted = true;
        Ok(())
    }

    /// Decrypt the pack in place with `key`. A no-op on plaintext packs.
    ///
    /// A wrong pack key garbles the index JSON and surfaces as a
    /// [`PackError::Serialize`]. Index entries whose path is missing from
    /// the pack are skipped. On success `contents.json` is removed.
    pub fn decrypt(&mut self, key: &[u8]) -> Result<()> {
        if !self.encrypted {
            return Ok(());
        }

        let envelope = self.files.get(CONTENTS_NAME).ok_or_else(|| {
            PackError::MalformedArchive("contents.json missing from encrypted pack".into())
        })?;
        if envelope.len() < CONTENT_HEADER_LEN {
            return Err(PackError::MalformedArchive(format!(
                "contents.json is {} bytes, expected at least {CONTENT_HEADER_LEN}",
                envelope.len()
            )));
        }

        let mut body = envelope[CONTENT_HEADER_LEN..].to_vec();
        cipher::decrypt_in_place(&mut body, key)?;
        let index: ContentIndex = serde_json::from_slice(&body)?;

        let mut staged: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for entry in &index.content {
            if entry.key.is_empty() {
                continue;
            }
            let Some(content) = self.files.get(&entry.path) else {
                continue;
            };
            let mut decrypted = content.clone();
            cipher::decrypt_in_place(&mut decrypted, entry.key.as_bytes())
                .map_err(|e| PackError::Cipher(format!("failed to decrypt {}: {e}", entry.path)))?;
            staged.insert(entry.path.clone(), decrypted);
        }

        for (name, content) in staged {
            self.files.insert(name, content);
        }
        self.files.remove(CONTENTS_NAME);
        self.encrypted = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_layout() {
        let uuid = "01234567-89ab-4cde-8f01-23456789abcd";
        let body = b"BODYBYTES";
        let envelope = build_envelope(uuid, body).unwrap();

        assert_eq!(&envelope[0..4], &[0, 0, 0, 0]);
        assert_eq!(&envelope[4..8], &CONTENT_MAGIC);
        assert_eq!(&envelope[8..16], &[0u8; 8]);
        assert_eq!(envelope[16], 0x24);
        assert_eq!(&envelope[17..17 + uuid.len()], uuid.as_bytes());
        assert!(envelope[17 + uuid.len()..CONTENT_HEADER_LEN]
            .iter()
            .all(|&b| b == 0));
        assert_eq!(&envelope[CONTENT_HEADER_LEN..], body);
    }

    #[test]
    fn content_entry_key_defaults_to_empty() {
        let entry: ContentEntry = serde_json::from_str(r#"{"path":"manifest.json"}"#).unwrap();
        assert_eq!(entry.path, "manifest.json");
        assert!(entry.key.is_empty());
    }
}
