//! The in-memory resource pack model.
//!
//! A pack is a map of archive-relative paths to file bytes plus the UUID
//! pulled from `manifest.json`. Loading normalizes away the single top-level
//! directory that packs distributed as repository archives usually carry, so
//! after a successful load `manifest.json` always sits at the map root.
//!
//! A `ResourcePack` is owned by one caller at a time; none of the mutating
//! operations are safe for concurrent use.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use serde_json::Value;
use sha2::{Digest, Sha256};
use zip::write::SimpleFileOptions;

use crate::contents::CONTENTS_NAME;
use crate::keys::uuid_from_seed;
use crate::{PackError, Result};

pub struct ResourcePack {
    pub(crate) uuid: String,
    pub(crate) files: BTreeMap<String, Vec<u8>>,
    pub(crate) encrypted: bool,
}

impl ResourcePack {
    /// Read a pack zip from disk. See [`ResourcePack::from_bytes`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Parse a pack from zip bytes.
    ///
    /// The first `manifest.json` (by basename) fixes the pack UUID and the
    /// base path; when the manifest sits inside a top-level directory, that
    /// prefix is stripped from every entry. Entries reduced to an empty name
    /// by the strip are dropped. The pack counts as encrypted iff a
    /// `contents.json` entry is present.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| PackError::MalformedArchive(e.to_string()))?;

        let mut files: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        // (base path, pack uuid) of the first manifest encountered
        let mut manifest: Option<(String, String)> = None;

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| PackError::MalformedArchive(e.to_string()))?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_owned();
            if name.is_empty() {
                continue;
            }

            let mut content = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut content)?;

            if manifest.is_none() && base_name(&name) == "manifest.json" {
                let uuid = manifest_header_uuid(&content)?;
                manifest = Some((parent_dir(&name).to_owned(), uuid));
            }
            files.insert(name, content);
        }

        let (base_path, uuid) = manifest.ok_or(PackError::MissingManifest)?;

        if !base_path.is_empty() {
            let prefix = format!("{base_path}/");
            let names: Vec<String> = files.keys().cloned().collect();
            for name in names {
                let Some(stripped) = name.strip_prefix(&prefix).map(str::to_owned) else {
                    continue;
                };
                if let Some(content) = files.remove(&name) {
                    if !stripped.is_empty() {
                        files.insert(stripped, content);
                    }
                }
            }
        }

        let encrypted = files.contains_key(CONTENTS_NAME);
        Ok(Self {
            uuid,
            files,
            encrypted,
        })
    }

    /// The pack UUID as read from `manifest.json → header.uuid`.
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// True iff the pack carries a `contents.json` index.
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    pub fn file(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn delete_file(&mut self, name: &str) {
        self.files.remove(name);
    }

    pub fn delete_files_by_prefix(&mut self, prefix: &str) {
        self.files.retain(|name, _| !name.starts_with(prefix));
    }

    pub fn delete_files_by_suffix(&mut self, suffix: &str) {
        self.files.retain(|name, _| !name.ends_with(suffix));
    }

    /// Serialize the pack back to zip bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in &self.files {
            writer
                .start_file(name.as_str(), options)
                .map_err(|e| PackError::MalformedArchive(e.to_string()))?;
            writer.write_all(content)?;
        }
        let cursor = writer
            .finish()
            .map_err(|e| PackError::MalformedArchive(e.to_string()))?;
        Ok(cursor.into_inner())
    }

    /// Write the pack zip to disk.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// SHA-256 over the file map in a canonical layout: a big-endian file
    /// count, then for every file in byte-lexicographic name order its
    /// length-prefixed name (backslashes normalized to `/`) and
    /// length-prefixed content. Independent of insertion order by
    /// construction.
    pub fn compute_hash(&self) -> [u8; 32] {
        let mut preimage = Vec::new();
        preimage.extend_from_slice(&(self.files.len() as u32).to_be_bytes());
        for (name, content) in &self.files {
            let name = name.replace('\\', "/");
            preimage.extend_from_slice(&(name.len() as u16).to_be_bytes());
            preimage.extend_from_slice(name.as_bytes());
            preimage.extend_from_slice(&(content.len() as u32).to_be_bytes());
            preimage.extend_from_slice(content);
        }
        Sha256::digest(&preimage).into()
    }

    /// Rewrite `header.uuid` and every `modules[].uuid` in the manifest with
    /// UUIDs derived from `seed` (a fresh random seed when `None`), then
    /// update the pack's own UUID. Seeds shorter than 16 bytes are
    /// zero-padded. The derivation counter starts at the header and
    /// increments per module, so all UUIDs are distinct.
    pub fn regenerate_uuid(&mut self, seed: Option<&[u8]>) -> Result<()> {
        let mut seed = match seed {
            Some(seed) => seed.to_vec(),
            None => {
                let mut random = vec![0u8; 16];
                rand::Rng::fill(&mut rand::thread_rng(), &mut random[..]);
                random
            }
        };
        if seed.len() < 16 {
            seed.resize(16, 0);
        }

        let manifest_bytes = self
            .files
            .get("manifest.json")
            .ok_or(PackError::MissingManifest)?;
        let mut manifest: Value = serde_json::from_slice(manifest_bytes)?;

        let mut counter = 0u32;
        let pack_uuid = uuid_from_seed(&seed, counter);
        counter += 1;

        manifest
            .get_mut("header")
            .ok_or_else(|| PackError::InvalidManifest("header not found".into()))?
            .as_object_mut()
            .ok_or_else(|| PackError::InvalidManifest("header is not an object".into()))?
            .insert("uuid".into(), Value::String(pack_uuid.clone()));

        if let Some(modules) = manifest.get_mut("modules") {
            let modules = modules
                .as_array_mut()
                .ok_or_else(|| PackError::InvalidManifest("modules is not an array".into()))?;
            for module in modules {
                let module = module.as_object_mut().ok_or_else(|| {
                    PackError::InvalidManifest("module is not an object".into())
                })?;
                module.insert("uuid".into(), Value::String(uuid_from_seed(&seed, counter)));
                counter += 1;
            }
        }

        self.files
            .insert("manifest.json".into(), serde_json::to_vec(&manifest)?);
        self.uuid = pack_uuid;
        Ok(())
    }
}

fn base_name(name: &str) -> &str {
    match name.rfind('/') {
        Some(i) => &name[i + 1..],
        None => name,
    }
}

fn parent_dir(name: &str) -> &str {
    match name.rfind('/') {
        Some(i) => &name[..i],
        None => "",
    }
}

fn manifest_header_uuid(bytes: &[u8]) -> Result<String> {
    let manifest: Value = serde_json::from_slice(bytes)?;
    let header = manifest
        .get("header")
        .ok_or_else(|| PackError::InvalidManifest("header not found".into()))?
        .as_object()
        .ok_or_else(|| PackError::InvalidManifest("header is not an object".into()))?;
    let uuid = header
        .get("uuid")
        .ok_or_else(|| PackError::InvalidManifest("header.uuid not found".into()))?
        .as_str()
        .ok_or_else(|| PackError::InvalidManifest("header.uuid is not a string".into()))?;
    Ok(uuid.to_owned())
}
