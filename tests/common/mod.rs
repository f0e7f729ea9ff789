//! Shared helpers for bedrockpack integration tests: in-memory zip
//! construction, canned pack contents and a recording listener.

#![allow(dead_code)]

use std::io::Write;
use std::sync::Mutex;

use bedrockpack::listener::{PackListener, ServedPack};
use zip::write::SimpleFileOptions;

pub const PACK_UUID: &str = "01234567-89ab-4cde-8f01-23456789abcd";
pub const MODULE_UUID: &str = "11234567-89ab-4cde-8f01-23456789abcd";

pub fn manifest_json() -> String {
    format!(
        r#"{{"format_version":2,"header":{{"name":"Test Pack","uuid":"{PACK_UUID}","version":[1,0,0]}},"modules":[{{"type":"resources","uuid":"{MODULE_UUID}","version":[1,0,0]}}]}}"#
    )
}

/// A data file with the comment styles packs ship in the wild.
pub const BLOCKS_JSON: &str = "{\n    // block definitions\n    \"stone\": {\"sound\": \"stone\"} // default sound\n}\n";
pub const BLOCKS_JSON_MINIFIED: &str = r#"{"stone":{"sound":"stone"}}"#;

/// Build an in-memory zip with the entries in the given order.
pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        writer.write_all(content).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// A small but real PNG, deliberately encoded at the fastest compression
/// level so the recompression pass has something to gain.
pub fn tiny_png() -> Vec<u8> {
    use image::codecs::png::{CompressionType, FilterType, PngEncoder};

    let mut img = image::RgbaImage::new(8, 8);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        *pixel = image::Rgba([(x * 32) as u8, (y * 32) as u8, 64, 255]);
    }
    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Fast, FilterType::NoFilter);
    image::DynamicImage::ImageRgba8(img)
        .write_with_encoder(encoder)
        .expect("encode test png");
    out
}

/// Zip bytes of a minimal plaintext pack at the archive root.
pub fn minimal_pack_zip() -> Vec<u8> {
    let manifest = manifest_json();
    let icon = tiny_png();
    build_zip(&[
        ("manifest.json", manifest.as_bytes()),
        ("pack_icon.png", &icon),
        ("textures/blocks.json", BLOCKS_JSON.as_bytes()),
    ])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    Added { uuid: String, key: String },
    Removed { uuid: String },
}

/// Listener that records every mutation and keeps the added packs around
/// for inspection.
#[derive(Default)]
pub struct RecordingListener {
    pub events: Mutex<Vec<ListenerEvent>>,
    pub added: Mutex<Vec<ServedPack>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<ListenerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn last_added(&self) -> ServedPack {
        self.added.lock().unwrap().last().expect("a pack was added").clone()
    }
}

impl PackListener for RecordingListener {
    fn add_resource_pack(&self, pack: ServedPack) {
        self.events.lock().unwrap().push(ListenerEvent::Added {
            uuid: pack.uuid().to_owned(),
            key: pack.content_key().to_owned(),
        });
        self.added.lock().unwrap().push(pack);
    }

    fn remove_resource_pack(&self, uuid: &str) {
        self.events.lock().unwrap().push(ListenerEvent::Removed {
            uuid: uuid.to_owned(),
        });
    }
}
