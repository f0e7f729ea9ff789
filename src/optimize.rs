//! Size optimization passes run on a plaintext pack before encryption.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::ImageFormat;
use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::pack::ResourcePack;
use crate::{PackError, Result};

// Whole-line comments preceded only by whitespace, and trailing comments
// whose payload carries no quote or bracket. The second pattern is a
// heuristic: it can misfire on URLs inside bare values, but never eats
// content inside strings or array brackets. Bedrock data files are not
// strict JSON, so this stays a regex pass rather than a JSONC parser.
static LINE_COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s+//.*$").expect("line comment regex"));
static TRAILING_COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?im)//[^"\[\]]+$"#).expect("trailing comment regex"));

impl ResourcePack {
    /// Strip line comments from every `.json` file and re-emit it in compact
    /// form. Files that still fail to parse after comment removal are left
    /// untouched; many packs ship data files with trailing commas.
    pub fn minify_json_files(&mut self) -> Result<()> {
        if self.encrypted {
            return Err(PackError::StateViolation("pack is encrypted".into()));
        }

        let names: Vec<String> = self
            .files
            .keys()
            .filter(|name| name.ends_with(".json"))
            .cloned()
            .collect();
        for name in names {
            let stripped = LINE_COMMENT_RE.replace_all(&self.files[&name], &b""[..]);
            let stripped = TRAILING_COMMENT_RE.replace_all(&stripped, &b""[..]);
            let Ok(value) = serde_json::from_slice::<serde_json::Value>(&stripped) else {
                continue;
            };
            let Ok(minified) = serde_json::to_vec(&value) else {
                continue;
            };
            self.files.insert(name, minified);
        }
        Ok(())
    }

    /// Re-encode every `.png` file at the encoder's best compression level,
    /// keeping the new bytes only when they are strictly smaller. A file
    /// that fails to decode as PNG aborts the pass.
    pub fn compress_png_files(&mut self) -> Result<()> {
        if self.encrypted {
            return Err(PackError::StateViolation("pack is encrypted".into()));
        }

        let names: Vec<String> = self
            .files
            .keys()
            .filter(|name| name.ends_with(".png"))
            .cloned()
            .collect();
        for name in names {
            let recompressed = recompress_png(&self.files[&name])?;
            if recompressed.len() < self.files[&name].len() {
                self.files.insert(name, recompressed);
            }
        }
        Ok(())
    }
}

fn recompress_png(data: &[u8]) -> Result<Vec<u8>> {
    let image = image::load_from_memory_with_format(data, ImageFormat::Png)
        .map_err(|e| PackError::Image(e.to_string()))?;
    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    image
        .write_with_encoder(encoder)
        .map_err(|e| PackError::Image(e.to_string()))?;
    Ok(out)
}
