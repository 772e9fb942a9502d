//! Image loading for `<img>` elements.
//!
//! Sources are `data:` URIs (base64) or paths, resolved against the
//! directory of the input document. Remote URLs are not fetched. Images that
//! cannot be read or decoded are skipped with a warning; they never fail the
//! conversion.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};

use crate::dom::{DomNode, Tag};

/// Encoded image bytes with the pixel size read from them.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub bytes: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

/// Images referenced by one document, keyed by their `src` attribute.
#[derive(Debug, Default)]
pub struct ImageStore {
    base_dir: Option<PathBuf>,
    images: HashMap<String, LoadedImage>,
}

impl ImageStore {
    pub fn new(base_dir: Option<&Path>) -> Self {
        Self {
            base_dir: base_dir.map(Path::to_path_buf),
            images: HashMap::new(),
        }
    }

    /// Load every distinct source, warning about the ones that fail.
    pub fn load_all<'a>(&mut self, srcs: impl IntoIterator<Item = &'a str>) {
        for src in srcs {
            if self.images.contains_key(src) {
                continue;
            }
            match self.load(src) {
                Ok(img) => {
                    log::debug!(
                        "loaded image {} ({}x{} px)",
                        preview(src),
                        img.width_px,
                        img.height_px
                    );
                    self.images.insert(src.to_string(), img);
                }
                Err(e) => log::warn!("skipping image {}: {e}", preview(src)),
            }
        }
    }

    pub fn get(&self, src: &str) -> Option<&LoadedImage> {
        self.images.get(src)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    fn load(&self, src: &str) -> Result<LoadedImage, String> {
        let bytes = self.read_source(src)?;
        let decoded = ::image::load_from_memory(&bytes).map_err(|e| format!("decode error: {e}"))?;
        let (width_px, height_px) = (decoded.width(), decoded.height());
        if width_px == 0 || height_px == 0 {
            return Err("image has no pixels".into());
        }
        Ok(LoadedImage {
            bytes,
            width_px,
            height_px,
        })
    }

    fn read_source(&self, src: &str) -> Result<Vec<u8>, String> {
        if src.starts_with("data:") {
            return parse_data_uri(src);
        }
        if src.contains("://") && !src.starts_with("file://") {
            return Err("remote images are not fetched".into());
        }
        let raw = src.strip_prefix("file://").unwrap_or(src);
        let decoded = percent_decode(raw);
        let path = Path::new(&decoded);
        let path = match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        };
        fs::read(&path).map_err(|e| format!("cannot read '{}': {e}", path.display()))
    }
}

/// Parse a `data:<mime>;base64,<data>` URI and return the raw decoded bytes.
fn parse_data_uri(src: &str) -> Result<Vec<u8>, String> {
    let rest = &src["data:".len()..];
    let comma_pos = rest
        .find(',')
        .ok_or("invalid data URI: missing ',' between header and data")?;
    let header = &rest[..comma_pos];
    if !header.contains(";base64") {
        return Err("only base64-encoded data URIs are supported".into());
    }
    let b64_data: String = rest[comma_pos + 1..]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    BASE64_STD
        .decode(b64_data)
        .map_err(|e| format!("base64 decode error: {e}"))
}

/// Decode `%XX` escapes, as Markdown renderers emit for spaces in paths.
fn percent_decode(s: &str) -> String {
    if !s.contains('%') {
        return s.to_string();
    }
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn preview(src: &str) -> String {
    if src.len() > 60 {
        let cut = (0..=60).rev().find(|&i| src.is_char_boundary(i)).unwrap_or(0);
        format!("'{}…'", &src[..cut])
    } else {
        format!("'{src}'")
    }
}

/// `src` of every `<img>` in document order.
pub fn collect_image_sources(nodes: &[DomNode]) -> Vec<&str> {
    let mut out = Vec::new();
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Img {
                if let Some(src) = e.src().filter(|s| !s.is_empty()) {
                    out.push(src);
                }
            }
            out.extend(collect_image_sources(&e.children));
        }
    }
    out
}

/// Solid-colour PNG of the given size.
#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ::image::RgbImage::from_pixel(width, height, ::image::Rgb([200, 10, 10]));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, ::image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

#[cfg(test)]
pub(crate) fn png_data_uri(width: u32, height: u32) -> String {
    format!("data:image/png;base64,{}", BASE64_STD.encode(png_bytes(width, height)))
}
