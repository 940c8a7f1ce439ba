//! Blocking counterpart of [`Resolver`](crate::Resolver).
//!
//! Same inputs and precedence rules, synchronous IO. Construct it outside
//! of an async runtime; the blocking HTTP client refuses to run on one.

use std::path::Path;

use tracing::{debug, warn};

use crate::encode::{decode_base64_strict, decode_if_base64, jpeg_bytes};
use crate::error::{ImageError, Result};
use crate::resolve::{classify_text, has_http_scheme, read_stream, TextForm};
use crate::source::ImageSource;

/// Blocking resolver for [`ImageSource`] values.
#[derive(Debug)]
pub struct Resolver {
    http: reqwest::blocking::Client,
}

impl Resolver {
    /// Create a resolver with its own HTTP client.
    pub fn new() -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
        }
    }

    /// Create a resolver sharing an existing HTTP client's connection pool.
    pub fn with_client(http: reqwest::blocking::Client) -> Self {
        Self { http }
    }

    /// Resolve one input into raw image bytes.
    pub fn resolve(&self, source: ImageSource) -> Result<Vec<u8>> {
        match source {
            ImageSource::Path(path) => read_path(&path),
            ImageSource::Bytes(data) => Ok(decode_if_base64(data)),
            ImageSource::Base64(text) => decode_base64_strict(&text),
            ImageSource::Url(url) => self.fetch(&url),
            ImageSource::Reader(reader) => read_stream(reader),
            ImageSource::Decoded(image) => jpeg_bytes(image),
            ImageSource::Text(text) => self.resolve_text(text),
        }
    }

    fn resolve_text(&self, text: String) -> Result<Vec<u8>> {
        if has_http_scheme(&text) {
            match self.fetch(&text) {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    warn!(url = %text, error = %e, "remote image fetch failed, trying other input forms");
                }
            }
        }
        match classify_text(text) {
            TextForm::PathCandidate(path) => read_path(Path::new(&path)),
            TextForm::Base64(bytes) => Ok(bytes),
            TextForm::Raw(bytes) => Ok(bytes),
        }
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url = %url, "fetching remote image");
        let response = self.http.get(url).send()?;
        if !response.status().is_success() {
            return Err(ImageError::InvalidInput(format!(
                "image fetch returned status {}",
                response.status()
            )));
        }
        Ok(response.bytes()?.to_vec())
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

fn read_path(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| ImageError::InvalidInput(format!("cannot read image file {}: {e}", path.display())))
}
