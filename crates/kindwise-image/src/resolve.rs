use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use crate::encode::{decode_base64_strict, decode_canonical_base64, decode_if_base64, jpeg_bytes};
use crate::error::{ImageError, Result};
use crate::source::ImageSource;

/// Longest string still considered a candidate filesystem path.
const MAX_PATH_LENGTH: usize = 250;

/// What a text input turned out to be once the URL rule did not apply.
pub(crate) enum TextForm {
    /// Short and not base64: treat as a filesystem path.
    PathCandidate(String),
    /// Canonical base64, already decoded.
    Base64(Vec<u8>),
    /// Neither: the text's own bytes.
    Raw(Vec<u8>),
}

/// Classify a text input. Paths win over base64 only for strings that are
/// not themselves canonical base64, so short base64 payloads decode even
/// when a file of that name happens to exist.
pub(crate) fn classify_text(text: String) -> TextForm {
    let decoded = decode_canonical_base64(text.as_bytes());
    if text.len() <= MAX_PATH_LENGTH && decoded.is_none() {
        return TextForm::PathCandidate(text);
    }
    match decoded {
        Some(bytes) => TextForm::Base64(bytes),
        None => TextForm::Raw(text.into_bytes()),
    }
}

pub(crate) fn has_http_scheme(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}

pub(crate) fn read_stream(mut reader: Box<dyn Read + Send>) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    reader
        .read_to_end(&mut data)
        .map_err(|e| ImageError::InvalidInput(format!("cannot read image stream: {e}")))?;
    Ok(data)
}

/// Resolves [`ImageSource`] values into raw in-memory image bytes.
///
/// Remote inputs are fetched with an owned HTTP client, everything else is
/// handled through memory or the filesystem. The resolver holds no per-call
/// state, so one instance serves any number of concurrent calls.
#[derive(Debug)]
pub struct Resolver {
    http: reqwest::Client,
}

impl Resolver {
    /// Create a resolver with its own HTTP client.
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Create a resolver sharing an existing HTTP client's connection pool.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Resolve one input into raw image bytes.
    pub async fn resolve(&self, source: ImageSource) -> Result<Vec<u8>> {
        match source {
            ImageSource::Path(path) => read_path(&path).await,
            ImageSource::Bytes(data) => Ok(decode_if_base64(data)),
            ImageSource::Base64(text) => decode_base64_strict(&text),
            ImageSource::Url(url) => self.fetch(&url).await,
            ImageSource::Reader(reader) => read_stream(reader),
            ImageSource::Decoded(image) => jpeg_bytes(image),
            ImageSource::Text(text) => self.resolve_text(text).await,
        }
    }

    async fn resolve_text(&self, text: String) -> Result<Vec<u8>> {
        if has_http_scheme(&text) {
            match self.fetch(&text).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    warn!(url = %text, error = %e, "remote image fetch failed, trying other input forms");
                }
            }
        }
        match classify_text(text) {
            TextForm::PathCandidate(path) => read_path(Path::new(&path)).await,
            TextForm::Base64(bytes) => Ok(bytes),
            TextForm::Raw(bytes) => Ok(bytes),
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url = %url, "fetching remote image");
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ImageError::InvalidInput(format!(
                "image fetch returned status {}",
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_path(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| ImageError::InvalidInput(format!("cannot read image file {}: {e}", path.display())))
}
