use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use image::DynamicImage;

/// A single image input accepted by the identification clients.
///
/// The explicit variants say what the value is and skip input sniffing.
/// [`ImageSource::Text`] takes any string and resolves it by precedence:
/// an `http(s)://` prefix is fetched (falling through to the other rules
/// when the fetch fails), short non-base64 strings are treated as
/// filesystem paths, canonical base64 is decoded, and anything else is
/// taken as raw bytes. [`ImageSource::Bytes`] keeps the base64 check so a
/// byte buffer holding base64 text yields the decoded image rather than
/// the ASCII text itself.
pub enum ImageSource {
    /// Filesystem path, read in full.
    Path(PathBuf),
    /// Raw image bytes; canonical base64 content is detected and decoded.
    Bytes(Vec<u8>),
    /// Base64-encoded image data, decoded strictly.
    Base64(String),
    /// Remote image, fetched with an HTTP GET.
    Url(String),
    /// Open reader, consumed to the end.
    Reader(Box<dyn Read + Send>),
    /// Already-decoded image, serialized to JPEG.
    Decoded(DynamicImage),
    /// Unclassified text, resolved by the precedence rules above.
    Text(String),
}

impl ImageSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        ImageSource::Path(path.into())
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        ImageSource::Bytes(data.into())
    }

    pub fn from_base64(data: impl Into<String>) -> Self {
        ImageSource::Base64(data.into())
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        ImageSource::Url(url.into())
    }

    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        ImageSource::Reader(Box::new(reader))
    }

    pub fn from_image(image: DynamicImage) -> Self {
        ImageSource::Decoded(image)
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        ImageSource::Text(text.into())
    }
}

// Payload-sized fields print their length, not their content.
impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            ImageSource::Bytes(data) => f.debug_tuple("Bytes").field(&data.len()).finish(),
            ImageSource::Base64(text) => f.debug_tuple("Base64").field(&text.len()).finish(),
            ImageSource::Url(url) => f.debug_tuple("Url").field(url).finish(),
            ImageSource::Reader(_) => f.write_str("Reader(..)"),
            ImageSource::Decoded(image) => f
                .debug_tuple("Decoded")
                .field(&(image.width(), image.height()))
                .finish(),
            ImageSource::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
        }
    }
}

impl From<&str> for ImageSource {
    fn from(text: &str) -> Self {
        ImageSource::Text(text.to_string())
    }
}

impl From<String> for ImageSource {
    fn from(text: String) -> Self {
        ImageSource::Text(text)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(data: Vec<u8>) -> Self {
        ImageSource::Bytes(data)
    }
}

impl From<&[u8]> for ImageSource {
    fn from(data: &[u8]) -> Self {
        ImageSource::Bytes(data.to_vec())
    }
}

impl From<DynamicImage> for ImageSource {
    fn from(image: DynamicImage) -> Self {
        ImageSource::Decoded(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_converts_to_text() {
        let source: ImageSource = "/tmp/bee.jpg".into();
        assert!(matches!(source, ImageSource::Text(ref t) if t == "/tmp/bee.jpg"));
    }

    #[test]
    fn test_pathbuf_converts_to_path() {
        let source: ImageSource = PathBuf::from("/tmp/bee.jpg").into();
        assert!(matches!(source, ImageSource::Path(_)));
    }

    #[test]
    fn test_bytes_convert_to_bytes() {
        let source: ImageSource = vec![0xffu8, 0xd8].into();
        assert!(matches!(source, ImageSource::Bytes(ref b) if b == &[0xff, 0xd8]));
    }

    #[test]
    fn test_debug_hides_payloads() {
        let source = ImageSource::from_bytes(vec![0u8; 4096]);
        assert_eq!(format!("{:?}", source), "Bytes(4096)");
    }
}
