use std::fmt;

/// Errors from resolving or encoding an image input.
#[derive(Debug)]
pub enum ImageError {
    /// The input could not be turned into image bytes (unreadable path,
    /// failed stream read, undecodable explicit base64, bad fetch status).
    InvalidInput(String),
    /// The resolved bytes could not be decoded or re-encoded as an image.
    Decode(String),
    /// HTTP transport failure while fetching a remote image.
    Http(Box<reqwest::Error>),
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::InvalidInput(msg) => write!(f, "Invalid image input: {msg}"),
            ImageError::Decode(msg) => write!(f, "Image decode error: {msg}"),
            ImageError::Http(e) => write!(f, "Image fetch error: {e}"),
        }
    }
}

impl std::error::Error for ImageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImageError::Http(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ImageError {
    fn from(err: reqwest::Error) -> Self {
        ImageError::Http(Box::new(err))
    }
}

/// Result type alias for image input handling.
pub type Result<T> = std::result::Result<T, ImageError>;
