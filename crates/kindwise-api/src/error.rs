use std::fmt;

use kindwise_image::ImageError;

/// Errors from the identification clients.
#[derive(Debug)]
pub enum KindwiseError {
    /// An image input could not be resolved or encoded.
    Image(ImageError),
    /// A `date_time` value could not be normalized to ISO-8601.
    InvalidDateTime(String),
    /// HTTP transport failure before any response arrived.
    Http(Box<reqwest::Error>),
    /// The service answered with a non-2xx status.
    RemoteCallFailed { status: u16, body: String },
    /// The response body did not match the expected shape.
    Decode(String),
    /// A local precondition failed before any network work.
    Validation(String),
    /// The domain does not offer the requested operation.
    Unsupported(String),
    /// No API key was found in the named environment variable.
    MissingApiKey(&'static str),
}

impl fmt::Display for KindwiseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KindwiseError::Image(e) => write!(f, "Image error: {e}"),
            KindwiseError::InvalidDateTime(value) => write!(f, "Invalid datetime: {value}"),
            KindwiseError::Http(e) => write!(f, "HTTP error: {e}"),
            KindwiseError::RemoteCallFailed { status, body } => {
                write!(f, "Remote call failed with status {status}: {body}")
            }
            KindwiseError::Decode(msg) => write!(f, "Decode error: {msg}"),
            KindwiseError::Validation(msg) => write!(f, "Validation error: {msg}"),
            KindwiseError::Unsupported(msg) => write!(f, "Unsupported operation: {msg}"),
            KindwiseError::MissingApiKey(env_key) => write!(
                f,
                "API key is required, pass it to the constructor or set the {env_key} environment variable"
            ),
        }
    }
}

impl std::error::Error for KindwiseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KindwiseError::Image(e) => Some(e),
            KindwiseError::Http(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<ImageError> for KindwiseError {
    fn from(err: ImageError) -> Self {
        KindwiseError::Image(err)
    }
}

impl From<reqwest::Error> for KindwiseError {
    fn from(err: reqwest::Error) -> Self {
        KindwiseError::Http(Box::new(err))
    }
}

impl From<serde_json::Error> for KindwiseError {
    fn from(err: serde_json::Error) -> Self {
        KindwiseError::Decode(err.to_string())
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, KindwiseError>;
