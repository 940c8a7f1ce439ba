use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Timelike, Utc};
use serde_json::{Map, Value};

use crate::error::{KindwiseError, Result};

/// Default bound for the longer image side in pixels.
pub const DEFAULT_MAX_IMAGE_SIZE: u32 = 1500;

/// Options for creating an identification.
///
/// Plain data; fill in what you need with struct update syntax:
///
/// ```
/// use kindwise_api::IdentifyOptions;
///
/// let opts = IdentifyOptions {
///     details: Some(vec!["common_names".to_string()]),
///     latitude_longitude: Some((49.2034, 16.5732)),
///     ..IdentifyOptions::default()
/// };
/// ```
///
/// `asynchronous` selects the remote service's deferred processing mode
/// (poll for completion with a later fetch); it has nothing to do with
/// which client flavor performs the call.
#[derive(Debug, Clone)]
pub struct IdentifyOptions {
    /// Detail fields to include in suggestions.
    pub details: Option<Vec<String>>,
    /// Locale codes for localized detail values.
    pub language: Option<Vec<String>>,
    /// Ask the service to defer classification.
    pub asynchronous: bool,
    /// Include visually similar reference images. On unless switched off.
    pub similar_images: bool,
    /// Capture location, sent only as a complete pair.
    pub latitude_longitude: Option<(f64, f64)>,
    /// Caller-side identifier usable instead of the access token.
    pub custom_id: Option<i64>,
    /// Capture time.
    pub date_time: Option<DateTimeInput>,
    /// Bound for the longer image side; `None` sends images untouched.
    pub max_image_size: Option<u32>,
    /// Extension query parameters appended after the known segments.
    pub extra_get_params: Option<ExtraGetParams>,
    /// Extension body entries merged over the shared payload.
    pub extra_post_params: Option<Map<String, Value>>,
    /// Per-call timeout overriding the client default.
    pub timeout: Option<Duration>,
}

impl Default for IdentifyOptions {
    fn default() -> Self {
        Self {
            details: None,
            language: None,
            asynchronous: false,
            similar_images: true,
            latitude_longitude: None,
            custom_id: None,
            date_time: None,
            max_image_size: Some(DEFAULT_MAX_IMAGE_SIZE),
            extra_get_params: None,
            extra_post_params: None,
            timeout: None,
        }
    }
}

/// Options for fetching an existing identification.
#[derive(Debug, Clone, Default)]
pub struct RetrieveOptions {
    pub details: Option<Vec<String>>,
    pub language: Option<Vec<String>>,
    pub extra_get_params: Option<ExtraGetParams>,
    pub timeout: Option<Duration>,
}

/// Options for knowledge-base name search.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Maximum number of returned entities; service default when unset.
    pub limit: Option<u32>,
    pub language: Option<Vec<String>>,
    /// Knowledge-base type; the domain default when unset.
    pub kb_type: Option<String>,
    pub timeout: Option<Duration>,
}

/// Options for fetching knowledge-base entity detail.
#[derive(Debug, Clone, Default)]
pub struct KbDetailOptions {
    pub language: Option<Vec<String>>,
    /// Knowledge-base type; the domain default when unset.
    pub kb_type: Option<String>,
    pub timeout: Option<Duration>,
}

/// Options for asking a follow-up question about an identification.
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    /// Language model the service should answer with.
    pub model: Option<String>,
    pub app_name: Option<String>,
    /// Extra system prompt for the answer.
    pub prompt: Option<String>,
    pub temperature: Option<f64>,
    pub timeout: Option<Duration>,
}

/// Extension query parameters appended verbatim after the known segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtraGetParams {
    /// Pre-built query text, with or without a leading `?`.
    Raw(String),
    /// Ordered pairs serialized as `key=value` joined by `&`.
    Pairs(Vec<(String, String)>),
}

impl From<&str> for ExtraGetParams {
    fn from(text: &str) -> Self {
        ExtraGetParams::Raw(text.to_string())
    }
}

impl From<String> for ExtraGetParams {
    fn from(text: String) -> Self {
        ExtraGetParams::Raw(text)
    }
}

impl From<Vec<(String, String)>> for ExtraGetParams {
    fn from(pairs: Vec<(String, String)>) -> Self {
        ExtraGetParams::Pairs(pairs)
    }
}

/// Timestamp forms accepted for the payload `datetime` field.
#[derive(Debug, Clone, PartialEq)]
pub enum DateTimeInput {
    /// Timestamp with a UTC offset, serialized as RFC 3339.
    Timestamp(DateTime<FixedOffset>),
    /// Timestamp without an offset, serialized without one.
    Naive(NaiveDateTime),
    /// ISO-8601 text, validated and re-serialized.
    Iso(String),
    /// Seconds since the Unix epoch, interpreted in local time.
    Epoch(f64),
}

impl DateTimeInput {
    /// Normalize to the ISO-8601 text embedded in request payloads.
    /// Sub-second parts print as a six-digit fraction and are omitted
    /// entirely when zero.
    pub fn to_iso8601(&self) -> Result<String> {
        match self {
            DateTimeInput::Timestamp(dt) => {
                let format = if dt.timestamp_subsec_nanos() == 0 {
                    SecondsFormat::Secs
                } else {
                    SecondsFormat::Micros
                };
                Ok(dt.to_rfc3339_opts(format, false))
            }
            DateTimeInput::Naive(dt) => Ok(format_naive(dt)),
            DateTimeInput::Iso(text) => normalize_iso(text),
            DateTimeInput::Epoch(seconds) => epoch_to_iso(*seconds),
        }
    }
}

fn format_naive(dt: &NaiveDateTime) -> String {
    if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

fn normalize_iso(text: &str) -> Result<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(DateTimeInput::Timestamp(dt).to_iso8601()?);
    }
    if let Ok(dt) = text.parse::<NaiveDateTime>() {
        return Ok(format_naive(&dt));
    }
    if let Some(dt) = text.parse::<NaiveDate>().ok().and_then(|d| d.and_hms_opt(0, 0, 0)) {
        return Ok(format_naive(&dt));
    }
    Err(KindwiseError::InvalidDateTime(text.to_string()))
}

fn epoch_to_iso(seconds: f64) -> Result<String> {
    if !seconds.is_finite() {
        return Err(KindwiseError::InvalidDateTime(seconds.to_string()));
    }
    let micros = (seconds * 1_000_000.0).round() as i64;
    let dt = Local
        .timestamp_micros(micros)
        .single()
        .ok_or_else(|| KindwiseError::InvalidDateTime(seconds.to_string()))?;
    Ok(format_naive(&dt.naive_local()))
}

impl From<DateTime<Utc>> for DateTimeInput {
    fn from(dt: DateTime<Utc>) -> Self {
        DateTimeInput::Timestamp(dt.fixed_offset())
    }
}

impl From<DateTime<FixedOffset>> for DateTimeInput {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        DateTimeInput::Timestamp(dt)
    }
}

impl From<DateTime<Local>> for DateTimeInput {
    fn from(dt: DateTime<Local>) -> Self {
        DateTimeInput::Timestamp(dt.fixed_offset())
    }
}

impl From<NaiveDateTime> for DateTimeInput {
    fn from(dt: NaiveDateTime) -> Self {
        DateTimeInput::Naive(dt)
    }
}

impl From<&str> for DateTimeInput {
    fn from(text: &str) -> Self {
        DateTimeInput::Iso(text.to_string())
    }
}

impl From<String> for DateTimeInput {
    fn from(text: String) -> Self {
        DateTimeInput::Iso(text)
    }
}

impl From<f64> for DateTimeInput {
    fn from(seconds: f64) -> Self {
        DateTimeInput::Epoch(seconds)
    }
}

impl From<i64> for DateTimeInput {
    fn from(seconds: i64) -> Self {
        DateTimeInput::Epoch(seconds as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_defaults() {
        let opts = IdentifyOptions::default();
        assert!(opts.similar_images);
        assert!(!opts.asynchronous);
        assert_eq!(opts.max_image_size, Some(1500));
        assert!(opts.details.is_none());
    }

    #[test]
    fn test_timestamp_with_offset_keeps_microseconds() {
        let dt = DateTime::parse_from_rfc3339("2023-11-22T08:49:26.136448+00:00").unwrap();
        let input = DateTimeInput::from(dt);
        assert_eq!(input.to_iso8601().unwrap(), "2023-11-22T08:49:26.136448+00:00");
    }

    #[test]
    fn test_whole_second_timestamp_drops_fraction() {
        let dt = DateTime::parse_from_rfc3339("2023-11-22T08:49:26+02:00").unwrap();
        let input = DateTimeInput::from(dt);
        assert_eq!(input.to_iso8601().unwrap(), "2023-11-22T08:49:26+02:00");
    }

    #[test]
    fn test_naive_datetime_with_microseconds() {
        let dt: NaiveDateTime = "2023-11-28T08:38:48.538187".parse().unwrap();
        let input = DateTimeInput::from(dt);
        assert_eq!(input.to_iso8601().unwrap(), "2023-11-28T08:38:48.538187");
    }

    #[test]
    fn test_iso_text_passes_validation() {
        let input = DateTimeInput::from("2023-01-20T12:30:00");
        assert_eq!(input.to_iso8601().unwrap(), "2023-01-20T12:30:00");
    }

    #[test]
    fn test_date_only_text_expands_to_midnight() {
        let input = DateTimeInput::from("2023-11-28");
        assert_eq!(input.to_iso8601().unwrap(), "2023-11-28T00:00:00");
    }

    #[test]
    fn test_invalid_iso_text_is_rejected() {
        let input = DateTimeInput::from("2023-20-20");
        let error = input.to_iso8601().unwrap_err();
        assert!(matches!(error, KindwiseError::InvalidDateTime(_)));
    }

    #[test]
    fn test_fractional_epoch_uses_local_wall_clock() {
        let input = DateTimeInput::from(1700000000.5f64);
        let expected = Local
            .timestamp_micros(1700000000500000)
            .single()
            .unwrap()
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string();
        assert_eq!(input.to_iso8601().unwrap(), expected);
        assert!(expected.ends_with(".500000"));
    }

    #[test]
    fn test_whole_epoch_has_no_fraction() {
        let input = DateTimeInput::from(1234567890i64);
        let rendered = input.to_iso8601().unwrap();
        assert!(!rendered.contains('.'));
    }

    #[test]
    fn test_non_finite_epoch_is_rejected() {
        let input = DateTimeInput::from(f64::NAN);
        assert!(matches!(
            input.to_iso8601().unwrap_err(),
            KindwiseError::InvalidDateTime(_)
        ));
    }
}
