//! Wire types for the identification services.
//!
//! Decoding is strict: required keys must be present and malformed values
//! fail the whole decode. `result` and `feedback` are the exceptions, since
//! the service omits them while processing is pending or before feedback
//! exists. Instants arrive as fractional Unix seconds and decode to UTC
//! timestamps.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle states of an identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentificationStatus {
    Created,
    Submitted,
    Completed,
    Failed,
}

/// Granularity of plant classification suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationLevel {
    All,
    Genus,
    Species,
}

/// Probability paired with the boolean verdict derived from a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ResultEvaluation {
    pub probability: f64,
    pub binary: bool,
    pub threshold: f64,
}

/// Reference image visually similar to the submitted one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimilarImage {
    pub id: String,
    pub url: String,
    pub similarity: f64,
    pub url_small: String,
    #[serde(default)]
    pub license_name: Option<String>,
    #[serde(default)]
    pub license_url: Option<String>,
    #[serde(default)]
    pub citation: Option<String>,
}

/// One candidate answer with its probability and requested details.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub name: String,
    pub probability: f64,
    /// Scientific name, sent by the crop health service.
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default)]
    pub similar_images: Option<Vec<SimilarImage>>,
    /// Requested detail fields, keyed by detail name.
    #[serde(default)]
    pub details: Option<Map<String, Value>>,
}

/// Flat list of suggestions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Classification {
    pub suggestions: Vec<Suggestion>,
}

/// Suggestions broken out by taxonomic rank, returned for raw plant
/// classification requests.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RankedSuggestions {
    pub genus: Vec<Suggestion>,
    pub species: Vec<Suggestion>,
    #[serde(default)]
    pub infraspecies: Option<Vec<Suggestion>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RankedClassification {
    pub suggestions: RankedSuggestions,
}

/// Standard plant result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlantResult {
    pub is_plant: ResultEvaluation,
    #[serde(default)]
    pub is_healthy: Option<ResultEvaluation>,
    pub classification: Classification,
    #[serde(default)]
    pub disease: Option<Classification>,
}

/// Plant result with rank-structured suggestions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawPlantResult {
    pub is_plant: ResultEvaluation,
    #[serde(default)]
    pub is_healthy: Option<ResultEvaluation>,
    pub classification: RankedClassification,
    #[serde(default)]
    pub disease: Option<Classification>,
}

/// Disease-focused plant result returned by health assessments.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthAssessmentResult {
    pub is_plant: ResultEvaluation,
    pub is_healthy: ResultEvaluation,
    pub disease: Classification,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InsectResult {
    pub is_insect: ResultEvaluation,
    pub classification: Classification,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MushroomResult {
    pub is_mushroom: ResultEvaluation,
    pub classification: Classification,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CropResult {
    pub is_plant: ResultEvaluation,
    pub crop: Classification,
    #[serde(default)]
    pub disease: Option<Classification>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SnakeResult {
    pub classification: Classification,
}

/// Echo of the request inputs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Input {
    pub images: Vec<String>,
    #[serde(deserialize_with = "deserialize_iso_datetime")]
    pub datetime: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub similar_images: bool,
    /// Plant requests echo their classification settings.
    #[serde(default)]
    pub classification_level: Option<ClassificationLevel>,
    #[serde(default)]
    pub classification_raw: Option<bool>,
}

/// Feedback attached to an identification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Feedback {
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// One identification resource, generic over the domain result shape.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(bound(deserialize = "R: serde::Deserialize<'de>"))]
pub struct Identification<R> {
    pub access_token: String,
    pub model_version: String,
    pub custom_id: Option<i64>,
    pub input: Input,
    /// Present only once the service finished processing.
    #[serde(default)]
    pub result: Option<R>,
    pub status: IdentificationStatus,
    pub sla_compliant_client: bool,
    pub sla_compliant_system: bool,
    #[serde(deserialize_with = "deserialize_epoch")]
    pub created: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_opt_epoch")]
    pub completed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub feedback: Option<Feedback>,
}

/// Per-window request quotas; `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Limits {
    pub day: Option<i64>,
    pub week: Option<i64>,
    pub month: Option<i64>,
    pub total: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CanUseCredits {
    pub value: bool,
    pub reason: Option<String>,
}

/// Account quota snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UsageInfo {
    pub active: bool,
    pub credit_limits: Limits,
    pub used: Limits,
    pub can_use_credits: CanUseCredits,
    pub remaining: Limits,
}

/// One knowledge-base name-search hit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchEntity {
    pub matched_in: String,
    pub matched_in_type: String,
    pub access_token: String,
    pub match_position: usize,
    pub match_length: usize,
}

/// Knowledge-base name-search response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchResult {
    pub entities: Vec<SearchEntity>,
    /// True when more entities matched than the limit allowed.
    pub entities_trimmed: bool,
    pub limit: u32,
}

/// Direction of one conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Question,
    Answer,
}

/// One message in an identification conversation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Message {
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(deserialize_with = "deserialize_iso_datetime")]
    pub created: DateTime<Utc>,
}

/// Question and answer thread attached to an identification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Conversation {
    pub messages: Vec<Message>,
    /// Access token of the identification the thread belongs to.
    pub identification: String,
    pub remaining_calls: i64,
    #[serde(default)]
    pub model_parameters: Map<String, Value>,
    #[serde(default)]
    pub feedback: Map<String, Value>,
}

/// Lookup key for identification resources: an access token, a numeric
/// custom id, or a decoded identification itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentToken(String);

impl fmt::Display for IdentToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentToken {
    fn from(token: &str) -> Self {
        IdentToken(token.to_string())
    }
}

impl From<String> for IdentToken {
    fn from(token: String) -> Self {
        IdentToken(token)
    }
}

impl From<i64> for IdentToken {
    fn from(custom_id: i64) -> Self {
        IdentToken(custom_id.to_string())
    }
}

impl<R> From<&Identification<R>> for IdentToken {
    fn from(identification: &Identification<R>) -> Self {
        IdentToken(identification.access_token.clone())
    }
}

fn epoch_to_utc(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let micros = (seconds * 1_000_000.0).round() as i64;
    Utc.timestamp_micros(micros).single()
}

fn deserialize_epoch<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = f64::deserialize(deserializer)?;
    epoch_to_utc(seconds).ok_or_else(|| de::Error::custom(format!("timestamp {seconds} out of range")))
}

fn deserialize_opt_epoch<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        None => Ok(None),
        Some(seconds) => epoch_to_utc(seconds)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("timestamp {seconds} out of range"))),
    }
}

/// ISO-8601 text with or without an offset; offset-free values are read as
/// UTC.
fn deserialize_iso_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_iso_datetime(&text).ok_or_else(|| de::Error::custom(format!("invalid datetime {text:?}")))
}

fn parse_iso_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    text.parse::<NaiveDateTime>()
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}
