//! Plant identification client.
//!
//! The plant service is larger than its siblings: identification requests
//! carry extra classification controls, a second endpoint runs disease-only
//! health assessments, and the answer shape depends on the request rather
//! than the response alone. [`PlantClient`] wraps the generic client and
//! adds that surface; everything else delegates.

use std::time::Duration;

use reqwest::Method;
use serde_json::{Map, Value};

use kindwise_image::ImageSource;

use crate::client::KindwiseClient;
use crate::domain::{self, DomainProfile};
use crate::error::Result;
use crate::options::{AskOptions, IdentifyOptions, KbDetailOptions, RetrieveOptions, SearchOptions};
use crate::payload::{build_payload, merge_details};
use crate::query::{self, QueryParams};
use crate::types::{
    ClassificationLevel, Conversation, HealthAssessmentResult, IdentToken, Identification,
    IdentificationStatus, PlantResult, RawPlantResult, SearchResult, UsageInfo,
};
use crate::views::{self, DetailView};

/// How much of the health assessment to fold into an identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    /// Run species classification and disease assessment together.
    All,
    /// Skip species classification and return only the assessment.
    Only,
}

impl Health {
    pub fn as_str(self) -> &'static str {
        match self {
            Health::All => "all",
            Health::Only => "only",
        }
    }
}

/// Options for [`PlantClient::identify`].
///
/// `disease_details` merge into the shared `details` list, de-duplicated in
/// first-seen order, so disease fields can be requested without repeating
/// the generic ones.
#[derive(Debug, Clone, Default)]
pub struct PlantIdentifyOptions {
    pub base: IdentifyOptions,
    /// Request a health assessment alongside or instead of classification.
    pub health: Option<Health>,
    /// Restrict suggestions to one taxonomic level.
    pub classification_level: Option<ClassificationLevel>,
    /// Ask for rank-structured suggestions instead of a flat list.
    pub classification_raw: bool,
    pub disease_details: Option<Vec<String>>,
    /// Include low-probability diseases in the answer.
    pub full_disease_list: bool,
}

/// Options for fetching plant identifications and health assessments.
#[derive(Debug, Clone, Default)]
pub struct PlantRetrieveOptions {
    pub base: RetrieveOptions,
    pub disease_details: Option<Vec<String>>,
    pub full_disease_list: bool,
}

/// Options for [`PlantClient::health_assessment`].
#[derive(Debug, Clone, Default)]
pub struct HealthAssessmentOptions {
    pub base: IdentifyOptions,
    pub full_disease_list: bool,
}

/// Answer of a plant identification request.
///
/// The service reshapes its answer based on the request:
/// `classification_raw` replaces the flat suggestion list with per-rank
/// lists, and `health: Only` drops classification entirely. The request
/// options picked the variant, so the decode carries them over.
#[derive(Debug, Clone, PartialEq)]
pub enum PlantIdentification {
    Standard(Identification<PlantResult>),
    Raw(Identification<RawPlantResult>),
    HealthAssessment(Identification<HealthAssessmentResult>),
}

impl PlantIdentification {
    pub(crate) fn from_value(value: Value, classification_raw: bool, health_only: bool) -> Result<Self> {
        if classification_raw {
            Ok(PlantIdentification::Raw(serde_json::from_value(value)?))
        } else if health_only {
            Ok(PlantIdentification::HealthAssessment(serde_json::from_value(value)?))
        } else {
            Ok(PlantIdentification::Standard(serde_json::from_value(value)?))
        }
    }

    pub fn access_token(&self) -> &str {
        match self {
            PlantIdentification::Standard(identification) => &identification.access_token,
            PlantIdentification::Raw(identification) => &identification.access_token,
            PlantIdentification::HealthAssessment(identification) => &identification.access_token,
        }
    }

    pub fn status(&self) -> IdentificationStatus {
        match self {
            PlantIdentification::Standard(identification) => identification.status,
            PlantIdentification::Raw(identification) => identification.status,
            PlantIdentification::HealthAssessment(identification) => identification.status,
        }
    }

    pub fn custom_id(&self) -> Option<i64> {
        match self {
            PlantIdentification::Standard(identification) => identification.custom_id,
            PlantIdentification::Raw(identification) => identification.custom_id,
            PlantIdentification::HealthAssessment(identification) => identification.custom_id,
        }
    }

    pub fn as_standard(&self) -> Option<&Identification<PlantResult>> {
        match self {
            PlantIdentification::Standard(identification) => Some(identification),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&Identification<RawPlantResult>> {
        match self {
            PlantIdentification::Raw(identification) => Some(identification),
            _ => None,
        }
    }

    pub fn as_health_assessment(&self) -> Option<&Identification<HealthAssessmentResult>> {
        match self {
            PlantIdentification::HealthAssessment(identification) => Some(identification),
            _ => None,
        }
    }
}

/// Body fields the plant domain layers over the shared payload. Layered
/// after `extra_post_params`, so these keys always win.
pub(crate) fn plant_domain_fields(opts: &PlantIdentifyOptions) -> Map<String, Value> {
    let mut fields = Map::new();
    if let Some(health) = opts.health {
        fields.insert("health".to_string(), Value::String(health.as_str().to_string()));
    }
    if let Some(level) = opts.classification_level {
        let level = match level {
            ClassificationLevel::All => "all",
            ClassificationLevel::Genus => "genus",
            ClassificationLevel::Species => "species",
        };
        fields.insert("classification_level".to_string(), Value::String(level.to_string()));
    }
    if opts.classification_raw {
        fields.insert("classification_raw".to_string(), Value::Bool(true));
    }
    fields
}

pub(crate) fn plant_identify_query(opts: &PlantIdentifyOptions) -> String {
    let details = merge_details(opts.base.details.as_deref(), opts.disease_details.as_deref());
    let query = query::build_query(&QueryParams {
        details: details.as_deref(),
        language: opts.base.language.as_deref(),
        asynchronous: opts.base.asynchronous,
        extra: opts.base.extra_get_params.as_ref(),
        ..QueryParams::default()
    });
    append_full_disease_list(query, opts.full_disease_list)
}

pub(crate) fn plant_retrieve_query(opts: &PlantRetrieveOptions) -> String {
    let details = merge_details(opts.base.details.as_deref(), opts.disease_details.as_deref());
    let query = query::build_query(&QueryParams {
        details: details.as_deref(),
        language: opts.base.language.as_deref(),
        extra: opts.base.extra_get_params.as_ref(),
        ..QueryParams::default()
    });
    append_full_disease_list(query, opts.full_disease_list)
}

pub(crate) fn health_assessment_query(opts: &HealthAssessmentOptions) -> String {
    append_full_disease_list(query::identify_query(&opts.base), opts.full_disease_list)
}

fn append_full_disease_list(query: String, full_disease_list: bool) -> String {
    if full_disease_list {
        query::append_param(&query, "full_disease_list=true")
    } else {
        query
    }
}

/// Client for the plant identification service.
pub struct PlantClient {
    inner: KindwiseClient<PlantResult>,
}

impl PlantClient {
    /// Plant client with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            inner: KindwiseClient::with_profile(&domain::PLANT, api_key),
        }
    }

    /// Plant client with the key from `PLANT_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            inner: KindwiseClient::with_profile_from_env(&domain::PLANT)?,
        })
    }

    /// Replace the default per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.with_timeout(timeout);
        self
    }

    pub fn profile(&self) -> &'static DomainProfile {
        self.inner.profile()
    }

    /// Submit images for identification. The returned variant follows the
    /// request: see [`PlantIdentification`].
    pub async fn identify<I>(&self, images: I, opts: &PlantIdentifyOptions) -> Result<PlantIdentification>
    where
        I: IntoIterator,
        I::Item: Into<ImageSource>,
    {
        let encoded = self.inner.encode_images(images, opts.base.max_image_size).await?;
        let mut payload = build_payload(encoded, &opts.base)?;
        payload.extend(plant_domain_fields(opts));
        let url = format!(
            "{}{}",
            self.profile().identification_url(),
            plant_identify_query(opts)
        );
        let value = self
            .inner
            .call_json(Method::POST, &url, Some(&Value::Object(payload)), opts.base.timeout)
            .await?;
        PlantIdentification::from_value(value, opts.classification_raw, opts.health == Some(Health::Only))
    }

    /// Fetch an identification by access token or custom id. Fetches decode
    /// as the standard variant; use
    /// [`get_health_assessment`](Self::get_health_assessment) for
    /// disease-only records.
    pub async fn get_identification(
        &self,
        token: impl Into<IdentToken>,
        opts: &PlantRetrieveOptions,
    ) -> Result<Identification<PlantResult>> {
        let url = format!(
            "{}/{}{}",
            self.profile().identification_url(),
            token.into(),
            plant_retrieve_query(opts)
        );
        let value = self
            .inner
            .call_json(Method::GET, &url, None, opts.base.timeout)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Delete an identification. `true` on success.
    pub async fn delete_identification(&self, token: impl Into<IdentToken>) -> Result<bool> {
        self.inner.delete_identification(token).await
    }

    /// Run a disease-only health assessment.
    pub async fn health_assessment<I>(
        &self,
        images: I,
        opts: &HealthAssessmentOptions,
    ) -> Result<Identification<HealthAssessmentResult>>
    where
        I: IntoIterator,
        I::Item: Into<ImageSource>,
    {
        let encoded = self.inner.encode_images(images, opts.base.max_image_size).await?;
        let payload = build_payload(encoded, &opts.base)?;
        let url = format!(
            "{}{}",
            self.profile().health_assessment_url(),
            health_assessment_query(opts)
        );
        let value = self
            .inner
            .call_json(Method::POST, &url, Some(&Value::Object(payload)), opts.base.timeout)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch a health assessment. Assessments live in the identification
    /// namespace, so this reads `identification_url/{token}` and decodes
    /// the disease-only shape.
    pub async fn get_health_assessment(
        &self,
        token: impl Into<IdentToken>,
        opts: &PlantRetrieveOptions,
    ) -> Result<Identification<HealthAssessmentResult>> {
        let url = format!(
            "{}/{}{}",
            self.profile().identification_url(),
            token.into(),
            plant_retrieve_query(opts)
        );
        let value = self
            .inner
            .call_json(Method::GET, &url, None, opts.base.timeout)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Delete a health assessment. `true` on success.
    pub async fn delete_health_assessment(&self, token: impl Into<IdentToken>) -> Result<bool> {
        self.inner.delete_identification(token).await
    }

    /// Current account quota.
    pub async fn usage_info(&self) -> Result<UsageInfo> {
        self.inner.usage_info().await
    }

    /// Attach a rating and/or comment to an identification.
    pub async fn feedback(
        &self,
        token: impl Into<IdentToken>,
        comment: Option<&str>,
        rating: Option<i64>,
    ) -> Result<bool> {
        self.inner.feedback(token, comment, rating).await
    }

    /// Search the plant knowledge bases (`plants` by default, `diseases`
    /// via [`SearchOptions::kb_type`]).
    pub async fn search(&self, q: &str, opts: &SearchOptions) -> Result<SearchResult> {
        self.inner.search(q, opts).await
    }

    /// Fetch raw knowledge-base detail fields for a search hit.
    pub async fn get_kb_detail(
        &self,
        access_token: &str,
        details: &[&str],
        opts: &KbDetailOptions,
    ) -> Result<Map<String, Value>> {
        self.inner.get_kb_detail(access_token, details, opts).await
    }

    /// Ask a follow-up question about a finished identification.
    pub async fn ask_question(
        &self,
        token: impl Into<IdentToken>,
        question: &str,
        opts: &AskOptions,
    ) -> Result<Conversation> {
        self.inner.ask_question(token, question, opts).await
    }

    /// Fetch the conversation attached to an identification.
    pub async fn get_conversation(&self, token: impl Into<IdentToken>) -> Result<Conversation> {
        self.inner.get_conversation(token).await
    }

    /// Delete the conversation attached to an identification.
    pub async fn delete_conversation(&self, token: impl Into<IdentToken>) -> Result<bool> {
        self.inner.delete_conversation(token).await
    }

    /// Attach caller-defined feedback to a conversation.
    pub async fn conversation_feedback(
        &self,
        token: impl Into<IdentToken>,
        feedback: &Value,
    ) -> Result<bool> {
        self.inner.conversation_feedback(token, feedback).await
    }

    /// Detail view descriptors for plant identifications.
    pub fn available_detail_views(&self) -> Result<Vec<DetailView>> {
        self.inner.available_detail_views()
    }

    /// Detail view descriptors for disease suggestions.
    pub fn available_disease_views(&self) -> Result<Vec<DetailView>> {
        match self.profile().disease_views {
            Some(raw) => views::parse_views(raw),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identification_envelope(result: &str) -> String {
        format!(
            r#"{{
                "access_token": "biXpmEC3qfdQTuN",
                "model_version": "plant_id:3.4.1",
                "custom_id": null,
                "input": {{
                    "images": ["base64"],
                    "datetime": "2023-11-28T08:38:48.538187+00:00",
                    "latitude": null,
                    "longitude": null,
                    "similar_images": true
                }},
                "result": {result},
                "status": "COMPLETED",
                "sla_compliant_client": true,
                "sla_compliant_system": true,
                "created": 1701160728.538187,
                "completed": 1701160729.031263
            }}"#
        )
    }

    fn standard_result() -> &'static str {
        r#"{
            "is_plant": {"probability": 0.99, "binary": true, "threshold": 0.5},
            "classification": {
                "suggestions": [
                    {"id": "p1", "name": "Taraxacum officinale", "probability": 0.97}
                ]
            }
        }"#
    }

    fn raw_result() -> &'static str {
        r#"{
            "is_plant": {"probability": 0.99, "binary": true, "threshold": 0.5},
            "classification": {
                "suggestions": {
                    "genus": [
                        {"id": "g1", "name": "Taraxacum", "probability": 0.91}
                    ],
                    "species": [
                        {"id": "s1", "name": "Taraxacum officinale", "probability": 0.88}
                    ]
                }
            }
        }"#
    }

    fn health_result() -> &'static str {
        r#"{
            "is_plant": {"probability": 0.99, "binary": true, "threshold": 0.5},
            "is_healthy": {"probability": 0.12, "binary": false, "threshold": 0.525},
            "disease": {
                "suggestions": [
                    {"id": "d1", "name": "water deficiency", "probability": 0.53}
                ]
            }
        }"#
    }

    #[test]
    fn test_identify_decodes_standard_variant() {
        let value: Value = serde_json::from_str(&identification_envelope(standard_result())).unwrap();
        let decoded = PlantIdentification::from_value(value, false, false).unwrap();
        assert_eq!(decoded.access_token(), "biXpmEC3qfdQTuN");
        assert_eq!(decoded.status(), IdentificationStatus::Completed);
        let standard = decoded.as_standard().unwrap();
        let result = standard.result.as_ref().unwrap();
        assert_eq!(result.classification.suggestions[0].name, "Taraxacum officinale");
        assert!(result.is_healthy.is_none());
        assert!(decoded.as_raw().is_none());
    }

    #[test]
    fn test_identify_decodes_raw_variant() {
        let value: Value = serde_json::from_str(&identification_envelope(raw_result())).unwrap();
        let decoded = PlantIdentification::from_value(value, true, false).unwrap();
        let raw = decoded.as_raw().unwrap();
        let suggestions = &raw.result.as_ref().unwrap().classification.suggestions;
        assert_eq!(suggestions.genus[0].name, "Taraxacum");
        assert_eq!(suggestions.species[0].name, "Taraxacum officinale");
        assert!(suggestions.infraspecies.is_none());
    }

    #[test]
    fn test_identify_decodes_health_only_variant() {
        let value: Value = serde_json::from_str(&identification_envelope(health_result())).unwrap();
        let decoded = PlantIdentification::from_value(value, false, true).unwrap();
        let assessment = decoded.as_health_assessment().unwrap();
        let result = assessment.result.as_ref().unwrap();
        assert!(!result.is_healthy.binary);
        assert_eq!(result.disease.suggestions[0].name, "water deficiency");
    }

    #[test]
    fn test_raw_takes_precedence_over_health_only() {
        let value: Value = serde_json::from_str(&identification_envelope(raw_result())).unwrap();
        let decoded = PlantIdentification::from_value(value, true, true).unwrap();
        assert!(decoded.as_raw().is_some());
    }

    #[test]
    fn test_domain_fields_are_conditional() {
        let opts = PlantIdentifyOptions::default();
        assert!(plant_domain_fields(&opts).is_empty());

        let opts = PlantIdentifyOptions {
            health: Some(Health::Only),
            classification_level: Some(ClassificationLevel::Genus),
            classification_raw: true,
            ..PlantIdentifyOptions::default()
        };
        let fields = plant_domain_fields(&opts);
        assert_eq!(fields["health"], Value::String("only".to_string()));
        assert_eq!(fields["classification_level"], Value::String("genus".to_string()));
        assert_eq!(fields["classification_raw"], Value::Bool(true));
    }

    #[test]
    fn test_domain_fields_skip_false_classification_raw() {
        let opts = PlantIdentifyOptions {
            health: Some(Health::All),
            ..PlantIdentifyOptions::default()
        };
        let fields = plant_domain_fields(&opts);
        assert_eq!(fields["health"], Value::String("all".to_string()));
        assert!(!fields.contains_key("classification_raw"));
        assert!(!fields.contains_key("classification_level"));
    }

    #[test]
    fn test_identify_query_merges_disease_details() {
        let opts = PlantIdentifyOptions {
            base: IdentifyOptions {
                details: Some(vec!["common_names".to_string(), "description".to_string()]),
                ..IdentifyOptions::default()
            },
            disease_details: Some(vec!["treatment".to_string(), "description".to_string()]),
            ..PlantIdentifyOptions::default()
        };
        assert_eq!(
            plant_identify_query(&opts),
            "?details=common_names,description,treatment"
        );
    }

    #[test]
    fn test_identify_query_appends_full_disease_list() {
        let opts = PlantIdentifyOptions {
            full_disease_list: true,
            ..PlantIdentifyOptions::default()
        };
        assert_eq!(plant_identify_query(&opts), "?full_disease_list=true");

        let opts = PlantIdentifyOptions {
            base: IdentifyOptions {
                details: Some(vec!["image".to_string()]),
                ..IdentifyOptions::default()
            },
            full_disease_list: true,
            ..PlantIdentifyOptions::default()
        };
        assert_eq!(plant_identify_query(&opts), "?details=image&full_disease_list=true");
    }

    #[test]
    fn test_retrieve_query_matches_identify_shape() {
        let opts = PlantRetrieveOptions {
            base: RetrieveOptions {
                language: Some(vec!["cz".to_string()]),
                ..RetrieveOptions::default()
            },
            disease_details: Some(vec!["treatment".to_string()]),
            full_disease_list: true,
        };
        assert_eq!(
            plant_retrieve_query(&opts),
            "?details=treatment&language=cz&full_disease_list=true"
        );
    }

    #[test]
    fn test_health_assessment_query_appends_after_async() {
        let opts = HealthAssessmentOptions {
            base: IdentifyOptions {
                asynchronous: true,
                ..IdentifyOptions::default()
            },
            full_disease_list: true,
        };
        assert_eq!(health_assessment_query(&opts), "?async=true&full_disease_list=true");
    }

    #[test]
    fn test_plant_views_include_disease_list() {
        let client = PlantClient::new("key");
        let views = client.available_detail_views().unwrap();
        assert!(views.iter().any(|v| v.name == "watering"));
        let disease_views = client.available_disease_views().unwrap();
        assert!(disease_views.iter().any(|v| v.name == "treatment"));
    }
}
