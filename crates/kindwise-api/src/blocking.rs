//! Blocking variants of the identification clients.
//!
//! Same domains, options, and result types as the async clients; only the
//! transport blocks the calling thread. Query strings, payloads, and
//! decoding are the exact same code. Construct and use these outside an
//! async runtime; `reqwest::blocking` refuses to run on one.

use std::marker::PhantomData;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use kindwise_image::blocking::Resolver;
use kindwise_image::{encode_image, ImageSource};

use crate::client::DEFAULT_TIMEOUT;
use crate::domain::{self, DomainProfile};
use crate::error::{KindwiseError, Result};
use crate::options::{AskOptions, IdentifyOptions, KbDetailOptions, RetrieveOptions, SearchOptions};
use crate::payload::{ask_body, build_payload, feedback_body};
use crate::plant::{
    health_assessment_query, plant_domain_fields, plant_identify_query, plant_retrieve_query, Health,
    HealthAssessmentOptions, PlantIdentification, PlantIdentifyOptions, PlantRetrieveOptions,
};
use crate::query::{self, QueryParams};
use crate::types::{
    Conversation, CropResult, HealthAssessmentResult, IdentToken, Identification, InsectResult,
    MushroomResult, PlantResult, SearchResult, SnakeResult, UsageInfo,
};
use crate::views::{self, DetailView};

/// Blocking client for one Kindwise identification domain.
#[derive(Debug)]
pub struct KindwiseClient<R> {
    api_key: String,
    profile: &'static DomainProfile,
    http: reqwest::blocking::Client,
    resolver: Resolver,
    timeout: Duration,
    _result: PhantomData<fn() -> R>,
}

impl<R: DeserializeOwned> KindwiseClient<R> {
    /// Create a client for `profile` with an explicit API key.
    pub fn with_profile(profile: &'static DomainProfile, api_key: impl Into<String>) -> Self {
        let http = reqwest::blocking::Client::new();
        let resolver = Resolver::with_client(http.clone());
        Self {
            api_key: api_key.into(),
            profile,
            http,
            resolver,
            timeout: DEFAULT_TIMEOUT,
            _result: PhantomData,
        }
    }

    /// Create a client for `profile` with the key from its environment
    /// variable.
    pub fn with_profile_from_env(profile: &'static DomainProfile) -> Result<Self> {
        match std::env::var(profile.env_key) {
            Ok(key) if !key.is_empty() => Ok(Self::with_profile(profile, key)),
            _ => Err(KindwiseError::MissingApiKey(profile.env_key)),
        }
    }

    /// Replace the default per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The domain profile this client is bound to.
    pub fn profile(&self) -> &'static DomainProfile {
        self.profile
    }

    /// Submit images for identification.
    pub fn identify<I>(&self, images: I, opts: &IdentifyOptions) -> Result<Identification<R>>
    where
        I: IntoIterator,
        I::Item: Into<ImageSource>,
    {
        let encoded = self.encode_images(images, opts.max_image_size)?;
        let payload = build_payload(encoded, opts)?;
        let url = format!("{}{}", self.profile.identification_url(), query::identify_query(opts));
        let value = self.call_json(Method::POST, &url, Some(&Value::Object(payload)), opts.timeout)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch an identification by access token or custom id.
    pub fn get_identification(
        &self,
        token: impl Into<IdentToken>,
        opts: &RetrieveOptions,
    ) -> Result<Identification<R>> {
        let url = format!(
            "{}/{}{}",
            self.profile.identification_url(),
            token.into(),
            query::retrieve_query(opts)
        );
        let value = self.call_json(Method::GET, &url, None, opts.timeout)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Delete an identification. `true` on success.
    pub fn delete_identification(&self, token: impl Into<IdentToken>) -> Result<bool> {
        let url = format!("{}/{}", self.profile.identification_url(), token.into());
        self.call_discard(Method::DELETE, &url, None)?;
        Ok(true)
    }

    /// Current account quota for this domain.
    pub fn usage_info(&self) -> Result<UsageInfo> {
        let value = self.call_json(Method::GET, &self.profile.usage_info_url(), None, None)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Attach a rating and/or comment to an identification. At least one
    /// of the two must be given.
    pub fn feedback(
        &self,
        token: impl Into<IdentToken>,
        comment: Option<&str>,
        rating: Option<i64>,
    ) -> Result<bool> {
        let body = feedback_body(comment, rating)?;
        let url = format!("{}/{}/feedback", self.profile.identification_url(), token.into());
        self.call_discard(Method::POST, &url, Some(&body))?;
        Ok(true)
    }

    /// Search the domain's knowledge base by name.
    pub fn search(&self, q: &str, opts: &SearchOptions) -> Result<SearchResult> {
        let kb_type = domain::resolve_kb_type(self.profile, opts.kb_type.as_deref())?;
        if q.is_empty() {
            return Err(KindwiseError::Validation("search query must not be empty".to_string()));
        }
        if opts.limit == Some(0) {
            return Err(KindwiseError::Validation("search limit must be positive".to_string()));
        }
        let query = query::build_query(&QueryParams {
            q: Some(q),
            limit: opts.limit,
            language: opts.language.as_deref(),
            ..QueryParams::default()
        });
        let url = format!("{}/{}/name_search{}", self.profile.kb_api_url(), kb_type, query);
        let value = self.call_json(Method::GET, &url, None, opts.timeout)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch raw knowledge-base detail fields for a search hit.
    pub fn get_kb_detail(
        &self,
        access_token: &str,
        details: &[&str],
        opts: &KbDetailOptions,
    ) -> Result<Map<String, Value>> {
        let kb_type = domain::resolve_kb_type(self.profile, opts.kb_type.as_deref())?;
        let detail_names: Vec<String> = details.iter().map(|d| d.to_string()).collect();
        let query = query::build_query(&QueryParams {
            details: Some(&detail_names),
            language: opts.language.as_deref(),
            ..QueryParams::default()
        });
        let url = format!("{}/{}/{}{}", self.profile.kb_api_url(), kb_type, access_token, query);
        let value = self.call_json(Method::GET, &url, None, opts.timeout)?;
        match value {
            Value::Object(map) => Ok(map),
            other => Err(KindwiseError::Decode(format!(
                "expected a JSON object for knowledge-base detail, got {other}"
            ))),
        }
    }

    /// Ask a follow-up question about a finished identification.
    pub fn ask_question(
        &self,
        token: impl Into<IdentToken>,
        question: &str,
        opts: &AskOptions,
    ) -> Result<Conversation> {
        domain::require_conversation(self.profile)?;
        let body = ask_body(question, opts);
        let url = self.conversation_url(&token.into());
        let value = self.call_json(Method::POST, &url, Some(&body), opts.timeout)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch the conversation attached to an identification.
    pub fn get_conversation(&self, token: impl Into<IdentToken>) -> Result<Conversation> {
        domain::require_conversation(self.profile)?;
        let url = self.conversation_url(&token.into());
        let value = self.call_json(Method::GET, &url, None, None)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Delete the conversation attached to an identification.
    pub fn delete_conversation(&self, token: impl Into<IdentToken>) -> Result<bool> {
        domain::require_conversation(self.profile)?;
        let url = self.conversation_url(&token.into());
        self.call_discard(Method::DELETE, &url, None)?;
        Ok(true)
    }

    /// Attach caller-defined feedback to a conversation.
    pub fn conversation_feedback(&self, token: impl Into<IdentToken>, feedback: &Value) -> Result<bool> {
        domain::require_conversation(self.profile)?;
        let url = format!("{}/feedback", self.conversation_url(&token.into()));
        self.call_discard(Method::POST, &url, Some(feedback))?;
        Ok(true)
    }

    /// Detail view descriptors bundled for this domain.
    pub fn available_detail_views(&self) -> Result<Vec<DetailView>> {
        views::parse_views(self.profile.views)
    }

    fn encode_images<I>(&self, images: I, max_image_size: Option<u32>) -> Result<Vec<String>>
    where
        I: IntoIterator,
        I::Item: Into<ImageSource>,
    {
        let mut encoded = Vec::new();
        for source in images {
            let bytes = self.resolver.resolve(source.into())?;
            encoded.push(encode_image(&bytes, max_image_size)?);
        }
        Ok(encoded)
    }

    fn conversation_url(&self, token: &IdentToken) -> String {
        format!("{}/{}/conversation", self.profile.identification_url(), token)
    }

    fn call_json(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let response = self.send(method, url, body, timeout)?;
        response.json().map_err(|e| KindwiseError::Decode(e.to_string()))
    }

    fn call_discard(&self, method: Method, url: &str, body: Option<&Value>) -> Result<()> {
        self.send(method, url, body, None)?;
        Ok(())
    }

    fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        timeout: Option<Duration>,
    ) -> Result<reqwest::blocking::Response> {
        debug!(domain = self.profile.name, method = %method, url = %url, "kindwise api call");
        let mut request = self
            .http
            .request(method, url)
            .header("Content-Type", "application/json")
            .header("Api-Key", self.api_key.as_str())
            .timeout(timeout.unwrap_or(self.timeout));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            warn!(domain = self.profile.name, status = %status, "kindwise api returned an error");
            let body = response.text().unwrap_or_default();
            return Err(KindwiseError::RemoteCallFailed {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Blocking client for the insect identification service.
pub type InsectClient = KindwiseClient<InsectResult>;

/// Blocking client for the mushroom identification service.
pub type MushroomClient = KindwiseClient<MushroomResult>;

/// Blocking client for the crop health identification service.
pub type CropHealthClient = KindwiseClient<CropResult>;

/// Blocking client for the snake identification service.
pub type SnakeClient = KindwiseClient<SnakeResult>;

impl InsectClient {
    /// Insect client with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_profile(&domain::INSECT, api_key)
    }

    /// Insect client with the key from `INSECT_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::with_profile_from_env(&domain::INSECT)
    }
}

impl MushroomClient {
    /// Mushroom client with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_profile(&domain::MUSHROOM, api_key)
    }

    /// Mushroom client with the key from `MUSHROOM_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::with_profile_from_env(&domain::MUSHROOM)
    }
}

impl CropHealthClient {
    /// Crop health client with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_profile(&domain::CROP_HEALTH, api_key)
    }

    /// Crop health client with the key from `CROP_HEALTH_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::with_profile_from_env(&domain::CROP_HEALTH)
    }
}

impl SnakeClient {
    /// Snake client with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_profile(&domain::SNAKE, api_key)
    }

    /// Snake client with the key from `SNAKE_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::with_profile_from_env(&domain::SNAKE)
    }
}

/// Blocking client for the plant identification service.
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
    pub fn identify<I>(&self, images: I, opts: &PlantIdentifyOptions) -> Result<PlantIdentification>
    where
        I: IntoIterator,
        I::Item: Into<ImageSource>,
    {
        let encoded = self.inner.encode_images(images, opts.base.max_image_size)?;
        let mut payload = build_payload(encoded, &opts.base)?;
        payload.extend(plant_domain_fields(opts));
        let url = format!(
            "{}{}",
            self.profile().identification_url(),
            plant_identify_query(opts)
        );
        let value = self
            .inner
            .call_json(Method::POST, &url, Some(&Value::Object(payload)), opts.base.timeout)?;
        PlantIdentification::from_value(value, opts.classification_raw, opts.health == Some(Health::Only))
    }

    /// Fetch an identification by access token or custom id.
    pub fn get_identification(
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
        let value = self.inner.call_json(Method::GET, &url, None, opts.base.timeout)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Delete an identification. `true` on success.
    pub fn delete_identification(&self, token: impl Into<IdentToken>) -> Result<bool> {
        self.inner.delete_identification(token)
    }

    /// Run a disease-only health assessment.
    pub fn health_assessment<I>(
        &self,
        images: I,
        opts: &HealthAssessmentOptions,
    ) -> Result<Identification<HealthAssessmentResult>>
    where
        I: IntoIterator,
        I::Item: Into<ImageSource>,
    {
        let encoded = self.inner.encode_images(images, opts.base.max_image_size)?;
        let payload = build_payload(encoded, &opts.base)?;
        let url = format!(
            "{}{}",
            self.profile().health_assessment_url(),
            health_assessment_query(opts)
        );
        let value = self
            .inner
            .call_json(Method::POST, &url, Some(&Value::Object(payload)), opts.base.timeout)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch a health assessment from the identification namespace.
    pub fn get_health_assessment(
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
        let value = self.inner.call_json(Method::GET, &url, None, opts.base.timeout)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Delete a health assessment. `true` on success.
    pub fn delete_health_assessment(&self, token: impl Into<IdentToken>) -> Result<bool> {
        self.inner.delete_identification(token)
    }

    /// Current account quota.
    pub fn usage_info(&self) -> Result<UsageInfo> {
        self.inner.usage_info()
    }

    /// Attach a rating and/or comment to an identification.
    pub fn feedback(
        &self,
        token: impl Into<IdentToken>,
        comment: Option<&str>,
        rating: Option<i64>,
    ) -> Result<bool> {
        self.inner.feedback(token, comment, rating)
    }

    /// Search the plant knowledge bases.
    pub fn search(&self, q: &str, opts: &SearchOptions) -> Result<SearchResult> {
        self.inner.search(q, opts)
    }

    /// Fetch raw knowledge-base detail fields for a search hit.
    pub fn get_kb_detail(
        &self,
        access_token: &str,
        details: &[&str],
        opts: &KbDetailOptions,
    ) -> Result<Map<String, Value>> {
        self.inner.get_kb_detail(access_token, details, opts)
    }

    /// Ask a follow-up question about a finished identification.
    pub fn ask_question(
        &self,
        token: impl Into<IdentToken>,
        question: &str,
        opts: &AskOptions,
    ) -> Result<Conversation> {
        self.inner.ask_question(token, question, opts)
    }

    /// Fetch the conversation attached to an identification.
    pub fn get_conversation(&self, token: impl Into<IdentToken>) -> Result<Conversation> {
        self.inner.get_conversation(token)
    }

    /// Delete the conversation attached to an identification.
    pub fn delete_conversation(&self, token: impl Into<IdentToken>) -> Result<bool> {
        self.inner.delete_conversation(token)
    }

    /// Attach caller-defined feedback to a conversation.
    pub fn conversation_feedback(&self, token: impl Into<IdentToken>, feedback: &Value) -> Result<bool> {
        self.inner.conversation_feedback(token, feedback)
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
