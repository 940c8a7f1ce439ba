//! Generic identification client.
//!
//! One client type serves every domain: a [`DomainProfile`] fixes the host
//! and capabilities, the type parameter fixes the result shape. The
//! concrete domains are type aliases with their own constructors; the
//! plant domain wraps this client in [`PlantClient`](crate::PlantClient)
//! to add its larger surface.

use std::marker::PhantomData;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use kindwise_image::{encode_image, ImageSource, Resolver};

use crate::domain::{self, DomainProfile};
use crate::error::{KindwiseError, Result};
use crate::options::{AskOptions, IdentifyOptions, KbDetailOptions, RetrieveOptions, SearchOptions};
use crate::payload::{ask_body, build_payload, feedback_body};
use crate::query::{self, QueryParams};
use crate::types::{
    Conversation, CropResult, IdentToken, Identification, InsectResult, MushroomResult, SearchResult,
    SnakeResult, UsageInfo,
};
use crate::views::{self, DetailView};

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for one Kindwise identification domain.
///
/// The domain is fixed by the [`DomainProfile`] passed at construction.
/// Use the domain constructors ([`InsectClient::new`] and friends) unless
/// you are pointing at a staging deployment with a custom profile.
#[derive(Debug)]
pub struct KindwiseClient<R> {
    api_key: String,
    profile: &'static DomainProfile,
    http: reqwest::Client,
    resolver: Resolver,
    timeout: Duration,
    _result: PhantomData<fn() -> R>,
}

impl<R: DeserializeOwned> KindwiseClient<R> {
    /// Create a client for `profile` with an explicit API key.
    pub fn with_profile(profile: &'static DomainProfile, api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::new();
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
    ///
    /// Accepts anything convertible into [`ImageSource`]: paths, raw or
    /// base64 bytes, URLs, readers, decoded images, or unclassified text.
    /// Pass a one-element array for a single image.
    pub async fn identify<I>(&self, images: I, opts: &IdentifyOptions) -> Result<Identification<R>>
    where
        I: IntoIterator,
        I::Item: Into<ImageSource>,
    {
        let encoded = self.encode_images(images, opts.max_image_size).await?;
        let payload = build_payload(encoded, opts)?;
        let url = format!("{}{}", self.profile.identification_url(), query::identify_query(opts));
        let value = self
            .call_json(Method::POST, &url, Some(&Value::Object(payload)), opts.timeout)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch an identification by access token or custom id.
    pub async fn get_identification(
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
        let value = self.call_json(Method::GET, &url, None, opts.timeout).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Delete an identification. `true` on success.
    pub async fn delete_identification(&self, token: impl Into<IdentToken>) -> Result<bool> {
        let url = format!("{}/{}", self.profile.identification_url(), token.into());
        self.call_discard(Method::DELETE, &url, None).await?;
        Ok(true)
    }

    /// Current account quota for this domain.
    pub async fn usage_info(&self) -> Result<UsageInfo> {
        let value = self
            .call_json(Method::GET, &self.profile.usage_info_url(), None, None)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Attach a rating and/or comment to an identification. At least one
    /// of the two must be given.
    pub async fn feedback(
        &self,
        token: impl Into<IdentToken>,
        comment: Option<&str>,
        rating: Option<i64>,
    ) -> Result<bool> {
        let body = feedback_body(comment, rating)?;
        let url = format!("{}/{}/feedback", self.profile.identification_url(), token.into());
        self.call_discard(Method::POST, &url, Some(&body)).await?;
        Ok(true)
    }

    /// Search the domain's knowledge base by name.
    pub async fn search(&self, q: &str, opts: &SearchOptions) -> Result<SearchResult> {
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
        let value = self.call_json(Method::GET, &url, None, opts.timeout).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch raw knowledge-base detail fields for an entity found through
    /// [`search`](Self::search). The field set is open-ended, so the
    /// response stays a JSON object.
    pub async fn get_kb_detail(
        &self,
        access_token: &str,
        details: &[&str],
        opts: &KbDetailOptions,
    ) -> Result<serde_json::Map<String, Value>> {
        let kb_type = domain::resolve_kb_type(self.profile, opts.kb_type.as_deref())?;
        let detail_names: Vec<String> = details.iter().map(|d| d.to_string()).collect();
        let query = query::build_query(&QueryParams {
            details: Some(&detail_names),
            language: opts.language.as_deref(),
            ..QueryParams::default()
        });
        let url = format!("{}/{}/{}{}", self.profile.kb_api_url(), kb_type, access_token, query);
        let value = self.call_json(Method::GET, &url, None, opts.timeout).await?;
        match value {
            Value::Object(map) => Ok(map),
            other => Err(KindwiseError::Decode(format!(
                "expected a JSON object for knowledge-base detail, got {other}"
            ))),
        }
    }

    /// Ask a follow-up question about a finished identification.
    pub async fn ask_question(
        &self,
        token: impl Into<IdentToken>,
        question: &str,
        opts: &AskOptions,
    ) -> Result<Conversation> {
        domain::require_conversation(self.profile)?;
        let body = ask_body(question, opts);
        let url = self.conversation_url(&token.into());
        let value = self.call_json(Method::POST, &url, Some(&body), opts.timeout).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch the conversation attached to an identification.
    pub async fn get_conversation(&self, token: impl Into<IdentToken>) -> Result<Conversation> {
        domain::require_conversation(self.profile)?;
        let url = self.conversation_url(&token.into());
        let value = self.call_json(Method::GET, &url, None, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Delete the conversation attached to an identification.
    pub async fn delete_conversation(&self, token: impl Into<IdentToken>) -> Result<bool> {
        domain::require_conversation(self.profile)?;
        let url = self.conversation_url(&token.into());
        self.call_discard(Method::DELETE, &url, None).await?;
        Ok(true)
    }

    /// Attach caller-defined feedback to a conversation.
    pub async fn conversation_feedback(
        &self,
        token: impl Into<IdentToken>,
        feedback: &Value,
    ) -> Result<bool> {
        domain::require_conversation(self.profile)?;
        let url = format!("{}/feedback", self.conversation_url(&token.into()));
        self.call_discard(Method::POST, &url, Some(feedback)).await?;
        Ok(true)
    }

    /// Detail view descriptors bundled for this domain.
    pub fn available_detail_views(&self) -> Result<Vec<DetailView>> {
        views::parse_views(self.profile.views)
    }

    pub(crate) async fn encode_images<I>(&self, images: I, max_image_size: Option<u32>) -> Result<Vec<String>>
    where
        I: IntoIterator,
        I::Item: Into<ImageSource>,
    {
        let mut encoded = Vec::new();
        for source in images {
            let bytes = self.resolver.resolve(source.into()).await?;
            encoded.push(encode_image(&bytes, max_image_size)?);
        }
        Ok(encoded)
    }

    fn conversation_url(&self, token: &IdentToken) -> String {
        format!("{}/{}/conversation", self.profile.identification_url(), token)
    }

    pub(crate) async fn call_json(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let response = self.send(method, url, body, timeout).await?;
        response
            .json()
            .await
            .map_err(|e| KindwiseError::Decode(e.to_string()))
    }

    pub(crate) async fn call_discard(&self, method: Method, url: &str, body: Option<&Value>) -> Result<()> {
        self.send(method, url, body, None).await?;
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response> {
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
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(domain = self.profile.name, status = %status, "kindwise api returned an error");
            let body = response.text().await.unwrap_or_default();
            return Err(KindwiseError::RemoteCallFailed {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Client for the insect identification service.
pub type InsectClient = KindwiseClient<InsectResult>;

/// Client for the mushroom identification service.
pub type MushroomClient = KindwiseClient<MushroomResult>;

/// Client for the crop health identification service.
pub type CropHealthClient = KindwiseClient<CropResult>;

/// Client for the snake identification service.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_without_key_fails() {
        std::env::remove_var("INSECT_API_KEY");
        let error = InsectClient::from_env().unwrap_err();
        assert!(matches!(error, KindwiseError::MissingApiKey("INSECT_API_KEY")));
    }

    #[test]
    fn test_from_env_with_key() {
        std::env::set_var("MUSHROOM_API_KEY", "b2a2f2c0-5e1a-4e4a-8b9a-5b6b0e2e2b9a");
        let client = MushroomClient::from_env().unwrap();
        assert_eq!(client.profile().name, "mushroom");
    }

    #[tokio::test]
    async fn test_ask_question_is_gated_for_insect() {
        let client = InsectClient::new("key");
        let error = client
            .ask_question("token", "Is it dangerous?", &AskOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(error, KindwiseError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_search_is_gated_for_crop_health() {
        let client = CropHealthClient::new("key");
        let error = client.search("maize", &SearchOptions::default()).await.unwrap_err();
        assert!(matches!(error, KindwiseError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_kb_detail_is_gated_for_snake() {
        let client = SnakeClient::new("key");
        let error = client
            .get_kb_detail("token", &["rank"], &KbDetailOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(error, KindwiseError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_search_rejects_empty_query() {
        let client = InsectClient::new("key");
        let error = client.search("", &SearchOptions::default()).await.unwrap_err();
        assert!(matches!(error, KindwiseError::Validation(_)));
    }

    #[tokio::test]
    async fn test_search_rejects_zero_limit() {
        let client = InsectClient::new("key");
        let opts = SearchOptions {
            limit: Some(0),
            ..SearchOptions::default()
        };
        let error = client.search("bee", &opts).await.unwrap_err();
        assert!(matches!(error, KindwiseError::Validation(_)));
    }

    #[tokio::test]
    async fn test_search_rejects_foreign_kb_type() {
        let client = InsectClient::new("key");
        let opts = SearchOptions {
            kb_type: Some("plants".to_string()),
            ..SearchOptions::default()
        };
        let error = client.search("bee", &opts).await.unwrap_err();
        assert!(matches!(error, KindwiseError::Validation(_)));
    }

    #[tokio::test]
    async fn test_feedback_requires_comment_or_rating() {
        let client = InsectClient::new("key");
        let error = client.feedback("token", None, None).await.unwrap_err();
        assert!(matches!(error, KindwiseError::Validation(_)));
    }

    #[test]
    fn test_detail_views_are_available() {
        let client = InsectClient::new("key");
        let views = client.available_detail_views().unwrap();
        assert!(views.iter().any(|v| v.name == "common_names"));
    }
}
