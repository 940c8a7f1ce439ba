//! Client library for the Kindwise identification services.
//!
//! Five remote domains share one API shape: plant ([plant.id]), insect,
//! mushroom, crop health, and snake identification. A client submits one
//! or more images, the service classifies them and stores an
//! identification resource that can be fetched, rated, asked about, and
//! deleted. This crate covers the full surface:
//!
//! - create / fetch / delete identifications, with per-request options
//!   (details, languages, coordinates, capture time, deferred processing,
//!   extension parameters)
//! - plant health assessments and the request-shaped plant result variants
//! - knowledge-base name search and raw entity detail
//! - conversations about finished identifications, where the domain
//!   supports them
//! - usage info, feedback, and the bundled detail view lists
//!
//! Image inputs go through [`kindwise_image`]: paths, URLs, raw or base64
//! bytes, readers, and decoded images all resolve to one encoded payload,
//! oversized pictures are scaled down before upload.
//!
//! Async clients are the primary API; the [`blocking`] module mirrors them
//! for synchronous callers.
//!
//! ```no_run
//! use kindwise_api::{IdentifyOptions, InsectClient};
//!
//! # async fn run() -> kindwise_api::Result<()> {
//! let client = InsectClient::from_env()?;
//! let opts = IdentifyOptions {
//!     details: Some(vec!["common_names".to_string(), "url".to_string()]),
//!     ..IdentifyOptions::default()
//! };
//! let identification = client.identify(["garden/bee.jpg"], &opts).await?;
//! if let Some(result) = &identification.result {
//!     for suggestion in &result.classification.suggestions {
//!         println!("{}: {:.1} %", suggestion.name, suggestion.probability * 100.0);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [plant.id]: https://plant.id

pub mod blocking;
mod client;
pub mod domain;
mod error;
mod options;
mod payload;
mod plant;
mod query;
mod types;
mod views;

pub use client::{
    CropHealthClient, InsectClient, KindwiseClient, MushroomClient, SnakeClient, DEFAULT_TIMEOUT,
};
pub use error::{KindwiseError, Result};
pub use options::{
    AskOptions, DateTimeInput, ExtraGetParams, IdentifyOptions, KbDetailOptions, RetrieveOptions,
    SearchOptions, DEFAULT_MAX_IMAGE_SIZE,
};
pub use plant::{
    Health, HealthAssessmentOptions, PlantClient, PlantIdentification, PlantIdentifyOptions,
    PlantRetrieveOptions,
};
pub use types::{
    CanUseCredits, Classification, ClassificationLevel, Conversation, CropResult, Feedback,
    HealthAssessmentResult, IdentToken, Identification, IdentificationStatus, Input, InsectResult,
    Limits, Message, MessageType, MushroomResult, PlantResult, RankedClassification,
    RankedSuggestions, RawPlantResult, ResultEvaluation, SearchEntity, SearchResult, SimilarImage,
    SnakeResult, Suggestion, UsageInfo,
};
pub use views::DetailView;

pub use kindwise_image::{ImageError, ImageSource};
