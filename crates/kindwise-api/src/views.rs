//! Bundled detail view descriptors.
//!
//! Each domain ships a static list of the detail fields its service can
//! attach to suggestions, with flags for licensing and localization. The
//! lists are embedded at compile time from `resources/`.

use serde::Deserialize;

use crate::error::{KindwiseError, Result};

/// One requestable detail field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DetailView {
    pub name: String,
    /// Whether values come with licensing metadata that must be displayed.
    pub license: bool,
    /// Whether values follow the request's `language` setting.
    pub localized: bool,
}

pub(crate) fn parse_views(raw: &str) -> Result<Vec<DetailView>> {
    serde_json::from_str(raw).map_err(|e| KindwiseError::Decode(format!("bundled view list: {e}")))
}
