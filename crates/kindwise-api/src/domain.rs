//! Domain capability profiles.
//!
//! Every identification domain is described by one static record fixing
//! its service host, the environment variable holding its API key, and
//! which optional operations the service offers. Clients are composed
//! around a profile instead of subclassing a shared base, so a capability
//! difference is data here rather than an overridden method.

use crate::error::{KindwiseError, Result};

/// Capability record for one identification domain.
#[derive(Debug)]
pub struct DomainProfile {
    /// Domain name used in logs and error messages.
    pub name: &'static str,
    /// Service origin, scheme included.
    pub host: &'static str,
    /// API version path segment.
    pub api_version: &'static str,
    /// Environment variable consulted by the `from_env` constructors.
    pub env_key: &'static str,
    /// Knowledge-base types the service exposes, empty when none.
    pub kb_types: &'static [&'static str],
    /// Knowledge-base type used when the caller does not pick one.
    pub default_kb_type: Option<&'static str>,
    /// Whether the conversation sub-resource exists.
    pub supports_conversation: bool,
    /// Whether the dedicated health assessment endpoint exists.
    pub supports_health_assessment: bool,
    /// Bundled detail view descriptors (JSON).
    pub views: &'static str,
    /// Bundled disease detail view descriptors, when the domain has any.
    pub disease_views: Option<&'static str>,
}

impl DomainProfile {
    pub fn identification_url(&self) -> String {
        format!("{}/api/{}/identification", self.host, self.api_version)
    }

    pub fn usage_info_url(&self) -> String {
        format!("{}/api/{}/usage_info", self.host, self.api_version)
    }

    pub fn kb_api_url(&self) -> String {
        format!("{}/api/{}/kb", self.host, self.api_version)
    }

    pub fn health_assessment_url(&self) -> String {
        format!("{}/api/{}/health_assessment", self.host, self.api_version)
    }

    pub fn supports_knowledge_base(&self) -> bool {
        !self.kb_types.is_empty()
    }
}

/// Pick the knowledge-base type for a call, validating caller overrides
/// against the profile before any network traffic.
pub(crate) fn resolve_kb_type(
    profile: &'static DomainProfile,
    requested: Option<&str>,
) -> Result<&'static str> {
    let Some(default) = profile.default_kb_type else {
        return Err(KindwiseError::Unsupported(format!(
            "the {} domain has no knowledge base",
            profile.name
        )));
    };
    match requested {
        None => Ok(default),
        Some(kb_type) => profile
            .kb_types
            .iter()
            .find(|t| **t == kb_type)
            .copied()
            .ok_or_else(|| {
                KindwiseError::Validation(format!(
                    "unknown knowledge base type {:?} for the {} domain, expected one of {:?}",
                    kb_type, profile.name, profile.kb_types
                ))
            }),
    }
}

/// Fail early for domains without the conversation sub-resource.
pub(crate) fn require_conversation(profile: &DomainProfile) -> Result<()> {
    if profile.supports_conversation {
        Ok(())
    } else {
        Err(KindwiseError::Unsupported(format!(
            "asking questions is currently not supported by the {} API",
            profile.name
        )))
    }
}

pub static PLANT: DomainProfile = DomainProfile {
    name: "plant",
    host: "https://plant.id",
    api_version: "v3",
    env_key: "PLANT_API_KEY",
    kb_types: &["plants", "diseases"],
    default_kb_type: Some("plants"),
    supports_conversation: true,
    supports_health_assessment: true,
    views: include_str!("../resources/views.plant.json"),
    disease_views: Some(include_str!("../resources/views.plant.disease.json")),
};

pub static INSECT: DomainProfile = DomainProfile {
    name: "insect",
    host: "https://insect.kindwise.com",
    api_version: "v1",
    env_key: "INSECT_API_KEY",
    kb_types: &["insect"],
    default_kb_type: Some("insect"),
    supports_conversation: false,
    supports_health_assessment: false,
    views: include_str!("../resources/views.insect.json"),
    disease_views: None,
};

pub static MUSHROOM: DomainProfile = DomainProfile {
    name: "mushroom",
    host: "https://mushroom.kindwise.com",
    api_version: "v1",
    env_key: "MUSHROOM_API_KEY",
    kb_types: &["mushroom"],
    default_kb_type: Some("mushroom"),
    supports_conversation: false,
    supports_health_assessment: false,
    views: include_str!("../resources/views.mushroom.json"),
    disease_views: None,
};

pub static CROP_HEALTH: DomainProfile = DomainProfile {
    name: "crop health",
    host: "https://crop.kindwise.com",
    api_version: "v1",
    env_key: "CROP_HEALTH_API_KEY",
    kb_types: &[],
    default_kb_type: None,
    supports_conversation: false,
    supports_health_assessment: false,
    views: include_str!("../resources/views.crop_health.disease.json"),
    disease_views: None,
};

pub static SNAKE: DomainProfile = DomainProfile {
    name: "snake",
    host: "https://snake.kindwise.com",
    api_version: "v1",
    env_key: "SNAKE_API_KEY",
    kb_types: &[],
    default_kb_type: None,
    supports_conversation: true,
    supports_health_assessment: false,
    views: include_str!("../resources/views.snake.json"),
    disease_views: None,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plant_urls() {
        assert_eq!(PLANT.identification_url(), "https://plant.id/api/v3/identification");
        assert_eq!(PLANT.usage_info_url(), "https://plant.id/api/v3/usage_info");
        assert_eq!(PLANT.kb_api_url(), "https://plant.id/api/v3/kb");
        assert_eq!(
            PLANT.health_assessment_url(),
            "https://plant.id/api/v3/health_assessment"
        );
    }

    #[test]
    fn test_kindwise_domain_urls() {
        assert_eq!(
            INSECT.identification_url(),
            "https://insect.kindwise.com/api/v1/identification"
        );
        assert_eq!(
            MUSHROOM.usage_info_url(),
            "https://mushroom.kindwise.com/api/v1/usage_info"
        );
        assert_eq!(
            CROP_HEALTH.identification_url(),
            "https://crop.kindwise.com/api/v1/identification"
        );
        assert_eq!(
            SNAKE.identification_url(),
            "https://snake.kindwise.com/api/v1/identification"
        );
    }

    #[test]
    fn test_knowledge_base_capabilities() {
        assert!(PLANT.supports_knowledge_base());
        assert_eq!(PLANT.default_kb_type, Some("plants"));
        assert!(INSECT.supports_knowledge_base());
        assert!(MUSHROOM.supports_knowledge_base());
        assert!(!CROP_HEALTH.supports_knowledge_base());
        assert!(!SNAKE.supports_knowledge_base());
    }

    #[test]
    fn test_conversation_capabilities() {
        assert!(PLANT.supports_conversation);
        assert!(SNAKE.supports_conversation);
        assert!(!INSECT.supports_conversation);
        assert!(!MUSHROOM.supports_conversation);
        assert!(!CROP_HEALTH.supports_conversation);
    }

    #[test]
    fn test_kb_type_resolution() {
        assert_eq!(resolve_kb_type(&PLANT, None).unwrap(), "plants");
        assert_eq!(resolve_kb_type(&PLANT, Some("diseases")).unwrap(), "diseases");
        assert!(matches!(
            resolve_kb_type(&PLANT, Some("mushroom")),
            Err(KindwiseError::Validation(_))
        ));
        assert!(matches!(
            resolve_kb_type(&SNAKE, None),
            Err(KindwiseError::Unsupported(_))
        ));
    }

    #[test]
    fn test_conversation_gate() {
        assert!(require_conversation(&PLANT).is_ok());
        assert!(matches!(
            require_conversation(&INSECT),
            Err(KindwiseError::Unsupported(_))
        ));
    }
}
