use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::QueueError;
use crate::types::ItemMetadata;

/// Target marketplace for a batch run.
///
/// The profile determines which metadata fields a well-formed result
/// must carry: some marketplaces have no separate description field,
/// others ignore titles entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlatformProfile {
    /// Generic metadata suitable for uploading everywhere.
    All,
    AdobeStock,
    Shutterstock,
    Freepik,
}

impl PlatformProfile {
    pub fn requires_title(&self) -> bool {
        !matches!(self, PlatformProfile::Shutterstock)
    }

    pub fn requires_description(&self) -> bool {
        matches!(self, PlatformProfile::All | PlatformProfile::Shutterstock)
    }

    pub fn requires_keywords(&self) -> bool {
        true
    }

    /// Lowercase identifier used in export file names.
    pub fn slug(&self) -> &'static str {
        match self {
            PlatformProfile::All => "all",
            PlatformProfile::AdobeStock => "adobe_stock",
            PlatformProfile::Shutterstock => "shutterstock",
            PlatformProfile::Freepik => "freepik",
        }
    }

    /// Human-readable name used in generation prompts.
    pub fn label(&self) -> &'static str {
        match self {
            PlatformProfile::All => "all major stock platforms",
            PlatformProfile::AdobeStock => "Adobe Stock",
            PlatformProfile::Shutterstock => "Shutterstock",
            PlatformProfile::Freepik => "Freepik",
        }
    }
}

/// Asset category hint folded into the generation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageType {
    None,
    Photo,
    Vector,
    Illustration,
}

impl ImageType {
    /// Prompt wording for this category, if any.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            ImageType::None => None,
            ImageType::Photo => Some("photo"),
            ImageType::Vector => Some("vector graphic"),
            ImageType::Illustration => Some("illustration"),
        }
    }
}

/// A toggleable text fragment attached to generated titles and
/// descriptions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Affix {
    pub enabled: bool,
    pub value: String,
}

impl Affix {
    /// An enabled affix with the given text.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            enabled: true,
            value: value.into(),
        }
    }
}

/// Configuration snapshot applied uniformly to every item in a run.
///
/// Captured once when a run starts; changing configuration mid-run
/// never affects items of the active run. Use [`BatchConfig::default`]
/// for sensible defaults and the `with_*` methods to adjust.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum title length in characters, forwarded to the model as a
    /// generation constraint.
    pub title_budget: u32,
    /// Maximum description length in characters.
    pub description_budget: u32,
    /// Number of keywords to request (1..=50).
    pub keyword_target: u32,
    /// Target marketplace, determines required result fields.
    pub platform: PlatformProfile,
    /// Asset category hint.
    pub image_type: ImageType,
    /// Optional prefix applied to title and description after
    /// generation.
    pub prefix: Affix,
    /// Optional suffix applied to title and description after
    /// generation.
    pub suffix: Affix,
    /// Comma-separated words the model should avoid in titles.
    /// Advisory only; results are not post-filtered.
    pub negative_title_words: Option<String>,
    /// Comma-separated words the model should avoid in keywords.
    pub negative_keywords: Option<String>,
    /// Fixed pause between per-item service calls. Deliberate
    /// rate-limit mitigation, not an incidental delay.
    pub throttle: Duration,
    /// Enforce the character budgets by truncation at export time.
    pub truncate_on_export: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            title_budget: 100,
            description_budget: 200,
            keyword_target: 40,
            platform: PlatformProfile::All,
            image_type: ImageType::None,
            prefix: Affix::default(),
            suffix: Affix::default(),
            negative_title_words: None,
            negative_keywords: None,
            throttle: Duration::from_millis(250),
            truncate_on_export: false,
        }
    }
}

impl BatchConfig {
    pub fn with_title_budget(mut self, chars: u32) -> Self {
        self.title_budget = chars;
        self
    }

    pub fn with_description_budget(mut self, chars: u32) -> Self {
        self.description_budget = chars;
        self
    }

    pub fn with_keyword_target(mut self, count: u32) -> Self {
        self.keyword_target = count;
        self
    }

    pub fn with_platform(mut self, platform: PlatformProfile) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_image_type(mut self, image_type: ImageType) -> Self {
        self.image_type = image_type;
        self
    }

    pub fn with_prefix(mut self, prefix: Affix) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn with_suffix(mut self, suffix: Affix) -> Self {
        self.suffix = suffix;
        self
    }

    pub fn with_negative_title_words(mut self, words: impl Into<String>) -> Self {
        self.negative_title_words = Some(words.into());
        self
    }

    pub fn with_negative_keywords(mut self, words: impl Into<String>) -> Self {
        self.negative_keywords = Some(words.into());
        self
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_truncate_on_export(mut self, enabled: bool) -> Self {
        self.truncate_on_export = enabled;
        self
    }

    /// Validate the configuration. Called once at run start, not per
    /// item.
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.title_budget < 10 {
            return Err(QueueError::InvalidConfig(
                "Title budget must be at least 10 characters".to_string(),
            ));
        }
        if self.description_budget < 20 {
            return Err(QueueError::InvalidConfig(
                "Description budget must be at least 20 characters".to_string(),
            ));
        }
        if self.keyword_target == 0 || self.keyword_target > 50 {
            return Err(QueueError::InvalidConfig(
                "Keyword target must be between 1 and 50".to_string(),
            ));
        }
        if self.prefix.enabled && self.prefix.value.trim().is_empty() {
            return Err(QueueError::InvalidConfig(
                "Prefix is enabled but empty".to_string(),
            ));
        }
        if self.suffix.enabled && self.suffix.value.trim().is_empty() {
            return Err(QueueError::InvalidConfig(
                "Suffix is enabled but empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply enabled affixes to the title and description of a
    /// generated result. Empty fields are left untouched.
    pub fn apply_affixes(&self, metadata: &mut ItemMetadata) {
        metadata.title = self.affixed(&metadata.title);
        metadata.description = self.affixed(&metadata.description);
    }

    fn affixed(&self, text: &str) -> String {
        if text.is_empty() {
            return text.to_string();
        }
        let mut out = String::new();
        if self.prefix.enabled {
            out.push_str(&self.prefix.value);
            out.push(' ');
        }
        out.push_str(text);
        if self.suffix.enabled {
            out.push(' ');
            out.push_str(&self.suffix.value);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = BatchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.keyword_target, 40);
        assert_eq!(config.platform, PlatformProfile::All);
        assert_eq!(config.throttle, Duration::from_millis(250));
        assert!(!config.truncate_on_export);
    }

    #[test]
    fn test_builder_methods() {
        let config = BatchConfig::default()
            .with_title_budget(70)
            .with_keyword_target(25)
            .with_platform(PlatformProfile::Shutterstock)
            .with_throttle(Duration::from_millis(500));
        assert_eq!(config.title_budget, 70);
        assert_eq!(config.keyword_target, 25);
        assert_eq!(config.platform, PlatformProfile::Shutterstock);
        assert_eq!(config.throttle, Duration::from_millis(500));
    }

    #[test]
    fn test_validate_rejects_zero_keywords() {
        let config = BatchConfig::default().with_keyword_target(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_excessive_keywords() {
        let config = BatchConfig::default().with_keyword_target(51);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_enabled_affix() {
        let config = BatchConfig::default().with_prefix(Affix {
            enabled: true,
            value: "  ".to_string(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_profile_required_fields() {
        assert!(PlatformProfile::All.requires_title());
        assert!(PlatformProfile::All.requires_description());
        assert!(!PlatformProfile::AdobeStock.requires_description());
        assert!(!PlatformProfile::Shutterstock.requires_title());
        assert!(PlatformProfile::Shutterstock.requires_description());
        assert!(PlatformProfile::Freepik.requires_keywords());
    }

    #[test]
    fn test_apply_affixes() {
        let config = BatchConfig::default()
            .with_prefix(Affix::new("Vector illustration of"))
            .with_suffix(Affix::new("on white background"));
        let mut metadata = ItemMetadata {
            title: "a red apple".to_string(),
            description: String::new(),
            keywords: vec!["apple".to_string()],
        };
        config.apply_affixes(&mut metadata);
        assert_eq!(
            metadata.title,
            "Vector illustration of a red apple on white background"
        );
        // Empty description stays empty
        assert_eq!(metadata.description, "");
    }

    #[test]
    fn test_disabled_affixes_are_noops() {
        let config = BatchConfig::default();
        let mut metadata = ItemMetadata {
            title: "sunset".to_string(),
            description: "a sunset".to_string(),
            keywords: vec![],
        };
        config.apply_affixes(&mut metadata);
        assert_eq!(metadata.title, "sunset");
        assert_eq!(metadata.description, "a sunset");
    }
}
