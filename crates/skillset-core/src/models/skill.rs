//! Enrichment skill variants
//!
//! Skills travel as a discriminated union: the `@odata.type` field names the
//! variant and its behavior revision. Deserialization dispatches on that field;
//! serialization writes it back and drops the fields the selected revision
//! does not honor. Unrecognized discriminators are preserved verbatim as
//! [`Skill::Unknown`] so one unfamiliar skill never breaks a whole listing.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

use super::mapping::{InputFieldMappingEntry, OutputFieldMappingEntry};

/// Wire key carrying the skill discriminator
pub const ODATA_TYPE_KEY: &str = "@odata.type";

const ENTITY_RECOGNITION_V1: &str = "#Microsoft.Skills.Text.EntityRecognitionSkill";
const ENTITY_RECOGNITION_V3: &str = "#Microsoft.Skills.Text.V3.EntityRecognitionSkill";
const SENTIMENT_V1: &str = "#Microsoft.Skills.Text.SentimentSkill";
const SENTIMENT_V3: &str = "#Microsoft.Skills.Text.V3.SentimentSkill";
const ENTITY_LINKING: &str = "#Microsoft.Skills.Text.V3.EntityLinkingSkill";
const KEY_PHRASE_EXTRACTION: &str = "#Microsoft.Skills.Text.KeyPhraseExtractionSkill";
const LANGUAGE_DETECTION: &str = "#Microsoft.Skills.Text.LanguageDetectionSkill";

/// Fields shared by every skill variant
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillBase {
    /// Unique within a skillset; the service assigns `#1`, `#2`, ... when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Level at which the skill operates, e.g. `/document`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default)]
    pub inputs: Vec<InputFieldMappingEntry>,
    #[serde(default)]
    pub outputs: Vec<OutputFieldMappingEntry>,
}

impl SkillBase {
    pub fn new(inputs: Vec<InputFieldMappingEntry>, outputs: Vec<OutputFieldMappingEntry>) -> Self {
        Self {
            inputs,
            outputs,
            ..Default::default()
        }
    }
}

macro_rules! base_builders {
    ($($skill:ty),+ $(,)?) => {
        $(
            impl $skill {
                /// Set the skill name
                pub fn with_name(mut self, name: impl Into<String>) -> Self {
                    self.base.name = Some(name.into());
                    self
                }

                /// Set the skill description
                pub fn with_description(mut self, description: impl Into<String>) -> Self {
                    self.base.description = Some(description.into());
                    self
                }

                /// Set the document level the skill runs at
                pub fn with_context(mut self, context: impl Into<String>) -> Self {
                    self.base.context = Some(context.into());
                    self
                }
            }
        )+
    };
}

/// Behavior revision of the entity recognition skill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityRecognitionSkillVersion {
    #[default]
    V1,
    V3,
}

impl EntityRecognitionSkillVersion {
    pub const LATEST: Self = Self::V3;

    pub fn odata_type(&self) -> &'static str {
        match self {
            Self::V1 => ENTITY_RECOGNITION_V1,
            Self::V3 => ENTITY_RECOGNITION_V3,
        }
    }

    fn unsupported_fields(&self) -> &'static [&'static str] {
        match self {
            Self::V1 => &["modelVersion"],
            Self::V3 => &["includeTypelessEntities"],
        }
    }
}

/// Behavior revision of the sentiment skill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SentimentSkillVersion {
    #[default]
    V1,
    V3,
}

impl SentimentSkillVersion {
    pub const LATEST: Self = Self::V3;

    pub fn odata_type(&self) -> &'static str {
        match self {
            Self::V1 => SENTIMENT_V1,
            Self::V3 => SENTIMENT_V3,
        }
    }

    fn unsupported_fields(&self) -> &'static [&'static str] {
        match self {
            Self::V1 => &["includeOpinionMining", "modelVersion"],
            Self::V3 => &[],
        }
    }
}

/// Recognizes named entities (people, organizations, locations, ...) in text
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecognitionSkill {
    #[serde(flatten)]
    pub base: SkillBase,
    #[serde(skip)]
    pub version: EntityRecognitionSkillVersion,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language_code: Option<String>,
    /// Honored by V1 only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_typeless_entities: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_precision: Option<f64>,
    /// Honored by V3 only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl EntityRecognitionSkill {
    pub fn new(inputs: Vec<InputFieldMappingEntry>, outputs: Vec<OutputFieldMappingEntry>) -> Self {
        Self {
            base: SkillBase::new(inputs, outputs),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: EntityRecognitionSkillVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_default_language_code(mut self, code: impl Into<String>) -> Self {
        self.default_language_code = Some(code.into());
        self
    }

    pub fn with_typeless_entities(mut self, include: bool) -> Self {
        self.include_typeless_entities = Some(include);
        self
    }

    pub fn with_minimum_precision(mut self, precision: f64) -> Self {
        self.minimum_precision = Some(precision);
        self
    }

    pub fn with_model_version(mut self, model_version: impl Into<String>) -> Self {
        self.model_version = Some(model_version.into());
        self
    }
}

/// Scores text sentiment; V3 adds opinion mining and model pinning
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentSkill {
    #[serde(flatten)]
    pub base: SkillBase,
    #[serde(skip)]
    pub version: SentimentSkillVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language_code: Option<String>,
    /// Honored by V3 only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_opinion_mining: Option<bool>,
    /// Honored by V3 only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl SentimentSkill {
    pub fn new(inputs: Vec<InputFieldMappingEntry>, outputs: Vec<OutputFieldMappingEntry>) -> Self {
        Self {
            base: SkillBase::new(inputs, outputs),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: SentimentSkillVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_default_language_code(mut self, code: impl Into<String>) -> Self {
        self.default_language_code = Some(code.into());
        self
    }

    pub fn with_opinion_mining(mut self, include: bool) -> Self {
        self.include_opinion_mining = Some(include);
        self
    }

    pub fn with_model_version(mut self, model_version: impl Into<String>) -> Self {
        self.model_version = Some(model_version.into());
        self
    }
}

/// Links recognized entities to a knowledge base
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityLinkingSkill {
    #[serde(flatten)]
    pub base: SkillBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_precision: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl EntityLinkingSkill {
    pub fn new(inputs: Vec<InputFieldMappingEntry>, outputs: Vec<OutputFieldMappingEntry>) -> Self {
        Self {
            base: SkillBase::new(inputs, outputs),
            ..Default::default()
        }
    }

    pub fn with_default_language_code(mut self, code: impl Into<String>) -> Self {
        self.default_language_code = Some(code.into());
        self
    }

    pub fn with_minimum_precision(mut self, precision: f64) -> Self {
        self.minimum_precision = Some(precision);
        self
    }

    pub fn with_model_version(mut self, model_version: impl Into<String>) -> Self {
        self.model_version = Some(model_version.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPhraseExtractionSkill {
    #[serde(flatten)]
    pub base: SkillBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_key_phrase_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl KeyPhraseExtractionSkill {
    pub fn new(inputs: Vec<InputFieldMappingEntry>, outputs: Vec<OutputFieldMappingEntry>) -> Self {
        Self {
            base: SkillBase::new(inputs, outputs),
            ..Default::default()
        }
    }

    pub fn with_max_key_phrase_count(mut self, count: u32) -> Self {
        self.max_key_phrase_count = Some(count);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageDetectionSkill {
    #[serde(flatten)]
    pub base: SkillBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_country_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl LanguageDetectionSkill {
    pub fn new(inputs: Vec<InputFieldMappingEntry>, outputs: Vec<OutputFieldMappingEntry>) -> Self {
        Self {
            base: SkillBase::new(inputs, outputs),
            ..Default::default()
        }
    }

    pub fn with_default_country_hint(mut self, hint: impl Into<String>) -> Self {
        self.default_country_hint = Some(hint.into());
        self
    }
}

base_builders!(
    EntityRecognitionSkill,
    SentimentSkill,
    EntityLinkingSkill,
    KeyPhraseExtractionSkill,
    LanguageDetectionSkill,
);

/// A skill whose discriminator this client does not model
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownSkill {
    pub odata_type: String,
    /// The complete wire document, re-sent unchanged
    pub raw: Map<String, Value>,
}

impl UnknownSkill {
    pub fn name(&self) -> Option<&str> {
        self.raw.get("name").and_then(Value::as_str)
    }
}

/// A single enrichment step within a skillset
#[derive(Debug, Clone, PartialEq)]
pub enum Skill {
    EntityRecognition(EntityRecognitionSkill),
    Sentiment(SentimentSkill),
    EntityLinking(EntityLinkingSkill),
    KeyPhraseExtraction(KeyPhraseExtractionSkill),
    LanguageDetection(LanguageDetectionSkill),
    Unknown(UnknownSkill),
}

impl Skill {
    /// Skill name, if one was assigned
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Unknown(skill) => skill.name(),
            known => known.base().and_then(|b| b.name.as_deref()),
        }
    }

    /// Common fields; `None` for unknown variants
    pub fn base(&self) -> Option<&SkillBase> {
        match self {
            Self::EntityRecognition(s) => Some(&s.base),
            Self::Sentiment(s) => Some(&s.base),
            Self::EntityLinking(s) => Some(&s.base),
            Self::KeyPhraseExtraction(s) => Some(&s.base),
            Self::LanguageDetection(s) => Some(&s.base),
            Self::Unknown(_) => None,
        }
    }

    /// Wire discriminator for this skill
    pub fn odata_type(&self) -> &str {
        match self {
            Self::EntityRecognition(s) => s.version.odata_type(),
            Self::Sentiment(s) => s.version.odata_type(),
            Self::EntityLinking(_) => ENTITY_LINKING,
            Self::KeyPhraseExtraction(_) => KEY_PHRASE_EXTRACTION,
            Self::LanguageDetection(_) => LANGUAGE_DETECTION,
            Self::Unknown(s) => &s.odata_type,
        }
    }

    /// Short human-readable variant label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EntityRecognition(_) => "EntityRecognition",
            Self::Sentiment(_) => "Sentiment",
            Self::EntityLinking(_) => "EntityLinking",
            Self::KeyPhraseExtraction(_) => "KeyPhraseExtraction",
            Self::LanguageDetection(_) => "LanguageDetection",
            Self::Unknown(_) => "Unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    /// Encode as the wire document, discriminator included
    pub fn to_wire(&self) -> serde_json::Result<Map<String, Value>> {
        let (body, unsupported): (Value, &[&str]) = match self {
            Self::EntityRecognition(s) => (serde_json::to_value(s)?, s.version.unsupported_fields()),
            Self::Sentiment(s) => (serde_json::to_value(s)?, s.version.unsupported_fields()),
            Self::EntityLinking(s) => (serde_json::to_value(s)?, &[]),
            Self::KeyPhraseExtraction(s) => (serde_json::to_value(s)?, &[]),
            Self::LanguageDetection(s) => (serde_json::to_value(s)?, &[]),
            Self::Unknown(s) => return Ok(s.raw.clone()),
        };

        let mut map = match body {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for field in unsupported {
            map.remove(*field);
        }
        map.insert(
            ODATA_TYPE_KEY.to_string(),
            Value::String(self.odata_type().to_string()),
        );
        Ok(map)
    }

    /// Decode a wire document, dispatching on its discriminator
    pub fn from_wire(raw: Map<String, Value>) -> serde_json::Result<Self> {
        let odata_type = raw
            .get(ODATA_TYPE_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let skill = match odata_type.as_str() {
            ENTITY_RECOGNITION_V1 | ENTITY_RECOGNITION_V3 => {
                let mut skill: EntityRecognitionSkill = serde_json::from_value(Value::Object(raw))?;
                skill.version = if odata_type == ENTITY_RECOGNITION_V3 {
                    EntityRecognitionSkillVersion::V3
                } else {
                    EntityRecognitionSkillVersion::V1
                };
                Self::EntityRecognition(skill)
            }
            SENTIMENT_V1 | SENTIMENT_V3 => {
                let mut skill: SentimentSkill = serde_json::from_value(Value::Object(raw))?;
                skill.version = if odata_type == SENTIMENT_V3 {
                    SentimentSkillVersion::V3
                } else {
                    SentimentSkillVersion::V1
                };
                Self::Sentiment(skill)
            }
            ENTITY_LINKING => Self::EntityLinking(serde_json::from_value(Value::Object(raw))?),
            KEY_PHRASE_EXTRACTION => {
                Self::KeyPhraseExtraction(serde_json::from_value(Value::Object(raw))?)
            }
            LANGUAGE_DETECTION => {
                Self::LanguageDetection(serde_json::from_value(Value::Object(raw))?)
            }
            _ => {
                warn!(odata_type = %odata_type, "Unrecognized skill type, keeping raw document");
                Self::Unknown(UnknownSkill { odata_type, raw })
            }
        };

        Ok(skill)
    }
}

impl Serialize for Skill {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Skill {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        Self::from_wire(raw).map_err(serde::de::Error::custom)
    }
}

impl From<EntityRecognitionSkill> for Skill {
    fn from(skill: EntityRecognitionSkill) -> Self {
        Self::EntityRecognition(skill)
    }
}

impl From<SentimentSkill> for Skill {
    fn from(skill: SentimentSkill) -> Self {
        Self::Sentiment(skill)
    }
}

impl From<EntityLinkingSkill> for Skill {
    fn from(skill: EntityLinkingSkill) -> Self {
        Self::EntityLinking(skill)
    }
}

impl From<KeyPhraseExtractionSkill> for Skill {
    fn from(skill: KeyPhraseExtractionSkill) -> Self {
        Self::KeyPhraseExtraction(skill)
    }
}

impl From<LanguageDetectionSkill> for Skill {
    fn from(skill: LanguageDetectionSkill) -> Self {
        Self::LanguageDetection(skill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_input() -> Vec<InputFieldMappingEntry> {
        vec![InputFieldMappingEntry::new("text", "/document/content")]
    }

    #[test]
    fn test_entity_recognition_v1_drops_model_version() {
        let skill: Skill = EntityRecognitionSkill::new(
            text_input(),
            vec![OutputFieldMappingEntry::new("organizations", "organizationsS1")],
        )
        .with_name("skill1")
        .with_model_version("1")
        .with_typeless_entities(true)
        .into();

        let wire = serde_json::to_value(&skill).unwrap();
        assert_eq!(wire[ODATA_TYPE_KEY], ENTITY_RECOGNITION_V1);
        assert_eq!(wire["includeTypelessEntities"], true);
        assert!(wire.get("modelVersion").is_none());
        assert_eq!(wire["inputs"][0]["source"], "/document/content");
    }

    #[test]
    fn test_entity_recognition_v3_drops_typeless_entities() {
        let skill: Skill = EntityRecognitionSkill::new(text_input(), vec![])
            .with_version(EntityRecognitionSkillVersion::LATEST)
            .with_model_version("3")
            .with_typeless_entities(true)
            .into();

        let wire = serde_json::to_value(&skill).unwrap();
        assert_eq!(wire[ODATA_TYPE_KEY], ENTITY_RECOGNITION_V3);
        assert_eq!(wire["modelVersion"], "3");
        assert!(wire.get("includeTypelessEntities").is_none());
    }

    #[test]
    fn test_sentiment_versions() {
        let v1: Skill = SentimentSkill::new(text_input(), vec![])
            .with_opinion_mining(true)
            .into();
        let wire = serde_json::to_value(&v1).unwrap();
        assert_eq!(wire[ODATA_TYPE_KEY], SENTIMENT_V1);
        assert!(wire.get("includeOpinionMining").is_none());

        let v3: Skill = SentimentSkill::new(text_input(), vec![])
            .with_version(SentimentSkillVersion::V3)
            .with_opinion_mining(true)
            .into();
        let wire = serde_json::to_value(&v3).unwrap();
        assert_eq!(wire[ODATA_TYPE_KEY], SENTIMENT_V3);
        assert_eq!(wire["includeOpinionMining"], true);
    }

    #[test]
    fn test_deserialize_dispatches_on_discriminator() {
        let skills: Vec<Skill> = serde_json::from_value(json!([
            {
                "@odata.type": "#Microsoft.Skills.Text.V3.EntityRecognitionSkill",
                "name": "skill2",
                "inputs": [{"name": "text", "source": "/document/content"}],
                "outputs": [{"name": "organizations", "targetName": "organizationsS2"}],
                "modelVersion": "3"
            },
            {
                "@odata.type": "#Microsoft.Skills.Text.SentimentSkill",
                "name": "skill3",
                "inputs": [],
                "outputs": []
            },
            {
                "@odata.type": "#Microsoft.Skills.Text.V3.EntityLinkingSkill",
                "name": "skill5",
                "inputs": [],
                "outputs": [],
                "minimumPrecision": 0.5
            }
        ]))
        .unwrap();

        match &skills[0] {
            Skill::EntityRecognition(s) => {
                assert_eq!(s.version, EntityRecognitionSkillVersion::V3);
                assert_eq!(s.model_version.as_deref(), Some("3"));
                assert_eq!(
                    s.base.outputs[0].target_name.as_deref(),
                    Some("organizationsS2")
                );
            }
            other => panic!("expected entity recognition, got {:?}", other),
        }
        match &skills[1] {
            Skill::Sentiment(s) => assert_eq!(s.version, SentimentSkillVersion::V1),
            other => panic!("expected sentiment, got {:?}", other),
        }
        match &skills[2] {
            Skill::EntityLinking(s) => assert_eq!(s.minimum_precision, Some(0.5)),
            other => panic!("expected entity linking, got {:?}", other),
        }
        assert_eq!(skills[2].name(), Some("skill5"));
    }

    #[test]
    fn test_unknown_skill_is_preserved() {
        let raw = json!({
            "@odata.type": "#Microsoft.Skills.Vision.OcrSkill",
            "name": "ocr",
            "detectOrientation": true,
            "inputs": [],
            "outputs": []
        });
        let skill: Skill = serde_json::from_value(raw.clone()).unwrap();

        assert!(skill.is_unknown());
        assert_eq!(skill.kind(), "Unknown");
        assert_eq!(skill.name(), Some("ocr"));
        assert_eq!(skill.odata_type(), "#Microsoft.Skills.Vision.OcrSkill");
        assert_eq!(serde_json::to_value(&skill).unwrap(), raw);
    }

    #[test]
    fn test_missing_discriminator_is_unknown() {
        let skill: Skill = serde_json::from_value(json!({"name": "bare"})).unwrap();
        assert!(skill.is_unknown());
        assert_eq!(skill.odata_type(), "");
    }

    #[test]
    fn test_malformed_known_variant_fails() {
        let result: Result<Skill, _> = serde_json::from_value(json!({
            "@odata.type": "#Microsoft.Skills.Text.V3.EntityLinkingSkill",
            "minimumPrecision": "high"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_key_phrase_and_language_detection() {
        let skill: Skill = KeyPhraseExtractionSkill::new(text_input(), vec![])
            .with_max_key_phrase_count(10)
            .into();
        let wire = serde_json::to_value(&skill).unwrap();
        assert_eq!(wire[ODATA_TYPE_KEY], KEY_PHRASE_EXTRACTION);
        assert_eq!(wire["maxKeyPhraseCount"], 10);

        let back: Skill = serde_json::from_value(wire).unwrap();
        assert_eq!(back, skill);

        let skill: Skill = LanguageDetectionSkill::new(text_input(), vec![])
            .with_default_country_hint("us")
            .into();
        assert_eq!(skill.kind(), "LanguageDetection");
        let wire = serde_json::to_value(&skill).unwrap();
        assert_eq!(wire["defaultCountryHint"], "us");
    }
}
