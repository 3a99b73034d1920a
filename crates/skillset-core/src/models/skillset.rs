//! Skillset documents and the explicit merge used for in-place updates

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::skill::{ODATA_TYPE_KEY, Skill};
use crate::error::{Error, Result};

const DEFAULT_COGNITIVE_SERVICES: &str = "#Microsoft.Azure.Search.DefaultCognitiveServices";
const COGNITIVE_SERVICES_BY_KEY: &str = "#Microsoft.Azure.Search.CognitiveServicesByKey";

/// Account billed for the skills in a skillset
#[derive(Debug, Clone, PartialEq)]
pub enum CognitiveServicesAccount {
    /// Free, rate-limited enrichment
    Default { description: Option<String> },
    /// Billable account identified by its key
    ByKey {
        key: String,
        description: Option<String>,
    },
    /// Account kind this client does not model, kept verbatim
    Other(Map<String, Value>),
}

impl Serialize for CognitiveServicesAccount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let (odata_type, key, description) = match self {
            Self::Other(raw) => return raw.serialize(serializer),
            Self::Default { description } => (DEFAULT_COGNITIVE_SERVICES, None, description),
            Self::ByKey { key, description } => (COGNITIVE_SERVICES_BY_KEY, Some(key), description),
        };

        let mut map = Map::new();
        map.insert(ODATA_TYPE_KEY.to_string(), Value::from(odata_type));
        if let Some(key) = key {
            map.insert("key".to_string(), Value::from(key.as_str()));
        }
        if let Some(description) = description {
            map.insert("description".to_string(), Value::from(description.as_str()));
        }
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CognitiveServicesAccount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        let text = |field: &str| raw.get(field).and_then(Value::as_str).map(str::to_string);

        match raw.get(ODATA_TYPE_KEY).and_then(Value::as_str) {
            Some(DEFAULT_COGNITIVE_SERVICES) => Ok(Self::Default {
                description: text("description"),
            }),
            Some(COGNITIVE_SERVICES_BY_KEY) => Ok(Self::ByKey {
                key: text("key").ok_or_else(|| serde::de::Error::missing_field("key"))?,
                description: text("description"),
            }),
            _ => Ok(Self::Other(raw)),
        }
    }
}

/// A named, ordered collection of enrichment skills
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skillset {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(
        rename = "cognitiveServices",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cognitive_services_account: Option<CognitiveServicesAccount>,
    /// Version token minted by the service on every successful write
    #[serde(
        rename = "@odata.etag",
        alias = "eTag",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub etag: Option<String>,
    /// Service properties not modelled here (knowledge store, encryption key, ...)
    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

impl Skillset {
    pub fn new(name: impl Into<String>, skills: Vec<Skill>) -> Self {
        Self {
            name: name.into(),
            skills,
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_cognitive_services_account(mut self, account: CognitiveServicesAccount) -> Self {
        self.cognitive_services_account = Some(account);
        self
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Names of all named skills, in skillset order
    pub fn skill_names(&self) -> Vec<String> {
        self.skills
            .iter()
            .filter_map(|s| s.name().map(str::to_string))
            .collect()
    }

    pub fn find_skill(&self, name: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.name() == Some(name))
    }

    /// Produce a new skillset with `changes` applied over this one.
    ///
    /// Anything the changes leave unset is carried over, including the ETag,
    /// so the result can be resubmitted under an `IfNotModified` condition.
    pub fn merged(&self, changes: SkillsetChanges) -> Skillset {
        let mut merged = self.clone();
        if let Some(description) = changes.description {
            merged.description = Some(description);
        }
        if let Some(skills) = changes.skills {
            merged.skills = skills;
        }
        if let Some(account) = changes.cognitive_services_account {
            merged.cognitive_services_account = Some(account);
        }
        merged
    }

    /// Check the document before it is sent
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("Skillset name must not be empty".to_string()));
        }

        let mut seen = HashSet::new();
        for name in self.skills.iter().filter_map(Skill::name) {
            if !seen.insert(name) {
                return Err(Error::InvalidInput(format!(
                    "Skill name '{}' appears more than once in skillset '{}'",
                    name, self.name
                )));
            }
        }
        Ok(())
    }

    /// Drop OData annotations the service echoes back on reads
    pub(crate) fn strip_annotations(&mut self) {
        self.additional_properties
            .retain(|key, _| !key.starts_with("@odata."));
    }
}

/// Overrides applied to a previously fetched skillset
#[derive(Debug, Clone, Default)]
pub struct SkillsetChanges {
    pub description: Option<String>,
    pub skills: Option<Vec<Skill>>,
    pub cognitive_services_account: Option<CognitiveServicesAccount>,
}

impl SkillsetChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_skills(mut self, skills: Vec<Skill>) -> Self {
        self.skills = Some(skills);
        self
    }

    pub fn with_cognitive_services_account(mut self, account: CognitiveServicesAccount) -> Self {
        self.cognitive_services_account = Some(account);
        self
    }
}
