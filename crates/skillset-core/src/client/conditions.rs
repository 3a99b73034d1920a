//! Optimistic-concurrency preconditions for mutating calls

use reqwest::header::{HeaderName, HeaderValue, IF_MATCH, IF_NONE_MATCH};

use crate::error::{Error, Result};
use crate::models::Skillset;

/// Precondition evaluated by the service against a skillset's current ETag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchCondition {
    /// Always proceed; last write wins
    #[default]
    Unconditionally,
    /// Proceed only if the caller's ETag is still current
    IfNotModified,
    /// Proceed only if the caller's ETag is stale
    IfModified,
    /// Proceed only if the skillset exists
    IfPresent,
    /// Proceed only if the skillset does not exist
    IfMissing,
}

impl MatchCondition {
    /// Whether the condition compares against a specific ETag
    pub fn needs_etag(&self) -> bool {
        matches!(self, Self::IfNotModified | Self::IfModified)
    }

    /// Conditional request header for this condition, if any
    pub fn header(&self, etag: Option<&str>) -> Result<Option<(HeaderName, HeaderValue)>> {
        let (name, value) = match self {
            Self::Unconditionally => return Ok(None),
            Self::IfPresent => (IF_MATCH, "*"),
            Self::IfMissing => (IF_NONE_MATCH, "*"),
            Self::IfNotModified | Self::IfModified => {
                let etag = etag.ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "{:?} requires a skillset carrying an ETag; fetch it first",
                        self
                    ))
                })?;
                let name = if *self == Self::IfNotModified {
                    IF_MATCH
                } else {
                    IF_NONE_MATCH
                };
                (name, etag)
            }
        };

        let value = HeaderValue::from_str(value)
            .map_err(|_| Error::InvalidInput(format!("ETag is not a valid header value: {}", value)))?;
        Ok(Some((name, value)))
    }
}

impl std::str::FromStr for MatchCondition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "unconditionally" | "always" => Ok(Self::Unconditionally),
            "ifnotmodified" | "ifunchanged" => Ok(Self::IfNotModified),
            "ifmodified" => Ok(Self::IfModified),
            "ifpresent" => Ok(Self::IfPresent),
            "ifmissing" => Ok(Self::IfMissing),
            _ => Err(Error::InvalidInput(format!("Unknown match condition: {}", s))),
        }
    }
}

/// A skillset addressed either by bare name or by a fetched object
///
/// Only the object form carries an ETag, so only it can satisfy
/// ETag-based conditions.
#[derive(Debug, Clone, Copy)]
pub enum SkillsetTarget<'a> {
    Name(&'a str),
    Skillset(&'a Skillset),
}

impl SkillsetTarget<'_> {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Skillset(skillset) => &skillset.name,
        }
    }

    pub fn etag(&self) -> Option<&str> {
        match self {
            Self::Name(_) => None,
            Self::Skillset(skillset) => skillset.etag.as_deref(),
        }
    }
}

impl<'a> From<&'a str> for SkillsetTarget<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a String> for SkillsetTarget<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a Skillset> for SkillsetTarget<'a> {
    fn from(skillset: &'a Skillset) -> Self {
        Self::Skillset(skillset)
    }
}
