//! Skillset data model
//!
//! This module provides:
//! - `Skillset` documents with their ETag and unmodelled service properties
//! - The `Skill` tagged union and its per-variant parameter records
//! - Input/output field mappings
//! - `SkillsetChanges` for explicit in-place updates

mod mapping;
mod skill;
mod skillset;

pub use mapping::{InputFieldMappingEntry, OutputFieldMappingEntry};
pub use skill::{
    EntityLinkingSkill, EntityRecognitionSkill, EntityRecognitionSkillVersion,
    KeyPhraseExtractionSkill, LanguageDetectionSkill, ODATA_TYPE_KEY, SentimentSkill,
    SentimentSkillVersion, Skill, SkillBase, UnknownSkill,
};
pub use skillset::{CognitiveServicesAccount, Skillset, SkillsetChanges};
