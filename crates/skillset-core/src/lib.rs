//! Skillset Core Library
//!
//! This crate provides the core functionality for Skillset, including:
//! - An async client for a search service's indexer skillset API
//! - The skillset data model with polymorphic skill variants
//! - ETag-based optimistic concurrency on every mutating call
//! - Configuration management with environment-only credentials

pub mod client;
pub mod config;
pub mod error;
pub mod models;

pub use client::{MatchCondition, SkillsetClient, SkillsetTarget};
pub use error::{Error, Result};
pub use models::{Skill, Skillset, SkillsetChanges};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::{MatchCondition, SkillsetClient, SkillsetTarget};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
}
