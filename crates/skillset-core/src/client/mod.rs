//! Skillset service client
//!
//! This module provides:
//! - `SkillsetClient` for the skillset collection of a search service
//! - `MatchCondition` preconditions for optimistic concurrency
//! - `SkillsetTarget` for addressing a skillset by name or by object

mod api;
mod conditions;
mod status;

pub use api::{SkillsetClient, SkillsetClientBuilder};
pub use conditions::{MatchCondition, SkillsetTarget};
