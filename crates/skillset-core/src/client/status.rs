//! Mapping of service error responses onto [`Error`]

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::Deserialize;

use crate::error::Error;

/// Wait used when a 429 carries no usable hint
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Kind of call a response belongs to; decides how ambiguous statuses read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Create,
    CreateOrUpdate,
    Get,
    List,
    Delete,
    ResetSkills,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::CreateOrUpdate => write!(f, "create_or_update"),
            Operation::Get => write!(f, "get"),
            Operation::List => write!(f, "list"),
            Operation::Delete => write!(f, "delete"),
            Operation::ResetSkills => write!(f, "reset_skills"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    error: ServiceError,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Translate a non-success response into a distinguishable error
pub(crate) fn error_for_status(
    op: Operation,
    name: Option<&str>,
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
) -> Error {
    let resource = name.unwrap_or_default().to_string();

    match status.as_u16() {
        404 if name.is_some() => Error::NotFound(resource),
        409 if op == Operation::Create => Error::AlreadyExists(resource),
        // a create-only precondition failing means the name is taken
        412 if op == Operation::Create => Error::AlreadyExists(resource),
        412 => Error::PreconditionFailed(resource),
        401 | 403 => Error::Unauthorized {
            status: status.as_u16(),
            message: service_message(body),
        },
        429 => Error::RateLimited(retry_after(headers).unwrap_or(DEFAULT_RETRY_AFTER_SECS)),
        code => Error::Http {
            status: code,
            message: service_message(body),
        },
    }
}

/// Human-readable message from a service error body, falling back to the raw text
fn service_message(body: &str) -> String {
    match serde_json::from_str::<ServiceErrorBody>(body) {
        Ok(parsed) => match (parsed.error.code, parsed.error.message) {
            (Some(code), Some(message)) => format!("{}: {}", code, message),
            (None, Some(message)) => message,
            (Some(code), None) => code,
            (None, None) => body.to_string(),
        },
        Err(_) if body.trim().is_empty() => "(empty response body)".to_string(),
        Err(_) => body.to_string(),
    }
}

/// Seconds from a `Retry-After` header given in delta-seconds form
fn retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
