use std::{borrow::Cow, fmt};

use thiserror::Error;

/// The kinds of documents the repository can fail to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Post,
    Comment,
    Category,
}

impl EntityKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::User => "User",
            EntityKind::Post => "Post",
            EntityKind::Comment => "Comment",
            EntityKind::Category => "Category",
        }
    }

    /// Parses the lowercase entity tag emitted by the Lua scripts.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "user" => Some(EntityKind::User),
            "post" => Some(EntityKind::Post),
            "comment" => Some(EntityKind::Comment),
            "category" => Some(EntityKind::Category),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type returned by the store and the aggregate repository.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Validation failed for one or more fields.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A referenced document does not exist.
    #[error("{entity} not found")]
    NotFound {
        entity: EntityKind,
        entity_id: Option<String>,
    },

    /// Invalid input supplied to a repository/search operation.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Unique constraint violation - the value(s) already exist on another document.
    #[error("unique constraint violation: fields {fields:?} with values {values:?} already exist on entity '{existing_entity_id}'")]
    UniqueConstraintViolation {
        fields: Vec<String>,
        values: Vec<String>,
        existing_entity_id: String,
    },

    #[error("{message}")]
    Other { message: Cow<'static, str> },
}

impl RepoError {
    pub fn not_found(entity: EntityKind, entity_id: impl Into<String>) -> Self {
        RepoError::NotFound {
            entity,
            entity_id: Some(entity_id.into()),
        }
    }

    pub fn other(message: impl Into<Cow<'static, str>>) -> Self {
        RepoError::Other {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        RepoError::other(format!("failed to (de)serialize document: {err}"))
    }
}

/// Collection of validation issues encountered while preparing a mutation.
#[derive(Debug, Error)]
#[error("{}", summarize(&self.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("{}: {}", issue.field, issue.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-field validation error.
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(field, code, message)])
    }
}

/// Detailed validation failure for a single field.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Accumulates issues and turns them into a `ValidationResult` in one place.
#[derive(Debug, Default)]
pub struct IssueCollector {
    issues: Vec<ValidationIssue>,
}

impl IssueCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, code: &str, message: impl Into<String>) {
        self.issues.push(ValidationIssue::new(field, code, message));
    }

    pub fn require_non_empty(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "validation.required", "value must not be empty");
        }
    }

    pub fn finish(self) -> ValidationResult<()> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.issues))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_entity() {
        let err = RepoError::not_found(EntityKind::Post, "abc");
        assert_eq!(err.to_string(), "Post not found");
        assert!(matches!(err, RepoError::NotFound { entity: EntityKind::Post, .. }));
    }

    #[test]
    fn collector_reports_every_issue() {
        let mut issues = IssueCollector::new();
        issues.require_non_empty("title", "  ");
        issues.push("readingMinutes", "validation.range", "value must be at least 1");
        let err = issues.finish().unwrap_err();
        assert_eq!(err.issues.len(), 2);
        assert_eq!(
            err.to_string(),
            "title: value must not be empty; readingMinutes: value must be at least 1"
        );
    }

    #[test]
    fn entity_tags_round_trip() {
        for kind in [EntityKind::User, EntityKind::Post, EntityKind::Comment, EntityKind::Category] {
            let tag = kind.as_str().to_ascii_lowercase();
            assert_eq!(EntityKind::from_tag(&tag), Some(kind));
        }
        assert_eq!(EntityKind::from_tag("reply"), None);
    }
}
