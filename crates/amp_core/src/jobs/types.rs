//! Job queue types.

use serde::{Deserialize, Serialize};

use crate::models::JobParams;

/// Opaque job identifier assigned at submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for log file names and display.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A job waiting in (or at the front of) the queue.
///
/// `params` is a snapshot taken at submission; later changes by the caller
/// do not affect it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub id: JobId,
    pub params: JobParams,
    /// When the job was submitted (RFC 3339).
    pub submitted_at: String,
}

impl QueuedJob {
    pub fn new(params: JobParams) -> Self {
        Self {
            id: JobId::generate(),
            params,
            submitted_at: chrono::Local::now().to_rfc3339(),
        }
    }

    /// Short human-readable label for logs.
    pub fn label(&self) -> String {
        format!("{} ({})", self.params.source, self.id.short())
    }
}
