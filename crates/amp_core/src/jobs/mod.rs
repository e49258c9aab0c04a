//! Job queue and admission.
//!
//! This module provides:
//! - `JobQueue`: in-memory FIFO of submitted jobs
//! - `QueuedJob` / `JobId`: a job snapshot and its identifier
//! - `validate_params`: checks applied before a job is accepted

mod queue;
mod types;
mod validate;

pub use queue::JobQueue;
pub use types::{JobId, QueuedJob};
pub use validate::{is_supported_url, validate_params, ValidationError, KNOWN_VIDEO_HOSTS};
