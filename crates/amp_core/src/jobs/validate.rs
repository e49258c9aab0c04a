//! Admission checks for submitted jobs.

use thiserror::Error;
use url::Url;

use crate::models::{JobParams, SourceLocator};

/// Hosts accepted for remote sources (subdomains included).
pub const KNOWN_VIDEO_HOSTS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "vimeo.com",
    "dailymotion.com",
    "soundcloud.com",
    "twitch.tv",
    "bandcamp.com",
];

/// Why a job was refused at submission.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Please provide a source URL or file")]
    MissingSource,

    #[error("Source file does not exist: {0}")]
    SourceNotFound(String),

    #[error("Unsupported URL (not a recognized video site): {0}")]
    UnsupportedUrl(String),

    #[error("Please provide an output folder")]
    MissingOutputDir,

    #[error("Invalid {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },
}

impl ValidationError {
    fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}

/// Whether `host` is `domain` or one of its subdomains.
fn host_matches(host: &str, domain: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let domain = domain.trim().trim_start_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return false;
    }
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// Whether the URL points at a recognized video site.
pub fn is_supported_url(url: &Url, extra_hosts: &[String]) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = url.host_str() else {
        return false;
    };

    KNOWN_VIDEO_HOSTS.iter().any(|d| host_matches(host, d))
        || extra_hosts.iter().any(|d| host_matches(host, d))
}

/// Check job parameters before they are queued.
pub fn validate_params(params: &JobParams, extra_hosts: &[String]) -> Result<(), ValidationError> {
    match &params.source {
        SourceLocator::Local(path) => {
            if path.as_os_str().is_empty() {
                return Err(ValidationError::MissingSource);
            }
            if !path.exists() {
                return Err(ValidationError::SourceNotFound(path.display().to_string()));
            }
        }
        SourceLocator::Remote(url) => {
            if !is_supported_url(url, extra_hosts) {
                return Err(ValidationError::UnsupportedUrl(url.to_string()));
            }
        }
    }

    if params.output_dir.as_os_str().is_empty() {
        return Err(ValidationError::MissingOutputDir);
    }

    if !(params.speed.is_finite() && params.speed > 0.0) {
        return Err(ValidationError::invalid(
            "speed",
            format!("{} (must be greater than 0)", params.speed),
        ));
    }

    for stem in crate::models::Stem::ALL {
        let volume = params.stem_volumes.get(stem);
        if !(volume.is_finite() && volume >= 0.0) {
            return Err(ValidationError::invalid(
                "volume",
                format!("{} for {} (must be 0 or more)", volume, stem),
            ));
        }
    }

    Ok(())
}
