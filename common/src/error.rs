// common/src/error.rs
use thiserror::Error;

/// Fatal startup errors. A process that hits one of these must not serve requests.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("required setting `{0}` is missing")]
    Missing(&'static str),

    #[error("setting `{key}` is not a valid URL ({value}): {reason}")]
    MalformedUrl {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("cookie policy rejected: SameSite=None requires the Secure attribute")]
    InsecureSameSiteNone,

    #[error("development credential fallback is configured for a production run mode")]
    FallbackInProduction,

    #[error("failed to load configuration: {0}")]
    Source(#[from] config::ConfigError),
}

/// Failure to reach a credential slot. Never escapes the store.
#[derive(Debug, Error)]
pub enum SlotError {
    #[error("credential storage is unavailable: {0}")]
    Unavailable(String),
}
