//! # External Providers
//!
//! Narrow adapters around the two opaque services the pipeline consumes:
//! - **Translation**: `(text, source, target) -> translated text`
//! - **Speech synthesis**: `(text, language) -> MP3 bytes`
//!
//! ## Design:
//! Both are traits so the pipeline can run against the Google web endpoints in
//! production and against in-process stubs in tests. Adapters hold no
//! per-request state and never retry; retrying is the caller's decision.
//!
//! ## Timeouts:
//! Every outbound call goes through one shared `reqwest::Client` built with the
//! configured `providers.timeout_secs`, so a stalled upstream cannot pin a worker.

pub mod speech;
pub mod translation;

pub use speech::{GoogleSpeechSynthesizer, SpeechSynthesizer};
pub use translation::{GoogleTranslator, Translator};

use crate::config::ProvidersConfig;
use std::time::Duration;
use thiserror::Error;

/// Failures reported by translation and synthesis adapters.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Input rejected before any network call (empty text, blank language)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Upstream answered with a non-success status (e.g. unsupported language)
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    /// Upstream answered 200 but the payload was not what we expect
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Convert a reqwest error, keeping timeouts distinguishable.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(timeout)
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

/// Build the HTTP client shared by both Google adapters.
pub fn build_http_client(config: &ProvidersConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(concat!("secure-speak-backend/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Read a bounded snippet of an error body for diagnostics.
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    const MAX_BODY: usize = 200;

    let body = response.text().await.unwrap_or_default();
    if body.len() > MAX_BODY {
        let cut = (0..=MAX_BODY).rev().find(|&i| body.is_char_boundary(i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body
    }
}
