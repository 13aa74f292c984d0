//! Provider Adapters
//!
//! One adapter per external classifier. Every adapter:
//! - skips silently (no call) when its credentials are absent
//! - issues exactly one bounded-timeout request per model
//! - decodes its own response schema into the canonical `Verdict`
//!
//! `Provider::invoke` never fails: transport, status and decode problems are
//! logged and turned into `None` so the fallback chain can advance.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use super::verdict::Verdict;
use crate::config::ProviderCredentials;

pub mod elevenlabs;
pub mod grok;
pub mod huggingface;
pub mod sightengine;

pub use elevenlabs::ElevenLabsProvider;
pub use grok::GrokProvider;
pub use huggingface::{HfAudioProvider, HfImageProvider, HfTextEnsemble};
pub use sightengine::SightengineProvider;

/// Longest provider error body kept in logs
const MAX_ERROR_BODY: usize = 300;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("credentials not configured")]
    NotConfigured,

    #[error("provider rejected credentials (HTTP {0})")]
    InvalidCredentials(u16),

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("no model cleared its decision threshold")]
    BelowThreshold,

    #[error("wrong input kind for this provider")]
    UnsupportedInput,

    #[error("cannot read media: {0}")]
    Io(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

impl From<std::io::Error> for ProviderError {
    fn from(err: std::io::Error) -> Self {
        ProviderError::Io(err.to_string())
    }
}

// ============================================================================
// PROVIDER TRAIT
// ============================================================================

/// What gets submitted to a provider
#[derive(Debug, Clone, Copy)]
pub enum ProviderInput<'a> {
    File(&'a Path),
    Text(&'a str),
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Identifier used in logs
    fn name(&self) -> &'static str;

    /// Credentials present?
    fn is_configured(&self) -> bool;

    /// One attempt against the provider
    async fn call(&self, input: ProviderInput<'_>) -> Result<Verdict, ProviderError>;

    /// `call`, with every failure mapped to "no answer"
    async fn invoke(&self, input: ProviderInput<'_>) -> Option<Verdict> {
        if !self.is_configured() {
            tracing::debug!(provider = self.name(), "Provider not configured, skipping");
            return None;
        }

        match self.call(input).await {
            Ok(verdict) => Some(verdict),
            Err(ProviderError::NotConfigured) => None,
            Err(ProviderError::BelowThreshold) => {
                tracing::debug!(provider = self.name(), "No confident answer");
                None
            }
            Err(err) => {
                tracing::warn!(provider = self.name(), "Provider call failed: {}", err);
                None
            }
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// All adapters, built once at startup
pub struct ProviderSet {
    pub sightengine: SightengineProvider,
    pub hf_image: HfImageProvider,
    pub elevenlabs: ElevenLabsProvider,
    pub hf_audio: HfAudioProvider,
    pub grok: GrokProvider,
    pub hf_text: HfTextEnsemble,
}

impl ProviderSet {
    pub fn from_credentials(creds: &ProviderCredentials, client: reqwest::Client) -> Self {
        Self {
            sightengine: SightengineProvider::new(
                client.clone(),
                creds.sightengine_user.clone(),
                creds.sightengine_secret.clone(),
            ),
            hf_image: HfImageProvider::new(client.clone(), creds.huggingface_key.clone()),
            elevenlabs: ElevenLabsProvider::new(client.clone(), creds.elevenlabs_key.clone()),
            hf_audio: HfAudioProvider::new(client.clone(), creds.huggingface_key.clone()),
            grok: GrokProvider::new(client.clone(), creds.grok_key.clone()),
            hf_text: HfTextEnsemble::new(client, creds.huggingface_key.clone()),
        }
    }
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// HTTP client shared by every adapter; timeouts are set per request
pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(concat!("guardian-server/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Map non-2xx statuses to typed errors, keeping a short body excerpt
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(ProviderError::InvalidCredentials(status.as_u16()));
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        status: status.as_u16(),
        body: truncate_chars(&body, MAX_ERROR_BODY),
    })
}

pub(crate) fn require_file<'a>(input: ProviderInput<'a>) -> Result<&'a Path, ProviderError> {
    match input {
        ProviderInput::File(path) => Ok(path),
        ProviderInput::Text(_) => Err(ProviderError::UnsupportedInput),
    }
}

pub(crate) fn require_text<'a>(input: ProviderInput<'a>) -> Result<&'a str, ProviderError> {
    match input {
        ProviderInput::Text(text) => Ok(text),
        ProviderInput::File(_) => Err(ProviderError::UnsupportedInput),
    }
}

/// Upload file name for multipart parts
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}

/// First `max` characters (not bytes) of `text`
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Local stand-in for a provider endpoint

    use axum::Router;
    use std::net::SocketAddr;

    /// Serve `router` on an ephemeral port and return its base URL
    pub async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        configured: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Provider for CountingProvider {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn call(&self, _input: ProviderInput<'_>) -> Result<Verdict, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Timeout)
        }
    }

    #[tokio::test]
    async fn test_unconfigured_provider_never_calls() {
        let provider = CountingProvider { configured: false, calls: AtomicUsize::new(0) };
        assert!(provider.invoke(ProviderInput::Text("hi")).await.is_none());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_becomes_none() {
        let provider = CountingProvider { configured: true, calls: AtomicUsize::new(0) };
        assert!(provider.invoke(ProviderInput::Text("hi")).await.is_none());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }

    #[test]
    fn test_unset_credentials_leave_adapters_unconfigured() {
        let set = ProviderSet::from_credentials(&ProviderCredentials::default(), reqwest::Client::new());
        assert!(!set.sightengine.is_configured());
        assert!(!set.hf_image.is_configured());
        assert!(!set.elevenlabs.is_configured());
        assert!(!set.hf_audio.is_configured());
        assert!(!set.grok.is_configured());
        assert!(!set.hf_text.is_configured());
    }
}
