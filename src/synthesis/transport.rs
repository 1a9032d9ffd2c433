//! HTTP seam between [`RemoteSynthesizer`](crate::synthesis::RemoteSynthesizer)
//! and the serverless endpoint.
//!
//! `HttpTransport` talks to `{base_url}/{endpoint_id}/runsync` and
//! `{base_url}/{endpoint_id}/status/{id}`.  All connection details come from
//! [`RemoteConfig`]; the base URL is never hardcoded outside config defaults.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::RemoteConfig;
use crate::synthesis::client::SynthesisError;
use crate::synthesis::protocol::{JobResponse, RunRequest};

/// Longest response body excerpt kept in an [`SynthesisError::Http`].
const MAX_ERROR_BODY: usize = 512;

// ---------------------------------------------------------------------------
// RemoteTransport trait
// ---------------------------------------------------------------------------

/// Submit and status calls of the remote job API.
///
/// Implementors must be `Send + Sync` so a synthesizer holding one can be
/// shared as `Arc<dyn Synthesizer>`.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Submit a job; the response is either already settled or pending.
    async fn submit(&self, request: &RunRequest<'_>) -> Result<JobResponse, SynthesisError>;

    /// Fetch the current state of a previously submitted job.
    async fn status(&self, job_id: &str) -> Result<JobResponse, SynthesisError>;
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

pub struct HttpTransport {
    client: reqwest::Client,
    endpoint_url: String,
    api_key: Option<String>,
    submit_timeout: Duration,
    poll_timeout: Duration,
}

impl HttpTransport {
    /// Build a transport from config.
    ///
    /// Timeouts are applied per request since the submit call waits for the
    /// whole generation while status calls should return quickly.
    pub fn from_config(config: &RemoteConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.poll_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint_url: format!(
                "{}/{}",
                config.base_url.trim_end_matches('/'),
                config.endpoint_id
            ),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            submit_timeout: Duration::from_secs(config.submit_timeout_secs),
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
        }
    }

    pub fn submit_url(&self) -> String {
        format!("{}/runsync", self.endpoint_url)
    }

    pub fn status_url(&self, job_id: &str) -> String {
        format!("{}/status/{}", self.endpoint_url, job_id)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key.as_deref() {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    async fn read_response(response: reqwest::Response) -> Result<JobResponse, SynthesisError> {
        let status = response.status();
        let body = response.text().await?;
        parse_response(status, &body)
    }
}

/// Map an HTTP status and body to a job response.
///
/// Non-2xx becomes [`SynthesisError::Http`] with a trimmed body excerpt; a
/// 2xx body that is not a job response becomes a protocol error.
pub fn parse_response(
    status: reqwest::StatusCode,
    body: &str,
) -> Result<JobResponse, SynthesisError> {
    if !status.is_success() {
        return Err(SynthesisError::Http {
            status: status.as_u16(),
            body: excerpt(body.trim()),
        });
    }

    serde_json::from_str(body)
        .map_err(|e| SynthesisError::Protocol(format!("unparseable response: {e}")))
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn submit(&self, request: &RunRequest<'_>) -> Result<JobResponse, SynthesisError> {
        let req = self
            .client
            .post(self.submit_url())
            .timeout(self.submit_timeout)
            .json(request);
        let response = self.authorize(req).send().await?;
        Self::read_response(response).await
    }

    async fn status(&self, job_id: &str) -> Result<JobResponse, SynthesisError> {
        let req = self
            .client
            .get(self.status_url(job_id))
            .timeout(self.poll_timeout);
        let response = self.authorize(req).send().await?;
        Self::read_response(response).await
    }
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
