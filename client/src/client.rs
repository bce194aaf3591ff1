use crate::{Error, Result};
use jalwa_types::api::{ApiResponse, Page};
use jalwa_types::{Bet, BetRequest, GameMode, Round};
use rand::Rng;
use reqwest::{Method, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Retry behavior for HTTP requests. GETs are retried up to `max_attempts`
/// with bounded jittered backoff; POSTs are retried only when
/// `retry_non_idempotent` is set.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub retry_non_idempotent: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            retry_non_idempotent: false,
        }
    }
}

// Jittered delay in [backoff/2, backoff], so concurrent clients spread out
// instead of re-polling in lockstep.
fn jittered_backoff(backoff: Duration) -> Duration {
    let max_ms = backoff.as_millis() as u64;
    if max_ms <= 1 {
        return backoff;
    }
    Duration::from_millis(rand::thread_rng().gen_range(max_ms / 2..=max_ms))
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

/// HTTP transport to the Jalwa backend.
pub struct Client {
    pub base_url: Url,
    http: reqwest::Client,
    auth_token: Option<String>,
    retry: RetryPolicy,
}

impl Client {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        match base_url.scheme() {
            "http" | "https" => {}
            scheme => return Err(Error::InvalidScheme(scheme.to_string())),
        }
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
            auth_token: None,
            retry: RetryPolicy::default(),
        })
    }

    /// Bearer token attached to every request. Token issuance and storage
    /// are up to the caller.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub(crate) async fn send_with_retry(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let idempotent = method == Method::GET;
        let attempts = if idempotent || self.retry.retry_non_idempotent {
            self.retry.max_attempts.max(1)
        } else {
            1
        };
        let mut backoff = self.retry.initial_backoff;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if attempt > 1 {
                tokio::time::sleep(jittered_backoff(backoff)).await;
                backoff = (backoff * 2).min(self.retry.max_backoff);
            }
            let mut builder = self.http.request(method.clone(), url.clone());
            if let Some(token) = &self.auth_token {
                builder = builder.bearer_auth(token);
            }
            if let Some(body) = body {
                builder = builder.json(body);
            }
            match builder.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    if is_retryable(status) && attempt < attempts {
                        debug!(%url, %status, attempt, "retrying request");
                        continue;
                    }
                    let text = response.text().await.unwrap_or_default();
                    return Err(Error::FailedWithBody {
                        status,
                        body: format!("{method} {url}: {text}"),
                    });
                }
                Err(err) if attempt < attempts => {
                    warn!(%url, error = %err, attempt, "request error, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn mode_url(&self, mode: GameMode, suffix: &str) -> Result<Url> {
        Ok(self
            .base_url
            .join(&format!("api/{}/{suffix}", mode.game_code()))?)
    }

    fn paged_url(&self, mode: GameMode, suffix: &str, page: u32, page_size: u32) -> Result<Url> {
        let mut url = self.mode_url(mode, suffix)?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("page_size", &page_size.to_string());
        Ok(url)
    }

    /// Presently active round for a mode, or None when the backend reports
    /// none is available.
    pub async fn current_round(&self, mode: GameMode) -> Result<Option<Round>> {
        let url = self.mode_url(mode, "rounds/current")?;
        let response = self.send_with_retry(Method::GET, url, None).await?;
        let envelope: ApiResponse<Round> = response.json().await?;
        if !envelope.success {
            return Ok(None);
        }
        Ok(envelope.data)
    }

    /// Paginated settled rounds, newest first.
    pub async fn round_history(
        &self,
        mode: GameMode,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Round>> {
        let url = self.paged_url(mode, "rounds", page, page_size)?;
        let response = self.send_with_retry(Method::GET, url, None).await?;
        let envelope: ApiResponse<Page<Round>> = response.json().await?;
        envelope.data.ok_or(Error::UnexpectedResponse)
    }

    /// Paginated bet history for the authenticated account, newest first.
    pub async fn my_bets(&self, mode: GameMode, page: u32, page_size: u32) -> Result<Page<Bet>> {
        let url = self.paged_url(mode, "bets/my", page, page_size)?;
        let response = self.send_with_retry(Method::GET, url, None).await?;
        let envelope: ApiResponse<Page<Bet>> = response.json().await?;
        envelope.data.ok_or(Error::UnexpectedResponse)
    }

    /// Submit one bet. Domain rejections (round locked, insufficient
    /// balance) surface as [`Error::Rejected`]; transport failures are a
    /// distinct, retry-worthy condition.
    pub async fn place_bet(&self, request: &BetRequest) -> Result<Bet> {
        let url = self.base_url.join("api/bets")?;
        let body = serde_json::to_value(request)?;
        let response = self.send_with_retry(Method::POST, url, Some(&body)).await?;
        let envelope: ApiResponse<Bet> = response.json().await?;
        if !envelope.success {
            return Err(Error::Rejected {
                message: envelope
                    .message
                    .unwrap_or_else(|| "rejected".to_string()),
            });
        }
        envelope.data.ok_or(Error::UnexpectedResponse)
    }
}
