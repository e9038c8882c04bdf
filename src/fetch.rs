use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, trace, warn};

use crate::error::IngestError;

pub const DEFAULT_DETAIL_URL: &str =
    "http://gatherer.wizards.com/Pages/Card/Details.aspx?printed=false&multiverseid=";
pub const DEFAULT_IMAGE_URL: &str =
    "http://gatherer.wizards.com/Handlers/Image.ashx?type=card&multiverseid=";
pub const DEFAULT_LANGUAGE_URL: &str =
    "http://gatherer.wizards.com/Pages/Card/Languages.aspx?multiverseid=";

pub trait RecordFetcher: Send + Sync {
    /// One GET with the retry policy applied; `Err` means the resource is absent.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, IngestError>;
}

/// Base URLs of the three resources; the identifier is appended to each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogUrls {
    pub detail: String,
    pub image: String,
    pub language: String,
}

impl Default for CatalogUrls {
    fn default() -> Self {
        Self {
            detail: DEFAULT_DETAIL_URL.to_string(),
            image: DEFAULT_IMAGE_URL.to_string(),
            language: DEFAULT_LANGUAGE_URL.to_string(),
        }
    }
}

impl CatalogUrls {
    pub fn detail_url(&self, id: u32) -> String {
        format!("{}{id}", self.detail)
    }

    pub fn image_url(&self, id: u32) -> String {
        format!("{}{id}", self.image)
    }

    pub fn language_url(&self, id: u32) -> String {
        format!("{}{id}", self.language)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Retryable,
    Fatal,
}

pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200 => StatusClass::Success,
        500..=599 => StatusClass::Retryable,
        _ => StatusClass::Fatal,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(10),
        }
    }
}

/// Outcome of a single attempt.
#[derive(Debug)]
pub enum Attempt {
    Done(Vec<u8>),
    Retry(IngestError),
    Fail(IngestError),
}

/// Runs `attempt` until it succeeds, fails fatally or the policy's attempt
/// ceiling is reached, sleeping `policy.delay` between retryable failures.
pub fn fetch_with_retry<F>(
    url: &str,
    policy: &RetryPolicy,
    mut attempt: F,
) -> Result<Vec<u8>, IngestError>
where
    F: FnMut(u32) -> Attempt,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match attempt(attempts) {
            Attempt::Done(bytes) => return Ok(bytes),
            Attempt::Fail(err) => {
                error!(url, error = %err, "error loading URL");
                return Err(err);
            }
            Attempt::Retry(err) => {
                if attempts >= policy.max_attempts {
                    error!(url, attempts, error = %err, "retries exhausted, giving up");
                    return Err(IngestError::RetriesExhausted {
                        url: url.to_string(),
                        attempts,
                    });
                }
                warn!(url, attempt = attempts, error = %err, "transient failure, retrying");
                thread::sleep(policy.delay);
            }
        }
    }
}

#[derive(Clone)]
pub struct HttpRecordFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl HttpRecordFetcher {
    pub fn new(policy: RetryPolicy, timeout: Duration) -> Result<Self, IngestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("gatherer-ingest/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| IngestError::FetchHttp(err.to_string()))?,
        );
        // No idle pooling: every attempt opens and releases its own connection.
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|err| IngestError::FetchHttp(err.to_string()))?;
        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn attempt(&self, url: &str) -> Attempt {
        let response = match self.client.get(url).send() {
            Ok(response) => response,
            Err(err) if is_retryable_error(&err) => {
                return Attempt::Retry(IngestError::FetchHttp(err.to_string()));
            }
            Err(err) => return Attempt::Fail(IngestError::FetchHttp(err.to_string())),
        };

        let status = response.status().as_u16();
        match classify_status(status) {
            StatusClass::Success => match response.bytes() {
                Ok(bytes) => Attempt::Done(bytes.to_vec()),
                Err(err) if is_retryable_error(&err) => {
                    Attempt::Retry(IngestError::FetchHttp(err.to_string()))
                }
                Err(err) => Attempt::Fail(IngestError::FetchHttp(err.to_string())),
            },
            StatusClass::Retryable => Attempt::Retry(IngestError::FetchStatus {
                status,
                url: url.to_string(),
            }),
            StatusClass::Fatal => Attempt::Fail(IngestError::FetchStatus {
                status,
                url: url.to_string(),
            }),
        }
    }
}

impl RecordFetcher for HttpRecordFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, IngestError> {
        trace!(url, "loading URL");
        fetch_with_retry(url, &self.policy, |_| self.attempt(url))
    }
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}
