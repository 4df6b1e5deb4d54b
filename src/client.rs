use crate::{
    host::HostAddress,
    types::{FetchError, Outcome, StatusRecord},
};
use anyhow::Result;
use async_trait::async_trait;
use derive_builder::Builder;
use http::{header, HeaderMap, HeaderValue};
use std::{error::Error, time::Duration};

/// User agent sent with every status request unless overridden
pub const DEFAULT_USER_AGENT: &str = concat!("fleet-health/", env!("CARGO_PKG_VERSION"));

/// Redirects followed before a status request fails
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Fetches the health status of a single host.
///
/// Implementations perform exactly one round trip per call and report every
/// failure through the returned [`Outcome`] instead of an error.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    /// Fetch the status of an already normalized `host`, giving up after
    /// `timeout`.
    async fn fetch(&self, host: &HostAddress, timeout: Duration) -> Outcome;
}

/// Status fetcher backed by a `reqwest` HTTP client
#[derive(Debug, Clone)]
pub struct Client {
    reqwest_client: reqwest::Client,
}

/// Builder for the HTTP status fetcher
#[derive(Builder, Debug)]
#[builder(build_fn(skip))]
#[builder(setter(into))]
#[builder(name = "ClientBuilder")]
pub struct ClientBuilderInternal {
    user_agent: String,
    max_redirects: usize,
}

impl ClientBuilder {
    pub fn build(&self) -> Result<Client> {
        let user_agent = self
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_str(&user_agent)?);
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let max_redirects = self.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS);

        let reqwest_client = reqwest::ClientBuilder::new()
            .gzip(true)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(max_redirects))
            .build()?;

        Ok(Client { reqwest_client })
    }
}

impl Client {
    async fn fetch_record(
        &self,
        host: &HostAddress,
        timeout: Duration,
    ) -> Result<StatusRecord, FetchError> {
        let response = self
            .reqwest_client
            .get(host.as_str())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            reason: e.to_string(),
            body,
        })
    }
}

#[async_trait]
impl StatusFetcher for Client {
    async fn fetch(&self, host: &HostAddress, timeout: Duration) -> Outcome {
        debug!("Fetching {}", host);
        match self.fetch_record(host, timeout).await {
            Ok(record) => Outcome::success(host.clone(), record),
            Err(e) => {
                warn!("Error fetching data from {}: {}", host, e);
                Outcome::failure(host.clone(), e)
            }
        }
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> FetchError {
    if e.is_timeout() {
        return FetchError::Timeout(timeout);
    }
    // reqwest's own message hides the actual cause (e.g. connection refused)
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    FetchError::Network(message)
}
