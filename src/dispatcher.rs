use crate::{
    client::StatusFetcher,
    host::HostAddress,
    limiter::ConcurrencyLimiter,
    types::{FetchError, Outcome},
};
use anyhow::{ensure, Result};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// Default time a single status request may take
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Default pause every task takes after admission and before fetching
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(200);
/// Default number of fetches allowed in flight
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Stream of outcomes of one batch, in completion order
pub type OutcomeStream = ReceiverStream<Outcome>;

/// Settings for one batch of status fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    pub fetch_timeout: Duration,
    pub request_delay: Duration,
    pub max_concurrency: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            request_delay: DEFAULT_REQUEST_DELAY,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl DispatchConfig {
    /// # Errors
    ///
    /// Fails for a zero timeout or a zero concurrency limit.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.fetch_timeout > Duration::from_secs(0),
            "Fetch timeout must be positive"
        );
        ensure!(
            self.max_concurrency >= 1,
            "Max concurrency must be at least 1, got {}",
            self.max_concurrency
        );
        Ok(())
    }
}

/// Runs one fetch task per host and streams back their outcomes.
///
/// Every task waits for a permit of the shared [`ConcurrencyLimiter`], sleeps
/// for the request delay while holding it and then calls the fetcher. Each
/// host produces exactly one [`Outcome`], failures included, and the stream
/// ends once all of them have been delivered.
///
/// The batch can be stopped through its [`CancellationToken`]. Hosts that
/// have not finished by then report [`FetchError::Cancelled`].
pub struct Dispatcher<F> {
    fetcher: Arc<F>,
    limiter: ConcurrencyLimiter,
    config: DispatchConfig,
    cancel: CancellationToken,
}

impl<F> Dispatcher<F>
where
    F: StatusFetcher + 'static,
{
    /// # Errors
    ///
    /// Fails if `config` does not [validate](DispatchConfig::validate).
    pub fn new(fetcher: F, config: DispatchConfig) -> Result<Self> {
        config.validate()?;
        let limiter = ConcurrencyLimiter::new(config.max_concurrency)?;
        Ok(Dispatcher {
            fetcher: Arc::new(fetcher),
            limiter,
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Use an externally owned token to cancel the batch
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels this batch when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Start the batch.
    ///
    /// Hosts are passed as read from the host list: they are neither
    /// deduplicated nor validated, each task normalizes its own address.
    /// Must be called from within a Tokio runtime.
    pub fn run<I>(self, hosts: I) -> OutcomeStream
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let hosts: Vec<String> = hosts.into_iter().map(Into::into).collect();
        // Every host sends exactly once, so senders never wait on the consumer
        let (tx, rx) = mpsc::channel(hosts.len().max(1));

        info!(
            "Dispatching {} hosts (concurrency: {}, delay: {:?}, timeout: {:?})",
            hosts.len(),
            self.config.max_concurrency,
            self.config.request_delay,
            self.config.fetch_timeout
        );
        tokio::spawn(self.supervise(hosts, tx));

        ReceiverStream::new(rx)
    }

    async fn supervise(self, hosts: Vec<String>, tx: mpsc::Sender<Outcome>) {
        let total = hosts.len();
        let mut tasks = Vec::with_capacity(total);
        for raw in hosts {
            let task = tokio::spawn(check_host(
                HostAddress::normalize(&raw),
                self.fetcher.clone(),
                self.limiter.clone(),
                self.config,
                self.cancel.clone(),
                tx.clone(),
            ));
            tasks.push((raw, task));
        }

        for (raw, task) in tasks {
            if let Err(e) = task.await {
                let host = HostAddress::normalize(&raw);
                error!("Fetch task for {} died: {}", host, e);
                let outcome = Outcome::failure(host, FetchError::Aborted(e.to_string()));
                if tx.send(outcome).await.is_err() {
                    debug!("Outcome receiver dropped");
                }
            }
        }
        info!("Batch of {} hosts complete", total);
    }
}

async fn check_host<F: StatusFetcher>(
    host: HostAddress,
    fetcher: Arc<F>,
    limiter: ConcurrencyLimiter,
    config: DispatchConfig,
    cancel: CancellationToken,
    tx: mpsc::Sender<Outcome>,
) {
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("Cancelled {}", host);
            Outcome::failure(host.clone(), FetchError::Cancelled)
        }
        outcome = paced_fetch(&host, fetcher.as_ref(), &limiter, &config) => outcome,
    };

    if tx.send(outcome).await.is_err() {
        debug!("Outcome receiver dropped, discarding result for {}", host);
    }
}

async fn paced_fetch<F: StatusFetcher>(
    host: &HostAddress,
    fetcher: &F,
    limiter: &ConcurrencyLimiter,
    config: &DispatchConfig,
) -> Outcome {
    let _permit = match limiter.acquire().await {
        Ok(permit) => permit,
        Err(e) => {
            error!("No admission for {}: {}", host, e);
            return Outcome::failure(host.clone(), FetchError::Aborted(e.to_string()));
        }
    };
    debug!("Admitted {}", host);
    tokio::time::sleep(config.request_delay).await;
    fetcher.fetch(host, config.fetch_timeout).await
}
