//! Long-running operation and document status polling
//!
//! Independent of the per-request [`RetryPolicy`](crate::retry::RetryPolicy):
//! each status fetch is retried on its own, while the gap between fetches
//! follows the [`PollConfig`] schedule. Polls are stateless, so a wait that
//! timed out can be followed by a fresh one against the same name.

use filesearch_common::types::{Document, DocumentName, DocumentState, Operation, OperationName};
use reqwest::Method;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::ApiClient;
use crate::config::PollConfig;
use crate::endpoints;
use crate::error::{IngestError, Phase};
use crate::retry::{backoff_delay, deadline_after};

enum Polled<T> {
    Settled(T),
    Pending(T),
}

enum PollEnd<T> {
    Settled(T),
    TimedOut {
        polls: u32,
        elapsed: Duration,
        last: Option<T>,
    },
}

#[derive(Debug, Clone)]
pub struct OperationPoller {
    api: ApiClient,
    config: PollConfig,
}

impl OperationPoller {
    pub fn new(api: ApiClient, config: PollConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// One status fetch, no waiting.
    pub async fn fetch(&self, name: &OperationName) -> Result<Operation, IngestError> {
        let url = endpoints::resource_url(self.api.base_url(), name.as_str());
        self.api
            .execute_json(Phase::Poll, || self.api.request(Method::GET, url.clone()))
            .await
    }

    pub async fn fetch_document(&self, name: &DocumentName) -> Result<Document, IngestError> {
        let url = endpoints::resource_url(self.api.base_url(), name.as_str());
        self.api
            .execute_json(Phase::Poll, || self.api.request(Method::GET, url.clone()))
            .await
    }

    /// Poll until the operation is done or `deadline` passes.
    ///
    /// A finished operation carrying an error ends the wait at once with
    /// [`IngestError::IndexingFailed`]. Reaching the deadline first yields
    /// [`IngestError::PollingTimeout`] with the last descriptor seen.
    #[tracing::instrument(skip(self, cancel), fields(operation = %name))]
    pub async fn wait(
        &self,
        name: &OperationName,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<Operation, IngestError> {
        let end = self
            .poll(deadline, cancel, move || self.fetch(name), |op: Operation| {
                if !op.is_terminal() {
                    return Ok(Polled::Pending(op));
                }
                match op.failure() {
                    Some(failure) => Err(IngestError::IndexingFailed {
                        operation: op.name.clone(),
                        code: failure.code,
                        message: failure.message.clone(),
                    }),
                    None => Ok(Polled::Settled(op)),
                }
            })
            .await?;

        match end {
            PollEnd::Settled(op) => Ok(op),
            PollEnd::TimedOut {
                polls,
                elapsed,
                last,
            } => Err(IngestError::PollingTimeout {
                operation: name.to_string(),
                elapsed,
                polls,
                last: last.map(Box::new),
            }),
        }
    }

    /// Poll a document until it is `STATE_ACTIVE` or `STATE_FAILED`.
    #[tracing::instrument(skip(self, cancel), fields(document = %name))]
    pub async fn wait_document(
        &self,
        name: &DocumentName,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<Document, IngestError> {
        let end = self
            .poll(deadline, cancel, move || self.fetch_document(name), |doc: Document| {
                match doc.state {
                    DocumentState::StateActive => Ok(Polled::Settled(doc)),
                    DocumentState::StateFailed => Err(IngestError::IndexingFailed {
                        operation: doc.name.clone(),
                        code: 0,
                        message: format!("document reached {}", doc.state),
                    }),
                    _ => Ok(Polled::Pending(doc)),
                }
            })
            .await?;

        match end {
            PollEnd::Settled(doc) => Ok(doc),
            PollEnd::TimedOut { polls, elapsed, .. } => Err(IngestError::PollingTimeout {
                operation: name.to_string(),
                elapsed,
                polls,
                last: None,
            }),
        }
    }

    /// Gap before poll number `n + 1`.
    pub fn interval(&self, n: u32, unit: f64) -> Duration {
        backoff_delay(
            self.config.initial_interval,
            self.config.max_interval,
            self.config.multiplier,
            self.config.jitter,
            n,
            unit,
        )
    }

    async fn poll<T, Fetch, Fut, Settle>(
        &self,
        deadline: Instant,
        cancel: &CancellationToken,
        mut fetch: Fetch,
        settle: Settle,
    ) -> Result<PollEnd<T>, IngestError>
    where
        Fetch: FnMut() -> Fut,
        Fut: Future<Output = Result<T, IngestError>>,
        Settle: Fn(T) -> Result<Polled<T>, IngestError>,
    {
        let started = Instant::now();
        let mut polls = 0u32;
        let mut last = None;

        loop {
            let fetched = tokio::select! {
                _ = cancel.cancelled() => return Err(IngestError::Cancelled),
                fetched = tokio::time::timeout_at(deadline, fetch()) => fetched,
            };
            let Ok(fetched) = fetched else {
                return Ok(PollEnd::TimedOut {
                    polls,
                    elapsed: started.elapsed(),
                    last,
                });
            };
            polls += 1;

            match settle(fetched?)? {
                Polled::Settled(value) => {
                    info!(polls, elapsed_ms = started.elapsed().as_millis() as u64, "Polling settled");
                    return Ok(PollEnd::Settled(value));
                }
                Polled::Pending(value) => last = Some(value),
            }

            let delay = self.interval(polls, rand::random::<f64>());
            let wake = deadline_after(delay);
            debug!(polls, delay_ms = delay.as_millis() as u64, "Still pending");

            if wake >= deadline {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(IngestError::Cancelled),
                    _ = tokio::time::sleep_until(deadline) => {}
                }
                return Ok(PollEnd::TimedOut {
                    polls,
                    elapsed: started.elapsed(),
                    last,
                });
            }
            tokio::select! {
                _ = cancel.cancelled() => return Err(IngestError::Cancelled),
                _ = tokio::time::sleep_until(wake) => {}
            }
        }
    }
}
