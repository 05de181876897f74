//! Per-request retry decisions
//!
//! [`RetryPolicy::decide`] is the single place that classifies an attempt's
//! outcome. [`RetryPolicy::execute`] drives one logical request through it,
//! sleeping between attempts and wrapping the last cause once the budget is
//! spent.
//!
//! | Outcome | Action |
//! |---|---|
//! | transport error | retry with backoff |
//! | 429 | retry, honoring `Retry-After` (capped at the max delay) |
//! | 5xx | retry with backoff |
//! | other non-2xx | permanent |
//! | transient, budget spent | exhausted |

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::{IngestError, Phase};
use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};

/// What one attempt produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Status {
        code: u16,
        retry_after: Option<Duration>,
    },
    TransportFailure,
}

impl Outcome {
    pub fn of(result: &Result<HttpResponse, TransportError>) -> Self {
        match result {
            Ok(response) => Outcome::Status {
                code: response.status,
                retry_after: response.retry_after(),
            },
            Err(_) => Outcome::TransportFailure,
        }
    }

    pub fn classify(&self) -> Classification {
        match *self {
            Outcome::TransportFailure => Classification::Transient,
            Outcome::Status { code, .. } => match code {
                200..=299 => Classification::Success,
                429 | 500..=599 => Classification::Transient,
                _ => Classification::Permanent,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    Transient,
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Succeed,
    Retry(Duration),
    /// Transient failure with no attempts left
    Exhausted,
    Permanent,
}

/// Beyond any deadline a caller can mean.
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 86_400);

/// `now + timeout`, clamped instead of overflowing for huge timeouts.
pub fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Bookkeeping for one logical request; dropped when it settles.
#[derive(Debug, Clone)]
pub struct RetryState {
    pub attempts: u32,
    pub started: Instant,
    pub last_status: Option<u16>,
    pub last_classification: Option<Classification>,
}

impl RetryState {
    pub fn new() -> Self {
        Self {
            attempts: 0,
            started: Instant::now(),
            last_status: None,
            last_classification: None,
        }
    }

    fn record(&mut self, outcome: &Outcome) {
        self.attempts += 1;
        if let Outcome::Status { code, .. } = outcome {
            self.last_status = Some(*code);
        }
        self.last_classification = Some(outcome.classify());
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

/// A request the policy stopped retrying with a definitive response.
///
/// `response` is either a success or a permanent rejection; callers map the
/// latter to their phase's error.
#[derive(Debug)]
pub struct Finished {
    pub response: HttpResponse,
    pub state: RetryState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Decide what follows attempt number `attempt` (1-based).
    pub fn decide(&self, attempt: u32, outcome: &Outcome) -> Action {
        self.decide_with(attempt, outcome, rand::random::<f64>())
    }

    /// [`decide`](Self::decide) with the jitter sample supplied, `unit` in `[0, 1)`.
    pub fn decide_with(&self, attempt: u32, outcome: &Outcome, unit: f64) -> Action {
        match outcome.classify() {
            Classification::Success => Action::Succeed,
            Classification::Permanent => Action::Permanent,
            Classification::Transient if attempt >= self.config.max_attempts => Action::Exhausted,
            Classification::Transient => {
                let delay = match outcome {
                    Outcome::Status {
                        retry_after: Some(hint),
                        ..
                    } => (*hint).min(self.config.max_delay),
                    _ => self.backoff(attempt, unit),
                };
                Action::Retry(delay)
            }
        }
    }

    /// Exponential delay after attempt `attempt`, capped, plus jitter.
    pub fn backoff(&self, attempt: u32, unit: f64) -> Duration {
        backoff_delay(
            self.config.initial_delay,
            self.config.max_delay,
            self.config.multiplier,
            self.config.jitter,
            attempt,
            unit,
        )
    }

    /// Run one logical request until it succeeds, is rejected permanently,
    /// or runs out of attempts. `build` is called once per attempt.
    pub async fn execute<F>(
        &self,
        transport: &dyn Transport,
        phase: Phase,
        mut build: F,
    ) -> Result<Finished, IngestError>
    where
        F: FnMut() -> HttpRequest,
    {
        let mut state = RetryState::new();

        loop {
            let result = transport.send(build()).await;
            let outcome = Outcome::of(&result);
            state.record(&outcome);

            match self.decide(state.attempts, &outcome) {
                Action::Succeed | Action::Permanent => {
                    // Outcome::of only yields a status for Ok responses
                    return match result {
                        Ok(response) => {
                            debug!(%phase, status = response.status, attempts = state.attempts, "Request settled");
                            Ok(Finished { response, state })
                        }
                        Err(source) => Err(IngestError::Transport { phase, source }),
                    };
                }
                Action::Retry(delay) => {
                    warn!(
                        %phase,
                        attempt = state.attempts,
                        max_attempts = self.config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        cause = %describe(&result),
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Action::Exhausted => {
                    let cause = match result {
                        Ok(response) => IngestError::UnexpectedStatus {
                            phase,
                            status: response.status,
                            body: response.body_snippet(),
                        },
                        Err(source) => IngestError::Transport { phase, source },
                    };
                    warn!(%phase, attempts = state.attempts, cause = %cause, "Retry budget exhausted");
                    return Err(IngestError::RetriesExhausted {
                        phase,
                        attempts: state.attempts,
                        elapsed: state.elapsed(),
                        last_status: state.last_status,
                        cause: Box::new(cause),
                    });
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

fn describe(result: &Result<HttpResponse, TransportError>) -> String {
    match result {
        Ok(response) => format!("HTTP {}", response.status),
        Err(err) => err.to_string(),
    }
}

/// Shared by request retries and status polling:
/// `min(initial * multiplier^(n-1), max) * (1 + jitter * unit)`.
pub(crate) fn backoff_delay(
    initial: Duration,
    max: Duration,
    multiplier: f64,
    jitter: f64,
    n: u32,
    unit: f64,
) -> Duration {
    let exponent = n.saturating_sub(1).min(i32::MAX as u32) as i32;
    let base = (initial.as_secs_f64() * multiplier.powi(exponent)).min(max.as_secs_f64());
    let spread = jitter.clamp(0.0, 1.0) * unit.clamp(0.0, 1.0);
    let secs = base * (1.0 + spread);
    if secs.is_finite() && secs >= 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        max
    }
}
