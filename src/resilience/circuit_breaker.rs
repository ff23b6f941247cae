//! Circuit breaker for downstream protection.
//!
//! # States
//! - Closed: normal operation, outcomes counted within a rolling window
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: a bounded number of probes test if the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: requests >= min_requests && failures/requests >= failure_ratio
//! Open → Half-Open: open_timeout elapsed (checked lazily on the next call)
//! Half-Open → Closed: max_half_open_requests consecutive successes
//! Half-Open → Open: any probe failure
//! ```
//!
//! # Design Decisions
//! - One breaker per downstream dependency, shared through `Arc`
//! - State lives behind a mutex that is never held across an await
//! - Every transition starts a new generation; outcomes from an older
//!   generation are discarded
//! - Observers are notified after the lock is released

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::observability::metrics;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breaker tunables.
#[derive(Debug, Clone)]
pub struct BreakerSettings {
    /// Name reported to observers and metrics.
    pub name: String,
    /// Minimum requests in the window before the ratio is evaluated.
    pub min_requests: u32,
    /// Failure ratio at which the breaker trips.
    pub failure_ratio: f64,
    /// Rolling window for Closed-state counters. Zero disables the reset.
    pub interval: Duration,
    /// Time spent Open before probing.
    pub open_timeout: Duration,
    /// Probes admitted while Half-Open, and successes needed to close.
    pub max_half_open_requests: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            name: "http-client".to_string(),
            min_requests: 3,
            failure_ratio: 0.6,
            interval: Duration::from_secs(5),
            open_timeout: Duration::from_secs(10),
            max_half_open_requests: 3,
        }
    }
}

/// Counters for the current generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub requests: u32,
    pub total_successes: u32,
    pub total_failures: u32,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

impl Counts {
    fn on_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    fn on_success(&mut self) {
        self.total_successes = self.total_successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    fn on_failure(&mut self) {
        self.total_failures = self.total_failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }

    // Admitted call finished without an outcome that says anything about the dependency.
    fn on_abandon(&mut self) {
        self.requests = self.requests.saturating_sub(1);
    }

    pub fn failure_ratio(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        f64::from(self.total_failures) / f64::from(self.requests)
    }
}

/// Error returned by [`CircuitBreaker::execute`].
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The call was rejected without running the operation.
    #[error("circuit breaker '{name}' is open")]
    Open { name: String },

    /// The operation ran and failed.
    #[error(transparent)]
    Inner(E),
}

/// Sink for state transitions.
pub trait BreakerObserver: Send + Sync {
    fn on_state_change(&self, name: &str, from: CircuitState, to: CircuitState);
}

/// Default observer: structured log line plus metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl BreakerObserver for LoggingObserver {
    fn on_state_change(&self, name: &str, from: CircuitState, to: CircuitState) {
        tracing::info!(
            name = %name,
            from = %from,
            to = %to,
            "Circuit breaker state changed"
        );
        metrics::record_breaker_transition(name, from, to);
    }
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Success,
    Failure,
    Ignored,
}

type Transition = (CircuitState, CircuitState);

#[derive(Debug)]
struct BreakerCore {
    state: CircuitState,
    generation: u64,
    counts: Counts,
    expiry: Option<Instant>,
}

impl BreakerCore {
    fn new(settings: &BreakerSettings, now: Instant) -> Self {
        let mut core = Self {
            state: CircuitState::Closed,
            generation: 0,
            counts: Counts::default(),
            expiry: None,
        };
        core.new_generation(settings, now);
        core
    }

    fn current_state(
        &mut self,
        settings: &BreakerSettings,
        now: Instant,
        transitions: &mut Vec<Transition>,
    ) -> CircuitState {
        let expired = self.expiry.is_some_and(|expiry| expiry <= now);
        match self.state {
            CircuitState::Closed if expired => self.new_generation(settings, now),
            CircuitState::Open if expired => {
                self.set_state(CircuitState::HalfOpen, settings, now, transitions)
            }
            _ => {}
        }
        self.state
    }

    fn set_state(
        &mut self,
        to: CircuitState,
        settings: &BreakerSettings,
        now: Instant,
        transitions: &mut Vec<Transition>,
    ) {
        if self.state == to {
            return;
        }
        let from = self.state;
        self.state = to;
        self.new_generation(settings, now);
        transitions.push((from, to));
    }

    fn new_generation(&mut self, settings: &BreakerSettings, now: Instant) {
        self.generation = self.generation.wrapping_add(1);
        self.counts = Counts::default();
        self.expiry = match self.state {
            CircuitState::Closed if settings.interval.is_zero() => None,
            CircuitState::Closed => Some(now + settings.interval),
            CircuitState::Open => Some(now + settings.open_timeout),
            CircuitState::HalfOpen => None,
        };
    }

    fn ready_to_trip(&self, settings: &BreakerSettings) -> bool {
        self.counts.requests >= settings.min_requests
            && self.counts.failure_ratio() >= settings.failure_ratio
    }

    fn record(
        &mut self,
        outcome: Outcome,
        settings: &BreakerSettings,
        now: Instant,
        transitions: &mut Vec<Transition>,
    ) {
        match (outcome, self.state) {
            (Outcome::Ignored, _) => self.counts.on_abandon(),
            (Outcome::Success, CircuitState::Closed) => self.counts.on_success(),
            (Outcome::Success, CircuitState::HalfOpen) => {
                self.counts.on_success();
                if self.counts.consecutive_successes >= settings.max_half_open_requests {
                    self.set_state(CircuitState::Closed, settings, now, transitions);
                }
            }
            (Outcome::Failure, CircuitState::Closed) => {
                self.counts.on_failure();
                if self.ready_to_trip(settings) {
                    self.set_state(CircuitState::Open, settings, now, transitions);
                }
            }
            (Outcome::Failure, CircuitState::HalfOpen) => {
                self.set_state(CircuitState::Open, settings, now, transitions);
            }
            (_, CircuitState::Open) => {}
        }
    }
}

/// Circuit breaker guarding one downstream dependency.
pub struct CircuitBreaker {
    settings: BreakerSettings,
    observer: Arc<dyn BreakerObserver>,
    core: Mutex<BreakerCore>,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("settings", &self.settings)
            .field("core", &self.core)
            .finish()
    }
}

impl CircuitBreaker {
    /// Create a breaker that reports transitions through [`LoggingObserver`].
    pub fn new(settings: BreakerSettings) -> Self {
        Self::with_observer(settings, Arc::new(LoggingObserver))
    }

    pub fn with_observer(settings: BreakerSettings, observer: Arc<dyn BreakerObserver>) -> Self {
        let core = BreakerCore::new(&settings, Instant::now());
        Self {
            settings,
            observer,
            core: Mutex::new(core),
        }
    }

    /// Current state, applying any timer-driven transition first.
    pub fn state(&self) -> CircuitState {
        let mut transitions = Vec::new();
        let state = {
            let mut core = self.lock();
            core.current_state(&self.settings, Instant::now(), &mut transitions)
        };
        self.notify(&transitions);
        state
    }

    /// Counters of the current generation.
    pub fn counts(&self) -> Counts {
        let mut transitions = Vec::new();
        let counts = {
            let mut core = self.lock();
            core.current_state(&self.settings, Instant::now(), &mut transitions);
            core.counts
        };
        self.notify(&transitions);
        counts
    }

    /// Run `operation` if the breaker admits it; every error counts as a failure.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with(operation, |_| true).await
    }

    /// Run `operation` if admitted; `is_failure` decides which errors count
    /// against the dependency. Errors it rejects are not recorded at all.
    pub async fn execute_with<T, E, F, Fut, P>(
        &self,
        operation: F,
        is_failure: P,
    ) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: FnOnce(&E) -> bool,
    {
        let generation = self.before_request().ok_or_else(|| BreakerError::Open {
            name: self.settings.name.clone(),
        })?;

        let mut admission = Admission {
            breaker: self,
            generation,
            settled: false,
        };

        let result = operation().await;
        let outcome = match &result {
            Ok(_) => Outcome::Success,
            Err(e) if is_failure(e) => Outcome::Failure,
            Err(_) => Outcome::Ignored,
        };
        admission.settle(outcome);

        result.map_err(BreakerError::Inner)
    }

    fn before_request(&self) -> Option<u64> {
        let mut transitions = Vec::new();
        let admitted = {
            let mut core = self.lock();
            let state = core.current_state(&self.settings, Instant::now(), &mut transitions);
            let rejected = match state {
                CircuitState::Open => true,
                CircuitState::HalfOpen => {
                    core.counts.requests >= self.settings.max_half_open_requests
                }
                CircuitState::Closed => false,
            };
            if rejected {
                None
            } else {
                core.counts.on_request();
                Some(core.generation)
            }
        };
        self.notify(&transitions);

        if admitted.is_none() {
            tracing::debug!(name = %self.settings.name, "Circuit breaker rejected call");
            metrics::record_breaker_rejection(&self.settings.name);
        }
        admitted
    }

    fn after_request(&self, generation: u64, outcome: Outcome) {
        let mut transitions = Vec::new();
        {
            let mut core = self.lock();
            let now = Instant::now();
            core.current_state(&self.settings, now, &mut transitions);
            if core.generation == generation {
                core.record(outcome, &self.settings, now, &mut transitions);
            }
        }
        self.notify(&transitions);
    }

    fn notify(&self, transitions: &[Transition]) {
        for &(from, to) in transitions {
            self.observer.on_state_change(&self.settings.name, from, to);
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Records the outcome of an admitted call; releases the slot if dropped unsettled.
struct Admission<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl Admission<'_> {
    fn settle(&mut self, outcome: Outcome) {
        self.settled = true;
        self.breaker.after_request(self.generation, outcome);
    }
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.after_request(self.generation, Outcome::Ignored);
        }
    }
}
