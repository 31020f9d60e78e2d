//! Single-consumer long-poll loop over `getUpdates`.
//!
//! At most one loop runs per [`PollingManager`]. The offset cursor only moves
//! forward, and only past updates that were handed to the [`UpdateHandler`].
//! Both the loop and [`PollingManager::force_clear`] hold the cursor guard
//! while they touch the remote feed, so they never race each other.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::BotApi;
use crate::error::TelegramError;
use crate::handler::UpdateHandler;
use crate::retry::RetryPolicy;
use crate::types::Update;

/// Updates fetched per `getUpdates` call.
pub const DEFAULT_BATCH_LIMIT: u32 = 100;

/// Attempts `force_clear` makes before giving up.
pub const CLEAR_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
pub struct PollingOptions {
    /// Server-side long-poll timeout. Kept short so `stop()` is honored quickly.
    pub poll_timeout_secs: u64,
    pub batch_limit: u32,
    /// Consecutive conflicts tolerated before the loop stops itself.
    pub conflict_retry: RetryPolicy,
    /// Delay schedule after network/API failures. The loop never gives up on these.
    pub error_backoff: RetryPolicy,
    pub clear_retry: RetryPolicy,
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            poll_timeout_secs: 1,
            batch_limit: DEFAULT_BATCH_LIMIT,
            conflict_retry: RetryPolicy::new(5, Duration::from_secs(2), Duration::from_secs(30)),
            error_backoff: RetryPolicy::new(u32::MAX, Duration::from_secs(1), Duration::from_secs(60)),
            clear_retry: RetryPolicy::fixed(CLEAR_MAX_ATTEMPTS, Duration::from_secs(2)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollingPhase {
    Stopped,
    Running,
    ConflictBackoff,
    /// Stop was requested; the loop is finishing its current iteration.
    Stopping,
}

/// Read-only snapshot returned by every control operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollingStatus {
    pub is_active: bool,
    pub offset: i64,
    pub phase: PollingPhase,
    pub last_error: Option<String>,
}

/// Outcome of a [`PollingManager::force_clear`] run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    pub attempts: u32,
    pub offset: i64,
    pub discarded: usize,
    pub drained: bool,
    pub webhook_cleared: bool,
    pub last_error: Option<String>,
}

/// Control surface shared by every update transport.
#[async_trait]
pub trait BotControl: Send + Sync {
    fn start(&self) -> PollingStatus;
    fn stop(&self) -> PollingStatus;
    fn status(&self) -> PollingStatus;
    async fn force_clear(&self) -> ClearReport;
}

struct PollingState {
    phase: PollingPhase,
    offset: i64,
    last_error: Option<String>,
    generation: u64,
    stop_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl PollingState {
    fn snapshot(&self) -> PollingStatus {
        PollingStatus {
            is_active: self.phase != PollingPhase::Stopped,
            offset: self.offset,
            phase: self.phase,
            last_error: self.last_error.clone(),
        }
    }

    fn is_polling(&self) -> bool {
        matches!(
            self.phase,
            PollingPhase::Running | PollingPhase::ConflictBackoff
        )
    }

    /// Signal the current loop to exit. Returns whether one was running.
    /// The phase stays `Stopping` until the loop itself calls `finish`.
    fn halt(&mut self) -> bool {
        match self.stop_tx.take() {
            Some(tx) => {
                let _ = tx.send(true);
                self.phase = PollingPhase::Stopping;
                true
            }
            None => false,
        }
    }
}

struct Inner {
    api: Arc<dyn BotApi>,
    handler: Arc<dyn UpdateHandler>,
    options: PollingOptions,
    state: Mutex<PollingState>,
    cursor: tokio::sync::Mutex<()>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, PollingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn advance_offset(&self, next: i64) {
        let mut state = self.state();
        if next > state.offset {
            state.offset = next;
        }
    }

    /// Apply `f` only if `generation` is still the current loop.
    fn update_if_current(&self, generation: u64, f: impl FnOnce(&mut PollingState)) {
        let mut state = self.state();
        if state.generation == generation && state.stop_tx.is_some() {
            f(&mut state);
        }
    }

    fn finish(&self, generation: u64, error: Option<String>) {
        let mut state = self.state();
        if state.generation == generation {
            state.phase = PollingPhase::Stopped;
            state.stop_tx = None;
            state.task = None;
            if error.is_some() {
                state.last_error = error;
            }
        }
    }

    /// Polling and webhooks are mutually exclusive on Telegram's side.
    async fn release_webhook(&self) {
        match self.api.get_webhook_info().await {
            Ok(info) if info.is_registered() => {
                warn!(url = %info.url, "webhook registered, removing it before polling");
                if let Err(e) = self.api.delete_webhook(false).await {
                    warn!(error = %e, "failed to remove webhook");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "getWebhookInfo failed"),
        }
    }

    async fn dispatch(&self, mut updates: Vec<Update>) {
        updates.sort_by_key(|u| u.update_id);
        for update in updates {
            let update_id = update.update_id;
            let acknowledged = self.state().offset;
            if update_id < acknowledged {
                debug!(update_id, "skipping already acknowledged update");
                continue;
            }
            match AssertUnwindSafe(self.handler.handle(update))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(update_id, error = %e, "update handler failed"),
                Err(_) => error!(update_id, "update handler panicked"),
            }
            self.advance_offset(update_id + 1);
        }
    }

    /// One guarded iteration: fetch with the current offset, then dispatch.
    /// `None` means stop was requested before the fetch finished.
    async fn poll_once(
        &self,
        stop_rx: &mut watch::Receiver<bool>,
    ) -> Option<Result<usize, TelegramError>> {
        let _cursor = tokio::select! {
            guard = self.cursor.lock() => guard,
            _ = stop_rx.changed() => return None,
        };
        if *stop_rx.borrow() {
            return None;
        }
        let offset = self.state().offset;
        let fetched = tokio::select! {
            result = self.api.get_updates(offset, self.options.poll_timeout_secs, self.options.batch_limit) => result,
            _ = stop_rx.changed() => return None,
        };
        match fetched {
            Ok(updates) => {
                let count = updates.len();
                self.dispatch(updates).await;
                Some(Ok(count))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Sleep unless stop is requested first. Returns `false` when stopped.
async fn pause(stop_rx: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => !*stop_rx.borrow(),
        _ = stop_rx.changed() => false,
    }
}

async fn run_loop(inner: Arc<Inner>, generation: u64, mut stop_rx: watch::Receiver<bool>) {
    inner.release_webhook().await;

    let mut conflicts = 0u32;
    let mut failures = 0u32;

    loop {
        if *stop_rx.borrow() {
            break;
        }
        let Some(outcome) = inner.poll_once(&mut stop_rx).await else {
            break;
        };

        match outcome {
            Ok(count) => {
                if count > 0 {
                    let offset = inner.state().offset;
                    debug!(count, offset, "dispatched updates");
                }
                if conflicts > 0 || failures > 0 {
                    info!("telegram polling recovered");
                    inner.update_if_current(generation, |state| {
                        state.phase = PollingPhase::Running;
                        state.last_error = None;
                    });
                }
                conflicts = 0;
                failures = 0;
            }
            Err(e) if e.is_conflict() => {
                conflicts += 1;
                let policy = inner.options.conflict_retry;
                if policy.exhausted(conflicts) {
                    warn!(attempts = conflicts, error = %e, "conflict persisted, stopping polling");
                    inner.finish(generation, Some(e.to_string()));
                    return;
                }
                warn!(attempt = conflicts, error = %e, "another consumer is polling, backing off");
                inner.update_if_current(generation, |state| {
                    state.phase = PollingPhase::ConflictBackoff;
                    state.last_error = Some(e.to_string());
                });
                if !pause(&mut stop_rx, policy.delay_for(conflicts)).await {
                    break;
                }
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                let delay = inner.options.error_backoff.delay_for(failures);
                warn!(attempt = failures, error = %e, ?delay, "getUpdates failed, retrying");
                inner.update_if_current(generation, |state| {
                    state.last_error = Some(e.to_string());
                });
                if !pause(&mut stop_rx, delay).await {
                    break;
                }
            }
        }
    }

    inner.finish(generation, None);
    info!(generation, "telegram polling loop exited");
}

/// Runs the loop and marks the generation stopped if it unwinds.
async fn supervise(inner: Arc<Inner>, generation: u64, stop_rx: watch::Receiver<bool>) {
    let outcome = AssertUnwindSafe(run_loop(Arc::clone(&inner), generation, stop_rx))
        .catch_unwind()
        .await;
    if outcome.is_err() {
        error!(generation, "telegram polling loop panicked");
        inner.finish(generation, Some("polling loop panicked".to_owned()));
    }
}

/// Owns the polling state for one bot token. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct PollingManager {
    inner: Arc<Inner>,
}

impl PollingManager {
    pub fn new(
        api: Arc<dyn BotApi>,
        handler: Arc<dyn UpdateHandler>,
        options: PollingOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                handler,
                options,
                state: Mutex::new(PollingState {
                    phase: PollingPhase::Stopped,
                    offset: 0,
                    last_error: None,
                    generation: 0,
                    stop_tx: None,
                    task: None,
                }),
                cursor: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Spawn the poll loop. A no-op returning the current status if one is polling.
    ///
    /// Starting while the previous loop is still `Stopping` is allowed: the old
    /// generation can no longer touch the state, and the cursor guard keeps the
    /// two from fetching at the same time. Must be called from within a tokio runtime.
    pub fn start(&self) -> PollingStatus {
        let mut state = self.inner.state();
        if state.is_polling() {
            return state.snapshot();
        }
        let (stop_tx, stop_rx) = watch::channel(false);
        state.generation += 1;
        state.phase = PollingPhase::Running;
        state.last_error = None;
        state.stop_tx = Some(stop_tx);
        let generation = state.generation;
        state.task = Some(tokio::spawn(supervise(
            Arc::clone(&self.inner),
            generation,
            stop_rx,
        )));
        let snapshot = state.snapshot();
        drop(state);

        info!(generation, offset = snapshot.offset, "telegram polling started");
        snapshot
    }

    /// Ask the loop to exit. An in-flight long poll is abandoned; dispatch in
    /// progress finishes first, during which the phase reads `Stopping`.
    /// Idempotent.
    pub fn stop(&self) -> PollingStatus {
        let mut state = self.inner.state();
        if state.halt() {
            info!(offset = state.offset, "telegram polling stop requested");
        }
        state.snapshot()
    }

    pub fn status(&self) -> PollingStatus {
        self.inner.state().snapshot()
    }

    /// Reset the feed: stop polling, drop the webhook with its pending updates,
    /// then fetch and discard the backlog with an always-advancing offset.
    ///
    /// Every failed fetch (conflict included) is retried until the attempt
    /// budget runs out. Does not restart polling.
    pub async fn force_clear(&self) -> ClearReport {
        let (was_running, task) = {
            let mut state = self.inner.state();
            (state.halt(), state.task.take())
        };
        if was_running {
            info!("stopped polling before force clear");
        }
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "polling task ended abnormally");
            }
        }
        let _cursor = self.inner.cursor.lock().await;

        let webhook_cleared = match self.inner.api.delete_webhook(true).await {
            Ok(cleared) => cleared,
            Err(e) => {
                warn!(error = %e, "deleteWebhook failed during force clear");
                false
            }
        };

        let policy = self.inner.options.clear_retry;
        let mut offset = self.inner.state().offset;
        let mut report = ClearReport {
            attempts: 0,
            offset,
            discarded: 0,
            drained: false,
            webhook_cleared,
            last_error: None,
        };

        while !policy.exhausted(report.attempts) {
            report.attempts += 1;
            match self
                .inner
                .api
                .get_updates(offset, 0, self.inner.options.batch_limit)
                .await
            {
                Ok(updates) if updates.is_empty() => {
                    report.drained = true;
                    report.last_error = None;
                    break;
                }
                Ok(updates) => {
                    report.discarded += updates.len();
                    if let Some(max_id) = updates.iter().map(|u| u.update_id).max() {
                        offset = offset.max(max_id + 1);
                    }
                    self.inner.advance_offset(offset);
                    debug!(attempt = report.attempts, offset, "discarded backlog batch");
                }
                Err(e) => {
                    warn!(attempt = report.attempts, error = %e, "backlog fetch failed during force clear");
                    report.last_error = Some(e.to_string());
                    if !policy.exhausted(report.attempts) {
                        tokio::time::sleep(policy.delay_for(report.attempts)).await;
                    }
                }
            }
        }

        report.offset = offset;
        {
            let mut state = self.inner.state();
            state.last_error = report.last_error.clone();
        }
        info!(
            attempts = report.attempts,
            offset = report.offset,
            discarded = report.discarded,
            drained = report.drained,
            "force clear finished"
        );
        report
    }
}

#[async_trait]
impl BotControl for PollingManager {
    fn start(&self) -> PollingStatus {
        PollingManager::start(self)
    }

    fn stop(&self) -> PollingStatus {
        PollingManager::stop(self)
    }

    fn status(&self) -> PollingStatus {
        PollingManager::status(self)
    }

    async fn force_clear(&self) -> ClearReport {
        PollingManager::force_clear(self).await
    }
}
