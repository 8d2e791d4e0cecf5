use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{to_data, RequestOrchestrator};
use crate::error::AppError;

type PollFuture<T> = Pin<Box<dyn Future<Output = Result<T, AppError>> + Send>>;
type PollJob<T> = Arc<dyn Fn() -> PollFuture<T> + Send + Sync>;
type Hook<T> = Box<dyn Fn(&T) + Send + Sync>;

/// Options for [`RequestOrchestrator::poll`].
pub struct PollOptions<T> {
    /// Invoke right away on start instead of after one interval.
    pub immediate: bool,
    /// How many times the call may be rescheduled. `None` means forever.
    pub max_retries: Option<u32>,
    on_success: Option<Hook<T>>,
    on_error: Option<Hook<AppError>>,
    condition: Option<Box<dyn Fn(&T) -> bool + Send + Sync>>,
}

impl<T> Default for PollOptions<T> {
    fn default() -> Self {
        Self {
            immediate: true,
            max_retries: None,
            on_success: None,
            on_error: None,
            condition: None,
        }
    }
}

impl<T> PollOptions<T> {
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn on_success(mut self, hook: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Box::new(hook));
        self
    }

    pub fn on_error(mut self, hook: impl Fn(&AppError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    /// Stop polling once `condition` holds for a successful result.
    pub fn until(mut self, condition: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.condition = Some(Box::new(condition));
        self
    }
}

/// Handle on a fixed-interval poll loop.
///
/// Created stopped. `start` and `stop` are idempotent. Stopping cancels the
/// pending timer and prevents rescheduling, but a call already in flight
/// runs to completion. Dropping the poller stops it.
pub struct Poller<T> {
    job: PollJob<T>,
    interval: Duration,
    options: Arc<PollOptions<T>>,
    orchestrator: Arc<RequestOrchestrator>,
    polling: Arc<AtomicBool>,
    stop_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl<T> Poller<T>
where
    T: Serialize + Send + Sync + 'static,
{
    /// Spawn the poll loop on the current Tokio runtime.
    pub fn start(&mut self) {
        if self.polling.swap(true, Ordering::SeqCst) {
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        self.stop_tx = Some(stop_tx);

        let run = PollRun {
            job: self.job.clone(),
            interval: self.interval,
            options: self.options.clone(),
            orchestrator: self.orchestrator.clone(),
            polling: self.polling.clone(),
            stop_rx,
        };
        self.task = Some(tokio::spawn(run.run()));
    }

    pub fn stop(&mut self) {
        self.polling.store(false, Ordering::SeqCst);
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        // Detach rather than abort so an in-flight call still completes.
        self.task.take();
    }

    pub fn is_polling(&self) -> bool {
        self.polling.load(Ordering::SeqCst)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        self.polling.store(false, Ordering::SeqCst);
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
    }
}

struct PollRun<T> {
    job: PollJob<T>,
    interval: Duration,
    options: Arc<PollOptions<T>>,
    orchestrator: Arc<RequestOrchestrator>,
    polling: Arc<AtomicBool>,
    stop_rx: watch::Receiver<bool>,
}

impl<T> PollRun<T>
where
    T: Serialize + Send + Sync + 'static,
{
    async fn run(mut self) {
        if !self.options.immediate && !self.wait().await {
            return;
        }

        let mut rescheduled = 0_u32;
        loop {
            if let Some(metrics) = self.orchestrator.metrics() {
                metrics.poll_ticks_total.inc();
            }

            match (self.job)().await {
                Ok(value) => {
                    self.orchestrator.record_data(to_data(&value));
                    if let Some(hook) = &self.options.on_success {
                        hook(&value);
                    }
                    if self.options.condition.as_ref().is_some_and(|done| done(&value)) {
                        tracing::debug!("poll condition met, stopping");
                        self.finish();
                        return;
                    }
                }
                Err(err) => {
                    tracing::warn!("poll call failed: {}", err);
                    self.orchestrator.record_error(&err);
                    if let Some(hook) = &self.options.on_error {
                        hook(&err);
                    }
                }
            }

            if self.stopped() {
                return;
            }

            if self.options.max_retries.is_some_and(|max| rescheduled >= max) {
                tracing::debug!("poll budget of {} reschedules used up", rescheduled);
                self.finish();
                return;
            }
            rescheduled += 1;

            if !self.wait().await {
                return;
            }
        }
    }

    /// Sleep one interval. Returns false when stopped meanwhile.
    async fn wait(&mut self) -> bool {
        let interval = self.interval;
        let stop_rx = &mut self.stop_rx;
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = stop_rx.changed() => return false,
        }
        !self.stopped()
    }

    fn stopped(&self) -> bool {
        *self.stop_rx.borrow()
    }

    /// Natural end of the loop. Only clears the flag while this run is
    /// still the live one.
    fn finish(&self) {
        if !self.stopped() {
            self.polling.store(false, Ordering::SeqCst);
        }
    }
}

impl RequestOrchestrator {
    /// Build a poller around `call`. The poller is returned stopped.
    pub fn poll<T, F, Fut>(
        self: &Arc<Self>,
        call: F,
        interval: Duration,
        options: PollOptions<T>,
    ) -> Poller<T>
    where
        T: Serialize + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let job: PollJob<T> = Arc::new(move || Box::pin(call()) as PollFuture<T>);
        Poller {
            job,
            interval,
            options: Arc::new(options),
            orchestrator: self.clone(),
            polling: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            task: None,
        }
    }
}
