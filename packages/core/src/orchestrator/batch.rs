use std::future::Future;

use serde::Serialize;

use super::{to_data, RequestOrchestrator};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Run every call at once instead of one after another.
    pub concurrent: bool,
    /// Propagate the first failure instead of collecting it.
    pub stop_on_error: bool,
    /// Announce each step of a sequential batch.
    pub show_progress: bool,
}

/// Per-call outcomes, aligned with the input order. Exactly one of
/// `results[i]` and `errors[i]` is set for every call that ran.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub results: Vec<Option<T>>,
    pub errors: Vec<Option<AppError>>,
}

impl<T> BatchOutcome<T> {
    fn with_len(len: usize) -> Self {
        Self {
            results: (0..len).map(|_| None).collect(),
            errors: (0..len).map(|_| None).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn failed(&self) -> usize {
        self.errors.iter().filter(|e| e.is_some()).count()
    }

    /// Take the lowest-index error out of the outcome.
    fn take_first_error(&mut self) -> Option<AppError> {
        self.errors.iter_mut().find_map(Option::take)
    }
}

impl RequestOrchestrator {
    /// Run several calls as one batch.
    ///
    /// Concurrent batches spawn every call and wait for all of them; with
    /// `stop_on_error` the lowest-index failure is returned once they have
    /// all finished. Sequential batches run in order and, with
    /// `stop_on_error`, skip the remaining calls after the first failure.
    pub async fn execute_all<T, F, Fut>(
        &self,
        calls: Vec<F>,
        options: BatchOptions,
    ) -> Result<BatchOutcome<T>, AppError>
    where
        T: Serialize + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        {
            let mut state = self.lock_state();
            state.loading = true;
            state.pending = true;
            state.success = false;
            state.error = false;
            state.last_error = None;
        }

        let outcome = if options.concurrent {
            self.run_concurrent(calls, options).await
        } else {
            self.run_sequential(calls, options).await
        };

        let mut state = self.lock_state();
        state.loading = false;
        state.pending = false;
        match outcome {
            Ok(outcome) => {
                state.success = true;
                state.data = to_data(&outcome.results);
                Ok(outcome)
            }
            Err(err) => {
                state.error = true;
                state.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn run_concurrent<T, F, Fut>(
        &self,
        calls: Vec<F>,
        options: BatchOptions,
    ) -> Result<BatchOutcome<T>, AppError>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let mut outcome = BatchOutcome::with_len(calls.len());
        let started = std::time::Instant::now();
        let handles: Vec<_> = calls.into_iter().map(|call| tokio::spawn(call())).collect();

        for (index, handle) in handles.into_iter().enumerate() {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_err) => Err(AppError::Unknown(format!("batch call {} aborted: {}", index, join_err))),
            };
            self.observe_call(started, result.is_err());

            match result {
                Ok(value) => outcome.results[index] = Some(value),
                Err(err) => {
                    tracing::error!("batch call {} failed: {}", index, err);
                    outcome.errors[index] = Some(err);
                }
            }
        }

        if options.stop_on_error {
            if let Some(err) = outcome.take_first_error() {
                return Err(err);
            }
        }

        Ok(outcome)
    }

    async fn run_sequential<T, F, Fut>(
        &self,
        calls: Vec<F>,
        options: BatchOptions,
    ) -> Result<BatchOutcome<T>, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let total = calls.len();
        let mut outcome = BatchOutcome::with_len(total);

        for (index, call) in calls.into_iter().enumerate() {
            if options.show_progress {
                self.notifier
                    .info(&format!("Running request {}/{}...", index + 1, total));
            }

            let started = std::time::Instant::now();
            let result = call().await;
            self.observe_call(started, result.is_err());

            match result {
                Ok(value) => outcome.results[index] = Some(value),
                Err(err) if options.stop_on_error => {
                    tracing::error!("batch call {} failed, aborting: {}", index, err);
                    return Err(err);
                }
                Err(err) => {
                    tracing::error!("batch call {} failed: {}", index, err);
                    outcome.errors[index] = Some(err);
                }
            }
        }

        Ok(outcome)
    }
}
