use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use rama::Service;
use tokio::time::Instant;

use crate::{
    endpoint::{Completion, EndpointError},
    request::{RequestCost, Submission},
};

#[derive(Debug, Clone, Copy)]
pub(super) struct Call {
    pub(super) started: Instant,
    pub(super) finished: Instant,
    pub(super) cost: RequestCost,
}

/// Serves every submission after `latency` and keeps a log of the calls.
#[derive(Debug, Clone)]
pub(super) struct RecordingEndpoint {
    latency: Duration,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingEndpoint {
    pub(super) fn new(latency: Duration) -> Self {
        Self {
            latency,
            calls: Default::default(),
        }
    }

    pub(super) fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }
}

impl Service<Submission> for RecordingEndpoint {
    type Output = Completion;
    type Error = EndpointError;

    async fn serve(&self, submission: Submission) -> Result<Self::Output, Self::Error> {
        let started = Instant::now();
        tokio::time::sleep(self.latency).await;
        self.calls.lock().push(Call {
            started,
            finished: Instant::now(),
            cost: submission.cost,
        });
        Ok(Completion::default())
    }
}

/// Fails every submission after `latency` with a retryable error
/// and keeps the start time of every call.
#[derive(Debug, Clone)]
pub(super) struct RetryableFailure {
    latency: Duration,
    starts: Arc<Mutex<Vec<Instant>>>,
}

impl RetryableFailure {
    pub(super) fn new(latency: Duration) -> Self {
        Self {
            latency,
            starts: Default::default(),
        }
    }

    pub(super) fn starts(&self) -> Vec<Instant> {
        self.starts.lock().clone()
    }
}

impl Service<Submission> for RetryableFailure {
    type Output = Completion;
    type Error = EndpointError;

    async fn serve(&self, _submission: Submission) -> Result<Self::Output, Self::Error> {
        self.starts.lock().push(Instant::now());
        tokio::time::sleep(self.latency).await;
        Err(EndpointError::failure("region moved").with_retryable(true))
    }
}

/// Never completes.
#[derive(Debug, Clone)]
pub(super) struct Stalled;

impl Service<Submission> for Stalled {
    type Output = Completion;
    type Error = EndpointError;

    async fn serve(&self, _submission: Submission) -> Result<Self::Output, Self::Error> {
        std::future::pending().await
    }
}
