//! The service endpoint a workload is driven against.
//!
//! The engine only relies on [`ServiceEndpoint`]: any rama [`Service`]
//! taking a [`Submission`] and eventually returning a [`Completion`]
//! or an [`EndpointError`]. Timing and timeout policies are entirely
//! up to the endpoint.

use std::{fmt, time::Duration};

use rama::Service;

use crate::request::Submission;

mod mock;
mod model;

pub use self::{
    mock::{MockEndpoint, MockEndpointConfig},
    model::{ResourceModelConfig, ResourceModelEndpoint},
};

/// A [`Service`] able to serve workload [`Submission`]s.
pub trait ServiceEndpoint:
    Service<Submission, Output = Completion, Error = EndpointError>
{
}

impl<S> ServiceEndpoint for S where
    S: Service<Submission, Output = Completion, Error = EndpointError>
{
}

#[derive(Debug, Clone, Default)]
/// Successful completion of a submission.
pub struct Completion {
    /// Pure service time charged by the endpoint, excluding queuing,
    /// if the endpoint reports it.
    pub service_time: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointErrorKind {
    Failure,
    /// Distinguished failure for statistics purposes; never fatal.
    Timeout,
}

#[derive(Debug, Clone)]
/// A single request failed.
///
/// Never fatal: the failure is recorded and the instance keeps looping.
pub struct EndpointError {
    kind: EndpointErrorKind,
    retryable: bool,
    message: String,
}

impl EndpointError {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            kind: EndpointErrorKind::Failure,
            retryable: false,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: EndpointErrorKind::Timeout,
            retryable: false,
            message: message.into(),
        }
    }

    /// Mark the failure as retryable: the issuing instance
    /// re-issues right away instead of pausing for its think time.
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn kind(&self) -> EndpointErrorKind {
        self.kind
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == EndpointErrorKind::Timeout
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl fmt::Display for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EndpointErrorKind::Failure => write!(f, "EndpointFailure: {}", self.message),
            EndpointErrorKind::Timeout => write!(f, "EndpointTimeout: {}", self.message),
        }
    }
}

impl std::error::Error for EndpointError {}

/// Sleep for `delay`, unless it is zero.
pub(crate) async fn hold(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Convert seconds into a [`Duration`], treating invalid input as zero
/// and saturating at [`Duration::MAX`].
pub(crate) fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0. {
        Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}
