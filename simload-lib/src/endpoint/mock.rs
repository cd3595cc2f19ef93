use std::time::Duration;

use rama::{Service, error::OpaqueError, telemetry::tracing};

use super::{Completion, EndpointError, hold, secs};
use crate::request::Submission;

#[derive(Debug, Clone, Default)]
/// Behavior of a [`MockEndpoint`].
pub struct MockEndpointConfig {
    /// Base processing time before responding (s).
    pub base_latency: f64,
    /// Random delay added to (or removed from) `base_latency` (s).
    pub jitter: f64,
    /// Probability of failing a request.
    pub error_rate: f32,
    /// Probability of a request timing out.
    pub timeout_rate: f32,
    /// Time it takes before a timed-out request reports back (s).
    pub timeout: f64,
}

#[derive(Debug, Clone)]
/// Endpoint with a fixed latency profile, ignoring the request cost.
///
/// Mostly useful to measure the engine itself and in tests.
pub struct MockEndpoint {
    base_latency: f64,
    jitter: f64,
    error_rate: f32,
    timeout_rate: f32,
    timeout: Duration,
}

#[derive(Debug, Clone, Copy)]
enum MockOutcome {
    Timeout,
    Error,
    Ok,
}

impl MockEndpoint {
    pub fn try_new(cfg: MockEndpointConfig) -> Result<Self, OpaqueError> {
        let error_rate = Self::clamp_rate(cfg.error_rate);
        let timeout_rate = Self::clamp_rate(cfg.timeout_rate);

        if error_rate + timeout_rate > 1. {
            return Err(OpaqueError::from_display(
                "timeout_rate + error_rate must be <= 1.0",
            ));
        }

        Ok(Self {
            base_latency: cfg.base_latency.max(0.),
            jitter: cfg.jitter.max(0.),
            error_rate,
            timeout_rate,
            timeout: secs(cfg.timeout),
        })
    }

    /// Endpoint that completes every request instantly.
    pub fn instant() -> Self {
        Self {
            base_latency: 0.,
            jitter: 0.,
            error_rate: 0.,
            timeout_rate: 0.,
            timeout: Duration::ZERO,
        }
    }

    /// Endpoint that instantly fails every request.
    pub fn always_failing() -> Self {
        Self {
            error_rate: 1.,
            ..Self::instant()
        }
    }

    /// Endpoint that completes every request after exactly `latency`.
    pub fn fixed(latency: Duration) -> Self {
        Self {
            base_latency: latency.as_secs_f64(),
            ..Self::instant()
        }
    }

    #[inline(always)]
    fn clamp_rate(v: f32) -> f32 {
        if v.is_nan() { 0. } else { v.clamp(0., 1.0) }
    }

    fn pick_outcome(&self) -> MockOutcome {
        if self.timeout_rate <= 0. && self.error_rate <= 0. {
            return MockOutcome::Ok;
        }

        let r: f32 = rand::random();

        let t_timeout = self.timeout_rate;
        let t_error = t_timeout + self.error_rate;

        if r < t_timeout {
            MockOutcome::Timeout
        } else if r < t_error {
            MockOutcome::Error
        } else {
            MockOutcome::Ok
        }
    }

    fn compute_delay(&self) -> Duration {
        if self.jitter == 0.0 {
            return secs(self.base_latency);
        }

        let span = self.jitter * 2.0;
        let u: f64 = rand::random();
        let delta = (u * span) - self.jitter;

        secs(self.base_latency + delta)
    }
}

impl Service<Submission> for MockEndpoint {
    type Output = Completion;
    type Error = EndpointError;

    async fn serve(&self, submission: Submission) -> Result<Self::Output, Self::Error> {
        let delay = self.compute_delay();
        hold(delay).await;

        match self.pick_outcome() {
            MockOutcome::Timeout => {
                hold(self.timeout).await;
                tracing::trace!(client_id = %submission.client_id, "mock endpoint: timeout");
                Err(EndpointError::timeout("mock request timed out"))
            }
            MockOutcome::Error => {
                tracing::trace!(client_id = %submission.client_id, "mock endpoint: failure");
                Err(EndpointError::failure("mock request failed"))
            }
            MockOutcome::Ok => Ok(Completion {
                service_time: Some(delay),
            }),
        }
    }
}
