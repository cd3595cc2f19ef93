//! Closed-loop actor: issue one request, await its completion,
//! record it, think, repeat.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use rama::{Service as _, graceful::ShutdownGuard, telemetry::tracing};
use rand::rngs::SmallRng;
use tokio::time::Instant;

use crate::{
    clock::SimClock,
    endpoint::ServiceEndpoint,
    profile::ClientId,
    request::{RequestModel, Submission},
    stats::{Outcome, RequestRecord, StatsAggregator},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Lifecycle of an [`Instance`].
///
/// `Idle → Issuing → AwaitingCompletion → Recording → Idle → …`,
/// with `Stopped` reachable from any state on shutdown.
pub enum InstanceState {
    Idle,
    Issuing,
    AwaitingCompletion,
    Recording,
    Stopped,
}

impl InstanceState {
    pub fn can_transition_to(self, next: InstanceState) -> bool {
        use InstanceState::*;

        matches!(
            (self, next),
            (Idle, Issuing)
                | (Issuing, AwaitingCompletion)
                | (AwaitingCompletion, Recording)
                | (Recording, Idle)
                | (Idle | Issuing | AwaitingCompletion | Recording, Stopped)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId {
    pub client_id: ClientId,
    pub index: usize,
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.client_id, self.index)
    }
}

/// Counts the instances of a client whose loop is running.
#[derive(Debug, Clone, Default)]
pub struct ActiveInstances(Arc<AtomicUsize>);

impl ActiveInstances {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn enter(&self) -> ActiveSlot {
        self.0.fetch_add(1, Ordering::AcqRel);
        ActiveSlot(self.0.clone())
    }
}

/// Keeps an instance counted as active until dropped,
/// however its loop is left.
struct ActiveSlot(Arc<AtomicUsize>);

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// One concurrency slot of a client profile.
pub struct Instance<E> {
    id: InstanceId,
    model: RequestModel,
    endpoint: Arc<E>,
    aggregator: Arc<StatsAggregator>,
    clock: SimClock,
    active: ActiveInstances,
    rng: SmallRng,
    state: InstanceState,
}

impl<E: ServiceEndpoint> Instance<E> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: InstanceId,
        model: RequestModel,
        endpoint: Arc<E>,
        aggregator: Arc<StatsAggregator>,
        clock: SimClock,
        active: ActiveInstances,
        rng: SmallRng,
    ) -> Self {
        Self {
            id,
            model,
            endpoint,
            aggregator,
            clock,
            active,
            rng,
            state: InstanceState::Idle,
        }
    }

    fn transition(&mut self, next: InstanceState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "instance {}: invalid transition {:?} -> {next:?}",
            self.id,
            self.state,
        );
        tracing::trace!(instance = %self.id, from = ?self.state, to = ?next, "instance transition");
        self.state = next;
    }

    /// Run the closed loop until the guard is cancelled.
    ///
    /// A request in flight at shutdown is abandoned
    /// and its eventual completion discarded.
    pub async fn run(mut self, guard: ShutdownGuard) {
        let _slot = self.active.enter();
        let think_time = self.model.profile().think_period();

        tracing::debug!(instance = %self.id, ?think_time, "instance started");

        loop {
            self.transition(InstanceState::Issuing);
            let cost = self.model.build_request(&mut self.rng);
            let issued_at = Instant::now();

            self.transition(InstanceState::AwaitingCompletion);
            let result = tokio::select! {
                _ = guard.cancelled() => {
                    tracing::debug!(instance = %self.id, "abandon in-flight request: guard shutdown");
                    self.transition(InstanceState::Stopped);
                    return;
                }
                result = self.endpoint.serve(Submission {
                    client_id: self.id.client_id,
                    cost,
                }) => result,
            };
            let completed_at = Instant::now();

            self.transition(InstanceState::Recording);
            let outcome = match &result {
                Ok(_) => Outcome::Success,
                Err(err) => {
                    tracing::trace!(
                        instance = %self.id,
                        retryable = err.is_retryable(),
                        "request failed: {err}",
                    );
                    if err.is_timeout() {
                        Outcome::Timeout
                    } else {
                        Outcome::Failure
                    }
                }
            };
            self.aggregator.record_completed(RequestRecord {
                client_id: self.id.client_id,
                instance: self.id.index,
                issued_at: self.clock.offset(issued_at),
                completed_at: self.clock.offset(completed_at),
                request_mb: cost.request_mb,
                response_mb: cost.response_mb,
                outcome,
            });
            self.transition(InstanceState::Idle);

            if think_time.is_zero() {
                tokio::select! {
                    _ = guard.cancelled() => break,
                    _ = tokio::task::yield_now() => (),
                }
            } else {
                tokio::select! {
                    _ = guard.cancelled() => break,
                    _ = tokio::time::sleep(think_time) => (),
                }
            }
        }

        tracing::debug!(instance = %self.id, "exit instance: guard shutdown");
        self.transition(InstanceState::Stopped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine_transitions() {
        use InstanceState::*;

        let cycle = [Idle, Issuing, AwaitingCompletion, Recording, Idle];
        for pair in cycle.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{pair:?}");
        }

        for state in [Idle, Issuing, AwaitingCompletion, Recording] {
            assert!(state.can_transition_to(Stopped));
        }

        assert!(!Idle.can_transition_to(Recording));
        assert!(!AwaitingCompletion.can_transition_to(Issuing));
        assert!(!Stopped.can_transition_to(Idle));
        assert!(!Stopped.can_transition_to(Stopped));
    }

    #[test]
    fn test_active_slot_counts() {
        let active = ActiveInstances::default();
        let a = active.enter();
        let b = active.enter();
        assert_eq!(active.get(), 2);
        drop(a);
        assert_eq!(active.get(), 1);
        drop(b);
        assert_eq!(active.get(), 0);
    }
}
