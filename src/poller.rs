//! Poll-until-converged with bounded exponential backoff.
//!
//! The control plane applies changes asynchronously, so a successful
//! mutation is confirmed by re-probing until a predicate holds. The number
//! of probes is bounded by the policy: at most `max_attempts + 1` probes and
//! `max_attempts` sleeps, with delay `base_delay * 2^k` before probe `k + 1`.

use std::time::Duration;
use tracing::{debug, warn};

use crate::adapter::StateProbe;
use crate::error::{ConfigError, Result};
use crate::model::{ClusterContext, DesiredState, Member, ObservedState, Payload, ResourceRef};
use crate::planner::ActionPlan;
use crate::reconciler::{ConvergenceResult, ConvergenceStatus};

/// Bounded exponential backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a retry policy.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `max_attempts` or `base_delay` is
    /// zero. There is no unbounded policy.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(ConfigError::invalid_policy("max_attempts must be positive").into());
        }
        if base_delay.is_zero() {
            return Err(ConfigError::invalid_policy("base_delay must be positive").into());
        }

        Ok(Self {
            max_attempts,
            base_delay,
        })
    }

    /// Policy for control plane objects that settle quickly: repositories,
    /// quotas, IAM principals, secrets and packages.
    #[must_use]
    pub const fn fast() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }

    /// Policy for scheduled workloads: apps, pods and groups.
    #[must_use]
    pub const fn workload() -> Self {
        Self {
            max_attempts: 6,
            base_delay: Duration::from_secs(1),
        }
    }

    /// Returns the maximum number of backoff rounds.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the delay before the first re-probe.
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Returns the delay slept after attempt `attempt` (zero-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2_u32.saturating_pow(attempt))
    }

    /// Returns the total time spent sleeping when every attempt is used.
    #[must_use]
    pub fn ceiling(&self) -> Duration {
        (0..self.max_attempts).fold(Duration::ZERO, |total, attempt| {
            total.saturating_add(self.delay_for(attempt))
        })
    }

    /// Returns this policy with the given fields replaced.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an override is zero.
    pub fn with_overrides(
        self,
        max_attempts: Option<u32>,
        base_delay: Option<Duration>,
    ) -> Result<Self> {
        Self::new(
            max_attempts.unwrap_or(self.max_attempts),
            base_delay.unwrap_or(self.base_delay),
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fast()
    }
}

/// Re-probes a resource until it matches its desired state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvergencePoller {
    policy: RetryPolicy,
}

impl ConvergencePoller {
    /// Creates a poller with the given policy.
    #[must_use]
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Probes `resource` until `predicate(observed, desired)` holds.
    ///
    /// The returned result carries the last observed state, the number of
    /// backoff rounds spent and a status of `Converged` or `TimedOut`. It
    /// reports `changed: false` and an empty plan; the reconciler fills
    /// those in.
    ///
    /// # Errors
    ///
    /// Returns the probe's error immediately. Unreachable is never
    /// retried.
    pub async fn await_state<P, M, S, F>(
        &self,
        probe: &S,
        ctx: &ClusterContext,
        resource: &ResourceRef,
        desired: &DesiredState<P, M>,
        predicate: F,
    ) -> Result<ConvergenceResult<P, M>>
    where
        P: Payload,
        M: Member,
        S: StateProbe<P, M> + ?Sized,
        F: Fn(&ObservedState<P, M>, &DesiredState<P, M>) -> bool,
    {
        let mut attempts = 0;

        loop {
            let observed = probe.observe(ctx, resource).await?;

            if predicate(&observed, desired) {
                debug!("{resource} converged after {attempts} backoff round(s)");
                return Ok(Self::finish(resource, observed, attempts, ConvergenceStatus::Converged));
            }

            if attempts >= self.policy.max_attempts {
                warn!(
                    "{resource} still {} after {attempts} attempt(s), giving up",
                    observed.label()
                );
                return Ok(Self::finish(resource, observed, attempts, ConvergenceStatus::TimedOut));
            }

            let delay = self.policy.delay_for(attempts);
            debug!(
                "{resource} is {}, re-probing in {}ms",
                observed.label(),
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
            attempts += 1;
        }
    }

    fn finish<P, M>(
        resource: &ResourceRef,
        final_state: ObservedState<P, M>,
        attempts: u32,
        status: ConvergenceStatus,
    ) -> ConvergenceResult<P, M> {
        ConvergenceResult {
            resource: resource.clone(),
            changed: false,
            plan: ActionPlan::noop(),
            final_state,
            attempts,
            status,
        }
    }
}
