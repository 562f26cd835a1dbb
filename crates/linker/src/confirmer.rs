//! Membership confirmation against an eventually-consistent platform.

use std::time::Duration;

use common::{Clock, CommunityId, SubjectId};

use crate::remote::PlatformClient;

/// Maximum membership-visibility polls per link flow.
pub const POLL_ATTEMPTS: u32 = 5;

/// Fixed delay between polls.
const POLL_DELAY: Duration = Duration::from_secs(2);

/// Polls the membership endpoint until a just-added member becomes
/// visible.
///
/// A "not found" answer is propagation lag, not an error; any other
/// failure during polling is logged and also treated as a retry
/// condition. Exhausting the budget answers `false` — the caller must
/// treat that as "flow failed", never as "flow errored".
#[derive(Debug, Clone)]
pub struct MembershipConfirmer<C> {
    clock: C,
}

impl<C: Clock> MembershipConfirmer<C> {
    /// Creates a confirmer over the given clock.
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Returns true as soon as the membership is visible, false once
    /// the attempt budget is exhausted.
    pub async fn confirm<G: PlatformClient>(
        &self,
        gateway: &G,
        community: CommunityId,
        subject: SubjectId,
    ) -> bool {
        for attempt in 1..=POLL_ATTEMPTS {
            match gateway.fetch_member(community, subject).await {
                Ok(Some(member)) => {
                    tracing::info!(
                        %subject,
                        %community,
                        display_name = %member.display_name,
                        attempt,
                        "membership confirmed"
                    );
                    return true;
                }
                Ok(None) => {
                    tracing::debug!(
                        %subject,
                        %community,
                        attempt,
                        "membership not yet visible"
                    );
                }
                Err(e) => {
                    tracing::warn!(%subject, %community, attempt, error = %e, "membership poll failed");
                }
            }
            if attempt < POLL_ATTEMPTS {
                self.clock.sleep(POLL_DELAY).await;
            }
        }
        tracing::warn!(%subject, %community, "membership never became visible");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::test_support::{FakePlatform, member};
    use common::ManualClock;
    use gateway::GatewayError;

    fn ids() -> (CommunityId, SubjectId) {
        (CommunityId::new(10), SubjectId::new(20))
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let platform = FakePlatform::new();
        platform.script_poll(Ok(None));
        platform.script_poll(Ok(Some(member(20, "mume"))));
        let clock = ManualClock::new();
        let confirmer = MembershipConfirmer::new(clock.clone());
        let (community, subject) = ids();

        assert!(confirmer.confirm(&platform, community, subject).await);
        assert_eq!(platform.poll_count(), 2);
        assert_eq!(clock.recorded(), vec![Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn exhaustion_returns_false_without_error() {
        let platform = FakePlatform::new();
        // Unscripted polls answer "not visible".
        let clock = ManualClock::new();
        let confirmer = MembershipConfirmer::new(clock.clone());
        let (community, subject) = ids();

        assert!(!confirmer.confirm(&platform, community, subject).await);
        assert_eq!(platform.poll_count(), POLL_ATTEMPTS);
        // No sleep after the final attempt.
        assert_eq!(clock.sleep_count(), POLL_ATTEMPTS as usize - 1);
        assert!(clock.recorded().iter().all(|d| *d == Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn poll_errors_are_retry_conditions() {
        let platform = FakePlatform::new();
        platform.script_poll(Err(GatewayError::Transport("reset".to_string())));
        platform.script_poll(Err(GatewayError::RemoteRejected {
            status: 500,
            body: String::new(),
        }));
        platform.script_poll(Ok(Some(member(20, "mume"))));
        let confirmer = MembershipConfirmer::new(ManualClock::new());
        let (community, subject) = ids();

        assert!(confirmer.confirm(&platform, community, subject).await);
        assert_eq!(platform.poll_count(), 3);
    }
}
