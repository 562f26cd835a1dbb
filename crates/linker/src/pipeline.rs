//! The identity-link pipeline.

use chrono::Utc;
use common::Clock;

use crate::confirmer::MembershipConfirmer;
use crate::correlation::LinkToken;
use crate::error::LinkError;
use crate::remote::PlatformClient;
use crate::store::{AccessGrant, LinkerStore};

/// Result of a completed link flow.
///
/// `role_granted` can be false on an otherwise successful link: the
/// subject is a confirmed, recorded member but the role call was
/// refused. Callers surface that as a partial outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    pub subject_id: common::SubjectId,
    pub username: String,
    pub role_granted: bool,
}

/// Drives an authorization code through exchange, identification,
/// membership add, visibility confirmation, and role grant.
pub struct IdentityLinkPipeline<G, C> {
    gateway: G,
    confirmer: MembershipConfirmer<C>,
    store: LinkerStore,
}

impl<G: PlatformClient, C: Clock> IdentityLinkPipeline<G, C> {
    /// Creates a pipeline over the given gateway, clock, and store.
    pub fn new(gateway: G, clock: C, store: LinkerStore) -> Self {
        Self {
            gateway,
            confirmer: MembershipConfirmer::new(clock),
            store,
        }
    }

    /// Returns the store holding grants and the authenticated index.
    pub fn store(&self) -> &LinkerStore {
        &self.store
    }

    /// Runs the whole flow for one authorization code.
    ///
    /// An added-but-unconfirmed membership is an overall failure, not a
    /// partial success: nothing is recorded and no role is granted.
    #[tracing::instrument(skip(self, code), fields(community = %token.community_id, role = %token.role_id))]
    pub async fn link(&self, code: &str, token: &LinkToken) -> Result<LinkOutcome, LinkError> {
        metrics::counter!("link_flows_total").increment(1);

        let exchanged = self
            .gateway
            .exchange_code(code)
            .await
            .map_err(|e| LinkError::TokenExchangeFailed(e.to_string()))?;
        let access_token = exchanged.access_token;

        let profile = self
            .gateway
            .identify(&access_token)
            .await
            .map_err(|e| LinkError::IdentityLookupFailed(e.to_string()))?;
        tracing::info!(subject = %profile.id, username = %profile.username, "subject identified");

        self.store.record_grant(AccessGrant {
            community_id: token.community_id,
            subject_id: profile.id,
            token: access_token.clone(),
            obtained_at: Utc::now(),
        });

        let added = self
            .gateway
            .add_member(&access_token, profile.id, token.community_id)
            .await?;
        if !added {
            metrics::counter!("link_flows_refused").increment(1);
            return Err(LinkError::JoinRefused);
        }

        let confirmed = self
            .confirmer
            .confirm(&self.gateway, token.community_id, profile.id)
            .await;
        if !confirmed {
            metrics::counter!("link_flows_unconfirmed").increment(1);
            return Err(LinkError::MembershipUnconfirmed);
        }

        self.store
            .record_authenticated(token.community_id, profile.id);

        let role_granted = match self
            .gateway
            .grant_role(profile.id, token.community_id, token.role_id)
            .await
        {
            Ok(granted) => granted,
            Err(e) => {
                tracing::warn!(error = %e, "role grant gave up mid-flow");
                false
            }
        };

        metrics::counter!("link_flows_completed").increment(1);
        Ok(LinkOutcome {
            subject_id: profile.id,
            username: profile.username,
            role_granted,
        })
    }
}
