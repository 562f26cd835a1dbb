//! Seam between the pipeline and the platform REST surface.

use async_trait::async_trait;
use common::{Clock, CommunityId, RoleId, SubjectId};
use gateway::{GatewayError, HttpTransport, MemberView, PlatformApi, SubjectProfile, TokenResponse};

/// The platform operations the link flow depends on.
///
/// Implemented by [`gateway::PlatformApi`] in production and by a
/// scripted fake in tests.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Exchanges an authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, GatewayError>;

    /// Fetches the identity of the subject owning `token`.
    async fn identify(&self, token: &str) -> Result<SubjectProfile, GatewayError>;

    /// Adds a subject to a community; `Ok(false)` is a definitive refusal.
    async fn add_member(
        &self,
        token: &str,
        subject: SubjectId,
        community: CommunityId,
    ) -> Result<bool, GatewayError>;

    /// Looks up a membership; `None` means not (yet) visible.
    async fn fetch_member(
        &self,
        community: CommunityId,
        subject: SubjectId,
    ) -> Result<Option<MemberView>, GatewayError>;

    /// Grants a role; success is exactly the platform's 204 answer.
    async fn grant_role(
        &self,
        subject: SubjectId,
        community: CommunityId,
        role: RoleId,
    ) -> Result<bool, GatewayError>;
}

#[async_trait]
impl<T, C> PlatformClient for PlatformApi<T, C>
where
    T: HttpTransport,
    C: Clock,
{
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, GatewayError> {
        PlatformApi::exchange_code(self, code).await
    }

    async fn identify(&self, token: &str) -> Result<SubjectProfile, GatewayError> {
        PlatformApi::identify(self, token).await
    }

    async fn add_member(
        &self,
        token: &str,
        subject: SubjectId,
        community: CommunityId,
    ) -> Result<bool, GatewayError> {
        PlatformApi::add_member(self, token, subject, community).await
    }

    async fn fetch_member(
        &self,
        community: CommunityId,
        subject: SubjectId,
    ) -> Result<Option<MemberView>, GatewayError> {
        PlatformApi::fetch_member(self, community, subject).await
    }

    async fn grant_role(
        &self,
        subject: SubjectId,
        community: CommunityId,
        role: RoleId,
    ) -> Result<bool, GatewayError> {
        PlatformApi::grant_role(self, subject, community, role).await
    }
}
