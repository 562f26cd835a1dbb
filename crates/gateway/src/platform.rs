//! Typed endpoints of the chat platform REST API.

use common::{Clock, CommunityId, RoleId, SubjectId};
use serde::Deserialize;

use crate::client::{ApiRequest, Auth, HttpTransport, Method, RestClient, RetryPolicy};
use crate::error::GatewayError;

/// Base URL of the platform REST API.
pub const API_BASE: &str = "https://discord.com/api";

/// URL of the platform's user-facing authorization page.
pub const AUTHORIZE_URL: &str = "https://discord.com/api/oauth2/authorize";

/// OAuth scopes required for linking: identity plus join capability.
pub const OAUTH_SCOPES: &str = "identify guilds.join";

/// Credentials identifying this service to the platform.
#[derive(Debug, Clone)]
pub struct ServiceCredentials {
    /// Service credential used for `Authorization: Bot` calls.
    pub bot_token: String,
    /// OAuth client identifier.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Redirect URI registered for the OAuth application.
    pub redirect_uri: String,
}

/// Successful token exchange payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// Identity of a subject as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectProfile {
    pub id: SubjectId,
    pub username: String,
}

/// A community member as reported by the membership endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberView {
    pub subject_id: SubjectId,
    pub display_name: String,
}

#[derive(Deserialize)]
struct UserWire {
    id: String,
    username: String,
}

#[derive(Deserialize)]
struct MemberWire {
    user: UserWire,
    nick: Option<String>,
}

impl UserWire {
    fn subject_id(&self) -> Result<SubjectId, GatewayError> {
        self.id
            .parse::<u64>()
            .map(SubjectId::new)
            .map_err(|_| GatewayError::Payload(format!("non-numeric subject id: {}", self.id)))
    }
}

/// Typed wrapper over [`RestClient`] for the endpoints the link and
/// vending workflows need. Holds the service credentials; subject
/// tokens are passed per call.
#[derive(Debug, Clone)]
pub struct PlatformApi<T, C> {
    client: RestClient<T, C>,
    credentials: ServiceCredentials,
    /// Retry-policy knob for the add-member call: when set, only
    /// 5xx-class unrecognized statuses are retried.
    retry_server_errors_only: bool,
}

impl<T: HttpTransport, C: Clock> PlatformApi<T, C> {
    /// Creates a platform API wrapper with the default (lenient)
    /// add-member retry policy.
    pub fn new(transport: T, clock: C, credentials: ServiceCredentials) -> Self {
        Self {
            client: RestClient::new(transport, clock),
            credentials,
            retry_server_errors_only: false,
        }
    }

    /// Restricts add-member retries to 5xx statuses.
    pub fn with_server_errors_only(mut self) -> Self {
        self.retry_server_errors_only = true;
        self
    }

    /// Exchanges an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, GatewayError> {
        let request = ApiRequest::new(Method::Post, format!("{API_BASE}/oauth2/token")).form(vec![
            ("client_id".to_string(), self.credentials.client_id.clone()),
            (
                "client_secret".to_string(),
                self.credentials.client_secret.clone(),
            ),
            ("grant_type".to_string(), "authorization_code".to_string()),
            ("code".to_string(), code.to_string()),
            (
                "redirect_uri".to_string(),
                self.credentials.redirect_uri.clone(),
            ),
        ]);

        let response = self.client.call(&request, RetryPolicy::Terminal).await?;
        response.decode()
    }

    /// Fetches the identity of the subject owning `token`.
    pub async fn identify(&self, token: &str) -> Result<SubjectProfile, GatewayError> {
        let request = ApiRequest::new(Method::Get, format!("{API_BASE}/users/@me"))
            .auth(Auth::Bearer(token.to_string()));

        let response = self.client.call(&request, RetryPolicy::Terminal).await?;
        let wire: UserWire = response.decode()?;
        Ok(SubjectProfile {
            id: wire.subject_id()?,
            username: wire.username,
        })
    }

    /// Adds a subject to a community using the subject's own token as
    /// payload.
    ///
    /// Interprets the platform's answers: 201 means newly added,
    /// 200/204 mean already a member (all success); 400/403 are
    /// definitive refusals. Reports the outcome as a flag rather than
    /// an error for refusals — only rate-limit or transport exhaustion
    /// raises.
    pub async fn add_member(
        &self,
        token: &str,
        subject: SubjectId,
        community: CommunityId,
    ) -> Result<bool, GatewayError> {
        let request = ApiRequest::new(
            Method::Put,
            format!("{API_BASE}/guilds/{community}/members/{subject}"),
        )
        .auth(Auth::Bot(self.credentials.bot_token.clone()))
        .json(&serde_json::json!({ "access_token": token }));

        let policy = RetryPolicy::RetryUnrecognized {
            server_errors_only: self.retry_server_errors_only,
        };
        let response = self.client.call(&request, policy).await?;

        match response.status {
            201 => {
                tracing::info!(%subject, %community, "subject newly added to community");
                Ok(true)
            }
            200 | 204 => {
                tracing::info!(%subject, %community, "subject was already a member");
                Ok(true)
            }
            400 | 403 => {
                tracing::warn!(
                    %subject,
                    %community,
                    status = response.status,
                    body = %response.body,
                    "community refused the add-member request"
                );
                Ok(false)
            }
            other => {
                tracing::warn!(
                    %subject,
                    %community,
                    status = other,
                    body = %response.body,
                    "add-member failed after retries"
                );
                Ok(false)
            }
        }
    }

    /// Looks up a community member, answering `None` when the platform
    /// does not (yet) see the membership.
    pub async fn fetch_member(
        &self,
        community: CommunityId,
        subject: SubjectId,
    ) -> Result<Option<MemberView>, GatewayError> {
        let request = ApiRequest::new(
            Method::Get,
            format!("{API_BASE}/guilds/{community}/members/{subject}"),
        )
        .auth(Auth::Bot(self.credentials.bot_token.clone()));

        match self.client.call(&request, RetryPolicy::Terminal).await {
            Ok(response) => {
                let wire: MemberWire = response.decode()?;
                let subject_id = wire.user.subject_id()?;
                let display_name = wire.nick.unwrap_or(wire.user.username);
                Ok(Some(MemberView {
                    subject_id,
                    display_name,
                }))
            }
            Err(GatewayError::RemoteRejected { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Grants a role to a community member. Success is exactly 204.
    ///
    /// A rejection is reported as `Ok(false)`; only rate-limit or
    /// transport exhaustion raises.
    pub async fn grant_role(
        &self,
        subject: SubjectId,
        community: CommunityId,
        role: RoleId,
    ) -> Result<bool, GatewayError> {
        let request = ApiRequest::new(
            Method::Put,
            format!("{API_BASE}/guilds/{community}/members/{subject}/roles/{role}"),
        )
        .auth(Auth::Bot(self.credentials.bot_token.clone()));

        match self.client.call(&request, RetryPolicy::Terminal).await {
            Ok(response) if response.status == 204 => {
                tracing::info!(%subject, %community, %role, "role granted");
                Ok(true)
            }
            Ok(response) => {
                tracing::warn!(status = response.status, "unexpected role-grant status");
                Ok(false)
            }
            Err(GatewayError::RemoteRejected { status, body }) => {
                tracing::warn!(status, %body, "role grant rejected");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Payload, ScriptedTransport};
    use common::ManualClock;

    fn api(transport: &ScriptedTransport) -> PlatformApi<ScriptedTransport, ManualClock> {
        PlatformApi::new(
            transport.clone(),
            ManualClock::new(),
            ServiceCredentials {
                bot_token: "bot-secret".to_string(),
                client_id: "client-id".to_string(),
                client_secret: "client-secret".to_string(),
                redirect_uri: "https://example.invalid/callback".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn exchange_code_posts_form_and_decodes_token() {
        let transport = ScriptedTransport::new();
        transport.push_response(200, r#"{"access_token":"tok-123"}"#);
        let api = api(&transport);

        let token = api.exchange_code("auth-code").await.unwrap();

        assert_eq!(token.access_token, "tok-123");
        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::Post);
        assert!(request.url.ends_with("/oauth2/token"));
        match &request.payload {
            Payload::Form(fields) => {
                assert!(fields.contains(&("code".to_string(), "auth-code".to_string())));
                assert!(
                    fields.contains(&("grant_type".to_string(), "authorization_code".to_string()))
                );
            }
            other => panic!("expected form payload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn exchange_code_surfaces_rejection() {
        let transport = ScriptedTransport::new();
        transport.push_response(400, r#"{"error":"invalid_grant"}"#);
        let api = api(&transport);

        let err = api.exchange_code("bad-code").await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::RemoteRejected { status: 400, .. }
        ));
    }

    #[tokio::test]
    async fn identify_uses_bearer_auth_and_parses_subject() {
        let transport = ScriptedTransport::new();
        transport.push_response(200, r#"{"id":"42","username":"mume"}"#);
        let api = api(&transport);

        let profile = api.identify("tok").await.unwrap();

        assert_eq!(profile.id, SubjectId::new(42));
        assert_eq!(profile.username, "mume");
        assert_eq!(
            transport.requests()[0].auth,
            Auth::Bearer("tok".to_string())
        );
    }

    #[tokio::test]
    async fn identify_rejects_non_numeric_id() {
        let transport = ScriptedTransport::new();
        transport.push_response(200, r#"{"id":"abc","username":"mume"}"#);
        let api = api(&transport);

        let err = api.identify("tok").await.unwrap_err();
        assert!(matches!(err, GatewayError::Payload(_)));
    }

    #[tokio::test]
    async fn add_member_success_statuses() {
        for status in [201, 200, 204] {
            let transport = ScriptedTransport::new();
            transport.push_response(status, "");
            let api = api(&transport);

            let added = api
                .add_member("tok", SubjectId::new(1), CommunityId::new(2))
                .await
                .unwrap();
            assert!(added, "status {status} should be success");
        }
    }

    #[tokio::test]
    async fn add_member_refusal_is_flag_not_error() {
        let transport = ScriptedTransport::new();
        transport.push_response(403, "missing access");
        let api = api(&transport);

        let added = api
            .add_member("tok", SubjectId::new(1), CommunityId::new(2))
            .await
            .unwrap();

        assert!(!added);
        // Definitive refusal: exactly one attempt.
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn add_member_uses_bot_auth_with_subject_token_payload() {
        let transport = ScriptedTransport::new();
        transport.push_response(201, "");
        let api = api(&transport);

        api.add_member("subject-tok", SubjectId::new(5), CommunityId::new(9))
            .await
            .unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.auth, Auth::Bot("bot-secret".to_string()));
        assert!(request.url.ends_with("/guilds/9/members/5"));
        match &request.payload {
            Payload::Json(body) => assert!(body.contains("subject-tok")),
            other => panic!("expected json payload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_member_maps_404_to_none() {
        let transport = ScriptedTransport::new();
        transport.push_response(404, r#"{"message":"Unknown Member"}"#);
        let api = api(&transport);

        let member = api
            .fetch_member(CommunityId::new(1), SubjectId::new(2))
            .await
            .unwrap();

        assert!(member.is_none());
    }

    #[tokio::test]
    async fn fetch_member_prefers_nick_over_username() {
        let transport = ScriptedTransport::new();
        transport.push_response(200, r#"{"user":{"id":"7","username":"mume"},"nick":"Mume!"}"#);
        let api = api(&transport);

        let member = api
            .fetch_member(CommunityId::new(1), SubjectId::new(7))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(member.subject_id, SubjectId::new(7));
        assert_eq!(member.display_name, "Mume!");
    }

    #[tokio::test]
    async fn grant_role_success_is_exactly_204() {
        let transport = ScriptedTransport::new();
        transport.push_response(204, "");
        let api = api(&transport);

        let granted = api
            .grant_role(SubjectId::new(1), CommunityId::new(2), RoleId::new(3))
            .await
            .unwrap();

        assert!(granted);
        assert!(transport.requests()[0].url.ends_with("/guilds/2/members/1/roles/3"));
    }

    #[tokio::test]
    async fn grant_role_rejection_reports_false() {
        let transport = ScriptedTransport::new();
        transport.push_response(403, "missing permission");
        let api = api(&transport);

        let granted = api
            .grant_role(SubjectId::new(1), CommunityId::new(2), RoleId::new(3))
            .await
            .unwrap();

        assert!(!granted);
    }
}
