//! OAuth entry and callback pages.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Html;
use common::{Clock, CommunityId, RoleId};
use gateway::platform::{AUTHORIZE_URL, OAUTH_SCOPES};
use linker::{LinkToken, PlatformClient};
use serde::Deserialize;

use crate::AppState;
use crate::error::{ApiError, page};

#[derive(Debug, Deserialize)]
pub struct AuthParams {
    pub community_id: Option<String>,
    pub role_id: Option<String>,
    pub role_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /auth — renders the page that sends the subject to the
/// platform's authorize endpoint with a typed state token.
pub async fn auth_page<G, C>(
    State(state): State<Arc<AppState<G, C>>>,
    Query(params): Query<AuthParams>,
) -> Result<Html<String>, ApiError>
where
    G: PlatformClient + 'static,
    C: Clock + 'static,
{
    let community_id: CommunityId = parse_id(params.community_id.as_deref(), "community_id")?;
    let role_id: RoleId = parse_id(params.role_id.as_deref(), "role_id")?;
    let role_name = params.role_name.unwrap_or_else(|| "member".to_string());

    let token = LinkToken::new(community_id, role_id);
    let authorize_url = format!(
        "{AUTHORIZE_URL}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
        urlencoding::encode(&state.client_id),
        urlencoding::encode(&state.redirect_uri),
        urlencoding::encode(OAUTH_SCOPES),
        urlencoding::encode(&token.to_string()),
    );

    Ok(Html(format!(
        "<!DOCTYPE html><html><head><title>Link your account</title></head>\
         <body><h1>Link your account</h1>\
         <p>Authorize to join the community and receive the <b>{role_name}</b> role.</p>\
         <p><a href=\"{authorize_url}\">Continue to authorization</a></p>\
         </body></html>"
    )))
}

/// GET /callback — receives the authorization code and drives the full
/// link pipeline, rendering a distinct page per outcome.
pub async fn callback<G, C>(
    State(state): State<Arc<AppState<G, C>>>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<String>, ApiError>
where
    G: PlatformClient + 'static,
    C: Clock + 'static,
{
    if let Some(error) = params.error {
        return Err(ApiError::BadRequest(format!(
            "authorization was declined: {error}"
        )));
    }
    let code = params
        .code
        .ok_or_else(|| ApiError::BadRequest("missing code parameter".to_string()))?;
    let raw_state = params
        .state
        .ok_or_else(|| ApiError::BadRequest("missing state parameter".to_string()))?;
    let token = LinkToken::parse(&raw_state)
        .map_err(|e| ApiError::BadRequest(format!("bad state token: {e}")))?;

    let outcome = state.pipeline.link(&code, &token).await?;

    if outcome.role_granted {
        Ok(page(
            "All set!",
            &format!(
                "Welcome, {}! You joined the community and your role was granted.",
                outcome.username
            ),
        ))
    } else {
        Ok(page(
            "Almost there",
            &format!(
                "Welcome, {}! You joined the community, but the role could not \
                 be granted yet. An admin can assign it manually.",
                outcome.username
            ),
        ))
    }
}

fn parse_id<T: std::str::FromStr>(raw: Option<&str>, name: &str) -> Result<T, ApiError> {
    raw.ok_or_else(|| ApiError::BadRequest(format!("missing {name} parameter")))?
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("{name} must be a numeric id")))
}
