//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use gateway::GatewayError;
use linker::LinkError;

/// API-level error type that maps to human-readable HTML responses.
///
/// Every terminal failure in the link flow gets its own page so an
/// operator can tell a remote rejection from a confirmation timeout
/// from a refused join.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or missing request parameters.
    BadRequest(String),
    /// The link pipeline failed.
    Link(LinkError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, title, detail) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad request", msg),
            ApiError::Link(err) => link_error_to_response(err),
        };

        tracing::warn!(%status, title, "request failed");
        (status, page(title, &detail)).into_response()
    }
}

fn link_error_to_response(err: LinkError) -> (StatusCode, &'static str, String) {
    match &err {
        LinkError::TokenExchangeFailed(_) => (
            StatusCode::BAD_GATEWAY,
            "Authorization could not be verified",
            err.to_string(),
        ),
        LinkError::IdentityLookupFailed(_) => (
            StatusCode::BAD_GATEWAY,
            "Your account could not be identified",
            err.to_string(),
        ),
        LinkError::JoinRefused => (
            StatusCode::FORBIDDEN,
            "The community refused the join",
            err.to_string(),
        ),
        LinkError::MembershipUnconfirmed => (
            StatusCode::GATEWAY_TIMEOUT,
            "Membership was not confirmed in time",
            err.to_string(),
        ),
        LinkError::Gateway(GatewayError::RateLimited { .. }) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "The platform is rate limiting us",
            err.to_string(),
        ),
        LinkError::Gateway(_) => (
            StatusCode::BAD_GATEWAY,
            "The platform rejected the request",
            err.to_string(),
        ),
    }
}

/// Renders a minimal HTML page with a title and a detail line.
pub fn page(title: &str, detail: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html><html><head><title>{title}</title></head>\
         <body><h1>{title}</h1><p>{detail}</p></body></html>"
    ))
}

impl From<LinkError> for ApiError {
    fn from(err: LinkError) -> Self {
        ApiError::Link(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_statuses_per_link_failure() {
        let (refused, _, _) = link_error_to_response(LinkError::JoinRefused);
        let (unconfirmed, _, _) = link_error_to_response(LinkError::MembershipUnconfirmed);
        let (exchange, _, _) =
            link_error_to_response(LinkError::TokenExchangeFailed("invalid_grant".into()));
        let (limited, _, _) = link_error_to_response(LinkError::Gateway(
            GatewayError::RateLimited { attempts: 3 },
        ));

        assert_eq!(refused, StatusCode::FORBIDDEN);
        assert_eq!(unconfirmed, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(exchange, StatusCode::BAD_GATEWAY);
        assert_eq!(limited, StatusCode::SERVICE_UNAVAILABLE);
    }
}
