//! Link pipeline error types.

use gateway::GatewayError;
use thiserror::Error;

/// Terminal failures of the identity-link flow.
///
/// Each variant produces a distinguishable operator-facing message so a
/// "remote rejected" can be told apart from a "not yet confirmed".
#[derive(Debug, Error)]
pub enum LinkError {
    /// The token endpoint refused or failed the exchange.
    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// The identity endpoint refused or failed the lookup.
    #[error("identity lookup failed: {0}")]
    IdentityLookupFailed(String),

    /// The community definitively refused to add the subject.
    #[error("the community refused to add the subject")]
    JoinRefused,

    /// The add call reported success but the membership never became
    /// visible within the polling budget.
    #[error("membership was reported added but never became visible")]
    MembershipUnconfirmed,

    /// Rate-limit or transport budget exhausted mid-flow.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Convenience type alias for link results.
pub type Result<T> = std::result::Result<T, LinkError>;
