//! Rate-limited REST client for the chat platform API.
//!
//! The platform enforces aggressive rate limits, so every outbound call
//! goes through [`RestClient`], which owns the retry/backoff budget:
//! 429 responses back off linearly, transport failures retry after a
//! flat delay, and anything else is handled according to the caller's
//! [`RetryPolicy`]. [`PlatformApi`] layers the typed endpoints (token
//! exchange, identity lookup, add-member, member fetch, role grant) on
//! top without re-implementing any retry logic.

pub mod client;
pub mod error;
pub mod platform;

pub use client::{
    ApiRequest, ApiResponse, Auth, HttpTransport, Method, Payload, ReqwestTransport, RestClient,
    RetryPolicy, ScriptedTransport,
};
pub use error::GatewayError;
pub use platform::{MemberView, PlatformApi, ServiceCredentials, SubjectProfile, TokenResponse};
