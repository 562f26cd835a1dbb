//! Identity-link pipeline: authorization code in, role-bearing
//! confirmed community member out.
//!
//! The pipeline drives five steps against the rate-limited platform
//! API:
//! 1. Exchange the authorization code for an access token
//! 2. Identify the subject owning the token
//! 3. Add the subject to the target community
//! 4. Confirm the membership is actually visible (eventual consistency)
//! 5. Grant the configured role
//!
//! Role granting and the authenticated-subjects index are gated on the
//! confirmation step: the platform can report a successful add before
//! the membership is visible to subsequent calls, and granting a role
//! to an unconfirmed membership is forbidden.

pub mod confirmer;
pub mod correlation;
pub mod error;
pub mod pipeline;
pub mod remote;
pub mod store;

pub use confirmer::MembershipConfirmer;
pub use correlation::{LinkToken, LinkTokenError};
pub use error::LinkError;
pub use pipeline::{IdentityLinkPipeline, LinkOutcome};
pub use remote::PlatformClient;
pub use store::{AccessGrant, LinkerStore};
