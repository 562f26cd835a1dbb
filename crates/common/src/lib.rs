//! Shared types for the guildlink workspace.
//!
//! Provides the newtype identifiers used across crates and the clock
//! abstraction that makes timed retries deterministic in tests.

pub mod clock;
pub mod types;

pub use clock::{Clock, ManualClock, TokioClock};
pub use types::{ChannelId, CommunityId, Money, OrderId, ProductId, RoleId, SubjectId};
