//! Typed correlation token carried through the OAuth redirect.
//!
//! The platform echoes the `state` query parameter back on the
//! callback; it encodes which community and role the flow targets as
//! `link_{community}_{role}`. Parsing validates the field count before
//! either value is used.

use common::{CommunityId, RoleId};
use thiserror::Error;

const PREFIX: &str = "link_";

/// Errors from parsing a correlation token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkTokenError {
    /// The token does not start with the expected prefix.
    #[error("correlation token missing the 'link_' prefix")]
    MissingPrefix,

    /// The token has the wrong number of fields.
    #[error("correlation token has {found} fields, expected 2")]
    FieldCount { found: usize },

    /// A field is not a numeric identifier.
    #[error("correlation token field is not a numeric id: {0}")]
    BadField(String),
}

/// Correlation between an OAuth callback and its target community/role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkToken {
    pub community_id: CommunityId,
    pub role_id: RoleId,
}

impl LinkToken {
    /// Creates a token for the given community and role.
    pub fn new(community_id: CommunityId, role_id: RoleId) -> Self {
        Self {
            community_id,
            role_id,
        }
    }

    /// Parses a `state` value of the form `link_{community}_{role}`.
    pub fn parse(raw: &str) -> Result<Self, LinkTokenError> {
        let rest = raw.strip_prefix(PREFIX).ok_or(LinkTokenError::MissingPrefix)?;

        let fields: Vec<&str> = rest.split('_').collect();
        if fields.len() != 2 {
            return Err(LinkTokenError::FieldCount {
                found: fields.len(),
            });
        }

        let community_id = fields[0]
            .parse()
            .map_err(|_| LinkTokenError::BadField(fields[0].to_string()))?;
        let role_id = fields[1]
            .parse()
            .map_err(|_| LinkTokenError::BadField(fields[1].to_string()))?;

        Ok(Self {
            community_id,
            role_id,
        })
    }
}

impl std::fmt::Display for LinkToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{PREFIX}{}_{}", self.community_id, self.role_id)
    }
}
