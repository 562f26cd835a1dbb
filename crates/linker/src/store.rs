//! Process-lifetime link state: access grants and the
//! authenticated-subjects index.
//!
//! State here lives exactly as long as the process; a restart loses all
//! linked-identity history. That is an accepted limitation, not a bug.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use common::{CommunityId, SubjectId};

/// An access token obtained for a subject, scoped to the community the
/// link flow targeted. Never mutated; a newer grant for the same
/// subject supersedes the old one.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub community_id: CommunityId,
    pub subject_id: SubjectId,
    pub token: String,
    pub obtained_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LinkerState {
    /// community → subjects that passed membership confirmation there.
    authenticated: HashMap<CommunityId, HashSet<SubjectId>>,
    /// subject → most recent access grant.
    grants: HashMap<SubjectId, AccessGrant>,
}

/// Keyed owner of all link-flow state, replacing ambient module-level
/// dictionaries with explicit lifecycle: entries appear on first use
/// and are torn down when the agent leaves a community.
#[derive(Debug, Clone, Default)]
pub struct LinkerStore {
    state: Arc<RwLock<LinkerState>>,
}

impl LinkerStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records (or supersedes) the access grant for a subject.
    pub fn record_grant(&self, grant: AccessGrant) {
        let mut state = self.state.write().unwrap();
        state.grants.insert(grant.subject_id, grant);
    }

    /// Returns the current grant for a subject, if any.
    pub fn grant_for(&self, subject: SubjectId) -> Option<AccessGrant> {
        self.state.read().unwrap().grants.get(&subject).cloned()
    }

    /// Records a subject as authenticated for a community.
    ///
    /// Callers must only do this after a successful membership
    /// confirmation poll for the pair.
    pub fn record_authenticated(&self, community: CommunityId, subject: SubjectId) {
        let mut state = self.state.write().unwrap();
        state.authenticated.entry(community).or_default().insert(subject);
    }

    /// Returns true if the subject passed confirmation for the community.
    pub fn is_authenticated(&self, community: CommunityId, subject: SubjectId) -> bool {
        self.state
            .read()
            .unwrap()
            .authenticated
            .get(&community)
            .is_some_and(|subjects| subjects.contains(&subject))
    }

    /// Returns the confirmed subjects for a community.
    pub fn subjects_for(&self, community: CommunityId) -> Vec<SubjectId> {
        self.state
            .read()
            .unwrap()
            .authenticated
            .get(&community)
            .map(|subjects| subjects.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Tears down everything recorded for a community.
    ///
    /// Grants are subject-scoped, not community-scoped, so they stay.
    pub fn remove_community(&self, community: CommunityId) {
        let mut state = self.state.write().unwrap();
        state.authenticated.remove(&community);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(subject: u64, token: &str) -> AccessGrant {
        AccessGrant {
            community_id: CommunityId::new(1),
            subject_id: SubjectId::new(subject),
            token: token.to_string(),
            obtained_at: Utc::now(),
        }
    }

    #[test]
    fn newer_grant_supersedes() {
        let store = LinkerStore::new();
        store.record_grant(grant(5, "old"));
        store.record_grant(grant(5, "new"));

        assert_eq!(store.grant_for(SubjectId::new(5)).unwrap().token, "new");
    }

    #[test]
    fn authentication_is_per_community() {
        let store = LinkerStore::new();
        let a = CommunityId::new(1);
        let b = CommunityId::new(2);
        let subject = SubjectId::new(9);

        store.record_authenticated(a, subject);

        assert!(store.is_authenticated(a, subject));
        assert!(!store.is_authenticated(b, subject));
        assert_eq!(store.subjects_for(a), vec![subject]);
        assert!(store.subjects_for(b).is_empty());
    }

    #[test]
    fn recording_twice_is_idempotent() {
        let store = LinkerStore::new();
        let community = CommunityId::new(1);
        let subject = SubjectId::new(9);

        store.record_authenticated(community, subject);
        store.record_authenticated(community, subject);

        assert_eq!(store.subjects_for(community).len(), 1);
    }

    #[test]
    fn remove_community_clears_index_but_keeps_grants() {
        let store = LinkerStore::new();
        let community = CommunityId::new(1);
        let subject = SubjectId::new(9);
        store.record_grant(grant(9, "tok"));
        store.record_authenticated(community, subject);

        store.remove_community(community);

        assert!(!store.is_authenticated(community, subject));
        assert!(store.grant_for(subject).is_some());
    }
}
