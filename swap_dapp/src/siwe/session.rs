use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use error_stack::report;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DappResult, Error};

/// Who a session signed in as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiweIdentity {
    pub address: String,
    pub chain_id: u64,
}

#[derive(Debug, Clone)]
struct SessionEntry {
    nonce: Option<String>,
    identity: Option<SiweIdentity>,
    expires_at: DateTime<Utc>,
}

/// In-memory sign-in sessions keyed by the `siwe_session` cookie value.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, SessionEntry>,
    ttl: chrono::Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    fn expiry(&self) -> DateTime<Utc> {
        Utc::now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn live_entry(&self, session_id: &str) -> Option<SessionEntry> {
        let entry = self.sessions.get(session_id)?.clone();
        if entry.expires_at <= Utc::now() {
            self.sessions.remove(session_id);
            return None;
        }
        Some(entry)
    }

    /// Issues a fresh nonce, reusing `session_id` when it is still live.
    /// Returns `(session_id, nonce)`.
    pub fn issue_nonce(&self, session_id: Option<&str>) -> (String, String) {
        let session_id = session_id
            .filter(|id| self.live_entry(id).is_some())
            .map(ToString::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let nonce = Uuid::new_v4().simple().to_string();

        self.sessions.insert(
            session_id.clone(),
            SessionEntry {
                nonce: Some(nonce.clone()),
                identity: None,
                expires_at: self.expiry(),
            },
        );
        debug!("Issued sign-in nonce for session {session_id}");
        (session_id, nonce)
    }

    pub fn nonce(&self, session_id: &str) -> Option<String> {
        self.live_entry(session_id)?.nonce
    }

    /// Stores the verified identity and consumes the nonce, provided it is
    /// still the one the message was signed over.
    pub fn complete_sign_in(
        &self,
        session_id: &str,
        nonce: &str,
        identity: SiweIdentity,
    ) -> DappResult<()> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| report!(Error::SessionError("Unknown session".to_string())))?;
        match entry.nonce.as_deref() {
            None => {
                return Err(report!(Error::SessionError(
                    "Nonce already used".to_string()
                )));
            }
            Some(pending) if pending != nonce => {
                return Err(report!(Error::SessionError(
                    "Nonce was reissued".to_string()
                )));
            }
            Some(_) => {}
        }
        entry.nonce = None;
        entry.identity = Some(identity);
        Ok(())
    }

    pub fn identity(&self, session_id: &str) -> Option<SiweIdentity> {
        self.live_entry(session_id)?.identity
    }

    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.expires_at > now);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> SiweIdentity {
        SiweIdentity {
            address: "0x9ecdc9af2a8254dde8bbce8778efae695044cc9f".to_string(),
            chain_id: 137,
        }
    }

    #[test]
    fn test_nonce_is_alphanumeric() {
        let store = SessionStore::new(Duration::from_secs(60));
        let (_, nonce) = store.issue_nonce(None);
        assert!(nonce.len() >= 8);
        assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_sign_in_consumes_nonce() {
        let store = SessionStore::new(Duration::from_secs(60));
        let (session_id, nonce) = store.issue_nonce(None);
        assert_eq!(store.nonce(&session_id), Some(nonce.clone()));
        assert!(store.identity(&session_id).is_none());

        store.complete_sign_in(&session_id, &nonce, identity()).unwrap();
        assert_eq!(store.identity(&session_id), Some(identity()));
        assert!(store.nonce(&session_id).is_none());
        assert!(store.complete_sign_in(&session_id, &nonce, identity()).is_err());
    }

    #[test]
    fn test_reissued_nonce_is_not_consumed() {
        let store = SessionStore::new(Duration::from_secs(60));
        let (session_id, signed) = store.issue_nonce(None);
        let (_, reissued) = store.issue_nonce(Some(&session_id));

        let err = store
            .complete_sign_in(&session_id, &signed, identity())
            .unwrap_err();
        assert!(matches!(err.current_context(), Error::SessionError(_)));
        assert!(store.identity(&session_id).is_none());
        assert_eq!(store.nonce(&session_id), Some(reissued));
    }

    #[test]
    fn test_reissue_keeps_live_session() {
        let store = SessionStore::new(Duration::from_secs(60));
        let (session_id, first) = store.issue_nonce(None);
        let (same_id, second) = store.issue_nonce(Some(&session_id));
        assert_eq!(session_id, same_id);
        assert_ne!(first, second);

        let (new_id, _) = store.issue_nonce(Some("unknown"));
        assert_ne!(new_id, "unknown");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_expired_sessions() {
        let store = SessionStore::new(Duration::ZERO);
        let (session_id, _) = store.issue_nonce(None);
        assert!(store.nonce(&session_id).is_none());
        assert!(store.is_empty());

        store.issue_nonce(None);
        assert_eq!(store.purge_expired(), 1);
    }

    #[test]
    fn test_remove() {
        let store = SessionStore::new(Duration::from_secs(60));
        let (session_id, _) = store.issue_nonce(None);
        assert!(store.remove(&session_id));
        assert!(!store.remove(&session_id));
        assert!(store.identity(&session_id).is_none());
    }
}
