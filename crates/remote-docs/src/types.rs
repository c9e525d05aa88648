//! Type definitions for lock service responses.
//!
//! These map to the JSON bodies returned by the `lock` and `lockinfo`
//! endpoints. They are point-in-time snapshots: nothing here stays valid
//! after the call that produced it.

use serde::{Deserialize, Serialize};

/// Lock lease timeout as reported by the server.
///
/// Servers report either a number of seconds or a WebDAV style string such
/// as `"Second-3600"` / `"Infinite"`; both are accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum LockTimeout {
    /// Lease length in seconds.
    Seconds(u64),
    /// Free-form timeout string.
    Text(String),
}

impl LockTimeout {
    /// Returns the lease length in seconds, if one can be determined.
    pub fn as_secs(&self) -> Option<u64> {
        match self {
            LockTimeout::Seconds(s) => Some(*s),
            LockTimeout::Text(text) => {
                let text = text.trim();
                text.strip_prefix("Second-")
                    .unwrap_or(text)
                    .parse()
                    .ok()
            }
        }
    }
}

/// Successful response of `POST lock`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockGrant {
    /// Opaque lock token, exactly as sent by the server.
    pub token: String,
    /// Owner recorded by the server for this lock.
    #[serde(default)]
    pub owner: String,
    /// Lease timeout, if the server reports one.
    #[serde(default)]
    pub timeout: Option<LockTimeout>,
}

/// Response of `GET lockinfo`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockInfo {
    /// Whether any lock is currently held on the path.
    pub locked: bool,
    /// Holder of the lock, when locked.
    #[serde(default)]
    pub owner: Option<String>,
    /// Current lock token, when the server discloses it.
    #[serde(default)]
    pub token: Option<String>,
}

impl LockInfo {
    /// Snapshot for an unlocked path.
    pub fn unlocked() -> Self {
        Self::default()
    }

    /// Returns `true` if the lock is held and its owner equals `owner`.
    pub fn is_held_by(&self, owner: &str) -> bool {
        self.locked && self.owner.as_deref() == Some(owner)
    }
}

/// Body of `POST unlock` and of the unlock beacon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnlockRequest {
    /// Token being released.
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_grant_accepts_numeric_timeout() {
        let grant: LockGrant =
            serde_json::from_str(r#"{"token":"t1","owner":"alice","timeout":3600}"#)
                .expect("valid grant");
        assert_eq!(grant.timeout, Some(LockTimeout::Seconds(3600)));
        assert_eq!(grant.timeout.and_then(|t| t.as_secs()), Some(3600));
    }

    #[test]
    fn lock_grant_accepts_webdav_timeout() {
        let grant: LockGrant =
            serde_json::from_str(r#"{"token":"t1","owner":"alice","timeout":"Second-600"}"#)
                .expect("valid grant");
        assert_eq!(grant.timeout.and_then(|t| t.as_secs()), Some(600));
    }

    #[test]
    fn infinite_timeout_has_no_seconds() {
        assert_eq!(LockTimeout::Text("Infinite".into()).as_secs(), None);
    }

    #[test]
    fn lock_grant_missing_optional_fields() {
        let grant: LockGrant = serde_json::from_str(r#"{"token":"t1"}"#).expect("valid grant");
        assert_eq!(grant.owner, "");
        assert!(grant.timeout.is_none());
    }

    #[test]
    fn lock_info_unlocked_body() {
        let info: LockInfo = serde_json::from_str(r#"{"locked":false,"owner":null,"token":null}"#)
            .expect("valid info");
        assert_eq!(info, LockInfo::unlocked());
        assert!(!info.is_held_by("alice"));
    }

    #[test]
    fn lock_info_is_held_by_owner() {
        let info = LockInfo {
            locked: true,
            owner: Some("alice".into()),
            token: Some("t".into()),
        };
        assert!(info.is_held_by("alice"));
        assert!(!info.is_held_by("bob"));
    }
}
