//! Credential data model: one record per identity with every secret observed
//! for it, plus the identity decomposition helper and the key/value storage
//! projection of a record.
//!
//! Records are keyed by their full `identity` within the `engine` accumulator;
//! use [`split_identity`] to get at the local-part and domain independently.
use serde::{Deserialize, Serialize};

/// A parsed identity together with all secrets seen for it, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(rename = "username")]
    pub local_part: String,
    pub domain: String,
    #[serde(rename = "email")]
    pub identity: String,
    #[serde(rename = "password", default)]
    pub secrets: Vec<String>,
}

impl CredentialRecord {
    /// Build a record from an identity and its first secret. Returns `None`
    /// when the identity does not decompose into a non-empty local-part and
    /// domain.
    pub fn new(identity: &str, secret: &str) -> Option<Self> {
        let (local_part, domain) = split_identity(identity)?;
        if local_part.is_empty() || domain.is_empty() {
            return None;
        }
        Some(Self {
            local_part: local_part.to_string(),
            domain: domain.to_string(),
            identity: identity.to_string(),
            secrets: vec![secret.to_string()],
        })
    }

    pub fn push_secret(&mut self, secret: &str) {
        self.secrets.push(secret.to_string());
    }
}

impl std::fmt::Display for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{:?}", self.identity, self.secrets)
    }
}

/// Split an identity at its first `@` into `(local_part, domain)`.
///
/// Returns `None` for an empty identity or one without `@`. Either half may
/// still be empty (`"@example.com"`), callers decide whether that is usable.
pub fn split_identity(identity: &str) -> Option<(&str, &str)> {
    if identity.is_empty() {
        return None;
    }
    identity.split_once('@')
}

/// Composite-key item handed to a key/value store: partition key is the
/// domain, sort key the local-part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageItem {
    pub domainname: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub password: Vec<String>,
}

impl StorageItem {
    /// `(partition key, sort key)` attribute names.
    pub const KEY_SCHEMA: (&'static str, &'static str) = ("domainname", "username");
}

impl From<&CredentialRecord> for StorageItem {
    fn from(r: &CredentialRecord) -> Self {
        Self {
            domainname: r.domain.clone(),
            username: r.local_part.clone(),
            email: r.identity.clone(),
            password: r.secrets.clone(),
        }
    }
}

impl From<StorageItem> for CredentialRecord {
    fn from(item: StorageItem) -> Self {
        Self {
            local_part: item.username,
            domain: item.domainname,
            identity: item.email,
            secrets: item.password,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_identity_uses_first_at() {
        assert_eq!(split_identity("a@b.com"), Some(("a", "b.com")));
        assert_eq!(split_identity("a@b@c"), Some(("a", "b@c")));
        assert_eq!(split_identity("@b.com"), Some(("", "b.com")));
        assert_eq!(split_identity("no-at-sign"), None);
        assert_eq!(split_identity(""), None);
    }

    #[test]
    fn new_rejects_empty_halves() {
        assert!(CredentialRecord::new("@b.com", "pw").is_none());
        assert!(CredentialRecord::new("a@", "pw").is_none());
        let r = CredentialRecord::new("name Withspace@test-domain.com", "pw").unwrap();
        assert_eq!(r.local_part, "name Withspace");
        assert_eq!(r.domain, "test-domain.com");
        assert_eq!(r.secrets, vec!["pw"]);
    }

    #[test]
    fn storage_item_projects_keys() {
        let mut r = CredentialRecord::new("alice@corp.io", "one").unwrap();
        r.push_secret("two");
        let item = StorageItem::from(&r);
        assert_eq!(item.domainname, "corp.io");
        assert_eq!(item.username, "alice");
        assert_eq!(item.email, "alice@corp.io");
        assert_eq!(item.password, vec!["one", "two"]);
        assert_eq!(CredentialRecord::from(item), r);
    }

    #[test]
    fn record_serializes_with_wire_names() {
        let r = CredentialRecord::new("bob@x.org", "s3cret").unwrap();
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(
            json,
            r#"{"username":"bob","domain":"x.org","email":"bob@x.org","password":["s3cret"]}"#
        );
    }
}
