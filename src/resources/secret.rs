//! Secrets.
//!
//! Secret values never reach logs or reports: the payload's `Debug` output
//! shows a fingerprint instead of the value.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{PayloadHasher, SecretDecl};
use crate::model::{DesiredState, NoMembers, ResourceKind, ResourceRef, ResourceState};

use super::KindSpec;

/// Secret kind.
#[derive(Debug, Clone, Copy)]
pub struct Secret;

/// The stored value of a secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretValue {
    /// Secret value.
    pub value: String,
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hasher = PayloadHasher::new();
        f.debug_tuple("SecretValue")
            .field(&format_args!(
                "sha256:{}",
                hasher.short_hash(&hasher.hash_bytes(self.value.as_bytes()))
            ))
            .finish()
    }
}

/// Returns the identifier of a secret: its store and path.
#[must_use]
pub fn secret_id(store: &str, path: &str) -> String {
    format!("{store}/{}", path.trim_matches('/'))
}

impl KindSpec for Secret {
    type Payload = SecretValue;
    type Member = NoMembers;
    type Decl = SecretDecl;

    const KIND: ResourceKind = ResourceKind::Secret;

    fn resource_ref(decl: &SecretDecl) -> ResourceRef {
        ResourceRef::new(Self::KIND, secret_id(&decl.store, &decl.path))
    }

    fn desired(decl: &SecretDecl) -> DesiredState<SecretValue, NoMembers> {
        if decl.state.is_present() {
            ResourceState::Present(SecretValue {
                value: decl.value.clone().unwrap_or_default(),
            })
        } else {
            ResourceState::Absent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Presence;

    fn decl(path: &str, value: Option<&str>) -> SecretDecl {
        SecretDecl {
            path: path.to_string(),
            store: "default".to_string(),
            value: value.map(ToString::to_string),
            state: Presence::Present,
        }
    }

    #[test]
    fn test_debug_never_shows_value() {
        let value = SecretValue {
            value: "hunter2".to_string(),
        };
        let debug = format!("{value:?}");

        assert!(!debug.contains("hunter2"));
        assert!(debug.starts_with("SecretValue(sha256:"));
    }

    #[test]
    fn test_resource_ref_includes_store() {
        assert_eq!(
            Secret::resource_ref(&decl("/db/password", None)).to_string(),
            "secret:default/db/password"
        );
    }

    #[test]
    fn test_missing_value_is_empty() {
        let desired = Secret::desired(&decl("db", None));
        assert_eq!(desired.payload().map(|secret| secret.value.as_str()), Some(""));
    }

    #[test]
    fn test_value_change_is_detected() {
        let old = SecretValue {
            value: "a".to_string(),
        };
        let new = SecretValue {
            value: "b".to_string(),
        };
        assert!(!Secret::payload_eq(&new, &old));
    }
}
