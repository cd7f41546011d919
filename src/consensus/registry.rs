//! Trusted-identity registry (spec.md §3 "Ownership summary", §5 "Shared
//! resources"): the read-mostly set of identity public keys the Verifier
//! chooses to serve. Policy-dependent; an empty registry means "serve
//! anyone who presents a well-formed chain."

use std::collections::HashSet;

use parking_lot::RwLock;

use crate::core::types::IdentityKey;

/// Process-global, concurrently-readable set of trusted identities.
/// Reads (the common case: "is this identity allowed?") never block on
/// each other; mutation is rare (onboarding/offboarding an identity).
pub struct TrustedRegistry {
    trusted: RwLock<HashSet<IdentityKey>>,
    /// When `true`, `is_trusted` accepts any identity regardless of the
    /// set's contents, effectively disabling the allow-list.
    open: bool,
}

impl TrustedRegistry {
    /// An allow-list registry: only identities explicitly added are served.
    pub fn allow_list() -> Self {
        Self {
            trusted: RwLock::new(HashSet::new()),
            open: false,
        }
    }

    /// An open registry: every well-formed identity is served.
    pub fn open() -> Self {
        Self {
            trusted: RwLock::new(HashSet::new()),
            open: true,
        }
    }

    pub fn is_trusted(&self, identity: &IdentityKey) -> bool {
        self.open || self.trusted.read().contains(identity)
    }

    pub fn add(&self, identity: IdentityKey) {
        self.trusted.write().insert(identity);
    }

    pub fn remove(&self, identity: &IdentityKey) -> bool {
        self.trusted.write().remove(identity)
    }

    pub fn len(&self) -> usize {
        self.trusted.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trusted.read().is_empty()
    }
}
