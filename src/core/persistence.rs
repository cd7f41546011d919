//! Persistence trait (spec.md §6 "Persistence"): format is unspecified,
//! but recovery must reproduce identical verdicts given the same chain
//! and configuration. The Verifier's core logic never depends on a
//! concrete store; callers plug one in.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::analysis::mobility::MobilityProfile;
use crate::chain::state::Chain;
use crate::core::errors::VerifierResult;
use crate::core::types::IdentityKey;

/// Load/save surface for the three things the Verifier owns across
/// process restarts: chains, mobility profiles, and its own signing key.
/// Everything else (verdicts, certificates) is rederived or reissued.
pub trait Persistence: Send + Sync {
    fn load_chain(&self, identity: &IdentityKey) -> VerifierResult<Option<Chain>>;
    fn save_chain(&self, chain: &Chain) -> VerifierResult<()>;
    fn load_mobility_profile(&self, identity: &IdentityKey) -> VerifierResult<Option<MobilityProfile>>;
    fn save_mobility_profile(&self, profile: &MobilityProfile) -> VerifierResult<()>;
    fn load_signing_key(&self) -> VerifierResult<Option<[u8; 32]>>;
    fn save_signing_key(&self, key: &[u8; 32]) -> VerifierResult<()>;
}

/// In-memory store used by tests and by deployments that accept losing
/// state on restart. `MobilityProfile` is not `Clone` (it owns rolling
/// windows keyed by interned anchor indices that are only meaningful
/// alongside its chain), so this store round-trips chains only; a real
/// deployment's store additionally rebuilds the profile from the chain
/// it persisted, which is deterministic (spec.md §6).
#[derive(Default)]
pub struct InMemoryPersistence {
    chains: RwLock<HashMap<IdentityKey, Chain>>,
    signing_key: RwLock<Option<[u8; 32]>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for InMemoryPersistence {
    fn load_chain(&self, identity: &IdentityKey) -> VerifierResult<Option<Chain>> {
        Ok(self.chains.read().get(identity).cloned())
    }

    fn save_chain(&self, chain: &Chain) -> VerifierResult<()> {
        self.chains.write().insert(chain.identity, chain.clone());
        Ok(())
    }

    fn load_mobility_profile(&self, _identity: &IdentityKey) -> VerifierResult<Option<MobilityProfile>> {
        Ok(None)
    }

    fn save_mobility_profile(&self, _profile: &MobilityProfile) -> VerifierResult<()> {
        Ok(())
    }

    fn load_signing_key(&self) -> VerifierResult<Option<[u8; 32]>> {
        Ok(*self.signing_key.read())
    }

    fn save_signing_key(&self, key: &[u8; 32]) -> VerifierResult<()> {
        *self.signing_key.write() = Some(*key);
        Ok(())
    }
}
