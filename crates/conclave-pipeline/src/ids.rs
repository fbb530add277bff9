//! Opaque id newtypes so a `ProposalId` can't be confused with a model
//! name or a `DesignId` at the type level, even though both are just
//! strings on the wire.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

const PROPOSAL_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const PROPOSAL_ID_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DesignId(pub String);

impl DesignId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for DesignId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DesignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DesignId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A 12-character opaque token, unique within a design (not globally).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProposalId(pub String);

impl ProposalId {
    /// Generates a fresh random 12-character token. Uniqueness within a
    /// design is the caller's responsibility (collision probability is
    /// negligible at round-level fan-out widths but not formally excluded).
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        let token: String = (0..PROPOSAL_ID_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..PROPOSAL_ID_ALPHABET.len());
                PROPOSAL_ID_ALPHABET[idx] as char
            })
            .collect();
        Self(token)
    }
}

impl Default for ProposalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProposalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
