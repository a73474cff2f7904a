//! In-memory vote storage.
use ahash::RandomState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::tally::Ballot;

/// A resolved user identity, derived from a verified credential.
///
/// Identities live only as long as the process; nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub id: String,
    pub display_name: String,
}

impl Voter {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Map of voter id -> current ballot.
///
/// At most one entry per id: a later vote from the same id overwrites the
/// earlier one, no history is kept. Entries are cleared only by process
/// restart; there is no delete operation.
#[derive(Debug, Default)]
pub struct VoteStore {
    entries: HashMap<String, Ballot, RandomState>,
}

impl VoteStore {
    pub fn new() -> Self {
        Self {
            entries: HashMap::with_hasher(RandomState::new()),
        }
    }

    /// Record a ballot for a voter, unconditionally replacing any prior one.
    /// Callers validate identity and ballot before reaching this point.
    pub fn record(&mut self, voter_id: impl Into<String>, ballot: Ballot) {
        self.entries.insert(voter_id.into(), ballot);
    }

    /// Current (yes, no) counts, recomputed by walking the entries.
    pub fn counts(&self) -> (u64, u64) {
        let mut yes = 0;
        let mut no = 0;
        for ballot in self.entries.values() {
            match ballot {
                Ballot::Yes => yes += 1,
                Ballot::No => no += 1,
            }
        }
        (yes, no)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
