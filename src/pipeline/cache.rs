use std::collections::HashMap;

use super::resolver::ResolutionOutcome;

/// Memoized resolution outcomes keyed by normalized URL, scoped to one run.
///
/// Failed resolutions are cached like successful ones and never retried.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<String, ResolutionOutcome>,
    hits: u64,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key, counting the hit when present
    pub fn get(&mut self, key: &str) -> Option<&ResolutionOutcome> {
        let found = self.entries.get(key);
        if found.is_some() {
            self.hits += 1;
        }
        found
    }

    pub fn insert(&mut self, key: String, outcome: ResolutionOutcome) {
        self.entries.insert(key, outcome);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }
}
