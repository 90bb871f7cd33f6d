//! Finding deduplication keyed by `(url, method)`
//!
//! Keeps the highest-severity variant; on equal severity the first
//! observation wins.

use crate::models::Finding;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct Deduplicator {
    seen: Mutex<HashMap<String, Finding>>,
}

fn dedup_key(f: &Finding) -> String {
    format!("{}|{}", f.url, f.method)
}

impl Deduplicator {
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Records a finding. Returns true when it was inserted or replaced a
    /// lower-severity duplicate; false when a duplicate of equal or higher
    /// severity already exists.
    pub fn add(&self, f: &Finding) -> bool {
        let mut seen = self.seen.lock().unwrap();
        let key = dedup_key(f);
        match seen.get(&key) {
            None => {
                seen.insert(key, f.clone());
                true
            }
            Some(existing) if f.severity.rank() > existing.severity.rank() => {
                seen.insert(key, f.clone());
                true
            }
            Some(_) => false,
        }
    }

    /// Snapshot of the current deduplicated findings.
    pub fn results(&self) -> Vec<Finding> {
        self.seen.lock().unwrap().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new()
    }
}
