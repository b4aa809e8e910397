//! Insertion-order ledger for counter-keyed rows.
//!
//! Removing a key leaves a hole instead of shifting the tail. The head skips
//! holes eagerly, but skipped holes still count: once `max_holes` holes sit
//! in storage (before or after the head) the ledger is rebuilt.

use rustc_hash::FxHashMap;

use crate::slot::Key;

#[derive(Debug, Clone)]
pub struct FifoLedger {
    keys: Vec<Option<Key>>,
    index: FxHashMap<Key, usize>,
    head: usize,
    holes: usize,
    max_holes: usize,
}

impl FifoLedger {
    pub fn new(max_holes: usize) -> Self {
        Self {
            keys: Vec::new(),
            index: FxHashMap::default(),
            head: 0,
            holes: 0,
            max_holes: max_holes.max(1),
        }
    }

    pub fn push(&mut self, key: Key) {
        if self.index.contains_key(&key) {
            return;
        }
        self.index.insert(key.clone(), self.keys.len());
        self.keys.push(Some(key));
    }

    /// Oldest key still present.
    pub fn oldest(&self) -> Option<&Key> {
        self.keys.get(self.head)?.as_ref()
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let Some(pos) = self.index.remove(key) else {
            return false;
        };
        self.keys[pos] = None;
        self.holes += 1;

        if pos == self.head {
            while self.head < self.keys.len() && self.keys[self.head].is_none() {
                self.head += 1;
            }
            if self.head >= self.keys.len() {
                self.reset();
                return true;
            }
        }

        if self.holes >= self.max_holes {
            self.compact();
        }
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn clear(&mut self) {
        self.reset();
    }

    /// Keys from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Key> {
        self.keys[self.head..].iter().flatten()
    }

    /// Holes currently held in storage, including those behind the head.
    pub fn holes(&self) -> usize {
        self.holes
    }

    /// Slots in the backing storage, live or not.
    pub fn stored(&self) -> usize {
        self.keys.len()
    }

    fn reset(&mut self) {
        self.keys.clear();
        self.index.clear();
        self.head = 0;
        self.holes = 0;
    }

    fn compact(&mut self) {
        let live: Vec<Key> = self.keys.drain(self.head..).flatten().collect();
        self.reset();
        for key in live {
            self.push(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(ledger: &FifoLedger) -> Vec<&str> {
        ledger.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_oldest_follows_insertion_order() {
        let mut f = FifoLedger::new(100);
        f.push("a".into());
        f.push("b".into());
        f.push("c".into());
        assert_eq!(f.oldest().map(String::as_str), Some("a"));

        f.remove("a");
        assert_eq!(f.oldest().map(String::as_str), Some("b"));
        assert_eq!(f.len(), 2);
    }

    #[test]
    fn test_middle_removal_leaves_hole_until_head_passes() {
        let mut f = FifoLedger::new(100);
        for k in ["a", "b", "c"] {
            f.push(k.into());
        }
        f.remove("b");
        assert_eq!(f.holes(), 1);
        assert_eq!(keys(&f), vec!["a", "c"]);

        f.remove("a");
        assert_eq!(f.holes(), 2, "skipped holes still count");
        assert_eq!(f.oldest().map(String::as_str), Some("c"));
        assert_eq!(keys(&f), vec!["c"]);
    }

    #[test]
    fn test_steady_eviction_at_head_stays_bounded() {
        let mut f = FifoLedger::new(100);
        for i in 0..3 {
            f.push(i.to_string());
        }
        for i in 3..10_000 {
            f.push(i.to_string());
            let oldest = f.oldest().cloned().unwrap();
            f.remove(&oldest);
            assert!(f.stored() <= 100 + 4, "storage grew to {}", f.stored());
        }
        assert_eq!(f.len(), 3);
        assert_eq!(keys(&f), vec!["9997", "9998", "9999"]);
    }

    #[test]
    fn test_draining_resets() {
        let mut f = FifoLedger::new(100);
        f.push("a".into());
        f.remove("a");
        assert!(f.is_empty());
        assert!(f.oldest().is_none());
        assert!(!f.remove("a"));
    }

    #[test]
    fn test_compaction_keeps_order() {
        let mut f = FifoLedger::new(2);
        for k in ["a", "b", "c", "d", "e"] {
            f.push(k.into());
        }
        f.remove("b");
        f.remove("d");
        assert_eq!(f.holes(), 0, "compacted at threshold");
        assert_eq!(keys(&f), vec!["a", "c", "e"]);
        assert_eq!(f.oldest().map(String::as_str), Some("a"));
    }
}
