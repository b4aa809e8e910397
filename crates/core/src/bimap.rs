//! Bidirectional one-to-one map.
//!
//! Both sides are unique at all times. Writing a pair whose left or right
//! side is already taken resolves the collision instead of failing:
//! - both sides taken by different pairs: the two pairs swap partners
//! - only one side taken: the stale pair is dropped and replaced
//!
//! The swap rule is what lets a run of rows shift one slot at a time while
//! the map stays a bijection after every single step.

use std::hash::Hash;

use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub struct BiMap<A, B> {
    forward: FxHashMap<A, B>,
    reverse: FxHashMap<B, A>,
}

impl<A, B> Default for BiMap<A, B> {
    fn default() -> Self {
        Self {
            forward: FxHashMap::default(),
            reverse: FxHashMap::default(),
        }
    }
}

impl<A, B> BiMap<A, B>
where
    A: Eq + Hash + Clone,
    B: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `a` with `b`, resolving collisions as described in the module docs.
    pub fn insert(&mut self, a: A, b: B) {
        let orig_b = self.forward.get(&a).cloned();
        let orig_a = self.reverse.get(&b).cloned();

        match (orig_b, orig_a) {
            (Some(orig_b), _) if orig_b == b => {}
            (Some(orig_b), Some(orig_a)) => {
                // Swap: orig_a inherits a's old partner.
                self.forward.insert(orig_a.clone(), orig_b.clone());
                self.reverse.insert(orig_b, orig_a);
                self.forward.insert(a.clone(), b.clone());
                self.reverse.insert(b, a);
            }
            (Some(orig_b), None) => {
                self.reverse.remove(&orig_b);
                self.forward.insert(a.clone(), b.clone());
                self.reverse.insert(b, a);
            }
            (None, Some(orig_a)) => {
                self.forward.remove(&orig_a);
                self.forward.insert(a.clone(), b.clone());
                self.reverse.insert(b, a);
            }
            (None, None) => {
                self.forward.insert(a.clone(), b.clone());
                self.reverse.insert(b, a);
            }
        }
    }

    /// Remove by left side, returning the right side it was paired with.
    pub fn remove(&mut self, a: &A) -> Option<B> {
        let b = self.forward.remove(a)?;
        self.reverse.remove(&b);
        Some(b)
    }

    /// Remove by right side, returning the left side it was paired with.
    pub fn remove_reverse(&mut self, b: &B) -> Option<A> {
        let a = self.reverse.remove(b)?;
        self.forward.remove(&a);
        Some(a)
    }

    pub fn get(&self, a: &A) -> Option<&B> {
        self.forward.get(a)
    }

    pub fn get_reverse(&self, b: &B) -> Option<&A> {
        self.reverse.get(b)
    }

    pub fn contains(&self, a: &A) -> bool {
        self.forward.contains_key(a)
    }

    pub fn contains_reverse(&self, b: &B) -> bool {
        self.reverse.contains_key(b)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&A, &B)> {
        self.forward.iter()
    }

    pub fn iter_reverse(&self) -> impl Iterator<Item = (&B, &A)> {
        self.reverse.iter()
    }

    /// Debug check used by tests: both directions describe the same pairs.
    pub fn is_consistent(&self) -> bool {
        self.forward.len() == self.reverse.len()
            && self
                .forward
                .iter()
                .all(|(a, b)| self.reverse.get(b) == Some(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup_both_ways() {
        let mut map = BiMap::new();
        map.insert("a", 1);
        map.insert("b", 2);

        assert_eq!(map.get(&"a"), Some(&1));
        assert_eq!(map.get_reverse(&2), Some(&"b"));
        assert_eq!(map.len(), 2);
        assert!(map.is_consistent());
    }

    #[test]
    fn test_insert_same_pair_is_noop() {
        let mut map = BiMap::new();
        map.insert("a", 1);
        map.insert("a", 1);
        assert_eq!(map.len(), 1);
        assert!(map.is_consistent());
    }

    #[test]
    fn test_collision_on_both_sides_swaps() {
        let mut map = BiMap::new();
        map.insert("a", 1);
        map.insert("b", 2);

        // "a" wants 2, which "b" holds: "b" takes "a"'s old slot.
        map.insert("a", 2);

        assert_eq!(map.get(&"a"), Some(&2));
        assert_eq!(map.get(&"b"), Some(&1));
        assert_eq!(map.get_reverse(&1), Some(&"b"));
        assert!(map.is_consistent());
    }

    #[test]
    fn test_move_to_free_value_replaces() {
        let mut map = BiMap::new();
        map.insert("a", 1);
        map.insert("a", 3);

        assert_eq!(map.get(&"a"), Some(&3));
        assert!(!map.contains_reverse(&1));
        assert!(map.is_consistent());
    }

    #[test]
    fn test_new_key_on_taken_value_evicts_holder() {
        let mut map = BiMap::new();
        map.insert("a", 1);
        map.insert("z", 1);

        assert_eq!(map.get_reverse(&1), Some(&"z"));
        assert!(!map.contains(&"a"));
        assert_eq!(map.len(), 1);
        assert!(map.is_consistent());
    }

    #[test]
    fn test_remove_both_directions() {
        let mut map = BiMap::new();
        map.insert("a", 1);
        map.insert("b", 2);

        assert_eq!(map.remove(&"a"), Some(1));
        assert_eq!(map.remove_reverse(&2), Some("b"));
        assert_eq!(map.remove(&"missing"), None);
        assert!(map.is_empty());
        assert!(map.is_consistent());
    }

    #[test]
    fn test_shift_run_stays_bijective() {
        // Simulates rows 1..=3 shifting down by one slot, bottom first.
        let mut map = BiMap::new();
        map.insert("r1", 1usize);
        map.insert("r2", 2);
        map.insert("r3", 3);

        for slot in (1..=3).rev() {
            let key = *map.get_reverse(&slot).unwrap();
            map.insert(key, slot + 1);
            assert!(map.is_consistent());
        }

        assert_eq!(map.get(&"r1"), Some(&2));
        assert_eq!(map.get(&"r3"), Some(&4));
        assert!(!map.contains_reverse(&1));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn arbitrary_writes_keep_bijection(ops in proptest::collection::vec((0u8..8, 0u8..8, prop::bool::ANY), 0..64)) {
                let mut map = BiMap::new();
                for (a, b, remove) in ops {
                    if remove {
                        map.remove(&a);
                    } else {
                        map.insert(a, b);
                        prop_assert_eq!(map.get(&a), Some(&b));
                    }
                    prop_assert!(map.is_consistent());
                }
            }
        }
    }
}
