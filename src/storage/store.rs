//! The Store
//!
//! This module implements the shared in-memory store behind every client
//! connection: a string map, a map of expiry marks, and a map of sorted
//! sets. One instance is created at startup and shared via `Arc`.
//!
//! ## Concurrency
//!
//! All three maps live behind a single `Mutex`, and every public operation
//! takes it. GET mutates on the read path (lazy expiry evicts the entry it
//! just found stale), so a uniform exclusive lock is the one discipline
//! that covers every operation the same way.
//!
//! ## Expiry
//!
//! An expiry mark is an absolute deadline kept separately from the value.
//! A key whose mark has passed is logically gone; the eviction is realized
//! either lazily by the next GET, or by the background sweeper
//! (see [`crate::storage::expiry`]). A plain SET clears any mark on the
//! key, so a leftover deadline can never take out a newer value.
//!
//! ## Namespaces
//!
//! Strings and sorted sets are independent namespaces. The same literal
//! key may exist in both; string commands never observe sets and set
//! commands never observe strings.

use ordered_float::OrderedFloat;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A sorted set: members with floating-point scores, enumerable in
/// ascending score order with the member name as tiebreak.
#[derive(Debug, Default)]
struct SortedSet {
    /// member -> score, the authoritative mapping
    scores: HashMap<String, f64>,
    /// (score, member) pairs in enumeration order
    ordered: BTreeSet<(OrderedFloat<f64>, String)>,
}

impl SortedSet {
    /// Inserts or re-scores a member. Member names are unique; re-adding
    /// moves the member to its new position.
    fn insert(&mut self, member: String, score: f64) {
        if let Some(old) = self.scores.insert(member.clone(), score) {
            self.ordered.remove(&(OrderedFloat(old), member.clone()));
        }
        self.ordered.insert((OrderedFloat(score), member));
    }

    fn len(&self) -> usize {
        self.scores.len()
    }
}

/// Everything the mutex guards.
#[derive(Debug, Default)]
struct StoreInner {
    /// key -> string value
    strings: HashMap<String, String>,
    /// key -> absolute expiry deadline; may outlive (or predate) the value
    marks: HashMap<String, Instant>,
    /// key -> sorted set, a namespace of its own
    sets: HashMap<String, SortedSet>,
}

/// The shared in-memory store.
///
/// Designed to be wrapped in an `Arc` and handed to every connection task
/// plus the background sweeper. All operations are thread safe.
///
/// # Example
///
/// ```
/// use linekv::storage::Store;
///
/// let store = Store::new();
/// store.set("name".into(), "ferris".into());
/// assert_eq!(store.get("name"), Some("ferris".to_string()));
/// ```
#[derive(Debug, Default)]
pub struct Store {
    inner: Mutex<StoreInner>,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a string value, applying lazy expiry.
    ///
    /// If the key carries a mark whose deadline is at or before now, the
    /// entry and its mark are deleted and the lookup reports a miss.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.strings.contains_key(key) {
            return None;
        }
        if let Some(&deadline) = inner.marks.get(key) {
            if deadline <= Instant::now() {
                inner.strings.remove(key);
                inner.marks.remove(key);
                return None;
            }
        }
        inner.strings.get(key).cloned()
    }

    /// Stores a string value with no expiry, overwriting any previous
    /// value and clearing any mark left on the key.
    pub fn set(&self, key: String, value: String) {
        let mut inner = self.inner.lock().unwrap();
        inner.marks.remove(&key);
        inner.strings.insert(key, value);
    }

    /// Stores a string value and marks it to expire after `ttl`.
    ///
    /// A zero `ttl` installs an already-due mark: the value is written
    /// but the next read (or sweep) retires it. Returns `false` without
    /// writing anything when the deadline is not representable.
    pub fn set_with_ttl(&self, key: String, value: String, ttl: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(ttl) else {
            return false;
        };
        let mut inner = self.inner.lock().unwrap();
        inner.marks.insert(key.clone(), deadline);
        inner.strings.insert(key, value);
        true
    }

    /// Deletes string entries, returning how many of the given keys were
    /// present. Marks and sorted sets with the same names are untouched.
    pub fn delete_many(&self, keys: &[&str]) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        let mut deleted = 0;
        for key in keys {
            if inner.strings.remove(*key).is_some() {
                deleted += 1;
            }
        }
        deleted
    }

    /// Installs or overwrites an expiry mark, `ttl` from now.
    ///
    /// No existence check is made: a mark may be placed on a key that has
    /// no value, and the sweeper will retire it harmlessly. A zero `ttl`
    /// is a mark that is due immediately. Returns `false` without
    /// installing anything when the deadline is not representable.
    pub fn expire(&self, key: String, ttl: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(ttl) else {
            return false;
        };
        let mut inner = self.inner.lock().unwrap();
        inner.marks.insert(key, deadline);
        true
    }

    /// Returns the whole seconds remaining on a key's mark, or `None` if
    /// the key has no mark or the deadline has already passed.
    ///
    /// Never deletes anything; eviction stays with GET and the sweeper.
    pub fn ttl(&self, key: &str) -> Option<u64> {
        let inner = self.inner.lock().unwrap();
        let deadline = inner.marks.get(key)?;
        match deadline.checked_duration_since(Instant::now()) {
            Some(remaining) if !remaining.is_zero() => Some(remaining.as_secs()),
            _ => None,
        }
    }

    /// Lists string keys matching a pattern, sorted lexicographically.
    ///
    /// The pattern `*` is special-cased to match every key; anything else
    /// goes through the restricted matcher in [`super::pattern`].
    pub fn keys(&self, pattern: &str) -> Vec<String> {
        let inner = self.inner.lock().unwrap();

        let mut result: Vec<String> = if pattern == "*" {
            inner.strings.keys().cloned().collect()
        } else {
            let pattern = super::pattern::KeyPattern::new(pattern);
            inner
                .strings
                .keys()
                .filter(|key| pattern.matches(key))
                .cloned()
                .collect()
        };

        result.sort();
        result
    }

    /// Adds or re-scores members of a sorted set, creating the set on
    /// first use. All pairs are applied; score validation happens before
    /// this call, so a bad score rejects the command without touching the
    /// set. Returns the number of pairs applied.
    pub fn zadd(&self, key: &str, pairs: Vec<(f64, String)>) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let set = inner.sets.entry(key.to_string()).or_default();

        let count = pairs.len();
        for (score, member) in pairs {
            set.insert(member, score);
        }
        count
    }

    /// Returns the members of a sorted set within an inclusive index
    /// window, in ascending score order with member-name tiebreak.
    ///
    /// Negative indices address from the end (`len + idx`). After
    /// resolution, `start > end` or `start >= len` yields `None`, as does
    /// an unknown key. A start that resolves below zero behaves as zero
    /// and an end beyond the set is clamped, so the returned slice is
    /// never empty when `Some`.
    pub fn zrange(&self, key: &str, start: i64, end: i64) -> Option<Vec<(String, f64)>> {
        let inner = self.inner.lock().unwrap();
        let set = inner.sets.get(key)?;

        let len = set.len() as i64;
        let start = if start < 0 { len + start } else { start };
        let end = if end < 0 { len + end } else { end };

        if start > end || start >= len {
            return None;
        }

        let entries: Vec<(String, f64)> = set
            .ordered
            .iter()
            .enumerate()
            .filter(|(idx, _)| {
                let idx = *idx as i64;
                idx >= start && idx <= end
            })
            .map(|(_, (score, member))| (member.clone(), score.0))
            .collect();

        Some(entries)
    }

    /// Retires every mark whose deadline has passed, deleting the string
    /// entries those marks covered. Called by the background sweeper.
    ///
    /// Returns the number of string entries removed; orphaned marks are
    /// dropped without counting.
    pub fn sweep_expired(&self) -> u64 {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();

        let due: Vec<String> = inner
            .marks
            .iter()
            .filter(|(_, &deadline)| deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        let mut removed = 0;
        for key in due {
            inner.marks.remove(&key);
            if inner.strings.remove(&key).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Number of string entries currently stored (expired-but-unswept
    /// entries included).
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().strings.len()
    }

    /// Returns true if no string entries are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of expiry marks currently installed. The sweeper uses this
    /// to size its adaptive interval.
    pub fn mark_count(&self) -> usize {
        self.inner.lock().unwrap().marks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let store = Store::new();
        store.set("key".into(), "value".into());
        assert_eq!(store.get("key"), Some("value".to_string()));
    }

    #[test]
    fn get_nonexistent() {
        let store = Store::new();
        assert_eq!(store.get("nonexistent"), None);
    }

    #[test]
    fn set_overwrites() {
        let store = Store::new();
        store.set("key".into(), "one".into());
        store.set("key".into(), "two".into());
        assert_eq!(store.get("key"), Some("two".to_string()));
    }

    #[test]
    fn delete_counts_only_present_keys() {
        let store = Store::new();
        store.set("a".into(), "1".into());
        store.set("b".into(), "2".into());

        assert_eq!(store.delete_many(&["a", "b", "missing"]), 2);
        // A second pass finds nothing left
        assert_eq!(store.delete_many(&["a", "b"]), 0);
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn lazy_expiry_on_get() {
        let store = Store::new();
        store.set_with_ttl("key".into(), "value".into(), Duration::from_millis(20));

        assert_eq!(store.get("key"), Some("value".to_string()));
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(store.get("key"), None);
        // The mark went with the entry
        assert_eq!(store.mark_count(), 0);
    }

    #[test]
    fn plain_set_clears_an_existing_mark() {
        let store = Store::new();
        store.set_with_ttl("key".into(), "old".into(), Duration::from_millis(20));
        store.set("key".into(), "new".into());

        std::thread::sleep(Duration::from_millis(50));
        // The fresh value survives: no stale deadline can take it out
        assert_eq!(store.get("key"), Some("new".to_string()));
        assert_eq!(store.sweep_expired(), 0);
        assert_eq!(store.get("key"), Some("new".to_string()));
    }

    #[test]
    fn expire_installs_a_mark_without_checking_existence() {
        let store = Store::new();
        store.expire("ghost".into(), Duration::from_secs(100));
        assert_eq!(store.mark_count(), 1);
        // TTL reads the mark even though no value exists
        assert!(store.ttl("ghost").is_some());
    }

    #[test]
    fn zero_ttl_is_already_due() {
        let store = Store::new();
        assert!(store.set_with_ttl("key".into(), "value".into(), Duration::ZERO));
        assert_eq!(store.get("key"), None);
        assert_eq!(store.ttl("key"), None);

        store.set("other".into(), "value".into());
        assert!(store.expire("other".into(), Duration::ZERO));
        assert_eq!(store.get("other"), None);
    }

    #[test]
    fn unrepresentable_deadlines_are_rejected() {
        let store = Store::new();
        store.set("key".into(), "value".into());

        // A deadline this far out cannot be computed; the call must
        // refuse rather than panic mid-connection
        assert!(!store.expire("key".into(), Duration::from_secs(u64::MAX)));
        assert!(!store.set_with_ttl("other".into(), "v".into(), Duration::from_secs(u64::MAX)));

        // Nothing was written or marked
        assert_eq!(store.mark_count(), 0);
        assert_eq!(store.get("other"), None);
        assert_eq!(store.get("key"), Some("value".to_string()));
    }

    #[test]
    fn ttl_reports_whole_seconds_remaining() {
        let store = Store::new();
        store.set("key".into(), "value".into());
        store.expire("key".into(), Duration::from_secs(100));

        let ttl = store.ttl("key").unwrap();
        assert!(ttl <= 100 && ttl >= 99);
    }

    #[test]
    fn ttl_is_none_without_a_mark_or_after_the_deadline() {
        let store = Store::new();
        store.set("plain".into(), "value".into());
        assert_eq!(store.ttl("plain"), None);
        assert_eq!(store.ttl("missing"), None);

        store.set_with_ttl("brief".into(), "value".into(), Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(store.ttl("brief"), None);
        // TTL never deletes; the entry is still there for the sweeper
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn keys_star_matches_everything_sorted() {
        let store = Store::new();
        store.set("b".into(), "2".into());
        store.set("a".into(), "1".into());
        store.set("ab".into(), "3".into());

        assert_eq!(store.keys("*"), vec!["a", "ab", "b"]);
    }

    #[test]
    fn keys_uses_the_restricted_matcher() {
        let store = Store::new();
        store.set("a".into(), "1".into());
        store.set("ab".into(), "2".into());
        store.set("b".into(), "3".into());

        // A trailing star can never be stepped past, so a* matches nothing
        assert!(store.keys("a*").is_empty());
        assert_eq!(store.keys("?"), vec!["a", "b"]);
        assert_eq!(store.keys("a?"), vec!["ab"]);
    }

    #[test]
    fn keys_ignores_sorted_sets() {
        let store = Store::new();
        store.set("string".into(), "1".into());
        store.zadd("zset", vec![(1.0, "m".into())]);

        assert_eq!(store.keys("*"), vec!["string"]);
    }

    #[test]
    fn zadd_counts_pairs_and_overwrites_scores() {
        let store = Store::new();
        assert_eq!(
            store.zadd("s", vec![(1.0, "a".into()), (2.0, "b".into())]),
            2
        );
        // Re-adding a member moves it rather than duplicating it
        assert_eq!(store.zadd("s", vec![(5.0, "a".into())]), 1);

        let range = store.zrange("s", 0, -1).unwrap();
        assert_eq!(range, vec![("b".to_string(), 2.0), ("a".to_string(), 5.0)]);
    }

    #[test]
    fn zrange_orders_by_score_then_member() {
        let store = Store::new();
        store.zadd(
            "s",
            vec![
                (3.0, "c".into()),
                (1.0, "a".into()),
                (2.0, "b".into()),
                (2.0, "aa".into()),
            ],
        );

        let range = store.zrange("s", 0, -1).unwrap();
        assert_eq!(
            range,
            vec![
                ("a".to_string(), 1.0),
                ("aa".to_string(), 2.0),
                ("b".to_string(), 2.0),
                ("c".to_string(), 3.0),
            ]
        );
    }

    #[test]
    fn zrange_resolves_negative_indices() {
        let store = Store::new();
        store.zadd(
            "s",
            vec![(1.0, "a".into()), (2.0, "b".into()), (3.0, "c".into())],
        );

        let tail = store.zrange("s", -2, -1).unwrap();
        assert_eq!(tail, vec![("b".to_string(), 2.0), ("c".to_string(), 3.0)]);

        // A start resolving below zero behaves as zero
        let all = store.zrange("s", -10, -1).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn zrange_empty_windows_and_unknown_keys() {
        let store = Store::new();
        assert_eq!(store.zrange("missing", 0, -1), None);

        store.zadd(
            "s",
            vec![(1.0, "a".into()), (2.0, "b".into()), (3.0, "c".into())],
        );
        assert_eq!(store.zrange("s", 5, 10), None);
        assert_eq!(store.zrange("s", 2, 1), None);
    }

    #[test]
    fn string_and_set_namespaces_are_independent() {
        let store = Store::new();
        store.set("k".into(), "string".into());
        store.zadd("k", vec![(1.0, "member".into())]);

        assert_eq!(store.get("k"), Some("string".to_string()));
        assert_eq!(store.zrange("k", 0, -1).unwrap().len(), 1);

        // DEL touches only the string side
        assert_eq!(store.delete_many(&["k"]), 1);
        assert_eq!(store.get("k"), None);
        assert_eq!(store.zrange("k", 0, -1).unwrap().len(), 1);
    }

    #[test]
    fn sweep_retires_due_marks_and_their_entries() {
        let store = Store::new();
        store.set_with_ttl("gone".into(), "v".into(), Duration::from_millis(10));
        store.set("kept".into(), "v".into());
        // A mark with no value behind it is retired without counting
        store.expire("orphan".into(), Duration::from_millis(10));

        std::thread::sleep(Duration::from_millis(40));

        assert_eq!(store.sweep_expired(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.mark_count(), 0);
        assert_eq!(store.get("kept"), Some("v".to_string()));
    }

    #[test]
    fn concurrent_sets_lose_nothing() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(Store::new());
        let mut handles = Vec::new();

        for t in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..250 {
                    let key = format!("key-{t}-{i}");
                    store.set(key.clone(), "value".into());
                    assert_eq!(store.get(&key), Some("value".to_string()));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 2000);
    }
}
