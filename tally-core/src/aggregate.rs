use std::collections::HashMap;
use std::hash::Hash;

/// A partial result built by one worker from one partition.
///
/// The same type describes both the per-partition accumulator and the global result: a
/// job starts from `Default::default()` and folds every finished partition into it with
/// `merge`.  Each partition is merged exactly once, so `merge` may consume its argument.
pub trait Aggregate: Default + Send + 'static {

    /// Folds a finished partition into `self`.
    fn merge(&mut self, other: Self);
}

impl <A: Send + 'static> Aggregate for Vec<A> {
    fn merge(&mut self, other: Self) {
        self.extend(other);
    }
}

/// Inserts every entry of `right` whose key is absent from `left`.  Existing entries are
/// never overwritten, so the first value merged for a key wins.
pub fn merge_absent<K: Hash + Eq, V>(left: &mut HashMap<K, V>, right: HashMap<K, V>) {
    left.reserve(right.len());
    for (k, v) in right {
        left.entry(k).or_insert(v);
    }
}

/// Merges `right` into `left`, combining the values of keys present in both with
/// `reduce` and inserting the rest.
pub fn merge_with<
    K: Hash + Eq,
    V,
    R: Fn(&mut V, V)
>(
    left: &mut HashMap<K, V>,
    right: HashMap<K, V>,
    reduce: R
) {
    for (k, v) in right {
        match left.get_mut(&k) {
            Some(e) => reduce(e, v),
            None => {
                left.insert(k, v);
            }
        }
    }
}
