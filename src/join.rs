use std::collections::HashSet;
use std::hash::Hash;

/// Result of joining new keyed data against the keys already present.
///
/// The three sets are disjoint. `entered` and `retained` keep the order of the new data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join<Key, Data> {
    /// Keys which are new
    pub entered: Vec<(Key, Data)>,
    /// Keys which existed before and still exist
    pub retained: Vec<(Key, Data)>,
    /// Keys which existed before but are gone now, in their previous order
    pub exited: Vec<Key>,
}

/// Split `new` into entered and retained by the keys in `old` and collect the keys of `old` not in `new`.
///
/// # Panics
///
/// Panics when a key occurs twice in `new`.
///
/// # Example
///
/// ```
/// # use tui_tree_diagram::keyed_join;
/// let join = keyed_join(["a", "b"], vec![("b", 2), ("c", 3)]);
/// assert_eq!(join.entered, [("c", 3)]);
/// assert_eq!(join.retained, [("b", 2)]);
/// assert_eq!(join.exited, ["a"]);
/// ```
#[track_caller]
pub fn keyed_join<Key, Data, Old>(old: Old, new: Vec<(Key, Data)>) -> Join<Key, Data>
where
    Key: Clone + Eq + Hash,
    Old: IntoIterator<Item = Key>,
{
    let old = old.into_iter().collect::<Vec<_>>();
    let previous = old.iter().collect::<HashSet<_>>();

    let mut seen = HashSet::with_capacity(new.len());
    let mut entered = Vec::new();
    let mut retained = Vec::new();
    for (key, data) in new {
        assert!(seen.insert(key.clone()), "keys of the joined data are not unique");
        if previous.contains(&key) {
            retained.push((key, data));
        } else {
            entered.push((key, data));
        }
    }

    let exited = old.into_iter().filter(|key| !seen.contains(key)).collect();
    Join {
        entered,
        retained,
        exited,
    }
}

#[test]
fn empty_old_enters_everything() {
    let join = keyed_join(Vec::<u8>::new(), vec![(1, 'a'), (2, 'b')]);
    assert_eq!(join.entered, [(1, 'a'), (2, 'b')]);
    assert!(join.retained.is_empty());
    assert!(join.exited.is_empty());
}

#[test]
fn empty_new_exits_everything() {
    let join = keyed_join([3, 1, 2], Vec::<(u8, ())>::new());
    assert!(join.entered.is_empty());
    assert_eq!(join.exited, [3, 1, 2]);
}

#[test]
fn same_keys_are_retained_with_new_data() {
    let join = keyed_join([1, 2], vec![(2, "new two"), (1, "new one")]);
    assert!(join.entered.is_empty());
    assert_eq!(join.retained, [(2, "new two"), (1, "new one")]);
    assert!(join.exited.is_empty());
}

#[test]
#[should_panic = "not unique"]
fn duplicate_new_keys_panic() {
    let _ = keyed_join([1], vec![(1, ()), (1, ())]);
}
