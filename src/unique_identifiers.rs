use std::collections::HashSet;

use crate::identifier::NodePath;

/// Ensures that no identity is used twice.
///
/// A duplicate means the tree was changed outside of the diagram's own operations.
/// There is no sensible way to continue reconciling from there, so this panics.
#[track_caller]
pub fn assert_unique<'a, I>(paths: I)
where
    I: IntoIterator<Item = &'a NodePath>,
{
    let mut seen = HashSet::new();
    for path in paths {
        assert!(
            seen.insert(path),
            "duplicate node identity {path:?} in the visible tree"
        );
    }
}

#[test]
fn unique_paths_pass() {
    let paths = [NodePath::root(), NodePath::from(vec![1]), NodePath::from(vec![1, 1])];
    assert_unique(&paths);
}

#[test]
#[should_panic = "duplicate node identity"]
fn duplicate_paths_panic() {
    let paths = [NodePath::from(vec![1]), NodePath::from(vec![1])];
    assert_unique(&paths);
}
