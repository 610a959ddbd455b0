use std::fmt;

/// Identity of a node inside the diagram.
///
/// The path is built from the 1-based position of every node below the root: the second child of the first child of the root is `1.2`.
/// The root itself has the empty path.
///
/// The path is the key every visual primitive is reconciled by.
/// It stays stable across re-layouts as long as the order of the siblings is not changed.
///
/// # Examples
///
/// ```
/// # use tui_tree_diagram::NodePath;
/// let root = NodePath::root();
/// let path = root.child(1).child(3).child(2);
/// assert_eq!(path.to_string(), "1.3.2");
/// assert_eq!(path.depth(), 3);
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of the child at the 1-based `ordinal`.
    #[must_use]
    pub fn child(&self, ordinal: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(ordinal);
        Self(indices)
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of edges between the root and this node.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn ordinals(&self) -> &[usize] {
        &self.0
    }

    /// Split the path into its parent path and the ordinal of the node within the parent.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tui_tree_diagram::NodePath;
    /// let path: NodePath = "2.4.6".parse().unwrap();
    /// let (parent, ordinal) = path.split_last().unwrap();
    /// assert_eq!(parent.to_string(), "2.4");
    /// assert_eq!(ordinal, 6);
    ///
    /// assert_eq!(NodePath::root().split_last(), None);
    /// ```
    #[must_use]
    pub fn split_last(&self) -> Option<(Self, usize)> {
        let (last, branch) = self.0.split_last()?;
        Some((Self(branch.to_vec()), *last))
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.split_last().map(|(parent, _)| parent)
    }

    /// All strict ancestors, starting with the root.
    pub fn ancestors(&self) -> impl Iterator<Item = Self> + '_ {
        (0..self.0.len()).map(|length| Self(self.0[..length].to_vec()))
    }

    /// `true` when `self` lies strictly below `other`.
    #[must_use]
    pub fn is_descendant_of(&self, other: &Self) -> bool {
        self.0.len() > other.0.len() && self.0.starts_with(&other.0)
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for ordinal in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{ordinal}")?;
            first = false;
        }
        Ok(())
    }
}

/// The text could not be read as a `.` separated list of positive ordinals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid node path {0:?}")]
pub struct ParsePathError(String);

impl std::str::FromStr for NodePath {
    type Err = ParsePathError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.is_empty() {
            return Ok(Self::root());
        }
        text.split('.')
            .map(|part| match part.parse::<usize>() {
                Ok(ordinal) if ordinal > 0 => Ok(ordinal),
                _ => Err(ParsePathError(text.to_owned())),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

#[test]
fn root_displays_empty() {
    assert_eq!(NodePath::root().to_string(), "");
    assert!(NodePath::root().is_root());
}

#[test]
fn parse_roundtrips_display() {
    let path: NodePath = "1.3.2".parse().unwrap();
    assert_eq!(path.ordinals(), [1, 3, 2]);
    assert_eq!(path.to_string(), "1.3.2");
}

#[test]
fn parse_rejects_zero_and_garbage() {
    assert!("1.0".parse::<NodePath>().is_err());
    assert!("1..2".parse::<NodePath>().is_err());
    assert!("a".parse::<NodePath>().is_err());
}

#[test]
fn ancestors_start_at_root() {
    let path: NodePath = "2.1.4".parse().unwrap();
    let ancestors = path.ancestors().map(|p| p.to_string()).collect::<Vec<_>>();
    assert_eq!(ancestors, ["", "2", "2.1"]);
}

#[test]
fn descendant_is_strict() {
    let parent: NodePath = "2".parse().unwrap();
    let child: NodePath = "2.1".parse().unwrap();
    let cousin: NodePath = "3.1".parse().unwrap();
    assert!(child.is_descendant_of(&parent));
    assert!(child.is_descendant_of(&NodePath::root()));
    assert!(!parent.is_descendant_of(&parent));
    assert!(!cousin.is_descendant_of(&parent));
}
