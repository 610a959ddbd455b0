use ratatui::text::Text;

use crate::geometry::{Point, Size};
use crate::identifier::NodePath;
use crate::measure::{Measure, PLACEHOLDER_SIZE};

/// Source location a node points to.
///
/// Handed to the [`Revealer`](crate::Revealer) when the content of a node is activated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Locator {
    pub file: String,
    pub line: u32,
}

impl Locator {
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

/// One element of the diagram.
///
/// A node owns its children.
/// Children which are not fetched yet are represented by a single placeholder child.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) label: String,
    pub(crate) content: Text<'static>,
    pub(crate) locator: Option<Locator>,
    pub(crate) children: Option<Vec<Node>>,
    pub(crate) expanded: bool,
    pub(crate) has_fetched_children: bool,
    pub(crate) is_placeholder: bool,
    pub(crate) fetching: bool,
    pub(crate) path: NodePath,
    pub(crate) size: Option<Size>,
    /// Position after the last render pass, anchor for entering and exiting descendants
    pub(crate) previous: Option<Point>,
}

impl Node {
    /// Create a measured node waiting for its children to be fetched.
    pub(crate) fn unfetched(
        path: NodePath,
        label: String,
        locator: Option<Locator>,
        measure: &dyn Measure,
    ) -> Self {
        let content = Text::raw(label.clone());
        let size = measure.measure(&content);
        let placeholder = Self::placeholder(path.child(1));
        Self {
            label,
            content,
            locator,
            children: Some(vec![placeholder]),
            expanded: false,
            has_fetched_children: false,
            is_placeholder: false,
            fetching: false,
            path,
            size: Some(size),
            previous: None,
        }
    }

    /// The "no children yet" sentinel.
    pub(crate) fn placeholder(path: NodePath) -> Self {
        Self {
            label: String::new(),
            content: Text::default(),
            locator: None,
            children: None,
            expanded: false,
            has_fetched_children: false,
            is_placeholder: true,
            fetching: false,
            path,
            size: Some(PLACEHOLDER_SIZE),
            previous: None,
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub const fn content(&self) -> &Text<'static> {
        &self.content
    }

    #[must_use]
    pub const fn locator(&self) -> Option<&Locator> {
        self.locator.as_ref()
    }

    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    #[must_use]
    pub fn children(&self) -> &[Self] {
        self.children.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children().is_empty()
    }

    #[must_use]
    pub const fn is_expanded(&self) -> bool {
        self.expanded
    }

    #[must_use]
    pub const fn has_fetched_children(&self) -> bool {
        self.has_fetched_children
    }

    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        self.is_placeholder
    }

    /// A fetch for the children of this node is outstanding.
    #[must_use]
    pub const fn is_fetching(&self) -> bool {
        self.fetching
    }

    #[must_use]
    pub const fn size(&self) -> Option<Size> {
        self.size
    }

    #[must_use]
    pub const fn previous_position(&self) -> Option<Point> {
        self.previous
    }

    /// Get a reference to a child by its 1-based ordinal.
    #[must_use]
    pub fn child(&self, ordinal: usize) -> Option<&Self> {
        self.children().get(ordinal.checked_sub(1)?)
    }

    /// Get a mutable reference to a child by its 1-based ordinal.
    #[must_use]
    pub fn child_mut(&mut self, ordinal: usize) -> Option<&mut Self> {
        self.children.as_mut()?.get_mut(ordinal.checked_sub(1)?)
    }

    /// Walk down from this node along the given ordinals.
    #[must_use]
    pub fn descendant(&self, ordinals: &[usize]) -> Option<&Self> {
        let mut current = self;
        for ordinal in ordinals {
            current = current.child(*ordinal)?;
        }
        Some(current)
    }

    #[must_use]
    pub fn descendant_mut(&mut self, ordinals: &[usize]) -> Option<&mut Self> {
        let mut current = self;
        for ordinal in ordinals {
            current = current.child_mut(*ordinal)?;
        }
        Some(current)
    }

    /// Visit this node and every node below it, whether visible or not.
    pub(crate) fn for_each_mut(&mut self, visit: &mut impl FnMut(&mut Self)) {
        visit(self);
        if let Some(children) = self.children.as_mut() {
            for child in children {
                child.for_each_mut(visit);
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn example_measure() -> crate::TextMeasure {
    crate::TextMeasure::new(1.0, 1.0, 1.0)
}

#[test]
fn unfetched_node_has_placeholder_child() {
    let node = Node::unfetched(NodePath::root(), "main".to_owned(), None, &example_measure());
    assert!(node.has_children());
    assert!(!node.has_fetched_children());
    let placeholder = node.child(1).unwrap();
    assert!(placeholder.is_placeholder());
    assert_eq!(placeholder.path().to_string(), "1");
    assert_eq!(placeholder.size(), Some(PLACEHOLDER_SIZE));
}

#[test]
fn ordinals_are_one_based() {
    let node = Node::unfetched(NodePath::root(), "main".to_owned(), None, &example_measure());
    assert!(node.child(0).is_none());
    assert!(node.child(1).is_some());
    assert!(node.child(2).is_none());
    assert!(node.descendant(&[1]).is_some());
    assert!(node.descendant(&[1, 1]).is_none());
}
