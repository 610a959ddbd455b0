use crate::error::DiagramError;
use crate::flatten::flatten;
use crate::identifier::NodePath;
use crate::measure::Measure;
use crate::node::Node;

/// The tree behind the diagram.
///
/// The epoch changes whenever the whole tree is replaced.
/// Fetches requested for an older epoch no longer apply.
#[derive(Debug, Clone, Default)]
pub struct SceneModel {
    root: Option<Node>,
    epoch: u64,
}

impl SceneModel {
    #[must_use]
    pub const fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    pub(crate) fn root_mut(&mut self) -> Option<&mut Node> {
        self.root.as_mut()
    }

    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Replace the whole tree by a single unfetched root.
    pub(crate) fn set_root(&mut self, label: String, measure: &dyn Measure) -> &mut Node {
        self.epoch = self.epoch.wrapping_add(1);
        self.root
            .insert(Node::unfetched(NodePath::root(), label, None, measure))
    }

    pub(crate) fn clear(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.root = None;
    }

    /// # Errors
    ///
    /// Errors when there is no tree or no node with this identity.
    pub fn node(&self, path: &NodePath) -> Result<&Node, DiagramError> {
        self.root
            .as_ref()
            .ok_or(DiagramError::NoRoot)?
            .descendant(path.ordinals())
            .ok_or_else(|| DiagramError::UnknownNode(path.clone()))
    }

    /// # Errors
    ///
    /// Errors when there is no tree or no node with this identity.
    pub(crate) fn node_mut(&mut self, path: &NodePath) -> Result<&mut Node, DiagramError> {
        self.root
            .as_mut()
            .ok_or(DiagramError::NoRoot)?
            .descendant_mut(path.ordinals())
            .ok_or_else(|| DiagramError::UnknownNode(path.clone()))
    }

    /// The node exists and all of its ancestors are expanded.
    #[must_use]
    pub fn is_visible(&self, path: &NodePath) -> bool {
        self.node(path).is_ok()
            && path
                .ancestors()
                .all(|ancestor| self.node(&ancestor).is_ok_and(Node::is_expanded))
    }

    /// Visible nodes in pre-order.
    #[must_use]
    pub fn visible(&self) -> Vec<&Node> {
        self.root.as_ref().map(flatten).unwrap_or_default()
    }
}

#[cfg(test)]
fn example_model() -> SceneModel {
    SceneModel {
        root: Some(crate::flatten::example_tree()),
        epoch: 1,
    }
}

#[test]
fn lookup_by_identity() {
    let model = example_model();
    let d = model.node(&"2.2".parse().unwrap()).unwrap();
    assert_eq!(d.label(), "d");
    assert_eq!(
        model.node(&"4".parse().unwrap()).unwrap_err(),
        DiagramError::UnknownNode("4".parse().unwrap())
    );
    assert_eq!(
        SceneModel::default().node(&NodePath::root()).unwrap_err(),
        DiagramError::NoRoot
    );
}

#[test]
fn visibility_needs_every_ancestor_expanded() {
    let mut model = example_model();
    let e: NodePath = "2.2.1".parse().unwrap();
    assert!(model.is_visible(&NodePath::root()));
    assert!(model.is_visible(&"2".parse().unwrap()));
    assert!(!model.is_visible(&e));

    model.node_mut(&"2".parse().unwrap()).unwrap().expanded = true;
    assert!(!model.is_visible(&e));
    model.node_mut(&"2.2".parse().unwrap()).unwrap().expanded = true;
    assert!(model.is_visible(&e));
    assert_eq!(model.visible().len(), 9);
}

#[test]
fn set_root_bumps_epoch() {
    let mut model = SceneModel::default();
    let measure = crate::node::example_measure();
    model.set_root("main".to_owned(), &measure);
    let first = model.epoch();
    model.set_root("other".to_owned(), &measure);
    assert_ne!(model.epoch(), first);
    assert_eq!(model.root().unwrap().label(), "other");
    model.clear();
    assert!(model.root().is_none());
    assert!(model.visible().is_empty());
}
