use crate::identifier::NodePath;

/// Misuse of the [`DiagramState`](crate::DiagramState) API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiagramError {
    #[error("no diagram root installed")]
    NoRoot,
    #[error("no node with identity {0:?}")]
    UnknownNode(NodePath),
}

/// The data provider could not deliver the children of a node.
///
/// Never fatal: the expansion is rolled back and the node stays collapsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("data provider rejected the request: {0}")]
    Rejected(String),
    #[error("child record {index} is malformed: {reason}")]
    Malformed { index: usize, reason: &'static str },
}
