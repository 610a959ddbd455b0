use std::future::Future;

use crate::error::FetchError;
use crate::identifier::NodePath;
use crate::node::Locator;

/// One child as delivered by a [`DataProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChildRecord {
    pub label: String,
    pub locator: Locator,
}

impl ChildRecord {
    #[must_use]
    pub fn new(label: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            label: label.into(),
            locator: Locator::new(file, line),
        }
    }
}

/// Delivers the children of a node the first time it is expanded.
///
/// The key is the label of the node being expanded.
///
/// # Example
///
/// ```
/// # use tui_tree_diagram::{ChildRecord, DataProvider, FetchError};
/// struct Callers;
///
/// impl DataProvider for Callers {
///     async fn fetch_children(&self, key: &str) -> Result<Vec<ChildRecord>, FetchError> {
///         match key {
///             "main" => Ok(Vec::new()),
///             _ => Ok(vec![ChildRecord::new("main", "src/main.c", 12)]),
///         }
///     }
/// }
/// ```
pub trait DataProvider {
    fn fetch_children(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Vec<ChildRecord>, FetchError>>;
}

/// Receives the source location of a node whose content was activated.
///
/// Fire and forget: nothing is returned to the diagram.
pub trait Revealer {
    fn reveal_location(&mut self, locator: &Locator);
}

impl<F> Revealer for F
where
    F: FnMut(&Locator),
{
    fn reveal_location(&mut self, locator: &Locator) {
        self(locator);
    }
}

/// Children of `path` have to be fetched before the node can be expanded.
///
/// Hand the result back with [`DiagramState::resolve_fetch`](crate::DiagramState::resolve_fetch).
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct FetchRequest {
    pub path: NodePath,
    /// What to ask the [`DataProvider`] for
    pub key: String,
    pub(crate) epoch: u64,
}

/// What became of a [`FetchRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResolution {
    /// The children were installed and the node is expanded.
    Spliced { children: usize },
    /// The fetch failed. The node stays collapsed with its placeholder.
    Failed(FetchError),
    /// The result no longer applies: the tree was replaced or the node got hidden in the meantime.
    Discarded,
}

/// Checks every record before anything is installed.
pub(crate) fn validate(records: &[ChildRecord]) -> Result<(), FetchError> {
    for (index, record) in records.iter().enumerate() {
        if record.label.trim().is_empty() {
            return Err(FetchError::Malformed {
                index,
                reason: "empty label",
            });
        }
        if record.locator.line == 0 {
            return Err(FetchError::Malformed {
                index,
                reason: "line numbers start at 1",
            });
        }
    }
    Ok(())
}

#[test]
fn validate_accepts_records() {
    let records = [
        ChildRecord::new("foo", "a.c", 1),
        ChildRecord::new("bar", "b.c", 20),
    ];
    assert_eq!(validate(&records), Ok(()));
}

#[test]
fn validate_rejects_empty_label() {
    let records = [
        ChildRecord::new("foo", "a.c", 1),
        ChildRecord::new("  ", "b.c", 20),
    ];
    assert_eq!(
        validate(&records),
        Err(FetchError::Malformed {
            index: 1,
            reason: "empty label"
        })
    );
}

#[test]
fn validate_rejects_line_zero() {
    let records = [ChildRecord::new("foo", "a.c", 0)];
    assert!(matches!(
        validate(&records),
        Err(FetchError::Malformed { index: 0, .. })
    ));
}
