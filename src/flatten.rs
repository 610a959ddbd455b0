use crate::node::Node;

/// All visible nodes below and including `node` in pre-order.
///
/// Children are only visited when their parent is expanded, so the cost stays bound to what is visible
/// no matter how much data is hidden below collapsed nodes.
#[must_use]
pub fn flatten(node: &Node) -> Vec<&Node> {
    let mut result = Vec::new();
    push_visible(node, &mut result);
    result
}

fn push_visible<'a>(node: &'a Node, result: &mut Vec<&'a Node>) {
    result.push(node);
    if node.expanded {
        for child in node.children() {
            push_visible(child, result);
        }
    }
}

#[cfg(test)]
pub(crate) fn example_tree() -> Node {
    use crate::identifier::NodePath;
    use crate::node::example_measure;

    let measure = example_measure();
    let mut root = Node::unfetched(NodePath::root(), "root".to_owned(), None, &measure);
    let mut b = Node::unfetched(NodePath::from(vec![2]), "b".to_owned(), None, &measure);
    let mut d = Node::unfetched(NodePath::from(vec![2, 2]), "d".to_owned(), None, &measure);
    d.children = Some(vec![
        Node::unfetched(NodePath::from(vec![2, 2, 1]), "e".to_owned(), None, &measure),
        Node::unfetched(NodePath::from(vec![2, 2, 2]), "f".to_owned(), None, &measure),
    ]);
    d.has_fetched_children = true;
    b.children = Some(vec![
        Node::unfetched(NodePath::from(vec![2, 1]), "c".to_owned(), None, &measure),
        d,
        Node::unfetched(NodePath::from(vec![2, 3]), "g".to_owned(), None, &measure),
    ]);
    b.has_fetched_children = true;
    root.children = Some(vec![
        Node::unfetched(NodePath::from(vec![1]), "a".to_owned(), None, &measure),
        b,
        Node::unfetched(NodePath::from(vec![3]), "h".to_owned(), None, &measure),
    ]);
    root.has_fetched_children = true;
    root.expanded = true;
    root
}

#[cfg(test)]
fn flatten_works(root: &Node, expected: &[&str]) {
    let actual = flatten(root)
        .into_iter()
        .map(|node| node.label())
        .collect::<Vec<_>>();
    assert_eq!(actual, expected);
}

#[test]
fn flatten_nothing_open_is_top_level() {
    let root = example_tree();
    flatten_works(&root, &["root", "a", "b", "h"]);
}

#[test]
fn flatten_collapsed_root_is_only_root() {
    let mut root = example_tree();
    root.expanded = false;
    flatten_works(&root, &["root"]);
}

#[test]
fn flatten_hidden_open_is_not_visited() {
    let mut root = example_tree();
    root.descendant_mut(&[2, 2]).unwrap().expanded = true;
    flatten_works(&root, &["root", "a", "b", "h"]);
}

#[test]
fn flatten_one_is_open() {
    let mut root = example_tree();
    root.descendant_mut(&[2]).unwrap().expanded = true;
    flatten_works(&root, &["root", "a", "b", "c", "d", "g", "h"]);
}

#[test]
fn flatten_all_open() {
    let mut root = example_tree();
    root.descendant_mut(&[2]).unwrap().expanded = true;
    root.descendant_mut(&[2, 2]).unwrap().expanded = true;
    flatten_works(&root, &["root", "a", "b", "c", "d", "e", "f", "g", "h"]);
}

#[test]
fn depth_works() {
    let mut root = example_tree();
    root.descendant_mut(&[2]).unwrap().expanded = true;
    root.descendant_mut(&[2, 2]).unwrap().expanded = true;
    let depths = flatten(&root)
        .into_iter()
        .map(|node| node.path().depth())
        .collect::<Vec<_>>();
    assert_eq!(depths, [0, 1, 1, 2, 2, 3, 3, 2, 1]);
}
