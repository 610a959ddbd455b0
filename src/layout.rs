use crate::config::Config;
use crate::flatten::flatten;
use crate::geometry::{Bounds, Point};
use crate::identifier::NodePath;
use crate::node::Node;
use crate::unique_identifiers::assert_unique;

/// A visible node with its computed position.
///
/// `primary` runs from a parent to its children, `cross` runs along the siblings.
/// `cross` is the center of the node on the cross axis, `primary` its start on the primary axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Positioned {
    pub path: NodePath,
    /// Index of the parent inside [`Layout::nodes`]
    pub parent: Option<usize>,
    pub primary: f64,
    pub cross: f64,
    /// Box width plus padding and the gap to the children
    pub primary_size: f64,
    pub cross_size: f64,
    pub has_children: bool,
    pub expanded: bool,
    pub is_placeholder: bool,
}

impl Positioned {
    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.depth()
    }

    /// Upper left corner of the node box in diagram space.
    #[must_use]
    pub fn top_left(&self) -> Point {
        Point::new(self.primary, self.cross - self.cross_size / 2.0)
    }

    /// Primary start and cross center; what gets remembered as the previous position.
    #[must_use]
    pub const fn anchor(&self) -> Point {
        Point::new(self.primary, self.cross)
    }
}

/// Positions of every visible node in pre-order, the root first.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    nodes: Vec<Positioned>,
    bounds: Bounds,
}

impl Layout {
    #[must_use]
    pub fn nodes(&self) -> &[Positioned] {
        &self.nodes
    }

    #[must_use]
    pub fn root(&self) -> &Positioned {
        &self.nodes[0]
    }

    /// Extent of the whole tree in diagram space. `x` is primary, `y` is cross.
    #[must_use]
    pub const fn bounds(&self) -> Bounds {
        self.bounds
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn find(&self, path: &NodePath) -> Option<&Positioned> {
        self.nodes.iter().find(|node| node.path == *path)
    }

    #[must_use]
    pub fn parent_of(&self, node: &Positioned) -> Option<&Positioned> {
        node.parent.map(|index| &self.nodes[index])
    }
}

/// Lay out everything visible below `root`.
///
/// Children are stacked along the cross axis and their parent is centered on them.
/// Adjacent siblings keep `spacing_vertical` apart, nodes of different parents twice that.
/// Boxes are compared wherever they share a stretch of the primary axis, so a wide node also keeps
/// the deeper nodes of its neighbours away.
///
/// # Panics
///
/// Panics when a visible node was never measured or when two visible nodes share an identity.
#[must_use]
pub fn layout(root: &Node, config: &Config) -> Layout {
    let visible = flatten(root);
    assert_unique(visible.iter().map(|node| &node.path));

    let mut nodes: Vec<Positioned> = Vec::with_capacity(visible.len());
    let mut children = vec![Vec::new(); visible.len()];
    // Ancestors of the current node, indexed by depth
    let mut ancestors: Vec<usize> = Vec::new();
    for (index, node) in visible.iter().enumerate() {
        let size = node.size.unwrap_or_else(|| {
            panic!("node {:?} is laid out before it was measured", node.path)
        });
        ancestors.truncate(node.path.depth());
        let parent = ancestors.last().copied();
        if let Some(parent) = parent {
            children[parent].push(index);
        }
        ancestors.push(index);

        let padding = if size.width > 0.0 {
            config.padding_x * 2.0
        } else {
            0.0
        };
        // Pre-order puts every parent before its children
        let primary = parent.map_or(0.0, |parent| {
            let parent = &nodes[parent];
            parent.primary + parent.primary_size
        });
        nodes.push(Positioned {
            path: node.path.clone(),
            parent,
            primary,
            cross: 0.0,
            primary_size: size.width + padding + config.spacing_horizontal,
            cross_size: size.height,
            has_children: node.has_children(),
            expanded: node.expanded,
            is_placeholder: node.is_placeholder,
        });
    }

    let offsets = cross_offsets(&nodes, &children, config.spacing_vertical);
    for index in 1..nodes.len() {
        if let Some(parent) = nodes[index].parent {
            nodes[index].cross = nodes[parent].cross + offsets[index];
        }
    }

    let bounds = bounds(&nodes, config.spacing_horizontal);
    Layout { nodes, bounds }
}

/// Cross extent of a subtree along one stretch `start..end` of the primary axis.
///
/// A contour is a list of them, sorted by `start` and not overlapping.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    start: f64,
    end: f64,
    top: f64,
    bottom: f64,
    /// Parent of the node forming the top edge
    top_parent: Option<usize>,
    /// Parent of the node forming the bottom edge
    bottom_parent: Option<usize>,
}

impl Segment {
    fn shifted(self, by: f64) -> Self {
        Self {
            top: self.top + by,
            bottom: self.bottom + by,
            ..self
        }
    }

    fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Smallest shift of `lower` which keeps it below `upper` wherever both share the primary axis.
fn separation(upper: &[Segment], lower: &[Segment], spacing: f64) -> f64 {
    let mut required = f64::NEG_INFINITY;
    let (mut i, mut j) = (0, 0);
    while i < upper.len() && j < lower.len() {
        let (above, below) = (&upper[i], &lower[j]);
        if above.overlaps(below) {
            let gap = if above.bottom_parent == below.top_parent {
                spacing
            } else {
                spacing * 2.0
            };
            required = required.max(above.bottom - below.top + gap);
        }
        if above.end <= below.end {
            i += 1;
        } else {
            j += 1;
        }
    }
    required
}

/// Outline of both contours together.
fn overlay(upper: &[Segment], lower: &[Segment]) -> Vec<Segment> {
    let mut breaks = upper
        .iter()
        .chain(lower)
        .flat_map(|segment| [segment.start, segment.end])
        .collect::<Vec<_>>();
    breaks.sort_by(f64::total_cmp);
    breaks.dedup();

    let covering = |contour: &[Segment], cursor: &mut usize, at: f64| {
        while *cursor < contour.len() && contour[*cursor].end <= at {
            *cursor += 1;
        }
        contour
            .get(*cursor)
            .filter(|segment| segment.start <= at)
            .copied()
    };

    let mut result: Vec<Segment> = Vec::new();
    let (mut i, mut j) = (0, 0);
    for window in breaks.windows(2) {
        let (start, end) = (window[0], window[1]);
        let segment = match (covering(upper, &mut i, start), covering(lower, &mut j, start)) {
            (Some(above), Some(below)) => {
                let (top, top_parent) = if below.top < above.top {
                    (below.top, below.top_parent)
                } else {
                    (above.top, above.top_parent)
                };
                let (bottom, bottom_parent) = if above.bottom > below.bottom {
                    (above.bottom, above.bottom_parent)
                } else {
                    (below.bottom, below.bottom_parent)
                };
                Segment {
                    start,
                    end,
                    top,
                    bottom,
                    top_parent,
                    bottom_parent,
                }
            }
            (Some(only), None) | (None, Some(only)) => Segment { start, end, ..only },
            (None, None) => continue,
        };
        match result.last_mut() {
            Some(last)
                if last.end == start
                    && last.top == segment.top
                    && last.bottom == segment.bottom
                    && last.top_parent == segment.top_parent
                    && last.bottom_parent == segment.bottom_parent =>
            {
                last.end = end;
            }
            _ => result.push(segment),
        }
    }
    result
}

/// Bottom-up pass: cross offset of every node relative to its parent.
fn cross_offsets(nodes: &[Positioned], children: &[Vec<usize>], spacing: f64) -> Vec<f64> {
    let mut contours: Vec<Vec<Segment>> = vec![Vec::new(); nodes.len()];
    let mut offsets = vec![0.0; nodes.len()];

    // Pre-order puts every child after its parent
    for index in (0..nodes.len()).rev() {
        let kids = &children[index];
        let mut merged: Vec<Segment> = Vec::new();
        // Bottom of the box of the previous sibling
        let mut previous_bottom = None;
        let mut first = 0.0;
        let mut last = 0.0;

        for (position, &kid) in kids.iter().enumerate() {
            let contour = std::mem::take(&mut contours[kid]);
            let half = nodes[kid].cross_size / 2.0;
            let shift = previous_bottom.map_or(0.0, |bottom: f64| {
                separation(&merged, &contour, spacing).max(bottom + spacing + half)
            });

            let shifted = contour
                .into_iter()
                .map(|segment| segment.shifted(shift))
                .collect::<Vec<_>>();
            merged = if merged.is_empty() {
                shifted
            } else {
                overlay(&merged, &shifted)
            };

            previous_bottom = Some(shift + half);
            offsets[kid] = shift;
            if position == 0 {
                first = shift;
            }
            last = shift;
        }

        let middle = (first + last) / 2.0;
        for &kid in kids {
            offsets[kid] -= middle;
        }

        let node = &nodes[index];
        let half = node.cross_size / 2.0;
        let mut contour = Vec::with_capacity(merged.len() + 1);
        contour.push(Segment {
            start: node.primary,
            end: node.primary + node.primary_size,
            top: -half,
            bottom: half,
            top_parent: node.parent,
            bottom_parent: node.parent,
        });
        contour.extend(merged.into_iter().map(|segment| segment.shifted(-middle)));
        contours[index] = contour;
    }

    offsets
}

fn bounds(nodes: &[Positioned], spacing_horizontal: f64) -> Bounds {
    let mut min = Point::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for node in nodes {
        min.x = min.x.min(node.primary);
        max.x = max.x.max(node.primary + node.primary_size - spacing_horizontal);
        min.y = min.y.min(node.cross - node.cross_size / 2.0);
        max.y = max.y.max(node.cross + node.cross_size / 2.0);
    }
    Bounds::new(min, max)
}

#[cfg(test)]
fn cross_of(layout: &Layout, path: &[usize]) -> f64 {
    layout.find(&NodePath::from(path.to_vec())).unwrap().cross
}

#[test]
fn single_root_sits_at_origin() {
    let mut root = crate::flatten::example_tree();
    root.expanded = false;
    let layout = layout(&root, &Config::default());
    assert_eq!(layout.len(), 1);
    assert_eq!(layout.root().anchor(), Point::new(0.0, 0.0));
    // "root" measured 5×1 with a 1×1 cell
    assert_eq!(layout.root().primary_size, 5.0 + 16.0 + 80.0);
}

#[test]
fn siblings_are_spaced_by_spacing_vertical() {
    let root = crate::flatten::example_tree();
    let layout = layout(&root, &Config::default());
    let a = cross_of(&layout, &[1]);
    let b = cross_of(&layout, &[2]);
    let h = cross_of(&layout, &[3]);
    // every box is 1 high
    assert_eq!(b - a, 1.0 + 5.0);
    assert_eq!(h - b, 1.0 + 5.0);
    // parent centered on its children
    assert_eq!(layout.root().cross, (a + h) / 2.0);
}

#[test]
fn cousins_are_spaced_twice() {
    let mut root = crate::flatten::example_tree();
    root.descendant_mut(&[1]).unwrap().expanded = true;
    root.descendant_mut(&[2]).unwrap().expanded = true;
    let layout = layout(&root, &Config::default());

    let placeholder = layout.find(&NodePath::from(vec![1, 1])).unwrap();
    let c = layout.find(&NodePath::from(vec![2, 1])).unwrap();
    let placeholder_bottom = placeholder.cross + placeholder.cross_size / 2.0;
    let c_top = c.cross - c.cross_size / 2.0;
    assert_eq!(c_top - placeholder_bottom, 2.0 * 5.0);
}

#[test]
fn children_start_after_parent_box() {
    let mut root = crate::flatten::example_tree();
    root.descendant_mut(&[2]).unwrap().expanded = true;
    let layout = layout(&root, &Config::default());
    for node in layout.nodes() {
        if let Some(parent) = layout.parent_of(node) {
            assert_eq!(node.primary, parent.primary + parent.primary_size);
        }
    }
}

#[test]
fn bounds_cover_all_boxes() {
    let mut root = crate::flatten::example_tree();
    root.descendant_mut(&[2]).unwrap().expanded = true;
    let config = Config::default();
    let layout = layout(&root, &config);
    let bounds = layout.bounds();
    assert_eq!(bounds.min.x, 0.0);
    for node in layout.nodes() {
        assert!(node.cross - node.cross_size / 2.0 >= bounds.min.y);
        assert!(node.cross + node.cross_size / 2.0 <= bounds.max.y);
        assert!(node.primary + node.primary_size - config.spacing_horizontal <= bounds.max.x);
    }
}

#[test]
fn layout_is_deterministic() {
    let mut root = crate::flatten::example_tree();
    root.descendant_mut(&[2]).unwrap().expanded = true;
    root.descendant_mut(&[2, 2]).unwrap().expanded = true;
    let config = Config::default();
    let first = layout(&root, &config);
    let second = layout(&root, &config);
    assert_eq!(first, second);
}

#[test]
#[should_panic = "before it was measured"]
fn unmeasured_node_panics() {
    let mut root = crate::flatten::example_tree();
    root.descendant_mut(&[3]).unwrap().size = None;
    let _ = layout(&root, &Config::default());
}

#[cfg(test)]
fn assert_no_overlap(layout: &Layout) {
    let nodes = layout.nodes();
    for (index, a) in nodes.iter().enumerate() {
        for b in &nodes[index + 1..] {
            let primary = a.primary < b.primary + b.primary_size && b.primary < a.primary + a.primary_size;
            let cross = a.cross - a.cross_size / 2.0 < b.cross + b.cross_size / 2.0
                && b.cross - b.cross_size / 2.0 < a.cross + a.cross_size / 2.0;
            assert!(
                !(primary && cross),
                "boxes of {} and {} overlap",
                a.path,
                b.path
            );
        }
    }
}

#[cfg(test)]
fn fetched(path: &[usize], label: &str, children: Vec<Node>) -> Node {
    let measure = crate::node::example_measure();
    let mut node = Node::unfetched(NodePath::from(path.to_vec()), label.to_owned(), None, &measure);
    if !children.is_empty() {
        node.children = Some(children);
        node.has_fetched_children = true;
        node.expanded = true;
    }
    node
}

#[test]
fn wide_node_keeps_deeper_neighbours_away() {
    let tall = vec!["x"; 200].join("\n");
    let root = fetched(
        &[],
        "root",
        vec![
            fetched(&[1], &"w".repeat(300), vec![fetched(&[1, 1], "a", Vec::new())]),
            fetched(
                &[2],
                "b",
                vec![fetched(&[2, 1], "c", vec![fetched(&[2, 1, 1], &tall, Vec::new())])],
            ),
        ],
    );
    let config = Config::default();
    let layout = layout(&root, &config);
    assert_no_overlap(&layout);

    // the tall node lies below the wide one, a cousin gap apart
    let wide = layout.find(&NodePath::from(vec![1])).unwrap();
    let tall = layout.find(&NodePath::from(vec![2, 1, 1])).unwrap();
    assert!(tall.primary < wide.primary + wide.primary_size);
    let wide_bottom = wide.cross + wide.cross_size / 2.0;
    let tall_top = tall.cross - tall.cross_size / 2.0;
    assert_eq!(tall_top - wide_bottom, 2.0 * config.spacing_vertical);
}

#[test]
fn mixed_widths_never_overlap() {
    let root = fetched(
        &[],
        "root",
        vec![
            fetched(
                &[1],
                "a",
                vec![
                    fetched(&[1, 1], "tiny", vec![fetched(&[1, 1, 1], "deep\ndeep\ndeep", Vec::new())]),
                    fetched(&[1, 2], &"long".repeat(40), Vec::new()),
                ],
            ),
            fetched(&[2], &"medium".repeat(5), vec![fetched(&[2, 1], "x\ny\nz\nw", Vec::new())]),
            fetched(
                &[3],
                "c",
                vec![fetched(
                    &[3, 1],
                    "d",
                    vec![fetched(&[3, 1, 1], "e", vec![fetched(&[3, 1, 1, 1], "f\nf\nf\nf\nf\nf", Vec::new())])],
                )],
            ),
        ],
    );
    for spacing in [0.0, 5.0, 20.0] {
        let config = Config {
            spacing_vertical: spacing,
            ..Config::default()
        };
        assert_no_overlap(&layout(&root, &config));
    }
}

#[test]
fn example_tree_fully_open_never_overlaps() {
    let mut root = crate::flatten::example_tree();
    root.descendant_mut(&[2]).unwrap().expanded = true;
    root.descendant_mut(&[2, 2]).unwrap().expanded = true;
    assert_no_overlap(&layout(&root, &Config::default()));
}
