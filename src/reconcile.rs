use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};

use ratatui::text::Text;

use crate::config::Config;
use crate::flatten::flatten;
use crate::geometry::{Point, Size};
use crate::identifier::NodePath;
use crate::join::keyed_join;
use crate::layout::{Layout, Positioned};
use crate::node::Node;
use crate::scene::{
    Change, CircleAttrs, ConnectorAttrs, ContentAttrs, Element, GroupAttrs, LinkAttrs, Mutation,
    Primitive, Scene,
};
use crate::tween::{Lerp, Tween};

const INDICATOR_RADIUS: f64 = 6.0;
const INDICATOR_STROKE: f64 = 1.5;
const MARKER_RADIUS: f64 = 3.0;
const MARKER_STROKE: f64 = 3.0;

/// Everything a single reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderPass {
    /// Node entering and exiting elements are moving from and to
    pub anchor: NodePath,
    /// Number of visible nodes after the pass
    pub visible: usize,
    pub mutations: Vec<Mutation>,
}

impl RenderPass {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    #[must_use]
    pub fn count(&self, primitive: Primitive, change: Change) -> usize {
        self.mutations
            .iter()
            .filter(|mutation| mutation.primitive == primitive && mutation.change == change)
            .count()
    }

    /// Changes made to the element of `primitive` keyed by `key`.
    pub fn changes_of<'a>(
        &'a self,
        primitive: Primitive,
        key: &'a NodePath,
    ) -> impl Iterator<Item = Change> + 'a {
        self.mutations
            .iter()
            .filter(move |mutation| mutation.primitive == primitive && mutation.key == *key)
            .map(|mutation| mutation.change)
    }
}

/// Where an element starts when it enters and where it heads.
#[derive(Debug)]
struct Target<A> {
    enter: A,
    to: A,
}

#[derive(Debug, Default)]
struct Targets {
    groups: Vec<(NodePath, Target<GroupAttrs>)>,
    connectors: Vec<(NodePath, Target<ConnectorAttrs>)>,
    indicators: Vec<(NodePath, Target<CircleAttrs>)>,
    markers: Vec<(NodePath, Target<CircleAttrs>)>,
    contents: Vec<(NodePath, Target<ContentAttrs>)>,
    links: Vec<(NodePath, Target<LinkAttrs>)>,
}

/// Where the anchor was before this pass and where it is now.
#[derive(Debug, Clone, Copy)]
struct Anchor {
    previous: Point,
    current: Point,
    primary_size: f64,
    cross_size: f64,
    spacing_horizontal: f64,
}

impl Anchor {
    /// Box origin of a node of the given extent tucked against `at`.
    fn tucked(&self, at: Point, primary_size: f64, cross_size: f64) -> Point {
        Point::new(
            at.x + self.primary_size - primary_size,
            at.y + self.cross_size / 2.0 - cross_size,
        )
    }

    /// The indicator of the anchor at `at`, where links grow from.
    fn indicator(&self, at: Point) -> Point {
        Point::new(
            at.x + self.primary_size - self.spacing_horizontal,
            at.y + self.cross_size / 2.0,
        )
    }
}

fn stroke_width(depth: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let depth = depth as f64;
    depth.mul_add(-2.0, 4.0).max(1.5)
}

/// Bring `scene` in line with `layout`.
///
/// Elements of nodes which became visible grow out of the previous position of the `anchor`,
/// elements of nodes which got hidden shrink into its current position.
/// Elements which did not change are not touched at all.
/// Afterwards every visible node remembers its position for the next pass.
///
/// `root` has to be the tree `layout` was computed from.
pub fn reconcile(
    scene: &mut Scene,
    layout: &Layout,
    root: &mut Node,
    anchor: &NodePath,
    config: &Config,
    now: Instant,
) -> RenderPass {
    scene.prune(now);

    let anchor_node = layout.find(anchor).unwrap_or_else(|| layout.root());
    let anchor_previous = root
        .descendant(anchor_node.path.ordinals())
        .and_then(Node::previous_position)
        .unwrap_or_else(|| anchor_node.anchor());
    let anchor = Anchor {
        previous: anchor_previous,
        current: anchor_node.anchor(),
        primary_size: anchor_node.primary_size,
        cross_size: anchor_node.cross_size,
        spacing_horizontal: config.spacing_horizontal,
    };

    let texts = flatten(root)
        .into_iter()
        .map(|node| node.content().clone())
        .collect::<Vec<_>>();
    debug_assert_eq!(texts.len(), layout.len(), "layout does not match the tree");
    let targets = targets(layout, texts, &anchor, config);
    let visible = layout
        .nodes()
        .iter()
        .map(|node| node.path.clone())
        .collect::<HashSet<_>>();

    let mut joiner = Joiner {
        now,
        duration: config.duration,
        mutations: Vec::new(),
    };

    joiner.apply(Primitive::Group, &mut scene.groups, targets.groups, |_, group| {
        Some(GroupAttrs {
            origin: anchor.tucked(anchor.current, group.primary_size, group.cross_size),
            ..*group
        })
    });
    joiner.apply(Primitive::Connector, &mut scene.connectors, targets.connectors, |key, connector| {
        (!visible.contains(key)).then_some(ConnectorAttrs {
            from_x: connector.to_x,
            ..*connector
        })
    });
    joiner.apply(Primitive::Indicator, &mut scene.indicators, targets.indicators, |key, circle| {
        (!visible.contains(key)).then_some(CircleAttrs {
            radius: 0.0,
            ..*circle
        })
    });
    joiner.apply(Primitive::Marker, &mut scene.markers, targets.markers, |key, circle| {
        (!visible.contains(key)).then_some(CircleAttrs {
            radius: 0.0,
            ..*circle
        })
    });
    joiner.apply(Primitive::Content, &mut scene.contents, targets.contents, |key, content| {
        (!visible.contains(key)).then(|| ContentAttrs {
            opacity: 0.0,
            ..content.clone()
        })
    });
    let collapse_to = anchor.indicator(anchor.current);
    joiner.apply(Primitive::Link, &mut scene.links, targets.links, |_, link| {
        Some(LinkAttrs {
            source: collapse_to,
            target: collapse_to,
            ..*link
        })
    });
    let mutations = joiner.mutations;

    for node in layout.nodes() {
        if let Some(target) = root.descendant_mut(node.path.ordinals()) {
            target.previous = Some(node.anchor());
        }
    }

    tracing::debug!(
        anchor = %anchor_node.path,
        visible = layout.len(),
        mutations = mutations.len(),
        "render pass"
    );
    RenderPass {
        anchor: anchor_node.path.clone(),
        visible: layout.len(),
        mutations,
    }
}

fn targets(layout: &Layout, texts: Vec<Text<'static>>, anchor: &Anchor, config: &Config) -> Targets {
    let spacing = config.spacing_horizontal;
    let link_start = anchor.indicator(anchor.previous);
    let mut targets = Targets::default();

    for (node, text) in layout.nodes().iter().zip(texts) {
        let key = node.path.clone();
        let color = (config.color)(&node.path);
        let width = stroke_width(node.depth());
        let inner = node.primary_size - spacing;

        targets.groups.push((
            key.clone(),
            Target {
                enter: GroupAttrs {
                    origin: anchor.tucked(anchor.previous, node.primary_size, node.cross_size),
                    primary_size: node.primary_size,
                    cross_size: node.cross_size,
                },
                to: GroupAttrs {
                    origin: node.top_left(),
                    primary_size: node.primary_size,
                    cross_size: node.cross_size,
                },
            },
        ));

        let right = inner + 2.0;
        let connector = ConnectorAttrs {
            from_x: -1.0,
            to_x: right,
            y: node.cross_size,
            color,
            width,
        };
        targets.connectors.push((
            key.clone(),
            Target {
                enter: ConnectorAttrs {
                    from_x: right,
                    ..connector
                },
                to: connector,
            },
        ));

        let center = Point::new(inner, node.cross_size);
        if node.is_placeholder {
            let marker = CircleAttrs {
                center,
                radius: MARKER_RADIUS,
                color,
                fill: None,
                stroke_width: MARKER_STROKE,
            };
            targets.markers.push((key.clone(), grown(marker)));
        } else if node.has_children {
            let indicator = CircleAttrs {
                center,
                radius: INDICATOR_RADIUS,
                color,
                fill: (!node.expanded).then_some(color),
                stroke_width: INDICATOR_STROKE,
            };
            targets.indicators.push((key.clone(), grown(indicator)));
        }

        let content_width = if node.is_placeholder {
            1.0
        } else {
            config.padding_x.mul_add(-2.0, inner).max(0.0)
        };
        let content = ContentAttrs {
            origin: Point::new(config.padding_x, 0.0),
            size: Size::new(content_width, node.cross_size),
            opacity: 1.0,
            text,
        };
        targets.contents.push((
            key.clone(),
            Target {
                enter: ContentAttrs {
                    opacity: 0.0,
                    ..content.clone()
                },
                to: content,
            },
        ));

        if let Some(parent) = layout.parent_of(node) {
            let link = LinkAttrs {
                source: parent_indicator(parent, spacing),
                target: Point::new(node.primary, node.cross + node.cross_size / 2.0),
                color,
                width,
            };
            targets.links.push((
                key,
                Target {
                    enter: LinkAttrs {
                        source: link_start,
                        target: link_start,
                        ..link
                    },
                    to: link,
                },
            ));
        }
    }

    targets
}

fn grown(circle: CircleAttrs) -> Target<CircleAttrs> {
    Target {
        enter: CircleAttrs {
            radius: 0.0,
            ..circle
        },
        to: circle,
    }
}

fn parent_indicator(parent: &Positioned, spacing_horizontal: f64) -> Point {
    Point::new(
        parent.primary + parent.primary_size - spacing_horizontal,
        parent.cross + parent.cross_size / 2.0,
    )
}

/// Joins targets into the elements of each primitive kind and records what changed.
struct Joiner {
    now: Instant,
    duration: Duration,
    mutations: Vec<Mutation>,
}

impl Joiner {
    fn record(&mut self, primitive: Primitive, key: NodePath, change: Change) {
        tracing::trace!(?primitive, %key, ?change);
        self.mutations.push(Mutation {
            primitive,
            key,
            change,
        });
    }

    /// `exit` returns where an element leaving the scene heads to, or `None` to remove it right away.
    fn apply<A, Exit>(
        &mut self,
        primitive: Primitive,
        elements: &mut BTreeMap<NodePath, Element<A>>,
        targets: Vec<(NodePath, Target<A>)>,
        exit: Exit,
    ) where
        A: Lerp + Clone + PartialEq,
        Exit: Fn(&NodePath, &A) -> Option<A>,
    {
        let join = keyed_join(elements.keys().cloned().collect::<Vec<_>>(), targets);

        for (key, target) in join.entered {
            let tween = Tween::new(target.enter, target.to, self.now, self.duration);
            elements.insert(key.clone(), Element::new(tween));
            self.record(primitive, key, Change::Create);
        }

        for (key, target) in join.retained {
            let Some(element) = elements.get_mut(&key) else {
                continue;
            };
            let revived = element.exit_at.take().is_some();
            let moved = element.tween.retarget(target.to, self.now, self.duration);
            if revived || moved {
                self.record(primitive, key, Change::Update);
            }
        }

        for key in join.exited {
            let Some(element) = elements.get_mut(&key) else {
                continue;
            };
            if element.is_exiting() {
                continue;
            }
            let current = element.tween.value(self.now);
            if let Some(to) = exit(&key, &current) {
                element.tween.retarget(to, self.now, self.duration);
                element.exit_at = Some(self.now + self.duration);
                self.record(primitive, key, Change::Exit);
            } else {
                elements.remove(&key);
                self.record(primitive, key, Change::Remove);
            }
        }
    }
}

#[cfg(test)]
fn path(ordinals: &[usize]) -> NodePath {
    NodePath::from(ordinals.to_vec())
}

#[cfg(test)]
fn pass(scene: &mut Scene, root: &mut Node, anchor: &[usize], now: Instant) -> RenderPass {
    let config = Config::default();
    let layout = crate::layout::layout(root, &config);
    reconcile(scene, &layout, root, &path(anchor), &config, now)
}

#[test]
fn first_pass_creates_everything() {
    let now = Instant::now();
    let mut root = crate::flatten::example_tree();
    let mut scene = Scene::new();
    let pass = pass(&mut scene, &mut root, &[], now);

    assert_eq!(pass.visible, 4);
    assert_eq!(pass.count(Primitive::Group, Change::Create), 4);
    assert_eq!(pass.count(Primitive::Connector, Change::Create), 4);
    assert_eq!(pass.count(Primitive::Content, Change::Create), 4);
    assert_eq!(pass.count(Primitive::Indicator, Change::Create), 4);
    assert_eq!(pass.count(Primitive::Marker, Change::Create), 0);
    assert_eq!(pass.count(Primitive::Link, Change::Create), 3);
    assert_eq!(pass.mutations.len(), 4 * 4 + 3);
}

#[test]
fn entering_groups_start_at_anchor() {
    let now = Instant::now();
    let config = Config::default();
    let mut root = crate::flatten::example_tree();
    let mut scene = Scene::new();
    let layout = crate::layout::layout(&root, &config);
    reconcile(&mut scene, &layout, &mut root, &NodePath::root(), &config, now);

    let anchor = layout.root();
    let b = layout.find(&path(&[2])).unwrap();
    let group = &scene.groups[&path(&[2])];
    assert_eq!(
        group.tween.value(now).origin,
        Point::new(
            anchor.primary_size - b.primary_size,
            anchor.cross_size / 2.0 - b.cross_size
        )
    );
    assert_eq!(group.tween.value(now + config.duration).origin, b.top_left());
}

#[test]
fn previous_positions_are_recorded() {
    let now = Instant::now();
    let mut root = crate::flatten::example_tree();
    let mut scene = Scene::new();
    pass(&mut scene, &mut root, &[], now);
    let layout = crate::layout::layout(&root, &Config::default());
    for node in layout.nodes() {
        let stored = root.descendant(node.path.ordinals()).unwrap().previous_position();
        assert_eq!(stored, Some(node.anchor()));
    }
}

#[test]
fn unchanged_pass_mutates_nothing() {
    let now = Instant::now();
    let mut root = crate::flatten::example_tree();
    let mut scene = Scene::new();
    pass(&mut scene, &mut root, &[], now);
    let second = pass(&mut scene, &mut root, &[], now + Duration::from_millis(100));
    assert!(second.is_empty(), "{:?}", second.mutations);
}

#[test]
fn collapse_exits_descendants_and_prunes_them() {
    let now = Instant::now();
    let duration = Config::default().duration;
    let mut root = crate::flatten::example_tree();
    let mut scene = Scene::new();
    root.descendant_mut(&[2]).unwrap().expanded = true;
    pass(&mut scene, &mut root, &[], now);
    assert!(scene.is_live(Primitive::Group, &path(&[2, 1])));

    root.descendant_mut(&[2]).unwrap().expanded = false;
    let later = now + duration * 2;
    let collapse = pass(&mut scene, &mut root, &[2], later);
    for primitive in [
        Primitive::Group,
        Primitive::Connector,
        Primitive::Content,
        Primitive::Indicator,
        Primitive::Link,
    ] {
        assert_eq!(collapse.count(primitive, Change::Exit), 3, "{primitive:?}");
    }
    assert_eq!(collapse.count(Primitive::Group, Change::Remove), 0);
    // b itself is filled now
    assert_eq!(
        collapse.changes_of(Primitive::Indicator, &path(&[2])).collect::<Vec<_>>(),
        [Change::Update]
    );
    assert!(scene.contains(Primitive::Group, &path(&[2, 1])));
    assert!(!scene.is_live(Primitive::Group, &path(&[2, 1])));

    // exiting groups shrink into the current position of b
    let b = crate::layout::layout(&root, &Config::default())
        .find(&path(&[2]))
        .cloned()
        .unwrap();
    let c = &scene.groups[&path(&[2, 1])];
    let target = c.tween.value(later + duration).origin;
    assert_eq!(target.x, b.primary + b.primary_size - c.tween.target().primary_size);

    scene.prune(later + duration);
    assert!(!scene.contains(Primitive::Group, &path(&[2, 1])));
    assert!(!scene.contains(Primitive::Link, &path(&[2, 2])));
    assert_eq!(scene.len(Primitive::Group), 4);
}

#[test]
fn reexpanding_while_exiting_revives() {
    let now = Instant::now();
    let mut root = crate::flatten::example_tree();
    let mut scene = Scene::new();
    root.descendant_mut(&[2]).unwrap().expanded = true;
    pass(&mut scene, &mut root, &[], now);

    root.descendant_mut(&[2]).unwrap().expanded = false;
    let collapse_at = now + Duration::from_secs(1);
    pass(&mut scene, &mut root, &[2], collapse_at);

    root.descendant_mut(&[2]).unwrap().expanded = true;
    let expand = pass(&mut scene, &mut root, &[2], collapse_at + Duration::from_millis(100));
    assert_eq!(expand.count(Primitive::Group, Change::Create), 0);
    assert_eq!(
        expand.changes_of(Primitive::Group, &path(&[2, 1])).collect::<Vec<_>>(),
        [Change::Update]
    );
    assert!(scene.is_live(Primitive::Group, &path(&[2, 1])));
    assert!(scene.is_live(Primitive::Link, &path(&[2, 3])));
}

#[test]
fn indicator_of_retained_node_is_removed_at_once() {
    let now = Instant::now();
    let mut root = crate::flatten::example_tree();
    let mut scene = Scene::new();
    pass(&mut scene, &mut root, &[], now);

    let a = root.descendant_mut(&[1]).unwrap();
    a.children = Some(Vec::new());
    a.has_fetched_children = true;
    let later = now + Duration::from_secs(1);
    let pass = pass(&mut scene, &mut root, &[1], later);
    assert_eq!(
        pass.changes_of(Primitive::Indicator, &path(&[1])).collect::<Vec<_>>(),
        [Change::Remove]
    );
    assert!(!scene.contains(Primitive::Indicator, &path(&[1])));
    assert!(pass.changes_of(Primitive::Group, &path(&[1])).next().is_none());
}

#[test]
fn placeholders_get_markers() {
    let now = Instant::now();
    let mut root = crate::flatten::example_tree();
    let mut scene = Scene::new();
    root.descendant_mut(&[1]).unwrap().expanded = true;
    let pass = pass(&mut scene, &mut root, &[], now);
    assert_eq!(pass.count(Primitive::Marker, Change::Create), 1);
    assert!(scene.is_live(Primitive::Marker, &path(&[1, 1])));
    assert!(!scene.contains(Primitive::Indicator, &path(&[1, 1])));
}

#[test]
fn link_width_thins_with_depth() {
    assert_eq!(stroke_width(0), 4.0);
    assert_eq!(stroke_width(1), 2.0);
    assert_eq!(stroke_width(2), 1.5);
    assert_eq!(stroke_width(5), 1.5);
}

#[test]
fn content_fades_in_and_out() {
    let now = Instant::now();
    let duration = Config::default().duration;
    let mut root = crate::flatten::example_tree();
    let mut scene = Scene::new();
    root.descendant_mut(&[2]).unwrap().expanded = true;
    pass(&mut scene, &mut root, &[], now);

    let c = path(&[2, 1]);
    assert_eq!(scene.contents[&c].tween.value(now).opacity, 0.0);
    assert_eq!(scene.contents[&c].tween.value(now + duration).opacity, 1.0);

    root.descendant_mut(&[2]).unwrap().expanded = false;
    let later = now + duration * 2;
    pass(&mut scene, &mut root, &[2], later);
    assert_eq!(scene.contents[&c].tween.value(later).opacity, 1.0);
    assert_eq!(scene.contents[&c].tween.value(later + duration).opacity, 0.0);
}

#[test]
fn connector_grows_from_and_shrinks_to_zero_length() {
    let now = Instant::now();
    let duration = Config::default().duration;
    let mut root = crate::flatten::example_tree();
    let mut scene = Scene::new();
    root.descendant_mut(&[2]).unwrap().expanded = true;
    pass(&mut scene, &mut root, &[], now);

    let c = path(&[2, 1]);
    let entering = scene.connectors[&c].tween.value(now);
    assert_eq!(entering.from_x, entering.to_x);
    let settled = scene.connectors[&c].tween.value(now + duration);
    assert_eq!(settled.from_x, -1.0);
    assert!(settled.to_x > settled.from_x);

    root.descendant_mut(&[2]).unwrap().expanded = false;
    let later = now + duration * 2;
    pass(&mut scene, &mut root, &[2], later);
    let exited = scene.connectors[&c].tween.value(later + duration);
    assert_eq!(exited.from_x, exited.to_x);
    assert_eq!(exited.to_x, settled.to_x);
}

#[test]
fn indicator_is_filled_only_while_collapsed() {
    let now = Instant::now();
    let mut root = crate::flatten::example_tree();
    let mut scene = Scene::new();
    pass(&mut scene, &mut root, &[], now);

    let b = path(&[2]);
    let color = (Config::default().color)(&b);
    assert_eq!(scene.indicators[&b].tween.target().fill, Some(color));
    assert_eq!(scene.indicators[&NodePath::root()].tween.target().fill, None);

    root.descendant_mut(&[2]).unwrap().expanded = true;
    pass(&mut scene, &mut root, &[2], now + Duration::from_secs(1));
    assert_eq!(scene.indicators[&b].tween.target().fill, None);
}
