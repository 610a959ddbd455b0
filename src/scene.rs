use std::collections::BTreeMap;
use std::time::Instant;

use ratatui::style::Color;
use ratatui::text::Text;

use crate::geometry::{Point, Size};
use crate::identifier::NodePath;
use crate::surface::{Stroke, Surface};
use crate::tween::{Lerp, Tween};
use crate::viewport::Transform;

/// Kinds of drawn elements. Each kind is keyed by the [`NodePath`] of its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Primitive {
    /// Positions everything else belonging to a node
    Group,
    /// Underline of the node box
    Connector,
    /// Circle to expand or collapse the node
    Indicator,
    /// Dot shown in place of children which were not fetched yet
    Marker,
    /// The text of the node
    Content,
    /// Curve from the parent to the node
    Link,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Change {
    Create,
    Update,
    /// Transition towards removal started
    Exit,
    /// Removed without a transition
    Remove,
}

/// One change a render pass made to the scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mutation {
    pub primitive: Primitive,
    pub key: NodePath,
    pub change: Change,
}

/// What is at a given point of the canvas.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Hit {
    Indicator(NodePath),
    Content(NodePath),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Element<A> {
    pub(crate) tween: Tween<A>,
    /// Set while exiting: the element is gone from then on
    pub(crate) exit_at: Option<Instant>,
}

impl<A> Element<A>
where
    A: Lerp + Clone + PartialEq,
{
    pub(crate) const fn new(tween: Tween<A>) -> Self {
        Self {
            tween,
            exit_at: None,
        }
    }

    pub(crate) const fn is_exiting(&self) -> bool {
        self.exit_at.is_some()
    }

    fn is_gone(&self, now: Instant) -> bool {
        self.exit_at.is_some_and(|exit_at| exit_at <= now)
    }
}

/// Upper left corner of a node box in diagram space. The extents are kept to place exit transitions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GroupAttrs {
    pub(crate) origin: Point,
    pub(crate) primary_size: f64,
    pub(crate) cross_size: f64,
}

impl Lerp for GroupAttrs {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        Self {
            origin: self.origin.lerp(&to.origin, t),
            primary_size: to.primary_size,
            cross_size: to.cross_size,
        }
    }
}

/// Horizontal line relative to the group origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ConnectorAttrs {
    pub(crate) from_x: f64,
    pub(crate) to_x: f64,
    pub(crate) y: f64,
    pub(crate) color: Color,
    pub(crate) width: f64,
}

impl Lerp for ConnectorAttrs {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        Self {
            from_x: self.from_x.lerp(&to.from_x, t),
            to_x: self.to_x.lerp(&to.to_x, t),
            y: self.y.lerp(&to.y, t),
            color: to.color,
            width: self.width.lerp(&to.width, t),
        }
    }
}

/// Circle relative to the group origin. Used by indicators and markers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CircleAttrs {
    pub(crate) center: Point,
    pub(crate) radius: f64,
    pub(crate) color: Color,
    pub(crate) fill: Option<Color>,
    pub(crate) stroke_width: f64,
}

impl Lerp for CircleAttrs {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        Self {
            center: self.center.lerp(&to.center, t),
            radius: self.radius.lerp(&to.radius, t),
            color: to.color,
            fill: to.fill,
            stroke_width: self.stroke_width.lerp(&to.stroke_width, t),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ContentAttrs {
    pub(crate) origin: Point,
    pub(crate) size: Size,
    pub(crate) opacity: f64,
    pub(crate) text: Text<'static>,
}

impl Lerp for ContentAttrs {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        Self {
            origin: self.origin.lerp(&to.origin, t),
            size: self.size.lerp(&to.size, t),
            opacity: self.opacity.lerp(&to.opacity, t),
            text: to.text.clone(),
        }
    }
}

/// Curve in diagram space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LinkAttrs {
    pub(crate) source: Point,
    pub(crate) target: Point,
    pub(crate) color: Color,
    pub(crate) width: f64,
}

impl Lerp for LinkAttrs {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        Self {
            source: self.source.lerp(&to.source, t),
            target: self.target.lerp(&to.target, t),
            color: to.color,
            width: self.width.lerp(&to.width, t),
        }
    }
}

/// The persistent set of drawn elements.
///
/// Only [`reconcile`](crate::reconcile) changes what is in here. Everything else reads it at a point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub(crate) groups: BTreeMap<NodePath, Element<GroupAttrs>>,
    pub(crate) connectors: BTreeMap<NodePath, Element<ConnectorAttrs>>,
    pub(crate) indicators: BTreeMap<NodePath, Element<CircleAttrs>>,
    pub(crate) markers: BTreeMap<NodePath, Element<CircleAttrs>>,
    pub(crate) contents: BTreeMap<NodePath, Element<ContentAttrs>>,
    pub(crate) links: BTreeMap<NodePath, Element<LinkAttrs>>,
}

fn prune_finished<A>(elements: &mut BTreeMap<NodePath, Element<A>>, now: Instant) -> usize
where
    A: Lerp + Clone + PartialEq,
{
    let before = elements.len();
    elements.retain(|_, element| !element.is_gone(now));
    before - elements.len()
}

fn is_live<A>(elements: &BTreeMap<NodePath, Element<A>>, key: &NodePath) -> bool {
    elements
        .get(key)
        .is_some_and(|element| element.exit_at.is_none())
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
            && self.connectors.is_empty()
            && self.indicators.is_empty()
            && self.markers.is_empty()
            && self.contents.is_empty()
            && self.links.is_empty()
    }

    /// Number of elements of a kind, exiting ones included.
    #[must_use]
    pub fn len(&self, primitive: Primitive) -> usize {
        match primitive {
            Primitive::Group => self.groups.len(),
            Primitive::Connector => self.connectors.len(),
            Primitive::Indicator => self.indicators.len(),
            Primitive::Marker => self.markers.len(),
            Primitive::Content => self.contents.len(),
            Primitive::Link => self.links.len(),
        }
    }

    /// The element exists and is not on its way out.
    #[must_use]
    pub fn is_live(&self, primitive: Primitive, key: &NodePath) -> bool {
        match primitive {
            Primitive::Group => is_live(&self.groups, key),
            Primitive::Connector => is_live(&self.connectors, key),
            Primitive::Indicator => is_live(&self.indicators, key),
            Primitive::Marker => is_live(&self.markers, key),
            Primitive::Content => is_live(&self.contents, key),
            Primitive::Link => is_live(&self.links, key),
        }
    }

    /// The element exists, possibly still exiting.
    #[must_use]
    pub fn contains(&self, primitive: Primitive, key: &NodePath) -> bool {
        match primitive {
            Primitive::Group => self.groups.contains_key(key),
            Primitive::Connector => self.connectors.contains_key(key),
            Primitive::Indicator => self.indicators.contains_key(key),
            Primitive::Marker => self.markers.contains_key(key),
            Primitive::Content => self.contents.contains_key(key),
            Primitive::Link => self.links.contains_key(key),
        }
    }

    /// Some element is still moving or exiting at `now`.
    #[must_use]
    pub fn is_animating(&self, now: Instant) -> bool {
        fn moving<A: Lerp + Clone + PartialEq>(
            elements: &BTreeMap<NodePath, Element<A>>,
            now: Instant,
        ) -> bool {
            elements
                .values()
                .any(|element| element.is_exiting() || !element.tween.is_finished(now))
        }
        moving(&self.groups, now)
            || moving(&self.connectors, now)
            || moving(&self.indicators, now)
            || moving(&self.markers, now)
            || moving(&self.contents, now)
            || moving(&self.links, now)
    }

    /// Drop every element whose exit transition is over. Returns how many were dropped.
    pub fn prune(&mut self, now: Instant) -> usize {
        let pruned = prune_finished(&mut self.groups, now)
            + prune_finished(&mut self.connectors, now)
            + prune_finished(&mut self.indicators, now)
            + prune_finished(&mut self.markers, now)
            + prune_finished(&mut self.contents, now)
            + prune_finished(&mut self.links, now);
        if pruned > 0 {
            tracing::trace!(pruned, "finished exits dropped");
        }
        pruned
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Draw everything as it is at `now`.
    ///
    /// Links go first so node boxes are drawn on top of them.
    pub fn draw(&self, now: Instant, transform: &Transform, surface: &mut dyn Surface) {
        let k = transform.k;

        for link in self.links.values() {
            let link = link.tween.value(now);
            let source = transform.apply(link.source);
            let target = transform.apply(link.target);
            let middle = (source.x + target.x) / 2.0;
            surface.curve(
                source,
                Point::new(middle, source.y),
                Point::new(middle, target.y),
                target,
                Stroke {
                    color: link.color,
                    width: link.width * k,
                },
            );
        }

        for (path, group) in &self.groups {
            let origin = group.tween.value(now).origin;

            if let Some(connector) = self.connectors.get(path) {
                let connector = connector.tween.value(now);
                surface.line(
                    transform.apply(origin.offset(connector.from_x, connector.y)),
                    transform.apply(origin.offset(connector.to_x, connector.y)),
                    Stroke {
                        color: connector.color,
                        width: connector.width * k,
                    },
                );
            }

            for circle in [self.indicators.get(path), self.markers.get(path)]
                .into_iter()
                .flatten()
            {
                let circle = circle.tween.value(now);
                if circle.radius <= 0.0 {
                    continue;
                }
                surface.circle(
                    transform.apply(origin.offset(circle.center.x, circle.center.y)),
                    circle.radius * k,
                    Stroke {
                        color: circle.color,
                        width: circle.stroke_width * k,
                    },
                    circle.fill,
                );
            }

            if let Some(content) = self.contents.get(path) {
                let content = content.tween.value(now);
                let size = Size::new(content.size.width * k, content.size.height * k);
                surface.content(
                    transform.apply(origin.offset(content.origin.x, content.origin.y)),
                    size,
                    &content.text,
                    content.opacity,
                );
            }
        }
    }

    /// Find what is at `point` (diagram space) at `now`.
    ///
    /// Indicators win over content. The nearest indicator within reach is picked.
    /// `tolerance` widens small targets. Exiting elements are never hit.
    #[must_use]
    pub fn hit_test(&self, point: Point, tolerance: f64, now: Instant) -> Option<Hit> {
        let mut nearest: Option<(f64, &NodePath)> = None;
        for (path, indicator) in &self.indicators {
            if indicator.is_exiting() {
                continue;
            }
            let Some(origin) = self.live_origin(path, now) else {
                continue;
            };
            let circle = indicator.tween.value(now);
            let center = origin.offset(circle.center.x, circle.center.y);
            let distance = (point.x - center.x).hypot(point.y - center.y);
            if distance <= circle.radius.max(tolerance)
                && nearest.map_or(true, |(best, _)| distance < best)
            {
                nearest = Some((distance, path));
            }
        }
        if let Some((_, path)) = nearest {
            return Some(Hit::Indicator(path.clone()));
        }

        self.contents.iter().find_map(|(path, content)| {
            if content.is_exiting() {
                return None;
            }
            let origin = self.live_origin(path, now)?;
            let content = content.tween.value(now);
            let top_left = origin.offset(content.origin.x, content.origin.y);
            let inside = point.x >= top_left.x - tolerance
                && point.x <= top_left.x + content.size.width + tolerance
                && point.y >= top_left.y
                && point.y <= top_left.y + content.size.height;
            inside.then(|| Hit::Content(path.clone()))
        })
    }

    fn live_origin(&self, path: &NodePath, now: Instant) -> Option<Point> {
        let group = self.groups.get(path)?;
        if group.is_exiting() {
            return None;
        }
        Some(group.tween.value(now).origin)
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingSurface {
    pub(crate) lines: Vec<(Point, Point)>,
    pub(crate) curves: Vec<(Point, Point)>,
    pub(crate) circles: Vec<(Point, f64, Option<Color>)>,
    pub(crate) contents: Vec<(Point, String, f64)>,
}

#[cfg(test)]
impl Surface for RecordingSurface {
    fn line(&mut self, from: Point, to: Point, _stroke: Stroke) {
        self.lines.push((from, to));
    }

    fn curve(&mut self, from: Point, _control1: Point, _control2: Point, to: Point, _stroke: Stroke) {
        self.curves.push((from, to));
    }

    fn circle(&mut self, center: Point, radius: f64, _stroke: Stroke, fill: Option<Color>) {
        self.circles.push((center, radius, fill));
    }

    fn content(&mut self, origin: Point, _size: Size, text: &Text<'_>, opacity: f64) {
        let text = text
            .lines
            .iter()
            .flat_map(|line| line.spans.iter().map(|span| span.content.to_string()))
            .collect::<String>();
        self.contents.push((origin, text, opacity));
    }
}

#[cfg(test)]
fn example_scene(now: Instant) -> Scene {
    let key = NodePath::from(vec![1]);
    let mut scene = Scene::new();
    scene.groups.insert(
        key.clone(),
        Element::new(Tween::settled(
            GroupAttrs {
                origin: Point::new(100.0, 10.0),
                primary_size: 120.0,
                cross_size: 16.0,
            },
            now,
        )),
    );
    scene.indicators.insert(
        key.clone(),
        Element::new(Tween::settled(
            CircleAttrs {
                center: Point::new(40.0, 16.0),
                radius: 6.0,
                color: Color::Red,
                fill: Some(Color::Red),
                stroke_width: 1.5,
            },
            now,
        )),
    );
    scene.contents.insert(
        key,
        Element::new(Tween::settled(
            ContentAttrs {
                origin: Point::new(8.0, 0.0),
                size: Size::new(24.0, 16.0),
                opacity: 1.0,
                text: Text::raw("foo"),
            },
            now,
        )),
    );
    scene
}

#[test]
fn draw_applies_group_origin_and_transform() {
    let now = Instant::now();
    let scene = example_scene(now);
    let mut surface = RecordingSurface::default();
    let transform = Transform {
        x: 5.0,
        y: 0.0,
        k: 2.0,
    };
    scene.draw(now, &transform, &mut surface);
    assert_eq!(
        surface.circles,
        [(Point::new(5.0 + 140.0 * 2.0, 26.0 * 2.0), 12.0, Some(Color::Red))]
    );
    assert_eq!(
        surface.contents,
        [(Point::new(5.0 + 108.0 * 2.0, 20.0), "foo".to_owned(), 1.0)]
    );
}

#[test]
fn hit_test_prefers_indicator() {
    let now = Instant::now();
    let scene = example_scene(now);
    let key = NodePath::from(vec![1]);
    assert_eq!(
        scene.hit_test(Point::new(141.0, 25.0), 0.0, now),
        Some(Hit::Indicator(key.clone()))
    );
    assert_eq!(
        scene.hit_test(Point::new(115.0, 15.0), 0.0, now),
        Some(Hit::Content(key))
    );
    assert_eq!(scene.hit_test(Point::new(0.0, 0.0), 0.0, now), None);
}

#[test]
fn exiting_elements_are_not_hit_and_get_pruned() {
    let now = Instant::now();
    let mut scene = example_scene(now);
    let later = now + std::time::Duration::from_millis(10);
    for group in scene.groups.values_mut() {
        group.exit_at = Some(later);
    }
    assert_eq!(scene.hit_test(Point::new(141.0, 25.0), 0.0, now), None);
    assert_eq!(scene.prune(now), 0);
    assert_eq!(scene.prune(later), 1);
    assert!(!scene.contains(Primitive::Group, &NodePath::from(vec![1])));
}

#[test]
fn scene_with_any_element_is_not_empty() {
    let now = Instant::now();
    let mut scene = example_scene(now);
    assert!(!scene.is_empty());
    scene.groups.clear();
    // an indicator and content are left
    assert!(!scene.is_empty());
    scene.clear();
    assert!(scene.is_empty());
}
