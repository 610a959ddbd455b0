use std::time::Instant;

use ratatui::layout::Rect;

use crate::config::Config;
use crate::error::{DiagramError, FetchError};
use crate::expansion::{validate, ChildRecord, DataProvider, FetchRequest, FetchResolution, Revealer};
use crate::geometry::{Point, Size};
use crate::identifier::NodePath;
use crate::layout::{layout, Layout};
use crate::measure::{Measure, TextMeasure};
use crate::model::SceneModel;
use crate::node::Node;
use crate::reconcile::{reconcile, RenderPass};
use crate::scene::{Hit, Scene};
use crate::surface::Surface;
use crate::viewport::{Transform, Viewport, ViewportInput};

/// Everything a [`Diagram`](crate::Diagram) shows and remembers between frames.
///
/// All changes go through `&mut self`, so render passes never overlap.
/// Points in time are passed in explicitly. This keeps transitions reproducible.
///
/// # Example
///
/// ```
/// # use std::time::Instant;
/// # use tui_tree_diagram::{ChildRecord, Config, DiagramState, FetchResolution, NodePath};
/// let now = Instant::now();
/// let mut state = DiagramState::new(Config::default());
/// state.set_root("main", now);
///
/// let requests = state.toggle_node(&NodePath::root(), false, now).unwrap();
/// assert_eq!(requests.len(), 1);
/// assert_eq!(requests[0].key, "main");
///
/// let children = vec![ChildRecord::new("parse_args", "src/main.c", 40)];
/// for request in requests {
///     let resolution = state.resolve_fetch(request, Ok(children.clone()), now);
///     assert_eq!(resolution, FetchResolution::Spliced { children: 1 });
/// }
/// assert_eq!(state.visible_count(), 2);
/// ```
#[derive(Debug)]
pub struct DiagramState {
    config: Config,
    model: SceneModel,
    scene: Scene,
    viewport: Viewport,
    measure: Box<dyn Measure>,
    custom_measure: bool,
    layout: Option<Layout>,
    last_pass: Option<RenderPass>,
    /// Where the last frame was rendered to
    pub(crate) area: Rect,
}

impl Default for DiagramState {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

fn text_measure(config: &Config) -> Box<dyn Measure> {
    Box::new(TextMeasure::new(
        config.cell_width,
        config.cell_height,
        config.node_min_height,
    ))
}

impl DiagramState {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            measure: text_measure(&config),
            custom_measure: false,
            config,
            model: SceneModel::default(),
            scene: Scene::new(),
            viewport: Viewport::new(Instant::now()),
            layout: None,
            last_pass: None,
            area: Rect::default(),
        }
    }

    /// Measure node content with something other than terminal cells.
    #[must_use]
    pub fn with_measure(mut self, measure: impl Measure + 'static) -> Self {
        self.measure = Box::new(measure);
        self.custom_measure = true;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Apply new options to the live diagram.
    ///
    /// Existing nodes keep their measured size. The visible tree is laid out again right away.
    pub fn set_config(&mut self, config: Config, now: Instant) {
        if !self.custom_measure {
            self.measure = text_measure(&config);
        }
        self.config = config;
        self.render(&NodePath::root(), now);
    }

    #[must_use]
    pub const fn model(&self) -> &SceneModel {
        &self.model
    }

    #[must_use]
    pub const fn root(&self) -> Option<&Node> {
        self.model.root()
    }

    /// # Errors
    ///
    /// Errors when there is no tree or no node with this identity.
    pub fn node(&self, path: &NodePath) -> Result<&Node, DiagramError> {
        self.model.node(path)
    }

    #[must_use]
    pub const fn scene(&self) -> &Scene {
        &self.scene
    }

    #[must_use]
    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Layout of the last render pass.
    #[must_use]
    pub const fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    #[must_use]
    pub const fn last_pass(&self) -> Option<&RenderPass> {
        self.last_pass.as_ref()
    }

    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.layout.as_ref().map_or(0, Layout::len)
    }

    /// Replace the whole diagram by a single root which is not expanded yet.
    ///
    /// Fetches still outstanding for the previous tree are discarded once they resolve.
    pub fn set_root(&mut self, label: impl Into<String>, now: Instant) -> Option<&RenderPass> {
        let label = label.into();
        tracing::debug!(%label, "new root");
        self.model.set_root(label, &*self.measure);
        self.scene.clear();
        self.render(&NodePath::root(), now);
        self.fit(now);
        self.last_pass.as_ref()
    }

    /// Remove the tree and everything drawn for it.
    pub fn clear(&mut self) {
        self.model.clear();
        self.scene.clear();
        self.layout = None;
        self.last_pass = None;
    }

    fn render(&mut self, anchor: &NodePath, now: Instant) -> Option<&RenderPass> {
        let root = self.model.root_mut()?;
        let layout = layout(root, &self.config);
        let pass = reconcile(&mut self.scene, &layout, root, anchor, &self.config, now);
        if self.config.auto_fit {
            self.viewport.fit(layout.bounds(), &self.config, now);
        }
        self.layout = Some(layout);
        Some(self.last_pass.insert(pass))
    }

    /// Expand or collapse a node.
    ///
    /// `modifier` inverts [`Config::toggle_recursively`] for this toggle.
    ///
    /// Expanding a node whose children were never fetched only marks it as fetching and returns a request for them.
    /// The node stays collapsed until the request is handed back to [`resolve_fetch`](Self::resolve_fetch).
    /// Toggling a node while its fetch is outstanding does nothing.
    ///
    /// # Errors
    ///
    /// Errors when there is no tree or no node with this identity.
    pub fn toggle_node(
        &mut self,
        path: &NodePath,
        modifier: bool,
        now: Instant,
    ) -> Result<Vec<FetchRequest>, DiagramError> {
        let recursive = self.config.toggle_recursively ^ modifier;
        let fetch_descendants = self.config.fetch_on_recursive_expand;
        let epoch = self.model.epoch();
        let node = self.model.node_mut(path)?;

        if node.is_placeholder {
            return Ok(Vec::new());
        }
        if node.fetching {
            tracing::debug!(%path, "fetch outstanding, toggle ignored");
            return Ok(Vec::new());
        }

        let mut requests = Vec::new();
        if node.expanded {
            tracing::debug!(%path, recursive, "collapse");
            node.expanded = false;
            if recursive {
                node.for_each_mut(&mut |node| node.expanded = false);
            }
        } else if node.has_fetched_children {
            tracing::debug!(%path, recursive, "expand");
            node.expanded = true;
            if recursive {
                expand_below(node, fetch_descendants, epoch, &mut requests);
            }
        } else {
            tracing::debug!(%path, key = %node.label, "fetch children");
            node.fetching = true;
            requests.push(FetchRequest {
                path: path.clone(),
                key: node.label.clone(),
                epoch,
            });
            return Ok(requests);
        }

        self.render(path, now);
        Ok(requests)
    }

    /// Install the outcome of a [`FetchRequest`].
    ///
    /// Either all children are installed and the node is expanded or nothing changes at all.
    pub fn resolve_fetch(
        &mut self,
        request: FetchRequest,
        result: Result<Vec<ChildRecord>, FetchError>,
        now: Instant,
    ) -> FetchResolution {
        let FetchRequest { path, key, epoch } = request;
        if epoch != self.model.epoch() {
            tracing::debug!(%path, %key, "fetch for a replaced tree discarded");
            return FetchResolution::Discarded;
        }
        let visible = self.model.is_visible(&path);
        let Ok(node) = self.model.node_mut(&path) else {
            return FetchResolution::Discarded;
        };
        if !node.fetching {
            return FetchResolution::Discarded;
        }
        node.fetching = false;
        if !visible {
            tracing::debug!(%path, %key, "fetch for a hidden node discarded");
            return FetchResolution::Discarded;
        }

        let records = match result.and_then(|records| validate(&records).map(|()| records)) {
            Ok(records) => records,
            Err(error) => {
                tracing::warn!(%path, %key, %error, "fetching children failed");
                return FetchResolution::Failed(error);
            }
        };

        let children = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                Node::unfetched(
                    path.child(index + 1),
                    record.label,
                    Some(record.locator),
                    &*self.measure,
                )
            })
            .collect::<Vec<_>>();
        let count = children.len();
        node.children = Some(children);
        node.has_fetched_children = true;
        node.expanded = true;
        tracing::debug!(%path, %key, children = count, "children spliced");

        self.render(&path, now);
        FetchResolution::Spliced { children: count }
    }

    /// Toggle a node and fetch whatever it needs from `provider` right away.
    ///
    /// Requests are awaited one after another.
    ///
    /// # Errors
    ///
    /// Errors when there is no tree or no node with this identity.
    pub async fn toggle_node_with<P>(
        &mut self,
        path: &NodePath,
        modifier: bool,
        provider: &P,
    ) -> Result<Vec<FetchResolution>, DiagramError>
    where
        P: DataProvider,
    {
        let requests = self.toggle_node(path, modifier, Instant::now())?;
        let mut resolutions = Vec::with_capacity(requests.len());
        for request in requests {
            let result = provider.fetch_children(&request.key).await;
            resolutions.push(self.resolve_fetch(request, result, Instant::now()));
        }
        Ok(resolutions)
    }

    /// Scale and center the visible tree into the canvas.
    ///
    /// Returns `false` when that is not possible yet. The fit is then done on the next [`resize`](Self::resize).
    pub fn fit(&mut self, now: Instant) -> bool {
        // Without a tree the extent is empty, so the fit waits like one without a canvas
        let bounds = self.layout.as_ref().map(Layout::bounds).unwrap_or_default();
        self.viewport.fit(bounds, &self.config, now)
    }

    /// Tell the diagram how large its canvas is, in diagram units.
    ///
    /// Returns `true` when the size changed.
    pub fn resize(&mut self, canvas: Size, now: Instant) -> bool {
        let changed = self.viewport.resize(canvas);
        if changed && (self.config.auto_fit || self.viewport.is_fit_deferred()) {
            self.fit(now);
        }
        changed
    }

    /// Pan or zoom. Returns `true` when the view changed.
    pub fn handle_input(&mut self, input: ViewportInput, now: Instant) -> bool {
        self.viewport.handle(input, &self.config, now)
    }

    #[must_use]
    pub fn transform(&self, now: Instant) -> Transform {
        self.viewport.transform(now)
    }

    /// Something is still moving, so another frame should be drawn.
    #[must_use]
    pub fn is_animating(&self, now: Instant) -> bool {
        self.scene.is_animating(now) || self.viewport.transform(now) != self.viewport.target()
    }

    /// Drop every element whose exit transition is over.
    pub fn prune(&mut self, now: Instant) {
        self.scene.prune(now);
    }

    /// Drop finished exits and draw the scene as it is at `now`.
    pub fn draw(&mut self, now: Instant, surface: &mut dyn Surface) {
        self.prune(now);
        self.paint(now, surface);
    }

    pub(crate) fn paint(&self, now: Instant, surface: &mut dyn Surface) {
        let transform = self.viewport.transform(now);
        self.scene.draw(now, &transform, surface);
    }

    /// Canvas point at the center of a terminal cell of the last rendered frame.
    ///
    /// `None` when the cell is outside of the diagram.
    #[must_use]
    pub fn point_at(&self, column: u16, row: u16) -> Option<Point> {
        let inside = column >= self.area.x
            && column < self.area.right()
            && row >= self.area.y
            && row < self.area.bottom();
        inside.then(|| {
            Point::new(
                (f64::from(column - self.area.x) + 0.5) * self.config.cell_width,
                (f64::from(row - self.area.y) + 0.5) * self.config.cell_height,
            )
        })
    }

    /// What is at the canvas point `point`.
    #[must_use]
    pub fn hit_test(&self, point: Point, now: Instant) -> Option<Hit> {
        let transform = self.viewport.transform(now);
        let tolerance = self.config.cell_width.hypot(self.config.cell_height) / 2.0 / transform.k;
        self.scene.hit_test(transform.invert(point), tolerance, now)
    }

    /// Hand the source location of a node to `revealer`.
    ///
    /// Returns `false` when the node has no location.
    ///
    /// # Errors
    ///
    /// Errors when there is no tree or no node with this identity.
    pub fn activate_content(
        &self,
        path: &NodePath,
        revealer: &mut impl Revealer,
    ) -> Result<bool, DiagramError> {
        let Some(locator) = self.model.node(path)?.locator() else {
            return Ok(false);
        };
        tracing::debug!(%path, file = %locator.file, line = locator.line, "reveal");
        revealer.reveal_location(locator);
        Ok(true)
    }
}

/// Expand everything fetched below `node`. Unfetched nodes are requested when `fetch` is set.
fn expand_below(node: &mut Node, fetch: bool, epoch: u64, requests: &mut Vec<FetchRequest>) {
    let Some(children) = node.children.as_mut() else {
        return;
    };
    for child in children {
        if child.is_placeholder {
            continue;
        }
        if child.has_fetched_children {
            child.expanded = true;
            expand_below(child, fetch, epoch, requests);
        } else if fetch && !child.fetching {
            child.fetching = true;
            requests.push(FetchRequest {
                path: child.path.clone(),
                key: child.label.clone(),
                epoch,
            });
        }
    }
}

#[cfg(test)]
fn callees(key: &str) -> Result<Vec<ChildRecord>, FetchError> {
    match key {
        "main" => Ok(vec![
            ChildRecord::new("X", "main.c", 3),
            ChildRecord::new("Y", "main.c", 4),
        ]),
        "X" => Ok(vec![
            ChildRecord::new("X1", "x.c", 10),
            ChildRecord::new("X2", "x.c", 20),
        ]),
        "Y" => Ok(vec![ChildRecord::new("Y1", "y.c", 7)]),
        "broken" => Err(FetchError::Rejected("symbol lookup failed".to_owned())),
        "garbage" => Ok(vec![ChildRecord::new("ok", "g.c", 1), ChildRecord::new("", "g.c", 2)]),
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
struct Callees;

#[cfg(test)]
impl DataProvider for Callees {
    async fn fetch_children(&self, key: &str) -> Result<Vec<ChildRecord>, FetchError> {
        callees(key)
    }
}

#[cfg(test)]
fn toggle(state: &mut DiagramState, path: &str, now: Instant) -> Vec<FetchResolution> {
    let requests = state.toggle_node(&path.parse().unwrap(), false, now).unwrap();
    requests
        .into_iter()
        .map(|request| {
            let result = callees(&request.key);
            state.resolve_fetch(request, result, now)
        })
        .collect()
}

#[cfg(test)]
fn visible_paths(state: &DiagramState) -> Vec<String> {
    state
        .layout()
        .unwrap()
        .nodes()
        .iter()
        .map(|node| node.path.to_string())
        .collect()
}

#[cfg(test)]
fn example_state(now: Instant) -> DiagramState {
    let mut state = DiagramState::new(Config::default());
    state.set_root("main", now);
    toggle(&mut state, "", now);
    state
}

#[test]
fn set_root_shows_root_only() {
    let now = Instant::now();
    let mut state = DiagramState::new(Config::default());
    let pass = state.set_root("main", now).unwrap();
    assert_eq!(pass.visible, 1);
    assert_eq!(visible_paths(&state), [""]);
    let root = state.root().unwrap();
    assert!(!root.is_expanded());
    assert!(root.child(1).unwrap().is_placeholder());
}

#[test]
fn expanding_assigns_ordinal_identities() {
    let now = Instant::now();
    let mut state = example_state(now);
    assert_eq!(visible_paths(&state), ["", "1", "2"]);
    assert_eq!(state.node(&"1".parse().unwrap()).unwrap().label(), "X");

    let resolutions = toggle(&mut state, "1", now);
    assert_eq!(resolutions, [FetchResolution::Spliced { children: 2 }]);
    assert_eq!(visible_paths(&state), ["", "1", "1.1", "1.2", "2"]);
    assert_eq!(state.node(&"1.2".parse().unwrap()).unwrap().label(), "X2");
}

#[test]
fn collapse_keeps_fetched_children() {
    let now = Instant::now();
    let mut state = example_state(now);
    toggle(&mut state, "1", now);
    let x1: NodePath = "1.1".parse().unwrap();
    assert!(state.scene().is_live(crate::Primitive::Group, &x1));

    let requests = state.toggle_node(&"1".parse().unwrap(), false, now).unwrap();
    assert!(requests.is_empty());
    assert_eq!(visible_paths(&state), ["", "1", "2"]);
    assert!(!state.scene().is_live(crate::Primitive::Group, &x1));
    assert!(!state.scene().is_live(crate::Primitive::Content, &x1));
    let x = state.node(&"1".parse().unwrap()).unwrap();
    assert!(x.has_fetched_children());
    assert!(!x.is_expanded());

    // no new fetch on the way back
    let requests = state.toggle_node(&"1".parse().unwrap(), false, now).unwrap();
    assert!(requests.is_empty());
    assert_eq!(visible_paths(&state), ["", "1", "1.1", "1.2", "2"]);
}

#[test]
fn sibling_expansions_keep_identities() {
    let now = Instant::now();
    let mut state = example_state(now);
    toggle(&mut state, "1", now);
    let positions = |state: &DiagramState| {
        ["1", "1.1", "1.2"].map(|path| {
            let path: NodePath = path.parse().unwrap();
            state.layout().unwrap().find(&path).unwrap().anchor()
        })
    };
    let before = positions(&state);

    toggle(&mut state, "2", now);
    assert_eq!(visible_paths(&state), ["", "1", "1.1", "1.2", "2", "2.1"]);
    assert_eq!(state.node(&"1.1".parse().unwrap()).unwrap().label(), "X1");
    assert_eq!(state.node(&"2.1".parse().unwrap()).unwrap().label(), "Y1");

    // the subtree of X only moves along with its recentered parent
    let after = positions(&state);
    let shift = after[0].y - before[0].y;
    for (before, after) in before.iter().zip(&after) {
        assert_eq!(after.x, before.x);
        assert!((after.y - before.y - shift).abs() < 1e-9, "{before:?} -> {after:?}");
    }
}

#[test]
fn collapse_hides_exactly_the_descendants() {
    let now = Instant::now();
    let mut state = example_state(now);
    toggle(&mut state, "1", now);
    toggle(&mut state, "2", now);
    let x: NodePath = "1".parse().unwrap();
    let before = state.visible_count();
    let below = state
        .layout()
        .unwrap()
        .nodes()
        .iter()
        .filter(|node| node.path.is_descendant_of(&x))
        .count();
    assert_eq!(below, 2);

    toggle(&mut state, "1", now);
    assert_eq!(state.visible_count(), before - below);
}

#[test]
fn rejected_fetch_changes_nothing() {
    let now = Instant::now();
    let mut state = DiagramState::new(Config::default());
    state.set_root("broken", now);
    let resolutions = toggle(&mut state, "", now);
    assert_eq!(
        resolutions,
        [FetchResolution::Failed(FetchError::Rejected(
            "symbol lookup failed".to_owned()
        ))]
    );
    let root = state.root().unwrap();
    assert!(!root.is_expanded());
    assert!(!root.is_fetching());
    assert!(!root.has_fetched_children());
    assert!(root.child(1).unwrap().is_placeholder());
    assert_eq!(visible_paths(&state), [""]);

    // a later toggle asks again
    let requests = state.toggle_node(&NodePath::root(), false, now).unwrap();
    assert_eq!(requests.len(), 1);
}

#[test]
fn malformed_records_are_not_installed() {
    let now = Instant::now();
    let mut state = DiagramState::new(Config::default());
    state.set_root("garbage", now);
    let resolutions = toggle(&mut state, "", now);
    assert!(matches!(
        resolutions[..],
        [FetchResolution::Failed(FetchError::Malformed { index: 1, .. })]
    ));
    assert_eq!(state.root().unwrap().children().len(), 1);
}

#[test]
fn toggle_during_fetch_is_ignored() {
    let now = Instant::now();
    let mut state = DiagramState::new(Config::default());
    state.set_root("main", now);
    let requests = state.toggle_node(&NodePath::root(), false, now).unwrap();
    assert!(state.root().unwrap().is_fetching());
    assert!(state
        .toggle_node(&NodePath::root(), false, now)
        .unwrap()
        .is_empty());
    for request in requests {
        state.resolve_fetch(request, callees("main"), now);
    }
    assert_eq!(visible_paths(&state), ["", "1", "2"]);
}

#[test]
fn fetch_for_replaced_root_is_discarded() {
    let now = Instant::now();
    let mut state = DiagramState::new(Config::default());
    state.set_root("main", now);
    let requests = state.toggle_node(&NodePath::root(), false, now).unwrap();
    state.set_root("main", now);
    for request in requests {
        assert_eq!(
            state.resolve_fetch(request, callees("main"), now),
            FetchResolution::Discarded
        );
    }
    assert_eq!(visible_paths(&state), [""]);
}

#[test]
fn fetch_for_hidden_node_is_discarded() {
    let now = Instant::now();
    let mut state = example_state(now);
    let requests = state.toggle_node(&"1".parse().unwrap(), false, now).unwrap();
    state.toggle_node(&NodePath::root(), false, now).unwrap();
    for request in requests {
        assert_eq!(
            state.resolve_fetch(request, callees("X"), now),
            FetchResolution::Discarded
        );
    }
    let x = state.node(&"1".parse().unwrap()).unwrap();
    assert!(!x.is_fetching());
    assert!(!x.has_fetched_children());
}

#[test]
fn recursive_toggle_cascades_to_fetched_descendants() {
    let now = Instant::now();
    let mut state = example_state(now);
    toggle(&mut state, "1", now);
    toggle(&mut state, "2", now);

    let root = NodePath::root();
    assert!(state.toggle_node(&root, true, now).unwrap().is_empty());
    assert_eq!(visible_paths(&state), [""]);
    assert!(!state.node(&"1".parse().unwrap()).unwrap().is_expanded());

    // unfetched descendants are left alone
    assert!(state.toggle_node(&root, true, now).unwrap().is_empty());
    assert_eq!(visible_paths(&state), ["", "1", "1.1", "1.2", "2", "2.1"]);
}

#[test]
fn recursive_expand_can_fetch_descendants() {
    let now = Instant::now();
    let config = Config::default().fetch_on_recursive_expand(true);
    let mut state = DiagramState::new(config);
    state.set_root("main", now);
    toggle(&mut state, "", now);
    state.toggle_node(&NodePath::root(), false, now).unwrap();

    let requests = state.toggle_node(&NodePath::root(), true, now).unwrap();
    let keys = requests.iter().map(|request| request.key.as_str()).collect::<Vec<_>>();
    assert_eq!(keys, ["X", "Y"]);
    for request in requests {
        let result = callees(&request.key);
        state.resolve_fetch(request, result, now);
    }
    assert_eq!(visible_paths(&state), ["", "1", "1.1", "1.2", "2", "2.1"]);
}

#[test]
fn identities_stay_unique() {
    let now = Instant::now();
    let mut state = example_state(now);
    for path in ["1", "2", "1.1", "1", "2.1", "1", "", ""] {
        toggle(&mut state, path, now);
        crate::unique_identifiers::assert_unique(
            state.layout().unwrap().nodes().iter().map(|node| &node.path),
        );
    }
}

#[test]
fn misuse_is_reported() {
    let now = Instant::now();
    let mut state = DiagramState::new(Config::default());
    assert_eq!(
        state.toggle_node(&NodePath::root(), false, now).unwrap_err(),
        DiagramError::NoRoot
    );
    state.set_root("main", now);
    let unknown: NodePath = "7".parse().unwrap();
    assert_eq!(
        state.toggle_node(&unknown, false, now).unwrap_err(),
        DiagramError::UnknownNode(unknown)
    );
}

#[test]
fn activation_reveals_locator() {
    let now = Instant::now();
    let state = example_state(now);
    let mut revealed = Vec::new();
    let mut revealer = |locator: &crate::Locator| revealed.push(locator.clone());
    assert_eq!(
        state.activate_content(&"2".parse().unwrap(), &mut revealer),
        Ok(true)
    );
    assert_eq!(state.activate_content(&NodePath::root(), &mut revealer), Ok(false));
    assert_eq!(revealed, [crate::Locator::new("main.c", 4)]);
}

#[test]
fn fit_waits_for_canvas() {
    let now = Instant::now();
    let mut state = DiagramState::new(Config::default());
    state.set_root("main", now);
    assert!(state.viewport().is_fit_deferred());
    assert!(state.resize(Size::new(800.0, 400.0), now));
    assert!(!state.viewport().is_fit_deferred());
    assert_ne!(state.viewport().target(), Transform::IDENTITY);
}

#[test]
fn fit_without_tree_waits_for_root() {
    let now = Instant::now();
    let mut state = DiagramState::new(Config::default());
    state.resize(Size::new(800.0, 400.0), now);
    assert!(!state.fit(now));
    assert!(state.viewport().is_fit_deferred());

    state.set_root("main", now);
    assert!(!state.viewport().is_fit_deferred());
    assert_ne!(state.viewport().target(), Transform::IDENTITY);
}

#[test]
fn hit_test_finds_indicator_of_root() {
    let now = Instant::now();
    let config = Config::default().duration(std::time::Duration::ZERO);
    let mut state = DiagramState::new(config.clone());
    state.set_root("main", now);
    let root = state.layout().unwrap().root().clone();
    let indicator = Point::new(
        root.primary + root.primary_size - config.spacing_horizontal,
        root.cross + root.cross_size / 2.0,
    );
    let point = state.transform(now).apply(indicator);
    assert_eq!(
        state.hit_test(point, now),
        Some(Hit::Indicator(NodePath::root()))
    );
}

#[cfg(test)]
#[tokio::test]
async fn provider_drives_expansion() {
    let mut state = DiagramState::new(Config::default());
    state.set_root("main", Instant::now());
    let resolutions = state
        .toggle_node_with(&NodePath::root(), false, &Callees)
        .await
        .unwrap();
    assert_eq!(resolutions, [FetchResolution::Spliced { children: 2 }]);

    let resolutions = state
        .toggle_node_with(&"1".parse().unwrap(), false, &Callees)
        .await
        .unwrap();
    assert_eq!(resolutions, [FetchResolution::Spliced { children: 2 }]);
    assert_eq!(visible_paths(&state), ["", "1", "1.1", "1.2", "2"]);

    // collapsing needs no provider round trip
    let resolutions = state
        .toggle_node_with(&"1".parse().unwrap(), false, &Callees)
        .await
        .unwrap();
    assert!(resolutions.is_empty());
}

#[cfg(test)]
#[tokio::test]
async fn provider_failure_is_reported() {
    let mut state = DiagramState::new(Config::default());
    state.set_root("broken", Instant::now());
    let resolutions = state
        .toggle_node_with(&NodePath::root(), false, &Callees)
        .await
        .unwrap();
    assert!(matches!(resolutions[..], [FetchResolution::Failed(_)]));
    assert!(!state.root().unwrap().is_expanded());
}
