/*!
Widget showing lazily expanded tree diagrams.

The tree starts with a single root.
Expanding a node the first time asks a [`DataProvider`] for its children, so huge or infinite trees (like call graphs) can be explored step by step.
Every change is laid out again and the drawn elements move smoothly from their old to their new place.

The [`Diagram`] widget draws what is kept in the [`DiagramState`].
*/

use std::time::Instant;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::Canvas;
use ratatui::widgets::{Block, StatefulWidget, Widget};

mod config;
mod error;
mod expansion;
mod flatten;
mod geometry;
mod identifier;
mod join;
mod layout;
mod measure;
mod model;
mod node;
mod reconcile;
mod scene;
mod state;
mod surface;
mod tween;
mod unique_identifiers;
mod viewport;

pub use crate::config::{category10, ColorFn, Config, CATEGORY10};
pub use crate::error::{DiagramError, FetchError};
pub use crate::expansion::{ChildRecord, DataProvider, FetchRequest, FetchResolution, Revealer};
pub use crate::flatten::flatten;
pub use crate::geometry::{Bounds, Point, Size};
pub use crate::identifier::{NodePath, ParsePathError};
pub use crate::join::{keyed_join, Join};
pub use crate::layout::{layout, Layout, Positioned};
pub use crate::measure::{Measure, TextMeasure, PLACEHOLDER_SIZE};
pub use crate::model::SceneModel;
pub use crate::node::{Locator, Node};
pub use crate::reconcile::{reconcile, RenderPass};
pub use crate::scene::{Change, Hit, Mutation, Primitive, Scene};
pub use crate::state::DiagramState;
pub use crate::surface::{flatten_curve, CanvasSurface, Stroke, Surface};
pub use crate::tween::{ease_cubic_in_out, Lerp, Tween};
pub use crate::viewport::{Transform, Viewport, ViewportInput, MAX_FIT_SCALE};

/// A `Diagram` which can be rendered.
///
/// The diagram itself is stateless: nodes, drawn elements and the viewport live in the [`DiagramState`].
/// Rendering also tells the state how large its canvas is.
///
/// # Example
///
/// ```
/// # use std::time::Instant;
/// # use tui_tree_diagram::{Config, Diagram, DiagramState};
/// # use ratatui::backend::TestBackend;
/// # use ratatui::Terminal;
/// # use ratatui::widgets::Block;
/// # let mut terminal = Terminal::new(TestBackend::new(32, 32)).unwrap();
/// let mut state = DiagramState::new(Config::default().auto_fit(true));
/// state.set_root("main", Instant::now());
///
/// terminal.draw(|frame| {
///     let area = frame.size();
///
///     let widget = Diagram::new().block(Block::bordered().title("Callers"));
///
///     frame.render_stateful_widget(widget, area, &mut state);
/// })?;
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Diagram<'a> {
    block: Option<Block<'a>>,
    /// Style used as a base style for the widget
    style: Style,
    marker: Marker,
    background: Color,
    /// Draw the state at this instant instead of now
    now: Option<Instant>,
}

impl Default for Diagram<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Diagram<'a> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            block: None,
            style: Style::new(),
            marker: Marker::Braille,
            background: Color::Reset,
            now: None,
        }
    }

    #[allow(clippy::missing_const_for_fn)]
    #[must_use]
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    #[must_use]
    pub const fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Symbols lines and circles are drawn with.
    #[must_use]
    pub const fn marker(mut self, marker: Marker) -> Self {
        self.marker = marker;
        self
    }

    #[must_use]
    pub const fn background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    /// Render the state as it is at `now`. Defaults to [`Instant::now`] while rendering.
    #[must_use]
    pub const fn at(mut self, now: Instant) -> Self {
        self.now = Some(now);
        self
    }
}

impl StatefulWidget for Diagram<'_> {
    type State = DiagramState;

    fn render(self, full_area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        buf.set_style(full_area, self.style);

        // Get the inner area inside a possible block, otherwise use the full area
        let area = self.block.map_or(full_area, |block| {
            let inner_area = block.inner(full_area);
            block.render(full_area, buf);
            inner_area
        });
        state.area = area;

        if area.width < 1 || area.height < 1 {
            return;
        }

        let now = self.now.unwrap_or_else(Instant::now);
        let cell_height = state.config().cell_height;
        let width = f64::from(area.width) * state.config().cell_width;
        let height = f64::from(area.height) * cell_height;
        state.resize(Size::new(width, height), now);
        state.prune(now);

        let state = &*state;
        Canvas::default()
            .marker(self.marker)
            .background_color(self.background)
            .x_bounds([0.0, width])
            .y_bounds([0.0, height])
            .paint(|context| {
                let mut surface = CanvasSurface::new(context, height, cell_height);
                state.paint(now, &mut surface);
            })
            .render(area, buf);
    }
}

#[cfg(test)]
fn rendered_rows(buffer: &Buffer) -> Vec<String> {
    let area = buffer.area;
    (area.top()..area.bottom())
        .map(|y| {
            (area.left()..area.right())
                .map(|x| buffer.get(x, y).symbol())
                .collect()
        })
        .collect()
}

#[test]
fn renders_root_label() {
    let now = Instant::now();
    let config = Config::default().duration(std::time::Duration::ZERO);
    let mut state = DiagramState::new(config);
    state.set_root("main", now);

    let area = Rect::new(0, 0, 40, 10);
    let mut buffer = Buffer::empty(area);
    Diagram::new().at(now).render(area, &mut buffer, &mut state);

    assert!(!state.viewport().is_fit_deferred());
    let rows = rendered_rows(&buffer);
    assert!(
        rows.iter().any(|row| row.contains("main")),
        "label missing in {rows:#?}"
    );
}

#[test]
fn renders_nothing_without_root() {
    let area = Rect::new(0, 0, 20, 5);
    let mut buffer = Buffer::empty(area);
    let mut state = DiagramState::default();
    Diagram::new()
        .block(Block::bordered())
        .render(area, &mut buffer, &mut state);
    assert_eq!(state.area, Rect::new(1, 1, 18, 3));
    assert_eq!(state.point_at(0, 0), None);
    assert_eq!(state.point_at(1, 1), Some(Point::new(4.0, 8.0)));
}
