use std::fmt;

use ratatui::text::Text;
use unicode_width::UnicodeWidthStr;

use crate::geometry::Size;

/// Size of the placeholder sentinel: no content, just room for its marker.
pub const PLACEHOLDER_SIZE: Size = Size::new(0.0, 6.0);

/// Materializes the content box of a node and reports its size.
///
/// The diagram calls this exactly once per node, when the node is created.
/// The returned size is kept for the lifetime of the node and never measured again.
pub trait Measure: fmt::Debug {
    fn measure(&self, content: &Text<'_>) -> Size;
}

/// Measures text by its terminal cell footprint.
///
/// One terminal cell is `cell_width` × `cell_height` diagram units.
/// The width of a line is its unicode display width.
///
/// # Example
///
/// ```
/// # use ratatui::text::Text;
/// # use tui_tree_diagram::{Measure, TextMeasure};
/// let measure = TextMeasure::new(8.0, 16.0, 16.0);
/// let size = measure.measure(&Text::raw("main"));
/// assert_eq!(size.width, 33.0);
/// assert_eq!(size.height, 16.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMeasure {
    cell_width: f64,
    cell_height: f64,
    min_height: f64,
}

impl TextMeasure {
    #[must_use]
    pub const fn new(cell_width: f64, cell_height: f64, min_height: f64) -> Self {
        Self {
            cell_width,
            cell_height,
            min_height,
        }
    }
}

impl Measure for TextMeasure {
    #[allow(clippy::cast_precision_loss)]
    fn measure(&self, content: &Text<'_>) -> Size {
        let columns = content
            .lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.width())
                    .sum::<usize>()
            })
            .max()
            .unwrap_or_default();
        let rows = content.lines.len();

        // One extra unit keeps a glyph from touching the box edge
        let width = (columns as f64 * self.cell_width).ceil() + 1.0;
        let height = (rows as f64 * self.cell_height).ceil().max(self.min_height);
        Size::new(width, height)
    }
}

#[test]
fn measures_widest_line() {
    let measure = TextMeasure::new(1.0, 1.0, 1.0);
    let size = measure.measure(&Text::raw("ab\nabcd\nabc"));
    assert_eq!(size, Size::new(5.0, 3.0));
}

#[test]
fn wide_characters_take_two_cells() {
    let measure = TextMeasure::new(1.0, 1.0, 1.0);
    let size = measure.measure(&Text::raw("日本"));
    assert_eq!(size.width, 5.0);
}

#[test]
fn height_respects_minimum() {
    let measure = TextMeasure::new(8.0, 16.0, 20.0);
    let size = measure.measure(&Text::raw("x"));
    assert_eq!(size.height, 20.0);
}
