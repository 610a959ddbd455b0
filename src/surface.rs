use ratatui::style::{Color, Modifier};
use ratatui::text::{Line as TextLine, Span, Text};
use ratatui::widgets::canvas::{Circle, Context, Line};

use crate::geometry::{Point, Size};

/// Color and width of a drawn outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
}

/// Something the diagram can draw onto.
///
/// All coordinates are canvas coordinates: the viewport transform is already applied.
/// The y axis points down.
pub trait Surface {
    fn line(&mut self, from: Point, to: Point, stroke: Stroke);

    /// Cubic Bézier curve.
    fn curve(&mut self, from: Point, control1: Point, control2: Point, to: Point, stroke: Stroke);

    /// `fill` is `None` for a circle showing the background inside.
    fn circle(&mut self, center: Point, radius: f64, stroke: Stroke, fill: Option<Color>);

    /// Content box with its upper left corner at `origin`.
    fn content(&mut self, origin: Point, size: Size, text: &Text<'_>, opacity: f64);
}

/// Draws onto a ratatui [`Canvas`](ratatui::widgets::canvas::Canvas).
///
/// The canvas bounds have to be `[0, width]` × `[0, height]` in canvas units.
/// `cell_height` is the canvas height of one terminal row, used to place text lines.
pub struct CanvasSurface<'ctx, 'a> {
    context: &'ctx mut Context<'a>,
    height: f64,
    cell_height: f64,
}

impl<'ctx, 'a> CanvasSurface<'ctx, 'a> {
    pub fn new(context: &'ctx mut Context<'a>, height: f64, cell_height: f64) -> Self {
        Self {
            context,
            height,
            cell_height,
        }
    }

    /// Canvas y grows upwards.
    fn flip(&self, y: f64) -> f64 {
        self.height - y
    }
}

impl std::fmt::Debug for CanvasSurface<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasSurface")
            .field("height", &self.height)
            .field("cell_height", &self.cell_height)
            .finish_non_exhaustive()
    }
}

/// Points along a cubic Bézier curve, both ends included.
#[must_use]
pub fn flatten_curve(from: Point, control1: Point, control2: Point, to: Point, segments: usize) -> Vec<Point> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|step| {
            #[allow(clippy::cast_precision_loss)]
            let t = step as f64 / segments as f64;
            let u = 1.0 - t;
            let a = u * u * u;
            let b = 3.0 * u * u * t;
            let c = 3.0 * u * t * t;
            let d = t * t * t;
            Point::new(
                a * from.x + b * control1.x + c * control2.x + d * to.x,
                a * from.y + b * control1.y + c * control2.y + d * to.y,
            )
        })
        .collect()
}

/// Radii of the rings filling a circle from the inside.
///
/// Rings are `dot` apart but never more than there are dot rows on a canvas `canvas_height` high,
/// so zooming far in does not make filling more expensive.
fn fill_rings(radius: f64, dot: f64, canvas_height: f64) -> Vec<f64> {
    if dot <= 0.0 {
        return Vec::new();
    }
    let inner = radius - dot;
    let rows = (canvas_height / dot).ceil().max(1.0);
    let step = dot.max(inner / rows);
    let mut rings = Vec::new();
    let mut ring = inner;
    while ring > 0.0 {
        rings.push(ring);
        ring -= step;
    }
    rings
}

impl Surface for CanvasSurface<'_, '_> {
    fn line(&mut self, from: Point, to: Point, stroke: Stroke) {
        self.context.draw(&Line {
            x1: from.x,
            y1: self.flip(from.y),
            x2: to.x,
            y2: self.flip(to.y),
            color: stroke.color,
        });
    }

    fn curve(&mut self, from: Point, control1: Point, control2: Point, to: Point, stroke: Stroke) {
        let points = flatten_curve(from, control1, control2, to, 16);
        for pair in points.windows(2) {
            self.line(pair[0], pair[1], stroke);
        }
    }

    fn circle(&mut self, center: Point, radius: f64, stroke: Stroke, fill: Option<Color>) {
        let y = self.flip(center.y);
        if let Some(fill) = fill {
            // One braille dot is a quarter of a row
            for ring in fill_rings(radius, self.cell_height / 4.0, self.height) {
                self.context.draw(&Circle {
                    x: center.x,
                    y,
                    radius: ring,
                    color: fill,
                });
            }
        }
        self.context.draw(&Circle {
            x: center.x,
            y,
            radius,
            color: stroke.color,
        });
    }

    #[allow(clippy::cast_precision_loss)]
    fn content(&mut self, origin: Point, size: Size, text: &Text<'_>, opacity: f64) {
        if opacity <= 0.0 {
            return;
        }
        let rows = (size.height / self.cell_height).floor().max(1.0);
        for (row, line) in text.lines.iter().enumerate() {
            if row as f64 >= rows {
                break;
            }
            let dim = if opacity < 1.0 {
                Modifier::DIM
            } else {
                Modifier::empty()
            };
            let spans = line
                .spans
                .iter()
                .map(|span| Span::styled(span.content.to_string(), span.style.add_modifier(dim)))
                .collect::<Vec<_>>();
            // print anchors the line at its top left cell
            let y = self.flip(origin.y + row as f64 * self.cell_height);
            self.context.print(origin.x, y, TextLine::from(spans));
        }
    }
}

#[test]
fn curve_flattening_keeps_endpoints() {
    let from = Point::new(0.0, 0.0);
    let to = Point::new(10.0, 20.0);
    let points = flatten_curve(from, Point::new(5.0, 0.0), Point::new(5.0, 20.0), to, 8);
    assert_eq!(points.len(), 9);
    assert_eq!(points[0], from);
    assert_eq!(points[8], to);
    assert_eq!(points[4], Point::new(5.0, 10.0));
}

#[test]
fn fill_rings_follow_dot_size() {
    assert_eq!(fill_rings(6.0, 4.0, 160.0), [2.0]);
    assert_eq!(fill_rings(12.0, 4.0, 160.0), [8.0, 4.0]);
    assert!(fill_rings(3.0, 4.0, 160.0).is_empty());
}

#[test]
fn fill_rings_are_bounded_when_zoomed_in() {
    // 40 dot rows on the canvas
    let rings = fill_rings(6.0e6, 4.0, 160.0);
    assert!(rings.len() <= 41, "{} rings", rings.len());
    assert!(rings.iter().all(|ring| *ring > 0.0));
}
