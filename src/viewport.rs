use std::time::Instant;

use crate::config::Config;
use crate::geometry::{Bounds, Point, Size};
use crate::tween::{Lerp, Tween};

/// Maps diagram space onto the canvas: scale by `k`, then move by (`x`, `y`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub k: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        k: 1.0,
    };

    #[must_use]
    pub fn apply(&self, point: Point) -> Point {
        Point::new(point.x.mul_add(self.k, self.x), point.y.mul_add(self.k, self.y))
    }

    #[must_use]
    pub fn invert(&self, point: Point) -> Point {
        Point::new((point.x - self.x) / self.k, (point.y - self.y) / self.k)
    }

    /// Move by canvas units.
    #[must_use]
    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            k: self.k,
        }
    }

    /// Scale by `factor` keeping the canvas point `at` in place.
    #[must_use]
    pub fn scaled_at(self, factor: f64, at: Point) -> Self {
        let fixed = self.invert(at);
        let k = self.k * factor;
        Self {
            x: fixed.x.mul_add(-k, at.x),
            y: fixed.y.mul_add(-k, at.y),
            k,
        }
    }
}

impl Lerp for Transform {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        Self {
            x: self.x.lerp(&to.x, t),
            y: self.y.lerp(&to.y, t),
            k: self.k.lerp(&to.k, t),
        }
    }
}

/// Pointer input the viewport reacts to. Deltas are canvas units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportInput {
    /// Pointer moved with the primary button held
    Drag { dx: f64, dy: f64, ctrl: bool },
    /// Wheel or trackpad scroll over the canvas point `at`
    Wheel {
        dx: f64,
        dy: f64,
        ctrl: bool,
        at: Point,
    },
}

/// Upper limit of the scale [`Viewport::fit`] picks.
pub const MAX_FIT_SCALE: f64 = 2.0;

/// Pan and zoom state of the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    canvas: Size,
    transform: Tween<Transform>,
    fit_deferred: bool,
}

impl Viewport {
    #[must_use]
    pub fn new(now: Instant) -> Self {
        Self {
            canvas: Size::default(),
            transform: Tween::settled(Transform::IDENTITY, now),
            fit_deferred: false,
        }
    }

    #[must_use]
    pub const fn canvas(&self) -> Size {
        self.canvas
    }

    /// Transform at `now`, possibly in the middle of a transition.
    #[must_use]
    pub fn transform(&self, now: Instant) -> Transform {
        self.transform.value(now)
    }

    /// Transform once the running transition is done.
    #[must_use]
    pub const fn target(&self) -> Transform {
        *self.transform.target()
    }

    /// A fit was requested while it could not be computed.
    #[must_use]
    pub const fn is_fit_deferred(&self) -> bool {
        self.fit_deferred
    }

    /// Returns `true` when the size changed.
    pub fn resize(&mut self, canvas: Size) -> bool {
        let changed = self.canvas != canvas;
        self.canvas = canvas;
        changed
    }

    /// Scale and center `bounds` into the canvas.
    ///
    /// The scale leaves `fit_ratio` headroom and never exceeds [`MAX_FIT_SCALE`].
    /// Without a canvas size or with an empty tree nothing happens, `false` is returned
    /// and the next [`resize`](Self::resize) through the diagram state tries again.
    pub fn fit(&mut self, bounds: Bounds, config: &Config, now: Instant) -> bool {
        let natural_width = bounds.width();
        let natural_height = bounds.height();
        if self.canvas.is_empty() || natural_width <= 0.0 || natural_height <= 0.0 {
            tracing::debug!(canvas = ?self.canvas, "fit postponed");
            self.fit_deferred = true;
            return false;
        }
        self.fit_deferred = false;

        let scale = (self.canvas.width / natural_width * config.fit_ratio)
            .min(self.canvas.height / natural_height * config.fit_ratio)
            .min(MAX_FIT_SCALE);
        let target = Transform {
            x: natural_width.mul_add(-scale, self.canvas.width) / 2.0 - bounds.min.x * scale,
            y: natural_height.mul_add(-scale, self.canvas.height) / 2.0 - bounds.min.y * scale,
            k: scale,
        };
        tracing::debug!(?target, "fit");
        self.transform.retarget(target, now, config.duration);
        true
    }

    /// Apply pointer input. Returns `true` when the transform changed.
    ///
    /// With `scroll_for_pan` a plain wheel pans and the modified wheel zooms.
    /// Otherwise the wheel always zooms and panning happens by dragging.
    pub fn handle(&mut self, input: ViewportInput, config: &Config, now: Instant) -> bool {
        let current = self.transform(now);
        let next = match input {
            ViewportInput::Drag { dx, dy, ctrl } => {
                if !config.zoom || !config.pan || ctrl {
                    return false;
                }
                current.translated(dx, dy)
            }
            ViewportInput::Wheel { dx, dy, ctrl, at } => {
                if config.scroll_for_pan && !ctrl {
                    if !config.pan {
                        return false;
                    }
                    current.translated(-dx, -dy)
                } else if config.zoom {
                    let speed = if ctrl { 0.02 } else { 0.002 };
                    current.scaled_at((-dy * speed).exp2(), at)
                } else {
                    return false;
                }
            }
        };
        self.transform.snap(next, now);
        true
    }
}

#[cfg(test)]
fn sized(width: f64, height: f64, now: Instant) -> Viewport {
    let mut viewport = Viewport::new(now);
    viewport.resize(Size::new(width, height));
    viewport
}

#[test]
fn invert_undoes_apply() {
    let transform = Transform {
        x: 12.0,
        y: -4.0,
        k: 2.0,
    };
    let point = Point::new(3.0, 7.0);
    assert_eq!(transform.invert(transform.apply(point)), point);
}

#[test]
fn fit_on_zero_canvas_is_deferred() {
    let now = Instant::now();
    let mut viewport = Viewport::new(now);
    let bounds = Bounds::new(Point::new(0.0, -10.0), Point::new(100.0, 10.0));
    assert!(!viewport.fit(bounds, &Config::default(), now));
    assert!(viewport.is_fit_deferred());
    assert_eq!(viewport.target(), Transform::IDENTITY);
}

#[test]
fn fit_on_flat_tree_is_noop() {
    let now = Instant::now();
    let mut viewport = sized(800.0, 600.0, now);
    let bounds = Bounds::new(Point::new(0.0, 0.0), Point::new(0.0, 10.0));
    assert!(!viewport.fit(bounds, &Config::default(), now));
}

#[test]
fn fit_contains_tree_within_ratio() {
    let now = Instant::now();
    let config = Config::default();
    for (width, height) in [(800.0, 600.0), (100.0, 900.0), (1000.0, 40.0)] {
        let mut viewport = sized(width, height, now);
        let bounds = Bounds::new(Point::new(-20.0, -130.0), Point::new(340.0, 75.0));
        assert!(viewport.fit(bounds, &config, now));
        let transform = viewport.target();
        let min = transform.apply(bounds.min);
        let max = transform.apply(bounds.max);

        let margin_x = width * (1.0 - config.fit_ratio) / 2.0;
        let margin_y = height * (1.0 - config.fit_ratio) / 2.0;
        let epsilon = 1e-9;
        assert!(min.x >= margin_x - epsilon, "{min:?} left of {margin_x}");
        assert!(min.y >= margin_y - epsilon, "{min:?} above {margin_y}");
        assert!(max.x <= width - margin_x + epsilon, "{max:?} right of canvas");
        assert!(max.y <= height - margin_y + epsilon, "{max:?} below canvas");
    }
}

#[test]
fn fit_never_scales_beyond_cap() {
    let now = Instant::now();
    let mut viewport = sized(1000.0, 1000.0, now);
    let bounds = Bounds::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
    assert!(viewport.fit(bounds, &Config::default(), now));
    assert_eq!(viewport.target().k, MAX_FIT_SCALE);
}

#[test]
fn fit_is_transitioned() {
    let now = Instant::now();
    let config = Config::default();
    let mut viewport = sized(800.0, 600.0, now);
    let bounds = Bounds::new(Point::new(0.0, 0.0), Point::new(400.0, 300.0));
    assert!(viewport.fit(bounds, &config, now));
    assert_eq!(viewport.transform(now), Transform::IDENTITY);
    assert_eq!(viewport.transform(now + config.duration), viewport.target());
}

#[test]
fn drag_pans_in_canvas_units() {
    let now = Instant::now();
    let config = Config::default();
    let mut viewport = sized(800.0, 600.0, now);
    assert!(viewport.handle(
        ViewportInput::Drag {
            dx: 5.0,
            dy: -3.0,
            ctrl: false
        },
        &config,
        now
    ));
    assert_eq!(viewport.transform(now), Transform::IDENTITY.translated(5.0, -3.0));
}

#[test]
fn ctrl_drag_is_ignored() {
    let now = Instant::now();
    let mut viewport = sized(800.0, 600.0, now);
    let input = ViewportInput::Drag {
        dx: 5.0,
        dy: 5.0,
        ctrl: true,
    };
    assert!(!viewport.handle(input, &Config::default(), now));
}

#[test]
fn wheel_zooms_around_pointer() {
    let now = Instant::now();
    let config = Config::default().scroll_for_pan(false);
    let mut viewport = sized(800.0, 600.0, now);
    let at = Point::new(200.0, 100.0);
    let before = viewport.transform(now).invert(at);
    assert!(viewport.handle(
        ViewportInput::Wheel {
            dx: 0.0,
            dy: -500.0,
            ctrl: false,
            at
        },
        &config,
        now
    ));
    let transform = viewport.transform(now);
    assert_eq!(transform.k, 2.0);
    let after = transform.invert(at);
    assert!((after.x - before.x).abs() < 1e-9);
    assert!((after.y - before.y).abs() < 1e-9);
}

#[test]
fn scroll_for_pan_wheel_pans_and_ctrl_wheel_zooms() {
    let now = Instant::now();
    let config = Config::default().scroll_for_pan(true);
    let mut viewport = sized(800.0, 600.0, now);
    let at = Point::new(0.0, 0.0);
    viewport.handle(
        ViewportInput::Wheel {
            dx: 10.0,
            dy: 20.0,
            ctrl: false,
            at,
        },
        &config,
        now,
    );
    assert_eq!(viewport.transform(now), Transform::IDENTITY.translated(-10.0, -20.0));

    viewport.handle(
        ViewportInput::Wheel {
            dx: 0.0,
            dy: -50.0,
            ctrl: true,
            at,
        },
        &config,
        now,
    );
    assert_eq!(viewport.transform(now).k, 2.0);
}

#[test]
fn disabled_zoom_ignores_wheel_and_drag() {
    let now = Instant::now();
    let config = Config::default().zoom(false).scroll_for_pan(false);
    let mut viewport = sized(800.0, 600.0, now);
    let wheel = ViewportInput::Wheel {
        dx: 0.0,
        dy: -50.0,
        ctrl: false,
        at: Point::default(),
    };
    let drag = ViewportInput::Drag {
        dx: 1.0,
        dy: 1.0,
        ctrl: false,
    };
    assert!(!viewport.handle(wheel, &config, now));
    assert!(!viewport.handle(drag, &config, now));
}
