use std::time::{Duration, Instant};

use crate::geometry::{Point, Size};

/// Values which can be interpolated.
pub trait Lerp {
    /// `t` runs from 0 (`self`) to 1 (`to`).
    #[must_use]
    fn lerp(&self, to: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        (to - self).mul_add(t, *self)
    }
}

impl Lerp for Point {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        Self::new(self.x.lerp(&to.x, t), self.y.lerp(&to.y, t))
    }
}

impl Lerp for Size {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        Self::new(self.width.lerp(&to.width, t), self.height.lerp(&to.height, t))
    }
}

/// Cubic ease in and out.
#[must_use]
pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0) * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        t.mul_add(t * t, 2.0) / 2.0
    }
}

/// A value moving from one state to another over a fixed duration.
///
/// Retargeting an unfinished tween continues from wherever it currently is,
/// so a new render pass never makes a primitive jump.
#[derive(Debug, Clone, PartialEq)]
pub struct Tween<T> {
    from: T,
    to: T,
    start: Instant,
    duration: Duration,
}

impl<T> Tween<T>
where
    T: Lerp + Clone + PartialEq,
{
    #[must_use]
    pub const fn new(from: T, to: T, start: Instant, duration: Duration) -> Self {
        Self {
            from,
            to,
            start,
            duration,
        }
    }

    /// A tween that already is at its target.
    #[must_use]
    pub fn settled(value: T, now: Instant) -> Self {
        Self::new(value.clone(), value, now, Duration::ZERO)
    }

    #[must_use]
    pub const fn target(&self) -> &T {
        &self.to
    }

    /// Share of the duration which has passed.
    #[must_use]
    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.start);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    #[must_use]
    pub fn is_finished(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }

    #[must_use]
    pub fn value(&self, now: Instant) -> T {
        let progress = self.progress(now);
        if progress >= 1.0 {
            self.to.clone()
        } else {
            self.from.lerp(&self.to, ease_cubic_in_out(progress))
        }
    }

    /// Head for `to` starting from the current value.
    ///
    /// Returns `false` without touching anything when `to` already is the target.
    pub fn retarget(&mut self, to: T, now: Instant, duration: Duration) -> bool {
        if self.to == to {
            return false;
        }
        self.from = self.value(now);
        self.to = to;
        self.start = now;
        self.duration = duration;
        true
    }

    /// Jump to `value` without a transition.
    pub fn snap(&mut self, value: T, now: Instant) {
        *self = Self::settled(value, now);
    }
}

#[test]
fn easing_hits_endpoints_and_middle() {
    assert_eq!(ease_cubic_in_out(0.0), 0.0);
    assert_eq!(ease_cubic_in_out(0.5), 0.5);
    assert_eq!(ease_cubic_in_out(1.0), 1.0);
    assert!(ease_cubic_in_out(0.25) < 0.25);
    assert!(ease_cubic_in_out(0.75) > 0.75);
}

#[test]
fn tween_reaches_target_after_duration() {
    let start = Instant::now();
    let duration = Duration::from_millis(100);
    let tween = Tween::new(0.0, 10.0, start, duration);
    assert_eq!(tween.value(start), 0.0);
    assert_eq!(tween.value(start + duration / 2), 5.0);
    assert_eq!(tween.value(start + duration), 10.0);
    assert!(tween.is_finished(start + duration * 2));
}

#[test]
fn retarget_continues_from_current_value() {
    let start = Instant::now();
    let duration = Duration::from_millis(100);
    let mut tween = Tween::new(0.0, 10.0, start, duration);
    let halfway = start + duration / 2;
    assert!(tween.retarget(20.0, halfway, duration));
    assert_eq!(tween.value(halfway), 5.0);
    assert_eq!(tween.value(halfway + duration), 20.0);
}

#[test]
fn retarget_to_same_target_is_noop() {
    let start = Instant::now();
    let duration = Duration::from_millis(100);
    let mut tween = Tween::new(0.0, 10.0, start, duration);
    assert!(!tween.retarget(10.0, start + duration / 2, duration));
    assert_eq!(tween.value(start + duration / 2), 5.0);
}
