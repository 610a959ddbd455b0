use std::time::Duration;

use ratatui::style::Color;

use crate::identifier::NodePath;

/// Assigns the stroke color of a node.
pub type ColorFn = fn(&NodePath) -> Color;

/// The ten colors of the well known `category10` scheme.
pub const CATEGORY10: [Color; 10] = [
    Color::Rgb(0x1f, 0x77, 0xb4),
    Color::Rgb(0xff, 0x7f, 0x0e),
    Color::Rgb(0x2c, 0xa0, 0x2c),
    Color::Rgb(0xd6, 0x27, 0x28),
    Color::Rgb(0x94, 0x67, 0xbd),
    Color::Rgb(0x8c, 0x56, 0x4b),
    Color::Rgb(0xe3, 0x77, 0xc2),
    Color::Rgb(0x7f, 0x7f, 0x7f),
    Color::Rgb(0xbc, 0xbd, 0x22),
    Color::Rgb(0x17, 0xbe, 0xcf),
];

/// Picks one of [`CATEGORY10`] from a hash of the displayed path.
///
/// The same path gets the same color in every run.
#[must_use]
pub fn category10(path: &NodePath) -> Color {
    // FNV-1a
    let hash = path
        .to_string()
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
        });
    #[allow(clippy::cast_possible_truncation)]
    CATEGORY10[(hash % CATEGORY10.len() as u64) as usize]
}

/// Options of a [`DiagramState`](crate::DiagramState).
///
/// Lengths are diagram units. With the default cell size one terminal cell is 8×16 units.
///
/// # Example
///
/// ```
/// # use std::time::Duration;
/// # use tui_tree_diagram::Config;
/// let config = Config::default()
///     .auto_fit(true)
///     .duration(Duration::from_millis(250));
/// assert_eq!(config.fit_ratio, 0.95);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Fit the viewport after every layout pass
    pub auto_fit: bool,
    #[cfg_attr(feature = "serde", serde(skip, default = "default_color"))]
    pub color: ColorFn,
    /// Length of every transition
    #[cfg_attr(feature = "serde", serde(with = "millis"))]
    pub duration: Duration,
    pub node_min_height: f64,
    /// Horizontal padding around the content of a node
    pub padding_x: f64,
    /// Gap between a node box and its children
    pub spacing_horizontal: f64,
    /// Gap between siblings, doubled between cousins
    pub spacing_vertical: f64,
    /// Share of the canvas the tree may cover after [`fit`](crate::DiagramState::fit)
    pub fit_ratio: f64,
    pub zoom: bool,
    pub pan: bool,
    /// Plain wheel motion pans instead of zooming. Zoom then needs the modifier.
    pub scroll_for_pan: bool,
    /// Toggle whole subtrees. A modified click inverts this.
    pub toggle_recursively: bool,
    /// Recursive expansion also fetches children of descendants which were never opened
    pub fetch_on_recursive_expand: bool,
    pub cell_width: f64,
    pub cell_height: f64,
}

#[cfg(feature = "serde")]
fn default_color() -> ColorFn {
    category10
}

#[cfg(feature = "serde")]
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_fit: false,
            color: category10,
            duration: Duration::from_millis(500),
            node_min_height: 16.0,
            padding_x: 8.0,
            spacing_horizontal: 80.0,
            spacing_vertical: 5.0,
            fit_ratio: 0.95,
            zoom: true,
            pan: true,
            scroll_for_pan: cfg!(target_os = "macos"),
            toggle_recursively: false,
            fetch_on_recursive_expand: false,
            cell_width: 8.0,
            cell_height: 16.0,
        }
    }
}

impl Config {
    #[must_use]
    pub const fn auto_fit(mut self, auto_fit: bool) -> Self {
        self.auto_fit = auto_fit;
        self
    }

    #[must_use]
    pub const fn color(mut self, color: ColorFn) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub const fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    #[must_use]
    pub const fn spacing(mut self, horizontal: f64, vertical: f64) -> Self {
        self.spacing_horizontal = horizontal;
        self.spacing_vertical = vertical;
        self
    }

    #[must_use]
    pub const fn padding_x(mut self, padding_x: f64) -> Self {
        self.padding_x = padding_x;
        self
    }

    #[must_use]
    pub const fn node_min_height(mut self, node_min_height: f64) -> Self {
        self.node_min_height = node_min_height;
        self
    }

    #[must_use]
    pub const fn fit_ratio(mut self, fit_ratio: f64) -> Self {
        self.fit_ratio = fit_ratio;
        self
    }

    #[must_use]
    pub const fn zoom(mut self, zoom: bool) -> Self {
        self.zoom = zoom;
        self
    }

    #[must_use]
    pub const fn pan(mut self, pan: bool) -> Self {
        self.pan = pan;
        self
    }

    #[must_use]
    pub const fn scroll_for_pan(mut self, scroll_for_pan: bool) -> Self {
        self.scroll_for_pan = scroll_for_pan;
        self
    }

    #[must_use]
    pub const fn toggle_recursively(mut self, toggle_recursively: bool) -> Self {
        self.toggle_recursively = toggle_recursively;
        self
    }

    #[must_use]
    pub const fn fetch_on_recursive_expand(mut self, fetch: bool) -> Self {
        self.fetch_on_recursive_expand = fetch;
        self
    }

    /// Diagram units covered by one terminal cell.
    #[must_use]
    pub const fn cell_size(mut self, width: f64, height: f64) -> Self {
        self.cell_width = width;
        self.cell_height = height;
        self
    }
}

#[test]
fn category10_is_deterministic() {
    let path = NodePath::from(vec![1, 3, 2]);
    assert_eq!(category10(&path), category10(&path.clone()));
}

#[test]
fn category10_spreads_siblings() {
    let colors = (1..=10)
        .map(|ordinal| category10(&NodePath::root().child(ordinal)))
        .collect::<std::collections::HashSet<_>>();
    assert!(colors.len() > 1);
}

#[cfg(feature = "serde")]
#[test]
fn config_reads_partial_json() {
    let config: Config =
        serde_json::from_str(r#"{"auto_fit": true, "duration": 250, "spacing_vertical": 2.0}"#)
            .unwrap();
    assert!(config.auto_fit);
    assert_eq!(config.duration, Duration::from_millis(250));
    assert_eq!(config.spacing_vertical, 2.0);
    assert_eq!(config.padding_x, Config::default().padding_x);
}

#[cfg(feature = "serde")]
#[test]
fn config_writes_duration_as_millis() {
    let json = serde_json::to_value(Config::default()).unwrap();
    assert_eq!(json["duration"], 500);
    assert!(json.get("color").is_none());
}
