/// Scrollbar orientation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollAxis {
    Horizontal,
    Vertical,
}

impl std::fmt::Display for ScrollAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Horizontal => write!(f, "horizontal"),
            Self::Vertical => write!(f, "vertical"),
        }
    }
}

/// Integer-range state of one scrollbar, written as a whole so a widget
/// binding never observes a value without its matching extent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrollBarState {
    pub value: i32,
    pub extent: i32,
    pub min: i32,
    pub max: i32,
    pub visible: bool,
}

impl ScrollBarState {
    pub(crate) fn hidden(max: i32) -> Self {
        Self {
            value: 0,
            extent: max,
            min: 0,
            max,
            visible: false,
        }
    }
}

/// What an update pass changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollUpdate {
    /// User scrollbar input moved the viewport.
    pub viewport_moved: bool,
    pub horizontal_changed: bool,
    pub vertical_changed: bool,
    /// A scrollbar appeared or disappeared; hosts must redo their layout.
    pub visibility_changed: bool,
}

impl ScrollUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Quantize the view span `[view_origin, view_origin + view_size)` against
/// the scroll span into `(value, extent)` within `0..=max`. `None` when the
/// scroll span is degenerate.
pub(crate) fn quantize(
    max: i32,
    view_origin: f64,
    view_size: f64,
    scroll_origin: f64,
    scroll_size: f64,
) -> Option<(i32, i32)> {
    if !(scroll_size > 0.0 && scroll_size.is_finite()) {
        return None;
    }
    let max_f = max as f64;
    let value = (max_f * (view_origin - scroll_origin) / scroll_size)
        .round()
        .clamp(0.0, max_f) as i32;
    let extent = (max_f * view_size / scroll_size)
        .round()
        .clamp(0.0, max_f) as i32;
    Some((value, extent))
}

/// Inverse of [`quantize`]: view coordinate the scrollbar `value` points at.
pub(crate) fn dequantize(max: i32, value: i32, scroll_origin: f64, scroll_size: f64) -> f64 {
    scroll_origin + value as f64 * scroll_size / max as f64
}
