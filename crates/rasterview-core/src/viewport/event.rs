use kurbo::{Point, Rect};

/// Why a viewport changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewportChange {
    Zoom,
    Pan,
    Orientation,
    Resize,
    Synchronize,
}

impl std::fmt::Display for ViewportChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zoom => write!(f, "zoom"),
            Self::Pan => write!(f, "pan"),
            Self::Orientation => write!(f, "orientation"),
            Self::Resize => write!(f, "resize"),
            Self::Synchronize => write!(f, "synchronize"),
        }
    }
}

/// Point-in-time copy of a viewport's transform state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportSnapshot {
    pub zoom_factor: f64,
    /// Model coordinates of the view-space origin.
    pub model_offset: Point,
    /// Radians in `[0, 2π)`.
    pub orientation: f64,
    pub view_bounds: Rect,
}

/// Delivered to listeners once per accepted mutating call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportEvent {
    pub change: ViewportChange,
    /// Consumers use this to choose between a full scrollbar geometry
    /// recompute and a cheap reposition.
    pub orientation_changed: bool,
    pub snapshot: ViewportSnapshot,
}

/// Handle returned by [`super::Viewport::add_listener`]; pass it to
/// [`super::Viewport::remove_listener`] to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

pub(crate) type Listener = Box<dyn FnMut(&ViewportEvent)>;

/// Publish/subscribe registry for viewport change events.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

impl ListenerRegistry {
    pub(crate) fn add(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn publish(&mut self, event: &ViewportEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}
