//! Scrollbars for an unbounded, floating-point model extent.
//!
//! Each update pass computes, in view coordinates:
//! - `VA`, the view bounds,
//! - `MA`, the model bounds under the current model-to-view transform,
//!   grown by a fixed margin on every side,
//! - `SA = MA ∪ VA`, the scroll area.
//!
//! An axis gets a visible scrollbar when `MA` sticks out of `VA` on either
//! side. Its value and extent are `VA`'s position and size within `SA`,
//! quantized to `0..=max`.
//!
//! User scrollbar input is queued with [`ScrollController::scrollbar_moved`]
//! and applied at the start of the next [`ScrollController::update`], before
//! any recompute the same pass performs. The recompute therefore always sees
//! the viewport after the user's move and cannot undo it.

mod guard;
mod state;

use std::cell::Cell;
use std::rc::Rc;

use kurbo::{Point, Rect};
use tracing::{debug, trace};

use crate::config::ScrollConfig;
use crate::viewport::{ListenerId, Viewport};

pub use guard::{DriveMonitor, DriveState};
pub use state::{ScrollAxis, ScrollBarState, ScrollUpdate};

use guard::DriveGuard;
use state::{dequantize, quantize};

#[derive(Debug)]
pub struct ScrollController {
    margin: f64,
    max_value: i32,
    horizontal: ScrollBarState,
    vertical: ScrollBarState,
    scroll_area: Rect,
    guard: DriveGuard,
    /// Set by the viewport listener and by layout requests; cleared by the
    /// recompute.
    dirty: Rc<Cell<bool>>,
    queued_horizontal: Option<i32>,
    queued_vertical: Option<i32>,
    listener: Option<ListenerId>,
}

impl ScrollController {
    pub fn new(config: &ScrollConfig) -> Self {
        let max_value = config.max_value.max(1);
        Self {
            margin: config.margin.max(0.0),
            max_value,
            horizontal: ScrollBarState::hidden(max_value),
            vertical: ScrollBarState::hidden(max_value),
            scroll_area: Rect::ZERO,
            guard: DriveGuard::default(),
            dirty: Rc::new(Cell::new(true)),
            queued_horizontal: None,
            queued_vertical: None,
            listener: None,
        }
    }

    /// Subscribes to `viewport` changes. Replaces any previous subscription
    /// made through this controller on the same viewport.
    pub fn attach(&mut self, viewport: &mut Viewport) -> ListenerId {
        self.detach(viewport);
        let dirty = Rc::clone(&self.dirty);
        let guard = self.guard.monitor();
        let id = viewport.add_listener(move |event| {
            // Recomputed by the next update once the guard is idle again.
            dirty.set(true);
            trace!(change = %event.change, state = ?guard.get(), "Scroll geometry invalidated");
        });
        self.listener = Some(id);
        self.dirty.set(true);
        id
    }

    pub fn detach(&mut self, viewport: &mut Viewport) -> bool {
        self.listener
            .take()
            .is_some_and(|id| viewport.remove_listener(id))
    }

    pub fn horizontal(&self) -> ScrollBarState {
        self.horizontal
    }

    pub fn vertical(&self) -> ScrollBarState {
        self.vertical
    }

    pub fn bar(&self, axis: ScrollAxis) -> ScrollBarState {
        match axis {
            ScrollAxis::Horizontal => self.horizontal,
            ScrollAxis::Vertical => self.vertical,
        }
    }

    /// Scroll area (view coordinates) the current values were derived from.
    pub fn scroll_area(&self) -> Rect {
        self.scroll_area
    }

    pub fn drive_state(&self) -> DriveState {
        self.guard.get()
    }

    pub fn drive_monitor(&self) -> DriveMonitor {
        self.guard.monitor()
    }

    pub fn unit_increment(&self) -> i32 {
        (self.max_value / 50).max(10)
    }

    pub fn block_increment(&self) -> i32 {
        (self.max_value / 5).max(10)
    }

    /// Marks the geometry stale, e.g. after the host surface was laid out.
    pub fn request_layout(&self) {
        self.dirty.set(true);
    }

    /// Queues user scrollbar input. Applied by the next [`Self::update`];
    /// the latest value per axis wins. Input on a hidden bar is ignored.
    pub fn scrollbar_moved(&mut self, axis: ScrollAxis, value: i32) {
        let value = value.clamp(0, self.max_value);
        match axis {
            ScrollAxis::Horizontal if self.horizontal.visible => {
                self.queued_horizontal = Some(value)
            }
            ScrollAxis::Vertical if self.vertical.visible => self.queued_vertical = Some(value),
            _ => trace!(%axis, value, "Ignoring input on hidden scrollbar"),
        }
    }

    /// One layout/update pass: apply queued scrollbar input, then recompute
    /// scrollbar state if anything changed since the last pass.
    pub fn update(&mut self, viewport: &mut Viewport, model_bounds: Rect) -> ScrollUpdate {
        let mut update = ScrollUpdate::default();
        if self.queued_horizontal.is_some() || self.queued_vertical.is_some() {
            update.viewport_moved = self.apply_scrollbar_input(viewport);
        }

        if self.dirty.replace(false) {
            let recomputed = self.recompute(viewport, model_bounds);
            update.horizontal_changed |= recomputed.horizontal_changed;
            update.vertical_changed |= recomputed.vertical_changed;
            update.visibility_changed |= recomputed.visibility_changed;
        }
        update
    }

    /// Reverse mapping: moves the viewport so the view origin sits where the
    /// queued scrollbar values point inside the scroll area.
    fn apply_scrollbar_input(&mut self, viewport: &mut Viewport) -> bool {
        let Some(_token) = self.guard.enter(DriveState::DrivingFromScrollbar) else {
            return false;
        };
        let va = viewport.view_bounds();
        let sa = self.scroll_area;
        let mut target = Point::new(va.x0, va.y0);

        if let Some(value) = self.queued_horizontal.take() {
            if self.horizontal.visible && sa.width() > 0.0 {
                self.horizontal.value = value;
                target.x = dequantize(self.max_value, value, sa.x0, sa.width());
            }
        }
        if let Some(value) = self.queued_vertical.take() {
            if self.vertical.visible && sa.height() > 0.0 {
                self.vertical.value = value;
                target.y = dequantize(self.max_value, value, sa.y0, sa.height());
            }
        }

        let (dx, dy) = (va.x0 - target.x, va.y0 - target.y);
        if dx == 0.0 && dy == 0.0 {
            return false;
        }
        debug!(dx, dy, "Moving viewport from scrollbars");
        viewport.move_view_delta(dx, dy);
        true
    }

    fn recompute(&mut self, viewport: &Viewport, model_bounds: Rect) -> ScrollUpdate {
        let Some(_token) = self.guard.enter(DriveState::DrivingFromViewport) else {
            self.dirty.set(true);
            return ScrollUpdate::default();
        };
        let before = (self.horizontal, self.vertical);

        let va = viewport.view_bounds();
        if va.width() <= 0.0 || va.height() <= 0.0 {
            self.horizontal = ScrollBarState {
                visible: false,
                ..self.horizontal
            };
            self.vertical = ScrollBarState {
                visible: false,
                ..self.vertical
            };
            debug!("Empty view bounds, scrollbars hidden");
            return self.diff(before);
        }

        let ma = viewport
            .model_to_view_transform()
            .transform_rect_bbox(model_bounds.abs())
            .inflate(self.margin, self.margin);
        let sa = ma.union(va);
        self.scroll_area = sa;

        let h_visible = ma.x0 < va.x0 || ma.x1 > va.x1;
        let v_visible = ma.y0 < va.y0 || ma.y1 > va.y1;
        debug!(?va, ?ma, ?sa, h_visible, v_visible, "Scroll geometry");

        self.horizontal = self.axis_state(
            self.horizontal,
            h_visible,
            quantize(self.max_value, va.x0, va.width(), sa.x0, sa.width()),
        );
        self.vertical = self.axis_state(
            self.vertical,
            v_visible,
            quantize(self.max_value, va.y0, va.height(), sa.y0, sa.height()),
        );
        trace!(horizontal = ?self.horizontal, vertical = ?self.vertical, "Scrollbars updated");
        self.diff(before)
    }

    fn axis_state(
        &self,
        previous: ScrollBarState,
        visible: bool,
        quantized: Option<(i32, i32)>,
    ) -> ScrollBarState {
        match quantized {
            Some((value, extent)) if visible => ScrollBarState {
                value,
                extent,
                min: 0,
                max: self.max_value,
                visible: true,
            },
            _ => ScrollBarState {
                visible: false,
                ..previous
            },
        }
    }

    fn diff(&self, before: (ScrollBarState, ScrollBarState)) -> ScrollUpdate {
        ScrollUpdate {
            viewport_moved: false,
            horizontal_changed: before.0 != self.horizontal,
            vertical_changed: before.1 != self.vertical,
            visibility_changed: before.0.visible != self.horizontal.visible
                || before.1.visible != self.vertical.visible,
        }
    }
}
