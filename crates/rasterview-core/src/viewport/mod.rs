//! Mutable pan/zoom/rotate state mapping view (device pixel) coordinates to
//! model coordinates.
//!
//! The transform is parameterised by a zoom factor, the model coordinates of
//! the view-space origin and an orientation angle:
//!
//! ```text
//! model = offset + R(orientation) * view / zoom
//! view  = zoom * R(-orientation) * (model - offset)
//! ```
//!
//! Invalid inputs (non-positive zoom, non-finite angles) are normalized at
//! the API boundary, so the transform is always invertible.

mod event;

use std::f64::consts::TAU;

use kurbo::{Affine, Point, Rect, Vec2};
use tracing::debug;

use crate::consts::{MAX_ZOOM_FACTOR, MIN_ZOOM_FACTOR};
use crate::pyramid::PyramidModel;

pub use event::{ListenerId, ViewportChange, ViewportEvent, ViewportSnapshot};
use event::ListenerRegistry;

pub struct Viewport {
    zoom_factor: f64,
    model_offset: Point,
    orientation: f64,
    view_bounds: Rect,
    listeners: ListenerRegistry,
}

impl std::fmt::Debug for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewport")
            .field("zoom_factor", &self.zoom_factor)
            .field("model_offset", &self.model_offset)
            .field("orientation", &self.orientation)
            .field("view_bounds", &self.view_bounds)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Viewport {
    /// Creates a viewport with zoom 1, no rotation, and the model origin at
    /// the view origin.
    pub fn new(view_bounds: Rect) -> Self {
        Self {
            zoom_factor: 1.0,
            model_offset: Point::ORIGIN,
            orientation: 0.0,
            view_bounds: normalize_bounds(view_bounds).unwrap_or(Rect::ZERO),
            listeners: ListenerRegistry::default(),
        }
    }

    pub fn zoom_factor(&self) -> f64 {
        self.zoom_factor
    }

    /// Model coordinates of the view-space origin.
    pub fn model_offset(&self) -> Point {
        self.model_offset
    }

    /// Orientation in radians, always within `[0, 2π)`.
    pub fn orientation(&self) -> f64 {
        self.orientation
    }

    pub fn view_bounds(&self) -> Rect {
        self.view_bounds
    }

    pub fn view_center(&self) -> Point {
        self.view_bounds.center()
    }

    /// Model point currently displayed at the view center.
    pub fn model_center(&self) -> Point {
        self.view_to_model_transform() * self.view_center()
    }

    pub fn snapshot(&self) -> ViewportSnapshot {
        ViewportSnapshot {
            zoom_factor: self.zoom_factor,
            model_offset: self.model_offset,
            orientation: self.orientation,
            view_bounds: self.view_bounds,
        }
    }

    pub fn model_to_view_transform(&self) -> Affine {
        Affine::scale(self.zoom_factor)
            * Affine::rotate(-self.orientation)
            * Affine::translate(-self.model_offset.to_vec2())
    }

    pub fn view_to_model_transform(&self) -> Affine {
        Affine::translate(self.model_offset.to_vec2())
            * Affine::rotate(self.orientation)
            * Affine::scale(1.0 / self.zoom_factor)
    }

    /// Bounding box of the view bounds in model coordinates.
    pub fn visible_model_bounds(&self) -> Rect {
        self.view_to_model_transform()
            .transform_rect_bbox(self.view_bounds)
    }

    /// Transform from level-0 image pixels of `model` to view coordinates.
    pub fn image_to_view_transform(&self, model: &PyramidModel) -> Affine {
        self.model_to_view_transform() * model.image_to_model()
    }

    /// Visible area in level-0 image pixel coordinates, clipped to the image.
    /// `None` when no part of the image is in view.
    pub fn visible_image_bounds(&self, model: &PyramidModel) -> Option<Rect> {
        let view_to_image = self.image_to_view_transform(model).inverse();
        let visible = view_to_image.transform_rect_bbox(self.view_bounds);
        let image = Rect::new(0.0, 0.0, model.width() as f64, model.height() as f64);
        let clipped = image.intersect(visible);
        if clipped.width() <= 0.0 || clipped.height() <= 0.0 {
            None
        } else {
            Some(clipped)
        }
    }

    /// Registers a change listener. Keep the returned id to unsubscribe.
    pub fn add_listener(&mut self, listener: impl FnMut(&ViewportEvent) + 'static) -> ListenerId {
        self.listeners.add(Box::new(listener))
    }

    /// Unsubscribes a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Resizes the view. The model offset (model point at the view origin)
    /// is kept.
    pub fn set_view_bounds(&mut self, bounds: Rect) {
        let Some(bounds) = normalize_bounds(bounds) else {
            return;
        };
        self.view_bounds = bounds;
        debug!(?bounds, "Viewport resized");
        self.fire(ViewportChange::Resize, false);
    }

    /// Zooms so that `model_rect` fits entirely inside the view, centered.
    /// Zero-area rectangles and empty views are ignored.
    pub fn zoom_to_rect(&mut self, model_rect: Rect) {
        let rect = model_rect.abs();
        let (vw, vh) = (self.view_bounds.width(), self.view_bounds.height());
        if !(rect.width() > 0.0 && rect.height() > 0.0 && vw > 0.0 && vh > 0.0) {
            debug!(?model_rect, "Ignoring degenerate zoom rectangle");
            return;
        }
        self.zoom_factor = normalize_zoom((vw / rect.width()).min(vh / rect.height()));
        self.anchor(rect.center(), self.view_center());
        debug!(zoom = self.zoom_factor, ?model_rect, "Zoomed to rectangle");
        self.fire(ViewportChange::Zoom, false);
    }

    /// Zooms to show the complete data bounds.
    pub fn zoom_all(&mut self, model_bounds: Rect) {
        self.zoom_to_rect(model_bounds);
    }

    /// Sets the zoom factor while keeping model point `(x, y)` at its current
    /// view location.
    pub fn zoom_about(&mut self, x: f64, y: f64, scale: f64) {
        let model = Point::new(x, y);
        if !(x.is_finite() && y.is_finite()) {
            return;
        }
        let view = self.model_to_view_transform() * model;
        self.zoom_factor = normalize_zoom(scale);
        self.anchor(model, view);
        debug!(zoom = self.zoom_factor, x, y, "Zoomed about model point");
        self.fire(ViewportChange::Zoom, false);
    }

    /// Sets the absolute zoom factor, keeping the view center fixed in model
    /// space. Non-positive values are clamped to a tiny positive zoom.
    pub fn set_zoom_factor(&mut self, scale: f64) {
        let center = self.model_center();
        self.zoom_about(center.x, center.y, scale);
    }

    /// Applies `rotation` wheel notches, each multiplying the zoom by `step`.
    pub fn wheel_zoom(&mut self, rotation: i32, step: f64) {
        self.set_zoom_factor(self.zoom_factor * step.powi(rotation));
    }

    /// Translates the view by a model-space delta.
    pub fn move_by(&mut self, dx_model: f64, dy_model: f64) {
        if !(dx_model.is_finite() && dy_model.is_finite()) {
            return;
        }
        self.model_offset += Vec2::new(dx_model, dy_model);
        debug!(dx_model, dy_model, "Viewport moved");
        self.fire(ViewportChange::Pan, false);
    }

    /// Moves the model point at the view origin to `(x, y)`.
    pub fn set_offset(&mut self, x: f64, y: f64) {
        if !(x.is_finite() && y.is_finite()) {
            return;
        }
        self.model_offset = Point::new(x, y);
        debug!(x, y, "Viewport offset set");
        self.fire(ViewportChange::Pan, false);
    }

    /// Moves the displayed content by a view-space delta: the model point
    /// shown at view point `p` is afterwards shown at `p + (dx, dy)`.
    pub fn move_view_delta(&mut self, dx_view: f64, dy_view: f64) {
        if !(dx_view.is_finite() && dy_view.is_finite()) {
            return;
        }
        let delta = self.view_to_model_linear() * Point::new(dx_view, dy_view);
        self.model_offset -= delta.to_vec2();
        debug!(dx_view, dy_view, "Viewport moved in view space");
        self.fire(ViewportChange::Pan, false);
    }

    /// Sets the orientation, wrapped into `[0, 2π)`, rotating about the
    /// view center.
    pub fn set_orientation(&mut self, radians: f64) {
        let center = self.model_center();
        let previous = self.orientation;
        self.orientation = normalize_orientation(radians);
        self.anchor(center, self.view_center());
        debug!(orientation = self.orientation, "Viewport rotated");
        self.fire(ViewportChange::Orientation, previous != self.orientation);
    }

    /// Copies zoom and orientation from `other` and positions this view so
    /// that the model point at the center of `other` is at this view's
    /// center.
    pub fn synchronize_with(&mut self, other: &Viewport) {
        let center = other.model_center();
        let previous = self.orientation;
        self.zoom_factor = other.zoom_factor;
        self.orientation = other.orientation;
        self.anchor(center, self.view_center());
        debug!(
            zoom = self.zoom_factor,
            orientation = self.orientation,
            "Viewport synchronized"
        );
        self.fire(ViewportChange::Synchronize, previous != self.orientation);
    }

    /// Rotation and scale part of the view-to-model transform.
    fn view_to_model_linear(&self) -> Affine {
        Affine::rotate(self.orientation) * Affine::scale(1.0 / self.zoom_factor)
    }

    /// Chooses the offset so that `model` is displayed at `view`.
    fn anchor(&mut self, model: Point, view: Point) {
        let rotated = self.view_to_model_linear() * view;
        self.model_offset = (model.to_vec2() - rotated.to_vec2()).to_point();
    }

    fn fire(&mut self, change: ViewportChange, orientation_changed: bool) {
        let event = ViewportEvent {
            change,
            orientation_changed,
            snapshot: self.snapshot(),
        };
        self.listeners.publish(&event);
    }
}

fn normalize_zoom(scale: f64) -> f64 {
    if scale.is_nan() || scale < MIN_ZOOM_FACTOR {
        MIN_ZOOM_FACTOR
    } else {
        scale.min(MAX_ZOOM_FACTOR)
    }
}

fn normalize_orientation(radians: f64) -> f64 {
    if !radians.is_finite() {
        return 0.0;
    }
    let wrapped = radians.rem_euclid(TAU);
    // rem_euclid may round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

fn normalize_bounds(bounds: Rect) -> Option<Rect> {
    let finite = [bounds.x0, bounds.y0, bounds.x1, bounds.y1]
        .iter()
        .all(|v| v.is_finite());
    finite.then(|| bounds.abs())
}
