use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use kurbo::Affine;
use tracing::{debug, info, warn};

use crate::error::{RasterViewError, Result};
use crate::raster::Raster;

use super::cancel::CancelToken;
use super::derivation::{LevelDerivation, NoData};
use super::model::PyramidModel;

/// Cache state of one pyramid level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelState {
    Empty,
    Computing,
    Ready,
    /// The last derivation failed. The next request retries.
    Failed,
}

/// Lazily derived, cached multi-resolution view of a base raster.
///
/// Cloning is cheap and clones share the cache. Each level is derived at most
/// once per cache generation; concurrent requests for a level that is being
/// derived wait for that single computation and share its result.
#[derive(Clone)]
pub struct PyramidSource {
    inner: Arc<Mutex<SourceState>>,
}

struct SourceState {
    /// `None` is the empty sentinel: every level is "no data".
    base: Option<Arc<Raster>>,
    model: Arc<PyramidModel>,
    requested_levels: usize,
    image_to_model: Affine,
    derivation: Arc<dyn LevelDerivation>,
    generation: u64,
    entries: Vec<Entry>,
}

enum Entry {
    Empty,
    Computing(Arc<Flight>),
    Ready(Arc<Raster>),
    Failed(String),
}

/// Completion callback of a non-blocking level request.
type LevelCallback = Box<dyn FnOnce(Result<Arc<Raster>>) + Send>;

/// One in-flight derivation. Blocking callers wait on the condvar;
/// non-blocking callers register a callback and never occupy a thread.
struct Flight {
    state: Mutex<FlightState>,
    done: Condvar,
    cancel: CancelToken,
}

#[derive(Default)]
struct FlightState {
    outcome: Option<Outcome>,
    callbacks: Vec<LevelCallback>,
}

#[derive(Clone)]
enum Outcome {
    Ready(Arc<Raster>),
    Failed(String),
    Cancelled,
}

/// Result of looking up a level under the source lock.
enum Claim {
    Ready(Arc<Raster>),
    /// Another caller is deriving the level.
    Wait(Arc<Flight>),
    /// The caller must derive the level and finish the flight.
    Lead(Arc<Flight>, Job),
}

/// Everything a leader needs to derive a level without holding the lock.
struct Job {
    base: Option<Arc<Raster>>,
    model: Arc<PyramidModel>,
    derivation: Arc<dyn LevelDerivation>,
    generation: u64,
}

impl Outcome {
    /// What a caller other than the leader receives.
    fn into_result(self, level: usize) -> Result<Arc<Raster>> {
        match self {
            Outcome::Ready(image) => Ok(image),
            Outcome::Failed(message) => Err(RasterViewError::Derivation { level, message }),
            Outcome::Cancelled => Err(RasterViewError::Cancelled { level }),
        }
    }
}

impl Flight {
    fn new() -> Self {
        Self {
            state: Mutex::new(FlightState::default()),
            done: Condvar::new(),
            cancel: CancelToken::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FlightState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait(&self) -> Outcome {
        let mut guard = self.lock();
        loop {
            if let Some(outcome) = guard.outcome.as_ref() {
                return outcome.clone();
            }
            guard = self.done.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Runs `callback` once the flight finishes. Callbacks are dispatched to
    /// Rayon workers, never invoked under the flight lock.
    fn on_finish(&self, level: usize, callback: LevelCallback) {
        let mut guard = self.lock();
        let finished = guard.outcome.clone();
        match finished {
            Some(outcome) => {
                drop(guard);
                rayon::spawn(move || callback(outcome.into_result(level)));
            }
            None => guard.callbacks.push(callback),
        }
    }

    fn finish(&self, level: usize, outcome: Outcome) {
        let callbacks = {
            let mut guard = self.lock();
            guard.outcome = Some(outcome.clone());
            self.done.notify_all();
            std::mem::take(&mut guard.callbacks)
        };
        for callback in callbacks {
            let outcome = outcome.clone();
            rayon::spawn(move || callback(outcome.into_result(level)));
        }
    }
}

impl PyramidSource {
    /// Source over `base` with `level_count` levels and identity
    /// image-to-model transform.
    pub fn new(
        base: Raster,
        level_count: usize,
        derivation: Arc<dyn LevelDerivation>,
    ) -> Result<Self> {
        Self::with_transform(base, level_count, derivation, Affine::IDENTITY)
    }

    pub fn with_transform(
        base: Raster,
        level_count: usize,
        derivation: Arc<dyn LevelDerivation>,
        image_to_model: Affine,
    ) -> Result<Self> {
        let model = build_model(&base, level_count, derivation.as_ref(), image_to_model)?;
        let entries = empty_entries(model.level_count());
        Ok(Self {
            inner: Arc::new(Mutex::new(SourceState {
                base: Some(Arc::new(base)),
                model: Arc::new(model),
                requested_levels: level_count,
                image_to_model,
                derivation,
                generation: 0,
                entries,
            })),
        })
    }

    /// Empty sentinel source: every level of `model` is "no data".
    pub fn empty(model: PyramidModel) -> Self {
        let entries = empty_entries(model.level_count());
        Self {
            inner: Arc::new(Mutex::new(SourceState {
                base: None,
                requested_levels: model.level_count(),
                image_to_model: model.image_to_model(),
                model: Arc::new(model),
                derivation: Arc::new(NoData),
                generation: 0,
                entries,
            })),
        }
    }

    pub fn model(&self) -> Arc<PyramidModel> {
        Arc::clone(&self.lock().model)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().base.is_none()
    }

    pub fn level_state(&self, level: usize) -> Result<LevelState> {
        let state = self.lock();
        let entry = state.entry(level)?;
        Ok(match entry {
            Entry::Empty => LevelState::Empty,
            Entry::Computing(_) => LevelState::Computing,
            Entry::Ready(_) => LevelState::Ready,
            Entry::Failed(_) => LevelState::Failed,
        })
    }

    /// Cached raster of `level`, without triggering a derivation.
    pub fn cached_level_image(&self, level: usize) -> Option<Arc<Raster>> {
        match self.lock().entries.get(level) {
            Some(Entry::Ready(image)) => Some(Arc::clone(image)),
            _ => None,
        }
    }

    /// Raster of `level`, deriving it on first use. Blocks while another
    /// caller derives the same level, then shares that result.
    ///
    /// Do not call this from a Rayon worker while another thread may be
    /// deriving the same level; use [`Self::request_level_image`] there.
    pub fn level_image(&self, level: usize) -> Result<Arc<Raster>> {
        match self.claim(level)? {
            Claim::Ready(image) => Ok(image),
            Claim::Lead(flight, job) => self.lead(level, &flight, job),
            Claim::Wait(flight) => {
                debug!(level, "Waiting for in-flight level derivation");
                flight.wait().into_result(level)
            }
        }
    }

    /// Non-blocking variant of [`Self::level_image`]. `callback` runs inline
    /// when the level is cached or out of range. Otherwise it runs on a Rayon
    /// worker once the single derivation of the level finishes; joining a
    /// derivation already in flight does not occupy a thread.
    pub fn request_level_image<F>(&self, level: usize, callback: F)
    where
        F: FnOnce(Result<Arc<Raster>>) + Send + 'static,
    {
        match self.claim(level) {
            Err(e) => callback(Err(e)),
            Ok(Claim::Ready(image)) => callback(Ok(image)),
            Ok(Claim::Wait(flight)) => {
                debug!(level, "Queued callback on in-flight level derivation");
                flight.on_finish(level, Box::new(callback));
            }
            Ok(Claim::Lead(flight, job)) => {
                let source = self.clone();
                rayon::spawn(move || callback(source.lead(level, &flight, job)));
            }
        }
    }

    /// Swaps in a new base raster and drops every cached level.
    pub fn replace_source(&self, base: Raster) -> Result<()> {
        let mut state = self.lock();
        let model = build_model(
            &base,
            state.requested_levels,
            state.derivation.as_ref(),
            state.image_to_model,
        )?;
        info!(
            width = base.width(),
            height = base.height(),
            levels = model.level_count(),
            "Replacing pyramid base raster"
        );
        state.base = Some(Arc::new(base));
        state.model = Arc::new(model);
        state.reset();
        Ok(())
    }

    /// Swaps the derivation strategy and drops every cached level.
    pub fn set_derivation(&self, derivation: Arc<dyn LevelDerivation>) -> Result<()> {
        let mut state = self.lock();
        if let Some(base) = state.base.clone() {
            let model = build_model(
                &base,
                state.requested_levels,
                derivation.as_ref(),
                state.image_to_model,
            )?;
            state.model = Arc::new(model);
        }
        info!(derivation = derivation.name(), "Replacing level derivation");
        state.derivation = derivation;
        state.reset();
        Ok(())
    }

    /// Switches to the empty sentinel; the model is kept.
    pub fn set_empty(&self) {
        let mut state = self.lock();
        info!("Pyramid source set to empty");
        state.base = None;
        state.reset();
    }

    /// Drops every cached level but keeps the base raster. Hook this to the
    /// data-change feed.
    pub fn invalidate(&self) {
        let mut state = self.lock();
        debug!(generation = state.generation, "Invalidating pyramid levels");
        state.reset();
    }

    /// Requests cancellation of an in-flight derivation of `level`. Returns
    /// `false` if nothing was computing.
    pub fn cancel_level(&self, level: usize) -> bool {
        match self.lock().entries.get(level) {
            Some(Entry::Computing(flight)) => {
                flight.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Looks up `level`, registering the caller as leader when nothing is
    /// cached or in flight.
    fn claim(&self, level: usize) -> Result<Claim> {
        let mut state = self.lock();
        let in_flight = match state.entry(level)? {
            Entry::Ready(image) => return Ok(Claim::Ready(Arc::clone(image))),
            Entry::Computing(flight) => Some(Arc::clone(flight)),
            Entry::Empty | Entry::Failed(_) => None,
        };
        if let Some(flight) = in_flight {
            return Ok(Claim::Wait(flight));
        }
        let flight = Arc::new(Flight::new());
        state.entries[level] = Entry::Computing(Arc::clone(&flight));
        let job = Job {
            base: state.base.clone(),
            model: Arc::clone(&state.model),
            derivation: Arc::clone(&state.derivation),
            generation: state.generation,
        };
        Ok(Claim::Lead(flight, job))
    }

    fn lead(&self, level: usize, flight: &Arc<Flight>, job: Job) -> Result<Arc<Raster>> {
        let result = match &job.base {
            Some(base) => {
                info!(level, derivation = job.derivation.name(), "Deriving pyramid level");
                panic::catch_unwind(AssertUnwindSafe(|| {
                    job.derivation.derive(base, level, &job.model, &flight.cancel)
                }))
                .unwrap_or_else(|_| {
                    Err(RasterViewError::Derivation {
                        level,
                        message: "derivation panicked".into(),
                    })
                })
            }
            None => job
                .model
                .level_size(level)
                .map(|(w, h)| Raster::no_data(w, h)),
        }
        .map(Arc::new);

        let outcome = match &result {
            Ok(image) => Outcome::Ready(Arc::clone(image)),
            Err(RasterViewError::Cancelled { .. }) => Outcome::Cancelled,
            Err(e) => Outcome::Failed(e.to_string()),
        };

        {
            let mut state = self.lock();
            let current = state.generation == job.generation
                && matches!(state.entries.get(level), Some(Entry::Computing(f)) if Arc::ptr_eq(f, flight));
            if current {
                state.entries[level] = match &outcome {
                    Outcome::Ready(image) => Entry::Ready(Arc::clone(image)),
                    Outcome::Cancelled => Entry::Empty,
                    Outcome::Failed(message) => Entry::Failed(message.clone()),
                };
            } else {
                debug!(level, "Discarding level derived for a stale generation");
            }
        }

        match &outcome {
            Outcome::Ready(_) => debug!(level, "Pyramid level ready"),
            Outcome::Cancelled => info!(level, "Pyramid level derivation cancelled"),
            Outcome::Failed(message) => warn!(level, %message, "Pyramid level derivation failed"),
        }
        flight.finish(level, outcome);
        result
    }

    fn lock(&self) -> MutexGuard<'_, SourceState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for PyramidSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("PyramidSource")
            .field("model", &state.model)
            .field("derivation", &state.derivation.name())
            .field("empty", &state.base.is_none())
            .field("generation", &state.generation)
            .finish()
    }
}

impl SourceState {
    fn entry(&self, level: usize) -> Result<&Entry> {
        self.entries.get(level).ok_or(RasterViewError::LevelOutOfRange {
            level,
            level_count: self.entries.len(),
        })
    }

    /// Starts a new cache generation. In-flight derivations are cancelled and
    /// their results will not be cached.
    fn reset(&mut self) {
        for entry in &self.entries {
            if let Entry::Computing(flight) = entry {
                flight.cancel.cancel();
            }
        }
        self.generation += 1;
        self.entries = empty_entries(self.model.level_count());
    }
}

fn empty_entries(level_count: usize) -> Vec<Entry> {
    (0..level_count).map(|_| Entry::Empty).collect()
}

fn build_model(
    base: &Raster,
    level_count: usize,
    derivation: &dyn LevelDerivation,
    image_to_model: Affine,
) -> Result<PyramidModel> {
    let (width, height) = (base.width(), base.height());
    match derivation.scales(width, height, level_count) {
        Some(scales) => PyramidModel::with_scales(width, height, scales, image_to_model),
        None => PyramidModel::new(width, height, level_count, image_to_model),
    }
}
