use std::cell::Cell;
use std::rc::Rc;

/// Which side is currently writing scroll state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriveState {
    #[default]
    Idle,
    /// Scrollbar values are being recomputed from the viewport.
    DrivingFromViewport,
    /// The viewport is being moved from user scrollbar input.
    DrivingFromScrollbar,
}

/// Shared re-entrancy guard. Only `Idle → Driving*` transitions are
/// allowed; the returned [`DriveToken`] restores `Idle` when dropped.
#[derive(Clone, Debug, Default)]
pub(crate) struct DriveGuard {
    state: Rc<Cell<DriveState>>,
}

impl DriveGuard {
    pub(crate) fn get(&self) -> DriveState {
        self.state.get()
    }

    /// Enter `target`. Returns `None` (and changes nothing) unless the guard
    /// is idle and `target` is a driving state.
    pub(crate) fn enter(&self, target: DriveState) -> Option<DriveToken> {
        if target == DriveState::Idle || self.state.get() != DriveState::Idle {
            return None;
        }
        self.state.set(target);
        Some(DriveToken {
            state: Rc::clone(&self.state),
        })
    }

    pub(crate) fn monitor(&self) -> DriveMonitor {
        DriveMonitor {
            state: Rc::clone(&self.state),
        }
    }
}

#[derive(Debug)]
pub(crate) struct DriveToken {
    state: Rc<Cell<DriveState>>,
}

impl Drop for DriveToken {
    fn drop(&mut self) {
        self.state.set(DriveState::Idle);
    }
}

/// Read-only view of a controller's drive state, e.g. for a viewport
/// listener that must ignore changes the scrollbars caused.
#[derive(Clone, Debug)]
pub struct DriveMonitor {
    state: Rc<Cell<DriveState>>,
}

impl DriveMonitor {
    pub fn get(&self) -> DriveState {
        self.state.get()
    }
}
