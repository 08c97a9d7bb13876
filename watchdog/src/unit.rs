use parking_lot::Mutex;
use std::fmt;
use std::thread::{self, Thread};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Pinged since the last sweep.
    Up,
    /// Missed one sweep.
    Down,
    /// Missed two consecutive sweeps; condemned.
    Rogue,
    /// The owning thread has returned. Terminal.
    Finished,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Up => "up",
            Status::Down => "down",
            Status::Rogue => "rogue",
            Status::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Liveness record of one supervised thread.
///
/// Only the owning thread calls [`ping`](Self::ping) and
/// [`finish`](Self::finish); the watchdog inspects the unit under its own
/// lock and never holds two unit locks at once.
pub struct ControlUnit {
    name: String,
    state: Mutex<UnitState>,
}

struct UnitState {
    status: Status,
    thread: Option<Thread>,
}

impl ControlUnit {
    pub fn new(name: impl Into<String>) -> Self {
        ControlUnit {
            name: name.into(),
            state: Mutex::new(UnitState {
                status: Status::Up,
                thread: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record the calling thread as the owner of this unit.
    pub fn attach_current_thread(&self) {
        self.state.lock().thread = Some(thread::current());
    }

    pub fn thread(&self) -> Option<Thread> {
        self.state.lock().thread.clone()
    }

    pub fn status(&self) -> Status {
        self.state.lock().status
    }

    /// Heartbeat. A finished unit stays finished.
    pub fn ping(&self) {
        let mut state = self.state.lock();
        if state.status != Status::Finished {
            state.status = Status::Up;
        }
    }

    pub fn finish(&self) {
        self.state.lock().status = Status::Finished;
    }

    /// One sweep step: `Up -> Down`, `Down -> Rogue`. Returns the new status.
    pub(crate) fn demote(&self) -> Status {
        let mut state = self.state.lock();
        state.status = match state.status {
            Status::Up => Status::Down,
            Status::Down | Status::Rogue => Status::Rogue,
            Status::Finished => Status::Finished,
        };
        state.status
    }
}

impl fmt::Debug for ControlUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlUnit")
            .field("name", &self.name)
            .field("status", &self.status())
            .finish()
    }
}
