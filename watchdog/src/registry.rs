use std::sync::{Arc, Weak};
use tracing::{debug, warn};

use crate::unit::{ControlUnit, Status};
use crate::{Result, WatchdogError};

/// Fixed-capacity registry of control units.
///
/// The registry only keeps weak references; the supervised threads own
/// their units.
pub struct Watchdog {
    slots: Box<[Option<Weak<ControlUnit>>]>,
    live: usize,
}

impl Watchdog {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(WatchdogError::ZeroCapacity);
        }
        Ok(Watchdog {
            slots: (0..capacity).map(|_| None).collect(),
            live: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of registered units.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn add_puppy(&mut self, unit: &Arc<ControlUnit>) -> Result<()> {
        if self.position(unit).is_some() {
            return Err(WatchdogError::AlreadyRegistered(unit.name().to_string()));
        }

        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(WatchdogError::Full(self.live))?;
        *slot = Some(Arc::downgrade(unit));
        self.live += 1;

        debug!(unit = unit.name(), live = self.live, "unit registered");
        Ok(())
    }

    /// Unregister `unit`. Returns `false` if it was not registered.
    pub fn remove_puppy(&mut self, unit: &Arc<ControlUnit>) -> bool {
        match self.position(unit) {
            Some(index) => {
                self.slots[index] = None;
                self.live -= 1;
                debug!(unit = unit.name(), live = self.live, "unit unregistered");
                true
            }
            None => false,
        }
    }

    /// Demote every registered, unfinished unit by one step and return the
    /// units condemned by this pass.
    pub fn sweep(&self) -> Vec<Arc<ControlUnit>> {
        let mut condemned = Vec::new();

        for unit in self.slots.iter().flatten().filter_map(Weak::upgrade) {
            let before = unit.status();
            if matches!(before, Status::Finished | Status::Rogue) {
                continue;
            }

            let after = unit.demote();
            if after == Status::Rogue {
                warn!(unit = unit.name(), "unit missed two consecutive sweeps");
                condemned.push(unit);
            }
        }

        condemned
    }

    /// Forget rogue and finished units, and units whose owner is gone.
    /// Returns how many entries were removed.
    pub fn clear(&mut self) -> usize {
        let mut removed = 0;

        for slot in self.slots.iter_mut() {
            let dead = match slot.as_ref().map(Weak::upgrade) {
                None => false,
                Some(None) => true,
                Some(Some(unit)) => matches!(unit.status(), Status::Rogue | Status::Finished),
            };
            if dead {
                *slot = None;
                removed += 1;
            }
        }

        self.live -= removed;
        if removed > 0 {
            debug!(removed, live = self.live, "cleared dead units");
        }
        removed
    }

    fn position(&self, unit: &Arc<ControlUnit>) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), Arc::as_ptr(unit)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[fixture]
    fn unit() -> Arc<ControlUnit> {
        Arc::new(ControlUnit::new("unit"))
    }

    #[rstest]
    fn test_zero_capacity_rejected() {
        assert!(matches!(Watchdog::new(0), Err(WatchdogError::ZeroCapacity)));
    }

    #[rstest]
    fn test_add_and_remove_track_len(unit: Arc<ControlUnit>) {
        let mut watchdog = Watchdog::new(1).unwrap();

        assert_eq!(watchdog.len(), 0);
        watchdog.add_puppy(&unit).unwrap();
        assert_eq!(watchdog.len(), 1);
        assert!(watchdog.remove_puppy(&unit));
        assert_eq!(watchdog.len(), 0);
        assert!(watchdog.is_empty());
    }

    #[rstest]
    fn test_capacity_is_enforced(unit: Arc<ControlUnit>) {
        let mut watchdog = Watchdog::new(1).unwrap();
        let other = Arc::new(ControlUnit::new("other"));

        watchdog.add_puppy(&unit).unwrap();
        assert!(matches!(
            watchdog.add_puppy(&other),
            Err(WatchdogError::Full(1))
        ));

        assert!(watchdog.remove_puppy(&unit));
        watchdog.add_puppy(&other).unwrap();
    }

    #[rstest]
    fn test_duplicate_registration_rejected(unit: Arc<ControlUnit>) {
        let mut watchdog = Watchdog::new(2).unwrap();

        watchdog.add_puppy(&unit).unwrap();
        assert!(matches!(
            watchdog.add_puppy(&unit),
            Err(WatchdogError::AlreadyRegistered(_))
        ));
        assert_eq!(watchdog.len(), 1);
    }

    #[rstest]
    fn test_removing_unregistered_unit_is_noop(unit: Arc<ControlUnit>) {
        let mut watchdog = Watchdog::new(2).unwrap();
        let registered = Arc::new(ControlUnit::new("registered"));
        watchdog.add_puppy(&registered).unwrap();

        assert!(!watchdog.remove_puppy(&unit));
        assert_eq!(watchdog.len(), 1);
    }

    #[rstest]
    fn test_two_silent_sweeps_condemn(unit: Arc<ControlUnit>) {
        let mut watchdog = Watchdog::new(1).unwrap();
        watchdog.add_puppy(&unit).unwrap();
        unit.ping();

        assert!(watchdog.sweep().is_empty());
        assert_eq!(unit.status(), Status::Down);

        let condemned = watchdog.sweep();
        assert_eq!(unit.status(), Status::Rogue);
        assert_eq!(condemned.len(), 1);
        assert!(Arc::ptr_eq(&condemned[0], &unit));

        assert!(watchdog.sweep().is_empty());
    }

    #[rstest]
    fn test_ping_between_sweeps_resets(unit: Arc<ControlUnit>) {
        let mut watchdog = Watchdog::new(1).unwrap();
        watchdog.add_puppy(&unit).unwrap();

        for _ in 0..5 {
            assert!(watchdog.sweep().is_empty());
            assert_eq!(unit.status(), Status::Down);
            unit.ping();
        }
        assert_eq!(unit.status(), Status::Up);
    }

    #[rstest]
    fn test_finished_unit_is_never_swept(unit: Arc<ControlUnit>) {
        let mut watchdog = Watchdog::new(1).unwrap();
        watchdog.add_puppy(&unit).unwrap();
        unit.finish();

        assert!(watchdog.sweep().is_empty());
        assert!(watchdog.sweep().is_empty());
        assert_eq!(unit.status(), Status::Finished);
    }

    #[rstest]
    fn test_clear_removes_only_rogue_and_finished() {
        let mut watchdog = Watchdog::new(4).unwrap();
        let up = Arc::new(ControlUnit::new("up"));
        let down = Arc::new(ControlUnit::new("down"));
        let rogue = Arc::new(ControlUnit::new("rogue"));
        let finished = Arc::new(ControlUnit::new("finished"));
        for unit in [&up, &down, &rogue, &finished] {
            watchdog.add_puppy(unit).unwrap();
        }

        watchdog.sweep();
        up.ping();
        down.ping();
        finished.ping();
        assert_eq!(watchdog.sweep().len(), 1);
        up.ping();
        finished.finish();

        assert_eq!(up.status(), Status::Up);
        assert_eq!(down.status(), Status::Down);
        assert_eq!(rogue.status(), Status::Rogue);

        assert_eq!(watchdog.clear(), 2);
        assert_eq!(watchdog.len(), 2);
        assert!(watchdog.remove_puppy(&up));
        assert!(watchdog.remove_puppy(&down));
        assert!(!watchdog.remove_puppy(&rogue));
        assert!(!watchdog.remove_puppy(&finished));
    }

    #[rstest]
    fn test_clear_frees_slot_for_reuse(unit: Arc<ControlUnit>) {
        let mut watchdog = Watchdog::new(1).unwrap();
        watchdog.add_puppy(&unit).unwrap();
        watchdog.sweep();
        watchdog.sweep();

        watchdog.clear();

        let replacement = Arc::new(ControlUnit::new("replacement"));
        watchdog.add_puppy(&replacement).unwrap();
    }

    #[rstest]
    fn test_dropped_units_are_skipped_and_cleared() {
        let mut watchdog = Watchdog::new(1).unwrap();
        let unit = Arc::new(ControlUnit::new("gone"));
        watchdog.add_puppy(&unit).unwrap();
        drop(unit);

        assert!(watchdog.sweep().is_empty());
        assert_eq!(watchdog.clear(), 1);
        assert!(watchdog.is_empty());
    }
}
