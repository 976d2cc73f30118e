//! Report cadence: the slow timer interrupt and its due flag
//!
//! The report interrupt does no I/O. It only raises [`DueFlag`], which the main
//! loop consumes. Keeping the handler this small means it can never delay the
//! dust pulse interrupt.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// One-bit "report is due" signal.
///
/// Single writer (report interrupt), single reader (main loop). At most one
/// pending event is represented: raising an already raised flag is coalesced.
pub struct DueFlag(AtomicBool);

impl DueFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Returns `true` if the flag was already set, i.e. this event was merged
    /// into the pending one.
    pub fn raise(&self) -> bool {
        self.0.swap(true, Ordering::AcqRel)
    }

    /// Clear the flag and return whether it was set.
    ///
    /// The swap clears before the caller acts, so an event raised while the
    /// caller is still working stays pending for the next poll.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for DueFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// State behind the periodic report interrupt.
pub struct ReportScheduler {
    due: DueFlag,
    ticks: AtomicU32,
    overruns: AtomicU32,
}

impl ReportScheduler {
    pub const fn new() -> Self {
        Self {
            due: DueFlag::new(),
            ticks: AtomicU32::new(0),
            overruns: AtomicU32::new(0),
        }
    }

    /// Body of the report interrupt handler.
    pub fn on_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        if self.due.raise() {
            self.overruns.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Main loop side: consume the pending event, if any.
    pub fn take_due(&self) -> bool {
        self.due.take()
    }

    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Take the number of ticks lost to coalescing since the last call.
    pub fn take_overruns(&self) -> u32 {
        self.overruns.swap(0, Ordering::Relaxed)
    }
}

impl Default for ReportScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_take_clears() {
        let flag = DueFlag::new();
        assert!(!flag.take());
        assert!(!flag.raise());
        assert!(flag.is_raised());
        assert!(flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn test_double_raise_is_coalesced() {
        let scheduler = ReportScheduler::new();
        scheduler.on_tick();
        scheduler.on_tick();

        assert!(scheduler.take_due());
        assert!(!scheduler.take_due());
        assert_eq!(scheduler.ticks(), 2);
        assert_eq!(scheduler.take_overruns(), 1);
        assert_eq!(scheduler.take_overruns(), 0);
    }

    #[test]
    fn test_raise_after_take_stays_pending() {
        let scheduler = ReportScheduler::new();
        scheduler.on_tick();
        assert!(scheduler.take_due());
        scheduler.on_tick();
        assert!(scheduler.take_due());
        assert_eq!(scheduler.take_overruns(), 0);
    }
}
