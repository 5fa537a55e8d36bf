//! Concurrency guards bracketing internal interrupt/resume cycles and
//! the first auto-continue (spec §4.4 "Concurrency guards").

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct SessionFlags {
    suppress_stopped_events: AtomicBool,
    continuing: AtomicBool,
    configuration_done: AtomicBool,
    end_session: AtomicBool,
}

impl SessionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suppress_stopped_events(&self) -> bool {
        self.suppress_stopped_events.load(Ordering::SeqCst)
    }

    pub fn set_suppress_stopped_events(&self, value: bool) {
        self.suppress_stopped_events.store(value, Ordering::SeqCst);
    }

    pub fn continuing(&self) -> bool {
        self.continuing.load(Ordering::SeqCst)
    }

    pub fn set_continuing(&self, value: bool) {
        self.continuing.store(value, Ordering::SeqCst);
    }

    pub fn configuration_done(&self) -> bool {
        self.configuration_done.load(Ordering::SeqCst)
    }

    pub fn set_configuration_done(&self, value: bool) {
        self.configuration_done.store(value, Ordering::SeqCst);
    }

    /// `finishSession` is idempotent (spec §5): returns `true` the first
    /// time it is called, `false` on every call after.
    pub fn begin_end_session(&self) -> bool {
        self.end_session
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
