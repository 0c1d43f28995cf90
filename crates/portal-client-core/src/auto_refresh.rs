use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use crate::scheduler::{Scheduler, TimerHandle};

/// Delay between a form losing focus and polling resuming.
pub const TYPING_GRACE: Duration = Duration::from_millis(1_000);

/// Named polling timers sharing one "user is typing" flag.
///
/// The flag is page-wide: while any bound form has focus, every timer skips
/// its ticks.
pub struct AutoRefresh {
    scheduler: Rc<dyn Scheduler>,
    timers: RefCell<HashMap<String, TimerHandle>>,
    typing: Rc<Cell<bool>>,
    pending_release: Rc<Cell<Option<TimerHandle>>>,
}

impl AutoRefresh {
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            timers: RefCell::new(HashMap::new()),
            typing: Rc::new(Cell::new(false)),
            pending_release: Rc::new(Cell::new(None)),
        }
    }

    pub fn start(&self, name: &str, mut callback: impl FnMut() + 'static, interval: Duration) {
        self.stop(name);

        let typing = Rc::clone(&self.typing);
        let timer_name = name.to_string();
        let handle = self.scheduler.set_interval(
            interval,
            Box::new(move || {
                if typing.get() {
                    tracing::debug!(timer = %timer_name, "refresh tick skipped while typing");
                    return;
                }
                callback();
            }),
        );
        self.timers.borrow_mut().insert(name.to_string(), handle);
    }

    pub fn stop(&self, name: &str) {
        let handle = self.timers.borrow_mut().remove(name);
        if let Some(handle) = handle {
            self.scheduler.cancel(handle);
        }
    }

    pub fn change_interval(
        &self,
        name: &str,
        callback: impl FnMut() + 'static,
        new_interval: Duration,
    ) {
        self.start(name, callback, new_interval);
    }

    pub fn stop_all(&self) {
        let handles: Vec<TimerHandle> = self.timers.borrow_mut().drain().map(|(_, h)| h).collect();
        for handle in handles {
            self.scheduler.cancel(handle);
        }
    }

    /// Focus entered a bound form.
    pub fn typing_started(&self) {
        if let Some(pending) = self.pending_release.take() {
            self.scheduler.cancel(pending);
        }
        self.typing.set(true);
    }

    /// Focus left a bound form; polling resumes after [`TYPING_GRACE`].
    ///
    /// The release is pending until then. [`AutoRefresh::typing_started`]
    /// cancels it, so refocusing inside the grace period keeps polling
    /// paused instead of clearing the flag one second after the first blur.
    pub fn typing_ended(&self) {
        if let Some(pending) = self.pending_release.take() {
            self.scheduler.cancel(pending);
        }
        let typing = Rc::clone(&self.typing);
        let pending_release = Rc::clone(&self.pending_release);
        let handle = self.scheduler.set_timeout(
            TYPING_GRACE,
            Box::new(move || {
                pending_release.set(None);
                typing.set(false);
            }),
        );
        self.pending_release.set(Some(handle));
    }

    pub fn is_user_typing(&self) -> bool {
        self.typing.get()
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.timers.borrow().contains_key(name)
    }

    pub fn active_count(&self) -> usize {
        self.timers.borrow().len()
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.stop_all();
        if let Some(pending) = self.pending_release.take() {
            self.scheduler.cancel(pending);
        }
    }
}
