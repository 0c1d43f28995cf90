use super::*;

enum BrowserTimer {
    Interval(Interval),
    Timeout(Timeout),
}

/// `setInterval` / `setTimeout` scheduler. Dropping a gloo timer clears it,
/// so cancelling is removal from the table.
pub(super) struct BrowserScheduler {
    window: web_sys::Window,
    next_id: Cell<u64>,
    timers: Rc<RefCell<HashMap<u64, BrowserTimer>>>,
}

impl BrowserScheduler {
    pub(super) fn new(window: web_sys::Window) -> Self {
        Self {
            window,
            next_id: Cell::new(1),
            timers: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    fn allocate(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.min(MAX_TIMER_DELAY).as_millis()).unwrap_or(u32::MAX)
}

impl Scheduler for BrowserScheduler {
    fn set_interval(&self, period: Duration, mut tick: Box<dyn FnMut()>) -> TimerHandle {
        let id = self.allocate();
        let interval = Interval::new(millis(period).max(1), move || tick());
        self.timers
            .borrow_mut()
            .insert(id, BrowserTimer::Interval(interval));
        TimerHandle(id)
    }

    fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerHandle {
        let id = self.allocate();
        let timers = Rc::clone(&self.timers);
        let timeout = Timeout::new(millis(delay), move || {
            let fired = timers.borrow_mut().remove(&id);
            drop(fired);
            task();
        });
        self.timers
            .borrow_mut()
            .insert(id, BrowserTimer::Timeout(timeout));
        TimerHandle(id)
    }

    fn request_frame(&self, task: Box<dyn FnOnce()>) {
        let callback = Closure::once_into_js(move || task());
        if let Err(error) = self.window.request_animation_frame(callback.unchecked_ref()) {
            tracing::warn!(?error, "requestAnimationFrame failed");
        }
    }

    fn cancel(&self, handle: TimerHandle) {
        let cancelled = self.timers.borrow_mut().remove(&handle.0);
        drop(cancelled);
    }
}
