use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// Timer and animation-frame scheduling on the page's event loop.
///
/// Callbacks run on the same thread that scheduled them and never re-enter
/// the scheduler while it holds internal borrows.
pub trait Scheduler {
    fn set_interval(&self, period: Duration, tick: Box<dyn FnMut()>) -> TimerHandle;
    fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerHandle;
    fn request_frame(&self, task: Box<dyn FnOnce()>);
    /// Cancelling an unknown or already-fired handle is a no-op.
    fn cancel(&self, handle: TimerHandle);
}
