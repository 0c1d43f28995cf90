use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::Duration;

use crate::error::DomError;
use crate::scheduler::Scheduler;

pub const TOAST_CONTAINER_ID: &str = "toast-container";
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(3_000);
/// Matches the slide-out transition so the element leaves after it finishes.
pub const TOAST_EXIT_DELAY: Duration = Duration::from_millis(300);

pub const TOAST_CONTAINER_STYLE: &str = "position: fixed; bottom: 24px; right: 24px; \
     z-index: 9999; display: flex; flex-direction: column; gap: 8px; pointer-events: none;";
const TOAST_BASE_STYLE: &str = "padding: 12px 20px; border-radius: 12px; \
     font-size: 14px; font-family: 'Sarabun', sans-serif; \
     box-shadow: 0 4px 20px rgba(0,0,0,0.15); \
     display: flex; align-items: center; gap: 8px; \
     transform: translateX(120%); transition: transform 0.3s ease; \
     pointer-events: auto;";
pub const TOAST_ICON_STYLE: &str = "font-size:16px";
pub const TOAST_HIDDEN_TRANSFORM: &str = "translateX(120%)";
pub const TOAST_SHOWN_TRANSFORM: &str = "translateX(0)";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    #[default]
    Info,
    Error,
}

impl ToastKind {
    /// Unrecognized kinds fall back to [`ToastKind::Info`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "success" => Self::Success,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Error => "error",
        }
    }

    #[must_use]
    pub fn background(self) -> &'static str {
        match self {
            Self::Success => "#10b981",
            Self::Info => "#6366f1",
            Self::Error => "#ef4444",
        }
    }

    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::Success => "\u{2713}",
            Self::Info => "\u{2139}",
            Self::Error => "\u{2715}",
        }
    }

    /// Inline style of a toast of this kind, starting off-screen.
    #[must_use]
    pub fn style(self) -> String {
        format!(
            "background: {}; color: white; {TOAST_BASE_STYLE}",
            self.background()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(pub u64);

/// The DOM side of toasts. Implementations keep the id-to-element mapping.
pub trait ToastSurface {
    /// Creates the stacking container; called once per page.
    fn mount_container(&self) -> Result<(), DomError>;
    /// Appends a toast in its hidden, off-screen state. `message` is text,
    /// not markup.
    fn append_toast(&self, id: ToastId, kind: ToastKind, message: &str) -> Result<(), DomError>;
    fn set_toast_shown(&self, id: ToastId, shown: bool);
    fn remove_toast(&self, id: ToastId);
}

pub struct Toaster {
    surface: Rc<dyn ToastSurface>,
    scheduler: Rc<dyn Scheduler>,
    container_ready: Cell<bool>,
    next_id: Cell<u64>,
    live: Rc<RefCell<BTreeSet<ToastId>>>,
}

impl Toaster {
    pub fn new(surface: Rc<dyn ToastSurface>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            surface,
            scheduler,
            container_ready: Cell::new(false),
            next_id: Cell::new(1),
            live: Rc::new(RefCell::new(BTreeSet::new())),
        }
    }

    pub fn show(
        &self,
        message: &str,
        kind: ToastKind,
        duration: Duration,
    ) -> Result<ToastId, DomError> {
        if !self.container_ready.get() {
            self.surface.mount_container()?;
            self.container_ready.set(true);
        }

        let id = ToastId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.surface.append_toast(id, kind, message)?;
        self.live.borrow_mut().insert(id);
        tracing::debug!(toast = id.0, kind = kind.as_str(), "toast shown");

        let surface = Rc::clone(&self.surface);
        self.scheduler
            .request_frame(Box::new(move || surface.set_toast_shown(id, true)));

        let surface = Rc::clone(&self.surface);
        let scheduler = Rc::clone(&self.scheduler);
        let live = Rc::clone(&self.live);
        self.scheduler.set_timeout(
            duration,
            Box::new(move || {
                surface.set_toast_shown(id, false);
                let surface = Rc::clone(&surface);
                scheduler.set_timeout(
                    TOAST_EXIT_DELAY,
                    Box::new(move || {
                        surface.remove_toast(id);
                        live.borrow_mut().remove(&id);
                    }),
                );
            }),
        );

        Ok(id)
    }

    pub fn show_default(&self, message: &str, kind: ToastKind) -> Result<ToastId, DomError> {
        self.show(message, kind, DEFAULT_TOAST_DURATION)
    }

    pub fn active_count(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn is_active(&self, id: ToastId) -> bool {
        self.live.borrow().contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePage, ManualScheduler};

    fn toaster() -> (Toaster, Rc<FakePage>, Rc<ManualScheduler>) {
        let page = Rc::new(FakePage::new());
        let scheduler = Rc::new(ManualScheduler::new());
        (Toaster::new(page.clone(), scheduler.clone()), page, scheduler)
    }

    #[test]
    fn unknown_kind_falls_back_to_info() {
        assert_eq!(ToastKind::parse("warning"), ToastKind::Info);
        assert_eq!(ToastKind::parse(" Success "), ToastKind::Success);
        assert_eq!(ToastKind::parse("error").icon(), "\u{2715}");
        assert!(ToastKind::Error.style().starts_with("background: #ef4444;"));
    }

    #[test]
    fn show_mounts_container_once_and_stacks_toasts() {
        let (toaster, page, _scheduler) = toaster();
        toaster.show_default("Saved", ToastKind::Success).expect("first");
        toaster.show_default("Saved", ToastKind::Success).expect("second");

        assert_eq!(page.container_mounts(), 1);
        assert_eq!(page.toast_messages(), vec!["Saved".to_string(), "Saved".to_string()]);
        assert_eq!(toaster.active_count(), 2);
    }

    #[test]
    fn toast_slides_in_on_next_frame() {
        let (toaster, page, scheduler) = toaster();
        let id = toaster.show_default("Hello", ToastKind::Info).expect("toast");
        assert_eq!(page.toast_shown(id), Some(false));

        scheduler.run_frames();
        assert_eq!(page.toast_shown(id), Some(true));
    }

    #[test]
    fn toast_is_removed_after_duration_plus_exit_delay() {
        let (toaster, page, scheduler) = toaster();
        let id = toaster
            .show("Uploaded", ToastKind::Success, DEFAULT_TOAST_DURATION)
            .expect("toast");
        scheduler.run_frames();

        scheduler.advance(DEFAULT_TOAST_DURATION);
        assert_eq!(page.toast_shown(id), Some(false));
        assert!(toaster.is_active(id));

        scheduler.advance(TOAST_EXIT_DELAY);
        assert_eq!(page.toast_shown(id), None);
        assert!(!toaster.is_active(id));
        assert_eq!(toaster.active_count(), 0);
    }

    #[test]
    fn toasts_dismiss_independently() {
        let (toaster, _page, scheduler) = toaster();
        let short = toaster
            .show("short", ToastKind::Info, Duration::from_millis(500))
            .expect("short");
        let long = toaster
            .show("long", ToastKind::Error, Duration::from_millis(5_000))
            .expect("long");

        scheduler.advance(Duration::from_millis(800));
        assert!(!toaster.is_active(short));
        assert!(toaster.is_active(long));
    }

    #[test]
    fn mount_failure_is_reported_and_retried() {
        let (toaster, page, _scheduler) = toaster();
        page.fail_next_mount();
        assert!(toaster.show_default("x", ToastKind::Info).is_err());
        assert!(toaster.show_default("x", ToastKind::Info).is_ok());
        assert_eq!(page.container_mounts(), 1);
    }
}
