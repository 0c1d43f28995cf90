//! Deterministic in-memory stand-ins for the browser seams.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;

use crate::api::{ApiRequest, ApiResponse, HttpTransport, Navigator};
use crate::auth::PageView;
use crate::error::{ApiError, DomError};
use crate::form_persist::{FieldKind, FormView};
use crate::scheduler::{Scheduler, TimerHandle};
use crate::toast::{ToastId, ToastKind, ToastSurface};

enum Task {
    Interval {
        period: Duration,
        tick: Box<dyn FnMut()>,
    },
    Timeout(Box<dyn FnOnce()>),
}

struct Entry {
    due: Duration,
    task: Task,
}

#[derive(Default)]
struct ClockState {
    now: Duration,
    next_id: u64,
    entries: BTreeMap<u64, Entry>,
    frames: Vec<Box<dyn FnOnce()>>,
    running: Option<u64>,
    running_cancelled: bool,
}

/// Virtual clock. Nothing fires until [`ManualScheduler::advance`] or
/// [`ManualScheduler::run_frames`] is called.
#[derive(Default)]
pub struct ManualScheduler {
    state: RefCell<ClockState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    /// Timers still scheduled.
    pub fn pending(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn run_frames(&self) {
        let frames = std::mem::take(&mut self.state.borrow_mut().frames);
        for frame in frames {
            frame();
        }
    }

    /// Runs pending frames, then every timer due up to `now + by`, in due
    /// order (ties in scheduling order).
    pub fn advance(&self, by: Duration) {
        self.run_frames();
        let target = self.state.borrow().now + by;
        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                let due = state
                    .entries
                    .iter()
                    .filter(|(_, entry)| entry.due <= target)
                    .min_by_key(|(id, entry)| (entry.due, **id))
                    .map(|(id, _)| *id);
                let Some(id) = due else {
                    break;
                };
                let Some(entry) = state.entries.remove(&id) else {
                    break;
                };
                state.now = entry.due;
                state.running = Some(id);
                state.running_cancelled = false;
                (id, entry)
            };

            let (id, entry) = next;
            match entry.task {
                Task::Timeout(task) => {
                    task();
                    self.finish_running();
                }
                Task::Interval { period, mut tick } => {
                    tick();
                    let mut state = self.state.borrow_mut();
                    let cancelled = state.running_cancelled;
                    state.running = None;
                    state.running_cancelled = false;
                    if !cancelled {
                        state.entries.insert(
                            id,
                            Entry {
                                due: entry.due + period,
                                task: Task::Interval { period, tick },
                            },
                        );
                    }
                }
            }
        }
        self.state.borrow_mut().now = target;
    }

    fn finish_running(&self) {
        let mut state = self.state.borrow_mut();
        state.running = None;
        state.running_cancelled = false;
    }

    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = state.next_id;
        let due = state.now + delay;
        state.entries.insert(id, Entry { due, task });
        TimerHandle(id)
    }
}

impl Scheduler for ManualScheduler {
    fn set_interval(&self, period: Duration, tick: Box<dyn FnMut()>) -> TimerHandle {
        let period = period.max(Duration::from_millis(1));
        self.schedule(period, Task::Interval { period, tick })
    }

    fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerHandle {
        self.schedule(delay, Task::Timeout(task))
    }

    fn request_frame(&self, task: Box<dyn FnOnce()>) {
        self.state.borrow_mut().frames.push(task);
    }

    fn cancel(&self, handle: TimerHandle) {
        let mut state = self.state.borrow_mut();
        if state.entries.remove(&handle.0).is_none() && state.running == Some(handle.0) {
            state.running_cancelled = true;
        }
    }
}

/// Records navigations and confirm prompts; answers every prompt the same.
pub struct RecordingNavigator {
    confirm_answer: Cell<bool>,
    navigations: RefCell<Vec<String>>,
    prompts: RefCell<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new(confirm_answer: bool) -> Self {
        Self {
            confirm_answer: Cell::new(confirm_answer),
            navigations: RefCell::new(Vec::new()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn set_confirm_answer(&self, answer: bool) {
        self.confirm_answer.set(answer);
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.borrow().clone()
    }

    pub fn confirm_prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, location: &str) {
        self.navigations.borrow_mut().push(location.to_string());
    }

    fn confirm(&self, message: &str) -> bool {
        self.prompts.borrow_mut().push(message.to_string());
        self.confirm_answer.get()
    }
}

/// Replays queued outcomes in order and records every request.
#[derive(Default)]
pub struct StubTransport {
    outcomes: RefCell<VecDeque<Result<ApiResponse, ApiError>>>,
    requests: RefCell<Vec<ApiRequest>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: ApiResponse) {
        self.outcomes.borrow_mut().push_back(Ok(response));
    }

    pub fn push_error(&self, error: ApiError) {
        self.outcomes.borrow_mut().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl HttpTransport for StubTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.requests.borrow_mut().push(request);
        self.outcomes
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network("no stubbed response".to_string())))
    }
}

#[derive(Debug, Clone)]
struct FakeElement {
    id: String,
    kind: Option<FieldKind>,
    value: String,
    text: String,
    visible: bool,
    radio_group: Option<String>,
    checked: bool,
}

impl FakeElement {
    fn plain(id: &str, visible: bool) -> Self {
        Self {
            id: id.to_string(),
            kind: None,
            value: String::new(),
            text: String::new(),
            visible,
            radio_group: None,
            checked: false,
        }
    }
}

#[derive(Debug, Clone)]
struct FakeToast {
    id: ToastId,
    message: String,
    shown: bool,
}

/// In-memory page implementing every DOM-facing view.
#[derive(Default)]
pub struct FakePage {
    elements: RefCell<Vec<FakeElement>>,
    toasts: RefCell<Vec<FakeToast>>,
    container_mounts: Cell<usize>,
    fail_next_mount: Cell<bool>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element(&self, id: &str) {
        self.elements.borrow_mut().push(FakeElement::plain(id, true));
    }

    pub fn add_hidden_element(&self, id: &str) {
        self.elements
            .borrow_mut()
            .push(FakeElement::plain(id, false));
    }

    pub fn add_field(&self, id: &str, kind: FieldKind, value: &str) {
        let mut element = FakeElement::plain(id, true);
        element.kind = Some(kind);
        element.value = value.to_string();
        self.elements.borrow_mut().push(element);
    }

    pub fn add_radio(&self, group: &str, id: &str, value: &str) {
        let mut element = FakeElement::plain(id, true);
        element.kind = Some(FieldKind::Radio);
        element.value = value.to_string();
        element.radio_group = Some(group.to_string());
        self.elements.borrow_mut().push(element);
    }

    /// Simulates the user editing a field.
    pub fn type_value(&self, id: &str, value: &str) {
        let _ = self.find_mut(id, |element| element.value = value.to_string());
    }

    pub fn choose_radio(&self, group: &str, value: &str) {
        self.check_radio(group, value);
    }

    pub fn value(&self, id: &str) -> Option<String> {
        self.find(id).map(|element| element.value)
    }

    pub fn text(&self, id: &str) -> Option<String> {
        self.find(id).map(|element| element.text)
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.find(id).is_some_and(|element| element.visible)
    }

    pub fn checked(&self, group: &str) -> Option<String> {
        self.checked_radio_value(group)
    }

    pub fn container_mounts(&self) -> usize {
        self.container_mounts.get()
    }

    pub fn fail_next_mount(&self) {
        self.fail_next_mount.set(true);
    }

    pub fn toast_messages(&self) -> Vec<String> {
        self.toasts
            .borrow()
            .iter()
            .map(|toast| toast.message.clone())
            .collect()
    }

    /// `None` once the toast has been removed.
    pub fn toast_shown(&self, id: ToastId) -> Option<bool> {
        self.toasts
            .borrow()
            .iter()
            .find(|toast| toast.id == id)
            .map(|toast| toast.shown)
    }

    fn find(&self, id: &str) -> Option<FakeElement> {
        self.elements
            .borrow()
            .iter()
            .find(|element| element.id == id)
            .cloned()
    }

    fn find_mut(&self, id: &str, update: impl FnOnce(&mut FakeElement)) -> Option<()> {
        let mut elements = self.elements.borrow_mut();
        let element = elements.iter_mut().find(|element| element.id == id)?;
        update(element);
        Some(())
    }
}

impl PageView for FakePage {
    fn set_text(&self, element_id: &str, text: &str) -> bool {
        self.find_mut(element_id, |element| element.text = text.to_string())
            .is_some()
    }

    fn reveal(&self, element_id: &str) -> bool {
        self.find_mut(element_id, |element| element.visible = true)
            .is_some()
    }
}

impl FormView for FakePage {
    fn field_kind(&self, field_id: &str) -> Option<FieldKind> {
        self.find(field_id).and_then(|element| element.kind)
    }

    fn field_value(&self, field_id: &str) -> Option<String> {
        self.find(field_id)
            .filter(|element| element.kind.is_some())
            .map(|element| element.value)
    }

    fn set_field_value(&self, field_id: &str, value: &str) -> bool {
        let mut elements = self.elements.borrow_mut();
        let Some(element) = elements
            .iter_mut()
            .find(|element| element.id == field_id && element.kind.is_some())
        else {
            return false;
        };
        element.value = value.to_string();
        true
    }

    fn checked_radio_value(&self, group: &str) -> Option<String> {
        self.elements
            .borrow()
            .iter()
            .find(|element| element.radio_group.as_deref() == Some(group) && element.checked)
            .map(|element| element.value.clone())
    }

    fn check_radio(&self, group: &str, value: &str) -> bool {
        let mut elements = self.elements.borrow_mut();
        let in_group = |element: &FakeElement| element.radio_group.as_deref() == Some(group);
        if !elements
            .iter()
            .any(|element| in_group(element) && element.value == value)
        {
            return false;
        }
        for element in elements.iter_mut().filter(|element| in_group(element)) {
            element.checked = element.value == value;
        }
        true
    }

    fn radio_groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = Vec::new();
        for element in self.elements.borrow().iter() {
            if let Some(group) = &element.radio_group {
                if !groups.contains(group) {
                    groups.push(group.clone());
                }
            }
        }
        groups
    }
}

impl ToastSurface for FakePage {
    fn mount_container(&self) -> Result<(), DomError> {
        if self.fail_next_mount.replace(false) {
            return Err(DomError::new("document body is unavailable"));
        }
        self.container_mounts.set(self.container_mounts.get() + 1);
        Ok(())
    }

    fn append_toast(&self, id: ToastId, _kind: ToastKind, message: &str) -> Result<(), DomError> {
        self.toasts.borrow_mut().push(FakeToast {
            id,
            message: message.to_string(),
            shown: false,
        });
        Ok(())
    }

    fn set_toast_shown(&self, id: ToastId, shown: bool) {
        if let Some(toast) = self
            .toasts
            .borrow_mut()
            .iter_mut()
            .find(|toast| toast.id == id)
        {
            toast.shown = shown;
        }
    }

    fn remove_toast(&self, id: ToastId) {
        self.toasts.borrow_mut().retain(|toast| toast.id != id);
    }
}
