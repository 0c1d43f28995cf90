use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;

use crate::config::PortalConfig;
use crate::storage::KeyValueStore;

/// Field id (or radio group name) to last-known value.
pub type DraftRecord = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    TextArea,
    Select,
    Radio,
    Checkbox,
}

impl FieldKind {
    /// Classifies an element from its tag name and, for `<input>`, its
    /// `type` attribute.
    #[must_use]
    pub fn classify(tag_name: &str, input_type: Option<&str>) -> Self {
        if tag_name.eq_ignore_ascii_case("select") {
            return Self::Select;
        }
        if tag_name.eq_ignore_ascii_case("textarea") {
            return Self::TextArea;
        }
        match input_type.map(|kind| kind.trim().to_ascii_lowercase()) {
            Some(kind) if kind == "radio" => Self::Radio,
            Some(kind) if kind == "checkbox" => Self::Checkbox,
            _ => Self::Text,
        }
    }

    #[must_use]
    pub fn trigger(self) -> FieldTrigger {
        match self {
            Self::Select | Self::Radio | Self::Checkbox => FieldTrigger::Change,
            Self::Text | Self::TextArea => FieldTrigger::Input,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTrigger {
    /// Fires on every keystroke.
    Input,
    Change,
}

impl FieldTrigger {
    #[must_use]
    pub fn event_name(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Change => "change",
        }
    }
}

/// Form fields of the current page, addressed by element id or, for radio
/// buttons, by group name.
pub trait FormView {
    /// `None` when no element has this id.
    fn field_kind(&self, field_id: &str) -> Option<FieldKind>;
    fn field_value(&self, field_id: &str) -> Option<String>;
    fn set_field_value(&self, field_id: &str, value: &str) -> bool;
    fn checked_radio_value(&self, group: &str) -> Option<String>;
    /// Checks the radio in `group` whose value equals `value`.
    fn check_radio(&self, group: &str, value: &str) -> bool;
    /// Distinct group names of every radio input on the page.
    fn radio_groups(&self) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    pub field_id: String,
    pub kind: FieldKind,
    pub trigger: FieldTrigger,
}

/// Listeners the page must attach after [`FormPersist::init`]: each field
/// binding calls [`FormPersist::save`], each radio group calls
/// [`FormPersist::save_radio`] on `change`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormBindings {
    pub fields: Vec<FieldBinding>,
    pub radio_groups: Vec<String>,
}

pub struct FormPersist {
    page_key: String,
    field_ids: Vec<String>,
    store: Rc<dyn KeyValueStore>,
    view: Rc<dyn FormView>,
}

impl FormPersist {
    pub fn new(
        page_key: impl Into<String>,
        field_ids: Vec<String>,
        store: Rc<dyn KeyValueStore>,
        view: Rc<dyn FormView>,
    ) -> Self {
        Self {
            page_key: page_key.into(),
            field_ids,
            store,
            view,
        }
    }

    pub fn page_key(&self) -> &str {
        &self.page_key
    }

    pub fn field_ids(&self) -> &[String] {
        &self.field_ids
    }

    pub fn draft_key(&self) -> String {
        PortalConfig::draft_key(&self.page_key)
    }

    /// Restores the saved draft and returns the listeners to attach.
    pub fn init(&self) -> FormBindings {
        self.restore();

        let fields = self
            .field_ids
            .iter()
            .filter_map(|field_id| {
                let kind = self.view.field_kind(field_id)?;
                Some(FieldBinding {
                    field_id: field_id.clone(),
                    kind,
                    trigger: kind.trigger(),
                })
            })
            .collect();

        let radio_groups = self
            .view
            .radio_groups()
            .into_iter()
            .filter(|group| self.is_tracked(group))
            .collect();

        FormBindings {
            fields,
            radio_groups,
        }
    }

    pub fn restore(&self) {
        let draft = self.draft();
        for field_id in &self.field_ids {
            let Some(value) = draft.get(field_id) else {
                continue;
            };
            if self.view.set_field_value(field_id, value) {
                continue;
            }
            if !self.view.check_radio(field_id, value) {
                tracing::debug!(
                    page = %self.page_key,
                    field = %field_id,
                    "saved draft value has no matching field; dropping it"
                );
            }
        }
    }

    /// Persists the current value of every tracked field.
    pub fn save(&self) {
        let record: DraftRecord = self
            .field_ids
            .iter()
            .filter_map(|field_id| {
                let value = if self.view.field_kind(field_id).is_some() {
                    self.view.field_value(field_id)
                } else {
                    self.view.checked_radio_value(field_id)
                }?;
                Some((field_id.clone(), value))
            })
            .collect();
        self.write(&record);
    }

    /// Persists the checked value of one radio group, keeping other entries.
    pub fn save_radio(&self, group: &str) {
        if !self.is_tracked(group) {
            return;
        }
        let Some(value) = self.view.checked_radio_value(group) else {
            return;
        };
        let mut record = self.draft();
        record.insert(group.to_string(), value);
        self.write(&record);
    }

    /// Loads the stored draft, limited to tracked ids. Unreadable or corrupt
    /// data yields an empty record.
    pub fn draft(&self) -> DraftRecord {
        let key = self.draft_key();
        let raw = match self.store.get_item(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return DraftRecord::new(),
            Err(error) => {
                tracing::debug!(%error, key = %key, "draft read failed");
                return DraftRecord::new();
            }
        };
        let entries: serde_json::Map<String, Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::debug!(%error, key = %key, "ignoring corrupt draft");
                return DraftRecord::new();
            }
        };
        entries
            .into_iter()
            .filter(|(field_id, _)| self.is_tracked(field_id))
            .filter_map(|(field_id, value)| Some((field_id, draft_value(value)?)))
            .collect()
    }

    /// Drops the page's draft; call after a successful submit.
    pub fn clear(&self) {
        let key = self.draft_key();
        if let Err(error) = self.store.remove_item(&key) {
            tracing::warn!(%error, key = %key, "failed to clear draft");
        }
    }

    fn is_tracked(&self, field_id: &str) -> bool {
        self.field_ids.iter().any(|tracked| tracked == field_id)
    }

    fn write(&self, record: &DraftRecord) {
        let key = self.draft_key();
        let raw = match serde_json::to_string(record) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(%error, key = %key, "failed to encode draft");
                return;
            }
        };
        if let Err(error) = self.store.set_item(&key, &raw) {
            tracing::warn!(%error, key = %key, "failed to persist draft");
        }
    }
}

/// Text a field would show for a stored JSON value. `null` and nested
/// values are skipped.
fn draft_value(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
