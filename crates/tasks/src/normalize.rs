use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};

use crate::{
    types::{TaskPriority, TaskStatus},
    validate::ValidationError,
};

pub type JsonMap = Map<String, Value>;

/// Keys that are first-class task fields but historically traveled inside the
/// `extras` bag. They may arrive in either position (or both); canonical tasks
/// keep them only in their dedicated fields.
pub const RESERVED_EXTRA_KEYS: [&str; 3] = ["priority", "dueDate", "tags"];

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_EXTRA_KEYS.contains(&key)
}

/// Fully resolved task content: every field populated, `extras` holding custom
/// keys only. This is the one shape that gets persisted and served.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskData {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub extras: JsonMap,
}

/// Validated update payload. `None` means the field was not mentioned and
/// stays untouched; `due_date: Some(None)` is an explicit clear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub tags: Option<Vec<String>>,
    pub extras: Option<JsonMap>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.tags.is_none()
            && self.extras.is_none()
    }

    /// Applies the patch on top of the current content. Scalar fields are
    /// replaced wholesale; `extras` is shallow-merged key by key so custom
    /// keys the payload never mentioned survive.
    pub fn apply(self, mut current: TaskData) -> TaskData {
        if let Some(title) = self.title {
            current.title = title;
        }
        if let Some(description) = self.description {
            current.description = description;
        }
        if let Some(status) = self.status {
            current.status = status;
        }
        if let Some(priority) = self.priority {
            current.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            current.due_date = due_date;
        }
        if let Some(tags) = self.tags {
            current.tags = tags;
        }
        if let Some(extras) = self.extras {
            for (key, value) in extras {
                current.extras.insert(key, value);
            }
        }
        current
    }
}

/// Reserved-field lookup with top-level precedence. Explicit `null` counts as
/// absent so a nested copy can still win (`dueDate` is handled separately
/// because `null` is a meaningful value there).
pub(crate) fn reserved_value<'a>(
    payload: &'a JsonMap,
    extras: Option<&'a JsonMap>,
    key: &str,
) -> Option<&'a Value> {
    non_null(payload.get(key)).or_else(|| extras.and_then(|map| non_null(map.get(key))))
}

pub(crate) fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|value| !value.is_null())
}

pub(crate) fn parse_status(value: &Value) -> Result<TaskStatus, ValidationError> {
    let raw = value
        .as_str()
        .ok_or_else(|| ValidationError::InvalidStatus(render(value)))?;
    raw.parse()
        .map_err(|_| ValidationError::InvalidStatus(raw.to_string()))
}

pub(crate) fn parse_priority(value: &Value) -> Result<TaskPriority, ValidationError> {
    let raw = value
        .as_str()
        .ok_or_else(|| ValidationError::InvalidPriority(render(value)))?;
    raw.parse()
        .map_err(|_| ValidationError::InvalidPriority(raw.to_string()))
}

/// `null` and `""` mean "no due date". Strings accept plain `YYYY-MM-DD` or an
/// RFC 3339 timestamp (only the date part is kept).
pub(crate) fn normalize_due_date(value: &Value) -> Result<Option<NaiveDate>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .or_else(|| {
                    DateTime::parse_from_rfc3339(trimmed)
                        .ok()
                        .map(|timestamp| timestamp.date_naive())
                })
                .map(Some)
                .ok_or_else(|| ValidationError::InvalidDueDate(trimmed.to_string()))
        }
        other => Err(ValidationError::InvalidDueDate(render(other))),
    }
}

pub(crate) fn normalize_tags(value: &Value) -> Result<Vec<String>, ValidationError> {
    let items = value.as_array().ok_or(ValidationError::InvalidTags)?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or(ValidationError::InvalidTags)
        })
        .collect()
}

/// Custom keys of an inbound `extras` object; reserved keys are consumed by
/// field resolution and never stored inside extras.
pub(crate) fn custom_extras(extras: Option<&JsonMap>) -> JsonMap {
    extras
        .map(|map| {
            map.iter()
                .filter(|(key, _)| !is_reserved_key(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default()
}

fn render(value: &Value) -> String {
    match value {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

/// Stored `extras` blob split into presentable parts. Rows written before the
/// flat columns existed can still carry reserved keys in the blob; those keys
/// are never surfaced inside `extras`, and a parsable `dueDate` is kept as a
/// fallback for rows whose column is NULL.
#[derive(Debug, Default, PartialEq)]
pub struct StoredExtras {
    pub custom: JsonMap,
    pub due_date: Option<NaiveDate>,
}

pub fn split_stored_extras(stored: Value) -> StoredExtras {
    let map = match stored {
        Value::Object(map) => map,
        _ => return StoredExtras::default(),
    };

    let mut split = StoredExtras::default();
    for (key, value) in map {
        if key == "dueDate" {
            if let Ok(parsed) = normalize_due_date(&value) {
                split.due_date = parsed;
            }
        } else if !is_reserved_key(&key) {
            split.custom.insert(key, value);
        }
        // Legacy priority/tags copies are shadowed by their NOT NULL columns.
    }
    split
}
