use serde_json::Value;
use thiserror::Error;

use crate::{
    normalize::{
        JsonMap, TaskData, TaskPatch, custom_extras, non_null, normalize_due_date, normalize_tags,
        parse_priority, parse_status, reserved_value,
    },
    types::{TaskPriority, TaskStatus},
};

pub const TITLE_MAX_CHARS: usize = 255;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("payload must be a JSON object")]
    PayloadNotObject,
    #[error("title is required and must be a non-empty string")]
    TitleRequired,
    #[error("title cannot exceed 255 characters")]
    TitleTooLong,
    #[error("description must be a string")]
    DescriptionInvalid,
    #[error("description cannot exceed 1000 characters")]
    DescriptionTooLong,
    #[error("status must be one of: pending, in-progress, done (got '{0}')")]
    InvalidStatus(String),
    #[error("priority must be one of: low, medium, high (got '{0}')")]
    InvalidPriority(String),
    #[error("dueDate must be a YYYY-MM-DD date or RFC 3339 timestamp (got '{0}')")]
    InvalidDueDate(String),
    #[error("tags must be an array of strings")]
    InvalidTags,
    #[error("extras must be a JSON object")]
    InvalidExtras,
    #[error("update payload must include at least one recognized field")]
    EmptyUpdate,
}

/// Validates a create payload and resolves it into canonical [`TaskData`],
/// promoting reserved keys out of `extras` and applying defaults.
pub fn validate_create(payload: &Value) -> Result<TaskData, ValidationError> {
    let map = as_object(payload)?;
    let extras_in = extras_object(map)?;

    let title = required_title(map.get("title"))?;
    let description = match non_null(map.get("description")) {
        Some(value) => valid_description(value)?,
        None => String::new(),
    };
    let status = match non_null(map.get("status")) {
        Some(value) => parse_status(value)?,
        None => TaskStatus::default(),
    };
    let priority = match reserved_value(map, extras_in, "priority") {
        Some(value) => parse_priority(value)?,
        None => TaskPriority::default(),
    };
    let due_date = match due_date_value(map, extras_in) {
        Some(value) => normalize_due_date(value)?,
        None => None,
    };
    let tags = match reserved_value(map, extras_in, "tags") {
        Some(value) => normalize_tags(value)?,
        None => Vec::new(),
    };

    Ok(TaskData {
        title,
        description,
        status,
        priority,
        due_date,
        tags,
        extras: custom_extras(extras_in),
    })
}

/// Validates an update payload into a [`TaskPatch`]. Absent fields stay
/// untouched; a payload carrying no recognized field at all is rejected.
pub fn validate_update(payload: &Value) -> Result<TaskPatch, ValidationError> {
    let map = as_object(payload)?;
    let extras_in = extras_object(map)?;

    let mut patch = TaskPatch::default();

    if let Some(value) = map.get("title") {
        patch.title = Some(valid_title(value)?);
    }
    if let Some(value) = non_null(map.get("description")) {
        patch.description = Some(valid_description(value)?);
    }
    if let Some(value) = non_null(map.get("status")) {
        patch.status = Some(parse_status(value)?);
    }
    if let Some(value) = reserved_value(map, extras_in, "priority") {
        patch.priority = Some(parse_priority(value)?);
    }
    if let Some(value) = due_date_value(map, extras_in) {
        patch.due_date = Some(normalize_due_date(value)?);
    }
    if let Some(value) = reserved_value(map, extras_in, "tags") {
        patch.tags = Some(normalize_tags(value)?);
    }
    if let Some(extras) = extras_in {
        let custom = custom_extras(Some(extras));
        if !custom.is_empty() {
            patch.extras = Some(custom);
        }
    }

    if patch.is_empty() {
        return Err(ValidationError::EmptyUpdate);
    }
    Ok(patch)
}

fn as_object(payload: &Value) -> Result<&JsonMap, ValidationError> {
    payload.as_object().ok_or(ValidationError::PayloadNotObject)
}

/// `extras` must be an object when present; `null` reads as absent.
fn extras_object(map: &JsonMap) -> Result<Option<&JsonMap>, ValidationError> {
    match map.get("extras") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(extras)) => Ok(Some(extras)),
        Some(_) => Err(ValidationError::InvalidExtras),
    }
}

/// Unlike the other reserved fields, `null` is a meaningful due date (an
/// explicit clear), so lookup goes by key presence rather than value.
fn due_date_value<'a>(map: &'a JsonMap, extras: Option<&'a JsonMap>) -> Option<&'a Value> {
    map.get("dueDate")
        .or_else(|| extras.and_then(|extras| extras.get("dueDate")))
}

fn required_title(value: Option<&Value>) -> Result<String, ValidationError> {
    match non_null(value) {
        Some(value) => valid_title(value),
        None => Err(ValidationError::TitleRequired),
    }
}

fn valid_title(value: &Value) -> Result<String, ValidationError> {
    let raw = value.as_str().ok_or(ValidationError::TitleRequired)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::TitleRequired);
    }
    if trimmed.chars().count() > TITLE_MAX_CHARS {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(trimmed.to_string())
}

fn valid_description(value: &Value) -> Result<String, ValidationError> {
    let raw = value.as_str().ok_or(ValidationError::DescriptionInvalid)?;
    if raw.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(ValidationError::DescriptionTooLong);
    }
    Ok(raw.to_string())
}
