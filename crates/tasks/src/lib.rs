//! Task payload handling: the canonical task shape, the normalizer that
//! reconciles flat fields with the legacy `extras` bag, and the request
//! validator for create/update payloads.

pub mod normalize;
pub mod types;
pub mod validate;

pub use normalize::{
    JsonMap, RESERVED_EXTRA_KEYS, StoredExtras, TaskData, TaskPatch, split_stored_extras,
};
pub use types::{TaskPriority, TaskStatus};
pub use validate::{ValidationError, validate_create, validate_update};
