pub mod groups;
pub mod scripts;
pub mod servers;
pub mod stats;
pub mod tasks;

use fleet_core::error::CoreError;
use fleet_core::types::DbId;

/// Unwrap a required body field or fail with a validation error.
pub(crate) fn require(field: &str, value: Option<DbId>) -> Result<DbId, CoreError> {
    value.ok_or_else(|| CoreError::Validation(format!("{field} is required")))
}
