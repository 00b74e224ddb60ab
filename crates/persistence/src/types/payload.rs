//! Untyped payload ingress.
//!
//! Request layers usually hold JSON. These helpers read it into the typed
//! create and patch inputs, reporting any shape or type problem as a
//! [`ValidationError`] before storage is touched.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::Entity;
use crate::error::ValidationError;

/// Reads a full create payload for `E` and validates it.
pub fn parse_create<E: Entity>(payload: Value) -> Result<E, ValidationError> {
    let entity: E = decode::<E, E>(payload)?;
    entity.validate()?;
    Ok(entity)
}

/// Reads a partial update payload for `E`.
///
/// Absent fields stay absent in the patch; explicit `null` clears a nullable
/// field.
pub fn parse_patch<E: Entity>(payload: Value) -> Result<E::Patch, ValidationError> {
    decode::<E, E::Patch>(payload)
}

fn decode<E: Entity, T: DeserializeOwned>(payload: Value) -> Result<T, ValidationError> {
    if !payload.is_object() {
        return Err(ValidationError::InvalidPayload {
            kind: E::SCHEMA.kind,
            message: "expected a JSON object".to_string(),
        });
    }
    serde_json::from_value(payload).map_err(|e| ValidationError::InvalidPayload {
        kind: E::SCHEMA.kind,
        message: e.to_string(),
    })
}
