//! Field checks shared by the entity kinds.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::core::EntityKind;
use crate::error::ValidationError;

static LOINC_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,7}-\d$").expect("valid LOINC pattern"));

static SNOMED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{6,18}$").expect("valid SNOMED CT pattern"));

/// Fails if a required text field is empty or whitespace.
pub(crate) fn require_text(kind: EntityKind, field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingRequiredField {
            kind,
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Fails if a numeric field is NaN or infinite.
pub(crate) fn require_finite(kind: EntityKind, field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidField {
            kind,
            field: field.to_string(),
            message: format!("{} is not a finite number", value),
        });
    }
    Ok(())
}

/// Checks an optional numeric field.
pub(crate) fn optional_finite(
    kind: EntityKind,
    field: &str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    value.map_or(Ok(()), |v| require_finite(kind, field, v))
}

/// Fails if `low` exceeds `high` when both bounds are present.
pub(crate) fn ordered_bounds(
    kind: EntityKind,
    field: &str,
    low: Option<f64>,
    high: Option<f64>,
) -> Result<(), ValidationError> {
    if let (Some(low), Some(high)) = (low, high) {
        if low > high {
            return Err(ValidationError::InvalidField {
                kind,
                field: field.to_string(),
                message: format!("lower bound {} exceeds upper bound {}", low, high),
            });
        }
    }
    Ok(())
}

/// Checks the shape of a LOINC code.
pub(crate) fn loinc_code(kind: EntityKind, field: &str, value: &str) -> Result<(), ValidationError> {
    require_text(kind, field, value)?;
    if !LOINC_CODE.is_match(value) {
        return Err(ValidationError::InvalidField {
            kind,
            field: field.to_string(),
            message: format!("'{}' is not a LOINC code", value),
        });
    }
    Ok(())
}

/// Checks the shape of a SNOMED CT concept id.
pub(crate) fn snomed_code(kind: EntityKind, field: &str, value: &str) -> Result<(), ValidationError> {
    require_text(kind, field, value)?;
    if !SNOMED_CODE.is_match(value) {
        return Err(ValidationError::InvalidField {
            kind,
            field: field.to_string(),
            message: format!("'{}' is not a SNOMED CT concept id", value),
        });
    }
    Ok(())
}

/// Deserializes a present field (including an explicit `null`) as `Some`.
///
/// Combined with `#[serde(default)]` this keeps "absent" (`None`) apart from
/// "set to null" (`Some(None)`) in patch types.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
