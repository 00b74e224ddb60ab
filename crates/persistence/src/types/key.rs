//! Entity keys.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The key of a current-table row.
///
/// Most kinds use a backend-assigned integer. ReferenceRange is keyed by its
/// LOINC code, so its key is the business value itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityKey {
    /// Surrogate integer key.
    Id(i64),
    /// Natural text key.
    Code(String),
}

impl EntityKey {
    /// Returns the integer key, if this is a surrogate key.
    pub fn as_id(&self) -> Option<i64> {
        match self {
            EntityKey::Id(id) => Some(*id),
            EntityKey::Code(_) => None,
        }
    }

    /// Returns the text key, if this is a natural key.
    pub fn as_code(&self) -> Option<&str> {
        match self {
            EntityKey::Id(_) => None,
            EntityKey::Code(code) => Some(code),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Id(id) => write!(f, "{}", id),
            EntityKey::Code(code) => f.write_str(code),
        }
    }
}

impl From<i64> for EntityKey {
    fn from(id: i64) -> Self {
        EntityKey::Id(id)
    }
}

impl From<&str> for EntityKey {
    fn from(code: &str) -> Self {
        EntityKey::Code(code.to_string())
    }
}

impl From<String> for EntityKey {
    fn from(code: String) -> Self {
        EntityKey::Code(code)
    }
}

impl From<&EntityKey> for EntityKey {
    fn from(key: &EntityKey) -> Self {
        key.clone()
    }
}
