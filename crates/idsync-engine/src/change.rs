//! Change records produced by field reconciliation.

use serde::{Deserialize, Serialize};
use std::fmt;

use idsync_store::RecordKey;

/// The side of a record pair that a change mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSide {
    /// The directory-style identity store.
    Directory,
    /// The human-resources record store.
    HrStore,
}

impl TargetSide {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetSide::Directory => "directory",
            TargetSide::HrStore => "hrstore",
        }
    }
}

impl fmt::Display for TargetSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TargetSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "directory" => Ok(TargetSide::Directory),
            "hrstore" => Ok(TargetSide::HrStore),
            _ => Err(format!("Unknown target side: {s}")),
        }
    }
}

/// A single staged field mutation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Which side the mutation lands on.
    pub side: TargetSide,
    /// Key of the mutated record.
    pub key: RecordKey,
    /// Logical field name.
    pub field: String,
    /// Previous value, `None` when the field was unset.
    pub old: Option<String>,
    /// New value, in its canonical write form.
    pub new: String,
}

impl ChangeRecord {
    /// Create a new change record.
    pub fn new(
        side: TargetSide,
        key: RecordKey,
        field: impl Into<String>,
        old: Option<String>,
        new: impl Into<String>,
    ) -> Self {
        Self {
            side,
            key,
            field: field.into(),
            old,
            new: new.into(),
        }
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} -> {})",
            self.field,
            self.old.as_deref().unwrap_or(""),
            self.new
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_side_roundtrip() {
        for side in [TargetSide::Directory, TargetSide::HrStore] {
            let parsed: TargetSide = side.as_str().parse().unwrap();
            assert_eq!(side, parsed);
        }
    }

    #[test]
    fn test_target_side_invalid() {
        let result: Result<TargetSide, _> = "mainframe".parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_change_record_display() {
        let change = ChangeRecord::new(
            TargetSide::HrStore,
            RecordKey::new("jdoe"),
            "givenName",
            Some("Ann".to_string()),
            "Anna",
        );
        assert_eq!(change.to_string(), "givenName (Ann -> Anna)");

        let change = ChangeRecord::new(
            TargetSide::Directory,
            RecordKey::new("jdoe"),
            "mobile",
            None,
            "12345678",
        );
        assert_eq!(change.to_string(), "mobile ( -> 12345678)");
    }
}
