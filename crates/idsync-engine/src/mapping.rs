//! Field mappings driving the reconciler.
//!
//! Each mapped field names its attribute on both sides, the normalization
//! used for comparison, and which side is authoritative. The per-field
//! configuration strings of the legacy deployment (`"directory"`,
//! `"hrstore"`, empty) parse into the explicit [`SyncDirection`] so that a
//! typo can no longer silently disable a field the wrong way round.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

use crate::change::TargetSide;
use crate::error::{EngineError, SyncResult};
use crate::normalize::Normalizer;

/// Which side's value is authoritative for a field.
///
/// The direction names the winner, not the written side: `DirectoryWins`
/// overwrites the HR store's value with the directory's, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// The directory value is authoritative; the HR side is written.
    DirectoryWins,
    /// The HR value is authoritative; the directory side is written.
    HrWins,
    /// The field is not reconciled.
    Disabled,
}

impl SyncDirection {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDirection::DirectoryWins => "directory_wins",
            SyncDirection::HrWins => "hr_wins",
            SyncDirection::Disabled => "disabled",
        }
    }

    /// Check whether this direction reconciles at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, SyncDirection::Disabled)
    }

    /// The side a change lands on, `None` when disabled.
    #[must_use]
    pub fn target_side(&self) -> Option<TargetSide> {
        match self {
            SyncDirection::DirectoryWins => Some(TargetSide::HrStore),
            SyncDirection::HrWins => Some(TargetSide::Directory),
            SyncDirection::Disabled => None,
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SyncDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The last three spellings are the legacy configuration strings.
        match s.trim().to_lowercase().as_str() {
            "directory_wins" | "directory" => Ok(SyncDirection::DirectoryWins),
            "hr_wins" | "hrstore" => Ok(SyncDirection::HrWins),
            "disabled" | "" => Ok(SyncDirection::Disabled),
            _ => Err(format!("Unknown sync direction: {s}")),
        }
    }
}

/// How a field's values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Plain value comparison through the mapping's normalizer.
    Plain,
    /// The value is a reference to another person (directory distinguished
    /// name on one side, HR leader identifier on the other) and must be
    /// resolved through the cross-reference before comparison.
    Manager,
}

/// A single field mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Logical field name, used in configuration and reports.
    pub field: String,
    /// Attribute name on the directory side.
    pub directory_attribute: String,
    /// Attribute name on the HR side.
    pub hr_attribute: String,
    /// Normalization applied before comparison.
    pub normalizer: Normalizer,
    /// Which side wins.
    pub direction: SyncDirection,
    /// Comparison kind.
    pub kind: FieldKind,
}

impl FieldMapping {
    /// Create a plain mapping with [`Normalizer::Text`] and reconciliation
    /// disabled until configuration enables it.
    pub fn plain(
        field: impl Into<String>,
        directory_attribute: impl Into<String>,
        hr_attribute: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            directory_attribute: directory_attribute.into(),
            hr_attribute: hr_attribute.into(),
            normalizer: Normalizer::Text,
            direction: SyncDirection::Disabled,
            kind: FieldKind::Plain,
        }
    }

    /// Create a manager mapping (cross-reference comparison).
    pub fn manager(
        field: impl Into<String>,
        directory_attribute: impl Into<String>,
        hr_attribute: impl Into<String>,
    ) -> Self {
        Self {
            kind: FieldKind::Manager,
            ..Self::plain(field, directory_attribute, hr_attribute)
        }
    }

    /// Set the normalizer.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Set the direction.
    #[must_use]
    pub fn with_direction(mut self, direction: SyncDirection) -> Self {
        self.direction = direction;
        self
    }
}

/// The fixed field table of the directory/HR synchronization.
///
/// Directions default to `Disabled`; configuration switches fields on.
#[must_use]
pub fn default_field_table() -> Vec<FieldMapping> {
    vec![
        FieldMapping::plain("givenName", "givenName", "first_name"),
        FieldMapping::plain("surname", "sn", "last_name"),
        FieldMapping::plain("displayName", "displayName", "display_name"),
        FieldMapping::plain("mail", "mail", "email").with_normalizer(Normalizer::CaseFold),
        FieldMapping::plain("telephone", "telephoneNumber", "phone")
            .with_normalizer(Normalizer::Phone),
        FieldMapping::plain("mobile", "mobile", "mobile").with_normalizer(Normalizer::Phone),
        FieldMapping::plain("title", "title", "title"),
        FieldMapping::plain("department", "department", "department"),
        FieldMapping::manager("manager", "manager", "leader_id"),
    ]
}

/// Apply per-field direction strings from configuration to the default
/// field table.
///
/// Unknown direction strings are a configuration error; direction entries
/// for unknown fields are logged and ignored.
pub fn mappings_from_directions(
    directions: &HashMap<String, String>,
) -> SyncResult<Vec<FieldMapping>> {
    let mut table = default_field_table();

    for (field, raw) in directions {
        let direction: SyncDirection = raw.parse().map_err(|message: String| {
            EngineError::configuration(format!("direction for field '{field}': {message}"))
        })?;

        match table.iter_mut().find(|m| m.field == *field) {
            Some(mapping) => mapping.direction = direction,
            None => {
                warn!(field = %field, "Direction configured for unknown field, ignoring");
            }
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_roundtrip() {
        for direction in [
            SyncDirection::DirectoryWins,
            SyncDirection::HrWins,
            SyncDirection::Disabled,
        ] {
            let parsed: SyncDirection = direction.as_str().parse().unwrap();
            assert_eq!(direction, parsed);
        }
    }

    #[test]
    fn test_direction_legacy_strings() {
        assert_eq!(
            "directory".parse::<SyncDirection>().unwrap(),
            SyncDirection::DirectoryWins
        );
        assert_eq!(
            "hrstore".parse::<SyncDirection>().unwrap(),
            SyncDirection::HrWins
        );
        assert_eq!("".parse::<SyncDirection>().unwrap(), SyncDirection::Disabled);
        assert_eq!(
            "HRSTORE".parse::<SyncDirection>().unwrap(),
            SyncDirection::HrWins
        );
        assert!("both".parse::<SyncDirection>().is_err());
    }

    #[test]
    fn test_direction_target_side() {
        assert_eq!(
            SyncDirection::DirectoryWins.target_side(),
            Some(TargetSide::HrStore)
        );
        assert_eq!(
            SyncDirection::HrWins.target_side(),
            Some(TargetSide::Directory)
        );
        assert_eq!(SyncDirection::Disabled.target_side(), None);
    }

    #[test]
    fn test_default_table_shape() {
        let table = default_field_table();
        assert!(table.iter().all(|m| m.direction == SyncDirection::Disabled));

        let manager = table.iter().find(|m| m.field == "manager").unwrap();
        assert_eq!(manager.kind, FieldKind::Manager);

        let telephone = table.iter().find(|m| m.field == "telephone").unwrap();
        assert_eq!(telephone.normalizer, Normalizer::Phone);
    }

    #[test]
    fn test_mappings_from_directions() {
        let mut directions = HashMap::new();
        directions.insert("givenName".to_string(), "directory".to_string());
        directions.insert("title".to_string(), "hrstore".to_string());
        directions.insert("unknownField".to_string(), "directory".to_string());

        let table = mappings_from_directions(&directions).unwrap();
        let given = table.iter().find(|m| m.field == "givenName").unwrap();
        assert_eq!(given.direction, SyncDirection::DirectoryWins);
        let title = table.iter().find(|m| m.field == "title").unwrap();
        assert_eq!(title.direction, SyncDirection::HrWins);
        let mail = table.iter().find(|m| m.field == "mail").unwrap();
        assert_eq!(mail.direction, SyncDirection::Disabled);
    }

    #[test]
    fn test_mappings_from_directions_rejects_unknown_direction() {
        let mut directions = HashMap::new();
        directions.insert("givenName".to_string(), "upstream".to_string());
        assert!(mappings_from_directions(&directions).is_err());
    }
}
