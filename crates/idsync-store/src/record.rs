//! Record model shared by the directory and HR store boundaries.
//!
//! Both stores describe the same people; a [`Record`] is the common shape a
//! store adapter maps its native entry into before the reconciliation core
//! ever sees it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Well-known attribute names used across both stores.
pub mod fields {
    /// Directory distinguished name.
    pub const DISTINGUISHED_NAME: &str = "distinguishedName";
    /// Informational/audit note attribute.
    pub const INFO: &str = "info";
    /// Account enabled flag (directory side).
    pub const ENABLED: &str = "enabled";
    /// Last interactive logon timestamp (directory side).
    pub const LAST_LOGON: &str = "lastLogon";
    /// National identity number.
    pub const NATIONAL_ID: &str = "nationalId";
    /// HR employee identifier, referenced by leader fields.
    pub const EMPLOYEE_ID: &str = "employeeId";
}

/// Key shared by both stores for the same person (the directory account name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
    /// Create a new record key.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the key value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison; account names are not case sensitive
    /// in either store.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Reference to a directory group, by name or distinguished name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupRef(String);

impl GroupRef {
    /// Create a new group reference.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the group name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GroupRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for GroupRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Organizational unit a record belongs to.
///
/// All three forms participate in allow/deny list matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgRef {
    /// Numeric organization identifier.
    pub id: i64,
    /// Short name (e.g., "IT-OPS").
    pub short_name: String,
    /// Display name.
    pub name: String,
}

impl OrgRef {
    /// Create a new organization reference.
    pub fn new(id: i64, short_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            short_name: short_name.into(),
            name: name.into(),
        }
    }

    /// The identifying forms of this organization, as matched by
    /// allow/deny lists.
    #[must_use]
    pub fn forms(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.short_name.clone(),
            self.name.clone(),
        ]
    }
}

/// A value for a record attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// No value (null).
    Null,
    /// A timestamp value.
    Timestamp(DateTime<Utc>),
    /// A single string value.
    String(String),
    /// A single integer value.
    Integer(i64),
    /// A single boolean value.
    Boolean(bool),
    /// Multiple string values.
    MultiString(Vec<String>),
}

impl AttributeValue {
    /// Create a null value.
    #[must_use]
    pub fn null() -> Self {
        AttributeValue::Null
    }

    /// Check if this is a null value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Get as a string if this is a single string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as an integer if this is an integer value.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as a boolean if this is a boolean value.
    #[must_use]
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as a timestamp if this is a timestamp value.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            AttributeValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Get as strings (works for both single and multi-valued).
    #[must_use]
    pub fn as_strings(&self) -> Vec<&str> {
        match self {
            AttributeValue::String(s) => vec![s.as_str()],
            AttributeValue::MultiString(values) => values.iter().map(String::as_str).collect(),
            _ => vec![],
        }
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Integer(i)
    }
}

impl From<i32> for AttributeValue {
    fn from(i: i32) -> Self {
        AttributeValue::Integer(i64::from(i))
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Boolean(b)
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(t: DateTime<Utc>) -> Self {
        AttributeValue::Timestamp(t)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(values: Vec<String>) -> Self {
        AttributeValue::MultiString(values)
    }
}

/// One entity on either side, keyed by the shared account name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Shared cross-store key.
    pub key: RecordKey,
    /// Field name to current value.
    pub attributes: HashMap<String, AttributeValue>,
    /// When the record was last modified in its owning store.
    pub modified_at: DateTime<Utc>,
    /// Groups/organizations the record is a member of.
    #[serde(default)]
    pub groups: BTreeSet<GroupRef>,
    /// Numeric classification attribute (cost-center code) used by
    /// range rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_center: Option<i64>,
    /// Organizational unit, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrgRef>,
}

impl Record {
    /// Create a new record with no attributes.
    pub fn new(key: impl Into<RecordKey>, modified_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            attributes: HashMap::new(),
            modified_at,
            groups: BTreeSet::new(),
            cost_center: None,
            organization: None,
        }
    }

    /// Set an attribute value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Set an attribute value, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Set the organization, builder style.
    #[must_use]
    pub fn with_organization(mut self, organization: OrgRef) -> Self {
        self.organization = Some(organization);
        self
    }

    /// Set the cost center, builder style.
    #[must_use]
    pub fn with_cost_center(mut self, cost_center: i64) -> Self {
        self.cost_center = Some(cost_center);
        self
    }

    /// Add a group membership, builder style.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<GroupRef>) -> Self {
        self.groups.insert(group.into());
        self
    }

    /// Get an attribute value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Get an attribute as a string slice.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(AttributeValue::as_str)
    }

    /// Check whether an attribute is present.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Check membership of a single group.
    #[must_use]
    pub fn member_of(&self, group: &GroupRef) -> bool {
        self.groups.contains(group)
    }

    /// The identifying forms of this record, as matched by allow/deny
    /// lists: the key plus the organization's id, short name and name.
    #[must_use]
    pub fn identifying_forms(&self) -> Vec<String> {
        let mut forms = vec![self.key.as_str().to_string()];
        if let Some(org) = &self.organization {
            forms.extend(org.forms());
        }
        forms
    }

    /// Prepend an audit note to the record's informational attribute,
    /// stamped with the given date. Existing notes are kept below the
    /// new one.
    pub fn prepend_note(&mut self, stamp: DateTime<Utc>, note: &str) {
        let line = format!("{} {}", stamp.format("%Y-%m-%d"), note);
        let merged = match self.get_str(fields::INFO) {
            Some(existing) if !existing.is_empty() => format!("{line}\n{existing}"),
            _ => line,
        };
        self.set(fields::INFO, merged);
    }
}
