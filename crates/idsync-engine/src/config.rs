//! Job configuration types.
//!
//! Every option is optional with a stated default; hosts deserialize these
//! from whatever configuration source they use. Loading is out of scope
//! here, the types only define names, shapes and defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Eligibility rule configuration shared by all jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Lower bound of the cost-center range, inclusive.
    #[serde(default)]
    pub cost_center_min: Option<i64>,
    /// Upper bound of the cost-center range, inclusive.
    #[serde(default)]
    pub cost_center_max: Option<i64>,
    /// Organization allow list, matched case-insensitively against every
    /// identifying form of a record. Alternative to the range: a record in
    /// range OR on this list passes.
    #[serde(default)]
    pub allow_organizations: Vec<String>,
    /// Organization deny list. A match here always excludes the record.
    #[serde(default)]
    pub deny_organizations: Vec<String>,
    /// Record must be member of at least one of these groups.
    #[serde(default)]
    pub allow_groups_any: Vec<String>,
    /// Record must be member of all of these groups.
    #[serde(default)]
    pub allow_groups_all: Vec<String>,
    /// Record must be member of none of these groups.
    #[serde(default)]
    pub deny_groups_any: Vec<String>,
    /// Record must not be member of all of these groups at once.
    #[serde(default)]
    pub deny_groups_all: Vec<String>,
    /// Scope to records below this distinguished name. Empty disables the
    /// check.
    #[serde(default)]
    pub base_dn: String,
    /// Abort the run when a configured group cannot be resolved. When
    /// false the group is skipped: never matched for allow rules, never
    /// present for deny rules.
    #[serde(default = "default_fail_on_unresolved_group")]
    pub fail_on_unresolved_group: bool,
}

fn default_fail_on_unresolved_group() -> bool {
    true
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            cost_center_min: None,
            cost_center_max: None,
            allow_organizations: Vec::new(),
            deny_organizations: Vec::new(),
            allow_groups_any: Vec::new(),
            allow_groups_all: Vec::new(),
            deny_groups_any: Vec::new(),
            deny_groups_all: Vec::new(),
            base_dn: String::new(),
            fail_on_unresolved_group: default_fail_on_unresolved_group(),
        }
    }
}

/// Report delivery options shared by all jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageConfig {
    /// Whether to deliver a report at all.
    #[serde(default = "default_message_send")]
    pub send: bool,
    /// Recipients, empty to use the reporter's default.
    #[serde(default)]
    pub to: Vec<String>,
    /// Subject line.
    #[serde(default = "default_message_subject")]
    pub subject: String,
}

fn default_message_send() -> bool {
    true
}

fn default_message_subject() -> String {
    "Identity synchronization".to_string()
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            send: default_message_send(),
            to: Vec::new(),
            subject: default_message_subject(),
        }
    }
}

/// Configuration of the directory/HR synchronization job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncJobConfig {
    /// Job name; scopes the persisted watermark.
    #[serde(default = "default_job_name")]
    pub job_name: String,
    /// Dry-run gate. While true (the default) no store mutation is issued;
    /// changes are still computed and reported.
    #[serde(default = "default_fail_always")]
    pub fail_always: bool,
    /// Audit note prepended to a directory record on write.
    #[serde(default = "default_info_text")]
    pub info_text: String,
    /// Restrict the HR fetch to active records.
    #[serde(default = "default_active_only")]
    pub active_only: bool,
    /// Per-field direction strings: `"directory"`, `"hrstore"` or empty.
    #[serde(default)]
    pub directions: HashMap<String, String>,
    /// Eligibility rules.
    #[serde(default)]
    pub filter: FilterConfig,
    /// Report delivery.
    #[serde(default)]
    pub message: MessageConfig,
}

fn default_job_name() -> String {
    "hr-sync".to_string()
}

fn default_fail_always() -> bool {
    true
}

fn default_info_text() -> String {
    "User automatically updated.".to_string()
}

fn default_active_only() -> bool {
    true
}

impl Default for SyncJobConfig {
    fn default() -> Self {
        Self {
            job_name: default_job_name(),
            fail_always: default_fail_always(),
            info_text: default_info_text(),
            active_only: default_active_only(),
            directions: HashMap::new(),
            filter: FilterConfig::default(),
            message: MessageConfig::default(),
        }
    }
}

/// Action taken on an inactive user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InactiveAction {
    /// Disable the account.
    Disable,
    /// Disable, then delete the account.
    Delete,
    /// Only report, touch nothing.
    Report,
}

impl InactiveAction {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            InactiveAction::Disable => "disable",
            InactiveAction::Delete => "delete",
            InactiveAction::Report => "report",
        }
    }
}

impl fmt::Display for InactiveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for InactiveAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disable" => Ok(InactiveAction::Disable),
            "delete" => Ok(InactiveAction::Delete),
            "report" => Ok(InactiveAction::Report),
            _ => Err(format!("Unknown inactive action: {s}")),
        }
    }
}

/// Configuration of the inactive-users job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InactiveUsersConfig {
    /// Dry-run gate, as in [`SyncJobConfig`].
    #[serde(default = "default_fail_always")]
    pub fail_always: bool,
    /// Audit note prepended to a disabled record.
    #[serde(default = "default_inactive_info_text")]
    pub info_text: String,
    /// Days without logon before a user counts as inactive. Values below 1
    /// fall back to the default.
    #[serde(default = "default_inactive_days")]
    pub inactive_days: i64,
    /// What to do with an inactive user.
    #[serde(default = "default_inactive_action")]
    pub action: InactiveAction,
    /// Eligibility rules.
    #[serde(default)]
    pub filter: FilterConfig,
    /// Report delivery.
    #[serde(default)]
    pub message: MessageConfig,
}

fn default_inactive_info_text() -> String {
    "User automatically disabled.".to_string()
}

fn default_inactive_days() -> i64 {
    90
}

fn default_inactive_action() -> InactiveAction {
    InactiveAction::Disable
}

impl Default for InactiveUsersConfig {
    fn default() -> Self {
        Self {
            fail_always: default_fail_always(),
            info_text: default_inactive_info_text(),
            inactive_days: default_inactive_days(),
            action: default_inactive_action(),
            filter: FilterConfig::default(),
            message: MessageConfig::default(),
        }
    }
}

impl InactiveUsersConfig {
    /// The effective inactivity window, coercing nonsense values to the
    /// default.
    #[must_use]
    pub fn effective_inactive_days(&self) -> i64 {
        if self.inactive_days < 1 {
            default_inactive_days()
        } else {
            self.inactive_days
        }
    }
}

/// Configuration of the registry synchronization job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySyncConfig {
    /// Job name; scopes the persisted watermark independently of the
    /// HR-sync watermark.
    #[serde(default = "default_registry_job_name")]
    pub job_name: String,
    /// Dry-run gate.
    #[serde(default = "default_fail_always")]
    pub fail_always: bool,
    /// Audit note prepended to a directory record on write.
    #[serde(default = "default_info_text")]
    pub info_text: String,
    /// Synchronize directory records against the registry.
    #[serde(default)]
    pub sync_directory: bool,
    /// Synchronize HR records against the registry.
    #[serde(default)]
    pub sync_hr: bool,
    /// Only touch enabled directory accounts.
    #[serde(default = "default_active_only")]
    pub directory_enabled_only: bool,
    /// Only touch active HR records.
    #[serde(default = "default_active_only")]
    pub hr_active_only: bool,
    /// Per-name-field toggles.
    #[serde(default = "default_name_field")]
    pub sync_given_name: bool,
    #[serde(default = "default_name_field")]
    pub sync_surname: bool,
    #[serde(default = "default_name_field")]
    pub sync_full_name: bool,
    #[serde(default = "default_name_field")]
    pub sync_display_name: bool,
    /// Eligibility rules.
    #[serde(default)]
    pub filter: FilterConfig,
    /// Report delivery.
    #[serde(default)]
    pub message: MessageConfig,
}

fn default_registry_job_name() -> String {
    "registry-sync".to_string()
}

fn default_name_field() -> bool {
    true
}

impl Default for RegistrySyncConfig {
    fn default() -> Self {
        Self {
            job_name: default_registry_job_name(),
            fail_always: default_fail_always(),
            info_text: default_info_text(),
            sync_directory: false,
            sync_hr: false,
            directory_enabled_only: default_active_only(),
            hr_active_only: default_active_only(),
            sync_given_name: default_name_field(),
            sync_surname: default_name_field(),
            sync_full_name: default_name_field(),
            sync_display_name: default_name_field(),
            filter: FilterConfig::default(),
            message: MessageConfig::default(),
        }
    }
}
