//! Eligibility evaluation for record pairs.
//!
//! The rule set is built once per run from configuration: group names are
//! resolved to member sets up front, so evaluation itself is pure and never
//! touches a store. The composition is: in cost-center range OR explicitly
//! allow-listed, AND not deny-listed, AND satisfying every group
//! constraint, AND inside the configured base DN.

use std::collections::BTreeSet;
use tracing::{debug, warn};

use idsync_store::{fields, DirectoryStore, GroupRef, Record, RecordKey, StoreError};

use crate::config::FilterConfig;
use crate::error::{EngineError, SyncResult};

/// A configured group with its resolved member set.
#[derive(Debug, Clone)]
struct ResolvedGroup {
    group: GroupRef,
    members: BTreeSet<RecordKey>,
    /// False when the group could not be resolved and the run is
    /// configured to continue anyway; such a group never matches.
    resolved: bool,
}

impl ResolvedGroup {
    fn matches(&self, record: &Record) -> bool {
        if !self.resolved {
            return false;
        }
        self.members.contains(&record.key) || record.member_of(&self.group)
    }
}

/// Immutable eligibility rule set, evaluated once per pair per run.
#[derive(Debug, Clone)]
pub struct EligibilityRules {
    cost_center_range: Option<(i64, i64)>,
    allow_list: BTreeSet<String>,
    deny_list: BTreeSet<String>,
    allow_any: Vec<ResolvedGroup>,
    allow_all: Vec<ResolvedGroup>,
    deny_any: Vec<ResolvedGroup>,
    deny_all: Vec<ResolvedGroup>,
    base_dn: Option<String>,
}

impl EligibilityRules {
    /// Build the rule set from configuration, resolving every configured
    /// group against the directory.
    ///
    /// With `fail_on_unresolved_group` (the default) an unknown group
    /// aborts the run; otherwise it is skipped: never matched for allow
    /// rules, never present for deny rules.
    pub async fn resolve<D: DirectoryStore + ?Sized>(
        config: &FilterConfig,
        directory: &D,
    ) -> SyncResult<Self> {
        let cost_center_range = match (config.cost_center_min, config.cost_center_max) {
            (None, None) => None,
            (min, max) => {
                let min = min.unwrap_or(i64::MIN);
                let max = max.unwrap_or(i64::MAX);
                if min > max {
                    return Err(EngineError::configuration(format!(
                        "cost-center range is empty: min {min} > max {max}"
                    )));
                }
                Some((min, max))
            }
        };

        let allow_any =
            resolve_groups(&config.allow_groups_any, directory, config.fail_on_unresolved_group)
                .await?;
        let allow_all =
            resolve_groups(&config.allow_groups_all, directory, config.fail_on_unresolved_group)
                .await?;
        let deny_any =
            resolve_groups(&config.deny_groups_any, directory, config.fail_on_unresolved_group)
                .await?;
        let deny_all =
            resolve_groups(&config.deny_groups_all, directory, config.fail_on_unresolved_group)
                .await?;

        Ok(Self {
            cost_center_range,
            allow_list: lowercase_set(&config.allow_organizations),
            deny_list: lowercase_set(&config.deny_organizations),
            allow_any,
            allow_all,
            // Unresolved deny groups are dropped entirely: never present.
            deny_any: deny_any.into_iter().filter(|g| g.resolved).collect(),
            deny_all: deny_all.into_iter().filter(|g| g.resolved).collect(),
            base_dn: if config.base_dn.trim().is_empty() {
                None
            } else {
                Some(config.base_dn.trim().to_string())
            },
        })
    }

    /// Evaluate a single record. Pure and total: a missing attribute
    /// matches no allow/deny entry and sits outside every range.
    #[must_use]
    pub fn is_eligible(&self, record: &Record) -> bool {
        self.evaluate(record.identifying_forms(), record.cost_center, record)
    }

    /// Evaluate a record pair. The identifying forms of both sides feed
    /// the allow/deny lists, the cost center comes from the HR side when
    /// it carries one, and group membership plus base-DN scoping are
    /// judged on the directory side, which owns both.
    #[must_use]
    pub fn is_eligible_pair(&self, directory: &Record, hr: &Record) -> bool {
        let mut forms = directory.identifying_forms();
        forms.extend(hr.identifying_forms());
        self.evaluate(forms, hr.cost_center.or(directory.cost_center), directory)
    }

    fn evaluate(&self, forms: Vec<String>, cost_center: Option<i64>, directory: &Record) -> bool {
        let forms: Vec<String> = forms.into_iter().map(|f| f.to_lowercase()).collect();

        // In range OR allow-listed; unconstrained only when neither the
        // range nor the allow list is configured at all.
        let range_or_allowed = if self.cost_center_range.is_none() && self.allow_list.is_empty() {
            true
        } else {
            let in_range = match (self.cost_center_range, cost_center) {
                (Some((min, max)), Some(value)) => value >= min && value <= max,
                _ => false,
            };
            in_range || forms.iter().any(|f| self.allow_list.contains(f))
        };

        let deny_ok = !forms.iter().any(|f| self.deny_list.contains(f));

        let group_ok = (self.allow_any.is_empty()
            || self.allow_any.iter().any(|g| g.matches(directory)))
            && self.allow_all.iter().all(|g| g.matches(directory))
            && !self.deny_any.iter().any(|g| g.matches(directory))
            && (self.deny_all.is_empty() || !self.deny_all.iter().all(|g| g.matches(directory)));

        let dn_ok = match &self.base_dn {
            None => true,
            Some(base) => directory
                .get_str(fields::DISTINGUISHED_NAME)
                .is_some_and(|dn| dn.ends_with(base.as_str())),
        };

        let eligible = range_or_allowed && deny_ok && group_ok && dn_ok;
        if !eligible {
            debug!(
                key = %directory.key,
                range_or_allowed,
                deny_ok,
                group_ok,
                dn_ok,
                "Record not eligible"
            );
        }
        eligible
    }
}

async fn resolve_groups<D: DirectoryStore + ?Sized>(
    names: &[String],
    directory: &D,
    fail_fast: bool,
) -> SyncResult<Vec<ResolvedGroup>> {
    let mut groups = Vec::with_capacity(names.len());
    for name in names {
        let group = GroupRef::new(name.clone());
        match directory.fetch_group_members(&group).await {
            Ok(members) => groups.push(ResolvedGroup {
                group,
                members,
                resolved: true,
            }),
            Err(StoreError::GroupNotFound { .. }) => {
                warn!(group = %name, "Unable to resolve configured group");
                if fail_fast {
                    return Err(EngineError::unresolved_group(name.clone()));
                }
                groups.push(ResolvedGroup {
                    group,
                    members: BTreeSet::new(),
                    resolved: false,
                });
            }
            Err(other) => return Err(EngineError::fetch("directory", other)),
        }
    }
    Ok(groups)
}

fn lowercase_set(values: &[String]) -> BTreeSet<String> {
    values.iter().map(|v| v.trim().to_lowercase()).collect()
}
