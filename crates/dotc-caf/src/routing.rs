//! # Staff Routing
//!
//! Resolves the staff member responsible for a group of violations.
//!
//! ## Search Order
//!
//! Every tier only considers staff with an active role in the organization
//! and an active status:
//!
//! 1. **Keyword**: position or department contains one of the category's
//!    keywords (case-insensitive substring).
//! 2. **Approver**: any staff member who can approve CAFs.
//! 3. **Any active**: any eligible staff member.
//!
//! If every tier comes back empty the router returns `None` and the caller
//! skips the group.
//!
//! Keyword matching is a heuristic: a "Fleet Safety Analyst" matches both
//! the Driver and Equipment tables. Wrong-department matches are accepted.
//!
//! ## Routing Table
//!
//! The category → keyword mapping is data, not code. [`RoutingTable`] holds
//! a default table plus optional per-organization overrides and loads from
//! YAML:
//!
//! ```yaml
//! default:
//!   driver: [safety, operations]
//!   equipment: [maintenance, fleet]
//!   company: [compliance, manager, director]
//! organizations:
//!   "6f1c2a0e-8f3b-4d7a-9a51-2b4b7e9c0d11":
//!     equipment: [shop]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use dotc_core::{OrganizationId, ResponsibilityCategory, StaffMember};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{StaffQuery, StaffStore, StoreError};

/// Category → keyword list.
pub type KeywordMap = BTreeMap<ResponsibilityCategory, Vec<String>>;

/// Errors loading a routing table.
#[derive(Error, Debug)]
pub enum RoutingTableError {
    #[error("failed to read routing table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse routing table: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A category was given an empty keyword list.
    #[error("routing table {scope}: keyword list for {category} is empty")]
    EmptyKeywords {
        scope: String,
        category: ResponsibilityCategory,
    },
}

/// Category keyword table with per-organization overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    #[serde(default)]
    default: KeywordMap,
    #[serde(default)]
    organizations: BTreeMap<OrganizationId, KeywordMap>,
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RoutingTable {
    /// The built-in table used when no file is configured.
    pub fn builtin() -> Self {
        let mut default = KeywordMap::new();
        default.insert(
            ResponsibilityCategory::Driver,
            vec!["safety".into(), "operations".into()],
        );
        default.insert(
            ResponsibilityCategory::Equipment,
            vec!["maintenance".into(), "fleet".into()],
        );
        default.insert(
            ResponsibilityCategory::Company,
            vec!["compliance".into(), "manager".into(), "director".into()],
        );
        Self {
            default,
            organizations: BTreeMap::new(),
        }
    }

    /// Parse a YAML routing table.
    ///
    /// Categories missing from `default` keep their built-in keywords.
    /// Keywords are trimmed and lower-cased; blank keywords are dropped, and
    /// a category left with no keywords is rejected.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RoutingTableError> {
        let parsed: RoutingTable = serde_yaml::from_str(yaml)?;

        let mut default = Self::builtin().default;
        for (category, keywords) in parsed.default {
            default.insert(category, normalize_keywords("default", category, keywords)?);
        }

        let mut organizations = BTreeMap::new();
        for (org, overrides) in parsed.organizations {
            let scope = org.to_string();
            let mut map = KeywordMap::new();
            for (category, keywords) in overrides {
                map.insert(category, normalize_keywords(&scope, category, keywords)?);
            }
            organizations.insert(org, map);
        }

        Ok(Self {
            default,
            organizations,
        })
    }

    /// Load a YAML routing table from disk.
    pub fn load(path: &Path) -> Result<Self, RoutingTableError> {
        let raw = std::fs::read_to_string(path).map_err(|source| RoutingTableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_yaml_str(&raw)?;
        tracing::info!(
            path = %path.display(),
            overrides = table.organizations.len(),
            "loaded routing table"
        );
        Ok(table)
    }

    /// Keywords for a category, honouring the organization's override.
    pub fn keywords_for(
        &self,
        organization_id: OrganizationId,
        category: ResponsibilityCategory,
    ) -> &[String] {
        self.organizations
            .get(&organization_id)
            .and_then(|m| m.get(&category))
            .or_else(|| self.default.get(&category))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The default keyword map.
    pub fn defaults(&self) -> &KeywordMap {
        &self.default
    }

    /// Organizations with overrides.
    pub fn overrides(&self) -> &BTreeMap<OrganizationId, KeywordMap> {
        &self.organizations
    }
}

fn normalize_keywords(
    scope: &str,
    category: ResponsibilityCategory,
    keywords: Vec<String>,
) -> Result<Vec<String>, RoutingTableError> {
    let cleaned: Vec<String> = keywords
        .into_iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    if cleaned.is_empty() {
        return Err(RoutingTableError::EmptyKeywords {
            scope: scope.to_string(),
            category,
        });
    }
    Ok(cleaned)
}

/// Which search tier produced an assignee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteTier {
    Keyword,
    Approver,
    AnyActive,
}

impl RouteTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Approver => "approver",
            Self::AnyActive => "any_active",
        }
    }
}

/// Result of a successful routing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedStaff {
    pub staff: StaffMember,
    pub tier: RouteTier,
}

/// Resolves assignees against a [`StaffStore`] using a [`RoutingTable`].
#[derive(Debug, Clone, Copy)]
pub struct StaffRouter<'a> {
    table: &'a RoutingTable,
}

impl<'a> StaffRouter<'a> {
    pub fn new(table: &'a RoutingTable) -> Self {
        Self { table }
    }

    /// Find the responsible staff member, or `None` if the organization has
    /// no eligible staff at all.
    pub async fn route<S: StaffStore + ?Sized>(
        &self,
        staff: &S,
        organization_id: OrganizationId,
        category: ResponsibilityCategory,
    ) -> Result<Option<RoutedStaff>, StoreError> {
        let keywords = self.table.keywords_for(organization_id, category).to_vec();
        let tiers = [
            (RouteTier::Keyword, StaffQuery::Keywords(keywords)),
            (RouteTier::Approver, StaffQuery::CanApprove),
            (RouteTier::AnyActive, StaffQuery::AnyActive),
        ];

        for (tier, query) in tiers {
            if matches!(&query, StaffQuery::Keywords(k) if k.is_empty()) {
                continue;
            }
            if let Some(member) = staff.find_staff(organization_id, &query).await? {
                tracing::debug!(
                    organization_id = %organization_id,
                    category = %category,
                    staff_id = %member.id,
                    tier = tier.as_str(),
                    "routed CAF group"
                );
                return Ok(Some(RoutedStaff {
                    staff: member,
                    tier,
                }));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use dotc_core::StaffId;
    use std::io::Write;

    fn member(
        org: OrganizationId,
        name: &str,
        position: Option<&str>,
        department: Option<&str>,
        approver: bool,
    ) -> StaffMember {
        StaffMember {
            id: StaffId::new(),
            organization_id: org,
            name: name.into(),
            position: position.map(String::from),
            department: department.map(String::from),
            can_approve_cafs: approver,
            active: true,
        }
    }

    #[test]
    fn builtin_table_covers_every_category() {
        let table = RoutingTable::builtin();
        let org = OrganizationId::new();
        for cat in ResponsibilityCategory::all() {
            assert!(!table.keywords_for(org, *cat).is_empty());
        }
        assert_eq!(
            table.keywords_for(org, ResponsibilityCategory::Equipment),
            ["maintenance", "fleet"]
        );
    }

    #[test]
    fn yaml_overrides_are_normalized_and_scoped() {
        let org = OrganizationId::new();
        let yaml = format!(
            "default:\n  driver: [' Safety ', OPS]\norganizations:\n  \"{}\":\n    equipment: [Shop]\n",
            org.as_uuid()
        );
        let table = RoutingTable::from_yaml_str(&yaml).unwrap();

        assert_eq!(
            table.keywords_for(org, ResponsibilityCategory::Driver),
            ["safety", "ops"]
        );
        assert_eq!(
            table.keywords_for(org, ResponsibilityCategory::Equipment),
            ["shop"]
        );
        // Untouched categories keep the built-in keywords.
        assert_eq!(
            table.keywords_for(org, ResponsibilityCategory::Company),
            ["compliance", "manager", "director"]
        );
        // Other organizations see the defaults.
        assert_eq!(
            table.keywords_for(OrganizationId::new(), ResponsibilityCategory::Equipment),
            ["maintenance", "fleet"]
        );
    }

    #[test]
    fn empty_keyword_list_is_rejected() {
        let err = RoutingTable::from_yaml_str("default:\n  company: ['  ']\n").unwrap_err();
        assert!(matches!(
            err,
            RoutingTableError::EmptyKeywords {
                category: ResponsibilityCategory::Company,
                ..
            }
        ));
    }

    #[test]
    fn unknown_category_is_a_parse_error() {
        let err = RoutingTable::from_yaml_str("default:\n  cargo: [loader]\n").unwrap_err();
        assert!(matches!(err, RoutingTableError::Parse(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default:\n  equipment: [garage]").unwrap();
        let table = RoutingTable::load(file.path()).unwrap();
        assert_eq!(
            table.keywords_for(OrganizationId::new(), ResponsibilityCategory::Equipment),
            ["garage"]
        );

        let missing = RoutingTable::load(Path::new("/nonexistent/routing.yaml"));
        assert!(matches!(missing, Err(RoutingTableError::Io { .. })));
    }

    #[tokio::test]
    async fn keyword_match_wins() {
        let store = InMemoryStore::new();
        let org = OrganizationId::new();
        store.add_staff(member(org, "Approver", Some("Owner"), None, true));
        let tech = member(org, "Fleet Tech", Some("Fleet Tech"), Some("Maintenance"), false);
        store.add_staff(tech.clone());

        let table = RoutingTable::builtin();
        let routed = StaffRouter::new(&table)
            .route(&store, org, ResponsibilityCategory::Equipment)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(routed.staff.id, tech.id);
        assert_eq!(routed.tier, RouteTier::Keyword);
    }

    #[tokio::test]
    async fn falls_back_to_approver_then_any_active() {
        let store = InMemoryStore::new();
        let org = OrganizationId::new();
        let clerk = member(org, "Clerk", Some("Clerk"), Some("Billing"), false);
        store.add_staff(clerk.clone());

        let table = RoutingTable::builtin();
        let router = StaffRouter::new(&table);

        let routed = router
            .route(&store, org, ResponsibilityCategory::Driver)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(routed.staff.id, clerk.id);
        assert_eq!(routed.tier, RouteTier::AnyActive);

        let owner = member(org, "Owner", Some("Owner"), None, true);
        store.add_staff(owner.clone());
        let routed = router
            .route(&store, org, ResponsibilityCategory::Driver)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(routed.staff.id, owner.id);
        assert_eq!(routed.tier, RouteTier::Approver);
    }

    #[tokio::test]
    async fn no_eligible_staff_routes_nowhere() {
        let store = InMemoryStore::new();
        let org = OrganizationId::new();
        let mut gone = member(org, "Former", Some("Safety Manager"), None, true);
        gone.active = false;
        store.add_staff(gone);
        // Staff of another organization are never considered.
        store.add_staff(member(OrganizationId::new(), "Other", Some("Safety"), None, true));

        let table = RoutingTable::builtin();
        let routed = StaffRouter::new(&table)
            .route(&store, org, ResponsibilityCategory::Driver)
            .await
            .unwrap();
        assert!(routed.is_none());
    }
}
