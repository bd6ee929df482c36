//! Usage normalization
//!
//! Two shapes are produced from one usage report:
//!
//! - [`normalize_usage`]: one [`BillingItem`] per usage record, every raw
//!   field kept, scope labels attached. Nothing is aggregated.
//! - [`normalize_legacy`]: the pre-v5 action/package/storage buckets. Each
//!   record is classified once into a [`UsageClass`] and folded into the
//!   matching bucket.
//!
//! The legacy paid/included values are read from `netAmount` and
//! `discountAmount`. They approximate the old dedicated endpoints and are
//! not authoritative.

use chrono::{Datelike, NaiveDate};
use gitmeter_common::{Scope, ScopeKind, UsageItem, UsageResponse};
use std::collections::BTreeMap;

/// Bytes in one gigabyte (1024³)
pub const BYTES_PER_GIGABYTE: f64 = 1024.0 * 1024.0 * 1024.0;

/// Label names of the v5 usage gauges, in order
pub const BILLING_LABELS: [&str; 8] = [
    "type",
    "name",
    "product",
    "sku",
    "unit_type",
    "date",
    "organization_name",
    "repository_name",
];

/// A usage record with its scope
#[derive(Debug, Clone, PartialEq)]
pub struct BillingItem {
    pub scope: Scope,
    pub usage: UsageItem,
}

/// Deduplication key of a [`BillingItem`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BillingKey {
    pub kind: ScopeKind,
    pub name: String,
    pub product: String,
    pub sku: String,
    pub date: String,
}

impl BillingItem {
    pub fn key(&self) -> BillingKey {
        BillingKey {
            kind: self.scope.kind(),
            name: self.scope.name().to_string(),
            product: self.usage.product.clone(),
            sku: self.usage.sku.clone(),
            date: self.usage.date.clone(),
        }
    }

    /// Label values matching [`BILLING_LABELS`]
    pub fn labels(&self) -> [&str; 8] {
        [
            self.scope.kind().as_label(),
            self.scope.name(),
            &self.usage.product,
            &self.usage.sku,
            &self.usage.unit_type,
            &self.usage.date,
            &self.usage.organization_name,
            &self.usage.repository_name,
        ]
    }
}

/// Attach `scope` to every usage record, keeping record order
pub fn normalize_usage(response: UsageResponse, scope: &Scope) -> Vec<BillingItem> {
    response
        .usage_items
        .into_iter()
        .map(|usage| BillingItem {
            scope: scope.clone(),
            usage,
        })
        .collect()
}

// ============ LEGACY BUCKETS ============

/// Action minutes for one scope
#[derive(Debug, Clone, PartialEq)]
pub struct ActionBilling {
    pub scope: Scope,
    pub total_minutes_used: f64,
    pub total_paid_minutes_used: f64,
    pub included_minutes: f64,
    /// Whole minutes per operating system
    pub minutes_used_breakdown: BTreeMap<String, u64>,
}

/// Package bandwidth for one scope, in gigabytes
#[derive(Debug, Clone, PartialEq)]
pub struct PackageBilling {
    pub scope: Scope,
    pub total_gigabytes_bandwidth_used: f64,
    pub total_paid_gigabytes_bandwidth_used: f64,
    pub included_gigabytes_bandwidth: f64,
}

/// Git LFS storage for one scope
#[derive(Debug, Clone, PartialEq)]
pub struct StorageBilling {
    pub scope: Scope,
    pub days_left_in_billing_cycle: i64,
    pub estimated_paid_storage_for_month: f64,
    pub estimated_storage_for_month: f64,
}

/// One legacy bucket
#[derive(Debug, Clone, PartialEq)]
pub enum LegacyBilling {
    Actions(ActionBilling),
    Packages(PackageBilling),
    Storage(StorageBilling),
}

impl LegacyBilling {
    pub fn scope(&self) -> &Scope {
        match self {
            LegacyBilling::Actions(bill) => &bill.scope,
            LegacyBilling::Packages(bill) => &bill.scope,
            LegacyBilling::Storage(bill) => &bill.scope,
        }
    }

    /// Bucket name used in logs and dedup keys
    pub fn bucket(&self) -> &'static str {
        match self {
            LegacyBilling::Actions(_) => "action",
            LegacyBilling::Packages(_) => "package",
            LegacyBilling::Storage(_) => "storage",
        }
    }
}

/// Legacy classification of a single usage record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UsageClass {
    ActionMinutes { os: Option<&'static str> },
    PackageBandwidth { gigabytes: f64 },
    Storage { gigabytes: f64 },
}

/// Classify a record; `None` for records outside the legacy buckets
pub fn classify(item: &UsageItem) -> Option<UsageClass> {
    let unit = item.unit_type.to_lowercase();
    let gigabytes = || {
        if unit == "bytes" {
            item.quantity / BYTES_PER_GIGABYTE
        } else {
            item.quantity
        }
    };

    match item.product.to_lowercase().as_str() {
        "actions" if unit == "minutes" => Some(UsageClass::ActionMinutes {
            os: os_from_sku(&item.sku),
        }),
        "packages" if matches!(unit.as_str(), "bytes" | "gigabytes") => {
            Some(UsageClass::PackageBandwidth {
                gigabytes: gigabytes(),
            })
        }
        "git_lfs" if matches!(unit.as_str(), "bytes" | "gigabytes" | "gigabytehours") => {
            Some(UsageClass::Storage {
                gigabytes: gigabytes(),
            })
        }
        _ => None,
    }
}

/// Operating system encoded in a SKU
pub fn os_from_sku(sku: &str) -> Option<&'static str> {
    let sku = sku.to_lowercase();
    if sku.contains("linux") {
        Some("UBUNTU")
    } else if sku.contains("windows") {
        Some("WINDOWS")
    } else if sku.contains("macos") || sku.contains("mac") {
        Some("MACOS")
    } else {
        None
    }
}

/// Days from `today` until the first day of the next month
pub fn days_left_in_cycle(today: NaiveDate) -> i64 {
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };

    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|next| next.signed_duration_since(today).num_days())
        .unwrap_or_default()
}

/// Fold a usage report into the three legacy buckets
///
/// Always returns `[Actions, Packages, Storage]`, zero-valued when the
/// report is empty.
pub fn normalize_legacy(
    response: &UsageResponse,
    scope: &Scope,
    today: NaiveDate,
) -> [LegacyBilling; 3] {
    let mut actions = ActionBilling {
        scope: scope.clone(),
        total_minutes_used: 0.0,
        total_paid_minutes_used: 0.0,
        included_minutes: 0.0,
        minutes_used_breakdown: BTreeMap::new(),
    };
    let mut packages = PackageBilling {
        scope: scope.clone(),
        total_gigabytes_bandwidth_used: 0.0,
        total_paid_gigabytes_bandwidth_used: 0.0,
        included_gigabytes_bandwidth: 0.0,
    };
    let mut storage = StorageBilling {
        scope: scope.clone(),
        days_left_in_billing_cycle: days_left_in_cycle(today),
        estimated_paid_storage_for_month: 0.0,
        estimated_storage_for_month: 0.0,
    };

    for item in &response.usage_items {
        match classify(item) {
            Some(UsageClass::ActionMinutes { os }) => {
                actions.total_minutes_used += item.quantity;
                actions.total_paid_minutes_used += item.net_amount;
                actions.included_minutes += item.discount_amount;
                if let Some(os) = os {
                    *actions
                        .minutes_used_breakdown
                        .entry(os.to_string())
                        .or_default() += item.quantity.max(0.0) as u64;
                }
            }
            Some(UsageClass::PackageBandwidth { gigabytes }) => {
                packages.total_gigabytes_bandwidth_used += gigabytes;
                packages.total_paid_gigabytes_bandwidth_used += item.net_amount;
                packages.included_gigabytes_bandwidth += item.discount_amount;
            }
            Some(UsageClass::Storage { gigabytes }) => {
                storage.estimated_storage_for_month += gigabytes;
                storage.estimated_paid_storage_for_month += item.net_amount;
            }
            None => {}
        }
    }

    [
        LegacyBilling::Actions(actions),
        LegacyBilling::Packages(packages),
        LegacyBilling::Storage(storage),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product: &str, unit_type: &str, sku: &str, quantity: f64) -> UsageItem {
        UsageItem {
            date: "2025-03-01T00:00:00Z".to_string(),
            product: product.to_string(),
            sku: sku.to_string(),
            quantity,
            unit_type: unit_type.to_string(),
            ..UsageItem::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 20).unwrap()
    }

    fn buckets(items: Vec<UsageItem>) -> (ActionBilling, PackageBilling, StorageBilling) {
        let scope = Scope::org("acme").unwrap();
        let response = UsageResponse { usage_items: items };
        match normalize_legacy(&response, &scope, today()) {
            [LegacyBilling::Actions(a), LegacyBilling::Packages(p), LegacyBilling::Storage(s)] => {
                (a, p, s)
            }
            other => panic!("unexpected bucket order: {:?}", other),
        }
    }

    #[test]
    fn test_actions_minutes() {
        let mut linux = item("actions", "minutes", "Actions Linux", 10.0);
        linux.net_amount = 8.0;
        linux.discount_amount = 2.0;

        let (actions, _, _) = buckets(vec![linux]);
        assert_eq!(actions.total_minutes_used, 10.0);
        assert_eq!(actions.total_paid_minutes_used, 8.0);
        assert_eq!(actions.included_minutes, 2.0);
        assert_eq!(
            actions.minutes_used_breakdown,
            BTreeMap::from([("UBUNTU".to_string(), 10)])
        );
    }

    #[test]
    fn test_actions_case_insensitive_and_unclassified_sku() {
        let (actions, _, _) = buckets(vec![
            item("Actions", "Minutes", "actions_windows", 4.0),
            item("ACTIONS", "minutes", "actions_macos_12_core", 2.5),
            item("actions", "minutes", "actions_custom_image", 6.0),
            item("actions", "gigabytes", "actions_storage", 100.0),
        ]);

        assert_eq!(actions.total_minutes_used, 12.5);
        assert_eq!(actions.minutes_used_breakdown.get("WINDOWS"), Some(&4));
        assert_eq!(actions.minutes_used_breakdown.get("MACOS"), Some(&2));
        assert_eq!(actions.minutes_used_breakdown.len(), 2);
    }

    #[test]
    fn test_packages_byte_conversion() {
        let mut bytes = item("packages", "bytes", "packages_bandwidth", 1_073_741_824.0);
        bytes.net_amount = 0.5;
        let gigabytes = item("Packages", "GigaBytes", "packages_bandwidth", 2.0);

        let (_, packages, _) = buckets(vec![bytes]);
        assert_eq!(packages.total_gigabytes_bandwidth_used, 1.0);
        assert_eq!(packages.total_paid_gigabytes_bandwidth_used, 0.5);

        let (_, packages, _) = buckets(vec![gigabytes]);
        assert_eq!(packages.total_gigabytes_bandwidth_used, 2.0);
    }

    #[test]
    fn test_storage_units() {
        let mut hours = item("git_lfs", "GigabyteHours", "git_lfs_storage", 720.0);
        hours.net_amount = 1.25;

        let (_, _, storage) = buckets(vec![
            hours,
            item("git_lfs", "bytes", "git_lfs_storage", BYTES_PER_GIGABYTE * 3.0),
            item("git_lfs", "minutes", "git_lfs_storage", 99.0),
        ]);

        assert_eq!(storage.estimated_storage_for_month, 723.0);
        assert_eq!(storage.estimated_paid_storage_for_month, 1.25);
        assert_eq!(storage.days_left_in_billing_cycle, 12);
    }

    #[test]
    fn test_empty_report_yields_zero_buckets() {
        let (actions, packages, storage) = buckets(Vec::new());
        assert_eq!(actions.total_minutes_used, 0.0);
        assert!(actions.minutes_used_breakdown.is_empty());
        assert_eq!(packages.total_gigabytes_bandwidth_used, 0.0);
        assert_eq!(storage.estimated_storage_for_month, 0.0);
        assert_eq!(actions.scope.name(), "acme");
    }

    #[test]
    fn test_unknown_products_ignored() {
        assert_eq!(classify(&item("copilot", "user-months", "copilot_business", 3.0)), None);
        let (actions, packages, storage) =
            buckets(vec![item("copilot", "user-months", "copilot_business", 3.0)]);
        assert_eq!(actions.total_minutes_used, 0.0);
        assert_eq!(packages.total_gigabytes_bandwidth_used, 0.0);
        assert_eq!(storage.estimated_storage_for_month, 0.0);
    }

    #[test]
    fn test_os_from_sku_precedence() {
        assert_eq!(os_from_sku("Actions Linux 4-core"), Some("UBUNTU"));
        assert_eq!(os_from_sku("actions_windows_8_core"), Some("WINDOWS"));
        assert_eq!(os_from_sku("actions_macos"), Some("MACOS"));
        assert_eq!(os_from_sku("actions_mac_m1"), Some("MACOS"));
        assert_eq!(os_from_sku("actions_self_hosted"), None);
    }

    #[test]
    fn test_days_left_in_cycle() {
        let dec = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(days_left_in_cycle(dec), 1);
        let feb = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(days_left_in_cycle(feb), 29);
    }

    #[test]
    fn test_normalize_usage_keeps_every_record() {
        let scope = Scope::enterprise("big").unwrap();
        let response = UsageResponse {
            usage_items: vec![
                item("actions", "minutes", "linux", 1.0),
                item("actions", "minutes", "linux", 2.0),
                item("copilot", "user-months", "copilot", 3.0),
            ],
        };

        let items = normalize_usage(response, &scope);
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].usage.quantity, 2.0);
        assert_eq!(items[0].key(), items[1].key());
        assert_eq!(
            items[2].labels(),
            ["enterprise", "big", "copilot", "copilot", "user-months", "2025-03-01T00:00:00Z", "", ""]
        );
    }
}
