//! Billing usage wire types
//!
//! Mirrors the `settings/billing/usage` response of the enhanced billing
//! platform. Missing or `null` fields decode to zero/empty values.

use serde::{Deserialize, Deserializer, Serialize};

/// One usage line item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageItem {
    #[serde(deserialize_with = "nullable")]
    pub date: String,
    #[serde(deserialize_with = "nullable")]
    pub product: String,
    #[serde(deserialize_with = "nullable")]
    pub sku: String,
    #[serde(deserialize_with = "nullable")]
    pub quantity: f64,
    #[serde(deserialize_with = "nullable")]
    pub unit_type: String,
    #[serde(deserialize_with = "nullable")]
    pub price_per_unit: f64,
    #[serde(deserialize_with = "nullable")]
    pub gross_amount: f64,
    #[serde(deserialize_with = "nullable")]
    pub discount_amount: f64,
    #[serde(deserialize_with = "nullable")]
    pub net_amount: f64,
    #[serde(deserialize_with = "nullable")]
    pub organization_name: String,
    #[serde(deserialize_with = "nullable")]
    pub repository_name: String,
}

/// Usage report for one organization or enterprise
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageResponse {
    #[serde(deserialize_with = "nullable")]
    pub usage_items: Vec<UsageItem>,
}

/// Treat an explicit `null` like an absent field
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
