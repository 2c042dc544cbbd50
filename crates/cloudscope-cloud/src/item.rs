//! Discovered resource records
//!
//! Items are opaque to the engine apart from the provider tag, `id`, `name`
//! and location. Everything a provider knows about the resource travels in
//! `extra` and is written to the inventory as flat JSON.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A discovered VM or virtual network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Provider tag (e.g., "aws", "azure", "gcp")
    pub cloud: String,

    /// Stable provider identifier
    pub id: String,

    /// Human readable name
    #[serde(default)]
    pub name: String,

    /// Provider-specific fields (region, zone, resource_group, profile, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    pub fn new(cloud: impl Into<String>, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            cloud: cloud.into(),
            id: id.into(),
            name: name.into(),
            extra: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extra.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Non-empty string value of an extra field
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.extra
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Region, else location, else "global"
    pub fn location(&self) -> &str {
        self.get_str("region")
            .or_else(|| self.get_str("location"))
            .unwrap_or("global")
    }

    /// Profile, account id or subscription, whichever the provider recorded
    pub fn account(&self) -> &str {
        self.get_str("profile")
            .or_else(|| self.get_str("account_id"))
            .or_else(|| self.get_str("subscription_id"))
            .unwrap_or("")
    }

    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Lower-cased provider tag used for handler routing
    pub fn cloud_key(&self) -> String {
        self.cloud.to_lowercase()
    }
}

/// Kind of resource tracked in the inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Vm,
    Vpc,
}

impl ResourceKind {
    /// Label used in log lines and summaries
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Vm => "VM",
            ResourceKind::Vpc => "VPC",
        }
    }

    /// Inventory file stem
    pub fn stem(&self) -> &'static str {
        match self {
            ResourceKind::Vm => "vm",
            ResourceKind::Vpc => "vpc",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Normalize provider tags/labels into an object with lower-cased keys.
///
/// Accepts the AWS `[{"Key": .., "Value": ..}]` list as well as a plain object.
pub fn normalize_tags(tags: Option<&Value>) -> Map<String, Value> {
    let mut normalized = Map::new();

    match tags {
        Some(Value::Array(list)) => {
            for tag in list {
                if let (Some(key), Some(value)) = (tag.get("Key"), tag.get("Value")) {
                    if let Some(key) = key.as_str() {
                        normalized.insert(key.to_lowercase(), value.clone());
                    }
                }
            }
        }
        Some(Value::Object(map)) => {
            for (key, value) in map {
                normalized.insert(key.to_lowercase(), value.clone());
            }
        }
        _ => {}
    }

    normalized
}

/// Reformat an RFC 3339 timestamp as `YYYY-MM-DDTHH:MM:SS`
pub fn normalize_timestamp(raw: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_roundtrips_as_flat_json() {
        let raw = json!({
            "cloud": "aws",
            "id": "i-0abc",
            "name": "web-1",
            "region": "eu-west-1",
            "profile": "prod"
        });

        let item: Item = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(item.location(), "eu-west-1");
        assert_eq!(item.account(), "prod");
        assert_eq!(serde_json::to_value(&item).unwrap(), raw);
    }

    #[test]
    fn test_location_fallbacks() {
        let vnet = Item::new("azure", "vnet-a", "vnet-a").with("location", "westeurope");
        assert_eq!(vnet.location(), "westeurope");

        let network = Item::new("gcp", "default", "default");
        assert_eq!(network.location(), "global");
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let item = Item::new("aws", "i-0abc", "  ");
        assert_eq!(item.display_name(), "i-0abc");
    }

    #[test]
    fn test_normalize_aws_tags() {
        let tags = json!([
            {"Key": "Name", "Value": "web-1"},
            {"Key": "Environment", "Value": "prod"},
            {"Value": "orphan"}
        ]);

        let normalized = normalize_tags(Some(&tags));
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized["name"], "web-1");
        assert_eq!(normalized["environment"], "prod");
    }

    #[test]
    fn test_normalize_object_tags() {
        let labels = json!({"Team": "infra"});
        let normalized = normalize_tags(Some(&labels));
        assert_eq!(normalized["team"], "infra");
        assert!(normalize_tags(None).is_empty());
    }

    #[test]
    fn test_normalize_timestamp() {
        assert_eq!(
            normalize_timestamp("2024-03-01T10:20:30.000+00:00").as_deref(),
            Some("2024-03-01T10:20:30")
        );
        assert_eq!(
            normalize_timestamp("2024-03-01T10:20:30Z").as_deref(),
            Some("2024-03-01T10:20:30")
        );
        assert_eq!(normalize_timestamp("yesterday"), None);
    }
}
