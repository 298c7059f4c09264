//! Wire models for the NetBox REST API.
//!
//! `Writable*` types are request bodies: foreign keys are bare integers,
//! optional text is always sent (as `""` when unset) and optional numbers and
//! foreign keys are sent as `null`. Read types mirror responses, where foreign
//! keys come back as nested objects and choice fields as `{value, label}`.

use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Brief nested object returned for a foreign key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedRef {
    /// Object id.
    pub id: i64,
    /// Display name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub display: String,
}

/// Choice field as returned by NetBox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Machine value (e.g. `active`).
    pub value: String,
    /// Human label (e.g. `Active`).
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
}

/// Tag as embedded in other objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedTag {
    /// Tag id; omitted when writing by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Tag name.
    pub name: String,
    /// Tag slug.
    pub slug: String,
}

/// Tag as returned by `extras/tags/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag id.
    pub id: i64,
    /// Tag name.
    pub name: String,
    /// Tag slug.
    pub slug: String,
    /// Hex color without `#`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub color: String,
}

// =============================================================================
// Sites
// =============================================================================

/// Request body for `dcim/sites/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WritableSite {
    pub name: String,
    pub slug: String,
    pub status: String,
    pub description: String,
    pub facility: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub physical_address: String,
    pub shipping_address: String,
    pub region: Option<i64>,
    pub group: Option<i64>,
    pub tenant: Option<i64>,
    pub time_zone: Option<String>,
    pub asns: Vec<i64>,
    pub tags: Vec<NestedTag>,
}

/// Response body for `dcim/sites/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Site {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub status: Option<Choice>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub facility: String,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub physical_address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub shipping_address: String,
    #[serde(default)]
    pub region: Option<NestedRef>,
    #[serde(default)]
    pub group: Option<NestedRef>,
    #[serde(default)]
    pub tenant: Option<NestedRef>,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub asns: Vec<NestedRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<NestedTag>,
}

// =============================================================================
// Virtual machines
// =============================================================================

/// Request body for `virtualization/virtual-machines/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WritableVirtualMachine {
    pub name: String,
    pub status: String,
    pub cluster: Option<i64>,
    pub site: Option<i64>,
    pub tenant: Option<i64>,
    pub platform: Option<i64>,
    pub role: Option<i64>,
    pub vcpus: Option<f64>,
    pub memory: Option<i64>,
    pub disk: Option<i64>,
    pub description: String,
    pub comments: String,
    pub tags: Vec<NestedTag>,
}

/// Response body for `virtualization/virtual-machines/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VirtualMachine {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub status: Option<Choice>,
    #[serde(default)]
    pub cluster: Option<NestedRef>,
    #[serde(default)]
    pub site: Option<NestedRef>,
    #[serde(default)]
    pub tenant: Option<NestedRef>,
    #[serde(default)]
    pub platform: Option<NestedRef>,
    #[serde(default)]
    pub role: Option<NestedRef>,
    #[serde(default)]
    pub vcpus: Option<f64>,
    #[serde(default)]
    pub memory: Option<i64>,
    #[serde(default)]
    pub disk: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<NestedTag>,
}

// =============================================================================
// Services
// =============================================================================

/// Request body for `ipam/services/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WritableService {
    pub device: Option<i64>,
    pub virtual_machine: Option<i64>,
    pub name: String,
    pub protocol: String,
    pub ports: Vec<i64>,
    pub ipaddresses: Vec<i64>,
    pub description: String,
    pub comments: String,
    pub tags: Vec<NestedTag>,
}

/// Response body for `ipam/services/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Service {
    pub id: i64,
    #[serde(default)]
    pub device: Option<NestedRef>,
    #[serde(default)]
    pub virtual_machine: Option<NestedRef>,
    pub name: String,
    #[serde(default)]
    pub protocol: Option<Choice>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ports: Vec<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ipaddresses: Vec<NestedRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<NestedTag>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_site_read_tolerates_nulls_and_missing_fields() {
        let site: Site = serde_json::from_value(json!({
            "id": 3,
            "name": "DC1",
            "slug": "dc1",
            "status": {"value": "active", "label": "Active"},
            "description": null,
            "region": null,
            "tenant": {"id": 7, "display": "ACME"},
            "asns": null,
        }))
        .unwrap();

        assert_eq!(site.description, "");
        assert_eq!(site.region, None);
        assert_eq!(site.tenant.map(|t| t.id), Some(7));
        assert!(site.asns.is_empty());
        assert!(site.tags.is_empty());
        assert_eq!(site.status.unwrap().value, "active");
    }

    #[test]
    fn test_writable_site_sends_empty_text_and_null_keys() {
        let site = WritableSite {
            name: "DC1".into(),
            slug: "dc1".into(),
            status: "active".into(),
            description: String::new(),
            facility: String::new(),
            longitude: None,
            latitude: Some(52.5),
            physical_address: String::new(),
            shipping_address: String::new(),
            region: None,
            group: None,
            tenant: Some(7),
            time_zone: None,
            asns: vec![],
            tags: vec![NestedTag {
                id: Some(1),
                name: "prod".into(),
                slug: "prod".into(),
            }],
        };
        let body = serde_json::to_value(&site).unwrap();
        assert_eq!(body["description"], json!(""));
        assert_eq!(body["region"], json!(null));
        assert_eq!(body["tenant"], json!(7));
        assert_eq!(body["latitude"], json!(52.5));
        assert_eq!(body["asns"], json!([]));
        assert_eq!(body["tags"][0], json!({"id": 1, "name": "prod", "slug": "prod"}));
    }

    #[test]
    fn test_service_read() {
        let service: Service = serde_json::from_value(json!({
            "id": 11,
            "device": null,
            "virtual_machine": {"id": 4},
            "name": "ssh",
            "protocol": {"value": "tcp", "label": "TCP"},
            "ports": [22],
            "ipaddresses": [{"id": 9}],
            "description": "",
            "comments": "",
            "tags": [],
        }))
        .unwrap();
        assert_eq!(service.virtual_machine.map(|v| v.id), Some(4));
        assert_eq!(service.ports, vec![22]);
        assert_eq!(service.ipaddresses[0].id, 9);
    }

    #[test]
    fn test_nested_tag_without_id_omits_it() {
        let tag = NestedTag {
            id: None,
            name: "a".into(),
            slug: "a".into(),
        };
        assert_eq!(
            serde_json::to_value(&tag).unwrap(),
            json!({"name": "a", "slug": "a"})
        );
    }
}
