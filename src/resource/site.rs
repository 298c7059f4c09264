//! Site resource - `dcim/sites`

use declarative::{
    AttrType, AttributeSchema, DeclaredResource, ReferenceResolver, ResourceKind, Result, Schema,
    UpdateMode,
};
use netbox::endpoint;
use netbox::models::{Site as RemoteSite, WritableSite};

use super::{ids, put_ids, put_ref, put_tags, put_text, tags, text};

/// Status NetBox assigns when none is sent
const DEFAULT_STATUS: &str = "active";

const STATUSES: &[&str] = &[
    "planned",
    "staging",
    "active",
    "decommissioning",
    "retired",
];

/// A NetBox site
///
/// Updates are sent as PATCH with the full writable payload, so optional
/// attributes removed from the manifest are cleared remotely.
pub struct Site;

impl ResourceKind for Site {
    const NAME: &'static str = "site";
    const ENDPOINT: &'static str = endpoint::SITES;

    type Payload = WritableSite;
    type Remote = RemoteSite;

    fn schema() -> Schema {
        Schema::new(Self::NAME, "A physical location in NetBox")
            .attribute(
                AttributeSchema::required("name", AttrType::String)
                    .length(1, 100)
                    .describe("Full name of the site"),
            )
            .attribute(
                AttributeSchema::required("slug", AttrType::String)
                    .length(1, 100)
                    .pattern("^[-a-zA-Z0-9_]+$")
                    .describe("URL-friendly unique shorthand"),
            )
            .attribute(
                AttributeSchema::optional_computed("status", AttrType::String)
                    .one_of_ignore_case(STATUSES)
                    .default_value(DEFAULT_STATUS),
            )
            .attribute(AttributeSchema::optional("description", AttrType::String).length(1, 200))
            .attribute(
                AttributeSchema::optional("facility", AttrType::String)
                    .length(1, 50)
                    .describe("Local facility ID or description"),
            )
            .attribute(
                AttributeSchema::optional("longitude", AttrType::Float)
                    .between(-180.0, 180.0)
                    .describe("GPS coordinate in decimal format (xx.yyyyyy)"),
            )
            .attribute(
                AttributeSchema::optional("latitude", AttrType::Float)
                    .between(-90.0, 90.0)
                    .describe("GPS coordinate in decimal format (xx.yyyyyy)"),
            )
            .attribute(AttributeSchema::optional("physical_address", AttrType::String).length(1, 200))
            .attribute(AttributeSchema::optional("shipping_address", AttrType::String).length(1, 200))
            .attribute(AttributeSchema::optional("region_id", AttrType::Int).at_least(1.0))
            .attribute(AttributeSchema::optional("group_id", AttrType::Int).at_least(1.0))
            .attribute(AttributeSchema::optional("tenant_id", AttrType::Int).at_least(1.0))
            .attribute(
                AttributeSchema::optional("timezone", AttrType::String)
                    .length(1, 64)
                    .describe("IANA time zone, e.g. Europe/Berlin"),
            )
            .attribute(AttributeSchema::optional("asn_ids", AttrType::IntSet).at_least(1.0))
            .attribute(
                AttributeSchema::optional(super::TAGS, AttrType::StringSet)
                    .describe("Names of existing tags"),
            )
    }

    fn update_mode() -> UpdateMode {
        UpdateMode::Partial
    }

    fn to_remote(
        declared: &DeclaredResource,
        resolver: &ReferenceResolver<'_>,
    ) -> Result<WritableSite> {
        Ok(WritableSite {
            name: text(declared, "name"),
            slug: text(declared, "slug"),
            status: declared
                .str("status")
                .unwrap_or(DEFAULT_STATUS)
                .to_string(),
            description: text(declared, "description"),
            facility: text(declared, "facility"),
            longitude: declared.float("longitude"),
            latitude: declared.float("latitude"),
            physical_address: text(declared, "physical_address"),
            shipping_address: text(declared, "shipping_address"),
            region: declared.int("region_id"),
            group: declared.int("group_id"),
            tenant: declared.int("tenant_id"),
            time_zone: declared.str("timezone").map(ToString::to_string),
            asns: ids(declared, "asn_ids"),
            tags: tags(declared, resolver)?,
        })
    }

    fn from_remote(remote: &RemoteSite) -> DeclaredResource {
        let mut attrs = DeclaredResource::new()
            .with("name", remote.name.as_str())
            .with("slug", remote.slug.as_str());

        if let Some(status) = &remote.status {
            attrs.insert("status", status.value.as_str());
        }
        put_text(&mut attrs, "description", &remote.description);
        put_text(&mut attrs, "facility", &remote.facility);
        attrs.insert_opt("longitude", remote.longitude);
        attrs.insert_opt("latitude", remote.latitude);
        put_text(&mut attrs, "physical_address", &remote.physical_address);
        put_text(&mut attrs, "shipping_address", &remote.shipping_address);
        put_ref(&mut attrs, "region_id", remote.region.as_ref());
        put_ref(&mut attrs, "group_id", remote.group.as_ref());
        put_ref(&mut attrs, "tenant_id", remote.tenant.as_ref());
        if let Some(tz) = remote.time_zone.as_deref() {
            put_text(&mut attrs, "timezone", tz);
        }
        put_ids(&mut attrs, "asn_ids", remote.asns.iter().map(|a| a.id));
        put_tags(&mut attrs, &remote.tags);
        attrs
    }

    fn remote_id(remote: &RemoteSite) -> i64 {
        remote.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::reconciler;
    use declarative::{Erased, Error, Lifecycle, Value};
    use netbox::MockNetbox;
    use serde_json::json;

    fn kind() -> Erased<Site> {
        Erased::new()
    }

    fn minimal() -> DeclaredResource {
        DeclaredResource::new()
            .with("name", "Berlin DC1")
            .with("slug", "ber-dc1")
    }

    fn full() -> DeclaredResource {
        minimal()
            .with("status", "planned")
            .with("description", "Primary colo")
            .with("facility", "Equinix BE1")
            .with("longitude", 13.4)
            .with("latitude", 52.5)
            .with("physical_address", "Wilhelm-Str 1")
            .with("shipping_address", "Dock 3")
            .with("region_id", 2)
            .with("group_id", 5)
            .with("tenant_id", 7)
            .with("timezone", "Europe/Berlin")
            .with("asn_ids", [64512, 64513])
            .with("tags", ["prod", "edge"])
    }

    #[test]
    fn test_create_with_required_fields_only() {
        let mock = MockNetbox::new();
        let reconciler = reconciler(&mock);

        let state = reconciler.create(&kind(), &minimal()).unwrap();
        assert_eq!(state.attributes.str("name"), Some("Berlin DC1"));
        assert_eq!(state.attributes.str("status"), Some("active"));

        let Lifecycle::Managed(read) = reconciler.read(&kind(), &state).unwrap() else {
            panic!("site should exist");
        };
        assert_eq!(read, state);
        assert_eq!(
            read.attributes.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            vec!["name", "slug", "status"]
        );

        // Optional text goes out as "" and keys as null
        let raw = mock.raw(endpoint::SITES, state.id).unwrap();
        assert_eq!(raw["description"], json!(""));
        assert_eq!(raw["tenant"], json!(null));
        assert_eq!(raw["tags"], json!([]));
    }

    #[test]
    fn test_round_trip_all_attributes() {
        let mock = MockNetbox::new();
        mock.add_tag("prod");
        mock.add_tag("edge");
        let reconciler = reconciler(&mock);

        let state = reconciler.create(&kind(), &full()).unwrap();
        assert_eq!(state.attributes, full());

        let Lifecycle::Managed(read) = reconciler.read(&kind(), &state).unwrap() else {
            panic!("site should exist");
        };
        assert_eq!(read.attributes, full());
        assert_eq!(read.attributes.get("tags"), Some(&Value::from(["edge", "prod"])));
    }

    #[test]
    fn test_removed_optional_text_reads_back_absent() {
        let mock = MockNetbox::new();
        let reconciler = reconciler(&mock);

        let state = reconciler
            .create(&kind(), &minimal().with("description", "X"))
            .unwrap();
        assert_eq!(state.attributes.str("description"), Some("X"));

        let updated = reconciler.update(&kind(), &state, &minimal()).unwrap();
        assert!(!updated.attributes.contains("description"));

        let Lifecycle::Managed(read) = reconciler.read(&kind(), &updated).unwrap() else {
            panic!("site should exist");
        };
        assert!(!read.attributes.contains("description"));
        assert!(
            mock.write_calls()
                .contains(&format!("PATCH {} {}", endpoint::SITES, state.id))
        );
    }

    #[test]
    fn test_unknown_tag_aborts_before_any_write() {
        let mock = MockNetbox::new();
        mock.add_tag("prod");
        let reconciler = reconciler(&mock);

        let err = reconciler
            .create(&kind(), &minimal().with("tags", ["prod", "missing"]))
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { ref name } if name == "missing"));
        assert!(mock.write_calls().is_empty());
        assert_eq!(mock.count(endpoint::SITES), 0);
    }

    #[test]
    fn test_out_of_band_delete_reads_as_unmanaged() {
        let mock = MockNetbox::new();
        let reconciler = reconciler(&mock);

        let state = reconciler.create(&kind(), &minimal()).unwrap();
        mock.remove(endpoint::SITES, state.id);

        assert_eq!(
            reconciler.read(&kind(), &state).unwrap(),
            Lifecycle::Unmanaged
        );
    }

    #[test]
    fn test_invalid_slug_makes_no_calls() {
        let mock = MockNetbox::new();
        let reconciler = reconciler(&mock);

        let err = reconciler
            .create(&kind(), &minimal().with("slug", "ber dc1"))
            .unwrap_err();
        assert!(matches!(err, Error::Validation { ref attribute, .. } if attribute == "slug"));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_schema_constraints() {
        let schema = Site::schema();
        assert!(schema.validate(&minimal().with("latitude", 95.0)).is_err());
        assert!(schema.validate(&minimal().with("region_id", 0)).is_err());
        assert!(schema.validate(&minimal().with("asn_ids", [0, 1])).is_err());
        assert!(schema.validate(&minimal().with("status", "gone")).is_err());

        let valid = schema
            .validate(&minimal().with("status", "Planned").with("longitude", 13))
            .unwrap();
        assert_eq!(valid.str("status"), Some("planned"));
        assert_eq!(valid.float("longitude"), Some(13.0));
    }

    #[test]
    fn test_status_default_is_computed() {
        let mock = MockNetbox::new();
        let reconciler = reconciler(&mock);

        let state = reconciler.create(&kind(), &minimal()).unwrap();
        mock.set_field(endpoint::SITES, state.id, "status", json!("retired"));

        // Drift in status is reported by read
        let Lifecycle::Managed(read) = reconciler.read(&kind(), &state).unwrap() else {
            panic!("site should exist");
        };
        assert_eq!(read.attributes.str("status"), Some("retired"));
    }
}
