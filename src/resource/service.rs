//! Service resource - `ipam/services`

use declarative::{
    AttrType, AttributeSchema, DeclaredResource, ReferenceResolver, ResourceKind, Result, Rule,
    Schema, UpdateMode,
};
use netbox::endpoint;
use netbox::models::{Service as RemoteService, WritableService};

use super::{ids, put_ids, put_ref, put_tags, put_text, tags, text};

/// A network service listening on a device or a virtual machine
///
/// The parent cannot be moved in place: changing it replaces the service.
pub struct Service;

impl ResourceKind for Service {
    const NAME: &'static str = "service";
    const ENDPOINT: &'static str = endpoint::SERVICES;

    type Payload = WritableService;
    type Remote = RemoteService;

    fn schema() -> Schema {
        Schema::new(Self::NAME, "A TCP/UDP/SCTP service in NetBox")
            .attribute(AttributeSchema::required("name", AttrType::String).length(1, 100))
            .attribute(
                AttributeSchema::required("protocol", AttrType::String)
                    .one_of(&["tcp", "udp", "sctp"]),
            )
            .attribute(
                AttributeSchema::required("ports", AttrType::IntSet)
                    .between(1.0, 65535.0)
                    .non_empty(),
            )
            .attribute(
                AttributeSchema::optional("device_id", AttrType::Int)
                    .at_least(1.0)
                    .force_new(),
            )
            .attribute(
                AttributeSchema::optional("virtual_machine_id", AttrType::Int)
                    .at_least(1.0)
                    .force_new(),
            )
            .attribute(AttributeSchema::optional("ip_address_ids", AttrType::IntSet).at_least(1.0))
            .attribute(AttributeSchema::optional("description", AttrType::String).length(1, 200))
            .attribute(AttributeSchema::optional("comments", AttrType::String).min_length(1))
            .attribute(AttributeSchema::optional(super::TAGS, AttrType::StringSet))
            .rule(Rule::exactly_one_of(&["device_id", "virtual_machine_id"]))
    }

    fn update_mode() -> UpdateMode {
        UpdateMode::Full
    }

    fn to_remote(
        declared: &DeclaredResource,
        resolver: &ReferenceResolver<'_>,
    ) -> Result<WritableService> {
        Ok(WritableService {
            device: declared.int("device_id"),
            virtual_machine: declared.int("virtual_machine_id"),
            name: text(declared, "name"),
            protocol: text(declared, "protocol"),
            ports: ids(declared, "ports"),
            ipaddresses: ids(declared, "ip_address_ids"),
            description: text(declared, "description"),
            comments: text(declared, "comments"),
            tags: tags(declared, resolver)?,
        })
    }

    fn from_remote(remote: &RemoteService) -> DeclaredResource {
        let mut attrs = DeclaredResource::new().with("name", remote.name.as_str());
        if let Some(protocol) = &remote.protocol {
            attrs.insert("protocol", protocol.value.as_str());
        }
        put_ids(&mut attrs, "ports", remote.ports.iter().copied());
        put_ref(&mut attrs, "device_id", remote.device.as_ref());
        put_ref(&mut attrs, "virtual_machine_id", remote.virtual_machine.as_ref());
        put_ids(&mut attrs, "ip_address_ids", remote.ipaddresses.iter().map(|ip| ip.id));
        put_text(&mut attrs, "description", &remote.description);
        put_text(&mut attrs, "comments", &remote.comments);
        put_tags(&mut attrs, &remote.tags);
        attrs
    }

    fn remote_id(remote: &RemoteService) -> i64 {
        remote.id
    }
}
