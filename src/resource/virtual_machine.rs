//! Virtual machine resource - `virtualization/virtual-machines`

use declarative::{
    AttrType, AttributeSchema, DeclaredResource, ReferenceResolver, ResourceKind, Result, Rule,
    Schema, UpdateMode,
};
use netbox::endpoint;
use netbox::models::{VirtualMachine as RemoteVirtualMachine, WritableVirtualMachine};

use super::{put_ref, put_tags, put_text, tags, text};

const STATUSES: &[&str] = &[
    "offline",
    "active",
    "planned",
    "staged",
    "failed",
    "decommissioning",
];

/// A NetBox virtual machine, placed in a cluster, a site, or both
pub struct VirtualMachine;

impl ResourceKind for VirtualMachine {
    const NAME: &'static str = "virtual_machine";
    const ENDPOINT: &'static str = endpoint::VIRTUAL_MACHINES;

    type Payload = WritableVirtualMachine;
    type Remote = RemoteVirtualMachine;

    fn schema() -> Schema {
        let reference = |name: &str| AttributeSchema::optional(name, AttrType::Int).at_least(1.0);

        Schema::new(Self::NAME, "A virtual machine in NetBox")
            .attribute(AttributeSchema::required("name", AttrType::String).length(1, 64))
            .attribute(AttributeSchema::required("status", AttrType::String).one_of_ignore_case(STATUSES))
            .attribute(reference("cluster_id"))
            .attribute(reference("site_id"))
            .attribute(reference("tenant_id"))
            .attribute(reference("platform_id"))
            .attribute(reference("role_id").describe("Device role of the VM"))
            .attribute(AttributeSchema::optional("vcpus", AttrType::Float).at_least(0.0))
            .attribute(
                AttributeSchema::optional("memory_mb", AttrType::Int)
                    .at_least(0.0)
                    .describe("Memory in MB"),
            )
            .attribute(
                AttributeSchema::optional("disk_gb", AttrType::Int)
                    .at_least(0.0)
                    .describe("Disk size in GB"),
            )
            .attribute(AttributeSchema::optional("description", AttrType::String).length(1, 200))
            .attribute(AttributeSchema::optional("comments", AttrType::String).min_length(1))
            .attribute(AttributeSchema::optional(super::TAGS, AttrType::StringSet))
            .rule(Rule::at_least_one_of(&["cluster_id", "site_id"]))
    }

    fn update_mode() -> UpdateMode {
        UpdateMode::Full
    }

    fn to_remote(
        declared: &DeclaredResource,
        resolver: &ReferenceResolver<'_>,
    ) -> Result<WritableVirtualMachine> {
        Ok(WritableVirtualMachine {
            name: text(declared, "name"),
            status: text(declared, "status"),
            cluster: declared.int("cluster_id"),
            site: declared.int("site_id"),
            tenant: declared.int("tenant_id"),
            platform: declared.int("platform_id"),
            role: declared.int("role_id"),
            vcpus: declared.float("vcpus"),
            memory: declared.int("memory_mb"),
            disk: declared.int("disk_gb"),
            description: text(declared, "description"),
            comments: text(declared, "comments"),
            tags: tags(declared, resolver)?,
        })
    }

    fn from_remote(remote: &RemoteVirtualMachine) -> DeclaredResource {
        let mut attrs = DeclaredResource::new().with("name", remote.name.as_str());
        if let Some(status) = &remote.status {
            attrs.insert("status", status.value.as_str());
        }
        put_ref(&mut attrs, "cluster_id", remote.cluster.as_ref());
        put_ref(&mut attrs, "site_id", remote.site.as_ref());
        put_ref(&mut attrs, "tenant_id", remote.tenant.as_ref());
        put_ref(&mut attrs, "platform_id", remote.platform.as_ref());
        put_ref(&mut attrs, "role_id", remote.role.as_ref());
        attrs.insert_opt("vcpus", remote.vcpus);
        attrs.insert_opt("memory_mb", remote.memory);
        attrs.insert_opt("disk_gb", remote.disk);
        put_text(&mut attrs, "description", &remote.description);
        put_text(&mut attrs, "comments", &remote.comments);
        put_tags(&mut attrs, &remote.tags);
        attrs
    }

    fn remote_id(remote: &RemoteVirtualMachine) -> i64 {
        remote.id
    }
}
