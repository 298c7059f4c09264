//! NetBox API collection paths, relative to `/api/`.

/// Sites.
pub const SITES: &str = "dcim/sites";

/// Virtual machines.
pub const VIRTUAL_MACHINES: &str = "virtualization/virtual-machines";

/// Services bound to a device or virtual machine.
pub const SERVICES: &str = "ipam/services";

/// Tags, the lookup endpoint for tag references.
pub const TAGS: &str = "extras/tags";

/// Server status, used for the version check.
pub const STATUS: &str = "status";

/// NetBox versions this client has been exercised against.
pub const SUPPORTED_VERSIONS: &[&str] = &[
    "4.0.0", "4.0.1", "4.0.2", "4.0.3", "4.0.5", "4.0.6", "4.0.7", "4.0.8", "4.0.9", "4.0.10",
];

/// Whether a reported NetBox version is in [`SUPPORTED_VERSIONS`].
#[must_use]
pub fn is_supported_version(version: &str) -> bool {
    SUPPORTED_VERSIONS.contains(&version)
}
