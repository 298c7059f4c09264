//! NetBox resource kinds managed by nbsync
//!
//! Each kind is a marker type implementing [`ResourceKind`]: it owns the
//! schema for its attributes and the mapping between declared attributes and
//! the NetBox wire models. Create/Read/Update/Delete/Import are provided once
//! by the generic reconciler.

use declarative::{DeclaredResource, KindRegistry, ReferenceResolver, Result};
use netbox::models::{NestedRef, NestedTag};
use std::collections::BTreeSet;

pub mod service;
pub mod site;
pub mod virtual_machine;

pub use service::Service;
pub use site::Site;
pub use virtual_machine::VirtualMachine;

/// Attribute holding the tag names of a resource.
pub const TAGS: &str = "tags";

/// Registry of every kind nbsync manages
pub fn registry() -> KindRegistry {
    KindRegistry::new()
        .with::<Site>()
        .with::<VirtualMachine>()
        .with::<Service>()
}

// ============================================================================
// Outbound helpers
// ============================================================================

/// Optional text, sent as `""` when absent
pub(crate) fn text(declared: &DeclaredResource, name: &str) -> String {
    declared.str(name).unwrap_or_default().to_string()
}

/// Set of integers, sent as an empty list when absent
pub(crate) fn ids(declared: &DeclaredResource, name: &str) -> Vec<i64> {
    declared
        .int_set(name)
        .map(|set| set.iter().copied().collect())
        .unwrap_or_default()
}

/// Resolve declared tag names into nested tags
///
/// An absent tag set yields an empty list, never null.
pub(crate) fn tags(
    declared: &DeclaredResource,
    resolver: &ReferenceResolver<'_>,
) -> Result<Vec<NestedTag>> {
    let Some(names) = declared.string_set(TAGS) else {
        return Ok(Vec::new());
    };
    Ok(resolver
        .resolve(names)?
        .into_iter()
        .map(|tag| NestedTag {
            id: Some(tag.id),
            name: tag.name,
            slug: tag.slug,
        })
        .collect())
}

// ============================================================================
// Inbound helpers
// ============================================================================

/// Store text unless it is empty
pub(crate) fn put_text(attrs: &mut DeclaredResource, name: &str, value: &str) {
    if !value.is_empty() {
        attrs.insert(name, value);
    }
}

/// Store the id of a nested reference
pub(crate) fn put_ref(attrs: &mut DeclaredResource, name: &str, value: Option<&NestedRef>) {
    attrs.insert_opt(name, value.map(|r| r.id));
}

/// Store a set of ids unless it is empty
pub(crate) fn put_ids(attrs: &mut DeclaredResource, name: &str, ids: impl IntoIterator<Item = i64>) {
    let set: BTreeSet<i64> = ids.into_iter().collect();
    if !set.is_empty() {
        attrs.insert(name, set);
    }
}

/// Store tag names unless there are none
pub(crate) fn put_tags(attrs: &mut DeclaredResource, tags: &[NestedTag]) {
    let names: BTreeSet<String> = tags.iter().map(|t| t.name.clone()).collect();
    if !names.is_empty() {
        attrs.insert(TAGS, names);
    }
}
