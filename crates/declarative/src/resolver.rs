//! Reference resolution - maps symbolic names to remote identifiers

use crate::error::{Error, Result};
use crate::transport::{RemoteError, Transport};
use serde::Deserialize;
use std::collections::BTreeSet;

/// Page size for lookups. Two results are enough to detect ambiguity.
const LOOKUP_LIMIT: usize = 2;

/// A name resolved to exactly one remote object
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResolvedReference {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

/// Resolves names against a lookup endpoint with exact-match cardinality
///
/// Holds no state between calls and can be shared across threads.
#[derive(Clone, Copy)]
pub struct ReferenceResolver<'a> {
    transport: &'a dyn Transport,
    endpoint: &'a str,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(transport: &'a dyn Transport, endpoint: &'a str) -> Self {
        Self {
            transport,
            endpoint,
        }
    }

    /// Resolve every name, in sorted order, stopping at the first failure
    pub fn resolve(&self, names: &BTreeSet<String>) -> Result<Vec<ResolvedReference>> {
        names.iter().map(|name| self.resolve_one(name)).collect()
    }

    /// Resolve a single name
    pub fn resolve_one(&self, name: &str) -> Result<ResolvedReference> {
        log::debug!("Resolving '{}' against {}", name, self.endpoint);

        let page = self
            .transport
            .list(self.endpoint, &[("name", name)], LOOKUP_LIMIT)
            .map_err(Error::Transport)?;

        match page.matches() {
            0 => Err(Error::UnresolvedReference {
                name: name.to_string(),
            }),
            1 => {
                let object = page.results.into_iter().next().ok_or_else(|| {
                    Error::Transport(RemoteError::Malformed(format!(
                        "lookup for '{name}' reported a match but returned no results"
                    )))
                })?;
                serde_json::from_value(object)
                    .map_err(|e| Error::Transport(RemoteError::from(e)))
            }
            _ => Err(Error::AmbiguousReference {
                name: name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryTransport;
    use serde_json::json;

    const TAGS: &str = "extras/tags";

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_resolve_exactly_one() {
        let transport = MemoryTransport::new();
        transport.seed(TAGS, json!({"name": "prod", "slug": "prod"}));
        let resolver = ReferenceResolver::new(&transport, TAGS);

        let resolved = resolver.resolve(&names(&["prod"])).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name, "prod");
        assert_eq!(resolved[0].slug, "prod");
    }

    #[test]
    fn test_resolve_zero_matches() {
        let transport = MemoryTransport::new();
        let resolver = ReferenceResolver::new(&transport, TAGS);

        let err = resolver.resolve(&names(&["ghost"])).unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { name } if name == "ghost"));
    }

    #[test]
    fn test_resolve_two_matches_is_ambiguous() {
        let transport = MemoryTransport::new();
        transport.seed(TAGS, json!({"name": "dup", "slug": "dup-a"}));
        transport.seed(TAGS, json!({"name": "dup", "slug": "dup-b"}));
        let resolver = ReferenceResolver::new(&transport, TAGS);

        let err = resolver.resolve(&names(&["dup"])).unwrap_err();
        assert!(matches!(err, Error::AmbiguousReference { name } if name == "dup"));
    }

    #[test]
    fn test_resolve_uses_limit_and_name_filter() {
        let transport = MemoryTransport::new();
        transport.seed(TAGS, json!({"name": "a", "slug": "a"}));
        let resolver = ReferenceResolver::new(&transport, TAGS);

        resolver.resolve(&names(&["a"])).unwrap();
        let calls = transport.calls();
        assert_eq!(calls, vec!["list extras/tags name=a limit=2".to_string()]);
    }

    #[test]
    fn test_first_failure_in_sorted_order_aborts() {
        let transport = MemoryTransport::new();
        transport.seed(TAGS, json!({"name": "b", "slug": "b"}));
        let resolver = ReferenceResolver::new(&transport, TAGS);

        let err = resolver.resolve(&names(&["c", "b", "a"])).unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { name } if name == "a"));
        assert_eq!(transport.calls().len(), 1);
    }

    #[test]
    fn test_transport_failure_surfaces() {
        let transport = MemoryTransport::new();
        transport.fail_next(RemoteError::Unavailable("timeout".into()));
        let resolver = ReferenceResolver::new(&transport, TAGS);

        let err = resolver.resolve(&names(&["prod"])).unwrap_err();
        assert!(matches!(err, Error::Transport(RemoteError::Unavailable(_))));
    }

    #[test]
    fn test_empty_set_makes_no_calls() {
        let transport = MemoryTransport::new();
        let resolver = ReferenceResolver::new(&transport, TAGS);

        assert!(resolver.resolve(&BTreeSet::new()).unwrap().is_empty());
        assert!(transport.calls().is_empty());
    }
}
