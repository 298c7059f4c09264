//! Resource kind trait - the per-kind capability the reconciler is generic over

use crate::error::{Error, Result};
use crate::resolver::ReferenceResolver;
use crate::schema::{Schema, SchemaRegistry};
use crate::types::{DeclaredResource, TrackedState, UpdateMode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::marker::PhantomData;

/// A kind of remote object the engine can manage
///
/// Implementors are marker types. They describe the schema and translate
/// between declared attributes and the typed wire payloads; the reconciler
/// provides Create/Read/Update/Delete/Import once for every kind.
pub trait ResourceKind: Send + Sync + 'static {
    /// Kind name used in addresses (e.g. "site")
    const NAME: &'static str;

    /// Remote collection path (e.g. "dcim/sites")
    const ENDPOINT: &'static str;

    /// Outbound write payload
    type Payload: Serialize;

    /// Inbound read payload
    type Remote: DeserializeOwned;

    fn schema() -> Schema;

    /// How updates are sent
    fn update_mode() -> UpdateMode {
        UpdateMode::Full
    }

    /// Map validated attributes to a write payload, resolving references first
    fn to_remote(
        declared: &DeclaredResource,
        resolver: &ReferenceResolver<'_>,
    ) -> Result<Self::Payload>;

    /// Map a read payload back to attributes
    fn from_remote(remote: &Self::Remote) -> DeclaredResource;

    /// Identifier carried by a read payload
    fn remote_id(remote: &Self::Remote) -> i64;
}

/// Object-safe view of a [`ResourceKind`]
pub trait AnyKind: Send + Sync {
    fn name(&self) -> &'static str;

    fn endpoint(&self) -> &'static str;

    fn schema(&self) -> &Schema;

    fn update_mode(&self) -> UpdateMode;

    /// Outbound mapping to JSON
    fn encode(
        &self,
        declared: &DeclaredResource,
        resolver: &ReferenceResolver<'_>,
    ) -> Result<JsonValue>;

    /// Inbound mapping from JSON
    fn decode(&self, remote: JsonValue) -> Result<TrackedState>;
}

/// Boxed kind for heterogeneous registries
pub type BoxedKind = Box<dyn AnyKind>;

/// Adapter from a static [`ResourceKind`] to [`AnyKind`]
pub struct Erased<K: ResourceKind> {
    schema: Schema,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ResourceKind> Erased<K> {
    pub fn new() -> Self {
        Self {
            schema: K::schema(),
            _kind: PhantomData,
        }
    }
}

impl<K: ResourceKind> Default for Erased<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ResourceKind> AnyKind for Erased<K> {
    fn name(&self) -> &'static str {
        K::NAME
    }

    fn endpoint(&self) -> &'static str {
        K::ENDPOINT
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn update_mode(&self) -> UpdateMode {
        K::update_mode()
    }

    fn encode(
        &self,
        declared: &DeclaredResource,
        resolver: &ReferenceResolver<'_>,
    ) -> Result<JsonValue> {
        let payload = K::to_remote(declared, resolver)?;
        serde_json::to_value(payload).map_err(|e| Error::Payload {
            kind: K::NAME.to_string(),
            message: e.to_string(),
        })
    }

    fn decode(&self, remote: JsonValue) -> Result<TrackedState> {
        let remote: K::Remote = serde_json::from_value(remote).map_err(|e| Error::Payload {
            kind: K::NAME.to_string(),
            message: format!("unexpected response: {e}"),
        })?;
        Ok(TrackedState::new(K::remote_id(&remote), K::from_remote(&remote)))
    }
}

/// Registered kinds, keyed by name
#[derive(Default)]
pub struct KindRegistry {
    kinds: BTreeMap<&'static str, BoxedKind>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind under its name
    pub fn register<K: ResourceKind>(&mut self) {
        self.kinds.insert(K::NAME, Box::new(Erased::<K>::new()));
    }

    /// Builder-style [`register`](Self::register)
    pub fn with<K: ResourceKind>(mut self) -> Self {
        self.register::<K>();
        self
    }

    pub fn get(&self, name: &str) -> Result<&dyn AnyKind> {
        self.kinds
            .get(name)
            .map(|kind| &**kind)
            .ok_or_else(|| Error::UnknownKind(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.kinds.keys().copied()
    }

    /// Schemas of every registered kind
    pub fn schemas(&self) -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        for kind in self.kinds.values() {
            registry.register(kind.schema().clone());
        }
        registry
    }
}
