//! In-memory transport and a small resource kind for unit tests

use crate::error::{Error, Result};
use crate::resolver::ReferenceResolver;
use crate::resource::ResourceKind;
use crate::schema::{AttrType, AttributeSchema, Schema};
use crate::transport::{ListPage, RemoteError, RemoteResult, Transport};
use crate::types::{DeclaredResource, UpdateMode};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

pub const WIDGETS: &str = "test/widgets";
pub const TAGS: &str = "test/tags";

#[derive(Default)]
struct State {
    objects: BTreeMap<String, BTreeMap<i64, JsonValue>>,
    next_id: i64,
    calls: Vec<String>,
    fail_next: Option<RemoteError>,
    reply_next: Option<JsonValue>,
}

/// Stores objects as plain JSON keyed by endpoint and id
#[derive(Default)]
pub struct MemoryTransport {
    state: Mutex<State>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object directly, returning its id
    pub fn seed(&self, endpoint: &str, mut object: JsonValue) -> i64 {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        object["id"] = JsonValue::from(id);
        state
            .objects
            .entry(endpoint.to_string())
            .or_default()
            .insert(id, object);
        id
    }

    pub fn object(&self, endpoint: &str, id: i64) -> Option<JsonValue> {
        let state = self.state.lock().unwrap();
        state.objects.get(endpoint)?.get(&id).cloned()
    }

    /// Delete behind the engine's back
    pub fn remove(&self, endpoint: &str, id: i64) {
        let mut state = self.state.lock().unwrap();
        if let Some(objects) = state.objects.get_mut(endpoint) {
            objects.remove(&id);
        }
    }

    /// Change one field behind the engine's back
    pub fn tamper(&self, endpoint: &str, id: i64, field: &str, value: JsonValue) {
        let mut state = self.state.lock().unwrap();
        if let Some(object) = state.objects.get_mut(endpoint).and_then(|o| o.get_mut(&id)) {
            object[field] = value;
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn fail_next(&self, err: RemoteError) {
        self.state.lock().unwrap().fail_next = Some(err);
    }

    /// Answer the next create with `reply` (plus the new id) instead of the stored object
    pub fn reply_next(&self, reply: JsonValue) {
        self.state.lock().unwrap().reply_next = Some(reply);
    }

    fn begin(&self, call: String) -> RemoteResult<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match state.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }
}

impl Transport for MemoryTransport {
    fn create(&self, endpoint: &str, payload: &JsonValue) -> RemoteResult<JsonValue> {
        let mut state = self.begin(format!("create {endpoint}"))?;
        state.next_id += 1;
        let id = state.next_id;
        let mut object = payload.clone();
        object["id"] = JsonValue::from(id);
        state
            .objects
            .entry(endpoint.to_string())
            .or_default()
            .insert(id, object.clone());
        match state.reply_next.take() {
            Some(mut reply) => {
                reply["id"] = JsonValue::from(id);
                Ok(reply)
            }
            None => Ok(object),
        }
    }

    fn get(&self, endpoint: &str, id: i64) -> RemoteResult<JsonValue> {
        let state = self.begin(format!("get {endpoint} {id}"))?;
        state
            .objects
            .get(endpoint)
            .and_then(|o| o.get(&id))
            .cloned()
            .ok_or(RemoteError::NotFound)
    }

    fn update(
        &self,
        endpoint: &str,
        id: i64,
        payload: &JsonValue,
        mode: UpdateMode,
    ) -> RemoteResult<JsonValue> {
        let mut state = self.begin(format!("update {endpoint} {id} {mode}"))?;
        let object = state
            .objects
            .get_mut(endpoint)
            .and_then(|o| o.get_mut(&id))
            .ok_or(RemoteError::NotFound)?;
        match (mode, payload.as_object()) {
            (UpdateMode::Partial, Some(fields)) => {
                for (key, value) in fields {
                    object[key] = value.clone();
                }
            }
            _ => {
                *object = payload.clone();
                object["id"] = JsonValue::from(id);
            }
        }
        Ok(object.clone())
    }

    fn delete(&self, endpoint: &str, id: i64) -> RemoteResult<()> {
        let mut state = self.begin(format!("delete {endpoint} {id}"))?;
        state
            .objects
            .get_mut(endpoint)
            .and_then(|o| o.remove(&id))
            .map(|_| ())
            .ok_or(RemoteError::NotFound)
    }

    fn list(
        &self,
        endpoint: &str,
        filters: &[(&str, &str)],
        limit: usize,
    ) -> RemoteResult<ListPage> {
        let rendered: Vec<String> = filters.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let state = self.begin(format!(
            "list {endpoint} {} limit={limit}",
            rendered.join(" ")
        ))?;
        let matched: Vec<JsonValue> = state
            .objects
            .get(endpoint)
            .into_iter()
            .flat_map(|o| o.values())
            .filter(|object| {
                filters
                    .iter()
                    .all(|(k, v)| object.get(*k).and_then(JsonValue::as_str) == Some(*v))
            })
            .cloned()
            .collect();
        Ok(ListPage {
            count: Some(matched.len()),
            results: matched.into_iter().take(limit).collect(),
        })
    }
}

/// Wire form of a widget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetPayload {
    #[serde(default, skip_serializing)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub owner: Option<i64>,
    #[serde(default)]
    pub tags: Vec<WidgetTag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetTag {
    pub name: String,
    pub slug: String,
}

/// A kind with one string, one optional string, one replacement-forcing int and tags
pub struct Widget;

impl ResourceKind for Widget {
    const NAME: &'static str = "widget";
    const ENDPOINT: &'static str = WIDGETS;

    type Payload = WidgetPayload;
    type Remote = WidgetPayload;

    fn schema() -> Schema {
        Schema::new(Self::NAME, "Test widget")
            .attribute(AttributeSchema::required("name", AttrType::String).length(1, 20))
            .attribute(
                AttributeSchema::optional_computed("color", AttrType::String)
                    .one_of_ignore_case(&["red", "blue"])
                    .default_value("red"),
            )
            .attribute(
                AttributeSchema::optional("owner", AttrType::Int)
                    .at_least(1.0)
                    .force_new(),
            )
            .attribute(AttributeSchema::optional("tags", AttrType::StringSet))
    }

    fn update_mode() -> UpdateMode {
        UpdateMode::Partial
    }

    fn to_remote(
        declared: &DeclaredResource,
        resolver: &ReferenceResolver<'_>,
    ) -> Result<Self::Payload> {
        let tags = match declared.string_set("tags") {
            Some(names) => resolver.resolve(names)?,
            None => Vec::new(),
        };
        Ok(WidgetPayload {
            id: 0,
            name: declared
                .str("name")
                .ok_or_else(|| Error::validation(Self::NAME, "name", "is required"))?
                .to_string(),
            color: declared.str("color").unwrap_or_default().to_string(),
            owner: declared.int("owner"),
            tags: tags
                .into_iter()
                .map(|t| WidgetTag {
                    name: t.name,
                    slug: t.slug,
                })
                .collect(),
        })
    }

    fn from_remote(remote: &Self::Remote) -> DeclaredResource {
        let mut declared = DeclaredResource::new().with("name", remote.name.as_str());
        if !remote.color.is_empty() {
            declared.insert("color", remote.color.as_str());
        }
        declared.insert_opt("owner", remote.owner);
        if !remote.tags.is_empty() {
            let names: BTreeSet<String> = remote.tags.iter().map(|t| t.name.clone()).collect();
            declared.insert("tags", crate::types::Value::StringSet(names));
        }
        declared
    }

    fn remote_id(remote: &Self::Remote) -> i64 {
        remote.id
    }
}
