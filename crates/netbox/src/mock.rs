//! In-memory NetBox for testing without a server.
//!
//! Objects are stored in their writable form and expanded on the way out
//! the way NetBox does: foreign keys become nested objects, choice fields
//! become `{value, label}` and tags are looked up by name.
//!
//! ```
//! use declarative::Transport;
//! use netbox::{MockNetbox, endpoint};
//! use serde_json::json;
//!
//! let mock = MockNetbox::new();
//! mock.add_tag("prod");
//! let site = mock
//!     .create(endpoint::SITES, &json!({"name": "DC1", "slug": "dc1", "tenant": 4}))
//!     .unwrap();
//! assert_eq!(site["tenant"]["id"], 4);
//! assert_eq!(site["status"]["value"], "active");
//! ```

use crate::endpoint;
use declarative::{ListPage, RemoteError, RemoteResult, Transport, UpdateMode};
use serde_json::{Map, Value as JsonValue, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Fields holding a single foreign key.
const FOREIGN_KEYS: &[&str] = &[
    "region",
    "group",
    "tenant",
    "cluster",
    "site",
    "platform",
    "role",
    "device",
    "virtual_machine",
];

/// Fields holding a list of foreign keys.
const FOREIGN_KEY_LISTS: &[&str] = &["asns", "ipaddresses"];

/// Choice fields.
const CHOICES: &[&str] = &["status", "protocol"];

#[derive(Debug, Default)]
struct MockState {
    objects: HashMap<String, BTreeMap<i64, JsonValue>>,
    next_id: i64,
    calls: Vec<String>,
    fail_next: Option<RemoteError>,
}

impl MockState {
    fn insert(&mut self, endpoint: &str, mut object: JsonValue) -> i64 {
        self.next_id += 1;
        let id = self.next_id;
        object["id"] = json!(id);
        self.objects
            .entry(endpoint.to_string())
            .or_default()
            .insert(id, object);
        id
    }

    fn tag(&self, name: &str) -> Option<&JsonValue> {
        self.objects
            .get(endpoint::TAGS)?
            .values()
            .find(|tag| tag["name"] == name)
    }

    /// Reject writes that reference tags which do not exist.
    fn check_tags(&self, payload: &JsonValue) -> RemoteResult<()> {
        let Some(tags) = payload.get("tags").and_then(JsonValue::as_array) else {
            return Ok(());
        };
        for tag in tags {
            let name = tag.get("name").and_then(JsonValue::as_str).unwrap_or_default();
            if self.tag(name).is_none() {
                return Err(RemoteError::Rejected {
                    status: 400,
                    message: format!("tags: tag '{name}' does not exist"),
                });
            }
        }
        Ok(())
    }

    /// Render a stored object the way the API returns it.
    fn expand(&self, endpoint: &str, stored: &JsonValue) -> JsonValue {
        let Some(fields) = stored.as_object() else {
            return stored.clone();
        };
        let mut out = Map::new();
        for (key, value) in fields {
            let rendered = match key.as_str() {
                k if FOREIGN_KEYS.contains(&k) => match value.as_i64() {
                    Some(id) => json!({"id": id, "display": format!("{k} {id}")}),
                    None => JsonValue::Null,
                },
                k if FOREIGN_KEY_LISTS.contains(&k) => JsonValue::Array(
                    value
                        .as_array()
                        .into_iter()
                        .flatten()
                        .filter_map(JsonValue::as_i64)
                        .map(|id| json!({"id": id}))
                        .collect(),
                ),
                k if CHOICES.contains(&k) => match value.as_str() {
                    Some(v) if !v.is_empty() => json!({"value": v, "label": label(v)}),
                    _ => JsonValue::Null,
                },
                "tags" if endpoint != endpoint::TAGS => JsonValue::Array(
                    value
                        .as_array()
                        .into_iter()
                        .flatten()
                        .filter_map(|t| t.get("name").and_then(JsonValue::as_str))
                        .filter_map(|name| self.tag(name))
                        .map(|tag| json!({"id": tag["id"], "name": tag["name"], "slug": tag["slug"]}))
                        .collect(),
                ),
                _ => value.clone(),
            };
            out.insert(key.clone(), rendered);
        }
        if endpoint == endpoint::SITES && out.get("status").is_none_or(JsonValue::is_null) {
            out.insert("status".to_string(), json!({"value": "active", "label": "Active"}));
        }
        JsonValue::Object(out)
    }
}

fn label(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Mock NetBox server.
///
/// Cloning shares the same store, so a test can keep a handle while the
/// engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MockNetbox {
    state: Arc<Mutex<MockState>>,
}

impl MockNetbox {
    /// Create an empty mock server.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, call: String) -> RemoteResult<MutexGuard<'_, MockState>> {
        let mut state = self.state();
        state.calls.push(call);
        let failure = state.fail_next.take();
        match failure {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }

    /// Add a tag whose slug equals its name, returning its id.
    pub fn add_tag(&self, name: &str) -> i64 {
        self.add_tag_with_slug(name, name)
    }

    /// Add a tag with an explicit slug, returning its id.
    pub fn add_tag_with_slug(&self, name: &str, slug: &str) -> i64 {
        self.state().insert(
            endpoint::TAGS,
            json!({"name": name, "slug": slug, "color": "9e9e9e"}),
        )
    }

    /// Store an object directly (as if created outside the engine).
    pub fn insert(&self, endpoint: &str, object: JsonValue) -> i64 {
        self.state().insert(endpoint, object)
    }

    /// Delete an object directly (as if deleted outside the engine).
    pub fn remove(&self, endpoint: &str, id: i64) {
        if let Some(objects) = self.state().objects.get_mut(endpoint) {
            objects.remove(&id);
        }
    }

    /// Change a stored field directly (as if edited outside the engine).
    pub fn set_field(&self, endpoint: &str, id: i64, field: &str, value: JsonValue) {
        let mut state = self.state();
        if let Some(object) = state.objects.get_mut(endpoint).and_then(|o| o.get_mut(&id)) {
            object[field] = value;
        }
    }

    /// Stored (writable) form of an object.
    #[must_use]
    pub fn raw(&self, endpoint: &str, id: i64) -> Option<JsonValue> {
        self.state().objects.get(endpoint)?.get(&id).cloned()
    }

    /// Number of objects stored under an endpoint.
    #[must_use]
    pub fn count(&self, endpoint: &str) -> usize {
        self.state().objects.get(endpoint).map_or(0, BTreeMap::len)
    }

    /// Every call made so far, e.g. `"PATCH dcim/sites 3"`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Calls that change remote state.
    #[must_use]
    pub fn write_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| {
                c.starts_with("POST") || c.starts_with("PATCH") || c.starts_with("PUT")
                    || c.starts_with("DELETE")
            })
            .collect()
    }

    /// Make the next call fail with `err`.
    pub fn fail_next(&self, err: RemoteError) {
        self.state().fail_next = Some(err);
    }
}

impl Transport for MockNetbox {
    fn create(&self, endpoint: &str, payload: &JsonValue) -> RemoteResult<JsonValue> {
        let mut state = self.begin(format!("POST {endpoint}"))?;
        state.check_tags(payload)?;
        let id = state.insert(endpoint, payload.clone());
        let stored = &state.objects[endpoint][&id];
        Ok(state.expand(endpoint, stored))
    }

    fn get(&self, endpoint: &str, id: i64) -> RemoteResult<JsonValue> {
        let state = self.begin(format!("GET {endpoint} {id}"))?;
        let stored = state
            .objects
            .get(endpoint)
            .and_then(|o| o.get(&id))
            .ok_or(RemoteError::NotFound)?;
        Ok(state.expand(endpoint, stored))
    }

    fn update(
        &self,
        endpoint: &str,
        id: i64,
        payload: &JsonValue,
        mode: UpdateMode,
    ) -> RemoteResult<JsonValue> {
        let verb = match mode {
            UpdateMode::Partial => "PATCH",
            UpdateMode::Full => "PUT",
        };
        let mut state = self.begin(format!("{verb} {endpoint} {id}"))?;
        state.check_tags(payload)?;
        let stored = state
            .objects
            .get_mut(endpoint)
            .and_then(|o| o.get_mut(&id))
            .ok_or(RemoteError::NotFound)?;
        match (mode, payload.as_object()) {
            (UpdateMode::Partial, Some(fields)) => {
                for (key, value) in fields {
                    stored[key] = value.clone();
                }
            }
            _ => {
                *stored = payload.clone();
                stored["id"] = json!(id);
            }
        }
        let stored = stored.clone();
        Ok(state.expand(endpoint, &stored))
    }

    fn delete(&self, endpoint: &str, id: i64) -> RemoteResult<()> {
        let mut state = self.begin(format!("DELETE {endpoint} {id}"))?;
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
        let state = self.begin(format!("LIST {endpoint} {} limit={limit}", rendered.join("&")))?;
        let matched: Vec<&JsonValue> = state
            .objects
            .get(endpoint)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter(|object| {
                filters
                    .iter()
                    .all(|(k, v)| object.get(*k).and_then(JsonValue::as_str) == Some(*v))
            })
            .collect();
        Ok(ListPage {
            count: Some(matched.len()),
            results: matched
                .into_iter()
                .take(limit)
                .map(|o| state.expand(endpoint, o))
                .collect(),
        })
    }
}
