//! Blocking NetBox REST client.
//!
//! Every request carries `Authorization: Token <token>` plus any configured
//! extra headers. Object URLs always end in a slash, as NetBox expects.

use crate::endpoint;
use crate::error::{Error, Result};
use declarative::{ListPage, RemoteResult, Transport, UpdateMode};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Outcome of sending one request.
type HttpResult = std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error>;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for a NetBox server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, e.g. `https://netbox.example.com`.
    pub server_url: String,
    /// API token.
    pub api_token: String,
    /// Timeout for each request.
    pub request_timeout: Duration,
    /// Accept invalid TLS certificates.
    pub allow_insecure_https: bool,
    /// Extra headers sent on every request.
    pub headers: BTreeMap<String, String>,
    /// Remove trailing slashes from `server_url` (with a warning).
    pub strip_trailing_slashes: bool,
}

impl ClientConfig {
    /// Create a configuration with default options.
    pub fn new(server_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            api_token: api_token.into(),
            request_timeout: DEFAULT_TIMEOUT,
            allow_insecure_https: false,
            headers: BTreeMap::new(),
            strip_trailing_slashes: true,
        }
    }

    /// Validated base URL.
    pub fn base_url(&self) -> Result<String> {
        let url = self.server_url.trim();
        if url.is_empty() {
            return Err(Error::InvalidConfig("server URL is not set".to_string()));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Error::InvalidConfig(format!(
                "server URL '{url}' must start with http:// or https://"
            )));
        }
        if self.api_token.trim().is_empty() {
            return Err(Error::InvalidConfig("API token is not set".to_string()));
        }

        if self.strip_trailing_slashes && url.ends_with('/') {
            let stripped = url.trim_end_matches('/');
            log::warn!("Stripped trailing slashes from server URL: {url} -> {stripped}");
            return Ok(stripped.to_string());
        }
        Ok(url.to_string())
    }
}

/// NetBox REST client.
pub struct Client {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    base_url: String,
    token: String,
    headers: BTreeMap<String, String>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client from validated configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = config.base_url()?;

        let mut builder = ureq::Agent::config_builder()
            .timeout_global(Some(config.request_timeout))
            .http_status_as_error(false);
        if config.allow_insecure_https {
            log::warn!("TLS certificate verification is disabled");
            builder = builder.tls_config(
                ureq::tls::TlsConfig::builder()
                    .disable_verification(true)
                    .build(),
            );
        }
        let agent = ureq::Agent::new_with_config(builder.build());

        Ok(Self {
            agent,
            base_url,
            token: config.api_token.clone(),
            headers: config.headers.clone(),
        })
    }

    /// Base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of a collection.
    fn collection_url(&self, endpoint: &str) -> String {
        format!("{}/api/{}/", self.base_url, endpoint.trim_matches('/'))
    }

    /// URL of one object.
    fn object_url(&self, endpoint: &str, id: i64) -> String {
        format!("{}/api/{}/{}/", self.base_url, endpoint.trim_matches('/'), id)
    }

    /// Add auth and configured headers.
    fn decorate<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        let mut request = request
            .header("Authorization", &format!("Token {}", self.token))
            .header("Accept", "application/json");
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request
    }

    /// Map non-success statuses to errors.
    fn check(response: HttpResult) -> Result<ureq::http::Response<ureq::Body>> {
        let mut response = response?;
        let status = response.status().as_u16();
        if status == 404 {
            return Err(Error::NotFound);
        }
        if !(200..300).contains(&status) {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(Error::http(error_message(status, &body), Some(status)));
        }
        Ok(response)
    }

    fn read_json(response: HttpResult) -> Result<JsonValue> {
        let mut response = Self::check(response)?;
        response
            .body_mut()
            .read_json::<JsonValue>()
            .map_err(|e| Error::Decode(e.to_string()))
    }

    /// Create an object.
    pub fn create_object(&self, endpoint: &str, payload: &JsonValue) -> Result<JsonValue> {
        let url = self.collection_url(endpoint);
        log::debug!("POST {url}");
        Self::read_json(self.decorate(self.agent.post(&url)).send_json(payload))
    }

    /// Fetch one object.
    pub fn get_object(&self, endpoint: &str, id: i64) -> Result<JsonValue> {
        let url = self.object_url(endpoint, id);
        log::debug!("GET {url}");
        Self::read_json(self.decorate(self.agent.get(&url)).call())
    }

    /// Update one object with PATCH or PUT.
    pub fn update_object(
        &self,
        endpoint: &str,
        id: i64,
        payload: &JsonValue,
        mode: UpdateMode,
    ) -> Result<JsonValue> {
        let url = self.object_url(endpoint, id);
        let response = match mode {
            UpdateMode::Partial => {
                log::debug!("PATCH {url}");
                self.decorate(self.agent.patch(&url)).send_json(payload)
            }
            UpdateMode::Full => {
                log::debug!("PUT {url}");
                self.decorate(self.agent.put(&url)).send_json(payload)
            }
        };
        Self::read_json(response)
    }

    /// Delete one object.
    pub fn delete_object(&self, endpoint: &str, id: i64) -> Result<()> {
        let url = self.object_url(endpoint, id);
        log::debug!("DELETE {url}");
        Self::check(self.decorate(self.agent.delete(&url)).call())?;
        Ok(())
    }

    /// List objects with equality filters.
    pub fn list_objects(
        &self,
        endpoint: &str,
        filters: &[(&str, &str)],
        limit: usize,
    ) -> Result<ListPage> {
        let url = self.collection_url(endpoint);
        log::debug!("GET {url} {filters:?} limit={limit}");
        let mut request = self.decorate(self.agent.get(&url));
        for (name, value) in filters {
            request = request.query(*name, *value);
        }
        let body = Self::read_json(request.query("limit", &limit.to_string()).call())?;
        Ok(serde_json::from_value(body)?)
    }

    /// Version reported by `api/status/`.
    pub fn netbox_version(&self) -> Result<String> {
        let url = self.collection_url(endpoint::STATUS);
        log::debug!("GET {url}");
        let status = Self::read_json(self.decorate(self.agent.get(&url)).call())?;
        status
            .get("netbox-version")
            .and_then(JsonValue::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| Error::Decode("status response has no netbox-version".to_string()))
    }

    /// Warn when the server runs a version this client was not tested against.
    pub fn check_version(&self) -> Result<String> {
        let version = self.netbox_version()?;
        if endpoint::is_supported_version(&version) {
            log::debug!("NetBox version {version}");
        } else {
            log::warn!(
                "Possibly unsupported NetBox version {version}; tested against: {}",
                endpoint::SUPPORTED_VERSIONS.join(", ")
            );
        }
        Ok(version)
    }
}

impl Transport for Client {
    fn create(&self, endpoint: &str, payload: &JsonValue) -> RemoteResult<JsonValue> {
        Ok(self.create_object(endpoint, payload)?)
    }

    fn get(&self, endpoint: &str, id: i64) -> RemoteResult<JsonValue> {
        Ok(self.get_object(endpoint, id)?)
    }

    fn update(
        &self,
        endpoint: &str,
        id: i64,
        payload: &JsonValue,
        mode: UpdateMode,
    ) -> RemoteResult<JsonValue> {
        Ok(self.update_object(endpoint, id, payload, mode)?)
    }

    fn delete(&self, endpoint: &str, id: i64) -> RemoteResult<()> {
        Ok(self.delete_object(endpoint, id)?)
    }

    fn list(
        &self,
        endpoint: &str,
        filters: &[(&str, &str)],
        limit: usize,
    ) -> RemoteResult<ListPage> {
        Ok(self.list_objects(endpoint, filters, limit)?)
    }
}

/// Human-readable message from an error body.
///
/// NetBox answers `{"detail": ".."}` for most errors and a map of field to
/// messages for validation failures.
fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<JsonValue>(body) {
        Ok(JsonValue::Object(fields)) => {
            if let Some(detail) = fields.get("detail").and_then(JsonValue::as_str) {
                return detail.to_string();
            }
            let parts: Vec<String> = fields
                .iter()
                .map(|(field, messages)| match messages {
                    JsonValue::Array(items) => {
                        let texts: Vec<String> = items
                            .iter()
                            .map(|m| m.as_str().map_or_else(|| m.to_string(), ToString::to_string))
                            .collect();
                        format!("{field}: {}", texts.join("; "))
                    }
                    other => format!("{field}: {other}"),
                })
                .collect();
            parts.join(", ")
        }
        _ if body.trim().is_empty() => format!("HTTP {status}"),
        _ => body.trim().chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> Client {
        Client::new(&ClientConfig::new(url, "0123456789abcdef")).unwrap()
    }

    #[test]
    fn test_debug_hides_token() {
        let rendered = format!("{:?}", client("https://netbox.example.com"));
        assert!(rendered.contains("https://netbox.example.com"));
        assert!(!rendered.contains("0123456789abcdef"));
    }

    #[test]
    fn test_base_url_strips_trailing_slashes() {
        let config = ClientConfig::new("https://netbox.example.com//", "token");
        assert_eq!(config.base_url().unwrap(), "https://netbox.example.com");
    }

    #[test]
    fn test_base_url_keeps_slash_when_stripping_disabled() {
        let mut config = ClientConfig::new("https://netbox.example.com/", "token");
        config.strip_trailing_slashes = false;
        assert_eq!(config.base_url().unwrap(), "https://netbox.example.com/");
    }

    #[test]
    fn test_base_url_validation() {
        assert!(matches!(
            ClientConfig::new("", "token").base_url(),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            ClientConfig::new("netbox.example.com", "token").base_url(),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            ClientConfig::new("https://netbox.example.com", " ").base_url(),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_urls() {
        let client = client("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(
            client.collection_url(endpoint::SITES),
            "http://localhost:8000/api/dcim/sites/"
        );
        assert_eq!(
            client.object_url(endpoint::VIRTUAL_MACHINES, 12),
            "http://localhost:8000/api/virtualization/virtual-machines/12/"
        );
    }

    #[test]
    fn test_error_message_detail() {
        assert_eq!(
            error_message(403, r#"{"detail": "Invalid token"}"#),
            "Invalid token"
        );
    }

    #[test]
    fn test_error_message_field_errors() {
        assert_eq!(
            error_message(400, r#"{"slug": ["site with this slug already exists."]}"#),
            "slug: site with this slug already exists."
        );
    }

    #[test]
    fn test_error_message_plain_and_empty() {
        assert_eq!(error_message(502, "Bad Gateway\n"), "Bad Gateway");
        assert_eq!(error_message(500, ""), "HTTP 500");
    }
}
