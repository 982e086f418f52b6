//! Widget configuration
//!
//! The host page injects configuration as JSON, mirroring the portal's own
//! `backend.*` and `kafkaInfo.*` keys. Lookup order:
//! 1. `<meta name="kafka-info:config" content="{...}">` (server-injected)
//! 2. `window.__KAFKA_INFO_CONFIG__` (object or JSON string)
//!
//! The configuration is read once at mount and passed into the card; nothing
//! here is global.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};
use validator::Validate;
use wasm_bindgen::JsCast;

use crate::error::{ConfigError, ConfigResult};

const CONFIG_META: &str = "kafka-info:config";
const CONFIG_GLOBAL: &str = "__KAFKA_INFO_CONFIG__";

/// Default request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Complete widget configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KafkaInfoConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    pub kafka_info: KafkaInfoSection,
}

/// `backend.*` keys
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Base URL of the portal backend hosting `/api/proxy`
    #[serde(default, deserialize_with = "string_or_null")]
    pub base_url: String,
}

/// `kafkaInfo.*` keys
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct KafkaInfoSection {
    /// Lag metric name or selector (e.g. `kafka_consumergroup_lag`)
    #[validate(length(min = 1))]
    pub lag_metric: String,

    /// Clusters in display order
    #[serde(default)]
    pub clusters: Vec<ClusterDescriptor>,

    /// Response format served by the proxied endpoint
    #[serde(default)]
    pub format: ResponseFormat,

    /// Where consumer groups are filtered
    #[serde(default)]
    pub group_filter: GroupFilter,

    /// Label carrying the consumer group name
    #[serde(default = "default_group_label")]
    #[validate(length(min = 1))]
    pub group_label: String,

    /// Label carrying the topic name
    #[serde(default = "default_topic_label")]
    #[validate(length(min = 1))]
    pub topic_label: String,

    /// Scrape path used by the exposition format
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    #[validate(range(min = 100, max = 120000))]
    pub timeout_ms: u64,
}

fn default_group_label() -> String {
    "group".to_string()
}

fn default_topic_label() -> String {
    "topic".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Body format of the proxied metrics endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Prometheus HTTP API instant query (JSON)
    #[default]
    Query,
    /// Prometheus text exposition format (scrape endpoint)
    Exposition,
}

/// Where the consumer-group restriction is applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupFilter {
    /// Unfiltered query, rows filtered in the widget
    #[default]
    Client,
    /// Groups also pushed into the query as a regex matcher
    Server,
}

impl KafkaInfoConfig {
    /// Parse and validate configuration from JSON
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Invalid {
            what: "configuration",
            message: e.to_string(),
        })?;
        config.kafka_info.validate()?;
        Ok(config)
    }

    /// Load configuration injected by the host page
    ///
    /// Falls back to the current window origin when `backend.baseUrl` is empty.
    pub fn load() -> ConfigResult<Self> {
        let json = read_injected(CONFIG_META, CONFIG_GLOBAL)
            .ok_or(ConfigError::Missing("kafka-info configuration"))?;
        let mut config = Self::from_json(&json)?;

        if config.backend.base_url.is_empty() {
            config.backend.base_url = web_sys::window()
                .and_then(|w| w.location().origin().ok())
                .unwrap_or_default();
            warn!(
                origin = %config.backend.base_url,
                "backend.baseUrl not configured, using window origin"
            );
        }

        debug!(
            clusters = config.kafka_info.clusters.len(),
            format = ?config.kafka_info.format,
            "kafka-info configuration loaded"
        );
        Ok(config)
    }

    /// Metric template used to build the lag query
    pub fn lag_metric_template(&self) -> &str {
        &self.kafka_info.lag_metric
    }

    /// Configured clusters, in display order
    pub fn clusters(&self) -> &[ClusterDescriptor] {
        &self.kafka_info.clusters
    }

    /// Backend base URL without a trailing slash
    pub fn backend_base_url(&self) -> &str {
        self.backend.base_url.trim_end_matches('/')
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.kafka_info.timeout_ms)
    }
}

// ============================================================================
// Clusters
// ============================================================================

/// One metrics cluster reachable through the backend proxy
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClusterDescriptor {
    /// Display label
    #[serde(default, deserialize_with = "string_or_null")]
    pub name: String,
    /// Proxy path segment (`/api/proxy/{proxy}`)
    #[serde(default, deserialize_with = "string_or_null")]
    pub proxy: String,
    /// Optional bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<SensitiveString>,
}

impl ClusterDescriptor {
    pub fn new(name: impl Into<String>, proxy: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            proxy: proxy.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SensitiveString::new(token));
        self
    }

    /// Bearer token, if one is configured and non-empty
    pub fn bearer_token(&self) -> Option<&str> {
        Some(self.attribute(ClusterAttribute::Token)).filter(|t| !t.is_empty())
    }

    /// Read one attribute; an absent token reads as `""`
    pub fn attribute(&self, attribute: ClusterAttribute) -> &str {
        match attribute {
            ClusterAttribute::Name => &self.name,
            ClusterAttribute::Proxy => &self.proxy,
            ClusterAttribute::Token => self
                .token
                .as_ref()
                .map(|t| t.expose_secret())
                .unwrap_or(""),
        }
    }

    /// Label for the cluster picker
    pub fn display_name(&self, index: usize) -> String {
        if self.name.is_empty() {
            format!("Cluster {}", index + 1)
        } else {
            self.name.clone()
        }
    }
}

/// Addressable cluster fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterAttribute {
    Name,
    Proxy,
    Token,
}

/// Read one attribute of the cluster at `index`
///
/// Missing fields and out-of-range indices read as `""`.
pub fn cluster_attribute(
    clusters: &[ClusterDescriptor],
    index: usize,
    attribute: ClusterAttribute,
) -> &str {
    clusters
        .get(index)
        .map_or("", |cluster| cluster.attribute(attribute))
}

/// Wrapper for sensitive configuration values
///
/// Prevents accidental logging of secrets while allowing access when needed.
#[derive(Debug, Clone)]
pub struct SensitiveString(SecretString);

impl SensitiveString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Serialize for SensitiveString {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str("***REDACTED***")
    }
}

impl<'de> Deserialize<'de> for SensitiveString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::new(value))
    }
}

fn string_or_null<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Host injection
// ============================================================================

/// Read a JSON document injected via `<meta name=..>` or a window global
pub(crate) fn read_injected(meta_name: &str, global: &str) -> Option<String> {
    let document = web_sys::window().and_then(|w| w.document());
    if let Some(content) = document
        .as_ref()
        .and_then(|d| get_meta_content(d, meta_name))
        .filter(|c| !c.trim().is_empty())
    {
        return Some(content);
    }
    get_js_global_json(global)
}

/// Get content from a <meta name="..."> tag
fn get_meta_content(document: &web_sys::Document, name: &str) -> Option<String> {
    let selector = format!("meta[name=\"{}\"]", name);
    document
        .query_selector(&selector)
        .ok()
        .flatten()
        .and_then(|el| el.dyn_into::<web_sys::HtmlMetaElement>().ok())
        .map(|meta| meta.content())
}

/// Get window[global] as JSON text
fn get_js_global_json(global: &str) -> Option<String> {
    let window = web_sys::window()?;
    let value = js_sys::Reflect::get(&window, &global.into()).ok()?;

    if value.is_undefined() || value.is_null() {
        return None;
    }
    if let Some(text) = value.as_string() {
        return Some(text);
    }
    js_sys::JSON::stringify(&value).ok().map(String::from)
}
