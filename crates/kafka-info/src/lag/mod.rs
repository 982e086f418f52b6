//! Consumer lag fetch-and-filter engine
//!
//! A [`LagSource`] turns a cluster and a consumer-group set into the rows of
//! the lag table. Two implementations share the contract:
//!
//! - [`InstantQuerySource`] - Prometheus HTTP API instant query (JSON)
//! - [`ExpositionSource`] - Prometheus text exposition scraped from an exporter
//!
//! Both filter client-side by exact group-label membership and report the
//! most recent sample of each series.

pub mod exposition;
pub mod instant;
pub mod query;

use std::rc::Rc;

use async_trait::async_trait;

use crate::api::Transport;
use crate::config::{ClusterAttribute, ClusterDescriptor, KafkaInfoConfig, ResponseFormat};
use crate::entity::ConsumerGroupSet;
use crate::error::{FetchError, FetchResult};

pub use exposition::ExpositionSource;
pub use instant::InstantQuerySource;
pub use query::LagQuery;

/// Fetch the lag rows for `groups` from `cluster`
#[async_trait(?Send)]
pub trait LagSource {
    async fn fetch_lag(
        &self,
        cluster: &ClusterDescriptor,
        groups: &ConsumerGroupSet,
    ) -> FetchResult<FilteredResult>;
}

/// Build the source selected by `kafkaInfo.format`
pub fn source_for<T: Transport + 'static>(
    config: &KafkaInfoConfig,
    transport: T,
) -> Rc<dyn LagSource> {
    match config.kafka_info.format {
        ResponseFormat::Query => Rc::new(InstantQuerySource::new(transport, config)),
        ResponseFormat::Exposition => Rc::new(ExpositionSource::new(transport, config)),
    }
}

// ============================================================================
// Series & rows
// ============================================================================

/// One `(timestamp, value)` sample; the value is kept as sent
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: f64,
    pub value: String,
}

/// One series of the query result
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    /// Group label, absent when the series does not carry one
    pub group: Option<String>,
    pub topic: String,
    /// Samples, oldest first
    pub values: Vec<Sample>,
}

impl MetricSeries {
    /// Value of the most recent sample
    pub fn latest(&self) -> Option<&str> {
        self.values.last().map(|s| s.value.as_str())
    }
}

/// One rendered table row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LagRow {
    pub group: String,
    pub topic: String,
    pub lag: String,
}

impl LagRow {
    /// Lag as a number, when it parses
    pub fn lag_value(&self) -> Option<f64> {
        self.lag.parse().ok()
    }
}

/// Rows whose group is in the requested set, in response order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredResult {
    rows: Vec<LagRow>,
}

impl FilteredResult {
    pub fn rows(&self) -> &[LagRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<LagRow> for FilteredResult {
    fn from_iter<I: IntoIterator<Item = LagRow>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Keep the series whose group label is in `groups`
///
/// An empty set keeps nothing. Series without samples are skipped.
pub fn filter_by_groups(
    series: impl IntoIterator<Item = MetricSeries>,
    groups: &ConsumerGroupSet,
) -> FilteredResult {
    series
        .into_iter()
        .filter_map(|s| {
            let group = s.group.as_deref().filter(|g| groups.contains(g))?;
            let lag = s.latest()?;
            Some(LagRow {
                group: group.to_string(),
                topic: s.topic.clone(),
                lag: lag.to_string(),
            })
        })
        .collect()
}

/// Reject an empty result when groups were requested
pub fn require_match(result: FilteredResult, groups: &ConsumerGroupSet) -> FetchResult<FilteredResult> {
    if result.is_empty() && !groups.is_empty() {
        return Err(FetchError::NoMatch {
            groups: groups.to_string(),
        });
    }
    Ok(result)
}

/// Label names used to read group and topic from a series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelNames {
    pub group: String,
    pub topic: String,
}

impl LabelNames {
    pub fn from_config(config: &KafkaInfoConfig) -> Self {
        Self {
            group: config.kafka_info.group_label.clone(),
            topic: config.kafka_info.topic_label.clone(),
        }
    }
}

impl Default for LabelNames {
    fn default() -> Self {
        Self {
            group: "group".to_string(),
            topic: "topic".to_string(),
        }
    }
}

/// `{baseUrl}/api/proxy/{proxy}` addressing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    base_url: String,
}

impl ProxyEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// URL of `path` on the cluster's proxied upstream
    pub fn url(&self, cluster: &ClusterDescriptor, path: &str) -> String {
        format!(
            "{}/api/proxy/{}/{}",
            self.base_url,
            cluster.attribute(ClusterAttribute::Proxy).trim_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;
    use crate::api::{ProxyRequest, RawResponse};

    /// Transport replaying canned responses and recording requests
    #[derive(Default)]
    pub struct StubTransport {
        responses: RefCell<VecDeque<FetchResult<RawResponse>>>,
        pub requests: RefCell<Vec<ProxyRequest>>,
    }

    impl StubTransport {
        pub fn with(responses: Vec<FetchResult<RawResponse>>) -> Rc<Self> {
            Rc::new(Self {
                responses: RefCell::new(responses.into()),
                requests: RefCell::default(),
            })
        }

        pub fn request_count(&self) -> usize {
            self.requests.borrow().len()
        }

        pub fn last_request(&self) -> ProxyRequest {
            self.requests.borrow().last().cloned().expect("no request sent")
        }
    }

    #[async_trait(?Send)]
    impl Transport for StubTransport {
        async fn get(&self, request: &ProxyRequest) -> FetchResult<RawResponse> {
            self.requests.borrow_mut().push(request.clone());
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Network("no canned response".into())))
        }
    }

    pub fn config(format: &str) -> KafkaInfoConfig {
        KafkaInfoConfig::from_json(&format!(
            r#"{{
                "backend": {{ "baseUrl": "http://portal:7007" }},
                "kafkaInfo": {{
                    "lagMetric": "kafka_consumergroup_lag",
                    "format": "{format}",
                    "clusters": [
                        {{ "name": "prod", "proxy": "prom-prod", "token": "t0k" }},
                        {{ "name": "stage", "proxy": "prom-stage" }}
                    ]
                }}
            }}"#
        ))
        .unwrap()
    }
}
