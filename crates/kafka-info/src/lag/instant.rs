//! Prometheus HTTP API instant query source
//!
//! `GET {baseUrl}/api/proxy/{proxy}/api/v1/query?query=...`

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::api::{ProxyRequest, Transport};
use crate::config::{ClusterDescriptor, KafkaInfoConfig};
use crate::entity::ConsumerGroupSet;
use crate::error::{FetchError, FetchResult};

use super::{
    filter_by_groups, require_match, FilteredResult, LabelNames, LagQuery, LagSource,
    MetricSeries, ProxyEndpoint, Sample,
};

const QUERY_PATH: &str = "/api/v1/query";
const ACCEPT_JSON: &str = "application/json";

/// Lag from an instant query against a Prometheus-compatible API
pub struct InstantQuerySource<T> {
    transport: T,
    endpoint: ProxyEndpoint,
    query: LagQuery,
    labels: LabelNames,
}

impl<T: Transport> InstantQuerySource<T> {
    pub fn new(transport: T, config: &KafkaInfoConfig) -> Self {
        Self {
            transport,
            endpoint: ProxyEndpoint::new(config.backend_base_url()),
            query: LagQuery::from_config(config),
            labels: LabelNames::from_config(config),
        }
    }

    /// Request for `groups` on `cluster`
    pub fn request(&self, cluster: &ClusterDescriptor, groups: &ConsumerGroupSet) -> ProxyRequest {
        let url = format!(
            "{}?query={}",
            self.endpoint.url(cluster, QUERY_PATH),
            self.query.encode(groups)
        );
        ProxyRequest::new(url, ACCEPT_JSON).for_cluster(cluster)
    }
}

#[async_trait(?Send)]
impl<T: Transport> LagSource for InstantQuerySource<T> {
    async fn fetch_lag(
        &self,
        cluster: &ClusterDescriptor,
        groups: &ConsumerGroupSet,
    ) -> FetchResult<FilteredResult> {
        if groups.is_empty() {
            debug!(cluster = %cluster.name, "no consumer groups, skipping query");
            return Ok(FilteredResult::default());
        }

        let request = self.request(cluster, groups);
        let body = self.transport.get(&request).await?.into_success_body()?;
        let series = parse_query_response(&body, &self.labels)?;
        let total = series.len();

        let result = require_match(filter_by_groups(series, groups), groups)?;
        info!(
            cluster = %cluster.name,
            series = total,
            rows = result.len(),
            "consumer lag fetched"
        );
        Ok(result)
    }
}

// ============================================================================
// Response shape
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryData {
    #[serde(default)]
    result_type: Option<String>,
    result: Vec<RawSeries>,
}

#[derive(Debug, Deserialize)]
struct RawSeries {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    /// Instant vector: one `[ts, "v"]`
    #[serde(default)]
    value: Option<RawSample>,
    /// Range vector: `[[ts, "v"], ...]`
    #[serde(default)]
    values: Vec<RawSample>,
}

#[derive(Debug, Deserialize)]
struct RawSample(f64, String);

impl From<RawSample> for Sample {
    fn from(raw: RawSample) -> Self {
        Sample {
            timestamp: raw.0,
            value: raw.1,
        }
    }
}

/// Parse an instant- or range-query body into series
pub fn parse_query_response(body: &str, labels: &LabelNames) -> FetchResult<Vec<MetricSeries>> {
    let response: QueryResponse = serde_json::from_str(body)?;

    match response.status.as_str() {
        "success" => {}
        "error" => {
            return Err(FetchError::Unspecified(format!(
                "{}: {}",
                response.error_type.as_deref().unwrap_or("query error"),
                response.error.as_deref().unwrap_or("no message")
            )))
        }
        other => return Err(FetchError::Parse(format!("unknown status '{other}'"))),
    }

    let data = response
        .data
        .ok_or_else(|| FetchError::Parse("response has no data".to_string()))?;
    if let Some(kind) = data.result_type.as_deref() {
        if kind != "vector" && kind != "matrix" {
            return Err(FetchError::Parse(format!("unsupported result type '{kind}'")));
        }
    }

    data.result
        .into_iter()
        .map(|raw| {
            let mut samples: Vec<Sample> = raw.values.into_iter().map(Sample::from).collect();
            if let Some(value) = raw.value {
                samples.push(value.into());
            }
            if samples.is_empty() {
                return Err(FetchError::Parse("series without samples".to_string()));
            }
            Ok(MetricSeries {
                group: raw.metric.get(&labels.group).cloned(),
                topic: raw.metric.get(&labels.topic).cloned().unwrap_or_default(),
                values: samples,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RawResponse;
    use crate::lag::testing::{config, StubTransport};

    const TEAM_RESPONSE: &str = r#"{
        "status": "success",
        "data": {
            "resultType": "vector",
            "result": [
                { "metric": { "group": "team-a", "topic": "t1" }, "value": [1700000000.1, "5"] },
                { "metric": { "group": "team-b", "topic": "t1" }, "value": [1700000000.1, "40"] },
                { "metric": { "group": "team-a", "topic": "t2" }, "value": [1700000000.1, "12"] }
            ]
        }
    }"#;

    fn source(stub: std::rc::Rc<StubTransport>) -> InstantQuerySource<std::rc::Rc<StubTransport>> {
        InstantQuerySource::new(stub, &config("query"))
    }

    #[tokio::test]
    async fn test_team_a_rows() {
        let stub = StubTransport::with(vec![Ok(RawResponse::ok(TEAM_RESPONSE))]);
        let cfg = config("query");
        let result = source(stub.clone())
            .fetch_lag(&cfg.clusters()[0], &ConsumerGroupSet::parse("team-a"))
            .await
            .unwrap();

        let rows: Vec<(&str, &str)> = result
            .rows()
            .iter()
            .map(|r| (r.topic.as_str(), r.lag.as_str()))
            .collect();
        assert_eq!(rows, vec![("t1", "5"), ("t2", "12")]);
    }

    #[tokio::test]
    async fn test_request_targets_cluster_proxy_with_token() {
        let stub = StubTransport::with(vec![Ok(RawResponse::ok(TEAM_RESPONSE))]);
        let cfg = config("query");
        source(stub.clone())
            .fetch_lag(&cfg.clusters()[0], &ConsumerGroupSet::parse("team-a"))
            .await
            .unwrap();

        let request = stub.last_request();
        assert_eq!(
            request.url,
            "http://portal:7007/api/proxy/prom-prod/api/v1/query?query=sum%28kafka_consumergroup_lag%29+by+%28group%2C+topic%29"
        );
        assert_eq!(request.accept, "application/json");
        assert_eq!(request.authorization().as_deref(), Some("Bearer t0k"));
    }

    #[tokio::test]
    async fn test_empty_groups_skip_request() {
        let stub = StubTransport::with(vec![]);
        let cfg = config("query");
        let result = source(stub.clone())
            .fetch_lag(&cfg.clusters()[0], &ConsumerGroupSet::default())
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(stub.request_count(), 0);
    }

    #[tokio::test]
    async fn test_no_match() {
        let stub = StubTransport::with(vec![Ok(RawResponse::ok(TEAM_RESPONSE))]);
        let cfg = config("query");
        let err = source(stub)
            .fetch_lag(&cfg.clusters()[0], &ConsumerGroupSet::parse("team-z"))
            .await
            .unwrap_err();
        assert!(err.is_no_match());
    }

    #[tokio::test]
    async fn test_network_failure() {
        let stub = StubTransport::with(vec![Err(FetchError::Network("refused".into()))]);
        let cfg = config("query");
        let err = source(stub)
            .fetch_lag(&cfg.clusters()[0], &ConsumerGroupSet::parse("team-a"))
            .await
            .unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_non_2xx_is_network() {
        let stub = StubTransport::with(vec![Ok(RawResponse {
            status: 502,
            body: "bad gateway".into(),
        })]);
        let cfg = config("query");
        let err = source(stub)
            .fetch_lag(&cfg.clusters()[0], &ConsumerGroupSet::parse("team-a"))
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::http_status(502));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse() {
        let stub = StubTransport::with(vec![Ok(RawResponse::ok("<html>proxy login</html>"))]);
        let cfg = config("query");
        let err = source(stub)
            .fetch_lag(&cfg.clusters()[0], &ConsumerGroupSet::parse("team-a"))
            .await
            .unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_missing_result_is_parse() {
        let err = parse_query_response(r#"{"status":"success","data":{}}"#, &LabelNames::default())
            .unwrap_err();
        assert!(err.is_parse());

        let err = parse_query_response(r#"{"status":"success"}"#, &LabelNames::default())
            .unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_scalar_result_is_parse() {
        let err = parse_query_response(
            r#"{"status":"success","data":{"resultType":"scalar","result":[1, "2"]}}"#,
            &LabelNames::default(),
        )
        .unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_server_error_status() {
        let err = parse_query_response(
            r#"{"status":"error","errorType":"bad_data","error":"parse error at char 4"}"#,
            &LabelNames::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            FetchError::Unspecified("bad_data: parse error at char 4".into())
        );
    }

    #[test]
    fn test_matrix_uses_last_value() {
        let series = parse_query_response(
            r#"{"status":"success","data":{"resultType":"matrix","result":[
                {"metric":{"group":"g","topic":"t"},"values":[[1,"3"],[2,"8"],[3,"4"]]}
            ]}}"#,
            &LabelNames::default(),
        )
        .unwrap();
        assert_eq!(series[0].latest(), Some("4"));
    }

    #[test]
    fn test_missing_topic_label_is_empty() {
        let series = parse_query_response(
            r#"{"status":"success","data":{"resultType":"vector","result":[
                {"metric":{"group":"g"},"value":[1,"3"]}
            ]}}"#,
            &LabelNames::default(),
        )
        .unwrap();
        assert_eq!(series[0].topic, "");
        assert_eq!(series[0].group.as_deref(), Some("g"));
    }

    #[test]
    fn test_series_without_samples_is_parse() {
        let err = parse_query_response(
            r#"{"status":"success","data":{"resultType":"vector","result":[{"metric":{"group":"g"}}]}}"#,
            &LabelNames::default(),
        )
        .unwrap_err();
        assert!(err.is_parse());
    }
}
