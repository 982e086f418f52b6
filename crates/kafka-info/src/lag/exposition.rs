//! Prometheus text exposition source
//!
//! Scrapes `{baseUrl}/api/proxy/{proxy}{metricsPath}` from an exporter and
//! reads the lag metric straight from the text format:
//!
//! ```text
//! # HELP kafka_consumergroup_lag Current lag
//! # TYPE kafka_consumergroup_lag gauge
//! kafka_consumergroup_lag{group="orders",topic="payments",partition="0"} 12
//! ```
//!
//! Samples sharing (group, topic) are summed, which gives the same rows as the
//! `sum by (group, topic)` instant query.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::api::{ProxyRequest, Transport};
use crate::config::{ClusterDescriptor, KafkaInfoConfig};
use crate::entity::ConsumerGroupSet;
use crate::error::{FetchError, FetchResult};

use super::{
    filter_by_groups, require_match, FilteredResult, LabelNames, LagSource, MetricSeries,
    ProxyEndpoint, Sample,
};

const ACCEPT_TEXT: &str = "text/plain;version=0.0.4";

/// One parsed exposition line
#[derive(Debug, Clone, PartialEq)]
pub struct ExpositionSample {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
    pub timestamp: Option<i64>,
}

/// Lag scraped from an exporter's text endpoint
pub struct ExpositionSource<T> {
    transport: T,
    endpoint: ProxyEndpoint,
    metrics_path: String,
    metric: String,
    labels: LabelNames,
}

impl<T: Transport> ExpositionSource<T> {
    pub fn new(transport: T, config: &KafkaInfoConfig) -> Self {
        // A selector template reduces to its metric name here
        let metric = config
            .lag_metric_template()
            .split('{')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        Self {
            transport,
            endpoint: ProxyEndpoint::new(config.backend_base_url()),
            metrics_path: config.kafka_info.metrics_path.clone(),
            metric,
            labels: LabelNames::from_config(config),
        }
    }

    pub fn request(&self, cluster: &ClusterDescriptor) -> ProxyRequest {
        ProxyRequest::new(self.endpoint.url(cluster, &self.metrics_path), ACCEPT_TEXT)
            .for_cluster(cluster)
    }
}

#[async_trait(?Send)]
impl<T: Transport> LagSource for ExpositionSource<T> {
    async fn fetch_lag(
        &self,
        cluster: &ClusterDescriptor,
        groups: &ConsumerGroupSet,
    ) -> FetchResult<FilteredResult> {
        if groups.is_empty() {
            debug!(cluster = %cluster.name, "no consumer groups, skipping scrape");
            return Ok(FilteredResult::default());
        }

        let body = self
            .transport
            .get(&self.request(cluster))
            .await?
            .into_success_body()?;
        let samples = parse_exposition(&body)?;
        let series = aggregate_lag(&samples, &self.metric, &self.labels);

        let result = require_match(filter_by_groups(series, groups), groups)?;
        info!(
            cluster = %cluster.name,
            samples = samples.len(),
            rows = result.len(),
            "consumer lag scraped"
        );
        Ok(result)
    }
}

/// Sum samples of `metric` per (group, topic), keeping first-seen order
pub fn aggregate_lag(
    samples: &[ExpositionSample],
    metric: &str,
    labels: &LabelNames,
) -> Vec<MetricSeries> {
    let mut order: Vec<(Option<String>, String)> = Vec::new();
    let mut sums: BTreeMap<(Option<String>, String), (f64, Option<i64>)> = BTreeMap::new();

    for sample in samples.iter().filter(|s| s.name == metric) {
        let key = (
            sample.labels.get(&labels.group).cloned(),
            sample.labels.get(&labels.topic).cloned().unwrap_or_default(),
        );
        let entry = sums.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            (0.0, None)
        });
        entry.0 += sample.value;
        entry.1 = entry.1.max(sample.timestamp);
    }

    order
        .into_iter()
        .filter_map(|key| {
            let (sum, timestamp) = sums.remove(&key)?;
            Some(MetricSeries {
                group: key.0,
                topic: key.1,
                values: vec![Sample {
                    timestamp: timestamp.map(|ms| ms as f64 / 1000.0).unwrap_or_default(),
                    value: format_value(sum),
                }],
            })
        })
        .collect()
}

/// Integral values print without a fraction
fn format_value(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Parse a text exposition payload
///
/// Comments and blank lines are skipped; any malformed sample line fails the
/// whole payload.
pub fn parse_exposition(payload: &str) -> FetchResult<Vec<ExpositionSample>> {
    let mut samples = Vec::new();
    for (idx, line) in payload.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let sample = parse_line(trimmed)
            .map_err(|msg| FetchError::Parse(format!("line {}: {}", idx + 1, msg)))?;
        samples.push(sample);
    }
    Ok(samples)
}

fn parse_line(line: &str) -> Result<ExpositionSample, String> {
    let name_end = line
        .find(|c: char| c == '{' || c.is_whitespace())
        .ok_or_else(|| "missing value".to_string())?;
    let name = &line[..name_end];
    if name.is_empty() {
        return Err("missing metric name".to_string());
    }

    let (labels, rest) = if line[name_end..].starts_with('{') {
        parse_labels(&line[name_end + 1..])?
    } else {
        (BTreeMap::new(), &line[name_end..])
    };

    let mut fields = rest.split_whitespace();
    let value_str = fields.next().ok_or_else(|| "missing value".to_string())?;
    let value: f64 = value_str
        .parse()
        .map_err(|_| format!("invalid value '{value_str}'"))?;
    let timestamp = fields
        .next()
        .map(|t| t.parse::<i64>().map_err(|_| format!("invalid timestamp '{t}'")))
        .transpose()?;

    Ok(ExpositionSample {
        name: name.to_string(),
        labels,
        value,
        timestamp,
    })
}

/// Parse `k="v",...}` and return the labels plus the text after `}`
fn parse_labels(input: &str) -> Result<(BTreeMap<String, String>, &str), String> {
    let mut labels = BTreeMap::new();
    let mut chars = input.char_indices().peekable();

    loop {
        while chars.next_if(|(_, c)| c.is_whitespace() || *c == ',').is_some() {}

        let Some(&(start, c)) = chars.peek() else {
            return Err("unterminated label set".to_string());
        };
        if c == '}' {
            return Ok((labels, &input[start + 1..]));
        }

        let mut key_end = start;
        // Label names are ASCII word characters
        while let Some((i, _)) = chars.next_if(|(_, c)| c.is_ascii_alphanumeric() || *c == '_') {
            key_end = i + 1;
        }
        let key = &input[start..key_end];
        if key.is_empty() {
            return Err(format!("invalid label name at '{}'", &input[start..]));
        }

        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
        if chars.next().map(|(_, c)| c) != Some('=') {
            return Err(format!("expected '=' after label '{key}'"));
        }
        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
        if chars.next().map(|(_, c)| c) != Some('"') {
            return Err(format!("expected quoted value for label '{key}'"));
        }

        let mut value = String::new();
        loop {
            match chars.next() {
                Some((_, '"')) => break,
                Some((_, '\\')) => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, escaped)) => value.push(escaped),
                    None => return Err("unterminated escape".to_string()),
                },
                Some((_, c)) => value.push(c),
                None => return Err(format!("unterminated value for label '{key}'")),
            }
        }
        labels.insert(key.to_string(), value);
    }
}
