//! PromQL construction for the lag query

use crate::config::{GroupFilter, KafkaInfoConfig};
use crate::entity::ConsumerGroupSet;

use super::LabelNames;

/// Builds `sum(METRIC) by (group, topic)` from the configured template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LagQuery {
    template: String,
    filter: GroupFilter,
    labels: LabelNames,
}

impl LagQuery {
    pub fn new(template: impl Into<String>, filter: GroupFilter, labels: LabelNames) -> Self {
        Self {
            template: template.into().trim().to_string(),
            filter,
            labels,
        }
    }

    pub fn from_config(config: &KafkaInfoConfig) -> Self {
        Self::new(
            config.lag_metric_template(),
            config.kafka_info.group_filter,
            LabelNames::from_config(config),
        )
    }

    /// PromQL for `groups`
    ///
    /// In client mode the groups are not part of the query.
    pub fn build(&self, groups: &ConsumerGroupSet) -> String {
        let selector = match self.filter {
            GroupFilter::Client => self.template.clone(),
            GroupFilter::Server => {
                with_matcher(&self.template, &group_matcher(&self.labels.group, groups))
            }
        };
        format!(
            "sum({}) by ({}, {})",
            selector, self.labels.group, self.labels.topic
        )
    }

    /// Query string value, form-urlencoded
    pub fn encode(&self, groups: &ConsumerGroupSet) -> String {
        url::form_urlencoded::byte_serialize(self.build(groups).as_bytes()).collect()
    }
}

/// `label=~"a|b"`, regex- and string-escaped
fn group_matcher(label: &str, groups: &ConsumerGroupSet) -> String {
    let alternatives: Vec<String> = groups.iter().map(escape_regex).collect();
    format!("{}=~\"{}\"", label, escape_string(&alternatives.join("|")))
}

/// Insert a label matcher into `metric` or `metric{...}`
fn with_matcher(selector: &str, matcher: &str) -> String {
    match selector.strip_suffix('}') {
        Some(head) => {
            let open = head.trim_end();
            if open.ends_with('{') {
                format!("{open}{matcher}}}")
            } else {
                format!("{open}, {matcher}}}")
            }
        }
        None => format!("{selector}{{{matcher}}}"),
    }
}

fn escape_regex(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(
            c,
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
