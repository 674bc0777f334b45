//! pushgate.toml configuration parser.
//!
//! ```toml
//! [gateway]
//! host = "push.example.com"
//! port = 9091
//! job = "demo"
//! interval = "30s"
//!
//! [[common_label]]
//! key = "room"
//! value = "Kitchen"
//!
//! [[metric]]
//! name = "temperature"
//! help = "Temperature in Celsius"
//! value = 25.5
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use pushgate_core::MetricKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    pub gateway: GatewayConfig,
    #[serde(default, rename = "common_label", skip_serializing_if = "Vec::is_empty")]
    pub common_labels: Vec<LabelConfig>,
    #[serde(default, rename = "metric", skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<MetricConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub job: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Time between pushes, e.g. "30s" (default: 30s).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    /// Wait for the gateway's response, e.g. "5s" (default: 5s).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_timeout: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelConfig {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricConfig {
    pub name: String,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub kind: MetricKind,
    /// Fixed value reported on every push.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f32>,
    /// Value computed at push time instead of a fixed one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ValueSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<LabelConfig>,
}

/// Built-in readings for metrics without a fixed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    /// Seconds since pushgate started.
    Uptime,
    /// Number of push cycles so far, this one included.
    Pushes,
}

fn default_port() -> u16 {
    9091
}

impl GatewayConfig {
    pub fn interval(&self) -> anyhow::Result<Duration> {
        duration_or(self.interval.as_deref(), Duration::from_secs(30), "gateway.interval")
    }

    pub fn response_timeout(&self) -> anyhow::Result<Duration> {
        duration_or(
            self.response_timeout.as_deref(),
            Duration::from_secs(5),
            "gateway.response_timeout",
        )
    }
}

impl PushConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: PushConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject configurations that would push something malformed.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.gateway.host.is_empty() {
            bail!("gateway.host must not be empty");
        }
        if self.gateway.job.is_empty() {
            bail!("gateway.job must not be empty");
        }
        if self.gateway.interval()?.is_zero() {
            bail!("gateway.interval must be greater than zero");
        }
        self.gateway.response_timeout()?;

        let mut seen = HashSet::new();
        for label in &self.common_labels {
            if !seen.insert(label.key.as_str()) {
                bail!("common label {:?} is defined twice", label.key);
            }
        }
        for metric in &self.metrics {
            if metric.name.is_empty() {
                bail!("metric name must not be empty");
            }
            if metric.value.is_some() && metric.source.is_some() {
                bail!("metric {:?} sets both value and source", metric.name);
            }
        }
        Ok(())
    }

    /// A starter configuration for a single board reporting room climate.
    pub fn scaffold(host: &str, job: &str) -> Self {
        let gauge = |name: &str, help: &str, value: f32| MetricConfig {
            name: name.to_string(),
            help: help.to_string(),
            kind: MetricKind::Gauge,
            value: Some(value),
            source: None,
            labels: Vec::new(),
        };

        PushConfig {
            gateway: GatewayConfig {
                host: host.to_string(),
                port: default_port(),
                job: job.to_string(),
                instance: None,
                interval: Some("30s".to_string()),
                response_timeout: Some("5s".to_string()),
            },
            common_labels: vec![LabelConfig {
                key: "room".to_string(),
                value: "Kitchen".to_string(),
            }],
            metrics: vec![
                MetricConfig {
                    name: "board_info".to_string(),
                    help: "Information about the board".to_string(),
                    kind: MetricKind::Gauge,
                    value: Some(1.0),
                    source: None,
                    labels: vec![LabelConfig {
                        key: "build".to_string(),
                        value: env!("CARGO_PKG_VERSION").to_string(),
                    }],
                },
                gauge("temperature", "Temperature in Celsius", 25.5),
                gauge("humidity", "Relative air humidity in percent", 60.0),
                gauge("pressure", "Pressure in Pascals", 1013.25),
                MetricConfig {
                    name: "uptime_seconds".to_string(),
                    help: "Seconds since pushgate started".to_string(),
                    kind: MetricKind::Counter,
                    value: None,
                    source: Some(ValueSource::Uptime),
                    labels: Vec::new(),
                },
            ],
        }
    }
}

fn duration_or(value: Option<&str>, default: Duration, field: &str) -> anyhow::Result<Duration> {
    match value {
        None => Ok(default),
        Some(s) => parse_duration(s).with_context(|| format!("{field}: invalid duration {s:?}")),
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
