//! Values reported for configured metrics.

use std::collections::HashMap;
use std::time::Instant;

use anyhow::{Context, bail};
use tracing::debug;

use crate::config::{PushConfig, ValueSource};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Reading {
    Fixed(f32),
    Uptime,
    Pushes(u64),
}

/// Per-metric value sources, consulted by the update callback on every push.
#[derive(Debug)]
pub struct Readings {
    started: Instant,
    by_name: HashMap<String, Reading>,
}

impl Readings {
    /// Resolve the value source of every configured metric. `overrides`
    /// replace the configured value of the named metric.
    pub fn from_config(config: &PushConfig, overrides: &[(String, f32)]) -> anyhow::Result<Self> {
        let mut by_name = HashMap::new();
        for metric in &config.metrics {
            let reading = match (metric.value, metric.source) {
                (_, Some(ValueSource::Uptime)) => Reading::Uptime,
                (_, Some(ValueSource::Pushes)) => Reading::Pushes(0),
                (Some(value), None) => Reading::Fixed(value),
                (None, None) => Reading::Fixed(0.0),
            };
            // Metrics sharing a name share the first one's source.
            by_name.entry(metric.name.clone()).or_insert(reading);
        }

        for (name, value) in overrides {
            let Some(slot) = by_name.get_mut(name) else {
                bail!("--set {name}: no metric with that name in the configuration");
            };
            debug!(metric = %name, value, "value overridden");
            *slot = Reading::Fixed(*value);
        }

        Ok(Self {
            started: Instant::now(),
            by_name,
        })
    }

    /// Current value for `name`; unknown names read as `0.0`.
    pub fn read(&mut self, name: &str) -> f32 {
        match self.by_name.get_mut(name) {
            Some(Reading::Fixed(value)) => *value,
            Some(Reading::Uptime) => self.started.elapsed().as_secs_f32(),
            Some(Reading::Pushes(count)) => {
                *count += 1;
                *count as f32
            }
            None => 0.0,
        }
    }
}

/// Parse a `NAME=VALUE` override from the command line.
pub fn parse_assignment(s: &str) -> anyhow::Result<(String, f32)> {
    let (name, value) = s
        .split_once('=')
        .with_context(|| format!("expected NAME=VALUE, got {s:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("expected NAME=VALUE, got {s:?}");
    }
    let value: f32 = value
        .trim()
        .parse()
        .with_context(|| format!("{name}: {value:?} is not a number"))?;
    Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PushConfig {
        toml::from_str(
            r#"
[gateway]
host = "localhost"
job = "demo"

[[metric]]
name = "temperature"
value = 25.5

[[metric]]
name = "uptime_seconds"
source = "uptime"

[[metric]]
name = "pushes_total"
kind = "counter"
source = "pushes"

[[metric]]
name = "unset"
"#,
        )
        .unwrap()
    }

    #[test]
    fn fixed_values_repeat() {
        let mut readings = Readings::from_config(&config(), &[]).unwrap();
        assert_eq!(readings.read("temperature"), 25.5);
        assert_eq!(readings.read("temperature"), 25.5);
        assert_eq!(readings.read("unset"), 0.0);
        assert_eq!(readings.read("missing"), 0.0);
    }

    #[test]
    fn push_counter_increments_per_read() {
        let mut readings = Readings::from_config(&config(), &[]).unwrap();
        assert_eq!(readings.read("pushes_total"), 1.0);
        assert_eq!(readings.read("pushes_total"), 2.0);
        assert_eq!(readings.read("pushes_total"), 3.0);
    }

    #[test]
    fn uptime_is_non_negative_and_grows() {
        let mut readings = Readings::from_config(&config(), &[]).unwrap();
        let first = readings.read("uptime_seconds");
        std::thread::sleep(std::time::Duration::from_millis(20));
        let second = readings.read("uptime_seconds");
        assert!(first >= 0.0);
        assert!(second > first);
    }

    #[test]
    fn overrides_replace_configured_values() {
        let overrides = [
            ("temperature".to_string(), 19.0),
            ("uptime_seconds".to_string(), 7.0),
        ];
        let mut readings = Readings::from_config(&config(), &overrides).unwrap();
        assert_eq!(readings.read("temperature"), 19.0);
        assert_eq!(readings.read("uptime_seconds"), 7.0);
    }

    #[test]
    fn override_of_unknown_metric_fails() {
        let err = Readings::from_config(&config(), &[("nope".to_string(), 1.0)]).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn assignments() {
        assert_eq!(
            parse_assignment("temperature=21.5").unwrap(),
            ("temperature".to_string(), 21.5)
        );
        assert_eq!(parse_assignment(" vcc = 3.3 ").unwrap(), ("vcc".to_string(), 3.3));
        assert!(parse_assignment("temperature").is_err());
        assert!(parse_assignment("=1").is_err());
        assert!(parse_assignment("vcc=high").is_err());
    }
}
