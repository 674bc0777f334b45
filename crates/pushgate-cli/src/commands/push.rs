//! `pushgate push`: push the configured metrics once or on an interval.

use std::path::Path;

use anyhow::{Context, bail};
use tracing::{info, warn};

use pushgate_client::{LabelSet, PushClient, PushOptions, PushOutcome, TcpTransport, Transport};

use crate::config::PushConfig;
use crate::readings::Readings;

pub const MAX_METRICS: usize = 32;
pub const MAX_METRIC_LABELS: usize = 4;
pub const MAX_COMMON_LABELS: usize = 4;

pub type ConfiguredClient<T> =
    PushClient<'static, T, MAX_METRICS, MAX_METRIC_LABELS, MAX_COMMON_LABELS>;

/// Load and validate a configuration that lives for the rest of the process.
///
/// Registered metrics borrow their names and labels from it.
pub fn load(path: &Path) -> anyhow::Result<&'static PushConfig> {
    let config = PushConfig::from_file(path)?;
    Ok(Box::leak(Box::new(config)))
}

/// Register every configured metric and wire the value sources.
pub fn build_client<T: Transport>(
    transport: T,
    config: &'static PushConfig,
    overrides: &[(String, f32)],
) -> anyhow::Result<ConfiguredClient<T>> {
    let mut common = LabelSet::new();
    for label in &config.common_labels {
        common
            .push(&label.key, &label.value)
            .with_context(|| format!("common label {:?}", label.key))?;
    }

    let options = PushOptions {
        response_timeout: config.gateway.response_timeout()?,
    };
    let mut client = PushClient::new(transport, common).with_options(options);

    for metric in &config.metrics {
        let mut labels = LabelSet::new();
        for label in &metric.labels {
            labels
                .push(&label.key, &label.value)
                .with_context(|| format!("labels of metric {:?}", metric.name))?;
        }
        client
            .add_metric(&metric.name, &metric.help, labels, metric.kind)
            .with_context(|| format!("metric {:?}", metric.name))?;
    }

    let mut readings = Readings::from_config(config, overrides)?;
    client.set_update_callback(move |name, _| readings.read(name));

    Ok(client)
}

pub async fn run(
    config_path: &Path,
    once: bool,
    instance: Option<String>,
    overrides: Vec<(String, f32)>,
) -> anyhow::Result<()> {
    let config = load(config_path)?;
    let mut client = build_client(TcpTransport::new(), config, &overrides)?;

    let gateway = &config.gateway;
    let instance = instance.as_deref().or(gateway.instance.as_deref());

    info!(
        host = %gateway.host,
        port = gateway.port,
        job = %gateway.job,
        instance = instance.unwrap_or("-"),
        metrics = client.registry().len(),
        "pushgate starting"
    );

    let mut push_once = || {
        // The client does blocking socket I/O.
        let outcome = tokio::task::block_in_place(|| {
            client.push(&gateway.host, gateway.port, &gateway.job, instance)
        });
        report(outcome);
        outcome
    };

    if once {
        let outcome = push_once();
        if !outcome.is_success() {
            bail!("push to {}:{} failed: {outcome}", gateway.host, gateway.port);
        }
        return Ok(());
    }

    let interval = gateway.interval()?;
    info!(?interval, "pushing periodically, ctrl-c to stop");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                push_once();
            }
            _ = tokio::signal::ctrl_c() => {
                info!("pushgate shutting down");
                break;
            }
        }
    }

    Ok(())
}

fn report(outcome: PushOutcome) {
    if outcome.is_success() {
        info!(%outcome, "push complete");
    } else {
        warn!(code = outcome.code(), %outcome, "push failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushgate_client::MetricKind;

    fn leak(toml_str: &str) -> &'static PushConfig {
        let config: PushConfig = toml::from_str(toml_str).unwrap();
        config.validate().unwrap();
        Box::leak(Box::new(config))
    }

    const CONFIG: &str = r#"
[gateway]
host = "localhost"
job = "demo"
response_timeout = "250ms"

[[common_label]]
key = "room"
value = "Kitchen"

[[metric]]
name = "temperature"
help = "Temperature in Celsius"
value = 25.5

[[metric]]
name = "pushes_total"
kind = "counter"
source = "pushes"
labels = [{ key = "board", value = "esp32" }]
"#;

    #[test]
    fn client_mirrors_config() {
        let config = leak(CONFIG);
        let client = build_client(TcpTransport::new(), config, &[]).unwrap();

        assert_eq!(client.registry().len(), 2);
        assert_eq!(client.common_labels().len(), 1);
        let pushes = client.registry().get(1).unwrap();
        assert_eq!(pushes.name(), "pushes_total");
        assert_eq!(pushes.kind(), MetricKind::Counter);
        assert_eq!(pushes.labels().get(0).unwrap().value, "esp32");
    }

    #[test]
    fn refreshed_body_uses_readings_and_overrides() {
        let config = leak(CONFIG);
        let overrides = [("temperature".to_string(), 21.0)];
        let mut client = build_client(TcpTransport::new(), config, &overrides).unwrap();
        client.refresh();

        let mut body = String::new();
        client.render_body(&mut body).unwrap();
        assert_eq!(
            body,
            "# HELP temperature Temperature in Celsius\n\
             # TYPE temperature gauge\n\
             temperature{room=\"Kitchen\"} 21.00\n\
             # HELP pushes_total \n\
             # TYPE pushes_total counter\n\
             pushes_total{room=\"Kitchen\",board=\"esp32\"} 1.00\n"
        );
        assert_eq!(client.content_length(), body.len());
    }

    #[test]
    fn too_many_common_labels_is_an_error() {
        let mut toml_str = String::from("[gateway]\nhost = \"localhost\"\njob = \"demo\"\n");
        for i in 0..=MAX_COMMON_LABELS {
            toml_str.push_str(&format!("\n[[common_label]]\nkey = \"k{i}\"\nvalue = \"v\"\n"));
        }
        let config = leak(&toml_str);
        let err = build_client(TcpTransport::new(), config, &[]).err().unwrap();
        assert!(format!("{err:#}").contains("k4"));
    }

    #[test]
    fn too_many_metrics_is_an_error() {
        let mut toml_str = String::from("[gateway]\nhost = \"localhost\"\njob = \"demo\"\n");
        for i in 0..=MAX_METRICS {
            toml_str.push_str(&format!("\n[[metric]]\nname = \"m{i}\"\n"));
        }
        let config = leak(&toml_str);
        let err = build_client(TcpTransport::new(), config, &[]).err().unwrap();
        assert!(format!("{err:#}").contains("metric registry is full"));
    }
}
