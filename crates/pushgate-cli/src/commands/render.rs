//! `pushgate render`: print the body a push would send, without sending it.

use std::path::Path;

use anyhow::bail;
use serde::Serialize;

use pushgate_client::{Label, MetricKind, TcpTransport, Transport};

use super::push::{self, ConfiguredClient};

#[derive(Debug, Serialize)]
struct Sample<'a> {
    name: &'a str,
    help: &'a str,
    kind: MetricKind,
    labels: Vec<SampleLabel<'a>>,
    value: f32,
}

#[derive(Debug, Serialize)]
struct SampleLabel<'a> {
    key: &'a str,
    value: &'a str,
}

impl<'a> From<&Label<'a>> for SampleLabel<'a> {
    fn from(label: &Label<'a>) -> Self {
        Self {
            key: label.key,
            value: label.value,
        }
    }
}

pub fn render(config_path: &Path, format: &str, overrides: &[(String, f32)]) -> anyhow::Result<()> {
    let config = push::load(config_path)?;
    // Never connected; only the registry and readings are used.
    let mut client = push::build_client(TcpTransport::new(), config, overrides)?;
    client.refresh();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&samples(&client))?),
        "text" => {
            let mut body = String::new();
            client.render_body(&mut body)?;
            print!("{body}");
            eprintln!(
                "# {} bytes, {} metrics",
                client.content_length(),
                client.registry().len()
            );
        }
        other => bail!("unknown format {other:?} (expected text or json)"),
    }
    Ok(())
}

/// One entry per metric with the common labels merged in front.
fn samples<T: Transport>(client: &ConfiguredClient<T>) -> Vec<Sample<'static>> {
    client
        .registry()
        .iter()
        .map(|metric| Sample {
            name: metric.name(),
            help: metric.help(),
            kind: metric.kind(),
            labels: client
                .common_labels()
                .iter()
                .chain(metric.labels())
                .map(SampleLabel::from)
                .collect(),
            value: metric.value(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PushConfig;

    #[test]
    fn samples_merge_common_labels_first() {
        let config: PushConfig = toml::from_str(
            r#"
[gateway]
host = "localhost"
job = "demo"

[[common_label]]
key = "room"
value = "Kitchen"

[[metric]]
name = "board_info"
value = 1.0
labels = [{ key = "build", value = "dev" }]
"#,
        )
        .unwrap();
        let config: &'static PushConfig = Box::leak(Box::new(config));
        let mut client = push::build_client(TcpTransport::new(), config, &[]).unwrap();
        client.refresh();

        let json = serde_json::to_value(samples(&client)).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "name": "board_info",
                "help": "",
                "kind": "gauge",
                "labels": [
                    { "key": "room", "value": "Kitchen" },
                    { "key": "build", "value": "dev" }
                ],
                "value": 1.0
            }])
        );
    }
}
