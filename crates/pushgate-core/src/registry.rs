//! Fixed-capacity metric registry.
//!
//! Metrics are appended during setup and emitted in insertion order.
//! Names are not deduplicated: two metrics with the same name are both
//! kept and both pushed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CapacityExceeded;
use crate::labels::{Label, LabelSet};

/// Prometheus metric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Counter,
    #[default]
    Gauge,
}

impl MetricKind {
    /// The `# TYPE` keyword for this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One registered metric and its own labels.
#[derive(Debug, Clone, Copy)]
pub struct Metric<'a, const L: usize> {
    name: &'a str,
    help: &'a str,
    kind: MetricKind,
    value: f32,
    labels: LabelSet<'a, L>,
}

impl<const L: usize> Metric<'static, L> {
    const EMPTY: Self = Metric {
        name: "",
        help: "",
        kind: MetricKind::Gauge,
        value: 0.0,
        labels: LabelSet::new(),
    };
}

impl<'a, const L: usize> Metric<'a, L> {
    pub fn new(name: &'a str, help: &'a str, labels: LabelSet<'a, L>, kind: MetricKind) -> Self {
        Self {
            name,
            help,
            kind,
            value: 0.0,
            labels,
        }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn help(&self) -> &'a str {
        self.help
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn set_value(&mut self, value: f32) {
        self.value = value;
    }

    pub fn labels(&self) -> &LabelSet<'a, L> {
        &self.labels
    }
}

/// Ordered, fixed-capacity collection of up to `M` metrics, each carrying
/// up to `L` labels of its own.
#[derive(Debug, Clone)]
pub struct Registry<'a, const M: usize, const L: usize> {
    metrics: [Metric<'a, L>; M],
    len: usize,
}

impl<'a, const M: usize, const L: usize> Registry<'a, M, L> {
    pub const fn new() -> Self {
        Self {
            metrics: [Metric::EMPTY; M],
            len: 0,
        }
    }

    /// Append a metric with an initial value of `0.0`.
    ///
    /// Fails without touching the registry once `M` metrics are registered.
    pub fn add_metric(
        &mut self,
        name: &'a str,
        help: &'a str,
        labels: LabelSet<'a, L>,
        kind: MetricKind,
    ) -> Result<(), CapacityExceeded> {
        if self.len >= M {
            return Err(CapacityExceeded {
                what: "metric registry",
                capacity: M,
            });
        }
        self.metrics[self.len] = Metric::new(name, help, labels, kind);
        self.len += 1;
        Ok(())
    }

    /// Append a metric that carries no labels of its own.
    pub fn add_unlabelled(
        &mut self,
        name: &'a str,
        help: &'a str,
        kind: MetricKind,
    ) -> Result<(), CapacityExceeded> {
        self.add_metric(name, help, LabelSet::new(), kind)
    }

    /// Overwrite every value from `f(name, labels)`, in registry order.
    pub fn refresh_values<F>(&mut self, mut f: F)
    where
        F: FnMut(&str, &[Label<'a>]) -> f32,
    {
        for metric in &mut self.metrics[..self.len] {
            metric.value = f(metric.name, metric.labels.as_slice());
        }
    }

    pub fn get(&self, index: usize) -> Option<&Metric<'a, L>> {
        self.as_slice().get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Metric<'a, L>> {
        self.metrics[..self.len].get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len >= M
    }

    pub const fn capacity(&self) -> usize {
        M
    }

    /// Registered metrics in emission order.
    pub fn as_slice(&self) -> &[Metric<'a, L>] {
        &self.metrics[..self.len]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Metric<'a, L>> {
        self.as_slice().iter()
    }
}

impl<const M: usize, const L: usize> Default for Registry<'_, M, L> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_metric_starts_at_zero() {
        let mut reg = Registry::<2, 1>::new();
        reg.add_unlabelled("temperature", "Temperature in Celsius", MetricKind::Gauge)
            .unwrap();

        let m = reg.get(0).unwrap();
        assert_eq!(m.name(), "temperature");
        assert_eq!(m.help(), "Temperature in Celsius");
        assert_eq!(m.kind(), MetricKind::Gauge);
        assert_eq!(m.value(), 0.0);
        assert!(m.labels().is_empty());
    }

    #[test]
    fn full_registry_refuses_and_stays_unchanged() {
        let mut reg = Registry::<2, 0>::new();
        reg.add_unlabelled("a", "", MetricKind::Counter).unwrap();
        reg.add_unlabelled("b", "", MetricKind::Counter).unwrap();
        assert!(reg.is_full());

        let err = reg.add_unlabelled("c", "", MetricKind::Counter).unwrap_err();
        assert_eq!(err.capacity, 2);
        assert_eq!(reg.len(), 2);
        let names: Vec<_> = reg.iter().map(|m| m.name()).collect();
        assert_eq!(names, ["a", "b"]);

        // Still full on every later attempt.
        assert!(reg.add_unlabelled("d", "", MetricKind::Gauge).is_err());
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn zero_capacity_registry_is_always_full() {
        let mut reg = Registry::<0, 0>::new();
        assert!(reg.is_full());
        assert!(reg.add_unlabelled("a", "", MetricKind::Gauge).is_err());
        assert!(reg.is_empty());
    }

    #[test]
    fn duplicate_names_are_kept() {
        let mut reg = Registry::<3, 0>::new();
        reg.add_unlabelled("up", "", MetricKind::Gauge).unwrap();
        reg.add_unlabelled("up", "", MetricKind::Gauge).unwrap();
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn refresh_values_runs_in_registry_order() {
        let mut reg = Registry::<3, 1>::new();
        reg.add_metric(
            "board_info",
            "",
            LabelSet::from_pairs(&[("build", "dev")]).unwrap(),
            MetricKind::Gauge,
        )
        .unwrap();
        reg.add_unlabelled("vcc", "", MetricKind::Gauge).unwrap();

        let mut calls = Vec::new();
        reg.refresh_values(|name, labels| {
            calls.push((name.to_string(), labels.len()));
            if name == "vcc" { 3.3 } else { 1.0 }
        });

        assert_eq!(calls, [("board_info".to_string(), 1), ("vcc".to_string(), 0)]);
        assert_eq!(reg.get(0).unwrap().value(), 1.0);
        assert_eq!(reg.get(1).unwrap().value(), 3.3);
    }

    #[test]
    fn get_mut_only_reaches_registered_metrics() {
        let mut reg = Registry::<4, 0>::new();
        reg.add_unlabelled("a", "", MetricKind::Gauge).unwrap();
        reg.get_mut(0).unwrap().set_value(7.0);
        assert_eq!(reg.get(0).unwrap().value(), 7.0);
        assert!(reg.get_mut(1).is_none());
    }

    #[test]
    fn kind_defaults_to_gauge() {
        assert_eq!(MetricKind::default(), MetricKind::Gauge);
        assert_eq!(MetricKind::Counter.to_string(), "counter");
    }

    #[test]
    fn kind_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            kind: MetricKind,
        }
        let w: Wrapper = toml::from_str(r#"kind = "counter""#).unwrap();
        assert_eq!(w.kind, MetricKind::Counter);
    }
}
