//! Raw labeled telemetry series.

use std::collections::BTreeMap;

/// One timestamped observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Opaque timestamp key. Only equality matters; ordering is never assumed.
    pub timestamp: String,
    /// Observed value.
    pub value: f64,
}

impl Sample {
    /// Create a sample from a timestamp key and a value.
    pub fn new(timestamp: impl Into<String>, value: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            value,
        }
    }
}

/// A labeled sequence of samples for one monitored resource.
///
/// Labels live in two namespaces (metric and resource). Samples keep their
/// input order; timestamps may differ from series to series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    metric_labels: BTreeMap<String, String>,
    resource_labels: BTreeMap<String, String>,
    samples: Vec<Sample>,
}

impl Series {
    /// Create a series from its label maps and samples.
    ///
    /// No validation happens here; [`MatrixBuilder`](crate::MatrixBuilder)
    /// rejects empty or non-finite series when the matrix is built.
    pub fn new(
        metric_labels: BTreeMap<String, String>,
        resource_labels: BTreeMap<String, String>,
        samples: Vec<Sample>,
    ) -> Self {
        Self {
            metric_labels,
            resource_labels,
            samples,
        }
    }

    /// Return the metric-namespace labels.
    #[must_use]
    pub fn metric_labels(&self) -> &BTreeMap<String, String> {
        &self.metric_labels
    }

    /// Return the resource-namespace labels.
    #[must_use]
    pub fn resource_labels(&self) -> &BTreeMap<String, String> {
        &self.resource_labels
    }

    /// Return the samples in input order.
    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Iterate over `(key, value)` label pairs, metric namespace first.
    pub fn labels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.metric_labels
            .iter()
            .chain(self.resource_labels.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over the label values this series carries, optionally only those
    /// stored under `key`.
    pub(crate) fn label_values<'a>(
        &'a self,
        key: Option<&'a str>,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.labels()
            .filter(move |(k, _)| key.is_none_or(|wanted| wanted == *k))
            .map(|(_, v)| v)
    }
}
