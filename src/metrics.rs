//! Metric records and the sink they are pushed into.
//!
//! The emitter only names and labels samples. Rendering them in a wire
//! format is left to whoever drains the sink (see [`crate::exposition`]).

use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::collector::error::CollectError;

/// Label carrying the instance identity on every record.
pub const INSTANCE_LABEL: &str = "wmiinstance";

/// How a record is presented to the metrics registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonic counter. Applied regardless of what the property measures.
    #[default]
    Counter,
    /// Unrestricted value.
    Gauge,
}

impl std::str::FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "counter" => Ok(MetricKind::Counter),
            "gauge" => Ok(MetricKind::Gauge),
            other => Err(format!("unknown metric kind '{}' (expected counter or gauge)", other)),
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Counter => f.write_str("counter"),
            MetricKind::Gauge => f.write_str("gauge"),
        }
    }
}

/// One sample for one property of one instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// `lower(class)_lower(property)`, without the root namespace.
    pub name: String,
    /// Property name as reported by the backend.
    pub help: String,
    /// Value of the `wmiinstance` label.
    pub label_value: String,
    pub value: f64,
    pub kind: MetricKind,
}

impl MetricRecord {
    /// Fully qualified name, `<namespace>_<name>`.
    pub fn fq_name(&self, namespace: &str) -> String {
        if namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}_{}", namespace, self.name)
        }
    }
}

/// Builds the record name for a class property.
pub fn metric_name(class_name: &str, property_name: &str) -> String {
    format!(
        "{}_{}",
        class_name.to_lowercase(),
        property_name.to_lowercase()
    )
}

/// Destination of emitted records.
pub trait MetricSink {
    fn push(&mut self, record: MetricRecord) -> Result<(), CollectError>;
}

impl<S: MetricSink + ?Sized> MetricSink for &mut S {
    fn push(&mut self, record: MetricRecord) -> Result<(), CollectError> {
        MetricSink::push(&mut **self, record)
    }
}

impl MetricSink for Vec<MetricRecord> {
    fn push(&mut self, record: MetricRecord) -> Result<(), CollectError> {
        Vec::push(self, record);
        Ok(())
    }
}

impl MetricSink for Sender<MetricRecord> {
    fn push(&mut self, record: MetricRecord) -> Result<(), CollectError> {
        self.send(record).map_err(|_| CollectError::SinkClosed)
    }
}

/// Turns coerced property values into records and pushes them to a sink.
pub struct MetricEmitter<S: MetricSink> {
    sink: S,
    kind: MetricKind,
}

impl<S: MetricSink> MetricEmitter<S> {
    pub fn new(sink: S, kind: MetricKind) -> Self {
        Self { sink, kind }
    }

    pub fn emit(
        &mut self,
        class_name: &str,
        property_name: &str,
        instance: &str,
        value: f64,
    ) -> Result<(), CollectError> {
        let record = MetricRecord {
            name: metric_name(class_name, property_name),
            help: property_name.to_string(),
            label_value: instance.to_string(),
            value,
            kind: self.kind,
        };
        trace!("{}{{{}=\"{}\"}} {}", record.name, INSTANCE_LABEL, instance, value);
        self.sink.push(record)
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
