//! Collector configuration.
//!
//! The class path is handed to the engine as a plain value; nothing is read
//! from process-wide state at collection time.

use crate::collector::class_path::{ClassPath, ClassSpec};
use crate::collector::error::CollectError;
use crate::collector::session::DEFAULT_LOCALE;
use crate::metrics::MetricKind;

/// Prefix of every exported metric name.
pub const DEFAULT_NAMESPACE: &str = "wmi";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    /// `namespace:Class;namespace:Class;...`
    pub class_path: String,
    /// Root namespace prepended to metric names on exposition.
    pub namespace: String,
    pub kind: MetricKind,
    /// Locale used when opening sessions.
    pub locale: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            class_path: String::new(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            kind: MetricKind::default(),
            locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

impl CollectorConfig {
    pub fn new(class_path: impl Into<String>) -> Self {
        Self {
            class_path: class_path.into(),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: MetricKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Parses the class path up front, so misconfiguration is caught before
    /// the first cycle.
    pub fn class_specs(&self) -> Result<Vec<ClassSpec>, CollectError> {
        ClassPath::parse(&self.class_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CollectorConfig::new(r"root\cimv2:Win32_Process");
        assert_eq!(config.namespace, "wmi");
        assert_eq!(config.locale, "MS_409");
        assert_eq!(config.kind, MetricKind::Counter);
        assert_eq!(config.class_specs().unwrap().len(), 1);
    }

    #[test]
    fn test_builders() {
        let config = CollectorConfig::new("")
            .with_kind(MetricKind::Gauge)
            .with_namespace("windows")
            .with_locale("MS_407");
        assert_eq!(config.kind, MetricKind::Gauge);
        assert_eq!(config.namespace, "windows");
        assert_eq!(config.locale, "MS_407");
        assert!(config.class_specs().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_class_path_is_reported() {
        let config = CollectorConfig::new(r"root\cimv2:Win32_Process;root\cimv2");
        assert!(matches!(
            config.class_specs(),
            Err(CollectError::Configuration { .. })
        ));
    }
}
