//! Rendering of collected records for the metrics registry.
//!
//! Records are grouped into one family per metric name, in the order the
//! names first appear. Two gauges report the outcome of the cycle itself:
//!
//! - `<namespace>_collector_success{collector="custom"}` (1 or 0)
//! - `<namespace>_collector_duration_seconds{collector="custom"}`
//!
//! A record whose name collides with one of these is dropped.

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use prometheus::proto::{self, MetricFamily, MetricType};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::metrics::{INSTANCE_LABEL, MetricKind, MetricRecord};

/// Value of the `collector` label on the status gauges.
pub const COLLECTOR_NAME: &str = "custom";

/// Result of one cycle as handed to the renderer.
#[derive(Debug, Clone)]
pub struct Scrape {
    pub records: Vec<MetricRecord>,
    pub success: bool,
    pub duration: Duration,
}

/// Output format of the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Prometheus text exposition format.
    #[default]
    Text,
    /// One JSON object per record.
    Json,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "prometheus" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            other => Err(format!("unknown format '{}' (expected text or json)", other)),
        }
    }
}

/// Error while rendering a scrape.
#[derive(Debug)]
pub enum RenderError {
    Encode(prometheus::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Encode(e) => write!(f, "text encoding failed: {}", e),
            RenderError::Json(e) => write!(f, "JSON encoding failed: {}", e),
        }
    }
}

impl std::error::Error for RenderError {}

/// Builds metric families from a scrape.
pub fn families(scrape: &Scrape, namespace: &str) -> Vec<MetricFamily> {
    let prefix = if namespace.is_empty() {
        "collector".to_string()
    } else {
        format!("{}_collector", namespace)
    };
    let success_name = format!("{}_success", prefix);
    let duration_name = format!("{}_duration_seconds", prefix);

    let mut families: Vec<MetricFamily> = Vec::new();

    for record in &scrape.records {
        let name = record.fq_name(namespace);
        if name == success_name || name == duration_name {
            warn!(
                "Dropping {}{{{}=\"{}\"}}: name is reserved for the collector status",
                name, INSTANCE_LABEL, record.label_value
            );
            continue;
        }
        let position = match families.iter().position(|f| f.get_name() == name) {
            Some(position) => position,
            None => {
                families.push(family(name, &record.help, record.kind));
                families.len() - 1
            }
        };
        let metric = sample(INSTANCE_LABEL, &record.label_value, record.value, record.kind);
        families[position].mut_metric().push(metric);
    }

    let mut success = family(
        success_name,
        "Whether the collector succeeded.",
        MetricKind::Gauge,
    );
    let value = if scrape.success { 1.0 } else { 0.0 };
    success
        .mut_metric()
        .push(sample("collector", COLLECTOR_NAME, value, MetricKind::Gauge));
    families.push(success);

    let mut duration = family(
        duration_name,
        "Duration of the collection cycle.",
        MetricKind::Gauge,
    );
    duration.mut_metric().push(sample(
        "collector",
        COLLECTOR_NAME,
        scrape.duration.as_secs_f64(),
        MetricKind::Gauge,
    ));
    families.push(duration);

    families
}

fn family(name: String, help: &str, kind: MetricKind) -> MetricFamily {
    let mut family = MetricFamily::default();
    family.set_name(name);
    family.set_help(help.to_string());
    family.set_field_type(match kind {
        MetricKind::Counter => MetricType::COUNTER,
        MetricKind::Gauge => MetricType::GAUGE,
    });
    family
}

fn sample(label: &str, label_value: &str, value: f64, kind: MetricKind) -> proto::Metric {
    let mut pair = proto::LabelPair::default();
    pair.set_name(label.to_string());
    pair.set_value(label_value.to_string());

    let mut metric = proto::Metric::default();
    metric.mut_label().push(pair);
    match kind {
        MetricKind::Counter => {
            let mut counter = proto::Counter::default();
            counter.set_value(value);
            metric.set_counter(counter);
        }
        MetricKind::Gauge => {
            let mut gauge = proto::Gauge::default();
            gauge.set_value(value);
            metric.set_gauge(gauge);
        }
    }
    metric
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    name: String,
    help: &'a str,
    labels: JsonLabels<'a>,
    value: f64,
    kind: MetricKind,
    collected_at: i64,
}

#[derive(Serialize)]
struct JsonLabels<'a> {
    wmiinstance: &'a str,
}

/// Renders a scrape in the requested format.
pub fn render(scrape: &Scrape, namespace: &str, format: Format) -> Result<Vec<u8>, RenderError> {
    match format {
        Format::Text => {
            let mut buffer = Vec::new();
            TextEncoder::new()
                .encode(&families(scrape, namespace), &mut buffer)
                .map_err(RenderError::Encode)?;
            Ok(buffer)
        }
        Format::Json => {
            let collected_at = Utc::now().timestamp();
            let mut buffer = Vec::new();
            for record in &scrape.records {
                let line = JsonRecord {
                    name: record.fq_name(namespace),
                    help: &record.help,
                    labels: JsonLabels {
                        wmiinstance: &record.label_value,
                    },
                    value: record.value,
                    kind: record.kind,
                    collected_at,
                };
                serde_json::to_writer(&mut buffer, &line).map_err(RenderError::Json)?;
                buffer.push(b'\n');
            }
            Ok(buffer)
        }
    }
}

/// Writes a rendered scrape to `target`.
///
/// `-` means stdout. Files are replaced atomically: the output is written to
/// a temporary file in the same directory and renamed over the target, so a
/// reader never sees a partial scrape.
pub fn write_output(target: &str, rendered: &[u8]) -> io::Result<()> {
    if target == "-" {
        let mut stdout = io::stdout().lock();
        stdout.write_all(rendered)?;
        return stdout.flush();
    }

    let path = Path::new(target);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(rendered)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::metric_name;

    fn record(class: &str, property: &str, instance: &str, value: f64, kind: MetricKind) -> MetricRecord {
        MetricRecord {
            name: metric_name(class, property),
            help: property.to_string(),
            label_value: instance.to_string(),
            value,
            kind,
        }
    }

    fn scrape(records: Vec<MetricRecord>, success: bool) -> Scrape {
        Scrape {
            records,
            success,
            duration: Duration::from_millis(250),
        }
    }

    #[test]
    fn test_families_group_by_name_in_first_seen_order() {
        let s = scrape(
            vec![
                record("Win32_Process", "ThreadCount", "4", 254.0, MetricKind::Counter),
                record("Win32_Process", "WorkingSetSize", "4", 1024.0, MetricKind::Counter),
                record("Win32_Process", "ThreadCount", "1234", 17.0, MetricKind::Counter),
            ],
            true,
        );

        let families = families(&s, "wmi");
        let names: Vec<&str> = families.iter().map(|f| f.get_name()).collect();
        assert_eq!(
            names,
            [
                "wmi_win32_process_threadcount",
                "wmi_win32_process_workingsetsize",
                "wmi_collector_success",
                "wmi_collector_duration_seconds",
            ]
        );
        assert_eq!(families[0].get_metric().len(), 2);
        assert_eq!(families[0].get_help(), "ThreadCount");
        assert_eq!(families[0].get_field_type(), MetricType::COUNTER);
    }

    #[test]
    fn test_text_rendering() {
        let s = scrape(
            vec![
                record("Win32_Service", "Started", "Dnscache", 1.0, MetricKind::Gauge),
                record("Win32_Service", "Started", "Spooler", 0.0, MetricKind::Gauge),
            ],
            true,
        );
        let text = String::from_utf8(render(&s, "wmi", Format::Text).unwrap()).unwrap();

        assert!(text.contains("# HELP wmi_win32_service_started Started\n"));
        assert!(text.contains("# TYPE wmi_win32_service_started gauge\n"));
        assert!(text.contains("wmi_win32_service_started{wmiinstance=\"Dnscache\"} 1\n"));
        assert!(text.contains("wmi_win32_service_started{wmiinstance=\"Spooler\"} 0\n"));
        assert!(text.contains("wmi_collector_success{collector=\"custom\"} 1\n"));
        assert!(text.contains("wmi_collector_duration_seconds{collector=\"custom\"} 0.25\n"));
    }

    #[test]
    fn test_failed_scrape_still_renders_records() {
        let s = scrape(
            vec![record("Win32_Process", "ThreadCount", "4", 254.0, MetricKind::Counter)],
            false,
        );
        let text = String::from_utf8(render(&s, "wmi", Format::Text).unwrap()).unwrap();
        assert!(text.contains("# TYPE wmi_win32_process_threadcount counter\n"));
        assert!(text.contains("wmi_win32_process_threadcount{wmiinstance=\"4\"} 254\n"));
        assert!(text.contains("wmi_collector_success{collector=\"custom\"} 0\n"));
    }

    #[test]
    fn test_json_rendering() {
        let s = scrape(
            vec![record("Win32_Process", "ThreadCount", "4", 254.0, MetricKind::Counter)],
            true,
        );
        let out = String::from_utf8(render(&s, "wmi", Format::Json).unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 1);

        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["name"], "wmi_win32_process_threadcount");
        assert_eq!(value["labels"]["wmiinstance"], "4");
        assert_eq!(value["value"], 254.0);
        assert_eq!(value["kind"], "counter");
        assert!(value["collected_at"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_status_gauge_names_are_not_duplicated() {
        let s = scrape(
            vec![
                record("Collector", "Success", "a", 5.0, MetricKind::Counter),
                record("Collector", "Duration_Seconds", "a", 7.0, MetricKind::Counter),
                record("Collector", "Runs", "a", 3.0, MetricKind::Counter),
            ],
            true,
        );

        let families = families(&s, "wmi");
        let names: Vec<&str> = families.iter().map(|f| f.get_name()).collect();
        assert_eq!(
            names,
            [
                "wmi_collector_runs",
                "wmi_collector_success",
                "wmi_collector_duration_seconds",
            ]
        );
        assert_eq!(families[1].get_metric().len(), 1);
        assert_eq!(families[1].get_metric()[0].get_gauge().get_value(), 1.0);

        let text = String::from_utf8(render(&s, "wmi", Format::Text).unwrap()).unwrap();
        assert_eq!(text.matches("# TYPE wmi_collector_success ").count(), 1);
        assert!(!text.contains("wmiinstance=\"a\"} 5"));
    }

    #[test]
    fn test_write_output_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("custom.prom");
        let target = target.to_str().unwrap();

        write_output(target, b"first\n").unwrap();
        write_output(target, b"second\n").unwrap();

        assert_eq!(std::fs::read_to_string(target).unwrap(), "second\n");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_write_output_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing").join("custom.prom");
        assert!(write_output(target.to_str().unwrap(), b"x").is_err());
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("text".parse::<Format>(), Ok(Format::Text));
        assert_eq!("JSON".parse::<Format>(), Ok(Format::Json));
        assert!("xml".parse::<Format>().is_err());
    }
}
