//! wmi-collector - custom WMI class metrics for a Prometheus exporter.
//!
//! This library provides:
//! - `collector` - class path parsing, the class query engine and its
//!   automation backends (WMI on Windows, an in-memory mock everywhere)
//! - `metrics` - metric records and the sinks they are pushed into
//! - `exposition` - text and JSON rendering of a collection cycle
//! - `config` - collector configuration
//!
//! The `wmi-collectord` binary drives the engine on an interval.

pub mod collector;
pub mod config;
pub mod exposition;
pub mod metrics;
