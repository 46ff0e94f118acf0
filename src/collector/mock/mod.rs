//! In-memory automation backend for testing.
//!
//! This module provides `MockAutomation`, a failure-injecting stand-in for
//! the WMI service, and pre-built scenarios for running the collector
//! without Windows.

mod automation;
mod ledger;
mod scenarios;

pub use automation::{MockAutomation, MockInstance, MockInstances, MockObject, MockProperties, MockSession};
pub use ledger::ResourceLedger;
