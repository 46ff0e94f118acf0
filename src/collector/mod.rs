//! Dynamic class collector for the WMI automation interface.
//!
//! Queries arbitrary classes named at configuration time, discovers each
//! instance's properties at runtime and turns the numeric ones into metric
//! records.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      ClassQueryEngine                        │
//! │  class path ──► ClassSpec ──► SessionManager (per spec)      │
//! │                                    │                         │
//! │                          SELECT * FROM <class>               │
//! │                                    │                         │
//! │                             InstanceWalk                     │
//! │                                    │                         │
//! │                             PropertyWalk ──► coerce          │
//! │                                    │                         │
//! │                             MetricEmitter ──► sink           │
//! └────────────────────────────────────┼─────────────────────────┘
//!                                      │
//!                          ┌───────────▼───────────┐
//!                          │  Automation (trait)   │
//!                          └───────────┬───────────┘
//!                     ┌────────────────┴───────────────┐
//!              ┌──────▼───────┐                 ┌──────▼───────┐
//!              │ WmiAutomation│                 │MockAutomation│
//!              │  (Windows)   │                 │  (Testing)   │
//!              └──────────────┘                 └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use wmi_collector::collector::{ClassQueryEngine, MockAutomation};
//! use wmi_collector::config::CollectorConfig;
//! use wmi_collector::metrics::MetricKind;
//!
//! let config = CollectorConfig::new(r"root\cimv2:Win32_Process");
//! let engine = ClassQueryEngine::new(MockAutomation::typical_host(), &config);
//!
//! let mut records = Vec::new();
//! let stats = engine.collect(&mut records).unwrap();
//! assert_eq!(stats.instances, 3);
//! assert!(records.iter().any(|r| r.name == "win32_process_threadcount"));
//! assert!(records.iter().all(|r| r.kind == MetricKind::Counter));
//! ```

pub mod class_path;
pub mod engine;
pub mod error;
pub mod instances;
pub mod mock;
pub mod properties;
pub mod session;
pub mod traits;
pub mod variant;
#[cfg(windows)]
pub mod wmi_service;

pub use class_path::{ClassPath, ClassSpec};
pub use engine::{ClassDescription, ClassQueryEngine, CycleStats};
pub use error::{AutomationError, CollectError};
pub use instances::{InstanceWalk, ManagedObjectInstance, instance_identity};
pub use mock::MockAutomation;
pub use properties::{PropertyWalk, RawProperty};
pub use session::{DEFAULT_LOCALE, SessionManager};
pub use traits::{Automation, InstanceCursor, ManagedObject, PropertyCursor, Session};
pub use variant::{TypeTag, Variant, coerce};
#[cfg(windows)]
pub use wmi_service::WmiAutomation;
