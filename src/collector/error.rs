//! Error types for class collection.
//!
//! `AutomationError` is what a backend reports for a single failed call.
//! `CollectError` wraps it with the phase and the object being processed, so a
//! single log line tells the operator where the cycle stopped.

use std::fmt;

/// Failure reported by an automation backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomationError {
    /// Human readable message from the backend.
    pub message: String,
    /// Native status code (HRESULT on Windows), if the backend has one.
    pub code: Option<i32>,
}

impl AutomationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }
}

impl fmt::Display for AutomationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (0x{:08X})", self.message, code as u32),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for AutomationError {}

/// Error that aborts a collection cycle.
///
/// Every variant is fatal for the current cycle: no further classes,
/// instances or properties are processed after it is returned.
#[derive(Debug)]
pub enum CollectError {
    /// Malformed class path entry.
    Configuration { entry: String, reason: String },
    /// Session could not be opened for a namespace.
    Connection {
        namespace: String,
        source: AutomationError,
    },
    /// Class query could not be executed.
    Query {
        namespace: String,
        class: String,
        source: AutomationError,
    },
    /// A cursor step failed, or a cursor could not be obtained.
    Enumeration {
        class: String,
        instance: Option<String>,
        source: AutomationError,
    },
    /// A named value could not be fetched from an instance.
    PropertyFetch {
        class: String,
        instance: Option<String>,
        property: String,
        source: AutomationError,
    },
    /// The output channel has no receiver any more.
    SinkClosed,
}

impl CollectError {
    /// Short description of the failed phase, used as the log prefix.
    pub fn description(&self) -> &'static str {
        match self {
            CollectError::Configuration { .. } => "invalid class path",
            CollectError::Connection { .. } => "connecting to namespace",
            CollectError::Query { .. } => "executing class query",
            CollectError::Enumeration { .. } => "enumerating objects",
            CollectError::PropertyFetch { .. } => "fetching property value",
            CollectError::SinkClosed => "emitting metric",
        }
    }
}

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectError::Configuration { entry, reason } => {
                write!(f, "class path entry '{}': {}", entry, reason)
            }
            CollectError::Connection { namespace, source } => {
                write!(f, "cannot connect to namespace {}: {}", namespace, source)
            }
            CollectError::Query {
                namespace,
                class,
                source,
            } => write!(f, "query for {} in {} failed: {}", class, namespace, source),
            CollectError::Enumeration {
                class,
                instance: Some(instance),
                source,
            } => write!(
                f,
                "enumerating properties of {} instance '{}': {}",
                class, instance, source
            ),
            CollectError::Enumeration {
                class,
                instance: None,
                source,
            } => write!(f, "enumerating instances of {}: {}", class, source),
            CollectError::PropertyFetch {
                class,
                instance,
                property,
                source,
            } => match instance {
                Some(instance) => write!(
                    f,
                    "reading {}.{} of instance '{}': {}",
                    class, property, instance, source
                ),
                None => write!(f, "reading {}.{}: {}", class, property, source),
            },
            CollectError::SinkClosed => write!(f, "metric channel closed"),
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Connection { source, .. }
            | CollectError::Query { source, .. }
            | CollectError::Enumeration { source, .. }
            | CollectError::PropertyFetch { source, .. } => Some(source),
            CollectError::Configuration { .. } | CollectError::SinkClosed => None,
        }
    }
}
