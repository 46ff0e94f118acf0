//! Abstractions over the managed-object automation interface.
//!
//! The collector only talks to these traits, which lets it run against the
//! real WMI service on Windows and against [`MockAutomation`] everywhere
//! else.
//!
//! Every handle owns the backend resources behind it and releases them when
//! dropped. Callers never close anything explicitly; a handle going out of
//! scope on an early `?` return is released exactly like one that finished
//! normally.
//!
//! [`MockAutomation`]: crate::collector::mock::MockAutomation

use crate::collector::error::AutomationError;
use crate::collector::variant::Variant;

/// Entry point of a backend: opens sessions bound to one namespace.
pub trait Automation {
    type Session: Session;

    /// Opens a session against `namespace` using the given locale
    /// (for example `MS_409`).
    fn connect(&self, namespace: &str, locale: &str) -> Result<Self::Session, AutomationError>;
}

/// A connection to one namespace.
pub trait Session {
    type Instances<'a>: InstanceCursor
    where
        Self: 'a;

    /// Executes a query and returns a forward-only cursor over its result.
    fn exec_query(&self, query: &str) -> Result<Self::Instances<'_>, AutomationError>;
}

/// Forward-only, single-step cursor over the instances of a query result.
pub trait InstanceCursor {
    type Object: ManagedObject;

    /// Advances by one element. `Ok(None)` marks the end of the set.
    fn next_instance(&mut self) -> Result<Option<Self::Object>, AutomationError>;
}

/// One instance of a managed-object class.
pub trait ManagedObject {
    type Properties<'a>: PropertyCursor
    where
        Self: 'a;

    /// Relative object path, e.g. `Win32_Process.Handle="1234"`.
    fn relative_path(&self) -> Result<String, AutomationError>;

    /// Opens a cursor over the names of the instance's properties.
    fn properties(&self) -> Result<Self::Properties<'_>, AutomationError>;

    /// Fetches the current value of one property.
    fn get(&self, name: &str) -> Result<Variant, AutomationError>;
}

/// Forward-only, single-step cursor over property names.
pub trait PropertyCursor {
    /// Advances by one element. `Ok(None)` marks the end of the set.
    fn next_name(&mut self) -> Result<Option<String>, AutomationError>;
}
