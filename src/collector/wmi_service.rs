//! Automation backend for the local WMI service.
//!
//! Built on the `wmi` crate's native enumerator, which advances the
//! underlying `IEnumWbemClassObject` one object per step. COM objects are
//! released when their wrappers drop.
//!
//! The `wmi` crate connects with the system default locale; the locale
//! passed to [`Automation::connect`] is only logged.

use std::vec;

use tracing::trace;
use wmi::result_enumerator::{IWbemClassObjectWrapper, QueryResultEnumerator};
use wmi::{COMLibrary, WMIConnection, WMIError};

use crate::collector::error::AutomationError;
use crate::collector::traits::{Automation, InstanceCursor, ManagedObject, PropertyCursor, Session};
use crate::collector::variant::Variant;

const RELPATH_PROPERTY: &str = "__RELPATH";

impl From<WMIError> for AutomationError {
    fn from(e: WMIError) -> Self {
        let code = match &e {
            WMIError::HResultError { hres } => Some(*hres),
            _ => None,
        };
        AutomationError {
            message: e.to_string(),
            code,
        }
    }
}

/// WMI backend bound to the COM apartment of the calling thread.
///
/// Must be created and used on the same thread.
#[derive(Clone, Copy)]
pub struct WmiAutomation {
    com: COMLibrary,
}

impl WmiAutomation {
    /// Initializes COM for the current thread.
    pub fn new() -> Result<Self, AutomationError> {
        Ok(Self {
            com: COMLibrary::new()?,
        })
    }
}

impl Automation for WmiAutomation {
    type Session = WmiSession;

    fn connect(&self, namespace: &str, locale: &str) -> Result<WmiSession, AutomationError> {
        trace!("ConnectServer {} (requested locale {})", namespace, locale);
        let connection = WMIConnection::with_namespace_path(namespace, self.com)?;
        Ok(WmiSession { connection })
    }
}

/// Connection to one WMI namespace.
pub struct WmiSession {
    connection: WMIConnection,
}

impl Session for WmiSession {
    type Instances<'a> = WmiInstances<'a>;

    fn exec_query(&self, query: &str) -> Result<WmiInstances<'_>, AutomationError> {
        let inner = self.connection.exec_query_native_wrapper(query)?;
        Ok(WmiInstances { inner })
    }
}

/// Single-step cursor over a WMI query result.
pub struct WmiInstances<'a> {
    inner: QueryResultEnumerator<'a>,
}

impl InstanceCursor for WmiInstances<'_> {
    type Object = IWbemClassObjectWrapper;

    fn next_instance(&mut self) -> Result<Option<IWbemClassObjectWrapper>, AutomationError> {
        self.inner.next().transpose().map_err(AutomationError::from)
    }
}

impl ManagedObject for IWbemClassObjectWrapper {
    type Properties<'a> = WmiProperties;

    fn relative_path(&self) -> Result<String, AutomationError> {
        match self.get_property(RELPATH_PROPERTY)? {
            wmi::Variant::String(path) => Ok(path),
            other => Err(AutomationError::new(format!(
                "{} has unexpected type: {:?}",
                RELPATH_PROPERTY, other
            ))),
        }
    }

    fn properties(&self) -> Result<WmiProperties, AutomationError> {
        let names = self.list_properties()?;
        Ok(WmiProperties {
            names: names.into_iter(),
        })
    }

    fn get(&self, name: &str) -> Result<Variant, AutomationError> {
        Ok(convert(self.get_property(name)?))
    }
}

/// Property names of one object.
///
/// `IWbemClassObject::GetNames` hands out the whole name array at once;
/// the cursor steps through it one name at a time.
pub struct WmiProperties {
    names: vec::IntoIter<String>,
}

impl PropertyCursor for WmiProperties {
    fn next_name(&mut self) -> Result<Option<String>, AutomationError> {
        Ok(self.names.next())
    }
}

fn convert(value: wmi::Variant) -> Variant {
    match value {
        wmi::Variant::Empty => Variant::Empty,
        wmi::Variant::Null => Variant::Null,
        wmi::Variant::String(s) => Variant::String(s),
        wmi::Variant::I1(v) => Variant::I1(v),
        wmi::Variant::I2(v) => Variant::I2(v),
        wmi::Variant::I4(v) => Variant::I4(v),
        wmi::Variant::I8(v) => Variant::I8(v),
        wmi::Variant::R4(v) => Variant::R4(v),
        wmi::Variant::R8(v) => Variant::R8(v),
        wmi::Variant::Bool(v) => Variant::Bool(v),
        wmi::Variant::UI1(v) => Variant::UI1(v),
        wmi::Variant::UI2(v) => Variant::UI2(v),
        wmi::Variant::UI4(v) => Variant::UI4(v),
        wmi::Variant::UI8(v) => Variant::UI8(v),
        wmi::Variant::Array(items) => Variant::Array(items.into_iter().map(convert).collect()),
        wmi::Variant::Object(object) => Variant::Object(object.class().unwrap_or_default()),
        wmi::Variant::Unknown(_) => Variant::Unknown(VT_UNKNOWN),
    }
}

const VT_UNKNOWN: u16 = 13;
