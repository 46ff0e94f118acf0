//! In-memory automation backend.
//!
//! Namespaces and class names are matched case-insensitively, as the real
//! service does. Every step of the protocol can be made to fail, and all
//! handles report to a shared [`ResourceLedger`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::collector::error::AutomationError;
use crate::collector::mock::ledger::ResourceLedger;
use crate::collector::traits::{Automation, InstanceCursor, ManagedObject, PropertyCursor, Session};
use crate::collector::variant::Variant;

const WBEM_E_INVALID_NAMESPACE: i32 = 0x8004100E_u32 as i32;
const WBEM_E_INVALID_CLASS: i32 = 0x80041010_u32 as i32;
const WBEM_E_INVALID_QUERY: i32 = 0x80041017_u32 as i32;
const WBEM_E_FAILED: i32 = 0x80041001_u32 as i32;

/// A class instance stored in the mock backend.
#[derive(Debug, Clone, Default)]
pub struct MockObject {
    relative_path: String,
    properties: Vec<(String, Variant)>,
    fail_relative_path: bool,
    fail_property_cursor: bool,
    fail_property_step_at: Option<usize>,
    fail_get: HashSet<String>,
}

impl MockObject {
    /// Creates an object with the given relative path and no properties.
    pub fn new(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            ..Self::default()
        }
    }

    /// Appends a property. Properties are enumerated in insertion order.
    pub fn with_property(mut self, name: impl Into<String>, value: Variant) -> Self {
        self.properties.push((name.into(), value));
        self
    }

    /// Makes the relative path lookup fail.
    pub fn fail_relative_path(mut self) -> Self {
        self.fail_relative_path = true;
        self
    }

    /// Makes opening the property cursor fail.
    pub fn fail_property_cursor(mut self) -> Self {
        self.fail_property_cursor = true;
        self
    }

    /// Makes the property cursor fail on the step with the given index.
    pub fn fail_property_step_at(mut self, index: usize) -> Self {
        self.fail_property_step_at = Some(index);
        self
    }

    /// Makes the value lookup of one property fail.
    pub fn fail_get(mut self, name: impl Into<String>) -> Self {
        self.fail_get.insert(name.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
struct MockClass {
    objects: Vec<MockObject>,
    fail_query: bool,
    fail_step_at: Option<usize>,
}

type Namespaces = HashMap<String, HashMap<String, MockClass>>;

/// Failure-injecting in-memory backend.
#[derive(Debug, Clone, Default)]
pub struct MockAutomation {
    namespaces: Arc<Namespaces>,
    unreachable: HashSet<String>,
    ledger: Arc<ResourceLedger>,
}

impl MockAutomation {
    /// Creates a backend without namespaces.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle bookkeeping of this backend.
    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// Declares a class, creating the namespace if needed.
    ///
    /// A declared class without instances answers queries with an empty set.
    pub fn add_class(&mut self, namespace: &str, class: &str) {
        self.class_mut(namespace, class);
    }

    /// Adds an instance to a class, declaring both if needed.
    pub fn add_instance(&mut self, namespace: &str, class: &str, object: MockObject) {
        self.class_mut(namespace, class).objects.push(object);
    }

    /// Makes connecting to `namespace` fail.
    pub fn fail_connect(&mut self, namespace: &str) {
        self.unreachable.insert(namespace.to_lowercase());
    }

    /// Makes the query for `class` fail.
    pub fn fail_query(&mut self, namespace: &str, class: &str) {
        self.class_mut(namespace, class).fail_query = true;
    }

    /// Makes the instance cursor of `class` fail on the step with the given index.
    pub fn fail_instance_step_at(&mut self, namespace: &str, class: &str, index: usize) {
        self.class_mut(namespace, class).fail_step_at = Some(index);
    }

    fn class_mut(&mut self, namespace: &str, class: &str) -> &mut MockClass {
        Arc::make_mut(&mut self.namespaces)
            .entry(namespace.to_lowercase())
            .or_default()
            .entry(class.to_lowercase())
            .or_default()
    }
}

impl Automation for MockAutomation {
    type Session = MockSession;

    fn connect(&self, namespace: &str, locale: &str) -> Result<MockSession, AutomationError> {
        self.ledger.record(format!("connect {} {}", namespace, locale));

        let key = namespace.to_lowercase();
        if self.unreachable.contains(&key) {
            return Err(AutomationError::new("RPC server is unavailable").with_code(0x800706BA_u32 as i32));
        }
        if !self.namespaces.contains_key(&key) {
            return Err(AutomationError::new("Invalid namespace").with_code(WBEM_E_INVALID_NAMESPACE));
        }

        self.ledger.session_opened();
        Ok(MockSession {
            namespaces: Arc::clone(&self.namespaces),
            namespace: key,
            ledger: Arc::clone(&self.ledger),
        })
    }
}

/// Open session against one mock namespace.
#[derive(Debug)]
pub struct MockSession {
    namespaces: Arc<Namespaces>,
    namespace: String,
    ledger: Arc<ResourceLedger>,
}

impl Session for MockSession {
    type Instances<'a> = MockInstances<'a>;

    fn exec_query(&self, query: &str) -> Result<MockInstances<'_>, AutomationError> {
        self.ledger.record(format!("query {}", query));

        let class_name = parse_select_all(query)
            .ok_or_else(|| AutomationError::new("Invalid query").with_code(WBEM_E_INVALID_QUERY))?;

        let class = self
            .namespaces
            .get(&self.namespace)
            .and_then(|classes| classes.get(&class_name.to_lowercase()))
            .ok_or_else(|| AutomationError::new("Invalid class").with_code(WBEM_E_INVALID_CLASS))?;

        if class.fail_query {
            return Err(AutomationError::new("Generic failure").with_code(WBEM_E_FAILED));
        }

        self.ledger.cursor_opened();
        Ok(MockInstances {
            class,
            position: 0,
            ledger: Arc::clone(&self.ledger),
        })
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.ledger.session_closed();
    }
}

/// Extracts the class name from `SELECT * FROM <class>`.
fn parse_select_all(query: &str) -> Option<&str> {
    let mut words = query.split_whitespace();
    let select = words.next()?;
    let star = words.next()?;
    let from = words.next()?;
    let class = words.next()?;
    let valid = select.eq_ignore_ascii_case("select")
        && star == "*"
        && from.eq_ignore_ascii_case("from")
        && words.next().is_none();
    valid.then_some(class)
}

/// Instance cursor over a mock query result.
#[derive(Debug)]
pub struct MockInstances<'a> {
    class: &'a MockClass,
    position: usize,
    ledger: Arc<ResourceLedger>,
}

impl InstanceCursor for MockInstances<'_> {
    type Object = MockInstance;

    fn next_instance(&mut self) -> Result<Option<MockInstance>, AutomationError> {
        if self.class.fail_step_at == Some(self.position) {
            return Err(AutomationError::new("Enumeration step failed").with_code(WBEM_E_FAILED));
        }
        let Some(object) = self.class.objects.get(self.position) else {
            return Ok(None);
        };
        self.position += 1;
        Ok(Some(MockInstance {
            object: object.clone(),
            ledger: Arc::clone(&self.ledger),
        }))
    }
}

impl Drop for MockInstances<'_> {
    fn drop(&mut self) {
        self.ledger.cursor_closed();
    }
}

/// Instance handed out by [`MockInstances`].
#[derive(Debug)]
pub struct MockInstance {
    object: MockObject,
    ledger: Arc<ResourceLedger>,
}

impl ManagedObject for MockInstance {
    type Properties<'a> = MockProperties<'a>;

    fn relative_path(&self) -> Result<String, AutomationError> {
        if self.object.fail_relative_path {
            return Err(AutomationError::new("Path_ not available").with_code(WBEM_E_FAILED));
        }
        Ok(self.object.relative_path.clone())
    }

    fn properties(&self) -> Result<MockProperties<'_>, AutomationError> {
        if self.object.fail_property_cursor {
            return Err(AutomationError::new("Properties_ not available").with_code(WBEM_E_FAILED));
        }
        self.ledger.cursor_opened();
        Ok(MockProperties {
            object: &self.object,
            position: 0,
            ledger: Arc::clone(&self.ledger),
        })
    }

    fn get(&self, name: &str) -> Result<Variant, AutomationError> {
        if self.object.fail_get.contains(name) {
            return Err(AutomationError::new("Not found").with_code(0x80041002_u32 as i32));
        }
        self.object
            .properties
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
            .ok_or_else(|| AutomationError::new("Not found").with_code(0x80041002_u32 as i32))
    }
}

/// Property name cursor of a [`MockInstance`].
#[derive(Debug)]
pub struct MockProperties<'a> {
    object: &'a MockObject,
    position: usize,
    ledger: Arc<ResourceLedger>,
}

impl PropertyCursor for MockProperties<'_> {
    fn next_name(&mut self) -> Result<Option<String>, AutomationError> {
        if self.object.fail_property_step_at == Some(self.position) {
            return Err(AutomationError::new("Enumeration step failed").with_code(WBEM_E_FAILED));
        }
        let Some((name, _)) = self.object.properties.get(self.position) else {
            return Ok(None);
        };
        self.position += 1;
        Ok(Some(name.clone()))
    }
}

impl Drop for MockProperties<'_> {
    fn drop(&mut self) {
        self.ledger.cursor_closed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> MockAutomation {
        let mut wmi = MockAutomation::new();
        wmi.add_instance(
            r"root\cimv2",
            "Win32_Process",
            MockObject::new(r#"Win32_Process.Handle="4""#).with_property("ThreadCount", Variant::UI4(120)),
        );
        wmi
    }

    #[test]
    fn test_parse_select_all() {
        assert_eq!(parse_select_all("SELECT * FROM Win32_Process"), Some("Win32_Process"));
        assert_eq!(parse_select_all("select  *  from  x"), Some("x"));
        assert_eq!(parse_select_all("SELECT Name FROM x"), None);
        assert_eq!(parse_select_all("SELECT * FROM x WHERE y"), None);
        assert_eq!(parse_select_all(""), None);
    }

    #[test]
    fn test_connect_is_case_insensitive() {
        let wmi = host();
        assert!(wmi.connect(r"ROOT\CIMV2", "MS_409").is_ok());
        let err = wmi.connect(r"root\nope", "MS_409").unwrap_err();
        assert_eq!(err.code, Some(WBEM_E_INVALID_NAMESPACE));
    }

    #[test]
    fn test_query_unknown_class() {
        let wmi = host();
        let session = wmi.connect(r"root\cimv2", "MS_409").unwrap();
        let err = session.exec_query("SELECT * FROM Win32_Nope").unwrap_err();
        assert_eq!(err.code, Some(WBEM_E_INVALID_CLASS));
    }

    #[test]
    fn test_handles_are_counted_until_dropped() {
        let wmi = host();
        {
            let session = wmi.connect(r"root\cimv2", "MS_409").unwrap();
            let mut instances = session.exec_query("SELECT * FROM win32_process").unwrap();
            let object = instances.next_instance().unwrap().unwrap();
            let mut props = object.properties().unwrap();
            assert_eq!(props.next_name().unwrap().as_deref(), Some("ThreadCount"));
            assert_eq!(object.get("threadcount").unwrap(), Variant::UI4(120));
            assert_eq!(wmi.ledger().open_sessions(), 1);
            assert_eq!(wmi.ledger().open_cursors(), 2);
            assert!(instances.next_instance().unwrap().is_none());
        }
        assert_eq!(wmi.ledger().open_sessions(), 0);
        assert_eq!(wmi.ledger().open_cursors(), 0);
        assert_eq!(wmi.ledger().sessions_opened(), 1);
        assert_eq!(
            wmi.ledger().calls(),
            [r"connect root\cimv2 MS_409", "query SELECT * FROM win32_process"]
        );
    }

    #[test]
    fn test_instance_step_failure_is_sticky() {
        let mut wmi = host();
        wmi.fail_instance_step_at(r"root\cimv2", "Win32_Process", 0);
        let session = wmi.connect(r"root\cimv2", "MS_409").unwrap();
        let mut instances = session.exec_query("SELECT * FROM Win32_Process").unwrap();
        assert!(instances.next_instance().is_err());
        assert!(instances.next_instance().is_err());
    }
}
