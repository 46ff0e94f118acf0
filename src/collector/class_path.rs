//! Parsing of the class path configuration string.
//!
//! Syntax: `namespace:Class;namespace:Class;...`, for example
//! `root\cimv2:Win32_Service;root\cimv2:Win32_Process`.

use crate::collector::error::CollectError;

const ENTRY_SEPARATOR: char = ';';
const CLASS_SEPARATOR: char = ':';

/// A class to query and the namespace it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSpec {
    pub namespace: String,
    pub class_name: String,
}

impl ClassSpec {
    /// Parses a single `namespace:Class` entry.
    pub fn parse(entry: &str) -> Result<Self, CollectError> {
        let invalid = |reason: &str| CollectError::Configuration {
            entry: entry.to_string(),
            reason: reason.to_string(),
        };

        let (namespace, class_name) = entry
            .split_once(CLASS_SEPARATOR)
            .ok_or_else(|| invalid("missing ':' separator"))?;
        let namespace = namespace.trim();
        let class_name = class_name.trim();

        if namespace.is_empty() {
            return Err(invalid("empty namespace"));
        }
        if class_name.is_empty() {
            return Err(invalid("empty class name"));
        }
        if class_name.contains(CLASS_SEPARATOR) {
            return Err(invalid("more than one ':' separator"));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            class_name: class_name.to_string(),
        })
    }

    /// Query selecting every instance of the class.
    pub fn query(&self) -> String {
        format!("SELECT * FROM {}", self.class_name)
    }
}

impl std::fmt::Display for ClassSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.class_name)
    }
}

/// Lazily parsed class path.
///
/// Iterating yields one result per non-blank entry, in order. Entries are
/// only parsed when reached, so a malformed entry does not prevent the
/// entries before it from being used.
#[derive(Debug, Clone, Copy)]
pub struct ClassPath<'a> {
    raw: &'a str,
}

impl<'a> ClassPath<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self { raw }
    }

    /// Parses the whole class path, failing on the first malformed entry.
    pub fn parse(raw: &'a str) -> Result<Vec<ClassSpec>, CollectError> {
        Self::new(raw).specs().collect()
    }

    pub fn specs(&self) -> impl Iterator<Item = Result<ClassSpec, CollectError>> + 'a {
        self.raw
            .split(ENTRY_SEPARATOR)
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(ClassSpec::parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(namespace: &str, class_name: &str) -> ClassSpec {
        ClassSpec {
            namespace: namespace.to_string(),
            class_name: class_name.to_string(),
        }
    }

    #[test]
    fn test_parse_two_entries_in_order() {
        let specs = ClassPath::parse(r"root\cimv2:Win32_Service;root\cimv2:Win32_Process").unwrap();
        assert_eq!(
            specs,
            [
                spec(r"root\cimv2", "Win32_Service"),
                spec(r"root\cimv2", "Win32_Process")
            ]
        );
    }

    #[test]
    fn test_blank_entries_and_whitespace_are_ignored() {
        let specs = ClassPath::parse(r" root\cimv2 : Win32_Service ;; root\wmi:MSAcpi_ThermalZoneTemperature; ").unwrap();
        assert_eq!(
            specs,
            [
                spec(r"root\cimv2", "Win32_Service"),
                spec(r"root\wmi", "MSAcpi_ThermalZoneTemperature")
            ]
        );
        assert!(ClassPath::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_missing_separator_is_configuration_error() {
        let err = ClassPath::parse(r"root\cimv2").unwrap_err();
        match err {
            CollectError::Configuration { entry, reason } => {
                assert_eq!(entry, r"root\cimv2");
                assert_eq!(reason, "missing ':' separator");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_empty_parts_are_rejected() {
        assert!(ClassSpec::parse(r":Win32_Process").is_err());
        assert!(ClassSpec::parse(r"root\cimv2:").is_err());
        assert!(ClassSpec::parse(r"root\cimv2:Win32:Process").is_err());
    }

    #[test]
    fn test_entries_before_malformed_one_are_usable() {
        let path = ClassPath::new(r"root\cimv2:Win32_Service;root\cimv2;root\cimv2:Win32_Process");
        let mut specs = path.specs();
        assert_eq!(specs.next().unwrap().unwrap(), spec(r"root\cimv2", "Win32_Service"));
        assert!(specs.next().unwrap().is_err());
    }

    #[test]
    fn test_query_and_display() {
        let s = spec(r"root\cimv2", "Win32_Process");
        assert_eq!(s.query(), "SELECT * FROM Win32_Process");
        assert_eq!(s.to_string(), r"root\cimv2:Win32_Process");
    }
}
