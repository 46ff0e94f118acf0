//! Property enumeration for a single instance.
//!
//! Names come from the instance's property cursor one at a time; each value
//! is then fetched with a separate lookup against the instance.

use std::iter::FusedIterator;

use tracing::trace;

use crate::collector::error::CollectError;
use crate::collector::traits::{ManagedObject, PropertyCursor};
use crate::collector::variant::{TypeTag, Variant, coerce};

/// A property name paired with the value fetched for it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawProperty {
    pub name: String,
    pub value: Variant,
}

impl RawProperty {
    pub fn type_tag(&self) -> TypeTag {
        self.value.type_tag()
    }

    /// Sample value, or `None` when the type is not exported.
    pub fn sample(&self) -> Option<f64> {
        coerce(&self.value)
    }
}

/// Lazy walk over all properties of one instance.
///
/// Yields properties in cursor order. The first failure is yielded as an
/// error and ends the walk; the cursor is released as soon as the walk ends,
/// whether by exhaustion, failure or drop.
pub struct PropertyWalk<'o, O: ManagedObject + 'o> {
    object: &'o O,
    cursor: Option<O::Properties<'o>>,
    class: &'o str,
    instance: &'o str,
}

impl<'o, O: ManagedObject + 'o> PropertyWalk<'o, O> {
    /// Opens the property cursor of `object`.
    ///
    /// `class` and `instance` are only used to give errors context.
    pub fn open(object: &'o O, class: &'o str, instance: &'o str) -> Result<Self, CollectError> {
        let cursor = object
            .properties()
            .map_err(|source| CollectError::Enumeration {
                class: class.to_string(),
                instance: Some(instance.to_string()),
                source,
            })?;
        Ok(Self {
            object,
            cursor: Some(cursor),
            class,
            instance,
        })
    }
}

impl<'o, O: ManagedObject + 'o> Iterator for PropertyWalk<'o, O> {
    type Item = Result<RawProperty, CollectError>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;

        let name = match cursor.next_name() {
            Ok(Some(name)) => name,
            Ok(None) => {
                self.cursor = None;
                return None;
            }
            Err(source) => {
                self.cursor = None;
                return Some(Err(CollectError::Enumeration {
                    class: self.class.to_string(),
                    instance: Some(self.instance.to_string()),
                    source,
                }));
            }
        };

        match self.object.get(&name) {
            Ok(value) => {
                trace!("{}.{} [{}] = {:?}", self.class, name, value.type_tag(), value);
                Some(Ok(RawProperty { name, value }))
            }
            Err(source) => {
                self.cursor = None;
                Some(Err(CollectError::PropertyFetch {
                    class: self.class.to_string(),
                    instance: Some(self.instance.to_string()),
                    property: name,
                    source,
                }))
            }
        }
    }
}

impl<'o, O: ManagedObject + 'o> FusedIterator for PropertyWalk<'o, O> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{MockAutomation, MockObject};
    use crate::collector::traits::{Automation, InstanceCursor, Session};

    fn single_object_host(object: MockObject) -> MockAutomation {
        let mut wmi = MockAutomation::new();
        wmi.add_instance(r"root\cimv2", "Test_Class", object);
        wmi
    }

    fn walk_all(wmi: &MockAutomation) -> Vec<Result<RawProperty, CollectError>> {
        let session = wmi.connect(r"root\cimv2", "MS_409").unwrap();
        let mut instances = session.exec_query("SELECT * FROM Test_Class").unwrap();
        let object = instances.next_instance().unwrap().unwrap();
        PropertyWalk::open(&object, "Test_Class", "1").unwrap().collect()
    }

    #[test]
    fn test_walk_yields_properties_in_cursor_order() {
        let wmi = single_object_host(
            MockObject::new(r#"Test_Class.Id="1""#)
                .with_property("Zeta", Variant::UI4(1))
                .with_property("Alpha", Variant::String("x".into()))
                .with_property("Mid", Variant::Bool(true)),
        );

        let props: Vec<RawProperty> = walk_all(&wmi).into_iter().map(Result::unwrap).collect();
        let names: Vec<&str> = props.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Zeta", "Alpha", "Mid"]);
        assert_eq!(props[0].sample(), Some(1.0));
        assert_eq!(props[1].sample(), None);
        assert_eq!(props[1].type_tag(), TypeTag::String);
        assert_eq!(props[2].sample(), Some(1.0));
    }

    #[test]
    fn test_walk_of_object_without_properties_is_empty() {
        let wmi = single_object_host(MockObject::new(r#"Test_Class.Id="1""#));
        assert!(walk_all(&wmi).is_empty());
    }

    #[test]
    fn test_cursor_step_failure_ends_walk() {
        let wmi = single_object_host(
            MockObject::new(r#"Test_Class.Id="1""#)
                .with_property("A", Variant::I4(1))
                .with_property("B", Variant::I4(2))
                .with_property("C", Variant::I4(3))
                .fail_property_step_at(1),
        );

        let items = walk_all(&wmi);
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(
            items[1],
            Err(CollectError::Enumeration {
                instance: Some(_),
                ..
            })
        ));
        assert_eq!(wmi.ledger().open_cursors(), 0);
    }

    #[test]
    fn test_value_fetch_failure_names_property() {
        let wmi = single_object_host(
            MockObject::new(r#"Test_Class.Id="1""#)
                .with_property("A", Variant::I4(1))
                .with_property("B", Variant::I4(2))
                .fail_get("B"),
        );

        let items = walk_all(&wmi);
        assert_eq!(items.len(), 2);
        match &items[1] {
            Err(CollectError::PropertyFetch { property, .. }) => assert_eq!(property, "B"),
            other => panic!("unexpected item: {:?}", other),
        }
    }

    #[test]
    fn test_property_cursor_acquisition_failure() {
        let wmi = single_object_host(
            MockObject::new(r#"Test_Class.Id="1""#)
                .with_property("A", Variant::I4(1))
                .fail_property_cursor(),
        );
        let session = wmi.connect(r"root\cimv2", "MS_409").unwrap();
        let mut instances = session.exec_query("SELECT * FROM Test_Class").unwrap();
        let object = instances.next_instance().unwrap().unwrap();

        let result = PropertyWalk::open(&object, "Test_Class", "1");
        assert!(matches!(result, Err(CollectError::Enumeration { .. })));
    }

    #[test]
    fn test_walk_is_fused_after_failure() {
        let wmi = single_object_host(
            MockObject::new(r#"Test_Class.Id="1""#)
                .with_property("A", Variant::I4(1))
                .with_property("B", Variant::I4(2))
                .fail_property_step_at(0),
        );
        let session = wmi.connect(r"root\cimv2", "MS_409").unwrap();
        let mut instances = session.exec_query("SELECT * FROM Test_Class").unwrap();
        let object = instances.next_instance().unwrap().unwrap();

        let mut walk = PropertyWalk::open(&object, "Test_Class", "1").unwrap();
        assert!(matches!(walk.next(), Some(Err(_))));
        assert!(walk.next().is_none());
        assert!(walk.next().is_none());
    }
}
