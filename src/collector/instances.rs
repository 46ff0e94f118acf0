//! Instance enumeration for a single class query.

use std::iter::FusedIterator;

use tracing::debug;

use crate::collector::error::CollectError;
use crate::collector::properties::{PropertyWalk, RawProperty};
use crate::collector::traits::{InstanceCursor, ManagedObject};

/// Extracts the instance identity from a relative object path.
///
/// The identity is the text between the first pair of double quotes:
/// `Win32_Process.Handle="1234"` gives `1234`. Paths without a quoted key
/// (singletons such as `Win32_OperatingSystem=@`) are returned unchanged.
pub fn instance_identity(relative_path: &str) -> &str {
    relative_path.split('"').nth(1).unwrap_or(relative_path)
}

/// One instance with its exportable properties.
///
/// Built from scratch for every instance; nothing is shared between
/// instances or carried over between cycles.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedObjectInstance {
    pub identity: String,
    /// Numeric and boolean properties, in cursor order. Holds every property
    /// when the walk was created with [`InstanceWalk::keep_all`].
    pub properties: Vec<RawProperty>,
    /// Number of properties whose type is not exported.
    pub skipped: usize,
}

impl ManagedObjectInstance {
    /// Looks up an exported property by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&RawProperty> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Property names with their sample values, in cursor order.
    pub fn samples(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.properties
            .iter()
            .filter_map(|p| p.sample().map(|v| (p.name.as_str(), v)))
    }
}

/// Lazy walk over the instances of one class query result.
///
/// Each yielded instance has had its whole property set read. The first
/// failure, at instance or property level, is yielded as an error and ends
/// the walk; the cursor is released at that point.
pub struct InstanceWalk<'c, C: InstanceCursor> {
    cursor: Option<C>,
    class: &'c str,
    keep_all: bool,
}

impl<'c, C: InstanceCursor> InstanceWalk<'c, C> {
    pub fn new(cursor: C, class: &'c str) -> Self {
        Self {
            cursor: Some(cursor),
            class,
            keep_all: false,
        }
    }

    /// Keeps properties of every type instead of only the exported ones.
    pub fn keep_all(mut self) -> Self {
        self.keep_all = true;
        self
    }
}

impl<C: InstanceCursor> Iterator for InstanceWalk<'_, C> {
    type Item = Result<ManagedObjectInstance, CollectError>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;

        let object = match next_object(cursor, self.class) {
            Ok(Some(object)) => object,
            Ok(None) => {
                self.cursor = None;
                return None;
            }
            Err(e) => {
                self.cursor = None;
                return Some(Err(e));
            }
        };

        let result = read_instance(&object, self.class, self.keep_all);
        if result.is_err() {
            self.cursor = None;
        }
        Some(result)
    }
}

impl<C: InstanceCursor> FusedIterator for InstanceWalk<'_, C> {}

/// Advances `cursor` by one instance.
pub(crate) fn next_object<C: InstanceCursor>(cursor: &mut C, class: &str) -> Result<Option<C::Object>, CollectError> {
    cursor
        .next_instance()
        .map_err(|source| CollectError::Enumeration {
            class: class.to_string(),
            instance: None,
            source,
        })
}

/// Reads `__RELPATH` of `object` and reduces it to the instance identity.
pub(crate) fn object_identity<O: ManagedObject>(object: &O, class: &str) -> Result<String, CollectError> {
    let relative_path = object
        .relative_path()
        .map_err(|source| CollectError::PropertyFetch {
            class: class.to_string(),
            instance: None,
            property: "__RELPATH".to_string(),
            source,
        })?;
    Ok(instance_identity(&relative_path).to_string())
}

fn read_instance<O: ManagedObject>(
    object: &O,
    class: &str,
    keep_all: bool,
) -> Result<ManagedObjectInstance, CollectError> {
    let identity = object_identity(object, class)?;

    let mut properties = Vec::new();
    let mut skipped = 0;
    for property in PropertyWalk::open(object, class, &identity)? {
        let property = property?;
        let numeric = property.type_tag().is_numeric();
        if !numeric {
            skipped += 1;
        }
        if numeric || keep_all {
            properties.push(property);
        }
    }

    debug!("{} '{}': {} properties, {} not exported", class, identity, properties.len(), skipped);

    Ok(ManagedObjectInstance {
        identity,
        properties,
        skipped,
    })
}
