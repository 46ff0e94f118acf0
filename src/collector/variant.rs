//! Runtime-typed property values and their numeric coercion.
//!
//! Property types are only known once an instance has been fetched, so every
//! value travels as a [`Variant`]. [`coerce`] decides which of them become
//! metric samples.

use std::fmt;

/// Value of a property as returned by the automation interface.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Empty,
    Null,
    I1(i8),
    I2(i16),
    I4(i32),
    I8(i64),
    UI1(u8),
    UI2(u16),
    UI4(u32),
    UI8(u64),
    /// Platform sized signed integer.
    Int(isize),
    /// Platform sized unsigned integer.
    UInt(usize),
    Bool(bool),
    R4(f32),
    R8(f64),
    /// Fixed point currency, scaled by 10 000.
    Currency(i64),
    /// OLE automation date (days since 1899-12-30).
    Date(f64),
    String(String),
    /// Embedded object reference; only its class name is kept.
    Object(String),
    Array(Vec<Variant>),
    /// Any variant type the backend could not map, with its raw type code.
    Unknown(u16),
}

/// Runtime type of a [`Variant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Empty,
    Null,
    I1,
    I2,
    I4,
    I8,
    UI1,
    UI2,
    UI4,
    UI8,
    Int,
    UInt,
    Bool,
    R4,
    R8,
    Currency,
    Date,
    String,
    Object,
    Array,
    Unknown,
}

impl Variant {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Variant::Empty => TypeTag::Empty,
            Variant::Null => TypeTag::Null,
            Variant::I1(_) => TypeTag::I1,
            Variant::I2(_) => TypeTag::I2,
            Variant::I4(_) => TypeTag::I4,
            Variant::I8(_) => TypeTag::I8,
            Variant::UI1(_) => TypeTag::UI1,
            Variant::UI2(_) => TypeTag::UI2,
            Variant::UI4(_) => TypeTag::UI4,
            Variant::UI8(_) => TypeTag::UI8,
            Variant::Int(_) => TypeTag::Int,
            Variant::UInt(_) => TypeTag::UInt,
            Variant::Bool(_) => TypeTag::Bool,
            Variant::R4(_) => TypeTag::R4,
            Variant::R8(_) => TypeTag::R8,
            Variant::Currency(_) => TypeTag::Currency,
            Variant::Date(_) => TypeTag::Date,
            Variant::String(_) => TypeTag::String,
            Variant::Object(_) => TypeTag::Object,
            Variant::Array(_) => TypeTag::Array,
            Variant::Unknown(_) => TypeTag::Unknown,
        }
    }
}

impl TypeTag {
    /// Returns `true` for the integer and boolean tags that produce samples.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            TypeTag::I1
                | TypeTag::I2
                | TypeTag::I4
                | TypeTag::I8
                | TypeTag::UI1
                | TypeTag::UI2
                | TypeTag::UI4
                | TypeTag::UI8
                | TypeTag::Int
                | TypeTag::UInt
                | TypeTag::Bool
        )
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Empty => "empty",
            TypeTag::Null => "null",
            TypeTag::I1 => "sint8",
            TypeTag::I2 => "sint16",
            TypeTag::I4 => "sint32",
            TypeTag::I8 => "sint64",
            TypeTag::UI1 => "uint8",
            TypeTag::UI2 => "uint16",
            TypeTag::UI4 => "uint32",
            TypeTag::UI8 => "uint64",
            TypeTag::Int => "int",
            TypeTag::UInt => "uint",
            TypeTag::Bool => "boolean",
            TypeTag::R4 => "real32",
            TypeTag::R8 => "real64",
            TypeTag::Currency => "currency",
            TypeTag::Date => "datetime",
            TypeTag::String => "string",
            TypeTag::Object => "object",
            TypeTag::Array => "array",
            TypeTag::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Converts a property value into a sample value.
///
/// Integers are widened with `as f64`; magnitudes above 2^53 lose precision.
/// Booleans map to `1.0`/`0.0`. Every other type yields `None` and the
/// property is skipped.
pub fn coerce(value: &Variant) -> Option<f64> {
    match *value {
        Variant::I1(v) => Some(f64::from(v)),
        Variant::I2(v) => Some(f64::from(v)),
        Variant::I4(v) => Some(f64::from(v)),
        Variant::I8(v) => Some(v as f64),
        Variant::UI1(v) => Some(f64::from(v)),
        Variant::UI2(v) => Some(f64::from(v)),
        Variant::UI4(v) => Some(f64::from(v)),
        Variant::UI8(v) => Some(v as f64),
        Variant::Int(v) => Some(v as f64),
        Variant::UInt(v) => Some(v as f64),
        Variant::Bool(v) => Some(if v { 1.0 } else { 0.0 }),
        Variant::Empty
        | Variant::Null
        | Variant::R4(_)
        | Variant::R8(_)
        | Variant::Currency(_)
        | Variant::Date(_)
        | Variant::String(_)
        | Variant::Object(_)
        | Variant::Array(_)
        | Variant::Unknown(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_signed_integers() {
        assert_eq!(coerce(&Variant::I1(-128)), Some(-128.0));
        assert_eq!(coerce(&Variant::I2(-32768)), Some(-32768.0));
        assert_eq!(coerce(&Variant::I4(i32::MIN)), Some(-2147483648.0));
        assert_eq!(coerce(&Variant::I8(-(1 << 53))), Some(-9007199254740992.0));
        assert_eq!(coerce(&Variant::Int(-7)), Some(-7.0));
    }

    #[test]
    fn test_coerce_unsigned_integers() {
        assert_eq!(coerce(&Variant::UI1(255)), Some(255.0));
        assert_eq!(coerce(&Variant::UI2(65535)), Some(65535.0));
        assert_eq!(coerce(&Variant::UI4(u32::MAX)), Some(4294967295.0));
        assert_eq!(coerce(&Variant::UI8(1 << 53)), Some(9007199254740992.0));
        assert_eq!(coerce(&Variant::UInt(42)), Some(42.0));
    }

    #[test]
    fn test_coerce_bool_is_zero_or_one() {
        assert_eq!(coerce(&Variant::Bool(true)), Some(1.0));
        assert_eq!(coerce(&Variant::Bool(false)), Some(0.0));
    }

    #[test]
    fn test_coerce_rejects_non_integer_types() {
        let rejected = [
            Variant::Empty,
            Variant::Null,
            Variant::R4(1.5),
            Variant::R8(2.5),
            Variant::Currency(10_000),
            Variant::Date(45000.0),
            Variant::String("1234".to_string()),
            Variant::Object("Win32_Thread".to_string()),
            Variant::Array(vec![Variant::I4(1)]),
            Variant::Unknown(0x24),
        ];
        for value in &rejected {
            assert_eq!(coerce(value), None, "{:?} should be excluded", value);
            assert!(!value.type_tag().is_numeric());
        }
    }

    #[test]
    fn test_numeric_tags_agree_with_coerce() {
        let accepted = [
            Variant::I1(1),
            Variant::I2(1),
            Variant::I4(1),
            Variant::I8(1),
            Variant::UI1(1),
            Variant::UI2(1),
            Variant::UI4(1),
            Variant::UI8(1),
            Variant::Int(1),
            Variant::UInt(1),
            Variant::Bool(true),
        ];
        for value in &accepted {
            assert!(value.type_tag().is_numeric());
            assert!(coerce(value).is_some());
        }
    }

    #[test]
    fn test_type_tag_display() {
        assert_eq!(TypeTag::UI8.to_string(), "uint64");
        assert_eq!(TypeTag::Bool.to_string(), "boolean");
        assert_eq!(Variant::String(String::new()).type_tag().to_string(), "string");
    }
}
