use crate::{CimDateTime, CimInstanceName, CimType, ModelError, Result};
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::mem::discriminant;

/// A typed CIM value.
///
/// Every variant knows its [`CimType`]; the tag survives encoding and
/// decoding. Arrays are homogeneous and carry their element type
/// explicitly (see [`CimArray`]), so empty and all-null arrays stay
/// typed. Nested arrays are not representable, per the model.
///
/// Null is not a `CimValue`: a nullable slot is an `Option<CimValue>`
/// next to a `CimType` tag, which is how [`CimProperty`] and friends
/// keep the type of a null slot.
///
/// Reals compare and hash by IEEE-754 bit pattern, which keeps `Eq` and
/// `Hash` lawful; values decoded from the wire never contain NaN.
///
/// [`CimProperty`]: crate::CimProperty
#[derive(Clone, Debug)]
pub enum CimValue {
    /// `boolean`
    Boolean(bool),
    /// `string`
    String(String),
    /// `char16`, restricted to the basic multilingual plane
    Char16(char),
    /// `uint8`
    Uint8(u8),
    /// `uint16`
    Uint16(u16),
    /// `uint32`
    Uint32(u32),
    /// `uint64`
    Uint64(u64),
    /// `sint8`
    Sint8(i8),
    /// `sint16`
    Sint16(i16),
    /// `sint32`
    Sint32(i32),
    /// `sint64`
    Sint64(i64),
    /// `real32`
    Real32(f32),
    /// `real64`
    Real64(f64),
    /// `datetime`
    DateTime(CimDateTime),
    /// `reference` — an instance path
    Reference(Box<CimInstanceName>),
    /// An array of any primitive type
    Array(CimArray),
}

impl CimValue {
    /// The CIM type tag of this value. For arrays, the element type.
    pub fn cim_type(&self) -> CimType {
        match self {
            CimValue::Boolean(_) => CimType::Boolean,
            CimValue::String(_) => CimType::String,
            CimValue::Char16(_) => CimType::Char16,
            CimValue::Uint8(_) => CimType::Uint8,
            CimValue::Uint16(_) => CimType::Uint16,
            CimValue::Uint32(_) => CimType::Uint32,
            CimValue::Uint64(_) => CimType::Uint64,
            CimValue::Sint8(_) => CimType::Sint8,
            CimValue::Sint16(_) => CimType::Sint16,
            CimValue::Sint32(_) => CimType::Sint32,
            CimValue::Sint64(_) => CimType::Sint64,
            CimValue::Real32(_) => CimType::Real32,
            CimValue::Real64(_) => CimType::Real64,
            CimValue::DateTime(_) => CimType::DateTime,
            CimValue::Reference(_) => CimType::Reference,
            CimValue::Array(a) => a.element_type(),
        }
    }

    /// True for the array variant.
    pub fn is_array(&self) -> bool {
        matches!(self, CimValue::Array(_))
    }

    /// The contained string, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CimValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The contained boolean, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CimValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The contained instance path, if this is a reference value.
    pub fn as_reference(&self) -> Option<&CimInstanceName> {
        match self {
            CimValue::Reference(r) => Some(r),
            _ => None,
        }
    }

    /// The contained array, if this is an array value.
    pub fn as_array(&self) -> Option<&CimArray> {
        match self {
            CimValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Any unsigned integer variant widened to `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            CimValue::Uint8(v) => Some(u64::from(*v)),
            CimValue::Uint16(v) => Some(u64::from(*v)),
            CimValue::Uint32(v) => Some(u64::from(*v)),
            CimValue::Uint64(v) => Some(*v),
            _ => None,
        }
    }

    /// Parses the scalar text form of a value of the given CIM type.
    ///
    /// This is the inverse of [`CimValue::text`]: `TRUE`/`FALSE` booleans
    /// (any case), decimal integers, reals, the 25-character datetime
    /// form, a single BMP character for `char16`. References cannot be
    /// parsed from scalar text; they arrive structurally on the wire.
    pub fn parse(ty: CimType, text: &str) -> Result<CimValue> {
        let fail = || ModelError::ValueParse {
            ty,
            text: text.to_string(),
        };
        match ty {
            CimType::Boolean => match text {
                t if t.eq_ignore_ascii_case("true") => Ok(CimValue::Boolean(true)),
                t if t.eq_ignore_ascii_case("false") => Ok(CimValue::Boolean(false)),
                _ => Err(fail()),
            },
            CimType::String => Ok(CimValue::String(text.to_string())),
            CimType::Char16 => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if (c as u32) <= 0xFFFF => Ok(CimValue::Char16(c)),
                    _ => Err(fail()),
                }
            }
            CimType::Uint8 => text.parse().map(CimValue::Uint8).map_err(|_| fail()),
            CimType::Uint16 => text.parse().map(CimValue::Uint16).map_err(|_| fail()),
            CimType::Uint32 => text.parse().map(CimValue::Uint32).map_err(|_| fail()),
            CimType::Uint64 => text.parse().map(CimValue::Uint64).map_err(|_| fail()),
            CimType::Sint8 => text.parse().map(CimValue::Sint8).map_err(|_| fail()),
            CimType::Sint16 => text.parse().map(CimValue::Sint16).map_err(|_| fail()),
            CimType::Sint32 => text.parse().map(CimValue::Sint32).map_err(|_| fail()),
            CimType::Sint64 => text.parse().map(CimValue::Sint64).map_err(|_| fail()),
            CimType::Real32 => text.parse().map(CimValue::Real32).map_err(|_| fail()),
            CimType::Real64 => text.parse().map(CimValue::Real64).map_err(|_| fail()),
            CimType::DateTime => text.parse().map(CimValue::DateTime).map_err(|_| fail()),
            CimType::Reference => Err(fail()),
        }
    }

    /// The canonical scalar text form used on the wire.
    ///
    /// Booleans render `TRUE`/`FALSE`; reals use the shortest
    /// representation that round-trips, with a forced decimal point;
    /// datetimes use the 25-character form. Arrays and references have
    /// no scalar text form and return `None`.
    pub fn text(&self) -> Option<String> {
        match self {
            CimValue::Boolean(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
            CimValue::String(s) => Some(s.clone()),
            CimValue::Char16(c) => Some(c.to_string()),
            CimValue::Uint8(v) => Some(v.to_string()),
            CimValue::Uint16(v) => Some(v.to_string()),
            CimValue::Uint32(v) => Some(v.to_string()),
            CimValue::Uint64(v) => Some(v.to_string()),
            CimValue::Sint8(v) => Some(v.to_string()),
            CimValue::Sint16(v) => Some(v.to_string()),
            CimValue::Sint32(v) => Some(v.to_string()),
            CimValue::Sint64(v) => Some(v.to_string()),
            CimValue::Real32(v) => Some(real_text(f64::from(*v))),
            CimValue::Real64(v) => Some(real_text(*v)),
            CimValue::DateTime(dt) => Some(dt.to_string()),
            CimValue::Reference(_) | CimValue::Array(_) => None,
        }
    }
}

/// Shortest round-trip rendering with a decimal separator forced in, so
/// the output always reads as a real and never as an integer.
fn real_text(v: f64) -> String {
    let s = v.to_string();
    if s.contains(['.', 'e', 'E']) || s.contains("inf") || s.contains("NaN") {
        s
    } else {
        format!("{s}.0")
    }
}

impl PartialEq for CimValue {
    fn eq(&self, other: &Self) -> bool {
        use CimValue::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Char16(a), Char16(b)) => a == b,
            (Uint8(a), Uint8(b)) => a == b,
            (Uint16(a), Uint16(b)) => a == b,
            (Uint32(a), Uint32(b)) => a == b,
            (Uint64(a), Uint64(b)) => a == b,
            (Sint8(a), Sint8(b)) => a == b,
            (Sint16(a), Sint16(b)) => a == b,
            (Sint32(a), Sint32(b)) => a == b,
            (Sint64(a), Sint64(b)) => a == b,
            (Real32(a), Real32(b)) => a.to_bits() == b.to_bits(),
            (Real64(a), Real64(b)) => a.to_bits() == b.to_bits(),
            (DateTime(a), DateTime(b)) => a == b,
            (Reference(a), Reference(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CimValue {}

impl Hash for CimValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        discriminant(self).hash(state);
        match self {
            CimValue::Boolean(v) => v.hash(state),
            CimValue::String(v) => v.hash(state),
            CimValue::Char16(v) => v.hash(state),
            CimValue::Uint8(v) => v.hash(state),
            CimValue::Uint16(v) => v.hash(state),
            CimValue::Uint32(v) => v.hash(state),
            CimValue::Uint64(v) => v.hash(state),
            CimValue::Sint8(v) => v.hash(state),
            CimValue::Sint16(v) => v.hash(state),
            CimValue::Sint32(v) => v.hash(state),
            CimValue::Sint64(v) => v.hash(state),
            CimValue::Real32(v) => v.to_bits().hash(state),
            CimValue::Real64(v) => v.to_bits().hash(state),
            CimValue::DateTime(v) => v.hash(state),
            CimValue::Reference(v) => v.hash(state),
            CimValue::Array(v) => v.hash(state),
        }
    }
}

/// A homogeneous array of primitive CIM values.
///
/// The element type is stored so that empty arrays and arrays of nulls
/// keep their type tag; `None` elements are the wire's `VALUE.NULL`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CimArray {
    element_type: CimType,
    elements: Vec<Option<CimValue>>,
}

impl CimArray {
    /// An empty array of the given element type.
    pub fn new(element_type: CimType) -> Self {
        Self {
            element_type,
            elements: Vec::new(),
        }
    }

    /// Builds an array from elements, checking each against the element
    /// type. `None` elements are permitted for any type.
    pub fn from_elements<I>(element_type: CimType, elements: I) -> Result<Self>
    where
        I: IntoIterator<Item = Option<CimValue>>,
    {
        let mut array = Self::new(element_type);
        for element in elements {
            array.push(element)?;
        }
        Ok(array)
    }

    /// The declared element type.
    pub fn element_type(&self) -> CimType {
        self.element_type
    }

    /// Number of elements, null elements included.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True when the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Appends an element, rejecting type mismatches and nested arrays.
    pub fn push(&mut self, element: Option<CimValue>) -> Result<()> {
        if let Some(value) = &element {
            if value.is_array() {
                return Err(ModelError::ArrayMismatch {
                    declared_array: false,
                });
            }
            if value.cim_type() != self.element_type {
                return Err(ModelError::TypeMismatch {
                    expected: self.element_type,
                    found: value.cim_type(),
                });
            }
        }
        self.elements.push(element);
        Ok(())
    }

    /// Element at `index`; `Some(None)` is a present null element.
    pub fn get(&self, index: usize) -> Option<&Option<CimValue>> {
        self.elements.get(index)
    }

    /// Iterates elements in order.
    pub fn iter(&self) -> impl Iterator<Item = &Option<CimValue>> {
        self.elements.iter()
    }
}

impl Debug for CimArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CimArray")
            .field("element_type", &self.element_type)
            .field("elements", &self.elements)
            .finish()
    }
}

/// Rust scalars that map directly onto a CIM type, for ergonomic value
/// and array construction.
pub trait IntoCimScalar: Into<CimValue> {
    /// The CIM type the scalar maps to.
    const TYPE: CimType;
}

macro_rules! scalar_from {
    ($rust:ty, $variant:ident, $ty:expr) => {
        impl From<$rust> for CimValue {
            fn from(v: $rust) -> Self {
                CimValue::$variant(v)
            }
        }

        impl IntoCimScalar for $rust {
            const TYPE: CimType = $ty;
        }
    };
}

scalar_from!(bool, Boolean, CimType::Boolean);
scalar_from!(String, String, CimType::String);
scalar_from!(char, Char16, CimType::Char16);
scalar_from!(u8, Uint8, CimType::Uint8);
scalar_from!(u16, Uint16, CimType::Uint16);
scalar_from!(u32, Uint32, CimType::Uint32);
scalar_from!(u64, Uint64, CimType::Uint64);
scalar_from!(i8, Sint8, CimType::Sint8);
scalar_from!(i16, Sint16, CimType::Sint16);
scalar_from!(i32, Sint32, CimType::Sint32);
scalar_from!(i64, Sint64, CimType::Sint64);
scalar_from!(f32, Real32, CimType::Real32);
scalar_from!(f64, Real64, CimType::Real64);
scalar_from!(CimDateTime, DateTime, CimType::DateTime);

impl From<&str> for CimValue {
    fn from(v: &str) -> Self {
        CimValue::String(v.to_string())
    }
}

impl IntoCimScalar for &str {
    const TYPE: CimType = CimType::String;
}

impl From<CimInstanceName> for CimValue {
    fn from(v: CimInstanceName) -> Self {
        CimValue::Reference(Box::new(v))
    }
}

impl IntoCimScalar for CimInstanceName {
    const TYPE: CimType = CimType::Reference;
}

impl From<CimArray> for CimValue {
    fn from(v: CimArray) -> Self {
        CimValue::Array(v)
    }
}

impl<T: IntoCimScalar> From<Vec<T>> for CimValue {
    fn from(v: Vec<T>) -> Self {
        CimValue::Array(CimArray {
            element_type: T::TYPE,
            elements: v.into_iter().map(|e| Some(e.into())).collect(),
        })
    }
}
