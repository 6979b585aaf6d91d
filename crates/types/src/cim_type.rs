use crate::ModelError;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// The CIM data type tag carried by every typed slot.
///
/// The string forms are the type keywords of the CIM infrastructure
/// specification and appear verbatim in `TYPE` and `PARAMTYPE` attributes
/// on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CimType {
    /// `boolean`
    Boolean,
    /// `string` (UTF-8 text)
    String,
    /// `char16` (single UTF-16 code unit)
    Char16,
    /// `uint8`
    Uint8,
    /// `uint16`
    Uint16,
    /// `uint32`
    Uint32,
    /// `uint64`
    Uint64,
    /// `sint8`
    Sint8,
    /// `sint16`
    Sint16,
    /// `sint32`
    Sint32,
    /// `sint64`
    Sint64,
    /// `real32` (IEEE-754 single)
    Real32,
    /// `real64` (IEEE-754 double)
    Real64,
    /// `datetime` (point in time or interval)
    DateTime,
    /// `reference` (an instance path)
    Reference,
}

impl CimType {
    /// The CIM type keyword, as used in `TYPE` attributes.
    pub fn as_str(self) -> &'static str {
        match self {
            CimType::Boolean => "boolean",
            CimType::String => "string",
            CimType::Char16 => "char16",
            CimType::Uint8 => "uint8",
            CimType::Uint16 => "uint16",
            CimType::Uint32 => "uint32",
            CimType::Uint64 => "uint64",
            CimType::Sint8 => "sint8",
            CimType::Sint16 => "sint16",
            CimType::Sint32 => "sint32",
            CimType::Sint64 => "sint64",
            CimType::Real32 => "real32",
            CimType::Real64 => "real64",
            CimType::DateTime => "datetime",
            CimType::Reference => "reference",
        }
    }

    /// True for the eight fixed-width integer types.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            CimType::Uint8
                | CimType::Uint16
                | CimType::Uint32
                | CimType::Uint64
                | CimType::Sint8
                | CimType::Sint16
                | CimType::Sint32
                | CimType::Sint64
        )
    }

    /// True for `real32` and `real64`.
    pub fn is_real(self) -> bool {
        matches!(self, CimType::Real32 | CimType::Real64)
    }

    /// The `VALUETYPE` attribute used when this type appears in a
    /// `KEYVALUE` element: `"boolean"`, `"numeric"`, or `"string"`.
    pub fn keyvalue_kind(self) -> &'static str {
        match self {
            CimType::Boolean => "boolean",
            t if t.is_integer() || t.is_real() => "numeric",
            _ => "string",
        }
    }
}

impl Display for CimType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CimType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boolean" => Ok(CimType::Boolean),
            "string" => Ok(CimType::String),
            "char16" => Ok(CimType::Char16),
            "uint8" => Ok(CimType::Uint8),
            "uint16" => Ok(CimType::Uint16),
            "uint32" => Ok(CimType::Uint32),
            "uint64" => Ok(CimType::Uint64),
            "sint8" => Ok(CimType::Sint8),
            "sint16" => Ok(CimType::Sint16),
            "sint32" => Ok(CimType::Sint32),
            "sint64" => Ok(CimType::Sint64),
            "real32" => Ok(CimType::Real32),
            "real64" => Ok(CimType::Real64),
            "datetime" => Ok(CimType::DateTime),
            "reference" => Ok(CimType::Reference),
            other => Err(ModelError::UnknownType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_round_trip() {
        for ty in [
            CimType::Boolean,
            CimType::String,
            CimType::Char16,
            CimType::Uint8,
            CimType::Uint64,
            CimType::Sint8,
            CimType::Sint64,
            CimType::Real32,
            CimType::Real64,
            CimType::DateTime,
            CimType::Reference,
        ] {
            assert_eq!(ty.as_str().parse::<CimType>().unwrap(), ty);
        }
    }

    #[test]
    fn unknown_keyword() {
        assert!("uint128".parse::<CimType>().is_err());
        // keywords are lowercase on the wire
        assert!("Boolean".parse::<CimType>().is_err());
    }

    #[test]
    fn keyvalue_kinds() {
        assert_eq!(CimType::Boolean.keyvalue_kind(), "boolean");
        assert_eq!(CimType::Uint32.keyvalue_kind(), "numeric");
        assert_eq!(CimType::Real64.keyvalue_kind(), "numeric");
        assert_eq!(CimType::String.keyvalue_kind(), "string");
        assert_eq!(CimType::DateTime.keyvalue_kind(), "string");
    }
}
