use crate::CimType;
use thiserror::Error;

/// Errors raised while constructing or converting CIM model values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModelError {
    /// A string did not name a CIM data type
    #[error("not a CIM data type: {0:?}")]
    UnknownType(String),

    /// A value did not match the CIM type tag of its slot
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// the declared CIM type of the slot
        expected: CimType,
        /// the CIM type of the offered value
        found: CimType,
    },

    /// A scalar value was supplied where an array was declared, or vice versa
    #[error("array mismatch: slot declares array = {declared_array}")]
    ArrayMismatch {
        /// whether the slot declares an array
        declared_array: bool,
    },

    /// A string could not be converted to a value of the given CIM type
    #[error("cannot parse {text:?} as {ty}")]
    ValueParse {
        /// target CIM type
        ty: CimType,
        /// offending text
        text: String,
    },

    /// A datetime string violated the 25-character wire grammar
    #[error("malformed CIM datetime {0:?}")]
    DateTimeFormat(String),

    /// A datetime component was outside its permitted range
    #[error("CIM datetime component out of range: {0}")]
    DateTimeRange(&'static str),

    /// A WBEM URI could not be parsed
    #[error("malformed WBEM URI at byte {position}: {reason}")]
    UriParse {
        /// byte offset of the failure in the input
        position: usize,
        /// what was expected there
        reason: &'static str,
    },

    /// `reference_class` is only meaningful on reference-typed slots
    #[error("reference class set on non-reference {0} slot")]
    ReferenceClassOnNonReference(CimType),

    /// The embedded-object flag is only meaningful on string-typed slots
    #[error("embedded object flag set on non-string {0} slot")]
    EmbeddedObjectOnNonString(CimType),

    /// Keybinding values are limited to primitive CIM values
    #[error("keybinding {0:?} has a non-primitive value")]
    InvalidKeybinding(String),
}

/// This crate's result type.
pub type Result<T, E = ModelError> = std::result::Result<T, E>;
