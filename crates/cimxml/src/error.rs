use thiserror::Error;
use wbem_types::ModelError;

/// Errors raised by the CIM-XML codec.
///
/// The two XML variants are deliberately distinct: [`CodecError::Syntax`]
/// is a lower-level XML well-formedness failure, while
/// [`CodecError::Schema`] is a well-formed document that violates the
/// CIM-XML DTD. Callers surface them as different error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodecError {
    /// The payload is not well-formed XML
    #[error("XML syntax error: {0}")]
    Syntax(String),

    /// The payload is well-formed XML but not valid CIM-XML
    #[error("CIM-XML schema violation: {0}")]
    Schema(String),

    /// A typed value inside the payload could not be converted
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl CodecError {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        CodecError::Schema(message.into())
    }
}

/// This crate's result type.
pub type Result<T, E = CodecError> = std::result::Result<T, E>;
