use std::fmt::{self, Display, Formatter};
use std::time::Duration;
use thiserror::Error;
use wbem_cimxml::CodecError;
use wbem_types::{CimInstance, CimStatusCode};

/// The closed set of error kinds surfaced by this crate.
///
/// Callers switch on the variant, not on message text. Transport-layer
/// retry policies are the only place failures are recovered silently;
/// everything else propagates with its kind preserved.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The connection could not be established or was lost: connection
    /// refused, DNS failure, TLS handshake or certificate failure, or a
    /// peer that closed mid-response
    #[error("connection error: {0}")]
    Connection(String),

    /// The per-operation read timeout was exhausted
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered HTTP 401 or 407
    #[error("authentication failed with HTTP status {status}")]
    Auth {
        /// the HTTP status code, 401 or 407
        status: u16,
    },

    /// A non-2xx HTTP response that is not an authentication failure,
    /// including redirect exhaustion
    #[error("HTTP error status {status}")]
    Http {
        /// the HTTP status code
        status: u16,
    },

    /// The response was well-formed XML but violated the CIM-XML DTD
    #[error("CIM-XML parse error: {0}")]
    CimXmlParse(String),

    /// The response was not well-formed XML
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// A required HTTP header was missing or invalid
    #[error("header parse error: {0}")]
    HeaderParse(String),

    /// The server returned an `ERROR` element with a CIM status code
    #[error(transparent)]
    Cim(#[from] CimError),

    /// The caller's cancellation token fired
    #[error("operation cancelled")]
    Cancelled,

    /// The enumeration session is closed or failed and accepts no
    /// further operations
    #[error("enumeration session {0}")]
    Session(&'static str),

    /// The request was rejected client-side before anything was sent
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// The CIM status code, when this is a server-reported CIM error.
    pub fn cim_status(&self) -> Option<CimStatusCode> {
        match self {
            Error::Cim(e) => e.status(),
            _ => None,
        }
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Syntax(message) => Error::XmlParse(message),
            CodecError::Schema(message) => Error::CimXmlParse(message),
            CodecError::Model(e) => Error::CimXmlParse(e.to_string()),
            _ => Error::CimXmlParse(e.to_string()),
        }
    }
}

/// A failure reported by the WBEM server through the CIM-XML `ERROR`
/// element.
///
/// The numeric code is kept raw so vendor-specific codes survive;
/// [`CimError::status`] maps the standard ones. Callers implement
/// policy on the code, e.g. tolerating `CIM_ERR_NOT_SUPPORTED`.
#[derive(Debug, Clone)]
pub struct CimError {
    /// The numeric CIM status code
    pub code: u32,
    /// The server's description, when sent
    pub description: Option<String>,
    /// `CIM_Error` instances with structured detail, when sent
    pub instances: Vec<CimInstance>,
    /// The operation that failed
    pub operation: &'static str,
}

impl CimError {
    /// The standard status code, when the numeric code is one.
    pub fn status(&self) -> Option<CimStatusCode> {
        CimStatusCode::try_from(self.code).ok()
    }

    /// True when the error carries the given standard status code.
    pub fn is(&self, status: CimStatusCode) -> bool {
        self.code == status.code()
    }
}

impl Display for CimError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.status() {
            Some(status) => write!(f, "{status} in {}", self.operation)?,
            None => write!(f, "CIM error {} in {}", self.code, self.operation)?,
        }
        if let Some(description) = &self.description {
            write!(f, ": {description}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CimError {}

/// This crate's result type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cim_error_display() {
        let error = CimError {
            code: 6,
            description: Some("no such instance".to_string()),
            instances: Vec::new(),
            operation: "GetInstance",
        };
        assert_eq!(
            error.to_string(),
            "CIM_ERR_NOT_FOUND (6) in GetInstance: no such instance"
        );
        assert!(error.is(CimStatusCode::NotFound));

        let vendor = CimError {
            code: 0xF001,
            description: None,
            instances: Vec::new(),
            operation: "GetInstance",
        };
        assert_eq!(vendor.status(), None);
        assert_eq!(vendor.to_string(), "CIM error 61441 in GetInstance");
    }

    #[test]
    fn codec_errors_keep_their_kind() {
        let syntax: Error = CodecError::Syntax("bad".into()).into();
        assert!(matches!(syntax, Error::XmlParse(_)));
        let schema: Error = CodecError::Schema("bad".into()).into();
        assert!(matches!(schema, Error::CimXmlParse(_)));
    }

    #[test]
    fn timeout_message_names_the_duration() {
        let error = Error::Timeout(Duration::from_secs(15));
        assert!(error.to_string().contains("15s"), "{error}");
    }
}
