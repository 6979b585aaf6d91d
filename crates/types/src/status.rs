use std::fmt::{self, Debug, Display, Formatter};

/// CIM status codes, as carried by the `CODE` attribute of a response
/// `ERROR` element.
///
/// Servers may also return vendor-specific codes outside this set; those
/// fail `TryFrom` and are surfaced by callers as their raw number.
#[repr(u32)]
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub enum CimStatusCode {
    /// 1 `CIM_ERR_FAILED` — a general error occurred
    Failed = 1,
    /// 2 `CIM_ERR_ACCESS_DENIED` — access was not available to the client
    AccessDenied = 2,
    /// 3 `CIM_ERR_INVALID_NAMESPACE` — the target namespace does not exist
    InvalidNamespace = 3,
    /// 4 `CIM_ERR_INVALID_PARAMETER` — a parameter value was invalid
    InvalidParameter = 4,
    /// 5 `CIM_ERR_INVALID_CLASS` — the class does not exist in the namespace
    InvalidClass = 5,
    /// 6 `CIM_ERR_NOT_FOUND` — the requested object could not be found
    NotFound = 6,
    /// 7 `CIM_ERR_NOT_SUPPORTED` — the requested operation is not supported
    NotSupported = 7,
    /// 8 `CIM_ERR_CLASS_HAS_CHILDREN` — the class has subclasses
    ClassHasChildren = 8,
    /// 9 `CIM_ERR_CLASS_HAS_INSTANCES` — the class has instances
    ClassHasInstances = 9,
    /// 10 `CIM_ERR_INVALID_SUPERCLASS` — the superclass does not exist
    InvalidSuperclass = 10,
    /// 11 `CIM_ERR_ALREADY_EXISTS` — the object already exists
    AlreadyExists = 11,
    /// 12 `CIM_ERR_NO_SUCH_PROPERTY` — the property does not exist
    NoSuchProperty = 12,
    /// 13 `CIM_ERR_TYPE_MISMATCH` — the value is incompatible with the type
    TypeMismatch = 13,
    /// 14 `CIM_ERR_QUERY_LANGUAGE_NOT_SUPPORTED` — the query language is
    /// not recognized or supported
    QueryLanguageNotSupported = 14,
    /// 15 `CIM_ERR_INVALID_QUERY` — the query is not valid for the language
    InvalidQuery = 15,
    /// 16 `CIM_ERR_METHOD_NOT_AVAILABLE` — the method is not available
    MethodNotAvailable = 16,
    /// 17 `CIM_ERR_METHOD_NOT_FOUND` — the method does not exist
    MethodNotFound = 17,
    /// 20 `CIM_ERR_NAMESPACE_NOT_EMPTY` — the namespace is not empty
    NamespaceNotEmpty = 20,
    /// 21 `CIM_ERR_INVALID_ENUMERATION_CONTEXT` — the enumeration context
    /// is invalid or has expired
    InvalidEnumerationContext = 21,
    /// 22 `CIM_ERR_INVALID_OPERATION_TIMEOUT` — the requested operation
    /// timeout is not supported
    InvalidOperationTimeout = 22,
    /// 23 `CIM_ERR_PULL_HAS_BEEN_ABANDONED` — the pull sequence was
    /// abandoned
    PullHasBeenAbandoned = 23,
    /// 24 `CIM_ERR_PULL_CANNOT_BE_ABANDONED` — the pull sequence cannot be
    /// abandoned
    PullCannotBeAbandoned = 24,
    /// 25 `CIM_ERR_FILTERED_ENUMERATION_NOT_SUPPORTED` — filtered
    /// enumerations are not supported
    FilteredEnumerationNotSupported = 25,
    /// 26 `CIM_ERR_CONTINUATION_ON_ERROR_NOT_SUPPORTED` — continue-on-error
    /// is not supported
    ContinuationOnErrorNotSupported = 26,
    /// 27 `CIM_ERR_SERVER_LIMITS_EXCEEDED` — a server limit was exceeded
    ServerLimitsExceeded = 27,
    /// 28 `CIM_ERR_SERVER_IS_SHUTTING_DOWN` — the server is shutting down
    ServerIsShuttingDown = 28,
}

impl CimStatusCode {
    /// The `CIM_ERR_*` name of the code.
    pub fn name(self) -> &'static str {
        match self {
            CimStatusCode::Failed => "CIM_ERR_FAILED",
            CimStatusCode::AccessDenied => "CIM_ERR_ACCESS_DENIED",
            CimStatusCode::InvalidNamespace => "CIM_ERR_INVALID_NAMESPACE",
            CimStatusCode::InvalidParameter => "CIM_ERR_INVALID_PARAMETER",
            CimStatusCode::InvalidClass => "CIM_ERR_INVALID_CLASS",
            CimStatusCode::NotFound => "CIM_ERR_NOT_FOUND",
            CimStatusCode::NotSupported => "CIM_ERR_NOT_SUPPORTED",
            CimStatusCode::ClassHasChildren => "CIM_ERR_CLASS_HAS_CHILDREN",
            CimStatusCode::ClassHasInstances => "CIM_ERR_CLASS_HAS_INSTANCES",
            CimStatusCode::InvalidSuperclass => "CIM_ERR_INVALID_SUPERCLASS",
            CimStatusCode::AlreadyExists => "CIM_ERR_ALREADY_EXISTS",
            CimStatusCode::NoSuchProperty => "CIM_ERR_NO_SUCH_PROPERTY",
            CimStatusCode::TypeMismatch => "CIM_ERR_TYPE_MISMATCH",
            CimStatusCode::QueryLanguageNotSupported => "CIM_ERR_QUERY_LANGUAGE_NOT_SUPPORTED",
            CimStatusCode::InvalidQuery => "CIM_ERR_INVALID_QUERY",
            CimStatusCode::MethodNotAvailable => "CIM_ERR_METHOD_NOT_AVAILABLE",
            CimStatusCode::MethodNotFound => "CIM_ERR_METHOD_NOT_FOUND",
            CimStatusCode::NamespaceNotEmpty => "CIM_ERR_NAMESPACE_NOT_EMPTY",
            CimStatusCode::InvalidEnumerationContext => "CIM_ERR_INVALID_ENUMERATION_CONTEXT",
            CimStatusCode::InvalidOperationTimeout => "CIM_ERR_INVALID_OPERATION_TIMEOUT",
            CimStatusCode::PullHasBeenAbandoned => "CIM_ERR_PULL_HAS_BEEN_ABANDONED",
            CimStatusCode::PullCannotBeAbandoned => "CIM_ERR_PULL_CANNOT_BE_ABANDONED",
            CimStatusCode::FilteredEnumerationNotSupported => {
                "CIM_ERR_FILTERED_ENUMERATION_NOT_SUPPORTED"
            }
            CimStatusCode::ContinuationOnErrorNotSupported => {
                "CIM_ERR_CONTINUATION_ON_ERROR_NOT_SUPPORTED"
            }
            CimStatusCode::ServerLimitsExceeded => "CIM_ERR_SERVER_LIMITS_EXCEEDED",
            CimStatusCode::ServerIsShuttingDown => "CIM_ERR_SERVER_IS_SHUTTING_DOWN",
        }
    }

    /// The numeric code.
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for CimStatusCode {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, u32> {
        match code {
            1 => Ok(CimStatusCode::Failed),
            2 => Ok(CimStatusCode::AccessDenied),
            3 => Ok(CimStatusCode::InvalidNamespace),
            4 => Ok(CimStatusCode::InvalidParameter),
            5 => Ok(CimStatusCode::InvalidClass),
            6 => Ok(CimStatusCode::NotFound),
            7 => Ok(CimStatusCode::NotSupported),
            8 => Ok(CimStatusCode::ClassHasChildren),
            9 => Ok(CimStatusCode::ClassHasInstances),
            10 => Ok(CimStatusCode::InvalidSuperclass),
            11 => Ok(CimStatusCode::AlreadyExists),
            12 => Ok(CimStatusCode::NoSuchProperty),
            13 => Ok(CimStatusCode::TypeMismatch),
            14 => Ok(CimStatusCode::QueryLanguageNotSupported),
            15 => Ok(CimStatusCode::InvalidQuery),
            16 => Ok(CimStatusCode::MethodNotAvailable),
            17 => Ok(CimStatusCode::MethodNotFound),
            20 => Ok(CimStatusCode::NamespaceNotEmpty),
            21 => Ok(CimStatusCode::InvalidEnumerationContext),
            22 => Ok(CimStatusCode::InvalidOperationTimeout),
            23 => Ok(CimStatusCode::PullHasBeenAbandoned),
            24 => Ok(CimStatusCode::PullCannotBeAbandoned),
            25 => Ok(CimStatusCode::FilteredEnumerationNotSupported),
            26 => Ok(CimStatusCode::ContinuationOnErrorNotSupported),
            27 => Ok(CimStatusCode::ServerLimitsExceeded),
            28 => Ok(CimStatusCode::ServerIsShuttingDown),
            other => Err(other),
        }
    }
}

impl Display for CimStatusCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

impl Debug for CimStatusCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_round_trip() {
        for code in [1u32, 2, 6, 7, 11, 17, 20, 26, 28] {
            assert_eq!(CimStatusCode::try_from(code).unwrap().code(), code);
        }
    }

    #[test]
    fn unassigned_codes_rejected() {
        assert_eq!(CimStatusCode::try_from(0), Err(0));
        assert_eq!(CimStatusCode::try_from(18), Err(18));
        assert_eq!(CimStatusCode::try_from(19), Err(19));
        assert_eq!(CimStatusCode::try_from(29), Err(29));
        assert_eq!(CimStatusCode::try_from(0xF000), Err(0xF000));
    }

    #[test]
    fn display_names() {
        assert_eq!(
            CimStatusCode::NotFound.to_string(),
            "CIM_ERR_NOT_FOUND (6)"
        );
    }
}
