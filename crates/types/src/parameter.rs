use crate::{CimQualifier, CimType, NocaseMap};

/// A parameter declaration of a CIM method.
///
/// Declarations carry no value; values travel separately in method
/// invocations as name/value pairs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CimParameter {
    /// Parameter name
    pub name: String,
    /// Declared CIM type
    pub ty: CimType,
    /// Whether the parameter is array-valued
    pub is_array: bool,
    /// Fixed array size, when declared
    pub array_size: Option<u32>,
    /// For reference parameters: the declared class of the target
    pub reference_class: Option<String>,
    /// Qualifiers on this parameter (`IN`, `OUT`, ...)
    pub qualifiers: NocaseMap<CimQualifier>,
}

impl CimParameter {
    /// A scalar parameter of the given type.
    pub fn new(name: impl Into<String>, ty: CimType) -> Self {
        Self {
            name: name.into(),
            ty,
            is_array: false,
            array_size: None,
            reference_class: None,
            qualifiers: NocaseMap::new(),
        }
    }

    /// Marks the parameter array-valued.
    pub fn with_array(mut self, array_size: Option<u32>) -> Self {
        self.is_array = true;
        self.array_size = array_size;
        self
    }

    /// Sets the reference class (reference-typed parameters only).
    pub fn with_reference_class(mut self, reference_class: impl Into<String>) -> Self {
        self.reference_class = Some(reference_class.into());
        self
    }

    /// Adds a qualifier, keyed by its name.
    pub fn with_qualifier(mut self, qualifier: CimQualifier) -> Self {
        self.qualifiers.insert(qualifier.name.clone(), qualifier);
        self
    }
}
