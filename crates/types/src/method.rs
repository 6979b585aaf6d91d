use crate::{CimParameter, CimQualifier, CimType, NocaseMap};

/// A method declaration of a CIM class.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CimMethod {
    /// Method name
    pub name: String,
    /// Declared return type
    pub return_type: CimType,
    /// Parameter declarations, in declaration order
    pub parameters: NocaseMap<CimParameter>,
    /// The class that originally declared this method
    pub class_origin: Option<String>,
    /// Whether the method was propagated from a superclass
    pub propagated: Option<bool>,
    /// Qualifiers on this method
    pub qualifiers: NocaseMap<CimQualifier>,
}

impl CimMethod {
    /// A method with the given return type and no parameters.
    pub fn new(name: impl Into<String>, return_type: CimType) -> Self {
        Self {
            name: name.into(),
            return_type,
            parameters: NocaseMap::new(),
            class_origin: None,
            propagated: None,
            qualifiers: NocaseMap::new(),
        }
    }

    /// Adds a parameter declaration, keyed by its name.
    pub fn with_parameter(mut self, parameter: CimParameter) -> Self {
        self.parameters.insert(parameter.name.clone(), parameter);
        self
    }

    /// Sets the class origin.
    pub fn with_class_origin(mut self, class_origin: impl Into<String>) -> Self {
        self.class_origin = Some(class_origin.into());
        self
    }

    /// Sets the propagated flag.
    pub fn with_propagated(mut self, propagated: bool) -> Self {
        self.propagated = Some(propagated);
        self
    }

    /// Adds a qualifier, keyed by its name.
    pub fn with_qualifier(mut self, qualifier: CimQualifier) -> Self {
        self.qualifiers.insert(qualifier.name.clone(), qualifier);
        self
    }
}
