use crate::{CimClassName, CimMethod, CimProperty, CimQualifier, NocaseMap, Result};
use std::hash::{Hash, Hasher};

fn fold(s: &str) -> String {
    s.chars().flat_map(char::to_lowercase).collect()
}

/// A CIM class declaration: name, optional superclass, property and
/// method declarations, qualifiers, and optionally the path it was
/// retrieved from.
///
/// Class and superclass names compare case-insensitively.
#[derive(Clone, Debug, Default)]
pub struct CimClass {
    /// Class name
    pub classname: String,
    /// Direct superclass name, when the class has one
    pub superclass: Option<String>,
    /// Property declarations, in declaration order
    pub properties: NocaseMap<CimProperty>,
    /// Method declarations, in declaration order
    pub methods: NocaseMap<CimMethod>,
    /// Qualifiers on the class
    pub qualifiers: NocaseMap<CimQualifier>,
    /// The path this class was retrieved from, when known
    pub path: Option<CimClassName>,
}

impl CimClass {
    /// A class of the given name with no members yet.
    pub fn new(classname: impl Into<String>) -> Self {
        Self {
            classname: classname.into(),
            superclass: None,
            properties: NocaseMap::new(),
            methods: NocaseMap::new(),
            qualifiers: NocaseMap::new(),
            path: None,
        }
    }

    /// Sets the superclass name.
    pub fn with_superclass(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    /// Adds a property declaration, keyed by its name.
    pub fn with_property(mut self, property: CimProperty) -> Self {
        self.properties.insert(property.name.clone(), property);
        self
    }

    /// Adds a method declaration, keyed by its name.
    pub fn with_method(mut self, method: CimMethod) -> Self {
        self.methods.insert(method.name.clone(), method);
        self
    }

    /// Adds a qualifier, keyed by its name.
    pub fn with_qualifier(mut self, qualifier: CimQualifier) -> Self {
        self.qualifiers.insert(qualifier.name.clone(), qualifier);
        self
    }

    /// Checks the invariants of every property declaration.
    pub fn validate(&self) -> Result<()> {
        for property in self.properties.values() {
            property.validate()?;
        }
        Ok(())
    }
}

impl PartialEq for CimClass {
    fn eq(&self, other: &Self) -> bool {
        let superclass_eq = match (&self.superclass, &other.superclass) {
            (Some(a), Some(b)) => fold(a) == fold(b),
            (None, None) => true,
            _ => false,
        };
        fold(&self.classname) == fold(&other.classname)
            && superclass_eq
            && self.properties == other.properties
            && self.methods == other.methods
            && self.qualifiers == other.qualifiers
            && self.path == other.path
    }
}

impl Eq for CimClass {}

impl Hash for CimClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        fold(&self.classname).hash(state);
        self.superclass.as_deref().map(fold).hash(state);
        self.properties.hash(state);
        self.methods.hash(state);
        self.qualifiers.hash(state);
        self.path.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CimParameter, CimType};

    #[test]
    fn builder_and_lookup() {
        let class = CimClass::new("CIM_Foo")
            .with_superclass("CIM_Base")
            .with_property(CimProperty::null("Name", CimType::String))
            .with_method(
                CimMethod::new("Reset", CimType::Uint32)
                    .with_parameter(CimParameter::new("Force", CimType::Boolean)),
            );
        assert!(class.properties.contains_key("name"));
        assert_eq!(
            class.methods.get("RESET").unwrap().return_type,
            CimType::Uint32
        );
    }

    #[test]
    fn superclass_case_insensitive_equality() {
        let a = CimClass::new("CIM_Foo").with_superclass("CIM_Base");
        let b = CimClass::new("cim_foo").with_superclass("cim_base");
        assert_eq!(a, b);
    }
}
