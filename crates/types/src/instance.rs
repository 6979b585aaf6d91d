use crate::{CimInstanceName, CimProperty, CimQualifier, CimValue, NocaseMap, Result};
use std::hash::{Hash, Hasher};

/// A CIM instance: class name, ordered properties, and optionally the
/// path it was retrieved from.
///
/// Properties form an ordered, case-insensitively keyed collection; each
/// property's stored name equals its key. Two instances are equal when
/// class name (case-insensitively), properties, qualifiers, and path are
/// all equal.
///
/// ```
/// use wbem_types::{CimInstance, CimValue};
///
/// let inst = CimInstance::new("PyWBEM_Person")
///     .with_property("Name", "Fritz")
///     .with_property("Address", "Fritz Town");
/// assert_eq!(inst.property_value("name"), Some(&CimValue::from("Fritz")));
/// ```
#[derive(Clone, Debug, Default)]
pub struct CimInstance {
    /// Name of the creation class
    pub classname: String,
    /// Properties, in server order
    pub properties: NocaseMap<CimProperty>,
    /// Qualifiers on the instance (deprecated in the standard but still
    /// delivered by older servers)
    pub qualifiers: NocaseMap<CimQualifier>,
    /// The path this instance was retrieved from, when known
    pub path: Option<CimInstanceName>,
}

impl CimInstance {
    /// An instance of the named class with no properties yet.
    pub fn new(classname: impl Into<String>) -> Self {
        Self {
            classname: classname.into(),
            properties: NocaseMap::new(),
            qualifiers: NocaseMap::new(),
            path: None,
        }
    }

    /// Adds a property with a value, keyed by the given name.
    pub fn with_property(mut self, name: &str, value: impl Into<CimValue>) -> Self {
        self.properties
            .insert(name, CimProperty::new(name, value));
        self
    }

    /// Adds a full property object, keyed by its own name.
    pub fn add_property(&mut self, property: CimProperty) {
        self.properties.insert(property.name.clone(), property);
    }

    /// Sets the instance path.
    pub fn with_path(mut self, path: CimInstanceName) -> Self {
        self.path = Some(path);
        self
    }

    /// The value of the named property, if present and non-null.
    pub fn property_value(&self, name: &str) -> Option<&CimValue> {
        self.properties.get(name)?.value.as_ref()
    }

    /// Replaces the value of an existing property, enforcing its type
    /// tag, or inserts a new property when the name is unknown.
    pub fn set_property(&mut self, name: &str, value: impl Into<CimValue>) -> Result<()> {
        let value = value.into();
        match self.properties.get_mut(name) {
            Some(property) => property.set_value(Some(value)),
            None => {
                self.properties.insert(name, CimProperty::new(name, value));
                Ok(())
            }
        }
    }

    /// Checks the invariants of every property.
    pub fn validate(&self) -> Result<()> {
        for property in self.properties.values() {
            property.validate()?;
        }
        if let Some(path) = &self.path {
            path.validate()?;
        }
        Ok(())
    }
}

impl PartialEq for CimInstance {
    fn eq(&self, other: &Self) -> bool {
        self.classname
            .chars()
            .flat_map(char::to_lowercase)
            .eq(other.classname.chars().flat_map(char::to_lowercase))
            && self.properties == other.properties
            && self.qualifiers == other.qualifiers
            && self.path == other.path
    }
}

impl Eq for CimInstance {}

impl Hash for CimInstance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.classname
            .chars()
            .flat_map(char::to_lowercase)
            .collect::<String>()
            .hash(state);
        self.properties.hash(state);
        self.qualifiers.hash(state);
        self.path.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CimType;
    use pretty_assertions::assert_eq;

    #[test]
    fn property_order_and_lookup() {
        let inst = CimInstance::new("CIM_Foo")
            .with_property("Zeta", 1u32)
            .with_property("Alpha", 2u32);
        assert_eq!(
            inst.properties.keys().collect::<Vec<_>>(),
            ["Zeta", "Alpha"]
        );
        assert_eq!(inst.property_value("ALPHA"), Some(&CimValue::Uint32(2)));
    }

    #[test]
    fn set_property_enforces_existing_type() {
        let mut inst = CimInstance::new("CIM_Foo").with_property("Count", 1u32);
        assert!(inst.set_property("count", 2u32).is_ok());
        assert!(inst.set_property("count", "nope").is_err());
        assert!(inst.set_property("Fresh", "ok").is_ok());
        assert_eq!(inst.properties.get("count").unwrap().ty, CimType::Uint32);
    }

    #[test]
    fn equality_ignores_classname_case() {
        let a = CimInstance::new("CIM_Foo").with_property("N", 1u8);
        let mut b = CimInstance::new("cim_foo").with_property("n", 1u8);
        // classname casing differs in both places
        b.classname = "cim_FOO".into();
        assert_eq!(a, b);
    }
}
