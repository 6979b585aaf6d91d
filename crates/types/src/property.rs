use crate::{
    CimInstanceName, CimQualifier, CimType, CimValue, ModelError, NocaseMap, Result,
};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// How a string property embeds a serialized CIM object.
///
/// The wire carries `EmbeddedObject="instance"` for embedded instances
/// and `EmbeddedObject="object"` for embedded instances-or-classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EmbeddedObjectKind {
    /// `EmbeddedObject="instance"`
    Instance,
    /// `EmbeddedObject="object"`
    Object,
}

impl EmbeddedObjectKind {
    /// The wire attribute value.
    pub fn as_str(self) -> &'static str {
        match self {
            EmbeddedObjectKind::Instance => "instance",
            EmbeddedObjectKind::Object => "object",
        }
    }
}

impl Display for EmbeddedObjectKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddedObjectKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "instance" => Ok(EmbeddedObjectKind::Instance),
            "object" => Ok(EmbeddedObjectKind::Object),
            other => Err(ModelError::UnknownType(other.to_string())),
        }
    }
}

/// A property of an instance or a property declaration of a class.
///
/// The type tag is kept separately from the value so null slots stay
/// typed. Invariants: `reference_class` only with [`CimType::Reference`],
/// `embedded_object` only with [`CimType::String`], value type and
/// arrayness consistent with the declared tag; [`CimProperty::validate`]
/// checks all three, and the encoder refuses to emit violating
/// properties.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CimProperty {
    /// Property name
    pub name: String,
    /// Value; `None` is a typed null
    pub value: Option<CimValue>,
    /// CIM type tag (element type for arrays)
    pub ty: CimType,
    /// Whether the slot is array-valued
    pub is_array: bool,
    /// Fixed array size, when declared
    pub array_size: Option<u32>,
    /// For reference properties: the declared class of the target
    pub reference_class: Option<String>,
    /// For string properties that carry a serialized CIM object
    pub embedded_object: Option<EmbeddedObjectKind>,
    /// The class that originally declared this property
    pub class_origin: Option<String>,
    /// Whether the property was propagated from a superclass
    pub propagated: Option<bool>,
    /// Qualifiers on this property
    pub qualifiers: NocaseMap<CimQualifier>,
}

impl CimProperty {
    /// A property with a value; type tag and arrayness are taken from
    /// the value.
    pub fn new(name: impl Into<String>, value: impl Into<CimValue>) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            ty: value.cim_type(),
            is_array: value.is_array(),
            value: Some(value),
            array_size: None,
            reference_class: None,
            embedded_object: None,
            class_origin: None,
            propagated: None,
            qualifiers: NocaseMap::new(),
        }
    }

    /// A property with a typed null value.
    pub fn null(name: impl Into<String>, ty: CimType) -> Self {
        Self {
            name: name.into(),
            value: None,
            ty,
            is_array: false,
            array_size: None,
            reference_class: None,
            embedded_object: None,
            class_origin: None,
            propagated: None,
            qualifiers: NocaseMap::new(),
        }
    }

    /// A reference property pointing at `path`.
    pub fn reference(
        name: impl Into<String>,
        path: CimInstanceName,
        reference_class: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: Some(CimValue::Reference(Box::new(path))),
            ty: CimType::Reference,
            is_array: false,
            array_size: None,
            reference_class,
            embedded_object: None,
            class_origin: None,
            propagated: None,
            qualifiers: NocaseMap::new(),
        }
    }

    /// Marks a null property as array-valued.
    pub fn with_array(mut self, array_size: Option<u32>) -> Self {
        self.is_array = true;
        self.array_size = array_size;
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

    /// Replaces the value, rejecting type or arrayness mismatches with
    /// the declared tag.
    pub fn set_value(&mut self, value: Option<CimValue>) -> Result<()> {
        if let Some(v) = &value {
            if v.cim_type() != self.ty {
                return Err(ModelError::TypeMismatch {
                    expected: self.ty,
                    found: v.cim_type(),
                });
            }
            if v.is_array() != self.is_array {
                return Err(ModelError::ArrayMismatch {
                    declared_array: self.is_array,
                });
            }
        }
        self.value = value;
        Ok(())
    }

    /// Checks the cross-field invariants.
    pub fn validate(&self) -> Result<()> {
        if self.reference_class.is_some() && self.ty != CimType::Reference {
            return Err(ModelError::ReferenceClassOnNonReference(self.ty));
        }
        if self.embedded_object.is_some() && self.ty != CimType::String {
            return Err(ModelError::EmbeddedObjectOnNonString(self.ty));
        }
        if let Some(v) = &self.value {
            if v.cim_type() != self.ty {
                return Err(ModelError::TypeMismatch {
                    expected: self.ty,
                    found: v.cim_type(),
                });
            }
            if v.is_array() != self.is_array {
                return Err(ModelError::ArrayMismatch {
                    declared_array: self.is_array,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_constructor_infers_tag() {
        let p = CimProperty::new("Count", 3u32);
        assert_eq!(p.ty, CimType::Uint32);
        assert!(!p.is_array);

        let p = CimProperty::new("Names", vec!["a", "b"]);
        assert_eq!(p.ty, CimType::String);
        assert!(p.is_array);
    }

    #[test]
    fn set_value_enforces_tag() {
        let mut p = CimProperty::null("Count", CimType::Uint32);
        assert!(p.set_value(Some(CimValue::Uint32(1))).is_ok());
        assert!(p.set_value(Some(CimValue::String("x".into()))).is_err());
        assert!(p.set_value(Some(CimValue::from(vec![1u32]))).is_err());
        assert!(p.set_value(None).is_ok());
        assert_eq!(p.ty, CimType::Uint32);
    }

    #[test]
    fn validate_rejects_misflagged_slots() {
        let mut p = CimProperty::new("Name", "x");
        p.reference_class = Some("CIM_Foo".into());
        assert!(matches!(
            p.validate(),
            Err(ModelError::ReferenceClassOnNonReference(CimType::String))
        ));

        let mut p = CimProperty::new("Count", 1u32);
        p.embedded_object = Some(EmbeddedObjectKind::Instance);
        assert!(matches!(
            p.validate(),
            Err(ModelError::EmbeddedObjectOnNonString(CimType::Uint32))
        ));
    }

    #[test]
    fn reference_property_validates() {
        let path = CimInstanceName::with_keybindings("CIM_Bar", [("ID", 1u64)]);
        let p = CimProperty::reference("Target", path, Some("CIM_Bar".into()));
        assert!(p.validate().is_ok());
    }
}
