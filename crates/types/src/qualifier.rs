use crate::{CimType, CimValue};

/// A qualifier attached to a class, property, method, or parameter.
///
/// Qualifiers are typed name/value annotations; the flavor flags control
/// how they propagate through the class hierarchy. Flags are tri-state:
/// `None` means the server did not state them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CimQualifier {
    /// Qualifier name
    pub name: String,
    /// Value; `None` is a typed null
    pub value: Option<CimValue>,
    /// CIM type tag, kept even when the value is null
    pub ty: CimType,
    /// Whether the qualifier was propagated from a superclass
    pub propagated: Option<bool>,
    /// Flavor: may subclasses override the value
    pub overridable: Option<bool>,
    /// Flavor: does the qualifier propagate to subclasses
    pub tosubclass: Option<bool>,
    /// Flavor: does the qualifier propagate to instances (deprecated in
    /// the standard but still seen on the wire)
    pub toinstance: Option<bool>,
    /// Flavor: is the value translatable
    pub translatable: Option<bool>,
}

impl CimQualifier {
    /// A qualifier with a value; the type tag is taken from the value.
    pub fn new(name: impl Into<String>, value: impl Into<CimValue>) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            ty: value.cim_type(),
            value: Some(value),
            propagated: None,
            overridable: None,
            tosubclass: None,
            toinstance: None,
            translatable: None,
        }
    }

    /// A qualifier with a typed null value.
    pub fn null(name: impl Into<String>, ty: CimType) -> Self {
        Self {
            name: name.into(),
            value: None,
            ty,
            propagated: None,
            overridable: None,
            tosubclass: None,
            toinstance: None,
            translatable: None,
        }
    }

    /// Sets the propagated flag.
    pub fn with_propagated(mut self, propagated: bool) -> Self {
        self.propagated = Some(propagated);
        self
    }

    /// Sets the overridable flavor.
    pub fn with_overridable(mut self, overridable: bool) -> Self {
        self.overridable = Some(overridable);
        self
    }

    /// Sets the tosubclass flavor.
    pub fn with_tosubclass(mut self, tosubclass: bool) -> Self {
        self.tosubclass = Some(tosubclass);
        self
    }

    /// Sets the toinstance flavor.
    pub fn with_toinstance(mut self, toinstance: bool) -> Self {
        self.toinstance = Some(toinstance);
        self
    }

    /// Sets the translatable flavor.
    pub fn with_translatable(mut self, translatable: bool) -> Self {
        self.translatable = Some(translatable);
        self
    }
}

/// The set of meta-element scopes a qualifier declaration applies to.
///
/// `any` subsumes the rest when set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct Scopes {
    pub any: bool,
    pub class: bool,
    pub association: bool,
    pub indication: bool,
    pub property: bool,
    pub reference: bool,
    pub method: bool,
    pub parameter: bool,
}

impl Scopes {
    /// The scope set containing only `any`.
    pub fn any() -> Self {
        Self {
            any: true,
            ..Self::default()
        }
    }

    /// Sets a scope by its MOF/XML name. Unknown names are rejected.
    pub fn set(&mut self, name: &str, value: bool) -> bool {
        let slot = match () {
            _ if name.eq_ignore_ascii_case("any") => &mut self.any,
            _ if name.eq_ignore_ascii_case("class") => &mut self.class,
            _ if name.eq_ignore_ascii_case("association") => &mut self.association,
            _ if name.eq_ignore_ascii_case("indication") => &mut self.indication,
            _ if name.eq_ignore_ascii_case("property") => &mut self.property,
            _ if name.eq_ignore_ascii_case("reference") => &mut self.reference,
            _ if name.eq_ignore_ascii_case("method") => &mut self.method,
            _ if name.eq_ignore_ascii_case("parameter") => &mut self.parameter,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Iterates the names of the enabled scopes, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        [
            ("any", self.any),
            ("class", self.class),
            ("association", self.association),
            ("indication", self.indication),
            ("property", self.property),
            ("reference", self.reference),
            ("method", self.method),
            ("parameter", self.parameter),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
    }

    /// True when no scope is set.
    pub fn is_empty(&self) -> bool {
        self.names().next().is_none()
    }
}

/// The declaration of a qualifier type, as managed by the qualifier
/// operations (`GetQualifier`, `SetQualifier`, ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CimQualifierDeclaration {
    /// Qualifier name
    pub name: String,
    /// Declared CIM type
    pub ty: CimType,
    /// Default value; `None` is a typed null
    pub value: Option<CimValue>,
    /// Whether the qualifier is array-valued
    pub is_array: bool,
    /// Fixed array size, when declared
    pub array_size: Option<u32>,
    /// The meta-elements the qualifier may be applied to
    pub scopes: Scopes,
    /// Flavor: may subclasses override the value
    pub overridable: Option<bool>,
    /// Flavor: does the qualifier propagate to subclasses
    pub tosubclass: Option<bool>,
    /// Flavor: does the qualifier propagate to instances
    pub toinstance: Option<bool>,
    /// Flavor: is the value translatable
    pub translatable: Option<bool>,
}

impl CimQualifierDeclaration {
    /// A declaration of the given name and type with no default value.
    pub fn new(name: impl Into<String>, ty: CimType) -> Self {
        Self {
            name: name.into(),
            ty,
            value: None,
            is_array: false,
            array_size: None,
            scopes: Scopes::default(),
            overridable: None,
            tosubclass: None,
            toinstance: None,
            translatable: None,
        }
    }

    /// Sets the default value; the type tag must already match.
    pub fn with_value(mut self, value: impl Into<CimValue>) -> Self {
        let value = value.into();
        self.is_array = value.is_array();
        self.ty = value.cim_type();
        self.value = Some(value);
        self
    }

    /// Marks the declaration array-valued.
    pub fn with_array(mut self, array_size: Option<u32>) -> Self {
        self.is_array = true;
        self.array_size = array_size;
        self
    }

    /// Sets the scope set.
    pub fn with_scopes(mut self, scopes: Scopes) -> Self {
        self.scopes = scopes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifier_infers_type() {
        let q = CimQualifier::new("Key", true);
        assert_eq!(q.ty, CimType::Boolean);
        assert_eq!(q.value, Some(CimValue::Boolean(true)));
    }

    #[test]
    fn null_keeps_type() {
        let q = CimQualifier::null("Description", CimType::String);
        assert_eq!(q.ty, CimType::String);
        assert_eq!(q.value, None);
    }

    #[test]
    fn scope_names_round_trip() {
        let mut scopes = Scopes::default();
        assert!(scopes.set("Property", true));
        assert!(scopes.set("REFERENCE", true));
        assert!(!scopes.set("bogus", true));
        assert_eq!(scopes.names().collect::<Vec<_>>(), ["property", "reference"]);
    }
}
