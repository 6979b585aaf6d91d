use crate::{uri, CimValue, ModelError, NocaseMap, Result};
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

fn fold(s: &str) -> String {
    s.chars().flat_map(char::to_lowercase).collect()
}

fn eq_nocase(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

fn eq_nocase_opt(a: &Option<String>, b: &Option<String>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => eq_nocase(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// The path of a CIM instance: class name, keybindings, and optionally
/// the namespace and host the instance lives in.
///
/// Class name and host compare case-insensitively, the namespace
/// case-sensitively, and the keybindings as a case-insensitively keyed
/// mapping of typed values. An instance path appears standalone (as an
/// operation target or result) and embedded (as a reference value inside
/// a property or keybinding).
///
/// `Display` renders the canonical WBEM URI; [`FromStr`] parses it back.
#[derive(Clone, Debug, Default)]
pub struct CimInstanceName {
    /// Name of the class this path identifies an instance of
    pub classname: String,
    /// Key property values, in server order
    pub keybindings: NocaseMap<CimValue>,
    /// Namespace, e.g. `root/cimv2`, when known
    pub namespace: Option<String>,
    /// Host (and optional port), when the path crosses servers
    pub host: Option<String>,
}

impl CimInstanceName {
    /// A path for the named class with no keybindings yet.
    pub fn new(classname: impl Into<String>) -> Self {
        Self {
            classname: classname.into(),
            keybindings: NocaseMap::new(),
            namespace: None,
            host: None,
        }
    }

    /// Builds a path with keybindings in one expression.
    pub fn with_keybindings<I, S, V>(classname: impl Into<String>, keybindings: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: Into<CimValue>,
    {
        Self {
            classname: classname.into(),
            keybindings: keybindings
                .into_iter()
                .map(|(k, v)| (k, v.into()))
                .collect(),
            namespace: None,
            host: None,
        }
    }

    /// Sets the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Checks that every keybinding value is a primitive (scalar, not
    /// array) CIM value, as instance paths require.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in &self.keybindings {
            if value.is_array() {
                return Err(ModelError::InvalidKeybinding(name.to_string()));
            }
        }
        Ok(())
    }

    /// The canonical WBEM URI, keybindings sorted case-insensitively.
    pub fn to_wbem_uri(&self) -> String {
        uri::instance_name_to_uri(self)
    }

    /// Parses a WBEM URI produced by [`CimInstanceName::to_wbem_uri`].
    pub fn from_wbem_uri(s: &str) -> Result<Self> {
        uri::instance_name_from_uri(s)
    }
}

impl PartialEq for CimInstanceName {
    fn eq(&self, other: &Self) -> bool {
        eq_nocase(&self.classname, &other.classname)
            && eq_nocase_opt(&self.host, &other.host)
            && self.namespace == other.namespace
            && self.keybindings == other.keybindings
    }
}

impl Eq for CimInstanceName {}

impl Hash for CimInstanceName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        fold(&self.classname).hash(state);
        self.host.as_deref().map(fold).hash(state);
        self.namespace.hash(state);
        self.keybindings.hash(state);
    }
}

impl Display for CimInstanceName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wbem_uri())
    }
}

impl FromStr for CimInstanceName {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_wbem_uri(s)
    }
}

/// The path of a CIM class: class name plus optional namespace and host.
///
/// Class name and host compare case-insensitively, the namespace
/// case-sensitively.
#[derive(Clone, Debug, Default)]
pub struct CimClassName {
    /// The class name
    pub classname: String,
    /// Namespace, when known
    pub namespace: Option<String>,
    /// Host, when the path crosses servers
    pub host: Option<String>,
}

impl CimClassName {
    /// A path for the named class.
    pub fn new(classname: impl Into<String>) -> Self {
        Self {
            classname: classname.into(),
            namespace: None,
            host: None,
        }
    }

    /// Sets the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// The WBEM URI form of this class path.
    pub fn to_wbem_uri(&self) -> String {
        uri::class_name_to_uri(self)
    }
}

impl PartialEq for CimClassName {
    fn eq(&self, other: &Self) -> bool {
        eq_nocase(&self.classname, &other.classname)
            && eq_nocase_opt(&self.host, &other.host)
            && self.namespace == other.namespace
    }
}

impl Eq for CimClassName {}

impl Hash for CimClassName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        fold(&self.classname).hash(state);
        self.host.as_deref().map(fold).hash(state);
        self.namespace.hash(state);
    }
}

impl Display for CimClassName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wbem_uri())
    }
}

impl From<&str> for CimClassName {
    fn from(classname: &str) -> Self {
        Self::new(classname)
    }
}

/// The target of an association or reference operation: either a class
/// path or an instance path. The server answers with classes for class
/// targets and instances for instance targets.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjectName {
    /// A class path target
    Class(CimClassName),
    /// An instance path target
    Instance(CimInstanceName),
}

impl ObjectName {
    /// The class name component of either variant.
    pub fn classname(&self) -> &str {
        match self {
            ObjectName::Class(c) => &c.classname,
            ObjectName::Instance(i) => &i.classname,
        }
    }

    /// The namespace component of either variant.
    pub fn namespace(&self) -> Option<&str> {
        match self {
            ObjectName::Class(c) => c.namespace.as_deref(),
            ObjectName::Instance(i) => i.namespace.as_deref(),
        }
    }

    /// True for the instance-path variant.
    pub fn is_instance(&self) -> bool {
        matches!(self, ObjectName::Instance(_))
    }
}

impl From<CimClassName> for ObjectName {
    fn from(c: CimClassName) -> Self {
        ObjectName::Class(c)
    }
}

impl From<CimInstanceName> for ObjectName {
    fn from(i: CimInstanceName) -> Self {
        ObjectName::Instance(i)
    }
}

impl From<&str> for ObjectName {
    fn from(classname: &str) -> Self {
        ObjectName::Class(CimClassName::new(classname))
    }
}

impl Display for ObjectName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ObjectName::Class(c) => Display::fmt(c, f),
            ObjectName::Instance(i) => Display::fmt(i, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn classname_compares_case_insensitively() {
        let a = CimInstanceName::with_keybindings("CIM_Foo", [("Name", "x")]);
        let b = CimInstanceName::with_keybindings("cim_foo", [("NAME", "x")]);
        assert_eq!(a, b);
    }

    #[test]
    fn namespace_compares_case_sensitively() {
        let a = CimInstanceName::new("CIM_Foo").with_namespace("root/cimv2");
        let b = CimInstanceName::new("CIM_Foo").with_namespace("root/CIMV2");
        assert_ne!(a, b);
    }

    #[test]
    fn host_compares_case_insensitively() {
        let a = CimInstanceName::new("CIM_Foo").with_host("Srv1.example.org");
        let b = CimInstanceName::new("CIM_Foo").with_host("srv1.example.org");
        assert_eq!(a, b);
    }

    #[test]
    fn keybinding_lookup_any_case() {
        let name = CimInstanceName::with_keybindings("CIM_Foo", [("SystemName", "s1")]);
        for k in ["SystemName", "systemname", "SYSTEMNAME"] {
            assert_eq!(
                name.keybindings.get(k),
                Some(&CimValue::from("s1")),
                "lookup {k}"
            );
        }
    }

    #[test]
    fn array_keybindings_rejected() {
        let mut name = CimInstanceName::new("CIM_Foo");
        name.keybindings
            .insert("Bad", CimValue::from(vec![1u32, 2]));
        assert!(name.validate().is_err());
    }
}
