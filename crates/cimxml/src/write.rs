//! Request-side CIM-XML encoding.
//!
//! Every operation request is a `CIM`/`MESSAGE`/`SIMPLEREQ` envelope
//! around an `IMETHODCALL` (intrinsic operations) or `METHODCALL`
//! (extrinsic method invocation). The emitters here also serve the
//! listener boundary (`SIMPLEEXPRSP`) and embedded-object rendering.

use crate::{CodecError, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use wbem_types::{
    CimArray, CimClass, CimInstance, CimInstanceName, CimMethod, CimParameter, CimProperty,
    CimQualifier, CimQualifierDeclaration, CimType, CimValue, ObjectName,
};

/// Splits a namespace into its non-empty path components, stripping
/// leading, trailing, and doubled slashes.
pub fn namespace_components(namespace: &str) -> Vec<&str> {
    namespace.split('/').filter(|c| !c.is_empty()).collect()
}

/// The canonical form of a namespace: components joined with single
/// slashes.
pub fn normalize_namespace(namespace: &str) -> String {
    namespace_components(namespace).join("/")
}

pub(crate) struct Emitter {
    writer: Writer<Vec<u8>>,
}

impl Emitter {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    fn emit(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| CodecError::Syntax(e.to_string()))
    }

    pub fn decl(&mut self) -> Result<()> {
        self.emit(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
    }

    pub fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let mut start = BytesStart::new(name);
        for attr in attrs {
            start.push_attribute(*attr);
        }
        self.emit(Event::Start(start))
    }

    pub fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let mut start = BytesStart::new(name);
        for attr in attrs {
            start.push_attribute(*attr);
        }
        self.emit(Event::Empty(start))
    }

    pub fn end(&mut self, name: &str) -> Result<()> {
        self.emit(Event::End(BytesEnd::new(name)))
    }

    pub fn text(&mut self, text: &str) -> Result<()> {
        self.emit(Event::Text(BytesText::new(text)))
    }

    pub fn text_element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<()> {
        self.start(name, attrs)?;
        self.text(text)?;
        self.end(name)
    }

    pub fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

fn scalar_text(value: &CimValue) -> Result<String> {
    value.text().ok_or_else(|| {
        CodecError::schema(format!(
            "{} value has no scalar text form",
            value.cim_type()
        ))
    })
}

fn bool_attr(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Pushes `(name, value)` for every set flag, shared by the qualifier
/// and qualifier-declaration emitters.
fn flavor_attrs<'a>(
    attrs: &mut Vec<(&'a str, &'a str)>,
    overridable: Option<bool>,
    tosubclass: Option<bool>,
    toinstance: Option<bool>,
    translatable: Option<bool>,
) {
    if let Some(v) = overridable {
        attrs.push(("OVERRIDABLE", bool_attr(v)));
    }
    if let Some(v) = tosubclass {
        attrs.push(("TOSUBCLASS", bool_attr(v)));
    }
    if let Some(v) = toinstance {
        attrs.push(("TOINSTANCE", bool_attr(v)));
    }
    if let Some(v) = translatable {
        attrs.push(("TRANSLATABLE", bool_attr(v)));
    }
}

pub(crate) fn write_local_namespace_path(em: &mut Emitter, namespace: &str) -> Result<()> {
    em.start("LOCALNAMESPACEPATH", &[])?;
    for component in namespace_components(namespace) {
        em.empty("NAMESPACE", &[("NAME", component)])?;
    }
    em.end("LOCALNAMESPACEPATH")
}

fn write_namespace_path(em: &mut Emitter, host: &str, namespace: &str) -> Result<()> {
    em.start("NAMESPACEPATH", &[])?;
    em.text_element("HOST", &[], host)?;
    write_local_namespace_path(em, namespace)?;
    em.end("NAMESPACEPATH")
}

pub(crate) fn write_value(em: &mut Emitter, value: &CimValue) -> Result<()> {
    em.text_element("VALUE", &[], &scalar_text(value)?)
}

pub(crate) fn write_value_array(em: &mut Emitter, array: &CimArray) -> Result<()> {
    if array.element_type() == CimType::Reference {
        return Err(CodecError::schema(
            "reference arrays are not valid property or parameter values",
        ));
    }
    em.start("VALUE.ARRAY", &[])?;
    for element in array.iter() {
        match element {
            Some(value) => write_value(em, value)?,
            None => em.empty("VALUE.NULL", &[])?,
        }
    }
    em.end("VALUE.ARRAY")
}

/// `VALUE.REFERENCE` wraps the most local path form the reference can be
/// expressed in: `INSTANCENAME` without a namespace, `LOCALINSTANCEPATH`
/// with one, `INSTANCEPATH` when a host is present as well.
pub(crate) fn write_value_reference(em: &mut Emitter, path: &CimInstanceName) -> Result<()> {
    em.start("VALUE.REFERENCE", &[])?;
    match (&path.host, &path.namespace) {
        (Some(host), Some(namespace)) => {
            em.start("INSTANCEPATH", &[])?;
            write_namespace_path(em, host, namespace)?;
            write_instance_name(em, path)?;
            em.end("INSTANCEPATH")?;
        }
        (Some(_), None) => {
            return Err(CodecError::schema(
                "reference with a host requires a namespace",
            ))
        }
        (None, Some(namespace)) => {
            em.start("LOCALINSTANCEPATH", &[])?;
            write_local_namespace_path(em, namespace)?;
            write_instance_name(em, path)?;
            em.end("LOCALINSTANCEPATH")?;
        }
        (None, None) => write_instance_name(em, path)?,
    }
    em.end("VALUE.REFERENCE")
}

pub(crate) fn write_instance_name(em: &mut Emitter, name: &CimInstanceName) -> Result<()> {
    name.validate()?;
    em.start("INSTANCENAME", &[("CLASSNAME", &name.classname)])?;
    for (key, value) in &name.keybindings {
        em.start("KEYBINDING", &[("NAME", key)])?;
        match value {
            CimValue::Reference(path) => write_value_reference(em, path)?,
            scalar => {
                let ty = scalar.cim_type();
                em.text_element(
                    "KEYVALUE",
                    &[("VALUETYPE", ty.keyvalue_kind()), ("TYPE", ty.as_str())],
                    &scalar_text(scalar)?,
                )?;
            }
        }
        em.end("KEYBINDING")?;
    }
    em.end("INSTANCENAME")
}

pub(crate) fn write_qualifier(em: &mut Emitter, qualifier: &CimQualifier) -> Result<()> {
    if qualifier.ty == CimType::Reference {
        return Err(CodecError::schema("qualifiers cannot be reference-typed"));
    }
    let mut attrs: Vec<(&str, &str)> = vec![
        ("NAME", &qualifier.name),
        ("TYPE", qualifier.ty.as_str()),
    ];
    if let Some(v) = qualifier.propagated {
        attrs.push(("PROPAGATED", bool_attr(v)));
    }
    flavor_attrs(
        &mut attrs,
        qualifier.overridable,
        qualifier.tosubclass,
        qualifier.toinstance,
        qualifier.translatable,
    );
    match &qualifier.value {
        None => em.empty("QUALIFIER", &attrs),
        Some(value) => {
            em.start("QUALIFIER", &attrs)?;
            match value {
                CimValue::Array(array) => write_value_array(em, array)?,
                scalar => write_value(em, scalar)?,
            }
            em.end("QUALIFIER")
        }
    }
}

fn write_qualifiers(
    em: &mut Emitter,
    qualifiers: &wbem_types::NocaseMap<CimQualifier>,
) -> Result<()> {
    for qualifier in qualifiers.values() {
        write_qualifier(em, qualifier)?;
    }
    Ok(())
}

pub(crate) fn write_property(em: &mut Emitter, property: &CimProperty) -> Result<()> {
    property.validate()?;

    let array_size = property.array_size.map(|s| s.to_string());
    let mut attrs: Vec<(&str, &str)> = vec![("NAME", &property.name)];
    if let Some(kind) = property.embedded_object {
        attrs.push(("EmbeddedObject", kind.as_str()));
    }
    if let Some(origin) = &property.class_origin {
        attrs.push(("CLASSORIGIN", origin));
    }
    if let Some(propagated) = property.propagated {
        attrs.push(("PROPAGATED", bool_attr(propagated)));
    }

    match (property.ty, property.is_array) {
        (CimType::Reference, true) => Err(CodecError::schema(
            "reference array properties are not expressible in CIM-XML",
        )),
        (CimType::Reference, false) => {
            if let Some(class) = &property.reference_class {
                attrs.insert(1, ("REFERENCECLASS", class));
            }
            em.start("PROPERTY.REFERENCE", &attrs)?;
            write_qualifiers(em, &property.qualifiers)?;
            if let Some(CimValue::Reference(path)) = &property.value {
                write_value_reference(em, path)?;
            }
            em.end("PROPERTY.REFERENCE")
        }
        (ty, true) => {
            attrs.insert(1, ("TYPE", ty.as_str()));
            if let Some(size) = &array_size {
                attrs.push(("ARRAYSIZE", size));
            }
            em.start("PROPERTY.ARRAY", &attrs)?;
            write_qualifiers(em, &property.qualifiers)?;
            if let Some(CimValue::Array(array)) = &property.value {
                write_value_array(em, array)?;
            }
            em.end("PROPERTY.ARRAY")
        }
        (ty, false) => {
            attrs.insert(1, ("TYPE", ty.as_str()));
            em.start("PROPERTY", &attrs)?;
            write_qualifiers(em, &property.qualifiers)?;
            if let Some(value) = &property.value {
                write_value(em, value)?;
            }
            em.end("PROPERTY")
        }
    }
}

pub(crate) fn write_parameter(em: &mut Emitter, parameter: &CimParameter) -> Result<()> {
    let array_size = parameter.array_size.map(|s| s.to_string());
    let mut attrs: Vec<(&str, &str)> = vec![("NAME", &parameter.name)];

    let element = match (parameter.ty, parameter.is_array) {
        (CimType::Reference, false) => {
            if let Some(class) = &parameter.reference_class {
                attrs.push(("REFERENCECLASS", class));
            }
            "PARAMETER.REFERENCE"
        }
        (CimType::Reference, true) => {
            if let Some(class) = &parameter.reference_class {
                attrs.push(("REFERENCECLASS", class));
            }
            if let Some(size) = &array_size {
                attrs.push(("ARRAYSIZE", size));
            }
            "PARAMETER.REFARRAY"
        }
        (ty, false) => {
            attrs.push(("TYPE", ty.as_str()));
            "PARAMETER"
        }
        (ty, true) => {
            attrs.push(("TYPE", ty.as_str()));
            if let Some(size) = &array_size {
                attrs.push(("ARRAYSIZE", size));
            }
            "PARAMETER.ARRAY"
        }
    };

    if parameter.qualifiers.is_empty() {
        em.empty(element, &attrs)
    } else {
        em.start(element, &attrs)?;
        write_qualifiers(em, &parameter.qualifiers)?;
        em.end(element)
    }
}

pub(crate) fn write_method(em: &mut Emitter, method: &CimMethod) -> Result<()> {
    let mut attrs: Vec<(&str, &str)> = vec![
        ("NAME", &method.name),
        ("TYPE", method.return_type.as_str()),
    ];
    if let Some(origin) = &method.class_origin {
        attrs.push(("CLASSORIGIN", origin));
    }
    if let Some(propagated) = method.propagated {
        attrs.push(("PROPAGATED", bool_attr(propagated)));
    }
    em.start("METHOD", &attrs)?;
    write_qualifiers(em, &method.qualifiers)?;
    for parameter in method.parameters.values() {
        write_parameter(em, parameter)?;
    }
    em.end("METHOD")
}

pub(crate) fn write_instance(em: &mut Emitter, instance: &CimInstance) -> Result<()> {
    em.start("INSTANCE", &[("CLASSNAME", &instance.classname)])?;
    write_qualifiers(em, &instance.qualifiers)?;
    for property in instance.properties.values() {
        write_property(em, property)?;
    }
    em.end("INSTANCE")
}

pub(crate) fn write_class(em: &mut Emitter, class: &CimClass) -> Result<()> {
    let mut attrs: Vec<(&str, &str)> = vec![("NAME", &class.classname)];
    if let Some(superclass) = &class.superclass {
        attrs.push(("SUPERCLASS", superclass));
    }
    em.start("CLASS", &attrs)?;
    write_qualifiers(em, &class.qualifiers)?;
    for property in class.properties.values() {
        write_property(em, property)?;
    }
    for method in class.methods.values() {
        write_method(em, method)?;
    }
    em.end("CLASS")
}

pub(crate) fn write_qualifier_declaration(
    em: &mut Emitter,
    declaration: &CimQualifierDeclaration,
) -> Result<()> {
    let array_size = declaration.array_size.map(|s| s.to_string());
    let mut attrs: Vec<(&str, &str)> = vec![
        ("NAME", &declaration.name),
        ("TYPE", declaration.ty.as_str()),
    ];
    if declaration.is_array {
        attrs.push(("ISARRAY", "true"));
        if let Some(size) = &array_size {
            attrs.push(("ARRAYSIZE", size));
        }
    }
    flavor_attrs(
        &mut attrs,
        declaration.overridable,
        declaration.tosubclass,
        declaration.toinstance,
        declaration.translatable,
    );
    em.start("QUALIFIER.DECLARATION", &attrs)?;
    if !declaration.scopes.is_empty() {
        let mut scope_attrs: Vec<(&str, &str)> = Vec::new();
        for name in declaration.scopes.names() {
            // SCOPE attribute names are the uppercase meta-element names;
            // "any" expands to the full set
            match name {
                "any" => {
                    scope_attrs = [
                        "CLASS",
                        "ASSOCIATION",
                        "INDICATION",
                        "PROPERTY",
                        "REFERENCE",
                        "METHOD",
                        "PARAMETER",
                    ]
                    .iter()
                    .map(|n| (*n, "true"))
                    .collect();
                    break;
                }
                "class" => scope_attrs.push(("CLASS", "true")),
                "association" => scope_attrs.push(("ASSOCIATION", "true")),
                "indication" => scope_attrs.push(("INDICATION", "true")),
                "property" => scope_attrs.push(("PROPERTY", "true")),
                "reference" => scope_attrs.push(("REFERENCE", "true")),
                "method" => scope_attrs.push(("METHOD", "true")),
                "parameter" => scope_attrs.push(("PARAMETER", "true")),
                _ => {}
            }
        }
        em.empty("SCOPE", &scope_attrs)?;
    }
    match &declaration.value {
        Some(CimValue::Array(array)) => write_value_array(em, array)?,
        Some(scalar) => write_value(em, scalar)?,
        None => {}
    }
    em.end("QUALIFIER.DECLARATION")
}

/// One `IPARAMVALUE` of an intrinsic operation request.
#[derive(Debug, Clone)]
pub enum IParamValue {
    /// A boolean flag, e.g. `LocalOnly`
    Boolean(&'static str, bool),
    /// An unsigned integer, e.g. `MaxObjectCount`
    Uint32(&'static str, u32),
    /// A string, e.g. `QueryLanguage`
    Str(&'static str, String),
    /// An array of strings, e.g. `PropertyList`
    StringArray(&'static str, Vec<String>),
    /// A bare class name, e.g. `ClassName`
    ClassName(&'static str, String),
    /// An instance path, e.g. `InstanceName`
    InstanceName(&'static str, CimInstanceName),
    /// A class or instance path, e.g. `ObjectName` of the association
    /// operations
    ObjectName(&'static str, ObjectName),
    /// A full instance, e.g. `NewInstance`
    Instance(&'static str, CimInstance),
    /// An instance with its path, e.g. `ModifiedInstance`
    NamedInstance(&'static str, CimInstance),
    /// A full class, e.g. `NewClass`
    Class(&'static str, CimClass),
    /// A qualifier declaration, e.g. `QualifierDeclaration`
    QualifierDeclaration(&'static str, CimQualifierDeclaration),
}

impl IParamValue {
    /// The parameter name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            IParamValue::Boolean(n, _)
            | IParamValue::Uint32(n, _)
            | IParamValue::Str(n, _)
            | IParamValue::StringArray(n, _)
            | IParamValue::ClassName(n, _)
            | IParamValue::InstanceName(n, _)
            | IParamValue::ObjectName(n, _)
            | IParamValue::Instance(n, _)
            | IParamValue::NamedInstance(n, _)
            | IParamValue::Class(n, _)
            | IParamValue::QualifierDeclaration(n, _) => n,
        }
    }

    fn write(&self, em: &mut Emitter) -> Result<()> {
        em.start("IPARAMVALUE", &[("NAME", self.name())])?;
        match self {
            IParamValue::Boolean(_, v) => {
                em.text_element("VALUE", &[], if *v { "TRUE" } else { "FALSE" })?
            }
            IParamValue::Uint32(_, v) => em.text_element("VALUE", &[], &v.to_string())?,
            IParamValue::Str(_, v) => em.text_element("VALUE", &[], v)?,
            IParamValue::StringArray(_, items) => {
                em.start("VALUE.ARRAY", &[])?;
                for item in items {
                    em.text_element("VALUE", &[], item)?;
                }
                em.end("VALUE.ARRAY")?;
            }
            IParamValue::ClassName(_, name) => em.empty("CLASSNAME", &[("NAME", name)])?,
            IParamValue::InstanceName(_, name) => write_instance_name(em, name)?,
            IParamValue::ObjectName(_, name) => match name {
                ObjectName::Class(class) => {
                    em.empty("CLASSNAME", &[("NAME", &class.classname)])?
                }
                ObjectName::Instance(instance) => write_instance_name(em, instance)?,
            },
            IParamValue::Instance(_, instance) => write_instance(em, instance)?,
            IParamValue::NamedInstance(_, instance) => {
                let path = instance.path.as_ref().ok_or_else(|| {
                    CodecError::schema("named instance parameter requires a path")
                })?;
                em.start("VALUE.NAMEDINSTANCE", &[])?;
                write_instance_name(em, path)?;
                write_instance(em, instance)?;
                em.end("VALUE.NAMEDINSTANCE")?;
            }
            IParamValue::Class(_, class) => write_class(em, class)?,
            IParamValue::QualifierDeclaration(_, declaration) => {
                write_qualifier_declaration(em, declaration)?
            }
        }
        em.end("IPARAMVALUE")
    }
}

fn write_envelope<F>(message_id: u64, body: F) -> Result<Vec<u8>>
where
    F: FnOnce(&mut Emitter) -> Result<()>,
{
    let mut em = Emitter::new();
    em.decl()?;
    em.start("CIM", &[("CIMVERSION", "2.0"), ("DTDVERSION", "2.0")])?;
    em.start(
        "MESSAGE",
        &[
            ("ID", &message_id.to_string()),
            ("PROTOCOLVERSION", "1.0"),
        ],
    )?;
    body(&mut em)?;
    em.end("MESSAGE")?;
    em.end("CIM")?;
    Ok(em.finish())
}

/// Encodes an intrinsic operation request (`IMETHODCALL`).
pub fn encode_imethodcall(
    message_id: u64,
    method: &str,
    namespace: &str,
    params: &[IParamValue],
) -> Result<Vec<u8>> {
    write_envelope(message_id, |em| {
        em.start("SIMPLEREQ", &[])?;
        em.start("IMETHODCALL", &[("NAME", method)])?;
        write_local_namespace_path(em, namespace)?;
        for param in params {
            param.write(em)?;
        }
        em.end("IMETHODCALL")?;
        em.end("SIMPLEREQ")
    })
}

/// One `PARAMVALUE` of an extrinsic method invocation.
#[derive(Debug, Clone)]
pub struct MethodParamValue {
    /// Parameter name
    pub name: String,
    /// Parameter value; `None` sends a typed null
    pub value: Option<CimValue>,
}

impl MethodParamValue {
    /// A named parameter value.
    pub fn new(name: impl Into<String>, value: impl Into<CimValue>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    fn write(&self, em: &mut Emitter) -> Result<()> {
        let ty = self.value.as_ref().map(CimValue::cim_type);
        let mut attrs: Vec<(&str, &str)> = vec![("NAME", &self.name)];
        if let Some(ty) = ty {
            attrs.push(("PARAMTYPE", ty.as_str()));
        }
        match &self.value {
            None => em.empty("PARAMVALUE", &attrs),
            Some(value) => {
                em.start("PARAMVALUE", &attrs)?;
                match value {
                    CimValue::Array(array) => write_value_array(em, array)?,
                    CimValue::Reference(path) => write_value_reference(em, path)?,
                    scalar => write_value(em, scalar)?,
                }
                em.end("PARAMVALUE")
            }
        }
    }
}

/// Encodes an extrinsic method invocation (`METHODCALL`). The target is
/// rendered as a `LOCALINSTANCEPATH` or `LOCALCLASSPATH` in the given
/// namespace.
pub fn encode_methodcall(
    message_id: u64,
    method: &str,
    namespace: &str,
    target: &ObjectName,
    params: &[MethodParamValue],
) -> Result<Vec<u8>> {
    write_envelope(message_id, |em| {
        em.start("SIMPLEREQ", &[])?;
        em.start("METHODCALL", &[("NAME", method)])?;
        match target {
            ObjectName::Class(class) => {
                em.start("LOCALCLASSPATH", &[])?;
                write_local_namespace_path(em, namespace)?;
                em.empty("CLASSNAME", &[("NAME", &class.classname)])?;
                em.end("LOCALCLASSPATH")?;
            }
            ObjectName::Instance(instance) => {
                em.start("LOCALINSTANCEPATH", &[])?;
                write_local_namespace_path(em, namespace)?;
                write_instance_name(em, instance)?;
                em.end("LOCALINSTANCEPATH")?;
            }
        }
        for param in params {
            param.write(em)?;
        }
        em.end("METHODCALL")?;
        em.end("SIMPLEREQ")
    })
}

/// Encodes the response to an indication export request
/// (`SIMPLEEXPRSP`/`EXPMETHODRESPONSE`). Listener boundary only.
pub fn encode_expmethodresponse(message_id: &str, method: &str) -> Result<Vec<u8>> {
    let mut em = Emitter::new();
    em.decl()?;
    em.start("CIM", &[("CIMVERSION", "2.0"), ("DTDVERSION", "2.0")])?;
    em.start("MESSAGE", &[("ID", message_id), ("PROTOCOLVERSION", "1.0")])?;
    em.start("SIMPLEEXPRSP", &[])?;
    em.start("EXPMETHODRESPONSE", &[("NAME", method)])?;
    em.empty("IRETURNVALUE", &[])?;
    em.end("EXPMETHODRESPONSE")?;
    em.end("SIMPLEEXPRSP")?;
    em.end("MESSAGE")?;
    em.end("CIM")?;
    Ok(em.finish())
}

/// A CIM object embedded in a string property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddedObject {
    /// An embedded instance
    Instance(CimInstance),
    /// An embedded class
    Class(CimClass),
}

/// Renders the XML string stored in an embedded-object property.
pub fn embedded_object_text(object: &EmbeddedObject) -> Result<String> {
    let mut em = Emitter::new();
    match object {
        EmbeddedObject::Instance(instance) => write_instance(&mut em, instance)?,
        EmbeddedObject::Class(class) => write_class(&mut em, class)?,
    }
    finish_fragment(em)
}

fn finish_fragment(em: Emitter) -> Result<String> {
    String::from_utf8(em.finish()).map_err(|e| CodecError::Syntax(e.to_string()))
}

/// Renders an instance as a standalone `INSTANCE` fragment. The path, if
/// any, is not part of this form.
pub fn instance_to_xml(instance: &CimInstance) -> Result<String> {
    let mut em = Emitter::new();
    write_instance(&mut em, instance)?;
    finish_fragment(em)
}

/// Renders a class as a standalone `CLASS` fragment.
pub fn class_to_xml(class: &CimClass) -> Result<String> {
    let mut em = Emitter::new();
    write_class(&mut em, class)?;
    finish_fragment(em)
}

/// Renders an instance path as a `VALUE.REFERENCE` fragment, in its most
/// local expressible form (see [`CimInstanceName`] for the rules).
pub fn instance_name_to_xml(name: &CimInstanceName) -> Result<String> {
    let mut em = Emitter::new();
    write_value_reference(&mut em, name)?;
    finish_fragment(em)
}

/// Renders a qualifier declaration as a standalone
/// `QUALIFIER.DECLARATION` fragment.
pub fn qualifier_declaration_to_xml(declaration: &CimQualifierDeclaration) -> Result<String> {
    let mut em = Emitter::new();
    write_qualifier_declaration(&mut em, declaration)?;
    finish_fragment(em)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wbem_types::CimValue;

    fn utf8(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn namespace_components_strip_slashes() {
        assert_eq!(namespace_components("//root/mycim//"), ["root", "mycim"]);
        assert_eq!(namespace_components("root/cimv2"), ["root", "cimv2"]);
        assert_eq!(normalize_namespace("//root/mycim//"), "root/mycim");
        assert!(namespace_components("///").is_empty());
    }

    #[test]
    fn imethodcall_envelope() {
        let xml = utf8(
            encode_imethodcall(
                1001,
                "EnumerateInstances",
                "//root/mycim//",
                &[IParamValue::ClassName("ClassName", "CIM_Foo".into())],
            )
            .unwrap(),
        );
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#), "{xml}");
        assert!(xml.contains(r#"<CIM CIMVERSION="2.0" DTDVERSION="2.0">"#));
        assert!(xml.contains(r#"<MESSAGE ID="1001" PROTOCOLVERSION="1.0">"#));
        assert!(xml.contains(r#"<IMETHODCALL NAME="EnumerateInstances">"#));
        // exactly two NAMESPACE elements, slashes stripped
        assert_eq!(
            xml.matches("<NAMESPACE ").count(),
            2,
            "{xml}"
        );
        assert!(xml.contains(r#"<NAMESPACE NAME="root"/><NAMESPACE NAME="mycim"/>"#));
        assert!(xml.contains(r#"<IPARAMVALUE NAME="ClassName"><CLASSNAME NAME="CIM_Foo"/></IPARAMVALUE>"#));
    }

    #[test]
    fn keyvalue_attributes() {
        let name = CimInstanceName::with_keybindings(
            "PyWBEM_Person",
            [("Name", CimValue::from("Fritz")), ("Age", CimValue::from(42u8))],
        );
        let xml = utf8(
            encode_imethodcall(
                1,
                "GetInstance",
                "root/cimv2",
                &[IParamValue::InstanceName("InstanceName", name)],
            )
            .unwrap(),
        );
        assert!(xml.contains(
            r#"<KEYBINDING NAME="Name"><KEYVALUE VALUETYPE="string" TYPE="string">Fritz</KEYVALUE></KEYBINDING>"#
        ), "{xml}");
        assert!(xml.contains(
            r#"<KEYBINDING NAME="Age"><KEYVALUE VALUETYPE="numeric" TYPE="uint8">42</KEYVALUE></KEYBINDING>"#
        ), "{xml}");
    }

    #[test]
    fn booleans_are_uppercase_values() {
        let xml = utf8(
            encode_imethodcall(
                1,
                "EnumerateInstances",
                "root/cimv2",
                &[
                    IParamValue::ClassName("ClassName", "CIM_Foo".into()),
                    IParamValue::Boolean("LocalOnly", false),
                    IParamValue::Boolean("DeepInheritance", true),
                ],
            )
            .unwrap(),
        );
        assert!(xml.contains(r#"<IPARAMVALUE NAME="LocalOnly"><VALUE>FALSE</VALUE></IPARAMVALUE>"#));
        assert!(xml.contains(r#"<IPARAMVALUE NAME="DeepInheritance"><VALUE>TRUE</VALUE></IPARAMVALUE>"#));
    }

    #[test]
    fn methodcall_instance_target() {
        let path = CimInstanceName::with_keybindings("CIM_Foo", [("ID", 1u64)]);
        let xml = utf8(
            encode_methodcall(
                7,
                "Reset",
                "root/cimv2",
                &ObjectName::Instance(path),
                &[MethodParamValue::new("Force", true)],
            )
            .unwrap(),
        );
        assert!(xml.contains(r#"<METHODCALL NAME="Reset">"#));
        assert!(xml.contains("<LOCALINSTANCEPATH>"));
        assert!(xml.contains(
            r#"<PARAMVALUE NAME="Force" PARAMTYPE="boolean"><VALUE>TRUE</VALUE></PARAMVALUE>"#
        ), "{xml}");
    }

    #[test]
    fn property_array_and_null_elements() {
        let mut array = CimArray::new(CimType::Uint32);
        array.push(Some(CimValue::Uint32(1))).unwrap();
        array.push(None).unwrap();
        let instance = CimInstance::new("CIM_Foo")
            .with_property("Values", CimValue::Array(array));
        let xml = utf8(
            encode_imethodcall(
                1,
                "CreateInstance",
                "root/cimv2",
                &[IParamValue::Instance("NewInstance", instance)],
            )
            .unwrap(),
        );
        assert!(xml.contains(r#"<PROPERTY.ARRAY NAME="Values" TYPE="uint32">"#), "{xml}");
        assert!(xml.contains("<VALUE.ARRAY><VALUE>1</VALUE><VALUE.NULL/></VALUE.ARRAY>"));
    }

    #[test]
    fn embedded_object_is_escaped_in_place() {
        let embedded = EmbeddedObject::Instance(
            CimInstance::new("CIM_Inner").with_property("X", 1u32),
        );
        let text = embedded_object_text(&embedded).unwrap();
        assert!(text.starts_with(r#"<INSTANCE CLASSNAME="CIM_Inner">"#));

        let mut property = CimProperty::new("Inner", text.as_str());
        property.embedded_object = Some(wbem_types::EmbeddedObjectKind::Instance);
        let instance = {
            let mut i = CimInstance::new("CIM_Outer");
            i.add_property(property);
            i
        };
        let xml = utf8(
            encode_imethodcall(
                1,
                "CreateInstance",
                "root/cimv2",
                &[IParamValue::Instance("NewInstance", instance)],
            )
            .unwrap(),
        );
        assert!(xml.contains(r#"<PROPERTY NAME="Inner" TYPE="string" EmbeddedObject="instance">"#), "{xml}");
        // the embedded XML is escaped, not nested
        assert!(xml.contains("&lt;INSTANCE CLASSNAME="), "{xml}");
    }

    #[test]
    fn reference_with_namespace_uses_local_path() {
        let target = CimInstanceName::with_keybindings("CIM_Bar", [("ID", 2u64)])
            .with_namespace("root/other");
        let instance = {
            let mut i = CimInstance::new("CIM_Foo");
            i.add_property(CimProperty::reference("Target", target, None));
            i
        };
        let xml = utf8(
            encode_imethodcall(
                1,
                "CreateInstance",
                "root/cimv2",
                &[IParamValue::Instance("NewInstance", instance)],
            )
            .unwrap(),
        );
        assert!(xml.contains(r#"<PROPERTY.REFERENCE NAME="Target">"#));
        assert!(xml.contains("<VALUE.REFERENCE><LOCALINSTANCEPATH>"), "{xml}");
    }
}
