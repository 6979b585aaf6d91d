//! Response-side CIM-XML decoding.
//!
//! A response is parsed in two stages: the quick-xml event stream is
//! folded into an element tree (`tree`), then the walkers here extract
//! typed CIM objects, enforcing the DTD rules the client relies on.
//! Unknown attributes are tolerated; unknown required elements are not.

use crate::tree::{parse_tree, Elem};
use crate::write::EmbeddedObject;
use crate::{CodecError, Result};
use wbem_types::{
    CimClass, CimClassName, CimInstance, CimInstanceName, CimMethod, CimParameter, CimProperty,
    CimQualifier, CimQualifierDeclaration, CimType, CimValue, EmbeddedObjectKind, NocaseMap,
    Scopes,
};

/// The `ERROR` element of a failed response: the numeric CIM status
/// code, an optional description, and any `CIM_Error` detail instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CimErrorInfo {
    /// Numeric CIM status code
    pub code: u32,
    /// Human-oriented description, when the server sent one
    pub description: Option<String>,
    /// `CIM_Error` instances with structured detail
    pub instances: Vec<CimInstance>,
}

/// One object delivered inside `IRETURNVALUE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnItem {
    /// A bare `INSTANCE` (no path)
    Instance(CimInstance),
    /// An instance with a path (`VALUE.NAMEDINSTANCE`,
    /// `VALUE.INSTANCEWITHPATH`, or an instance `VALUE.OBJECTWITHPATH`)
    NamedInstance(CimInstance),
    /// An instance path
    InstanceName(CimInstanceName),
    /// A class, with a path when the wire form carried one
    Class(CimClass),
    /// A class path
    ClassName(CimClassName),
    /// A qualifier declaration
    QualifierDeclaration(CimQualifierDeclaration),
    /// A plain typed value
    Value(CimValue),
}

/// One `PARAMVALUE` output parameter of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutParam {
    /// Parameter name
    pub name: String,
    /// Parameter value; untyped values decode as strings
    pub value: Option<CimValue>,
}

/// A decoded intrinsic operation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IMethodResponse {
    /// The response `MESSAGE ID`; present but not matched against the
    /// request id, which the HTTP pairing already correlates
    pub message_id: String,
    /// The `ERROR` element, when the operation failed
    pub error: Option<CimErrorInfo>,
    /// Whether an `IRETURNVALUE` element was present at all
    pub has_return_value: bool,
    /// The decoded `IRETURNVALUE` payload, in server order
    pub return_items: Vec<ReturnItem>,
    /// Output parameters (the pull operations use these)
    pub out_params: Vec<OutParam>,
}

impl IMethodResponse {
    /// Output parameter by name, compared case-insensitively.
    pub fn out_param(&self, name: &str) -> Option<&OutParam> {
        self.out_params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// A boolean output parameter, tolerating the string spelling.
    pub fn out_bool(&self, name: &str) -> Result<Option<bool>> {
        match self.out_param(name).and_then(|p| p.value.as_ref()) {
            None => Ok(None),
            Some(CimValue::Boolean(b)) => Ok(Some(*b)),
            Some(CimValue::String(s)) if s.eq_ignore_ascii_case("true") => Ok(Some(true)),
            Some(CimValue::String(s)) if s.eq_ignore_ascii_case("false") => Ok(Some(false)),
            Some(other) => Err(CodecError::schema(format!(
                "output parameter {name} is not a boolean: {other:?}"
            ))),
        }
    }

    /// A string output parameter.
    pub fn out_str(&self, name: &str) -> Result<Option<&str>> {
        match self.out_param(name).and_then(|p| p.value.as_ref()) {
            None => Ok(None),
            Some(CimValue::String(s)) => Ok(Some(s)),
            Some(other) => Err(CodecError::schema(format!(
                "output parameter {name} is not a string: {other:?}"
            ))),
        }
    }
}

/// A decoded extrinsic method response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodResponse {
    /// The response `MESSAGE ID`
    pub message_id: String,
    /// The `ERROR` element, when the invocation failed
    pub error: Option<CimErrorInfo>,
    /// The `RETURNVALUE`, typed by its `PARAMTYPE` when present
    pub return_value: Option<CimValue>,
    /// Output parameters, in server order
    pub out_params: Vec<OutParam>,
}

/// A decoded indication export request (listener boundary).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportCall {
    /// The request `MESSAGE ID`, echoed into the response
    pub message_id: String,
    /// The export method name, `ExportIndication` in practice
    pub method: String,
    /// The exported indication instance
    pub indication: CimInstance,
}

fn attr_bool(elem: &Elem, name: &str) -> Result<Option<bool>> {
    match elem.attr(name) {
        None => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Some(v) if v.eq_ignore_ascii_case("false") => Ok(Some(false)),
        Some(v) => Err(CodecError::schema(format!(
            "{} attribute {name} is not a boolean: {v:?}",
            elem.name
        ))),
    }
}

fn attr_type(elem: &Elem, name: &str) -> Result<CimType> {
    elem.require_attr(name)?
        .parse()
        .map_err(CodecError::Model)
}

fn attr_u32(elem: &Elem, name: &str) -> Result<Option<u32>> {
    match elem.attr(name) {
        None => Ok(None),
        Some(v) => v.parse().map(Some).map_err(|_| {
            CodecError::schema(format!(
                "{} attribute {name} is not an integer: {v:?}",
                elem.name
            ))
        }),
    }
}

fn parse_local_namespace(elem: &Elem) -> Result<String> {
    let mut components = Vec::new();
    for namespace in elem.children_named("NAMESPACE") {
        components.push(namespace.require_attr("NAME")?.to_string());
    }
    Ok(components.join("/"))
}

/// `NAMESPACEPATH` = `HOST` + `LOCALNAMESPACEPATH`.
fn parse_namespace_path(elem: &Elem) -> Result<(String, String)> {
    let host = elem.require_child("HOST")?.text.trim().to_string();
    let namespace = parse_local_namespace(elem.require_child("LOCALNAMESPACEPATH")?)?;
    Ok((host, namespace))
}

fn parse_keyvalue(elem: &Elem) -> Result<CimValue> {
    let text = elem.text.as_str();
    if let Some(ty) = elem.attr("TYPE") {
        let ty: CimType = ty.parse().map_err(CodecError::Model)?;
        return Ok(CimValue::parse(ty, text)?);
    }
    match elem.attr("VALUETYPE").unwrap_or("string") {
        "string" => Ok(CimValue::String(text.to_string())),
        "boolean" => Ok(CimValue::parse(CimType::Boolean, text.trim())?),
        "numeric" => {
            let literal = text.trim();
            if literal.contains(['.', 'e', 'E']) {
                Ok(CimValue::parse(CimType::Real64, literal)?)
            } else if literal.starts_with('-') {
                Ok(CimValue::parse(CimType::Sint64, literal)?)
            } else {
                Ok(CimValue::parse(CimType::Uint64, literal)?)
            }
        }
        other => Err(CodecError::schema(format!(
            "KEYVALUE has unknown VALUETYPE {other:?}"
        ))),
    }
}

fn parse_instance_name(elem: &Elem) -> Result<CimInstanceName> {
    let classname = elem.require_attr("CLASSNAME")?.to_string();
    let mut keybindings = NocaseMap::new();
    for child in &elem.children {
        match child.name.as_str() {
            "KEYBINDING" => {
                let name = child.require_attr("NAME")?.to_string();
                let value_elem = child.only_child()?;
                let value = match value_elem.name.as_str() {
                    "KEYVALUE" => parse_keyvalue(value_elem)?,
                    "VALUE.REFERENCE" => {
                        CimValue::Reference(Box::new(parse_value_reference(value_elem)?))
                    }
                    other => {
                        return Err(CodecError::schema(format!(
                            "KEYBINDING has unexpected {other} child"
                        )))
                    }
                };
                keybindings.insert(name, value);
            }
            other => {
                return Err(CodecError::schema(format!(
                    "INSTANCENAME has unexpected {other} child"
                )))
            }
        }
    }
    Ok(CimInstanceName {
        classname,
        keybindings,
        namespace: None,
        host: None,
    })
}

/// `INSTANCEPATH` (host + namespace) or `LOCALINSTANCEPATH` (namespace).
fn parse_instance_path(elem: &Elem) -> Result<CimInstanceName> {
    match elem.name.as_str() {
        "INSTANCEPATH" => {
            let (host, namespace) = parse_namespace_path(elem.require_child("NAMESPACEPATH")?)?;
            let mut name = parse_instance_name(elem.require_child("INSTANCENAME")?)?;
            name.host = Some(host);
            name.namespace = Some(namespace);
            Ok(name)
        }
        "LOCALINSTANCEPATH" => {
            let namespace = parse_local_namespace(elem.require_child("LOCALNAMESPACEPATH")?)?;
            let mut name = parse_instance_name(elem.require_child("INSTANCENAME")?)?;
            name.namespace = Some(namespace);
            Ok(name)
        }
        other => Err(CodecError::schema(format!(
            "expected an instance path, found {other}"
        ))),
    }
}

fn parse_class_path(elem: &Elem) -> Result<CimClassName> {
    match elem.name.as_str() {
        "CLASSPATH" => {
            let (host, namespace) = parse_namespace_path(elem.require_child("NAMESPACEPATH")?)?;
            let classname = elem
                .require_child("CLASSNAME")?
                .require_attr("NAME")?
                .to_string();
            Ok(CimClassName {
                classname,
                namespace: Some(namespace),
                host: Some(host),
            })
        }
        "LOCALCLASSPATH" => {
            let namespace = parse_local_namespace(elem.require_child("LOCALNAMESPACEPATH")?)?;
            let classname = elem
                .require_child("CLASSNAME")?
                .require_attr("NAME")?
                .to_string();
            Ok(CimClassName {
                classname,
                namespace: Some(namespace),
                host: None,
            })
        }
        other => Err(CodecError::schema(format!(
            "expected a class path, found {other}"
        ))),
    }
}

fn parse_value_reference(elem: &Elem) -> Result<CimInstanceName> {
    let inner = elem.only_child()?;
    match inner.name.as_str() {
        "INSTANCENAME" => parse_instance_name(inner),
        "INSTANCEPATH" | "LOCALINSTANCEPATH" => parse_instance_path(inner),
        other => Err(CodecError::schema(format!(
            "VALUE.REFERENCE has unexpected {other} child"
        ))),
    }
}

fn parse_value_array(ty: CimType, elem: &Elem) -> Result<CimValue> {
    let mut array = wbem_types::CimArray::new(ty);
    for child in &elem.children {
        match child.name.as_str() {
            "VALUE" => array.push(Some(CimValue::parse(ty, &child.text)?))?,
            "VALUE.NULL" => array.push(None)?,
            other => {
                return Err(CodecError::schema(format!(
                    "VALUE.ARRAY has unexpected {other} child"
                )))
            }
        }
    }
    Ok(CimValue::Array(array))
}

fn parse_qualifier(elem: &Elem) -> Result<CimQualifier> {
    let name = elem.require_attr("NAME")?.to_string();
    let ty = attr_type(elem, "TYPE")?;
    let value = match (elem.child("VALUE"), elem.child("VALUE.ARRAY")) {
        (Some(value), _) => Some(CimValue::parse(ty, &value.text)?),
        (None, Some(array)) => Some(parse_value_array(ty, array)?),
        (None, None) => None,
    };
    Ok(CimQualifier {
        name,
        value,
        ty,
        propagated: attr_bool(elem, "PROPAGATED")?,
        overridable: attr_bool(elem, "OVERRIDABLE")?,
        tosubclass: attr_bool(elem, "TOSUBCLASS")?,
        toinstance: attr_bool(elem, "TOINSTANCE")?,
        translatable: attr_bool(elem, "TRANSLATABLE")?,
    })
}

fn parse_qualifiers(elem: &Elem) -> Result<NocaseMap<CimQualifier>> {
    let mut qualifiers = NocaseMap::new();
    for child in elem.children_named("QUALIFIER") {
        let qualifier = parse_qualifier(child)?;
        qualifiers.insert(qualifier.name.clone(), qualifier);
    }
    Ok(qualifiers)
}

fn embedded_object_attr(elem: &Elem) -> Result<Option<EmbeddedObjectKind>> {
    // both spellings occur in the wild
    let attr = elem.attr("EmbeddedObject").or_else(|| elem.attr("EMBEDDEDOBJECT"));
    match attr {
        None => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| CodecError::schema(format!("unknown EmbeddedObject kind {v:?}"))),
    }
}

fn parse_property_any(elem: &Elem) -> Result<CimProperty> {
    let name = elem.require_attr("NAME")?.to_string();
    let class_origin = elem.attr("CLASSORIGIN").map(str::to_string);
    let propagated = attr_bool(elem, "PROPAGATED")?;
    let qualifiers = parse_qualifiers(elem)?;

    let mut property = match elem.name.as_str() {
        "PROPERTY" => {
            let ty = attr_type(elem, "TYPE")?;
            let value = match elem.child("VALUE") {
                Some(value) => Some(CimValue::parse(ty, &value.text)?),
                None => None,
            };
            CimProperty {
                name,
                value,
                ty,
                is_array: false,
                array_size: None,
                reference_class: None,
                embedded_object: embedded_object_attr(elem)?,
                class_origin,
                propagated,
                qualifiers,
            }
        }
        "PROPERTY.ARRAY" => {
            let ty = attr_type(elem, "TYPE")?;
            let value = match elem.child("VALUE.ARRAY") {
                Some(array) => Some(parse_value_array(ty, array)?),
                None => None,
            };
            CimProperty {
                name,
                value,
                ty,
                is_array: true,
                array_size: attr_u32(elem, "ARRAYSIZE")?,
                reference_class: None,
                embedded_object: embedded_object_attr(elem)?,
                class_origin,
                propagated,
                qualifiers,
            }
        }
        "PROPERTY.REFERENCE" => {
            let value = match elem.child("VALUE.REFERENCE") {
                Some(reference) => Some(CimValue::Reference(Box::new(parse_value_reference(
                    reference,
                )?))),
                None => None,
            };
            CimProperty {
                name,
                value,
                ty: CimType::Reference,
                is_array: false,
                array_size: None,
                reference_class: elem.attr("REFERENCECLASS").map(str::to_string),
                embedded_object: None,
                class_origin,
                propagated,
                qualifiers,
            }
        }
        other => {
            return Err(CodecError::schema(format!(
                "expected a property element, found {other}"
            )))
        }
    };
    // embedded-object values stay as their raw XML string; the flag is
    // only valid on string-typed slots
    if property.embedded_object.is_some() && property.ty != CimType::String {
        property.embedded_object = None;
    }
    Ok(property)
}

fn parse_instance(elem: &Elem) -> Result<CimInstance> {
    if elem.name != "INSTANCE" {
        return Err(CodecError::schema(format!(
            "expected INSTANCE, found {}",
            elem.name
        )));
    }
    let classname = elem.require_attr("CLASSNAME")?.to_string();
    let mut instance = CimInstance::new(classname);
    instance.qualifiers = parse_qualifiers(elem)?;
    for child in &elem.children {
        match child.name.as_str() {
            "PROPERTY" | "PROPERTY.ARRAY" | "PROPERTY.REFERENCE" => {
                instance.add_property(parse_property_any(child)?);
            }
            "QUALIFIER" => {}
            other => {
                return Err(CodecError::schema(format!(
                    "INSTANCE has unexpected {other} child"
                )))
            }
        }
    }
    Ok(instance)
}

fn parse_parameter_any(elem: &Elem) -> Result<CimParameter> {
    let name = elem.require_attr("NAME")?.to_string();
    let qualifiers = parse_qualifiers(elem)?;
    let (ty, is_array, reference_class) = match elem.name.as_str() {
        "PARAMETER" => (attr_type(elem, "TYPE")?, false, None),
        "PARAMETER.ARRAY" => (attr_type(elem, "TYPE")?, true, None),
        "PARAMETER.REFERENCE" => (
            CimType::Reference,
            false,
            elem.attr("REFERENCECLASS").map(str::to_string),
        ),
        "PARAMETER.REFARRAY" => (
            CimType::Reference,
            true,
            elem.attr("REFERENCECLASS").map(str::to_string),
        ),
        other => {
            return Err(CodecError::schema(format!(
                "expected a parameter element, found {other}"
            )))
        }
    };
    Ok(CimParameter {
        name,
        ty,
        is_array,
        array_size: attr_u32(elem, "ARRAYSIZE")?,
        reference_class,
        qualifiers,
    })
}

fn parse_method(elem: &Elem) -> Result<CimMethod> {
    let name = elem.require_attr("NAME")?.to_string();
    let return_type = attr_type(elem, "TYPE")?;
    let mut method = CimMethod::new(name, return_type);
    method.class_origin = elem.attr("CLASSORIGIN").map(str::to_string);
    method.propagated = attr_bool(elem, "PROPAGATED")?;
    method.qualifiers = parse_qualifiers(elem)?;
    for child in &elem.children {
        match child.name.as_str() {
            "PARAMETER" | "PARAMETER.ARRAY" | "PARAMETER.REFERENCE" | "PARAMETER.REFARRAY" => {
                let parameter = parse_parameter_any(child)?;
                method.parameters.insert(parameter.name.clone(), parameter);
            }
            "QUALIFIER" => {}
            other => {
                return Err(CodecError::schema(format!(
                    "METHOD has unexpected {other} child"
                )))
            }
        }
    }
    Ok(method)
}

fn parse_class(elem: &Elem) -> Result<CimClass> {
    if elem.name != "CLASS" {
        return Err(CodecError::schema(format!(
            "expected CLASS, found {}",
            elem.name
        )));
    }
    let mut class = CimClass::new(elem.require_attr("NAME")?.to_string());
    class.superclass = elem.attr("SUPERCLASS").map(str::to_string);
    class.qualifiers = parse_qualifiers(elem)?;
    for child in &elem.children {
        match child.name.as_str() {
            "PROPERTY" | "PROPERTY.ARRAY" | "PROPERTY.REFERENCE" => {
                let property = parse_property_any(child)?;
                class.properties.insert(property.name.clone(), property);
            }
            "METHOD" => {
                let method = parse_method(child)?;
                class.methods.insert(method.name.clone(), method);
            }
            "QUALIFIER" => {}
            other => {
                return Err(CodecError::schema(format!(
                    "CLASS has unexpected {other} child"
                )))
            }
        }
    }
    Ok(class)
}

fn parse_qualifier_declaration(elem: &Elem) -> Result<CimQualifierDeclaration> {
    let name = elem.require_attr("NAME")?.to_string();
    let ty = attr_type(elem, "TYPE")?;
    let is_array = attr_bool(elem, "ISARRAY")?.unwrap_or(false);
    let mut scopes = Scopes::default();
    if let Some(scope) = elem.child("SCOPE") {
        for (attr, value) in &scope.attrs {
            if value.eq_ignore_ascii_case("true") {
                scopes.set(attr, true);
            }
        }
    }
    let value = match (elem.child("VALUE"), elem.child("VALUE.ARRAY")) {
        (Some(value), _) => Some(CimValue::parse(ty, &value.text)?),
        (None, Some(array)) => Some(parse_value_array(ty, array)?),
        (None, None) => None,
    };
    Ok(CimQualifierDeclaration {
        name,
        ty,
        value,
        is_array,
        array_size: attr_u32(elem, "ARRAYSIZE")?,
        scopes,
        overridable: attr_bool(elem, "OVERRIDABLE")?,
        tosubclass: attr_bool(elem, "TOSUBCLASS")?,
        toinstance: attr_bool(elem, "TOINSTANCE")?,
        translatable: attr_bool(elem, "TRANSLATABLE")?,
    })
}

fn parse_return_item(elem: &Elem) -> Result<ReturnItem> {
    match elem.name.as_str() {
        "INSTANCE" => Ok(ReturnItem::Instance(parse_instance(elem)?)),
        "VALUE.NAMEDINSTANCE" => {
            let path = parse_instance_name(elem.require_child("INSTANCENAME")?)?;
            let mut instance = parse_instance(elem.require_child("INSTANCE")?)?;
            instance.path = Some(path);
            Ok(ReturnItem::NamedInstance(instance))
        }
        "VALUE.INSTANCEWITHPATH" => {
            let path = parse_instance_path(elem.require_child("INSTANCEPATH")?)?;
            let mut instance = parse_instance(elem.require_child("INSTANCE")?)?;
            instance.path = Some(path);
            Ok(ReturnItem::NamedInstance(instance))
        }
        "VALUE.OBJECTWITHPATH" | "VALUE.OBJECTWITHLOCALPATH" => {
            if let Some(instance_elem) = elem.child("INSTANCE") {
                let path_elem = elem
                    .child("INSTANCEPATH")
                    .or_else(|| elem.child("LOCALINSTANCEPATH"))
                    .ok_or_else(|| {
                        CodecError::schema(format!("{} lacks an instance path", elem.name))
                    })?;
                let mut instance = parse_instance(instance_elem)?;
                instance.path = Some(parse_instance_path(path_elem)?);
                Ok(ReturnItem::NamedInstance(instance))
            } else if let Some(class_elem) = elem.child("CLASS") {
                let path_elem = elem
                    .child("CLASSPATH")
                    .or_else(|| elem.child("LOCALCLASSPATH"))
                    .ok_or_else(|| {
                        CodecError::schema(format!("{} lacks a class path", elem.name))
                    })?;
                let mut class = parse_class(class_elem)?;
                class.path = Some(parse_class_path(path_elem)?);
                Ok(ReturnItem::Class(class))
            } else {
                Err(CodecError::schema(format!(
                    "{} carries neither an instance nor a class",
                    elem.name
                )))
            }
        }
        "INSTANCENAME" => Ok(ReturnItem::InstanceName(parse_instance_name(elem)?)),
        "INSTANCEPATH" | "LOCALINSTANCEPATH" => {
            Ok(ReturnItem::InstanceName(parse_instance_path(elem)?))
        }
        "OBJECTPATH" => {
            let inner = elem.only_child()?;
            match inner.name.as_str() {
                "INSTANCEPATH" | "LOCALINSTANCEPATH" => {
                    Ok(ReturnItem::InstanceName(parse_instance_path(inner)?))
                }
                "CLASSPATH" | "LOCALCLASSPATH" => {
                    Ok(ReturnItem::ClassName(parse_class_path(inner)?))
                }
                other => Err(CodecError::schema(format!(
                    "OBJECTPATH has unexpected {other} child"
                ))),
            }
        }
        "CLASS" => Ok(ReturnItem::Class(parse_class(elem)?)),
        "CLASSNAME" => Ok(ReturnItem::ClassName(CimClassName::new(
            elem.require_attr("NAME")?.to_string(),
        ))),
        "CLASSPATH" | "LOCALCLASSPATH" => Ok(ReturnItem::ClassName(parse_class_path(elem)?)),
        "QUALIFIER.DECLARATION" => Ok(ReturnItem::QualifierDeclaration(
            parse_qualifier_declaration(elem)?,
        )),
        "VALUE" => {
            let value = match elem.attr("TYPE") {
                Some(ty) => CimValue::parse(ty.parse().map_err(CodecError::Model)?, &elem.text)?,
                None => CimValue::String(elem.text.clone()),
            };
            Ok(ReturnItem::Value(value))
        }
        "VALUE.ARRAY" => {
            let ty = match elem.attr("TYPE") {
                Some(ty) => ty.parse().map_err(CodecError::Model)?,
                None => CimType::String,
            };
            Ok(ReturnItem::Value(parse_value_array(ty, elem)?))
        }
        other => Err(CodecError::schema(format!(
            "IRETURNVALUE has unexpected {other} child"
        ))),
    }
}

/// The value content model shared by `PARAMVALUE` and `RETURNVALUE`:
/// an optional `VALUE`, `VALUE.ARRAY`, `VALUE.REFERENCE`, or
/// `INSTANCENAME` child, typed by the `PARAMTYPE` attribute when given.
fn parse_value_content(elem: &Elem) -> Result<Option<CimValue>> {
    let ty: Option<CimType> = match elem.attr("PARAMTYPE") {
        Some(ty) => Some(ty.parse().map_err(CodecError::Model)?),
        None => None,
    };
    match elem.children.first() {
        None if elem.text.trim().is_empty() => Ok(None),
        None => Ok(Some(match ty {
            Some(ty) => CimValue::parse(ty, elem.text.trim())?,
            None => CimValue::String(elem.text.trim().to_string()),
        })),
        Some(child) => match child.name.as_str() {
            "VALUE" => Ok(Some(match ty {
                Some(ty) => CimValue::parse(ty, &child.text)?,
                None => CimValue::String(child.text.clone()),
            })),
            "VALUE.ARRAY" => Ok(Some(parse_value_array(ty.unwrap_or(CimType::String), child)?)),
            "VALUE.REFERENCE" => Ok(Some(CimValue::Reference(Box::new(
                parse_value_reference(child)?,
            )))),
            "INSTANCENAME" => Ok(Some(CimValue::Reference(Box::new(parse_instance_name(
                child,
            )?)))),
            other => Err(CodecError::schema(format!(
                "{} has unexpected {other} child",
                elem.name
            ))),
        },
    }
}

fn parse_paramvalue(elem: &Elem) -> Result<OutParam> {
    let name = elem.require_attr("NAME")?.to_string();
    let value = parse_value_content(elem)?;
    Ok(OutParam { name, value })
}

fn parse_error_elem(elem: &Elem) -> Result<CimErrorInfo> {
    let code = elem
        .require_attr("CODE")?
        .parse()
        .map_err(|_| CodecError::schema("ERROR CODE attribute is not an integer"))?;
    let description = elem.attr("DESCRIPTION").map(str::to_string);
    let mut instances = Vec::new();
    for child in elem.children_named("INSTANCE") {
        instances.push(parse_instance(child)?);
    }
    Ok(CimErrorInfo {
        code,
        description,
        instances,
    })
}

/// Envelope checks shared by every response kind: `CIM` root with major
/// version 2, a `MESSAGE` with an `ID` and protocol version 1.
fn parse_envelope(root: &Elem) -> Result<(String, &Elem)> {
    if root.name != "CIM" {
        return Err(CodecError::schema(format!(
            "top-level element is {}, expected CIM",
            root.name
        )));
    }
    for version_attr in ["CIMVERSION", "DTDVERSION"] {
        let version = root.require_attr(version_attr)?;
        if !version.starts_with("2.") {
            return Err(CodecError::schema(format!(
                "unsupported {version_attr} {version:?}"
            )));
        }
    }
    let message = root.require_child("MESSAGE")?;
    let id = message.require_attr("ID")?.to_string();
    let protocol = message.require_attr("PROTOCOLVERSION")?;
    if !protocol.starts_with("1.") {
        return Err(CodecError::schema(format!(
            "unsupported PROTOCOLVERSION {protocol:?}"
        )));
    }
    Ok((id, message))
}

fn find_method_response<'a>(
    message: &'a Elem,
    response_elem: &str,
    method: &str,
) -> Result<&'a Elem> {
    let simplersp = message.require_child("SIMPLERSP")?;
    let response = simplersp.require_child(response_elem)?;
    let name = response.require_attr("NAME")?;
    if !name.eq_ignore_ascii_case(method) {
        return Err(CodecError::schema(format!(
            "response is for method {name:?}, expected {method:?}"
        )));
    }
    Ok(response)
}

/// Parses an intrinsic operation response for the named method.
pub fn parse_imethodresponse(xml: &str, method: &str) -> Result<IMethodResponse> {
    let root = parse_tree(xml)?;
    let (message_id, message) = parse_envelope(&root)?;
    let response = find_method_response(message, "IMETHODRESPONSE", method)?;

    let error = match response.child("ERROR") {
        Some(elem) => Some(parse_error_elem(elem)?),
        None => None,
    };
    let mut return_items = Vec::new();
    let has_return_value = match response.child("IRETURNVALUE") {
        Some(elem) => {
            for child in &elem.children {
                return_items.push(parse_return_item(child)?);
            }
            true
        }
        None => false,
    };
    let mut out_params = Vec::new();
    for child in response.children_named("PARAMVALUE") {
        out_params.push(parse_paramvalue(child)?);
    }
    Ok(IMethodResponse {
        message_id,
        error,
        has_return_value,
        return_items,
        out_params,
    })
}

/// Parses an extrinsic method response for the named method.
pub fn parse_methodresponse(xml: &str, method: &str) -> Result<MethodResponse> {
    let root = parse_tree(xml)?;
    let (message_id, message) = parse_envelope(&root)?;
    let response = find_method_response(message, "METHODRESPONSE", method)?;

    let error = match response.child("ERROR") {
        Some(elem) => Some(parse_error_elem(elem)?),
        None => None,
    };
    let return_value = match response.child("RETURNVALUE") {
        Some(elem) => parse_value_content(elem)?,
        None => None,
    };
    let mut out_params = Vec::new();
    for child in response.children_named("PARAMVALUE") {
        out_params.push(parse_paramvalue(child)?);
    }
    Ok(MethodResponse {
        message_id,
        error,
        return_value,
        out_params,
    })
}

/// Parses an indication export request (listener boundary).
pub fn parse_expmethodcall(xml: &str) -> Result<ExportCall> {
    let root = parse_tree(xml)?;
    let (message_id, message) = parse_envelope(&root)?;
    let expreq = message.require_child("SIMPLEEXPREQ")?;
    let call = expreq.require_child("EXPMETHODCALL")?;
    let method = call.require_attr("NAME")?.to_string();
    let param = call
        .children_named("EXPPARAMVALUE")
        .find(|p| {
            p.attr("NAME")
                .map(|n| n.eq_ignore_ascii_case("NewIndication"))
                .unwrap_or(false)
        })
        .ok_or_else(|| CodecError::schema("EXPMETHODCALL lacks a NewIndication parameter"))?;
    let indication = parse_instance(param.require_child("INSTANCE")?)?;
    Ok(ExportCall {
        message_id,
        method,
        indication,
    })
}

/// Parses a standalone `VALUE.REFERENCE` fragment back into an instance
/// path. Inverse of [`crate::instance_name_to_xml`].
pub fn instance_name_from_xml(xml: &str) -> Result<CimInstanceName> {
    let root = parse_tree(xml)?;
    if root.name != "VALUE.REFERENCE" {
        return Err(CodecError::schema(format!(
            "expected VALUE.REFERENCE, found {}",
            root.name
        )));
    }
    parse_value_reference(&root)
}

/// Parses a standalone `QUALIFIER.DECLARATION` fragment. Inverse of
/// [`crate::qualifier_declaration_to_xml`].
pub fn qualifier_declaration_from_xml(xml: &str) -> Result<CimQualifierDeclaration> {
    let root = parse_tree(xml)?;
    if root.name != "QUALIFIER.DECLARATION" {
        return Err(CodecError::schema(format!(
            "expected QUALIFIER.DECLARATION, found {}",
            root.name
        )));
    }
    parse_qualifier_declaration(&root)
}

/// Parses the XML string stored in an embedded-object property.
pub fn parse_embedded_object(text: &str) -> Result<EmbeddedObject> {
    let root = parse_tree(text)?;
    match root.name.as_str() {
        "INSTANCE" => Ok(EmbeddedObject::Instance(parse_instance(&root)?)),
        "CLASS" => Ok(EmbeddedObject::Class(parse_class(&root)?)),
        other => Err(CodecError::schema(format!(
            "embedded object is {other}, expected INSTANCE or CLASS"
        ))),
    }
}

/// Validates a response `Content-Type` header: `application/xml` or
/// `text/xml`, optionally with a UTF-8-compatible `charset` parameter.
pub fn validate_content_type(header: &str) -> Result<()> {
    let mut parts = header.split(';');
    let media_type = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
    if media_type != "application/xml" && media_type != "text/xml" {
        return Err(CodecError::schema(format!(
            "invalid content type {media_type:?}"
        )));
    }
    for part in parts {
        let mut kv = part.splitn(2, '=');
        let key = kv.next().unwrap_or_default().trim().to_ascii_lowercase();
        if key == "charset" {
            let value = kv
                .next()
                .unwrap_or_default()
                .trim()
                .trim_matches('"')
                .to_ascii_lowercase();
            if value != "utf-8" && value != "utf8" && value != "us-ascii" {
                return Err(CodecError::schema(format!(
                    "unsupported charset {value:?}"
                )));
            }
        }
    }
    Ok(())
}
