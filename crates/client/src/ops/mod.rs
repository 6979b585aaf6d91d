//! The CIM operation surface of [`WbemConnection`]: one method per
//! operation, grouped by family. Each method normalizes its namespace,
//! builds the typed parameter list, runs the encode/transport/decode
//! round trip, and extracts the typed result. Results keep the server's
//! delivery order.
//!
//! [`WbemConnection`]: crate::WbemConnection

mod classes;
mod instances;
mod invoke;
mod pull;
mod qualifiers;

pub use pull::{EnumerationContext, InstanceChunk, OpenOptions, PathChunk};

use crate::cancel::CancelToken;
use crate::{Error, Result};
use std::time::Duration;
use wbem_cimxml::{IMethodResponse, IParamValue, ReturnItem};
use wbem_types::{CimClass, CimInstance, CimInstanceName, ObjectName};

/// Per-request overrides accepted by every operation.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    /// Overrides the connection's per-operation read timeout
    pub timeout: Option<Duration>,
    /// Cancellation signal, checked before connecting and raced against
    /// network I/O
    pub cancel: Option<CancelToken>,
}

/// Options of `GetInstance` and `GetClass`.
#[derive(Clone, Debug, Default)]
pub struct GetOptions {
    /// `LocalOnly`
    pub local_only: Option<bool>,
    /// `IncludeQualifiers`
    pub include_qualifiers: Option<bool>,
    /// `IncludeClassOrigin`
    pub include_class_origin: Option<bool>,
    /// `PropertyList`
    pub property_list: Option<Vec<String>>,
    /// Per-request overrides
    pub request: RequestOptions,
}

/// Options of `GetInstance`.
pub type GetInstanceOptions = GetOptions;

/// Options of the instance and class enumerations.
#[derive(Clone, Debug, Default)]
pub struct EnumerateOptions {
    /// `DeepInheritance`
    pub deep_inheritance: Option<bool>,
    /// `LocalOnly`
    pub local_only: Option<bool>,
    /// `IncludeQualifiers`
    pub include_qualifiers: Option<bool>,
    /// `IncludeClassOrigin`
    pub include_class_origin: Option<bool>,
    /// `PropertyList`
    pub property_list: Option<Vec<String>>,
    /// Per-request overrides
    pub request: RequestOptions,
}

/// Options of the association and reference operations.
#[derive(Clone, Debug, Default)]
pub struct AssociatorOptions {
    /// `AssocClass` (association operations only)
    pub assoc_class: Option<String>,
    /// `ResultClass`
    pub result_class: Option<String>,
    /// `Role`
    pub role: Option<String>,
    /// `ResultRole` (association operations only)
    pub result_role: Option<String>,
    /// `IncludeQualifiers`
    pub include_qualifiers: Option<bool>,
    /// `IncludeClassOrigin`
    pub include_class_origin: Option<bool>,
    /// `PropertyList`
    pub property_list: Option<Vec<String>>,
    /// Per-request overrides
    pub request: RequestOptions,
}

/// Options of `ModifyInstance`.
#[derive(Clone, Debug, Default)]
pub struct ModifyInstanceOptions {
    /// `IncludeQualifiers`
    pub include_qualifiers: Option<bool>,
    /// `PropertyList`
    pub property_list: Option<Vec<String>>,
    /// Per-request overrides
    pub request: RequestOptions,
}

/// An instance or class, as delivered by the association and reference
/// operations: instance targets yield instances, class targets classes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CimObject {
    /// An instance, with its path when the server sent one
    Instance(CimInstance),
    /// A class, with its path when the server sent one
    Class(CimClass),
}

pub(crate) fn push_bool(params: &mut Vec<IParamValue>, name: &'static str, value: Option<bool>) {
    if let Some(value) = value {
        params.push(IParamValue::Boolean(name, value));
    }
}

pub(crate) fn push_str(params: &mut Vec<IParamValue>, name: &'static str, value: Option<String>) {
    if let Some(value) = value {
        params.push(IParamValue::Str(name, value));
    }
}

pub(crate) fn push_property_list(
    params: &mut Vec<IParamValue>,
    value: &Option<Vec<String>>,
) {
    if let Some(list) = value {
        params.push(IParamValue::StringArray("PropertyList", list.clone()));
    }
}

fn unexpected(operation: &'static str, item: &ReturnItem) -> Error {
    Error::CimXmlParse(format!(
        "{operation} returned an unexpected payload item: {item:?}"
    ))
}

/// The single instance a `GetInstance`-shaped response must carry.
pub(crate) fn single_instance(
    operation: &'static str,
    response: IMethodResponse,
) -> Result<CimInstance> {
    let mut items = response.return_items.into_iter();
    match (items.next(), items.next()) {
        (Some(ReturnItem::Instance(instance)), None) => Ok(instance),
        (Some(ReturnItem::NamedInstance(instance)), None) => Ok(instance),
        (None, _) => Err(Error::CimXmlParse(format!(
            "{operation} returned no instance"
        ))),
        (Some(item), _) => Err(unexpected(operation, &item)),
    }
}

/// Instances with paths; a path missing its namespace inherits the
/// operation's.
pub(crate) fn instances_with_paths(
    operation: &'static str,
    response: IMethodResponse,
    namespace: &str,
) -> Result<Vec<CimInstance>> {
    let mut instances = Vec::with_capacity(response.return_items.len());
    for item in response.return_items {
        match item {
            ReturnItem::NamedInstance(mut instance) | ReturnItem::Instance(mut instance) => {
                if let Some(path) = &mut instance.path {
                    if path.namespace.is_none() {
                        path.namespace = Some(namespace.to_string());
                    }
                }
                instances.push(instance);
            }
            other => return Err(unexpected(operation, &other)),
        }
    }
    Ok(instances)
}

pub(crate) fn instance_names(
    operation: &'static str,
    response: IMethodResponse,
    namespace: &str,
) -> Result<Vec<CimInstanceName>> {
    let mut names = Vec::with_capacity(response.return_items.len());
    for item in response.return_items {
        match item {
            ReturnItem::InstanceName(mut name) => {
                if name.namespace.is_none() {
                    name.namespace = Some(namespace.to_string());
                }
                names.push(name);
            }
            other => return Err(unexpected(operation, &other)),
        }
    }
    Ok(names)
}

pub(crate) fn objects(
    operation: &'static str,
    response: IMethodResponse,
    namespace: &str,
) -> Result<Vec<CimObject>> {
    let mut objects = Vec::with_capacity(response.return_items.len());
    for item in response.return_items {
        match item {
            ReturnItem::NamedInstance(mut instance) | ReturnItem::Instance(mut instance) => {
                if let Some(path) = &mut instance.path {
                    if path.namespace.is_none() {
                        path.namespace = Some(namespace.to_string());
                    }
                }
                objects.push(CimObject::Instance(instance));
            }
            ReturnItem::Class(class) => objects.push(CimObject::Class(class)),
            other => return Err(unexpected(operation, &other)),
        }
    }
    Ok(objects)
}

pub(crate) fn object_names(
    operation: &'static str,
    response: IMethodResponse,
    namespace: &str,
) -> Result<Vec<ObjectName>> {
    let mut names = Vec::with_capacity(response.return_items.len());
    for item in response.return_items {
        match item {
            ReturnItem::InstanceName(mut name) => {
                if name.namespace.is_none() {
                    name.namespace = Some(namespace.to_string());
                }
                names.push(ObjectName::Instance(name));
            }
            ReturnItem::ClassName(mut name) => {
                if name.namespace.is_none() {
                    name.namespace = Some(namespace.to_string());
                }
                names.push(ObjectName::Class(name));
            }
            other => return Err(unexpected(operation, &other)),
        }
    }
    Ok(names)
}
