//! The pull dialect: `Open…`/`Pull…`/`CloseEnumeration`.
//!
//! Every open operation returns a first chunk plus the enumeration
//! context that names the server-side session; pulls continue it and
//! may replace the context. `EndOfSequence` is authoritative: once the
//! server reports it, the context is dead and must not be closed.

use super::{
    instance_names, instances_with_paths, push_bool, push_property_list, push_str,
    AssociatorOptions, EnumerateOptions, RequestOptions,
};
use crate::{Error, Result, WbemConnection};
use wbem_cimxml::{IMethodResponse, IParamValue};
use wbem_types::{CimInstance, CimInstanceName};

/// The token naming a server-side enumeration session, together with
/// the namespace it lives in (pulls must go to the same namespace).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumerationContext {
    /// The server's opaque context string
    pub context: String,
    /// The namespace the enumeration was opened against
    pub namespace: String,
}

/// One chunk of an instance enumeration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceChunk {
    /// The delivered instances, in server order
    pub instances: Vec<CimInstance>,
    /// The context for the next pull; `None` at end of sequence
    pub context: Option<EnumerationContext>,
    /// Whether the enumeration is exhausted
    pub eos: bool,
}

/// One chunk of an instance-path enumeration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathChunk {
    /// The delivered paths, in server order
    pub paths: Vec<CimInstanceName>,
    /// The context for the next pull; `None` at end of sequence
    pub context: Option<EnumerationContext>,
    /// Whether the enumeration is exhausted
    pub eos: bool,
}

/// Options of the `Open…` operations.
#[derive(Clone, Debug, Default)]
pub struct OpenOptions {
    /// `OperationTimeout`: server-side inactivity timeout of the
    /// enumeration session, in seconds. The client's own read timeout
    /// is independent and stricter.
    pub operation_timeout: Option<u32>,
    /// `ContinueOnError`: requires the server to advertise support, see
    /// [`WbemConnection::set_continue_on_error_supported`]
    pub continue_on_error: Option<bool>,
    /// `FilterQueryLanguage`
    pub filter_query_language: Option<String>,
    /// `FilterQuery`
    pub filter_query: Option<String>,
    /// Per-request overrides
    pub request: RequestOptions,
}

fn context_out_params(
    response: &IMethodResponse,
    operation: &'static str,
    namespace: &str,
) -> Result<(Option<EnumerationContext>, bool)> {
    let eos = response.out_bool("EndOfSequence")?.ok_or_else(|| {
        Error::CimXmlParse(format!("{operation} response lacks EndOfSequence"))
    })?;
    if eos {
        return Ok((None, true));
    }
    let context = response
        .out_str("EnumerationContext")?
        .filter(|context| !context.is_empty())
        .ok_or_else(|| {
            Error::CimXmlParse(format!(
                "{operation} response lacks an EnumerationContext before end of sequence"
            ))
        })?;
    Ok((
        Some(EnumerationContext {
            context: context.to_string(),
            namespace: namespace.to_string(),
        }),
        false,
    ))
}

impl WbemConnection {
    fn open_params(
        &self,
        options: &OpenOptions,
        max_object_count: u32,
    ) -> Result<Vec<IParamValue>> {
        if options.continue_on_error == Some(true) && !self.continue_on_error_supported() {
            return Err(Error::InvalidRequest(
                "ContinueOnError requested but the server has not been declared to support it"
                    .to_string(),
            ));
        }
        let mut params = Vec::new();
        push_str(
            &mut params,
            "FilterQueryLanguage",
            options.filter_query_language.clone(),
        );
        push_str(&mut params, "FilterQuery", options.filter_query.clone());
        if let Some(timeout) = options.operation_timeout {
            params.push(IParamValue::Uint32("OperationTimeout", timeout));
        }
        push_bool(&mut params, "ContinueOnError", options.continue_on_error);
        params.push(IParamValue::Uint32("MaxObjectCount", max_object_count));
        Ok(params)
    }

    async fn open_instances(
        &self,
        operation: &'static str,
        namespace: &str,
        mut params: Vec<IParamValue>,
        open: &OpenOptions,
        max_object_count: u32,
    ) -> Result<InstanceChunk> {
        params.extend(self.open_params(open, max_object_count)?);
        let response = self
            .imethodcall(operation, namespace, params, &open.request)
            .await?;
        let (context, eos) = context_out_params(&response, operation, namespace)?;
        let instances = instances_with_paths(operation, response, namespace)?;
        Ok(InstanceChunk {
            instances,
            context,
            eos,
        })
    }

    async fn open_paths(
        &self,
        operation: &'static str,
        namespace: &str,
        mut params: Vec<IParamValue>,
        open: &OpenOptions,
        max_object_count: u32,
    ) -> Result<PathChunk> {
        params.extend(self.open_params(open, max_object_count)?);
        let response = self
            .imethodcall(operation, namespace, params, &open.request)
            .await?;
        let (context, eos) = context_out_params(&response, operation, namespace)?;
        let paths = instance_names(operation, response, namespace)?;
        Ok(PathChunk {
            paths,
            context,
            eos,
        })
    }

    /// `OpenEnumerateInstances`: opens a pull enumeration of the
    /// instances of a class.
    pub async fn open_enumerate_instances(
        &self,
        classname: &str,
        namespace: Option<&str>,
        enumerate: &EnumerateOptions,
        open: &OpenOptions,
        max_object_count: u32,
    ) -> Result<InstanceChunk> {
        let namespace = namespace
            .unwrap_or_else(|| self.default_namespace())
            .to_string();
        let mut params = vec![IParamValue::ClassName("ClassName", classname.to_string())];
        push_bool(&mut params, "DeepInheritance", enumerate.deep_inheritance);
        push_bool(
            &mut params,
            "IncludeClassOrigin",
            enumerate.include_class_origin,
        );
        push_property_list(&mut params, &enumerate.property_list);
        self.open_instances(
            "OpenEnumerateInstances",
            &namespace,
            params,
            open,
            max_object_count,
        )
        .await
    }

    /// `OpenEnumerateInstancePaths`: opens a pull enumeration of the
    /// instance paths of a class.
    pub async fn open_enumerate_instance_paths(
        &self,
        classname: &str,
        namespace: Option<&str>,
        open: &OpenOptions,
        max_object_count: u32,
    ) -> Result<PathChunk> {
        let namespace = namespace
            .unwrap_or_else(|| self.default_namespace())
            .to_string();
        let params = vec![IParamValue::ClassName("ClassName", classname.to_string())];
        self.open_paths(
            "OpenEnumerateInstancePaths",
            &namespace,
            params,
            open,
            max_object_count,
        )
        .await
    }

    /// `OpenAssociatorInstances`: opens a pull enumeration of the
    /// instances associated with an instance.
    pub async fn open_associator_instances(
        &self,
        source: &CimInstanceName,
        filters: &AssociatorOptions,
        open: &OpenOptions,
        max_object_count: u32,
    ) -> Result<InstanceChunk> {
        let namespace = source
            .namespace
            .clone()
            .unwrap_or_else(|| self.default_namespace().to_string());
        let mut params = vec![IParamValue::InstanceName("InstanceName", source.clone())];
        push_str(&mut params, "AssocClass", filters.assoc_class.clone());
        push_str(&mut params, "ResultClass", filters.result_class.clone());
        push_str(&mut params, "Role", filters.role.clone());
        push_str(&mut params, "ResultRole", filters.result_role.clone());
        push_bool(
            &mut params,
            "IncludeClassOrigin",
            filters.include_class_origin,
        );
        push_property_list(&mut params, &filters.property_list);
        self.open_instances(
            "OpenAssociatorInstances",
            &namespace,
            params,
            open,
            max_object_count,
        )
        .await
    }

    /// `OpenAssociatorInstancePaths`: the path flavor of
    /// [`WbemConnection::open_associator_instances`].
    pub async fn open_associator_instance_paths(
        &self,
        source: &CimInstanceName,
        filters: &AssociatorOptions,
        open: &OpenOptions,
        max_object_count: u32,
    ) -> Result<PathChunk> {
        let namespace = source
            .namespace
            .clone()
            .unwrap_or_else(|| self.default_namespace().to_string());
        let mut params = vec![IParamValue::InstanceName("InstanceName", source.clone())];
        push_str(&mut params, "AssocClass", filters.assoc_class.clone());
        push_str(&mut params, "ResultClass", filters.result_class.clone());
        push_str(&mut params, "Role", filters.role.clone());
        push_str(&mut params, "ResultRole", filters.result_role.clone());
        self.open_paths(
            "OpenAssociatorInstancePaths",
            &namespace,
            params,
            open,
            max_object_count,
        )
        .await
    }

    /// `OpenReferenceInstances`: opens a pull enumeration of the
    /// association instances referring to an instance.
    pub async fn open_reference_instances(
        &self,
        source: &CimInstanceName,
        filters: &AssociatorOptions,
        open: &OpenOptions,
        max_object_count: u32,
    ) -> Result<InstanceChunk> {
        let namespace = source
            .namespace
            .clone()
            .unwrap_or_else(|| self.default_namespace().to_string());
        let mut params = vec![IParamValue::InstanceName("InstanceName", source.clone())];
        push_str(&mut params, "ResultClass", filters.result_class.clone());
        push_str(&mut params, "Role", filters.role.clone());
        push_bool(
            &mut params,
            "IncludeClassOrigin",
            filters.include_class_origin,
        );
        push_property_list(&mut params, &filters.property_list);
        self.open_instances(
            "OpenReferenceInstances",
            &namespace,
            params,
            open,
            max_object_count,
        )
        .await
    }

    /// `OpenReferenceInstancePaths`: the path flavor of
    /// [`WbemConnection::open_reference_instances`].
    pub async fn open_reference_instance_paths(
        &self,
        source: &CimInstanceName,
        filters: &AssociatorOptions,
        open: &OpenOptions,
        max_object_count: u32,
    ) -> Result<PathChunk> {
        let namespace = source
            .namespace
            .clone()
            .unwrap_or_else(|| self.default_namespace().to_string());
        let mut params = vec![IParamValue::InstanceName("InstanceName", source.clone())];
        push_str(&mut params, "ResultClass", filters.result_class.clone());
        push_str(&mut params, "Role", filters.role.clone());
        self.open_paths(
            "OpenReferenceInstancePaths",
            &namespace,
            params,
            open,
            max_object_count,
        )
        .await
    }

    /// `OpenQueryInstances`: opens a pull enumeration over a query
    /// result. The delivered instances carry no paths.
    pub async fn open_query_instances(
        &self,
        query_language: &str,
        query: &str,
        namespace: Option<&str>,
        open: &OpenOptions,
        max_object_count: u32,
    ) -> Result<InstanceChunk> {
        let namespace = namespace
            .unwrap_or_else(|| self.default_namespace())
            .to_string();
        let params = vec![
            IParamValue::Str("FilterQueryLanguage", query_language.to_string()),
            IParamValue::Str("FilterQuery", query.to_string()),
        ];
        // the filter belongs to the positional parameters here, so the
        // generic open options must not repeat it
        let mut open = open.clone();
        open.filter_query_language = None;
        open.filter_query = None;
        let mut chunk = self
            .open_instances(
                "OpenQueryInstances",
                &namespace,
                params,
                &open,
                max_object_count,
            )
            .await?;
        for instance in &mut chunk.instances {
            instance.path = None;
        }
        Ok(chunk)
    }

    /// `PullInstancesWithPath`: continues an instance enumeration.
    pub async fn pull_instances_with_path(
        &self,
        context: &EnumerationContext,
        max_object_count: u32,
        options: &RequestOptions,
    ) -> Result<InstanceChunk> {
        let params = vec![
            IParamValue::Str("EnumerationContext", context.context.clone()),
            IParamValue::Uint32("MaxObjectCount", max_object_count),
        ];
        let response = self
            .imethodcall(
                "PullInstancesWithPath",
                &context.namespace,
                params,
                options,
            )
            .await?;
        let (next, eos) =
            context_out_params(&response, "PullInstancesWithPath", &context.namespace)?;
        let instances =
            instances_with_paths("PullInstancesWithPath", response, &context.namespace)?;
        Ok(InstanceChunk {
            instances,
            context: next,
            eos,
        })
    }

    /// `PullInstancePaths`: continues an instance-path enumeration.
    pub async fn pull_instance_paths(
        &self,
        context: &EnumerationContext,
        max_object_count: u32,
        options: &RequestOptions,
    ) -> Result<PathChunk> {
        let params = vec![
            IParamValue::Str("EnumerationContext", context.context.clone()),
            IParamValue::Uint32("MaxObjectCount", max_object_count),
        ];
        let response = self
            .imethodcall("PullInstancePaths", &context.namespace, params, options)
            .await?;
        let (next, eos) = context_out_params(&response, "PullInstancePaths", &context.namespace)?;
        let paths = instance_names("PullInstancePaths", response, &context.namespace)?;
        Ok(PathChunk {
            paths,
            context: next,
            eos,
        })
    }

    /// `PullInstances`: continues a query enumeration; the instances
    /// carry no paths.
    pub async fn pull_instances(
        &self,
        context: &EnumerationContext,
        max_object_count: u32,
        options: &RequestOptions,
    ) -> Result<InstanceChunk> {
        let params = vec![
            IParamValue::Str("EnumerationContext", context.context.clone()),
            IParamValue::Uint32("MaxObjectCount", max_object_count),
        ];
        let response = self
            .imethodcall("PullInstances", &context.namespace, params, options)
            .await?;
        let (next, eos) = context_out_params(&response, "PullInstances", &context.namespace)?;
        let mut instances = instances_with_paths("PullInstances", response, &context.namespace)?;
        for instance in &mut instances {
            instance.path = None;
        }
        Ok(InstanceChunk {
            instances,
            context: next,
            eos,
        })
    }

    /// `CloseEnumeration`: abandons an open enumeration before its end
    /// of sequence.
    pub async fn close_enumeration(
        &self,
        context: &EnumerationContext,
        options: &RequestOptions,
    ) -> Result<()> {
        let params = vec![IParamValue::Str(
            "EnumerationContext",
            context.context.clone(),
        )];
        self.imethodcall("CloseEnumeration", &context.namespace, params, options)
            .await?;
        Ok(())
    }
}
