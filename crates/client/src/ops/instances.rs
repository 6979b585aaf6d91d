//! Instance operations: retrieval, enumeration, modification, query,
//! and the association/reference traversals.

use super::{
    instance_names, instances_with_paths, object_names, objects, push_bool, push_property_list,
    push_str, single_instance, AssociatorOptions, CimObject, EnumerateOptions, GetInstanceOptions,
    ModifyInstanceOptions, RequestOptions,
};
use crate::{Error, Result, WbemConnection};
use wbem_cimxml::{IParamValue, ReturnItem};
use wbem_types::{CimInstance, CimInstanceName, ObjectName};

impl WbemConnection {
    fn resolve_namespace<'a>(&'a self, explicit: Option<&'a str>) -> &'a str {
        explicit.unwrap_or_else(|| self.default_namespace())
    }

    /// `GetInstance`: retrieves one instance by path. The returned
    /// instance's `path` is the request target, namespace-qualified.
    pub async fn get_instance(
        &self,
        name: &CimInstanceName,
        options: &GetInstanceOptions,
    ) -> Result<CimInstance> {
        let namespace = self.resolve_namespace(name.namespace.as_deref());
        let mut params = vec![IParamValue::InstanceName("InstanceName", name.clone())];
        push_bool(&mut params, "LocalOnly", options.local_only);
        push_bool(&mut params, "IncludeQualifiers", options.include_qualifiers);
        push_bool(
            &mut params,
            "IncludeClassOrigin",
            options.include_class_origin,
        );
        push_property_list(&mut params, &options.property_list);

        let response = self
            .imethodcall("GetInstance", namespace, params, &options.request)
            .await?;
        let mut instance = single_instance("GetInstance", response)?;

        let mut path = name.clone();
        path.namespace = Some(namespace.to_string());
        instance.path = Some(path);
        Ok(instance)
    }

    /// `EnumerateInstances`: all instances of the class (and, subject to
    /// `DeepInheritance`, its subclasses), in server order.
    pub async fn enumerate_instances(
        &self,
        classname: &str,
        namespace: Option<&str>,
        options: &EnumerateOptions,
    ) -> Result<Vec<CimInstance>> {
        let namespace = self.resolve_namespace(namespace);
        let mut params = vec![IParamValue::ClassName("ClassName", classname.to_string())];
        push_bool(&mut params, "LocalOnly", options.local_only);
        push_bool(&mut params, "DeepInheritance", options.deep_inheritance);
        push_bool(&mut params, "IncludeQualifiers", options.include_qualifiers);
        push_bool(
            &mut params,
            "IncludeClassOrigin",
            options.include_class_origin,
        );
        push_property_list(&mut params, &options.property_list);

        let response = self
            .imethodcall("EnumerateInstances", namespace, params, &options.request)
            .await?;
        instances_with_paths("EnumerateInstances", response, namespace)
    }

    /// `EnumerateInstanceNames`: the instance paths of the class, in
    /// server order.
    pub async fn enumerate_instance_names(
        &self,
        classname: &str,
        namespace: Option<&str>,
        options: &RequestOptions,
    ) -> Result<Vec<CimInstanceName>> {
        let namespace = self.resolve_namespace(namespace);
        let params = vec![IParamValue::ClassName("ClassName", classname.to_string())];
        let response = self
            .imethodcall("EnumerateInstanceNames", namespace, params, options)
            .await?;
        instance_names("EnumerateInstanceNames", response, namespace)
    }

    /// `CreateInstance`: creates the instance and returns the path the
    /// server assigned. Any path on the argument is ignored.
    pub async fn create_instance(
        &self,
        instance: &CimInstance,
        namespace: Option<&str>,
        options: &RequestOptions,
    ) -> Result<CimInstanceName> {
        let namespace = self.resolve_namespace(
            namespace.or_else(|| {
                instance
                    .path
                    .as_ref()
                    .and_then(|path| path.namespace.as_deref())
            }),
        );
        let mut new_instance = instance.clone();
        new_instance.path = None;
        let params = vec![IParamValue::Instance("NewInstance", new_instance)];

        let response = self
            .imethodcall("CreateInstance", namespace, params, options)
            .await?;
        let mut items = response.return_items.into_iter();
        match (items.next(), items.next()) {
            (Some(ReturnItem::InstanceName(mut name)), None) => {
                if name.namespace.is_none() {
                    name.namespace = Some(namespace.to_string());
                }
                Ok(name)
            }
            _ => Err(Error::CimXmlParse(
                "CreateInstance did not return exactly one instance path".to_string(),
            )),
        }
    }

    /// `ModifyInstance`: updates the instance named by its `path`,
    /// which must be present.
    pub async fn modify_instance(
        &self,
        instance: &CimInstance,
        options: &ModifyInstanceOptions,
    ) -> Result<()> {
        let path = instance.path.as_ref().ok_or_else(|| {
            Error::InvalidRequest("ModifyInstance requires an instance with a path".to_string())
        })?;
        let namespace = self
            .resolve_namespace(path.namespace.as_deref())
            .to_string();
        let mut params = vec![IParamValue::NamedInstance(
            "ModifiedInstance",
            instance.clone(),
        )];
        push_bool(&mut params, "IncludeQualifiers", options.include_qualifiers);
        push_property_list(&mut params, &options.property_list);

        self.imethodcall("ModifyInstance", &namespace, params, &options.request)
            .await?;
        Ok(())
    }

    /// `DeleteInstance`: deletes the instance at the path.
    pub async fn delete_instance(
        &self,
        name: &CimInstanceName,
        options: &RequestOptions,
    ) -> Result<()> {
        let namespace = self.resolve_namespace(name.namespace.as_deref());
        let params = vec![IParamValue::InstanceName("InstanceName", name.clone())];
        self.imethodcall("DeleteInstance", namespace, params, options)
            .await?;
        Ok(())
    }

    /// `ExecQuery`: runs a query and returns the matching instances,
    /// without paths.
    pub async fn exec_query(
        &self,
        query_language: &str,
        query: &str,
        namespace: Option<&str>,
        options: &RequestOptions,
    ) -> Result<Vec<CimInstance>> {
        let namespace = self.resolve_namespace(namespace);
        let params = vec![
            IParamValue::Str("QueryLanguage", query_language.to_string()),
            IParamValue::Str("Query", query.to_string()),
        ];
        let response = self
            .imethodcall("ExecQuery", namespace, params, options)
            .await?;
        let mut instances = instances_with_paths("ExecQuery", response, namespace)?;
        for instance in &mut instances {
            instance.path = None;
        }
        Ok(instances)
    }

    fn association_params(
        object: &ObjectName,
        options: &AssociatorOptions,
        with_assoc: bool,
        with_flags: bool,
    ) -> Vec<IParamValue> {
        let mut params = vec![IParamValue::ObjectName("ObjectName", object.clone())];
        if with_assoc {
            push_str(&mut params, "AssocClass", options.assoc_class.clone());
        }
        push_str(&mut params, "ResultClass", options.result_class.clone());
        push_str(&mut params, "Role", options.role.clone());
        if with_assoc {
            push_str(&mut params, "ResultRole", options.result_role.clone());
        }
        if with_flags {
            push_bool(&mut params, "IncludeQualifiers", options.include_qualifiers);
            push_bool(
                &mut params,
                "IncludeClassOrigin",
                options.include_class_origin,
            );
            push_property_list(&mut params, &options.property_list);
        }
        params
    }

    /// `Associators`: the objects associated with the target —
    /// instances for an instance target, classes for a class target.
    pub async fn associators(
        &self,
        object: &ObjectName,
        options: &AssociatorOptions,
    ) -> Result<Vec<CimObject>> {
        let namespace = self.resolve_namespace(object.namespace());
        let params = Self::association_params(object, options, true, true);
        let response = self
            .imethodcall("Associators", namespace, params, &options.request)
            .await?;
        objects("Associators", response, namespace)
    }

    /// `AssociatorNames`: the paths of the associated objects.
    pub async fn associator_names(
        &self,
        object: &ObjectName,
        options: &AssociatorOptions,
    ) -> Result<Vec<ObjectName>> {
        let namespace = self.resolve_namespace(object.namespace());
        let params = Self::association_params(object, options, true, false);
        let response = self
            .imethodcall("AssociatorNames", namespace, params, &options.request)
            .await?;
        object_names("AssociatorNames", response, namespace)
    }

    /// `References`: the association objects referring to the target.
    pub async fn references(
        &self,
        object: &ObjectName,
        options: &AssociatorOptions,
    ) -> Result<Vec<CimObject>> {
        let namespace = self.resolve_namespace(object.namespace());
        let params = Self::association_params(object, options, false, true);
        let response = self
            .imethodcall("References", namespace, params, &options.request)
            .await?;
        objects("References", response, namespace)
    }

    /// `ReferenceNames`: the paths of the referring association objects.
    pub async fn reference_names(
        &self,
        object: &ObjectName,
        options: &AssociatorOptions,
    ) -> Result<Vec<ObjectName>> {
        let namespace = self.resolve_namespace(object.namespace());
        let params = Self::association_params(object, options, false, false);
        let response = self
            .imethodcall("ReferenceNames", namespace, params, &options.request)
            .await?;
        object_names("ReferenceNames", response, namespace)
    }
}
