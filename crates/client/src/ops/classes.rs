//! Class operations: schema retrieval and manipulation.

use super::{push_bool, push_property_list, EnumerateOptions, GetOptions, RequestOptions};
use crate::{Error, Result, WbemConnection};
use wbem_cimxml::{IParamValue, ReturnItem};
use wbem_types::CimClass;

impl WbemConnection {
    /// `GetClass`: retrieves one class declaration.
    pub async fn get_class(
        &self,
        classname: &str,
        namespace: Option<&str>,
        options: &GetOptions,
    ) -> Result<CimClass> {
        let namespace = namespace.unwrap_or_else(|| self.default_namespace());
        let mut params = vec![IParamValue::ClassName("ClassName", classname.to_string())];
        push_bool(&mut params, "LocalOnly", options.local_only);
        push_bool(&mut params, "IncludeQualifiers", options.include_qualifiers);
        push_bool(
            &mut params,
            "IncludeClassOrigin",
            options.include_class_origin,
        );
        push_property_list(&mut params, &options.property_list);

        let response = self
            .imethodcall("GetClass", namespace, params, &options.request)
            .await?;
        let mut items = response.return_items.into_iter();
        match (items.next(), items.next()) {
            (Some(ReturnItem::Class(class)), None) => Ok(class),
            _ => Err(Error::CimXmlParse(
                "GetClass did not return exactly one class".to_string(),
            )),
        }
    }

    /// `EnumerateClasses`: the class declarations below the optional
    /// starting class, in server order.
    pub async fn enumerate_classes(
        &self,
        classname: Option<&str>,
        namespace: Option<&str>,
        options: &EnumerateOptions,
    ) -> Result<Vec<CimClass>> {
        let namespace = namespace.unwrap_or_else(|| self.default_namespace());
        let mut params = Vec::new();
        if let Some(classname) = classname {
            params.push(IParamValue::ClassName("ClassName", classname.to_string()));
        }
        push_bool(&mut params, "DeepInheritance", options.deep_inheritance);
        push_bool(&mut params, "LocalOnly", options.local_only);
        push_bool(&mut params, "IncludeQualifiers", options.include_qualifiers);
        push_bool(
            &mut params,
            "IncludeClassOrigin",
            options.include_class_origin,
        );

        let response = self
            .imethodcall("EnumerateClasses", namespace, params, &options.request)
            .await?;
        let mut classes = Vec::with_capacity(response.return_items.len());
        for item in response.return_items {
            match item {
                ReturnItem::Class(class) => classes.push(class),
                other => {
                    return Err(Error::CimXmlParse(format!(
                        "EnumerateClasses returned an unexpected payload item: {other:?}"
                    )))
                }
            }
        }
        Ok(classes)
    }

    /// `EnumerateClassNames`: the class names below the optional
    /// starting class.
    pub async fn enumerate_class_names(
        &self,
        classname: Option<&str>,
        namespace: Option<&str>,
        deep_inheritance: Option<bool>,
        options: &RequestOptions,
    ) -> Result<Vec<String>> {
        let namespace = namespace.unwrap_or_else(|| self.default_namespace());
        let mut params = Vec::new();
        if let Some(classname) = classname {
            params.push(IParamValue::ClassName("ClassName", classname.to_string()));
        }
        push_bool(&mut params, "DeepInheritance", deep_inheritance);

        let response = self
            .imethodcall("EnumerateClassNames", namespace, params, options)
            .await?;
        let mut names = Vec::with_capacity(response.return_items.len());
        for item in response.return_items {
            match item {
                ReturnItem::ClassName(name) => names.push(name.classname),
                other => {
                    return Err(Error::CimXmlParse(format!(
                        "EnumerateClassNames returned an unexpected payload item: {other:?}"
                    )))
                }
            }
        }
        Ok(names)
    }

    /// `CreateClass`: creates the class in the namespace.
    pub async fn create_class(
        &self,
        class: &CimClass,
        namespace: Option<&str>,
        options: &RequestOptions,
    ) -> Result<()> {
        let namespace = namespace.unwrap_or_else(|| self.default_namespace());
        let params = vec![IParamValue::Class("NewClass", class.clone())];
        self.imethodcall("CreateClass", namespace, params, options)
            .await?;
        Ok(())
    }

    /// `ModifyClass`: replaces the class declaration.
    pub async fn modify_class(
        &self,
        class: &CimClass,
        namespace: Option<&str>,
        options: &RequestOptions,
    ) -> Result<()> {
        let namespace = namespace.unwrap_or_else(|| self.default_namespace());
        let params = vec![IParamValue::Class("ModifiedClass", class.clone())];
        self.imethodcall("ModifyClass", namespace, params, options)
            .await?;
        Ok(())
    }

    /// `DeleteClass`: deletes the class from the namespace.
    pub async fn delete_class(
        &self,
        classname: &str,
        namespace: Option<&str>,
        options: &RequestOptions,
    ) -> Result<()> {
        let namespace = namespace.unwrap_or_else(|| self.default_namespace());
        let params = vec![IParamValue::ClassName("ClassName", classname.to_string())];
        self.imethodcall("DeleteClass", namespace, params, options)
            .await?;
        Ok(())
    }
}
