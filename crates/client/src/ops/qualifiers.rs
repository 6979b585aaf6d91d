//! Qualifier declaration operations.

use super::RequestOptions;
use crate::{Error, Result, WbemConnection};
use wbem_cimxml::{IParamValue, ReturnItem};
use wbem_types::CimQualifierDeclaration;

impl WbemConnection {
    /// `GetQualifier`: retrieves one qualifier declaration by name.
    pub async fn get_qualifier(
        &self,
        name: &str,
        namespace: Option<&str>,
        options: &RequestOptions,
    ) -> Result<CimQualifierDeclaration> {
        let namespace = namespace.unwrap_or_else(|| self.default_namespace());
        let params = vec![IParamValue::Str("QualifierName", name.to_string())];
        let response = self
            .imethodcall("GetQualifier", namespace, params, options)
            .await?;
        let mut items = response.return_items.into_iter();
        match (items.next(), items.next()) {
            (Some(ReturnItem::QualifierDeclaration(declaration)), None) => Ok(declaration),
            _ => Err(Error::CimXmlParse(
                "GetQualifier did not return exactly one qualifier declaration".to_string(),
            )),
        }
    }

    /// `SetQualifier`: creates or replaces a qualifier declaration.
    pub async fn set_qualifier(
        &self,
        declaration: &CimQualifierDeclaration,
        namespace: Option<&str>,
        options: &RequestOptions,
    ) -> Result<()> {
        let namespace = namespace.unwrap_or_else(|| self.default_namespace());
        let params = vec![IParamValue::QualifierDeclaration(
            "QualifierDeclaration",
            declaration.clone(),
        )];
        self.imethodcall("SetQualifier", namespace, params, options)
            .await?;
        Ok(())
    }

    /// `DeleteQualifier`: deletes a qualifier declaration by name.
    pub async fn delete_qualifier(
        &self,
        name: &str,
        namespace: Option<&str>,
        options: &RequestOptions,
    ) -> Result<()> {
        let namespace = namespace.unwrap_or_else(|| self.default_namespace());
        let params = vec![IParamValue::Str("QualifierName", name.to_string())];
        self.imethodcall("DeleteQualifier", namespace, params, options)
            .await?;
        Ok(())
    }

    /// `EnumerateQualifiers`: all qualifier declarations of the
    /// namespace.
    pub async fn enumerate_qualifiers(
        &self,
        namespace: Option<&str>,
        options: &RequestOptions,
    ) -> Result<Vec<CimQualifierDeclaration>> {
        let namespace = namespace.unwrap_or_else(|| self.default_namespace());
        let response = self
            .imethodcall("EnumerateQualifiers", namespace, Vec::new(), options)
            .await?;
        let mut declarations = Vec::with_capacity(response.return_items.len());
        for item in response.return_items {
            match item {
                ReturnItem::QualifierDeclaration(declaration) => declarations.push(declaration),
                other => {
                    return Err(Error::CimXmlParse(format!(
                        "EnumerateQualifiers returned an unexpected payload item: {other:?}"
                    )))
                }
            }
        }
        Ok(declarations)
    }
}
