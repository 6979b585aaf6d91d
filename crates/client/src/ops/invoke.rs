//! Extrinsic method invocation.

use super::RequestOptions;
use crate::{Result, WbemConnection};
use wbem_cimxml::{MethodParamValue, OutParam};
use wbem_types::{CimValue, ObjectName};

impl WbemConnection {
    /// `InvokeMethod`: invokes an extrinsic method on a class or
    /// instance and returns the method's return value together with its
    /// output parameters, in server order.
    pub async fn invoke_method(
        &self,
        method_name: &str,
        object: impl Into<ObjectName>,
        params: Vec<MethodParamValue>,
        options: &RequestOptions,
    ) -> Result<(Option<CimValue>, Vec<OutParam>)> {
        let object = object.into();
        let namespace = object
            .namespace()
            .unwrap_or_else(|| self.default_namespace())
            .to_string();
        let response = self
            .methodcall(method_name, &namespace, &object, &params, options)
            .await?;
        Ok((response.return_value, response.out_params))
    }
}
