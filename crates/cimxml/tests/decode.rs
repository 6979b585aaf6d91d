//! Decoder behavior against literal response documents.

use indoc::indoc;
use pretty_assertions::assert_eq;
use wbem_cimxml::{
    parse_expmethodcall, parse_imethodresponse, parse_methodresponse, validate_content_type,
    CodecError, ReturnItem,
};
use wbem_types::{CimValue, NocaseMap};

#[test]
fn get_instance_success() {
    let xml = indoc! {r#"
        <?xml version="1.0" encoding="utf-8" ?>
        <CIM CIMVERSION="2.0" DTDVERSION="2.0">
         <MESSAGE ID="1001" PROTOCOLVERSION="1.0">
          <SIMPLERSP>
           <IMETHODRESPONSE NAME="GetInstance">
            <IRETURNVALUE>
             <INSTANCE CLASSNAME="PyWBEM_Person">
              <PROPERTY NAME="Name" TYPE="string"><VALUE>Fritz</VALUE></PROPERTY>
              <PROPERTY NAME="Address" TYPE="string"><VALUE>Fritz Town</VALUE></PROPERTY>
             </INSTANCE>
            </IRETURNVALUE>
           </IMETHODRESPONSE>
          </SIMPLERSP>
         </MESSAGE>
        </CIM>
    "#};
    let response = parse_imethodresponse(xml, "GetInstance").unwrap();
    assert_eq!(response.message_id, "1001");
    assert!(response.error.is_none());
    assert!(response.has_return_value);
    let instance = match &response.return_items[..] {
        [ReturnItem::Instance(instance)] => instance,
        other => panic!("unexpected return items: {other:?}"),
    };
    assert_eq!(instance.classname, "PyWBEM_Person");
    assert_eq!(instance.property_value("Name"), Some(&CimValue::from("Fritz")));
    assert_eq!(
        instance.property_value("Address"),
        Some(&CimValue::from("Fritz Town"))
    );
}

#[test]
fn error_response_with_code() {
    let xml = indoc! {r#"
        <?xml version="1.0" encoding="utf-8" ?>
        <CIM CIMVERSION="2.0" DTDVERSION="2.0">
         <MESSAGE ID="42" PROTOCOLVERSION="1.0">
          <SIMPLERSP>
           <IMETHODRESPONSE NAME="GetInstance">
            <ERROR CODE="6" DESCRIPTION="The requested object could not be found"/>
           </IMETHODRESPONSE>
          </SIMPLERSP>
         </MESSAGE>
        </CIM>
    "#};
    let response = parse_imethodresponse(xml, "GetInstance").unwrap();
    let error = response.error.unwrap();
    assert_eq!(error.code, 6);
    assert_eq!(
        error.description.as_deref(),
        Some("The requested object could not be found")
    );
    assert!(error.instances.is_empty());
    assert!(!response.has_return_value);
}

#[test]
fn error_detail_instances() {
    let xml = indoc! {r#"
        <CIM CIMVERSION="2.0" DTDVERSION="2.0">
         <MESSAGE ID="1" PROTOCOLVERSION="1.0">
          <SIMPLERSP>
           <IMETHODRESPONSE NAME="GetInstance">
            <ERROR CODE="1">
             <INSTANCE CLASSNAME="CIM_Error">
              <PROPERTY NAME="CIMStatusCode" TYPE="uint32"><VALUE>1</VALUE></PROPERTY>
             </INSTANCE>
            </ERROR>
           </IMETHODRESPONSE>
          </SIMPLERSP>
         </MESSAGE>
        </CIM>
    "#};
    let response = parse_imethodresponse(xml, "GetInstance").unwrap();
    let error = response.error.unwrap();
    assert_eq!(error.instances.len(), 1);
    assert_eq!(error.instances[0].classname, "CIM_Error");
}

#[test]
fn wrong_top_level_element_is_schema_error() {
    let xml = r#"<CIMX CIMVERSION="2.0" DTDVERSION="2.0"><MESSAGE ID="1" PROTOCOLVERSION="1.0"/></CIMX>"#;
    match parse_imethodresponse(xml, "GetInstance") {
        Err(CodecError::Schema(message)) => assert!(message.contains("CIMX"), "{message}"),
        other => panic!("expected a schema error, got {other:?}"),
    }
}

#[test]
fn missing_message_id_is_schema_error() {
    let xml = r#"<CIM CIMVERSION="2.0" DTDVERSION="2.0"><MESSAGE PROTOCOLVERSION="1.0"/></CIM>"#;
    assert!(matches!(
        parse_imethodresponse(xml, "GetInstance"),
        Err(CodecError::Schema(_))
    ));
}

#[test]
fn malformed_xml_is_syntax_error() {
    assert!(matches!(
        parse_imethodresponse("<CIM><MESSAGE></CIM>", "GetInstance"),
        Err(CodecError::Syntax(_))
    ));
    assert!(matches!(
        parse_imethodresponse("not xml at all", "GetInstance"),
        Err(CodecError::Syntax(_))
    ));
}

#[test]
fn unsupported_version_rejected() {
    let xml = r#"<CIM CIMVERSION="3.0" DTDVERSION="2.0"><MESSAGE ID="1" PROTOCOLVERSION="1.0"/></CIM>"#;
    assert!(matches!(
        parse_imethodresponse(xml, "GetInstance"),
        Err(CodecError::Schema(_))
    ));
}

#[test]
fn method_name_mismatch_rejected() {
    let xml = indoc! {r#"
        <CIM CIMVERSION="2.0" DTDVERSION="2.0">
         <MESSAGE ID="1" PROTOCOLVERSION="1.0">
          <SIMPLERSP><IMETHODRESPONSE NAME="EnumerateInstances"/></SIMPLERSP>
         </MESSAGE>
        </CIM>
    "#};
    assert!(matches!(
        parse_imethodresponse(xml, "GetInstance"),
        Err(CodecError::Schema(_))
    ));
    // case differences are tolerated
    assert!(parse_imethodresponse(xml, "enumerateinstances").is_ok());
}

#[test]
fn pull_response_out_params() {
    let xml = indoc! {r#"
        <CIM CIMVERSION="2.0" DTDVERSION="2.0">
         <MESSAGE ID="7" PROTOCOLVERSION="1.0">
          <SIMPLERSP>
           <IMETHODRESPONSE NAME="OpenEnumerateInstances">
            <IRETURNVALUE>
             <VALUE.INSTANCEWITHPATH>
              <INSTANCEPATH>
               <NAMESPACEPATH>
                <HOST>srv1</HOST>
                <LOCALNAMESPACEPATH>
                 <NAMESPACE NAME="root"/>
                 <NAMESPACE NAME="cimv2"/>
                </LOCALNAMESPACEPATH>
               </NAMESPACEPATH>
               <INSTANCENAME CLASSNAME="CIM_Foo">
                <KEYBINDING NAME="ID">
                 <KEYVALUE VALUETYPE="numeric" TYPE="uint32">1</KEYVALUE>
                </KEYBINDING>
               </INSTANCENAME>
              </INSTANCEPATH>
              <INSTANCE CLASSNAME="CIM_Foo">
               <PROPERTY NAME="ID" TYPE="uint32"><VALUE>1</VALUE></PROPERTY>
              </INSTANCE>
             </VALUE.INSTANCEWITHPATH>
            </IRETURNVALUE>
            <PARAMVALUE NAME="EnumerationContext" PARAMTYPE="string"><VALUE>C1</VALUE></PARAMVALUE>
            <PARAMVALUE NAME="EndOfSequence" PARAMTYPE="boolean"><VALUE>FALSE</VALUE></PARAMVALUE>
           </IMETHODRESPONSE>
          </SIMPLERSP>
         </MESSAGE>
        </CIM>
    "#};
    let response = parse_imethodresponse(xml, "OpenEnumerateInstances").unwrap();
    assert_eq!(response.out_str("EnumerationContext").unwrap(), Some("C1"));
    assert_eq!(response.out_bool("EndOfSequence").unwrap(), Some(false));
    let instance = match &response.return_items[..] {
        [ReturnItem::NamedInstance(instance)] => instance,
        other => panic!("unexpected return items: {other:?}"),
    };
    let path = instance.path.as_ref().unwrap();
    assert_eq!(path.namespace.as_deref(), Some("root/cimv2"));
    assert_eq!(path.host.as_deref(), Some("srv1"));
    assert_eq!(path.keybindings.get("id"), Some(&CimValue::Uint32(1)));
}

#[test]
fn invoke_method_response() {
    let xml = indoc! {r#"
        <CIM CIMVERSION="2.0" DTDVERSION="2.0">
         <MESSAGE ID="9" PROTOCOLVERSION="1.0">
          <SIMPLERSP>
           <METHODRESPONSE NAME="Reset">
            <RETURNVALUE PARAMTYPE="uint32"><VALUE>0</VALUE></RETURNVALUE>
            <PARAMVALUE NAME="Status" PARAMTYPE="string"><VALUE>done</VALUE></PARAMVALUE>
           </METHODRESPONSE>
          </SIMPLERSP>
         </MESSAGE>
        </CIM>
    "#};
    let response = parse_methodresponse(xml, "Reset").unwrap();
    assert_eq!(response.return_value, Some(CimValue::Uint32(0)));
    assert_eq!(response.out_params.len(), 1);
    assert_eq!(response.out_params[0].name, "Status");
    assert_eq!(
        response.out_params[0].value,
        Some(CimValue::from("done"))
    );
}

#[test]
fn export_request() {
    let xml = indoc! {r#"
        <CIM CIMVERSION="2.0" DTDVERSION="2.0">
         <MESSAGE ID="1007" PROTOCOLVERSION="1.0">
          <SIMPLEEXPREQ>
           <EXPMETHODCALL NAME="ExportIndication">
            <EXPPARAMVALUE NAME="NewIndication">
             <INSTANCE CLASSNAME="CIM_AlertIndication">
              <PROPERTY NAME="Severity" TYPE="uint16"><VALUE>3</VALUE></PROPERTY>
             </INSTANCE>
            </EXPPARAMVALUE>
           </EXPMETHODCALL>
          </SIMPLEEXPREQ>
         </MESSAGE>
        </CIM>
    "#};
    let call = parse_expmethodcall(xml).unwrap();
    assert_eq!(call.message_id, "1007");
    assert_eq!(call.method, "ExportIndication");
    assert_eq!(call.indication.classname, "CIM_AlertIndication");
}

#[test]
fn unknown_return_element_rejected() {
    let xml = indoc! {r#"
        <CIM CIMVERSION="2.0" DTDVERSION="2.0">
         <MESSAGE ID="1" PROTOCOLVERSION="1.0">
          <SIMPLERSP>
           <IMETHODRESPONSE NAME="GetInstance">
            <IRETURNVALUE><SURPRISE/></IRETURNVALUE>
           </IMETHODRESPONSE>
          </SIMPLERSP>
         </MESSAGE>
        </CIM>
    "#};
    assert!(matches!(
        parse_imethodresponse(xml, "GetInstance"),
        Err(CodecError::Schema(_))
    ));
}

#[test]
fn unknown_attributes_tolerated() {
    let xml = indoc! {r#"
        <CIM CIMVERSION="2.0" DTDVERSION="2.0" VENDOR="acme">
         <MESSAGE ID="1" PROTOCOLVERSION="1.0" TRACE="on">
          <SIMPLERSP>
           <IMETHODRESPONSE NAME="DeleteInstance" EXTRA="x"/>
          </SIMPLERSP>
         </MESSAGE>
        </CIM>
    "#};
    assert!(parse_imethodresponse(xml, "DeleteInstance").is_ok());
}

#[test]
fn keybindings_lookup_case_insensitively() {
    let xml = indoc! {r#"
        <CIM CIMVERSION="2.0" DTDVERSION="2.0">
         <MESSAGE ID="1" PROTOCOLVERSION="1.0">
          <SIMPLERSP>
           <IMETHODRESPONSE NAME="EnumerateInstanceNames">
            <IRETURNVALUE>
             <INSTANCENAME CLASSNAME="CIM_Foo">
              <KEYBINDING NAME="SystemName">
               <KEYVALUE VALUETYPE="string">srv</KEYVALUE>
              </KEYBINDING>
             </INSTANCENAME>
            </IRETURNVALUE>
           </IMETHODRESPONSE>
          </SIMPLERSP>
         </MESSAGE>
        </CIM>
    "#};
    let response = parse_imethodresponse(xml, "EnumerateInstanceNames").unwrap();
    let name = match &response.return_items[..] {
        [ReturnItem::InstanceName(name)] => name,
        other => panic!("unexpected return items: {other:?}"),
    };
    let mut expected = NocaseMap::new();
    expected.insert("systemname", CimValue::from("srv"));
    assert_eq!(name.keybindings, expected);
}

#[test]
fn content_type_validation() {
    assert!(validate_content_type("application/xml").is_ok());
    assert!(validate_content_type("text/xml").is_ok());
    assert!(validate_content_type("application/xml; charset=utf-8").is_ok());
    assert!(validate_content_type("text/xml;charset=\"utf-8\"").is_ok());
    assert!(validate_content_type("text/html").is_err());
    assert!(validate_content_type("application/json").is_err());
    assert!(validate_content_type("application/xml; charset=latin-1").is_err());
    assert!(validate_content_type("").is_err());
}
