//! End-to-end operation behavior against a scripted server.

mod support;

use futures_lite::future::block_on;
use pretty_assertions::assert_eq;
use support::{error_response, imethod_response, named_instance, serve, Reply};
use wbem_client::{
    CancelToken, ConnectionConfig, EnumerateOptions, Error, GetInstanceOptions, RequestOptions,
    WbemConnection,
};
use wbem_types::{CimInstanceName, CimStatusCode, CimValue};

fn connect(server: &support::Server) -> WbemConnection {
    WbemConnection::connect(ConnectionConfig::new(server.url()).unwrap()).unwrap()
}

#[test]
fn get_instance_success() {
    let body = imethod_response(
        "GetInstance",
        concat!(
            r#"<INSTANCE CLASSNAME="PyWBEM_Person">"#,
            r#"<PROPERTY NAME="Name" TYPE="string"><VALUE>Fritz</VALUE></PROPERTY>"#,
            r#"<PROPERTY NAME="Address" TYPE="string"><VALUE>Fritz Town</VALUE></PROPERTY>"#,
            r#"</INSTANCE>"#
        ),
        "",
    );
    let server = serve(vec![Reply::Xml(body)]);
    let conn = connect(&server);

    let name = CimInstanceName::with_keybindings("PyWBEM_Person", [("Name", "Fritz")]);
    let instance = block_on(conn.get_instance(&name, &GetInstanceOptions::default())).unwrap();

    assert_eq!(instance.classname, "PyWBEM_Person");
    assert_eq!(
        instance.property_value("Name"),
        Some(&CimValue::from("Fritz"))
    );
    assert_eq!(
        instance.property_value("Address"),
        Some(&CimValue::from("Fritz Town"))
    );
    let path = instance.path.expect("path populated from the request");
    assert_eq!(path.namespace.as_deref(), Some("root/cimv2"));
    assert_eq!(path.keybindings.get("name"), Some(&CimValue::from("Fritz")));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].contains("POST /cimom HTTP/1.1"), "{}", requests[0]);
    assert!(requests[0].contains("CIMOperation: MethodCall"));
    assert!(requests[0].contains("CIMMethod: GetInstance"));
    assert!(requests[0].contains("CIMObject: root/cimv2"));
    assert!(requests[0].contains(r#"<IMETHODCALL NAME="GetInstance">"#));
}

#[test]
fn get_instance_not_found() {
    let server = serve(vec![Reply::Xml(error_response(
        "GetInstance",
        6,
        "not found",
    ))]);
    let conn = connect(&server);

    let name = CimInstanceName::with_keybindings("PyWBEM_Person", [("Name", "bad")]);
    let error = block_on(conn.get_instance(&name, &GetInstanceOptions::default())).unwrap_err();
    match error {
        Error::Cim(e) => {
            assert_eq!(e.code, 6);
            assert!(e.is(CimStatusCode::NotFound));
            assert_eq!(e.description.as_deref(), Some("not found"));
            assert_eq!(e.operation, "GetInstance");
        }
        other => panic!("expected a CIM error, got {other:?}"),
    }
}

#[test]
fn namespace_normalization() {
    let body = imethod_response("EnumerateInstances", "", "");
    let server = serve(vec![Reply::Xml(body)]);
    let conn = connect(&server);

    block_on(conn.enumerate_instances(
        "CIM_Foo",
        Some("//root/mycim//"),
        &EnumerateOptions::default(),
    ))
    .unwrap();

    let requests = server.requests();
    let request = &requests[0];
    assert!(request.contains("CIMObject: root/mycim\r\n"), "{request}");
    assert_eq!(request.matches("<NAMESPACE ").count(), 2, "{request}");
    assert!(request.contains(r#"<NAMESPACE NAME="root"/><NAMESPACE NAME="mycim"/>"#));
}

#[test]
fn wrong_top_level_element_is_cimxml_error() {
    let body = r#"<?xml version="1.0"?><CIMX CIMVERSION="2.0" DTDVERSION="2.0"></CIMX>"#;
    let server = serve(vec![Reply::Xml(body.to_string())]);
    let conn = connect(&server);

    let name = CimInstanceName::with_keybindings("CIM_Foo", [("ID", 1u64)]);
    let error = block_on(conn.get_instance(&name, &GetInstanceOptions::default())).unwrap_err();
    assert!(matches!(error, Error::CimXmlParse(_)), "{error:?}");
}

#[test]
fn garbage_body_is_xml_error() {
    let server = serve(vec![Reply::Xml("<<<not xml".to_string())]);
    let conn = connect(&server);

    let name = CimInstanceName::with_keybindings("CIM_Foo", [("ID", 1u64)]);
    let error = block_on(conn.get_instance(&name, &GetInstanceOptions::default())).unwrap_err();
    assert!(matches!(error, Error::XmlParse(_)), "{error:?}");
}

#[test]
fn invalid_content_type_is_header_error() {
    let body = "<html></html>";
    let raw = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let server = serve(vec![Reply::Raw(raw)]);
    let conn = connect(&server);

    let name = CimInstanceName::with_keybindings("CIM_Foo", [("ID", 1u64)]);
    let error = block_on(conn.get_instance(&name, &GetInstanceOptions::default())).unwrap_err();
    assert!(matches!(error, Error::HeaderParse(_)), "{error:?}");
}

#[test]
fn enumerate_instances_keeps_server_order() {
    let body = imethod_response(
        "EnumerateInstances",
        &format!(
            "{}{}{}",
            named_instance("CIM_Foo", "Name", "c"),
            named_instance("CIM_Foo", "Name", "a"),
            named_instance("CIM_Foo", "Name", "b"),
        ),
        "",
    );
    let server = serve(vec![Reply::Xml(body)]);
    let conn = connect(&server);

    let instances =
        block_on(conn.enumerate_instances("CIM_Foo", None, &EnumerateOptions::default())).unwrap();
    let names: Vec<_> = instances
        .iter()
        .map(|i| i.property_value("Name").unwrap().as_str().unwrap())
        .collect();
    assert_eq!(names, ["c", "a", "b"]);
    // paths inherit the operation namespace
    assert!(instances
        .iter()
        .all(|i| i.path.as_ref().unwrap().namespace.as_deref() == Some("root/cimv2")));
}

#[test]
fn invoke_method_returns_value_and_out_params() {
    let body = concat!(
        r#"<?xml version="1.0" encoding="utf-8" ?>"#,
        r#"<CIM CIMVERSION="2.0" DTDVERSION="2.0">"#,
        r#"<MESSAGE ID="1001" PROTOCOLVERSION="1.0"><SIMPLERSP>"#,
        r#"<METHODRESPONSE NAME="Reset">"#,
        r#"<RETURNVALUE PARAMTYPE="uint32"><VALUE>0</VALUE></RETURNVALUE>"#,
        r#"<PARAMVALUE NAME="Status" PARAMTYPE="string"><VALUE>done</VALUE></PARAMVALUE>"#,
        r#"</METHODRESPONSE></SIMPLERSP></MESSAGE></CIM>"#
    );
    let server = serve(vec![Reply::Xml(body.to_string())]);
    let conn = connect(&server);

    let target = CimInstanceName::with_keybindings("CIM_Foo", [("ID", 1u64)]);
    let (ret, out) = block_on(conn.invoke_method(
        "Reset",
        target,
        vec![wbem_client::MethodParamValue::new("Force", true)],
        &RequestOptions::default(),
    ))
    .unwrap();

    assert_eq!(ret, Some(CimValue::Uint32(0)));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name, "Status");

    let requests = server.requests();
    assert!(requests[0].contains("CIMMethodCall: Reset"), "{}", requests[0]);
    assert!(requests[0].contains(r#"<METHODCALL NAME="Reset">"#));
    assert!(requests[0].contains("<LOCALINSTANCEPATH>"));
}

#[test]
fn cancelled_before_start() {
    // no server needed: the token is checked before connecting
    let config = ConnectionConfig::new("http://127.0.0.1:1").unwrap();
    let conn = WbemConnection::connect(config).unwrap();
    let token = CancelToken::new();
    token.cancel();

    let name = CimInstanceName::with_keybindings("CIM_Foo", [("ID", 1u64)]);
    let options = GetInstanceOptions {
        request: RequestOptions {
            timeout: None,
            cancel: Some(token),
        },
        ..GetInstanceOptions::default()
    };
    let error = block_on(conn.get_instance(&name, &options)).unwrap_err();
    assert!(matches!(error, Error::Cancelled), "{error:?}");
}

#[test]
fn keep_alive_reuses_the_connection() {
    let body = || {
        imethod_response(
            "GetInstance",
            r#"<INSTANCE CLASSNAME="CIM_Foo"><PROPERTY NAME="ID" TYPE="uint32"><VALUE>1</VALUE></PROPERTY></INSTANCE>"#,
            "",
        )
    };
    let server = serve(vec![Reply::Xml(body()), Reply::Xml(body())]);
    let conn = connect(&server);

    let name = CimInstanceName::with_keybindings("CIM_Foo", [("ID", 1u64)]);
    block_on(conn.get_instance(&name, &GetInstanceOptions::default())).unwrap();
    block_on(conn.get_instance(&name, &GetInstanceOptions::default())).unwrap();

    assert_eq!(server.requests().len(), 2);
    assert_eq!(server.accepted(), 1, "second request should reuse the socket");
}

#[test]
fn statistics_record_operations() {
    let body = imethod_response("EnumerateInstances", "", "");
    let server = serve(vec![Reply::Xml(body)]);
    let config = ConnectionConfig::new(server.url())
        .unwrap()
        .with_stats_enabled(true);
    let conn = WbemConnection::connect(config).unwrap();

    block_on(conn.enumerate_instances("CIM_Foo", None, &EnumerateOptions::default())).unwrap();

    let snapshot = conn.statistics().snapshot();
    assert_eq!(snapshot.len(), 1);
    let (name, stats) = &snapshot[0];
    assert_eq!(*name, "EnumerateInstances");
    assert_eq!(stats.count, 1);
    assert!(stats.request_len > 0);
    assert!(stats.reply_len > 0);
}
