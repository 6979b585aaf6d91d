//! A scripted WBEM server for end-to-end client tests: accepts real
//! TCP connections, captures every request, and answers from a fixed
//! list of canned replies.
#![allow(dead_code)]

use async_net::{TcpListener, TcpStream};
use futures_lite::future::block_on;
use futures_lite::{AsyncReadExt, AsyncWriteExt};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted reply.
#[derive(Clone, Debug)]
pub enum Reply {
    /// 200 with `application/xml` body
    Xml(String),
    /// A complete raw HTTP response
    Raw(String),
    /// Raw bytes followed by an immediate close
    RawClose(String),
    /// Accept the request and never answer
    Stall,
}

pub struct Server {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    accepts: Arc<AtomicUsize>,
    _task: async_global_executor::Task<()>,
}

impl Server {
    /// The URL clients should connect to.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The captured requests (head and body), in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// How many TCP connections were accepted.
    pub fn accepted(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !contains_head_end(&buf) {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let head_end = find_head_end(&buf) + 4;
    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);
    while buf.len() < head_end + content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Some(String::from_utf8_lossy(&buf).to_string())
}

fn find_head_end(buf: &[u8]) -> usize {
    buf.windows(4).position(|w| w == b"\r\n\r\n").unwrap_or(0)
}

fn contains_head_end(buf: &[u8]) -> bool {
    buf.windows(4).any(|w| w == b"\r\n\r\n")
}

fn render(reply: &Reply) -> Option<String> {
    match reply {
        Reply::Xml(body) => Some(format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/xml;charset=utf-8\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        )),
        Reply::Raw(text) | Reply::RawClose(text) => Some(text.clone()),
        Reply::Stall => None,
    }
}

/// Starts a scripted server. Each received request consumes the next
/// reply; the connection is kept alive between requests.
pub fn serve(replies: Vec<Reply>) -> Server {
    let _ = env_logger::builder().is_test(true).try_init();
    let listener = block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let accepts = Arc::new(AtomicUsize::new(0));
    let script = Arc::new(Mutex::new(VecDeque::from(replies)));

    let task_requests = Arc::clone(&requests);
    let task_accepts = Arc::clone(&accepts);
    let task = async_global_executor::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            task_accepts.fetch_add(1, Ordering::SeqCst);
            while let Some(request) = read_request(&mut stream).await {
                task_requests.lock().unwrap().push(request);
                let reply = script.lock().unwrap().pop_front();
                match reply.as_ref().and_then(render) {
                    Some(text) => {
                        if stream.write_all(text.as_bytes()).await.is_err() {
                            break;
                        }
                        if matches!(reply, Some(Reply::RawClose(_))) {
                            break;
                        }
                    }
                    None => {
                        if matches!(reply, Some(Reply::Stall)) {
                            async_io::Timer::after(Duration::from_secs(600)).await;
                        }
                        break;
                    }
                }
            }
        }
    });

    Server {
        addr,
        requests,
        accepts,
        _task: task,
    }
}

/// A success envelope around the given `IRETURNVALUE` content, plus any
/// extra elements (output parameters) after it.
pub fn imethod_response(method: &str, returned: &str, extra: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8" ?>"#,
            r#"<CIM CIMVERSION="2.0" DTDVERSION="2.0">"#,
            r#"<MESSAGE ID="1001" PROTOCOLVERSION="1.0"><SIMPLERSP>"#,
            r#"<IMETHODRESPONSE NAME="{}"><IRETURNVALUE>{}</IRETURNVALUE>{}"#,
            r#"</IMETHODRESPONSE></SIMPLERSP></MESSAGE></CIM>"#
        ),
        method, returned, extra
    )
}

/// An `ERROR` envelope with the given status code.
pub fn error_response(method: &str, code: u32, description: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8" ?>"#,
            r#"<CIM CIMVERSION="2.0" DTDVERSION="2.0">"#,
            r#"<MESSAGE ID="1001" PROTOCOLVERSION="1.0"><SIMPLERSP>"#,
            r#"<IMETHODRESPONSE NAME="{}">"#,
            r#"<ERROR CODE="{}" DESCRIPTION="{}"/>"#,
            r#"</IMETHODRESPONSE></SIMPLERSP></MESSAGE></CIM>"#
        ),
        method, code, description
    )
}

/// A `VALUE.NAMEDINSTANCE` fragment for a one-key instance.
pub fn named_instance(classname: &str, key: &str, value: &str) -> String {
    format!(
        concat!(
            r#"<VALUE.NAMEDINSTANCE>"#,
            r#"<INSTANCENAME CLASSNAME="{0}">"#,
            r#"<KEYBINDING NAME="{1}"><KEYVALUE VALUETYPE="string" TYPE="string">{2}</KEYVALUE></KEYBINDING>"#,
            r#"</INSTANCENAME>"#,
            r#"<INSTANCE CLASSNAME="{0}">"#,
            r#"<PROPERTY NAME="{1}" TYPE="string"><VALUE>{2}</VALUE></PROPERTY>"#,
            r#"</INSTANCE>"#,
            r#"</VALUE.NAMEDINSTANCE>"#
        ),
        classname, key, value
    )
}

/// The `EnumerationContext`/`EndOfSequence` output parameters of a pull
/// response.
pub fn pull_out_params(context: Option<&str>, eos: bool) -> String {
    let mut out = String::new();
    if let Some(context) = context {
        out.push_str(&format!(
            r#"<PARAMVALUE NAME="EnumerationContext" PARAMTYPE="string"><VALUE>{context}</VALUE></PARAMVALUE>"#
        ));
    }
    out.push_str(&format!(
        r#"<PARAMVALUE NAME="EndOfSequence" PARAMTYPE="boolean"><VALUE>{}</VALUE></PARAMVALUE>"#,
        if eos { "TRUE" } else { "FALSE" }
    ));
    out
}
