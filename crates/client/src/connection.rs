use crate::http::HttpClient;
use crate::rustls_transport::{build_client_config, RustlsConfig, RustlsTransport};
use crate::stats::Statistics;
use crate::transport::TcpConfig;
use crate::{CimError, ConnectionConfig, Error, RequestOptions, Result};
use async_net::TcpStream;
use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;
use url::Url;
use wbem_cimxml::{
    encode_imethodcall, encode_methodcall, normalize_namespace, parse_imethodresponse,
    parse_methodresponse, validate_content_type, IMethodResponse, IParamValue, MethodParamValue,
    MethodResponse,
};
use wbem_types::ObjectName;

/// What the connection has learned about the server's enumeration
/// dialect. Written once by the first auto-mode iterable call.
pub(crate) const PULL_UNKNOWN: u8 = 0;
pub(crate) const PULL_SUPPORTED: u8 = 1;
pub(crate) const PULL_UNSUPPORTED: u8 = 2;

/// A connection to one WBEM server.
///
/// The connection is a cheap clone sharing the HTTP pool, the
/// statistics recorder, and the enumeration-dialect cache; operation
/// methods take `&self` and are safe to call from concurrent workers.
/// Construction performs no I/O — the first operation opens the first
/// socket.
///
/// ```no_run
/// use wbem_client::{ConnectionConfig, GetInstanceOptions, WbemConnection};
/// use wbem_types::CimInstanceName;
///
/// # futures_lite::future::block_on(async {
/// let config = ConnectionConfig::new("https://server.example.org")?
///     .with_credentials("operator", "secret");
/// let conn = WbemConnection::connect(config)?;
///
/// let name = CimInstanceName::with_keybindings("PyWBEM_Person", [("Name", "Fritz")]);
/// let person = conn.get_instance(&name, &GetInstanceOptions::default()).await?;
/// println!("{}", person.property_value("Address").unwrap());
/// # Ok::<(), wbem_client::Error>(()) });
/// ```
#[derive(Clone)]
pub struct WbemConnection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    config: ConnectionConfig,
    url: Url,
    http: HttpClient<RustlsTransport<TcpStream>>,
    message_id: AtomicU64,
    stats: Statistics,
    pull_support: AtomicU8,
    continue_on_error_supported: AtomicBool,
}

impl Debug for WbemConnection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("WbemConnection")
            .field("url", &self.inner.url.as_str())
            .field("default_namespace", &self.inner.config.default_namespace)
            .finish()
    }
}

impl WbemConnection {
    /// Builds a connection from its configuration.
    ///
    /// TLS material is loaded here; the network is first touched by the
    /// first operation. The request path defaults to `/cimom` when the
    /// URL carries none.
    pub fn connect(config: ConnectionConfig) -> Result<Self> {
        let rustls = build_client_config(&config)?;
        let proxy = config.proxies.for_scheme(config.url.scheme()).cloned();
        let transport_config = RustlsConfig {
            rustls,
            tcp: TcpConfig {
                nodelay: Some(true),
                ttl: None,
                proxy,
            },
        };

        let mut url = config.url.clone();
        if url.path().is_empty() || url.path() == "/" {
            url.set_path("/cimom");
        }

        let stats = Statistics::new(config.stats_enabled);
        let http = HttpClient::new(config.clone(), transport_config);
        Ok(Self {
            inner: Arc::new(ConnectionInner {
                config,
                url,
                http,
                message_id: AtomicU64::new(1001),
                stats,
                pull_support: AtomicU8::new(PULL_UNKNOWN),
                continue_on_error_supported: AtomicBool::new(false),
            }),
        })
    }

    /// The connection's configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// The server endpoint, including the request path.
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// The per-operation statistics recorder.
    pub fn statistics(&self) -> &Statistics {
        &self.inner.stats
    }

    /// Declares whether the server advertises `ContinueOnError` support
    /// for pull enumerations. Requests with `continue_on_error = true`
    /// are rejected client-side until this is set.
    pub fn set_continue_on_error_supported(&self, supported: bool) {
        self.inner
            .continue_on_error_supported
            .store(supported, Ordering::SeqCst);
    }

    pub(crate) fn continue_on_error_supported(&self) -> bool {
        self.inner.continue_on_error_supported.load(Ordering::SeqCst)
    }

    /// The namespace used when the operation names none.
    pub fn default_namespace(&self) -> &str {
        &self.inner.config.default_namespace
    }

    pub(crate) fn pull_support(&self) -> u8 {
        self.inner.pull_support.load(Ordering::SeqCst)
    }

    /// Write-once classification of the server's enumeration dialect.
    pub(crate) fn record_pull_support(&self, value: u8) {
        let _ = self.inner.pull_support.compare_exchange(
            PULL_UNKNOWN,
            value,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    fn next_message_id(&self) -> u64 {
        self.inner.message_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn exchange(
        &self,
        operation: &'static str,
        op_headers: &[(&'static str, String)],
        body: Vec<u8>,
        options: &RequestOptions,
    ) -> Result<String> {
        let started = Instant::now();
        let timeout = options.timeout.unwrap_or(self.inner.config.timeout);
        let response = self
            .inner
            .http
            .request(
                &self.inner.url,
                op_headers,
                &body,
                timeout,
                options.cancel.as_ref(),
            )
            .await?;

        match response.header("content-type") {
            Some(content_type) => validate_content_type(content_type)
                .map_err(|e| Error::HeaderParse(e.to_string()))?,
            None => {
                return Err(Error::HeaderParse(
                    "response lacks a Content-Type header".to_string(),
                ))
            }
        }
        let text = String::from_utf8(response.body)
            .map_err(|_| Error::XmlParse("response body is not valid UTF-8".to_string()))?;

        self.inner
            .stats
            .record(operation, started.elapsed(), body.len(), text.len());
        Ok(text)
    }

    /// Runs one intrinsic operation against the namespace and surfaces
    /// a server `ERROR` element as [`Error::Cim`].
    pub(crate) async fn imethodcall(
        &self,
        operation: &'static str,
        namespace: &str,
        params: Vec<IParamValue>,
        options: &RequestOptions,
    ) -> Result<IMethodResponse> {
        let namespace = normalize_namespace(namespace);
        let body = encode_imethodcall(self.next_message_id(), operation, &namespace, &params)?;
        let op_headers = [
            (
                "Content-Type",
                "application/xml; charset=utf-8".to_string(),
            ),
            ("CIMOperation", "MethodCall".to_string()),
            ("CIMMethod", operation.to_string()),
            ("CIMObject", namespace),
        ];
        let text = self.exchange(operation, &op_headers, body, options).await?;
        let response = parse_imethodresponse(&text, operation)?;
        if let Some(error) = response.error {
            return Err(Error::Cim(CimError {
                code: error.code,
                description: error.description,
                instances: error.instances,
                operation,
            }));
        }
        Ok(response)
    }

    /// Runs one extrinsic method invocation against the target path.
    pub(crate) async fn methodcall(
        &self,
        method: &str,
        namespace: &str,
        target: &ObjectName,
        params: &[MethodParamValue],
        options: &RequestOptions,
    ) -> Result<MethodResponse> {
        let namespace = normalize_namespace(namespace);
        let body =
            encode_methodcall(self.next_message_id(), method, &namespace, target, params)?;

        // the CIMObject header names the target object in the namespace
        let cim_object = match target {
            ObjectName::Class(class) => format!("{namespace}:{}", class.classname),
            ObjectName::Instance(instance) => {
                let mut path = instance.clone();
                path.namespace = Some(namespace.clone());
                path.host = None;
                path.to_wbem_uri()
            }
        };
        let op_headers = [
            (
                "Content-Type",
                "application/xml; charset=utf-8".to_string(),
            ),
            ("CIMOperation", "MethodCall".to_string()),
            ("CIMMethodCall", method.to_string()),
            ("CIMObject", cim_object),
        ];
        let text = self
            .exchange("InvokeMethod", &op_headers, body, options)
            .await?;
        let response = parse_methodresponse(&text, method)?;
        if let Some(error) = response.error {
            return Err(Error::Cim(CimError {
                code: error.code,
                description: error.description,
                instances: error.instances,
                operation: "InvokeMethod",
            }));
        }
        Ok(response)
    }
}
