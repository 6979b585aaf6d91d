#![forbid(unsafe_code)]
#![deny(nonstandard_style, unused_qualifications)]

/*!
A CIM-over-HTTP (CIM-XML) client for WBEM servers.

[`WbemConnection`] is the entry point: configure it with
[`ConnectionConfig`], then call one method per CIM operation —
[`get_instance`], [`enumerate_instances`], [`invoke_method`], the class
and qualifier operations, the pull dialect (`open_*`/`pull_*`/
[`close_enumeration`]), and the `iter_*` facade that picks the dialect
per server.

The connection is a cheap clone safe to share across concurrent
workers: it owns a keep-alive HTTP pool, the optional statistics
recorder, and the write-once enumeration-dialect cache. Operations are
async, run under connect/read timeouts with per-class retries and
exponential backoff, and accept a [`CancelToken`].

TLS (1.2+) comes from rustls; certificate validation can be pointed at
a CA bundle, given a client certificate, or disabled outright. HTTP and
SOCKS5 proxies are supported per target scheme.

```no_run
use wbem_client::{ConnectionConfig, EnumerateOptions, WbemConnection};

# futures_lite::future::block_on(async {
let conn = WbemConnection::connect(
    ConnectionConfig::new("https://server.example.org")?
        .with_credentials("operator", "secret"),
)?;
for instance in conn
    .enumerate_instances("CIM_ComputerSystem", None, &EnumerateOptions::default())
    .await?
{
    println!("{}", instance.path.as_ref().unwrap());
}
# Ok::<(), wbem_client::Error>(()) });
```

[`get_instance`]: WbemConnection::get_instance
[`enumerate_instances`]: WbemConnection::enumerate_instances
[`invoke_method`]: WbemConnection::invoke_method
[`close_enumeration`]: WbemConnection::close_enumeration
*/

mod cancel;
mod config;
mod connection;
mod error;
mod http;
mod iter;
mod ops;
mod pool;
mod proxy;
mod retry;
mod rustls_transport;
mod session;
mod stats;
mod transport;

pub use cancel::CancelToken;
pub use config::{
    ConnectionConfig, Proxies, PullOperations, X509, DEFAULT_HTTPS_PORT, DEFAULT_HTTP_PORT,
};
pub use connection::WbemConnection;
pub use error::{CimError, Error, Result};
pub use iter::{InstanceIter, PathIter};
pub use ops::{
    AssociatorOptions, CimObject, EnumerateOptions, EnumerationContext, GetInstanceOptions,
    GetOptions, InstanceChunk, ModifyInstanceOptions, OpenOptions, PathChunk, RequestOptions,
};
pub use rustls_transport::{RustlsConfig, RustlsTransport};
pub use session::{InstanceEnumeration, PathEnumeration, SessionState};
pub use stats::{OperationStats, Statistics};
pub use transport::{ClientTransport, TcpConfig};

pub use wbem_cimxml::{MethodParamValue, OutParam};
