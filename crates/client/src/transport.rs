use crate::proxy::{self, ProxyKind};
use async_net::TcpStream;
use std::fmt::Debug;
use std::future::Future;
use std::io::{Error, ErrorKind, Result};
use std::net::SocketAddr;
use url::Url;

/// The stream a connection runs its HTTP exchanges over.
///
/// Implementations pair a stream type with a `Config` carrying whatever
/// the connect step needs: TCP options for [`TcpStream`], a rustls
/// client config for the TLS wrapper. The client is generic over this
/// trait, so tests can substitute transports.
pub trait ClientTransport:
    Sized + futures_lite::AsyncRead + futures_lite::AsyncWrite + Unpin + Send + Sync + 'static
{
    /// Options consulted when connecting.
    type Config: Debug + Default + Send + Sync + Clone;

    /// The remote address of an established transport.
    fn peer_addr(&self) -> Result<SocketAddr>;

    /// Opens a transport to the URL's endpoint, honoring the config's
    /// proxy settings.
    fn connect(url: &Url, config: &Self::Config) -> impl Future<Output = Result<Self>> + Send;
}

/// TCP options, including the optional proxy for this target scheme.
#[derive(Clone, Debug, Default)]
pub struct TcpConfig {
    /// `TCP_NODELAY`
    pub nodelay: Option<bool>,
    /// IP TTL
    pub ttl: Option<u32>,
    /// Proxy URL (`http`, `socks5`, or `socks5h`)
    pub proxy: Option<Url>,
}

pub(crate) fn host_port(url: &Url) -> Result<(String, u16)> {
    let host = url
        .host_str()
        .ok_or_else(|| Error::new(ErrorKind::InvalidInput, "URL lacks a host"))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| Error::new(ErrorKind::InvalidInput, "URL lacks a port"))?;
    Ok((host.to_string(), port))
}

impl ClientTransport for TcpStream {
    type Config = TcpConfig;

    fn peer_addr(&self) -> Result<SocketAddr> {
        TcpStream::peer_addr(self)
    }

    async fn connect(url: &Url, config: &Self::Config) -> Result<Self> {
        let (host, port) = host_port(url)?;

        let stream = match &config.proxy {
            None => TcpStream::connect((host.as_str(), port)).await?,
            Some(proxy_url) => {
                let kind = proxy::proxy_kind(proxy_url)?;
                let (proxy_host, proxy_port) = proxy::proxy_host_port(proxy_url)?;
                let mut stream =
                    TcpStream::connect((proxy_host.as_str(), proxy_port)).await?;
                match kind {
                    ProxyKind::Socks5 => {
                        proxy::socks5_handshake(&mut stream, proxy_url, &host, port, true).await?
                    }
                    ProxyKind::Socks5h => {
                        proxy::socks5_handshake(&mut stream, proxy_url, &host, port, false).await?
                    }
                    ProxyKind::Http => {
                        // http targets stay untunneled; the request line
                        // switches to absolute form instead
                        if url.scheme() == "https" {
                            proxy::http_connect_tunnel(&mut stream, proxy_url, &host, port)
                                .await?;
                        }
                    }
                }
                stream
            }
        };

        if let Some(nodelay) = config.nodelay {
            stream.set_nodelay(nodelay)?;
        }
        if let Some(ttl) = config.ttl {
            stream.set_ttl(ttl)?;
        }
        Ok(stream)
    }
}
