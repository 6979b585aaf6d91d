//! The TLS-capable transport: a `Tcp`/`Tls` enum over any inner
//! [`ClientTransport`], with the rustls client configuration derived
//! from the connection options (CA bundle, disabled verification, x509
//! client authentication).

use crate::transport::{host_port, ClientTransport};
use crate::{ConnectionConfig, Error};
use futures_lite::{AsyncRead, AsyncWrite};
use futures_rustls::client::TlsStream;
use futures_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use futures_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use futures_rustls::rustls::{self, DigitallySignedStruct, RootCertStore, SignatureScheme};
use futures_rustls::TlsConnector;
use std::fmt::{self, Debug, Formatter};
use std::fs::File;
use std::io::{self, BufReader, ErrorKind};
use std::net::SocketAddr;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use url::Url;

/// A transport that is plain TCP for `http` targets and TLS for
/// `https` targets.
#[derive(Debug)]
pub enum RustlsTransport<T> {
    /// Unencrypted inner transport
    Tcp(T),
    /// TLS over the inner transport
    Tls(TlsStream<T>),
}

/// Configuration of [`RustlsTransport`]: the rustls client config plus
/// the inner transport's own config.
#[derive(Clone)]
pub struct RustlsConfig<C> {
    /// TLS client configuration
    pub rustls: Arc<rustls::ClientConfig>,
    /// Inner transport configuration
    pub tcp: C,
}

impl<C: Debug> Debug for RustlsConfig<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RustlsConfig")
            .field("rustls", &"..")
            .field("tcp", &self.tcp)
            .finish()
    }
}

impl<C: Default> Default for RustlsConfig<C> {
    fn default() -> Self {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        Self {
            rustls: Arc::new(
                rustls::ClientConfig::builder()
                    .with_root_certificates(roots)
                    .with_no_client_auth(),
            ),
            tcp: C::default(),
        }
    }
}

fn load_certs(path: &Path, roots: &mut RootCertStore) -> Result<(), Error> {
    let open_failed =
        |e: io::Error| Error::Connection(format!("cannot read CA bundle {path:?}: {e}"));
    let mut reader = BufReader::new(File::open(path).map_err(open_failed)?);
    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.map_err(open_failed)?;
        roots
            .add(cert)
            .map_err(|e| Error::Connection(format!("invalid certificate in {path:?}: {e}")))?;
    }
    Ok(())
}

/// Builds the rustls client config from the connection options.
pub(crate) fn build_client_config(
    config: &ConnectionConfig,
) -> Result<Arc<rustls::ClientConfig>, Error> {
    let mut roots = RootCertStore::empty();
    match &config.ca_certs {
        Some(path) if path.is_dir() => {
            let entries = std::fs::read_dir(path)
                .map_err(|e| Error::Connection(format!("cannot read CA directory {path:?}: {e}")))?;
            for entry in entries {
                let entry =
                    entry.map_err(|e| Error::Connection(format!("CA directory: {e}")))?;
                let file = entry.path();
                let is_pem = file
                    .extension()
                    .map(|ext| ext == "pem" || ext == "crt" || ext == "cer")
                    .unwrap_or(false);
                if is_pem {
                    load_certs(&file, &mut roots)?;
                }
            }
        }
        Some(path) => load_certs(path, &mut roots)?,
        None => roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned()),
    }

    let builder = rustls::ClientConfig::builder().with_root_certificates(roots);
    let mut tls_config = match &config.x509 {
        Some(x509) => {
            let mut cert_reader = BufReader::new(File::open(&x509.cert_file).map_err(|e| {
                Error::Connection(format!("cannot read client cert {:?}: {e}", x509.cert_file))
            })?);
            let certs = rustls_pemfile::certs(&mut cert_reader)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| {
                    Error::Connection(format!("invalid client cert {:?}: {e}", x509.cert_file))
                })?;
            let mut key_reader = BufReader::new(File::open(&x509.key_file).map_err(|e| {
                Error::Connection(format!("cannot read client key {:?}: {e}", x509.key_file))
            })?);
            let key = rustls_pemfile::private_key(&mut key_reader)
                .map_err(|e| {
                    Error::Connection(format!("invalid client key {:?}: {e}", x509.key_file))
                })?
                .ok_or_else(|| {
                    Error::Connection(format!("no private key in {:?}", x509.key_file))
                })?;
            builder
                .with_client_auth_cert(certs, key)
                .map_err(|e| Error::Connection(format!("client auth setup failed: {e}")))?
        }
        None => builder.with_no_client_auth(),
    };

    if config.no_verification {
        tls_config
            .dangerous()
            .set_certificate_verifier(Arc::new(DisabledVerification));
    }
    Ok(Arc::new(tls_config))
}

/// Accepts any server certificate. Installed only when the caller set
/// `no_verification`.
#[derive(Debug)]
struct DisabledVerification;

impl ServerCertVerifier for DisabledVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA1,
            SignatureScheme::ECDSA_SHA1_Legacy,
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
            SignatureScheme::ED448,
        ]
    }
}

impl<T: ClientTransport> AsyncRead for RustlsTransport<T> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            RustlsTransport::Tcp(t) => Pin::new(t).poll_read(cx, buf),
            RustlsTransport::Tls(t) => Pin::new(t).poll_read(cx, buf),
        }
    }
}

impl<T: ClientTransport> AsyncWrite for RustlsTransport<T> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            RustlsTransport::Tcp(t) => Pin::new(t).poll_write(cx, buf),
            RustlsTransport::Tls(t) => Pin::new(t).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            RustlsTransport::Tcp(t) => Pin::new(t).poll_flush(cx),
            RustlsTransport::Tls(t) => Pin::new(t).poll_flush(cx),
        }
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            RustlsTransport::Tcp(t) => Pin::new(t).poll_close(cx),
            RustlsTransport::Tls(t) => Pin::new(t).poll_close(cx),
        }
    }
}

impl<T: ClientTransport> ClientTransport for RustlsTransport<T> {
    type Config = RustlsConfig<T::Config>;

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        match self {
            RustlsTransport::Tcp(t) => t.peer_addr(),
            RustlsTransport::Tls(t) => t.get_ref().0.peer_addr(),
        }
    }

    async fn connect(url: &Url, config: &Self::Config) -> io::Result<Self> {
        match url.scheme() {
            "http" => Ok(RustlsTransport::Tcp(T::connect(url, &config.tcp).await?)),
            "https" => {
                let (host, _) = host_port(url)?;
                let inner = T::connect(url, &config.tcp).await?;
                let server_name = ServerName::try_from(host)
                    .map_err(|e| io::Error::new(ErrorKind::InvalidInput, e.to_string()))?;
                let connector = TlsConnector::from(Arc::clone(&config.rustls));
                let stream = connector.connect(server_name, inner).await?;
                Ok(RustlsTransport::Tls(stream))
            }
            other => Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("unknown scheme {other:?}"),
            )),
        }
    }
}
