use crate::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default port for `http` WBEM endpoints.
pub const DEFAULT_HTTP_PORT: u16 = 5988;
/// Default port for `https` WBEM endpoints.
pub const DEFAULT_HTTPS_PORT: u16 = 5989;

/// The tri-state pull-operation mode of a connection.
///
/// `Auto` probes the pull dialect on the first iterable call and caches
/// the outcome on the connection; see the `iter_*` methods.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PullOperations {
    /// Try the pull dialect first, fall back on `CIM_ERR_NOT_SUPPORTED`
    /// and remember the answer
    #[default]
    Auto,
    /// Use the pull dialect only; fail if the server lacks it
    Always,
    /// Use the traditional dialect only
    Never,
}

/// Client certificate and key paths for TLS client authentication.
#[derive(Clone, Debug)]
pub struct X509 {
    /// PEM file with the client certificate (chain)
    pub cert_file: PathBuf,
    /// PEM file with the matching private key
    pub key_file: PathBuf,
}

/// Proxy endpoints, selected by target scheme.
///
/// Supported proxy URL schemes are `http`, `socks5` (client-side name
/// resolution), and `socks5h` (proxy-side name resolution). Credentials
/// go in the URL userinfo component.
#[derive(Clone, Debug, Default)]
pub struct Proxies {
    /// Proxy for `http` targets
    pub http: Option<Url>,
    /// Proxy for `https` targets
    pub https: Option<Url>,
}

impl Proxies {
    /// The proxy to use for the given target scheme.
    pub fn for_scheme(&self, scheme: &str) -> Option<&Url> {
        match scheme {
            "http" => self.http.as_ref(),
            "https" => self.https.as_ref(),
            _ => None,
        }
    }
}

/// Configuration of a WBEM connection: endpoint, credentials, TLS and
/// proxy options, timeouts, and retry tuning.
///
/// ```
/// use wbem_client::ConnectionConfig;
/// use std::time::Duration;
///
/// let config = ConnectionConfig::new("https://server.example.org")
///     .unwrap()
///     .with_credentials("operator", "secret")
///     .with_default_namespace("root/interop")
///     .with_timeout(Duration::from_secs(30));
/// assert_eq!(config.url.port(), Some(5989));
/// ```
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Server endpoint; the port defaults to 5988/5989 by scheme
    pub url: Url,
    /// Basic-auth credentials
    pub credentials: Option<(String, String)>,
    /// Namespace used when an operation names none
    pub default_namespace: String,
    /// CA bundle file or directory for server certificate validation;
    /// the platform's web trust roots are used when unset
    pub ca_certs: Option<PathBuf>,
    /// Disables server certificate validation entirely
    pub no_verification: bool,
    /// TLS client authentication
    pub x509: Option<X509>,
    /// Default per-operation read timeout
    pub timeout: Duration,
    /// Pull-dialect selection for the iterable operations
    pub use_pull_operations: PullOperations,
    /// Enables the per-operation statistics recorder
    pub stats_enabled: bool,
    /// Proxy endpoints by target scheme
    pub proxies: Proxies,
    /// TCP/TLS connect timeout per attempt
    pub connect_timeout: Duration,
    /// Retries for failures to establish a connection
    pub connect_retries: u32,
    /// Retries for responses that did not arrive in time or broke off
    pub read_retries: u32,
    /// Redirects followed before giving up
    pub redirect_retries: u32,
    /// Optional cap on the sum of retries across all classes
    pub total_retries: Option<u32>,
    /// Base of the exponential retry backoff, in seconds
    pub backoff_factor: f64,
}

impl ConnectionConfig {
    /// Parses the endpoint URL and applies the defaults.
    ///
    /// The scheme must be `http` or `https`; a missing port becomes the
    /// WBEM default for the scheme.
    pub fn new(url: impl AsRef<str>) -> Result<Self> {
        let mut url: Url = url
            .as_ref()
            .parse()
            .map_err(|e| Error::InvalidRequest(format!("malformed URL: {e}")))?;
        let default_port = match url.scheme() {
            "http" => DEFAULT_HTTP_PORT,
            "https" => DEFAULT_HTTPS_PORT,
            other => {
                return Err(Error::InvalidRequest(format!(
                    "unsupported URL scheme {other:?}"
                )))
            }
        };
        if url.host_str().is_none() {
            return Err(Error::InvalidRequest("URL lacks a host".to_string()));
        }
        if url.port().is_none() {
            url.set_port(Some(default_port))
                .map_err(|_| Error::InvalidRequest("URL cannot carry a port".to_string()))?;
        }
        Ok(Self {
            url,
            credentials: None,
            default_namespace: "root/cimv2".to_string(),
            ca_certs: None,
            no_verification: false,
            x509: None,
            timeout: Duration::from_secs(30),
            use_pull_operations: PullOperations::default(),
            stats_enabled: false,
            proxies: Proxies::default(),
            connect_timeout: Duration::from_secs(10),
            connect_retries: 3,
            read_retries: 3,
            redirect_retries: 5,
            total_retries: None,
            backoff_factor: 0.1,
        })
    }

    /// Sets the basic-auth credentials.
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((user.into(), password.into()));
        self
    }

    /// Sets the namespace used when an operation names none.
    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = namespace.into();
        self
    }

    /// Sets the CA bundle file or directory.
    pub fn with_ca_certs(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_certs = Some(path.into());
        self
    }

    /// Disables server certificate validation.
    pub fn with_no_verification(mut self, no_verification: bool) -> Self {
        self.no_verification = no_verification;
        self
    }

    /// Sets TLS client authentication.
    pub fn with_x509(mut self, x509: X509) -> Self {
        self.x509 = Some(x509);
        self
    }

    /// Sets the default per-operation read timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the pull-dialect mode.
    pub fn with_use_pull_operations(mut self, mode: PullOperations) -> Self {
        self.use_pull_operations = mode;
        self
    }

    /// Enables the statistics recorder.
    pub fn with_stats_enabled(mut self, enabled: bool) -> Self {
        self.stats_enabled = enabled;
        self
    }

    /// Sets the proxy endpoints.
    pub fn with_proxies(mut self, proxies: Proxies) -> Self {
        self.proxies = proxies;
        self
    }

    /// Sets the per-attempt connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the retry budget for connection establishment.
    pub fn with_connect_retries(mut self, retries: u32) -> Self {
        self.connect_retries = retries;
        self
    }

    /// Sets the retry budget for reads.
    pub fn with_read_retries(mut self, retries: u32) -> Self {
        self.read_retries = retries;
        self
    }

    /// Sets the number of redirects followed.
    pub fn with_redirect_retries(mut self, retries: u32) -> Self {
        self.redirect_retries = retries;
        self
    }

    /// Caps the sum of retries across all classes.
    pub fn with_total_retries(mut self, retries: u32) -> Self {
        self.total_retries = Some(retries);
        self
    }

    /// Sets the base of the exponential backoff, in seconds.
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports_by_scheme() {
        let http = ConnectionConfig::new("http://srv1").unwrap();
        assert_eq!(http.url.port(), Some(5988));
        let https = ConnectionConfig::new("https://srv1").unwrap();
        assert_eq!(https.url.port(), Some(5989));
        let explicit = ConnectionConfig::new("https://srv1:6989").unwrap();
        assert_eq!(explicit.url.port(), Some(6989));
    }

    #[test]
    fn rejects_unsupported_schemes() {
        assert!(matches!(
            ConnectionConfig::new("ftp://srv1"),
            Err(Error::InvalidRequest(_))
        ));
        assert!(ConnectionConfig::new("not a url").is_err());
    }

    #[test]
    fn defaults() {
        let config = ConnectionConfig::new("http://srv1").unwrap();
        assert_eq!(config.default_namespace, "root/cimv2");
        assert_eq!(config.use_pull_operations, PullOperations::Auto);
        assert_eq!(config.connect_retries, 3);
        assert!((config.backoff_factor - 0.1).abs() < f64::EPSILON);
        assert!(!config.stats_enabled);
    }
}
