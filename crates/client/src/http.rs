//! The HTTP/1.1 exchange engine: hand-built request heads, httparse
//! response parsing, keep-alive pooling, and the per-class retry loop
//! with exponential backoff.
//!
//! Every network await is raced against the read (or connect) timeout
//! and the caller's cancellation token; a lost race abandons the
//! transport, which closes the socket.

use crate::cancel::CancelToken;
use crate::pool::{Pool, PoolEntry};
use crate::retry::{RetryClass, RetryController};
use crate::transport::{host_port, ClientTransport};
use crate::{ConnectionConfig, Error, Result};
use async_io::Timer;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use futures_lite::future::poll_once;
use futures_lite::{AsyncRead, AsyncReadExt, AsyncWriteExt, FutureExt};
use memchr::memmem::Finder;
use std::future::Future;
use std::io::{self, ErrorKind, Write};
use std::time::{Duration, Instant};
use url::Url;

const MAX_HEADERS: usize = 64;
const MAX_HEAD_LENGTH: usize = 16 * 1024;
const USER_AGENT: &str = concat!("wbem-client/", env!("CARGO_PKG_VERSION"));

/// How long a parked keep-alive connection stays eligible for reuse.
const POOL_IDLE_EXPIRY: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub(crate) struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

enum AttemptError {
    /// The connection could not be established
    Connect(io::Error),
    /// The exchange failed after the connection was up
    Read(io::Error),
    /// The read timeout elapsed
    Timeout,
    /// The caller's token fired
    Cancelled,
}

enum RaceLoss {
    Timeout,
    Cancelled,
}

async fn cancelled_opt(cancel: Option<&CancelToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

/// Races a future against a timer and the cancellation token. Losing
/// the race drops the future, and with it any transport it owns.
async fn bounded<F, O>(
    future: F,
    timeout: Duration,
    cancel: Option<&CancelToken>,
) -> std::result::Result<O, RaceLoss>
where
    F: Future<Output = O>,
{
    let work = async { Ok(future.await) };
    let deadline = async {
        Timer::after(timeout).await;
        Err(RaceLoss::Timeout)
    };
    let interrupted = async {
        cancelled_opt(cancel).await;
        Err(RaceLoss::Cancelled)
    };
    work.or(deadline).or(interrupted).await
}

pub(crate) struct HttpClient<T: ClientTransport> {
    config: ConnectionConfig,
    transport_config: T::Config,
    pool: Pool<T>,
    auth_header: Option<String>,
}

impl<T: ClientTransport> HttpClient<T> {
    pub fn new(config: ConnectionConfig, transport_config: T::Config) -> Self {
        let auth_header = config.credentials.as_ref().map(|(user, password)| {
            format!("Basic {}", BASE64.encode(format!("{user}:{password}")))
        });
        Self {
            config,
            transport_config,
            pool: Pool::default(),
            auth_header,
        }
    }

    /// True when requests must use the absolute-form request target
    /// (http target through an http proxy, no tunnel).
    fn absolute_form(&self, url: &Url) -> bool {
        url.scheme() == "http" && self.config.proxies.http.is_some()
    }

    fn build_head(
        &self,
        url: &Url,
        op_headers: &[(&'static str, String)],
        body_len: usize,
    ) -> io::Result<Vec<u8>> {
        let (host, port) = host_port(url)?;
        let mut buf = Vec::with_capacity(512);
        if self.absolute_form(url) {
            write!(buf, "POST {url} HTTP/1.1\r\n")?;
        } else {
            write!(buf, "POST {} HTTP/1.1\r\n", url.path())?;
        }
        write!(buf, "Host: {host}:{port}\r\n")?;
        write!(buf, "Connection: keep-alive\r\n")?;
        write!(buf, "User-Agent: {USER_AGENT}\r\n")?;
        write!(buf, "Content-Length: {body_len}\r\n")?;
        if let Some(auth) = &self.auth_header {
            write!(buf, "Authorization: {auth}\r\n")?;
        }
        if self.absolute_form(url) {
            if let Some(proxy) = &self.config.proxies.http {
                if let Some(auth) = crate::proxy::proxy_basic_auth(proxy) {
                    write!(buf, "Proxy-Authorization: {auth}\r\n")?;
                }
            }
        }
        for (name, value) in op_headers {
            write!(buf, "{name}: {value}\r\n")?;
        }
        write!(buf, "\r\n")?;
        log::trace!(
            "{}",
            String::from_utf8_lossy(&buf).replace("\r\n", "\r\n> ")
        );
        Ok(buf)
    }

    /// An unexpired parked transport that is still quiet. A transport
    /// with pending data (or EOF) was closed or spoken to by the peer
    /// and is discarded.
    async fn reusable_candidate(&self, origin: &str) -> Option<T> {
        let mut byte = [0u8; 1];
        for mut candidate in self.pool.candidates(origin) {
            if poll_once(candidate.read(&mut byte)).await.is_none() {
                log::debug!("reusing connection to {origin}");
                return Some(candidate);
            }
        }
        None
    }

    async fn attempt(
        &self,
        url: &Url,
        op_headers: &[(&'static str, String)],
        body: &[u8],
        read_timeout: Duration,
        cancel: Option<&CancelToken>,
    ) -> std::result::Result<HttpResponse, AttemptError> {
        let (host, port) = host_port(url).map_err(AttemptError::Connect)?;
        let origin = format!("{host}:{port}");

        let transport = match self.reusable_candidate(&origin).await {
            Some(transport) => transport,
            None => {
                let connecting = T::connect(url, &self.transport_config);
                match bounded(connecting, self.config.connect_timeout, cancel).await {
                    Ok(Ok(transport)) => {
                        if let Ok(peer) = transport.peer_addr() {
                            log::debug!("opened new connection to {peer}");
                        }
                        transport
                    }
                    Ok(Err(e)) => return Err(AttemptError::Connect(e)),
                    Err(RaceLoss::Timeout) => {
                        return Err(AttemptError::Connect(io::Error::new(
                            ErrorKind::TimedOut,
                            format!(
                                "connect to {origin} timed out after {:?}",
                                self.config.connect_timeout
                            ),
                        )))
                    }
                    Err(RaceLoss::Cancelled) => return Err(AttemptError::Cancelled),
                }
            }
        };

        let head = self
            .build_head(url, op_headers, body.len())
            .map_err(AttemptError::Read)?;

        let exchange = async move {
            let mut transport = transport;
            transport.write_all(&head).await?;
            transport.write_all(body).await?;
            transport.flush().await?;

            let (head_buf, leftover) = read_head(&mut transport).await?;
            let parsed = parse_head(&head_buf)?;
            let (body, delimited) = read_response_body(&mut transport, leftover, &parsed).await?;
            io::Result::Ok((parsed, body, delimited, transport))
        };

        match bounded(exchange, read_timeout, cancel).await {
            Ok(Ok((parsed, body, delimited, transport))) => {
                if parsed.keep_alive && delimited {
                    self.pool.insert(
                        origin,
                        PoolEntry::new(transport, Some(Instant::now() + POOL_IDLE_EXPIRY)),
                    );
                }
                Ok(HttpResponse {
                    status: parsed.status,
                    headers: parsed.headers,
                    body,
                })
            }
            Ok(Err(e)) => Err(AttemptError::Read(e)),
            Err(RaceLoss::Timeout) => Err(AttemptError::Timeout),
            Err(RaceLoss::Cancelled) => Err(AttemptError::Cancelled),
        }
    }

    /// Runs one logical request to completion: retries per failure
    /// class, follows redirects, and maps terminal failures onto the
    /// public error taxonomy.
    pub async fn request(
        &self,
        url: &Url,
        op_headers: &[(&'static str, String)],
        body: &[u8],
        read_timeout: Duration,
        cancel: Option<&CancelToken>,
    ) -> Result<HttpResponse> {
        if cancel.map(CancelToken::is_cancelled).unwrap_or(false) {
            return Err(Error::Cancelled);
        }
        let mut retry = RetryController::new(&self.config);
        let mut url = url.clone();
        loop {
            match self
                .attempt(&url, op_headers, body, read_timeout, cancel)
                .await
            {
                Ok(response) => match response.status {
                    200..=299 => return Ok(response),
                    401 | 407 => {
                        return Err(Error::Auth {
                            status: response.status,
                        })
                    }
                    301 | 302 | 303 | 307 | 308 => {
                        let status = response.status;
                        let location = response.header("location").ok_or(Error::Http { status })?;
                        let next = url.join(location).map_err(|e| {
                            Error::HeaderParse(format!("invalid Location {location:?}: {e}"))
                        })?;
                        match retry.next_delay(RetryClass::Redirect) {
                            Some(delay) => {
                                log::debug!("following redirect {status} to {next} in {delay:?}");
                                Timer::after(delay).await;
                                url = next;
                            }
                            None => return Err(Error::Http { status }),
                        }
                    }
                    status => return Err(Error::Http { status }),
                },
                Err(AttemptError::Connect(e)) => match retry.next_delay(RetryClass::Connect) {
                    Some(delay) => {
                        log::warn!("connect failed ({e}), retrying in {delay:?}");
                        Timer::after(delay).await;
                    }
                    None => return Err(Error::Connection(e.to_string())),
                },
                Err(AttemptError::Read(e)) => match retry.next_delay(RetryClass::Read) {
                    Some(delay) => {
                        log::warn!("exchange failed ({e}), retrying in {delay:?}");
                        Timer::after(delay).await;
                    }
                    None => return Err(Error::Connection(e.to_string())),
                },
                Err(AttemptError::Timeout) => match retry.next_delay(RetryClass::Read) {
                    Some(delay) => {
                        log::warn!("no response within {read_timeout:?}, retrying in {delay:?}");
                        Timer::after(delay).await;
                    }
                    None => return Err(Error::Timeout(read_timeout)),
                },
                Err(AttemptError::Cancelled) => return Err(Error::Cancelled),
            }
        }
    }
}

struct ParsedHead {
    status: u16,
    headers: Vec<(String, String)>,
    keep_alive: bool,
    content_length: Option<u64>,
    chunked: bool,
}

async fn read_head<T: AsyncRead + Unpin>(transport: &mut T) -> io::Result<(Vec<u8>, Vec<u8>)> {
    let finder = Finder::new(b"\r\n\r\n");
    let mut buf = Vec::with_capacity(1024);
    let mut len = 0;
    loop {
        buf.resize(len + 1024, 0);
        let bytes = transport.read(&mut buf[len..]).await?;
        buf.truncate(len + bytes);

        let search_start = len.saturating_sub(3);
        if let Some(index) = finder.find(&buf[search_start..]) {
            let split = search_start + index + 4;
            let rest = buf.split_off(split);
            log::trace!(
                "{}",
                String::from_utf8_lossy(&buf).replace("\r\n", "\r\n< ")
            );
            return Ok((buf, rest));
        }
        len += bytes;

        if bytes == 0 {
            return if len == 0 {
                Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "connection closed before a response arrived",
                ))
            } else {
                Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "connection closed inside the response head",
                ))
            };
        }
        if len >= MAX_HEAD_LENGTH {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                "response head too long",
            ));
        }
    }
}

fn parse_head(head: &[u8]) -> io::Result<ParsedHead> {
    let mut header_storage = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut response = httparse::Response::new(&mut header_storage);
    let status = response
        .parse(head)
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, format!("malformed head: {e}")))?;
    if status.is_partial() {
        return Err(io::Error::new(
            ErrorKind::UnexpectedEof,
            "partial response head",
        ));
    }
    let status = response
        .code
        .ok_or_else(|| io::Error::new(ErrorKind::InvalidData, "response lacks a status code"))?;

    let mut headers = Vec::with_capacity(response.headers.len());
    for header in response.headers.iter() {
        let value = std::str::from_utf8(header.value)
            .map_err(|e| io::Error::new(ErrorKind::InvalidData, format!("header value: {e}")))?;
        headers.push((header.name.to_string(), value.to_string()));
    }

    let find = |name: &str| {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    };
    let http11 = response.version == Some(1);
    let connection = find("connection").unwrap_or_default().to_ascii_lowercase();
    let keep_alive = if http11 {
        !connection.contains("close")
    } else {
        connection.contains("keep-alive")
    };
    let content_length = match find("content-length") {
        Some(v) => Some(v.trim().parse::<u64>().map_err(|_| {
            io::Error::new(ErrorKind::InvalidData, "malformed content-length")
        })?),
        None => None,
    };
    let chunked = find("transfer-encoding")
        .map(|v| v.to_ascii_lowercase().contains("chunked"))
        .unwrap_or(false);
    if chunked && content_length.is_some() {
        return Err(io::Error::new(
            ErrorKind::InvalidData,
            "both content-length and chunked transfer-encoding",
        ));
    }

    Ok(ParsedHead {
        status,
        headers,
        keep_alive,
        content_length,
        chunked,
    })
}

/// Collects the response body. The second value reports whether the
/// body was explicitly delimited (and the connection thus reusable).
async fn read_response_body<T: AsyncRead + Unpin>(
    transport: &mut T,
    leftover: Vec<u8>,
    head: &ParsedHead,
) -> io::Result<(Vec<u8>, bool)> {
    if head.chunked {
        let mut source = Buffered {
            transport,
            buf: leftover,
            pos: 0,
        };
        let mut body = Vec::new();
        loop {
            let line = source.line().await?;
            let size_text = line.split(';').next().unwrap_or_default().trim();
            let size = usize::from_str_radix(size_text, 16).map_err(|_| {
                io::Error::new(ErrorKind::InvalidData, "malformed chunk size")
            })?;
            if size == 0 {
                loop {
                    if source.line().await?.is_empty() {
                        break;
                    }
                }
                return Ok((body, true));
            }
            let start = body.len();
            body.resize(start + size, 0);
            source.exact(&mut body[start..]).await?;
            if !source.line().await?.is_empty() {
                return Err(io::Error::new(
                    ErrorKind::InvalidData,
                    "chunk data not followed by CRLF",
                ));
            }
        }
    } else if let Some(length) = head.content_length {
        let length = usize::try_from(length)
            .map_err(|_| io::Error::new(ErrorKind::InvalidData, "content-length too large"))?;
        let mut body = leftover;
        if body.len() < length {
            let start = body.len();
            body.resize(length, 0);
            transport.read_exact(&mut body[start..]).await?;
            Ok((body, true))
        } else {
            // more buffered than the response owns: do not reuse
            let extra = body.len() > length;
            body.truncate(length);
            Ok((body, !extra))
        }
    } else {
        // close-delimited body
        let mut body = leftover;
        transport.read_to_end(&mut body).await?;
        Ok((body, false))
    }
}

/// A tiny pull-buffer over leftover bytes plus the transport, for the
/// line-oriented chunked framing.
struct Buffered<'a, T> {
    transport: &'a mut T,
    buf: Vec<u8>,
    pos: usize,
}

impl<T: AsyncRead + Unpin> Buffered<'_, T> {
    async fn byte(&mut self) -> io::Result<u8> {
        if self.pos >= self.buf.len() {
            self.buf.resize(4096, 0);
            self.pos = 0;
            let bytes = self.transport.read(&mut self.buf).await?;
            if bytes == 0 {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "connection closed inside a chunked body",
                ));
            }
            self.buf.truncate(bytes);
        }
        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    async fn line(&mut self) -> io::Result<String> {
        let mut line = Vec::new();
        loop {
            match self.byte().await? {
                b'\n' => {
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    return String::from_utf8(line).map_err(|e| {
                        io::Error::new(ErrorKind::InvalidData, format!("chunk framing: {e}"))
                    });
                }
                other => line.push(other),
            }
            if line.len() > 8 * 1024 {
                return Err(io::Error::new(
                    ErrorKind::InvalidData,
                    "chunk framing line too long",
                ));
            }
        }
    }

    async fn exact(&mut self, out: &mut [u8]) -> io::Result<()> {
        let buffered = (self.buf.len() - self.pos).min(out.len());
        out[..buffered].copy_from_slice(&self.buf[self.pos..self.pos + buffered]);
        self.pos += buffered;
        if buffered < out.len() {
            self.transport.read_exact(&mut out[buffered..]).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_head_extracts_status_and_headers() {
        let head = parse_head(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/xml\r\nContent-Length: 10\r\n\r\n",
        )
        .unwrap();
        assert_eq!(head.status, 200);
        assert_eq!(head.content_length, Some(10));
        assert!(head.keep_alive);
        assert!(!head.chunked);
    }

    #[test]
    fn connection_close_disables_reuse() {
        let head =
            parse_head(b"HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 0\r\n\r\n")
                .unwrap();
        assert!(!head.keep_alive);
    }

    #[test]
    fn http10_defaults_to_close() {
        let head = parse_head(b"HTTP/1.0 200 OK\r\nContent-Length: 0\r\n\r\n").unwrap();
        assert!(!head.keep_alive);
    }

    #[test]
    fn conflicting_framing_rejected() {
        assert!(parse_head(
            b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nTransfer-Encoding: chunked\r\n\r\n"
        )
        .is_err());
    }

    #[test]
    fn chunked_body_reassembled() {
        let payload = b"4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n".to_vec();
        let head = ParsedHead {
            status: 200,
            headers: Vec::new(),
            keep_alive: true,
            content_length: None,
            chunked: true,
        };
        let (body, delimited) = futures_lite::future::block_on(read_response_body(
            &mut futures_lite::io::Cursor::new(Vec::new()),
            payload,
            &head,
        ))
        .unwrap();
        assert_eq!(body, b"Wikipedia");
        assert!(delimited);
    }

    #[test]
    fn content_length_body_uses_leftover_first() {
        let head = ParsedHead {
            status: 200,
            headers: Vec::new(),
            keep_alive: true,
            content_length: Some(5),
            chunked: false,
        };
        let (body, delimited) = futures_lite::future::block_on(read_response_body(
            &mut futures_lite::io::Cursor::new(b"llo".to_vec()),
            b"he".to_vec(),
            &head,
        ))
        .unwrap();
        assert_eq!(body, b"hello");
        assert!(delimited);
    }
}
