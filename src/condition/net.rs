//! Network predicates
//!
//! `<socket>`, `<http>` and `<isreachable>`. Connection failures make these
//! conditions false; only malformed attributes are errors.

use crate::error::{ConditionError, ConditionResult};
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use reqwest::Method;
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use url::Url;

/// TCP echo service probed by `<isreachable>`
const ECHO_PORT: u16 = 7;

/// Default `<isreachable>` timeout in seconds
pub const DEFAULT_REACHABLE_TIMEOUT: u64 = 30;

/// Default `errorsbeginat` of `<http>`
pub const DEFAULT_ERRORS_BEGIN_AT: u16 = 400;

/// `<socket>`: true when something accepts connections on server:port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socket {
    pub server: String,
    pub port: u16,
}

impl Socket {
    pub fn new(server: impl Into<String>, port: u16) -> Self {
        Socket {
            server: server.into(),
            port,
        }
    }

    pub fn evaluate(&self) -> bool {
        log::debug!("Checking for listener at {}:{}", self.server, self.port);
        match TcpStream::connect((self.server.as_str(), self.port)) {
            Ok(_) => true,
            Err(e) => {
                log::debug!("Socket {}:{} is unavailable: {}", self.server, self.port, e);
                false
            }
        }
    }
}

/// `<http>`: true when the URL answers with a status below `errors_begin_at`
#[derive(Debug, Clone)]
pub struct Http {
    pub url: Url,
    pub errors_begin_at: u16,
    pub method: Method,
    pub follow_redirects: bool,
    pub read_timeout: Option<Duration>,
}

impl Http {
    pub fn new(url: &str) -> ConditionResult<Self> {
        let parsed = Url::parse(url)
            .map_err(|_| ConditionError::config(format!("Badly formed URL: {}", url)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConditionError::config(format!(
                "Badly formed URL: {} (only http and https are supported)",
                url
            )));
        }

        Ok(Http {
            url: parsed,
            errors_begin_at: DEFAULT_ERRORS_BEGIN_AT,
            method: Method::GET,
            follow_redirects: true,
            read_timeout: None,
        })
    }

    pub fn with_errors_begin_at(mut self, code: u16) -> Self {
        self.errors_begin_at = code;
        self
    }

    /// Accepts the methods an HTTP/1.1 client may send without a body contract
    pub fn with_method(mut self, method: &str) -> ConditionResult<Self> {
        let upper = method.to_uppercase();
        self.method = match upper.as_str() {
            "GET" => Method::GET,
            "HEAD" => Method::HEAD,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "OPTIONS" => Method::OPTIONS,
            "TRACE" => Method::TRACE,
            _ => {
                return Err(ConditionError::config(format!(
                    "Invalid HTTP protocol: {}",
                    upper
                )))
            }
        };
        Ok(self)
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// A zero timeout waits forever
    pub fn with_read_timeout(mut self, millis: u64) -> Self {
        self.read_timeout = (millis > 0).then(|| Duration::from_millis(millis));
        self
    }

    pub fn evaluate(&self) -> ConditionResult<bool> {
        log::debug!("Checking for {}", self.url);

        let policy = if self.follow_redirects {
            Policy::default()
        } else {
            Policy::none()
        };
        let client = Client::builder()
            .redirect(policy)
            .timeout(self.read_timeout)
            .build()
            .map_err(|e| {
                ConditionError::evaluation(format!("Unable to create HTTP client: {}", e))
            })?;

        let response = match client
            .request(self.method.clone(), self.url.clone())
            .send()
        {
            Ok(response) => response,
            Err(e) => {
                log::debug!("{} {} failed: {}", self.method, self.url, e);
                return Ok(false);
            }
        };

        let code = response.status().as_u16();
        log::debug!("Result code for {} was {}", self.url, code);
        Ok(code > 0 && code < self.errors_begin_at)
    }
}

/// `<isreachable>`
///
/// Probes the TCP echo port: an accepted or refused connection both mean the
/// host answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsReachable {
    pub host: String,
    pub timeout: Duration,
}

impl IsReachable {
    pub fn host(host: impl Into<String>) -> Self {
        IsReachable {
            host: host.into(),
            timeout: Duration::from_secs(DEFAULT_REACHABLE_TIMEOUT),
        }
    }

    /// Take the host part of a URL
    pub fn url(url: &str) -> ConditionResult<Self> {
        let parsed =
            Url::parse(url).map_err(|_| ConditionError::config(format!("Bad URL {}", url)))?;
        let host = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| ConditionError::config(format!("No hostname in URL {}", url)))?;
        Ok(Self::host(host.trim_start_matches('[').trim_end_matches(']')))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn evaluate(&self) -> bool {
        let addresses: Vec<SocketAddr> = match (self.host.as_str(), ECHO_PORT).to_socket_addrs() {
            Ok(addresses) => addresses.collect(),
            Err(e) => {
                log::debug!("Unknown host: {} ({})", self.host, e);
                return false;
            }
        };

        for address in addresses {
            log::debug!("Probing {} with a timeout of {:?}", address, self.timeout);
            let attempt = if self.timeout.is_zero() {
                TcpStream::connect(address)
            } else {
                TcpStream::connect_timeout(&address, self.timeout)
            };
            match attempt {
                Ok(_) => return true,
                Err(e) if e.kind() == ErrorKind::ConnectionRefused => return true,
                Err(e) => log::debug!("{} did not answer: {}", address, e),
            }
        }

        log::debug!("host {} is not reachable", self.host);
        false
    }
}
