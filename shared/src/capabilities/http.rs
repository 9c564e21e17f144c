//! Checks run on an outgoing request before it is handed to `crux_http`.
//!
//! `crux_http` panics on URLs it cannot parse and on non-ASCII header
//! values, and does not restrict where a request goes. Every request the
//! core makes is assembled here first.

use crux_http::Http;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use thiserror::Error;
use url::{Host, Url};

pub use crux_http::Error as HttpError;

pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_REQUEST_BODY_SIZE: usize = 20 * 1024 * 1024;
pub const MAX_HEADER_NAME_LENGTH: usize = 256;
pub const MAX_HEADER_VALUE_LENGTH: usize = 8192;
pub const MAX_HEADERS_COUNT: usize = 32;

/// An `https` URL with a public host. Credentials travel in headers, so
/// plaintext and loopback targets are refused up front.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidatedUrl {
    url: String,
    host: String,
}

impl ValidatedUrl {
    pub fn new(url: impl Into<String>) -> Result<Self, RequestError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(RequestError::InvalidUrl {
                url,
                reason: "URL cannot be empty".to_string(),
            });
        }
        if url.len() > MAX_URL_LENGTH {
            return Err(RequestError::InvalidUrl {
                url: truncate(&url),
                reason: format!("URL exceeds maximum length of {MAX_URL_LENGTH} bytes"),
            });
        }

        let parsed = Url::parse(url.trim()).map_err(|e| RequestError::InvalidUrl {
            url: truncate(&url),
            reason: e.to_string(),
        })?;

        if parsed.scheme() != "https" {
            return Err(RequestError::InvalidUrl {
                url: truncate(&url),
                reason: format!("scheme '{}' is not allowed, use https", parsed.scheme()),
            });
        }
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(RequestError::InvalidUrl {
                url: truncate(&url),
                reason: "credentials in URL are not allowed".to_string(),
            });
        }

        let host = match parsed.host() {
            None => {
                return Err(RequestError::InvalidUrl {
                    url: truncate(&url),
                    reason: "URL must have a host".to_string(),
                })
            }
            Some(host) if is_private_host(&host) => {
                return Err(RequestError::PrivateNetworkBlocked {
                    url: truncate(&url),
                    host: host.to_string(),
                })
            }
            Some(host) => host.to_string().to_lowercase(),
        };

        Ok(Self {
            url: parsed.to_string(),
            host,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl std::fmt::Display for ValidatedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

fn is_private_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => {
            let domain = domain.to_ascii_lowercase();
            domain == "localhost"
                || domain.ends_with(".localhost")
                || domain.ends_with(".local")
                || domain.ends_with(".internal")
        }
        Host::Ipv4(ip) => is_private_ip(IpAddr::V4(*ip)),
        Host::Ipv6(ip) => is_private_ip(IpAddr::V6(*ip)),
    }
}

fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
        }
    }
}

fn truncate(url: &str) -> String {
    if url.len() <= 100 {
        url.to_string()
    } else {
        let mut end = 100;
        while !url.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &url[..end])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpHeaders {
    headers: Vec<(String, String)>,
}

impl HttpHeaders {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any existing header with the same (case-insensitive) name.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), RequestError> {
        let name = name.into();
        let value = value.into();
        validate_header_name(&name)?;
        validate_header_value(&name, &value)?;

        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        if self.headers.len() >= MAX_HEADERS_COUNT {
            return Err(RequestError::TooManyHeaders {
                count: self.headers.len() + 1,
                max: MAX_HEADERS_COUNT,
            });
        }
        self.headers.push((name, value));
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

fn validate_header_name(name: &str) -> Result<(), RequestError> {
    if name.is_empty() || name.len() > MAX_HEADER_NAME_LENGTH {
        return Err(RequestError::InvalidHeader {
            name: name.chars().take(50).collect(),
            reason: format!("header name must be 1..={MAX_HEADER_NAME_LENGTH} bytes"),
        });
    }
    if let Some(c) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '-' && *c != '_')
    {
        return Err(RequestError::InvalidHeader {
            name: name.to_string(),
            reason: format!("invalid character '{c}' in header name"),
        });
    }
    if ["host", "content-length", "transfer-encoding"]
        .iter()
        .any(|managed| name.eq_ignore_ascii_case(managed))
    {
        return Err(RequestError::InvalidHeader {
            name: name.to_string(),
            reason: "this header is managed by the shell".to_string(),
        });
    }
    Ok(())
}

fn validate_header_value(name: &str, value: &str) -> Result<(), RequestError> {
    if value.len() > MAX_HEADER_VALUE_LENGTH {
        return Err(RequestError::InvalidHeader {
            name: name.to_string(),
            reason: format!("header value exceeds maximum length of {MAX_HEADER_VALUE_LENGTH} bytes"),
        });
    }
    if value.chars().any(|c| matches!(c, '\r' | '\n' | '\0')) {
        return Err(RequestError::InvalidHeader {
            name: name.to_string(),
            reason: "header value contains CR, LF or NUL".to_string(),
        });
    }
    if !value.chars().all(|c| c.is_ascii_graphic() || c == ' ' || c == '\t') {
        return Err(RequestError::InvalidHeader {
            name: name.to_string(),
            reason: "header value must be printable ASCII".to_string(),
        });
    }
    Ok(())
}

/// What a dispatched request resolves to.
pub type HttpResult = crux_http::Result<crux_http::Response<Vec<u8>>>;

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum RequestError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("private network access blocked: {url} resolves to {host}")]
    PrivateNetworkBlocked { url: String, host: String },

    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("too many headers: {count} exceeds maximum of {max}")]
    TooManyHeaders { count: usize, max: usize },

    #[error("request body too large: {size} bytes exceeds maximum of {max} bytes")]
    BodyTooLarge { size: usize, max: usize },

    #[error("serialization error: {message}")]
    Serialization { message: String },
}

/// A POST that passed every check and can be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    url: ValidatedUrl,
    headers: HttpHeaders,
    body: Vec<u8>,
}

impl OutboundRequest {
    pub fn post(url: impl Into<String>) -> Result<Self, RequestError> {
        Ok(Self {
            url: ValidatedUrl::new(url)?,
            headers: HttpHeaders::new(),
            body: Vec::new(),
        })
    }

    pub fn with_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, RequestError> {
        self.headers.insert(name, value)?;
        Ok(self)
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, RequestError> {
        let body = serde_json::to_vec(value).map_err(|e| RequestError::Serialization {
            message: e.to_string(),
        })?;
        if body.len() > MAX_REQUEST_BODY_SIZE {
            return Err(RequestError::BodyTooLarge {
                size: body.len(),
                max: MAX_REQUEST_BODY_SIZE,
            });
        }
        self.headers.insert("Content-Type", "application/json")?;
        self.body = body;
        Ok(self)
    }

    #[must_use]
    pub const fn url(&self) -> &ValidatedUrl {
        &self.url
    }

    #[must_use]
    pub const fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Sends through `crux_http`. Headers go on after the body so the JSON
    /// content type replaces the builder's octet-stream default.
    pub fn send<Ev, F>(self, http: &Http<Ev>, make_event: F)
    where
        Ev: Send + 'static,
        F: FnOnce(HttpResult) -> Ev + Send + 'static,
    {
        tracing::debug!(
            host = self.url.host(),
            headers = self.headers.len(),
            body_len = self.body.len(),
            "dispatching http request"
        );
        let mut builder = http.post(self.url.as_str()).body_bytes(self.body);
        for (name, value) in self.headers.iter() {
            builder = builder.header(name, value);
        }
        builder.send(make_event);
    }
}
