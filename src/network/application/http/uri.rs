//! URI parsing.

use core::fmt;

use heapless::String;

use super::{HttpError, MAX_HOST_LEN, MAX_RESOURCE_LEN, MAX_URI_LEN};

const HTTP_SCHEME: &str = "http";
const SCHEME_SEPARATOR: &str = "://";
const DEFAULT_PORT: u16 = 80;

/// The parts of a request URI the client needs.
///
/// Accepted forms are `[http://]host[:port][/resource]`; anything from the first
/// `/` after the authority is kept verbatim as the resource, query and fragment
/// included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriKey {
    /// Set once the scheme is known to be `http` (explicit or implied).
    pub protocol_is_http: bool,
    /// Host name or dotted IPv4 literal.
    pub host: String<MAX_HOST_LEN>,
    /// TCP port, 80 unless given.
    pub port: u16,
    /// Path and query, always starting with `/`.
    pub resource: String<MAX_RESOURCE_LEN>,
    /// The URI exactly as passed in.
    pub raw: String<MAX_URI_LEN>,
}

impl UriKey {
    /// Parses `uri`.
    ///
    /// # Errors
    ///
    /// [`HttpError::InvalidUri`] for an empty URI, one starting with `/`, an empty
    /// host, a scheme other than `http` or a port that is not a decimal `u16`.
    /// [`HttpError::OutOfMemory`] when a component does not fit its buffer.
    pub fn parse(uri: &str) -> Result<Self, HttpError> {
        if uri.is_empty() || uri.starts_with('/') {
            return Err(HttpError::InvalidUri);
        }
        let raw = String::try_from(uri).map_err(|_| HttpError::OutOfMemory)?;

        let first_slash = uri.find('/').unwrap_or(uri.len());
        let rest = match uri.find(SCHEME_SEPARATOR) {
            Some(idx) if idx < first_slash => {
                if !uri[..idx].eq_ignore_ascii_case(HTTP_SCHEME) {
                    debug!("unsupported uri scheme");
                    return Err(HttpError::InvalidUri);
                }
                &uri[idx + SCHEME_SEPARATOR.len()..]
            }
            _ => uri,
        };

        let host_end = rest.find(['/', ':']).unwrap_or(rest.len());
        if host_end == 0 {
            return Err(HttpError::InvalidUri);
        }
        let host = String::try_from(&rest[..host_end]).map_err(|_| HttpError::OutOfMemory)?;
        let mut rest = &rest[host_end..];

        let mut port = DEFAULT_PORT;
        if let Some(after_colon) = rest.strip_prefix(':') {
            let port_end = after_colon.find('/').unwrap_or(after_colon.len());
            port = parse_port(&after_colon[..port_end])?;
            rest = &after_colon[port_end..];
        }

        let resource = if rest.is_empty() { "/" } else { rest };
        let resource = String::try_from(resource).map_err(|_| HttpError::OutOfMemory)?;

        Ok(Self {
            protocol_is_http: true,
            host,
            port,
            resource,
            raw,
        })
    }
}

fn parse_port(digits: &str) -> Result<u16, HttpError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(HttpError::InvalidUri);
    }
    digits.parse::<u16>().map_err(|_| HttpError::InvalidUri)
}

impl fmt::Display for UriKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http://{}:{}{}", self.host, self.port, self.resource)
    }
}
