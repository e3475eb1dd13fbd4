//! Client-wide configuration.

use heapless::String;
use serde::Deserialize;

use super::{HttpError, MAX_HEADER_VALUE_LEN, MAX_USER_AGENT_LEN};

/// Header values the request builder puts on every request.
///
/// Options can be built in code or loaded from a JSON document; missing fields
/// keep their defaults:
///
/// ```
/// use libiot_http::network::application::http::ClientOptions;
///
/// let opts = ClientOptions::from_json(br#"{"user_agent":"sensor-7"}"#).unwrap();
/// assert_eq!(opts.user_agent.as_str(), "sensor-7");
/// assert_eq!(opts.post_content_type.as_str(), "application/x-www-form-urlencoded");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Value of the `User-Agent` header.
    pub user_agent: String<MAX_USER_AGENT_LEN>,
    /// `Content-Type` of form POST requests.
    pub post_content_type: String<MAX_HEADER_VALUE_LEN>,
    /// `Cache-Control` of form POST requests.
    pub post_cache_control: String<MAX_HEADER_VALUE_LEN>,
}

/// Default `User-Agent` header value.
pub const DEFAULT_USER_AGENT: &str = "libiot";
/// Default `Content-Type` of form POST requests.
pub const DEFAULT_POST_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
/// Default `Cache-Control` of form POST requests.
pub const DEFAULT_POST_CACHE_CONTROL: &str = "private, max-age=0, no-cache";

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            user_agent: String::try_from(DEFAULT_USER_AGENT).unwrap_or_default(),
            post_content_type: String::try_from(DEFAULT_POST_CONTENT_TYPE).unwrap_or_default(),
            post_cache_control: String::try_from(DEFAULT_POST_CACHE_CONTROL).unwrap_or_default(),
        }
    }
}

impl ClientOptions {
    /// Parses options from a JSON object.
    pub fn from_json(json: &[u8]) -> Result<Self, HttpError> {
        serde_json_core::from_slice::<Self>(json)
            .map(|(opts, _)| opts)
            .map_err(|_| {
                warn!("client options are not valid json");
                HttpError::InvalidArgument
            })
    }

    /// Sets the `User-Agent` header value.
    pub fn with_user_agent(mut self, agent: &str) -> Result<Self, HttpError> {
        self.user_agent = String::try_from(agent).map_err(|_| HttpError::OutOfMemory)?;
        Ok(self)
    }

    /// Sets the `Content-Type` of form POST requests.
    pub fn with_post_content_type(mut self, content_type: &str) -> Result<Self, HttpError> {
        self.post_content_type =
            String::try_from(content_type).map_err(|_| HttpError::OutOfMemory)?;
        Ok(self)
    }

    /// Sets the `Cache-Control` of form POST requests.
    pub fn with_post_cache_control(mut self, cache_control: &str) -> Result<Self, HttpError> {
        self.post_cache_control =
            String::try_from(cache_control).map_err(|_| HttpError::OutOfMemory)?;
        Ok(self)
    }
}
