//! Session cookie handling.
//!
//! [`SessionCookie`] is the typed descriptor the manager produces when a
//! response needs a `Set-Cookie` header; nothing else reaches into headers to
//! find out what cookie was emitted.

use std::time::Duration;

use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use cookie::{time, Cookie};

use crate::config::{CookieExpiry, CookieOptions};
use crate::error::SessionError;
use crate::session::SessionId;
use crate::Result;

/// Max-Age used for persistent cookies. Browsers cap cookie lifetimes at
/// 400 days.
pub const PERSISTENT_MAX_AGE: Duration = Duration::from_secs(400 * 24 * 60 * 60);

/// A session cookie to emit on a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    /// `None` makes a browser-session cookie.
    pub max_age: Option<Duration>,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
}

impl SessionCookie {
    /// Cookie carrying `id` with the configured lifetime and attributes.
    pub fn issue(options: &CookieOptions, expiry: CookieExpiry, id: &SessionId) -> Self {
        let max_age = match expiry {
            CookieExpiry::BrowserSession => None,
            CookieExpiry::Never => Some(PERSISTENT_MAX_AGE),
            CookieExpiry::After(duration) => Some(duration),
        };
        Self::with_attributes(options, id.to_string(), max_age)
    }

    /// Cookie that makes the browser forget the session.
    pub fn removal(options: &CookieOptions) -> Self {
        Self::with_attributes(options, String::new(), Some(Duration::ZERO))
    }

    fn with_attributes(options: &CookieOptions, value: String, max_age: Option<Duration>) -> Self {
        Self {
            name: options.name.clone(),
            value,
            max_age,
            path: options.path.clone(),
            domain: options.domain.clone(),
            secure: options.secure,
            http_only: options.http_only,
        }
    }

    /// Render as a `Set-Cookie` header value.
    pub fn to_header_string(&self) -> String {
        let mut builder = Cookie::build((self.name.clone(), self.value.clone()))
            .path(self.path.clone())
            .secure(self.secure)
            .http_only(self.http_only);

        if let Some(ref domain) = self.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(max_age) = self.max_age {
            let secs = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
            builder = builder.max_age(time::Duration::seconds(secs));
        }

        builder.build().to_string()
    }

    /// Append the cookie to response headers.
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<()> {
        let value = HeaderValue::from_str(&self.to_header_string()).map_err(|e| {
            SessionError::Configuration(format!("invalid session cookie attributes: {}", e))
        })?;
        headers.append(SET_COOKIE, value);
        Ok(())
    }
}

/// Find the raw value of the cookie called `name` in request headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(|cookie| cookie.ok())
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

/// Find and validate the session identifier in request headers.
///
/// A missing or malformed cookie yields `None`.
pub fn session_id_from_headers(headers: &HeaderMap, name: &str) -> Option<SessionId> {
    let raw = cookie_value(headers, name)?;
    match raw.parse() {
        Ok(id) => Some(id),
        Err(_) => {
            tracing::debug!(cookie = name, "ignoring malformed session cookie");
            None
        }
    }
}
