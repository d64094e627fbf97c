use std::fmt;

use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result, Secrets};

pub const HTTPS_OPTION: &str = "https";
pub const AUTO_CONTENT_LENGTH_OPTION: &str = "autoContentLength";
pub const DEBUG_OPTION: &str = "debug";
pub const CONSUMER_KEY_OPTION: &str = "oauth1a_consumer_key";
pub const CONSUMER_SECRET_OPTION: &str = "oauth1a_consumer_secret";
pub const ACCESS_TOKEN_OPTION: &str = "oauth1a_access_token";
pub const ACCESS_TOKEN_SECRET_OPTION: &str = "oauth1a_access_token_secret";

/// Options for one template request.
///
/// Built from the compiled-in defaults with caller values laid over them
/// key by key; keys the caller leaves out keep their default.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    /// Use `https://` for hosts written without a scheme.
    pub https: bool,
    /// Reserved for Content-Length injection; the transport already sets
    /// the length of in-memory bodies.
    #[serde(rename = "autoContentLength")]
    pub auto_content_length: bool,
    /// Dump the outgoing request and failed responses to the log.
    pub debug: bool,
    #[serde(rename = "oauth1a_consumer_key")]
    pub consumer_key: Option<String>,
    #[serde(rename = "oauth1a_consumer_secret")]
    pub consumer_secret: Option<String>,
    #[serde(rename = "oauth1a_access_token")]
    pub access_token: Option<String>,
    #[serde(rename = "oauth1a_access_token_secret")]
    pub access_token_secret: Option<String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        RequestOptions {
            https: false,
            auto_content_length: true,
            debug: false,
            consumer_key: None,
            consumer_secret: None,
            access_token: None,
            access_token_secret: None,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Default::default()
    }

    /// Lay flat key/value pairs over the defaults.
    ///
    /// # Errors
    ///
    /// Fails when a boolean option is neither `true` nor `false`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        pairs
            .into_iter()
            .try_fold(RequestOptions::default(), |options, (key, value)| {
                options.with_option(key.as_ref(), value.as_ref())
            })
    }

    /// Same as [`RequestOptions::from_pairs`] for a form-encoded string such
    /// as `https=true&oauth1a_consumer_key=...`.
    pub fn from_urlencoded(options: &str) -> Result<Self> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(options)?;
        Self::from_pairs(pairs)
    }

    /// Set one option by its flat key. Unknown keys are ignored.
    pub fn with_option(self, key: &str, value: &str) -> Result<Self> {
        let options = match key {
            HTTPS_OPTION => RequestOptions {
                https: parse_bool(key, value)?,
                ..self
            },
            AUTO_CONTENT_LENGTH_OPTION => RequestOptions {
                auto_content_length: parse_bool(key, value)?,
                ..self
            },
            DEBUG_OPTION => RequestOptions {
                debug: parse_bool(key, value)?,
                ..self
            },
            CONSUMER_KEY_OPTION => RequestOptions {
                consumer_key: Some(value.to_string()),
                ..self
            },
            CONSUMER_SECRET_OPTION => RequestOptions {
                consumer_secret: Some(value.to_string()),
                ..self
            },
            ACCESS_TOKEN_OPTION => RequestOptions {
                access_token: Some(value.to_string()),
                ..self
            },
            ACCESS_TOKEN_SECRET_OPTION => RequestOptions {
                access_token_secret: Some(value.to_string()),
                ..self
            },
            _ => {
                debug!(key, "ignoring unknown request option");
                self
            }
        };
        Ok(options)
    }

    pub fn https(self, https: bool) -> Self {
        RequestOptions { https, ..self }
    }

    pub fn debug(self, debug: bool) -> Self {
        RequestOptions { debug, ..self }
    }

    /// Enable OAuth1 signing with the consumer credentials.
    pub fn oauth1a<TKey, TSecret>(self, consumer_key: TKey, consumer_secret: TSecret) -> Self
    where
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        RequestOptions {
            consumer_key: Some(consumer_key.into()),
            consumer_secret: Some(consumer_secret.into()),
            ..self
        }
    }

    pub fn access_token<TKey, TSecret>(self, token: TKey, token_secret: TSecret) -> Self
    where
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        RequestOptions {
            access_token: Some(token.into()),
            access_token_secret: Some(token_secret.into()),
            ..self
        }
    }

    /// Signing credentials, present only when a consumer key is configured.
    pub fn secrets(&self) -> Option<Secrets<'_>> {
        let consumer_key = self.consumer_key.as_deref()?;
        let secrets = Secrets::new(
            consumer_key,
            self.consumer_secret.as_deref().unwrap_or_default(),
        );
        Some(match self.access_token.as_deref() {
            Some(token) => secrets.token(
                token,
                self.access_token_secret.as_deref().unwrap_or_default(),
            ),
            None => secrets,
        })
    }

    pub(crate) fn scheme(&self) -> &'static str {
        if self.https {
            "https://"
        } else {
            "http://"
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim() {
        v if v.eq_ignore_ascii_case("true") => Ok(true),
        v if v.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(Error::InvalidOption {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn redact(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "<redacted>")
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("https", &self.https)
            .field("auto_content_length", &self.auto_content_length)
            .field("debug", &self.debug)
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &redact(&self.consumer_secret))
            .field("access_token", &self.access_token)
            .field("access_token_secret", &redact(&self.access_token_secret))
            .finish()
    }
}
