use std::{
    borrow::Cow,
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use http::Method;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use sha1::Sha1;
use tracing::trace;
use url::Url;

use crate::{
    SecretsProvider, OAUTH_CONSUMER_KEY, OAUTH_NONCE_KEY, OAUTH_SIGNATURE_KEY,
    OAUTH_SIGNATURE_METHOD_KEY, OAUTH_TIMESTAMP_KEY, OAUTH_TOKEN_KEY, OAUTH_VERSION_KEY,
};

type HmacSha1 = Hmac<Sha1>;

/// Value of `oauth_signature_method`.
pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";
/// Value of `oauth_version`.
pub const OAUTH_VERSION: &str = "1.0";
/// Length of a generated `oauth_nonce`.
pub const NONCE_LENGTH: usize = 32;

// RFC 3986 unreserved characters pass through, everything else is escaped.
const RFC3986: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

// generated by the signer, never taken from the request
const PROTOCOL_PARAMETERS: [&str; 6] = [
    OAUTH_CONSUMER_KEY,
    OAUTH_NONCE_KEY,
    OAUTH_SIGNATURE_METHOD_KEY,
    OAUTH_TIMESTAMP_KEY,
    OAUTH_TOKEN_KEY,
    OAUTH_VERSION_KEY,
];

/// HMAC-SHA1 OAuth 1.0a signer producing `Authorization` header values.
#[derive(Debug, Clone)]
pub struct Signer<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    secrets: &'a TSecretsProvider,
    parameters: OAuthParameters<'a>,
}

impl<'a, TSecretsProvider> Signer<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    pub fn new(secrets: &'a TSecretsProvider, parameters: OAuthParameters<'a>) -> Self {
        Signer {
            secrets,
            parameters,
        }
    }

    /// Sign a request and return the `Authorization` header value.
    ///
    /// `url` may carry a query string; it is stripped from the signed URL,
    /// the query parameters to sign are passed separately in
    /// `query_parameters`. `body_parameters` is a form-encoded body, and wins
    /// over the query when both carry the same key.
    pub fn generate_signature(
        self,
        method: Method,
        url: &str,
        query_parameters: &str,
        body_parameters: &str,
    ) -> String {
        let (consumer_key, consumer_secret) = self.secrets.get_consumer_key_pair();
        let (token, token_secret) = self.secrets.get_token_option_pair();
        let nonce = self
            .parameters
            .nonce
            .unwrap_or_else(|| Cow::from(generate_nonce()));
        let timestamp = self.parameters.timestamp.unwrap_or_else(unix_timestamp);
        let timestamp = timestamp.to_string();

        let mut parameters = collect_parameters(query_parameters, body_parameters);
        parameters.insert(OAUTH_CONSUMER_KEY.to_string(), consumer_key.to_string());
        parameters.insert(OAUTH_NONCE_KEY.to_string(), nonce.to_string());
        parameters.insert(
            OAUTH_SIGNATURE_METHOD_KEY.to_string(),
            SIGNATURE_METHOD.to_string(),
        );
        parameters.insert(OAUTH_TIMESTAMP_KEY.to_string(), timestamp.clone());
        if let Some(token) = token {
            parameters.insert(OAUTH_TOKEN_KEY.to_string(), token.to_string());
        }
        parameters.insert(OAUTH_VERSION_KEY.to_string(), OAUTH_VERSION.to_string());

        let base_string =
            signature_base_string(method.as_str(), url, &parameter_string(&parameters));
        trace!(base_string = %base_string, "oauth signature base string");
        let signature = sign(
            &base_string,
            &signing_key(consumer_secret, token_secret.unwrap_or_default()),
        );

        // only the signature is escaped, the other values go in verbatim
        let mut fields = vec![
            (OAUTH_CONSUMER_KEY, Cow::from(consumer_key)),
            (OAUTH_NONCE_KEY, nonce),
            (OAUTH_SIGNATURE_KEY, Cow::from(percent_encode(&signature))),
            (OAUTH_SIGNATURE_METHOD_KEY, Cow::from(SIGNATURE_METHOD)),
            (OAUTH_TIMESTAMP_KEY, Cow::from(timestamp)),
        ];
        if let Some(token) = token {
            fields.push((OAUTH_TOKEN_KEY, Cow::from(token)));
        }
        fields.push((OAUTH_VERSION_KEY, Cow::from(OAUTH_VERSION)));

        let fields = fields
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", key, value))
            .collect::<Vec<_>>()
            .join(", ");
        format!("OAuth {}", fields)
    }
}

/// Per-signature values. Both are generated at signing time unless set,
/// which is only meant for reproducible signatures in tests.
#[derive(Debug, Clone, Default)]
pub struct OAuthParameters<'a> {
    nonce: Option<Cow<'a, str>>,
    timestamp: Option<u64>,
}

impl<'a> OAuthParameters<'a> {
    pub fn new() -> Self {
        Default::default()
    }

    /// set the oauth_nonce value
    pub fn nonce<T>(self, nonce: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            nonce: Some(nonce.into()),
            ..self
        }
    }

    /// set the oauth_timestamp value
    pub fn timestamp<T>(self, timestamp: T) -> Self
    where
        T: Into<u64>,
    {
        OAuthParameters {
            timestamp: Some(timestamp.into()),
            ..self
        }
    }
}

/// A fresh 32-character `[0-9A-Za-z]` nonce from the operating system RNG.
pub fn generate_nonce() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

/// Merge form-encoded query and body parameters into one sorted map.
///
/// Parsing is permissive: empty keys are dropped, keys and values are
/// trimmed, the first occurrence of a key wins inside one source and body
/// values override query values. Protocol parameters generated by the
/// signer are ignored.
pub fn collect_parameters(
    query_parameters: &str,
    body_parameters: &str,
) -> BTreeMap<String, String> {
    let mut parameters = parse_form(query_parameters);
    parameters.extend(parse_form(body_parameters));
    parameters
}

fn parse_form(form: &str) -> BTreeMap<String, String> {
    let mut parsed = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(form.as_bytes()) {
        let key = key.trim();
        if key.is_empty() || PROTOCOL_PARAMETERS.contains(&key) {
            continue;
        }
        parsed
            .entry(key.to_string())
            .or_insert_with(|| value.trim().to_string());
    }
    parsed
}

/// Sorted, percent-encoded `key=value` pairs joined with `&`.
pub fn parameter_string(parameters: &BTreeMap<String, String>) -> String {
    parameters
        .iter()
        .map(|(key, value)| format!("{}={}", percent_encode(key), percent_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// `METHOD&encoded-url&encoded-parameter-string`.
pub fn signature_base_string(method: &str, url: &str, parameter_string: &str) -> String {
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(&normalize_url(url)),
        percent_encode(parameter_string)
    )
}

/// `encoded-consumer-secret&encoded-token-secret`.
pub fn signing_key(consumer_secret: &str, token_secret: &str) -> String {
    format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    )
}

/// Scheme, authority and path of `url`; query and fragment are dropped.
pub fn normalize_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => {
            let mut normalized = format!("{}://", parsed.scheme());
            if let Some(host) = parsed.host_str() {
                normalized.push_str(host);
            }
            if let Some(port) = parsed.port() {
                normalized.push_str(&format!(":{}", port));
            }
            normalized.push_str(parsed.path());
            normalized
        }
        Err(_) => url
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

/// RFC 3986 percent-encoding, spaces become `%20`.
pub fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, RFC3986).to_string()
}

fn sign(base_string: &str, key: &str) -> String {
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(base_string.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
