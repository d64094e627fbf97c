use std::{borrow::Cow, convert::TryFrom};

use http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, info};
use url::Url;

use crate::{
    has_placeholders, merge, parse, Error, MergeContext, OAuthParameters, ParsedRequest,
    RequestMethod, RequestOptions, Result, Signer, WIRE_TARGET,
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A template turned into everything the transport needs: method, absolute
/// URL, headers (Authorization included when signing) and body.
///
/// Building one never touches the network, so every template error shows
/// up before a request is sent.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: RequestMethod,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl PreparedRequest {
    /// Merge, parse and (when configured) sign a template.
    pub fn from_template(
        template: &str,
        context: &MergeContext,
        options: &RequestOptions,
    ) -> Result<Self> {
        let text = if has_placeholders(template) {
            Cow::from(merge(template, context)?)
        } else {
            Cow::from(template)
        };
        Self::from_parsed(parse(&text)?, options)
    }

    pub fn from_parsed(parsed: ParsedRequest, options: &RequestOptions) -> Result<Self> {
        Self::from_parsed_with_params(parsed, options, OAuthParameters::new())
    }

    /// Same as [`PreparedRequest::from_parsed`], with the per-signature OAuth
    /// values supplied by the caller.
    pub fn from_parsed_with_params(
        parsed: ParsedRequest,
        options: &RequestOptions,
        params: OAuthParameters<'_>,
    ) -> Result<Self> {
        let url = request_url(&parsed.host, &parsed.path, options)?;

        let mut headers = HeaderMap::with_capacity(parsed.headers.len() + 1);
        for (name, value) in &parsed.headers {
            let header_name = HeaderName::try_from(name.as_str())
                .map_err(|_| Error::InvalidHeader(name.clone()))?;
            let header_value = HeaderValue::try_from(value.as_str())
                .map_err(|_| Error::InvalidHeader(name.clone()))?;
            headers.insert(header_name, header_value);
        }

        // form bodies go out exactly as signed, lines joined with `&`
        let form = is_form(&headers);
        let body = match (parsed.has_body, form) {
            (false, _) => None,
            (true, true) => Some(parsed.body_parameters),
            (true, false) => Some(parsed.body),
        };

        if let Some(secrets) = options.secrets() {
            let body_parameters = match &body {
                Some(body) if form => body.as_str(),
                _ => "",
            };
            let authorization = Signer::new(&secrets, params).generate_signature(
                parsed.method.into(),
                url.as_str(),
                &parsed.query_parameters,
                body_parameters,
            );
            let authorization = HeaderValue::try_from(authorization)
                .map_err(|_| Error::InvalidHeader(AUTHORIZATION.to_string()))?;
            headers.insert(AUTHORIZATION, authorization);
            debug!(url = %url, "signed request with oauth1");
        }

        Ok(PreparedRequest {
            method: parsed.method,
            url,
            headers,
            body,
        })
    }

    pub(crate) fn into_builder(self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        let builder = client
            .request(self.method.into(), self.url)
            .headers(self.headers);
        match self.body {
            Some(body) => builder.body(body),
            None => builder,
        }
    }

    #[cfg(feature = "blocking")]
    pub(crate) fn into_blocking_builder(
        self,
        client: &reqwest::blocking::Client,
    ) -> reqwest::blocking::RequestBuilder {
        let builder = client
            .request(self.method.into(), self.url)
            .headers(self.headers);
        match self.body {
            Some(body) => builder.body(body),
            None => builder,
        }
    }

    /// Write the request to the wire log, Authorization redacted.
    pub(crate) fn dump(&self) {
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| {
                let value = if *name == AUTHORIZATION {
                    "<redacted>"
                } else {
                    value.to_str().unwrap_or("<binary>")
                };
                format!("{}: {}", name, value)
            })
            .collect::<Vec<_>>()
            .join("\n");
        info!(
            target: WIRE_TARGET,
            method = %self.method,
            url = %self.url,
            headers = %headers,
            body = self.body.as_deref().unwrap_or_default(),
            "request"
        );
    }
}

/// Absolute URL for a Host header value and a path.
///
/// Hosts without an `http://` or `https://` prefix get the scheme picked by
/// the `https` option.
fn request_url(host: &str, path: &str, options: &RequestOptions) -> Result<Url> {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        return Err(Error::MissingHost);
    }
    let lowered = host.to_ascii_lowercase();
    let url = if lowered.starts_with("http://") || lowered.starts_with("https://") {
        format!("{}{}", host, path)
    } else {
        format!("{}{}{}", options.scheme(), host, path)
    };
    Url::parse(&url).map_err(|source| Error::InvalidUrl { url, source })
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .map(|value| {
            value
                .to_str()
                .map(|v| v.trim().to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE))
                .unwrap_or(false)
        })
        .unwrap_or(true)
}
