use std::{collections::HashMap, fmt, str::FromStr};

use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::{TemplateError, TemplateResult, HOST_HEADER};

static REQUEST_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\S+)\s+(/[-0-9A-Za-z/_?=&%{}+.~]*)\s+HTTP/\S+$").unwrap()
});

static HEADER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([-!#$%&'*+.^_`|~0-9A-Za-z]+):\s*(.+)$").unwrap());

/// Request methods a template may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestMethod {
    Get,
    Put,
    Post,
    Delete,
}

impl RequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Put => "PUT",
            RequestMethod::Post => "POST",
            RequestMethod::Delete => "DELETE",
        }
    }
}

impl FromStr for RequestMethod {
    type Err = TemplateError;

    // case-sensitive on purpose: `get` is not a method token
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(RequestMethod::Get),
            "PUT" => Ok(RequestMethod::Put),
            "POST" => Ok(RequestMethod::Post),
            "DELETE" => Ok(RequestMethod::Delete),
            other => Err(TemplateError::InvalidMethod(other.to_string())),
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RequestMethod> for Method {
    fn from(method: RequestMethod) -> Self {
        match method {
            RequestMethod::Get => Method::GET,
            RequestMethod::Put => Method::PUT,
            RequestMethod::Post => Method::POST,
            RequestMethod::Delete => Method::DELETE,
        }
    }
}

/// Structured form of a merged template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub method: RequestMethod,
    /// Path with its query string, always starting with `/`.
    pub path: String,
    /// Value of the Host header, possibly carrying a scheme.
    pub host: String,
    /// Every header but Host, names as last written in the template.
    pub headers: HashMap<String, String>,
    pub body: String,
    pub has_body: bool,
    /// Raw query string of the request line, used for signing.
    pub query_parameters: String,
    /// Body lines joined with `&`, signed and sent for form bodies.
    pub body_parameters: String,
}

/// Header block of a template, split from its body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    pub host: String,
    pub body: String,
    pub headers: HashMap<String, String>,
    pub has_body: bool,
}

/// Parse a merged template into a [`ParsedRequest`].
pub fn parse(text: &str) -> TemplateResult<ParsedRequest> {
    let (method, path) = request_line(text)?;
    let HeaderBlock {
        host,
        body,
        headers,
        has_body,
    } = extract_headers(text);
    let parsed = ParsedRequest {
        method,
        path: path.to_string(),
        host,
        headers,
        body,
        has_body,
        query_parameters: extract_query_parameters(text),
        body_parameters: extract_body_parameters(text),
    };
    debug!(
        method = %parsed.method,
        path = %parsed.path,
        host = %parsed.host,
        headers = parsed.headers.len(),
        has_body = parsed.has_body,
        "parsed request template"
    );
    Ok(parsed)
}

/// Method token of the request line.
pub fn extract_method(text: &str) -> TemplateResult<RequestMethod> {
    request_line(text).map(|(method, _)| method)
}

/// Path (with query) of the request line.
pub fn extract_path(text: &str) -> TemplateResult<String> {
    request_line(text).map(|(_, path)| path.to_string())
}

/// Split the lines after the request line into Host, other headers and body.
///
/// Headers run until the first blank line; every non-empty line after it
/// belongs to the body. Header-block lines that are not `Name: value` are
/// skipped. Header names are case-insensitive, the last line for a name wins.
pub fn extract_headers(text: &str) -> HeaderBlock {
    let mut block = HeaderBlock::default();
    let mut body_lines = Vec::new();
    let mut in_body = false;

    for line in lines(text).skip(1) {
        if in_body {
            if !line.trim().is_empty() {
                body_lines.push(line);
            }
            continue;
        }
        let line = line.trim();
        if line.is_empty() {
            in_body = true;
            continue;
        }
        match HEADER_LINE.captures(line) {
            Some(captures) => {
                let name = &captures[1];
                let value = captures[2].trim().to_string();
                if name.eq_ignore_ascii_case(HOST_HEADER) {
                    block.host = value;
                } else {
                    block
                        .headers
                        .retain(|existing, _| !existing.eq_ignore_ascii_case(name));
                    block.headers.insert(name.to_string(), value);
                }
            }
            None => debug!(line, "skipping line in header block"),
        }
    }

    block.body = body_lines.join("\n");
    block.has_body = !block.body.is_empty();
    block
}

/// Everything after the first `?` of the request line, or an empty string.
pub fn extract_query_parameters(text: &str) -> String {
    lines(text)
        .next()
        .and_then(|line| line.trim().split_whitespace().nth(1))
        .and_then(|target| target.splitn(2, '?').nth(1))
        .unwrap_or_default()
        .to_string()
}

/// The body as a form string: its lines trimmed and joined with `&`.
///
/// Empty when the template has no body.
pub fn extract_body_parameters(text: &str) -> String {
    form_body(&extract_headers(text).body)
}

fn form_body(body: &str) -> String {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("&")
}

fn request_line(text: &str) -> TemplateResult<(RequestMethod, &str)> {
    let line = lines(text).next().unwrap_or_default().trim();
    let captures = REQUEST_LINE
        .captures(line)
        .ok_or_else(|| TemplateError::MalformedRequestLine(line.to_string()))?;
    let method = captures
        .get(1)
        .map(|m| m.as_str())
        .unwrap_or_default()
        .parse::<RequestMethod>()?;
    let path = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
    Ok((method, path))
}

// leading blank lines are not part of the template
fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.trim_start()
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH: &str = "GET /search?hl=en&output=search&sclient=psy-ab&q=test&btnK= HTTP/1.1
				Host: www.google.com
				User-Agent: Mozilla/5.0 (Macintosh; Intel Mac OS X 10_6_8) AppleWebKit/534.57.2 (KHTML, like Gecko) Version/5.1.7
				Accept: */*";

    #[test]
    fn extract_method_accepts_known_methods() {
        for (token, method) in &[
            ("GET", RequestMethod::Get),
            ("PUT", RequestMethod::Put),
            ("POST", RequestMethod::Post),
            ("DELETE", RequestMethod::Delete),
        ] {
            let text = format!("{} /items HTTP/1.1\nHost: example.com", token);
            assert_eq!(extract_method(&text).unwrap(), *method);
        }
    }

    #[test]
    fn extract_method_rejects_other_tokens() {
        let text = SEARCH.replacen("GET", "ILLEGAL", 1);
        assert_eq!(
            extract_method(&text),
            Err(TemplateError::InvalidMethod("ILLEGAL".to_string()))
        );
        assert_eq!(
            extract_method("get /items HTTP/1.1"),
            Err(TemplateError::InvalidMethod("get".to_string()))
        );
        assert!(extract_method("PATCH /items HTTP/1.1").is_err());
        for token in &["G3T", "M-SEARCH"] {
            let text = format!("{} /items HTTP/1.1", token);
            assert_eq!(
                extract_method(&text),
                Err(TemplateError::InvalidMethod(token.to_string()))
            );
        }
    }

    #[test]
    fn malformed_request_line_is_an_error() {
        for text in &["", "   ", "GET", "GET /items", "GET items HTTP/1.1", "GET /a b HTTP/1.1"] {
            assert!(
                matches!(extract_method(text), Err(TemplateError::MalformedRequestLine(_))),
                "{:?}",
                text
            );
            assert!(matches!(
                extract_path(text),
                Err(TemplateError::MalformedRequestLine(_))
            ));
        }
    }

    #[test]
    fn extract_path_keeps_query() {
        assert_eq!(
            extract_path(SEARCH).unwrap(),
            "/search?hl=en&output=search&sclient=psy-ab&q=test&btnK="
        );
        assert_eq!(extract_path("DELETE / HTTP/1.0").unwrap(), "/");
        assert_eq!(
            extract_path("GET /a/%7Bid%7D/{{later}}~x HTTP/1.1").unwrap(),
            "/a/%7Bid%7D/{{later}}~x"
        );
    }

    #[test]
    fn extract_headers_pulls_host_out() {
        let block = extract_headers(SEARCH);
        assert_eq!(block.host, "www.google.com");
        assert_eq!(block.headers.len(), 2);
        assert!(block.headers.get("Host").is_none());
        assert_eq!(block.headers.get("Accept").map(String::as_str), Some("*/*"));
        assert!(block.headers["User-Agent"].starts_with("Mozilla/5.0"));
        assert!(!block.has_body);
    }

    #[test]
    fn host_match_is_case_insensitive_other_names_keep_case() {
        let block = extract_headers("GET / HTTP/1.1\nhOsT: example.com:1234\nX-Trace-ID: abc");
        assert_eq!(block.host, "example.com:1234");
        assert_eq!(block.headers.len(), 1);
        assert_eq!(block.headers["X-Trace-ID"], "abc");
        assert!(block.headers.get("x-trace-id").is_none());
    }

    #[test]
    fn body_follows_blank_line() {
        let text = "POST /1.1/statuses/update.json HTTP/1.1\r\nHost: api.twitter.com\r\nContent-Type: application/json\r\n\r\n{\r\n  \"status\": \"hi: there\"\r\n\r\n}\r\n";
        let block = extract_headers(text);
        assert_eq!(block.host, "api.twitter.com");
        assert_eq!(block.headers.len(), 1);
        assert!(block.has_body);
        assert_eq!(block.body, "{\n  \"status\": \"hi: there\"\n}");
    }

    #[test]
    fn repeated_header_names_keep_the_last_line() {
        let block =
            extract_headers("GET / HTTP/1.1\nHost: a.example\nAccept: a\nX-A: 1\naccept: b");
        assert_eq!(block.headers.len(), 2);
        assert_eq!(block.headers.get("accept").map(String::as_str), Some("b"));
        assert!(block.headers.get("Accept").is_none());
    }

    #[test]
    fn non_header_lines_in_header_block_are_skipped() {
        let block = extract_headers("GET / HTTP/1.1\nHost: a.example\nnot a header\nX-A: 1");
        assert_eq!(block.host, "a.example");
        assert_eq!(block.headers.len(), 1);
        assert!(!block.has_body);
    }

    #[test]
    fn query_parameters_come_from_request_line() {
        assert_eq!(
            extract_query_parameters(SEARCH),
            "hl=en&output=search&sclient=psy-ab&q=test&btnK="
        );
        assert_eq!(extract_query_parameters("GET /plain HTTP/1.1\nX-Q: a?b"), "");
        assert_eq!(extract_query_parameters("GET /a?x=1?y=2 HTTP/1.1"), "x=1?y=2");
    }

    #[test]
    fn body_parameters_cover_every_body_line() {
        let text = "POST /update HTTP/1.1\nHost: api.example.com\n\nx=1\n\n\n  status=hello\n  include_entities=true  ";
        assert_eq!(
            extract_body_parameters(text),
            "x=1&status=hello&include_entities=true"
        );
        assert_eq!(extract_body_parameters(SEARCH), "");
        assert_eq!(
            extract_body_parameters("POST /u HTTP/1.1\nHost: h\n\na=1&b=2"),
            "a=1&b=2"
        );
    }

    #[test]
    fn parse_composes_everything() {
        let text = "\n  POST /update?x=1 HTTP/1.1\n  Host: http://api.example.com\n  Content-Type: application/x-www-form-urlencoded\n\na=1&b=2";
        let parsed = parse(text).unwrap();
        assert_eq!(parsed.method, RequestMethod::Post);
        assert_eq!(parsed.path, "/update?x=1");
        assert_eq!(parsed.host, "http://api.example.com");
        assert_eq!(parsed.headers.len(), 1);
        assert_eq!(parsed.body, "a=1&b=2");
        assert!(parsed.has_body);
        assert_eq!(parsed.query_parameters, "x=1");
        assert_eq!(parsed.body_parameters, "a=1&b=2");
    }

    #[test]
    fn method_converts_to_http_method() {
        assert_eq!(Method::from(RequestMethod::Delete), Method::DELETE);
        assert_eq!(RequestMethod::Put.to_string(), "PUT");
    }
}
