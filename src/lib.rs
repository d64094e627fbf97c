/*!
http-template: raw-text HTTP request templates, sent with reqwest.

# Overview

A template is an HTTP request written the way it travels on the wire,
with `{{name}}` placeholders anywhere in it:

```text
POST /1.1/statuses/update.json HTTP/1.1
Host: api.twitter.com
Content-Type: application/x-www-form-urlencoded

status={{status}}
```

Processing a template merges the placeholders, parses the request line,
headers and body, optionally signs the request with OAuth 1.0a (HMAC-SHA1)
and sends it with [reqwest](https://crates.io/crates/reqwest).

# How to use

## Basic usecase 1 - fetch a body

```rust,no_run
use std::collections::HashMap;
use http_template::{process_request, RequestOptions};

# async fn run() -> http_template::Result<()> {
let template = "GET /search?q={{query}} HTTP/1.1
Host: {{host}}
Accept: application/json";

let mut context = HashMap::new();
context.insert("query".to_string(), "rust".to_string());
context.insert("host".to_string(), "example.com".to_string());

let options = RequestOptions::new().https(true);
let body = process_request(template, &context, &options).await?;
println!("{}", body);
# Ok(())
# }
```

## Basic usecase 2 - sending the tweet

```rust,no_run
use std::collections::HashMap;
use http_template::{Client, RequestOptions};

# async fn run() -> http_template::Result<()> {
let template = "POST /1.1/statuses/update.json HTTP/1.1
Host: api.twitter.com
Content-Type: application/x-www-form-urlencoded

status={{status}}";

let mut context = HashMap::new();
context.insert("status".to_string(), "Hello%2C%20Twitter%21".to_string());

// presence of a consumer key turns signing on
let options = RequestOptions::new()
    .https(true)
    .oauth1a("[CONSUMER_KEY]", "[CONSUMER_SECRET]")
    .access_token("[ACCESS_TOKEN]", "[TOKEN_SECRET]");

let client = Client::new();
let body = client.process(template, &context, &options).await?;
println!("{}", body);
# Ok(())
# }
```

## Basic usecase 3 - handling the response yourself

```rust,no_run
use http_template::{process_request_with, MergeContext, RequestOptions};

# async fn run() -> http_template::Result<()> {
let template = "DELETE /items/42 HTTP/1.1\nHost: example.com";
process_request_with(
    template,
    &MergeContext::new(),
    &RequestOptions::new(),
    |response: reqwest::Result<reqwest::Response>| async move {
        match response {
            Ok(response) => println!("status: {}", response.status()),
            Err(err) => println!("transport error: {}", err),
        }
        Ok::<(), http_template::Error>(())
    },
)
.await
# }
```

With the `blocking` feature the same operations are available
synchronously in the [`blocking`] module.
*/
#[cfg(feature = "blocking")]
pub mod blocking;
mod client;
mod error;
mod handler;
mod merge;
mod options;
mod parser;
mod request;
mod secrets;
mod signer;

// exposed to external program
pub use client::{process_request, process_request_with, Client};
pub use error::{Error, Result, TemplateError, TemplateResult};
pub use handler::ResponseHandler;
pub use merge::{has_placeholders, merge, MergeContext};
pub use options::RequestOptions;
pub use parser::{
    extract_body_parameters, extract_headers, extract_method, extract_path,
    extract_query_parameters, parse, HeaderBlock, ParsedRequest, RequestMethod,
};
pub use request::PreparedRequest;
pub use secrets::{Secrets, SecretsProvider};
pub use signer::{
    collect_parameters, generate_nonce, normalize_url, parameter_string, percent_encode,
    signature_base_string, signing_key, OAuthParameters, Signer, NONCE_LENGTH, OAUTH_VERSION,
    SIGNATURE_METHOD,
};

// exposed constant variables
/// Represents `oauth_consumer_key`.
pub const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
/// Represents `oauth_nonce`.
pub const OAUTH_NONCE_KEY: &str = "oauth_nonce";
/// Represents `oauth_signature`.
pub const OAUTH_SIGNATURE_KEY: &str = "oauth_signature";
/// Represents `oauth_signature_method`.
pub const OAUTH_SIGNATURE_METHOD_KEY: &str = "oauth_signature_method";
/// Represents `oauth_timestamp`.
pub const OAUTH_TIMESTAMP_KEY: &str = "oauth_timestamp";
/// Represents `oauth_token`.
pub const OAUTH_TOKEN_KEY: &str = "oauth_token";
/// Represents `oauth_version`.
pub const OAUTH_VERSION_KEY: &str = "oauth_version";

// crate-private constant variables
pub(crate) const HOST_HEADER: &str = "Host";
pub(crate) const WIRE_TARGET: &str = "http_template::wire";
