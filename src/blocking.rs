//! Synchronous template processing over `reqwest::blocking`.
//!
//! Mirrors the async API: [`Client::process`] returns the body,
//! [`Client::process_with`] hands the response to a [`ResponseHandler`].
//! Like `reqwest::blocking`, this must not be used inside an async runtime.
use reqwest::blocking::{Client as ReqwestClient, Response};
use tracing::debug;

use crate::{
    handler::{check_status, dump_head},
    Error, MergeContext, PreparedRequest, RequestOptions, Result,
};

/// Takes over a blocking response instead of having its body returned.
pub trait ResponseHandler {
    fn handle(self, response: reqwest::Result<Response>) -> Result<()>;
}

impl<F> ResponseHandler for F
where
    F: FnOnce(reqwest::Result<Response>) -> Result<()>,
{
    fn handle(self, response: reqwest::Result<Response>) -> Result<()> {
        self(response)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Client {
    inner: ReqwestClient,
}

impl From<ReqwestClient> for Client {
    fn from(client: ReqwestClient) -> Self {
        Client::new_with_client(client)
    }
}

impl Client {
    pub fn new() -> Self {
        Client {
            inner: ReqwestClient::new(),
        }
    }

    pub fn new_with_client(client: ReqwestClient) -> Self {
        Client { inner: client }
    }

    /// Process a template and return the response body.
    pub fn process(
        &self,
        template: &str,
        context: &MergeContext,
        options: &RequestOptions,
    ) -> Result<String> {
        let request = PreparedRequest::from_template(template, context, options)?;
        let response = self
            .execute(request, options)
            .map_err(Error::Transport)?;
        read_response(response, options.debug)
    }

    /// Process a template and pass the response to `handler`.
    pub fn process_with<H>(
        &self,
        template: &str,
        context: &MergeContext,
        options: &RequestOptions,
        handler: H,
    ) -> Result<()>
    where
        H: ResponseHandler,
    {
        let request = PreparedRequest::from_template(template, context, options)?;
        handler.handle(self.execute(request, options))
    }

    pub fn execute(
        &self,
        request: PreparedRequest,
        options: &RequestOptions,
    ) -> reqwest::Result<Response> {
        if options.debug {
            request.dump();
        }
        debug!(method = %request.method, url = %request.url, "sending request");
        request.into_blocking_builder(&self.inner).send()
    }
}

pub fn process_request(
    template: &str,
    context: &MergeContext,
    options: &RequestOptions,
) -> Result<String> {
    Client::new().process(template, context, options)
}

pub fn process_request_with<H>(
    template: &str,
    context: &MergeContext,
    options: &RequestOptions,
    handler: H,
) -> Result<()>
where
    H: ResponseHandler,
{
    Client::new().process_with(template, context, options, handler)
}

fn read_response(response: Response, dump: bool) -> Result<String> {
    let status = response.status();
    if dump {
        dump_head(status, response.headers());
    }
    let body = response.text().map_err(Error::ResponseRead)?;
    check_status(status, body, dump)
}
