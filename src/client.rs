use reqwest::{Client as ReqwestClient, Response};
use tracing::debug;

use crate::{
    handler::read_response, Error, MergeContext, PreparedRequest, RequestOptions,
    ResponseHandler, Result,
};

/// Sends request templates with an inner `reqwest::Client`.
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
    /// Constructs a new `Client`.
    ///
    /// This method calls reqwest::Client::new() internally.
    pub fn new() -> Self {
        Client {
            inner: ReqwestClient::new(),
        }
    }

    /// Constructs a new `Client` with specifying inner `reqwest::Client`.
    ///
    /// Timeouts and other transport settings come from that client.
    pub fn new_with_client(client: ReqwestClient) -> Self {
        Client { inner: client }
    }

    /// Process a template and return the response body.
    ///
    /// # Errors
    ///
    /// Template errors are returned before anything is sent. After sending,
    /// this method fails on transport errors, on non-2xx statuses (with the
    /// status and body) and when the body cannot be read.
    pub async fn process(
        &self,
        template: &str,
        context: &MergeContext,
        options: &RequestOptions,
    ) -> Result<String> {
        let request = PreparedRequest::from_template(template, context, options)?;
        let response = self
            .execute(request, options)
            .await
            .map_err(Error::Transport)?;
        read_response(response, options.debug).await
    }

    /// Process a template and pass the response to `handler`.
    ///
    /// The handler's result is returned; no body is read here.
    pub async fn process_with<H>(
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
        let response = self.execute(request, options).await;
        handler.handle(response).await
    }

    /// Send an already prepared request.
    pub async fn execute(
        &self,
        request: PreparedRequest,
        options: &RequestOptions,
    ) -> reqwest::Result<Response> {
        if options.debug {
            request.dump();
        }
        debug!(method = %request.method, url = %request.url, "sending request");
        request.into_builder(&self.inner).send().await
    }
}

/// Process a template with a fresh [`Client`] and return the response body.
pub async fn process_request(
    template: &str,
    context: &MergeContext,
    options: &RequestOptions,
) -> Result<String> {
    Client::new().process(template, context, options).await
}

/// Process a template with a fresh [`Client`] and pass the response to
/// `handler`.
pub async fn process_request_with<H>(
    template: &str,
    context: &MergeContext,
    options: &RequestOptions,
    handler: H,
) -> Result<()>
where
    H: ResponseHandler,
{
    Client::new()
        .process_with(template, context, options, handler)
        .await
}
