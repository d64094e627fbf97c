use std::future::Future;

use async_trait::async_trait;
use http::{HeaderMap, StatusCode};
use reqwest::Response;
use tracing::info;

use crate::{Error, Result, WIRE_TARGET};

/// Takes over a response instead of having its body returned.
///
/// The handler receives the transport result as is: the response for any
/// status, or the error when the request never completed. What counts as a
/// failure is up to the handler.
///
/// Closures `FnOnce(reqwest::Result<Response>) -> impl Future<Output = Result<()>>`
/// are handlers.
#[async_trait(?Send)]
pub trait ResponseHandler {
    async fn handle(self, response: reqwest::Result<Response>) -> Result<()>;
}

#[async_trait(?Send)]
impl<F, Fut> ResponseHandler for F
where
    F: FnOnce(reqwest::Result<Response>) -> Fut,
    Fut: Future<Output = Result<()>> + 'static,
{
    async fn handle(self, response: reqwest::Result<Response>) -> Result<()> {
        self(response).await
    }
}

/// Read the body of a response, failing on non-2xx statuses.
pub(crate) async fn read_response(response: Response, dump: bool) -> Result<String> {
    let status = response.status();
    if dump {
        dump_head(status, response.headers());
    }
    let body = response.text().await.map_err(Error::ResponseRead)?;
    check_status(status, body, dump)
}

pub(crate) fn dump_head(status: StatusCode, headers: &HeaderMap) {
    let headers = headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value.to_str().unwrap_or("<binary>")))
        .collect::<Vec<_>>()
        .join("\n");
    info!(target: WIRE_TARGET, status = status.as_u16(), headers = %headers, "response");
}

pub(crate) fn check_status(status: StatusCode, body: String, dump: bool) -> Result<String> {
    if status.is_success() {
        return Ok(body);
    }
    if dump {
        info!(target: WIRE_TARGET, status = status.as_u16(), body = %body, "response body");
    }
    Err(Error::RequestFailed {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_returns_body() {
        let body = check_status(StatusCode::OK, "{\"k\":\"v\"}".to_string(), false).unwrap();
        assert_eq!(body, "{\"k\":\"v\"}");
        let body = check_status(StatusCode::NO_CONTENT, String::new(), true).unwrap();
        assert_eq!(body, "");
    }

    #[test]
    fn failure_carries_status_and_body() {
        match check_status(StatusCode::NOT_FOUND, "not found".to_string(), false) {
            Err(Error::RequestFailed { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "not found");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(check_status(StatusCode::MOVED_PERMANENTLY, String::new(), false).is_err());
    }
}
