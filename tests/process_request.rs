//! End-to-end template processing against a throwaway HTTP server.
//!
//! Each server accepts a single connection, records the raw request and
//! answers with a fixed status and body.

use std::{collections::HashMap, time::Duration};

use http_template::{
    process_request, process_request_with, Client, Error, MergeContext, RequestOptions,
    TemplateError,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::oneshot,
};

const SEARCH_TEMPLATE: &str = "GET /search?q={{query}} HTTP/1.1
Host: {{host}}
User-Agent: http-template-tests";

async fn serve_once(status: u16, body: &'static str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        let _ = tx.send(request);
    });
    (addr.to_string(), rx)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..head_end]).to_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn header<'a>(request: &'a str, name: &str) -> Option<&'a str> {
    request.lines().find_map(|line| {
        let (key, value) = line.split_at(line.find(':')?);
        if key.eq_ignore_ascii_case(name) {
            Some(value[1..].trim())
        } else {
            None
        }
    })
}

fn search_context(host: &str) -> MergeContext {
    let mut context = HashMap::new();
    context.insert("query".to_string(), "test".to_string());
    context.insert("host".to_string(), host.to_string());
    context
}

#[tokio::test]
async fn returns_body_on_success() {
    let (host, request) = serve_once(200, "{\"k\":\"v\"}").await;

    let body = process_request(SEARCH_TEMPLATE, &search_context(&host), &RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(body, "{\"k\":\"v\"}");

    let request = request.await.unwrap();
    assert!(request.starts_with("GET /search?q=test HTTP/1.1\r\n"));
    assert_eq!(header(&request, "host"), Some(host.as_str()));
    assert_eq!(header(&request, "user-agent"), Some("http-template-tests"));
    assert_eq!(header(&request, "authorization"), None);
}

#[tokio::test]
async fn invalid_method_sends_nothing() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let host = listener.local_addr().unwrap().to_string();
    let template = SEARCH_TEMPLATE.replacen("GET", "ILLEGAL", 1);

    let result = process_request(&template, &search_context(&host), &RequestOptions::new()).await;
    match result {
        Err(Error::Template(TemplateError::InvalidMethod(method))) => assert_eq!(method, "ILLEGAL"),
        other => panic!("unexpected {:?}", other),
    }

    let accepted = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
    assert!(accepted.is_err(), "no connection expected");
}

#[tokio::test]
async fn non_success_status_is_request_failed() {
    let (host, _request) = serve_once(404, "not found").await;

    let result =
        process_request(SEARCH_TEMPLATE, &search_context(&host), &RequestOptions::new()).await;
    match result {
        Err(Error::RequestFailed { status, body }) => {
            assert_eq!(status, 404);
            assert_eq!(body, "not found");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_host_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let host = listener.local_addr().unwrap().to_string();
    drop(listener);

    let result =
        process_request(SEARCH_TEMPLATE, &search_context(&host), &RequestOptions::new()).await;
    assert!(matches!(result, Err(Error::Transport(_))), "{:?}", result);
}

#[tokio::test]
async fn signed_post_carries_headers_and_body() {
    let (host, request) = serve_once(201, "created").await;
    let template = "POST /1.1/statuses/update.json HTTP/1.1
Host: http://{{host}}
Content-Type: application/x-www-form-urlencoded
X-Custom: yes

status={{status}}";
    let mut context = HashMap::new();
    context.insert("host".to_string(), host.clone());
    context.insert("status".to_string(), "hello%20world".to_string());
    let options = RequestOptions::from_pairs(vec![
        ("https", "true"),
        ("oauth1a_consumer_key", "ck"),
        ("oauth1a_consumer_secret", "cs"),
        ("oauth1a_access_token", "tk"),
        ("oauth1a_access_token_secret", "ts"),
    ])
    .unwrap();

    let body = Client::new().process(template, &context, &options).await.unwrap();
    assert_eq!(body, "created");

    let request = request.await.unwrap();
    assert!(request.starts_with("POST /1.1/statuses/update.json HTTP/1.1\r\n"));
    assert_eq!(header(&request, "x-custom"), Some("yes"));
    assert!(request.ends_with("\r\n\r\nstatus=hello%20world"));

    let authorization = header(&request, "authorization").unwrap();
    assert!(authorization.starts_with("OAuth oauth_consumer_key=\"ck\", oauth_nonce=\""));
    assert!(authorization.contains("oauth_signature_method=\"HMAC-SHA1\""));
    assert!(authorization.contains("oauth_token=\"tk\""));
    assert!(authorization.ends_with("oauth_version=\"1.0\""));
}

#[tokio::test]
async fn handler_receives_any_status() {
    let (host, _request) = serve_once(404, "not found").await;
    let (tx, rx) = oneshot::channel();

    let result = process_request_with(
        SEARCH_TEMPLATE,
        &search_context(&host),
        &RequestOptions::new(),
        move |response: reqwest::Result<reqwest::Response>| async move {
            let response = response.map_err(Error::Transport)?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(Error::ResponseRead)?;
            let _ = tx.send((status, body));
            Ok::<(), Error>(())
        },
    )
    .await;

    assert!(result.is_ok());
    assert_eq!(rx.await.unwrap(), (404, "not found".to_string()));
}

#[tokio::test]
async fn handler_error_is_returned() {
    let (host, _request) = serve_once(200, "{}").await;

    let result = Client::new()
        .process_with(
            SEARCH_TEMPLATE,
            &search_context(&host),
            &RequestOptions::new(),
            |_response: reqwest::Result<reqwest::Response>| async move {
                Err::<(), Error>(Error::RequestFailed {
                    status: 200,
                    body: "rejected by handler".to_string(),
                })
            },
        )
        .await;

    match result {
        Err(Error::RequestFailed { body, .. }) => assert_eq!(body, "rejected by handler"),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn handler_sees_transport_errors() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let host = listener.local_addr().unwrap().to_string();
    drop(listener);

    let result = process_request_with(
        SEARCH_TEMPLATE,
        &search_context(&host),
        &RequestOptions::new(),
        |response: reqwest::Result<reqwest::Response>| async move {
            assert!(response.is_err());
            Ok::<(), Error>(())
        },
    )
    .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn debug_option_does_not_change_result() {
    let (host, _request) = serve_once(500, "boom").await;
    let options = RequestOptions::new().debug(true);

    let result = process_request(SEARCH_TEMPLATE, &search_context(&host), &options).await;
    match result {
        Err(Error::RequestFailed { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected {:?}", other),
    }
}
