//! HttpTransport against a local stub server

use driftflow_cloud::{
    CloudError, Method, ProviderRequest, Target, Transport,
};
use driftflow_cloud_http::HttpTransport;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Canned reply: status line, extra headers, body
type Reply = (&'static str, Vec<(&'static str, &'static str)>, &'static str);

struct Stub {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

/// Serve `replies` in order, one connection each.
async fn spawn_stub(replies: Vec<Reply>) -> Stub {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);

    tokio::spawn(async move {
        for (status, headers, body) in replies {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let request = read_request(&mut socket).await;
            seen.lock().unwrap().push(request);

            let mut response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n",
                body.len()
            );
            for (name, value) in headers {
                response.push_str(&format!("{name}: {value}\r\n"));
            }
            response.push_str("\r\n");
            response.push_str(body);
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    Stub {
        base_url: format!("http://{addr}/v1"),
        requests,
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&data);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if data.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).into_owned()
}

fn path(path: &str) -> Target {
    Target::Path {
        path: path.to_string(),
        query: Vec::new(),
    }
}

#[tokio::test]
async fn test_sends_bearer_token_query_and_json_body() {
    let stub = spawn_stub(vec![(
        "201 Created",
        vec![("Location", "/v1/actions/7")],
        r#"{"server":{"id":42},"action":{"id":7,"status":"running"}}"#,
    )])
    .await;
    let transport = HttpTransport::new(&stub.base_url, "hc-token").unwrap();

    let request = ProviderRequest::new(
        Method::Post,
        Target::Path {
            path: "/servers".to_string(),
            query: vec![("name".to_string(), "web 1".to_string())],
        },
    )
    .with_body(json!({"name": "web-1", "server_type": "cx22"}));
    let response = transport.send(&request).await.unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.header("location"), Some("/v1/actions/7"));
    assert_eq!(response.body["action"]["id"], json!(7));

    let requests = stub.requests.lock().unwrap();
    let raw = &requests[0];
    assert!(raw.starts_with("POST /v1/servers?name=web+1 HTTP/1.1"), "{raw}");
    assert!(raw.to_ascii_lowercase().contains("authorization: bearer hc-token"));
    assert!(raw.ends_with(r#"{"name":"web-1","server_type":"cx22"}"#));
}

#[tokio::test]
async fn test_not_found_maps_to_resource_not_found() {
    let stub = spawn_stub(vec![(
        "404 Not Found",
        vec![],
        r#"{"error":{"code":"not_found"}}"#,
    )])
    .await;
    let transport = HttpTransport::new(&stub.base_url, "t").unwrap();

    let err = transport
        .send(&ProviderRequest::get(path("/servers/9")))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_error_status_and_body_are_kept() {
    let stub = spawn_stub(vec![(
        "429 Too Many Requests",
        vec![("Retry-After", "1")],
        r#"{"error":{"code":"rate_limit_exceeded"}}"#,
    )])
    .await;
    let transport = HttpTransport::new(&stub.base_url, "t").unwrap();

    let err = transport
        .send(&ProviderRequest::get(path("/servers")))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(429));
    assert!(matches!(err, CloudError::ApiError { .. }));
    assert!(err.to_string().contains("rate_limit_exceeded"));
}

#[tokio::test]
async fn test_empty_body_is_null() {
    let stub = spawn_stub(vec![("204 No Content", vec![], "")]).await;
    let transport = HttpTransport::new(&stub.base_url, "t").unwrap();

    let response = transport
        .send(&ProviderRequest::new(Method::Delete, path("/servers/42")))
        .await
        .unwrap();
    assert_eq!(response.status, 204);
    assert!(response.body.is_null());
}
