use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use tg_folder_uploader::{
    config::ChatId,
    errors::{AppError, TransportError},
    uploader::{Attachment, Destination, TelegramClient, Transport},
};

/// Bot API round trips against a one-shot local HTTP server

const TOKEN: &str = "123:abc";

struct Reply {
    status: &'static str,
    body: &'static str,
    delay: Duration,
}

impl Reply {
    fn new(status: &'static str, body: &'static str) -> Self {
        Self {
            status,
            body,
            delay: Duration::ZERO,
        }
    }
}

/// Serve exactly one request. The handle yields the raw request text.
async fn serve_once(reply: Reply) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;

        tokio::time::sleep(reply.delay).await;

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            reply.status,
            reply.body.len(),
            reply.body
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
        request
    });

    (base_url, handle)
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        let read = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buffer.extend_from_slice(&chunk[..read]);

        if request_complete(&buffer) {
            break;
        }
    }

    String::from_utf8_lossy(&buffer).to_string()
}

fn request_complete(buffer: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buffer);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let headers = text[..header_end].to_lowercase();
    let body_len = buffer.len() - (header_end + 4);

    if let Some(line) = headers
        .lines()
        .find(|line| line.starts_with("content-length:"))
    {
        let expected: usize = line["content-length:".len()..].trim().parse().unwrap_or(0);
        return body_len >= expected;
    }

    if headers.contains("transfer-encoding: chunked") {
        return text.ends_with("0\r\n\r\n");
    }

    true
}

fn local_client(base_url: &str) -> TelegramClient {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    TelegramClient::with_client(http, base_url, TOKEN)
}

fn destination(thread_id: Option<i64>) -> Destination {
    Destination::new(ChatId::Id(-1001234567890), thread_id)
}

#[tokio::test]
async fn test_send_photo_success() {
    let (base_url, server) = serve_once(Reply::new(
        "200 OK",
        r#"{"ok":true,"result":{"message_id":1}}"#,
    ))
    .await;
    let client = local_client(&base_url);

    let result = client
        .send_photo(
            &destination(Some(42)),
            Attachment::new("a.jpg", "image/jpeg", b"jpeg bytes"),
            Duration::from_secs(5),
        )
        .await;
    assert_eq!(result, Ok(()));

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /bot123:abc/sendPhoto "));
    assert!(request.contains("name=\"chat_id\""));
    assert!(request.contains("-1001234567890"));
    assert!(request.contains("name=\"message_thread_id\""));
    assert!(request.contains("\r\n\r\n42\r\n"));
    assert!(request.contains("filename=\"a.jpg\""));
    assert!(request.contains("jpeg bytes"));
}

#[tokio::test]
async fn test_send_document_without_topic() {
    let (base_url, server) = serve_once(Reply::new("200 OK", r#"{"ok":true,"result":{}}"#)).await;
    let client = local_client(&base_url);

    let result = client
        .send_document(
            &destination(None),
            Attachment::new("raw.png", "application/octet-stream", b"png bytes"),
            Duration::from_secs(5),
        )
        .await;
    assert_eq!(result, Ok(()));

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /bot123:abc/sendDocument "));
    assert!(request.contains("name=\"document\""));
    assert!(!request.contains("message_thread_id"));
}

#[tokio::test]
async fn test_bad_request_is_rejected() {
    let (base_url, _server) = serve_once(Reply::new(
        "400 Bad Request",
        r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#,
    ))
    .await;
    let client = local_client(&base_url);

    let result = client
        .send_photo(
            &destination(None),
            Attachment::new("a.jpg", "image/jpeg", b"jpeg bytes"),
            Duration::from_secs(5),
        )
        .await;

    assert_eq!(
        result,
        Err(TransportError::rejected(400, "Bad Request: chat not found"))
    );
}

#[tokio::test]
async fn test_gateway_error_is_retryable() {
    let (base_url, _server) = serve_once(Reply::new("502 Bad Gateway", "Bad Gateway")).await;
    let client = local_client(&base_url);

    let result = client
        .send_photo(
            &destination(None),
            Attachment::new("a.jpg", "image/jpeg", b"jpeg bytes"),
            Duration::from_secs(5),
        )
        .await;

    match result {
        Err(e) => assert!(e.is_retryable(), "expected retryable error, got {:?}", e),
        Ok(()) => panic!("502 should not succeed"),
    }
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let (base_url, _server) = serve_once(Reply {
        status: "200 OK",
        body: r#"{"ok":true,"result":{}}"#,
        delay: Duration::from_secs(5),
    })
    .await;
    let client = local_client(&base_url);

    let result = client
        .send_photo(
            &destination(None),
            Attachment::new("a.jpg", "image/jpeg", b"jpeg bytes"),
            Duration::from_millis(200),
        )
        .await;

    assert_eq!(result, Err(TransportError::Timeout));
}

#[tokio::test]
async fn test_connection_refused_is_retryable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = local_client(&base_url);
    let result = client
        .send_document(
            &destination(None),
            Attachment::new("a.png", "application/octet-stream", b"png bytes"),
            Duration::from_secs(5),
        )
        .await;

    assert!(matches!(result, Err(TransportError::Network(_))));
}

#[tokio::test]
async fn test_get_updates() {
    let (base_url, server) = serve_once(Reply::new(
        "200 OK",
        r#"{"ok":true,"result":[{"update_id":7,"message":{"message_id":3,"message_thread_id":9,"reply_to_message":{"message_id":9,"forum_topic_created":{"name":"Pets","icon_color":1}}}}]}"#,
    ))
    .await;
    let client = local_client(&base_url);

    let updates = client.get_updates().await.unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].update_id, 7);

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /bot123:abc/getUpdates "));
}

#[tokio::test]
async fn test_get_updates_api_error() {
    let (base_url, _server) = serve_once(Reply::new(
        "200 OK",
        r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#,
    ))
    .await;
    let client = local_client(&base_url);

    match client.get_updates().await {
        Err(AppError::Api { code, description }) => {
            assert_eq!(code, 401);
            assert_eq!(description, "Unauthorized");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}
