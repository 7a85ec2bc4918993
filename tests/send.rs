use eventkit::form::build_form;
use eventkit::payload::{build_payload, parse_headers, CT_JSON};
use eventkit::schedule::run_once_or_periodic;
use eventkit::sink::{FileSink, HttpSink, Message, Sink};
use eventkit::template::{Delimiters, TemplateEngine};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Accept one connection, answer with `status` and return the raw request.
async fn serve_once(status: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request_complete(&request) {
                break;
            }
        }
        let response = format!("HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8_lossy(&request).into_owned()
    });

    (address, handle)
}

fn request_complete(request: &[u8]) -> bool {
    let text = String::from_utf8_lossy(request);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    request.len() >= header_end + 4 + content_length
}

#[tokio::test]
async fn test_file_sink_once_run() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("events.log");
    let sink: Arc<dyn Sink> = Arc::new(FileSink::new(&path));
    let engine = Arc::new(TemplateEngine::builder().seed(7).build());
    let delims = Delimiters::default();
    let (_tx, rx) = watch::channel(false);

    let task_sink = sink.clone();
    let task_engine = engine.clone();
    run_once_or_periodic(rx, true, Duration::from_secs(1), move || {
        let sink = task_sink.clone();
        let engine = task_engine.clone();
        let delims = delims.clone();
        async move {
            let built = build_payload(&engine, r#"{"seq":{{counter}}}"#, "", &delims)?;
            sink.send(&Message::new(built.body, built.content_type)).await
        }
    })
    .await
    .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content, "{\"seq\":1}\n");
}

#[tokio::test]
async fn test_json_payload_is_valid_json() {
    let engine = TemplateEngine::builder().seed(1).build();
    let built = build_payload(&engine, "{{json}}", "", &Delimiters::default()).unwrap();
    assert_eq!(built.content_type, CT_JSON);

    let value: serde_json::Value = serde_json::from_slice(&built.body).unwrap();
    for field in ["id", "name", "value", "active", "time"] {
        assert!(value.get(field).is_some(), "missing field {field}");
    }
}

#[tokio::test]
async fn test_http_sink_sends_headers_and_body() {
    let (address, server) = serve_once("200 OK").await;
    let sink = HttpSink::new(&address, "/event", "POST").unwrap();

    let engine = TemplateEngine::default();
    let delims = Delimiters::default();
    let headers = parse_headers(
        &engine,
        &["X-Source = eventkit".to_string(), "X-Seq={{counter}}".to_string()],
        &delims,
    )
    .unwrap();
    let built = build_payload(&engine, r#"{"msg":{{str:sentiment}}}"#, "", &delims).unwrap();
    let message = Message::new(built.body.clone(), built.content_type).with_headers(headers);

    sink.send(&message).await.unwrap();

    let request = server.await.unwrap();
    let lower = request.to_ascii_lowercase();
    assert!(request.starts_with("POST /event HTTP/1.1\r\n"));
    assert!(lower.contains("content-type: application/json"));
    assert!(lower.contains("x-source: eventkit"));
    assert!(lower.contains("x-seq: 1"));
    assert!(request.ends_with(std::str::from_utf8(&built.body).unwrap()));
}

#[tokio::test]
async fn test_http_sink_rejects_error_status() {
    let (address, server) = serve_once("500 Internal Server Error").await;
    let sink = HttpSink::new(&address, "/event", "PUT").unwrap();

    let result = sink
        .send(&Message::new(b"payload".to_vec(), "text/plain"))
        .await;
    assert!(result.is_err());

    let request = server.await.unwrap();
    assert!(request.starts_with("PUT /event HTTP/1.1\r\n"));
}

#[tokio::test]
async fn test_http_sink_sends_multipart_form() {
    let temp_dir = TempDir::new().unwrap();
    let upload = temp_dir.path().join("notes.txt");
    std::fs::write(&upload, "file body").unwrap();

    let (address, server) = serve_once("201 Created").await;
    let sink = HttpSink::new(&address, "/upload", "POST").unwrap();

    let engine = TemplateEngine::builder().var("who", "eve").build();
    let form = build_form(
        &engine,
        &["user={{var:who}}".to_string(), "seq={{counter}}".to_string()],
        &[format!("doc={}", upload.display())],
        &Delimiters::default(),
    )
    .unwrap();
    let mut headers = std::collections::BTreeMap::new();
    headers.insert("X-Source".to_string(), "eventkit".to_string());

    sink.send(&Message::multipart(form).with_headers(headers))
        .await
        .unwrap();

    let request = server.await.unwrap();
    let lower = request.to_ascii_lowercase();
    assert!(request.starts_with("POST /upload HTTP/1.1\r\n"));
    assert!(lower.contains("content-type: multipart/form-data; boundary="));
    assert!(lower.contains("x-source: eventkit"));
    assert!(request.contains("name=\"user\"\r\n\r\neve\r\n"));
    assert!(request.contains("name=\"seq\"\r\n\r\n1\r\n"));
    assert!(request.contains("name=\"doc\"; filename=\"notes.txt\""));
    assert!(lower.contains("content-type: application/octet-stream"));
    assert!(request.contains("\r\n\r\nfile body\r\n"));
}
