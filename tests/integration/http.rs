//! The HTTP fallback against a minimal in-process HTTP server.
//!
//! The connector targets the controller's fixed API port, so this test
//! binds 127.0.0.1:8080 and skips gracefully when that port is taken.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use printlink_connector::{HttpConnector, Payload, Printer, HTTP_PORT};

// Both tests bind the fixed API port; run them one at a time.
static HTTP_LOCK: Mutex<()> = Mutex::new(());

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Read one HTTP request: headers, then content-length bytes of body.
async fn read_http_request(stream: &mut TcpStream) -> Result<(String, Vec<u8>)> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut tmp).await?;
        if n == 0 {
            bail!("connection closed before headers were complete");
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);

    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut tmp).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&tmp[..n]);
    }
    Ok((head, body))
}

async fn respond_ok(stream: &mut TcpStream) -> Result<()> {
    stream
        .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
        .await?;
    stream.flush().await?;
    Ok(())
}

/// The multipart upload must carry the API token as a form field and the
/// payload under its file name.
#[tokio::test]
async fn http_upload_posts_token_and_filename() -> Result<()> {
    let _lock = HTTP_LOCK.lock().unwrap();
    let listener = match TcpListener::bind(("127.0.0.1", HTTP_PORT)).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("SKIP: cannot bind port {HTTP_PORT}: {e}");
            return Ok(());
        }
    };

    let mock = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await?;
        let (head, body) = read_http_request(&mut stream).await?;

        assert!(
            head.starts_with("POST /api/v1/upload"),
            "unexpected request line: {head}"
        );
        assert!(
            find_subsequence(&body, b"name=\"token\"").is_some(),
            "token field missing"
        );
        assert!(find_subsequence(&body, b"secret").is_some(), "token value missing");
        assert!(
            find_subsequence(&body, b"filename=\"code.gcode\"").is_some(),
            "file name missing"
        );
        assert!(
            find_subsequence(&body, b"G28\nG1 X10\n").is_some(),
            "job bytes missing"
        );

        respond_ok(&mut stream).await?;
        anyhow::Ok(())
    });

    let mut printer = Printer::new("127.0.0.1");
    printer.token = Some("secret".to_string());

    let connector = HttpConnector::new(&printer, Duration::from_secs(5))?;
    let payload = Payload::new("code.gcode", b"G28\nG1 X10\n".to_vec());
    connector.upload(&payload).await?;

    mock.await??;
    Ok(())
}

/// An error status from the controller fails the upload.
#[tokio::test]
async fn http_upload_surfaces_rejection() -> Result<()> {
    let _lock = HTTP_LOCK.lock().unwrap();
    let listener = match TcpListener::bind(("127.0.0.1", HTTP_PORT)).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("SKIP: cannot bind port {HTTP_PORT}: {e}");
            return Ok(());
        }
    };

    let mock = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await?;
        let _ = read_http_request(&mut stream).await?;
        stream
            .write_all(b"HTTP/1.1 403 Forbidden\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
            .await?;
        stream.flush().await?;
        anyhow::Ok(())
    });

    let printer = Printer::new("127.0.0.1");
    let connector = HttpConnector::new(&printer, Duration::from_secs(5))?;
    let payload = Payload::new("code.gcode", vec![0x3B]);

    let err = connector
        .upload(&payload)
        .await
        .expect_err("403 must fail the upload");
    assert!(err.to_string().contains("403"), "got: {err}");

    mock.await??;
    Ok(())
}
