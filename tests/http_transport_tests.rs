//! HttpTransport against a throwaway HTTP server on 127.0.0.1

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use localmind::{ErrorKind, Gateway, GatewayConfig, TimeoutConfig};

/// Serve one canned response; the handle yields the raw request text
async fn serve_once(
  status: &'static str
, body: &'static str
) -> (u16, tokio::task::JoinHandle<String>)
{   let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
      let (mut socket, _) = listener.accept().await.unwrap();
      let request = read_request(&mut socket).await;
      let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status, body.len(), body
      );
      socket.write_all(response.as_bytes()).await.unwrap();
      socket.shutdown().await.ok();
      request
    });
    (port, handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String
{   let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop
    {   let n = socket.read(&mut chunk).await.unwrap();
        if n == 0
        {   break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(end) = text.find("\r\n\r\n")
        {   let length = text[..end]
              .lines()
              .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length")
                {   value.trim().parse::<usize>().ok()
                } else
                {   None
                }
              })
              .unwrap_or(0);
            if buf.len() >= end + 4 + length
            {   break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn gateway(port: u16) -> Gateway
{   Gateway::new("127.0.0.1", port.to_string(), "llama3", 0.2).unwrap()
}

#[tokio::test]
async fn test_generate_success()
{   let (port, server) = serve_once(
      "200 OK",
      r#"{"model":"llama3","response":"Hello there","done":true}"#
    ).await;

    let text = gateway(port).request("Say hello").await.unwrap();
    assert_eq!(text, "Hello there");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/generate HTTP/1.1"));
    assert!(request.contains(r#""prompt":"Say hello""#));
    assert!(request.contains(r#""stream":false"#));
    assert!(request.contains(r#""temperature":0.2"#));
}

#[tokio::test]
async fn test_server_error_is_network_error()
{   let (port, _server) = serve_once(
      "503 Service Unavailable",
      r#"{"error":"loading model"}"#
    ).await;
    let err = gateway(port).request("hi").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(err.message().contains("503"));
}

#[tokio::test]
async fn test_client_error_is_api_error()
{   let (port, _server) = serve_once(
      "404 Not Found",
      r#"{"error":"model 'llama3' not found"}"#
    ).await;
    let err = gateway(port).request("hi").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Api);
    assert!(err.message().contains("not found"));
}

#[tokio::test]
async fn test_missing_response_field_is_api_error()
{   let (port, _server) = serve_once("200 OK", r#"{"done":true}"#).await;
    let err = gateway(port).request("hi").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Api);
}

#[tokio::test]
async fn test_malformed_body_is_api_error()
{   let (port, _server) = serve_once("200 OK", "<html>proxy</html>").await;
    let err = gateway(port).request("hi").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Api);
}

#[tokio::test]
async fn test_version()
{   let (port, server) = serve_once("200 OK", r#"{"version":"0.1.32"}"#).await;
    assert_eq!(gateway(port).version().await.unwrap(), "0.1.32");
    let request = server.await.unwrap();
    assert!(request.starts_with("GET /api/version HTTP/1.1"));
}

#[tokio::test]
async fn test_version_failure_is_network_error()
{   let (port, _server) = serve_once("404 Not Found", "{}").await;
    let err = gateway(port).version().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}

#[tokio::test]
async fn test_connection_refused_is_network_error()
{   let port = {
      let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
      listener.local_addr().unwrap().port()
    };
    let err = gateway(port).request("hi").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}

#[tokio::test]
async fn test_silent_server_times_out()
{   let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let _server = tokio::spawn(async move {
      let (socket, _) = listener.accept().await.unwrap();
      tokio::time::sleep(Duration::from_secs(5)).await;
      drop(socket);
    });

    let config = GatewayConfig
    {   timeouts: TimeoutConfig
        {   generate_secs: 1
          , version_secs: 1
        }
      , ..GatewayConfig::new("127.0.0.1", port.to_string(), "llama3", 0.0)
    };
    let err = Gateway::from_config(config).unwrap()
      .request("hi")
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(err.is_network());
}
