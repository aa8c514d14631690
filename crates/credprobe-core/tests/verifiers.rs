//! End-to-end tests for the email and proxy verifiers.
//!
//! Scripted servers on loopback sockets stand in for mail servers and
//! proxies so the real connect, login and classification paths run.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use credprobe_core::verify::{email, proxy};
use credprobe_core::{
    CheckStatus, EmailCheckRequest, MailProtocol, PortSpec, ProbeConfig, ProviderRegistry,
    ProxyCheckRequest, ProxyKind,
};

/// Accepts one connection, sends `greeting`, then answers each received
/// line with the next reply. `{tag}` is replaced by the line's first word.
async fn line_server(greeting: &'static str, replies: Vec<&'static str>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut lines = BufReader::new(read).lines();

        write.write_all(greeting.as_bytes()).await.unwrap();
        for reply in replies {
            let Ok(Some(line)) = lines.next_line().await else {
                return;
            };
            let tag = line.split(' ').next().unwrap_or_default().to_string();
            if write
                .write_all(reply.replace("{tag}", &tag).as_bytes())
                .await
                .is_err()
            {
                return;
            }
        }
    });

    port
}

/// Port that was bound a moment ago and is now closed.
async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

fn registry(port: u16) -> ProviderRegistry {
    ProviderRegistry::from_json_str(&format!(
        r#"{{"example.test": {{
            "smtp": {{"host": "127.0.0.1", "port": {port}, "encrypted": false}},
            "imap": {{"host": "127.0.0.1", "port": {port}, "encrypted": false}},
            "pop3": {{"host": "127.0.0.1", "port": {port}, "encrypted": false}}
        }}}}"#
    ))
    .unwrap()
}

fn config() -> ProbeConfig {
    ProbeConfig::default().with_timeout(Duration::from_secs(2))
}

fn login(protocol: MailProtocol, secret: &str) -> EmailCheckRequest {
    EmailCheckRequest {
        address: "alice@example.test".to_string(),
        secret: secret.to_string(),
        protocol,
    }
}

#[tokio::test]
async fn test_smtp_login_succeeds() {
    let port = line_server(
        "220 mock.example.test ESMTP ready\r\n",
        vec![
            "250-mock.example.test\r\n250 AUTH PLAIN LOGIN\r\n",
            "235 2.7.0 Authentication successful\r\n",
            "221 2.0.0 Bye\r\n",
        ],
    )
    .await;

    let outcome = email::verify(&registry(port), &config(), &login(MailProtocol::Smtp, "pw")).await;
    assert_eq!(outcome.status, CheckStatus::Success, "{}", outcome.message);
    assert_eq!(outcome.message, "SMTP authentication successful");
    assert_eq!(outcome.provider.as_deref(), Some("example.test"));
    assert_eq!(outcome.protocol, Some(MailProtocol::Smtp));
    assert_eq!(outcome.endpoint, Some(format!("127.0.0.1:{port}")));
    assert!(outcome.elapsed_ms.is_some());
}

#[tokio::test]
async fn test_smtp_rejected_credentials() {
    let port = line_server(
        "220 mock ESMTP\r\n",
        vec![
            "250-mock\r\n250 AUTH PLAIN\r\n",
            "535 5.7.8 Username and Password not accepted\r\n",
        ],
    )
    .await;

    let outcome =
        email::verify(&registry(port), &config(), &login(MailProtocol::Smtp, "wrong")).await;
    assert_eq!(outcome.status, CheckStatus::Failed);
    assert_eq!(outcome.message, "Authentication failed - invalid credentials");
}

#[tokio::test]
async fn test_imap_login_and_select() {
    let port = line_server(
        "* OK [CAPABILITY IMAP4rev1] ready\r\n",
        vec![
            "{tag} OK LOGIN completed\r\n",
            "* 3 EXISTS\r\n* 0 RECENT\r\n{tag} OK [READ-WRITE] SELECT completed\r\n",
            "{tag} OK CLOSE completed\r\n",
            "* BYE logging out\r\n{tag} OK LOGOUT completed\r\n",
        ],
    )
    .await;

    let outcome = email::verify(&registry(port), &config(), &login(MailProtocol::Imap, "pw")).await;
    assert_eq!(outcome.status, CheckStatus::Success, "{}", outcome.message);
    assert_eq!(outcome.message, "IMAP authentication successful");
}

#[tokio::test]
async fn test_imap_select_refused_after_login() {
    let port = line_server(
        "* OK ready\r\n",
        vec![
            "{tag} OK LOGIN completed\r\n",
            "{tag} NO [NONEXISTENT] Mailbox does not exist\r\n",
        ],
    )
    .await;

    let outcome = email::verify(&registry(port), &config(), &login(MailProtocol::Imap, "pw")).await;
    assert_eq!(outcome.status, CheckStatus::Failed);
    assert!(outcome.message.starts_with("IMAP error: "), "{}", outcome.message);
}

#[tokio::test]
async fn test_pop3_login_and_stat() {
    let port = line_server(
        "+OK POP3 ready\r\n",
        vec!["+OK\r\n", "+OK logged in\r\n", "+OK 2 320\r\n", "+OK bye\r\n"],
    )
    .await;

    let outcome = email::verify(&registry(port), &config(), &login(MailProtocol::Pop3, "pw")).await;
    assert_eq!(outcome.status, CheckStatus::Success, "{}", outcome.message);
    assert_eq!(outcome.message, "POP3 authentication successful");
}

#[tokio::test]
async fn test_pop3_rejected_password() {
    let port = line_server(
        "+OK POP3 ready\r\n",
        vec!["+OK\r\n", "-ERR [AUTH] invalid password\r\n"],
    )
    .await;

    let outcome =
        email::verify(&registry(port), &config(), &login(MailProtocol::Pop3, "wrong")).await;
    assert_eq!(outcome.status, CheckStatus::Failed);
    assert_eq!(outcome.message, "Authentication failed - invalid credentials");
}

#[tokio::test]
async fn test_unreachable_server() {
    let port = closed_port().await;
    let outcome = email::verify(&registry(port), &config(), &login(MailProtocol::Smtp, "pw")).await;
    assert_eq!(outcome.status, CheckStatus::Failed);
    assert_eq!(outcome.message, "Connection failed - server unreachable");
}

#[tokio::test]
async fn test_server_hangs_up() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        drop(socket);
    });

    let outcome = email::verify(&registry(port), &config(), &login(MailProtocol::Pop3, "pw")).await;
    assert_eq!(outcome.status, CheckStatus::Failed);
    assert_eq!(outcome.message, "Server disconnected unexpectedly");
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let config = ProbeConfig::default().with_timeout(Duration::from_millis(200));
    let outcome = email::verify(&registry(port), &config, &login(MailProtocol::Smtp, "pw")).await;
    assert_eq!(outcome.status, CheckStatus::Failed);
    assert_eq!(outcome.message, "Connection timeout - server did not respond");
}

/// Fake forward proxy: answers one request with `response` and reports the
/// request head it received.
async fn http_proxy(response: String) -> (u16, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }
        let _ = tx.send(String::from_utf8_lossy(&head).into_owned());
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });

    (port, rx)
}

fn json_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn proxy_config() -> ProbeConfig {
    ProbeConfig {
        http_test_url: "http://echo.example.test/ip".to_string(),
        ..ProbeConfig::default().with_timeout(Duration::from_secs(2))
    }
}

fn proxy_request(port: u16, kind: ProxyKind) -> ProxyCheckRequest {
    ProxyCheckRequest {
        host: "127.0.0.1".to_string(),
        port: PortSpec::from(port),
        kind,
        username: None,
        secret: None,
    }
}

#[tokio::test]
async fn test_http_proxy_reports_origin() {
    let (port, head) = http_proxy(json_response("200 OK", r#"{"origin": "203.0.113.7"}"#)).await;
    let mut request = proxy_request(port, ProxyKind::Http);
    request.username = Some("bob".to_string());
    request.secret = Some("hunter2".to_string());

    let outcome = proxy::verify(&proxy_config(), &request).await;
    assert_eq!(outcome.status, CheckStatus::Success, "{}", outcome.message);
    assert_eq!(outcome.message, "HTTP proxy is working");
    assert_eq!(outcome.observed_ip.as_deref(), Some("203.0.113.7"));
    assert_eq!(outcome.kind, Some(ProxyKind::Http));
    assert_eq!(outcome.endpoint, Some(format!("127.0.0.1:{port}")));

    let head = head.await.unwrap().to_ascii_lowercase();
    assert!(head.starts_with("get http://echo.example.test/ip"), "{head}");
    assert!(head.contains("proxy-authorization: basic"), "{head}");
}

#[tokio::test]
async fn test_http_proxy_status_code() {
    let (port, _head) = http_proxy(json_response("407 Proxy Authentication Required", "{}")).await;
    let outcome = proxy::verify(&proxy_config(), &proxy_request(port, ProxyKind::Http)).await;
    assert_eq!(outcome.status, CheckStatus::Failed);
    assert_eq!(outcome.message, "Proxy returned status code: 407");
}

#[tokio::test]
async fn test_http_proxy_refused() {
    let port = closed_port().await;
    let outcome = proxy::verify(&proxy_config(), &proxy_request(port, ProxyKind::Http)).await;
    assert_eq!(outcome.status, CheckStatus::Failed);
    assert_eq!(
        outcome.message,
        "Proxy connection failed - authentication or connectivity issue"
    );
}

#[tokio::test]
async fn test_socks5_falls_back_to_reachability() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        // Reachability connect, then the probe's connect; both are dropped.
        for _ in 0..2 {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            drop(socket);
        }
    });

    let outcome = proxy::verify(&proxy_config(), &proxy_request(port, ProxyKind::Socks5)).await;
    assert_eq!(outcome.status, CheckStatus::Success, "{}", outcome.message);
    assert_eq!(outcome.message, "SOCKS5 proxy connection successful");
    assert_eq!(outcome.kind, Some(ProxyKind::Socks5));
    assert!(outcome.observed_ip.is_none());
}

#[tokio::test]
async fn test_socks4_reachability() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let _ = listener.accept().await;
    });

    let outcome = proxy::verify(&proxy_config(), &proxy_request(port, ProxyKind::Socks4)).await;
    assert_eq!(outcome.status, CheckStatus::Success);
    assert_eq!(outcome.message, "SOCKS4 proxy connection successful");
}

#[tokio::test]
async fn test_socks_refused() {
    let port = closed_port().await;
    let outcome = proxy::verify(&proxy_config(), &proxy_request(port, ProxyKind::Socks4)).await;
    assert_eq!(outcome.status, CheckStatus::Failed);
    assert_eq!(outcome.message, format!("Connection failed to 127.0.0.1:{port}"));
}
