//! Integration tests for the IMAP client.
//!
//! A scripted server on a loopback socket plays the other side of the
//! conversation so the real connect path is exercised.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use credprobe_imap::{Client, Config, Error, Security};

/// Accepts one connection, sends the greeting, then answers each received
/// command line with the next scripted reply (tag substituted for `{tag}`).
async fn scripted_server(greeting: &'static str, replies: Vec<&'static str>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut lines = BufReader::new(read).lines();

        write.write_all(greeting.as_bytes()).await.unwrap();
        for reply in replies {
            let Some(line) = lines.next_line().await.unwrap() else {
                return;
            };
            let tag = line.split(' ').next().unwrap_or_default().to_string();
            write
                .write_all(reply.replace("{tag}", &tag).as_bytes())
                .await
                .unwrap();
        }
    });

    port
}

fn config(port: u16) -> Config {
    Config::builder("127.0.0.1")
        .security(Security::None)
        .port(port)
        .io_timeout(Duration::from_secs(2))
        .build()
}

#[tokio::test]
async fn test_login_select_logout() {
    let port = scripted_server(
        "* OK [CAPABILITY IMAP4rev1] test server ready\r\n",
        vec![
            "{tag} OK LOGIN completed\r\n",
            "* 7 EXISTS\r\n* 1 RECENT\r\n{tag} OK [READ-WRITE] SELECT completed\r\n",
            "{tag} OK CLOSE completed\r\n",
            "* BYE see you\r\n{tag} OK LOGOUT completed\r\n",
        ],
    )
    .await;

    let client = Client::connect(&config(port)).await.unwrap();
    let client = client.login("alice@example.com", "s3cret").await.unwrap();
    let (client, summary) = client.select("INBOX").await.unwrap();
    assert_eq!(summary.exists, 7);
    assert_eq!(summary.recent, 1);
    client.close().await.unwrap().logout().await.unwrap();
}

#[tokio::test]
async fn test_rejected_login() {
    let port = scripted_server(
        "* OK ready\r\n",
        vec!["{tag} NO [AUTHENTICATIONFAILED] Authentication failed.\r\n"],
    )
    .await;

    let client = Client::connect(&config(port)).await.unwrap();
    let err = client.login("alice", "wrong").await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let config = Config::builder("127.0.0.1")
        .security(Security::None)
        .port(port)
        .io_timeout(Duration::from_millis(200))
        .build();
    let err = Client::connect(&config).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
}
