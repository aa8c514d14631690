//! Proxy verification.
//!
//! HTTP and HTTPS proxies are exercised by fetching an IP echo service
//! through them. SOCKS proxies are first checked for TCP reachability; a
//! SOCKS5 proxy then gets the same fetch, and reachability alone still
//! counts as success if the fetch does not go through.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use reqwest::{Client, Proxy, StatusCode, Url};
use tokio::net::TcpStream;

use crate::config::ProbeConfig;
use crate::model::{CheckOutcome, ProxyCheckRequest, ProxyKind};

/// What came back from a fetch through the proxy.
struct Fetched {
    status: StatusCode,
    origin: Option<String>,
}

/// Probes the proxy described by `request`.
pub async fn verify(config: &ProbeConfig, request: &ProxyCheckRequest) -> CheckOutcome {
    let port = match request.port.resolve() {
        Ok(port) => port,
        Err(message) => return CheckOutcome::invalid(message),
    };
    let host = request.host.trim();
    if host.is_empty() {
        return CheckOutcome::invalid("Proxy host required");
    }

    tracing::debug!(proxy = %request.target(), kind = %request.kind, "starting proxy check");

    if request.kind.is_socks() {
        verify_socks(config, request, host, port).await
    } else {
        verify_http(config, request, host, port).await
    }
}

async fn verify_http(
    config: &ProbeConfig,
    request: &ProxyCheckRequest,
    host: &str,
    port: u16,
) -> CheckOutcome {
    let kind = request.kind;
    let probe_url = match proxy_url("http", host, port, request) {
        Ok(url) => url,
        Err(outcome) => return outcome,
    };
    let test_url = if kind == ProxyKind::Https {
        &config.https_test_url
    } else {
        &config.http_test_url
    };

    let started = Instant::now();
    match fetch_origin(config, probe_url, test_url, config.session_deadline()).await {
        Ok(fetched) if fetched.status.is_success() => {
            let outcome = CheckOutcome::success(format!("{} proxy is working", kind.label()))
                .with_elapsed(started.elapsed())
                .with_kind(kind)
                .with_endpoint(endpoint(host, port));
            match fetched.origin {
                Some(ip) => outcome.with_observed_ip(ip),
                None => outcome,
            }
        }
        Ok(fetched) => CheckOutcome::failed(format!(
            "Proxy returned status code: {}",
            fetched.status.as_u16()
        )),
        Err(err) => classify_http_error(&err),
    }
}

fn classify_http_error(err: &reqwest::Error) -> CheckOutcome {
    tracing::debug!(error = %err, "proxy request failed");
    if err.is_connect() && err.is_timeout() {
        CheckOutcome::failed("Connection timeout - proxy server unreachable")
    } else if err.is_connect() {
        CheckOutcome::failed("Proxy connection failed - authentication or connectivity issue")
    } else if err.is_timeout() {
        CheckOutcome::failed("Read timeout - proxy server too slow")
    } else {
        CheckOutcome::error(format!("HTTP proxy error: {err}"))
    }
}

async fn verify_socks(
    config: &ProbeConfig,
    request: &ProxyCheckRequest,
    host: &str,
    port: u16,
) -> CheckOutcome {
    let kind = request.kind;

    let addrs: Vec<SocketAddr> =
        match tokio::time::timeout(config.connect_timeout, tokio::net::lookup_host((host, port)))
            .await
        {
            Ok(Ok(addrs)) => addrs.collect(),
            Ok(Err(e)) => {
                tracing::debug!(%host, error = %e, "DNS lookup failed");
                Vec::new()
            }
            Err(_) => return CheckOutcome::failed("Connection timeout"),
        };
    if addrs.is_empty() {
        return CheckOutcome::failed("DNS resolution failed");
    }

    let started = Instant::now();
    match tokio::time::timeout(config.connect_timeout, TcpStream::connect(&addrs[..])).await {
        Ok(Ok(stream)) => drop(stream),
        Ok(Err(e)) => {
            tracing::debug!(%host, port, error = %e, "proxy unreachable");
            return CheckOutcome::failed(format!("Connection failed to {host}:{port}"));
        }
        Err(_) => return CheckOutcome::failed("Connection timeout"),
    }
    let elapsed = started.elapsed();

    let reachable = CheckOutcome::success(format!("{} proxy connection successful", kind.label()))
        .with_elapsed(elapsed)
        .with_kind(kind)
        .with_endpoint(endpoint(host, port));

    if kind != ProxyKind::Socks5 {
        return reachable;
    }

    let Ok(probe_url) = proxy_url("socks5", host, port, request) else {
        return reachable;
    };
    match fetch_origin(config, probe_url, &config.http_test_url, config.io_timeout).await {
        Ok(fetched) if fetched.status.is_success() => {
            let confirmed = CheckOutcome::success(format!("{} proxy is working", kind.label()))
                .with_elapsed(elapsed)
                .with_kind(kind)
                .with_endpoint(endpoint(host, port));
            match fetched.origin {
                Some(ip) => confirmed.with_observed_ip(ip),
                None => confirmed,
            }
        }
        Ok(fetched) => {
            tracing::debug!(status = %fetched.status, "SOCKS5 probe not confirmed");
            reachable
        }
        Err(e) => {
            tracing::debug!(error = %e, "SOCKS5 probe failed");
            reachable
        }
    }
}

/// Builds the proxy URL with credentials embedded.
fn proxy_url(
    scheme: &str,
    host: &str,
    port: u16,
    request: &ProxyCheckRequest,
) -> Result<Url, CheckOutcome> {
    let invalid = || CheckOutcome::invalid(format!("Invalid proxy host: {host}"));
    let mut url =
        Url::parse(&format!("{scheme}://{}", endpoint(host, port))).map_err(|_| invalid())?;
    if let (Some(user), Some(secret)) = (&request.username, &request.secret) {
        url.set_username(user).map_err(|()| invalid())?;
        url.set_password(Some(secret)).map_err(|()| invalid())?;
    }
    Ok(url)
}

/// `host:port`, with IPv6 literals bracketed.
fn endpoint(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// GETs `target` through the proxy, reading `origin` from a JSON body.
async fn fetch_origin(
    config: &ProbeConfig,
    proxy_url: Url,
    target: &str,
    timeout: Duration,
) -> reqwest::Result<Fetched> {
    let client = Client::builder()
        .proxy(Proxy::all(proxy_url)?)
        .connect_timeout(config.connect_timeout)
        .timeout(timeout)
        .build()?;

    let response = client.get(target).send().await?;
    let status = response.status();
    let origin = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body.get("origin")?.as_str().map(str::to_owned));
    Ok(Fetched { status, origin })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::model::{CheckStatus, PortSpec};

    fn request(host: &str, port: PortSpec, kind: ProxyKind) -> ProxyCheckRequest {
        ProxyCheckRequest {
            host: host.to_string(),
            port,
            kind,
            username: None,
            secret: None,
        }
    }

    #[tokio::test]
    async fn test_bad_ports_are_invalid_before_connecting() {
        let config = ProbeConfig::default();
        let cases = [
            (PortSpec::from(0), "Invalid port number"),
            (PortSpec::Number(70000.into()), "Invalid port number"),
            (PortSpec::Text("abc".into()), "Port must be a number"),
        ];
        for kind in [ProxyKind::Http, ProxyKind::Socks5] {
            for (port, message) in &cases {
                let outcome = verify(&config, &request("10.0.0.1", port.clone(), kind)).await;
                assert_eq!(outcome.status, CheckStatus::Invalid);
                assert_eq!(outcome.message, *message);
            }
        }
    }

    #[tokio::test]
    async fn test_blank_host_is_invalid() {
        let outcome = verify(
            &ProbeConfig::default(),
            &request("  ", PortSpec::from(8080), ProxyKind::Socks4),
        )
        .await;
        assert_eq!(outcome.status, CheckStatus::Invalid);
    }

    #[test]
    fn test_endpoint_brackets_ipv6() {
        assert_eq!(endpoint("::1", 1080), "[::1]:1080");
        assert_eq!(endpoint("proxy.local", 3128), "proxy.local:3128");
    }

    #[test]
    fn test_proxy_url_embeds_credentials() {
        let mut req = request("proxy.local", PortSpec::from(3128), ProxyKind::Http);
        req.username = Some("bob".into());
        req.secret = Some("p@ss".into());
        let url = proxy_url("http", "proxy.local", 3128, &req).unwrap();
        assert_eq!(url.username(), "bob");
        assert_eq!(url.password(), Some("p%40ss"));
        assert_eq!(url.host_str(), Some("proxy.local"));
        assert_eq!(url.port(), Some(3128));
    }
}
