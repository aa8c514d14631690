//! Email credential verification over SMTP, IMAP and POP3.

use std::io;
use std::time::Instant;

use credprobe_imap as imap;
use credprobe_pop3 as pop3;
use credprobe_smtp as smtp;

use crate::config::ProbeConfig;
use crate::model::{CheckOutcome, EmailCheckRequest};
use crate::provider::{MailProtocol, ProviderEndpoint, ProviderRegistry, domain_of};

const AUTH_REJECTED: &str = "Authentication failed - invalid credentials";
const TIMED_OUT: &str = "Connection timeout - server did not respond";
const UNREACHABLE: &str = "Connection failed - server unreachable";
const DISCONNECTED: &str = "Server disconnected unexpectedly";
const DNS_FAILED: &str = "DNS resolution failed";

/// Why a login session did not complete.
#[derive(Debug)]
enum SessionError {
    /// The server refused the credentials.
    Rejected,
    /// Could not reach or keep talking to the server.
    Transport(String),
    /// The server refused a command other than the login.
    Server(String),
    /// Anything the classification above does not cover.
    Unexpected(String),
}

impl SessionError {
    fn into_outcome(self) -> CheckOutcome {
        match self {
            Self::Rejected => CheckOutcome::failed(AUTH_REJECTED),
            Self::Transport(cause) | Self::Server(cause) => CheckOutcome::failed(cause),
            Self::Unexpected(cause) => CheckOutcome::error(cause),
        }
    }
}

fn transport_cause(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => DISCONNECTED.to_string(),
        io::ErrorKind::TimedOut => TIMED_OUT.to_string(),
        io::ErrorKind::InvalidData => format!("TLS handshake failed: {err}"),
        _ => UNREACHABLE.to_string(),
    }
}

impl From<smtp::Error> for SessionError {
    fn from(err: smtp::Error) -> Self {
        match err {
            smtp::Error::AuthRejected { .. } => Self::Rejected,
            smtp::Error::Io(e) => Self::Transport(transport_cause(&e)),
            smtp::Error::Timeout(_) => Self::Transport(TIMED_OUT.to_string()),
            smtp::Error::Tls(e) => Self::Transport(format!("TLS handshake failed: {e}")),
            e if e.is_disconnect() => Self::Transport(DISCONNECTED.to_string()),
            smtp::Error::SmtpError { code, message } => {
                Self::Server(format!("SMTP error: {code} {message}"))
            }
            other => Self::Unexpected(format!("SMTP error: {other}")),
        }
    }
}

impl From<imap::Error> for SessionError {
    fn from(err: imap::Error) -> Self {
        match err {
            imap::Error::Auth(_) => Self::Rejected,
            imap::Error::Io(e) => Self::Transport(transport_cause(&e)),
            imap::Error::Timeout(_) => Self::Transport(TIMED_OUT.to_string()),
            imap::Error::Tls(e) => Self::Transport(format!("TLS handshake failed: {e}")),
            imap::Error::Bye(_) => Self::Transport(DISCONNECTED.to_string()),
            imap::Error::No(text) | imap::Error::Bad(text) => {
                Self::Server(format!("IMAP error: {text}"))
            }
            imap::Error::InvalidState(text) => Self::Server(format!("IMAP error: {text}")),
            other => Self::Unexpected(format!("IMAP error: {other}")),
        }
    }
}

impl From<pop3::Error> for SessionError {
    fn from(err: pop3::Error) -> Self {
        match err {
            pop3::Error::AuthRejected(_) => Self::Rejected,
            pop3::Error::Io(e) => Self::Transport(transport_cause(&e)),
            pop3::Error::Timeout(_) => Self::Transport(TIMED_OUT.to_string()),
            pop3::Error::Tls(e) => Self::Transport(format!("TLS handshake failed: {e}")),
            pop3::Error::ErrResponse(text) => Self::Server(format!("POP3 error: {text}")),
            other => Self::Unexpected(format!("POP3 error: {other}")),
        }
    }
}

/// Logs in to the provider's server for the requested protocol.
///
/// The whole session, including DNS, is bounded by the configured timeouts.
/// The connection is dropped on every exit path.
pub async fn verify(
    registry: &ProviderRegistry,
    config: &ProbeConfig,
    request: &EmailCheckRequest,
) -> CheckOutcome {
    let Some(domain) = domain_of(&request.address) else {
        return CheckOutcome::invalid("Invalid email format");
    };
    let domain = domain.to_ascii_lowercase();
    let protocol = request.protocol;

    if !registry.contains(&domain) {
        return CheckOutcome::unsupported(format!("Provider {domain} not supported"));
    }
    let Some(endpoint) = registry.endpoint(&domain, protocol) else {
        return CheckOutcome::unsupported(format!(
            "{} not supported for {domain}",
            protocol.label()
        ));
    };

    tracing::debug!(
        address = %request.address,
        %protocol,
        endpoint = %endpoint.descriptor(),
        "starting email check"
    );
    let started = Instant::now();

    if let Err(outcome) = resolve(endpoint, config).await {
        return outcome;
    }

    let session = async {
        match protocol {
            MailProtocol::Smtp => smtp_session(endpoint, config, request).await,
            MailProtocol::Imap => imap_session(endpoint, config, request).await,
            MailProtocol::Pop3 => pop3_session(endpoint, config, request).await,
        }
    };
    let result = tokio::time::timeout(config.session_deadline(), session)
        .await
        .unwrap_or_else(|_| Err(SessionError::Transport(TIMED_OUT.to_string())));

    match result {
        Ok(()) => CheckOutcome::success(format!("{} authentication successful", protocol.label()))
            .with_provider(domain)
            .with_protocol(protocol)
            .with_endpoint(endpoint.descriptor())
            .with_elapsed(started.elapsed()),
        Err(err) => {
            tracing::debug!(address = %request.address, %protocol, error = ?err, "email check failed");
            err.into_outcome()
        }
    }
}

async fn resolve(endpoint: &ProviderEndpoint, config: &ProbeConfig) -> Result<(), CheckOutcome> {
    let lookup = tokio::net::lookup_host((endpoint.host.as_str(), endpoint.port));
    match tokio::time::timeout(config.connect_timeout, lookup).await {
        Err(_) => Err(CheckOutcome::failed(TIMED_OUT)),
        Ok(Err(e)) => {
            tracing::debug!(host = %endpoint.host, error = %e, "DNS lookup failed");
            Err(CheckOutcome::failed(DNS_FAILED))
        }
        Ok(Ok(mut addrs)) => {
            if addrs.next().is_some() {
                Ok(())
            } else {
                Err(CheckOutcome::failed(DNS_FAILED))
            }
        }
    }
}

async fn smtp_session(
    endpoint: &ProviderEndpoint,
    config: &ProbeConfig,
    request: &EmailCheckRequest,
) -> Result<(), SessionError> {
    let client_hostname = config.client_hostname.as_str();

    let client = if endpoint.encrypted {
        let stream =
            smtp::connection::connect_tls(&endpoint.host, endpoint.port, config.connect_timeout)
                .await?;
        smtp::Client::from_stream(stream)
            .await?
            .ehlo(client_hostname)
            .await?
    } else {
        let stream =
            smtp::connection::connect(&endpoint.host, endpoint.port, config.connect_timeout)
                .await?;
        let client = smtp::Client::from_stream(stream)
            .await?
            .ehlo(client_hostname)
            .await?;
        if client.server_info().supports_starttls() {
            client.starttls(&endpoint.host, client_hostname).await?
        } else {
            tracing::debug!(host = %endpoint.host, "no STARTTLS offered, staying on plaintext");
            client
        }
    };

    let client = client
        .authenticate(&request.address, &request.secret)
        .await?;
    client.quit().await?;
    Ok(())
}

async fn imap_session(
    endpoint: &ProviderEndpoint,
    config: &ProbeConfig,
    request: &EmailCheckRequest,
) -> Result<(), SessionError> {
    let security = if endpoint.encrypted {
        imap::Security::Implicit
    } else {
        imap::Security::None
    };
    let imap_config = imap::Config::builder(&endpoint.host)
        .port(endpoint.port)
        .security(security)
        .connect_timeout(config.connect_timeout)
        .io_timeout(config.io_timeout)
        .build();

    let client = imap::Client::connect(&imap_config).await?;
    let client = client.login(&request.address, &request.secret).await?;
    let (client, mailbox) = client.select(&config.mailbox).await?;
    tracing::debug!(mailbox = %config.mailbox, exists = mailbox.exists, "mailbox selected");
    client.close().await?.logout().await?;
    Ok(())
}

async fn pop3_session(
    endpoint: &ProviderEndpoint,
    config: &ProbeConfig,
    request: &EmailCheckRequest,
) -> Result<(), SessionError> {
    let stream = if endpoint.encrypted {
        pop3::connection::connect_tls(&endpoint.host, endpoint.port, config.connect_timeout)
            .await?
    } else {
        pop3::connection::connect(&endpoint.host, endpoint.port, config.connect_timeout).await?
    };

    let client = pop3::Client::from_stream(stream).await?;
    let mut client = client.login(&request.address, &request.secret).await?;
    let stat = client.stat().await?;
    tracing::debug!(messages = stat.count, octets = stat.size, "maildrop stat");
    client.quit().await?;
    Ok(())
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
    use std::collections::BTreeMap;

    use super::*;
    use crate::model::CheckStatus;

    fn request(address: &str, protocol: MailProtocol) -> EmailCheckRequest {
        EmailCheckRequest {
            address: address.to_string(),
            secret: "pw".to_string(),
            protocol,
        }
    }

    #[tokio::test]
    async fn test_missing_at_is_invalid_for_every_protocol() {
        let registry = ProviderRegistry::builtin();
        let config = ProbeConfig::default();
        for protocol in [MailProtocol::Smtp, MailProtocol::Imap, MailProtocol::Pop3] {
            let outcome = verify(&registry, &config, &request("nobody.gmail.com", protocol)).await;
            assert_eq!(outcome.status, CheckStatus::Invalid);
            assert_eq!(outcome.message, "Invalid email format");
        }
    }

    #[tokio::test]
    async fn test_unknown_domain_is_unsupported() {
        let registry = ProviderRegistry::builtin();
        let outcome = verify(
            &registry,
            &ProbeConfig::default(),
            &request("a@Example.ORG", MailProtocol::Smtp),
        )
        .await;
        assert_eq!(outcome.status, CheckStatus::Unsupported);
        assert_eq!(outcome.message, "Provider example.org not supported");
    }

    #[tokio::test]
    async fn test_unconfigured_protocol_is_unsupported() {
        let registry = ProviderRegistry::from_entries([(
            "smtp-only.test".to_string(),
            BTreeMap::from([(
                MailProtocol::Smtp,
                ProviderEndpoint::new("127.0.0.1", 2525, false),
            )]),
        )])
        .unwrap();
        let outcome = verify(
            &registry,
            &ProbeConfig::default(),
            &request("a@smtp-only.test", MailProtocol::Pop3),
        )
        .await;
        assert_eq!(outcome.status, CheckStatus::Unsupported);
        assert_eq!(outcome.message, "POP3 not supported for smtp-only.test");
    }

    #[test]
    fn test_error_classification() {
        let rejected = SessionError::from(smtp::Error::AuthRejected {
            code: 535,
            message: "nope".into(),
        });
        assert_eq!(rejected.into_outcome().message, AUTH_REJECTED);

        let refused = SessionError::from(imap::Error::Io(io::Error::from(
            io::ErrorKind::ConnectionRefused,
        )));
        let outcome = refused.into_outcome();
        assert_eq!(outcome.status, CheckStatus::Failed);
        assert_eq!(outcome.message, UNREACHABLE);

        let dropped = SessionError::from(smtp::Error::smtp_error(421, "closing"));
        assert_eq!(dropped.into_outcome().message, DISCONNECTED);

        let locked = SessionError::from(pop3::Error::ErrResponse("maildrop locked".into()));
        let outcome = locked.into_outcome();
        assert_eq!(outcome.status, CheckStatus::Failed);
        assert_eq!(outcome.message, "POP3 error: maildrop locked");

        let garbage = SessionError::from(imap::Error::Protocol("bad greeting".into()));
        let outcome = garbage.into_outcome();
        assert_eq!(outcome.status, CheckStatus::Error);
        assert!(outcome.message.starts_with("IMAP error: "));
    }
}
