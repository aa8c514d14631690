//! Command-line options.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Email credential and proxy verification service.
#[derive(Debug, Parser)]
#[command(name = "credprobe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Verify email credentials and proxy servers over HTTP", long_about = None)]
pub struct Args {
    /// Address the HTTP API listens on
    #[arg(long, env = "CREDPROBE_LISTEN", default_value = "127.0.0.1:5000")]
    pub listen: SocketAddr,

    /// Bearer token every /api request must present
    #[arg(long, env = "CREDPROBE_API_TOKEN", hide_env_values = true)]
    pub api_token: String,

    /// JSON provider table replacing the built-in one
    #[arg(long, env = "CREDPROBE_PROVIDERS")]
    pub providers: Option<PathBuf>,

    /// Connect and I/O timeout for each probe, in seconds
    #[arg(long, env = "CREDPROBE_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["credprobe", "--api-token", "t0ken"]).unwrap();
        assert_eq!(args.listen, "127.0.0.1:5000".parse().unwrap());
        assert_eq!(args.timeout_secs, 10);
        assert!(args.providers.is_none());
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "credprobe",
            "--api-token",
            "t0ken",
            "--listen",
            "0.0.0.0:8080",
            "--providers",
            "/etc/credprobe/providers.json",
            "--timeout-secs",
            "3",
        ])
        .unwrap();
        assert_eq!(args.listen.port(), 8080);
        assert_eq!(args.timeout_secs, 3);
        assert_eq!(
            args.providers.unwrap(),
            PathBuf::from("/etc/credprobe/providers.json")
        );
    }

    #[test]
    fn test_clap_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
