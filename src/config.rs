//! Configuration and command-line surface.
//!
//! Everything is optional: flags override environment variables, which
//! override the built-in defaults.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use crate::error::Error;

/// Default interface to listen on.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default TCP port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default time to wait for open connections during shutdown, in seconds.
pub const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 30;

/// Default log filter when neither `--log-level` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "heartbeat=info";

/// Where and how the server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How long shutdown waits for open connections before giving up on them.
    pub drain_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            drain_timeout: Duration::from_secs(DEFAULT_DRAIN_TIMEOUT_SECS),
        }
    }
}

impl ServerConfig {
    /// Resolves `host` and `port` into the socket address to bind.
    ///
    /// `host` may be an IP literal (IPv6 with or without brackets) or a
    /// hostname such as `localhost`; hostnames bind to their first resolved
    /// address.
    pub async fn resolve(&self) -> Result<SocketAddr, Error> {
        let host = self.host.trim_start_matches('[').trim_end_matches(']');
        let resolve_error = |source: io::Error| Error::Resolve {
            addr: format!("{}:{}", self.host, self.port),
            source,
        };

        let mut addrs = tokio::net::lookup_host((host, self.port))
            .await
            .map_err(resolve_error)?;
        addrs.next().ok_or_else(|| {
            resolve_error(io::Error::new(io::ErrorKind::NotFound, "no addresses found"))
        })
    }
}

/// heartbeat: a liveness endpoint
#[derive(Parser, Debug)]
#[command(name = "heartbeat", version, about)]
pub struct Cli {
    /// Interface to listen on
    #[arg(long, env = "HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// TCP port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Seconds to wait for open connections on shutdown
    #[arg(long, env = "DRAIN_TIMEOUT", default_value_t = DEFAULT_DRAIN_TIMEOUT_SECS)]
    pub drain_timeout: u64,

    /// Log level filter (e.g. "heartbeat=debug")
    #[arg(short, long)]
    pub log_level: Option<String>,
}

impl Cli {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            drain_timeout: Duration::from_secs(self.drain_timeout),
        }
    }

    /// Log filter with priority: flag > `RUST_LOG` > default.
    pub fn log_filter(&self) -> String {
        self.log_level
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Serializes tests that read or write the process environment.
    static ENV: Mutex<()> = Mutex::new(());

    fn clear_env() {
        // SAFETY: every test touching these variables holds `ENV`.
        unsafe {
            for key in ["HOST", "PORT", "DRAIN_TIMEOUT", "RUST_LOG"] {
                std::env::remove_var(key);
            }
        }
    }

    #[tokio::test]
    async fn defaults_listen_on_all_interfaces_port_8000() {
        let addr = ServerConfig::default().resolve().await.unwrap();
        assert_eq!(addr, "0.0.0.0:8000".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn ipv6_hosts_accept_brackets() {
        let config = ServerConfig { host: "[::1]".into(), port: 9000, ..Default::default() };
        assert_eq!(config.resolve().await.unwrap(), "[::1]:9000".parse::<SocketAddr>().unwrap());

        let config = ServerConfig { host: "::1".into(), ..config };
        assert_eq!(config.resolve().await.unwrap().port(), 9000);
    }

    #[tokio::test]
    async fn hostnames_are_resolved() {
        let config = ServerConfig { host: "localhost".into(), port: 9001, ..Default::default() };
        let addr = config.resolve().await.unwrap();

        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 9001);
    }

    #[tokio::test]
    async fn unresolvable_host_is_reported_with_the_address() {
        let config = ServerConfig { host: String::new(), ..Default::default() };
        let err = config.resolve().await.unwrap_err();

        assert!(matches!(err, Error::Resolve { .. }));
        assert!(err.to_string().contains(":8000"));
    }

    #[test]
    fn flags_override_defaults() {
        let _guard = ENV.lock().unwrap_or_else(|e| e.into_inner());
        let cli = Cli::try_parse_from([
            "heartbeat", "--host", "127.0.0.1", "--port", "9100", "--drain-timeout", "5",
        ])
        .unwrap();

        assert_eq!(
            cli.server_config(),
            ServerConfig {
                host: "127.0.0.1".into(),
                port: 9100,
                drain_timeout: Duration::from_secs(5),
            }
        );
    }

    #[test]
    fn environment_fills_in_missing_flags() {
        let _guard = ENV.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        // SAFETY: guarded by `ENV`.
        unsafe {
            std::env::set_var("HOST", "127.0.0.2");
            std::env::set_var("PORT", "9200");
            std::env::set_var("DRAIN_TIMEOUT", "7");
        }

        let from_env = Cli::try_parse_from(["heartbeat"]).unwrap().server_config();
        let flag_wins = Cli::try_parse_from(["heartbeat", "--port", "9300"]).unwrap().server_config();
        clear_env();

        assert_eq!(
            from_env,
            ServerConfig {
                host: "127.0.0.2".into(),
                port: 9200,
                drain_timeout: Duration::from_secs(7),
            }
        );
        assert_eq!(flag_wins.port, 9300);
        assert_eq!(flag_wins.host, "127.0.0.2");
    }

    #[test]
    fn log_filter_priority_is_flag_then_env_then_default() {
        let _guard = ENV.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        let cli = Cli::try_parse_from(["heartbeat"]).unwrap();
        assert_eq!(cli.log_filter(), DEFAULT_LOG_FILTER);

        // SAFETY: guarded by `ENV`.
        unsafe { std::env::set_var("RUST_LOG", "heartbeat=warn") };
        assert_eq!(cli.log_filter(), "heartbeat=warn");

        let cli = Cli::try_parse_from(["heartbeat", "--log-level", "heartbeat=trace"]).unwrap();
        assert_eq!(cli.log_filter(), "heartbeat=trace");
        clear_env();
    }

    #[test]
    fn rejects_out_of_range_port() {
        let _guard = ENV.lock().unwrap_or_else(|e| e.into_inner());
        assert!(Cli::try_parse_from(["heartbeat", "--port", "70000"]).is_err());
    }
}
