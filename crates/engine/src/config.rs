//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Timing and capacity knobs for sessions and the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Period of the liveness ping sent to every connection.
    pub keep_alive: Duration,
    /// Deadline for a single write (message or ping) to one connection.
    pub write_deadline: Duration,
    /// Bounded wait for attach, detach, send and snapshot requests.
    pub request_timeout: Duration,
    /// Outbound mailbox bound per session.
    pub mailbox_capacity: usize,
    /// Zero-connection idle time before a session is evicted. `None` keeps
    /// sessions forever.
    pub idle_eviction: Option<Duration>,
    /// How often the idle reaper sweeps the lobby.
    pub reap_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            keep_alive: Duration::from_secs(55),
            write_deadline: Duration::from_secs(4),
            request_timeout: Duration::from_millis(250),
            mailbox_capacity: 256,
            idle_eviction: Some(Duration::from_secs(300)),
            reap_interval: Duration::from_secs(30),
        }
    }
}

/// Everything the binary needs to boot.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub hub: HubConfig,
    pub shutdown_timeout: Duration,
    pub max_message_bytes: usize,
    /// `*` or a comma separated origin list; `None` disables CORS.
    pub cors_allowed_origins: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 9999,
            hub: HubConfig::default(),
            shutdown_timeout: Duration::from_secs(5),
            max_message_bytes: 1024,
            cors_allowed_origins: None,
        }
    }
}

impl ServerConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup. Missing or unparsable
    /// values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let env = Env { lookup: &lookup };

        let idle_secs = env.parse("IDLE_EVICTION_SECS", 300u64);
        let hub = HubConfig {
            // A zero period would panic the keep-alive ticker.
            keep_alive: Duration::from_secs(env.parse("KEEP_ALIVE_SECS", 55u64).max(1)),
            write_deadline: Duration::from_secs(env.parse("WRITE_DEADLINE_SECS", 4u64).max(1)),
            request_timeout: Duration::from_millis(env.parse("REQUEST_TIMEOUT_MS", 250)),
            mailbox_capacity: env.parse("MAILBOX_CAPACITY", 256usize).max(1),
            idle_eviction: (idle_secs > 0).then(|| Duration::from_secs(idle_secs)),
            reap_interval: Duration::from_secs(env.parse("REAP_INTERVAL_SECS", 30u64).max(1)),
        };

        Self {
            host: env.string("SERVER_HOST").unwrap_or(defaults.host),
            port: env
                .string("SERVER_PORT")
                .or_else(|| env.string("PORT"))
                .and_then(|raw| parse_or_warn("SERVER_PORT", &raw))
                .unwrap_or(defaults.port),
            hub,
            shutdown_timeout: Duration::from_secs(env.parse("SHUTDOWN_TIMEOUT_SECS", 5)),
            max_message_bytes: env.parse("MAX_MESSAGE_BYTES", defaults.max_message_bytes),
            cors_allowed_origins: env.string("CORS_ALLOWED_ORIGINS"),
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn parse<T: FromStr>(&self, key: &str, default: T) -> T {
        self.string(key)
            .and_then(|raw| parse_or_warn(key, &raw))
            .unwrap_or(default)
    }
}

fn parse_or_warn<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = raw, "Ignoring unparsable configuration value");
            None
        }
    }
}
