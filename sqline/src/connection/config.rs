//! Connection configuration.
use std::{env::var, fmt, time::Duration};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5657;

/// Connection config.
#[derive(Clone, Debug)]
pub struct Config {
    host: String,
    port: u16,
    read_timeout: Option<Duration>,
}

impl Config {
    pub fn new(host: impl Into<String>, port: u16) -> Config {
        Config { host: host.into(), port, read_timeout: None }
    }

    /// Retrieve configuration from environment variable.
    ///
    /// It reads:
    /// - `SQLINE_HOST`
    /// - `SQLINE_PORT`
    ///
    /// falling back to `localhost:5657`.
    pub fn from_env() -> Config {
        let host = var("SQLINE_HOST").unwrap_or_else(|_| DEFAULT_HOST.into());
        let port = var("SQLINE_PORT")
            .ok()
            .and_then(|port| port.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        Config { host, port, read_timeout: None }
    }

    /// Deadline for each response read.
    ///
    /// The protocol itself defines no timeout; without one an unresponsive
    /// peer stalls the caller indefinitely.
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Set the deadline for each response read.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Config {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl std::str::FromStr for Config {
    type Err = ParseError;

    /// Parse `host:port`, or a bare `host` with the default port.
    fn from_str(s: &str) -> Result<Config, ParseError> {
        match s.rsplit_once(':') {
            Some((host, port)) => {
                if host.is_empty() {
                    return Err(ParseError("host missing"));
                }
                let Ok(port) = port.parse() else {
                    return Err(ParseError("invalid port"));
                };
                Ok(Config::new(host, port))
            }
            None if s.is_empty() => Err(ParseError("host missing")),
            None => Ok(Config::new(s, DEFAULT_PORT)),
        }
    }
}

/// An error from parsing a [`Config`].
pub struct ParseError(&'static str);

impl std::error::Error for ParseError { }

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid config: {}", self.0)
    }
}

impl fmt::Debug for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
