use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable holding the listen address
pub const ADDR_VAR: &str = "RENTAL_ADMIN_ADDR";

/// Environment variable holding the directory exports are written to
pub const DATA_DIR_VAR: &str = "RENTAL_ADMIN_DATA_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid listen address {value:?}: {source}")]
    InvalidAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Runtime settings for the binaries
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    /// Address the web server binds to
    pub bind_addr: SocketAddr,

    /// Where exported files are saved by the command-line tool
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            data_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read settings through `lookup`, falling back to defaults for unset values
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(value) = lookup(ADDR_VAR).filter(|v| !v.trim().is_empty()) {
            config.bind_addr = parse_addr(&value)?;
        }
        if let Some(value) = lookup(DATA_DIR_VAR).filter(|v| !v.trim().is_empty()) {
            config.data_dir = PathBuf::from(value);
        }

        Ok(config)
    }

    /// Override the listen address from a command-line argument
    pub fn with_addr_arg(mut self, arg: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(value) = arg {
            self.bind_addr = parse_addr(value)?;
        }
        Ok(self)
    }
}

fn parse_addr(value: &str) -> Result<SocketAddr, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|source| ConfigError::InvalidAddr {
            value: value.to_string(),
            source,
        })
}

/// Initialise `env_logger`, defaulting to `info` when `RUST_LOG` is unset
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
