use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use dotenvy::Error as DotenvError;
use taskview_metadata::MetadataEndpoint;
use thiserror::Error;

use crate::mode::DeploymentMode;

const DEFAULT_PORT: u16 = 80;
const DEFAULT_PUBLIC_DIR: &str = "public";
const PORT_ENV: &str = "PORT";
const BIND_ADDR_ENV: &str = "BIND_ADDR";
const METADATA_ENDPOINT_ENV: &str = "METADATA_ENDPOINT";
const PUBLIC_DIR_ENV: &str = "PUBLIC_DIR";

/// Configuration assembled once at process start and handed to the runtime.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub mode: DeploymentMode,
    pub metadata_endpoint: MetadataEndpoint,
    pub public_dir: PathBuf,
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// Values from a local `.env` file (parsed via [`dotenvy::dotenv_override`]) override whatever
    /// is already set in the process environment, which makes local development workflows
    /// predictable. The deployment mode picks the metadata endpoint unless `METADATA_ENDPOINT`
    /// names one explicitly.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_env_overrides()?;

        let mode = DeploymentMode::detect();
        let port = resolve_port();

        let addr = env::var(BIND_ADDR_ENV)
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let bind_addr = SocketAddr::new(addr, port);

        let metadata_endpoint = env::var(METADATA_ENDPOINT_ENV)
            .ok()
            .map(|value| {
                MetadataEndpoint::from_str(&value)
                    .map_err(|_| ConfigError::InvalidMetadataEndpoint(value))
            })
            .transpose()?
            .unwrap_or_else(|| default_endpoint(mode, port));

        let public_dir = env::var(PUBLIC_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_PUBLIC_DIR));

        Ok(Self {
            bind_addr,
            mode,
            metadata_endpoint,
            public_dir,
        })
    }

    /// Returns a builder for programmatic overrides.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

impl Default for Config {
    /// Binds to `0.0.0.0:80` and targets the link-local task metadata endpoint.
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            mode: DeploymentMode::default(),
            metadata_endpoint: MetadataEndpoint::TaskV2,
            public_dir: PathBuf::from(DEFAULT_PUBLIC_DIR),
        }
    }
}

/// Builder type for [`Config`].
#[derive(Default, Clone, Debug)]
pub struct ConfigBuilder {
    bind_addr: Option<SocketAddr>,
    mode: Option<DeploymentMode>,
    metadata_endpoint: Option<MetadataEndpoint>,
    public_dir: Option<PathBuf>,
}

impl ConfigBuilder {
    /// Sets the listen address.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = Some(addr);
        self
    }

    /// Sets the deployment mode.
    pub fn mode(mut self, mode: DeploymentMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Sets the metadata endpoint, bypassing the mode-derived default.
    pub fn metadata_endpoint(mut self, endpoint: MetadataEndpoint) -> Self {
        self.metadata_endpoint = Some(endpoint);
        self
    }

    /// Sets the static asset directory.
    pub fn public_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.public_dir = Some(dir.into());
        self
    }

    /// Builds the final configuration.
    pub fn build(self) -> Config {
        let mode = self.mode.unwrap_or_default();
        let bind_addr = self
            .bind_addr
            .unwrap_or_else(|| SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT));
        let metadata_endpoint = self
            .metadata_endpoint
            .unwrap_or_else(|| default_endpoint(mode, bind_addr.port()));
        let public_dir = self
            .public_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PUBLIC_DIR));

        Config {
            bind_addr,
            mode,
            metadata_endpoint,
            public_dir,
        }
    }
}

/// Errors that can occur while building [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid metadata endpoint: {0}")]
    InvalidMetadataEndpoint(String),
    #[error("failed to load .env overrides: {0}")]
    Dotenv(#[from] DotenvError),
}

fn load_env_overrides() -> Result<(), ConfigError> {
    match dotenvy::dotenv_override() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(ConfigError::Dotenv(err)),
    }
}

fn resolve_port() -> u16 {
    env::var(PORT_ENV)
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}

fn default_endpoint(mode: DeploymentMode, port: u16) -> MetadataEndpoint {
    if mode.is_development() {
        MetadataEndpoint::LocalFixture { port }
    } else {
        MetadataEndpoint::TaskV2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    #[test]
    fn builder_overrides_defaults() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 8)), 9999);
        let config = Config::builder()
            .bind_addr(addr)
            .metadata_endpoint(MetadataEndpoint::Custom("http://127.0.0.1:7878/meta".into()))
            .public_dir("assets")
            .build();

        assert_eq!(config.bind_addr, addr);
        assert!(matches!(
            config.metadata_endpoint,
            MetadataEndpoint::Custom(_)
        ));
        assert_eq!(config.public_dir, PathBuf::from("assets"));
    }

    #[test]
    fn mode_switches_only_the_endpoint() {
        let development = Config::builder().mode(DeploymentMode::Development).build();
        let production = Config::builder().mode(DeploymentMode::Production).build();

        assert_eq!(
            development.metadata_endpoint,
            MetadataEndpoint::LocalFixture { port: DEFAULT_PORT }
        );
        assert_eq!(production.metadata_endpoint, MetadataEndpoint::TaskV2);
        assert_eq!(development.bind_addr, production.bind_addr);
        assert_eq!(development.public_dir, production.public_dir);
    }

    #[test]
    fn reads_env_configuration() {
        let _guard = env_lock().lock().unwrap();
        unsafe {
            env::set_var("PORT", "8080");
            env::set_var("NODE_ENV", "development");
            env::remove_var("METADATA_ENDPOINT");
            env::remove_var("BIND_ADDR");
        }

        let config = Config::from_env().expect("config");
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.mode.is_development());
        assert_eq!(
            config.metadata_endpoint,
            MetadataEndpoint::LocalFixture { port: 8080 }
        );

        unsafe {
            env::remove_var("PORT");
            env::remove_var("NODE_ENV");
        }
    }

    #[test]
    fn endpoint_override_wins() {
        let _guard = env_lock().lock().unwrap();
        unsafe {
            env::set_var("NODE_ENV", "development");
            env::set_var("METADATA_ENDPOINT", "http://127.0.0.1:9999/meta");
        }

        let config = Config::from_env().expect("config");
        assert_eq!(
            config.metadata_endpoint,
            MetadataEndpoint::Custom("http://127.0.0.1:9999/meta".into())
        );

        unsafe {
            env::remove_var("NODE_ENV");
            env::remove_var("METADATA_ENDPOINT");
        }
    }

    #[test]
    fn rejects_invalid_endpoint_override() {
        let _guard = env_lock().lock().unwrap();
        unsafe {
            env::set_var("METADATA_ENDPOINT", "not-an-endpoint");
        }

        let error = Config::from_env().expect_err("invalid endpoint");
        assert!(matches!(error, ConfigError::InvalidMetadataEndpoint(_)));

        unsafe {
            env::remove_var("METADATA_ENDPOINT");
        }
    }

    #[test]
    fn defaults_without_environment() {
        let _guard = env_lock().lock().unwrap();
        unsafe {
            env::remove_var("PORT");
            env::remove_var("NODE_ENV");
            env::remove_var("METADATA_ENDPOINT");
            env::remove_var("BIND_ADDR");
            env::remove_var("PUBLIC_DIR");
        }

        let config = Config::from_env().expect("config");
        assert_eq!(
            config.bind_addr,
            SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT)
        );
        assert_eq!(config.metadata_endpoint, MetadataEndpoint::TaskV2);
        assert_eq!(config.public_dir, PathBuf::from(DEFAULT_PUBLIC_DIR));
    }
}
