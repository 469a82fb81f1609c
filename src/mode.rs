use std::env;

const MODE_ENV: &str = "NODE_ENV";
const DEVELOPMENT: &str = "development";

/// Deployment mode the server runs under. The mode decides where the metadata
/// document is fetched from and nothing else.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeploymentMode {
    Development,
    #[default]
    Production,
}

impl DeploymentMode {
    /// Reads the mode from the environment. Only an exact `development` value
    /// opts into the local fixture; anything else, including unset, is
    /// production.
    pub fn detect() -> Self {
        Self::from_env_value(env::var(MODE_ENV).ok().as_deref())
    }

    fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(DEVELOPMENT) => Self::Development,
            _ => Self::Production,
        }
    }

    /// Indicates whether the server is in development mode.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}
