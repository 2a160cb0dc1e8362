use core_config::{ConfigError, FromEnv, env_parse_or_default};

const DEFAULT_HEALTH_PORT: u16 = 3001;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    pub health_port: u16,
}

impl FromEnv for WorkerSettings {
    /// `HEALTH_PORT` wins over `PORT`.
    fn from_env() -> Result<Self, ConfigError> {
        let key = if std::env::var("HEALTH_PORT").is_ok() {
            "HEALTH_PORT"
        } else {
            "PORT"
        };

        Ok(Self {
            health_port: env_parse_or_default(key, DEFAULT_HEALTH_PORT)?,
        })
    }
}
