use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] edgex_health_core::ConfigError),

    #[error("failed to initialise logging: {0}")]
    Logging(String),

    #[error("consul health query failed: {0}")]
    Consul(#[from] edgex_health_core::RequestError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Consul(_) => 5,
            Self::Logging(_) => 6,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
