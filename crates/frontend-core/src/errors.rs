/// Configuration errors raised while reading the process environment
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a port number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be an IP address, got {value:?}")]
    InvalidAddress { var: &'static str, value: String },
}
