use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Invalid server address {addr}: {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Environment variable that sets a dotted configuration key,
/// e.g. `provider.api_key` → `FILING_PROVIDER__API_KEY`
pub fn to_env_var(field_path: &str) -> String {
    format!("FILING_{}", field_path.to_uppercase().replace('.', "__"))
}
