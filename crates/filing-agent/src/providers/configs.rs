/// Default request timeout for reasoning calls, in seconds
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 120;

// Unified enum to wrap different provider configurations
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    Google(GoogleProviderConfig),
}

#[derive(Debug, Clone)]
pub struct GoogleProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
    pub timeout_secs: u64,
}
