use super::{base::Provider, configs::ProviderConfig, google::GoogleProvider};
use anyhow::Result;
use std::sync::Arc;

pub fn get_provider(config: ProviderConfig) -> Result<Arc<dyn Provider>> {
    match config {
        ProviderConfig::Google(google_config) => Ok(Arc::new(GoogleProvider::new(google_config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::configs::GoogleProviderConfig;

    #[test]
    fn test_builds_google_provider() {
        let google = ProviderConfig::Google(GoogleProviderConfig {
            host: "http://localhost".to_string(),
            api_key: "key".to_string(),
            model: "gemini-2.5-pro".to_string(),
            temperature: Some(0.0),
            max_tokens: Some(1024),
            timeout_secs: 5,
        });

        assert!(get_provider(google).is_ok());
    }
}
