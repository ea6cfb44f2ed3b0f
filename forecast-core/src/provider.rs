use crate::{
    Config, Coordinates, WeatherReport, error::FetchError, provider::weatherbit::WeatherbitProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod weatherbit;

/// A source of current conditions plus a daily forecast for a position.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch(&self, at: Coordinates) -> Result<WeatherReport, FetchError>;
}

/// Construct the Weatherbit provider from config. Fails when no API key is available.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.api_key()?;

    Ok(Box::new(WeatherbitProvider::with_base_url(
        api_key,
        config.provider.base_url.clone(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_reported() {
        let cfg = Config::default();
        let err = cfg.resolve_api_key(None).unwrap_err();
        assert!(err.to_string().contains("No Weatherbit API key configured"));
    }

    #[test]
    fn provider_from_config_works_with_stored_key() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".to_string());

        let provider = provider_from_config(&cfg);
        assert!(provider.is_ok());
    }
}
