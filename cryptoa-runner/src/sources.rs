//! Source chain assembly.
//!
//! Every symbol gets the primary client wrapped in the retry policy. Symbols
//! with a configured fallback route additionally get the secondary and
//! tertiary clients, attempted once each: their failures are provider-level
//! and do not improve on a second try.

use crate::config::AnalysisConfig;
use cryptoa_core::data::{
    AlphaVantageProvider, ChainLink, CoinGeckoProvider, DataProvider, SourceChain, YahooProvider,
};
use std::sync::Arc;
use tracing::debug;

/// The providers available to a run.
#[derive(Clone)]
pub struct SourceRegistry {
    primary: Arc<dyn DataProvider>,
    secondary: Option<Arc<dyn DataProvider>>,
    tertiary: Option<Arc<dyn DataProvider>>,
}

impl SourceRegistry {
    pub fn new(primary: Arc<dyn DataProvider>) -> Self {
        Self {
            primary,
            secondary: None,
            tertiary: None,
        }
    }

    pub fn with_secondary(mut self, provider: Arc<dyn DataProvider>) -> Self {
        self.secondary = Some(provider);
        self
    }

    pub fn with_tertiary(mut self, provider: Arc<dyn DataProvider>) -> Self {
        self.tertiary = Some(provider);
        self
    }

    /// Network-backed providers. Alpha Vantage is only registered when an API
    /// key is available.
    pub fn live(config: &AnalysisConfig) -> Self {
        let timeout = config.request_timeout();
        let mut registry = Self::new(Arc::new(YahooProvider::new(timeout)))
            .with_tertiary(Arc::new(CoinGeckoProvider::new(timeout)));

        match &config.alphavantage_api_key {
            Some(key) => {
                registry = registry.with_secondary(Arc::new(AlphaVantageProvider::new(
                    key.clone(),
                    timeout,
                )));
            }
            None => debug!("no Alpha Vantage API key, secondary client disabled"),
        }
        registry
    }

    /// Ordered chain for one symbol.
    pub fn chain_for(&self, symbol: &str, config: &AnalysisConfig) -> SourceChain {
        let mut chain = SourceChain::new(
            ChainLink::new(Arc::clone(&self.primary), symbol).with_retry(config.retry_policy()),
        );

        if let Some(route) = config.fallback_for(symbol) {
            if let (Some(provider), Some(remote)) = (&self.secondary, &route.alphavantage) {
                chain = chain.then(ChainLink::new(Arc::clone(provider), remote.as_str()));
            }
            if let (Some(provider), Some(remote)) = (&self.tertiary, &route.coingecko) {
                chain = chain.then(ChainLink::new(Arc::clone(provider), remote.as_str()));
            }
        }
        chain
    }
}
