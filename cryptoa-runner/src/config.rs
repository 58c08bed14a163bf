//! Serializable analysis configuration.
//!
//! Everything the external caller chooses (symbols, window, retry knobs,
//! reporting threshold) arrives through [`AnalysisConfig`]; nothing deeper in
//! the pipeline reads ambient state. Every field has a default so a TOML
//! file only needs to name what it changes.

use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;
use cryptoa_core::data::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Environment variable consulted when no Alpha Vantage key is configured.
pub const ALPHAVANTAGE_KEY_ENV: &str = "ALPHAVANTAGE_API_KEY";

/// Assets offered by default.
pub const DEFAULT_UNIVERSE: [&str; 7] = ["BTC-USD", "ETH-USD", "TSLA", "SPY", "GLD", "MSTR", "COIN"];

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no symbols selected: please select at least one asset")]
    NoSymbols,

    #[error("start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid lookback {0:?}: expected a day count such as 7d, 30d, 180d or 365d")]
    InvalidLookback(String),

    #[error("max_attempts must be at least 1")]
    InvalidMaxAttempts,

    #[error("low_correlation_threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("unknown timezone {0:?}")]
    InvalidTimezone(String),

    #[error("{0} must be at least 1")]
    NotPositive(&'static str),
}

/// Trailing window length in days, written `365d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Lookback(u32);

impl Lookback {
    /// Presets offered to the user.
    pub const PRESETS: [Lookback; 4] = [Lookback(7), Lookback(30), Lookback(180), Lookback(365)];

    pub fn days(self) -> u32 {
        self.0
    }

    /// Inclusive window ending at `end`. `None` when the start would fall
    /// before the earliest representable date.
    pub fn start_for(self, end: NaiveDate) -> Option<NaiveDate> {
        end.checked_sub_signed(Duration::days(i64::from(self.0) - 1))
    }
}

impl Default for Lookback {
    fn default() -> Self {
        Lookback(365)
    }
}

impl FromStr for Lookback {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().strip_suffix('d').unwrap_or(s.trim());
        match digits.parse::<u32>() {
            Ok(days) if days >= 1 => Ok(Lookback(days)),
            _ => Err(ConfigError::InvalidLookback(s.to_string())),
        }
    }
}

impl TryFrom<String> for Lookback {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Lookback> for String {
    fn from(value: Lookback) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.0)
    }
}

/// Alternate identifiers for a symbol whose primary coverage is unreliable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRoute {
    pub symbol: String,
    /// Alpha Vantage digital-currency code (`BTC`).
    #[serde(default)]
    pub alphavantage: Option<String>,
    /// CoinGecko coin id (`bitcoin`).
    #[serde(default)]
    pub coingecko: Option<String>,
}

/// Configuration for one analysis run.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Selected symbols, in display order.
    pub symbols: Vec<String>,
    /// Explicit window start. Derived from `lookback` when absent.
    pub start_date: Option<NaiveDate>,
    /// Window end. Today in the reporting timezone when absent.
    pub end_date: Option<NaiveDate>,
    pub lookback: Lookback,
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
    pub low_correlation_threshold: f64,
    pub request_timeout_secs: u64,
    /// IANA zone the last-updated stamp is rendered in.
    pub timezone: String,
    /// Symbols fetched concurrently. 1 keeps the run strictly sequential.
    pub parallelism: usize,
    /// Pairs whose overlap is always reported when both are selected.
    pub focus_pairs: Vec<[String; 2]>,
    pub fallbacks: Vec<FallbackRoute>,
    #[serde(skip_serializing)]
    pub alphavantage_api_key: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["BTC-USD".into(), "ETH-USD".into()],
            start_date: None,
            end_date: None,
            lookback: Lookback::default(),
            max_attempts: 3,
            retry_delay_secs: 5,
            low_correlation_threshold: 0.3,
            request_timeout_secs: 10,
            timezone: "Asia/Taipei".into(),
            parallelism: 1,
            focus_pairs: vec![["BTC-USD".into(), "MSTR".into()]],
            fallbacks: vec![FallbackRoute {
                symbol: "BTC-USD".into(),
                alphavantage: Some("BTC".into()),
                coingecko: Some("bitcoin".into()),
            }],
            alphavantage_api_key: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("symbols", &self.symbols)
            .field("start_date", &self.start_date)
            .field("end_date", &self.end_date)
            .field("lookback", &self.lookback)
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay_secs", &self.retry_delay_secs)
            .field("low_correlation_threshold", &self.low_correlation_threshold)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("timezone", &self.timezone)
            .field("parallelism", &self.parallelism)
            .field("focus_pairs", &self.focus_pairs)
            .field("fallbacks", &self.fallbacks)
            .field(
                "alphavantage_api_key",
                &self.alphavantage_api_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl AnalysisConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Fill the Alpha Vantage key from the environment if none is configured.
    pub fn with_env_api_key(mut self) -> Self {
        if self.alphavantage_api_key.is_none() {
            self.alphavantage_api_key = std::env::var(ALPHAVANTAGE_KEY_ENV)
                .ok()
                .filter(|k| !k.trim().is_empty());
        }
        self
    }

    /// Selected symbols, trimmed, blanks dropped, first occurrence kept.
    pub fn selected_symbols(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.symbols
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .filter(|s| seen.insert(*s))
            .map(str::to_string)
            .collect()
    }

    pub fn is_selected(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s.trim() == symbol)
    }

    pub fn fallback_for(&self, symbol: &str) -> Option<&FallbackRoute> {
        self.fallbacks.iter().find(|r| r.symbol == symbol)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            std::time::Duration::from_secs(self.retry_delay_secs),
        )
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))
    }

    /// Resolve the inclusive `[start, end]` window given today's date.
    pub fn date_range(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), ConfigError> {
        let end = self.end_date.unwrap_or(today);
        let start = match self.start_date {
            Some(start) => start,
            None => self
                .lookback
                .start_for(end)
                .ok_or_else(|| ConfigError::InvalidLookback(self.lookback.to_string()))?,
        };
        if start > end {
            return Err(ConfigError::InvalidDateRange { start, end });
        }
        Ok((start, end))
    }

    /// Check every constraint that does not depend on the current date.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.selected_symbols().is_empty() {
            return Err(ConfigError::NoSymbols);
        }
        if self.max_attempts < 1 {
            return Err(ConfigError::InvalidMaxAttempts);
        }
        let t = self.low_correlation_threshold;
        if !(0.0..=1.0).contains(&t) {
            return Err(ConfigError::InvalidThreshold(t));
        }
        if self.parallelism < 1 {
            return Err(ConfigError::NotPositive("parallelism"));
        }
        if self.request_timeout_secs < 1 {
            return Err(ConfigError::NotPositive("request_timeout_secs"));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(ConfigError::InvalidDateRange { start, end });
            }
        }
        self.tz()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn defaults_validate() {
        let config = AnalysisConfig::default();
        config.validate().unwrap();
        assert_eq!(config.retry_policy().max_attempts, 3);
        assert_eq!(config.retry_policy().delay.as_secs(), 5);
        assert_eq!(config.fallback_for("BTC-USD").unwrap().coingecko.as_deref(), Some("bitcoin"));
    }

    #[test]
    fn parses_partial_toml() {
        let config = AnalysisConfig::from_toml(
            r#"
            symbols = ["SPY", "GLD"]
            lookback = "30d"
            low_correlation_threshold = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.symbols, vec!["SPY", "GLD"]);
        assert_eq!(config.lookback.days(), 30);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.timezone, "Asia/Taipei");
    }

    #[test]
    fn parses_fallback_routes() {
        let config = AnalysisConfig::from_toml(
            r#"
            symbols = ["ETH-USD"]

            [[fallbacks]]
            symbol = "ETH-USD"
            coingecko = "ethereum"
            "#,
        )
        .unwrap();
        let route = config.fallback_for("ETH-USD").unwrap();
        assert_eq!(route.alphavantage, None);
        assert_eq!(route.coingecko.as_deref(), Some("ethereum"));
        assert!(config.fallback_for("BTC-USD").is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            AnalysisConfig::from_toml("symbolz = [\"SPY\"]"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn lookback_derives_start() {
        let config = AnalysisConfig {
            end_date: Some(d("2024-12-31")),
            lookback: "7d".parse().unwrap(),
            ..AnalysisConfig::default()
        };
        assert_eq!(
            config.date_range(d("2025-06-01")).unwrap(),
            (d("2024-12-25"), d("2024-12-31"))
        );
    }

    #[test]
    fn oversized_lookback_is_an_error_not_a_panic() {
        let config = AnalysisConfig {
            lookback: "100000000d".parse().unwrap(),
            ..AnalysisConfig::default()
        };
        config.validate().unwrap();
        assert!(matches!(
            config.date_range(d("2026-10-19")),
            Err(ConfigError::InvalidLookback(ref s)) if s == "100000000d"
        ));
    }

    #[test]
    fn explicit_start_ignores_oversized_lookback() {
        let config = AnalysisConfig {
            start_date: Some(d("2024-01-01")),
            lookback: "100000000d".parse().unwrap(),
            ..AnalysisConfig::default()
        };
        assert_eq!(
            config.date_range(d("2024-02-01")).unwrap(),
            (d("2024-01-01"), d("2024-02-01"))
        );
    }

    #[test]
    fn end_defaults_to_today() {
        let config = AnalysisConfig {
            lookback: "1d".parse().unwrap(),
            ..AnalysisConfig::default()
        };
        let today = d("2024-03-01");
        assert_eq!(config.date_range(today).unwrap(), (today, today));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let config = AnalysisConfig {
            start_date: Some(d("2024-02-01")),
            end_date: Some(d("2024-01-01")),
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn empty_selection_is_rejected() {
        let config = AnalysisConfig {
            symbols: vec!["  ".into()],
            ..AnalysisConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("select at least one asset"));
    }

    #[test]
    fn bad_threshold_and_timezone_are_rejected() {
        let config = AnalysisConfig {
            low_correlation_threshold: 1.5,
            ..AnalysisConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidThreshold(_))));

        let config = AnalysisConfig {
            timezone: "Mars/Olympus".into(),
            ..AnalysisConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTimezone(_))));
    }

    #[test]
    fn selected_symbols_dedup_in_order() {
        let config = AnalysisConfig {
            symbols: vec!["SPY".into(), " GLD ".into(), "SPY".into(), "".into()],
            ..AnalysisConfig::default()
        };
        assert_eq!(config.selected_symbols(), vec!["SPY", "GLD"]);
    }

    #[test]
    fn lookback_round_trips_through_strings() {
        for preset in Lookback::PRESETS {
            let parsed: Lookback = preset.to_string().parse().unwrap();
            assert_eq!(parsed, preset);
        }
        assert!("0d".parse::<Lookback>().is_err());
        assert!("week".parse::<Lookback>().is_err());
        assert_eq!("90".parse::<Lookback>().unwrap().days(), 90);
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AnalysisConfig {
            alphavantage_api_key: Some("secret-key".into()),
            ..AnalysisConfig::default()
        };
        assert!(!format!("{config:?}").contains("secret-key"));
    }
}
