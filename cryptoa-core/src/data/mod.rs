//! Data acquisition and reconciliation.

pub mod align;
pub mod alphavantage;
pub mod coingecko;
pub mod fallback;
mod http;
pub mod provider;
pub mod retry;
pub mod returns;
pub mod yahoo;

pub use align::{align_series, AlignedColumn, AlignedPriceTable, CellOrigin};
pub use alphavantage::AlphaVantageProvider;
pub use coingecko::CoinGeckoProvider;
pub use fallback::{resolve, ChainLink, FetchOutcome, Resolution, SourceChain, SourceFailure};
pub use provider::{DataError, DataProvider, DataSource, ErrorKind, PricePoint, PriceSeries};
pub use retry::{RetryFailure, RetryPolicy};
pub use returns::ReturnTable;
pub use yahoo::YahooProvider;
