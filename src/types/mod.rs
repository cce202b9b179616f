//! Resource records returned by the API. Plain data with no behavior.

mod account;
mod crypto;
mod history;
mod market;
mod position;

pub use account::{Account, CryptoAccount};
pub use crypto::{AssetCurrency, CryptoCurrencyPair, CryptoHolding, CryptoQuote, CostBasis, QuoteCurrency};
pub use history::{ChartLine, ChartPoint, ChartSegment, DisplaySpan, PortfolioHistory};
pub use market::{Instrument, Quote};
pub use position::Position;
