//! Data access port trait.
//!
//! The persistent store behind this seam (files, database, network) is not
//! the engine's concern; the core only needs ticker → ordered bar sequence.

use crate::domain::bar::Bar;
use crate::domain::error::PullbackError;

pub trait DataPort {
    /// Ordered bar sequence for one ticker, oldest first.
    fn fetch_bars(&self, ticker: &str) -> Result<Vec<Bar>, PullbackError>;

    /// All tickers the store can serve.
    fn list_tickers(&self) -> Result<Vec<String>, PullbackError>;
}
