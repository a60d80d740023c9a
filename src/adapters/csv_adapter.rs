//! CSV file data adapter.
//!
//! One file per ticker under a base directory, named `TICKER.csv`, with a
//! `date,open,high,low,close,volume` header. Bars are sorted by date after
//! parsing; structural integrity is checked downstream by `validate_bars`.

use crate::domain::bar::Bar;
use crate::domain::error::PullbackError;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self, ticker: &str) -> Result<Vec<Bar>, PullbackError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path).map_err(|e| PullbackError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| PullbackError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(0).ok_or_else(|| PullbackError::Data {
                reason: "missing date column".into(),
            })?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                PullbackError::Data {
                    reason: format!("invalid date format: {}", e),
                }
            })?;

            let open: f64 = record
                .get(1)
                .ok_or_else(|| PullbackError::Data {
                    reason: "missing open column".into(),
                })?
                .parse()
                .map_err(|e| PullbackError::Data {
                    reason: format!("invalid open value: {}", e),
                })?;

            let high: f64 = record
                .get(2)
                .ok_or_else(|| PullbackError::Data {
                    reason: "missing high column".into(),
                })?
                .parse()
                .map_err(|e| PullbackError::Data {
                    reason: format!("invalid high value: {}", e),
                })?;

            let low: f64 = record
                .get(3)
                .ok_or_else(|| PullbackError::Data {
                    reason: "missing low column".into(),
                })?
                .parse()
                .map_err(|e| PullbackError::Data {
                    reason: format!("invalid low value: {}", e),
                })?;

            let close: f64 = record
                .get(4)
                .ok_or_else(|| PullbackError::Data {
                    reason: "missing close column".into(),
                })?
                .parse()
                .map_err(|e| PullbackError::Data {
                    reason: format!("invalid close value: {}", e),
                })?;

            let volume: i64 = record
                .get(5)
                .ok_or_else(|| PullbackError::Data {
                    reason: "missing volume column".into(),
                })?
                .parse()
                .map_err(|e| PullbackError::Data {
                    reason: format!("invalid volume value: {}", e),
                })?;

            bars.push(Bar {
                ticker: ticker.to_string(),
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn list_tickers(&self) -> Result<Vec<String>, PullbackError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| PullbackError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut tickers = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| PullbackError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(ticker) = name_str.strip_suffix(".csv") {
                tickers.push(ticker.to_string());
            }
        }

        tickers.sort();
        Ok(tickers)
    }
}
