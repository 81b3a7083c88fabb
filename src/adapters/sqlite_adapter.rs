//! SQLite market data and indicator store.
//!
//! Decimals are stored as TEXT so values round-trip exactly. MACD components
//! are stored as JSON in `technical_indicators.metadata`.

use crate::domain::bar::{Bar, PriceQuote};
use crate::domain::config_validation::pool_size;
use crate::domain::error::TradeSignalError;
use crate::domain::indicator::{IndicatorMetadata, IndicatorPoint};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::indicator_port::IndicatorPort;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, params};
use rust_decimal::Decimal;

const DATE_FORMAT: &str = "%Y-%m-%d";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS market_data (
        symbol TEXT NOT NULL,
        trade_date TEXT NOT NULL,
        open TEXT NOT NULL,
        high TEXT NOT NULL,
        low TEXT NOT NULL,
        close TEXT NOT NULL,
        adjusted_close TEXT NOT NULL,
        volume INTEGER NOT NULL,
        PRIMARY KEY (symbol, trade_date)
    );
    CREATE INDEX IF NOT EXISTS idx_market_data_date ON market_data(trade_date);
    CREATE TABLE IF NOT EXISTS technical_indicators (
        symbol TEXT NOT NULL,
        trade_date TEXT NOT NULL,
        indicator_name TEXT NOT NULL,
        value TEXT NOT NULL,
        metadata TEXT,
        PRIMARY KEY (symbol, trade_date, indicator_name)
    );
    CREATE INDEX IF NOT EXISTS idx_indicators_lookup
        ON technical_indicators(symbol, indicator_name, trade_date);";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_error(e: r2d2::Error) -> TradeSignalError {
    TradeSignalError::Database {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> TradeSignalError {
    TradeSignalError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn conversion_error<E>(column: usize, ty: Type, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, ty, Box::new(e))
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| conversion_error(idx, Type::Text, e))
}

fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    raw.parse::<Decimal>()
        .map_err(|e| conversion_error(idx, Type::Text, e))
}

fn bar_from_row(row: &Row<'_>) -> rusqlite::Result<Bar> {
    let volume: i64 = row.get(7)?;
    Ok(Bar {
        symbol: row.get(0)?,
        date: date_column(row, 1)?,
        open: decimal_column(row, 2)?,
        high: decimal_column(row, 3)?,
        low: decimal_column(row, 4)?,
        close: decimal_column(row, 5)?,
        adjusted_close: decimal_column(row, 6)?,
        volume: u64::try_from(volume).map_err(|e| conversion_error(7, Type::Integer, e))?,
    })
}

fn point_from_row(row: &Row<'_>) -> rusqlite::Result<IndicatorPoint> {
    let metadata: Option<String> = row.get(4)?;
    let metadata = metadata
        .map(|raw| IndicatorMetadata::from_json(&raw))
        .transpose()
        .map_err(|e| conversion_error(4, Type::Text, e))?;
    Ok(IndicatorPoint {
        symbol: row.get(0)?,
        date: date_column(row, 1)?,
        name: row.get(2)?,
        value: decimal_column(row, 3)?,
        metadata,
    })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TradeSignalError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| TradeSignalError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;
        let size = pool_size(config)?;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(size)
            .build(manager)
            .map_err(pool_error)?;

        tracing::debug!(path = %db_path, pool_size = size, "opened sqlite store");
        Ok(Self { pool })
    }

    /// Single-connection pool; every pooled connection to `:memory:` would
    /// otherwise be a separate database.
    pub fn in_memory() -> Result<Self, TradeSignalError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_error)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, TradeSignalError> {
        self.pool.get().map_err(pool_error)
    }

    pub fn initialize_schema(&self) -> Result<(), TradeSignalError> {
        self.conn()?.execute_batch(SCHEMA).map_err(query_error)
    }

    /// Upserts on (symbol, trade_date). Returns the number of rows written.
    pub fn insert_bars(&self, bars: &[Bar]) -> Result<usize, TradeSignalError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;

        for bar in bars {
            let volume = i64::try_from(bar.volume).map_err(|_| TradeSignalError::DatabaseQuery {
                reason: format!("volume {} for {} out of range", bar.volume, bar.symbol),
            })?;
            tx.execute(
                "INSERT OR REPLACE INTO market_data
                    (symbol, trade_date, open, high, low, close, adjusted_close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    bar.symbol,
                    bar.date.format(DATE_FORMAT).to_string(),
                    bar.open.to_string(),
                    bar.high.to_string(),
                    bar.low.to_string(),
                    bar.close.to_string(),
                    bar.adjusted_close.to_string(),
                    volume
                ],
            )
            .map_err(query_error)?;
        }

        tx.commit().map_err(query_error)?;
        Ok(bars.len())
    }
}

impl DataPort for SqliteAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, TradeSignalError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol, trade_date, open, high, low, close, adjusted_close, volume
                 FROM market_data
                 WHERE symbol = ?1 AND trade_date >= ?2 AND trade_date <= ?3
                 ORDER BY trade_date ASC",
            )
            .map_err(query_error)?;

        let rows = stmt
            .query_map(
                params![
                    symbol,
                    start_date.format(DATE_FORMAT).to_string(),
                    end_date.format(DATE_FORMAT).to_string()
                ],
                bar_from_row,
            )
            .map_err(query_error)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_error)
    }

    fn latest_price(&self, symbol: &str) -> Result<Option<PriceQuote>, TradeSignalError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT trade_date, close FROM market_data
             WHERE symbol = ?1 ORDER BY trade_date DESC LIMIT 1",
            params![symbol],
            |row| {
                Ok(PriceQuote {
                    date: date_column(row, 0)?,
                    price: decimal_column(row, 1)?,
                })
            },
        )
        .optional()
        .map_err(query_error)
    }

    fn price_as_of(
        &self,
        symbol: &str,
        as_of: NaiveDate,
    ) -> Result<Option<PriceQuote>, TradeSignalError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT trade_date, close FROM market_data
             WHERE symbol = ?1 AND trade_date <= ?2
             ORDER BY trade_date DESC LIMIT 1",
            params![symbol, as_of.format(DATE_FORMAT).to_string()],
            |row| {
                Ok(PriceQuote {
                    date: date_column(row, 0)?,
                    price: decimal_column(row, 1)?,
                })
            },
        )
        .optional()
        .map_err(query_error)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TradeSignalError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT symbol FROM market_data ORDER BY symbol")
            .map_err(query_error)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(query_error)?;
        rows.collect::<Result<Vec<String>, _>>().map_err(query_error)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, TradeSignalError> {
        let conn = self.conn()?;
        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(trade_date), MAX(trade_date), COUNT(*)
                 FROM market_data WHERE symbol = ?1",
                params![symbol],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_error)?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => {
                let parse = |raw: &str| {
                    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| {
                        TradeSignalError::Database {
                            reason: e.to_string(),
                        }
                    })
                };
                Ok(Some((parse(&min_str)?, parse(&max_str)?, count as usize)))
            }
            _ => Ok(None),
        }
    }
}

impl IndicatorPort for SqliteAdapter {
    fn save_batch(&self, points: &[IndicatorPoint]) -> Result<(), TradeSignalError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;

        for point in points {
            let metadata = point
                .metadata
                .as_ref()
                .map(IndicatorMetadata::to_json)
                .transpose()
                .map_err(|e| TradeSignalError::DatabaseQuery {
                    reason: format!("failed to encode metadata for {}: {}", point.name, e),
                })?;
            tx.execute(
                "INSERT OR REPLACE INTO technical_indicators
                    (symbol, trade_date, indicator_name, value, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    point.symbol,
                    point.date.format(DATE_FORMAT).to_string(),
                    point.name,
                    point.value.to_string(),
                    metadata
                ],
            )
            .map_err(query_error)?;
        }

        tx.commit().map_err(query_error)
    }

    fn latest(&self, symbol: &str, name: &str) -> Result<Option<IndicatorPoint>, TradeSignalError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT symbol, trade_date, indicator_name, value, metadata
             FROM technical_indicators
             WHERE symbol = ?1 AND indicator_name = ?2
             ORDER BY trade_date DESC LIMIT 1",
            params![symbol, name],
            point_from_row,
        )
        .optional()
        .map_err(query_error)
    }

    fn latest_as_of(
        &self,
        symbol: &str,
        name: &str,
        as_of: NaiveDate,
    ) -> Result<Option<IndicatorPoint>, TradeSignalError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT symbol, trade_date, indicator_name, value, metadata
             FROM technical_indicators
             WHERE symbol = ?1 AND indicator_name = ?2 AND trade_date <= ?3
             ORDER BY trade_date DESC LIMIT 1",
            params![symbol, name, as_of.format(DATE_FORMAT).to_string()],
            point_from_row,
        )
        .optional()
        .map_err(query_error)
    }

    fn find_between(
        &self,
        symbol: &str,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<IndicatorPoint>, TradeSignalError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol, trade_date, indicator_name, value, metadata
                 FROM technical_indicators
                 WHERE symbol = ?1 AND indicator_name = ?2
                   AND trade_date >= ?3 AND trade_date <= ?4
                 ORDER BY trade_date ASC",
            )
            .map_err(query_error)?;
        let rows = stmt
            .query_map(
                params![
                    symbol,
                    name,
                    start_date.format(DATE_FORMAT).to_string(),
                    end_date.format(DATE_FORMAT).to_string()
                ],
                point_from_row,
            )
            .map_err(query_error)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_error)
    }

    fn delete_symbol(&self, symbol: &str) -> Result<usize, TradeSignalError> {
        self.conn()?
            .execute(
                "DELETE FROM technical_indicators WHERE symbol = ?1",
                params![symbol],
            )
            .map_err(query_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::MacdComponents;
    use rust_decimal_macros::dec;

    struct EmptyConfig;

    impl ConfigPort for EmptyConfig {
        fn get_string(&self, _section: &str, _key: &str) -> Option<String> {
            None
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
        fn get_double(&self, _section: &str, _key: &str, default: f64) -> f64 {
            default
        }
        fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
            default
        }
    }

    fn store() -> SqliteAdapter {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
        adapter
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn bar(symbol: &str, day: u32, close: Decimal) -> Bar {
        Bar {
            symbol: symbol.to_string(),
            date: d(day),
            open: close - dec!(0.5),
            high: close + dec!(1.25),
            low: close - dec!(1.125),
            close,
            adjusted_close: close - dec!(0.01),
            volume: 1_000 + day as u64,
        }
    }

    #[test]
    fn from_config_missing_path() {
        match SqliteAdapter::from_config(&EmptyConfig) {
            Err(TradeSignalError::ConfigMissing { section, key }) => {
                assert_eq!(section, "sqlite");
                assert_eq!(key, "path");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn schema_is_idempotent() {
        let adapter = store();
        adapter.initialize_schema().unwrap();
    }

    #[test]
    fn bars_round_trip_exactly() {
        let adapter = store();
        let bars = vec![bar("ULVR.L", 2, dec!(4012.345678)), bar("ULVR.L", 3, dec!(4020.1))];
        assert_eq!(adapter.insert_bars(&bars).unwrap(), 2);

        let fetched = adapter.fetch_bars("ULVR.L", d(1), d(31)).unwrap();
        assert_eq!(fetched, bars);
    }

    #[test]
    fn fetch_bars_filters_and_orders() {
        let adapter = store();
        adapter
            .insert_bars(&[bar("AZN.L", 5, dec!(3)), bar("AZN.L", 1, dec!(1)), bar("AZN.L", 3, dec!(2))])
            .unwrap();

        let fetched = adapter.fetch_bars("AZN.L", d(2), d(5)).unwrap();
        let dates: Vec<NaiveDate> = fetched.iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![d(3), d(5)]);
    }

    #[test]
    fn insert_bars_upserts() {
        let adapter = store();
        adapter.insert_bars(&[bar("AZN.L", 1, dec!(10))]).unwrap();
        adapter.insert_bars(&[bar("AZN.L", 1, dec!(11))]).unwrap();

        let fetched = adapter.fetch_bars("AZN.L", d(1), d(1)).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].close, dec!(11));
    }

    #[test]
    fn latest_price_is_most_recent_close() {
        let adapter = store();
        assert_eq!(adapter.latest_price("BARC.L").unwrap(), None);

        adapter
            .insert_bars(&[bar("BARC.L", 4, dec!(1.95)), bar("BARC.L", 9, dec!(2.05))])
            .unwrap();
        let quote = adapter.latest_price("BARC.L").unwrap().unwrap();
        assert_eq!(quote.date, d(9));
        assert_eq!(quote.price, dec!(2.05));
    }

    #[test]
    fn price_as_of_skips_later_bars() {
        let adapter = store();
        adapter
            .insert_bars(&[
                bar("BARC.L", 4, dec!(1.95)),
                bar("BARC.L", 6, dec!(2.01)),
                bar("BARC.L", 9, dec!(2.05)),
            ])
            .unwrap();

        let quote = adapter.price_as_of("BARC.L", d(8)).unwrap().unwrap();
        assert_eq!(quote.date, d(6));
        assert_eq!(quote.price, dec!(2.01));
        assert_eq!(adapter.price_as_of("BARC.L", d(9)).unwrap().unwrap().date, d(9));
        assert_eq!(adapter.price_as_of("BARC.L", d(3)).unwrap(), None);
    }

    #[test]
    fn list_symbols_and_range() {
        let adapter = store();
        adapter
            .insert_bars(&[
                bar("ULVR.L", 1, dec!(1)),
                bar("AZN.L", 1, dec!(1)),
                bar("AZN.L", 5, dec!(1)),
            ])
            .unwrap();

        assert_eq!(adapter.list_symbols().unwrap(), vec!["AZN.L", "ULVR.L"]);
        assert_eq!(
            adapter.get_data_range("AZN.L").unwrap(),
            Some((d(1), d(5), 2))
        );
        assert_eq!(adapter.get_data_range("NG.L").unwrap(), None);
    }

    #[test]
    fn indicator_points_round_trip_with_metadata() {
        let adapter = store();
        let components = MacdComponents {
            macd_line: dec!(1.234567),
            signal_line: dec!(1.5),
            histogram: dec!(-0.265433),
        };
        let points = vec![
            IndicatorPoint::new("ULVR.L", d(2), "SMA_20", dec!(4000.123456)),
            IndicatorPoint::new("ULVR.L", d(2), "MACD_12_26_9", dec!(-0.265433))
                .with_metadata(IndicatorMetadata::Macd(components)),
        ];
        adapter.save_batch(&points).unwrap();

        let sma = adapter.latest("ULVR.L", "SMA_20").unwrap().unwrap();
        assert_eq!(sma, points[0]);
        let macd = adapter.latest("ULVR.L", "MACD_12_26_9").unwrap().unwrap();
        assert_eq!(macd, points[1]);
    }

    #[test]
    fn latest_picks_most_recent_date() {
        let adapter = store();
        adapter
            .save_batch(&[
                IndicatorPoint::new("AZN.L", d(3), "RSI_14", dec!(55.5)),
                IndicatorPoint::new("AZN.L", d(10), "RSI_14", dec!(61.25)),
                IndicatorPoint::new("AZN.L", d(7), "RSI_14", dec!(58)),
            ])
            .unwrap();

        let latest = adapter.latest("AZN.L", "RSI_14").unwrap().unwrap();
        assert_eq!(latest.date, d(10));
        assert_eq!(latest.value, dec!(61.25));
        assert_eq!(adapter.latest("AZN.L", "RSI_7").unwrap(), None);
    }

    #[test]
    fn latest_as_of_ignores_newer_points() {
        let adapter = store();
        adapter
            .save_batch(&[
                IndicatorPoint::new("AZN.L", d(3), "RSI_14", dec!(55.5)),
                IndicatorPoint::new("AZN.L", d(10), "RSI_14", dec!(61.25)),
            ])
            .unwrap();

        let point = adapter.latest_as_of("AZN.L", "RSI_14", d(9)).unwrap().unwrap();
        assert_eq!(point.date, d(3));
        assert_eq!(point.value, dec!(55.5));
        assert_eq!(adapter.latest_as_of("AZN.L", "RSI_14", d(2)).unwrap(), None);
    }

    #[test]
    fn save_batch_overwrites_same_key() {
        let adapter = store();
        adapter
            .save_batch(&[IndicatorPoint::new("AZN.L", d(3), "SMA_20", dec!(1))])
            .unwrap();
        adapter
            .save_batch(&[IndicatorPoint::new("AZN.L", d(3), "SMA_20", dec!(2))])
            .unwrap();

        let all = adapter.find_between("AZN.L", "SMA_20", d(1), d(31)).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].value, dec!(2));
    }

    #[test]
    fn find_between_and_delete() {
        let adapter = store();
        adapter
            .save_batch(&[
                IndicatorPoint::new("AZN.L", d(1), "EMA_12", dec!(1)),
                IndicatorPoint::new("AZN.L", d(2), "EMA_12", dec!(2)),
                IndicatorPoint::new("AZN.L", d(3), "EMA_12", dec!(3)),
                IndicatorPoint::new("NG.L", d(2), "EMA_12", dec!(9)),
            ])
            .unwrap();

        let window = adapter.find_between("AZN.L", "EMA_12", d(2), d(3)).unwrap();
        assert_eq!(window.iter().map(|p| p.value).collect::<Vec<_>>(), vec![dec!(2), dec!(3)]);

        assert_eq!(adapter.delete_symbol("AZN.L").unwrap(), 3);
        assert!(adapter.find_between("AZN.L", "EMA_12", d(1), d(31)).unwrap().is_empty());
        assert_eq!(adapter.find_between("NG.L", "EMA_12", d(1), d(31)).unwrap().len(), 1);
    }
}
