//! SQLite storage adapter for the position book and equity history.

use crate::domain::accountant::EquitySnapshot;
use crate::domain::book::PositionBook;
use crate::domain::error::MomtraderError;
use crate::domain::position::Position;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::{BookStore, EquityLog};
use chrono::NaiveDateTime;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DEFAULT_SQLITE_PATH: &str = "momtrader.db";

fn storage_err(e: impl std::fmt::Display) -> MomtraderError {
    MomtraderError::Storage {
        reason: e.to_string(),
    }
}

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, MomtraderError> {
        let db_path = config
            .get_string("storage", "sqlite_path")
            .unwrap_or_else(|| DEFAULT_SQLITE_PATH.to_string());
        let pool_size = config.get_int("storage", "pool_size", 2).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(storage_err)?;

        let store = Self { pool };
        store.initialize_schema()?;
        log::debug!("sqlite store ready at {db_path}");
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, MomtraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(storage_err)?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, MomtraderError> {
        self.pool.get().map_err(storage_err)
    }

    pub fn initialize_schema(&self) -> Result<(), MomtraderError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS positions (
                    ticker TEXT PRIMARY KEY,
                    shares INTEGER NOT NULL,
                    avg_cost REAL NOT NULL,
                    adds INTEGER NOT NULL DEFAULT 0
                );
                CREATE TABLE IF NOT EXISTS equity_history (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    timestamp TEXT NOT NULL,
                    equity REAL NOT NULL
                );",
            )
            .map_err(storage_err)
    }
}

impl BookStore for SqliteStore {
    fn load(&self) -> Result<PositionBook, MomtraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT ticker, shares, avg_cost, adds FROM positions ORDER BY ticker")
            .map_err(storage_err)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(Position {
                    ticker: row.get(0)?,
                    shares: row.get(1)?,
                    avg_cost: row.get(2)?,
                    adds: row.get(3)?,
                })
            })
            .map_err(storage_err)?;

        let mut positions = Vec::new();
        for row in rows {
            positions.push(row.map_err(storage_err)?);
        }
        Ok(PositionBook::from_positions(positions))
    }

    fn save(&self, book: &PositionBook) -> Result<(), MomtraderError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(storage_err)?;

        tx.execute("DELETE FROM positions", [])
            .map_err(storage_err)?;
        for position in book.sorted_positions() {
            tx.execute(
                "INSERT INTO positions (ticker, shares, avg_cost, adds) VALUES (?1, ?2, ?3, ?4)",
                params![
                    position.ticker,
                    position.shares,
                    position.avg_cost,
                    position.adds
                ],
            )
            .map_err(storage_err)?;
        }

        tx.commit().map_err(storage_err)
    }
}

impl EquityLog for SqliteStore {
    fn append(&self, snapshot: &EquitySnapshot) -> Result<(), MomtraderError> {
        self.conn()?
            .execute(
                "INSERT INTO equity_history (timestamp, equity) VALUES (?1, ?2)",
                params![
                    snapshot.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    snapshot.total_equity
                ],
            )
            .map_err(storage_err)?;
        Ok(())
    }

    fn history(&self) -> Result<Vec<EquitySnapshot>, MomtraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT timestamp, equity FROM equity_history ORDER BY id ASC")
            .map_err(storage_err)?;

        let rows = stmt
            .query_map([], |row| {
                let ts: String = row.get(0)?;
                let timestamp = NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        ts.len(),
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(EquitySnapshot {
                    timestamp,
                    total_equity: row.get(1)?,
                })
            })
            .map_err(storage_err)?;

        let mut history = Vec::new();
        for row in rows {
            history.push(row.map_err(storage_err)?);
        }
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn position(ticker: &str, shares: i64, avg_cost: f64, adds: u32) -> Position {
        Position {
            ticker: ticker.to_string(),
            shares,
            avg_cost,
            adds,
        }
    }

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(16, 5, 0)
            .unwrap()
    }

    #[test]
    fn empty_store_loads_empty_book() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.load().unwrap().is_empty());
        assert!(store.history().unwrap().is_empty());
    }

    #[test]
    fn save_replaces_book() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .save(&PositionBook::from_positions(vec![
                position("TCS.NS", 20, 247.5, 0),
                position("INFY.NS", 36, 268.33, 1),
            ]))
            .unwrap();
        store
            .save(&PositionBook::from_positions(vec![position(
                "INFY.NS", 36, 268.33, 1,
            )]))
            .unwrap();

        let book = store.load().unwrap();
        assert_eq!(book.tickers(), vec!["INFY.NS"]);
        assert_eq!(book.get_position("INFY.NS"), Some(&position("INFY.NS", 36, 268.33, 1)));
    }

    #[test]
    fn equity_history_is_append_only_in_order() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .append(&EquitySnapshot {
                timestamp: at(7),
                total_equity: 50_000.0,
            })
            .unwrap();
        store
            .append(&EquitySnapshot {
                timestamp: at(14),
                total_equity: 51_250.5,
            })
            .unwrap();

        let history = store.history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].timestamp, at(7));
        assert_eq!(history[1].total_equity, 51_250.5);
    }
}
