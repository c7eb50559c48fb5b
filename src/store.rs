//! Durable, append-only observation log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, Pool, Sqlite};
use std::str::FromStr;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::models::Observation;
use crate::utils::error::{AppError, Result};

#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// Appends unconditionally and returns the new row id.
    async fn record(&self, observation: &Observation) -> Result<i64>;

    /// Price of the most recently recorded observation for `name` that has one.
    async fn last_price(&self, name: &str) -> Result<Option<Decimal>>;

    /// Every observation for `name`, in insertion order.
    async fn observations(&self, name: &str) -> Result<Vec<Observation>>;
}

/// Prices are stored as decimal text so they read back exactly.
#[derive(FromRow)]
struct ObservationRow {
    timestamp: DateTime<Utc>,
    name: String,
    url: String,
    price: Option<String>,
    currency: String,
    success: bool,
    note: String,
}

impl TryFrom<ObservationRow> for Observation {
    type Error = AppError;

    fn try_from(row: ObservationRow) -> Result<Self> {
        Ok(Observation {
            timestamp: row.timestamp,
            name: row.name,
            url: row.url,
            price: row.price.as_deref().map(parse_stored_price).transpose()?,
            currency: row.currency,
            success: row.success,
            note: row.note,
        })
    }
}

fn parse_stored_price(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw).map_err(|e| AppError::Parse {
        message: format!("stored price '{}': {}", raw, e),
    })
}

pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database and ensures the schema.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS observations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                name TEXT NOT NULL,
                url TEXT NOT NULL,
                price TEXT,
                currency TEXT NOT NULL,
                success BOOLEAN NOT NULL,
                note TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_observations_name_id ON observations(name, id)")
            .execute(&pool)
            .await?;

        info!("Observation store ready at {}", config.url);
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
        debug!("Observation store closed");
    }
}

#[async_trait]
impl ObservationStore for SqliteStore {
    async fn record(&self, observation: &Observation) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO observations (timestamp, name, url, price, currency, success, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(observation.timestamp)
        .bind(&observation.name)
        .bind(&observation.url)
        .bind(observation.price.map(|p| p.to_string()))
        .bind(&observation.currency)
        .bind(observation.success)
        .bind(&observation.note)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn last_price(&self, name: &str) -> Result<Option<Decimal>> {
        let price: Option<String> = sqlx::query_scalar(
            "SELECT price FROM observations
             WHERE name = ?1 AND price IS NOT NULL
             ORDER BY id DESC LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        price.as_deref().map(parse_stored_price).transpose()
    }

    async fn observations(&self, name: &str) -> Result<Vec<Observation>> {
        let rows: Vec<ObservationRow> = sqlx::query_as(
            "SELECT timestamp, name, url, price, currency, success, note
             FROM observations WHERE name = ?1 ORDER BY id",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Observation::try_from).collect()
    }
}
