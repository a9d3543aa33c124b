//! Postgres-backed rate store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ratebridge_common::{Currency, RateKey, RateRecord, StoreError};
use ratebridge_resolver::RateStore;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info, instrument};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS forex_rates (
    from_code   TEXT        NOT NULL,
    to_code     TEXT        NOT NULL,
    from_name   TEXT        NOT NULL,
    to_name     TEXT        NOT NULL,
    rate        NUMERIC     NOT NULL,
    bid         NUMERIC     NOT NULL,
    ask         NUMERIC     NOT NULL,
    observed_at TIMESTAMPTZ NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ,
    PRIMARY KEY (from_code, to_code)
)
"#;

const FIND: &str = r#"
SELECT from_code, from_name, to_code, to_name, rate, bid, ask,
       observed_at, created_at, updated_at
FROM forex_rates
WHERE from_code = $1 AND to_code = $2
"#;

const UPSERT: &str = r#"
INSERT INTO forex_rates
    (from_code, to_code, from_name, to_name, rate, bid, ask,
     observed_at, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
ON CONFLICT (from_code, to_code) DO UPDATE SET
    from_name   = EXCLUDED.from_name,
    to_name     = EXCLUDED.to_name,
    rate        = EXCLUDED.rate,
    bid         = EXCLUDED.bid,
    ask         = EXCLUDED.ask,
    observed_at = EXCLUDED.observed_at,
    created_at  = EXCLUDED.created_at,
    updated_at  = EXCLUDED.updated_at
"#;

/// One row of the forex_rates table.
#[derive(Debug, FromRow)]
struct RateRow {
    from_code: String,
    from_name: String,
    to_code: String,
    to_name: String,
    rate: Decimal,
    bid: Decimal,
    ask: Decimal,
    observed_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<RateRow> for RateRecord {
    fn from(row: RateRow) -> Self {
        Self {
            key: RateKey::new(Currency::new(row.from_code), Currency::new(row.to_code)),
            from_name: row.from_name,
            to_name: row.to_name,
            rate: row.rate,
            bid: row.bid,
            ask: row.ask,
            observed_at: row.observed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Durable store over a Postgres connection pool.
///
/// The upsert replaces the full row, so concurrent writers resolve to
/// last-write-wins, matching the in-memory backends.
pub struct PostgresRateStore {
    pool: PgPool,
}

impl PostgresRateStore {
    /// Connect a new pool to `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        info!("Connected to Postgres rate store");
        Ok(Self { pool })
    }

    /// Reuse an existing pool.
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the forex_rates table when it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        info!("Rate store schema is in place");
        Ok(())
    }
}

#[async_trait]
impl RateStore for PostgresRateStore {
    #[instrument(skip(self), fields(pair = %key))]
    async fn find(&self, key: &RateKey) -> Result<Option<RateRecord>, StoreError> {
        let row: Option<RateRow> = sqlx::query_as(FIND)
            .bind(key.from.code())
            .bind(key.to.code())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(RateRecord::from))
    }

    #[instrument(skip(self, record), fields(pair = %record.key))]
    async fn upsert(&self, record: RateRecord) -> Result<(), StoreError> {
        sqlx::query(UPSERT)
            .bind(record.key.from.code())
            .bind(record.key.to.code())
            .bind(&record.from_name)
            .bind(&record.to_name)
            .bind(record.rate)
            .bind(record.bid)
            .bind(record.ask)
            .bind(record.observed_at)
            .bind(record.created_at)
            .bind(record.updated_at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        debug!("Upserted rate row");
        Ok(())
    }
}

/// Connectivity and pool failures map to `Unavailable`; everything else,
/// decode errors included, is `Internal`.
fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        _ => StoreError::Internal(err.to_string()),
    }
}
