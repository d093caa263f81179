use crate::api::Store;
use crate::models::{CompanyProfile, PriceRecord, PriceRow, RateRecord, RateRow};
use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use deadpool_postgres::{Client, Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use std::time::Duration;
use tokio_postgres::NoTls;
use tracing::{debug, trace};

////////////////////////////////////////////////////////////////////////////////////////////////////
//
// Queries
//
////////////////////////////////////////////////////////////////////////////////////////////////////

static SCHEMA: &str = include_str!("../sql/schema.sql");

pub static FX_UPSERT_QUERY: &str = "
    INSERT INTO foreign_exchange (id, currency_code, buying_rate, selling_rate, middle_rate, created_at, date)
    VALUES ($1, $2, $3::FLOAT8, $4::FLOAT8, $5::FLOAT8, $6, $7)
    ON CONFLICT (currency_code, date) DO UPDATE SET
        buying_rate = EXCLUDED.buying_rate,
        selling_rate = EXCLUDED.selling_rate,
        middle_rate = EXCLUDED.middle_rate,
        created_at = EXCLUDED.created_at
";

pub static FX_RANGE_QUERY: &str = "
    SELECT
        date,
        middle_rate::FLOAT8 AS middle_rate
    FROM foreign_exchange
    WHERE currency_code = $1
      AND date BETWEEN $2 AND $3
      AND middle_rate IS NOT NULL
    ORDER BY date
";

pub static PRICE_UPSERT_QUERY: &str = "
    INSERT INTO stock_prices (stock_code, price_date, closing_price, source_url, extracted_at)
    VALUES ($1, $2, $3::FLOAT8, $4, $5)
    ON CONFLICT (stock_code, price_date) DO UPDATE SET
        closing_price = EXCLUDED.closing_price,
        source_url = EXCLUDED.source_url,
        extracted_at = EXCLUDED.extracted_at
";

pub static PROFILE_UPSERT_QUERY: &str = "
    INSERT INTO companies (stock_code, company_name, country_code, sector, subsector, listing_date, profile_source_url, last_scraped_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
    ON CONFLICT (stock_code) DO UPDATE SET
        company_name = EXCLUDED.company_name,
        country_code = EXCLUDED.country_code,
        sector = EXCLUDED.sector,
        subsector = EXCLUDED.subsector,
        listing_date = EXCLUDED.listing_date,
        profile_source_url = EXCLUDED.profile_source_url,
        last_scraped_at = NOW(),
        updated_at = NOW()
";

pub static PRICE_RANGE_QUERY: &str = "
    SELECT
        p.price_date,
        p.closing_price::FLOAT8 AS closing_price,
        c.company_name,
        p.stock_code
    FROM stock_prices p
    JOIN companies c ON c.stock_code = p.stock_code
    WHERE p.stock_code = $1
      AND p.price_date BETWEEN $2 AND $3
    ORDER BY p.price_date
";

const PING_TIMEOUT: Duration = Duration::from_secs(10);

////////////////////////////////////////////////////////////////////////////////////////////////////
//
// PostgreSQL gateway
//
////////////////////////////////////////////////////////////////////////////////////////////////////

/// [`Store`] over a pooled PostgreSQL connection, shared by every task.
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    /// Build the pool; no connection is opened until the first query (see [`Store::ping`]).
    pub fn connect(db_url: &str) -> anyhow::Result<Self> {
        let mut cfg = Config::new();
        cfg.url = Some(db_url.to_string());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .context("failed to create PostgreSQL pool")?;
        Ok(Self { pool })
    }

    async fn client(&self) -> anyhow::Result<Client> {
        self.pool
            .get()
            .await
            .context("failed to get connection from pool")
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> anyhow::Result<()> {
        let ping = async {
            let client = self.client().await?;
            client.simple_query("SELECT 1").await?;
            anyhow::Ok(())
        };
        tokio::time::timeout(PING_TIMEOUT, ping)
            .await
            .context("timed out connecting to PostgreSQL")??;
        debug!("PostgreSQL connection established");
        Ok(())
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        let client = self.client().await?;
        client
            .batch_execute(SCHEMA)
            .await
            .context("failed to apply schema")?;
        debug!("schema applied");
        Ok(())
    }

    async fn upsert_foreign_exchange(&self, record: &RateRecord) -> anyhow::Result<()> {
        let client = self.client().await?;
        let query = client.prepare_cached(FX_UPSERT_QUERY).await?;
        client
            .execute(
                &query,
                &[
                    &record.id,
                    &record.currency_code,
                    &record.buying_rate,
                    &record.selling_rate,
                    &record.middle_rate,
                    &record.captured_at,
                    &record.date,
                ],
            )
            .await?;
        trace!("upserted fx rate [{}, {}]", record.currency_code, record.date);
        Ok(())
    }

    async fn select_rates_by_code_and_range(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<RateRow>> {
        let client = self.client().await?;
        let query = client.prepare_cached(FX_RANGE_QUERY).await?;
        let rows = client.query(&query, &[&code, &start, &end]).await?;
        rows.iter()
            .map(|row| {
                Ok(RateRow {
                    date: row.try_get("date")?,
                    middle_rate: row.try_get("middle_rate")?,
                })
            })
            .collect()
    }

    async fn upsert_stock_price(&self, record: &PriceRecord) -> anyhow::Result<()> {
        let client = self.client().await?;
        let query = client.prepare_cached(PRICE_UPSERT_QUERY).await?;
        client
            .execute(
                &query,
                &[
                    &record.stock_code,
                    &record.price_date,
                    &record.closing_price,
                    &record.source_url,
                    &record.extracted_at,
                ],
            )
            .await?;
        trace!("upserted stock price [{}, {}]", record.stock_code, record.price_date);
        Ok(())
    }

    async fn upsert_company_profile(&self, profile: &CompanyProfile) -> anyhow::Result<()> {
        let client = self.client().await?;
        let query = client.prepare_cached(PROFILE_UPSERT_QUERY).await?;
        client
            .execute(
                &query,
                &[
                    &profile.stock_code,
                    &profile.company_name,
                    &profile.country_code,
                    &profile.sector,
                    &profile.subsector,
                    &profile.listing_date,
                    &profile.profile_source_url,
                ],
            )
            .await?;
        trace!("upserted company profile [{}]", profile.stock_code);
        Ok(())
    }

    async fn select_prices_with_profile_by_code_and_range(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<PriceRow>> {
        let client = self.client().await?;
        let query = client.prepare_cached(PRICE_RANGE_QUERY).await?;
        let rows = client.query(&query, &[&code, &start, &end]).await?;
        rows.iter()
            .map(|row| {
                Ok(PriceRow {
                    price_date: row.try_get("price_date")?,
                    closing_price: row.try_get("closing_price")?,
                    company_name: row.try_get("company_name")?,
                    stock_code: row.try_get("stock_code")?,
                })
            })
            .collect()
    }
}
