//! ETL seams.
//!
//! Every ingestion handler is written against these traits rather than against
//! concrete clients, in order to keep the steps apart:
//!
//! 1. [`RateSource`] / [`PageSource`] - how the raw data is **extracted** over HTTP.
//! 2. [`Store`] - how the validated rows are **loaded** into the database.

use crate::error::Result;
use crate::models::{CompanyProfile, PriceRecord, PriceRow, RateRecord, RateRow};
use crate::schema::fx::bnm::CurrencyRate;
use async_trait::async_trait;
use chrono::NaiveDate;

/// The JSON exchange-rate API.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Latest rates of every currency the API publishes.
    async fn latest_all(&self) -> Result<Vec<CurrencyRate>>;

    /// One currency on one date. A 404 is reported as
    /// [`Error::NoData`](crate::Error::NoData).
    async fn rate_on(&self, code: &str, date: NaiveDate) -> Result<CurrencyRate>;
}

/// Any HTML page reachable by URL.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String>;
}

/// The persistence gateway. Writes are single-row upserts keyed by the table's
/// uniqueness constraint, so they are safe to repeat.
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap round trip used to fail fast at startup.
    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Create the tables, indexes and triggers if they don't exist yet.
    async fn migrate(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Conflict key: (`currency_code`, `date`); replaces the rates and `captured_at`.
    async fn upsert_foreign_exchange(&self, record: &RateRecord) -> anyhow::Result<()>;

    /// Rows with a middle rate, ordered by date.
    async fn select_rates_by_code_and_range(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<RateRow>>;

    /// Conflict key: (`stock_code`, `price_date`); replaces price, source and `extracted_at`.
    async fn upsert_stock_price(&self, record: &PriceRecord) -> anyhow::Result<()>;

    /// Conflict key: `stock_code`; replaces every descriptive field.
    async fn upsert_company_profile(&self, profile: &CompanyProfile) -> anyhow::Result<()>;

    /// Prices joined to their company profile, ordered by date.
    async fn select_prices_with_profile_by_code_and_range(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<PriceRow>>;
}
