use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// One row of `foreign_exchange`; unique on (`currency_code`, `date`).
#[derive(Debug, Clone, PartialEq)]
pub struct RateRecord {
    pub id: Uuid,
    pub currency_code: String,
    pub date: NaiveDate,
    pub buying_rate: Option<f64>,
    pub selling_rate: Option<f64>,
    pub middle_rate: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

impl RateRecord {
    /// A fresh row captured now, with a new id.
    pub fn new(
        currency_code: impl Into<String>,
        date: NaiveDate,
        buying_rate: Option<f64>,
        selling_rate: Option<f64>,
        middle_rate: Option<f64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            currency_code: currency_code.into(),
            date,
            buying_rate,
            selling_rate,
            middle_rate,
            captured_at: Utc::now(),
        }
    }
}

/// One row of `stock_prices`; unique on (`stock_code`, `price_date`).
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub stock_code: String,
    pub price_date: NaiveDate,
    pub closing_price: f64,
    pub source_url: Option<String>,
    pub extracted_at: DateTime<Utc>,
}

/// Descriptive fields of `companies`, keyed by `stock_code`.
///
/// `last_scraped_at`, `created_at` and `updated_at` are maintained by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyProfile {
    pub stock_code: String,
    pub company_name: String,
    pub country_code: Option<String>,
    pub sector: Option<String>,
    pub subsector: Option<String>,
    pub listing_date: Option<NaiveDate>,
    pub profile_source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateRow {
    pub date: NaiveDate,
    pub middle_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub price_date: NaiveDate,
    pub closing_price: f64,
    pub company_name: String,
    pub stock_code: String,
}
