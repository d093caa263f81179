/// Central bank exchange-rate API client and its response shapes.
pub mod bnm;

use crate::api::{RateSource, Store};
use crate::error::Error;
use crate::models::RateRecord;
use crate::schema::BatchSummary;
use anyhow::{bail, Context};
use bnm::CurrencyRate;
use chrono::NaiveDate;
use econdb_util::{days_inclusive, parse_date};
use tracing::{debug, error, info, warn};

////////////////////////////////////////////////////////////////////////////////////////////////////
//
// Validation & transformation
//
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Upper-case a currency code, rejecting anything but exactly three ASCII letters.
pub fn validate_currency_code(code: &str) -> crate::Result<String> {
    let code = code.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(Error::Invalid(format!(
            "invalid currency code '{code}' (must be 3 letters)"
        )))
    }
}

/// Build the row for `code`; the date printed in the response wins over the requested one.
pub fn to_record(code: &str, entry: &CurrencyRate) -> crate::Result<RateRecord> {
    let date = parse_date(&entry.rate.date).map_err(|_| Error::Parse {
        what: "rate date",
        input: entry.rate.date.clone(),
    })?;
    Ok(RateRecord::new(
        code,
        date,
        entry.rate.buying_rate,
        entry.rate.selling_rate,
        entry.rate.middle_rate,
    ))
}

async fn store_rate(store: &dyn Store, code: &str, entry: &CurrencyRate) -> anyhow::Result<RateRecord> {
    let record = to_record(code, entry)?;
    store
        .upsert_foreign_exchange(&record)
        .await
        .with_context(|| format!("failed to store {code} rate for {}", record.date))?;
    Ok(record)
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//
// Handlers
//
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Fetch one currency on one date and upsert it.
pub async fn fetch_and_store_on(
    source: &dyn RateSource,
    store: &dyn Store,
    code: &str,
    date: NaiveDate,
) -> anyhow::Result<RateRecord> {
    let code = validate_currency_code(code)?;
    let entry = source
        .rate_on(&code, date)
        .await
        .with_context(|| format!("failed to fetch {code} rate for {date}"))?;
    let record = store_rate(store, &code, &entry)
        .await
        .with_context(|| format!("{code} on {date}"))?;
    info!(
        "stored {code} rate on {} (middle {:?})",
        record.date, record.middle_rate
    );
    Ok(record)
}

/// What happened to one day of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayOutcome {
    pub date: NaiveDate,
    pub fetched: bool,
    pub stored: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSummary {
    pub attempted: usize,
    pub fetched: usize,
    pub fetch_failed: usize,
    /// Days the API had nothing for; a subset of `fetch_failed`.
    pub no_data: usize,
    pub stored: usize,
    pub store_failed: usize,
    pub days: Vec<DayOutcome>,
}

impl std::fmt::Display for RangeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} days: fetches {} ok / {} failed ({} without data), stores {} ok / {} failed",
            self.attempted, self.fetched, self.fetch_failed, self.no_data, self.stored, self.store_failed
        )
    }
}

/// Fetch one currency for every day of `[start, end]`, ascending, one request per day.
///
/// Arguments are checked before any request is made. After that no single day can
/// fail the call: each is counted and the run carries on.
pub async fn fetch_and_store_range(
    source: &dyn RateSource,
    store: &dyn Store,
    code: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<RangeSummary> {
    let code = validate_currency_code(code)?;
    if end < start {
        bail!("end date {end} is before start date {start}");
    }

    let mut summary = RangeSummary::default();
    info!("fetching {code} rates from {start} to {end}");

    for date in days_inclusive(start, end) {
        summary.attempted += 1;
        let mut outcome = DayOutcome {
            date,
            fetched: false,
            stored: false,
        };

        match source.rate_on(&code, date).await {
            Ok(entry) => {
                summary.fetched += 1;
                outcome.fetched = true;
                match store_rate(store, &code, &entry).await {
                    Ok(record) => {
                        summary.stored += 1;
                        outcome.stored = true;
                        debug!("stored {code} rate on {} (middle {:?})", record.date, record.middle_rate);
                    }
                    Err(e) => {
                        summary.store_failed += 1;
                        error!("{code} on {date}: {e:#}");
                    }
                }
            }
            Err(e) if e.is_not_found() => {
                summary.fetch_failed += 1;
                summary.no_data += 1;
                warn!("no data for {code} on {date}");
            }
            Err(e) => {
                summary.fetch_failed += 1;
                error!("failed to fetch {code} rate for {date}: {e}");
            }
        }
        summary.days.push(outcome);
    }

    info!("{code} {start}..{end}: {summary}");
    Ok(summary)
}

/// Fetch the latest rate of every currency in one call and upsert each entry.
///
/// Entries with a bad date or a failed store are logged, listed in the summary and
/// skipped; only the fetch itself can fail the call.
pub async fn fetch_and_store_latest(
    source: &dyn RateSource,
    store: &dyn Store,
) -> anyhow::Result<BatchSummary> {
    let entries = source
        .latest_all()
        .await
        .context("failed to fetch latest rates")?;

    let mut summary = BatchSummary::default();
    for entry in &entries {
        let code = match validate_currency_code(&entry.currency_code) {
            Ok(code) => code,
            Err(e) => {
                let key = entry.currency_code.trim();
                error!("skipping entry dated {}: {e}", entry.rate.date);
                summary.failure(key, &anyhow::Error::from(e));
                continue;
            }
        };
        match store_rate(store, &code, entry).await {
            Ok(record) => {
                debug!("stored {code} rate on {} (middle {:?})", record.date, record.middle_rate);
                summary.success();
            }
            Err(e) => {
                error!("skipping {code} ({}): {e:#}", entry.rate.date);
                summary.failure(&code, &e);
            }
        }
    }

    info!("latest rates: {summary}");
    Ok(summary)
}
