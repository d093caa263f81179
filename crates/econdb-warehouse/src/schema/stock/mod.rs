/// i3investor page client and the HTML extraction behind it.
pub mod i3investor;

use crate::api::{PageSource, Store};
use crate::config::Settings;
use crate::error::Error;
use crate::models::{CompanyProfile, PriceRecord};
use crate::schema::BatchSummary;
use anyhow::Context;
use chrono::Utc;
use i3investor::{extract_last_price, extract_profile};
use std::time::Duration;
use tracing::{debug, error, info};

/// Pause between two instruments of a batch, to go easy on the site.
pub const COURTESY_DELAY: Duration = Duration::from_millis(500);

fn stock_code(code: &str) -> crate::Result<&str> {
    let code = code.trim();
    if code.is_empty() || code.chars().any(char::is_whitespace) {
        return Err(Error::Invalid(format!("invalid stock code '{code}'")));
    }
    Ok(code)
}

/// Scrape today's last price from `{I3_INVESTOR_BASE_URL}{CODE}` and upsert it.
pub async fn fetch_and_store_price(
    pages: &dyn PageSource,
    store: &dyn Store,
    settings: &Settings,
    code: &str,
) -> anyhow::Result<PriceRecord> {
    let base = Settings::require(&settings.i3investor_base_url, "I3_INVESTOR_BASE_URL")?;
    let code = stock_code(code)?;
    let url = format!("{base}{code}");

    debug!("fetching price for {code} from {url}");
    let html = pages
        .fetch_page(&url)
        .await
        .with_context(|| format!("failed to fetch price page for {code}"))?;
    let closing_price =
        extract_last_price(&html).with_context(|| format!("no usable price for {code} at {url}"))?;

    let record = PriceRecord {
        stock_code: code.to_string(),
        price_date: Utc::now().date_naive(),
        closing_price,
        source_url: Some(url),
        extracted_at: Utc::now(),
    };
    store
        .upsert_stock_price(&record)
        .await
        .with_context(|| format!("failed to store price for {code}"))?;

    info!("stored price {closing_price:.4} for {code} on {}", record.price_date);
    Ok(record)
}

/// Scrape `{I3_INVESTOR_STOCK_PROFILE_URL}{CODE}` and upsert the company profile.
pub async fn fetch_and_store_profile(
    pages: &dyn PageSource,
    store: &dyn Store,
    settings: &Settings,
    code: &str,
) -> anyhow::Result<CompanyProfile> {
    let base = Settings::require(
        &settings.i3investor_profile_url,
        "I3_INVESTOR_STOCK_PROFILE_URL",
    )?;
    let code = stock_code(code)?;
    let url = format!("{base}{code}");

    debug!("fetching profile for {code} from {url}");
    let html = pages
        .fetch_page(&url)
        .await
        .with_context(|| format!("failed to fetch profile page for {code}"))?;
    let scraped = extract_profile(&html).with_context(|| format!("no usable profile for {code} at {url}"))?;

    let profile = CompanyProfile {
        stock_code: code.to_string(),
        company_name: scraped.company_name,
        country_code: scraped.country_code,
        sector: scraped.sector,
        subsector: scraped.subsector,
        listing_date: scraped.listing_date,
        profile_source_url: Some(url),
    };
    store
        .upsert_company_profile(&profile)
        .await
        .with_context(|| format!("failed to store profile for {code}"))?;

    info!("stored profile for {code}: {}", profile.company_name);
    Ok(profile)
}

/// What a batch fetches per instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Price,
    /// Profile first, then price; a failed profile doesn't skip the price.
    ProfileAndPrice,
}

/// Run `scope` for every tracked stock, in configured order, one at a time.
///
/// Per-instrument failures are logged and listed in the summary, never returned.
/// `delay` is slept between two instruments.
pub async fn fetch_all(
    pages: &dyn PageSource,
    store: &dyn Store,
    settings: &Settings,
    scope: Scope,
    delay: Duration,
) -> anyhow::Result<BatchSummary> {
    let mut summary = BatchSummary::default();
    if settings.stock_list.is_empty() {
        info!("STOCK_LIST is empty; nothing to fetch");
        return Ok(summary);
    }

    Settings::require(&settings.i3investor_base_url, "I3_INVESTOR_BASE_URL")?;
    if scope == Scope::ProfileAndPrice {
        Settings::require(
            &settings.i3investor_profile_url,
            "I3_INVESTOR_STOCK_PROFILE_URL",
        )?;
    }

    info!("fetching {scope:?} for {} stocks", settings.stock_list.len());
    for (i, code) in settings.stock_list.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(delay).await;
        }

        let mut errors = Vec::new();
        if scope == Scope::ProfileAndPrice {
            if let Err(e) = fetch_and_store_profile(pages, store, settings, code).await {
                error!("profile for {code}: {e:#}");
                errors.push(e);
            }
        }
        if let Err(e) = fetch_and_store_price(pages, store, settings, code).await {
            error!("price for {code}: {e:#}");
            errors.push(e);
        }

        // one entry per instrument, whatever number of steps failed
        let mut errors = errors.into_iter();
        match errors.next() {
            None => summary.success(),
            Some(first) => {
                let err = errors.fold(first, |acc, next| anyhow::anyhow!("{acc:#}; {next:#}"));
                summary.failure(code, &err);
            }
        }
    }

    info!("{scope:?} batch: {summary}");
    Ok(summary)
}
