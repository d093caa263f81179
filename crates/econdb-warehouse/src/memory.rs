//! [`Store`] held in process memory, for tests of this crate and the ones built on it.

use crate::api::Store;
use crate::models::{CompanyProfile, PriceRecord, PriceRow, RateRecord, RateRow};
use anyhow::bail;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    rates: Mutex<BTreeMap<(String, NaiveDate), RateRecord>>,
    prices: Mutex<BTreeMap<(String, NaiveDate), PriceRecord>>,
    profiles: Mutex<BTreeMap<String, CompanyProfile>>,
    failing_codes: Mutex<HashSet<String>>,
    broken: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write for `code` fails from now on.
    pub fn fail_writes_for(&self, code: &str) {
        lock(&self.failing_codes).insert(code.to_string());
    }

    /// Every call fails from now on, reads included.
    pub fn break_all(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    pub fn rates(&self) -> Vec<RateRecord> {
        lock(&self.rates).values().cloned().collect()
    }

    pub fn prices(&self) -> Vec<PriceRecord> {
        lock(&self.prices).values().cloned().collect()
    }

    pub fn profiles(&self) -> Vec<CompanyProfile> {
        lock(&self.profiles).values().cloned().collect()
    }

    fn check(&self, code: &str) -> anyhow::Result<()> {
        if self.broken.load(Ordering::SeqCst) {
            bail!("store unavailable");
        }
        if lock(&self.failing_codes).contains(code) {
            bail!("write rejected for {code}");
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> anyhow::Result<()> {
        self.check("")
    }

    async fn upsert_foreign_exchange(&self, record: &RateRecord) -> anyhow::Result<()> {
        self.check(&record.currency_code)?;
        let key = (record.currency_code.clone(), record.date);
        let mut rates = lock(&self.rates);
        match rates.get_mut(&key) {
            // the row keeps its original id
            Some(existing) => {
                existing.buying_rate = record.buying_rate;
                existing.selling_rate = record.selling_rate;
                existing.middle_rate = record.middle_rate;
                existing.captured_at = record.captured_at;
            }
            None => {
                rates.insert(key, record.clone());
            }
        }
        Ok(())
    }

    async fn select_rates_by_code_and_range(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<RateRow>> {
        self.check("")?;
        Ok(lock(&self.rates)
            .values()
            .filter(|r| r.currency_code == code && r.date >= start && r.date <= end)
            .filter_map(|r| {
                r.middle_rate.map(|middle_rate| RateRow {
                    date: r.date,
                    middle_rate,
                })
            })
            .collect())
    }

    async fn upsert_stock_price(&self, record: &PriceRecord) -> anyhow::Result<()> {
        self.check(&record.stock_code)?;
        lock(&self.prices).insert(
            (record.stock_code.clone(), record.price_date),
            record.clone(),
        );
        Ok(())
    }

    async fn upsert_company_profile(&self, profile: &CompanyProfile) -> anyhow::Result<()> {
        self.check(&profile.stock_code)?;
        lock(&self.profiles).insert(profile.stock_code.clone(), profile.clone());
        Ok(())
    }

    async fn select_prices_with_profile_by_code_and_range(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<PriceRow>> {
        self.check("")?;
        let profiles = lock(&self.profiles);
        Ok(lock(&self.prices)
            .values()
            .filter(|p| p.stock_code == code && p.price_date >= start && p.price_date <= end)
            .filter_map(|p| {
                profiles.get(&p.stock_code).map(|profile| PriceRow {
                    price_date: p.price_date,
                    closing_price: p.closing_price,
                    company_name: profile.company_name.clone(),
                    stock_code: p.stock_code.clone(),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(s: &str) -> NaiveDate {
        econdb_util::parse_date(s).unwrap()
    }

    fn rate(code: &str, day: &str, middle: Option<f64>) -> RateRecord {
        RateRecord::new(code, date(day), None, None, middle)
    }

    fn price(code: &str, day: &str, close: f64) -> PriceRecord {
        PriceRecord {
            stock_code: code.to_string(),
            price_date: date(day),
            closing_price: close,
            source_url: None,
            extracted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn rate_upsert_keeps_one_row_with_latest_values() {
        let store = MemoryStore::new();
        let first = rate("USD", "2024-01-02", Some(4.60));
        store.upsert_foreign_exchange(&first).await.unwrap();
        store
            .upsert_foreign_exchange(&rate("USD", "2024-01-02", Some(4.65)))
            .await
            .unwrap();

        let rows = store.rates();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].middle_rate, Some(4.65));
        assert_eq!(rows[0].id, first.id);
    }

    #[tokio::test]
    async fn price_upsert_keeps_one_row_with_latest_values() {
        let store = MemoryStore::new();
        store.upsert_stock_price(&price("1155", "2024-01-02", 9.5)).await.unwrap();
        store.upsert_stock_price(&price("1155", "2024-01-02", 9.7)).await.unwrap();
        store.upsert_stock_price(&price("1155", "2024-01-03", 9.8)).await.unwrap();

        let prices = store.prices();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].closing_price, 9.7);
    }

    #[tokio::test]
    async fn rate_range_skips_null_middle_and_orders_by_date() {
        let store = MemoryStore::new();
        for r in [
            rate("USD", "2024-01-03", Some(4.7)),
            rate("USD", "2024-01-01", Some(4.6)),
            rate("USD", "2024-01-02", None),
            rate("EUR", "2024-01-02", Some(5.1)),
        ] {
            store.upsert_foreign_exchange(&r).await.unwrap();
        }

        let rows = store
            .select_rates_by_code_and_range("USD", date("2024-01-01"), date("2024-01-03"))
            .await
            .unwrap();
        let days: Vec<_> = rows.iter().map(|r| r.date).collect();
        assert_eq!(days, vec![date("2024-01-01"), date("2024-01-03")]);
    }

    #[tokio::test]
    async fn prices_without_a_profile_are_not_joined() {
        let store = MemoryStore::new();
        store.upsert_stock_price(&price("1155", "2024-01-02", 9.5)).await.unwrap();
        let rows = store
            .select_prices_with_profile_by_code_and_range("1155", date("2024-01-01"), date("2024-01-31"))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn injected_failures_reject_writes() {
        let store = MemoryStore::new();
        store.fail_writes_for("EUR");
        assert!(store.upsert_foreign_exchange(&rate("EUR", "2024-01-02", None)).await.is_err());
        assert!(store.upsert_foreign_exchange(&rate("USD", "2024-01-02", None)).await.is_ok());

        store.break_all();
        assert!(store.ping().await.is_err());
    }
}
