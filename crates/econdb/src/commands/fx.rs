use super::{Command, Handler};
use anyhow::Context;
use async_trait::async_trait;
use colored::Colorize;
use econdb_util::parse_date;
use econdb_warehouse::schema::fx::{self, bnm::RateClient};
use econdb_warehouse::AppState;

fn date_arg(raw: &str, what: &str) -> anyhow::Result<chrono::NaiveDate> {
    parse_date(raw).with_context(|| format!("failed to parse {what} '{raw}' (expected YYYY-MM-DD)"))
}

/// `fx:fetch_all`
pub struct FetchAll;

#[async_trait]
impl Handler for FetchAll {
    async fn run(&self, state: &AppState, cmd: &Command) -> anyhow::Result<()> {
        cmd.expect_args::<0>("")?;
        let client = RateClient::from_settings(&state.settings)?;
        let summary = fx::fetch_and_store_latest(&client, state.db.as_ref()).await?;
        if summary.is_clean() {
            println!("{}", format!("latest rates: {summary}").green());
        } else {
            println!("{}", format!("latest rates: {summary}").yellow());
        }
        Ok(())
    }
}

/// `fx:fetch:range <CODE> <START> <END>`
pub struct FetchRange;

#[async_trait]
impl Handler for FetchRange {
    async fn run(&self, state: &AppState, cmd: &Command) -> anyhow::Result<()> {
        let [code, start, end] = cmd.expect_args::<3>("<CODE> <START YYYY-MM-DD> <END YYYY-MM-DD>")?;
        let start = date_arg(start, "start date")?;
        let end = date_arg(end, "end date")?;
        let client = RateClient::from_settings(&state.settings)?;

        let summary = fx::fetch_and_store_range(&client, state.db.as_ref(), code, start, end).await?;
        println!("{}", summary.to_string().green());
        Ok(())
    }
}

/// `fx:fetch:date <CODE> <DATE>`
pub struct FetchDate;

#[async_trait]
impl Handler for FetchDate {
    async fn run(&self, state: &AppState, cmd: &Command) -> anyhow::Result<()> {
        let [code, date] = cmd.expect_args::<2>("<CODE> <DATE YYYY-MM-DD>")?;
        let date = date_arg(date, "date")?;
        let client = RateClient::from_settings(&state.settings)?;

        let record = fx::fetch_and_store_on(&client, state.db.as_ref(), code, date).await?;
        let middle = record
            .middle_rate
            .map_or_else(|| "n/a".to_string(), |rate| format!("{rate:.4}"));
        println!(
            "{}",
            format!("{} on {}: middle rate {middle}", record.currency_code, record.date).green()
        );
        Ok(())
    }
}
