use super::{Command, Handler};
use async_trait::async_trait;
use colored::Colorize;
use econdb_warehouse::schema::stock::{self, i3investor::PageClient, COURTESY_DELAY};
use econdb_warehouse::AppState;

pub use econdb_warehouse::schema::stock::Scope;

/// `stock:fetch:price <CODE>`
pub struct FetchPrice;

#[async_trait]
impl Handler for FetchPrice {
    async fn run(&self, state: &AppState, cmd: &Command) -> anyhow::Result<()> {
        let [code] = cmd.expect_args::<1>("<CODE>")?;
        let pages = PageClient::new()?;
        let record = stock::fetch_and_store_price(&pages, state.db.as_ref(), &state.settings, code).await?;
        println!(
            "{}",
            format!("{}: {:.4} on {}", record.stock_code, record.closing_price, record.price_date).green()
        );
        Ok(())
    }
}

/// `stock:fetch:profile <CODE>`
pub struct FetchProfile;

#[async_trait]
impl Handler for FetchProfile {
    async fn run(&self, state: &AppState, cmd: &Command) -> anyhow::Result<()> {
        let [code] = cmd.expect_args::<1>("<CODE>")?;
        let pages = PageClient::new()?;
        let profile = stock::fetch_and_store_profile(&pages, state.db.as_ref(), &state.settings, code).await?;

        let or_dash = |field: &Option<String>| field.clone().unwrap_or_else(|| "-".to_string());
        println!(
            "{}",
            format!(
                "{}: {} (country {}, sector {}, subsector {})",
                profile.stock_code,
                profile.company_name,
                or_dash(&profile.country_code),
                or_dash(&profile.sector),
                or_dash(&profile.subsector),
            )
            .green()
        );
        Ok(())
    }
}

/// `stock:fetch:price_all` and `stock:fetch:profile_all`
pub struct FetchAll(pub Scope);

#[async_trait]
impl Handler for FetchAll {
    async fn run(&self, state: &AppState, cmd: &Command) -> anyhow::Result<()> {
        cmd.expect_args::<0>("")?;
        let pages = PageClient::new()?;
        let summary =
            stock::fetch_all(&pages, state.db.as_ref(), &state.settings, self.0, COURTESY_DELAY).await?;
        if summary.is_clean() {
            println!("{}", summary.to_string().green());
        } else {
            println!("{}", summary.to_string().yellow());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{cmd, state};
    use econdb_warehouse::Error;

    #[tokio::test]
    async fn price_needs_a_code() {
        assert!(FetchPrice.run(&state(&[]), &cmd("stock:fetch:price")).await.is_err());
        assert!(FetchPrice
            .run(&state(&[]), &cmd("stock:fetch:price 1155 5347"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn unconfigured_profile_url_is_a_config_error() {
        let err = FetchProfile
            .run(&state(&[]), &cmd("stock:fetch:profile 1155"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Config("I3_INVESTOR_STOCK_PROFILE_URL"))
        ));
    }

    #[tokio::test]
    async fn price_all_with_empty_list_succeeds() {
        FetchAll(Scope::Price)
            .run(&state(&[]), &cmd("stock:fetch:price_all"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn profile_all_needs_both_urls() {
        let state = state(&[
            ("STOCK_LIST", "1155"),
            ("I3_INVESTOR_BASE_URL", "http://127.0.0.1:9/"),
        ]);
        let err = FetchAll(Scope::ProfileAndPrice)
            .run(&state, &cmd("stock:fetch:profile_all"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Config("I3_INVESTOR_STOCK_PROFILE_URL"))
        ));
    }
}
