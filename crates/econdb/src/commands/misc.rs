use super::{Command, Handler};
use async_trait::async_trait;
use colored::Colorize;
use econdb_warehouse::AppState;

/// Account commands kept for muscle memory; they do nothing.
pub const STUBS: [&str; 4] = ["login", "register", "users", "reset"];

pub const HELP: &[(&str, &str)] = &[
    ("help", "Show this help message"),
    ("fx:fetch_all", "Fetch the latest rates of every currency"),
    ("fx:fetch:date <CUR> <DATE>", "Fetch one currency's rates on DATE (YYYY-MM-DD)"),
    ("fx:fetch:range <CUR> <START> <END>", "Fetch one currency's rates for every day from START to END"),
    ("stock:fetch:price <CODE>", "Fetch today's price of stock CODE"),
    ("stock:fetch:price_all", "Fetch today's price of every stock in STOCK_LIST"),
    ("stock:fetch:profile <CODE>", "Fetch the company profile of stock CODE"),
    ("stock:fetch:profile_all", "Fetch profile and price of every stock in STOCK_LIST"),
    ("login | register | users | reset", "Not available"),
    ("exit | quit", "Stop the application"),
];

pub fn help_text() -> String {
    let width = HELP.iter().map(|(usage, _)| usage.len()).max().unwrap_or(0);
    let mut text = String::from("Available commands:");
    for (usage, description) in HELP {
        text.push_str(&format!("\n  {usage:<width$}  {description}"));
    }
    text
}

pub struct Help;

#[async_trait]
impl Handler for Help {
    async fn run(&self, _state: &AppState, _cmd: &Command) -> anyhow::Result<()> {
        println!("{}", help_text().bold());
        Ok(())
    }
}

pub struct Stub;

#[async_trait]
impl Handler for Stub {
    async fn run(&self, _state: &AppState, cmd: &Command) -> anyhow::Result<()> {
        println!("{}", format!("{} is not available", cmd.name).yellow());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{cmd, state};
    use crate::commands::registry;

    #[test]
    fn help_lists_every_registered_command() {
        let text = help_text();
        let cmds = registry();
        for (usage, _) in HELP {
            for name in usage.split(" | ") {
                let name = name.split_whitespace().next().unwrap();
                if name != "exit" && name != "quit" {
                    assert!(cmds.contains(name), "{name} is in help but not registered");
                }
            }
        }
        assert!(text.starts_with("Available commands:"));
        assert!(text.contains("fx:fetch:range <CUR> <START> <END>"));
    }

    #[tokio::test]
    async fn stubs_succeed_without_side_effects() {
        let state = state(&[]);
        for name in STUBS {
            Stub.run(&state, &cmd(name)).await.unwrap();
        }
    }
}
