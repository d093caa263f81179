use async_trait::async_trait;
use econdb_warehouse::AppState;
use std::collections::HashMap;
use thiserror::Error;
use tracing::trace;

/// Exchange-rate ingestion commands.
pub mod fx;
/// `help` and the placeholder account commands.
pub mod misc;
/// Stock price and profile ingestion commands.
pub mod stock;

/// One line of shell input, split on whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Exactly `N` arguments, or a usage error.
    pub fn expect_args<const N: usize>(&self, usage: &'static str) -> Result<[&str; N], CommandError> {
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        args.try_into().map_err(|_| CommandError::Usage {
            name: self.name.clone(),
            usage,
        })
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command not found: {0} (type 'help' for a list)")]
    NotFound(String),

    #[error("usage: {name} {usage}")]
    Usage { name: String, usage: &'static str },
}

#[async_trait]
pub trait Handler: Send + Sync {
    async fn run(&self, state: &AppState, cmd: &Command) -> anyhow::Result<()>;
}

/// Command name to handler table.
#[derive(Default)]
pub struct Commands {
    handlers: HashMap<String, Box<dyn Handler>>,
}

impl Commands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `handler`, replacing any earlier binding.
    pub fn register(&mut self, name: &str, handler: Box<dyn Handler>) {
        self.handlers.insert(name.to_string(), handler);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Dispatch on the exact command name; an unknown name is [`CommandError::NotFound`].
    pub async fn run(&self, state: &AppState, cmd: &Command) -> anyhow::Result<()> {
        let handler = self
            .handlers
            .get(&cmd.name)
            .ok_or_else(|| CommandError::NotFound(cmd.name.clone()))?;
        trace!("running {} {:?}", cmd.name, cmd.args);
        handler.run(state, cmd).await
    }
}

/// Every command the shell understands.
pub fn registry() -> Commands {
    let mut cmds = Commands::new();
    cmds.register("help", Box::new(misc::Help));
    for stub in misc::STUBS {
        cmds.register(stub, Box::new(misc::Stub));
    }

    cmds.register("fx:fetch_all", Box::new(fx::FetchAll));
    cmds.register("fx:fetch:range", Box::new(fx::FetchRange));
    cmds.register("fx:fetch:date", Box::new(fx::FetchDate));

    cmds.register("stock:fetch:price", Box::new(stock::FetchPrice));
    cmds.register("stock:fetch:price_all", Box::new(stock::FetchAll(stock::Scope::Price)));
    cmds.register("stock:fetch:profile", Box::new(stock::FetchProfile));
    cmds.register(
        "stock:fetch:profile_all",
        Box::new(stock::FetchAll(stock::Scope::ProfileAndPrice)),
    );
    cmds
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use econdb_warehouse::memory::MemoryStore;
    use econdb_warehouse::Settings;
    use std::sync::{Arc, Mutex};

    /// State over an in-memory store; `extra` overrides individual settings.
    pub(crate) fn state(extra: &[(&str, &str)]) -> AppState {
        let extra: Vec<(String, String)> = extra
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let settings = Settings::from_lookup(|key| {
            extra
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .or_else(|| (key == "DB_URL").then(|| "postgres://test".to_string()))
        })
        .unwrap();
        AppState::new(Arc::new(MemoryStore::new()), settings)
    }

    pub(crate) fn cmd(line: &str) -> Command {
        let mut parts = line.split_whitespace().map(str::to_string);
        let name = parts.next().unwrap_or_default();
        Command::new(name, parts.collect())
    }

    struct Record(&'static str, Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl Handler for Record {
        async fn run(&self, _state: &AppState, cmd: &Command) -> anyhow::Result<()> {
            self.1
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.0, cmd.args.join(",")));
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatches_by_exact_name() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut cmds = Commands::new();
        cmds.register("fx:fetch:range", Box::new(Record("range", calls.clone())));
        cmds.register("fx:fetch_all", Box::new(Record("all", calls.clone())));

        cmds.run(&state(&[]), &cmd("fx:fetch:range USD 2024-01-01 2024-01-02"))
            .await
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["range:USD,2024-01-01,2024-01-02"]);
    }

    #[tokio::test]
    async fn later_registration_wins() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut cmds = Commands::new();
        cmds.register("help", Box::new(Record("first", calls.clone())));
        cmds.register("help", Box::new(Record("second", calls.clone())));

        cmds.run(&state(&[]), &cmd("help")).await.unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["second:"]);
    }

    #[tokio::test]
    async fn unknown_name_is_not_found() {
        let cmds = registry();
        let err = cmds.run(&state(&[]), &cmd("fx:fetch")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CommandError>(),
            Some(CommandError::NotFound(name)) if name == "fx:fetch"
        ));
    }

    #[test]
    fn registry_holds_every_command() {
        let cmds = registry();
        for name in [
            "help",
            "login",
            "register",
            "users",
            "reset",
            "fx:fetch_all",
            "fx:fetch:range",
            "fx:fetch:date",
            "stock:fetch:price",
            "stock:fetch:price_all",
            "stock:fetch:profile",
            "stock:fetch:profile_all",
        ] {
            assert!(cmds.contains(name), "{name} is not registered");
        }
    }

    #[test]
    fn argument_count_is_checked() {
        let binding = cmd("stock:fetch:price 1155");
        let [code] = binding.expect_args::<1>("<CODE>").unwrap();
        assert_eq!(code, "1155");

        let err = cmd("stock:fetch:price").expect_args::<1>("<CODE>").unwrap_err();
        assert_eq!(err.to_string(), "usage: stock:fetch:price <CODE>");
    }
}
