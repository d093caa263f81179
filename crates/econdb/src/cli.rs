use clap::{Parser, ValueEnum};
use tracing::Level;

/// Ingest exchange rates and stock prices, serve them over HTTP, and take
/// commands from an interactive shell until told to stop.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Sets the level of tracing
    #[arg(long, value_enum, default_value_t = TraceLevel::INFO, ignore_case = true)]
    pub trace: TraceLevel,

    /// Apply the bundled database schema before starting
    #[arg(long)]
    pub migrate: bool,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum TraceLevel {
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

impl From<TraceLevel> for Level {
    fn from(level: TraceLevel) -> Self {
        match level {
            TraceLevel::DEBUG => Level::DEBUG,
            TraceLevel::INFO => Level::INFO,
            TraceLevel::WARN => Level::WARN,
            TraceLevel::ERROR => Level::ERROR,
        }
    }
}
