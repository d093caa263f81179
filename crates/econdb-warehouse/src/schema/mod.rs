/// Common deserializers and text parsers (used in data transformations)
pub mod common;

/// Foreign-exchange rates. Includes:
/// 1. MY   [*source*]: the central bank's public exchange-rate API
pub mod fx;

/// Equity prices and company profiles. Includes:
/// 1. MY   [*source*]: i3investor stock pages (HTML)
pub mod stock;

use std::fmt;

/// One unit of a batch that did not make it into the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    /// Currency or stock code.
    pub key: String,
    pub reason: String,
}

/// Outcome of an "all instruments" run: batches never fail on a single unit, they
/// report it here instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: Vec<Failure>,
}

impl BatchSummary {
    pub fn success(&mut self) {
        self.succeeded += 1;
    }

    /// Record `err` with its full chain; the caller has already logged it.
    pub fn failure(&mut self, key: &str, err: &anyhow::Error) {
        self.failed.push(Failure {
            key: key.to_string(),
            reason: format!("{err:#}"),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} succeeded, {} failed", self.succeeded, self.failed.len())?;
        for failure in &self.failed {
            write!(f, "\n  {}: {}", failure.key, failure.reason)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_each_failure() {
        let mut summary = BatchSummary::default();
        summary.success();
        summary.success();
        summary.failure("5347", &anyhow::anyhow!("timed out").context("fetching price"));

        assert!(!summary.is_clean());
        assert_eq!(summary.succeeded, 2);
        assert_eq!(
            summary.to_string(),
            "2 succeeded, 1 failed\n  5347: fetching price: timed out"
        );
    }
}
