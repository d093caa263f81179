use chrono::NaiveDate;
use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the external data clients and of record validation.
///
/// Store failures are not listed here; they travel as [`anyhow::Error`] from the
/// [`Store`](crate::api::Store) implementations.
#[derive(Debug, Error)]
pub enum Error {
    /// A setting the operation depends on is empty.
    #[error("{0} is not configured")]
    Config(&'static str),

    /// The rate API answered 404: it holds nothing for that currency on that date.
    #[error("no data for {code} on {date}")]
    NoData { code: String, date: NaiveDate },

    /// A labeled field is absent from a scraped page.
    #[error("could not find '{0}' on the page")]
    FieldNotFound(&'static str),

    #[error("unexpected status {status} from {url}")]
    Status { status: StatusCode, url: String },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse {what} from '{input}'")]
    Parse { what: &'static str, input: String },

    #[error("{0}")]
    Invalid(String),

    #[error("invalid selector '{0}'")]
    Selector(&'static str),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// "No data" outcomes: a 404 from the rate API, or a page missing its labeled field.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NoData { .. } | Error::FieldNotFound(_))
    }
}
