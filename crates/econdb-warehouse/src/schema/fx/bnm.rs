use crate::api::RateSource;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::schema::common::de_opt_rate;
use async_trait::async_trait;
use chrono::NaiveDate;
use econdb_util::{classify, StatusClass, ISO_DATE};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, trace};

////////////////////////////////////////////////////////////////////////////////////////////////////
//
// API Documentation: https://apikijangportal.bnm.gov.my/openapi
//
////////////////////////////////////////////////////////////////////////////////////////////////////

const ACCEPT_BNM: &str = "application/vnd.BNM.API.v1+json";
const QUERY: &str = "session=1200&quote=rm";
const TIMEOUT: Duration = Duration::from_secs(10);

/// `GET {base}?session=1200&quote=rm`
#[derive(Debug, Deserialize)]
pub struct Latest {
    pub data: Vec<CurrencyRate>,
}

/// `GET {base}/{CODE}/date/{YYYY-MM-DD}?session=1200&quote=rm`
#[derive(Debug, Deserialize)]
pub struct OnDate {
    pub data: CurrencyRate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyRate {
    pub currency_code: String,
    #[serde(default)]
    pub unit: Option<u32>,
    pub rate: Rate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rate {
    /// `YYYY-MM-DD`; parsed by the handler so a bad date fails that entry only.
    pub date: String,
    #[serde(default, deserialize_with = "de_opt_rate")]
    pub buying_rate: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_rate")]
    pub selling_rate: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_rate")]
    pub middle_rate: Option<f64>,
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//
// Client
//
////////////////////////////////////////////////////////////////////////////////////////////////////

pub struct RateClient {
    base_url: String,
    http: Client,
}

impl RateClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let base_url = Settings::require(base_url, "FX_API_BASE_URL")?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_BNM));
        if !api_key.trim().is_empty() {
            let value = HeaderValue::from_str(api_key.trim())
                .map_err(|_| Error::Invalid("FX_API_KEY is not a valid header value".into()))?;
            headers.insert("apikey", value);
        }

        let http = reqwest::ClientBuilder::new()
            .default_headers(headers)
            .timeout(TIMEOUT)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(&settings.fx_api_base_url, &settings.fx_api_key)
    }

    pub fn latest_url(&self) -> String {
        format!("{}?{QUERY}", self.base_url)
    }

    pub fn on_date_url(&self, code: &str, date: NaiveDate) -> String {
        format!(
            "{}/{code}/date/{}?{QUERY}",
            self.base_url,
            date.format(ISO_DATE)
        )
    }

    /// GET and decode; the raw status is handed back for the caller to classify.
    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<(StatusClass, Option<T>)> {
        trace!("GET {url}");
        let response = self.http.get(url).send().await?;
        let class = classify(response.status());
        if class != StatusClass::Ok {
            return Ok((class, None));
        }
        let body = response.bytes().await?;
        let data = serde_json::from_slice::<T>(&body).map_err(|source| Error::Decode {
            url: url.to_string(),
            source,
        })?;
        Ok((class, Some(data)))
    }
}

fn status_error(class: StatusClass, url: &str) -> Error {
    let status = match class {
        StatusClass::Failed(status) => status,
        StatusClass::Ok | StatusClass::NotFound => reqwest::StatusCode::NOT_FOUND,
    };
    Error::Status {
        status,
        url: url.to_string(),
    }
}

#[async_trait]
impl RateSource for RateClient {
    async fn latest_all(&self) -> Result<Vec<CurrencyRate>> {
        let url = self.latest_url();
        match self.get::<Latest>(&url).await? {
            (StatusClass::Ok, Some(latest)) => {
                debug!("rate API returned {} currencies", latest.data.len());
                Ok(latest.data)
            }
            (class, _) => Err(status_error(class, &url)),
        }
    }

    async fn rate_on(&self, code: &str, date: NaiveDate) -> Result<CurrencyRate> {
        let url = self.on_date_url(code, date);
        match self.get::<OnDate>(&url).await? {
            (StatusClass::Ok, Some(on_date)) => Ok(on_date.data),
            (StatusClass::NotFound, _) => Err(Error::NoData {
                code: code.to_string(),
                date,
            }),
            (class, _) => Err(status_error(class, &url)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_follow_the_api_layout() {
        let client = RateClient::new("https://api.bnm.gov.my/public/exchange-rate/", "").unwrap();
        assert_eq!(
            client.latest_url(),
            "https://api.bnm.gov.my/public/exchange-rate?session=1200&quote=rm"
        );
        assert_eq!(
            client.on_date_url("USD", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            "https://api.bnm.gov.my/public/exchange-rate/USD/date/2024-01-02?session=1200&quote=rm"
        );
    }

    #[test]
    fn base_url_is_required() {
        assert!(matches!(
            RateClient::new("  ", "key"),
            Err(Error::Config("FX_API_BASE_URL"))
        ));
    }

    #[test]
    fn decodes_the_latest_listing() {
        let body = r#"{
            "data": [
                {"currency_code": "USD", "unit": 1,
                 "rate": {"date": "2024-01-02", "buying_rate": 4.5855, "selling_rate": 4.6205, "middle_rate": 4.603}},
                {"currency_code": "JPY", "unit": 100,
                 "rate": {"date": "2024-01-02", "buying_rate": null, "selling_rate": null, "middle_rate": 3.2545}}
            ],
            "meta": {"quote": "rm", "session": "1200"}
        }"#;
        let latest: Latest = serde_json::from_str(body).unwrap();
        assert_eq!(latest.data.len(), 2);
        assert_eq!(latest.data[0].rate.middle_rate, Some(4.603));
        assert_eq!(latest.data[1].unit, Some(100));
        assert_eq!(latest.data[1].rate.buying_rate, None);
    }

    #[test]
    fn decodes_a_single_date_object() {
        let body = r#"{
            "data": {"currency_code": "USD", "unit": 1,
                     "rate": {"date": "2024-01-02", "middle_rate": "4.6030"}},
            "meta": {}
        }"#;
        let on_date: OnDate = serde_json::from_str(body).unwrap();
        assert_eq!(on_date.data.currency_code, "USD");
        assert_eq!(on_date.data.rate.middle_rate, Some(4.603));
        assert_eq!(on_date.data.rate.selling_rate, None);
    }

    #[test]
    fn a_list_is_not_a_single_date_body() {
        assert!(serde_json::from_str::<OnDate>(r#"{"data": [], "meta": {}}"#).is_err());
    }
}
