use actix_web::{web, HttpResponse, Responder};
use chrono::NaiveDate;
use econdb_util::{parse_date, ISO_DATE};
use serde::Deserialize;
use tracing::error;
use utoipa::{IntoParams, OpenApi};

pub mod fx;
pub mod stock;

#[derive(OpenApi)]
#[openapi(
    paths(fx::rates, stock::prices),
    components(schemas(fx::RatePoint, stock::PricePoint)),
    info(title = "econdb", description = "Read-only time series of exchange rates and stock prices")
)]
pub struct ApiDoc;

/// Routes of the query API; anything but `GET` on them is answered with 405.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/fx/rates")
            .route(web::get().to(fx::rates))
            .default_service(web::to(HttpResponse::MethodNotAllowed)),
    )
    .service(
        web::resource("/api/stock/prices")
            .route(web::get().to(stock::prices))
            .default_service(web::to(HttpResponse::MethodNotAllowed)),
    )
    .service(
        web::resource("/api/openapi.json")
            .route(web::get().to(openapi))
            .default_service(web::to(HttpResponse::MethodNotAllowed)),
    );
}

async fn openapi() -> impl Responder {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

// -------------------------------------------------------------------------------------------------

/// Query string shared by every range endpoint.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RangeQuery {
    /// Currency or stock code
    pub code: Option<String>,
    /// First day, `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// Last day (inclusive), `YYYY-MM-DD`
    pub end_date: Option<String>,
}

/// A validated [`RangeQuery`].
#[derive(Debug, PartialEq)]
pub struct Range {
    pub code: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("missing query parameter '{name}'"))
}

fn date_param(value: &Option<String>, name: &str) -> Result<NaiveDate, String> {
    let raw = required(value, name)?;
    parse_date(raw).map_err(|_| format!("'{name}' must be a date in the form YYYY-MM-DD"))
}

impl RangeQuery {
    pub fn validate(&self) -> Result<Range, String> {
        let code = required(&self.code, "code")?.to_string();
        let start = date_param(&self.start_date, "start_date")?;
        let end = date_param(&self.end_date, "end_date")?;
        if end < start {
            return Err("'end_date' is before 'start_date'".to_string());
        }
        Ok(Range { code, start, end })
    }
}

pub(crate) fn bad_request(message: String) -> HttpResponse {
    HttpResponse::BadRequest().body(message)
}

/// The cause is logged; the caller only learns that the query failed.
pub(crate) fn internal_error(err: anyhow::Error) -> HttpResponse {
    error!("query failed: {err:#}");
    HttpResponse::InternalServerError().body("Query execution failed")
}

pub(crate) fn iso(date: NaiveDate) -> String {
    date.format(ISO_DATE).to_string()
}
