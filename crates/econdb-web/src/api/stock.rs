use super::{bad_request, internal_error, iso, RangeQuery};
use actix_web::{web, HttpResponse};
use econdb_warehouse::AppState;
use serde::{Deserialize, Serialize};

////////////////////////////////////////////////////////////////////////////////////////////////////

/// Closing price of one stock on one day, with the company it belongs to
///
/// ```json
/// [
///     {
///         "date": "2024-01-02",
///         "value": 9.72,
///         "company_name": "MALAYAN BANKING BERHAD",
///         "stock_code": "1155"
///     },
///     ...
/// ]
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, utoipa::ToSchema)]
pub struct PricePoint {
    pub date: String,
    pub value: f64,
    pub company_name: String,
    pub stock_code: String,
}

#[utoipa::path(
    get,
    path = "/api/stock/prices",
    params(RangeQuery),
    responses(
        (
            status = 200, description = "Closing prices of a stock with a stored company profile, oldest first",
            body = [PricePoint], content_type = "application/json",
            example = json!([
                {
                    "date": "2024-01-02",
                    "value": 9.72,
                    "company_name": "MALAYAN BANKING BERHAD",
                    "stock_code": "1155"
                }
            ])
        ),
        (status = 400, description = "Missing or malformed parameter"),
        (status = 500, description = "Query execution failed")
    )
)]
pub async fn prices(state: web::Data<AppState>, query: web::Query<RangeQuery>) -> HttpResponse {
    let range = match query.validate() {
        Ok(range) => range,
        Err(message) => return bad_request(message),
    };

    let rows = match state
        .db
        .select_prices_with_profile_by_code_and_range(&range.code, range.start, range.end)
        .await
    {
        Ok(rows) => rows,
        Err(e) => return internal_error(e),
    };

    let data: Vec<PricePoint> = rows
        .into_iter()
        .map(|row| PricePoint {
            date: iso(row.price_date),
            value: row.closing_price,
            company_name: row.company_name,
            stock_code: row.stock_code,
        })
        .collect();

    HttpResponse::Ok().json(data)
}
