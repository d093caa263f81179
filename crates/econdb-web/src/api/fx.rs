use super::{bad_request, internal_error, iso, RangeQuery};
use actix_web::{web, HttpResponse};
use econdb_warehouse::schema::fx::validate_currency_code;
use econdb_warehouse::AppState;
use serde::{Deserialize, Serialize};

////////////////////////////////////////////////////////////////////////////////////////////////////

/// Middle rate of one currency on one day
///
/// ```json
/// [
///     {
///         "date": "2024-01-02",
///         "value": 4.603
///     },
///     ...
/// ]
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, utoipa::ToSchema)]
pub struct RatePoint {
    pub date: String,
    pub value: f64,
}

#[utoipa::path(
    get,
    path = "/api/fx/rates",
    params(RangeQuery),
    responses(
        (
            status = 200, description = "Middle rates of a currency, oldest first; days without a middle rate are left out",
            body = [RatePoint], content_type = "application/json",
            example = json!([
                {
                    "date": "2024-01-02",
                    "value": 4.603
                }
            ])
        ),
        (status = 400, description = "Missing or malformed parameter"),
        (status = 500, description = "Query execution failed")
    )
)]
pub async fn rates(state: web::Data<AppState>, query: web::Query<RangeQuery>) -> HttpResponse {
    let range = match query.validate() {
        Ok(range) => range,
        Err(message) => return bad_request(message),
    };
    let code = match validate_currency_code(&range.code) {
        Ok(code) => code,
        Err(e) => return bad_request(e.to_string()),
    };

    let rows = match state
        .db
        .select_rates_by_code_and_range(&code, range.start, range.end)
        .await
    {
        Ok(rows) => rows,
        Err(e) => return internal_error(e),
    };

    let data: Vec<RatePoint> = rows
        .into_iter()
        .map(|row| RatePoint {
            date: iso(row.date),
            value: row.middle_rate,
        })
        .collect();

    HttpResponse::Ok().json(data)
}
