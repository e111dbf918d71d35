use crate::bill::web::BillState;
use crate::bill::{Bill, BillService, BillStatus};
use crate::web::api::ServerErrorResponse;
use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// JSON representation of a bill for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BillJson {
    /// Unique identifier for the bill
    id: String,
    /// Email of the employee who submitted the bill
    email: String,
    /// Expense category
    #[serde(rename = "type")]
    expense_type: String,
    /// Name of the expense
    name: String,
    /// Amount in euros
    amount: f64,
    /// Date of the expense (ISO string)
    date: String,
    /// VAT amount
    vat: String,
    /// Reimbursement percentage
    pct: u32,
    /// Free-form commentary
    commentary: String,
    /// URL of the stored receipt file
    file_url: String,
    /// Name of the stored receipt file
    file_name: String,
    /// Review status: pending, accepted or refused
    status: BillStatus,
}

impl From<Bill> for BillJson {
    fn from(bill: Bill) -> Self {
        Self {
            id: bill.id,
            email: bill.email,
            expense_type: bill.expense_type,
            name: bill.name,
            amount: bill.amount,
            date: bill.date,
            vat: bill.vat,
            pct: bill.pct,
            commentary: bill.commentary,
            file_url: bill.file_url,
            file_name: bill.file_name,
            status: bill.status,
        }
    }
}

/// API response for listing bills.
#[derive(Debug, Serialize, ToSchema)]
pub struct BillsResponse {
    /// List of bills, most recent first
    bills: Vec<BillJson>,
    /// Total number of bills
    count: usize,
}

/// Query parameters for filtering bills by submitter.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BillsQuery {
    /// Optional email to filter bills by
    #[serde(default)]
    email: Option<String>,
}

/// Handler for GET /api/v1/bills - Returns all bills in JSON format.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/bills",
    params(
        ("email" = Option<String>, Query, description = "Optional email to filter bills by")
    ),
    responses(
        (status = 200, description = "Successfully retrieved bills", body = BillsResponse),
        (status = 500, description = "Internal server error", body = ServerErrorResponse)
    ),
    tag = "Bills"
)]
pub async fn get_bills_handler(
    State(state): State<Arc<BillState>>,
    Query(query): Query<BillsQuery>,
) -> Result<Json<BillsResponse>, (StatusCode, Json<ServerErrorResponse>)> {
    let service = BillService::new(state.store.as_ref());

    match service.list_bills().await {
        Ok(bills) => {
            let json_bills: Vec<BillJson> = bills
                .into_iter()
                .filter(|bill| match &query.email {
                    Some(email) => &bill.email == email,
                    None => true,
                })
                .map(BillJson::from)
                .collect();
            let count = json_bills.len();

            Ok(Json(BillsResponse {
                bills: json_bills,
                count,
            }))
        }
        Err(err) => {
            tracing::error!("Failed to get bills: {}", err);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ServerErrorResponse::new(
                    "Failed to retrieve bills".to_string(),
                )),
            ))
        }
    }
}

/// Creates and returns the bills API router.
pub fn create_api_router(state: Arc<BillState>) -> Router {
    Router::new()
        .route("/bills", get(get_bills_handler))
        .with_state(state)
}
