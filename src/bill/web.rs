use askama::Template;
use axum::{
    Router,
    extract::{Extension, Multipart, Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::bill::{
    Bill, BillService, BillServiceError, NewBillDraft, format_date, is_displayable_image,
};
use crate::store::{BillStore, StoreError};

/// Custom error type for bill handler operations.
#[derive(Debug, thiserror::Error)]
enum BillError {
    /// Represents an error during template rendering.
    #[error("Template rendering failed")]
    Template(#[from] askama::Error),
    /// Represents a bill service error; its message is user-facing.
    #[error("{0}")]
    Service(#[from] BillServiceError),
    /// Represents an unreadable multipart submission.
    #[error("Le formulaire est invalide")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
    /// Represents a form field that did not parse.
    #[error("Le champ '{0}' est invalide")]
    InvalidField(&'static str),
}

impl BillError {
    fn status_code(&self) -> StatusCode {
        match self {
            BillError::Service(BillServiceError::Store(store_err)) => {
                StatusCode::from_u16(store_err.status()).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            BillError::Service(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BillError::Multipart(_) | BillError::InvalidField(_) => StatusCode::BAD_REQUEST,
            BillError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn user_facing_message(&self) -> String {
        match self {
            BillError::Template(_) => {
                "Une erreur inattendue est survenue. Veuillez réessayer plus tard.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for BillError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_template = ErrorMessageTemplate::new(self.user_facing_message());
        let Ok(rendered) = error_template.render() else {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        };

        let mut response = (status_code, Html(rendered)).into_response();
        // HTMX swaps the error fragment into the requesting target.
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("hx-reswap"),
            HeaderValue::from_static("innerHTML"),
        );
        response.headers_mut().extend(headers);
        response
    }
}

/// A bill prepared for display in the table.
struct BillRow {
    id: String,
    expense_type: String,
    name: String,
    date: String,
    date_display: String,
    amount_display: String,
    status_label: &'static str,
    status_class: &'static str,
}

impl From<Bill> for BillRow {
    fn from(bill: Bill) -> Self {
        Self {
            date_display: format_date(&bill.date),
            amount_display: format!("{} €", bill.amount),
            status_label: bill.status.label(),
            status_class: bill.status.badge_class(),
            id: bill.id,
            expense_type: bill.expense_type,
            name: bill.name,
            date: bill.date,
        }
    }
}

#[derive(Template)]
#[template(path = "bills.html")]
struct BillsPageTemplate {
    active_icon: &'static str,
}

impl BillsPageTemplate {
    pub fn new() -> Self {
        Self {
            active_icon: "window",
        }
    }
}

#[derive(Template)]
#[template(path = "bills/bills_table.html")]
struct BillsTableTemplate {
    bills: Vec<BillRow>,
}

impl BillsTableTemplate {
    pub fn new(bills: Vec<BillRow>) -> Self {
        Self { bills }
    }
}

#[derive(Template)]
#[template(path = "bills/error_message.html")]
struct ErrorMessageTemplate {
    message: String,
}

impl ErrorMessageTemplate {
    pub fn new(message: String) -> Self {
        Self { message }
    }
}

#[derive(Template)]
#[template(path = "bills/receipt_modal.html")]
struct ReceiptModalTemplate {
    file_url: String,
    file_name: String,
    is_image: bool,
}

impl ReceiptModalTemplate {
    pub fn new(bill: &Bill) -> Self {
        Self {
            file_url: bill.file_url.clone(),
            file_name: bill.file_name.clone(),
            is_image: is_displayable_image(&bill.file_name),
        }
    }
}

#[derive(Template)]
#[template(path = "new_bill.html")]
struct NewBillPageTemplate {
    active_icon: &'static str,
    error: Option<String>,
}

impl NewBillPageTemplate {
    pub fn new(error: Option<String>) -> Self {
        Self {
            active_icon: "mail",
            error,
        }
    }
}

#[derive(Clone)]
pub struct BillState {
    pub store: Arc<dyn BillStore>,
}

/// Handler for the /bills endpoint that displays the bills page shell.
/// The table itself is loaded as a fragment so store failures surface inside
/// the page instead of replacing it.
#[tracing::instrument]
async fn bills_page_handler() -> Result<Html<String>, BillError> {
    let template = BillsPageTemplate::new();
    template.render().map(Html).map_err(BillError::from)
}

/// Handler for GET /bills/table that returns the bills table fragment,
/// ordered most recent first.
#[tracing::instrument(skip(state))]
async fn bills_table_handler(
    State(state): State<Arc<BillState>>,
) -> Result<Html<String>, BillError> {
    let service = BillService::new(state.store.as_ref());
    let bills = service.list_bills().await?;
    let rows = bills.into_iter().map(BillRow::from).collect();
    let template = BillsTableTemplate::new(rows);
    template.render().map(Html).map_err(BillError::from)
}

/// Handler for GET /bills/{id}/receipt that returns the receipt preview
/// modal fragment for one bill.
#[tracing::instrument(skip(state))]
async fn receipt_modal_handler(
    State(state): State<Arc<BillState>>,
    Path(id): Path<String>,
) -> Result<Html<String>, BillError> {
    let service = BillService::new(state.store.as_ref());
    let bill = service.find_bill(&id).await?;
    let template = ReceiptModalTemplate::new(&bill);
    template.render().map(Html).map_err(BillError::from)
}

/// Handler for GET /bills/new that displays the new bill form.
#[tracing::instrument]
async fn new_bill_page_handler() -> Result<Html<String>, BillError> {
    let template = NewBillPageTemplate::new(None);
    template.render().map(Html).map_err(BillError::from)
}

/// Handler for POST /bills: reads the multipart form, submits the bill
/// through the store, and redirects back to the bills list. A rejected
/// submission re-renders the form page with the error message instead of
/// replacing it with a bare error page.
#[tracing::instrument(skip(state, multipart), fields(email = %user.email))]
async fn create_bill_handler(
    State(state): State<Arc<BillState>>,
    Extension(user): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<Response, BillError> {
    let draft = read_new_bill_form(user.email, multipart).await?;
    let service = BillService::new(state.store.as_ref());

    match service.submit_bill(draft).await {
        Ok(_) => Ok(Redirect::to("/bills").into_response()),
        Err(err) => {
            // Keep the form on screen with the failure message above it.
            let err = BillError::from(err);
            let status_code = err.status_code();
            let template = NewBillPageTemplate::new(Some(err.user_facing_message()));
            let rendered = template.render().map_err(BillError::from)?;
            Ok((status_code, Html(rendered)).into_response())
        }
    }
}

/// Collects the new-bill form fields out of a multipart submission.
async fn read_new_bill_form(
    email: String,
    mut multipart: Multipart,
) -> Result<NewBillDraft, BillError> {
    let mut expense_type = String::new();
    let mut name = String::new();
    let mut date = String::new();
    let mut amount_raw = String::new();
    let mut vat = String::new();
    let mut pct_raw = String::new();
    let mut commentary = String::new();
    let mut file_name = String::new();
    let mut content_type = None;
    let mut file_bytes = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "expense-type" => expense_type = field.text().await?,
            "expense-name" => name = field.text().await?,
            "datepicker" => date = field.text().await?,
            "amount" => amount_raw = field.text().await?,
            "vat" => vat = field.text().await?,
            "pct" => pct_raw = field.text().await?,
            "commentary" => commentary = field.text().await?,
            "file" => {
                file_name = field.file_name().unwrap_or_default().to_string();
                content_type = field.content_type().map(|mime| mime.to_string());
                file_bytes = field.bytes().await?.to_vec();
            }
            _ => {}
        }
    }

    let amount = amount_raw
        .trim()
        .parse::<f64>()
        .map_err(|_| BillError::InvalidField("amount"))?;
    // The reimbursement percentage defaults to 20 when left blank.
    let pct = if pct_raw.trim().is_empty() {
        20
    } else {
        pct_raw
            .trim()
            .parse::<u32>()
            .map_err(|_| BillError::InvalidField("pct"))?
    };

    Ok(NewBillDraft {
        email,
        expense_type,
        name,
        amount,
        date,
        vat,
        pct,
        commentary,
        file_name,
        content_type,
        file_bytes,
    })
}

/// Creates and returns the bill router with all bill-related routes.
pub fn create_bill_router(state: Arc<BillState>) -> Router {
    Router::new()
        .route(
            "/bills",
            get(bills_page_handler).post(create_bill_handler),
        )
        .route("/bills/table", get(bills_table_handler))
        .route("/bills/new", get(new_bill_page_handler))
        .route("/bills/{id}/receipt", get(receipt_modal_handler))
        .with_state(state)
}
