use axum::Router;
use axum::response::Response;
use std::sync::Arc;

use billed_server::auth::{CurrentUser, Role};
use billed_server::bill::web::{BillState, create_bill_router};
use billed_server::store::BillStore;

/// Allow multiple calls to init for tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().try_init();
}

/// Builds the bill router on top of the given store, with an employee
/// session already attached the way the auth middleware would.
pub fn bill_app(store: Arc<dyn BillStore>) -> Router {
    init_tracing();
    let state = Arc::new(BillState { store });
    create_bill_router(state).layer(axum::Extension(CurrentUser::new(
        "employee@billed.fr".to_string(),
        Role::Employee,
    )))
}

/// Reads the full response body as UTF-8 text.
pub async fn body_text(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}
