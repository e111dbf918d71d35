use std::sync::Arc;

use crate::{auth, auth::AuthState, bill, bill::web::BillState};

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
};

use serde::Serialize;
use tower::ServiceBuilder;
use utoipa::ToSchema;

/// JSON body of a 5xx API response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServerErrorResponse {
    /// Human-readable description of the failure
    pub message: String,
}

impl ServerErrorResponse {
    pub fn new(message: String) -> Self {
        Self { message }
    }
}

/// Creates the API routes for JSON API endpoints.
pub fn create_api_router(auth_state: Arc<AuthState>, bill_state: Arc<BillState>) -> Router {
    let login_router = auth::api::v1::create_api_router(auth_state.clone());
    let bills_router = bill::api::v1::create_api_router(bill_state);
    let protected_routes = bills_router
        .layer(ServiceBuilder::new().layer(from_fn(auth::api::v1::require_auth_middleware)));
    let public_routes = login_router;
    let api_routes = public_routes.merge(protected_routes);
    Router::new()
        .nest("/api/v1", api_routes)
        .layer(ServiceBuilder::new().layer(from_fn_with_state(
            auth_state,
            auth::api::v1::auth_user_middleware,
        )))
}
