use axum::http::HeaderName;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::Redirect;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthState, auth_user_middleware, create_login_router, login_redirect_middleware};
use crate::bill::web::{BillState, create_bill_router};
use crate::config::Config;
use crate::store::memory::MemoryStore;

pub mod api;

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    use axum::Router;

    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let auth_state = Arc::new(AuthState::from_config(&config));
    let bill_state = Arc::new(BillState {
        store: Arc::new(MemoryStore::seeded()),
    });

    let login_router = create_login_router(auth_state.clone());
    let bill_router = create_bill_router(bill_state.clone());
    let api_router = api::create_api_router(auth_state.clone(), bill_state);

    let protected_routes = Router::new().merge(bill_router).layer(
        ServiceBuilder::new()
            .layer(from_fn_with_state(auth_state.clone(), auth_user_middleware))
            .layer(from_fn(login_redirect_middleware)),
    );

    let public_routes = Router::new()
        .route("/health", axum::routing::get(health_check_handler))
        .route("/", axum::routing::get(root_handler))
        .merge(login_router)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(auth_state.clone(), auth_user_middleware)),
        );

    let app = Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .merge(api_router)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::new().expose_headers([
                    HeaderName::from_static("hx-retarget"),
                    HeaderName::from_static("hx-reswap"),
                ])),
        );

    axum::serve(listener, app).await?;
    Ok(())
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}

/// The app opens on the bills view; the login redirect middleware bounces
/// visitors without a session to /login.
#[tracing::instrument]
pub async fn root_handler() -> Redirect {
    Redirect::to("/bills")
}
