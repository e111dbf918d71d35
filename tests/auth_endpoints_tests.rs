use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::middleware::{from_fn, from_fn_with_state};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower::ServiceExt;

use billed_server::auth::{
    AuthState, Role, auth_user_middleware, create_login_router, encode_jwt,
    login_redirect_middleware,
};
use billed_server::bill::web::{BillState, create_bill_router};
use billed_server::store::memory::MemoryStore;

mod common;

use common::body_text;

const JWT_SECRET: &str = "test_secret";

fn auth_state() -> Arc<AuthState> {
    Arc::new(AuthState {
        admin_email: "admin@billed.fr".to_string(),
        admin_password: "admin_password".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
    })
}

/// Assembles the login router and the protected bill routes the way
/// `start_web_server` does.
fn app() -> Router {
    common::init_tracing();
    let auth_state = auth_state();
    let bill_state = Arc::new(BillState {
        store: Arc::new(MemoryStore::seeded()),
    });

    let protected_routes = Router::new().merge(create_bill_router(bill_state)).layer(
        ServiceBuilder::new()
            .layer(from_fn_with_state(auth_state.clone(), auth_user_middleware))
            .layer(from_fn(login_redirect_middleware)),
    );

    let public_routes = Router::new()
        .merge(create_login_router(auth_state.clone()))
        .layer(ServiceBuilder::new().layer(from_fn_with_state(auth_state, auth_user_middleware)));

    Router::new().merge(protected_routes).merge(public_routes)
}

#[tokio::test]
async fn login_page_shows_the_login_form() {
    let response = app()
        .oneshot(Request::builder().uri("/login").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("id=\"form-login\""));
    assert!(body.contains("name=\"email\""));
    assert!(body.contains("name=\"password\""));
}

#[tokio::test]
async fn unauthenticated_bills_request_redirects_to_login() {
    let response = app()
        .oneshot(Request::builder().uri("/bills").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get("location").unwrap(), "/login");
}

#[tokio::test]
async fn employee_login_sets_session_cookie_and_redirects_to_bills() {
    let form_data = "email=employee%40billed.fr&password=azerty";
    let request = Request::builder()
        .method(Method::POST)
        .uri("/login")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(form_data))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get("location").unwrap(), "/bills");
    let cookie = response
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("auth_token="));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn rejected_login_rerenders_the_form_with_an_error() {
    let form_data = "email=not-an-email&password=azerty";
    let request = Request::builder()
        .method(Method::POST)
        .uri("/login")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(form_data))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_text(response).await;
    assert!(body.contains("Identifiants incorrects"));
    assert!(body.contains("id=\"form-login\""));
}

#[tokio::test]
async fn session_cookie_grants_access_to_the_bills_page() {
    let token = encode_jwt("employee@billed.fr".to_string(), Role::Employee, JWT_SECRET).unwrap();

    let request = Request::builder()
        .uri("/bills")
        .header("cookie", format!("auth_token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Mes notes de frais"));
}

#[tokio::test]
async fn forged_session_cookie_is_ignored() {
    let token = encode_jwt("intruder@billed.fr".to_string(), Role::Admin, "other_secret").unwrap();

    let request = Request::builder()
        .uri("/bills")
        .header("cookie", format!("auth_token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get("location").unwrap(), "/login");
}
