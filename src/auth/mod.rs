use askama::Template;
use axum::Router;
use axum::extract::{Form, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use jsonwebtoken::encode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;

pub mod api;

/// Role of a connected user. Drives which parts of the app are rendered and
/// tags new bill submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employee,
    Admin,
}

/// Represents the currently connected user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn new(email: String, role: Role) -> Self {
        Self { email, role }
    }
}

/// Authentication state containing admin credentials and the JWT secret.
#[derive(Clone)]
pub struct AuthState {
    pub admin_email: String,
    pub admin_password: String,
    pub jwt_secret: String,
}

impl AuthState {
    /// Creates a new AuthState from the application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            admin_email: config.admin_email.clone(),
            admin_password: config.admin_password.clone(),
            jwt_secret: config.jwt_secret.clone(),
        }
    }
}

/// Creates a login router with authentication routes.
pub fn create_login_router(state: Arc<AuthState>) -> Router<()> {
    Router::new()
        .route("/login", axum::routing::get(login_page_handler))
        .route("/login", axum::routing::post(login_handler))
        .with_state(state)
}

/// Authentication middleware that checks for a valid session cookie and sets
/// the CurrentUser extension. It never redirects by itself.
pub async fn auth_user_middleware(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token_cookie) = jar.get("auth_token") {
        if let Ok(claims) = decode_jwt(token_cookie.value(), &state.jwt_secret) {
            let current_user = CurrentUser::new(claims.email, claims.role);
            request.extensions_mut().insert(current_user);
        }
    }

    next.run(request).await
}

/// Redirects unauthenticated users to the login page. Must run after
/// `auth_user_middleware` so the CurrentUser extension is populated.
pub async fn login_redirect_middleware(request: Request, next: Next) -> Response {
    let is_authenticated = request.extensions().get::<CurrentUser>().is_some();

    if !is_authenticated {
        return Redirect::to("/login").into_response();
    }

    next.run(request).await
}

/// Represents the login form payload.
#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Claims {
    pub exp: usize,
    pub iat: usize,
    pub email: String,
    pub role: Role,
}

/// Custom error type for authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Represents an error during template rendering.
    #[error("Template rendering failed")]
    Template(#[from] askama::Error),
    /// Represents an error during JWT operations.
    #[error("JWT operation failed")]
    JwtError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let user_facing_error_message =
            "Une erreur inattendue est survenue. Veuillez réessayer plus tard.";
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(format!(
                "<h1>Erreur interne</h1><p>{}</p>",
                user_facing_error_message
            )),
        )
            .into_response()
    }
}

/// Resolves the role granted to a credential pair, or None when the
/// credentials are not acceptable.
///
/// Authentication proper is delegated to an external service in production;
/// here the configured admin credentials open the admin dashboard and any
/// well-formed email with a non-empty password connects as an employee.
fn resolve_role(state: &AuthState, payload: &LoginRequest) -> Option<Role> {
    if payload.email == state.admin_email && payload.password == state.admin_password {
        return Some(Role::Admin);
    }
    if payload.email.contains('@') && !payload.password.is_empty() {
        return Some(Role::Employee);
    }
    None
}

/// Handles the login request: on acceptable credentials, sets the session
/// cookie and redirects into the bills view; otherwise re-renders the login
/// page with an error message.
#[tracing::instrument(skip(state, jar, payload), fields(email = %payload.email))]
pub async fn login_handler(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
    Form(payload): Form<LoginRequest>,
) -> Result<(CookieJar, Response), AuthError> {
    let Some(role) = resolve_role(&state, &payload) else {
        let html = LoginTemplate {
            error: Some("Identifiants incorrects".to_string()),
        }
        .render()
        .map_err(AuthError::from)?;
        return Ok((
            jar,
            (StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response(),
        ));
    };

    let jwt_token =
        encode_jwt(payload.email.clone(), role, &state.jwt_secret).map_err(|_| AuthError::JwtError)?;

    let cookie = axum_extra::extract::cookie::Cookie::build(("auth_token", jwt_token))
        .http_only(true)
        .secure(false) // Set to true in production with HTTPS
        .same_site(axum_extra::extract::cookie::SameSite::Lax)
        .max_age(time::Duration::hours(24))
        .path("/")
        .build();

    let updated_jar = jar.add(cookie);

    Ok((updated_jar, Redirect::to("/bills").into_response()))
}

pub fn encode_jwt(email: String, role: Role, jwt_secret: &str) -> anyhow::Result<String> {
    let now = chrono::Utc::now();
    let expire = chrono::Duration::hours(24);
    let exp = (now + expire).timestamp() as usize;
    let iat = now.timestamp() as usize;
    let claims = Claims {
        exp,
        iat,
        email,
        role,
    };
    let jwt = encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_bytes()),
    )?;
    Ok(jwt)
}

pub fn decode_jwt(token: &str, jwt_secret: &str) -> anyhow::Result<Claims> {
    let token_data = jsonwebtoken::decode(
        token,
        &jsonwebtoken::DecodingKey::from_secret(jwt_secret.as_bytes()),
        &jsonwebtoken::Validation::default(),
    )?;
    Ok(token_data.claims)
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
}

/// Handles GET requests to display the login page.
#[tracing::instrument]
pub async fn login_page_handler() -> Result<Html<String>, AuthError> {
    let template = LoginTemplate { error: None };
    template.render().map(Html).map_err(AuthError::from)
}
