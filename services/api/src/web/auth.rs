//! services/api/src/web/auth.rs
//!
//! Authentication and account endpoints.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use retirement_core::{AuthSession, OAuthProvider, PortError, SessionStore};
use std::sync::Arc;
use tracing::{error, info};

use crate::web::{
    dto::{
        AuthResponse, EmailRequest, LoginRequest, OAuthQuery, OAuthResponse, SignupRequest,
        UpdatePasswordRequest, VerifyTokenRequest,
    },
    middleware::session_token,
    port_error, profile_error,
    state::{AppState, UserContext},
    validation::{validate_email, validate_password},
    HandlerError,
};

const CLEAR_SESSION_COOKIE: &str = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";

fn session_cookie(state: &AppState, token: &str) -> String {
    format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        token,
        chrono::Duration::days(state.config.session_ttl_days).num_seconds()
    )
}

/// Loads the profile for a session that was just established and answers with
/// the session cookie.
async fn start_session(
    state: &AppState,
    session: SessionStore,
    auth: AuthSession,
    status: StatusCode,
) -> Result<impl IntoResponse, HandlerError> {
    state
        .open_context(session)
        .await
        .map_err(|e| profile_error("Failed to load profile", e))?;

    let cookie = session_cookie(state, &auth.token);
    Ok((
        status,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::from(&auth.identity)),
    ))
}

fn bad_request(e: retirement_core::ProfileError) -> HandlerError {
    profile_error("Invalid request", e)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let email = validate_email(&req.email).map_err(bad_request)?;
    validate_password(&req.password).map_err(bad_request)?;

    let session = state.new_session();
    let auth = session
        .sign_up(&email, &req.password)
        .await
        .map_err(|e| port_error("Failed to create user", e))?;

    start_session(&state, session, auth, StatusCode::CREATED).await
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let session = state.new_session();
    let auth = session
        .sign_in(req.email.trim(), &req.password)
        .await
        .map_err(|e| match e {
            PortError::Unauthorized | PortError::NotFound(_) => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            ),
            other => port_error("Failed to sign in", other),
        })?;

    start_session(&state, session, auth, StatusCode::OK).await
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HandlerError> {
    let token = session_token(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?
        .to_string();

    let context = state
        .context_for_token(&token)
        .await
        .map_err(|e| profile_error("Failed to logout", e))?;
    let signed_out = match &context {
        Some(context) => context.session.sign_out().await,
        None => state.identity.sign_out(&token).await,
    };
    signed_out.map_err(|e| port_error("Failed to logout", e))?;
    state.drop_context(&token).await;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, CLEAR_SESSION_COOKIE.to_string())],
    ))
}

/// POST /auth/reset-password - Email a password reset link
#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = EmailRequest,
    responses(
        (status = 202, description = "Reset link sent if the address is registered"),
        (status = 400, description = "Invalid email")
    )
)]
pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmailRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let email = validate_email(&req.email).map_err(bad_request)?;
    state
        .new_session()
        .reset_password(&email)
        .await
        .map_err(|e| port_error("Failed to send reset link", e))?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /auth/verify - Redeem a signup or recovery token
#[utoipa::path(
    post,
    path = "/auth/verify",
    request_body = VerifyTokenRequest,
    responses(
        (status = 200, description = "Token accepted, session started", body = AuthResponse),
        (status = 401, description = "Token unknown, used or expired")
    )
)]
pub async fn verify_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyTokenRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let session = state.new_session();
    let auth = session
        .verify_token(req.token.trim())
        .await
        .map_err(|e| port_error("Failed to verify token", e))?;

    start_session(&state, session, auth, StatusCode::OK).await
}

/// POST /auth/resend-verification - Send the signup confirmation again
#[utoipa::path(
    post,
    path = "/auth/resend-verification",
    responses(
        (status = 202, description = "Confirmation sent"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn resend_verification_handler(
    Extension(context): Extension<Arc<UserContext>>,
) -> Result<impl IntoResponse, HandlerError> {
    context
        .session
        .resend_verification()
        .await
        .map_err(|e| port_error("Failed to resend verification", e))?;
    Ok(StatusCode::ACCEPTED)
}

/// GET /auth/oauth/{provider} - Where to send the browser for provider sign-in
#[utoipa::path(
    get,
    path = "/auth/oauth/{provider}",
    params(
        ("provider" = String, Path, description = "`google` or `apple`"),
        ("redirect_to" = String, Query, description = "Where the provider returns the user")
    ),
    responses(
        (status = 200, description = "Provider URL", body = OAuthResponse),
        (status = 400, description = "Unknown provider"),
        (status = 500, description = "OAuth sign-in is not configured")
    )
)]
pub async fn oauth_handler(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(query): Query<OAuthQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let provider = provider
        .parse::<OAuthProvider>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;
    let url = state
        .new_session()
        .sign_in_with_oauth(provider, &query.redirect_to)
        .await
        .map_err(|e| port_error("Failed to start OAuth sign-in", e))?;
    Ok(Json(OAuthResponse { url }))
}

/// GET /auth/me - The signed-in user, fetched fresh from the identity provider
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = AuthResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn me_handler(
    Extension(context): Extension<Arc<UserContext>>,
) -> Result<impl IntoResponse, HandlerError> {
    let identity = context
        .session
        .current_user()
        .await
        .map_err(|e| port_error("Failed to load user", e))?;
    Ok(Json(AuthResponse::from(&identity)))
}

/// PUT /account/password - Change the signed-in user's password
#[utoipa::path(
    put,
    path = "/account/password",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Password too short"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn update_password_handler(
    Extension(context): Extension<Arc<UserContext>>,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_password(&req.new_password).map_err(bad_request)?;
    context
        .session
        .update_password(&req.new_password)
        .await
        .map_err(|e| port_error("Failed to update password", e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /account - Delete the account with all of its data
#[utoipa::path(
    delete,
    path = "/account",
    responses(
        (status = 200, description = "Account deleted"),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Deletion failed part way; it can be retried")
    )
)]
pub async fn delete_account_handler(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<Arc<UserContext>>,
) -> Result<impl IntoResponse, HandlerError> {
    state.delete_account(&context).await.map_err(|e| {
        error!("Account deletion did not finish; the user may retry");
        profile_error("Failed to delete account", e)
    })?;

    info!("Account deleted and session closed");
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, CLEAR_SESSION_COOKIE.to_string())],
    ))
}
