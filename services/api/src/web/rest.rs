//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the profile endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    auth, documents,
    dto::{
        AuthResponse, CompletenessResponse, DocumentResponse, EmailRequest,
        FinancialGoalsPayload, FinancialProfilePayload, LoginRequest, OAuthResponse,
        PersonalInfoPayload, ProfileResponse, ProfileVersionResponse, SignupRequest,
        UpdatePasswordRequest, VerifyTokenRequest,
    },
    profile_error,
    state::UserContext,
    validation::{validate_financial_goals, validate_financial_profile, validate_personal_info},
    HandlerError,
};
use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::reset_password_handler,
        auth::verify_handler,
        auth::resend_verification_handler,
        auth::oauth_handler,
        auth::me_handler,
        auth::update_password_handler,
        auth::delete_account_handler,
        get_profile_handler,
        get_personal_info_handler,
        update_personal_info_handler,
        get_financial_goals_handler,
        update_financial_goals_handler,
        completeness_handler,
        export_handler,
        list_versions_handler,
        restore_version_handler,
        save_financial_profile_handler,
        documents::upload_document_handler,
        documents::list_documents_handler,
    ),
    components(
        schemas(
            SignupRequest, LoginRequest, EmailRequest, VerifyTokenRequest,
            UpdatePasswordRequest, AuthResponse, OAuthResponse,
            PersonalInfoPayload, FinancialGoalsPayload, FinancialProfilePayload,
            ProfileResponse, CompletenessResponse, ProfileVersionResponse, DocumentResponse
        )
    ),
    tags(
        (name = "Retirement Planner API", description = "Account, profile and document endpoints for the retirement planner.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Profile Handlers
//=========================================================================================

/// The cached profile of the signed-in user.
#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "Cached profile", body = ProfileResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_profile_handler(
    Extension(context): Extension<Arc<UserContext>>,
) -> Json<ProfileResponse> {
    let profile = &context.profile;
    Json(ProfileResponse {
        personal_info: profile.personal_info().map(Into::into),
        financial_goals: profile.financial_goals().map(Into::into),
        completeness: profile.completeness(),
    })
}

#[utoipa::path(
    get,
    path = "/profile/personal",
    responses(
        (status = 200, description = "Personal info", body = PersonalInfoPayload),
        (status = 404, description = "Nothing saved yet")
    )
)]
pub async fn get_personal_info_handler(
    Extension(context): Extension<Arc<UserContext>>,
) -> Result<Json<PersonalInfoPayload>, HandlerError> {
    context
        .profile
        .personal_info()
        .map(|info| Json(info.into()))
        .ok_or((StatusCode::NOT_FOUND, "No personal info saved".to_string()))
}

/// Saves the personal info form and records a `personal` version.
#[utoipa::path(
    put,
    path = "/profile/personal",
    request_body = PersonalInfoPayload,
    responses(
        (status = 200, description = "Saved; the new version", body = ProfileVersionResponse),
        (status = 400, description = "Validation failed"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_personal_info_handler(
    Extension(context): Extension<Arc<UserContext>>,
    Json(payload): Json<PersonalInfoPayload>,
) -> Result<Json<ProfileVersionResponse>, HandlerError> {
    let info = validate_personal_info(payload).map_err(|e| profile_error("Invalid request", e))?;
    let version = context
        .profile
        .update_personal_info(info)
        .await
        .map_err(|e| profile_error("Failed to save personal info", e))?;
    version_response(version)
}

#[utoipa::path(
    get,
    path = "/profile/financial",
    responses(
        (status = 200, description = "Financial goals", body = FinancialGoalsPayload),
        (status = 404, description = "Nothing saved yet")
    )
)]
pub async fn get_financial_goals_handler(
    Extension(context): Extension<Arc<UserContext>>,
) -> Result<Json<FinancialGoalsPayload>, HandlerError> {
    context
        .profile
        .financial_goals()
        .map(|goals| Json(goals.into()))
        .ok_or((StatusCode::NOT_FOUND, "No financial goals saved".to_string()))
}

/// Saves the financial goals form and records a `financial` version.
#[utoipa::path(
    put,
    path = "/profile/financial",
    request_body = FinancialGoalsPayload,
    responses(
        (status = 200, description = "Saved; the new version", body = ProfileVersionResponse),
        (status = 400, description = "Validation failed"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_financial_goals_handler(
    Extension(context): Extension<Arc<UserContext>>,
    Json(payload): Json<FinancialGoalsPayload>,
) -> Result<Json<ProfileVersionResponse>, HandlerError> {
    let goals =
        validate_financial_goals(payload).map_err(|e| profile_error("Invalid request", e))?;
    let version = context
        .profile
        .update_financial_goals(goals)
        .await
        .map_err(|e| profile_error("Failed to save financial goals", e))?;
    version_response(version)
}

#[utoipa::path(
    get,
    path = "/profile/completeness",
    responses((status = 200, description = "Completeness, 0 to 100", body = CompletenessResponse))
)]
pub async fn completeness_handler(
    Extension(context): Extension<Arc<UserContext>>,
) -> Json<CompletenessResponse> {
    Json(CompletenessResponse {
        completeness: context.profile.compute_completeness(),
    })
}

/// Downloads the cached profile as a JSON file.
#[utoipa::path(
    get,
    path = "/profile/export",
    responses((status = 200, description = "Profile export", content_type = "application/json"))
)]
pub async fn export_handler(
    Extension(context): Extension<Arc<UserContext>>,
) -> Result<impl IntoResponse, HandlerError> {
    let body = context
        .profile
        .export_snapshot()
        .map_err(|e| profile_error("Failed to export profile", e))?;
    let file_name = format!(
        "retirement-profile-{}.json",
        chrono::Utc::now().format("%Y-%m-%d")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    ))
}

/// Every saved version, newest first.
#[utoipa::path(
    get,
    path = "/profile/versions",
    responses(
        (status = 200, description = "Version history", body = [ProfileVersionResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_versions_handler(
    Extension(context): Extension<Arc<UserContext>>,
) -> Result<Json<Vec<ProfileVersionResponse>>, HandlerError> {
    let versions = context
        .profile
        .list_versions()
        .await
        .map_err(|e| profile_error("Failed to load version history", e))?;
    versions
        .into_iter()
        .map(ProfileVersionResponse::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map(Json)
        .map_err(|e| {
            error!("Failed to encode version history: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load version history".to_string())
        })
}

/// Re-applies a saved version. This records a new version of its own.
#[utoipa::path(
    post,
    path = "/profile/versions/{id}/restore",
    params(("id" = Uuid, Path, description = "The version to restore")),
    responses(
        (status = 200, description = "Restored; the new version", body = ProfileVersionResponse),
        (status = 404, description = "No such version")
    )
)]
pub async fn restore_version_handler(
    Extension(context): Extension<Arc<UserContext>>,
    Path(version_id): Path<Uuid>,
) -> Result<Json<ProfileVersionResponse>, HandlerError> {
    let versions = context
        .profile
        .list_versions()
        .await
        .map_err(|e| profile_error("Failed to load version history", e))?;
    let version = versions
        .into_iter()
        .find(|v| v.id == version_id)
        .ok_or((StatusCode::NOT_FOUND, format!("Version {} not found", version_id)))?;

    let restored = context
        .profile
        .restore_version(&version)
        .await
        .map_err(|e| profile_error("Failed to restore version", e))?;
    info!("Restored version {} as {}", version_id, restored.id);
    version_response(restored)
}

/// Saves the short financial profile form. Not versioned.
#[utoipa::path(
    put,
    path = "/profile/financial-profile",
    request_body = FinancialProfilePayload,
    responses(
        (status = 204, description = "Saved"),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn save_financial_profile_handler(
    Extension(context): Extension<Arc<UserContext>>,
    Json(payload): Json<FinancialProfilePayload>,
) -> Result<StatusCode, HandlerError> {
    let profile =
        validate_financial_profile(payload).map_err(|e| profile_error("Invalid request", e))?;
    context
        .profile
        .save_financial_profile(&profile)
        .await
        .map_err(|e| profile_error("Failed to save financial profile", e))?;
    Ok(StatusCode::NO_CONTENT)
}

fn version_response(
    version: retirement_core::ProfileVersion,
) -> Result<Json<ProfileVersionResponse>, HandlerError> {
    ProfileVersionResponse::try_from(version)
        .map(Json)
        .map_err(|e| profile_error("Failed to encode version", e.into()))
}
