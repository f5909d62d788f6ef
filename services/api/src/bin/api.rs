//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{FsBlobAdapter, DbAdapter, PgIdentityAdapter},
    config::Config,
    error::ApiError,
    web::{
        auth::{
            delete_account_handler, login_handler, logout_handler, me_handler, oauth_handler,
            resend_verification_handler, reset_password_handler, signup_handler,
            update_password_handler, verify_handler,
        },
        documents::{list_documents_handler, upload_document_handler},
        middleware::require_auth,
        rest::{
            completeness_handler, export_handler, get_financial_goals_handler,
            get_personal_info_handler, get_profile_handler, list_versions_handler,
            restore_version_handler, save_financial_profile_handler,
            update_financial_goals_handler, update_personal_info_handler, ApiDoc,
        },
        state::AppState,
        ws_handler,
    },
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Gateway Adapters ---
    let identity_adapter = Arc::new(PgIdentityAdapter::new(
        db_pool,
        chrono::Duration::days(config.session_ttl_days),
        config.oauth_authorize_url.clone(),
    ));
    let blob_adapter = Arc::new(FsBlobAdapter::new(config.storage_path.clone()));
    info!("Blob storage rooted at {}", config.storage_path.display());

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        config.clone(),
        identity_adapter,
        db_adapter,
        blob_adapter,
    ));

    // --- 5. CORS ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/reset-password", post(reset_password_handler))
        .route("/auth/verify", post(verify_handler))
        .route("/auth/oauth/{provider}", get(oauth_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(me_handler))
        .route("/auth/resend-verification", post(resend_verification_handler))
        .route("/account/password", put(update_password_handler))
        .route("/account", delete(delete_account_handler))
        .route("/profile", get(get_profile_handler))
        .route(
            "/profile/personal",
            get(get_personal_info_handler).put(update_personal_info_handler),
        )
        .route(
            "/profile/financial",
            get(get_financial_goals_handler).put(update_financial_goals_handler),
        )
        .route("/profile/completeness", get(completeness_handler))
        .route("/profile/export", get(export_handler))
        .route("/profile/versions", get(list_versions_handler))
        .route("/profile/versions/{id}/restore", post(restore_version_handler))
        .route("/profile/financial-profile", put(save_financial_profile_handler))
        .route(
            "/documents",
            get(list_documents_handler).post(upload_document_handler),
        )
        .route("/profile/ws", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
