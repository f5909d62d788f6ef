#[path = "../../../crates/retirement_core/tests/common/mod.rs"]
mod common;

use api_lib::{config::Config, web::state::AppState};
use chrono::{Duration, Utc};
use common::{complete_personal_info, signed_in, InMemoryGateway};
use retirement_core::{AuthSession, ProfileError, SessionStore};
use std::sync::Arc;

fn app_state(gateway: &Arc<InMemoryGateway>) -> AppState {
    let config = Config::from_lookup(|key| {
        (key == "DATABASE_URL").then(|| "postgres://localhost/planner".to_string())
    })
    .unwrap();
    AppState::new(Arc::new(config), gateway.clone(), gateway.clone(), gateway.clone())
}

#[tokio::test]
async fn deleting_an_account_closes_the_contexts_of_every_device() {
    let (gateway, laptop, identity) = signed_in().await;
    let state = app_state(&gateway);

    let phone = state.new_session();
    phone
        .sign_in("saver@example.com", "correct horse battery")
        .await
        .unwrap();

    let laptop = state.open_context(laptop).await.unwrap();
    let phone = state.open_context(phone).await.unwrap();
    assert_eq!(state.context_count().await, 2);
    let (_phone_sub, mut phone_sessions) = phone.session.updates();

    state.delete_account(&laptop).await.unwrap();

    assert!(!gateway.user_exists(identity.id));
    assert_eq!(state.context_count().await, 0);
    assert!(state.context_for_token(&phone.token).await.unwrap().is_none());

    // A handle kept from before the deletion can no longer write.
    let err = phone
        .profile
        .update_personal_info(complete_personal_info())
        .await
        .unwrap_err();
    assert!(matches!(err, ProfileError::NotAuthenticated));
    assert_eq!(gateway.row_count(identity.id), 0);

    assert!(phone_sessions.recv().await.unwrap().is_some());
    assert!(phone_sessions.recv().await.unwrap().is_none());
}

#[tokio::test]
async fn opening_a_context_sweeps_expired_ones() {
    let (gateway, session, identity) = signed_in().await;
    let state = app_state(&gateway);

    let stale = SessionStore::new(gateway.clone());
    stale.on_session_changed(Some(AuthSession {
        token: "expired-token".to_string(),
        identity,
        expires_at: Utc::now() - Duration::minutes(1),
    }));
    state.open_context(stale).await.unwrap();
    assert_eq!(state.context_count().await, 1);

    let live = state.open_context(session).await.unwrap();

    assert_eq!(state.context_count().await, 1);
    assert!(state.context_for_token(&live.token).await.unwrap().is_some());
    assert!(state.context_for_token("expired-token").await.unwrap().is_none());
}
