use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use warden_types::api::{CreateModerationRequest, CreateUserRequest, UpdateUserRequest};
use warden_types::events::GatewayEvent;

use crate::error::ApiError;
use crate::{AppState, run_blocking};

pub async fn list_users(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let users = run_blocking(move || db.db.list_users(&guild_id)).await?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path((guild_id, user_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user = run_blocking(move || db.db.get_user(&guild_id, &user_id)).await?;
    Ok(Json(user))
}

pub async fn create_user(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user =
        run_blocking(move || db.db.create_user(&guild_id, &req.user_id, &req.display_name))
            .await?;

    state
        .dispatcher
        .publish(GatewayEvent::UserCreate { user: user.clone() });
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path((guild_id, user_id)): Path<(String, String)>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user =
        run_blocking(move || db.db.update_user(&guild_id, &user_id, &req.display_name)).await?;

    state
        .dispatcher
        .publish(GatewayEvent::UserUpdate { user: user.clone() });
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path((guild_id, user_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let gid = guild_id.clone();
    let uid = user_id.clone();
    run_blocking(move || db.db.delete_user(&gid, &uid)).await?;

    state.dispatcher.publish(GatewayEvent::UserDelete {
        guild_id: guild_id.clone(),
        user_id: user_id.clone(),
    });
    Ok(Json(json!({ "guild_id": guild_id, "user_id": user_id })))
}

// -- Moderation --

pub async fn list_warnings(
    State(state): State<AppState>,
    Path((guild_id, user_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let warnings = run_blocking(move || db.db.list_warnings(&guild_id, &user_id)).await?;
    Ok(Json(warnings))
}

pub async fn create_warning(
    State(state): State<AppState>,
    Path((guild_id, user_id)): Path<(String, String)>,
    Json(req): Json<CreateModerationRequest>,
) -> Result<impl IntoResponse + std::fmt::Debug, ApiError> {
    let db = state.clone();
    let warning = run_blocking(move || {
        db.db
            .create_warning(&guild_id, &user_id, &req.issuer_id, &req.reason)
    })
    .await?;

    state.dispatcher.publish(GatewayEvent::WarningCreate {
        warning: warning.clone(),
    });
    Ok((StatusCode::CREATED, Json(warning)))
}

pub async fn list_kicks(
    State(state): State<AppState>,
    Path((guild_id, user_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let kicks = run_blocking(move || db.db.list_kicks(&guild_id, &user_id)).await?;
    Ok(Json(kicks))
}

pub async fn create_kick(
    State(state): State<AppState>,
    Path((guild_id, user_id)): Path<(String, String)>,
    Json(req): Json<CreateModerationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let kick = run_blocking(move || {
        db.db
            .create_kick(&guild_id, &user_id, &req.issuer_id, &req.reason)
    })
    .await?;

    state
        .dispatcher
        .publish(GatewayEvent::KickCreate { kick: kick.clone() });
    Ok((StatusCode::CREATED, Json(kick)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use warden_db::Database;
    use warden_gateway::dispatcher::Dispatcher;

    fn state() -> AppState {
        let db = Database::open_in_memory().unwrap();
        db.create_guild("g1", "Guild One", "owner1", None).unwrap();
        db.create_user("g1", "u1", "Alice").unwrap();
        db.create_user("g1", "mod", "Mod").unwrap();
        Arc::new(crate::AppStateInner {
            db,
            dispatcher: Dispatcher::new(),
            jwt_secret: "test-secret".into(),
        })
    }

    #[tokio::test]
    async fn warning_against_unknown_issuer_is_404_and_silent() {
        let state = state();
        let mut rx = state.dispatcher.subscribe();

        let err = create_warning(
            State(state),
            Path(("g1".into(), "u1".into())),
            Json(CreateModerationRequest {
                issuer_id: "ghost".into(),
                reason: "spam".into(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn accepted_warning_publishes_the_committed_record() {
        let state = state();
        let mut rx = state.dispatcher.subscribe();

        create_warning(
            State(state),
            Path(("g1".into(), "u1".into())),
            Json(CreateModerationRequest {
                issuer_id: "mod".into(),
                reason: "spam".into(),
            }),
        )
        .await
        .unwrap();

        match rx.recv().await.unwrap() {
            GatewayEvent::WarningCreate { warning } => {
                assert_eq!(warning.guild_id, "g1");
                assert_eq!(warning.user_id, "u1");
                assert_eq!(warning.issuer_id, "mod");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
