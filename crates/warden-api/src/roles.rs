use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use warden_types::api::CreateSelfRoleRequest;
use warden_types::events::GatewayEvent;

use crate::error::ApiError;
use crate::{AppState, run_blocking};

pub async fn list_self_roles(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let roles = run_blocking(move || db.db.list_self_roles(&guild_id)).await?;
    Ok(Json(roles))
}

/// The service performs the lookup and the insert in one transaction; a
/// duplicate role comes back as Conflict whether the lookup caught it or the
/// unique index did.
pub async fn create_self_role(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
    Json(req): Json<CreateSelfRoleRequest>,
) -> Result<impl IntoResponse + std::fmt::Debug, ApiError> {
    let db = state.clone();
    let role = run_blocking(move || db.db.create_self_role(&guild_id, &req.role_id)).await?;

    state
        .dispatcher
        .publish(GatewayEvent::SelfRoleCreate { role: role.clone() });
    Ok((StatusCode::CREATED, Json(role)))
}

pub async fn delete_self_role(
    State(state): State<AppState>,
    Path((guild_id, role_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let gid = guild_id.clone();
    let rid = role_id.clone();
    run_blocking(move || db.db.delete_self_role(&gid, &rid)).await?;

    state.dispatcher.publish(GatewayEvent::SelfRoleDelete {
        guild_id: guild_id.clone(),
        role_id: role_id.clone(),
    });
    Ok(Json(json!({ "guild_id": guild_id, "role_id": role_id })))
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
        Arc::new(crate::AppStateInner {
            db,
            dispatcher: Dispatcher::new(),
            jwt_secret: "test-secret".into(),
        })
    }

    fn req(role_id: &str) -> Json<CreateSelfRoleRequest> {
        Json(CreateSelfRoleRequest {
            role_id: role_id.into(),
        })
    }

    #[tokio::test]
    async fn second_identical_creation_conflicts_with_one_row_stored() {
        let state = state();
        let mut rx = state.dispatcher.subscribe();

        let response = create_self_role(State(state.clone()), Path("g1".into()), req("r1"))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let err = create_self_role(State(state.clone()), Path("g1".into()), req("r1"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        // Exactly one stored row, exactly one published event.
        let roles = state.db.list_self_roles("g1").unwrap();
        assert_eq!(roles.len(), 1);
        assert!(matches!(
            rx.recv().await.unwrap(),
            GatewayEvent::SelfRoleCreate { .. }
        ));
        assert!(rx.try_recv().is_err());
    }
}
