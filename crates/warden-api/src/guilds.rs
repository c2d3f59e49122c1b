use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use warden_types::api::{CreateGuildRequest, UpdateGuildRequest};
use warden_types::events::GatewayEvent;

use crate::error::ApiError;
use crate::{AppState, run_blocking};

pub async fn list_guilds(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let guilds = run_blocking(move || db.db.list_guilds()).await?;
    Ok(Json(guilds))
}

pub async fn get_guild(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Result<impl IntoResponse + std::fmt::Debug, ApiError> {
    let db = state.clone();
    let graph = run_blocking(move || db.db.get_guild(&guild_id)).await?;
    match graph {
        Some(graph) => Ok(Json(graph)),
        None => Err(ApiError::not_found("guild")),
    }
}

pub async fn create_guild(
    State(state): State<AppState>,
    Json(req): Json<CreateGuildRequest>,
) -> Result<impl IntoResponse + std::fmt::Debug, ApiError> {
    let db = state.clone();
    let guild = run_blocking(move || {
        db.db
            .create_guild(&req.id, &req.name, &req.owner_id, req.icon_url.as_deref())
    })
    .await?;

    state
        .dispatcher
        .publish(GatewayEvent::GuildCreate { guild: guild.clone() });
    Ok((StatusCode::CREATED, Json(guild)))
}

pub async fn update_guild(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
    Json(req): Json<UpdateGuildRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let guild = run_blocking(move || {
        db.db
            .update_guild(&guild_id, &req.name, &req.owner_id, req.icon_url.as_deref())
    })
    .await?;

    state
        .dispatcher
        .publish(GatewayEvent::GuildUpdate { guild: guild.clone() });
    Ok(Json(guild))
}

pub async fn delete_guild(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Result<impl IntoResponse + std::fmt::Debug, ApiError> {
    let db = state.clone();
    let gid = guild_id.clone();
    run_blocking(move || db.db.delete_guild(&gid)).await?;

    state.dispatcher.publish(GatewayEvent::GuildDelete {
        guild_id: guild_id.clone(),
    });
    Ok(Json(json!({ "guild_id": guild_id })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use warden_db::Database;
    use warden_gateway::dispatcher::Dispatcher;

    fn state() -> AppState {
        Arc::new(crate::AppStateInner {
            db: Database::open_in_memory().unwrap(),
            dispatcher: Dispatcher::new(),
            jwt_secret: "test-secret".into(),
        })
    }

    fn create_req(id: &str) -> CreateGuildRequest {
        CreateGuildRequest {
            id: id.into(),
            name: format!("Guild {id}"),
            owner_id: "owner".into(),
            icon_url: None,
        }
    }

    #[tokio::test]
    async fn create_publishes_exactly_one_event() {
        let state = state();
        let mut rx = state.dispatcher.subscribe();

        let response = create_guild(State(state.clone()), Json(create_req("g1")))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, GatewayEvent::GuildCreate { ref guild } if guild.id == "g1"));
        assert!(rx.try_recv().is_err(), "expected exactly one event");
    }

    #[tokio::test]
    async fn rejected_create_publishes_nothing() {
        let state = state();
        create_guild(State(state.clone()), Json(create_req("g1")))
            .await
            .unwrap();

        let mut rx = state.dispatcher.subscribe();
        let err = create_guild(State(state.clone()), Json(create_req("g1")))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(rx.try_recv().is_err(), "conflict must not publish");
    }

    #[tokio::test]
    async fn missing_guild_maps_to_404() {
        let state = state();
        let err = get_guild(State(state.clone()), Path("nope".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = delete_guild(State(state), Path("nope".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_publishes_composite_key() {
        let state = state();
        create_guild(State(state.clone()), Json(create_req("g1")))
            .await
            .unwrap();

        let mut rx = state.dispatcher.subscribe();
        delete_guild(State(state.clone()), Path("g1".into()))
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, GatewayEvent::GuildDelete { ref guild_id } if guild_id == "g1"));
    }
}
