use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use warden_types::api::{CreateSuggestionRequest, UpdateSuggestionRequest};
use warden_types::events::GatewayEvent;

use crate::error::ApiError;
use crate::{AppState, run_blocking};

pub async fn list_suggestions(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let suggestions = run_blocking(move || db.db.list_suggestions(&guild_id)).await?;
    Ok(Json(suggestions))
}

pub async fn create_suggestion(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
    Json(req): Json<CreateSuggestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let suggestion =
        run_blocking(move || db.db.create_suggestion(&guild_id, &req.content, &req.author_id))
            .await?;

    state.dispatcher.publish(GatewayEvent::SuggestionCreate {
        suggestion: suggestion.clone(),
    });
    Ok((StatusCode::CREATED, Json(suggestion)))
}

pub async fn update_suggestion(
    State(state): State<AppState>,
    Path((guild_id, suggestion_id)): Path<(String, i64)>,
    Json(req): Json<UpdateSuggestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let suggestion = run_blocking(move || {
        db.db.update_suggestion(
            &guild_id,
            suggestion_id,
            req.content.as_deref(),
            req.status.as_deref(),
        )
    })
    .await?;

    state.dispatcher.publish(GatewayEvent::SuggestionUpdate {
        suggestion: suggestion.clone(),
    });
    Ok(Json(suggestion))
}

pub async fn delete_suggestion(
    State(state): State<AppState>,
    Path((guild_id, suggestion_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let gid = guild_id.clone();
    run_blocking(move || db.db.delete_suggestion(&gid, suggestion_id)).await?;

    state.dispatcher.publish(GatewayEvent::SuggestionDelete {
        guild_id: guild_id.clone(),
        suggestion_id,
    });
    Ok(Json(json!({ "guild_id": guild_id, "suggestion_id": suggestion_id })))
}
