use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use warden_types::api::EnqueueSongRequest;
use warden_types::events::GatewayEvent;

use crate::error::ApiError;
use crate::{AppState, run_blocking};

pub async fn list_songs(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let songs = run_blocking(move || db.db.list_songs(&guild_id)).await?;
    Ok(Json(songs))
}

pub async fn enqueue_song(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
    Json(req): Json<EnqueueSongRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let song = run_blocking(move || {
        db.db
            .enqueue_song(&guild_id, &req.title, &req.url, &req.requested_by)
    })
    .await?;

    state
        .dispatcher
        .publish(GatewayEvent::SongCreate { song: song.clone() });
    Ok((StatusCode::CREATED, Json(song)))
}

pub async fn delete_song(
    State(state): State<AppState>,
    Path((guild_id, song_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let gid = guild_id.clone();
    run_blocking(move || db.db.delete_song(&gid, song_id)).await?;

    state.dispatcher.publish(GatewayEvent::SongDelete {
        guild_id: guild_id.clone(),
        song_id,
    });
    Ok(Json(json!({ "guild_id": guild_id, "song_id": song_id })))
}

/// Removes every song the user requested in this guild, atomically.
pub async fn purge_user_songs(
    State(state): State<AppState>,
    Path((guild_id, user_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let gid = guild_id.clone();
    let uid = user_id.clone();
    let removed = run_blocking(move || db.db.delete_songs_by_requester(&gid, &uid)).await?;

    state.dispatcher.publish(GatewayEvent::PlaylistUserPurge {
        guild_id: guild_id.clone(),
        user_id: user_id.clone(),
    });
    Ok(Json(json!({
        "guild_id": guild_id,
        "user_id": user_id,
        "removed": removed,
    })))
}

pub async fn clear_playlist(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let gid = guild_id.clone();
    let removed = run_blocking(move || db.db.clear_playlist(&gid)).await?;

    state.dispatcher.publish(GatewayEvent::PlaylistClear {
        guild_id: guild_id.clone(),
    });
    Ok(Json(json!({ "guild_id": guild_id, "removed": removed })))
}
