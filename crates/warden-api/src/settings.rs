use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use warden_types::api::UpdateSettingsRequest;
use warden_types::events::GatewayEvent;

use crate::error::ApiError;
use crate::{AppState, run_blocking};

pub async fn get_settings(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let settings = run_blocking(move || db.db.get_settings(&guild_id)).await?;
    Ok(Json(settings))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let settings = run_blocking(move || {
        db.db.update_settings(
            &guild_id,
            &req.prefix,
            &req.locale,
            req.music_volume,
            req.updates_channel_id.as_deref(),
        )
    })
    .await?;

    state.dispatcher.publish(GatewayEvent::SettingsUpdate {
        settings: settings.clone(),
    });
    Ok(Json(settings))
}
