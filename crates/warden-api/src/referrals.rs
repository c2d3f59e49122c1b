use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use warden_types::api::{CreateReferralRequest, UnlockRewardRequest, UpdateReferralRequest};
use warden_types::events::GatewayEvent;

use crate::error::ApiError;
use crate::{AppState, run_blocking};

pub async fn list_referrals(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let referrals = run_blocking(move || db.db.list_referrals(&guild_id)).await?;
    Ok(Json(referrals))
}

pub async fn get_referral(
    State(state): State<AppState>,
    Path((guild_id, referral_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let referral = run_blocking(move || db.db.get_referral(&guild_id, referral_id)).await?;
    Ok(Json(referral))
}

pub async fn create_referral(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
    Json(req): Json<CreateReferralRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let referral = run_blocking(move || {
        db.db.create_referral(
            &guild_id,
            req.id,
            &req.user_id,
            &req.invite_url,
            req.role_id.as_deref(),
            req.unlock_at_joins,
            req.created_at,
        )
    })
    .await?;

    state.dispatcher.publish(GatewayEvent::ReferralCreate {
        referral: referral.clone(),
    });
    Ok((StatusCode::CREATED, Json(referral)))
}

pub async fn update_referral(
    State(state): State<AppState>,
    Path((guild_id, referral_id)): Path<(String, i64)>,
    Json(req): Json<UpdateReferralRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let referral =
        run_blocking(move || db.db.update_referral(&guild_id, referral_id, &req.invite_url))
            .await?;

    state.dispatcher.publish(GatewayEvent::ReferralUpdate {
        referral: referral.clone(),
    });
    Ok(Json(referral))
}

/// A member joined through this invite; bumps the join counter.
pub async fn record_join(
    State(state): State<AppState>,
    Path((guild_id, referral_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let referral = run_blocking(move || db.db.record_referral_join(&guild_id, referral_id)).await?;

    state.dispatcher.publish(GatewayEvent::ReferralUpdate {
        referral: referral.clone(),
    });
    Ok(Json(referral))
}

pub async fn unlock_reward(
    State(state): State<AppState>,
    Path((guild_id, referral_id)): Path<(String, i64)>,
    Json(req): Json<UnlockRewardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let referral =
        run_blocking(move || db.db.unlock_referral_reward(&guild_id, referral_id, &req.reward))
            .await?;

    state.dispatcher.publish(GatewayEvent::ReferralUpdate {
        referral: referral.clone(),
    });
    Ok((StatusCode::CREATED, Json(referral)))
}

pub async fn delete_referral(
    State(state): State<AppState>,
    Path((guild_id, referral_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let gid = guild_id.clone();
    run_blocking(move || db.db.delete_referral(&gid, referral_id)).await?;

    state.dispatcher.publish(GatewayEvent::ReferralDelete {
        guild_id: guild_id.clone(),
        referral_id,
    });
    Ok(Json(json!({ "guild_id": guild_id, "referral_id": referral_id })))
}
