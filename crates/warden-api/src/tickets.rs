use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use warden_types::api::{CreateTicketRequest, UpdateTicketRequest};
use warden_types::events::GatewayEvent;

use crate::error::ApiError;
use crate::{AppState, run_blocking};

pub async fn list_tickets(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let tickets = run_blocking(move || db.db.list_tickets(&guild_id)).await?;
    Ok(Json(tickets))
}

pub async fn create_ticket(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
    Json(req): Json<CreateTicketRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let ticket = run_blocking(move || db.db.create_ticket(&guild_id, &req.content, &req.author_id))
        .await?;

    state.dispatcher.publish(GatewayEvent::SupportTicketCreate {
        ticket: ticket.clone(),
    });
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn update_ticket(
    State(state): State<AppState>,
    Path((guild_id, ticket_id)): Path<(String, i64)>,
    Json(req): Json<UpdateTicketRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let ticket = run_blocking(move || {
        db.db
            .update_ticket(&guild_id, ticket_id, req.content.as_deref(), req.status.as_deref())
    })
    .await?;

    state.dispatcher.publish(GatewayEvent::SupportTicketUpdate {
        ticket: ticket.clone(),
    });
    Ok(Json(ticket))
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    Path((guild_id, ticket_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let gid = guild_id.clone();
    run_blocking(move || db.db.delete_ticket(&gid, ticket_id)).await?;

    state.dispatcher.publish(GatewayEvent::SupportTicketDelete {
        guild_id: guild_id.clone(),
        ticket_id,
    });
    Ok(Json(json!({ "guild_id": guild_id, "ticket_id": ticket_id })))
}
