use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// JWT claims shared between warden-api (REST middleware) and warden-gateway
/// (WebSocket Identify). Canonical definition lives here in warden-types.
/// Tokens are minted by the external OAuth exchange; Warden only verifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

// -- Guilds --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGuildRequest {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    #[serde(default)]
    pub icon_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateGuildRequest {
    pub name: String,
    pub owner_id: String,
    #[serde(default)]
    pub icon_url: Option<String>,
}

// -- Settings --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateSettingsRequest {
    pub prefix: String,
    pub locale: String,
    pub music_volume: u32,
    #[serde(default)]
    pub updates_channel_id: Option<String>,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub user_id: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub display_name: String,
}

// -- Moderation --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateModerationRequest {
    pub issuer_id: String,
    pub reason: String,
}

// -- Suggestions / support tickets --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSuggestionRequest {
    pub content: String,
    pub author_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateSuggestionRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTicketRequest {
    pub content: String,
    pub author_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTicketRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

// -- Self-assignable roles --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSelfRoleRequest {
    pub role_id: String,
}

// -- Playlist --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnqueueSongRequest {
    pub title: String,
    pub url: String,
    pub requested_by: String,
}

// -- Referrals --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReferralRequest {
    pub id: i64,
    pub user_id: String,
    pub invite_url: String,
    /// Role unlocked once `unlock_at_joins` members joined via this referral.
    #[serde(default)]
    pub role_id: Option<String>,
    #[serde(default)]
    pub unlock_at_joins: Option<i64>,
    /// Optional creation timestamp; stamped server-side when absent.
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateReferralRequest {
    pub invite_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnlockRewardRequest {
    pub reward: String,
}

// -- Generic responses --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
