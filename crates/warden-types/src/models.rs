use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Guild listing view — child collections are deliberately excluded so that
/// `GET /guilds` stays cheap even for guilds with large playlists or user lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guild {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub icon_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Full guild graph returned by `GET /guilds/{id}` — everything the bot needs
/// to rebuild its in-memory view of a guild after a gateway reconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildGraph {
    #[serde(flatten)]
    pub guild: Guild,
    pub settings: GuildSettings,
    pub users: Vec<GuildUser>,
    pub suggestions: Vec<Suggestion>,
    pub support_tickets: Vec<SupportTicket>,
    pub self_assignable_roles: Vec<SelfAssignableRole>,
    pub playlist: Vec<Song>,
    pub referrals: Vec<Referral>,
}

/// Per-guild settings. Exactly one row per guild, created together with the
/// guild and only ever updated, never deleted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildSettings {
    pub guild_id: String,
    pub prefix: String,
    pub locale: String,
    pub music_volume: u32,
    pub updates_channel_id: Option<String>,
}

/// A platform user as known within one guild. The same platform user id may
/// appear under several guilds; each row is scoped and moderated independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildUser {
    pub guild_id: String,
    pub user_id: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub id: i64,
    pub guild_id: String,
    pub user_id: String,
    pub issuer_id: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kick {
    pub id: i64,
    pub guild_id: String,
    pub user_id: String,
    pub issuer_id: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Suggestion ids come from a guild-scoped sequence: the first suggestion in
/// every guild is id 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub guild_id: String,
    pub id: i64,
    pub content: String,
    pub status: SuggestionStatus,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportTicket {
    pub guild_id: String,
    pub id: i64,
    pub content: String,
    pub status: TicketStatus,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
}

/// A platform role members may opt into. Pure membership record — the role
/// itself lives on the platform; we only track which ones are self-assignable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfAssignableRole {
    pub guild_id: String,
    pub role_id: String,
}

/// One playlist entry. `position` defines playback order: the queue is FIFO
/// and positions are append-only until the queue is cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub guild_id: String,
    pub id: i64,
    pub title: String,
    pub url: String,
    pub requested_by: String,
    pub position: i64,
}

/// Invite-tracking record. The short numeric id is chosen by the caller (it is
/// what members type), so uniqueness is per guild, not sequence-generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Referral {
    pub guild_id: String,
    pub id: i64,
    pub user_id: String,
    pub invite_url: String,
    pub join_count: i64,
    pub created_at: DateTime<Utc>,
    pub role: Option<ReferralRole>,
    pub rewards: Vec<ReferralReward>,
}

/// The platform role granted when the referral's unlock threshold is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralRole {
    pub role_id: String,
    pub unlock_at_joins: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralReward {
    pub id: i64,
    pub reward: String,
    pub unlocked_at: DateTime<Utc>,
}
