use serde::{Deserialize, Serialize};

use crate::models::{
    Guild, GuildSettings, GuildUser, Kick, Referral, SelfAssignableRole, Song, Suggestion,
    SupportTicket, Warning,
};

/// Events sent over the WebSocket gateway, one per committed mutation.
///
/// Delivery is at-most-once and best-effort: there is no outbox and no replay.
/// A subscriber that was disconnected when an event fired must resynchronize by
/// re-reading `GET /guilds/{id}` on reconnect. Events for the same guild are
/// published in service commit order; no ordering is promised across guilds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful identification.
    Ready { subject: String },

    GuildCreate { guild: Guild },
    GuildUpdate { guild: Guild },
    GuildDelete { guild_id: String },

    SettingsUpdate { settings: GuildSettings },

    UserCreate { user: GuildUser },
    UserUpdate { user: GuildUser },
    UserDelete { guild_id: String, user_id: String },

    WarningCreate { warning: Warning },
    KickCreate { kick: Kick },

    SuggestionCreate { suggestion: Suggestion },
    SuggestionUpdate { suggestion: Suggestion },
    SuggestionDelete { guild_id: String, suggestion_id: i64 },

    SupportTicketCreate { ticket: SupportTicket },
    SupportTicketUpdate { ticket: SupportTicket },
    SupportTicketDelete { guild_id: String, ticket_id: i64 },

    SelfRoleCreate { role: SelfAssignableRole },
    SelfRoleDelete { guild_id: String, role_id: String },

    SongCreate { song: Song },
    SongDelete { guild_id: String, song_id: i64 },
    /// All songs requested by one user were removed in a single operation.
    PlaylistUserPurge { guild_id: String, user_id: String },
    PlaylistClear { guild_id: String },

    ReferralCreate { referral: Referral },
    ReferralUpdate { referral: Referral },
    ReferralDelete { guild_id: String, referral_id: i64 },
}

impl GatewayEvent {
    /// Returns the guild this event is scoped to. `Ready` is the only
    /// connection-local event and returns `None`.
    pub fn guild_id(&self) -> Option<&str> {
        match self {
            Self::Ready { .. } => None,
            Self::GuildCreate { guild } | Self::GuildUpdate { guild } => Some(&guild.id),
            Self::GuildDelete { guild_id } => Some(guild_id),
            Self::SettingsUpdate { settings } => Some(&settings.guild_id),
            Self::UserCreate { user } | Self::UserUpdate { user } => Some(&user.guild_id),
            Self::UserDelete { guild_id, .. } => Some(guild_id),
            Self::WarningCreate { warning } => Some(&warning.guild_id),
            Self::KickCreate { kick } => Some(&kick.guild_id),
            Self::SuggestionCreate { suggestion } | Self::SuggestionUpdate { suggestion } => {
                Some(&suggestion.guild_id)
            }
            Self::SuggestionDelete { guild_id, .. } => Some(guild_id),
            Self::SupportTicketCreate { ticket } | Self::SupportTicketUpdate { ticket } => {
                Some(&ticket.guild_id)
            }
            Self::SupportTicketDelete { guild_id, .. } => Some(guild_id),
            Self::SelfRoleCreate { role } => Some(&role.guild_id),
            Self::SelfRoleDelete { guild_id, .. } => Some(guild_id),
            Self::SongCreate { song } => Some(&song.guild_id),
            Self::SongDelete { guild_id, .. } => Some(guild_id),
            Self::PlaylistUserPurge { guild_id, .. } => Some(guild_id),
            Self::PlaylistClear { guild_id } => Some(guild_id),
            Self::ReferralCreate { referral } | Self::ReferralUpdate { referral } => {
                Some(&referral.guild_id)
            }
            Self::ReferralDelete { guild_id, .. } => Some(guild_id),
        }
    }
}

/// Commands sent FROM a subscriber TO the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection.
    Identify { token: String },

    /// Narrow event delivery to specific guilds. Until the first Subscribe,
    /// a connection receives events for every guild.
    Subscribe { guild_ids: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_events_carry_composite_keys() {
        let event = GatewayEvent::SuggestionDelete {
            guild_id: "g1".into(),
            suggestion_id: 4,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SuggestionDelete");
        assert_eq!(json["data"]["guild_id"], "g1");
        assert_eq!(json["data"]["suggestion_id"], 4);
        assert_eq!(event.guild_id(), Some("g1"));
    }

    #[test]
    fn ready_is_connection_local() {
        let event = GatewayEvent::Ready { subject: "bot".into() };
        assert_eq!(event.guild_id(), None);
    }
}
