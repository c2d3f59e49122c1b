use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use warden_api::middleware::require_auth;
use warden_api::{AppState, AppStateInner, guilds, playlist, referrals, roles, settings, suggestions, tickets, users};
use warden_gateway::connection;
use warden_gateway::dispatcher::Dispatcher;

/// All configuration, read once at startup and passed explicitly into the
/// components that need it.
struct Config {
    jwt_secret: String,
    db_path: String,
    host: String,
    port: u16,
}

impl Config {
    fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            jwt_secret: std::env::var("WARDEN_JWT_SECRET")
                .unwrap_or_else(|_| "dev-secret-change-me".into()),
            db_path: std::env::var("WARDEN_DB_PATH").unwrap_or_else(|_| "warden.db".into()),
            host: std::env::var("WARDEN_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("WARDEN_PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()?,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warden=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = warden_db::Database::open(&PathBuf::from(&config.db_path))?;

    // Shared state
    let dispatcher = Dispatcher::new();
    let state: AppState = Arc::new(AppStateInner {
        db,
        dispatcher: dispatcher.clone(),
        jwt_secret: config.jwt_secret.clone(),
    });

    let api_routes = Router::new()
        .route("/guilds", get(guilds::list_guilds).post(guilds::create_guild))
        .route(
            "/guilds/{guild_id}",
            get(guilds::get_guild)
                .put(guilds::update_guild)
                .delete(guilds::delete_guild),
        )
        .route(
            "/guilds/{guild_id}/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .route(
            "/guilds/{guild_id}/suggestions",
            get(suggestions::list_suggestions).post(suggestions::create_suggestion),
        )
        .route(
            "/guilds/{guild_id}/suggestions/{suggestion_id}",
            put(suggestions::update_suggestion).delete(suggestions::delete_suggestion),
        )
        .route(
            "/guilds/{guild_id}/support-tickets",
            get(tickets::list_tickets).post(tickets::create_ticket),
        )
        .route(
            "/guilds/{guild_id}/support-tickets/{ticket_id}",
            put(tickets::update_ticket).delete(tickets::delete_ticket),
        )
        .route(
            "/guilds/{guild_id}/users",
            get(users::list_users).post(users::create_user),
        )
        .route(
            "/guilds/{guild_id}/users/{user_id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/guilds/{guild_id}/users/{user_id}/warnings",
            get(users::list_warnings).post(users::create_warning),
        )
        .route(
            "/guilds/{guild_id}/users/{user_id}/kicks",
            get(users::list_kicks).post(users::create_kick),
        )
        .route(
            "/guilds/{guild_id}/self-assignable-roles",
            get(roles::list_self_roles).post(roles::create_self_role),
        )
        .route(
            "/guilds/{guild_id}/self-assignable-roles/{role_id}",
            delete(roles::delete_self_role),
        )
        .route(
            "/guilds/{guild_id}/playlist",
            get(playlist::list_songs)
                .post(playlist::enqueue_song)
                .delete(playlist::clear_playlist),
        )
        .route(
            "/guilds/{guild_id}/playlist/user/{user_id}",
            delete(playlist::purge_user_songs),
        )
        .route(
            "/guilds/{guild_id}/playlist/{song_id}",
            delete(playlist::delete_song),
        )
        .route(
            "/guilds/{guild_id}/referrals",
            get(referrals::list_referrals).post(referrals::create_referral),
        )
        .route(
            "/guilds/{guild_id}/referrals/{referral_id}",
            get(referrals::get_referral)
                .put(referrals::update_referral)
                .delete(referrals::delete_referral),
        )
        .route(
            "/guilds/{guild_id}/referrals/{referral_id}/joins",
            post(referrals::record_join),
        )
        .route(
            "/guilds/{guild_id}/referrals/{referral_id}/rewards",
            post(referrals::unlock_reward),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(state.clone());

    let app = Router::new()
        .merge(api_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Warden listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.dispatcher.clone(), state.jwt_secret.clone())
    })
}
