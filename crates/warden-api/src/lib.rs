pub mod error;
pub mod guilds;
pub mod middleware;
pub mod playlist;
pub mod referrals;
pub mod roles;
pub mod settings;
pub mod suggestions;
pub mod tickets;
pub mod users;

use std::sync::Arc;

use tracing::error;

use warden_db::Database;
use warden_db::error::StoreError;
use warden_gateway::dispatcher::Dispatcher;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub dispatcher: Dispatcher,
    pub jwt_secret: String,
}

/// Runs a service call off the async runtime. SQLite calls block, and the
/// request-handling model suspends at this boundary rather than holding a
/// worker thread.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            Err(ApiError::internal())
        }
    }
}
