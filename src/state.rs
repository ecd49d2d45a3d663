use dbsweep::config::AppConfig;
use sqlx::SqlitePool;

/// Shared application state: the target database pool and the loaded
/// configuration. Engines are constructed per request; they carry no state
/// of their own beyond the pool and the engine config.
pub struct AppState {
    pub db: SqlitePool,
    pub config: AppConfig,
}
