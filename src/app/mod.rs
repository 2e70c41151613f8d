pub mod config;
pub mod error;

use std::sync::Arc;

use crate::auth::jwt::JwtKeys;
use crate::auth::token::{RedisTokenStore, TokenStore};
use crate::database::db_utils::{psql_connect_to_db, redis_connect_to_db};
use crate::database::{CommentStore, LikeStore, MemoryStore, PgStore, PostStore, UserStore};
use config::{Settings, StoreBackend};
use error::AppError;

/** Holds the stores every request handler works against */
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub posts: Arc<dyn PostStore>,
    pub likes: Arc<dyn LikeStore>,
    pub comments: Arc<dyn CommentStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    /// Connects to the backend named in the settings.
    pub fn from_settings(settings: &Settings) -> Result<AppState, AppError> {
        let jwt = JwtKeys::new(
            &settings.jwt_secret,
            settings.access_ttl_seconds,
            settings.refresh_ttl_seconds,
        );

        match settings.backend {
            StoreBackend::Postgres => {
                let database_url = settings
                    .database_url
                    .as_deref()
                    .ok_or_else(|| AppError::internal("DATABASE_URL not set"))?;
                let psql_pool = psql_connect_to_db(database_url, settings.database_pool_size)?;
                let redis_pool = redis_connect_to_db(&settings.redis_url)?;

                Ok(AppState::postgres(
                    PgStore::new(psql_pool),
                    RedisTokenStore::new(redis_pool),
                    jwt,
                ))
            }
            StoreBackend::Memory => {
                log::warn!("running on the in-memory store, data is lost on shutdown");
                Ok(AppState::in_memory(jwt))
            }
        }
    }

    pub fn postgres(store: PgStore, tokens: RedisTokenStore, jwt: JwtKeys) -> AppState {
        let store = Arc::new(store);
        AppState {
            users: store.clone(),
            posts: store.clone(),
            likes: store.clone(),
            comments: store,
            tokens: Arc::new(tokens),
            jwt: Arc::new(jwt),
        }
    }

    pub fn in_memory(jwt: JwtKeys) -> AppState {
        let store = Arc::new(MemoryStore::new());
        AppState {
            users: store.clone(),
            posts: store.clone(),
            likes: store.clone(),
            comments: store.clone(),
            tokens: store,
            jwt: Arc::new(jwt),
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> AppState {
        AppState::in_memory(JwtKeys::new("test-secret", 300, 86_400))
    }
}
