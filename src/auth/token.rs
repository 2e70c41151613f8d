use std::sync::Arc;

use rand::distributions::{Alphanumeric, DistString};
use r2d2_redis::redis::Commands;

use crate::app::error::AppError;
use crate::database::db_utils::RedisPool;

pub const TOKEN_LENGTH: usize = 40;

/// Opaque login tokens, at most one per user.
pub trait TokenStore: Send + Sync {
    /// Returns the user's token, creating one if the user has none.
    fn get_or_create(&self, user_id: i32) -> Result<String, AppError>;
    /// Resolves a token to the id of the user owning it.
    fn user_for(&self, key: &str) -> Result<Option<i32>, AppError>;
    /// Deletes the user's token. Returns `false` when there was none.
    fn delete_for_user(&self, user_id: i32) -> Result<bool, AppError>;
}

pub fn generate_key() -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), TOKEN_LENGTH)
}

fn token_key(key: &str) -> String {
    format!("token:{}", key)
}

fn user_key(user_id: i32) -> String {
    format!("user_token:{}", user_id)
}

/// Keeps tokens in redis as two keys: `token:<key>` holding the user id and
/// `user_token:<id>` holding the key. Neither expires.
#[derive(Clone)]
pub struct RedisTokenStore {
    pool: Arc<RedisPool>,
}

impl RedisTokenStore {
    pub fn new(pool: Arc<RedisPool>) -> RedisTokenStore {
        RedisTokenStore { pool }
    }
}

impl TokenStore for RedisTokenStore {
    fn get_or_create(&self, user_id: i32) -> Result<String, AppError> {
        let mut conn = self.pool.get().map_err(AppError::internal)?;

        if let Some(existing) = conn.get::<_, Option<String>>(user_key(user_id))? {
            return Ok(existing);
        }

        let candidate = generate_key();
        conn.set::<_, _, ()>(token_key(&candidate), user_id)?;

        // SET NX decides between concurrent logins of the same user.
        if conn.set_nx::<_, _, bool>(user_key(user_id), &candidate)? {
            return Ok(candidate);
        }
        conn.del::<_, ()>(token_key(&candidate))?;

        conn.get::<_, Option<String>>(user_key(user_id))?
            .ok_or_else(|| AppError::internal("token removed while being issued"))
    }

    fn user_for(&self, key: &str) -> Result<Option<i32>, AppError> {
        let mut conn = self.pool.get().map_err(AppError::internal)?;
        Ok(conn.get::<_, Option<i32>>(token_key(key))?)
    }

    fn delete_for_user(&self, user_id: i32) -> Result<bool, AppError> {
        let mut conn = self.pool.get().map_err(AppError::internal)?;

        let key = match conn.get::<_, Option<String>>(user_key(user_id))? {
            Some(key) => key,
            None => return Ok(false),
        };
        conn.del::<_, ()>(vec![token_key(&key), user_key(user_id)])?;

        Ok(true)
    }
}
