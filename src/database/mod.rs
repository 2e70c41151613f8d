//! Repository traits for every persisted entity, plus their PostgreSQL and
//! in-memory implementations.
//!
//! Handlers never touch a connection directly: they go through the trait
//! objects held by [`AppState`](crate::app::AppState).

pub mod db_utils;
pub mod memory;
pub mod models;
pub mod postgres;

use crate::app::error::AppError;
use models::*;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub trait UserStore: Send + Sync {
    /// Inserts a user. A taken username is a validation error on `username`.
    fn create(&self, new_user: NewUser) -> Result<User, AppError>;
    fn find_by_id(&self, id: i32) -> Result<User, AppError>;
    fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    fn list(&self) -> Result<Vec<User>, AppError>;
    fn update(&self, id: i32, changes: UserChanges) -> Result<User, AppError>;
    /// Deletes the user together with their posts, likes and comments.
    fn delete(&self, id: i32) -> Result<(), AppError>;
}

/// Posts are always returned together with their author.
pub trait PostStore: Send + Sync {
    fn list(&self) -> Result<Vec<(BlogPost, User)>, AppError>;
    fn get(&self, id: i32) -> Result<(BlogPost, User), AppError>;
    fn create(&self, new_post: NewBlogPost) -> Result<(BlogPost, User), AppError>;
    fn update(&self, id: i32, changes: PostChanges) -> Result<(BlogPost, User), AppError>;
    /// Deletes the post together with its likes and comments.
    fn delete(&self, id: i32) -> Result<(), AppError>;
}

pub trait LikeStore: Send + Sync {
    fn list(&self) -> Result<Vec<Like>, AppError>;
    fn get(&self, id: i32) -> Result<Like, AppError>;
    /// Fails with a validation error when either reference is unknown or the
    /// pair is already liked.
    fn create(&self, new_like: NewLike) -> Result<Like, AppError>;
    fn delete(&self, id: i32) -> Result<(), AppError>;
    /// Removes the user's like on the post if there is one, adds it otherwise.
    ///
    /// Runs as a single atomic step: concurrent toggles of the same pair never
    /// leave more than one like behind.
    fn toggle(&self, user_id: i32, blog_post_id: i32) -> Result<LikeToggle, AppError>;
}

/// Comments are always returned together with their author.
pub trait CommentStore: Send + Sync {
    fn list(&self) -> Result<Vec<(Comment, User)>, AppError>;
    fn get(&self, id: i32) -> Result<(Comment, User), AppError>;
    /// Fails with a validation error on `blog_post` when the post is unknown.
    fn create(&self, new_comment: NewComment) -> Result<(Comment, User), AppError>;
    fn update(&self, id: i32, changes: CommentChanges) -> Result<(Comment, User), AppError>;
    fn delete(&self, id: i32) -> Result<(), AppError>;
}

/// Validation error for a reference to a row that does not exist.
pub(crate) fn invalid_pk(field: &str, id: i32) -> AppError {
    AppError::field(
        field,
        format!("Invalid pk \"{}\" - object does not exist.", id),
    )
}

pub(crate) fn duplicate_username() -> AppError {
    AppError::field("username", "A user with that username already exists.")
}

pub(crate) fn duplicate_like() -> AppError {
    AppError::field(
        crate::app::error::NON_FIELD_ERRORS,
        "The fields user, blog_post must make a unique set.",
    )
}
