use std::sync::Arc;

use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};

use super::db_utils::PgPool;
use super::models::*;
use super::{duplicate_like, invalid_pk, CommentStore, LikeStore, PostStore, UserStore};
use crate::app::error::AppError;
use crate::schema::{blog_posts, comments, likes, users};

type PgPooled = PooledConnection<ConnectionManager<PgConnection>>;

/// Stores every entity in PostgreSQL. Relational integrity (cascading deletes,
/// unique usernames and likes) is enforced by the schema in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: Arc<PgPool>) -> PgStore {
        PgStore { pool }
    }

    fn conn(&self) -> Result<PgPooled, AppError> {
        self.pool.get().map_err(AppError::internal)
    }
}

fn user_exists(conn: &PgPooled, user_id: i32) -> Result<bool, AppError> {
    Ok(diesel::select(diesel::dsl::exists(users::table.find(user_id)))
        .get_result::<bool>(conn)?)
}

fn post_exists(conn: &PgPooled, post_id: i32) -> Result<bool, AppError> {
    Ok(diesel::select(diesel::dsl::exists(blog_posts::table.find(post_id)))
        .get_result::<bool>(conn)?)
}

fn not_found_if_zero(affected: usize) -> Result<(), AppError> {
    if affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

impl UserStore for PgStore {
    fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let conn = self.conn()?;
        let user = diesel::insert_into(users::table)
            .values(&new_user)
            .get_result::<User>(&conn)?;

        Ok(user)
    }

    fn find_by_id(&self, id: i32) -> Result<User, AppError> {
        let conn = self.conn()?;
        Ok(users::table.find(id).first::<User>(&conn)?)
    }

    fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let conn = self.conn()?;
        Ok(users::table
            .filter(users::username.eq(username))
            .first::<User>(&conn)
            .optional()?)
    }

    fn list(&self) -> Result<Vec<User>, AppError> {
        let conn = self.conn()?;
        Ok(users::table.order(users::id.asc()).load::<User>(&conn)?)
    }

    fn update(&self, id: i32, changes: UserChanges) -> Result<User, AppError> {
        if changes.is_empty() {
            return UserStore::find_by_id(self, id);
        }

        let conn = self.conn()?;
        Ok(diesel::update(users::table.find(id))
            .set(&changes)
            .get_result::<User>(&conn)?)
    }

    fn delete(&self, id: i32) -> Result<(), AppError> {
        let conn = self.conn()?;
        not_found_if_zero(diesel::delete(users::table.find(id)).execute(&conn)?)
    }
}

impl PostStore for PgStore {
    fn list(&self) -> Result<Vec<(BlogPost, User)>, AppError> {
        let conn = self.conn()?;
        Ok(blog_posts::table
            .inner_join(users::table)
            .order(blog_posts::id.asc())
            .load::<(BlogPost, User)>(&conn)?)
    }

    fn get(&self, id: i32) -> Result<(BlogPost, User), AppError> {
        let conn = self.conn()?;
        Ok(blog_posts::table
            .inner_join(users::table)
            .filter(blog_posts::id.eq(id))
            .first::<(BlogPost, User)>(&conn)?)
    }

    fn create(&self, new_post: NewBlogPost) -> Result<(BlogPost, User), AppError> {
        let conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|| {
            let author = users::table
                .find(new_post.author_id)
                .first::<User>(&conn)
                .optional()?
                .ok_or_else(|| invalid_pk("author", new_post.author_id))?;
            let post = diesel::insert_into(blog_posts::table)
                .values(&new_post)
                .get_result::<BlogPost>(&conn)?;

            Ok((post, author))
        })
    }

    fn update(&self, id: i32, changes: PostChanges) -> Result<(BlogPost, User), AppError> {
        let conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|| {
            let post = diesel::update(blog_posts::table.find(id))
                .set(&changes)
                .get_result::<BlogPost>(&conn)?;
            let author = users::table.find(post.author_id).first::<User>(&conn)?;

            Ok((post, author))
        })
    }

    fn delete(&self, id: i32) -> Result<(), AppError> {
        let conn = self.conn()?;
        not_found_if_zero(diesel::delete(blog_posts::table.find(id)).execute(&conn)?)
    }
}

impl LikeStore for PgStore {
    fn list(&self) -> Result<Vec<Like>, AppError> {
        let conn = self.conn()?;
        Ok(likes::table.order(likes::id.asc()).load::<Like>(&conn)?)
    }

    fn get(&self, id: i32) -> Result<Like, AppError> {
        let conn = self.conn()?;
        Ok(likes::table.find(id).first::<Like>(&conn)?)
    }

    fn create(&self, new_like: NewLike) -> Result<Like, AppError> {
        let conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|| {
            if !user_exists(&conn, new_like.user_id)? {
                return Err(invalid_pk("user", new_like.user_id));
            }
            if !post_exists(&conn, new_like.blog_post_id)? {
                return Err(invalid_pk("blog_post", new_like.blog_post_id));
            }

            diesel::insert_into(likes::table)
                .values(&new_like)
                .on_conflict_do_nothing()
                .get_result::<Like>(&conn)
                .optional()?
                .ok_or_else(duplicate_like)
        })
    }

    fn delete(&self, id: i32) -> Result<(), AppError> {
        let conn = self.conn()?;
        not_found_if_zero(diesel::delete(likes::table.find(id)).execute(&conn)?)
    }

    fn toggle(&self, user_id: i32, blog_post_id: i32) -> Result<LikeToggle, AppError> {
        let conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|| {
            // Row lock on the post serialises toggles of the same post.
            blog_posts::table
                .find(blog_post_id)
                .select(blog_posts::id)
                .for_update()
                .first::<i32>(&conn)?;

            let removed = diesel::delete(
                likes::table
                    .filter(likes::user_id.eq(user_id))
                    .filter(likes::blog_post_id.eq(blog_post_id)),
            )
            .execute(&conn)?;
            if removed > 0 {
                return Ok(LikeToggle::Removed);
            }

            diesel::insert_into(likes::table)
                .values(&NewLike {
                    user_id,
                    blog_post_id,
                    liked_at: Utc::now().naive_utc(),
                })
                .execute(&conn)?;

            Ok(LikeToggle::Added)
        })
    }
}

impl CommentStore for PgStore {
    fn list(&self) -> Result<Vec<(Comment, User)>, AppError> {
        let conn = self.conn()?;
        Ok(comments::table
            .inner_join(users::table)
            .order(comments::id.asc())
            .load::<(Comment, User)>(&conn)?)
    }

    fn get(&self, id: i32) -> Result<(Comment, User), AppError> {
        let conn = self.conn()?;
        Ok(comments::table
            .inner_join(users::table)
            .filter(comments::id.eq(id))
            .first::<(Comment, User)>(&conn)?)
    }

    fn create(&self, new_comment: NewComment) -> Result<(Comment, User), AppError> {
        let conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|| {
            if !post_exists(&conn, new_comment.blog_post_id)? {
                return Err(invalid_pk("blog_post", new_comment.blog_post_id));
            }
            let user = users::table
                .find(new_comment.user_id)
                .first::<User>(&conn)
                .optional()?
                .ok_or_else(|| invalid_pk("user", new_comment.user_id))?;
            let comment = diesel::insert_into(comments::table)
                .values(&new_comment)
                .get_result::<Comment>(&conn)?;

            Ok((comment, user))
        })
    }

    fn update(&self, id: i32, changes: CommentChanges) -> Result<(Comment, User), AppError> {
        if changes.is_empty() {
            return CommentStore::get(self, id);
        }

        let conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|| {
            let comment = diesel::update(comments::table.find(id))
                .set(&changes)
                .get_result::<Comment>(&conn)?;
            let user = users::table.find(comment.user_id).first::<User>(&conn)?;

            Ok((comment, user))
        })
    }

    fn delete(&self, id: i32) -> Result<(), AppError> {
        let conn = self.conn()?;
        not_found_if_zero(diesel::delete(comments::table.find(id)).execute(&conn)?)
    }
}
