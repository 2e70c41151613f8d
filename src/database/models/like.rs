use chrono::NaiveDateTime;

use crate::schema::likes;

#[derive(Debug, Clone, PartialEq, Queryable)]
pub struct Like {
    pub id: i32,
    pub user_id: i32,
    pub blog_post_id: i32,
    pub liked_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[table_name = "likes"]
pub struct NewLike {
    pub user_id: i32,
    pub blog_post_id: i32,
    pub liked_at: NaiveDateTime,
}

/// Outcome of toggling a like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeToggle {
    Added,
    Removed,
}

impl LikeToggle {
    pub fn message(self) -> &'static str {
        match self {
            LikeToggle::Added => "Like added",
            LikeToggle::Removed => "Like removed",
        }
    }
}
