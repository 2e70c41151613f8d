use chrono::NaiveDateTime;

use crate::schema::comments;

#[derive(Debug, Clone, PartialEq, Queryable)]
pub struct Comment {
    pub id: i32,
    pub user_id: i32,
    pub blog_post_id: i32,
    pub content: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[table_name = "comments"]
pub struct NewComment {
    pub user_id: i32,
    pub blog_post_id: i32,
    pub content: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[table_name = "comments"]
pub struct CommentChanges {
    pub content: Option<String>,
}

impl CommentChanges {
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
    }

    pub fn apply(self, comment: &mut Comment) {
        if let Some(content) = self.content {
            comment.content = content;
        }
    }
}
