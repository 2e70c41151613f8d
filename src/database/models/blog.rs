use chrono::NaiveDateTime;

use crate::schema::blog_posts;

#[derive(Debug, Clone, PartialEq, Queryable)]
pub struct BlogPost {
    pub id: i32,
    pub author_id: i32,
    pub title: String,
    pub content: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[table_name = "blog_posts"]
pub struct NewBlogPost {
    pub author_id: i32,
    pub title: String,
    pub content: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Edit of a post. `updated_at` is always written, so the changeset is never empty.
#[derive(Debug, Clone, AsChangeset)]
#[table_name = "blog_posts"]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub updated_at: NaiveDateTime,
}

impl PostChanges {
    pub fn apply(self, post: &mut BlogPost) {
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(content) = self.content {
            post.content = content;
        }
        post.updated_at = self.updated_at;
    }
}
